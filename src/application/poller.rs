//! # Subscription Poller
//!
//! Timer loop that refreshes every subscribed status message. A cycle snapshots
//! the registry under its shared lock, fans the items out to a fixed pool of
//! workers through a bounded queue and waits for exactly one result per item
//! before releasing the lock. Subscriptions whose journey is over are removed
//! afterwards and their buttons reduced to the web app link.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, mpsc, watch};
use tokio::time::MissedTickBehavior;

use crate::application::keyboards::{self, SubscriptionButton};
use crate::application::lookup::{LookupRequest, TrainLookup};
use crate::application::registry::SubscriptionRegistry;
use crate::domain::config::PollerConfig;
use crate::domain::errors::RegistryError;
use crate::domain::traits::ChatProvider;
use crate::domain::types::Subscription;
use crate::strings::logs;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CycleReport {
    pub checked: usize,
    pub edited: usize,
    pub failed: usize,
    pub unsubscribed: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CheckStatus {
    Edited,
    /// Lookup classified as not found / upstream failure, message left as is.
    Unchanged,
    Failed,
}

#[derive(Debug)]
struct CheckResult {
    subscription: Subscription,
    status: CheckStatus,
    should_unsubscribe: bool,
}

impl CheckResult {
    fn failed(subscription: Subscription) -> Self {
        Self {
            subscription,
            status: CheckStatus::Failed,
            should_unsubscribe: false,
        }
    }
}

pub struct SubscriptionPoller {
    registry: Arc<SubscriptionRegistry>,
    lookup: Arc<TrainLookup>,
    chat: Arc<dyn ChatProvider>,
    config: PollerConfig,
}

impl SubscriptionPoller {
    pub fn new(
        registry: Arc<SubscriptionRegistry>,
        lookup: Arc<TrainLookup>,
        chat: Arc<dyn ChatProvider>,
        config: PollerConfig,
    ) -> Self {
        Self {
            registry,
            lookup,
            chat,
            config,
        }
    }

    /// Runs one cycle right away, then one per interval until `shutdown` turns true
    /// or its sender is dropped.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(self.config.interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = wait_for_shutdown(&mut shutdown) => break,
            }
            if *shutdown.borrow() {
                break;
            }

            let report = self.run_cycle(&shutdown).await;
            if report.checked > 0 {
                tracing::info!(
                    "{}",
                    logs::cycle_finished(
                        report.checked,
                        report.edited,
                        report.failed,
                        report.unsubscribed
                    )
                );
            }
        }
        tracing::info!("Subscription poller stopped");
    }

    pub async fn run_cycle(&self, shutdown: &watch::Receiver<bool>) -> CycleReport {
        let mut report = CycleReport::default();

        let results = {
            let snapshot = self.registry.snapshot().await;
            let total = snapshot.len();
            if total == 0 {
                return report;
            }

            let workers = self.config.workers.clamp(1, total);
            let (work_tx, work_rx) = mpsc::channel::<Subscription>(workers);
            let work_rx = Arc::new(Mutex::new(work_rx));
            let (result_tx, mut result_rx) = mpsc::channel::<CheckResult>(total);

            let mut handles = Vec::with_capacity(workers);
            for _ in 0..workers {
                let work_rx = work_rx.clone();
                let result_tx = result_tx.clone();
                let lookup = self.lookup.clone();
                let chat = self.chat.clone();
                let timeout = self.config.check_timeout();
                let mut shutdown = shutdown.clone();

                handles.push(tokio::spawn(async move {
                    loop {
                        let next = work_rx.lock().await.recv().await;
                        let Some(subscription) = next else {
                            break;
                        };
                        let result =
                            check(&lookup, chat.as_ref(), subscription, timeout, &mut shutdown).await;
                        if result_tx.send(result).await.is_err() {
                            break;
                        }
                    }
                }));
            }
            drop(result_tx);

            for item in snapshot.items() {
                if work_tx.send(item.clone()).await.is_err() {
                    tracing::error!("Subscription workers exited before the queue was drained");
                    break;
                }
            }
            drop(work_tx);

            let mut results = Vec::with_capacity(total);
            while results.len() < total {
                match result_rx.recv().await {
                    Some(result) => results.push(result),
                    None => break,
                }
            }
            for handle in handles {
                if let Err(e) = handle.await {
                    tracing::error!("Subscription worker panicked: {}", e);
                }
            }
            if results.len() < total {
                tracing::warn!(
                    "Collected {} of {} subscription check results",
                    results.len(),
                    total
                );
            }
            results
        };

        for result in &results {
            report.checked += 1;
            match result.status {
                CheckStatus::Edited => report.edited += 1,
                CheckStatus::Failed => report.failed += 1,
                CheckStatus::Unchanged => {}
            }
        }

        for result in results.iter().filter(|r| r.should_unsubscribe) {
            if self.unsubscribe(&result.subscription).await {
                report.unsubscribed += 1;
            }
        }
        report
    }

    async fn unsubscribe(&self, subscription: &Subscription) -> bool {
        let removed = match self
            .registry
            .delete_subscription(subscription.chat_id, subscription.message_id)
            .await
        {
            Ok(removed) => removed,
            Err(RegistryError::NotFound { .. }) => {
                tracing::debug!(
                    "Subscription of chat {} message {} already gone",
                    subscription.chat_id,
                    subscription.message_id
                );
                return false;
            }
            Err(e) => {
                tracing::error!("Failed to remove finished subscription: {}", e);
                return false;
            }
        };

        tracing::info!(
            "Unsubscribed chat {} from train {} ({})",
            removed.chat_id,
            removed.train_number,
            removed.date
        );
        let keyboard = keyboards::status_keyboard(
            &removed.train_number,
            removed.date,
            removed.group_index,
            SubscriptionButton::Neither,
            self.lookup.web_app_url(),
        );
        if let Err(e) = self
            .chat
            .edit_keyboard(removed.chat_id, removed.message_id, &keyboard)
            .await
        {
            tracing::warn!("Failed to clear buttons of message {}: {}", removed.message_id, e);
        }
        true
    }
}

async fn wait_for_shutdown(shutdown: &mut watch::Receiver<bool>) {
    // A dropped sender counts as shutdown too.
    let _ = shutdown.wait_for(|stop| *stop).await;
}

async fn check(
    lookup: &TrainLookup,
    chat: &dyn ChatProvider,
    subscription: Subscription,
    timeout: Duration,
    shutdown: &mut watch::Receiver<bool>,
) -> CheckResult {
    tracing::debug!(
        "Checking train {} for chat {} message {}",
        subscription.train_number,
        subscription.chat_id,
        subscription.message_id
    );
    let request = LookupRequest::new(
        subscription.train_number.clone(),
        subscription.date,
        subscription.group_index,
    );

    let outcome = tokio::select! {
        _ = wait_for_shutdown(shutdown) => {
            tracing::debug!("Check of train {} abandoned on shutdown", request.train_number);
            return CheckResult::failed(subscription);
        }
        outcome = tokio::time::timeout(timeout, lookup.lookup(&request, true)) => outcome,
    };

    let outcome = match outcome {
        Ok(Ok(outcome)) => outcome,
        Ok(Err(e)) => {
            tracing::warn!("Subscription check failed: {}", e);
            return CheckResult::failed(subscription);
        }
        Err(_) => {
            tracing::warn!(
                "Subscription check of train {} timed out after {:?}",
                request.train_number,
                timeout
            );
            return CheckResult::failed(subscription);
        }
    };

    let status = if outcome.found() {
        match chat
            .edit_message(subscription.chat_id, subscription.message_id, &outcome.message)
            .await
        {
            Ok(()) => CheckStatus::Edited,
            Err(e) => {
                tracing::warn!(
                    "Failed to update message {} in chat {}: {}",
                    subscription.message_id,
                    subscription.chat_id,
                    e
                );
                CheckStatus::Failed
            }
        }
    } else {
        CheckStatus::Unchanged
    };

    CheckResult {
        subscription,
        status,
        should_unsubscribe: outcome.should_unsubscribe,
    }
}
