//! # Main Entry Point
//!
//! Wires the bot together:
//! - Domain: Configuration
//! - Infrastructure: Telegram, Train API, JSON store
//! - Application: Flow, Lookup, Registry, Poller, Router, Logging
//!
//! Then runs the Telegram dispatcher and the subscription poller until Ctrl-C.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use teloxide::prelude::*;
use tokio::sync::watch;

use trainbot::application::clock::ServiceClock;
use trainbot::application::flow::FlowEngine;
use trainbot::application::logging::init_logging;
use trainbot::application::lookup::TrainLookup;
use trainbot::application::poller::SubscriptionPoller;
use trainbot::application::registry::SubscriptionRegistry;
use trainbot::application::router::{CallbackQuery as ButtonPress, UpdateRouter};
use trainbot::domain::config::AppConfig;
use trainbot::domain::traits::ChatProvider;
use trainbot::infrastructure::store::JsonStore;
use trainbot::infrastructure::telegram::TelegramService;
use trainbot::infrastructure::train_api::TrainApiClient;
use trainbot::strings::logs;

#[derive(Parser, Debug)]
#[command(name = "trainbot", version, about = "Live train status bot for Telegram")]
struct Args {
    /// Path to the YAML configuration file
    #[arg(long, default_value = "data/config.yaml")]
    config: PathBuf,

    /// Print the resolved configuration and exit
    #[arg(long)]
    check_config: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // 1. Load Configuration
    let config = AppConfig::load(&args.config)?;
    let zone = config.service.zone()?;

    if args.check_config {
        let mut shown = config.clone();
        if shown.telegram.token.is_some() {
            shown.telegram.token = Some("<redacted>".to_string());
        }
        print!("{}", serde_yaml::to_string(&shown).context("Failed to render config")?);
        return Ok(());
    }

    // 2. Logging Setup
    let _log_guard = init_logging(&config.logging)?;
    tracing::info!("{}", logs::STARTING);

    // 3. Storage & Registry
    let store = Arc::new(
        JsonStore::open(&config.storage.path)
            .with_context(|| format!("Failed to open state file {}", config.storage.path))?,
    );
    let registry = Arc::new(
        SubscriptionRegistry::hydrate(store.clone()).context("Failed to load subscriptions")?,
    );
    tracing::info!("{}", logs::subscriptions_loaded(registry.len().await));

    // 4. Services
    let clock = ServiceClock::new(zone);
    let train_api = Arc::new(TrainApiClient::new(&config.api)?);
    let lookup = Arc::new(TrainLookup::new(
        train_api,
        clock,
        config.service.web_app_url.clone(),
    ));

    let bot = Bot::new(config.telegram.resolve_token()?);
    let chat = Arc::new(TelegramService::new(bot.clone()));
    let router = Arc::new(UpdateRouter::new(
        FlowEngine::new(store, clock),
        lookup.clone(),
        registry.clone(),
    ));

    // 5. Subscription Poller
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let poller = SubscriptionPoller::new(registry, lookup, chat.clone(), config.poller.clone());
    let poller_handle = tokio::spawn(async move { poller.run(shutdown_rx).await });

    // 6. Dispatcher
    let handler = dptree::entry()
        .branch(Update::filter_message().endpoint(on_message))
        .branch(Update::filter_callback_query().endpoint(on_callback));

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![router, chat])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    tracing::info!("{}", logs::SHUTDOWN);
    let _ = shutdown_tx.send(true);
    if let Err(e) = poller_handle.await {
        tracing::error!("Subscription poller panicked: {}", e);
    }
    Ok(())
}

async fn on_message(
    msg: Message,
    router: Arc<UpdateRouter>,
    chat: Arc<TelegramService>,
) -> ResponseResult<()> {
    let Some(text) = msg.text() else {
        return Ok(());
    };
    if let Err(e) = router.route_message(chat.as_ref(), msg.chat.id.0, text).await {
        tracing::error!("Failed to handle message in chat {}: {:#}", msg.chat.id, e);
    }
    Ok(())
}

async fn on_callback(
    query: CallbackQuery,
    router: Arc<UpdateRouter>,
    chat: Arc<TelegramService>,
) -> ResponseResult<()> {
    let Some(message) = query.message.as_ref() else {
        // Inline-mode messages are never produced by this bot.
        if let Err(e) = chat.answer_callback(&query.id.0, None).await {
            tracing::warn!("Failed to answer callback {}: {}", query.id.0, e);
        }
        return Ok(());
    };

    let press = ButtonPress {
        query_id: &query.id.0,
        chat_id: message.chat().id.0,
        message_id: message.id().0,
        data: query.data.as_deref().unwrap_or_default(),
    };
    if let Err(e) = router.route_callback(chat.as_ref(), press).await {
        tracing::error!("Failed to answer callback {}: {:#}", press.query_id, e);
    }
    Ok(())
}
