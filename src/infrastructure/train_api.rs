//! Train status scraper API client
//!
//! `GET {base_url}/trains/{number}?date=<RFC3339>` returning the camelCase
//! [`TrainStatus`] document.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, SecondsFormat};
use reqwest::{Client, StatusCode, Url};
use std::time::Duration;

use crate::domain::config::ApiConfig;
use crate::domain::errors::LookupError;
use crate::domain::traits::TrainStatusProvider;
use crate::domain::train::TrainStatus;

pub struct TrainApiClient {
    client: Client,
    base_url: Url,
}

impl TrainApiClient {
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let base_url = Url::parse(&config.base_url)
            .with_context(|| format!("Invalid api.base_url {:?}", config.base_url))?;
        if base_url.cannot_be_a_base() {
            anyhow::bail!("api.base_url {:?} cannot be used as a base url", config.base_url);
        }
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .build()
            .context("Failed to create HTTP client")?;
        Ok(Self { client, base_url })
    }

    fn train_url(&self, train_number: &str, date: DateTime<FixedOffset>) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push("trains").push(train_number);
        }
        url.query_pairs_mut()
            .append_pair("date", &date.to_rfc3339_opts(SecondsFormat::Secs, false));
        url
    }
}

#[async_trait]
impl TrainStatusProvider for TrainApiClient {
    async fn lookup(
        &self,
        train_number: &str,
        date: DateTime<FixedOffset>,
    ) -> Result<TrainStatus, LookupError> {
        let url = self.train_url(train_number, date);
        tracing::debug!("GET {}", url);

        let transport = |e: reqwest::Error| LookupError::Transport {
            train: train_number.to_string(),
            message: e.to_string(),
        };

        let response = self.client.get(url).send().await.map_err(transport)?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(LookupError::NotFound(train_number.to_string()));
        }
        if !status.is_success() {
            return Err(LookupError::Upstream {
                train: train_number.to_string(),
                status: status.as_u16(),
            });
        }
        response.json::<TrainStatus>().await.map_err(transport)
    }
}
