// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Producer client for the Event Hubs REST API.
//!
//! Batches are posted to `{endpoint}/{hub}/messages` in the
//! `application/vnd.microsoft.servicebus.json` format, authenticated with a Shared Access
//! Signature derived from the connection string.

use std::error::Error;
use std::time::Duration;

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use tracing::debug;

use crate::batch::{EventBatch, DEFAULT_MAX_BATCH_SIZE};
use crate::connection_string::ConnectionString;
use crate::errors::{RelayError, ShippingError};
use crate::sas::TokenProvider;

pub const BATCH_CONTENT_TYPE: &str = "application/vnd.microsoft.servicebus.json";
const API_VERSION: &str = "2014-01";

#[derive(Debug, Clone)]
pub struct ProducerOptions {
    pub timeout: Duration,
    pub https_proxy: Option<String>,
    pub max_batch_size: usize,
}

impl Default for ProducerOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(5),
            https_proxy: None,
            max_batch_size: DEFAULT_MAX_BATCH_SIZE,
        }
    }
}

#[derive(Debug, Clone)]
pub struct EventHubProducer {
    client: reqwest::Client,
    messages_url: String,
    token_provider: TokenProvider,
    max_batch_size: usize,
}

impl EventHubProducer {
    /// Builds a producer for `event_hub_name`, or for the connection string's `EntityPath` when
    /// no name is given.
    pub fn from_connection_string(
        conn_str: &str,
        event_hub_name: Option<&str>,
        options: ProducerOptions,
    ) -> Result<Self, RelayError> {
        let connection = ConnectionString::parse(conn_str)?;
        let event_hub_name = connection.event_hub_name(event_hub_name)?;

        let client = build_client(options.https_proxy.as_deref(), options.timeout)
            .map_err(|e| RelayError::HttpClient(e.to_string()))?;

        let resource_uri = format!("https://{}/{}", connection.host, event_hub_name);
        let messages_url = format!(
            "{}/{}/messages?api-version={}",
            connection.endpoint, event_hub_name, API_VERSION
        );
        debug!("Event hub producer targeting {}", messages_url);

        Ok(Self {
            client,
            messages_url,
            token_provider: TokenProvider::new(connection.credential, resource_uri),
            max_batch_size: options.max_batch_size,
        })
    }

    pub fn create_batch(&self) -> EventBatch {
        EventBatch::new(self.max_batch_size)
    }

    pub fn messages_url(&self) -> &str {
        &self.messages_url
    }

    pub async fn send_batch(&self, batch: &EventBatch) -> Result<(), ShippingError> {
        if batch.is_empty() {
            debug!("Skipping empty batch");
            return Ok(());
        }

        let body = batch
            .to_body()
            .map_err(|e| ShippingError::Payload(e.to_string()))?;

        let start = std::time::Instant::now();
        let resp = self
            .client
            .post(&self.messages_url)
            .header(AUTHORIZATION, self.token_provider.token())
            .header(CONTENT_TYPE, BATCH_CONTENT_TYPE)
            .body(body)
            .send()
            .await
            .map_err(|e| ShippingError::Destination(e.status(), e.to_string()))?;
        let elapsed = start.elapsed();

        let status = resp.status();
        if status.is_success() {
            debug!(
                "Sent batch of {} event(s), {} bytes in {} ms",
                batch.len(),
                batch.size_in_bytes(),
                elapsed.as_millis()
            );
            Ok(())
        } else {
            let body = resp.text().await.unwrap_or_default();
            Err(ShippingError::Destination(Some(status), body))
        }
    }
}

pub fn build_client(
    proxy_url: Option<&str>,
    timeout: Duration,
) -> Result<reqwest::Client, Box<dyn Error>> {
    let mut builder = reqwest::Client::builder().timeout(timeout);
    if let Some(proxy) = proxy_url {
        builder = builder.proxy(reqwest::Proxy::https(proxy)?);
    }
    Ok(builder.build()?)
}
