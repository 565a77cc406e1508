// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use reqwest::StatusCode;
use tracing::{debug, error};

use crate::batch::EventData;
use crate::errors::ShippingError;
use crate::event_hub::EventHubProducer;

/// Wraps each message in a one-event batch and submits it to the hub.
#[derive(Debug, Clone)]
pub struct Forwarder {
    producer: EventHubProducer,
}

impl Forwarder {
    pub fn new(producer: EventHubProducer) -> Self {
        Forwarder { producer }
    }

    pub fn messages_url(&self) -> &str {
        self.producer.messages_url()
    }

    /// Submits `message`, returning whether the hub accepted it. Failures are logged and
    /// dropped; nothing is retried.
    pub async fn forward(&self, message: String) -> bool {
        let mut batch = self.producer.create_batch();
        if let Err(e) = batch.try_add(EventData::new(message)) {
            error!("Failed to prepare batch. Message dropped: {}", e);
            return false;
        }

        match self.producer.send_batch(&batch).await {
            Ok(()) => {
                debug!("Forwarded message to event hub");
                true
            }
            Err(e) => {
                log_shipping_error(&e);
                false
            }
        }
    }
}

fn log_shipping_error(err: &ShippingError) {
    match err {
        ShippingError::Payload(msg) => {
            error!("Failed to prepare payload. Message dropped: {}", msg)
        }
        ShippingError::Destination(Some(status), body) => {
            let hint = match *status {
                StatusCode::UNAUTHORIZED => " (check the shared access key)",
                StatusCode::NOT_FOUND => " (check the event hub name)",
                StatusCode::FORBIDDEN => " (send is not permitted for this key or quota exceeded)",
                _ => "",
            };
            error!("{}: Failed to send to event hub{}: {:?}", status, hint, body)
        }
        ShippingError::Destination(None, msg) => {
            error!("Error sending to event hub: {}", msg)
        }
    }
}
