// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Receive loop tying the listener to the forwarder.
//!
//! Datagrams are handled strictly one at a time: receive, decode, forward, then receive again.
//! A bad payload or a failed submission is logged and the loop moves on to the next datagram;
//! only cancellation ends it.

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::RelayConfig;
use crate::errors::RelayError;
use crate::event_hub::{EventHubProducer, ProducerOptions};
use crate::forwarder::Forwarder;
use crate::listener::{decode, Datagram, Listener};

/// Counters reported when the loop stops
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RelayStats {
    pub received: u64,
    pub decode_failures: u64,
    pub forwarded: u64,
    pub forward_failures: u64,
}

pub struct Relay {
    cancel_token: CancellationToken,
    listener: Listener,
    forwarder: Option<Forwarder>,
    trim_messages: bool,
    stats: RelayStats,
}

impl Relay {
    /// Without a forwarder the relay only logs what it receives.
    pub fn new(
        listener: Listener,
        forwarder: Option<Forwarder>,
        trim_messages: bool,
        cancel_token: CancellationToken,
    ) -> Relay {
        Relay {
            cancel_token,
            listener,
            forwarder,
            trim_messages,
            stats: RelayStats::default(),
        }
    }

    /// Binds the listener and, when a connection string is configured, builds the forwarder.
    pub async fn from_config(
        config: &RelayConfig,
        cancel_token: CancellationToken,
    ) -> Result<Relay, RelayError> {
        let forwarder = match config.connection_string.as_deref() {
            Some(conn_str) => {
                let producer = EventHubProducer::from_connection_string(
                    conn_str,
                    config.event_hub_name.as_deref(),
                    ProducerOptions {
                        timeout: config.send_timeout,
                        https_proxy: config.https_proxy.clone(),
                        ..Default::default()
                    },
                )?;
                Some(Forwarder::new(producer))
            }
            None => {
                warn!("EVENT_HUB_CONN_STR not set, received messages will only be logged");
                None
            }
        };

        let listener = Listener::bind(&config.host, config.port).await?;

        Ok(Relay::new(
            listener,
            forwarder,
            config.trim_messages,
            cancel_token,
        ))
    }

    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.listener.local_addr()
    }

    /// Where messages are sent, `None` in log-only mode.
    pub fn forward_url(&self) -> Option<&str> {
        self.forwarder.as_ref().map(Forwarder::messages_url)
    }

    /// Runs until the cancel token fires.
    pub async fn spin(mut self) -> RelayStats {
        loop {
            let received = tokio::select! {
                received = self.listener.recv() => received,
                _ = self.cancel_token.cancelled() => break,
            };

            match received {
                Ok(datagram) => {
                    self.stats.received += 1;
                    self.consume(datagram).await;
                }
                Err(e) => error!("Failed to receive datagram: {}", e),
            }

            if self.cancel_token.is_cancelled() {
                break;
            }
        }

        debug!("Relay stopped: {:?}", self.stats);
        self.stats
    }

    async fn consume(&mut self, datagram: Datagram) {
        let message = match decode(datagram) {
            Ok(message) => message,
            Err(e) => {
                self.stats.decode_failures += 1;
                warn!(
                    "Received non-UTF-8 data from {}: {}",
                    e.source_addr,
                    e.payload.escape_ascii()
                );
                return;
            }
        };

        let message = if self.trim_messages {
            message.trim().to_string()
        } else {
            message
        };
        info!("Received message: {}", message);

        if let Some(forwarder) = &self.forwarder {
            if forwarder.forward(message).await {
                self.stats.forwarded += 1;
            } else {
                self.stats.forward_failures += 1;
            }
        }
    }

    #[cfg(test)]
    async fn consume_next(&mut self) {
        #[allow(clippy::expect_used)]
        let datagram = self.listener.recv().await.expect("didn't receive data");
        self.stats.received += 1;
        self.consume(datagram).await;
    }
}
