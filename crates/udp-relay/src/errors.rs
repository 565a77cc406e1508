// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Error types for the relay.
//!
//! Startup problems (configuration, connection string, socket binding) surface as
//! [`RelayError`] and stop the process before the receive loop starts. Everything that can go
//! wrong for a single datagram ([`DecodeError`], [`ShippingError`], [`BatchError`]) is logged by
//! the loop and never terminates it.

use std::net::SocketAddr;

use reqwest::StatusCode;

/// Errors that prevent the relay from starting
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid connection string: {0}")]
    ConnectionString(#[from] ConnectionStringError),

    #[error("Failed to bind UDP socket on {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to build HTTP client: {0}")]
    HttpClient(String),
}

/// Errors raised while parsing an Event Hubs connection string
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum ConnectionStringError {
    #[error("connection string is empty")]
    Empty,

    #[error("malformed segment '{0}', expected key=value")]
    MalformedSegment(String),

    #[error("missing required key '{0}'")]
    MissingKey(&'static str),

    #[error("invalid endpoint '{0}'")]
    InvalidEndpoint(String),

    #[error("no event hub name given and the connection string has no EntityPath")]
    MissingEventHubName,

    #[error("event hub name '{given}' does not match EntityPath '{entity_path}'")]
    EventHubNameMismatch { given: String, entity_path: String },
}

/// A datagram whose payload is not valid UTF-8
#[derive(Debug, thiserror::Error)]
#[error("received non-UTF-8 data from {source_addr}: {}", .payload.escape_ascii())]
pub struct DecodeError {
    pub source_addr: SocketAddr,
    pub payload: Vec<u8>,
    #[source]
    pub cause: std::str::Utf8Error,
}

/// Errors raised while filling an [`crate::batch::EventBatch`]
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum BatchError {
    #[error("event of {event_size} bytes does not fit in batch ({current_size}/{max_size} bytes used)")]
    TooLarge {
        event_size: usize,
        current_size: usize,
        max_size: usize,
    },
}

/// Errors raised while submitting a batch to the hub
#[derive(Debug, thiserror::Error)]
pub enum ShippingError {
    #[error("failed to prepare payload: {0}")]
    Payload(String),

    #[error("error shipping batch: {0:?} {1}")]
    Destination(Option<StatusCode>, String),
}
