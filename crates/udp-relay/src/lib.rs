// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Relays UDP datagrams to Azure Event Hubs.
//!
//! A [`relay::Relay`] receives datagrams on a [`listener::Listener`], decodes them as UTF-8 and
//! hands each message to a [`forwarder::Forwarder`], which submits it as a one-event batch
//! through the [`event_hub::EventHubProducer`].

#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::todo))]
#![cfg_attr(not(test), deny(clippy::unimplemented))]

pub mod batch;
pub mod config;
pub mod connection_string;
pub mod errors;
pub mod event_hub;
pub mod forwarder;
pub mod listener;
pub mod relay;
pub mod sas;
