// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::todo))]
#![cfg_attr(not(test), deny(clippy::unimplemented))]

use std::{env, process::ExitCode};

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

use udp_relay::{config::RelayConfig, relay::Relay};

#[tokio::main]
pub async fn main() -> ExitCode {
    // Values in the process environment win over the .env file
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            eprintln!("Failed to load .env file: {e}");
        }
    }

    let log_level = env::var("UDP_RELAY_LOG_LEVEL")
        .map(|val| val.to_lowercase())
        .unwrap_or("info".to_string());

    let env_filter = format!("h2=off,hyper=off,reqwest=off,rustls=off,{}", log_level);

    let subscriber = tracing_subscriber::fmt::Subscriber::builder()
        .with_env_filter(EnvFilter::try_new(env_filter).unwrap_or_else(|_| EnvFilter::new("info")))
        .with_level(true)
        .with_thread_names(false)
        .with_thread_ids(false)
        .with_line_number(false)
        .with_file(false)
        .with_target(true)
        .without_time()
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("setting default subscriber failed: {e}");
        return ExitCode::FAILURE;
    }

    debug!("Logging subsystem enabled");

    let config = match RelayConfig::from_env() {
        Ok(c) => c,
        Err(e) => {
            error!("Error creating config on udp relay startup: {e}");
            return ExitCode::FAILURE;
        }
    };
    debug!("Starting udp relay with {:?}", config);

    let cancel_token = CancellationToken::new();

    let relay = match Relay::from_config(&config, cancel_token.clone()).await {
        Ok(relay) => relay,
        Err(e) => {
            error!("Error when starting udp relay: {e}");
            return ExitCode::FAILURE;
        }
    };

    match relay.local_addr() {
        Ok(addr) => info!("udp-relay: starting to listen on {addr}"),
        Err(_) => info!("udp-relay: starting to listen on port {}", config.port),
    }
    if let Some(url) = relay.forward_url() {
        info!("udp-relay: forwarding messages to {url}");
    }

    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Shutdown signal received");
                cancel_token.cancel();
            }
            Err(e) => error!("Unable to listen for shutdown signal: {e}"),
        }
    });

    let stats = relay.spin().await;
    info!(
        "udp-relay stopped: {} received, {} not UTF-8, {} forwarded, {} failed to forward",
        stats.received, stats.decode_failures, stats.forwarded, stats.forward_failures
    );

    ExitCode::SUCCESS
}
