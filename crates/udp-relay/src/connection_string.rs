// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Parsing of Event Hubs connection strings.
//!
//! A connection string is a `;`-separated list of `key=value` pairs, for example
//! `Endpoint=sb://myns.servicebus.windows.net/;SharedAccessKeyName=send;SharedAccessKey=abc=;EntityPath=telemetry`.
//! Keys are matched case-insensitively. Values may themselves contain `=` (base64 keys do).

use crate::errors::ConnectionStringError;

const ENDPOINT_KEY: &str = "Endpoint";
const SHARED_ACCESS_KEY_NAME_KEY: &str = "SharedAccessKeyName";
const SHARED_ACCESS_KEY_KEY: &str = "SharedAccessKey";
const SHARED_ACCESS_SIGNATURE_KEY: &str = "SharedAccessSignature";
const ENTITY_PATH_KEY: &str = "EntityPath";

/// Credential carried by a connection string.
#[derive(Clone, PartialEq, Eq)]
pub enum Credential {
    /// Named key used to sign a fresh token for each request
    SharedAccessKey { key_name: String, key: String },
    /// Pre-issued token, sent verbatim
    SharedAccessSignature(String),
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SharedAccessKey { key_name, .. } => f
                .debug_struct("SharedAccessKey")
                .field("key_name", key_name)
                .finish_non_exhaustive(),
            Self::SharedAccessSignature(_) => write!(f, "SharedAccessSignature(..)"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionString {
    /// Base URL of the namespace, always `http://` or `https://`, no trailing slash
    pub endpoint: String,
    /// Host of the namespace, used as the signed resource
    pub host: String,
    pub credential: Credential,
    pub entity_path: Option<String>,
}

impl ConnectionString {
    pub fn parse(raw: &str) -> Result<Self, ConnectionStringError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(ConnectionStringError::Empty);
        }

        let mut endpoint = None;
        let mut key_name = None;
        let mut key = None;
        let mut signature = None;
        let mut entity_path = None;

        for segment in raw.split(';').map(str::trim).filter(|s| !s.is_empty()) {
            let (name, value) = segment
                .split_once('=')
                .ok_or_else(|| ConnectionStringError::MalformedSegment(segment.to_string()))?;
            let value = value.trim().to_string();
            match name.trim() {
                n if n.eq_ignore_ascii_case(ENDPOINT_KEY) => endpoint = Some(value),
                n if n.eq_ignore_ascii_case(SHARED_ACCESS_KEY_NAME_KEY) => key_name = Some(value),
                n if n.eq_ignore_ascii_case(SHARED_ACCESS_KEY_KEY) => key = Some(value),
                n if n.eq_ignore_ascii_case(SHARED_ACCESS_SIGNATURE_KEY) => {
                    signature = Some(value)
                }
                n if n.eq_ignore_ascii_case(ENTITY_PATH_KEY) => {
                    entity_path = Some(value).filter(|v| !v.is_empty())
                }
                other => tracing::debug!("Ignoring unknown connection string key '{}'", other),
            }
        }

        let endpoint = endpoint.ok_or(ConnectionStringError::MissingKey(ENDPOINT_KEY))?;
        let (endpoint, host) = normalize_endpoint(&endpoint)?;

        let credential = match (signature, key_name, key) {
            (Some(signature), _, _) => Credential::SharedAccessSignature(signature),
            (None, Some(key_name), Some(key)) => Credential::SharedAccessKey { key_name, key },
            (None, None, _) => {
                return Err(ConnectionStringError::MissingKey(SHARED_ACCESS_KEY_NAME_KEY))
            }
            (None, Some(_), None) => {
                return Err(ConnectionStringError::MissingKey(SHARED_ACCESS_KEY_KEY))
            }
        };

        Ok(Self {
            endpoint,
            host,
            credential,
            entity_path,
        })
    }

    /// Resolves the hub to send to from an explicitly configured name and the `EntityPath`.
    ///
    /// An empty `given` name counts as absent. When both are present they must agree.
    pub fn event_hub_name(&self, given: Option<&str>) -> Result<String, ConnectionStringError> {
        let given = given.map(str::trim).filter(|g| !g.is_empty());
        match (given, self.entity_path.as_deref()) {
            (Some(given), Some(entity_path)) if given != entity_path => {
                Err(ConnectionStringError::EventHubNameMismatch {
                    given: given.to_string(),
                    entity_path: entity_path.to_string(),
                })
            }
            (Some(name), _) | (None, Some(name)) => Ok(name.to_string()),
            (None, None) => Err(ConnectionStringError::MissingEventHubName),
        }
    }
}

/// Maps `sb://host/` to `https://host`; `http(s)://` endpoints are kept as they are.
fn normalize_endpoint(endpoint: &str) -> Result<(String, String), ConnectionStringError> {
    let invalid = || ConnectionStringError::InvalidEndpoint(endpoint.to_string());

    let (scheme, rest) = endpoint.split_once("://").ok_or_else(invalid)?;
    let scheme = match scheme.to_ascii_lowercase().as_str() {
        "sb" | "https" => "https",
        "http" => "http",
        _ => return Err(invalid()),
    };
    let host = rest.trim_end_matches('/');
    if host.is_empty() || host.contains('/') {
        return Err(invalid());
    }

    Ok((format!("{scheme}://{host}"), host.to_string()))
}
