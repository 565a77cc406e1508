// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Shared Access Signature tokens for the Event Hubs REST API.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use base64::{engine::general_purpose::STANDARD, Engine as _};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use url::form_urlencoded;

use crate::connection_string::Credential;

/// Lifetime of a generated token
pub const TOKEN_TTL: Duration = Duration::from_secs(3600);

/// Produces `Authorization` header values for a single resource URI.
#[derive(Clone)]
pub struct TokenProvider {
    credential: Credential,
    resource_uri: String,
}

impl TokenProvider {
    pub fn new(credential: Credential, resource_uri: String) -> Self {
        Self {
            credential,
            resource_uri,
        }
    }

    /// Token valid for [`TOKEN_TTL`] from now, or the pre-issued one.
    pub fn token(&self) -> String {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        self.token_at(now.as_secs() + TOKEN_TTL.as_secs())
    }

    pub fn token_at(&self, expiry: u64) -> String {
        match &self.credential {
            Credential::SharedAccessSignature(token) => token.clone(),
            Credential::SharedAccessKey { key_name, key } => {
                sign(&self.resource_uri, key_name, key, expiry)
            }
        }
    }
}

impl std::fmt::Debug for TokenProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "TokenProvider({})", self.resource_uri)
    }
}

fn encode(value: &str) -> String {
    form_urlencoded::byte_serialize(value.as_bytes()).collect()
}

/// `SharedAccessSignature sr=..&sig=..&se=..&skn=..` for `resource_uri`, expiring at `expiry`
/// (seconds since the epoch).
pub fn sign(resource_uri: &str, key_name: &str, key: &str, expiry: u64) -> String {
    let encoded_uri = encode(resource_uri);
    let string_to_sign = format!("{encoded_uri}\n{expiry}");

    // HMAC accepts keys of any length
    #[allow(clippy::expect_used)]
    let mut mac =
        Hmac::<Sha256>::new_from_slice(key.as_bytes()).expect("HMAC can take key of any size");
    mac.update(string_to_sign.as_bytes());
    let signature = STANDARD.encode(mac.finalize().into_bytes());

    format!(
        "SharedAccessSignature sr={}&sig={}&se={}&skn={}",
        encoded_uri,
        encode(&signature),
        expiry,
        key_name
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_layout() {
        let token = sign(
            "https://myns.servicebus.windows.net/telemetry",
            "send",
            "secret",
            1_700_000_000,
        );
        assert!(token.starts_with(
            "SharedAccessSignature sr=https%3A%2F%2Fmyns.servicebus.windows.net%2Ftelemetry&sig="
        ));
        assert!(token.ends_with("&se=1700000000&skn=send"));

        let sig = token
            .split('&')
            .find_map(|part| part.strip_prefix("sig="))
            .expect("sig missing");
        // base64 padding and symbols are percent-encoded
        assert!(!sig.contains('='));
        assert!(!sig.contains('+'));
        assert!(!sig.contains('/'));
    }

    #[test]
    fn test_sign_is_deterministic_and_key_dependent() {
        let uri = "https://ns/hub";
        assert_eq!(sign(uri, "k", "secret", 10), sign(uri, "k", "secret", 10));
        assert_ne!(sign(uri, "k", "secret", 10), sign(uri, "k", "other", 10));
        assert_ne!(sign(uri, "k", "secret", 10), sign(uri, "k", "secret", 11));
    }

    #[test]
    fn test_token_provider_pre_issued_signature() {
        let provider = TokenProvider::new(
            Credential::SharedAccessSignature("SharedAccessSignature sr=a".to_string()),
            "https://ns/hub".to_string(),
        );
        assert_eq!(provider.token(), "SharedAccessSignature sr=a");
    }

    #[test]
    fn test_token_provider_expiry_in_future() {
        let provider = TokenProvider::new(
            Credential::SharedAccessKey {
                key_name: "send".to_string(),
                key: "secret".to_string(),
            },
            "https://ns/hub".to_string(),
        );
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock before epoch")
            .as_secs();
        let token = provider.token();
        let expiry: u64 = token
            .split('&')
            .find_map(|part| part.strip_prefix("se="))
            .and_then(|se| se.parse().ok())
            .expect("se missing");
        assert!(expiry >= now + TOKEN_TTL.as_secs());
        assert!(expiry <= now + TOKEN_TTL.as_secs() + 5);
    }
}
