//! OIDC Discovery
//!
//! Fetches `.well-known/openid-configuration` documents and memoizes them per
//! normalized URL. Entries never expire; a failed fetch leaves no entry.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock};
use tokio::sync::OnceCell;
use tracing::{debug, trace};

use crate::core::transport::{HttpRequest, HttpTransport};
use crate::error::{ConfigurationError, CredentialResult, ProtocolError};
use crate::types::DiscoveryDocument;

const WELL_KNOWN_SUFFIX: &str = "/.well-known/openid-configuration";

/// Discovery document cache with per-URL single-flight.
#[derive(Default)]
pub struct DiscoveryCache {
    entries: Mutex<HashMap<String, Arc<OnceCell<DiscoveryDocument>>>>,
}

impl DiscoveryCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Process-wide cache used when a provider is not given one.
    pub fn shared() -> Arc<DiscoveryCache> {
        static SHARED: OnceLock<Arc<DiscoveryCache>> = OnceLock::new();
        SHARED.get_or_init(|| Arc::new(DiscoveryCache::new())).clone()
    }

    /// Normalize an issuer or discovery URL to its discovery form.
    pub fn normalize_url(issuer_or_discovery_url: &str) -> String {
        let trimmed = issuer_or_discovery_url.trim().trim_end_matches('/');
        if trimmed.ends_with(WELL_KNOWN_SUFFIX) {
            trimmed.to_string()
        } else {
            format!("{}{}", trimmed, WELL_KNOWN_SUFFIX)
        }
    }

    /// Return the document for `issuer_or_discovery_url`, fetching at most once.
    pub async fn discover(
        &self,
        transport: &dyn HttpTransport,
        issuer_or_discovery_url: &str,
    ) -> CredentialResult<DiscoveryDocument> {
        let url = Self::normalize_url(issuer_or_discovery_url);
        let cell = {
            let mut entries = self
                .entries
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            entries.entry(url.clone()).or_default().clone()
        };

        if let Some(document) = cell.get() {
            trace!(url = %url, "discovery cache hit");
            return Ok(document.clone());
        }

        let document = cell
            .get_or_try_init(|| fetch_document(transport, &url))
            .await?;
        Ok(document.clone())
    }

    /// Number of cached documents.
    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .map(|entries| entries.values().filter(|c| c.initialized()).count())
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every cached document.
    pub fn clear(&self) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.clear();
        }
    }
}

async fn fetch_document(
    transport: &dyn HttpTransport,
    url: &str,
) -> CredentialResult<DiscoveryDocument> {
    debug!(url = %url, "fetching discovery document");

    let response = transport.send(HttpRequest::get(url)).await?;
    if !response.is_success() {
        return Err(ConfigurationError::DiscoveryFailed {
            message: format!("{} returned HTTP {}", url, response.status),
        }
        .into());
    }

    let value: serde_json::Value =
        serde_json::from_str(&response.body).map_err(|e| ProtocolError::InvalidJson {
            message: e.to_string(),
        })?;

    let has_token_endpoint = value
        .get("token_endpoint")
        .and_then(|v| v.as_str())
        .is_some_and(|s| !s.is_empty());
    if !has_token_endpoint {
        return Err(ConfigurationError::DiscoveryFailed {
            message: format!("{} has no token_endpoint", url),
        }
        .into());
    }

    serde_json::from_value(value).map_err(|e| {
        ProtocolError::InvalidJson {
            message: e.to_string(),
        }
        .into()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::transport::MockHttpTransport;
    use serde_json::json;

    fn document(issuer: &str) -> serde_json::Value {
        json!({
            "issuer": issuer,
            "authorization_endpoint": format!("{issuer}/authorize"),
            "token_endpoint": format!("{issuer}/token"),
            "device_authorization_endpoint": format!("{issuer}/device"),
            "jwks_uri": format!("{issuer}/keys"),
        })
    }

    #[test]
    fn test_normalize_url() {
        assert_eq!(
            DiscoveryCache::normalize_url("https://idp.example.com/"),
            "https://idp.example.com/.well-known/openid-configuration"
        );
        assert_eq!(
            DiscoveryCache::normalize_url(
                "https://idp.example.com/.well-known/openid-configuration"
            ),
            "https://idp.example.com/.well-known/openid-configuration"
        );
    }

    #[tokio::test]
    async fn test_fetches_once_per_normalized_url() {
        let transport = MockHttpTransport::new();
        transport.queue_json_response(200, document("https://idp.example.com"));
        let cache = DiscoveryCache::new();

        for url in [
            "https://idp.example.com",
            "https://idp.example.com/",
            "https://idp.example.com/.well-known/openid-configuration",
        ] {
            let doc = cache.discover(&transport, url).await.unwrap();
            assert_eq!(doc.token_endpoint, "https://idp.example.com/token");
        }

        assert_eq!(transport.request_count(), 1);
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn test_missing_token_endpoint_fails_and_is_not_cached() {
        let transport = MockHttpTransport::new();
        transport
            .queue_json_response(200, json!({"issuer": "https://idp.example.com"}))
            .queue_json_response(200, document("https://idp.example.com"));
        let cache = DiscoveryCache::new();

        let err = cache
            .discover(&transport, "https://idp.example.com")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("token_endpoint"));
        assert!(cache.is_empty());

        let doc = cache
            .discover(&transport, "https://idp.example.com")
            .await
            .unwrap();
        assert_eq!(
            doc.device_authorization_endpoint.as_deref(),
            Some("https://idp.example.com/device")
        );
        assert_eq!(transport.request_count(), 2);
    }

    #[tokio::test]
    async fn test_concurrent_lookups_share_one_fetch() {
        let transport = Arc::new(MockHttpTransport::new());
        transport.queue_json_response(200, document("https://idp.example.com"));
        let cache = Arc::new(DiscoveryCache::new());

        let lookups = (0..8).map(|_| {
            let cache = cache.clone();
            let transport = transport.clone();
            async move {
                cache
                    .discover(transport.as_ref(), "https://idp.example.com")
                    .await
            }
        });
        let results = futures::future::join_all(lookups).await;

        assert!(results.iter().all(|r| r.is_ok()));
        assert_eq!(transport.request_count(), 1);
    }

    #[tokio::test]
    async fn test_http_error_is_discovery_failure() {
        let transport = MockHttpTransport::new();
        transport.queue_json_response(404, json!({}));
        let cache = DiscoveryCache::new();

        let err = cache
            .discover(&transport, "https://idp.example.com")
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "CRED_CONFIG");
    }
}
