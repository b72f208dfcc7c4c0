//! Proof-of-origin token client
//!
//! Tokens are minted by an external HTTP oracle and bound to a content
//! binding: the video id for player tokens, the visitor id or session id for
//! GVS tokens. Minted tokens are cached per binding until their expiry; an
//! expired entry is treated as absent and regenerated lazily on next demand.

use crate::error::RvrError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::RwLock;
use std::time::Duration;
use tracing::debug;

/// Default oracle endpoint
pub const DEFAULT_ORACLE_URL: &str = "http://127.0.0.1:4416";

/// Fallback token lifetime when the oracle reports no expiry
const DEFAULT_TOKEN_TTL: Duration = Duration::from_secs(5 * 60 * 60);

/// Per-request timeout for oracle calls
const ORACLE_TIMEOUT: Duration = Duration::from_secs(30);

fn is_false(b: &bool) -> bool {
    !b
}

/// Request body for the oracle's `/get_pot` endpoint
#[derive(Debug, Clone, Default, Serialize)]
pub struct TokenRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_binding: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proxy: Option<String>,
    #[serde(skip_serializing_if = "is_false")]
    pub bypass_cache: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_address: Option<String>,
    #[serde(skip_serializing_if = "is_false")]
    pub disable_tls_verification: bool,
    #[serde(skip_serializing_if = "is_false")]
    pub disable_innertube: bool,
}

/// Response body from `/get_pot`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TokenResponse {
    pub po_token: String,
    pub content_binding: String,
    pub expires_at: Option<DateTime<Utc>>,
    pub error: Option<String>,
}

/// Response body from `/ping`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PingResponse {
    pub server_uptime: f64,
    pub version: String,
}

/// A source of proof-of-origin tokens.
///
/// Polymorphic over the capability set {name, availability, token request}:
/// the oracle-backed source talks to the HTTP service, the static source
/// hands out a preconfigured token.
#[async_trait]
pub trait TokenSource: Send + Sync {
    fn name(&self) -> &'static str;

    async fn is_available(&self) -> bool;

    /// Mint a token for the binding; returns the token and its expiry when
    /// the source reports one
    async fn request_token(
        &self,
        binding: &str,
    ) -> Result<(String, Option<DateTime<Utc>>), RvrError>;
}

/// Oracle-backed token source over HTTP
pub struct OracleTokenSource {
    server_url: String,
    http: reqwest::Client,
}

impl OracleTokenSource {
    pub fn new(server_url: &str) -> Self {
        let server_url = if server_url.is_empty() {
            DEFAULT_ORACLE_URL
        } else {
            server_url
        };

        Self {
            server_url: server_url.trim_end_matches('/').to_string(),
            http: reqwest::Client::builder()
                .timeout(ORACLE_TIMEOUT)
                .build()
                .unwrap_or_default(),
        }
    }

    /// Probe the oracle's `/ping` endpoint
    pub async fn ping(&self) -> Result<PingResponse, RvrError> {
        let resp = self
            .http
            .get(format!("{}/ping", self.server_url))
            .send()
            .await
            .map_err(|e| RvrError::TokenUnavailable(format!("oracle unreachable: {}", e)))?;

        if !resp.status().is_success() {
            return Err(RvrError::TokenUnavailable(format!(
                "oracle returned status {}",
                resp.status()
            )));
        }

        resp.json::<PingResponse>()
            .await
            .map_err(|e| RvrError::TokenUnavailable(format!("bad ping response: {}", e)))
    }
}

#[async_trait]
impl TokenSource for OracleTokenSource {
    fn name(&self) -> &'static str {
        "oracle"
    }

    async fn is_available(&self) -> bool {
        self.ping().await.is_ok()
    }

    async fn request_token(
        &self,
        binding: &str,
    ) -> Result<(String, Option<DateTime<Utc>>), RvrError> {
        let body = TokenRequest {
            content_binding: Some(binding.to_string()),
            ..Default::default()
        };

        let resp = self
            .http
            .post(format!("{}/get_pot", self.server_url))
            .json(&body)
            .send()
            .await
            .map_err(|e| RvrError::TokenUnavailable(format!("oracle request failed: {}", e)))?;

        if !resp.status().is_success() {
            return Err(RvrError::TokenUnavailable(format!(
                "oracle returned status {}",
                resp.status()
            )));
        }

        let token_resp: TokenResponse = resp
            .json()
            .await
            .map_err(|e| RvrError::TokenUnavailable(format!("bad oracle response: {}", e)))?;

        if let Some(error) = token_resp.error {
            return Err(RvrError::TokenUnavailable(format!("oracle error: {}", error)));
        }
        if token_resp.po_token.is_empty() {
            return Err(RvrError::TokenUnavailable(
                "oracle returned empty token".to_string(),
            ));
        }

        Ok((token_resp.po_token, token_resp.expires_at))
    }
}

/// Statically configured token source; useful when the caller mints tokens
/// out of band
pub struct StaticTokenSource {
    token: String,
}

impl StaticTokenSource {
    pub fn new(token: &str) -> Self {
        Self {
            token: token.to_string(),
        }
    }
}

#[async_trait]
impl TokenSource for StaticTokenSource {
    fn name(&self) -> &'static str {
        "static"
    }

    async fn is_available(&self) -> bool {
        !self.token.is_empty()
    }

    async fn request_token(
        &self,
        _binding: &str,
    ) -> Result<(String, Option<DateTime<Utc>>), RvrError> {
        if self.token.is_empty() {
            return Err(RvrError::TokenUnavailable("no static token set".to_string()));
        }
        Ok((self.token.clone(), None))
    }
}

#[derive(Debug, Clone)]
struct CachedToken {
    token: String,
    expires_at: DateTime<Utc>,
}

/// Token provider with a per-binding cache in front of a [`TokenSource`]
pub struct PotProvider {
    source: Box<dyn TokenSource>,
    cache: RwLock<HashMap<String, CachedToken>>,
    ttl: Duration,
}

impl PotProvider {
    /// Create an oracle-backed provider; an empty URL selects the default
    /// endpoint
    pub fn new(server_url: &str) -> Self {
        Self::with_source(Box::new(OracleTokenSource::new(server_url)))
    }

    /// Create a provider over an arbitrary token source
    pub fn with_source(source: Box<dyn TokenSource>) -> Self {
        Self {
            source,
            cache: RwLock::new(HashMap::new()),
            ttl: DEFAULT_TOKEN_TTL,
        }
    }

    /// Name of the underlying source
    pub fn source_name(&self) -> &'static str {
        self.source.name()
    }

    /// Whether the underlying source can currently mint tokens
    pub async fn is_available(&self) -> bool {
        self.source.is_available().await
    }

    /// Get a token bound to the given content binding, serving from cache
    /// while the cached entry is unexpired
    pub async fn get_token(&self, binding: &str) -> Result<String, RvrError> {
        {
            let cache = self.cache.read().expect("token cache poisoned");
            if let Some(cached) = cache.get(binding) {
                if Utc::now() < cached.expires_at {
                    return Ok(cached.token.clone());
                }
            }
        }

        let (token, expires_at) = self.source.request_token(binding).await?;
        let expires_at = expires_at
            .unwrap_or_else(|| Utc::now() + chrono::Duration::seconds(self.ttl.as_secs() as i64));

        debug!(
            "minted PO token for binding {} (expires {})",
            binding, expires_at
        );

        {
            let mut cache = self.cache.write().expect("token cache poisoned");
            cache.insert(
                binding.to_string(),
                CachedToken {
                    token: token.clone(),
                    expires_at,
                },
            );
        }

        Ok(token)
    }

    /// Get a GVS-context token.
    ///
    /// Binds to the session id (first `||` component of `data_sync_id`) when
    /// one is present, otherwise to the visitor identifier.
    pub async fn get_gvs_token(
        &self,
        visitor_data: &str,
        data_sync_id: &str,
    ) -> Result<String, RvrError> {
        let binding = if data_sync_id.is_empty() {
            visitor_data
        } else {
            extract_session_id(data_sync_id)
        };

        self.get_token(binding).await
    }

    /// Drop every cached token
    pub fn invalidate(&self) {
        self.cache.write().expect("token cache poisoned").clear();
    }

    /// Drop the cached token for one binding
    pub fn invalidate_for(&self, binding: &str) {
        self.cache
            .write()
            .expect("token cache poisoned")
            .remove(binding);
    }
}

/// Extract the session id from a dataSyncId (`A||B||…` ⇒ `A`)
pub fn extract_session_id(data_sync_id: &str) -> &str {
    match data_sync_id.split("||").next() {
        Some(first) if !first.is_empty() => first,
        _ => data_sync_id,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct CountingSource {
        requests: AtomicUsize,
        bindings: Mutex<Vec<String>>,
        expires_at: Option<DateTime<Utc>>,
        fail: bool,
    }

    impl CountingSource {
        fn new() -> Self {
            Self {
                requests: AtomicUsize::new(0),
                bindings: Mutex::new(Vec::new()),
                expires_at: None,
                fail: false,
            }
        }
    }

    #[async_trait]
    impl TokenSource for CountingSource {
        fn name(&self) -> &'static str {
            "counting"
        }

        async fn is_available(&self) -> bool {
            !self.fail
        }

        async fn request_token(
            &self,
            binding: &str,
        ) -> Result<(String, Option<DateTime<Utc>>), RvrError> {
            if self.fail {
                return Err(RvrError::TokenUnavailable("down".to_string()));
            }
            let n = self.requests.fetch_add(1, Ordering::SeqCst);
            self.bindings.lock().unwrap().push(binding.to_string());
            Ok((format!("token-{}-{}", binding, n), self.expires_at))
        }
    }

    #[tokio::test]
    async fn test_cache_hit_issues_one_request() {
        let provider = PotProvider::with_source(Box::new(CountingSource::new()));

        let first = provider.get_token("dQw4w9WgXcQ").await.unwrap();
        let second = provider.get_token("dQw4w9WgXcQ").await.unwrap();

        assert_eq!(first, second);
        assert_eq!(first, "token-dQw4w9WgXcQ-0");
    }

    #[tokio::test]
    async fn test_distinct_bindings_are_distinct_entries() {
        let provider = PotProvider::with_source(Box::new(CountingSource::new()));

        let a = provider.get_token("bindingA").await.unwrap();
        let b = provider.get_token("bindingB").await.unwrap();
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn test_expired_entry_is_regenerated() {
        let mut source = CountingSource::new();
        source.expires_at = Some(Utc::now() - chrono::Duration::hours(1));
        let provider = PotProvider::with_source(Box::new(source));

        let first = provider.get_token("binding").await.unwrap();
        let second = provider.get_token("binding").await.unwrap();

        // The first token was already expired when cached
        assert_ne!(first, second);
    }

    #[tokio::test]
    async fn test_invalidate_for_drops_one_entry() {
        let provider = PotProvider::with_source(Box::new(CountingSource::new()));

        let a1 = provider.get_token("a").await.unwrap();
        let b1 = provider.get_token("b").await.unwrap();

        provider.invalidate_for("a");

        let a2 = provider.get_token("a").await.unwrap();
        let b2 = provider.get_token("b").await.unwrap();

        assert_ne!(a1, a2);
        assert_eq!(b1, b2);
    }

    #[tokio::test]
    async fn test_invalidate_drops_everything() {
        let provider = PotProvider::with_source(Box::new(CountingSource::new()));

        let a1 = provider.get_token("a").await.unwrap();
        provider.invalidate();
        let a2 = provider.get_token("a").await.unwrap();
        assert_ne!(a1, a2);
    }

    #[tokio::test]
    async fn test_gvs_binding_prefers_session_id() {
        let provider = PotProvider::with_source(Box::new(CountingSource::new()));

        let token = provider
            .get_gvs_token("visitor123", "SESSION||rest||more")
            .await
            .unwrap();
        assert!(token.starts_with("token-SESSION-"));

        let token = provider.get_gvs_token("visitor123", "").await.unwrap();
        assert!(token.starts_with("token-visitor123-"));
    }

    #[tokio::test]
    async fn test_failing_source_surfaces_token_unavailable() {
        let mut source = CountingSource::new();
        source.fail = true;
        let provider = PotProvider::with_source(Box::new(source));

        assert!(!provider.is_available().await);
        let err = provider.get_token("x").await.unwrap_err();
        assert!(matches!(err, RvrError::TokenUnavailable(_)));
    }

    #[tokio::test]
    async fn test_static_source() {
        let provider = PotProvider::with_source(Box::new(StaticTokenSource::new("FIXED")));
        assert!(provider.is_available().await);
        assert_eq!(provider.source_name(), "static");
        assert_eq!(provider.get_token("any").await.unwrap(), "FIXED");

        let empty = PotProvider::with_source(Box::new(StaticTokenSource::new("")));
        assert!(!empty.is_available().await);
    }

    #[test]
    fn test_extract_session_id() {
        assert_eq!(extract_session_id("A||B||C"), "A");
        assert_eq!(extract_session_id("solo"), "solo");
        assert_eq!(extract_session_id("||tail"), "||tail");
        assert_eq!(extract_session_id(""), "");
    }

    #[test]
    fn test_token_request_omits_defaults() {
        let body = TokenRequest {
            content_binding: Some("abc".to_string()),
            ..Default::default()
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json, serde_json::json!({"content_binding": "abc"}));
    }

    #[test]
    fn test_token_response_wire_names() {
        let json = r#"{
            "poToken": "tok",
            "contentBinding": "abc",
            "expiresAt": "2026-08-02T12:00:00Z"
        }"#;
        let resp: TokenResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.po_token, "tok");
        assert_eq!(resp.content_binding, "abc");
        assert!(resp.expires_at.is_some());
        assert!(resp.error.is_none());
    }
}
