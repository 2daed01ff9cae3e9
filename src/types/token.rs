//! Token Types
//!
//! Wire token response, the immutable result handed to callers, and the
//! cached state a provider keeps between calls.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::AuthType;

/// Token response from the authorization server.
#[derive(Clone, Debug, Deserialize)]
pub struct TokenResponse {
    /// Access token; checked for presence by the caller of the token endpoint.
    #[serde(default)]
    pub access_token: Option<String>,
    /// Token type (usually "bearer").
    #[serde(default = "default_token_type")]
    pub token_type: String,
    /// Expires in seconds.
    #[serde(default)]
    pub expires_in: Option<u64>,
    /// Refresh token.
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Granted scopes.
    #[serde(default)]
    pub scope: Option<String>,
    /// ID token (OIDC).
    #[serde(default)]
    pub id_token: Option<String>,
    /// Additional fields.
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

fn default_token_type() -> String {
    "bearer".to_string()
}

/// Kind of credential in `authorization_token`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Jwt,
    Saml,
}

/// Result of every login or refresh.
#[derive(Clone, PartialEq, Eq)]
pub struct TokenResult {
    /// Bearer credential (access token, or session cookie for SAML2-pure).
    pub authorization_token: String,
    /// Refresh token, when the grant issues one.
    pub refresh_token: Option<String>,
    /// Grant kind that produced the token.
    pub auth_type: AuthType,
    /// Lifetime in seconds, as reported by the server.
    pub expires_in: Option<u64>,
    /// Absolute expiry, epoch milliseconds.
    pub expires_at: Option<i64>,
    /// Credential kind.
    pub token_type: Option<TokenType>,
}

impl TokenResult {
    /// Create a result with only the mandatory fields.
    pub fn new(authorization_token: impl Into<String>, auth_type: AuthType) -> Self {
        Self {
            authorization_token: authorization_token.into(),
            refresh_token: None,
            auth_type,
            expires_in: None,
            expires_at: None,
            token_type: None,
        }
    }

    /// Build from a token endpoint response whose access token is known.
    pub fn from_response(
        access_token: String,
        response: &TokenResponse,
        auth_type: AuthType,
    ) -> Self {
        Self {
            authorization_token: access_token,
            refresh_token: response.refresh_token.clone(),
            auth_type,
            expires_in: response.expires_in,
            expires_at: None,
            token_type: Some(TokenType::Jwt),
        }
    }

    /// Drop any refresh token (grants that never issue one).
    pub fn without_refresh_token(mut self) -> Self {
        self.refresh_token = None;
        self
    }

    /// Format as Authorization header value.
    pub fn authorization_header(&self) -> String {
        match self.token_type {
            Some(TokenType::Saml) => self.authorization_token.clone(),
            _ => format!("Bearer {}", self.authorization_token),
        }
    }
}

impl std::fmt::Debug for TokenResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenResult")
            .field("authorization_token", &"[REDACTED]")
            .field(
                "refresh_token",
                &self.refresh_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("auth_type", &self.auth_type)
            .field("expires_in", &self.expires_in)
            .field("expires_at", &self.expires_at)
            .field("token_type", &self.token_type)
            .finish()
    }
}

/// Token state held by a provider between calls.
///
/// If `authorization_token` is set without `expires_at`, the token is never
/// considered cache-valid.
#[derive(Clone, Default)]
pub struct CachedTokenState {
    pub authorization_token: Option<String>,
    pub refresh_token: Option<String>,
    /// Epoch milliseconds.
    pub expires_at: Option<i64>,
    pub token_type: Option<TokenType>,
}

impl CachedTokenState {
    /// Whether a refresh token is held.
    pub fn has_refresh_token(&self) -> bool {
        self.refresh_token.is_some()
    }
}

impl std::fmt::Debug for CachedTokenState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CachedTokenState")
            .field(
                "authorization_token",
                &self.authorization_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field(
                "refresh_token",
                &self.refresh_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("expires_at", &self.expires_at)
            .field("token_type", &self.token_type)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_response_parsing() {
        let json = r#"{
            "access_token": "test-token",
            "token_type": "bearer",
            "expires_in": 3600,
            "refresh_token": "test-refresh",
            "scope": "openid profile",
            "jti": "abc"
        }"#;

        let response: TokenResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.access_token.as_deref(), Some("test-token"));
        assert_eq!(response.expires_in, Some(3600));
        assert_eq!(response.refresh_token.as_deref(), Some("test-refresh"));
        assert_eq!(response.extra["jti"], "abc");
    }

    #[test]
    fn test_token_response_without_access_token_parses() {
        let response: TokenResponse = serde_json::from_str(r#"{"expires_in": 10}"#).unwrap();
        assert!(response.access_token.is_none());
        assert_eq!(response.token_type, "bearer");
    }

    #[test]
    fn test_result_debug_is_redacted() {
        let mut result = TokenResult::new("secret-token", AuthType::ClientCredentials);
        result.refresh_token = Some("secret-refresh".to_string());
        let debug = format!("{result:?}");
        assert!(!debug.contains("secret-token"));
        assert!(!debug.contains("secret-refresh"));
        assert_eq!(result.authorization_header(), "Bearer secret-token");
    }

    #[test]
    fn test_saml_authorization_header_is_raw_cookie() {
        let mut result = TokenResult::new("SESSION=abc", AuthType::Saml2Pure);
        result.token_type = Some(TokenType::Saml);
        assert_eq!(result.authorization_header(), "SESSION=abc");
    }
}
