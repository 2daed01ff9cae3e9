//! Configuration Types
//!
//! Identity-provider binding and endpoint configuration.

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Minimal identity-provider binding; one instance per token provider.
#[derive(Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizationConfig {
    /// Authorization server base URL (UAA URL or OIDC issuer).
    #[serde(alias = "issuerUrl", alias = "url")]
    pub uaa_url: String,
    /// Client identifier.
    pub client_id: String,
    /// Client secret (confidential clients only).
    #[serde(default)]
    pub client_secret: Option<SecretString>,
    /// Refresh token carried over from a previous session.
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Access token carried over from a previous session.
    #[serde(default, alias = "authorizationToken")]
    pub access_token: Option<String>,
}

impl AuthorizationConfig {
    /// Create a config with the two always-required fields.
    pub fn new(uaa_url: impl Into<String>, client_id: impl Into<String>) -> Self {
        Self {
            uaa_url: uaa_url.into(),
            client_id: client_id.into(),
            ..Default::default()
        }
    }

    /// Set client secret.
    pub fn with_client_secret(mut self, secret: impl Into<String>) -> Self {
        self.client_secret = Some(SecretString::new(secret.into()));
        self
    }

    /// Set refresh token.
    pub fn with_refresh_token(mut self, refresh_token: impl Into<String>) -> Self {
        self.refresh_token = Some(refresh_token.into());
        self
    }

    /// Set access token.
    pub fn with_access_token(mut self, access_token: impl Into<String>) -> Self {
        self.access_token = Some(access_token.into());
        self
    }

    /// Base URL without trailing slash.
    pub fn base_url(&self) -> &str {
        self.uaa_url.trim_end_matches('/')
    }

    /// Client secret, if configured.
    pub fn secret(&self) -> Option<&str> {
        self.client_secret.as_ref().map(|s| s.expose_secret().as_str())
    }

    /// Check the identity fields plus any flow-specific extras.
    ///
    /// Every missing field is reported, not just the first.
    pub fn validate(&self, extra: &[(&str, Option<&str>)]) -> Result<(), ValidationError> {
        let mut fields: Vec<(&str, Option<&str>)> = vec![
            ("uaaUrl", Some(self.uaa_url.as_str())),
            ("clientId", Some(self.client_id.as_str())),
        ];
        fields.extend_from_slice(extra);
        ValidationError::check(&fields)
    }
}

impl std::fmt::Debug for AuthorizationConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthorizationConfig")
            .field("uaa_url", &self.uaa_url)
            .field("client_id", &self.client_id)
            .field("client_secret", &self.client_secret.as_ref().map(|_| "[REDACTED]"))
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "[REDACTED]"))
            .field("access_token", &self.access_token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

/// Explicitly configured endpoints; unset ones are discovered or defaulted.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderEndpoints {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authorization_endpoint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_endpoint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_authorization_endpoint: Option<String>,
}

/// Client authentication method at the token endpoint.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientAuthMethod {
    /// HTTP Basic Authentication header.
    #[default]
    ClientSecretBasic,
    /// client_id and client_secret in request body.
    ClientSecretPost,
    /// No client authentication (public client).
    None,
}

/// Grant kind that produced a token.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthType {
    AuthorizationCode,
    DeviceCode,
    ClientCredentials,
    Password,
    TokenExchange,
    Saml2Bearer,
    Saml2Pure,
}

impl AuthType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AuthorizationCode => "authorization_code",
            Self::DeviceCode => "device_code",
            Self::ClientCredentials => "client_credentials",
            Self::Password => "password",
            Self::TokenExchange => "token_exchange",
            Self::Saml2Bearer => "saml2_bearer",
            Self::Saml2Pure => "saml2_pure",
        }
    }
}

impl std::fmt::Display for AuthType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Wire value of `grant_type` at the token endpoint.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GrantType {
    AuthorizationCode,
    RefreshToken,
    ClientCredentials,
    Password,
    DeviceCode,
    TokenExchange,
    Saml2Bearer,
}

impl GrantType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AuthorizationCode => "authorization_code",
            Self::RefreshToken => "refresh_token",
            Self::ClientCredentials => "client_credentials",
            Self::Password => "password",
            Self::DeviceCode => "urn:ietf:params:oauth:grant-type:device_code",
            Self::TokenExchange => "urn:ietf:params:oauth:grant-type:token-exchange",
            Self::Saml2Bearer => "urn:ietf:params:oauth:grant-type:saml2-bearer",
        }
    }
}

/// OIDC Discovery document.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DiscoveryDocument {
    /// Issuer identifier.
    #[serde(default)]
    pub issuer: String,
    /// Authorization endpoint URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authorization_endpoint: Option<String>,
    /// Token endpoint URL (required).
    pub token_endpoint: String,
    /// Device authorization endpoint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_authorization_endpoint: Option<String>,
    /// Userinfo endpoint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub userinfo_endpoint: Option<String>,
    /// JWKS URI.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jwks_uri: Option<String>,
}

/// Default HTTP timeout.
pub const DEFAULT_TIMEOUT_MS: u64 = 30000;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grant_type_as_str() {
        assert_eq!(GrantType::AuthorizationCode.as_str(), "authorization_code");
        assert_eq!(GrantType::ClientCredentials.as_str(), "client_credentials");
        assert_eq!(
            GrantType::DeviceCode.as_str(),
            "urn:ietf:params:oauth:grant-type:device_code"
        );
        assert_eq!(
            GrantType::Saml2Bearer.as_str(),
            "urn:ietf:params:oauth:grant-type:saml2-bearer"
        );
    }

    #[test]
    fn test_config_from_camel_case_json() {
        let json = r#"{
            "uaaUrl": "https://uaa.example.com/",
            "clientId": "cli",
            "clientSecret": "shh",
            "refreshToken": "rt"
        }"#;

        let config: AuthorizationConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.base_url(), "https://uaa.example.com");
        assert_eq!(config.secret(), Some("shh"));
        assert_eq!(config.refresh_token.as_deref(), Some("rt"));
        assert!(!format!("{config:?}").contains("shh"));
    }

    #[test]
    fn test_validate_reports_all_missing() {
        let config = AuthorizationConfig::default();
        let err = config.validate(&[("clientSecret", None)]).unwrap_err();
        assert_eq!(err.missing, vec!["uaaUrl", "clientId", "clientSecret"]);
    }

    #[test]
    fn test_discovery_document_requires_token_endpoint() {
        let json = r#"{"issuer": "https://idp.example.com"}"#;
        assert!(serde_json::from_str::<DiscoveryDocument>(json).is_err());

        let json = r#"{"issuer": "https://idp.example.com", "token_endpoint": "https://idp.example.com/token"}"#;
        let doc: DiscoveryDocument = serde_json::from_str(json).unwrap();
        assert!(doc.authorization_endpoint.is_none());
    }
}
