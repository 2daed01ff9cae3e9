//! Configuration Builder
//!
//! Fluent builder for [`AuthorizationConfig`].

use secrecy::SecretString;

use crate::error::{ConfigurationError, CredentialResult};
use crate::types::AuthorizationConfig;

/// Authorization config builder.
#[derive(Default)]
pub struct AuthorizationConfigBuilder {
    uaa_url: Option<String>,
    client_id: Option<String>,
    client_secret: Option<SecretString>,
    refresh_token: Option<String>,
    access_token: Option<String>,
    require_secret: bool,
}

impl AuthorizationConfigBuilder {
    /// Create new configuration builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the UAA URL or OIDC issuer.
    pub fn uaa_url(mut self, url: impl Into<String>) -> Self {
        self.uaa_url = Some(url.into());
        self
    }

    /// Alias of [`uaa_url`](Self::uaa_url) for OIDC issuers.
    pub fn issuer_url(self, url: impl Into<String>) -> Self {
        self.uaa_url(url)
    }

    /// Set client ID.
    pub fn client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = Some(client_id.into());
        self
    }

    /// Set client secret.
    pub fn client_secret(mut self, client_secret: impl Into<String>) -> Self {
        self.client_secret = Some(SecretString::new(client_secret.into()));
        self
    }

    /// Seed with a refresh token from an earlier session.
    pub fn refresh_token(mut self, refresh_token: impl Into<String>) -> Self {
        self.refresh_token = Some(refresh_token.into());
        self
    }

    /// Seed with an access token from an earlier session.
    pub fn access_token(mut self, access_token: impl Into<String>) -> Self {
        self.access_token = Some(access_token.into());
        self
    }

    /// Treat a missing client secret as a validation failure.
    pub fn require_client_secret(mut self) -> Self {
        self.require_secret = true;
        self
    }

    /// Build the configuration.
    ///
    /// Every missing field is reported in one
    /// [`ValidationError`](crate::error::ValidationError).
    pub fn build(self) -> CredentialResult<AuthorizationConfig> {
        let config = AuthorizationConfig {
            uaa_url: self.uaa_url.unwrap_or_default(),
            client_id: self.client_id.unwrap_or_default(),
            client_secret: self.client_secret,
            refresh_token: self.refresh_token,
            access_token: self.access_token,
        };

        let secret: Vec<(&str, Option<&str>)> = if self.require_secret {
            vec![("clientSecret", config.secret())]
        } else {
            Vec::new()
        };
        config.validate(&secret)?;

        if url::Url::parse(&config.uaa_url).is_err() {
            return Err(ConfigurationError::InvalidEndpoint {
                url: config.uaa_url.clone(),
            }
            .into());
        }

        Ok(config)
    }
}

/// Create a new authorization config builder.
pub fn authorization_config() -> AuthorizationConfigBuilder {
    AuthorizationConfigBuilder::new()
}
