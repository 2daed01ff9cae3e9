//! Password / Passcode Strategy
//!
//! OIDC resource-owner password grant and the Cloud Foundry passcode login.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use std::sync::Arc;

use super::capability::PasscodeProvider;
use super::context::ClientContext;
use super::lifecycle::{ManagedTokenProvider, TokenStrategy};
use crate::error::{CredentialResult, ValidationError};
use crate::flows::{password_grant, PasswordCredentials};
use crate::types::{AuthType, AuthorizationConfig, TokenResult};

/// Where the user's credentials come from.
#[derive(Clone)]
pub enum PasswordSource {
    Password {
        username: String,
        password: SecretString,
    },
    /// Explicit passcode first, then the provider.
    Passcode {
        value: Option<SecretString>,
        provider: Option<Arc<dyn PasscodeProvider>>,
    },
}

impl PasswordSource {
    pub fn password(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self::Password {
            username: username.into(),
            password: SecretString::new(password.into()),
        }
    }

    pub fn passcode(
        value: Option<String>,
        provider: Option<Arc<dyn PasscodeProvider>>,
    ) -> Self {
        Self::Passcode {
            value: value.filter(|v| !v.is_empty()).map(SecretString::new),
            provider,
        }
    }

    async fn resolve(&self) -> CredentialResult<PasswordCredentials> {
        match self {
            Self::Password { username, password } => Ok(PasswordCredentials::Password {
                username: username.clone(),
                password: password.clone(),
            }),
            Self::Passcode {
                value: Some(value), ..
            } => Ok(PasswordCredentials::Passcode(value.clone())),
            Self::Passcode {
                provider: Some(provider),
                ..
            } => {
                let passcode = provider.passcode().await?;
                if passcode.is_empty() {
                    return Err(ValidationError::field("passcode").into());
                }
                Ok(PasswordCredentials::passcode(passcode))
            }
            Self::Passcode { .. } => Err(ValidationError::field("passcode").into()),
        }
    }
}

impl std::fmt::Debug for PasswordSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Password { username, .. } => f
                .debug_struct("Password")
                .field("username", username)
                .finish_non_exhaustive(),
            Self::Passcode { value, provider } => f
                .debug_struct("Passcode")
                .field("value", &value.as_ref().map(|_| "[REDACTED]"))
                .field("provider", &provider.is_some())
                .finish(),
        }
    }
}

pub struct PasswordStrategy {
    context: ClientContext,
    source: PasswordSource,
}

pub type PasswordProvider = ManagedTokenProvider<PasswordStrategy>;

impl PasswordStrategy {
    pub fn new(context: ClientContext, source: PasswordSource) -> CredentialResult<Self> {
        let mut extra: Vec<(&str, Option<&str>)> = Vec::new();
        if let PasswordSource::Password { username, password } = &source {
            extra.push(("username", Some(username.as_str())));
            extra.push(("password", Some(password.expose_secret().as_str())));
        }
        context.config.validate(&extra)?;
        Ok(Self { context, source })
    }
}

#[async_trait]
impl TokenStrategy for PasswordStrategy {
    fn auth_type(&self) -> AuthType {
        AuthType::Password
    }

    fn config(&self) -> &AuthorizationConfig {
        &self.context.config
    }

    async fn perform_login(&self) -> CredentialResult<TokenResult> {
        let credentials = self.source.resolve().await?;
        let endpoint = self.context.token_endpoint().await?;
        password_grant(
            self.context.transport(),
            &endpoint,
            &credentials,
            self.context.scope(),
        )
        .await
    }

    async fn perform_refresh(&self, refresh_token: &str) -> CredentialResult<TokenResult> {
        self.context.refresh(refresh_token, AuthType::Password).await
    }
}
