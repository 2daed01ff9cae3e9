//! OIDC Browser Strategy
//!
//! Authorization code with PKCE against a discovered or explicit issuer.
//! The code comes from the local listener or from a caller-supplied
//! [`AuthorizationCodeSource`].

use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;
use url::Url;

use super::authorization_code::browser_authorization_code;
use super::capability::AuthorizationCodeSource;
use super::context::ClientContext;
use super::lifecycle::{ManagedTokenProvider, TokenStrategy};
use crate::callback::{CallbackOptions, CALLBACK_PATH};
use crate::core::{generate_state, PkceChallenge};
use crate::error::{ConfigurationError, CredentialResult};
use crate::flows::{build_authorization_url, exchange_code, AuthorizationParams};
use crate::types::{AuthType, AuthorizationConfig, TokenResult};

pub const DEFAULT_OIDC_SCOPE: &str = "openid";

/// How the OIDC login obtains its code.
#[derive(Clone, Default)]
pub struct OidcOptions {
    pub callback: CallbackOptions,
    /// Registered redirect URI. A loopback URI is served as-is by the
    /// listener; any other host needs a `code_source`.
    pub redirect_uri: Option<String>,
    pub code_source: Option<Arc<dyn AuthorizationCodeSource>>,
}

impl OidcOptions {
    pub fn new(callback: CallbackOptions) -> Self {
        Self {
            callback,
            ..Default::default()
        }
    }

    pub fn with_redirect_uri(mut self, redirect_uri: impl Into<String>) -> Self {
        self.redirect_uri = Some(redirect_uri.into());
        self
    }

    pub fn with_code_source(mut self, source: Arc<dyn AuthorizationCodeSource>) -> Self {
        self.code_source = Some(source);
        self
    }
}

/// OIDC authorization code + PKCE.
pub struct OidcStrategy {
    context: ClientContext,
    options: OidcOptions,
}

pub type OidcBrowserProvider = ManagedTokenProvider<OidcStrategy>;

fn is_loopback(redirect_uri: &str) -> bool {
    Url::parse(redirect_uri).is_ok_and(|url| {
        matches!(url.host_str(), Some("localhost" | "127.0.0.1" | "[::1]"))
    })
}

impl OidcStrategy {
    pub fn new(context: ClientContext, mut options: OidcOptions) -> CredentialResult<Self> {
        context.config.validate(&[])?;

        if let Some(redirect_uri) = &options.redirect_uri {
            if is_loopback(redirect_uri) {
                options.callback = options.callback.with_redirect_uri(redirect_uri.clone());
            } else if options.code_source.is_none() {
                return Err(ConfigurationError::InvalidConfig {
                    message: format!(
                        "redirect URI {} is not localhost; a code source is required",
                        redirect_uri
                    ),
                }
                .into());
            }
        }

        Ok(Self { context, options })
    }

    fn scope(&self) -> &str {
        self.context.scope().unwrap_or(DEFAULT_OIDC_SCOPE)
    }

    async fn code_from_source(
        &self,
        source: &dyn AuthorizationCodeSource,
        authorization_endpoint: &str,
        pkce: &PkceChallenge,
    ) -> CredentialResult<(String, String)> {
        let redirect_uri = self.options.redirect_uri.clone().unwrap_or_else(|| {
            format!(
                "http://localhost:{}{}",
                self.options.callback.base_port, CALLBACK_PATH
            )
        });
        let params = AuthorizationParams::new(&self.context.config.client_id, redirect_uri.clone())
            .with_scope(Some(self.scope().to_string()))
            .with_state(generate_state())
            .with_pkce(pkce);
        let authorization_url = build_authorization_url(authorization_endpoint, &params)?;

        info!(url = %authorization_url, "requesting authorization code from code source");
        let code = source.authorization_code(&authorization_url).await?;
        Ok((code, redirect_uri))
    }
}

#[async_trait]
impl TokenStrategy for OidcStrategy {
    fn auth_type(&self) -> AuthType {
        AuthType::AuthorizationCode
    }

    fn config(&self) -> &AuthorizationConfig {
        &self.context.config
    }

    async fn perform_login(&self) -> CredentialResult<TokenResult> {
        let transport = self.context.transport();
        let authorization_endpoint = self
            .context
            .endpoints
            .authorization_endpoint(transport)
            .await?;
        let pkce = PkceChallenge::generate();

        let (code, redirect_uri) = match &self.options.code_source {
            Some(source) => {
                self.code_from_source(source.as_ref(), &authorization_endpoint, &pkce)
                    .await?
            }
            None => {
                browser_authorization_code(
                    &self.context.config.client_id,
                    &authorization_endpoint,
                    Some(self.scope()),
                    Some(&pkce),
                    &self.options.callback,
                )
                .await?
            }
        };

        let endpoint = self.context.token_endpoint().await?;
        exchange_code(
            transport,
            &endpoint,
            &code,
            &redirect_uri,
            Some(&pkce.verifier),
        )
        .await
    }

    async fn perform_refresh(&self, refresh_token: &str) -> CredentialResult<TokenResult> {
        self.context
            .refresh(refresh_token, AuthType::AuthorizationCode)
            .await
    }
}
