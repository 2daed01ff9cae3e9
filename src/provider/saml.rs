//! SAML2 Strategies
//!
//! Two ways of turning an IdP assertion into a credential:
//!
//! - **Bearer**: RFC 7522 exchange at the token endpoint.
//! - **Pure**: a caller-supplied hook converts the assertion into a session
//!   cookie which is used as-is; expiry comes from `NotOnOrAfter`.
//!
//! Neither has refresh semantics, so an expired credential means a new
//! assertion.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info};

use super::capability::{SamlAssertionProvider, SessionCookieProvider};
use super::context::ClientContext;
use super::lifecycle::{ManagedTokenProvider, TokenStrategy};
use crate::callback::{CallbackKind, CallbackListener, CallbackOptions};
use crate::core::jwt;
use crate::core::saml::assertion_expires_at_ms;
use crate::core::SamlAuthnRequest;
use crate::error::{BrowserAuthError, CredentialResult, ProtocolError, ValidationError};
use crate::flows::{probe_liveness, saml_bearer, ProbeCredential};
use crate::types::{AuthType, AuthorizationConfig, CallbackPayload, TokenResult, TokenType};

/// Collects a `SAMLResponse` by sending the user through the IdP in a browser.
#[derive(Clone, Debug)]
pub struct BrowserSamlAssertionProvider {
    /// IdP single sign-on URL (HTTP-Redirect binding).
    pub idp_sso_url: String,
    pub sp_entity_id: String,
    pub relay_state: Option<String>,
    /// Pre-built login URL; replaces the generated AuthnRequest redirect.
    pub authorization_url: Option<String>,
    pub callback: CallbackOptions,
}

impl BrowserSamlAssertionProvider {
    pub fn new(idp_sso_url: impl Into<String>, sp_entity_id: impl Into<String>) -> Self {
        Self {
            idp_sso_url: idp_sso_url.into(),
            sp_entity_id: sp_entity_id.into(),
            relay_state: None,
            authorization_url: None,
            callback: CallbackOptions::default(),
        }
    }

    pub fn with_relay_state(mut self, relay_state: impl Into<String>) -> Self {
        self.relay_state = Some(relay_state.into());
        self
    }

    pub fn with_authorization_url(mut self, url: impl Into<String>) -> Self {
        self.authorization_url = Some(url.into());
        self
    }

    pub fn with_callback(mut self, callback: CallbackOptions) -> Self {
        self.callback = callback;
        self
    }
}

#[async_trait]
impl SamlAssertionProvider for BrowserSamlAssertionProvider {
    async fn saml_assertion(&self) -> CredentialResult<String> {
        let listener =
            CallbackListener::bind(self.callback.clone().with_kind(CallbackKind::Saml)).await?;

        let authorization_url = match &self.authorization_url {
            Some(url) => url.clone(),
            None => SamlAuthnRequest::new(
                &self.idp_sso_url,
                listener.redirect_uri(),
                &self.sp_entity_id,
            )
            .redirect_url(self.relay_state.as_deref())?,
        };

        match listener.wait(&authorization_url).await? {
            CallbackPayload::SamlResponse(response) => Ok(response),
            CallbackPayload::Code(_) => {
                Err(BrowserAuthError::MissingSamlResponse { authorization_url }.into())
            }
        }
    }
}

/// RFC 7522 SAML2 bearer grant.
pub struct Saml2BearerStrategy {
    context: ClientContext,
    assertions: Arc<dyn SamlAssertionProvider>,
}

pub type Saml2BearerProvider = ManagedTokenProvider<Saml2BearerStrategy>;

impl Saml2BearerStrategy {
    pub fn new(
        context: ClientContext,
        assertions: Arc<dyn SamlAssertionProvider>,
    ) -> CredentialResult<Self> {
        context.config.validate(&[])?;
        Ok(Self {
            context,
            assertions,
        })
    }
}

#[async_trait]
impl TokenStrategy for Saml2BearerStrategy {
    fn auth_type(&self) -> AuthType {
        AuthType::Saml2Bearer
    }

    fn config(&self) -> &AuthorizationConfig {
        &self.context.config
    }

    async fn perform_login(&self) -> CredentialResult<TokenResult> {
        let assertion = non_empty_assertion(self.assertions.as_ref()).await?;
        let endpoint = self.context.token_endpoint().await?;
        saml_bearer(
            self.context.transport(),
            &endpoint,
            &assertion,
            self.context.scope(),
        )
        .await
    }
}

/// Session-cookie login straight from the assertion.
pub struct Saml2PureStrategy {
    context: ClientContext,
    assertions: Arc<dyn SamlAssertionProvider>,
    cookies: Arc<dyn SessionCookieProvider>,
}

pub type Saml2PureProvider = ManagedTokenProvider<Saml2PureStrategy>;

impl Saml2PureStrategy {
    pub fn new(
        context: ClientContext,
        assertions: Arc<dyn SamlAssertionProvider>,
        cookies: Arc<dyn SessionCookieProvider>,
    ) -> CredentialResult<Self> {
        context.config.validate(&[])?;
        Ok(Self {
            context,
            assertions,
            cookies,
        })
    }
}

#[async_trait]
impl TokenStrategy for Saml2PureStrategy {
    fn auth_type(&self) -> AuthType {
        AuthType::Saml2Pure
    }

    fn config(&self) -> &AuthorizationConfig {
        &self.context.config
    }

    async fn perform_login(&self) -> CredentialResult<TokenResult> {
        let assertion = non_empty_assertion(self.assertions.as_ref()).await?;
        let expires_at = assertion_expires_at_ms(&assertion)?;
        if expires_at.is_none() {
            debug!("assertion declares no NotOnOrAfter");
        }

        let cookie = self.cookies.session_cookie(&assertion).await?;
        if cookie.is_empty() {
            return Err(ProtocolError::MissingField {
                field: "session cookie".to_string(),
            }
            .into());
        }
        info!("SAML session established");

        let mut result = TokenResult::new(cookie, AuthType::Saml2Pure);
        result.token_type = Some(TokenType::Saml);
        result.expires_at = expires_at;
        Ok(result)
    }

    async fn validate_token(&self, token: &str, service_url: Option<&str>) -> CredentialResult<bool> {
        match service_url {
            Some(url) => {
                probe_liveness(self.context.transport(), url, ProbeCredential::Cookie(token)).await
            }
            None => Ok(jwt::is_token_valid(token)),
        }
    }
}

async fn non_empty_assertion(provider: &dyn SamlAssertionProvider) -> CredentialResult<String> {
    let assertion = provider.saml_assertion().await?;
    if assertion.trim().is_empty() {
        return Err(ValidationError::field("samlAssertion").into());
    }
    Ok(assertion)
}
