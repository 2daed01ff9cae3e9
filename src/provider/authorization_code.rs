//! Authorization Code Strategy
//!
//! Browser login through the local callback listener, Basic-authenticated
//! code exchange, refresh-token renewal.

use async_trait::async_trait;

use super::context::ClientContext;
use super::lifecycle::{ManagedTokenProvider, TokenStrategy};
use crate::callback::{CallbackKind, CallbackListener, CallbackOptions};
use crate::core::{generate_state, PkceChallenge};
use crate::error::{BrowserAuthError, CredentialResult};
use crate::flows::{
    build_authorization_url, exchange_code, probe_liveness, AuthorizationParams, ProbeCredential,
};
use crate::types::{AuthType, AuthorizationConfig, CallbackPayload, TokenResult};

/// UAA authorization-code login with a browser.
pub struct AuthorizationCodeStrategy {
    context: ClientContext,
    callback: CallbackOptions,
}

/// Authorization-code strategy with the shared lifecycle.
pub type AuthorizationCodeProvider = ManagedTokenProvider<AuthorizationCodeStrategy>;

impl AuthorizationCodeStrategy {
    pub fn new(context: ClientContext, callback: CallbackOptions) -> CredentialResult<Self> {
        context.config.validate(&[])?;
        Ok(Self { context, callback })
    }
}

#[async_trait]
impl TokenStrategy for AuthorizationCodeStrategy {
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

        let (code, redirect_uri) = browser_authorization_code(
            &self.context.config.client_id,
            &authorization_endpoint,
            self.context.scope(),
            None,
            &self.callback,
        )
        .await?;

        let endpoint = self.context.token_endpoint().await?;
        exchange_code(transport, &endpoint, &code, &redirect_uri, None).await
    }

    async fn perform_refresh(&self, refresh_token: &str) -> CredentialResult<TokenResult> {
        self.context
            .refresh(refresh_token, AuthType::AuthorizationCode)
            .await
    }

    async fn validate_token(&self, token: &str, service_url: Option<&str>) -> CredentialResult<bool> {
        match service_url {
            Some(url) => {
                probe_liveness(self.context.transport(), url, ProbeCredential::Bearer(token)).await
            }
            None => Ok(crate::core::jwt::is_token_valid(token)),
        }
    }
}

/// Run the browser half of an authorization-code login.
///
/// Returns the code and the redirect URI it was issued for.
pub(crate) async fn browser_authorization_code(
    client_id: &str,
    authorization_endpoint: &str,
    scope: Option<&str>,
    pkce: Option<&PkceChallenge>,
    callback: &CallbackOptions,
) -> CredentialResult<(String, String)> {
    let state = generate_state();
    let options = callback
        .clone()
        .with_kind(CallbackKind::OAuth)
        .with_expected_state(state.clone());
    let listener = CallbackListener::bind(options).await?;
    let redirect_uri = listener.redirect_uri();

    let mut params = AuthorizationParams::new(client_id, redirect_uri.clone())
        .with_scope(scope.map(str::to_string))
        .with_state(state);
    if let Some(pkce) = pkce {
        params = params.with_pkce(pkce);
    }
    let authorization_url = build_authorization_url(authorization_endpoint, &params)?;

    match listener.wait(&authorization_url).await? {
        CallbackPayload::Code(code) => Ok((code, redirect_uri)),
        CallbackPayload::SamlResponse(_) => {
            Err(BrowserAuthError::MissingCode { authorization_url }.into())
        }
    }
}
