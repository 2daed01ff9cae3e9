//! Authorization Code Flow
//!
//! RFC 6749 Section 4.1 - Authorization Code Grant, with optional PKCE
//! (RFC 7636).

use url::Url;

use super::grant::{push_opt, TokenEndpoint};
use crate::core::{HttpTransport, PkceChallenge};
use crate::error::{ConfigurationError, CredentialResult};
use crate::types::{AuthType, GrantType, TokenResult};

/// Inputs for the authorization endpoint redirect.
#[derive(Clone, Debug, Default)]
pub struct AuthorizationParams {
    pub client_id: String,
    pub redirect_uri: String,
    /// Space-separated scopes.
    pub scope: Option<String>,
    pub state: Option<String>,
    /// S256 challenge; the verifier stays with the caller.
    pub code_challenge: Option<String>,
}

impl AuthorizationParams {
    pub fn new(client_id: impl Into<String>, redirect_uri: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            redirect_uri: redirect_uri.into(),
            ..Default::default()
        }
    }

    pub fn with_scope(mut self, scope: Option<String>) -> Self {
        self.scope = scope;
        self
    }

    pub fn with_state(mut self, state: impl Into<String>) -> Self {
        self.state = Some(state.into());
        self
    }

    pub fn with_pkce(mut self, pkce: &PkceChallenge) -> Self {
        self.code_challenge = Some(pkce.challenge.clone());
        self
    }
}

/// Build the authorization URL the user agent is sent to.
pub fn build_authorization_url(
    authorization_endpoint: &str,
    params: &AuthorizationParams,
) -> CredentialResult<String> {
    let mut url =
        Url::parse(authorization_endpoint).map_err(|_| ConfigurationError::InvalidEndpoint {
            url: authorization_endpoint.to_string(),
        })?;

    {
        let mut query = url.query_pairs_mut();
        query.append_pair("client_id", &params.client_id);
        query.append_pair("redirect_uri", &params.redirect_uri);
        query.append_pair("response_type", "code");
        if let Some(challenge) = &params.code_challenge {
            query.append_pair("code_challenge", challenge);
            query.append_pair("code_challenge_method", "S256");
        }
        if let Some(scope) = params.scope.as_deref().filter(|s| !s.is_empty()) {
            query.append_pair("scope", scope);
        }
        if let Some(state) = &params.state {
            query.append_pair("state", state);
        }
    }

    Ok(url.into())
}

/// Exchange an authorization code for tokens.
pub async fn exchange_code(
    transport: &dyn HttpTransport,
    endpoint: &TokenEndpoint,
    code: &str,
    redirect_uri: &str,
    code_verifier: Option<&str>,
) -> CredentialResult<TokenResult> {
    let mut params = vec![
        ("code", code.to_string()),
        ("redirect_uri", redirect_uri.to_string()),
    ];
    push_opt(&mut params, "code_verifier", code_verifier);

    endpoint
        .request_token(
            transport,
            GrantType::AuthorizationCode,
            params,
            AuthType::AuthorizationCode,
        )
        .await
}
