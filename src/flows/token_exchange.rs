//! Token Exchange
//!
//! RFC 8693 - OAuth 2.0 Token Exchange.

use serde::Deserialize;

use super::grant::{push_opt, TokenEndpoint};
use crate::core::HttpTransport;
use crate::error::CredentialResult;
use crate::types::{AuthType, GrantType, TokenResult};

pub const ACCESS_TOKEN_TYPE: &str = "urn:ietf:params:oauth:token-type:access_token";
pub const ID_TOKEN_TYPE: &str = "urn:ietf:params:oauth:token-type:id_token";
pub const JWT_TOKEN_TYPE: &str = "urn:ietf:params:oauth:token-type:jwt";

/// Token exchange parameters.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenExchangeRequest {
    pub subject_token: String,
    #[serde(default = "default_token_type")]
    pub subject_token_type: String,
    #[serde(default)]
    pub actor_token: Option<String>,
    #[serde(default)]
    pub actor_token_type: Option<String>,
    #[serde(default)]
    pub requested_token_type: Option<String>,
    #[serde(default)]
    pub audience: Option<String>,
    #[serde(default)]
    pub resource: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
}

fn default_token_type() -> String {
    ACCESS_TOKEN_TYPE.to_string()
}

impl TokenExchangeRequest {
    /// Exchange an access token.
    pub fn new(subject_token: impl Into<String>) -> Self {
        Self {
            subject_token: subject_token.into(),
            subject_token_type: default_token_type(),
            actor_token: None,
            actor_token_type: None,
            requested_token_type: None,
            audience: None,
            resource: None,
            scope: None,
        }
    }

    pub fn with_subject_token_type(mut self, token_type: impl Into<String>) -> Self {
        self.subject_token_type = token_type.into();
        self
    }

    /// Actor token; its type defaults to an access token.
    pub fn with_actor(mut self, actor_token: impl Into<String>) -> Self {
        self.actor_token = Some(actor_token.into());
        self
    }

    pub fn with_audience(mut self, audience: impl Into<String>) -> Self {
        self.audience = Some(audience.into());
        self
    }
}

/// `grant_type=urn:ietf:params:oauth:grant-type:token-exchange`.
pub async fn token_exchange(
    transport: &dyn HttpTransport,
    endpoint: &TokenEndpoint,
    request: &TokenExchangeRequest,
) -> CredentialResult<TokenResult> {
    let mut params = vec![
        ("subject_token", request.subject_token.clone()),
        ("subject_token_type", request.subject_token_type.clone()),
    ];
    if let Some(actor_token) = &request.actor_token {
        params.push(("actor_token", actor_token.clone()));
        params.push((
            "actor_token_type",
            request
                .actor_token_type
                .clone()
                .unwrap_or_else(default_token_type),
        ));
    }
    push_opt(
        &mut params,
        "requested_token_type",
        request.requested_token_type.as_deref(),
    );
    push_opt(&mut params, "audience", request.audience.as_deref());
    push_opt(&mut params, "resource", request.resource.as_deref());
    push_opt(&mut params, "scope", request.scope.as_deref());

    endpoint
        .request_token(
            transport,
            GrantType::TokenExchange,
            params,
            AuthType::TokenExchange,
        )
        .await
}
