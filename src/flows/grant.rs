//! Token Endpoint Client
//!
//! Shared request construction for every grant: form body, client
//! authentication and response mapping.

use base64::Engine;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

use crate::core::{HttpRequest, HttpResponse, HttpTransport};
use crate::error::{create_error_from_response, CredentialResult, ProtocolError};
use crate::types::{
    AuthType, AuthorizationConfig, ClientAuthMethod, GrantType, TokenResponse, TokenResult,
    DEFAULT_TIMEOUT_MS,
};

/// A token endpoint bound to one client registration.
#[derive(Clone, Debug)]
pub struct TokenEndpoint {
    /// Token endpoint URL.
    pub url: String,
    pub client_id: String,
    pub client_secret: Option<SecretString>,
    pub auth_method: ClientAuthMethod,
    pub timeout: Duration,
}

impl TokenEndpoint {
    pub fn new(url: impl Into<String>, client_id: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            client_id: client_id.into(),
            client_secret: None,
            auth_method: ClientAuthMethod::default(),
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
        }
    }

    /// Endpoint for `url` using the client registration in `config`.
    pub fn from_config(url: impl Into<String>, config: &AuthorizationConfig) -> Self {
        let mut endpoint = Self::new(url, config.client_id.clone());
        endpoint.client_secret = config.client_secret.clone();
        endpoint
    }

    pub fn with_client_secret(mut self, secret: impl Into<String>) -> Self {
        self.client_secret = Some(SecretString::new(secret.into()));
        self
    }

    pub fn with_auth_method(mut self, auth_method: ClientAuthMethod) -> Self {
        self.auth_method = auth_method;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn basic_credentials(&self) -> Option<String> {
        if self.auth_method != ClientAuthMethod::ClientSecretBasic {
            return None;
        }
        let secret = self.client_secret.as_ref()?;
        let credentials = format!("{}:{}", self.client_id, secret.expose_secret());
        Some(base64::engine::general_purpose::STANDARD.encode(credentials))
    }

    /// Form POST to `url` authenticated as this client.
    ///
    /// With a secret and the Basic method the credentials go in the
    /// `Authorization` header; otherwise `client_id` (and the secret, for
    /// the post method) travel in the body.
    pub fn form_request(&self, url: &str, mut params: Vec<(&str, String)>) -> HttpRequest {
        let basic = self.basic_credentials();

        if basic.is_none() {
            params.push(("client_id", self.client_id.clone()));
            if self.auth_method == ClientAuthMethod::ClientSecretPost {
                if let Some(secret) = &self.client_secret {
                    params.push(("client_secret", secret.expose_secret().clone()));
                }
            }
        }

        let request = HttpRequest::post_form(url, &params).timeout(self.timeout);
        match basic {
            Some(encoded) => request.header("authorization", format!("Basic {}", encoded)),
            None => request,
        }
    }

    /// POST a grant to the token endpoint and parse the success body.
    pub async fn request(
        &self,
        transport: &dyn HttpTransport,
        grant_type: GrantType,
        mut params: Vec<(&str, String)>,
    ) -> CredentialResult<TokenResponse> {
        debug!(grant_type = grant_type.as_str(), url = %self.url, "token request");

        params.insert(0, ("grant_type", grant_type.as_str().to_string()));
        let response = transport.send(self.form_request(&self.url, params)).await?;
        check_status(&response)?;
        parse_json(&response.body)
    }

    /// Like [`request`](Self::request), requiring an `access_token` in the result.
    pub async fn request_token(
        &self,
        transport: &dyn HttpTransport,
        grant_type: GrantType,
        params: Vec<(&str, String)>,
        auth_type: AuthType,
    ) -> CredentialResult<TokenResult> {
        let response = self.request(transport, grant_type, params).await?;
        into_token_result(response, auth_type)
    }
}

/// Map a non-2xx response to a provider error.
pub(crate) fn check_status(response: &HttpResponse) -> CredentialResult<()> {
    if response.is_success() {
        Ok(())
    } else {
        Err(create_error_from_response(response.status, &response.body))
    }
}

pub(crate) fn parse_json<T: DeserializeOwned>(body: &str) -> CredentialResult<T> {
    serde_json::from_str(body).map_err(|e| {
        ProtocolError::InvalidJson {
            message: e.to_string(),
        }
        .into()
    })
}

/// Convert a token response, failing when it carries no usable access token.
pub fn into_token_result(
    response: TokenResponse,
    auth_type: AuthType,
) -> CredentialResult<TokenResult> {
    match response.access_token.as_deref() {
        Some(token) if !token.is_empty() => {
            let token = token.to_string();
            Ok(TokenResult::from_response(token, &response, auth_type))
        }
        _ => Err(ProtocolError::MissingField {
            field: "access_token".to_string(),
        }
        .into()),
    }
}

/// Append an optional parameter when it is present and non-empty.
pub(crate) fn push_opt<'a>(
    params: &mut Vec<(&'a str, String)>,
    name: &'a str,
    value: Option<&str>,
) {
    if let Some(value) = value.filter(|v| !v.is_empty()) {
        params.push((name, value.to_string()));
    }
}
