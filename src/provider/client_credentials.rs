//! Client Credentials Strategy

use async_trait::async_trait;

use super::context::ClientContext;
use super::lifecycle::{ManagedTokenProvider, TokenStrategy};
use crate::error::CredentialResult;
use crate::flows::client_credentials;
use crate::types::{AuthType, AuthorizationConfig, TokenResult};

/// Service-to-service tokens. There is no refresh token for this grant, so
/// an expired token is simply requested again.
pub struct ClientCredentialsStrategy {
    context: ClientContext,
}

pub type ClientCredentialsProvider = ManagedTokenProvider<ClientCredentialsStrategy>;

impl ClientCredentialsStrategy {
    pub fn new(context: ClientContext) -> CredentialResult<Self> {
        context
            .config
            .validate(&[("clientSecret", context.config.secret())])?;
        Ok(Self { context })
    }
}

#[async_trait]
impl TokenStrategy for ClientCredentialsStrategy {
    fn auth_type(&self) -> AuthType {
        AuthType::ClientCredentials
    }

    fn config(&self) -> &AuthorizationConfig {
        &self.context.config
    }

    async fn perform_login(&self) -> CredentialResult<TokenResult> {
        let endpoint = self.context.token_endpoint().await?;
        client_credentials(self.context.transport(), &endpoint, self.context.scope()).await
    }
}
