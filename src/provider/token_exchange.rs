//! Token Exchange Strategy

use async_trait::async_trait;

use super::context::ClientContext;
use super::lifecycle::{ManagedTokenProvider, TokenStrategy};
use crate::error::CredentialResult;
use crate::flows::{token_exchange, TokenExchangeRequest};
use crate::types::{AuthType, AuthorizationConfig, TokenResult};

/// Re-exchanges the subject token whenever the cached result expires.
pub struct TokenExchangeStrategy {
    context: ClientContext,
    request: TokenExchangeRequest,
}

pub type TokenExchangeProvider = ManagedTokenProvider<TokenExchangeStrategy>;

impl TokenExchangeStrategy {
    pub fn new(context: ClientContext, request: TokenExchangeRequest) -> CredentialResult<Self> {
        context
            .config
            .validate(&[("subjectToken", Some(request.subject_token.as_str()))])?;
        Ok(Self { context, request })
    }
}

#[async_trait]
impl TokenStrategy for TokenExchangeStrategy {
    fn auth_type(&self) -> AuthType {
        AuthType::TokenExchange
    }

    fn config(&self) -> &AuthorizationConfig {
        &self.context.config
    }

    async fn perform_login(&self) -> CredentialResult<TokenResult> {
        let endpoint = self.context.token_endpoint().await?;
        let mut request = self.request.clone();
        if request.scope.is_none() {
            request.scope = self.context.scope.clone();
        }
        token_exchange(self.context.transport(), &endpoint, &request).await
    }
}
