//! Token Lifecycle
//!
//! The cache → refresh → login policy shared by every strategy.

use async_trait::async_trait;
use tracing::{debug, trace, warn};

use super::TokenProvider;
use crate::core::jwt;
use crate::error::{CredentialResult, RefreshError};
use crate::types::{AuthType, AuthorizationConfig, CachedTokenState, TokenResult, TokenType};

/// Protocol-specific login and refresh.
#[async_trait]
pub trait TokenStrategy: Send + Sync {
    fn auth_type(&self) -> AuthType;

    /// Identity-provider binding; its tokens seed the cache.
    fn config(&self) -> &AuthorizationConfig;

    /// Obtain fresh credentials from scratch.
    async fn perform_login(&self) -> CredentialResult<TokenResult>;

    /// Redeem a refresh token. Grants without refresh semantics log in again.
    async fn perform_refresh(&self, _refresh_token: &str) -> CredentialResult<TokenResult> {
        self.perform_login().await
    }

    /// Local JWT expiry check; variants may probe the service instead.
    async fn validate_token(&self, token: &str, _service_url: Option<&str>) -> CredentialResult<bool> {
        Ok(jwt::is_token_valid(token))
    }
}

/// Cached token state plus the decision policy.
#[derive(Debug, Default)]
pub struct TokenLifecycle {
    state: CachedTokenState,
}

impl TokenLifecycle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from existing tokens; the access token's expiry comes from its `exp`.
    pub fn seeded(access_token: Option<String>, refresh_token: Option<String>) -> Self {
        let access_token = access_token.filter(|t| !t.is_empty());
        let expires_at = access_token.as_deref().and_then(jwt::expires_at_ms);
        Self {
            state: CachedTokenState {
                token_type: access_token.as_ref().map(|_| TokenType::Jwt),
                authorization_token: access_token,
                refresh_token: refresh_token.filter(|t| !t.is_empty()),
                expires_at,
            },
        }
    }

    pub fn state(&self) -> &CachedTokenState {
        &self.state
    }

    /// Forget everything, forcing a login on the next call.
    pub fn clear(&mut self) {
        self.state = CachedTokenState::default();
    }

    /// Token present with an expiry more than 60 seconds away.
    pub fn is_cache_valid(&self, now_ms: i64) -> bool {
        self.state.authorization_token.is_some()
            && self
                .state
                .expires_at
                .is_some_and(|exp| jwt::is_expiry_valid(exp, now_ms))
    }

    /// Expiry check for a cached non-JWT credential; `None` when `token` is
    /// not the cached one or is a JWT.
    pub fn validate_cached(&self, token: &str, now_ms: i64) -> Option<bool> {
        if self.state.token_type != Some(TokenType::Saml)
            || self.state.authorization_token.as_deref() != Some(token)
        {
            return None;
        }
        Some(self.is_cache_valid(now_ms))
    }

    /// Return cached credentials, refresh them, or log in.
    pub async fn get_tokens<S>(&mut self, strategy: &S) -> CredentialResult<TokenResult>
    where
        S: TokenStrategy + ?Sized,
    {
        let auth_type = strategy.auth_type();
        let now = jwt::now_ms();

        if let (true, Some(token)) = (
            self.is_cache_valid(now),
            self.state.authorization_token.clone(),
        ) {
            trace!(auth_type = %auth_type, "using cached token");
            return Ok(self.cached_result(token, auth_type, now));
        }

        if let Some(refresh_token) = self.state.refresh_token.clone() {
            debug!(auth_type = %auth_type, "refreshing token");
            match strategy.perform_refresh(&refresh_token).await {
                Ok(result) => return Ok(self.store(result, jwt::now_ms())),
                Err(e) => {
                    let error = RefreshError::new(e);
                    warn!(
                        auth_type = %auth_type,
                        code = error.source.error_code(),
                        error = %error,
                        "refresh failed; discarding refresh token"
                    );
                    self.state.refresh_token = None;
                }
            }
        }

        debug!(auth_type = %auth_type, "logging in");
        let result = strategy.perform_login().await?;
        Ok(self.store(result, jwt::now_ms()))
    }

    fn cached_result(&self, token: String, auth_type: AuthType, now_ms: i64) -> TokenResult {
        let expires_in = self
            .state
            .expires_at
            .map(|exp| ((exp - now_ms).max(0) / 1000) as u64);
        TokenResult {
            authorization_token: token,
            refresh_token: self.state.refresh_token.clone(),
            auth_type,
            expires_in,
            expires_at: self.state.expires_at,
            token_type: self.state.token_type,
        }
    }

    /// Record a login/refresh result and return it with bookkeeping filled in.
    fn store(&mut self, mut result: TokenResult, now_ms: i64) -> TokenResult {
        let expires_at = match result.expires_in {
            Some(secs) => Some(now_ms + (secs as i64).saturating_mul(1000)),
            None => result
                .expires_at
                .or_else(|| jwt::expires_at_ms(&result.authorization_token)),
        };
        if expires_at.is_none() {
            debug!(auth_type = %result.auth_type, "token carries no expiry; it will not be cached");
        }

        result.expires_at = expires_at;
        result.refresh_token = result.refresh_token.or_else(|| self.state.refresh_token.take());

        self.state = CachedTokenState {
            authorization_token: Some(result.authorization_token.clone()),
            refresh_token: result.refresh_token.clone(),
            expires_at,
            token_type: result.token_type,
        };
        result
    }
}

/// A strategy composed with the lifecycle policy.
pub struct ManagedTokenProvider<S> {
    strategy: S,
    lifecycle: TokenLifecycle,
}

impl<S: TokenStrategy> ManagedTokenProvider<S> {
    /// Wrap `strategy`, seeding the cache from its configuration.
    pub fn new(strategy: S) -> Self {
        let config = strategy.config();
        let lifecycle =
            TokenLifecycle::seeded(config.access_token.clone(), config.refresh_token.clone());
        Self {
            strategy,
            lifecycle,
        }
    }

    pub fn strategy(&self) -> &S {
        &self.strategy
    }

    pub fn cached_state(&self) -> &CachedTokenState {
        self.lifecycle.state()
    }

    pub fn clear_cache(&mut self) {
        self.lifecycle.clear();
    }
}

impl<S> std::fmt::Debug for ManagedTokenProvider<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManagedTokenProvider")
            .field("lifecycle", &self.lifecycle)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl<S: TokenStrategy> TokenProvider for ManagedTokenProvider<S> {
    async fn get_tokens(&mut self) -> CredentialResult<TokenResult> {
        self.lifecycle.get_tokens(&self.strategy).await
    }

    async fn validate_token(&self, token: &str, service_url: Option<&str>) -> CredentialResult<bool> {
        if service_url.is_none() {
            if let Some(valid) = self.lifecycle.validate_cached(token, jwt::now_ms()) {
                return Ok(valid);
            }
        }
        self.strategy.validate_token(token, service_url).await
    }

    fn auth_type(&self) -> AuthType {
        self.strategy.auth_type()
    }
}
