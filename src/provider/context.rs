//! Client Context
//!
//! Per-provider identity-provider binding: configuration, transport and
//! endpoint resolution (explicit, then discovery, then UAA defaults).

use std::sync::Arc;
use std::time::Duration;

use crate::core::{DiscoveryCache, HttpTransport};
use crate::error::CredentialResult;
use crate::flows::{refresh_token, TokenEndpoint};
use crate::types::{
    AuthType, AuthorizationConfig, ClientAuthMethod, DiscoveryDocument, ProviderEndpoints,
    TokenResult, DEFAULT_TIMEOUT_MS,
};

/// Resolves endpoint URLs for one identity provider.
#[derive(Clone)]
pub struct EndpointResolver {
    base_url: String,
    explicit: ProviderEndpoints,
    discovery: Option<Arc<DiscoveryCache>>,
}

impl EndpointResolver {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            explicit: ProviderEndpoints::default(),
            discovery: None,
        }
    }

    pub fn with_endpoints(mut self, endpoints: ProviderEndpoints) -> Self {
        self.explicit = endpoints;
        self
    }

    /// Consult OIDC discovery for endpoints that are not configured.
    pub fn with_discovery(mut self, cache: Arc<DiscoveryCache>) -> Self {
        self.discovery = Some(cache);
        self
    }

    pub fn discovery_enabled(&self) -> bool {
        self.discovery.is_some()
    }

    pub async fn token_endpoint(&self, transport: &dyn HttpTransport) -> CredentialResult<String> {
        self.resolve(
            transport,
            self.explicit.token_endpoint.as_deref(),
            |doc| Some(doc.token_endpoint.clone()),
            "/oauth/token",
        )
        .await
    }

    pub async fn authorization_endpoint(
        &self,
        transport: &dyn HttpTransport,
    ) -> CredentialResult<String> {
        self.resolve(
            transport,
            self.explicit.authorization_endpoint.as_deref(),
            |doc| doc.authorization_endpoint.clone(),
            "/oauth/authorize",
        )
        .await
    }

    pub async fn device_authorization_endpoint(
        &self,
        transport: &dyn HttpTransport,
    ) -> CredentialResult<String> {
        self.resolve(
            transport,
            self.explicit.device_authorization_endpoint.as_deref(),
            |doc| doc.device_authorization_endpoint.clone(),
            "/oauth/device_authorize",
        )
        .await
    }

    async fn resolve(
        &self,
        transport: &dyn HttpTransport,
        explicit: Option<&str>,
        from_document: impl Fn(&DiscoveryDocument) -> Option<String>,
        default_path: &str,
    ) -> CredentialResult<String> {
        if let Some(url) = explicit.filter(|u| !u.is_empty()) {
            return Ok(url.to_string());
        }

        if let Some(cache) = &self.discovery {
            let document = cache.discover(transport, &self.base_url).await?;
            if let Some(url) = from_document(&document) {
                return Ok(url);
            }
        }

        Ok(format!("{}{}", self.base_url, default_path))
    }
}

/// Everything a strategy needs to talk to its identity provider.
#[derive(Clone)]
pub struct ClientContext {
    pub config: AuthorizationConfig,
    pub transport: Arc<dyn HttpTransport>,
    pub endpoints: EndpointResolver,
    pub auth_method: ClientAuthMethod,
    /// Space-separated scopes sent with grants that accept them.
    pub scope: Option<String>,
    pub timeout: Duration,
}

impl ClientContext {
    pub fn new(config: AuthorizationConfig, transport: Arc<dyn HttpTransport>) -> Self {
        let endpoints = EndpointResolver::new(config.base_url());
        Self {
            config,
            transport,
            endpoints,
            auth_method: ClientAuthMethod::default(),
            scope: None,
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
        }
    }

    pub fn with_endpoints(mut self, endpoints: ProviderEndpoints) -> Self {
        self.endpoints = self.endpoints.with_endpoints(endpoints);
        self
    }

    pub fn with_discovery(mut self, cache: Arc<DiscoveryCache>) -> Self {
        self.endpoints = self.endpoints.with_discovery(cache);
        self
    }

    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = Some(scope.into());
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

    pub fn transport(&self) -> &dyn HttpTransport {
        self.transport.as_ref()
    }

    pub fn scope(&self) -> Option<&str> {
        self.scope.as_deref()
    }

    /// Resolve the token endpoint and bind this client to it.
    pub async fn token_endpoint(&self) -> CredentialResult<TokenEndpoint> {
        let url = self.endpoints.token_endpoint(self.transport()).await?;
        Ok(TokenEndpoint::from_config(url, &self.config)
            .with_auth_method(self.auth_method)
            .with_timeout(self.timeout))
    }

    /// `grant_type=refresh_token` against the resolved token endpoint.
    pub async fn refresh(&self, token: &str, auth_type: AuthType) -> CredentialResult<TokenResult> {
        let endpoint = self.token_endpoint().await?;
        refresh_token(self.transport(), &endpoint, token, self.scope(), auth_type).await
    }
}
