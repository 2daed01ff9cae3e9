//! Caller-Supplied Capabilities
//!
//! Hooks a host plugs into strategies. Each trait is implemented for async
//! closures, so `|url| async move { ... }` works wherever one is expected.

use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;

use crate::error::CredentialResult;
use crate::types::DeviceFlowSession;

/// Obtains an authorization code for an authorization URL without the local
/// listener (e.g. a host-owned redirect handler).
#[async_trait]
pub trait AuthorizationCodeSource: Send + Sync {
    async fn authorization_code(&self, authorization_url: &str) -> CredentialResult<String>;
}

#[async_trait]
impl<F, Fut> AuthorizationCodeSource for F
where
    F: Fn(String) -> Fut + Send + Sync,
    Fut: Future<Output = CredentialResult<String>> + Send + 'static,
{
    async fn authorization_code(&self, authorization_url: &str) -> CredentialResult<String> {
        self(authorization_url.to_string()).await
    }
}

/// Supplies a UAA one-time passcode on demand.
#[async_trait]
pub trait PasscodeProvider: Send + Sync {
    async fn passcode(&self) -> CredentialResult<String>;
}

#[async_trait]
impl<F, Fut> PasscodeProvider for F
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = CredentialResult<String>> + Send + 'static,
{
    async fn passcode(&self) -> CredentialResult<String> {
        self().await
    }
}

/// Supplies a base64 SAML assertion (or full response).
#[async_trait]
pub trait SamlAssertionProvider: Send + Sync {
    async fn saml_assertion(&self) -> CredentialResult<String>;
}

#[async_trait]
impl<F, Fut> SamlAssertionProvider for F
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = CredentialResult<String>> + Send + 'static,
{
    async fn saml_assertion(&self) -> CredentialResult<String> {
        self().await
    }
}

/// Turns a SAML assertion into a session cookie string for the service.
#[async_trait]
pub trait SessionCookieProvider: Send + Sync {
    async fn session_cookie(&self, assertion: &str) -> CredentialResult<String>;
}

#[async_trait]
impl<F, Fut> SessionCookieProvider for F
where
    F: Fn(String) -> Fut + Send + Sync,
    Fut: Future<Output = CredentialResult<String>> + Send + 'static,
{
    async fn session_cookie(&self, assertion: &str) -> CredentialResult<String> {
        self(assertion.to_string()).await
    }
}

/// Receives the device session so a host can show the user code.
pub type DevicePrompt = Arc<dyn Fn(&DeviceFlowSession) + Send + Sync>;
