//! Token Providers
//!
//! [`TokenProvider`] is the contract hosts program against. Each protocol
//! variant is a [`TokenStrategy`] composed with the shared
//! [`TokenLifecycle`] by [`ManagedTokenProvider`]:
//!
//! | Alias | Strategy |
//! |---|---|
//! | [`AuthorizationCodeProvider`] | UAA browser login |
//! | [`OidcBrowserProvider`] | OIDC browser login with PKCE |
//! | [`DeviceFlowProvider`] | RFC 8628 device flow |
//! | [`ClientCredentialsProvider`] | client credentials |
//! | [`PasswordProvider`] | password or UAA passcode |
//! | [`TokenExchangeProvider`] | RFC 8693 token exchange |
//! | [`Saml2BearerProvider`] | RFC 7522 SAML2 bearer |
//! | [`Saml2PureProvider`] | SAML assertion to session cookie |

use async_trait::async_trait;

use crate::error::CredentialResult;
use crate::types::{AuthType, TokenResult};

pub mod authorization_code;
pub mod capability;
pub mod client_credentials;
pub mod context;
pub mod device;
pub mod factory;
pub mod lifecycle;
pub mod oidc;
pub mod password;
pub mod saml;
pub mod token_exchange;

pub use authorization_code::{AuthorizationCodeProvider, AuthorizationCodeStrategy};
pub use capability::{
    AuthorizationCodeSource, DevicePrompt, PasscodeProvider, SamlAssertionProvider,
    SessionCookieProvider,
};
pub use client_credentials::{ClientCredentialsProvider, ClientCredentialsStrategy};
pub use context::{ClientContext, EndpointResolver};
pub use device::{DeviceFlowProvider, DeviceFlowStrategy};
pub use factory::{
    create_provider, Flow, Protocol, ProviderDependencies, ProviderDescriptor, ProviderOptions,
};
pub use lifecycle::{ManagedTokenProvider, TokenLifecycle, TokenStrategy};
pub use oidc::{OidcBrowserProvider, OidcOptions, OidcStrategy, DEFAULT_OIDC_SCOPE};
pub use password::{PasswordProvider, PasswordSource, PasswordStrategy};
pub use saml::{
    BrowserSamlAssertionProvider, Saml2BearerProvider, Saml2BearerStrategy, Saml2PureProvider,
    Saml2PureStrategy,
};
pub use token_exchange::{TokenExchangeProvider, TokenExchangeStrategy};

/// Obtains and validates credentials for one identity-provider binding.
///
/// A provider owns its cache; calls on one instance must not overlap, which
/// `&mut self` enforces.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// Cached credentials if still valid, otherwise refreshed or new ones.
    async fn get_tokens(&mut self) -> CredentialResult<TokenResult>;

    /// Whether `token` is still usable. With a `service_url` some variants
    /// ask the service; otherwise the check is local.
    async fn validate_token(&self, token: &str, service_url: Option<&str>)
        -> CredentialResult<bool>;

    fn auth_type(&self) -> AuthType;
}
