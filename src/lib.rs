//! OAuth2 / OIDC / SAML2 Credentials
//!
//! Obtains, caches, validates and refreshes bearer credentials for a calling
//! application, choosing among seven protocol flows.
//!
//! # Features
//!
//! - Authorization Code with a local callback listener (RFC 6749 Section 4.1)
//! - OIDC Authorization Code with PKCE (RFC 7636) and discovery
//! - Device Authorization Flow (RFC 8628)
//! - Client Credentials (RFC 6749 Section 4.4)
//! - Password and UAA passcode (RFC 6749 Section 4.3)
//! - Token Exchange (RFC 8693)
//! - SAML2 Bearer Assertion (RFC 7522) and SAML2 session cookies
//!
//! # Example
//!
//! ```rust,ignore
//! use oauth2_credentials::{
//!     authorization_config, ClientContext, DeviceFlowProvider, DeviceFlowStrategy,
//!     ReqwestHttpTransport, TokenProvider,
//! };
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = authorization_config()
//!         .uaa_url("https://uaa.example.com")
//!         .client_id("cf")
//!         .build()?;
//!
//!     let transport = Arc::new(ReqwestHttpTransport::new()?);
//!     let strategy = DeviceFlowStrategy::new(ClientContext::new(config, transport))?;
//!     let mut provider = DeviceFlowProvider::new(strategy);
//!
//!     let tokens = provider.get_tokens().await?;
//!     println!("{}", tokens.authorization_header());
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! - `types`: configuration, token and callback data structures
//! - `error`: layered error hierarchy
//! - `core`: HTTP transport, PKCE, discovery, JWT and SAML helpers
//! - `flows`: stateless protocol functions, one HTTP exchange each
//! - `callback`: local loopback listener and browser launching
//! - `provider`: token lifecycle, strategies and the provider factory
//! - `builders`: fluent configuration builder

pub mod builders;
pub mod callback;
pub mod core;
pub mod error;
pub mod flows;
pub mod provider;
pub mod types;

// Re-export builders
pub use builders::{authorization_config, AuthorizationConfigBuilder};

// Re-export errors
pub use error::{
    create_error_from_response, parse_error_response, BrowserAuthError, ConfigurationError,
    CredentialError, CredentialResult, DeviceFlowError, NetworkError, OAuth2ErrorResponse,
    ProtocolError, ProviderError, RefreshError, ServiceKeyError, SessionDataError,
    ValidationError,
};

// Re-export types
pub use types::{
    AuthType, AuthorizationConfig, CachedTokenState, CallbackParams, CallbackPayload,
    ClientAuthMethod, DeviceFlowSession, DevicePollOutcome, DiscoveryDocument, GrantType,
    ProviderEndpoints, TokenResponse, TokenResult, TokenType,
};

// Re-export core components
pub use core::{
    generate_challenge, generate_state, generate_verifier, DiscoveryCache, HttpMethod,
    HttpRequest, HttpResponse, HttpTransport, MockHttpTransport, PkceChallenge,
    ReqwestHttpTransport, SamlAuthnRequest,
};

// Re-export callback listener
pub use callback::{
    start_callback, BrowserLauncher, BrowserMode, CallbackKind, CallbackListener,
    CallbackOptions, SystemBrowserLauncher,
};

// Re-export flows
pub use flows::{DevicePoller, DeviceTokenPoll, PasswordCredentials, TokenEndpoint, TokenExchangeRequest};

// Re-export providers
pub use provider::{
    create_provider, AuthorizationCodeProvider, AuthorizationCodeSource,
    AuthorizationCodeStrategy, BrowserSamlAssertionProvider, ClientContext,
    ClientCredentialsProvider, ClientCredentialsStrategy, DeviceFlowProvider,
    DeviceFlowStrategy, DevicePrompt, Flow, ManagedTokenProvider, OidcBrowserProvider,
    OidcOptions, OidcStrategy, PasscodeProvider, PasswordProvider, PasswordSource,
    PasswordStrategy, Protocol, ProviderDependencies, ProviderDescriptor, ProviderOptions,
    Saml2BearerProvider, Saml2BearerStrategy, Saml2PureProvider, Saml2PureStrategy,
    SamlAssertionProvider, SessionCookieProvider, TokenExchangeProvider, TokenExchangeStrategy,
    TokenLifecycle, TokenProvider, TokenStrategy,
};
