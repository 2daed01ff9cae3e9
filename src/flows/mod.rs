//! OAuth2 / SAML2 Protocol Functions
//!
//! One HTTP exchange per operation, no cached state:
//!
//! - **Authorization Code** (RFC 6749 Section 4.1, PKCE per RFC 7636)
//! - **Refresh Token** (RFC 6749 Section 6)
//! - **Client Credentials** (RFC 6749 Section 4.4)
//! - **Password / Passcode** (RFC 6749 Section 4.3, UAA passcode)
//! - **Token Exchange** (RFC 8693)
//! - **SAML2 Bearer** (RFC 7522)
//! - **Device Authorization** (RFC 8628) and its polling loop
//! - **Liveness probe** against a protected service

pub mod authorization_code;
pub mod client_credentials;
pub mod device;
pub mod grant;
pub mod password;
pub mod probe;
pub mod refresh;
pub mod saml_bearer;
pub mod token_exchange;

pub use authorization_code::{build_authorization_url, exchange_code, AuthorizationParams};
pub use client_credentials::client_credentials;
pub use device::{
    poll_device_token, request_device_authorization, DevicePoller, DeviceTokenPoll, EndpointPoll,
    MAX_POLL_ATTEMPTS,
};
pub use grant::{into_token_result, TokenEndpoint};
pub use password::{password_grant, PasswordCredentials};
pub use probe::{probe_liveness, ProbeCredential};
pub use refresh::refresh_token;
pub use saml_bearer::saml_bearer;
pub use token_exchange::{token_exchange, TokenExchangeRequest};
