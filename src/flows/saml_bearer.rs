//! SAML2 Bearer Assertion Grant
//!
//! RFC 7522 - exchanging a SAML 2.0 assertion for an access token.

use super::grant::{push_opt, TokenEndpoint};
use crate::core::HttpTransport;
use crate::error::CredentialResult;
use crate::types::{AuthType, GrantType, TokenResult};

/// Exchange a base64 SAML assertion for a token. The assertion is sent as
/// given.
pub async fn saml_bearer(
    transport: &dyn HttpTransport,
    endpoint: &TokenEndpoint,
    assertion: &str,
    scope: Option<&str>,
) -> CredentialResult<TokenResult> {
    let mut params = vec![("assertion", assertion.to_string())];
    push_opt(&mut params, "scope", scope);

    endpoint
        .request_token(transport, GrantType::Saml2Bearer, params, AuthType::Saml2Bearer)
        .await
}
