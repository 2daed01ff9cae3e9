//! Refresh Token Grant
//!
//! RFC 6749 Section 6.

use super::grant::{push_opt, TokenEndpoint};
use crate::core::HttpTransport;
use crate::error::CredentialResult;
use crate::types::{AuthType, GrantType, TokenResult};

/// Redeem a refresh token. The result is tagged with the caller's `auth_type`.
pub async fn refresh_token(
    transport: &dyn HttpTransport,
    endpoint: &TokenEndpoint,
    refresh_token: &str,
    scope: Option<&str>,
    auth_type: AuthType,
) -> CredentialResult<TokenResult> {
    let mut params = vec![("refresh_token", refresh_token.to_string())];
    push_opt(&mut params, "scope", scope);

    endpoint
        .request_token(transport, GrantType::RefreshToken, params, auth_type)
        .await
}
