//! Client Credentials Flow
//!
//! RFC 6749 Section 4.4 - Client Credentials Grant.

use super::grant::{push_opt, TokenEndpoint};
use crate::core::HttpTransport;
use crate::error::CredentialResult;
use crate::types::{AuthType, GrantType, TokenResult};

/// Request a token for the client itself. Any refresh token in the
/// response is dropped; this grant has no refresh semantics.
pub async fn client_credentials(
    transport: &dyn HttpTransport,
    endpoint: &TokenEndpoint,
    scope: Option<&str>,
) -> CredentialResult<TokenResult> {
    let mut params = Vec::new();
    push_opt(&mut params, "scope", scope);

    let result = endpoint
        .request_token(
            transport,
            GrantType::ClientCredentials,
            params,
            AuthType::ClientCredentials,
        )
        .await?;
    Ok(result.without_refresh_token())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::MockHttpTransport;
    use serde_json::json;

    #[tokio::test]
    async fn test_client_credentials_never_carries_refresh_token() {
        let transport = MockHttpTransport::new();
        transport.queue_json_response(
            200,
            json!({"access_token": "cc", "refresh_token": "unexpected", "expires_in": 43199}),
        );
        let endpoint =
            TokenEndpoint::new("https://uaa.example.com/oauth/token", "svc").with_client_secret("s");

        let result = client_credentials(&transport, &endpoint, Some("uaa.resource"))
            .await
            .unwrap();

        assert_eq!(result.authorization_token, "cc");
        assert!(result.refresh_token.is_none());
        assert_eq!(result.expires_in, Some(43199));

        let params = transport.get_last_request().unwrap().form_params();
        assert_eq!(params["grant_type"], "client_credentials");
        assert_eq!(params["scope"], "uaa.resource");
    }
}
