//! Providers built from JSON descriptors

use super::*;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use oauth2_credentials::{
    create_provider, generate_challenge, AuthType, CredentialError, DiscoveryCache,
    ProviderDependencies, ProviderDescriptor, ReqwestHttpTransport, TokenType,
};
use std::sync::Mutex;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::Mock;

#[tokio::test]
async fn test_saml_pure_expiry_comes_from_not_on_or_after() {
    let descriptor = ProviderDescriptor::from_json(
        r#"{
            "protocol": "saml2",
            "flow": "pure",
            "config": {"uaaUrl": "https://uaa.example.com", "clientId": "cf"}
        }"#,
    )
    .unwrap();

    let assertion = STANDARD.encode(r#"<Assertion NotOnOrAfter="2030-01-01T00:00:00Z">"#);
    let deps = ProviderDependencies::new()
        .with_transport(Arc::new(ReqwestHttpTransport::new().unwrap()))
        .with_saml_assertion_provider(Arc::new(move || {
            let assertion = assertion.clone();
            async move { Ok::<_, CredentialError>(assertion) }
        }))
        .with_session_cookie_provider(Arc::new(|_assertion: String| async {
            Ok::<_, CredentialError>("SESSION=abc".to_string())
        }));

    let mut provider = create_provider(descriptor, deps).unwrap();
    let tokens = provider.get_tokens().await.unwrap();

    let expected = chrono::DateTime::parse_from_rfc3339("2030-01-01T00:00:00Z")
        .unwrap()
        .timestamp_millis();
    assert_eq!(tokens.token_type, Some(TokenType::Saml));
    assert_eq!(tokens.expires_at, Some(expected));
    assert_eq!(tokens.authorization_token, "SESSION=abc");
    assert_eq!(provider.auth_type(), AuthType::Saml2Pure);
}

#[tokio::test]
async fn test_oidc_descriptor_discovers_and_uses_pkce() {
    let mock_server = setup_mock_server().await;
    let issuer = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/.well-known/openid-configuration"))
        .respond_with(success_response(json!({
            "issuer": issuer,
            "authorization_endpoint": format!("{issuer}/authorize"),
            "token_endpoint": format!("{issuer}/token")
        })))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains("grant_type=authorization_code"))
        .and(body_string_contains("code=host-code"))
        .respond_with(success_response(json!({
            "access_token": jwt_expiring_in(3600),
            "refresh_token": "oidc-rt"
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let descriptor = ProviderDescriptor::from_json(&format!(
        r#"{{
            "protocol": "oidc",
            "flow": "authorization_code",
            "config": {{"issuerUrl": "{issuer}", "clientId": "spa"}},
            "options": {{"redirectUri": "https://app.example.com/callback", "scope": "openid profile"}}
        }}"#
    ))
    .unwrap();

    let seen_url = Arc::new(Mutex::new(String::new()));
    let seen_by_source = seen_url.clone();
    let deps = ProviderDependencies::new()
        .with_transport(Arc::new(ReqwestHttpTransport::new().unwrap()))
        .with_discovery(Arc::new(DiscoveryCache::new()))
        .with_code_source(Arc::new(move |url: String| {
            *seen_by_source.lock().unwrap() = url;
            async { Ok::<_, CredentialError>("host-code".to_string()) }
        }));

    let mut provider = create_provider(descriptor, deps).unwrap();
    let tokens = provider.get_tokens().await.unwrap();
    assert_eq!(tokens.refresh_token.as_deref(), Some("oidc-rt"));
    // JWT exp drives the cache
    assert!(tokens.expires_at.is_some());

    let authorization_url = Url::parse(&seen_url.lock().unwrap()).unwrap();
    let query: HashMap<String, String> = authorization_url.query_pairs().into_owned().collect();
    assert_eq!(query["scope"], "openid profile");
    assert_eq!(query["code_challenge_method"], "S256");

    let requests = mock_server.received_requests().await.unwrap();
    let exchange = form(requests.last().unwrap());
    assert_eq!(exchange["redirect_uri"], "https://app.example.com/callback");
    assert_eq!(generate_challenge(&exchange["code_verifier"]), query["code_challenge"]);
}

#[test]
fn test_unsupported_combination() {
    let descriptor = ProviderDescriptor::from_json(
        r#"{"protocol": "saml2", "flow": "device_code",
            "config": {"uaaUrl": "https://uaa.example.com", "clientId": "cf"}}"#,
    )
    .unwrap();
    let deps = ProviderDependencies::new()
        .with_transport(Arc::new(oauth2_credentials::MockHttpTransport::new()));

    let err = create_provider(descriptor, deps).err().unwrap();
    assert_eq!(
        err.to_string(),
        "Configuration error: Unsupported provider: protocol saml2, flow device_code"
    );
}
