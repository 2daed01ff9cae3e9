//! Cache, refresh and login against a real token endpoint

use super::*;
use oauth2_credentials::{
    AuthType, AuthorizationCodeProvider, AuthorizationCodeStrategy, AuthorizationConfig,
    CallbackOptions, ClientContext, PasswordProvider, PasswordSource, PasswordStrategy,
    ReqwestHttpTransport, TokenProvider,
};
use tokio_test::{assert_err, assert_ok};
use wiremock::matchers::{body_string_contains, header_exists, method, path};
use wiremock::Mock;

fn transport() -> Arc<ReqwestHttpTransport> {
    Arc::new(ReqwestHttpTransport::new().unwrap())
}

#[tokio::test]
async fn test_expired_access_token_is_refreshed_with_basic_auth() {
    let mock_server = setup_mock_server().await;
    let fresh = jwt_expiring_in(3600);

    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .and(header_exists("authorization"))
        .and(body_string_contains("grant_type=refresh_token"))
        .and(body_string_contains("refresh_token=rt"))
        .respond_with(success_response(json!({
            "access_token": fresh,
            "token_type": "bearer"
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let config = AuthorizationConfig::new(mock_server.uri(), "cf")
        .with_client_secret("secret")
        .with_access_token(jwt_expiring_in(-3600))
        .with_refresh_token("rt");
    let strategy = AuthorizationCodeStrategy::new(
        ClientContext::new(config, transport()),
        CallbackOptions::new(BrowserMode::None),
    )
    .unwrap();
    let mut provider = AuthorizationCodeProvider::new(strategy);

    let first = provider.get_tokens().await.unwrap();
    assert_eq!(first.authorization_token, fresh);
    assert_eq!(first.auth_type, AuthType::AuthorizationCode);
    assert_eq!(first.refresh_token.as_deref(), Some("rt"));

    // Served from the cache; the mock expects exactly one call
    let second = provider.get_tokens().await.unwrap();
    assert_eq!(second.authorization_token, fresh);
}

#[tokio::test]
async fn test_refresh_failure_falls_back_to_login_once() {
    let mock_server = setup_mock_server().await;

    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .and(body_string_contains("grant_type=refresh_token"))
        .respond_with(error_response(400, "invalid_grant"))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .and(body_string_contains("grant_type=password"))
        .respond_with(error_response(500, "server_error"))
        .expect(2)
        .mount(&mock_server)
        .await;

    let config = AuthorizationConfig::new(mock_server.uri(), "cf").with_refresh_token("stale");
    let strategy = PasswordStrategy::new(
        ClientContext::new(config, transport()),
        PasswordSource::password("alice", "pw"),
    )
    .unwrap();
    let mut provider = PasswordProvider::new(strategy);

    assert_err!(provider.get_tokens().await);
    assert!(!provider.cached_state().has_refresh_token());

    // No refresh token left: straight to login
    assert_err!(provider.get_tokens().await);

    let grants: Vec<String> = mock_server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .map(|r| form(r)["grant_type"].clone())
        .collect();
    assert_eq!(grants, vec!["refresh_token", "password", "password"]);
}

#[tokio::test]
async fn test_browser_login_round_trip() {
    let mock_server = setup_mock_server().await;

    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .and(body_string_contains("grant_type=authorization_code"))
        .and(body_string_contains("code=browser-code"))
        .respond_with(success_response(json!({
            "access_token": "at-1",
            "refresh_token": "rt-1",
            "expires_in": 3600
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let config = AuthorizationConfig::new(mock_server.uri(), "cf").with_client_secret("secret");
    let callback = CallbackOptions::new(BrowserMode::System)
        .with_base_port(0)
        .with_signal_handling(false)
        .with_launcher(CodeReturningLauncher::shared("browser-code"));
    let strategy =
        AuthorizationCodeStrategy::new(ClientContext::new(config, transport()), callback).unwrap();
    let mut provider = AuthorizationCodeProvider::new(strategy);

    let tokens = assert_ok!(provider.get_tokens().await);
    assert_eq!(tokens.authorization_token, "at-1");
    assert_eq!(tokens.refresh_token.as_deref(), Some("rt-1"));

    let requests = mock_server.received_requests().await.unwrap();
    let redirect_uri = &form(&requests[0])["redirect_uri"];
    assert!(redirect_uri.starts_with("http://localhost:"));
    assert!(redirect_uri.ends_with("/callback"));
}
