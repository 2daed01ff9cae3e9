//! Device flow end to end

use super::*;
use oauth2_credentials::{
    AuthType, AuthorizationConfig, ClientContext, DeviceFlowProvider, DeviceFlowSession,
    DeviceFlowStrategy, DevicePrompt, ReqwestHttpTransport, TokenProvider,
};
use std::sync::Mutex;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, Request, Respond};

/// Answers `authorization_pending` until the configured attempt.
struct PendingThenToken {
    pending: usize,
    calls: Mutex<usize>,
}

impl Respond for PendingThenToken {
    fn respond(&self, _request: &Request) -> ResponseTemplate {
        let mut calls = self.calls.lock().unwrap();
        *calls += 1;
        if *calls <= self.pending {
            error_response(400, "authorization_pending")
        } else {
            success_response(json!({
                "access_token": "device-at",
                "refresh_token": "device-rt",
                "expires_in": 3600
            }))
        }
    }
}

#[tokio::test]
async fn test_device_flow_polls_until_authorized() {
    let mock_server = setup_mock_server().await;

    Mock::given(method("POST"))
        .and(path("/oauth/device_authorize"))
        .and(body_string_contains("client_id=cf"))
        .respond_with(success_response(json!({
            "device_code": "dc-1",
            "user_code": "ABCD-EFGH",
            "verification_uri": format!("{}/device", mock_server.uri()),
            "expires_in": 600,
            "interval": 0
        })))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .and(body_string_contains("device_code=dc-1"))
        .respond_with(PendingThenToken {
            pending: 2,
            calls: Mutex::new(0),
        })
        .expect(3)
        .mount(&mock_server)
        .await;

    let prompted = Arc::new(Mutex::new(None));
    let prompted_by_hook = prompted.clone();
    let prompt: DevicePrompt = Arc::new(move |session: &DeviceFlowSession| {
        *prompted_by_hook.lock().unwrap() = Some(session.user_code.clone());
    });

    let context = ClientContext::new(
        AuthorizationConfig::new(mock_server.uri(), "cf"),
        Arc::new(ReqwestHttpTransport::new().unwrap()),
    );
    let strategy = DeviceFlowStrategy::new(context).unwrap().with_prompt(prompt);
    let mut provider = DeviceFlowProvider::new(strategy);

    let tokens = provider.get_tokens().await.unwrap();
    assert_eq!(tokens.authorization_token, "device-at");
    assert_eq!(tokens.refresh_token.as_deref(), Some("device-rt"));
    assert_eq!(tokens.auth_type, AuthType::DeviceCode);
    assert_eq!(prompted.lock().unwrap().as_deref(), Some("ABCD-EFGH"));
}

#[tokio::test]
async fn test_expired_device_code_is_terminal() {
    let mock_server = setup_mock_server().await;

    Mock::given(method("POST"))
        .and(path("/oauth/device_authorize"))
        .respond_with(success_response(json!({
            "device_code": "dc-2",
            "user_code": "WXYZ",
            "verification_uri": "https://uaa.example.com/device",
            "expires_in": 1,
            "interval": 0
        })))
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .respond_with(error_response(400, "expired_token"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let context = ClientContext::new(
        AuthorizationConfig::new(mock_server.uri(), "cf"),
        Arc::new(ReqwestHttpTransport::new().unwrap()),
    );
    let mut provider = DeviceFlowProvider::new(DeviceFlowStrategy::new(context).unwrap());

    let err = provider.get_tokens().await.unwrap_err();
    assert_eq!(err.error_code(), "CRED_DEVICE");
}
