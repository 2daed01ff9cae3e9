//! Integration tests using WireMock
//!
//! Token, device and discovery endpoints are WireMock servers; browser flows
//! run the real loopback listener with a launcher that plays the browser.

mod callback;
mod device_flow;
mod discovery;
mod factory;
mod lifecycle;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use oauth2_credentials::{BrowserLauncher, BrowserMode};
use serde_json::json;
use std::collections::HashMap;
use std::io;
use std::sync::Arc;
use url::Url;
use wiremock::{MockServer, ResponseTemplate};

/// Helper to start a mock identity provider
pub async fn setup_mock_server() -> MockServer {
    MockServer::start().await
}

/// Helper to create success response templates
pub fn success_response(body: serde_json::Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(body)
}

/// Helper to create error response templates
pub fn error_response(status: u16, error: &str) -> ResponseTemplate {
    ResponseTemplate::new(status).set_body_json(json!({ "error": error }))
}

/// Unsigned JWT whose `exp` is `offset_secs` from now.
pub fn jwt_expiring_in(offset_secs: i64) -> String {
    let exp = chrono::Utc::now().timestamp() + offset_secs;
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"none","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(json!({ "sub": "user", "exp": exp }).to_string());
    format!("{header}.{payload}.sig")
}

/// Form-decoded body of a recorded request.
pub fn form(request: &wiremock::Request) -> HashMap<String, String> {
    url::form_urlencoded::parse(&request.body).into_owned().collect()
}

/// Follows the authorization URL's `redirect_uri` back to the listener with
/// a fixed code and the echoed state.
pub struct CodeReturningLauncher {
    pub code: String,
}

impl CodeReturningLauncher {
    pub fn shared(code: &str) -> Arc<dyn BrowserLauncher> {
        Arc::new(Self {
            code: code.to_string(),
        })
    }
}

impl BrowserLauncher for CodeReturningLauncher {
    fn launch(&self, url: &str, _mode: BrowserMode) -> io::Result<()> {
        let url = Url::parse(url).map_err(io::Error::other)?;
        let query: HashMap<String, String> = url.query_pairs().into_owned().collect();
        let redirect = query
            .get("redirect_uri")
            .ok_or_else(|| io::Error::other("no redirect_uri"))?;

        let mut target = Url::parse(redirect).map_err(io::Error::other)?;
        target
            .set_host(Some("127.0.0.1"))
            .map_err(io::Error::other)?;
        {
            let mut pairs = target.query_pairs_mut();
            pairs.append_pair("code", &self.code);
            if let Some(state) = query.get("state") {
                pairs.append_pair("state", state);
            }
        }

        tokio::spawn(async move {
            let _ = reqwest::get(target).await;
        });
        Ok(())
    }
}
