//! Device Authorization Flow
//!
//! RFC 8628 - OAuth 2.0 Device Authorization Grant: the init request, a
//! single poll attempt, and the bounded polling loop.

use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, info};

use super::grant::{check_status, parse_json, push_opt, TokenEndpoint};
use crate::core::HttpTransport;
use crate::error::{
    create_error_from_response, parse_error_response, CredentialResult, DeviceFlowError,
    ProtocolError,
};
use crate::types::{DeviceFlowSession, DevicePollOutcome, GrantType, TokenResponse};

/// Upper bound on poll attempts (~10 minutes at the default interval).
pub const MAX_POLL_ATTEMPTS: u32 = 120;

/// Added to the interval on every `slow_down`.
pub const SLOW_DOWN_INCREMENT: Duration = Duration::from_secs(5);

/// Start a device authorization: POST `client_id[, scope]`.
pub async fn request_device_authorization(
    transport: &dyn HttpTransport,
    device_authorization_endpoint: &str,
    client: &TokenEndpoint,
    scope: Option<&str>,
) -> CredentialResult<DeviceFlowSession> {
    let mut params = Vec::new();
    push_opt(&mut params, "scope", scope);

    // Public clients identify themselves in the body even without a secret
    let mut request = client.form_request(device_authorization_endpoint, params);
    if request.headers.contains_key("authorization") {
        let body = request.body.take().unwrap_or_default();
        let client_id = format!("client_id={}", urlencoding::encode(&client.client_id));
        request.body = Some(if body.is_empty() {
            client_id
        } else {
            format!("{}&{}", body, client_id)
        });
    }

    let response = transport.send(request).await?;
    check_status(&response)?;
    let session: DeviceFlowSession = parse_json(&response.body)?;

    info!(
        user_code = %session.user_code,
        verification_uri = %session.display_uri(),
        expires_in = session.expires_in,
        "device authorization started"
    );
    Ok(session)
}

/// One poll of the token endpoint with the device code.
pub async fn poll_device_token(
    transport: &dyn HttpTransport,
    endpoint: &TokenEndpoint,
    device_code: &str,
) -> CredentialResult<DevicePollOutcome> {
    let params = vec![
        ("grant_type", GrantType::DeviceCode.as_str().to_string()),
        ("device_code", device_code.to_string()),
    ];
    let response = transport
        .send(endpoint.form_request(&endpoint.url, params))
        .await?;

    if response.is_success() {
        let token: TokenResponse = parse_json(&response.body)?;
        if token.access_token.as_deref().map_or(true, str::is_empty) {
            return Err(ProtocolError::MissingField {
                field: "access_token".to_string(),
            }
            .into());
        }
        return Ok(DevicePollOutcome::Success(token));
    }

    let Some(error) = parse_error_response(&response.body) else {
        return Err(create_error_from_response(response.status, &response.body));
    };

    match error.error.as_str() {
        "authorization_pending" => Ok(DevicePollOutcome::Pending),
        "slow_down" => Ok(DevicePollOutcome::SlowDown),
        "expired_token" => Ok(DevicePollOutcome::Expired),
        "access_denied" => Ok(DevicePollOutcome::AccessDenied),
        _ => Err(DeviceFlowError::Unexpected {
            error: error.error,
            error_description: error.error_description,
        }
        .into()),
    }
}

/// A single poll attempt, abstracted so the loop can be driven by tests.
#[async_trait]
pub trait DeviceTokenPoll: Send + Sync {
    async fn poll_once(&self, device_code: &str) -> CredentialResult<DevicePollOutcome>;
}

/// [`DeviceTokenPoll`] against a real token endpoint.
pub struct EndpointPoll<'a> {
    pub transport: &'a dyn HttpTransport,
    pub endpoint: &'a TokenEndpoint,
}

#[async_trait]
impl DeviceTokenPoll for EndpointPoll<'_> {
    async fn poll_once(&self, device_code: &str) -> CredentialResult<DevicePollOutcome> {
        poll_device_token(self.transport, self.endpoint, device_code).await
    }
}

/// Polls until the user completes authorization, honoring `slow_down`.
#[derive(Clone, Debug)]
pub struct DevicePoller {
    pub max_attempts: u32,
}

impl Default for DevicePoller {
    fn default() -> Self {
        Self {
            max_attempts: MAX_POLL_ATTEMPTS,
        }
    }
}

impl DevicePoller {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Poll until a token arrives or a terminal outcome is reached.
    ///
    /// Every attempt, the first included, waits the current interval;
    /// `slow_down` lengthens it for all later attempts.
    pub async fn poll_for_tokens(
        &self,
        poll: &dyn DeviceTokenPoll,
        device_code: &str,
        initial_interval: Duration,
    ) -> CredentialResult<TokenResponse> {
        let mut interval = initial_interval;

        for attempt in 1..=self.max_attempts {
            tokio::time::sleep(interval).await;

            match poll.poll_once(device_code).await? {
                DevicePollOutcome::Success(token) => {
                    debug!(attempt, "device authorization complete");
                    return Ok(token);
                }
                DevicePollOutcome::Pending => {
                    debug!(attempt, interval_secs = interval.as_secs(), "authorization pending");
                }
                DevicePollOutcome::SlowDown => {
                    interval += SLOW_DOWN_INCREMENT;
                    debug!(attempt, interval_secs = interval.as_secs(), "slow_down, backing off");
                }
                DevicePollOutcome::Expired => return Err(DeviceFlowError::ExpiredToken.into()),
                DevicePollOutcome::AccessDenied => {
                    return Err(DeviceFlowError::AccessDenied.into())
                }
            }
        }

        Err(DeviceFlowError::PollingTimeout {
            attempts: self.max_attempts,
        }
        .into())
    }
}
