//! Device Authorization Types
//!
//! Types for the OAuth2 Device Authorization Grant (RFC 8628).

use serde::{Deserialize, Serialize};

use super::TokenResponse;

/// Default polling interval when the server omits one.
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 5;

/// Device authorization response; consumed, never mutated, by the poller.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DeviceFlowSession {
    /// Device verification code (not shown to user).
    pub device_code: String,
    /// User code to display.
    pub user_code: String,
    /// URI for user to visit.
    #[serde(alias = "verification_url")]
    pub verification_uri: String,
    /// URI with code pre-filled.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verification_uri_complete: Option<String>,
    /// Lifetime in seconds.
    pub expires_in: u64,
    /// Minimum polling interval in seconds.
    #[serde(default)]
    pub interval: Option<u64>,
}

impl DeviceFlowSession {
    /// Polling interval, defaulting to 5 seconds.
    pub fn polling_interval(&self) -> u64 {
        self.interval.unwrap_or(DEFAULT_POLL_INTERVAL_SECS)
    }

    /// Best URI to show the user.
    pub fn display_uri(&self) -> &str {
        self.verification_uri_complete
            .as_deref()
            .unwrap_or(&self.verification_uri)
    }
}

/// Outcome of a single device token poll.
#[derive(Clone, Debug)]
pub enum DevicePollOutcome {
    /// Token received.
    Success(TokenResponse),
    /// User has not completed authorization yet.
    Pending,
    /// Server asks for a longer interval.
    SlowDown,
    /// Device code expired.
    Expired,
    /// User denied the request.
    AccessDenied,
}
