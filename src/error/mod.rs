//! Credential Error Types
//!
//! Layered error hierarchy: one root enum wrapping one enum per concern.

use std::time::Duration;
use thiserror::Error;

/// Root error type for credential acquisition.
#[derive(Error, Debug)]
pub enum CredentialError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Refresh error: {0}")]
    Refresh(#[from] RefreshError),

    #[error("Browser authentication error: {0}")]
    BrowserAuth(#[from] BrowserAuthError),

    #[error("Session data error: {0}")]
    SessionData(#[from] SessionDataError),

    #[error("Service key error: {0}")]
    ServiceKey(#[from] ServiceKeyError),

    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("Device flow error: {0}")]
    DeviceFlow(#[from] DeviceFlowError),

    #[error("Network error: {0}")]
    Network(#[from] NetworkError),

    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),
}

impl CredentialError {
    /// Get a stable error code for diagnostics.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "CRED_VALIDATION",
            Self::Refresh(_) => "CRED_REFRESH",
            Self::BrowserAuth(_) => "CRED_BROWSER",
            Self::SessionData(_) => "CRED_SESSION",
            Self::ServiceKey(_) => "CRED_SERVICE_KEY",
            Self::Configuration(_) => "CRED_CONFIG",
            Self::DeviceFlow(_) => "CRED_DEVICE",
            Self::Network(_) => "CRED_NETWORK",
            Self::Protocol(_) => "CRED_PROTOCOL",
            Self::Provider(_) => "CRED_PROVIDER",
        }
    }

    /// Check if error is retryable.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network(e) => e.is_retryable(),
            Self::Provider(ProviderError::ServerError { .. }) => true,
            Self::Provider(ProviderError::TemporarilyUnavailable { .. }) => true,
            Self::Refresh(e) => e.source.is_retryable(),
            _ => false,
        }
    }

    /// Check if error requires a fresh interactive login.
    pub fn needs_reauth(&self) -> bool {
        matches!(
            self,
            Self::Refresh(_)
                | Self::Provider(ProviderError::InvalidGrant { .. })
                | Self::DeviceFlow(DeviceFlowError::ExpiredToken)
                | Self::DeviceFlow(DeviceFlowError::AccessDenied)
        )
    }

    /// Authorization URL embedded in a browser error, if any.
    pub fn authorization_url(&self) -> Option<&str> {
        match self {
            Self::BrowserAuth(e) => e.authorization_url(),
            _ => None,
        }
    }
}

/// Missing required configuration, reported all at once.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("missing required configuration: {}", .missing.join(", "))]
pub struct ValidationError {
    /// Every missing field name, in declaration order.
    pub missing: Vec<String>,
}

impl ValidationError {
    /// Collect the names of absent or blank fields.
    ///
    /// Returns `Ok(())` when every field is present.
    pub fn check(fields: &[(&str, Option<&str>)]) -> Result<(), ValidationError> {
        let missing: Vec<String> = fields
            .iter()
            .filter(|(_, value)| value.map_or(true, |v| v.trim().is_empty()))
            .map(|(name, _)| (*name).to_string())
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(ValidationError { missing })
        }
    }

    /// Single missing field.
    pub fn field(name: impl Into<String>) -> Self {
        Self {
            missing: vec![name.into()],
        }
    }
}

/// Refresh attempt failed; wraps the underlying cause.
#[derive(Error, Debug)]
#[error("token refresh failed: {source}")]
pub struct RefreshError {
    #[source]
    pub source: Box<CredentialError>,
}

impl RefreshError {
    pub fn new(source: CredentialError) -> Self {
        Self {
            source: Box::new(source),
        }
    }
}

/// Browser launch or local callback listener failure.
#[derive(Error, Debug)]
pub enum BrowserAuthError {
    #[error("no free callback port in {first}..={last}")]
    PortUnavailable { first: u16, last: u16 },

    #[error("failed to open browser ({message}); open manually: {authorization_url}")]
    LaunchFailed {
        message: String,
        authorization_url: String,
    },

    #[error("browser disabled; complete authorization manually: {authorization_url}")]
    NonInteractive { authorization_url: String },

    #[error("authorization failed: {error}{}; url: {authorization_url}", .description.as_deref().map(|d| format!(" ({d})")).unwrap_or_default())]
    AuthorizationDenied {
        error: String,
        description: Option<String>,
        authorization_url: String,
    },

    #[error("callback did not include an authorization code; url: {authorization_url}")]
    MissingCode { authorization_url: String },

    #[error("callback did not include a SAMLResponse; url: {authorization_url}")]
    MissingSamlResponse { authorization_url: String },

    #[error("callback state mismatch (possible CSRF); url: {authorization_url}")]
    StateMismatch { authorization_url: String },

    #[error("no callback received within {timeout:?}; url: {authorization_url}")]
    Timeout {
        timeout: Duration,
        authorization_url: String,
    },

    #[error("interrupted by termination signal; url: {authorization_url}")]
    Interrupted { authorization_url: String },

    #[error("callback listener failed: {message}")]
    Listener { message: String },
}

impl BrowserAuthError {
    /// Authorization URL for manual completion, if one was built.
    pub fn authorization_url(&self) -> Option<&str> {
        match self {
            Self::LaunchFailed {
                authorization_url, ..
            }
            | Self::NonInteractive { authorization_url }
            | Self::AuthorizationDenied {
                authorization_url, ..
            }
            | Self::MissingCode { authorization_url }
            | Self::MissingSamlResponse { authorization_url }
            | Self::StateMismatch { authorization_url }
            | Self::Timeout {
                authorization_url, ..
            }
            | Self::Interrupted { authorization_url } => Some(authorization_url),
            Self::PortUnavailable { .. } | Self::Listener { .. } => None,
        }
    }
}

/// Persisted session data is malformed (raised by external stores).
#[derive(Error, Debug)]
pub enum SessionDataError {
    #[error("session data is malformed: {message}")]
    Malformed { message: String },

    #[error("session data missing field: {field}")]
    MissingField { field: String },
}

/// Service key data is malformed (raised by external stores).
#[derive(Error, Debug)]
pub enum ServiceKeyError {
    #[error("service key is malformed: {message}")]
    Malformed { message: String },

    #[error("service key missing field: {field}")]
    MissingField { field: String },
}

/// Configuration error that is not a plain missing field.
#[derive(Error, Debug)]
pub enum ConfigurationError {
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    #[error("Invalid endpoint URL: {url}")]
    InvalidEndpoint { url: String },

    #[error("Discovery failed: {message}")]
    DiscoveryFailed { message: String },

    #[error("Unsupported provider: protocol {protocol}, flow {flow}")]
    UnsupportedProvider { protocol: String, flow: String },
}

/// Device flow terminal outcomes.
#[derive(Error, Debug)]
pub enum DeviceFlowError {
    #[error("device code expired")]
    ExpiredToken,

    #[error("user denied authorization")]
    AccessDenied,

    #[error("device authorization timed out after {attempts} polling attempts")]
    PollingTimeout { attempts: u32 },

    #[error("device token error: {error}")]
    Unexpected {
        error: String,
        error_description: Option<String>,
    },
}

/// Network/transport error.
#[derive(Error, Debug)]
pub enum NetworkError {
    #[error("Connection failed: {message}")]
    ConnectionFailed { message: String },

    #[error("Request timeout after {timeout:?}")]
    Timeout { timeout: Duration },

    #[error("HTTP client setup failed: {message}")]
    ClientSetup { message: String },
}

impl NetworkError {
    /// Check if error is retryable.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Self::ClientSetup { .. })
    }
}

/// Protocol/response parsing error.
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("Invalid response: {message}")]
    InvalidResponse { message: String },

    #[error("Missing required field: {field}")]
    MissingField { field: String },

    #[error("Unexpected redirect to: {location}")]
    UnexpectedRedirect { location: String },

    #[error("Response too large: {size} bytes")]
    ResponseTooLarge { size: usize },

    #[error("Invalid JSON: {message}")]
    InvalidJson { message: String },

    #[error("Invalid SAML data: {message}")]
    InvalidSaml { message: String },
}

/// Identity provider rejected a token request.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("Invalid client credentials")]
    InvalidClient { error_description: Option<String> },

    #[error("Invalid grant: {message}")]
    InvalidGrant { message: String },

    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },

    #[error("Invalid scope: {scope}")]
    InvalidScope { scope: String },

    #[error("Unauthorized client for this grant type")]
    UnauthorizedClient { error_description: Option<String> },

    #[error("Unsupported grant type: {grant_type}")]
    UnsupportedGrantType { grant_type: String },

    #[error("Server error: {message}")]
    ServerError { message: String },

    #[error("Server temporarily unavailable")]
    TemporarilyUnavailable { retry_after: Option<Duration> },
}

/// Result type for credential operations.
pub type CredentialResult<T> = Result<T, CredentialError>;

/// OAuth2 error response body.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct OAuth2ErrorResponse {
    pub error: String,
    #[serde(default)]
    pub error_description: Option<String>,
    #[serde(default)]
    pub error_uri: Option<String>,
}

/// Map token endpoint error response to error type.
pub fn map_token_error(response: &OAuth2ErrorResponse) -> ProviderError {
    let description = || {
        response
            .error_description
            .clone()
            .unwrap_or_else(|| response.error.clone())
    };

    match response.error.as_str() {
        "invalid_client" => ProviderError::InvalidClient {
            error_description: response.error_description.clone(),
        },
        "invalid_grant" => ProviderError::InvalidGrant {
            message: description(),
        },
        "invalid_scope" => ProviderError::InvalidScope {
            scope: response.error_description.clone().unwrap_or_default(),
        },
        "unauthorized_client" => ProviderError::UnauthorizedClient {
            error_description: response.error_description.clone(),
        },
        "unsupported_grant_type" => ProviderError::UnsupportedGrantType {
            grant_type: response.error_description.clone().unwrap_or_default(),
        },
        "server_error" => ProviderError::ServerError {
            message: description(),
        },
        "temporarily_unavailable" => ProviderError::TemporarilyUnavailable { retry_after: None },
        _ => ProviderError::InvalidRequest {
            message: description(),
        },
    }
}

/// Parse error response from HTTP body.
pub fn parse_error_response(body: &str) -> Option<OAuth2ErrorResponse> {
    serde_json::from_str(body).ok()
}

/// Create error from a non-success HTTP response.
pub fn create_error_from_response(status: u16, body: &str) -> CredentialError {
    if let Some(response) = parse_error_response(body) {
        return CredentialError::Provider(map_token_error(&response));
    }

    let error = match status {
        400 => ProviderError::InvalidRequest {
            message: "Bad request".to_string(),
        },
        401 => ProviderError::InvalidClient {
            error_description: Some("Unauthorized".to_string()),
        },
        403 => ProviderError::UnauthorizedClient {
            error_description: Some("Forbidden".to_string()),
        },
        429 => ProviderError::TemporarilyUnavailable {
            retry_after: Some(Duration::from_secs(60)),
        },
        _ => ProviderError::ServerError {
            message: format!("HTTP {}", status),
        },
    };

    CredentialError::Provider(error)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_lists_every_missing_field() {
        let err = ValidationError::check(&[
            ("uaaUrl", None),
            ("clientId", Some("  ")),
            ("clientSecret", Some("s3cret")),
            ("username", None),
        ])
        .unwrap_err();

        assert_eq!(err.missing, vec!["uaaUrl", "clientId", "username"]);
        assert_eq!(
            err.to_string(),
            "missing required configuration: uaaUrl, clientId, username"
        );
    }

    #[test]
    fn test_validation_passes_when_complete() {
        assert!(ValidationError::check(&[("clientId", Some("cli"))]).is_ok());
    }

    #[test]
    fn test_browser_errors_carry_url() {
        let err = CredentialError::from(BrowserAuthError::NonInteractive {
            authorization_url: "https://uaa.example.com/oauth/authorize?x=1".to_string(),
        });
        assert_eq!(
            err.authorization_url(),
            Some("https://uaa.example.com/oauth/authorize?x=1")
        );
        assert!(err.to_string().contains("oauth/authorize?x=1"));

        let err = BrowserAuthError::PortUnavailable {
            first: 3001,
            last: 3011,
        };
        assert!(err.authorization_url().is_none());
    }

    #[test]
    fn test_refresh_error_wraps_cause() {
        let cause = CredentialError::Provider(ProviderError::InvalidGrant {
            message: "expired".to_string(),
        });
        let err = CredentialError::from(RefreshError::new(cause));
        assert!(err.to_string().contains("Invalid grant: expired"));
        assert!(err.needs_reauth());
        assert_eq!(err.error_code(), "CRED_REFRESH");
    }

    #[test]
    fn test_create_error_from_response() {
        let body = r#"{"error":"invalid_grant","error_description":"The token is expired"}"#;
        match create_error_from_response(400, body) {
            CredentialError::Provider(ProviderError::InvalidGrant { message }) => {
                assert_eq!(message, "The token is expired");
            }
            other => panic!("unexpected error: {other:?}"),
        }

        assert!(create_error_from_response(503, "<html>down</html>").is_retryable());
    }

    #[test]
    fn test_authorization_denied_message() {
        let err = BrowserAuthError::AuthorizationDenied {
            error: "access_denied".to_string(),
            description: Some("user said no".to_string()),
            authorization_url: "http://idp/authorize".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "authorization failed: access_denied (user said no); url: http://idp/authorize"
        );
    }
}
