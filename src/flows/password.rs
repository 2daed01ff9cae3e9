//! Resource Owner Password Grant
//!
//! RFC 6749 Section 4.3, plus the UAA one-time passcode variant.

use secrecy::{ExposeSecret, SecretString};

use super::grant::{push_opt, TokenEndpoint};
use crate::core::HttpTransport;
use crate::error::CredentialResult;
use crate::types::{AuthType, GrantType, TokenResult};

/// What the user proves themselves with.
#[derive(Clone, Debug)]
pub enum PasswordCredentials {
    Password {
        username: String,
        password: SecretString,
    },
    /// One-time passcode issued by the UAA login page.
    Passcode(SecretString),
}

impl PasswordCredentials {
    pub fn password(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self::Password {
            username: username.into(),
            password: SecretString::new(password.into()),
        }
    }

    pub fn passcode(passcode: impl Into<String>) -> Self {
        Self::Passcode(SecretString::new(passcode.into()))
    }
}

/// `grant_type=password` with either username/password or a passcode.
pub async fn password_grant(
    transport: &dyn HttpTransport,
    endpoint: &TokenEndpoint,
    credentials: &PasswordCredentials,
    scope: Option<&str>,
) -> CredentialResult<TokenResult> {
    let mut params = match credentials {
        PasswordCredentials::Password { username, password } => vec![
            ("username", username.clone()),
            ("password", password.expose_secret().clone()),
        ],
        PasswordCredentials::Passcode(passcode) => {
            vec![("passcode", passcode.expose_secret().clone())]
        }
    };
    push_opt(&mut params, "scope", scope);

    endpoint
        .request_token(transport, GrantType::Password, params, AuthType::Password)
        .await
}
