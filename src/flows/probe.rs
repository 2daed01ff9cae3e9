//! Liveness Probe
//!
//! Asks the protected service itself whether a credential is still accepted.

use tracing::debug;

use crate::core::{HttpRequest, HttpTransport};
use crate::error::{CredentialResult, ProtocolError};

/// How the credential is presented to the service.
#[derive(Clone, Copy, Debug)]
pub enum ProbeCredential<'a> {
    /// `Authorization: Bearer <token>`
    Bearer(&'a str),
    /// `Cookie: <session cookie>`
    Cookie(&'a str),
}

/// GET `service_url` with the credential: 2xx is valid, 401/403 invalid,
/// anything else an error.
pub async fn probe_liveness(
    transport: &dyn HttpTransport,
    service_url: &str,
    credential: ProbeCredential<'_>,
) -> CredentialResult<bool> {
    let request = match credential {
        ProbeCredential::Bearer(token) => {
            HttpRequest::get(service_url).header("authorization", format!("Bearer {}", token))
        }
        ProbeCredential::Cookie(cookie) => HttpRequest::get(service_url).header("cookie", cookie),
    };

    let response = transport.send(request).await?;
    debug!(url = %service_url, status = response.status, "liveness probe");

    match response.status {
        200..=299 => Ok(true),
        401 | 403 => Ok(false),
        status => Err(ProtocolError::InvalidResponse {
            message: format!("liveness probe of {} returned HTTP {}", service_url, status),
        }
        .into()),
    }
}
