//! Callback Types
//!
//! Parameters captured by the local redirect listener.

use url::Url;

/// Parameters of a request hitting the local `/callback` endpoint.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CallbackParams {
    /// Authorization code (if success).
    pub code: Option<String>,
    /// State parameter.
    pub state: Option<String>,
    /// Error code (if authorization failed).
    pub error: Option<String>,
    /// Error description.
    pub error_description: Option<String>,
    /// SAML2 response (HTTP-POST or HTTP-Redirect binding).
    pub saml_response: Option<String>,
    /// SAML2 relay state.
    pub relay_state: Option<String>,
}

impl CallbackParams {
    /// Parse callback parameters from URL query.
    pub fn from_url(url: &Url) -> Self {
        let mut params = Self::default();
        params.merge_pairs(url.query_pairs());
        params
    }

    /// Parse an `application/x-www-form-urlencoded` body on top of the query.
    pub fn merge_form(&mut self, body: &str) {
        self.merge_pairs(url::form_urlencoded::parse(body.as_bytes()));
    }

    fn merge_pairs<'a>(
        &mut self,
        pairs: impl Iterator<Item = (std::borrow::Cow<'a, str>, std::borrow::Cow<'a, str>)>,
    ) {
        for (key, value) in pairs {
            let slot = match key.as_ref() {
                "code" => &mut self.code,
                "state" => &mut self.state,
                "error" => &mut self.error,
                "error_description" => &mut self.error_description,
                "SAMLResponse" => &mut self.saml_response,
                "RelayState" => &mut self.relay_state,
                _ => continue,
            };
            *slot = Some(value.into_owned());
        }
    }

    /// Check if callback contains an error.
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// What the listener resolves with.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CallbackPayload {
    /// OAuth authorization code.
    Code(String),
    /// Raw base64 SAML response.
    SamlResponse(String),
}
