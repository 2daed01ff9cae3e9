//! SAML2 Support
//!
//! Minimal AuthnRequest construction for the HTTP-Redirect binding, and
//! assertion expiry extraction.
//!
//! Expiry is read with a regex over the decoded XML rather than a structured
//! parse, so it must only be applied to assertions from a trusted IdP. When an
//! assertion carries several `NotOnOrAfter` attributes the earliest wins.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{DateTime, SecondsFormat, Utc};
use flate2::write::DeflateEncoder;
use flate2::Compression;
use rand::RngCore;
use regex::Regex;
use std::io::Write;
use std::sync::OnceLock;

use crate::error::{CredentialResult, ProtocolError};

/// Minimal SAML2 AuthnRequest.
#[derive(Clone, Debug)]
pub struct SamlAuthnRequest {
    /// Request ID; must start with a letter or underscore.
    pub id: String,
    pub issue_instant: DateTime<Utc>,
    /// IdP single sign-on URL the request is sent to.
    pub destination: String,
    /// Where the IdP posts the response (the local callback URL).
    pub assertion_consumer_service_url: String,
    /// SP entity ID.
    pub issuer: String,
}

impl SamlAuthnRequest {
    /// New request with a random ID and the current instant.
    pub fn new(
        destination: impl Into<String>,
        assertion_consumer_service_url: impl Into<String>,
        issuer: impl Into<String>,
    ) -> Self {
        let mut id_bytes = [0u8; 16];
        rand::thread_rng().fill_bytes(&mut id_bytes);
        let id = format!(
            "_{}",
            id_bytes.iter().map(|b| format!("{b:02x}")).collect::<String>()
        );

        Self {
            id,
            issue_instant: Utc::now(),
            destination: destination.into(),
            assertion_consumer_service_url: assertion_consumer_service_url.into(),
            issuer: issuer.into(),
        }
    }

    /// Serialize to XML.
    pub fn to_xml(&self) -> String {
        format!(
            concat!(
                r#"<samlp:AuthnRequest xmlns:samlp="urn:oasis:names:tc:SAML:2.0:protocol" "#,
                r#"xmlns:saml="urn:oasis:names:tc:SAML:2.0:assertion" "#,
                r#"ID="{id}" Version="2.0" IssueInstant="{instant}" "#,
                r#"Destination="{destination}" "#,
                r#"ProtocolBinding="urn:oasis:names:tc:SAML:2.0:bindings:HTTP-POST" "#,
                r#"AssertionConsumerServiceURL="{acs}">"#,
                r#"<saml:Issuer>{issuer}</saml:Issuer>"#,
                r#"<samlp:NameIDPolicy AllowCreate="true" "#,
                r#"Format="urn:oasis:names:tc:SAML:1.1:nameid-format:unspecified"/>"#,
                r#"</samlp:AuthnRequest>"#
            ),
            id = self.id,
            instant = self
                .issue_instant
                .to_rfc3339_opts(SecondsFormat::Secs, true),
            destination = xml_escape(&self.destination),
            acs = xml_escape(&self.assertion_consumer_service_url),
            issuer = xml_escape(&self.issuer),
        )
    }

    /// DEFLATE + base64, the `SAMLRequest` value of the HTTP-Redirect binding.
    pub fn encode_redirect(&self) -> CredentialResult<String> {
        let deflate_error = |e: std::io::Error| ProtocolError::InvalidSaml {
            message: format!("deflate failed: {e}"),
        };

        let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
        encoder
            .write_all(self.to_xml().as_bytes())
            .map_err(deflate_error)?;
        let deflated = encoder.finish().map_err(deflate_error)?;
        Ok(STANDARD.encode(deflated))
    }

    /// Full redirect URL: destination plus `SAMLRequest` and optional `RelayState`.
    pub fn redirect_url(&self, relay_state: Option<&str>) -> CredentialResult<String> {
        let mut url = url::Url::parse(&self.destination).map_err(|_| {
            crate::error::ConfigurationError::InvalidEndpoint {
                url: self.destination.clone(),
            }
        })?;
        let saml_request = self.encode_redirect()?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("SAMLRequest", &saml_request);
            if let Some(relay_state) = relay_state {
                query.append_pair("RelayState", relay_state);
            }
        }
        Ok(url.into())
    }
}

fn xml_escape(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn not_on_or_after_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r#"NotOnOrAfter="([^"]+)""#).ok())
        .as_ref()
}

/// Decode a base64 SAML response or assertion to XML text.
pub fn decode_assertion(assertion_b64: &str) -> CredentialResult<String> {
    let compact: String = assertion_b64.split_whitespace().collect();
    let bytes = STANDARD
        .decode(compact.as_bytes())
        .map_err(|e| ProtocolError::InvalidSaml {
            message: format!("assertion is not base64: {e}"),
        })?;
    String::from_utf8(bytes).map_err(|_| {
        ProtocolError::InvalidSaml {
            message: "assertion is not UTF-8".to_string(),
        }
        .into()
    })
}

/// Earliest `NotOnOrAfter` in an XML document.
pub fn not_on_or_after(xml: &str) -> Option<DateTime<Utc>> {
    not_on_or_after_pattern()?
        .captures_iter(xml)
        .filter_map(|c| DateTime::parse_from_rfc3339(&c[1]).ok())
        .map(|t| t.with_timezone(&Utc))
        .min()
}

/// Assertion expiry in epoch milliseconds, if it declares one.
pub fn assertion_expires_at_ms(assertion_b64: &str) -> CredentialResult<Option<i64>> {
    let xml = decode_assertion(assertion_b64)?;
    Ok(not_on_or_after(&xml).map(|t| t.timestamp_millis()))
}
