//! Launcher that plays the browser: instead of opening anything it calls the
//! redirect URI found in the authorization URL.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use flate2::read::DeflateDecoder;
use std::collections::HashMap;
use std::io::{self, Read};
use url::Url;

use super::browser::{BrowserLauncher, BrowserMode};

#[derive(Clone)]
enum Reply {
    Code(String),
    Error(String),
    SamlPost(String),
}

pub(crate) struct RedirectingLauncher {
    reply: Reply,
}

impl RedirectingLauncher {
    /// Redirect back with `code` and the echoed `state`.
    pub(crate) fn code(code: &str) -> Self {
        Self {
            reply: Reply::Code(code.to_string()),
        }
    }

    /// Redirect back with an OAuth `error`.
    pub(crate) fn error(error: &str) -> Self {
        Self {
            reply: Reply::Error(error.to_string()),
        }
    }

    /// POST `SAMLResponse` to the AuthnRequest's consumer service URL.
    pub(crate) fn saml_post(response: &str) -> Self {
        Self {
            reply: Reply::SamlPost(response.to_string()),
        }
    }
}

fn loopback(url: &str) -> io::Result<Url> {
    let mut url = Url::parse(url).map_err(io::Error::other)?;
    url.set_host(Some("127.0.0.1")).map_err(io::Error::other)?;
    Ok(url)
}

fn consumer_service_url(saml_request: &str) -> io::Result<String> {
    let deflated = STANDARD.decode(saml_request).map_err(io::Error::other)?;
    let mut xml = String::new();
    DeflateDecoder::new(&deflated[..]).read_to_string(&mut xml)?;
    let start = xml
        .find("AssertionConsumerServiceURL=\"")
        .ok_or_else(|| io::Error::other("no consumer service URL"))?
        + "AssertionConsumerServiceURL=\"".len();
    let end = xml[start..]
        .find('"')
        .ok_or_else(|| io::Error::other("unterminated attribute"))?;
    Ok(xml[start..start + end].to_string())
}

impl BrowserLauncher for RedirectingLauncher {
    fn launch(&self, url: &str, _mode: BrowserMode) -> io::Result<()> {
        let url = Url::parse(url).map_err(io::Error::other)?;
        let query: HashMap<String, String> = url.query_pairs().into_owned().collect();
        let client = reqwest::Client::new();

        let request = match &self.reply {
            Reply::Code(code) | Reply::Error(code) => {
                let redirect = query
                    .get("redirect_uri")
                    .ok_or_else(|| io::Error::other("no redirect_uri"))?;
                let mut target = loopback(redirect)?;
                {
                    let mut pairs = target.query_pairs_mut();
                    match &self.reply {
                        Reply::Error(error) => pairs.append_pair("error", error),
                        _ => pairs.append_pair("code", code),
                    };
                    if let Some(state) = query.get("state") {
                        pairs.append_pair("state", state);
                    }
                }
                client.get(target)
            }
            Reply::SamlPost(response) => {
                let saml_request = query
                    .get("SAMLRequest")
                    .ok_or_else(|| io::Error::other("no SAMLRequest"))?;
                let target = loopback(&consumer_service_url(saml_request)?)?;
                client.post(target).form(&[("SAMLResponse", response.as_str())])
            }
        };

        tokio::spawn(async move {
            let _ = request.send().await;
        });
        Ok(())
    }
}
