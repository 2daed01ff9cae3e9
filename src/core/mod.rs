//! Core Components
//!
//! HTTP transport, PKCE, discovery, JWT inspection and SAML helpers.

pub mod discovery;
pub mod jwt;
pub mod pkce;
pub mod saml;
pub mod transport;

pub use discovery::DiscoveryCache;
pub use pkce::{generate_challenge, generate_state, generate_verifier, PkceChallenge};
pub use saml::SamlAuthnRequest;
pub use transport::*;
