//! Builders
//!
//! Fluent builder for identity-provider configuration.

pub mod config;

pub use config::{authorization_config, AuthorizationConfigBuilder};
