//! Credential Types
//!
//! Data structures shared by the protocol functions and token providers.

pub mod callback;
pub mod config;
pub mod device;
pub mod token;

pub use callback::*;
pub use config::*;
pub use device::*;
pub use token::*;
