//! Browser Callback
//!
//! Local loopback listener and browser dispatch for interactive flows.

pub mod browser;
pub mod listener;
mod signals;

pub use browser::{BrowserLauncher, BrowserMode, SystemBrowserLauncher};
pub use listener::{
    start_callback, CallbackKind, CallbackListener, CallbackOptions, CALLBACK_PATH,
    DEFAULT_CALLBACK_PORT, DEFAULT_CALLBACK_TIMEOUT, PORT_SCAN_RANGE,
};

#[cfg(test)]
pub(crate) mod test_support;
