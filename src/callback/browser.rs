//! Browser Dispatch
//!
//! Browser modes and the pluggable launcher used by the callback listener.

use std::io;
use std::process::{Command, Stdio};
use std::str::FromStr;

use crate::error::ConfigurationError;

/// How the authorization URL reaches the user.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum BrowserMode {
    /// The OS default browser.
    #[default]
    System,
    Chrome,
    Edge,
    Firefox,
    /// Log the URL and wait for the callback without launching anything.
    Headless,
    /// Log the URL and fail immediately.
    None,
}

impl BrowserMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::System => "system",
            Self::Chrome => "chrome",
            Self::Edge => "edge",
            Self::Firefox => "firefox",
            Self::Headless => "headless",
            Self::None => "none",
        }
    }

    /// Whether this mode opens a browser.
    pub fn launches(&self) -> bool {
        !matches!(self, Self::Headless | Self::None)
    }

    /// Application name handed to the OS opener for a specific browser.
    fn app_name(&self) -> Option<&'static str> {
        let (windows, macos, other) = match self {
            Self::Chrome => ("chrome", "Google Chrome", "google-chrome"),
            Self::Edge => ("msedge", "Microsoft Edge", "microsoft-edge"),
            Self::Firefox => ("firefox", "Firefox", "firefox"),
            _ => return None,
        };
        Some(if cfg!(target_os = "windows") {
            windows
        } else if cfg!(target_os = "macos") {
            macos
        } else {
            other
        })
    }
}

impl FromStr for BrowserMode {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "system" | "default" => Ok(Self::System),
            "chrome" => Ok(Self::Chrome),
            "edge" => Ok(Self::Edge),
            "firefox" => Ok(Self::Firefox),
            "headless" => Ok(Self::Headless),
            "none" => Ok(Self::None),
            other => Err(ConfigurationError::InvalidConfig {
                message: format!("unknown browser mode: {}", other),
            }),
        }
    }
}

impl std::fmt::Display for BrowserMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Opens a URL in a browser.
pub trait BrowserLauncher: Send + Sync {
    /// Launch `mode` at `url`. Only called for modes that launch.
    fn launch(&self, url: &str, mode: BrowserMode) -> io::Result<()>;
}

/// OS opener via the `open` crate, falling back to a platform shell command.
#[derive(Clone, Debug)]
pub struct SystemBrowserLauncher {
    fallback: ShellOpener,
}

#[derive(Clone, Debug)]
struct ShellOpener {
    program: &'static str,
    args: &'static [&'static str],
}

impl ShellOpener {
    fn for_current_platform() -> Self {
        if cfg!(target_os = "windows") {
            Self {
                program: "rundll32.exe",
                args: &["url.dll,FileProtocolHandler"],
            }
        } else if cfg!(target_os = "macos") {
            Self {
                program: "open",
                args: &[],
            }
        } else {
            Self {
                program: "xdg-open",
                args: &[],
            }
        }
    }

    fn spawn(&self, url: &str) -> io::Result<()> {
        Command::new(self.program)
            .args(self.args)
            .arg(url)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map(|_| ())
    }
}

impl SystemBrowserLauncher {
    pub fn new() -> Self {
        Self {
            fallback: ShellOpener::for_current_platform(),
        }
    }
}

impl Default for SystemBrowserLauncher {
    fn default() -> Self {
        Self::new()
    }
}

impl BrowserLauncher for SystemBrowserLauncher {
    fn launch(&self, url: &str, mode: BrowserMode) -> io::Result<()> {
        let opened = match mode.app_name() {
            Some(app) => open::with_detached(url, app),
            None => open::that_detached(url),
        };

        opened.or_else(|e| {
            tracing::debug!(error = %e, program = self.fallback.program, "opener failed, trying shell");
            self.fallback.spawn(url)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_browser_mode_parsing() {
        assert_eq!("system".parse::<BrowserMode>().unwrap(), BrowserMode::System);
        assert_eq!("Chrome".parse::<BrowserMode>().unwrap(), BrowserMode::Chrome);
        assert_eq!(" edge ".parse::<BrowserMode>().unwrap(), BrowserMode::Edge);
        assert_eq!("firefox".parse::<BrowserMode>().unwrap(), BrowserMode::Firefox);
        assert_eq!("headless".parse::<BrowserMode>().unwrap(), BrowserMode::Headless);
        assert_eq!("none".parse::<BrowserMode>().unwrap(), BrowserMode::None);
        assert!("lynx".parse::<BrowserMode>().is_err());
    }

    #[test]
    fn test_launching_modes() {
        assert!(BrowserMode::System.launches());
        assert!(BrowserMode::Firefox.launches());
        assert!(!BrowserMode::Headless.launches());
        assert!(!BrowserMode::None.launches());
        assert!(BrowserMode::System.app_name().is_none());
        assert!(BrowserMode::Chrome.app_name().is_some());
    }
}
