//! Local Callback Listener
//!
//! One-shot loopback HTTP server that captures a single browser redirect:
//! an authorization code (OAuth) or a `SAMLResponse` (SAML2, GET or POST
//! binding). The server task is aborted on every exit path, which drops the
//! sockets and every open connection. IPv4 loopback is always bound; IPv6
//! loopback joins on the same port when the host has it, since browsers may
//! resolve `localhost` to either.

use std::io::ErrorKind;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, info, warn};
use url::Url;

use super::browser::{BrowserLauncher, BrowserMode, SystemBrowserLauncher};
use super::signals::{termination, TerminationSignals};
use crate::error::{BrowserAuthError, ConfigurationError, CredentialResult};
use crate::types::{CallbackParams, CallbackPayload};

pub const DEFAULT_CALLBACK_PORT: u16 = 3001;

/// Ports tried after the base port before giving up.
pub const PORT_SCAN_RANGE: u16 = 10;

pub const DEFAULT_CALLBACK_TIMEOUT: Duration = Duration::from_secs(300);

pub const CALLBACK_PATH: &str = "/callback";

const MAX_HEADER_BYTES: usize = 16 * 1024;
const MAX_BODY_BYTES: usize = 1024 * 1024;
const READ_TIMEOUT: Duration = Duration::from_secs(10);

const SUCCESS_HTML: &str = "<html><body><h1>Authentication successful</h1>\
    <p>You may close this window and return to the application.</p></body></html>";

/// What the callback must carry.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CallbackKind {
    #[default]
    OAuth,
    Saml,
}

/// Listener settings.
#[derive(Clone)]
pub struct CallbackOptions {
    pub browser: BrowserMode,
    pub timeout: Duration,
    /// First port tried; 0 binds an ephemeral port.
    pub base_port: u16,
    /// Registered loopback redirect URI. When set, exactly its port is
    /// bound and its path served, and it is sent unchanged.
    pub redirect_uri: Option<String>,
    pub kind: CallbackKind,
    /// Required value of the `state` parameter, when one was sent.
    pub expected_state: Option<String>,
    /// Listen for SIGINT/SIGTERM while waiting. The handlers are removed
    /// when the wait ends; hosts that own these signals should turn this off.
    pub handle_signals: bool,
    pub launcher: Arc<dyn BrowserLauncher>,
}

impl Default for CallbackOptions {
    fn default() -> Self {
        Self {
            browser: BrowserMode::default(),
            timeout: DEFAULT_CALLBACK_TIMEOUT,
            base_port: DEFAULT_CALLBACK_PORT,
            redirect_uri: None,
            kind: CallbackKind::default(),
            expected_state: None,
            handle_signals: true,
            launcher: Arc::new(SystemBrowserLauncher::new()),
        }
    }
}

impl std::fmt::Debug for CallbackOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallbackOptions")
            .field("browser", &self.browser)
            .field("timeout", &self.timeout)
            .field("base_port", &self.base_port)
            .field("redirect_uri", &self.redirect_uri)
            .field("kind", &self.kind)
            .field("expected_state", &self.expected_state.as_ref().map(|_| "[SET]"))
            .field("handle_signals", &self.handle_signals)
            .finish()
    }
}

impl CallbackOptions {
    pub fn new(browser: BrowserMode) -> Self {
        Self {
            browser,
            ..Default::default()
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_base_port(mut self, base_port: u16) -> Self {
        self.base_port = base_port;
        self
    }

    pub fn with_redirect_uri(mut self, redirect_uri: impl Into<String>) -> Self {
        self.redirect_uri = Some(redirect_uri.into());
        self
    }

    pub fn with_kind(mut self, kind: CallbackKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_expected_state(mut self, state: impl Into<String>) -> Self {
        self.expected_state = Some(state.into());
        self
    }

    pub fn with_signal_handling(mut self, enabled: bool) -> Self {
        self.handle_signals = enabled;
        self
    }

    pub fn with_launcher(mut self, launcher: Arc<dyn BrowserLauncher>) -> Self {
        self.launcher = launcher;
        self
    }
}

/// Bind, build the authorization URL for the negotiated redirect URI, and
/// wait for the single callback.
pub async fn start_callback<F>(
    options: CallbackOptions,
    build_authorization_url: F,
) -> CredentialResult<CallbackPayload>
where
    F: FnOnce(&str) -> CredentialResult<String>,
{
    let listener = CallbackListener::bind(options).await?;
    let authorization_url = build_authorization_url(&listener.redirect_uri())?;
    listener.wait(&authorization_url).await
}

/// A bound, not yet serving, callback socket.
pub struct CallbackListener {
    sockets: LoopbackSockets,
    redirect_uri: String,
    path: String,
    options: CallbackOptions,
}

impl CallbackListener {
    /// Bind the registered redirect URI's port, or else the base port or
    /// one of the next ten.
    pub async fn bind(options: CallbackOptions) -> CredentialResult<Self> {
        let (sockets, redirect_uri, path) = match options.redirect_uri.as_deref() {
            Some(registered) => {
                let (port, path) = registered_redirect(registered)?;
                let sockets = bind_loopback(port).await.map_err(|e| {
                    debug!(port, error = %e, "registered callback port unavailable");
                    BrowserAuthError::PortUnavailable {
                        first: port,
                        last: port,
                    }
                })?;
                (sockets, registered.to_string(), path)
            }
            None => {
                let sockets = bind_port(options.base_port).await?;
                let redirect_uri = format!("http://localhost:{}{}", sockets.port, CALLBACK_PATH);
                (sockets, redirect_uri, CALLBACK_PATH.to_string())
            }
        };
        debug!(
            port = sockets.port,
            ipv6 = sockets.v6.is_some(),
            "callback listener bound"
        );
        Ok(Self {
            sockets,
            redirect_uri,
            path,
            options,
        })
    }

    pub fn port(&self) -> u16 {
        self.sockets.port
    }

    /// The registered redirect URI, or `http://localhost:{port}/callback`.
    pub fn redirect_uri(&self) -> String {
        self.redirect_uri.clone()
    }

    /// Dispatch the browser and wait for the first callback.
    pub async fn wait(self, authorization_url: &str) -> CredentialResult<CallbackPayload> {
        let options = self.options;

        if options.browser == BrowserMode::None {
            info!(url = %authorization_url, "browser disabled; open this URL to authorize");
            return Err(BrowserAuthError::NonInteractive {
                authorization_url: authorization_url.to_string(),
            }
            .into());
        }

        let mut signals = if options.handle_signals {
            let registered =
                TerminationSignals::register().map_err(|e| BrowserAuthError::Listener {
                    message: format!("signal handler registration failed: {e}"),
                })?;
            Some(registered)
        } else {
            None
        };

        let (tx, rx) = oneshot::channel();
        let port = self.sockets.port;
        let context = Arc::new(HandlerContext {
            path: self.path,
            kind: options.kind,
            expected_state: options.expected_state.clone(),
            authorization_url: authorization_url.to_string(),
            sender: Mutex::new(Some(tx)),
        });
        let _server = ServerGuard {
            port,
            handle: tokio::spawn(serve(self.sockets, context)),
        };

        if options.browser.launches() {
            info!(url = %authorization_url, browser = %options.browser, "opening browser");
            if let Err(e) = options.launcher.launch(authorization_url, options.browser) {
                warn!(error = %e, url = %authorization_url, "browser launch failed");
                return Err(BrowserAuthError::LaunchFailed {
                    message: e.to_string(),
                    authorization_url: authorization_url.to_string(),
                }
                .into());
            }
        } else {
            info!(url = %authorization_url, "headless mode; open this URL to authorize");
        }

        let outcome = tokio::select! {
            received = rx => received.unwrap_or_else(|_| {
                Err(BrowserAuthError::Listener {
                    message: "callback server stopped".to_string(),
                })
            }),
            _ = tokio::time::sleep(options.timeout) => Err(BrowserAuthError::Timeout {
                timeout: options.timeout,
                authorization_url: authorization_url.to_string(),
            }),
            _ = termination(signals.as_mut()) => Err(BrowserAuthError::Interrupted {
                authorization_url: authorization_url.to_string(),
            }),
        };

        outcome.map_err(Into::into)
    }
}

/// Loopback sockets sharing one port.
struct LoopbackSockets {
    port: u16,
    v4: TcpListener,
    v6: Option<TcpListener>,
}

/// Bind IPv4 loopback, then IPv6 loopback on the same port.
///
/// A port held by another process on either family counts as taken; a host
/// without IPv6 loopback gets an IPv4-only listener.
async fn bind_loopback(port: u16) -> std::io::Result<LoopbackSockets> {
    let v4 = TcpListener::bind((Ipv4Addr::LOCALHOST, port)).await?;
    let port = v4.local_addr()?.port();
    let v6 = match TcpListener::bind((Ipv6Addr::LOCALHOST, port)).await {
        Ok(listener) => Some(listener),
        Err(e) if e.kind() == ErrorKind::AddrInUse => return Err(e),
        Err(e) => {
            debug!(port, error = %e, "IPv6 loopback unavailable");
            None
        }
    };
    Ok(LoopbackSockets { port, v4, v6 })
}

async fn bind_port(base_port: u16) -> CredentialResult<LoopbackSockets> {
    if base_port == 0 {
        let mut last_error = None;
        for _ in 0..=PORT_SCAN_RANGE {
            match bind_loopback(0).await {
                Ok(sockets) => return Ok(sockets),
                Err(e) => last_error = Some(e),
            }
        }
        return Err(BrowserAuthError::Listener {
            message: last_error
                .map(|e| e.to_string())
                .unwrap_or_else(|| "no ephemeral port".to_string()),
        }
        .into());
    }

    let last = base_port.saturating_add(PORT_SCAN_RANGE);
    for port in base_port..=last {
        match bind_loopback(port).await {
            Ok(sockets) => return Ok(sockets),
            Err(e) => debug!(port, error = %e, "callback port unavailable"),
        }
    }

    Err(BrowserAuthError::PortUnavailable {
        first: base_port,
        last,
    }
    .into())
}

/// Port and path of a registered loopback redirect URI.
fn registered_redirect(redirect_uri: &str) -> CredentialResult<(u16, String)> {
    let invalid = || ConfigurationError::InvalidEndpoint {
        url: redirect_uri.to_string(),
    };
    let url = Url::parse(redirect_uri).map_err(|_| invalid())?;
    if !matches!(url.host_str(), Some("localhost" | "127.0.0.1" | "[::1]")) {
        return Err(invalid().into());
    }
    match url.port_or_known_default() {
        Some(port) if port != 0 => Ok((port, url.path().to_string())),
        _ => Err(invalid().into()),
    }
}

/// Aborts the server task, closing the sockets and open connections.
struct ServerGuard {
    port: u16,
    handle: JoinHandle<()>,
}

impl Drop for ServerGuard {
    fn drop(&mut self) {
        self.handle.abort();
        debug!(port = self.port, "callback listener closed");
    }
}

struct HandlerContext {
    path: String,
    kind: CallbackKind,
    expected_state: Option<String>,
    authorization_url: String,
    sender: Mutex<Option<oneshot::Sender<Result<CallbackPayload, BrowserAuthError>>>>,
}

async fn serve(sockets: LoopbackSockets, context: Arc<HandlerContext>) {
    // Dropped with this task, aborting any connection still in flight
    let mut connections = JoinSet::new();

    loop {
        let accepted = tokio::select! {
            accepted = sockets.v4.accept() => accepted,
            accepted = accept_v6(sockets.v6.as_ref()) => accepted,
            Some(_) = connections.join_next(), if !connections.is_empty() => continue,
        };
        match accepted {
            Ok((stream, _)) => {
                connections.spawn(handle_connection(stream, context.clone()));
            }
            Err(e) => warn!(error = %e, "callback accept failed"),
        }
    }
}

async fn accept_v6(listener: Option<&TcpListener>) -> std::io::Result<(TcpStream, SocketAddr)> {
    match listener {
        Some(listener) => listener.accept().await,
        None => std::future::pending().await,
    }
}

struct RawRequest {
    method: String,
    target: String,
    content_type: Option<String>,
    body: Vec<u8>,
}

async fn handle_connection(mut stream: TcpStream, context: Arc<HandlerContext>) {
    let request = match tokio::time::timeout(READ_TIMEOUT, read_request(&mut stream)).await {
        Ok(Ok(Some(request))) => request,
        Ok(Ok(None)) => {
            let _ = write_response(&mut stream, "400 Bad Request", "<h1>Bad request</h1>").await;
            return;
        }
        Ok(Err(e)) => {
            debug!(error = %e, "callback read failed");
            return;
        }
        Err(_) => return,
    };

    let Ok(url) = Url::parse(&format!("http://localhost{}", request.target)) else {
        let _ = write_response(&mut stream, "400 Bad Request", "<h1>Bad request</h1>").await;
        return;
    };
    if url.path() != context.path {
        let _ = write_response(&mut stream, "404 Not Found", "<h1>Not found</h1>").await;
        return;
    }
    if request.method != "GET" && request.method != "POST" {
        let _ = write_response(&mut stream, "405 Method Not Allowed", "").await;
        return;
    }

    let sender = context
        .sender
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .take();
    let Some(sender) = sender else {
        let _ = write_response(
            &mut stream,
            "409 Conflict",
            "<h1>Authorization already completed</h1>",
        )
        .await;
        return;
    };

    let mut params = CallbackParams::from_url(&url);
    let is_form = request
        .content_type
        .as_deref()
        .is_some_and(|ct| ct.starts_with("application/x-www-form-urlencoded"));
    if request.method == "POST" && is_form {
        params.merge_form(&String::from_utf8_lossy(&request.body));
    }

    let outcome = evaluate(
        &params,
        context.kind,
        context.expected_state.as_deref(),
        &context.authorization_url,
    );
    let written = match &outcome {
        Ok(_) => write_response(&mut stream, "200 OK", SUCCESS_HTML).await,
        Err(e) => write_response(&mut stream, "400 Bad Request", &error_page(e)).await,
    };
    if let Err(e) = written {
        debug!(error = %e, "callback response write failed");
    }

    match &outcome {
        Ok(_) => info!("authorization callback received"),
        Err(e) => warn!(error = %e, "authorization callback rejected"),
    }
    let _ = sender.send(outcome);
}

/// Decide what a callback means.
fn evaluate(
    params: &CallbackParams,
    kind: CallbackKind,
    expected_state: Option<&str>,
    authorization_url: &str,
) -> Result<CallbackPayload, BrowserAuthError> {
    let authorization_url = authorization_url.to_string();

    if let Some(error) = &params.error {
        return Err(BrowserAuthError::AuthorizationDenied {
            error: error.clone(),
            description: params.error_description.clone(),
            authorization_url,
        });
    }

    match kind {
        CallbackKind::OAuth => {
            if let Some(expected) = expected_state {
                if params.state.as_deref() != Some(expected) {
                    return Err(BrowserAuthError::StateMismatch { authorization_url });
                }
            }
            match params.code.as_deref().filter(|c| !c.is_empty()) {
                Some(code) => Ok(CallbackPayload::Code(code.to_string())),
                None => Err(BrowserAuthError::MissingCode { authorization_url }),
            }
        }
        CallbackKind::Saml => match params.saml_response.as_deref().filter(|r| !r.is_empty()) {
            Some(response) => Ok(CallbackPayload::SamlResponse(response.to_string())),
            None => Err(BrowserAuthError::MissingSamlResponse { authorization_url }),
        },
    }
}

async fn read_request(stream: &mut TcpStream) -> std::io::Result<Option<RawRequest>> {
    let mut buffer = Vec::with_capacity(4096);
    let mut chunk = [0u8; 4096];

    let header_end = loop {
        if let Some(pos) = find_header_end(&buffer) {
            break pos;
        }
        if buffer.len() > MAX_HEADER_BYTES {
            return Ok(None);
        }
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            return Ok(None);
        }
        buffer.extend_from_slice(&chunk[..n]);
    };

    let head = String::from_utf8_lossy(&buffer[..header_end]).into_owned();
    let mut lines = head.split("\r\n");
    let mut request_line = lines.next().unwrap_or_default().split_whitespace();
    let (Some(method), Some(target)) = (request_line.next(), request_line.next()) else {
        return Ok(None);
    };

    let mut content_length = 0usize;
    let mut content_type = None;
    for line in lines {
        let Some((name, value)) = line.split_once(':') else {
            continue;
        };
        let value = value.trim();
        if name.eq_ignore_ascii_case("content-length") {
            content_length = value.parse().unwrap_or(0);
        } else if name.eq_ignore_ascii_case("content-type") {
            content_type = Some(value.to_ascii_lowercase());
        }
    }
    if content_length > MAX_BODY_BYTES {
        return Ok(None);
    }

    let mut body = buffer[header_end + 4..].to_vec();
    while body.len() < content_length {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        body.extend_from_slice(&chunk[..n]);
    }
    body.truncate(content_length);

    Ok(Some(RawRequest {
        method: method.to_ascii_uppercase(),
        target: target.to_string(),
        content_type,
        body,
    }))
}

fn find_header_end(buffer: &[u8]) -> Option<usize> {
    buffer.windows(4).position(|w| w == b"\r\n\r\n")
}

async fn write_response(stream: &mut TcpStream, status: &str, body: &str) -> std::io::Result<()> {
    let response = format!(
        "HTTP/1.1 {status}\r\nContent-Type: text/html; charset=utf-8\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        body.len(),
        body
    );
    stream.write_all(response.as_bytes()).await?;
    stream.flush().await?;
    stream.shutdown().await
}

fn error_page(error: &BrowserAuthError) -> String {
    let message = match error {
        BrowserAuthError::AuthorizationDenied {
            error, description, ..
        } => match description {
            Some(description) => format!("{}: {}", error, description),
            None => error.clone(),
        },
        BrowserAuthError::StateMismatch { .. } => "state parameter mismatch".to_string(),
        BrowserAuthError::MissingCode { .. } => "no authorization code received".to_string(),
        BrowserAuthError::MissingSamlResponse { .. } => "no SAMLResponse received".to_string(),
        other => other.to_string(),
    };
    format!(
        "<html><body><h1>Authentication failed</h1><p>{}</p>\
         <p>You may close this window and retry.</p></body></html>",
        html_escape(&message)
    )
}

fn html_escape(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
