//! Local listener behaviour seen from outside the crate

use super::*;
use oauth2_credentials::{
    start_callback, BrowserAuthError, CallbackKind, CallbackOptions, CallbackPayload,
    CredentialError,
};
use std::time::{Duration, Instant};

#[tokio::test]
async fn test_none_browser_rejects_immediately_with_url() {
    let started = Instant::now();
    let options = CallbackOptions::new(BrowserMode::None)
        .with_base_port(0)
        .with_signal_handling(false);

    let err = start_callback(options, |redirect_uri| {
        Ok(format!(
            "https://uaa.example.com/oauth/authorize?client_id=cf&redirect_uri={}",
            urlencoding::encode(redirect_uri)
        ))
    })
    .await
    .unwrap_err();

    assert!(started.elapsed() < Duration::from_secs(5));
    match err {
        CredentialError::BrowserAuth(BrowserAuthError::NonInteractive { authorization_url }) => {
            assert!(authorization_url.starts_with("https://uaa.example.com/oauth/authorize"));
            assert!(authorization_url.contains("redirect_uri=http%3A%2F%2Flocalhost%3A"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_callback_delivers_code_and_releases_port() {
    let options = CallbackOptions::new(BrowserMode::Edge)
        .with_base_port(0)
        .with_kind(CallbackKind::OAuth)
        .with_signal_handling(false)
        .with_launcher(CodeReturningLauncher::shared("abc"));

    let mut bound_uri = String::new();
    let payload = start_callback(options, |redirect_uri| {
        bound_uri = redirect_uri.to_string();
        Ok(format!(
            "https://idp.example.com/authorize?redirect_uri={}",
            urlencoding::encode(redirect_uri)
        ))
    })
    .await
    .unwrap();

    match payload {
        CallbackPayload::Code(code) => assert_eq!(code, "abc"),
        other => panic!("unexpected payload: {other:?}"),
    }

    // The listener is gone once the call returns
    let port = Url::parse(&bound_uri).unwrap().port().unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(tokio::net::TcpStream::connect(("127.0.0.1", port))
        .await
        .is_err());
}

/// Set in the re-executed test binary that owns the signal scenario.
#[cfg(unix)]
const SIGNAL_CHILD_ENV: &str = "OAUTH2_CREDENTIALS_SIGNAL_CHILD";

/// Runs only in the child process started by
/// `test_sigint_terminates_after_listener_returns`.
#[cfg(unix)]
#[tokio::test]
async fn signal_child_interrupt_then_default_action() {
    use signal_hook::consts::SIGINT;
    use signal_hook::low_level::raise;

    if std::env::var_os(SIGNAL_CHILD_ENV).is_none() {
        return;
    }

    // Interrupts the waiting listener
    let options = CallbackOptions::new(BrowserMode::Headless)
        .with_base_port(0)
        .with_timeout(Duration::from_secs(30));
    tokio::spawn(async {
        tokio::time::sleep(Duration::from_millis(200)).await;
        raise(SIGINT).unwrap();
    });
    let err = start_callback(options, |_| Ok("https://idp.example.com/authorize".to_string()))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        CredentialError::BrowserAuth(BrowserAuthError::Interrupted { .. })
    ));

    // A second listener registers and removes its handlers again
    let options = CallbackOptions::new(BrowserMode::Headless)
        .with_base_port(0)
        .with_timeout(Duration::from_millis(100));
    let err = start_callback(options, |_| Ok("https://idp.example.com/authorize".to_string()))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        CredentialError::BrowserAuth(BrowserAuthError::Timeout { .. })
    ));

    // Nothing is listening any more; SIGINT must end the process
    raise(SIGINT).unwrap();
    tokio::time::sleep(Duration::from_secs(2)).await;
    std::process::exit(3);
}

#[cfg(unix)]
#[test]
fn test_sigint_terminates_after_listener_returns() {
    use std::os::unix::process::ExitStatusExt;
    use std::process::{Command, Stdio};

    let status = Command::new(std::env::current_exe().unwrap())
        .args([
            "--exact",
            "callback::signal_child_interrupt_then_default_action",
            "--test-threads=1",
        ])
        .env(SIGNAL_CHILD_ENV, "1")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .unwrap();

    assert_eq!(status.signal(), Some(signal_hook::consts::SIGINT));
}
