//! Termination signals for a waiting listener
//!
//! SIGINT and SIGTERM reach a waiting listener through a socket pair. The
//! registration is removed when the listener finishes, and while no
//! listener waits both signals take their default action again.

#[cfg(unix)]
mod imp {
    use signal_hook::consts::{SIGINT, SIGTERM};
    use signal_hook::low_level::{pipe, unregister};
    use signal_hook::SigId;
    use std::io;
    use std::os::raw::c_int;
    use std::os::unix::net::UnixStream as StdUnixStream;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{Arc, Mutex, MutexGuard};
    use tokio::io::AsyncReadExt;
    use tokio::net::UnixStream;
    use tracing::debug;

    const SIGNALS: [c_int; 2] = [SIGINT, SIGTERM];

    struct Dispositions {
        waiting: usize,
        /// Emulates the default action while set. Installed on first use and
        /// kept, since the OS-level handler outlives every unregistration.
        default_action: Option<Arc<AtomicBool>>,
    }

    static DISPOSITIONS: Mutex<Dispositions> = Mutex::new(Dispositions {
        waiting: 0,
        default_action: None,
    });

    fn dispositions() -> MutexGuard<'static, Dispositions> {
        DISPOSITIONS
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// SIGINT/SIGTERM routed to one listener until dropped.
    pub struct TerminationSignals {
        ids: Vec<SigId>,
        receiver: UnixStream,
    }

    impl TerminationSignals {
        pub fn register() -> io::Result<Self> {
            let mut state = dispositions();
            let default_action = match &state.default_action {
                Some(flag) => flag.clone(),
                None => {
                    let flag = Arc::new(AtomicBool::new(true));
                    register_all(|signal| {
                        signal_hook::flag::register_conditional_default(signal, flag.clone())
                    })?;
                    state.default_action = Some(flag.clone());
                    flag
                }
            };

            let (receiver, sender) = StdUnixStream::pair()?;
            receiver.set_nonblocking(true)?;
            sender.set_nonblocking(true)?;
            let ids = register_all(|signal| pipe::register(signal, sender.try_clone()?))?;
            let receiver = match UnixStream::from_std(receiver) {
                Ok(receiver) => receiver,
                Err(e) => {
                    ids.into_iter().for_each(|id| {
                        unregister(id);
                    });
                    return Err(e);
                }
            };

            state.waiting += 1;
            default_action.store(false, Ordering::SeqCst);
            debug!(waiting = state.waiting, "termination signal handlers registered");
            Ok(Self { ids, receiver })
        }

        /// Resolves on the first SIGINT or SIGTERM.
        pub async fn recv(&mut self) {
            let mut byte = [0u8; 1];
            match self.receiver.read(&mut byte).await {
                Ok(n) if n > 0 => {}
                _ => std::future::pending().await,
            }
        }
    }

    /// Register one action per signal; all or nothing.
    fn register_all(
        mut action: impl FnMut(c_int) -> io::Result<SigId>,
    ) -> io::Result<Vec<SigId>> {
        let mut ids = Vec::with_capacity(SIGNALS.len());
        for signal in SIGNALS {
            match action(signal) {
                Ok(id) => ids.push(id),
                Err(e) => {
                    for id in ids {
                        unregister(id);
                    }
                    return Err(e);
                }
            }
        }
        Ok(ids)
    }

    impl Drop for TerminationSignals {
        fn drop(&mut self) {
            let mut state = dispositions();
            state.waiting = state.waiting.saturating_sub(1);
            if state.waiting == 0 {
                if let Some(flag) = &state.default_action {
                    flag.store(true, Ordering::SeqCst);
                }
            }
            for id in self.ids.drain(..) {
                unregister(id);
            }
            debug!(waiting = state.waiting, "termination signal handlers removed");
        }
    }

    #[cfg(test)]
    pub(crate) fn default_action_armed() -> Option<bool> {
        dispositions()
            .default_action
            .as_ref()
            .map(|flag| flag.load(Ordering::SeqCst))
    }
}

#[cfg(not(unix))]
mod imp {
    /// Signal routing is unix-only; elsewhere the listener ends on its
    /// callback or timeout.
    pub struct TerminationSignals;

    impl TerminationSignals {
        pub fn register() -> std::io::Result<Self> {
            Ok(Self)
        }

        pub async fn recv(&mut self) {
            std::future::pending().await
        }
    }
}

pub(crate) use imp::TerminationSignals;

/// Wait for a termination signal, or forever when none are registered.
pub(crate) async fn termination(signals: Option<&mut TerminationSignals>) {
    match signals {
        Some(signals) => signals.recv().await,
        None => std::future::pending().await,
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::imp::default_action_armed;
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_signal_reaches_registered_listener() {
        let mut signals = TerminationSignals::register().unwrap();
        assert_eq!(default_action_armed(), Some(false));

        signal_hook::low_level::raise(signal_hook::consts::SIGTERM).unwrap();
        tokio::time::timeout(Duration::from_secs(5), termination(Some(&mut signals)))
            .await
            .unwrap();
    }
}
