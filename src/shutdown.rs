//! Signal-driven shutdown of a collector process.
//!
//! The signal listener never touches the store. It requests a stop over a
//! watch channel, waits for the sampler task to finish (its acknowledgment),
//! and only then closes the store.

use std::future::Future;

use tokio::signal::unix::{signal, Signal, SignalKind};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::error::CollectError;
use crate::sampler::LoopOutcome;
use crate::store::SharedStore;
use crate::sysexits;

/// The set of signals a collector reacts to.
///
/// SIGINT is left alone when stdin is a terminal so that an interactive
/// interrupt keeps its default behaviour. SIGHUP is caught only so that it
/// is not fatal.
pub struct SignalSet {
    interrupt: Option<Signal>,
    quit: Option<Signal>,
    user1: Option<Signal>,
    user2: Option<Signal>,
    terminate: Option<Signal>,
    hangup: Option<Signal>,
}

impl SignalSet {
    /// Install handlers. A signal that cannot be installed is skipped with a warning.
    pub fn install(interactive: bool) -> Self {
        let interrupt = if interactive {
            info!("Attached to a terminal, SIGINT keeps its default action");
            None
        } else {
            install_one(SignalKind::interrupt(), "SIGINT")
        };
        Self {
            interrupt,
            quit: install_one(SignalKind::quit(), "SIGQUIT"),
            user1: install_one(SignalKind::user_defined1(), "SIGUSR1"),
            user2: install_one(SignalKind::user_defined2(), "SIGUSR2"),
            terminate: install_one(SignalKind::terminate(), "SIGTERM"),
            hangup: install_one(SignalKind::hangup(), "SIGHUP"),
        }
    }

    /// Wait for the first fatal signal and return its name.
    pub async fn recv(mut self) -> &'static str {
        loop {
            tokio::select! {
                _ = recv_opt(&mut self.hangup) => {
                    info!("Received SIGHUP, ignoring");
                }
                _ = recv_opt(&mut self.interrupt) => return "SIGINT",
                _ = recv_opt(&mut self.quit) => return "SIGQUIT",
                _ = recv_opt(&mut self.user1) => return "SIGUSR1",
                _ = recv_opt(&mut self.user2) => return "SIGUSR2",
                _ = recv_opt(&mut self.terminate) => return "SIGTERM",
            }
        }
    }
}

fn install_one(kind: SignalKind, name: &'static str) -> Option<Signal> {
    match signal(kind) {
        Ok(s) => Some(s),
        Err(e) => {
            warn!(signal = name, error = %e, "Failed to install signal handler");
            None
        }
    }
}

async fn recv_opt(sig: &mut Option<Signal>) {
    match sig {
        Some(s) => {
            if s.recv().await.is_none() {
                std::future::pending::<()>().await;
            }
        }
        None => std::future::pending::<()>().await,
    }
}

/// Wait for the sampler to end on its own or for `shutdown` to fire, then
/// close the store. Returns the process exit status.
///
/// The loop's own error, if any, decides the status. Otherwise a failure to
/// close the store yields `EX_IOERR` (with a message on stderr) and a clean
/// close yields `EX_OK`.
pub async fn supervise<S>(
    mut sampler: JoinHandle<Result<LoopOutcome, CollectError>>,
    stop: watch::Sender<bool>,
    store: SharedStore,
    shutdown: S,
) -> i32
where
    S: Future<Output = &'static str>,
{
    tokio::pin!(shutdown);

    let joined = tokio::select! {
        joined = &mut sampler => joined,
        name = &mut shutdown => {
            info!(signal = name, "Shutdown requested, waiting for the current cycle");
            // The receiver lives inside the sampler task; if it is gone the
            // task has already finished.
            let _ = stop.send(true);
            sampler.await
        }
    };

    let loop_result = joined
        .unwrap_or_else(|e| Err(CollectError::Io(format!("sampler task failed: {}", e))));

    let close_result = store.close();

    match loop_result {
        Err(e) => {
            error!(error = %e, code = e.exit_code(), "Sampler failed");
            eprintln!("clusterwatch: {}", e);
            if let Err(close_err) = close_result {
                error!(error = %close_err, "Failed to close store");
            }
            e.exit_code()
        }
        Ok(outcome) => match close_result {
            Ok(()) => {
                info!(?outcome, "Store closed, exiting");
                sysexits::EX_OK
            }
            Err(e) => {
                error!(error = %e, "Failed to close store");
                eprintln!("clusterwatch: failed to close store: {}", e);
                sysexits::EX_IOERR
            }
        },
    }
}
