//! Stopping a single process group

use std::io;
use std::process::ExitStatus;
use std::time::Duration;

use futures::future::join_all;
use tokio::time::timeout;

use crate::error::StopError;
use crate::launcher::ProcessHandle;

use super::report::{aggregate_stop_results, StopReport};

/// Upper bound on reaping a process after SIGKILL
const REAP_TIMEOUT: Duration = Duration::from_secs(5);

/// How a process came to be stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    /// It had exited on its own; nothing was sent
    AlreadyExited(ExitStatus),
    /// It exited within the grace period after SIGTERM
    Terminated(ExitStatus),
    /// It outlived the grace period and was killed
    Killed(ExitStatus),
}

impl StopOutcome {
    /// Final exit status
    pub fn status(&self) -> ExitStatus {
        match self {
            Self::AlreadyExited(s) | Self::Terminated(s) | Self::Killed(s) => *s,
        }
    }

    /// Short label for logs
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AlreadyExited(_) => "already-exited",
            Self::Terminated(_) => "terminated",
            Self::Killed(_) => "killed",
        }
    }
}

/// Signals delivered to a process group while stopping it
#[derive(Debug, Clone, Copy)]
enum GroupSignal {
    Term,
    Kill,
}

impl GroupSignal {
    fn raw(self) -> libc::c_int {
        match self {
            Self::Term => libc::SIGTERM,
            Self::Kill => libc::SIGKILL,
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            Self::Term => "SIGTERM",
            Self::Kill => "SIGKILL",
        }
    }
}

/// Signal a handle's process group; a vanished group is not an error
fn signal_group(handle: &ProcessHandle, signal: GroupSignal) -> Result<(), StopError> {
    // The launcher makes every child its own group leader, so pgid == pid.
    let pgid = handle.pid() as libc::pid_t;

    // SAFETY: killpg takes two integers and touches no memory of ours.
    if unsafe { libc::killpg(pgid, signal.raw()) } == 0 {
        return Ok(());
    }

    let source = io::Error::last_os_error();
    if source.raw_os_error() == Some(libc::ESRCH) {
        return Ok(());
    }
    Err(StopError::Signal {
        slot: handle.slot(),
        pid: handle.pid(),
        signal: signal.as_str(),
        source,
    })
}

/// Stop one process: SIGTERM, wait up to `grace`, then SIGKILL and reap
///
/// A process that has already exited is left alone. Returns within roughly
/// `grace` plus the kill and reap time.
pub async fn stop(handle: &mut ProcessHandle, grace: Duration) -> Result<StopOutcome, StopError> {
    let slot = handle.slot();
    let pid = handle.pid();

    match handle.try_status() {
        Ok(Some(status)) => {
            tracing::debug!(slot, pid, %status, "Process already exited");
            return Ok(StopOutcome::AlreadyExited(status));
        }
        Ok(None) => {}
        Err(source) => return Err(StopError::Status { slot, pid, source }),
    }

    signal_group(handle, GroupSignal::Term)?;
    match timeout(grace, handle.wait()).await {
        Ok(Ok(status)) => {
            tracing::debug!(slot, pid, %status, "Process terminated");
            return Ok(StopOutcome::Terminated(status));
        }
        Ok(Err(source)) => return Err(StopError::Wait { slot, pid, source }),
        Err(_) => {
            tracing::warn!(
                slot,
                pid,
                grace_ms = grace.as_millis() as u64,
                "Process ignored SIGTERM, sending SIGKILL"
            );
        }
    }

    if let Err(err) = signal_group(handle, GroupSignal::Kill) {
        tracing::warn!(slot, pid, error = %err, "Group kill failed, killing leader only");
        if handle.start_kill().is_err() {
            return Err(err);
        }
    }

    match timeout(REAP_TIMEOUT, handle.wait()).await {
        Ok(Ok(status)) => Ok(StopOutcome::Killed(status)),
        Ok(Err(source)) => Err(StopError::Wait { slot, pid, source }),
        Err(_) => Err(StopError::Unreaped { slot, pid }),
    }
}

/// Stop every handle concurrently
///
/// Each handle is attempted independently; failures are logged and collected
/// in the report, never propagated.
pub async fn stop_all(handles: &mut [ProcessHandle], grace: Duration) -> StopReport {
    let results = join_all(handles.iter_mut().map(|handle| async move {
        let slot = handle.slot();
        let pid = handle.pid();
        (slot, pid, stop(handle, grace).await)
    }))
    .await;

    aggregate_stop_results(results)
}
