//! Helpers for tests that run real processes

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// Write an executable `/bin/sh` script standing in for a benchmark binary
pub(crate) fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, format!("#!/bin/sh\n{body}")).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path
}

/// Whether a pid still names a process
pub(crate) fn is_running(pid: u32) -> bool {
    // SAFETY: signal 0 only checks that the pid exists.
    unsafe { libc::kill(pid as libc::pid_t, 0) == 0 }
}

/// Send a signal to the test process itself
pub(crate) fn raise(signal: libc::c_int) {
    // SAFETY: kill takes integers and touches no memory.
    let rc = unsafe { libc::kill(libc::getpid(), signal) };
    assert_eq!(rc, 0, "failed to send signal {signal}");
}

/// Process group of a pid
pub(crate) fn process_group(pid: u32) -> libc::pid_t {
    // SAFETY: getpgid takes an integer and touches no memory.
    unsafe { libc::getpgid(pid as libc::pid_t) }
}

/// Process group of the test process
pub(crate) fn own_process_group() -> libc::pid_t {
    // SAFETY: getpgrp has no arguments and cannot fail.
    unsafe { libc::getpgrp() }
}

/// Poll a log file until it contains `needle`
pub(crate) async fn wait_for_log(path: &Path, needle: &str) {
    let deadline = Instant::now() + Duration::from_secs(5);
    loop {
        if fs::read_to_string(path).is_ok_and(|log| log.contains(needle)) {
            return;
        }
        assert!(
            Instant::now() < deadline,
            "{} never contained {needle:?}",
            path.display()
        );
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}
