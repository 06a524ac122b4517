//! Child-process supervision for external audio pipelines.
//!
//! Pipelines are shell commands chaining several utilities; each is spawned
//! in its own process group so the whole chain dies together. Teardown is
//! deliberately slow (TERM to the group, a short grace window, a KILL if
//! needed, then a settle delay) because the capture/playback handles inside
//! a freshly killed chain take a moment to release the device, and starting
//! a replacement too early fails in ways no retry loop fixes cleanly.

use std::io;
use std::os::unix::process::CommandExt;
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use log::{debug, warn};

/// How long after spawn to probe whether the process died immediately.
pub const LIVENESS_PROBE_DELAY: Duration = Duration::from_millis(100);
/// How long to wait for a TERM'd group before escalating to KILL.
pub const STOP_GRACE: Duration = Duration::from_millis(300);
/// Settle time after the group is dead, for the audio device to release.
pub const DEVICE_RELEASE_DELAY: Duration = Duration::from_millis(400);

const STOP_POLL: Duration = Duration::from_millis(20);

/// Where the child's stdout/stderr go.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputSink {
    /// Throw output away (continuous pipelines).
    Discard,
    /// Keep stderr for diagnostics when an early exit is suspected.
    Capture,
}

/// An owned child process plus the command line it was built from.
///
/// Exactly one call site owns each instance; dropping it kills the group.
#[derive(Debug)]
pub struct ManagedProcess {
    child: Child,
    command: String,
}

impl ManagedProcess {
    /// Spawn `argv` in a fresh process group.
    pub fn spawn(argv: &[String], sink: OutputSink) -> io::Result<Self> {
        let (program, args) = argv
            .split_first()
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "empty command"))?;

        let mut cmd = Command::new(program);
        cmd.args(args).stdin(Stdio::null()).process_group(0);
        match sink {
            OutputSink::Discard => {
                cmd.stdout(Stdio::null()).stderr(Stdio::null());
            }
            OutputSink::Capture => {
                cmd.stdout(Stdio::null()).stderr(Stdio::piped());
            }
        }

        let child = cmd.spawn()?;
        Ok(Self {
            child,
            command: argv.join(" "),
        })
    }

    /// Spawn, then probe shortly afterwards: a pipeline that exits within
    /// the probe window is treated as a failed start, with whatever stderr
    /// it produced folded into the error.
    pub fn spawn_checked(argv: &[String], sink: OutputSink) -> io::Result<Self> {
        let mut proc = Self::spawn(argv, sink)?;
        thread::sleep(LIVENESS_PROBE_DELAY);

        match proc.child.try_wait()? {
            None => Ok(proc),
            Some(status) => {
                let mut detail = String::new();
                if let Some(stderr) = proc.child.stderr.take() {
                    use io::Read;
                    let mut stderr = stderr;
                    let _ = stderr.read_to_string(&mut detail);
                }
                Err(io::Error::new(
                    io::ErrorKind::Other,
                    format!("exited immediately ({status}): {}", detail.trim()),
                ))
            }
        }
    }

    /// The command line this process was started from.
    pub fn command(&self) -> &str {
        &self.command
    }

    pub fn pid(&self) -> u32 {
        self.child.id()
    }

    /// Poll the child without blocking. A process that has exited (or whose
    /// status cannot be read) counts as not running.
    pub fn is_running(&mut self) -> bool {
        matches!(self.child.try_wait(), Ok(None))
    }

    /// Stop the whole process group: TERM, grace window, KILL fallback,
    /// then the device-release settle delay. Always consumes the handle.
    pub fn stop(mut self) {
        let pgid = self.child.id() as i32;
        debug!(target: "process", "stopping group {} ({})", pgid, self.command);

        signal_group(pgid, libc::SIGTERM);

        let deadline = Instant::now() + STOP_GRACE;
        loop {
            match self.child.try_wait() {
                Ok(Some(_)) => break,
                Ok(None) if Instant::now() < deadline => thread::sleep(STOP_POLL),
                Ok(None) => {
                    warn!(target: "process", "group {} ignored TERM, killing", pgid);
                    signal_group(pgid, libc::SIGKILL);
                    let _ = self.child.wait();
                    break;
                }
                Err(e) => {
                    warn!(target: "process", "wait on group {} failed: {}", pgid, e);
                    break;
                }
            }
        }

        // Reap any group stragglers the shell left behind, then let the
        // audio device finish releasing before the caller starts a successor.
        signal_group(pgid, libc::SIGKILL);
        thread::sleep(DEVICE_RELEASE_DELAY);
    }
}

impl Drop for ManagedProcess {
    fn drop(&mut self) {
        if let Ok(None) = self.child.try_wait() {
            signal_group(self.child.id() as i32, libc::SIGKILL);
            let _ = self.child.wait();
        }
    }
}

fn signal_group(pgid: i32, signal: i32) {
    // Safe: plain syscall on a pgid we created via process_group(0).
    unsafe {
        libc::killpg(pgid, signal);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sh(script: &str) -> Vec<String> {
        vec!["sh".into(), "-c".into(), script.into()]
    }

    #[test]
    fn spawn_checked_accepts_a_living_process() {
        let mut proc = ManagedProcess::spawn_checked(&sh("sleep 5"), OutputSink::Discard).unwrap();
        assert!(proc.is_running());
        proc.stop();
    }

    #[test]
    fn spawn_checked_rejects_immediate_exit() {
        let err = ManagedProcess::spawn_checked(
            &sh("echo boom >&2; exit 3"),
            OutputSink::Capture,
        )
        .unwrap_err();
        assert!(err.to_string().contains("boom"), "got: {err}");
    }

    #[test]
    fn spawn_rejects_empty_argv() {
        assert!(ManagedProcess::spawn(&[], OutputSink::Discard).is_err());
    }

    #[test]
    fn stop_terminates_a_pipeline_group() {
        let proc = ManagedProcess::spawn_checked(
            &sh("sleep 30 | sleep 30"),
            OutputSink::Discard,
        )
        .unwrap();
        let pgid = proc.pid() as i32;
        proc.stop();

        // After stop the group must be gone: signalling it should fail.
        let alive = unsafe { libc::killpg(pgid, 0) } == 0;
        assert!(!alive, "process group {pgid} survived stop()");
    }
}
