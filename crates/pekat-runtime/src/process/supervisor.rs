//! Server process supervision.
//!
//! A spawned server is owned by a background task that waits for it to exit
//! and publishes the exit through an [`ExitSignal`]. The caller keeps a
//! [`ServerProcess`] handle, which can request a forced termination. Dropping
//! the handle also terminates the process.

use pekat_core::{AnalyzerError, AnalyzerResult};
use std::ffi::OsStr;
use std::path::Path;
use std::process::Stdio;
use tokio::process::{Child, Command};
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use super::command::spawn_log_readers;
use super::exit::{ExitNotifier, ExitSignal, ProcessExit, exit_channel};
use super::shutdown::shutdown_child;

/// Handle to a running server process.
#[derive(Debug)]
pub struct ServerProcess {
    pid: Option<u32>,
    exit: ExitSignal,
    /// Dropping or firing this asks the supervisor task to kill the process.
    kill: Option<oneshot::Sender<()>>,
}

impl ServerProcess {
    /// Launch `executable` with `args` and start supervising it.
    ///
    /// Returns as soon as the OS has created the process; readiness is the
    /// prober's concern. Must be called from within a tokio runtime.
    pub fn spawn<I, S>(executable: &Path, args: I, port: u16) -> AnalyzerResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let mut cmd = Command::new(executable);
        cmd.args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        hide_window(&mut cmd);

        let mut child = cmd.spawn().map_err(|e| AnalyzerError::Spawn {
            path: executable.to_path_buf(),
            reason: e.to_string(),
        })?;
        let pid = child.id();
        info!(
            path = %executable.display(),
            pid = ?pid,
            port = %port,
            "Spawned server process"
        );

        spawn_log_readers(&mut child, port);

        let (notifier, exit) = exit_channel();
        let (kill_tx, kill_rx) = oneshot::channel();
        tokio::spawn(supervise(child, pid, kill_rx, notifier));

        Ok(Self {
            pid,
            exit,
            kill: Some(kill_tx),
        })
    }

    pub const fn pid(&self) -> Option<u32> {
        self.pid
    }

    /// A signal that resolves when the process exits.
    pub fn exit_signal(&self) -> ExitSignal {
        self.exit.clone()
    }

    /// The exit, if the process already ended.
    pub fn try_exit(&self) -> Option<ProcessExit> {
        self.exit.get()
    }

    /// Wait for the process to exit on its own.
    pub async fn wait(&mut self) -> ProcessExit {
        self.exit.wait().await
    }

    /// Kill the process (SIGTERM first on Unix) and wait for it to be reaped.
    pub async fn terminate(&mut self) -> ProcessExit {
        if let Some(kill) = self.kill.take() {
            // The supervisor may already be gone if the process exited
            let _ = kill.send(());
        }
        self.exit.wait().await
    }
}

async fn supervise(
    mut child: Child,
    pid: Option<u32>,
    mut kill_rx: oneshot::Receiver<()>,
    notifier: ExitNotifier,
) {
    // A closed channel (handle dropped) is a kill request as well
    let exited = tokio::select! {
        status = child.wait() => Some(status),
        _ = &mut kill_rx => None,
    };

    let status = match exited {
        Some(status) => status,
        None => {
            debug!(pid = ?pid, "Terminating server process");
            shutdown_child(child).await
        }
    };

    let exit = match status {
        Ok(status) => ProcessExit::from(status),
        Err(e) => {
            warn!(pid = ?pid, error = %e, "Failed to observe server exit status");
            ProcessExit::UNKNOWN
        }
    };

    if exit.success {
        info!(pid = ?pid, "Server process exited");
    } else {
        warn!(pid = ?pid, code = ?exit.code, "Server process exited with failure");
    }
    notifier.notify(exit);
}

#[cfg(windows)]
fn hide_window(cmd: &mut Command) {
    const CREATE_NO_WINDOW: u32 = 0x0800_0000;
    cmd.creation_flags(CREATE_NO_WINDOW);
}

#[cfg(not(windows))]
const fn hide_window(_cmd: &mut Command) {}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::time::timeout;

    #[tokio::test]
    async fn exit_signal_carries_exit_code() {
        let mut process = ServerProcess::spawn(Path::new("sh"), ["-c", "exit 7"], 0).unwrap();
        assert!(process.pid().is_some());

        let exit = timeout(Duration::from_secs(10), process.wait())
            .await
            .expect("process did not exit");
        assert_eq!(exit.code, Some(7));
        assert!(!exit.success);
        assert_eq!(process.try_exit(), Some(exit));
    }

    #[tokio::test]
    async fn non_utf8_output_keeps_process_alive() {
        let script = r#"printf '\377\376 caf\351\n'; sleep 1; for i in 1 2 3 4 5; do echo "log line $i"; echo "err line $i" >&2; done; sleep 1; exit 0"#;
        let mut process = ServerProcess::spawn(Path::new("sh"), ["-c", script], 0).unwrap();

        let exit = timeout(Duration::from_secs(20), process.wait())
            .await
            .expect("process did not exit");
        assert_eq!(exit.code, Some(0));
        assert!(exit.success);
    }

    #[tokio::test]
    async fn terminate_stops_long_running_process() {
        let mut process = ServerProcess::spawn(Path::new("sleep"), ["30"], 0).unwrap();
        let signal = process.exit_signal();
        assert!(!signal.has_exited());

        let exit = timeout(Duration::from_secs(10), process.terminate())
            .await
            .expect("process was not terminated");
        assert!(!exit.success);
        assert!(signal.has_exited());
    }

    #[tokio::test]
    async fn dropping_handle_kills_process() {
        let process = ServerProcess::spawn(Path::new("sleep"), ["30"], 0).unwrap();
        let mut signal = process.exit_signal();
        drop(process);

        let exit = timeout(Duration::from_secs(10), signal.wait())
            .await
            .expect("dropped process kept running");
        assert!(!exit.success);
    }

    #[tokio::test]
    async fn missing_executable_is_a_spawn_error() {
        let err = ServerProcess::spawn(Path::new("/nonexistent/pekat_vision"), ["-x"], 0)
            .unwrap_err();
        assert!(matches!(err, AnalyzerError::Spawn { .. }));
    }
}
