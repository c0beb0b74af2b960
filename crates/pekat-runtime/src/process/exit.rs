//! One-shot "process exited" signal.
//!
//! The supervisor task publishes the exit exactly once; any number of
//! [`ExitSignal`] clones can await it concurrently with other work.

use std::process::ExitStatus;
use tokio::sync::watch;

/// How a server process ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessExit {
    /// Exit code, `None` when the process was terminated by a signal.
    pub code: Option<i32>,
    pub success: bool,
}

impl ProcessExit {
    /// Exit whose status could not be observed.
    pub const UNKNOWN: Self = Self {
        code: None,
        success: false,
    };

    pub const fn from_code(code: i32) -> Self {
        Self {
            code: Some(code),
            success: code == 0,
        }
    }
}

impl From<ExitStatus> for ProcessExit {
    fn from(status: ExitStatus) -> Self {
        Self {
            code: status.code(),
            success: status.success(),
        }
    }
}

/// Publishing side, owned by the supervisor task.
#[derive(Debug)]
pub struct ExitNotifier {
    tx: watch::Sender<Option<ProcessExit>>,
}

impl ExitNotifier {
    /// Publish the exit. Later calls are ignored.
    pub fn notify(&self, exit: ProcessExit) {
        self.tx.send_if_modified(|state| {
            if state.is_some() {
                return false;
            }
            *state = Some(exit);
            true
        });
    }
}

/// Awaitable view of a process exit.
#[derive(Debug, Clone)]
pub struct ExitSignal {
    rx: watch::Receiver<Option<ProcessExit>>,
}

impl ExitSignal {
    /// Wait until the process has exited.
    ///
    /// Resolves immediately if the exit was already published. A notifier
    /// dropped without publishing counts as an exit with unknown status.
    pub async fn wait(&mut self) -> ProcessExit {
        match self.rx.wait_for(Option::is_some).await {
            Ok(state) => {
                let exit = *state;
                exit.unwrap_or(ProcessExit::UNKNOWN)
            }
            Err(_) => ProcessExit::UNKNOWN,
        }
    }

    /// The exit, if it already happened.
    pub fn get(&self) -> Option<ProcessExit> {
        *self.rx.borrow()
    }

    pub fn has_exited(&self) -> bool {
        self.get().is_some()
    }
}

/// Create a connected notifier/signal pair.
pub fn exit_channel() -> (ExitNotifier, ExitSignal) {
    let (tx, rx) = watch::channel(None);
    (ExitNotifier { tx }, ExitSignal { rx })
}
