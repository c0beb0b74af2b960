//! Local server process management.
//!
//! # Structure
//!
//! - `command` - argument vector for the server and log streaming
//! - `exit` - one-shot "process exited" signal
//! - `supervisor` - spawning and owning the child process
//! - `shutdown` - forced termination with signal escalation

mod command;
mod exit;
pub mod shutdown;
mod supervisor;

pub use command::{ServerArgs, split_options};
pub use exit::{ExitNotifier, ExitSignal, ProcessExit, exit_channel};
pub use shutdown::shutdown_child;
pub use supervisor::ServerProcess;
