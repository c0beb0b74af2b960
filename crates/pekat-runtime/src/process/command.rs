//! Server command line and log streaming.
//!
//! This module builds the argument vector for the server executable and
//! forwards its stdout/stderr to tracing.

use std::ffi::OsString;
use std::path::Path;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Child;
use tracing::debug;

/// Everything the server needs on its command line.
#[derive(Debug, Clone)]
pub struct ServerArgs<'a> {
    pub project_path: &'a Path,
    pub host: &'a str,
    pub port: u16,
    pub api_key: Option<&'a str>,
    pub stop_key: u32,
    /// Free-form options appended after the generated flags.
    pub extra_options: Option<&'a str>,
}

impl ServerArgs<'_> {
    /// Build the argument vector.
    ///
    /// `-data <project> -host <host> -port <port> [-api_key <key>] -stop_key <key> [extra...]`
    pub fn to_argv(&self) -> Vec<OsString> {
        let mut argv: Vec<OsString> = vec![
            "-data".into(),
            self.project_path.as_os_str().to_owned(),
            "-host".into(),
            self.host.into(),
            "-port".into(),
            self.port.to_string().into(),
        ];

        if let Some(key) = self.api_key.filter(|k| !k.trim().is_empty()) {
            argv.push("-api_key".into());
            argv.push(key.into());
        }

        argv.push("-stop_key".into());
        argv.push(self.stop_key.to_string().into());

        if let Some(options) = self.extra_options {
            argv.extend(split_options(options).into_iter().map(OsString::from));
        }

        argv
    }
}

/// Split a free-form option string into arguments.
///
/// Whitespace separates arguments except inside double quotes; the quotes
/// themselves are removed, so `-a "b c"` yields `-a` and `b c`.
pub fn split_options(options: &str) -> Vec<String> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut has_token = false;

    for c in options.chars() {
        match c {
            '"' => {
                in_quotes = !in_quotes;
                has_token = true;
            }
            c if c.is_whitespace() && !in_quotes => {
                if has_token {
                    args.push(std::mem::take(&mut current));
                    has_token = false;
                }
            }
            c => {
                current.push(c);
                has_token = true;
            }
        }
    }

    if has_token {
        args.push(current);
    }

    args
}

/// Spawn background tasks to stream stdout/stderr logs asynchronously.
///
/// Each line is logged via tracing with the server port attached. Lines are
/// decoded lossily, so output in a non-UTF-8 code page keeps the pipe
/// drained. The tasks exit on EOF or a read error.
pub fn spawn_log_readers(child: &mut Child, port: u16) {
    if let Some(stdout) = child.stdout.take() {
        tokio::spawn(forward_lines(stdout, port, "stdout"));
    }

    if let Some(stderr) = child.stderr.take() {
        tokio::spawn(forward_lines(stderr, port, "stderr"));
    }
}

async fn forward_lines<R>(stream: R, port: u16, name: &'static str)
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(stream);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {
                let text = String::from_utf8_lossy(&buf);
                debug!(port = %port, "{name}: {}", text.trim_end());
            }
            Err(e) => {
                debug!(port = %port, error = %e, "Stopped reading server {name}");
                break;
            }
        }
    }
}
