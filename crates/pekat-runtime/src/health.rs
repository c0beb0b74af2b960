//! Readiness probing for analysis servers.
//!
//! A freshly spawned server needs a while before it answers on `/ping`. The
//! prober keeps pinging until it does, and gives up as soon as the process
//! exits.

use async_trait::async_trait;
use pekat_core::{AnalyzerError, AnalyzerResult};
use reqwest::{Client, Url};
use std::time::Duration;
use thiserror::Error;
use tokio::time::sleep;
use tracing::{debug, info};

use crate::process::ExitSignal;

/// Pause between two failed pings.
pub const PROBE_BACKOFF: Duration = Duration::from_millis(100);

/// Timeout for a single ping request.
pub const PING_TIMEOUT: Duration = Duration::from_secs(2);

/// Why a ping did not succeed.
#[derive(Debug, Clone, Error)]
pub enum ProbeError {
    /// Nothing accepts connections on the target yet.
    #[error("server not listening: {0}")]
    NotListening(String),

    /// Something answered, but not with a success status.
    #[error("ping returned status {0}")]
    Status(u16),

    /// Any other transport failure.
    #[error("ping failed: {0}")]
    Transport(String),
}

/// A single liveness check against a server.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ServerProbe: Send + Sync {
    async fn ping(&self) -> Result<(), ProbeError>;
}

/// Pings `GET <base>/ping` over HTTP.
#[derive(Debug, Clone)]
pub struct HttpProbe {
    http: Client,
    url: Url,
}

impl HttpProbe {
    pub fn new(http: Client, base_url: &Url) -> AnalyzerResult<Self> {
        let url = base_url
            .join("/ping")
            .map_err(|e| AnalyzerError::Configuration(format!("Invalid server URL: {e}")))?;
        Ok(Self { http, url })
    }

    pub const fn url(&self) -> &Url {
        &self.url
    }
}

#[async_trait]
impl ServerProbe for HttpProbe {
    async fn ping(&self) -> Result<(), ProbeError> {
        match self
            .http
            .get(self.url.clone())
            .timeout(PING_TIMEOUT)
            .send()
            .await
        {
            Ok(response) if response.status().is_success() => Ok(()),
            Ok(response) => Err(ProbeError::Status(response.status().as_u16())),
            Err(e) if e.is_connect() => Err(ProbeError::NotListening(e.to_string())),
            Err(e) => Err(ProbeError::Transport(e.to_string())),
        }
    }
}

/// Wait until the server answers a ping.
///
/// Without an exit signal there is no process to watch (remote attach), and
/// the probe is skipped entirely. With one, every ping and every backoff pause
/// races the process exit: an exit fails the wait with
/// [`AnalyzerError::ProcessStartup`], a successful ping ends it, and any ping
/// failure is retried after [`PROBE_BACKOFF`] for as long as the process
/// lives.
///
/// Returns the number of pings issued.
pub async fn wait_until_ready<P>(probe: &P, exit: Option<&ExitSignal>) -> AnalyzerResult<u32>
where
    P: ServerProbe + ?Sized,
{
    let Some(exit) = exit else {
        debug!("No server process to watch, skipping readiness probe");
        return Ok(0);
    };
    let mut exit = exit.clone();

    info!("Waiting for server to become ready");
    let mut attempt = 0u32;

    loop {
        attempt += 1;

        tokio::select! {
            biased;
            status = exit.wait() => {
                return Err(AnalyzerError::ProcessStartup { code: status.code });
            }
            result = probe.ping() => match result {
                Ok(()) => {
                    info!(attempt = %attempt, "Server is ready");
                    return Ok(attempt);
                }
                Err(e) => debug!(attempt = %attempt, error = %e, "Server not ready yet, retrying"),
            },
        }

        tokio::select! {
            biased;
            status = exit.wait() => {
                return Err(AnalyzerError::ProcessStartup { code: status.code });
            }
            () = sleep(PROBE_BACKOFF) => {}
        }
    }
}

/// Ping once and surface the failure, without retrying.
///
/// Used to verify a remote server on attach.
pub async fn ping_once<P>(probe: &P) -> AnalyzerResult<()>
where
    P: ServerProbe + ?Sized,
{
    probe
        .ping()
        .await
        .map_err(|e| AnalyzerError::Connection(e.to_string()))
}
