//! Analyzer facade.
//!
//! An [`Analyzer`] is either started locally (spawned server process, owned
//! and stopped by the analyzer) or attached to a remote server (no process,
//! nothing to stop). Both kinds analyze images the same way.
//!
//! ```no_run
//! use pekat_core::{AnalyzerConfig, LocalLaunch, ResultKind};
//! use pekat_runtime::Analyzer;
//!
//! # async fn run() -> pekat_core::AnalyzerResult<()> {
//! let launch = LocalLaunch::new("/data/projects/bottles").with_dist_path("/opt/pekat");
//! let analyzer = Analyzer::start_local(launch, &AnalyzerConfig::default()).await?;
//!
//! let result = analyzer.analyze_file("bottle.png", ResultKind::Context, None).await?;
//! println!("{}", result.context().unwrap_or_default());
//!
//! analyzer.shutdown().await;
//! # Ok(())
//! # }
//! ```

use bytes::Bytes;
use pekat_core::{
    AnalysisRequest, AnalysisResult, AnalyzerConfig, AnalyzerError, AnalyzerResult,
    ImagePayload, LocalLaunch, RemoteTarget, ResultKind,
};
use rand::Rng;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Url};
use std::path::Path;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::dist::locate_server;
use crate::health::{HttpProbe, ping_once, wait_until_ready};
use crate::ports::find_free_port_pair;
use crate::process::{ProcessExit, ServerArgs, ServerProcess};
use crate::protocol::{OCTET_STREAM, STOP_PATH, decode, encode_url, load_body};

/// A spawned server together with the key that authorizes stopping it.
#[derive(Debug)]
struct OwnedServer {
    stop_key: u32,
    process: ServerProcess,
}

/// Client for one analysis server.
#[derive(Debug)]
pub struct Analyzer {
    http: Client,
    base_url: Url,
    api_key: Option<String>,
    context_in_body: bool,
    request_timeout: Option<Duration>,
    stop_grace: Duration,
    /// Present only for locally spawned servers.
    server: Option<OwnedServer>,
}

/// Build the HTTP client an analyzer uses.
///
/// One client can be shared by any number of analyzers.
pub fn build_http_client() -> AnalyzerResult<Client> {
    Client::builder()
        .build()
        .map_err(|e| AnalyzerError::Configuration(format!("Failed to build HTTP client: {e}")))
}

fn base_url(host: &str, port: u16) -> AnalyzerResult<Url> {
    Url::parse(&format!("http://{host}:{port}"))
        .map_err(|e| AnalyzerError::Configuration(format!("Invalid server address {host}:{port}: {e}")))
}

fn transport_error(e: &reqwest::Error) -> AnalyzerError {
    if e.is_timeout() {
        AnalyzerError::Connection(format!("Request timed out: {e}"))
    } else {
        AnalyzerError::Connection(e.to_string())
    }
}

impl Analyzer {
    /// Spawn a local server and wait until it is ready.
    pub async fn start_local(launch: LocalLaunch, config: &AnalyzerConfig) -> AnalyzerResult<Self> {
        Self::start_local_with(build_http_client()?, launch, config).await
    }

    /// [`Analyzer::start_local`] with a caller-provided HTTP client.
    pub async fn start_local_with(
        http: Client,
        launch: LocalLaunch,
        config: &AnalyzerConfig,
    ) -> AnalyzerResult<Self> {
        launch.validate()?;
        config.validate()?;

        let executable = locate_server(launch.dist_path.as_deref())?;
        let port = find_free_port_pair(config.port_range_start, config.port_range_end)?;
        let stop_key = rand::rng().random_range(1..=i32::MAX.unsigned_abs());

        let args = ServerArgs {
            project_path: &launch.project_path,
            host: &config.host,
            port,
            api_key: launch.api_key(),
            stop_key,
            extra_options: launch.extra_options.as_deref(),
        };
        let mut process = ServerProcess::spawn(&executable, args.to_argv(), port)?;

        let base_url = base_url(&config.host, port)?;
        let probe = HttpProbe::new(http.clone(), &base_url)?;
        let exit = process.exit_signal();
        let ready = wait_until_ready(&probe, Some(&exit));
        let ready = match config.startup_timeout() {
            Some(limit) => timeout(limit, ready)
                .await
                .unwrap_or(Err(AnalyzerError::StartupTimeout(limit))),
            None => ready.await,
        };

        if let Err(e) = ready {
            if process.try_exit().is_none() {
                warn!(port = %port, error = %e, "Server failed to start, terminating it");
                process.terminate().await;
            }
            return Err(e);
        }

        info!(url = %base_url, pid = ?process.pid(), "Local analyzer ready");
        Ok(Self {
            http,
            base_url,
            api_key: launch.api_key().map(str::to_string),
            context_in_body: config.context_in_body,
            request_timeout: config.request_timeout(),
            stop_grace: config.stop_grace(),
            server: Some(OwnedServer { stop_key, process }),
        })
    }

    /// Attach to an already running server.
    ///
    /// The server is not contacted unless `config.verify_remote` is set, in
    /// which case a single failed ping is returned as a connection error.
    pub async fn connect_remote(
        target: RemoteTarget,
        config: &AnalyzerConfig,
    ) -> AnalyzerResult<Self> {
        Self::connect_remote_with(build_http_client()?, target, config).await
    }

    /// [`Analyzer::connect_remote`] with a caller-provided HTTP client.
    pub async fn connect_remote_with(
        http: Client,
        target: RemoteTarget,
        config: &AnalyzerConfig,
    ) -> AnalyzerResult<Self> {
        target.validate()?;
        let base_url = base_url(&target.host, target.port)?;

        if config.verify_remote {
            ping_once(&HttpProbe::new(http.clone(), &base_url)?).await?;
        }

        debug!(url = %base_url, "Attached to remote analyzer");
        Ok(Self {
            http,
            base_url,
            api_key: target.api_key,
            context_in_body: config.context_in_body,
            request_timeout: config.request_timeout(),
            stop_grace: config.stop_grace(),
            server: None,
        })
    }

    pub const fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Whether this analyzer owns a locally spawned server.
    pub const fn is_local(&self) -> bool {
        self.server.is_some()
    }

    /// Process id of the owned server, if any.
    pub fn pid(&self) -> Option<u32> {
        self.server.as_ref().and_then(|s| s.process.pid())
    }

    pub const fn context_in_body(&self) -> bool {
        self.context_in_body
    }

    /// Switch body-embedded context on or off for subsequent calls.
    pub const fn set_context_in_body(&mut self, enabled: bool) {
        self.context_in_body = enabled;
    }

    /// Analyze an encoded image file.
    pub async fn analyze_file(
        &self,
        path: impl AsRef<Path>,
        kind: ResultKind,
        data: Option<&str>,
    ) -> AnalyzerResult<AnalysisResult> {
        let payload = ImagePayload::File(path.as_ref().to_path_buf());
        self.analyze(self.request(payload, kind, data)).await
    }

    /// Analyze an encoded image held in memory (PNG, JPEG, ...).
    pub async fn analyze_image(
        &self,
        image: impl Into<Bytes>,
        kind: ResultKind,
        data: Option<&str>,
    ) -> AnalyzerResult<AnalysisResult> {
        let payload = ImagePayload::Encoded(image.into());
        self.analyze(self.request(payload, kind, data)).await
    }

    /// Analyze a raw RGB buffer of `width * height * 3` bytes.
    pub async fn analyze_raw(
        &self,
        pixels: impl Into<Bytes>,
        width: u32,
        height: u32,
        kind: ResultKind,
        data: Option<&str>,
    ) -> AnalyzerResult<AnalysisResult> {
        let payload = ImagePayload::Raw {
            pixels: pixels.into(),
            width,
            height,
        };
        self.analyze(self.request(payload, kind, data)).await
    }

    fn request(&self, payload: ImagePayload, kind: ResultKind, data: Option<&str>) -> AnalysisRequest {
        AnalysisRequest::new(payload, kind)
            .with_data(data)
            .with_context_in_body(self.context_in_body)
    }

    /// Send a fully described request.
    ///
    /// Failures are per call; the analyzer stays usable afterwards.
    pub async fn analyze(&self, request: AnalysisRequest) -> AnalyzerResult<AnalysisResult> {
        request.validate()?;
        let url = encode_url(&self.base_url, self.api_key.as_deref(), &request)?;
        let body = load_body(&request.payload).await?;

        debug!(
            path = %url.path(),
            kind = %request.kind,
            bytes = body.len(),
            "Sending analysis request"
        );

        let mut builder = self
            .http
            .post(url)
            .header(CONTENT_TYPE, OCTET_STREAM)
            .body(body);
        if let Some(limit) = self.request_timeout {
            builder = builder.timeout(limit);
        }

        let response = builder.send().await.map_err(|e| transport_error(&e))?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await.map_err(|e| {
            AnalyzerError::Protocol(format!("Failed to read response body: {e}"))
        })?;

        decode(request.kind, request.context_in_body, status, &headers, body)
    }

    /// Ping the server once with the analyzer's own client.
    pub async fn ping(&self) -> AnalyzerResult<()> {
        ping_once(&HttpProbe::new(self.http.clone(), &self.base_url)?).await
    }

    /// Stop the owned server, if any, and wait for it to exit.
    ///
    /// The stop request is fire-and-forget; completion is observed through
    /// the process exit. A server still running after the stop grace period
    /// is killed. Remote analyzers return immediately without any request.
    pub async fn shutdown(mut self) -> Option<ProcessExit> {
        let OwnedServer {
            stop_key,
            mut process,
        } = self.server.take()?;

        match self.base_url.join(STOP_PATH) {
            Ok(mut url) => {
                url.query_pairs_mut()
                    .append_pair("key", &stop_key.to_string());
                let http = self.http.clone();
                tokio::spawn(async move {
                    if let Err(e) = http.get(url).send().await {
                        debug!(error = %e, "Stop request failed");
                    }
                });
            }
            Err(e) => warn!(error = %e, "Cannot build stop URL"),
        }

        let exit = if let Ok(exit) = timeout(self.stop_grace, process.wait()).await {
            exit
        } else {
            warn!(
                pid = ?process.pid(),
                grace = ?self.stop_grace,
                "Server ignored stop request, terminating"
            );
            process.terminate().await
        };

        info!(code = ?exit.code, "Local analyzer stopped");
        Some(exit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn remote_analyzer_owns_no_process() {
        let target = RemoteTarget::new("127.0.0.1", 8100, Some("key".into()));
        let analyzer = Analyzer::connect_remote(target, &AnalyzerConfig::default())
            .await
            .unwrap();

        assert!(!analyzer.is_local());
        assert_eq!(analyzer.pid(), None);
        assert_eq!(analyzer.base_url().as_str(), "http://127.0.0.1:8100/");
        assert!(analyzer.shutdown().await.is_none());
    }

    #[tokio::test]
    async fn context_in_body_follows_config_and_toggle() {
        let config = AnalyzerConfig::default().with_context_in_body(true);
        let mut analyzer = Analyzer::connect_remote(RemoteTarget::new("localhost", 8100, None), &config)
            .await
            .unwrap();
        assert!(analyzer.context_in_body());

        analyzer.set_context_in_body(false);
        let request = analyzer.request(
            ImagePayload::Encoded(Bytes::from_static(b"img")),
            ResultKind::Heatmap,
            Some("d"),
        );
        assert!(!request.context_in_body);
        assert_eq!(request.data.as_deref(), Some("d"));
    }

    #[tokio::test]
    async fn invalid_remote_target_is_rejected() {
        let err = Analyzer::connect_remote(RemoteTarget::new(" ", 8100, None), &AnalyzerConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AnalyzerError::Configuration(_)));
    }

    #[tokio::test]
    async fn local_start_rejects_empty_project_before_spawning() {
        let launch = LocalLaunch::new("").with_dist_path("/opt/pekat");
        let err = Analyzer::start_local(launch, &AnalyzerConfig::default())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Project path"));
    }

    #[tokio::test]
    async fn raw_buffer_mismatch_fails_without_network() {
        // Nothing listens on this port; validation must fail first
        let analyzer = Analyzer::connect_remote(
            RemoteTarget::new("127.0.0.1", 9, None),
            &AnalyzerConfig::default(),
        )
        .await
        .unwrap();

        let err = analyzer
            .analyze_raw(vec![0u8; 10], 2, 2, ResultKind::Context, None)
            .await
            .unwrap_err();
        assert!(matches!(err, AnalyzerError::Configuration(_)));
    }
}
