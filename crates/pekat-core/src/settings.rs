//! Analyzer configuration types and validation.
//!
//! Pure data with serde support; the runtime turns these into processes and
//! HTTP clients.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{AnalyzerError, AnalyzerResult};

/// Host a locally spawned server listens on.
pub const DEFAULT_HOST: &str = "localhost";

/// First port scanned when looking for a free port pair.
pub const DEFAULT_PORT_RANGE_START: u16 = 10000;

/// End of the scanned port range (exclusive).
pub const DEFAULT_PORT_RANGE_END: u16 = 30000;

/// How long `shutdown` waits for the server to exit before killing it.
pub const DEFAULT_STOP_GRACE_SECS: u64 = 30;

/// Settings shared by local and remote analyzers.
///
/// All fields have defaults, so partial TOML/JSON documents deserialize.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AnalyzerConfig {
    /// Host passed to a locally spawned server and used to reach it.
    pub host: String,

    /// First port of the free-port scan (inclusive).
    pub port_range_start: u16,

    /// End of the free-port scan (exclusive).
    pub port_range_end: u16,

    /// Ask the server to embed context in the response body.
    pub context_in_body: bool,

    /// Upper bound on waiting for a local server to become ready.
    /// `None` waits for as long as the process stays alive.
    pub startup_timeout_secs: Option<u64>,

    /// Per-request timeout for analyze calls.
    pub request_timeout_secs: Option<u64>,

    /// Grace period between the stop request and a forced kill.
    pub stop_grace_secs: u64,

    /// Ping a remote server once on attach and fail if it does not answer.
    pub verify_remote: bool,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port_range_start: DEFAULT_PORT_RANGE_START,
            port_range_end: DEFAULT_PORT_RANGE_END,
            context_in_body: false,
            startup_timeout_secs: None,
            request_timeout_secs: None,
            stop_grace_secs: DEFAULT_STOP_GRACE_SECS,
            verify_remote: false,
        }
    }
}

impl AnalyzerConfig {
    /// Create config from environment variables, falling back to defaults.
    ///
    /// Reads `PEKAT_HOST`, `PEKAT_CONTEXT_IN_BODY`, `PEKAT_STARTUP_TIMEOUT_SECS`,
    /// `PEKAT_REQUEST_TIMEOUT_SECS` and `PEKAT_STOP_GRACE_SECS`.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`AnalyzerConfig::from_env`] with an explicit variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let parse_secs = |key: &str| lookup(key).and_then(|s| s.trim().parse::<u64>().ok());

        Self {
            host: lookup("PEKAT_HOST")
                .filter(|h| !h.trim().is_empty())
                .unwrap_or(defaults.host),
            context_in_body: lookup("PEKAT_CONTEXT_IN_BODY")
                .is_some_and(|v| parse_flag(&v)),
            startup_timeout_secs: parse_secs("PEKAT_STARTUP_TIMEOUT_SECS"),
            request_timeout_secs: parse_secs("PEKAT_REQUEST_TIMEOUT_SECS"),
            stop_grace_secs: parse_secs("PEKAT_STOP_GRACE_SECS").unwrap_or(defaults.stop_grace_secs),
            ..defaults
        }
    }

    #[must_use]
    pub const fn with_context_in_body(mut self, enabled: bool) -> Self {
        self.context_in_body = enabled;
        self
    }

    #[must_use]
    pub const fn with_port_range(mut self, start: u16, end: u16) -> Self {
        self.port_range_start = start;
        self.port_range_end = end;
        self
    }

    #[must_use]
    pub const fn with_startup_timeout(mut self, secs: u64) -> Self {
        self.startup_timeout_secs = Some(secs);
        self
    }

    #[must_use]
    pub const fn with_verify_remote(mut self, enabled: bool) -> Self {
        self.verify_remote = enabled;
        self
    }

    pub const fn startup_timeout(&self) -> Option<Duration> {
        match self.startup_timeout_secs {
            Some(secs) => Some(Duration::from_secs(secs)),
            None => None,
        }
    }

    pub const fn request_timeout(&self) -> Option<Duration> {
        match self.request_timeout_secs {
            Some(secs) => Some(Duration::from_secs(secs)),
            None => None,
        }
    }

    pub const fn stop_grace(&self) -> Duration {
        Duration::from_secs(self.stop_grace_secs)
    }

    /// Reject settings that can never work.
    pub fn validate(&self) -> AnalyzerResult<()> {
        if self.host.trim().is_empty() {
            return Err(AnalyzerError::configuration("Host must not be empty"));
        }
        // Two ports are needed, so the range must span at least two.
        if u32::from(self.port_range_end) < u32::from(self.port_range_start) + 2 {
            return Err(AnalyzerError::Configuration(format!(
                "Port range {}-{} cannot hold two consecutive ports",
                self.port_range_start, self.port_range_end
            )));
        }
        if self.startup_timeout_secs == Some(0) {
            return Err(AnalyzerError::configuration(
                "Startup timeout must be positive when set",
            ));
        }
        Ok(())
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

fn normalize_api_key(api_key: Option<String>) -> Option<String> {
    api_key.filter(|key| !key.trim().is_empty())
}

/// Parameters for running the server as a local subprocess.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LocalLaunch {
    /// Server distribution directory. `None` triggers platform detection.
    pub dist_path: Option<PathBuf>,

    /// Project (data) directory the server loads.
    pub project_path: PathBuf,

    /// API key the server will require on every analyze call.
    pub api_key: Option<String>,

    /// Extra command-line options appended after the generated ones.
    pub extra_options: Option<String>,
}

impl LocalLaunch {
    pub fn new(project_path: impl Into<PathBuf>) -> Self {
        Self {
            project_path: project_path.into(),
            ..Self::default()
        }
    }

    /// Same as [`LocalLaunch::new`], with the distribution path taken from
    /// `PEKAT_DIST_PATH` when set.
    pub fn from_env(project_path: impl Into<PathBuf>) -> Self {
        Self {
            dist_path: std::env::var_os("PEKAT_DIST_PATH").map(PathBuf::from),
            ..Self::new(project_path)
        }
    }

    #[must_use]
    pub fn with_dist_path(mut self, dist_path: impl Into<PathBuf>) -> Self {
        self.dist_path = Some(dist_path.into());
        self
    }

    #[must_use]
    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = normalize_api_key(api_key);
        self
    }

    #[must_use]
    pub fn with_extra_options(mut self, options: Option<String>) -> Self {
        self.extra_options = options.filter(|o| !o.trim().is_empty());
        self
    }

    /// Reject empty paths before anything is spawned.
    pub fn validate(&self) -> AnalyzerResult<()> {
        if let Some(dist) = &self.dist_path {
            if dist.to_string_lossy().trim().is_empty() {
                return Err(AnalyzerError::configuration(
                    "Distribution path must not be empty",
                ));
            }
        }
        if self.project_path.to_string_lossy().trim().is_empty() {
            return Err(AnalyzerError::configuration("Project path must not be empty"));
        }
        Ok(())
    }

    /// API key with blank values treated as absent.
    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref().filter(|key| !key.trim().is_empty())
    }
}

/// An already running server to attach to.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RemoteTarget {
    pub host: String,
    pub port: u16,
    pub api_key: Option<String>,
}

impl RemoteTarget {
    pub fn new(host: impl Into<String>, port: u16, api_key: Option<String>) -> Self {
        Self {
            host: host.into(),
            port,
            api_key: normalize_api_key(api_key),
        }
    }

    pub fn validate(&self) -> AnalyzerResult<()> {
        if self.host.trim().is_empty() {
            return Err(AnalyzerError::configuration("Remote host must not be empty"));
        }
        if self.port == 0 {
            return Err(AnalyzerError::configuration("Remote port must not be 0"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn defaults_match_server_expectations() {
        let config = AnalyzerConfig::default();
        assert_eq!(config.host, "localhost");
        assert_eq!(config.port_range_start, 10000);
        assert_eq!(config.port_range_end, 30000);
        assert!(!config.context_in_body);
        assert_eq!(config.startup_timeout(), None);
        assert_eq!(config.stop_grace(), Duration::from_secs(30));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn from_lookup_reads_overrides() {
        let vars: HashMap<&str, &str> = [
            ("PEKAT_HOST", "127.0.0.1"),
            ("PEKAT_CONTEXT_IN_BODY", "true"),
            ("PEKAT_STARTUP_TIMEOUT_SECS", "45"),
            ("PEKAT_REQUEST_TIMEOUT_SECS", "not-a-number"),
        ]
        .into_iter()
        .collect();

        let config = AnalyzerConfig::from_lookup(|key| vars.get(key).map(ToString::to_string));
        assert_eq!(config.host, "127.0.0.1");
        assert!(config.context_in_body);
        assert_eq!(config.startup_timeout(), Some(Duration::from_secs(45)));
        assert_eq!(config.request_timeout(), None);
        assert_eq!(config.port_range_start, DEFAULT_PORT_RANGE_START);
    }

    #[test]
    fn from_lookup_with_nothing_set_is_default() {
        assert_eq!(AnalyzerConfig::from_lookup(|_| None), AnalyzerConfig::default());
    }

    #[test]
    fn partial_json_uses_defaults() {
        let config: AnalyzerConfig =
            serde_json::from_str(r#"{"context_in_body": true, "port_range_start": 20000}"#)
                .unwrap();
        assert!(config.context_in_body);
        assert_eq!(config.port_range_start, 20000);
        assert_eq!(config.port_range_end, DEFAULT_PORT_RANGE_END);
    }

    #[test]
    fn narrow_port_range_is_rejected() {
        let config = AnalyzerConfig::default().with_port_range(15000, 15001);
        assert!(matches!(
            config.validate(),
            Err(AnalyzerError::Configuration(_))
        ));
        assert!(AnalyzerConfig::default()
            .with_port_range(15000, 15002)
            .validate()
            .is_ok());
    }

    #[test]
    fn empty_project_path_is_rejected() {
        let err = LocalLaunch::new("  ").validate().unwrap_err();
        assert!(err.to_string().contains("Project path"));
    }

    #[test]
    fn empty_dist_path_is_rejected() {
        let err = LocalLaunch::new("/data/project")
            .with_dist_path("")
            .validate()
            .unwrap_err();
        assert!(err.to_string().contains("Distribution path"));
    }

    #[test]
    fn blank_api_keys_are_dropped() {
        let launch = LocalLaunch::new("/p").with_api_key(Some("   ".into()));
        assert_eq!(launch.api_key(), None);

        let target = RemoteTarget::new("host", 8000, Some(String::new()));
        assert_eq!(target.api_key, None);

        let target = RemoteTarget::new("host", 8000, Some("secret".into()));
        assert_eq!(target.api_key.as_deref(), Some("secret"));
    }

    #[test]
    fn remote_target_requires_host_and_port() {
        assert!(RemoteTarget::new("", 8000, None).validate().is_err());
        assert!(RemoteTarget::new("host", 0, None).validate().is_err());
        assert!(RemoteTarget::new("host", 8000, None).validate().is_ok());
    }
}
