//! Server distribution lookup and executable validation.
//!
//! A distribution directory contains `pekat_vision/pekat_vision` (with `.exe`
//! on Windows). On Windows the distribution can be omitted and is then looked
//! up under `%ProgramFiles%`.

use pekat_core::{AnalyzerError, AnalyzerResult};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Directory and file stem of the server executable inside a distribution.
pub const SERVER_EXECUTABLE_NAME: &str = "pekat_vision";

/// Installation directories are recognized by this fragment of their name.
pub const PRODUCT_DIR_MARKER: &str = "PEKAT VISION";

/// Path of the server executable inside a distribution directory.
pub fn server_executable(dist_path: &Path) -> PathBuf {
    dist_path
        .join(SERVER_EXECUTABLE_NAME)
        .join(format!("{SERVER_EXECUTABLE_NAME}{}", std::env::consts::EXE_SUFFIX))
}

/// Resolve the distribution directory, detecting it when not given.
pub fn resolve_dist_path(explicit: Option<&Path>) -> AnalyzerResult<PathBuf> {
    match explicit {
        Some(path) if path.as_os_str().is_empty() => Err(AnalyzerError::configuration(
            "Distribution path must not be empty",
        )),
        Some(path) => Ok(path.to_path_buf()),
        None => default_dist_path(),
    }
}

/// Locate and validate the server executable of a distribution.
pub fn locate_server(explicit_dist: Option<&Path>) -> AnalyzerResult<PathBuf> {
    let dist = resolve_dist_path(explicit_dist)?;
    validate_executable(&server_executable(&dist))
}

/// Check that a file exists and can be executed.
pub fn validate_executable(path: &Path) -> AnalyzerResult<PathBuf> {
    if !path.is_file() {
        return Err(AnalyzerError::Configuration(format!(
            "Server executable not found at: {}",
            path.display()
        )));
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let metadata = std::fs::metadata(path)?;
        if metadata.permissions().mode() & 0o111 == 0 {
            return Err(AnalyzerError::Configuration(format!(
                "Server executable is not executable: {}",
                path.display()
            )));
        }
    }

    debug!(path = %path.display(), "Using server executable");
    Ok(path.to_path_buf())
}

/// First directory under `root` whose name contains [`PRODUCT_DIR_MARKER`].
///
/// Entries are sorted so the result does not depend on directory order.
#[cfg_attr(not(windows), allow(dead_code))]
pub(crate) fn find_product_dir(root: &Path) -> Option<PathBuf> {
    let mut candidates: Vec<PathBuf> = std::fs::read_dir(root)
        .ok()?
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| {
            path.is_dir()
                && path
                    .file_name()
                    .and_then(|name| name.to_str())
                    .is_some_and(|name| name.contains(PRODUCT_DIR_MARKER))
        })
        .collect();

    candidates.sort();
    candidates.into_iter().next()
}

#[cfg(windows)]
fn default_dist_path() -> AnalyzerResult<PathBuf> {
    use std::sync::OnceLock;

    // Only successful lookups are cached
    static DETECTED: OnceLock<PathBuf> = OnceLock::new();
    if let Some(path) = DETECTED.get() {
        return Ok(path.clone());
    }

    let root = std::env::var_os("ProgramFiles")
        .map(PathBuf::from)
        .ok_or_else(|| AnalyzerError::configuration("ProgramFiles is not set"))?;
    let found = find_product_dir(&root).ok_or_else(|| {
        AnalyzerError::Configuration(format!(
            "Unable to detect default distribution path under {}",
            root.display()
        ))
    })?;

    debug!(path = %found.display(), "Detected server distribution");
    Ok(DETECTED.get_or_init(|| found).clone())
}

#[cfg(not(windows))]
fn default_dist_path() -> AnalyzerResult<PathBuf> {
    Err(AnalyzerError::configuration(
        "Distribution path must be provided on this platform",
    ))
}
