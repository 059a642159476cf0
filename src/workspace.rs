//! Workspace discovery
//!
//! The workspace root is the nearest ancestor holding a `WORKSPACE` or
//! `WORKSPACE.bazel` file. It pins the version through `.bazelversion` and
//! may carry a wrapper script at `tools/bazel`.

use crate::config::Config;
use crate::error::{BazeliskError, BazeliskResult};
use std::path::{Path, PathBuf};
use tracing::debug;

const WORKSPACE_FILES: &[&str] = &["WORKSPACE", "WORKSPACE.bazel"];
const VERSION_FILE: &str = ".bazelversion";

/// Version used when nothing else pins one
pub const DEFAULT_VERSION: &str = "latest";

/// Find the workspace root at or above `start`
pub fn find_workspace_root(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .find(|dir| WORKSPACE_FILES.iter().any(|f| dir.join(f).is_file()))
        .map(Path::to_path_buf)
}

/// Determine the raw version specification to use.
///
/// Order: the configured override, then the first line of the workspace's
/// `.bazelversion`, then [`DEFAULT_VERSION`].
pub fn requested_version(config: &Config, cwd: &Path) -> BazeliskResult<String> {
    if let Some(version) = config.version.as_deref().filter(|v| !v.trim().is_empty()) {
        debug!("Using version override {}", version);
        return Ok(version.trim().to_string());
    }

    if let Some(root) = find_workspace_root(cwd) {
        let path = root.join(VERSION_FILE);
        if path.is_file() {
            let content = std::fs::read_to_string(&path)
                .map_err(|e| BazeliskError::io(format!("reading {}", path.display()), e))?;
            let version = content.lines().next().unwrap_or("").trim();
            if !version.is_empty() {
                debug!("Using version {} from {}", version, path.display());
                return Ok(version.to_string());
            }
        }
    }

    Ok(DEFAULT_VERSION.to_string())
}
