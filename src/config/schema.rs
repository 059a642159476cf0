//! Configuration schema for Bazelisk
//!
//! Configuration is stored at `~/.config/bazelisk/config.toml`. Every field
//! can be overridden from the environment, see [`Config::apply_env`].

use serde::Deserialize;
use std::path::PathBuf;

/// Desired-version override
pub const ENV_VERSION: &str = "USE_BAZEL_VERSION";
/// Cache home override
pub const ENV_HOME: &str = "BAZELISK_HOME";
/// Base URL override for distribution and source endpoints
pub const ENV_BASE_URL: &str = "BAZELISK_BASE_URL";
/// Auth token for GitHub metadata and issue queries
pub const ENV_GITHUB_TOKEN: &str = "BAZELISK_GITHUB_TOKEN";
/// Run `shutdown` before each migration trial
pub const ENV_SHUTDOWN: &str = "BAZELISK_SHUTDOWN";
/// Run `clean --expunge` before each migration trial
pub const ENV_CLEAN: &str = "BAZELISK_CLEAN";
/// Set on every delegated child; prevents wrapper re-entry
pub const ENV_SKIP_WRAPPER: &str = "BAZELISK_SKIP_WRAPPER";

/// Root configuration structure
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Version specification to use instead of `.bazelversion`
    pub version: Option<String>,

    /// Cache home; defaults to `<user cache dir>/bazelisk`
    pub home: Option<PathBuf>,

    /// Replaces the host and path prefix of every download URL
    pub base_url: Option<String>,

    /// Token sent to the GitHub API
    pub github_token: Option<String>,

    /// Shut the server down before each migration trial
    pub shutdown: bool,

    /// Expunge the output base before each migration trial
    pub clean: bool,

    /// Never delegate to a project-local wrapper
    pub skip_wrapper: bool,

    /// Log format: "text" or "json"
    pub log_format: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: None,
            home: None,
            base_url: None,
            github_token: None,
            shutdown: false,
            clean: false,
            skip_wrapper: false,
            log_format: "text".to_string(),
        }
    }
}

impl Config {
    /// Overlay environment values on top of this configuration.
    ///
    /// `lookup` returns the value of a variable, or `None` when unset. Empty
    /// strings count as unset, and boolean toggles are on for any non-empty
    /// value.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.is_empty());

        if let Some(v) = get(ENV_VERSION) {
            self.version = Some(v);
        }
        if let Some(v) = get(ENV_HOME) {
            self.home = Some(PathBuf::from(v));
        }
        if let Some(v) = get(ENV_BASE_URL) {
            self.base_url = Some(v);
        }
        if let Some(v) = get(ENV_GITHUB_TOKEN) {
            self.github_token = Some(v);
        }
        if get(ENV_SHUTDOWN).is_some() {
            self.shutdown = true;
        }
        if get(ENV_CLEAN).is_some() {
            self.clean = true;
        }
        if get(ENV_SKIP_WRAPPER).is_some() {
            self.skip_wrapper = true;
        }
    }

    /// Base URL override with any trailing slash removed
    pub fn base_url(&self) -> Option<&str> {
        self.base_url
            .as_deref()
            .map(|u| u.trim_end_matches('/'))
            .filter(|u| !u.is_empty())
    }
}
