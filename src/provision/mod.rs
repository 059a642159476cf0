//! Turning resolved versions into runnable binaries
//!
//! Releases and commit-indexed builds are downloaded into
//! `bin/<fork>/<filename>`; source commits are built by
//! [`SourceBuildPipeline`]; local paths are used as they are.

pub mod download;
pub mod platform;
pub mod source;

pub use download::download_executable;
pub use platform::{Arch, Os, Platform};
pub use source::{source_url, SourceBuildPipeline};

use crate::config::Config;
use crate::error::BazeliskResult;
use crate::http::HttpClient;
use crate::versions::{
    ArtifactSource, ResolvedVersion, VersionDescriptor, VersionForm, VersionResolver,
    UPSTREAM_FORK,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

const RELEASES_BASE_URL: &str = "https://releases.bazel.build";
const COMMIT_ARTIFACTS_BASE_URL: &str = "https://storage.googleapis.com/bazel-builds/artifacts";

/// Where to download the artifact named `filename` for `version` from.
///
/// `is_commit` selects the commit-indexed CI archive. A configured
/// `base_url` replaces the host and path prefix in every case.
pub fn distribution_url(
    fork: &str,
    version: &str,
    is_commit: bool,
    filename: &str,
    base_url: Option<&str>,
    platform: &Platform,
) -> String {
    if is_commit {
        return format!(
            "{}/{}/{}/bazel",
            base_url.unwrap_or(COMMIT_ARTIFACTS_BASE_URL),
            platform.ci_name(),
            version
        );
    }

    let (version, kind) = match version.split_once("rc") {
        Some((base, candidate)) => (base, format!("rc{}", candidate)),
        None => (version, "release".to_string()),
    };

    if let Some(base) = base_url {
        return format!("{}/{}/{}", base, version, filename);
    }

    if fork == UPSTREAM_FORK {
        format!("{}/{}/{}/{}", RELEASES_BASE_URL, version, kind, filename)
    } else {
        format!(
            "https://github.com/{}/bazel/releases/download/{}/{}",
            fork, version, filename
        )
    }
}

/// Provides a local binary for any [`ResolvedVersion`]
pub struct ArtifactProvisioner {
    home: PathBuf,
    base_url: Option<String>,
    platform: Platform,
    client: Arc<dyn HttpClient>,
    resolver: VersionResolver,
}

impl ArtifactProvisioner {
    /// `resolver` is also used to find the release that bootstraps source
    /// builds
    pub fn new(
        home: impl Into<PathBuf>,
        config: &Config,
        platform: Platform,
        resolver: VersionResolver,
    ) -> Self {
        Self {
            home: home.into(),
            base_url: config.base_url().map(str::to_string),
            platform,
            client: resolver.catalog().cache().client().clone(),
            resolver,
        }
    }

    /// Return the path of a runnable binary for `resolved`
    pub async fn provision(&self, resolved: &ResolvedVersion) -> BazeliskResult<PathBuf> {
        match &resolved.source {
            ArtifactSource::LocalPath(path) => Ok(path.clone()),
            ArtifactSource::SourceBuild if self.base_url.is_none() => {
                let pipeline = SourceBuildPipeline::new(&self.home, None);
                pipeline
                    .ensure_built(&resolved.fork, &resolved.identifier, move || self.bootstrap())
                    .await
            }
            ArtifactSource::SourceBuild | ArtifactSource::UnreleasedCommit => {
                self.download(resolved, true).await
            }
            ArtifactSource::Release => self.download(resolved, false).await,
        }
    }

    async fn download(
        &self,
        resolved: &ResolvedVersion,
        is_commit: bool,
    ) -> BazeliskResult<PathBuf> {
        let filename = self.platform.binary_filename(&resolved.identifier);
        let url = distribution_url(
            &resolved.fork,
            &resolved.identifier,
            is_commit,
            &filename,
            self.base_url.as_deref(),
            &self.platform,
        );
        let dir = self.home.join("bin").join(&resolved.fork);
        download_executable(self.client.as_ref(), &url, &dir, &filename).await
    }

    /// The latest upstream release, used to build other commits
    async fn bootstrap(&self) -> BazeliskResult<PathBuf> {
        let latest = VersionDescriptor {
            fork: UPSTREAM_FORK.to_string(),
            form: VersionForm::LatestOffset(0),
        };
        let resolved = self.resolver.resolve(&latest).await?;
        info!("Bootstrapping source build with Bazel {}", resolved.identifier);
        self.download(&resolved, false).await
    }
}
