//! Resolution of version descriptors to concrete versions

use crate::error::BazeliskResult;
use crate::versions::catalog::{nth_most_recent, VersionCatalog};
use crate::versions::spec::{expand_home, Alias, VersionDescriptor, VersionForm};
use std::path::PathBuf;
use tracing::info;

/// Identifier reported for binaries whose version cannot be known
pub const UNKNOWN_VERSION: &str = "unknown";

/// Where the artifact for a resolved version comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArtifactSource {
    /// A published release or release candidate
    Release,
    /// A commit-indexed build from the CI archive
    UnreleasedCommit,
    /// Built locally from a source checkout
    SourceBuild,
    /// A binary already on disk, used as-is
    LocalPath(PathBuf),
}

/// Outcome of resolving a [`VersionDescriptor`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedVersion {
    pub fork: String,
    /// Release tag, commit hash, or [`UNKNOWN_VERSION`]
    pub identifier: String,
    pub source: ArtifactSource,
}

impl ResolvedVersion {
    pub fn is_source_build(&self) -> bool {
        self.source == ArtifactSource::SourceBuild
    }

    /// The release tag, when this resolved to a release
    pub fn release_version(&self) -> Option<&str> {
        match self.source {
            ArtifactSource::Release => Some(&self.identifier),
            _ => None,
        }
    }
}

/// Turns descriptors into concrete versions using the catalog
#[derive(Clone)]
pub struct VersionResolver {
    catalog: VersionCatalog,
}

impl VersionResolver {
    pub fn new(catalog: VersionCatalog) -> Self {
        Self { catalog }
    }

    pub fn catalog(&self) -> &VersionCatalog {
        &self.catalog
    }

    /// Resolve `descriptor`; only `latest*` and alias forms touch the network
    pub async fn resolve(&self, descriptor: &VersionDescriptor) -> BazeliskResult<ResolvedVersion> {
        let fork = descriptor.fork.clone();

        let resolved = match &descriptor.form {
            VersionForm::LocalPath(path) => ResolvedVersion {
                fork,
                identifier: UNKNOWN_VERSION.to_string(),
                source: ArtifactSource::LocalPath(expand_home(path)),
            },
            VersionForm::SourceCommit(commit) => ResolvedVersion {
                fork,
                identifier: commit.clone(),
                source: ArtifactSource::SourceBuild,
            },
            VersionForm::NamedAlias(alias @ (Alias::LastGreen | Alias::LastDownstreamGreen)) => {
                let commit = self.catalog.last_green_commit(*alias).await?;
                info!("Using unreleased version at commit {}", commit);
                ResolvedVersion {
                    fork,
                    identifier: commit,
                    source: ArtifactSource::UnreleasedCommit,
                }
            }
            VersionForm::NamedAlias(Alias::LastRc) => ResolvedVersion {
                fork,
                identifier: self.catalog.latest_release_candidate().await?,
                source: ArtifactSource::Release,
            },
            VersionForm::LatestOffset(offset) => {
                let tags = self.catalog.release_tags(&fork).await?;
                ResolvedVersion {
                    identifier: nth_most_recent(&tags, *offset)?,
                    fork,
                    source: ArtifactSource::Release,
                }
            }
            VersionForm::Literal(tag) => ResolvedVersion {
                fork,
                identifier: tag.clone(),
                source: ArtifactSource::Release,
            },
        };

        Ok(resolved)
    }
}
