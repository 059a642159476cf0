//! Top-level flow: pick a version, provision it, run it

use crate::cache::MetadataCache;
use crate::cli::args::Cli;
use crate::config::{Config, ConfigManager};
use crate::delegate::{Launcher, ProcessDelegate};
use crate::error::{BazeliskError, BazeliskResult};
use crate::http::{HttpClient, UreqClient};
use crate::migrate::{incompatible_flags, insert_args, sorted_names, MigrationEngine};
use crate::provision::{ArtifactProvisioner, Platform};
use crate::versions::{
    ArtifactSource, ResolvedVersion, VersionCatalog, VersionDescriptor, VersionResolver,
    UNKNOWN_VERSION,
};
use crate::workspace::requested_version;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

const MIGRATE_ARG: &str = "--migrate";
const STRICT_ARG: &str = "--strict";
const VERSION_ARG: &str = "version";
const GNU_FORMAT_ARG: &str = "--gnu_format";

/// Run Bazel for `cli` and return the exit code to report
pub async fn launch(cli: Cli, config: &Config) -> BazeliskResult<i32> {
    let cwd = std::env::current_dir()
        .map_err(|e| BazeliskError::io("getting current directory", e))?;
    let client: Arc<dyn HttpClient> = Arc::new(UreqClient::new());
    launch_with(cli.args, config, &cwd, client).await
}

async fn launch_with(
    mut args: Vec<String>,
    config: &Config,
    cwd: &Path,
    client: Arc<dyn HttpClient>,
) -> BazeliskResult<i32> {
    let home = ConfigManager::ensure_home(config).await?;
    let cache = MetadataCache::new(&home, client, config.github_token.clone());
    let resolver = VersionResolver::new(VersionCatalog::new(cache.clone()));

    let raw = requested_version(config, cwd)?;
    let descriptor = VersionDescriptor::parse(&raw)?;
    let resolved = resolver.resolve(&descriptor).await?;
    debug!("Resolved {} to {:?}", raw, resolved);

    let binary = binary_for(&resolved, &home, config, resolver).await?;
    let delegate = ProcessDelegate::new(&binary, config, cwd);

    let version = resolved.release_version().unwrap_or(UNKNOWN_VERSION);
    match args.first().map(String::as_str) {
        Some(MIGRATE_ARG) => {
            let flags = incompatible_flags(&cache, version).await?;
            info!("Checking {} incompatible flags", flags.len());
            let engine = MigrationEngine::new(&delegate, flags, config);
            return Ok(engine.run(&args[1..]).await?.exit_code());
        }
        Some(STRICT_ARG) => {
            let flags = incompatible_flags(&cache, version).await?;
            args = insert_args(&args[1..], &sorted_names(&flags));
        }
        _ => {}
    }

    if args.first().map(String::as_str) == Some(VERSION_ARG) {
        println!("{}", version_banner(&args));
    }

    delegate.run(&args).await
}

/// Local binaries skip platform detection entirely
async fn binary_for(
    resolved: &ResolvedVersion,
    home: &Path,
    config: &Config,
    resolver: VersionResolver,
) -> BazeliskResult<PathBuf> {
    if let ArtifactSource::LocalPath(path) = &resolved.source {
        return Ok(path.clone());
    }
    let platform = Platform::detect()?;
    debug!("Provisioning for {}", platform);
    let provisioner = ArtifactProvisioner::new(home, config, platform, resolver);
    provisioner.provision(resolved).await
}

fn version_banner(args: &[String]) -> String {
    let version = env!("CARGO_PKG_VERSION");
    if args.iter().any(|a| a == GNU_FORMAT_ARG) {
        format!("Bazelisk {}", version)
    } else {
        format!("Bazelisk version: {}", version)
    }
}
