//! Building Bazel from a source checkout
//!
//! One checkout per fork lives under `checkouts/<fork>` and is moved between
//! commits instead of being cloned again. Built binaries are cached per
//! commit under `bin/<fork>/bazel-<commit>` and never rebuilt. Neither
//! location is locked; concurrent runs may redo the same work.

use crate::error::{BazeliskError, BazeliskResult};
use crate::provision::download::make_executable;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info};

const DEFAULT_SOURCE_BASE: &str = "ssh://git@github.com";

/// Git remote for `fork`
pub fn source_url(base_url: Option<&str>, fork: &str) -> String {
    format!(
        "{}/{}/bazel.git",
        base_url.unwrap_or(DEFAULT_SOURCE_BASE),
        fork
    )
}

/// Checks out and builds Bazel at a given commit
pub struct SourceBuildPipeline {
    home: PathBuf,
    base_url: Option<String>,
}

impl SourceBuildPipeline {
    pub fn new(home: impl Into<PathBuf>, base_url: Option<String>) -> Self {
        Self {
            home: home.into(),
            base_url,
        }
    }

    /// Cached binary path for `fork` at `commit`
    pub fn binary_path(&self, fork: &str, commit: &str) -> PathBuf {
        self.home
            .join("bin")
            .join(fork)
            .join(format!("bazel-{}", commit))
    }

    /// Persistent checkout directory for `fork`
    pub fn checkout_path(&self, fork: &str) -> PathBuf {
        self.home.join("checkouts").join(fork)
    }

    /// Return the binary for `fork` at `commit`, building it when missing.
    ///
    /// `bootstrap` yields the Bazel used to run the build and is only invoked
    /// when a build is actually needed.
    pub async fn ensure_built<F, Fut>(
        &self,
        fork: &str,
        commit: &str,
        bootstrap: F,
    ) -> BazeliskResult<PathBuf>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = BazeliskResult<PathBuf>>,
    {
        let binary = self.binary_path(fork, commit);
        if binary.exists() {
            debug!("Using cached source build {}", binary.display());
            return Ok(binary);
        }

        let checkout = self.checkout_path(fork);
        self.checkout(&checkout, fork, commit).await?;

        let bootstrap = bootstrap().await?;
        build(&bootstrap, &checkout, &binary).await?;
        Ok(binary)
    }

    /// Make `checkout` a working copy of `fork` at `commit`
    async fn checkout(&self, checkout: &Path, fork: &str, commit: &str) -> BazeliskResult<()> {
        if !checkout.join(".git").exists() {
            self.clone_into(checkout, fork, commit).await?;
        }

        let head = run_or_fail(
            checkout,
            "reading the current revision",
            "git",
            &["rev-list", "HEAD", "-n", "1"],
        )
        .await?;
        let head = head.trim();

        if head != commit {
            info!("Updating sources from {} to {}", head, commit);
            run_or_fail(checkout, "fetching the new revision", "git", &["fetch", "origin", commit])
                .await?;
            run_or_fail(
                checkout,
                "checking out the new revision",
                "git",
                &["reset", "--hard", commit],
            )
            .await?;
        }
        Ok(())
    }

    /// Minimal fetch of a single commit into a fresh directory, moved into
    /// place once complete
    async fn clone_into(&self, checkout: &Path, fork: &str, commit: &str) -> BazeliskResult<()> {
        let parent = checkout.parent().ok_or_else(|| {
            BazeliskError::Internal(format!("{} has no parent", checkout.display()))
        })?;
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| BazeliskError::io(format!("creating {}", parent.display()), e))?;

        let staging = tempfile::Builder::new()
            .prefix(fork)
            .tempdir_in(parent)
            .map_err(|e| BazeliskError::io("creating a temporary checkout directory", e))?;

        let remote = source_url(self.base_url.as_deref(), fork);
        info!(
            "Downloading Bazel sources from {}, this will take a few minutes",
            remote
        );

        let dir = staging.path();
        run_or_fail(dir, "initializing the repository", "git", &["init"]).await?;
        run_or_fail(
            dir,
            "setting up the remote",
            "git",
            &["remote", "add", "origin", &remote],
        )
        .await?;
        run_or_fail(dir, "fetching the initial revision", "git", &["fetch", "origin", commit])
            .await?;
        run_or_fail(
            dir,
            "checking out the initial revision",
            "git",
            &["checkout", commit],
        )
        .await?;

        tokio::fs::rename(dir, checkout).await.map_err(|e| {
            BazeliskError::io(
                format!("moving {} to {}", dir.display(), checkout.display()),
                e,
            )
        })?;
        info!("Checkout of {}/commit/{} done", fork, commit);
        Ok(())
    }
}

/// Build `//src:bazel` in `checkout` with `bootstrap` and install the result
/// at `output`
async fn build(bootstrap: &Path, checkout: &Path, output: &Path) -> BazeliskResult<()> {
    info!("Building Bazel in {}", checkout.display());
    let program = bootstrap.to_string_lossy();
    run_or_fail(
        checkout,
        "building bazel",
        &program,
        &["build", "//src:bazel", "--compilation_mode=opt"],
    )
    .await?;

    if let Some(parent) = output.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| BazeliskError::io(format!("creating {}", parent.display()), e))?;
    }

    let artifact = checkout.join("bazel-bin").join("src").join("bazel");
    tokio::fs::copy(&artifact, output).await.map_err(|e| {
        BazeliskError::io(
            format!("copying {} to {}", artifact.display(), output.display()),
            e,
        )
    })?;
    make_executable(output)
        .map_err(|e| BazeliskError::io(format!("marking {} executable", output.display()), e))?;
    Ok(())
}

/// Run `program` in `cwd`, returning stdout. A non-zero exit fails with the
/// combined output.
async fn run_or_fail(
    cwd: &Path,
    step: &str,
    program: &str,
    args: &[&str],
) -> BazeliskResult<String> {
    debug!("Executing in {}: {} {:?}", cwd.display(), program, args);

    let output = Command::new(program)
        .args(args)
        .current_dir(cwd)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await
        .map_err(|e| {
            BazeliskError::command_failed(format!("{} {}", program, args.join(" ")), e)
        })?;

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    if output.status.success() {
        Ok(stdout)
    } else {
        let stderr = String::from_utf8_lossy(&output.stderr);
        Err(BazeliskError::source_build(step, format!("{}{}", stdout, stderr)))
    }
}
