//! Running the provisioned binary
//!
//! The child inherits all standard streams. While it runs, SIGINT and
//! SIGTERM are forwarded to it; on platforms without signals the child is
//! killed instead. A project-local wrapper at `<workspace>/tools/bazel` is
//! preferred over the binary unless the wrapper guard is set.

use crate::config::{Config, ENV_SKIP_WRAPPER};
use crate::error::{BazeliskError, BazeliskResult};
use crate::workspace::find_workspace_root;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use tokio::process::{Child, Command};
use tracing::debug;

/// Environment variable exposing the real binary to a wrapper
pub const ENV_BAZEL_REAL: &str = "BAZEL_REAL";

const WRAPPER_PATH: &str = "tools/bazel";

/// Something that runs Bazel with a set of arguments
#[async_trait]
pub trait Launcher: Send + Sync {
    /// Run with `args` and return the exit code
    async fn run(&self, args: &[String]) -> BazeliskResult<i32>;
}

/// Launches a binary, or the workspace wrapper in front of it
pub struct ProcessDelegate {
    binary: PathBuf,
    wrapper: Option<PathBuf>,
    skip_wrapper: bool,
}

impl ProcessDelegate {
    /// Delegate to `binary`, looking for a wrapper in the workspace around `cwd`
    pub fn new(binary: impl Into<PathBuf>, config: &Config, cwd: &Path) -> Self {
        Self {
            binary: binary.into(),
            wrapper: find_workspace_root(cwd).map(|root| root.join(WRAPPER_PATH)),
            skip_wrapper: config.skip_wrapper,
        }
    }

    /// The program that will actually be executed
    pub fn select_executable(&self) -> &Path {
        if self.skip_wrapper {
            return &self.binary;
        }
        match &self.wrapper {
            Some(wrapper) if is_executable(wrapper) => wrapper,
            _ => &self.binary,
        }
    }
}

#[async_trait]
impl Launcher for ProcessDelegate {
    async fn run(&self, args: &[String]) -> BazeliskResult<i32> {
        let program = self.select_executable();
        debug!("Executing {} {:?}", program.display(), args);

        let mut command = Command::new(program);
        command
            .args(args)
            .env(ENV_SKIP_WRAPPER, "true")
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());
        if program != self.binary {
            command.env(ENV_BAZEL_REAL, &self.binary);
        }

        let launch_error = |e| BazeliskError::Launch {
            path: program.to_path_buf(),
            source: e,
        };

        let mut child = command.spawn().map_err(launch_error)?;

        let status = tokio::select! {
            status = child.wait() => status,
            signal = next_signal() => {
                forward(&mut child, signal);
                child.wait().await
            }
        }
        .map_err(launch_error)?;

        Ok(exit_code(status))
    }
}

fn is_executable(path: &Path) -> bool {
    let Ok(metadata) = std::fs::metadata(path) else {
        return false;
    };
    if !metadata.is_file() {
        return false;
    }
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        metadata.permissions().mode() & 0o111 != 0
    }
    #[cfg(not(unix))]
    true
}

/// Resolves with the first termination signal received. Never resolves when
/// the handlers cannot be installed.
#[cfg(unix)]
async fn next_signal() -> i32 {
    use tokio::signal::unix::{signal, SignalKind};

    let (Ok(mut interrupt), Ok(mut terminate)) = (
        signal(SignalKind::interrupt()),
        signal(SignalKind::terminate()),
    ) else {
        debug!("Signal handlers unavailable, not forwarding signals");
        return std::future::pending().await;
    };

    tokio::select! {
        _ = interrupt.recv() => libc::SIGINT,
        _ = terminate.recv() => libc::SIGTERM,
    }
}

#[cfg(not(unix))]
async fn next_signal() -> i32 {
    if tokio::signal::ctrl_c().await.is_err() {
        return std::future::pending().await;
    }
    2
}

#[cfg(unix)]
fn forward(child: &mut Child, signal: i32) {
    if let Some(pid) = child.id() {
        debug!("Forwarding signal {} to {}", signal, pid);
        // SAFETY: kill(2) has no memory safety requirements; pid is our child.
        unsafe {
            libc::kill(pid as libc::pid_t, signal);
        }
    }
}

#[cfg(not(unix))]
fn forward(child: &mut Child, _signal: i32) {
    debug!("Killing child after interrupt");
    if let Err(e) = child.start_kill() {
        debug!("Could not kill child: {}", e);
    }
}

/// Exit code of a finished child; 128 + signal for signal deaths
fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }
    1
}
