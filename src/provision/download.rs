//! Atomic artifact installation
//!
//! The body is streamed into a temporary file next to the destination,
//! marked executable and renamed into place. A failed transfer never leaves
//! a partial file behind: the temporary path is removed when dropped.

use crate::error::{BazeliskError, BazeliskResult};
use crate::http::HttpClient;
use std::path::{Path, PathBuf};
use tempfile::Builder;
use tracing::{debug, info};

/// Download `url` to `dir/filename` unless that file already exists.
///
/// Returns the destination path. Existing files are trusted as-is since the
/// filename embeds the version.
pub async fn download_executable(
    client: &dyn HttpClient,
    url: &str,
    dir: &Path,
    filename: &str,
) -> BazeliskResult<PathBuf> {
    let dest = dir.join(filename);
    if dest.exists() {
        debug!("{} already present", dest.display());
        return Ok(dest);
    }

    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| BazeliskError::io(format!("creating {}", dir.display()), e))?;

    let temp = Builder::new()
        .prefix("download")
        .tempfile_in(dir)
        .map_err(|e| download_error(url, format!("could not create temporary file: {}", e)))?
        .into_temp_path();

    info!("Downloading {}...", url);
    let bytes = client
        .download(url, &temp)
        .await
        .map_err(|e| download_error(url, e.to_string()))?;
    debug!("Fetched {} bytes from {}", bytes, url);

    make_executable(&temp).map_err(|e| download_error(url, e.to_string()))?;

    temp.persist(&dest).map_err(|e| {
        download_error(
            url,
            format!("could not move into {}: {}", dest.display(), e.error),
        )
    })?;

    Ok(dest)
}

fn download_error(url: &str, reason: impl Into<String>) -> BazeliskError {
    BazeliskError::Download {
        url: url.to_string(),
        reason: reason.into(),
    }
}

/// Set mode 0755 on unix; a no-op elsewhere
pub(crate) fn make_executable(path: &Path) -> std::io::Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755))?;
    }
    #[cfg(not(unix))]
    let _ = path;
    Ok(())
}
