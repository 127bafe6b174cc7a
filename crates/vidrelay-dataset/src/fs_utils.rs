//! Filesystem helpers for the dataset mirror.

use std::path::{Path, PathBuf};
use tokio::fs;

use crate::error::{DatasetError, DatasetResult};

/// Copy `src` into `dir`, keeping its file name, and return the new path.
///
/// The directory is created if needed. The copy goes to a temporary name in
/// `dir` first and is then renamed, so the CLI never sees a half-written
/// file. An existing file with the same name is replaced.
pub async fn copy_into_dir(src: impl AsRef<Path>, dir: impl AsRef<Path>) -> DatasetResult<PathBuf> {
    let src = src.as_ref();
    let dir = dir.as_ref();

    if !fs::try_exists(src).await.unwrap_or(false) {
        return Err(DatasetError::FileNotFound(src.to_path_buf()));
    }

    let file_name = src
        .file_name()
        .ok_or_else(|| DatasetError::InvalidPath(src.to_path_buf()))?;

    fs::create_dir_all(dir).await?;

    let dst = dir.join(file_name);
    let mut tmp_name = file_name.to_os_string();
    tmp_name.push(".part");
    let tmp_dst = dir.join(tmp_name);

    // A leftover `.part` would be published with the next version
    if let Err(e) = fs::copy(src, &tmp_dst).await {
        tracing::error!(
            "Failed to copy into dataset mirror: {} -> {}: {}",
            src.display(),
            tmp_dst.display(),
            e
        );
        remove_partial(&tmp_dst).await;
        return Err(DatasetError::from(e));
    }

    if let Err(e) = fs::rename(&tmp_dst, &dst).await {
        remove_partial(&tmp_dst).await;
        return Err(DatasetError::from(e));
    }

    tracing::debug!("Copied {} to {}", src.display(), dst.display());

    Ok(dst)
}

async fn remove_partial(path: &Path) {
    match fs::remove_file(path).await {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!("Failed to remove partial copy {}: {}", path.display(), e),
    }
}
