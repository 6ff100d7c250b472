use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::config::FilesystemConfig;

/// Bounded retry for filesystem operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first failure.
    pub attempts: u32,
    pub delay: Duration,
}

impl RetryPolicy {
    #[must_use]
    pub const fn new(attempts: u32, delay: Duration) -> Self {
        Self { attempts, delay }
    }

    #[must_use]
    pub const fn none() -> Self {
        Self::new(0, Duration::ZERO)
    }
}

impl From<&FilesystemConfig> for RetryPolicy {
    fn from(config: &FilesystemConfig) -> Self {
        Self::new(
            config.retry_attempts,
            Duration::from_millis(config.retry_delay_ms),
        )
    }
}

/// Runs `op` until it succeeds or the policy is exhausted.
///
/// `NotFound` is returned immediately, retrying cannot fix it.
pub async fn with_retry<T, F, Fut>(policy: RetryPolicy, what: &str, mut op: F) -> io::Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = io::Result<T>>,
{
    let mut attempt = 0;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Err(e),
            Err(e) if attempt < policy.attempts => {
                attempt += 1;
                warn!(
                    event = "fs_retry",
                    operation = what,
                    attempt,
                    error = %e,
                    "Filesystem operation failed, retrying"
                );
                tokio::time::sleep(policy.delay).await;
            }
            Err(e) => return Err(e),
        }
    }
}

fn is_cross_device(e: &io::Error) -> bool {
    e.kind() == io::ErrorKind::CrossesDevices || e.raw_os_error() == Some(18)
}

/// Moves a file or a directory tree, copying across filesystems when needed.
pub async fn move_path(source: &Path, destination: &Path) -> io::Result<()> {
    if let Some(parent) = destination.parent() {
        fs::create_dir_all(parent).await?;
    }

    match fs::rename(source, destination).await {
        Ok(()) => Ok(()),
        Err(e) if is_cross_device(&e) => {
            debug!(
                source = %source.display(),
                destination = %destination.display(),
                "Cross-device move, copying"
            );
            let (src, dst) = (source.to_path_buf(), destination.to_path_buf());
            tokio::task::spawn_blocking(move || copy_across(&src, &dst))
                .await
                .map_err(io::Error::other)??;
            remove_path(source).await
        }
        Err(e) => Err(e),
    }
}

/// Copies `source` to `destination`; a failed copy leaves nothing behind
/// unless the destination already existed.
fn copy_across(source: &Path, destination: &Path) -> io::Result<()> {
    let existed = destination.exists();
    copy_tree(source, destination).inspect_err(|e| {
        if existed {
            return;
        }
        warn!(
            destination = %destination.display(),
            error = %e,
            "Copy failed, removing partial destination"
        );
        let cleanup = if destination.is_dir() {
            std::fs::remove_dir_all(destination)
        } else {
            std::fs::remove_file(destination)
        };
        if let Err(cleanup) = cleanup
            && cleanup.kind() != io::ErrorKind::NotFound
        {
            warn!(destination = %destination.display(), error = %cleanup, "Could not remove partial copy");
        }
    })
}

fn copy_tree(source: &Path, destination: &Path) -> io::Result<()> {
    if source.is_file() {
        std::fs::copy(source, destination)?;
        return Ok(());
    }

    for entry in WalkDir::new(source) {
        let entry = entry.map_err(io::Error::other)?;
        let relative = entry
            .path()
            .strip_prefix(source)
            .map_err(io::Error::other)?;
        let target: PathBuf = destination.join(relative);

        if entry.file_type().is_dir() {
            std::fs::create_dir_all(&target)?;
        } else {
            std::fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}

pub async fn remove_path(path: &Path) -> io::Result<()> {
    let metadata = fs::metadata(path).await?;
    if metadata.is_dir() {
        fs::remove_dir_all(path).await
    } else {
        fs::remove_file(path).await
    }
}

/// Total size in bytes of the files below `path`.
pub async fn dir_size(path: &Path) -> io::Result<u64> {
    let path = path.to_path_buf();
    tokio::task::spawn_blocking(move || {
        WalkDir::new(&path)
            .into_iter()
            .filter_map(Result::ok)
            .filter(|e| e.file_type().is_file())
            .map(|e| e.metadata().map(|m| m.len()).map_err(io::Error::other))
            .sum::<io::Result<u64>>()
    })
    .await
    .map_err(io::Error::other)?
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_move_directory_tree() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("a/Show");
        fs::create_dir_all(source.join("Season 01")).await.unwrap();
        fs::write(source.join("Season 01/ep.mkv"), b"12345").await.unwrap();

        let destination = temp.path().join("b/Show");
        move_path(&source, &destination).await.unwrap();

        assert!(!source.exists());
        assert!(destination.join("Season 01/ep.mkv").is_file());
        assert_eq!(dir_size(&destination).await.unwrap(), 5);
    }

    #[test]
    fn test_copy_tree_preserves_layout() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("src");
        std::fs::create_dir_all(source.join("x/y")).unwrap();
        std::fs::write(source.join("x/y/f"), b"abc").unwrap();

        let destination = temp.path().join("dst");
        copy_tree(&source, &destination).unwrap();
        assert_eq!(std::fs::read(destination.join("x/y/f")).unwrap(), b"abc");
    }

    #[cfg(unix)]
    #[test]
    fn test_failed_copy_leaves_no_partial_destination() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("src");
        std::fs::create_dir_all(source.join("Season 01")).unwrap();
        std::fs::write(source.join("Season 01/01.mkv"), b"abc").unwrap();
        std::os::unix::fs::symlink(temp.path().join("gone"), source.join("Season 01/02.mkv"))
            .unwrap();

        let destination = temp.path().join("dst");
        assert!(copy_tree(&source, &destination).is_err());
        assert!(destination.exists());
        std::fs::remove_dir_all(&destination).unwrap();

        assert!(copy_across(&source, &destination).is_err());
        assert!(!destination.exists());
        assert!(source.join("Season 01/01.mkv").is_file());
    }

    #[tokio::test]
    async fn test_retry_gives_up_after_attempts() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::new(2, Duration::from_millis(1));

        let result: io::Result<()> = with_retry(policy, "test", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(io::Error::other("busy")) }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_retry_skips_not_found() {
        let calls = AtomicU32::new(0);
        let result: io::Result<()> = with_retry(RetryPolicy::new(5, Duration::ZERO), "test", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(io::Error::from(io::ErrorKind::NotFound)) }
        })
        .await;

        assert_eq!(result.unwrap_err().kind(), io::ErrorKind::NotFound);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
