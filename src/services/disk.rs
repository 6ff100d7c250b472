use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Arc;

/// Free-space lookup for a storage volume.
pub trait VolumeSpace: Send + Sync {
    fn free_space(&self, path: &Path) -> io::Result<u64>;
}

/// Reads free space from `df -B1`.
#[derive(Debug, Default, Clone, Copy)]
pub struct DfSpace;

impl VolumeSpace for DfSpace {
    fn free_space(&self, path: &Path) -> io::Result<u64> {
        let output = Command::new("df").arg("-B1").arg(path).output()?;

        if !output.status.success() {
            return Err(io::Error::other(format!(
                "df failed for {}: {}",
                path.display(),
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        parse_df_free(&String::from_utf8_lossy(&output.stdout))
            .ok_or_else(|| io::Error::other(format!("unexpected df output for {}", path.display())))
    }
}

/// Runs the lookup on the blocking pool.
pub async fn free_space(space: &Arc<dyn VolumeSpace>, path: &Path) -> io::Result<u64> {
    let space = Arc::clone(space);
    let path: PathBuf = path.to_path_buf();
    tokio::task::spawn_blocking(move || space.free_space(&path))
        .await
        .map_err(io::Error::other)?
}

fn parse_df_free(stdout: &str) -> Option<u64> {
    let line = stdout.lines().nth(1)?;
    let parts: Vec<&str> = line.split_whitespace().collect();

    if parts.len() >= 4 {
        parts[3].parse().ok()
    } else {
        None
    }
}
