//! Identity parser: turns an arbitrary video file name into a candidate identity.

pub mod filename;
pub mod rules;

use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

use crate::domain::MediaKind;
use crate::models::identity::CandidateIdentity;
use crate::services::media::MediaProbe;

pub use filename::{parse_identity, strip_annotations};

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("no title could be extracted from {filename}")]
    EmptyTitle { filename: String },

    #[error("path has no file name: {}", .0.display())]
    NoFileName(PathBuf),

    #[error("failed to probe {}: {message}", path.display())]
    Probe { path: PathBuf, message: String },
}

/// Parses `path`, probing its tracks first when it is reachable.
pub fn parse_file(
    path: &Path,
    kind: MediaKind,
    reachable: bool,
    probe: &dyn MediaProbe,
) -> Result<CandidateIdentity, IdentityError> {
    if !reachable {
        return parse_identity(path, kind, None);
    }

    let tracks = probe.probe(path).map_err(|e| IdentityError::Probe {
        path: path.to_path_buf(),
        message: format!("{e:#}"),
    })?;
    debug!(path = %path.display(), codec = ?tracks.video_codec, height = ?tracks.height, "Probed tracks");

    parse_identity(path, kind, Some(&tracks))
}
