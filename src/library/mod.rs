//! On-disk layout of the library: canonical names and filesystem helpers.

pub mod fs;
pub mod size;

use crate::constants::FORBIDDEN_CHARS;
use crate::domain::{TitleId, season_key};

pub use fs::{RetryPolicy, dir_size, move_path, remove_path, with_retry};
pub use size::format_size;

/// Drops characters that are not allowed in file names on common filesystems.
#[must_use]
pub fn sanitize_filename(name: &str) -> String {
    name.chars().filter(|c| !FORBIDDEN_CHARS.contains(c)).collect()
}

/// Directory name used for a title under a storage root.
///
/// Falls back to the id when nothing of the name survives sanitizing.
#[must_use]
pub fn title_dir_name(name: &str, id: TitleId) -> String {
    let cleaned = sanitize_filename(name);
    let cleaned = cleaned.trim().trim_end_matches('.').trim();
    if cleaned.is_empty() {
        id.to_string()
    } else {
        cleaned.to_string()
    }
}

#[must_use]
pub fn season_dir_name(number: u32) -> String {
    format!("Season {}", season_key(number))
}
