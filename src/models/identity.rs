use serde::Serialize;
use std::path::PathBuf;

use crate::constants::UNKNOWN;
use crate::domain::{Language, MediaKind};
use crate::library::sanitize_filename;
use crate::models::catalog::FileVariant;

/// Where a parsed file belongs inside its title.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "slot", rename_all = "lowercase")]
pub enum Slot {
    Episode { season: String, episode: String },
    Movie,
}

/// Structured guess produced from a filename, before the title is resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CandidateIdentity {
    pub original_filename: String,
    pub title: String,
    pub kind: MediaKind,
    pub slot: Slot,
    pub source: Option<String>,
    pub language: Language,
    pub subtitle_languages: Vec<String>,
    pub audio_languages: Vec<String>,
    pub resolution: Option<u32>,
    pub codec: String,
    pub extension: String,
}

impl CandidateIdentity {
    #[must_use]
    pub fn season(&self) -> Option<&str> {
        match &self.slot {
            Slot::Episode { season, .. } => Some(season),
            Slot::Movie => None,
        }
    }

    #[must_use]
    pub fn episode(&self) -> Option<&str> {
        match &self.slot {
            Slot::Episode { episode, .. } => Some(episode),
            Slot::Movie => None,
        }
    }

    fn attributes(&self) -> String {
        let resolution = self
            .resolution
            .map_or_else(|| UNKNOWN.to_string(), |h| format!("{h}p"));
        format!("[{} {} {}]", self.language, resolution, self.codec)
    }

    /// Canonical file name, using `title` in place of the raw guess.
    #[must_use]
    pub fn render_as(&self, title: &str) -> String {
        let head = match &self.slot {
            Slot::Episode { season, episode } => {
                format!("{title} - S{season}E{episode} - {}", self.attributes())
            }
            Slot::Movie => format!("{title} - {}", self.attributes()),
        };
        let name = match &self.source {
            Some(source) => format!("{head} -{source} {}", self.extension),
            None => format!("{head} {}", self.extension),
        };
        sanitize_filename(&name)
    }

    #[must_use]
    pub fn render(&self) -> String {
        self.render_as(&self.title)
    }

    /// Turns the candidate into a catalog record once its final location is known.
    #[must_use]
    pub fn into_variant(self, renamed: String, path: PathBuf) -> FileVariant {
        FileVariant {
            renamed,
            path,
            original_filename: self.original_filename,
            language: self.language,
            subtitle_languages: self.subtitle_languages,
            audio_languages: self.audio_languages,
            resolution: self.resolution,
            codec: self.codec,
            source: self.source,
        }
    }
}
