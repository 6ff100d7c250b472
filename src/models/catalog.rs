use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::domain::{Language, MediaKind, TitleId, episode_key};

/// A catalogued file for one episode slot or one movie.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileVariant {
    pub renamed: String,
    pub path: PathBuf,
    pub original_filename: String,
    pub language: Language,
    #[serde(default)]
    pub subtitle_languages: Vec<String>,
    #[serde(default)]
    pub audio_languages: Vec<String>,
    pub resolution: Option<u32>,
    pub codec: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl FileVariant {
    #[must_use]
    pub fn is_present(&self) -> bool {
        self.path.is_file()
    }

    /// Whether the release tag or the original name carries `marker`.
    #[must_use]
    pub fn carries_marker(&self, marker: &str) -> bool {
        if marker.is_empty() {
            return false;
        }
        let marker = marker.to_lowercase();
        self.source
            .as_deref()
            .is_some_and(|s| s.to_lowercase() == marker)
            || self.original_filename.to_lowercase().contains(&marker)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Season {
    pub number: u32,
    pub episode_count: u32,
    pub path: PathBuf,
    #[serde(default)]
    pub episodes: BTreeMap<String, FileVariant>,
}

impl Season {
    #[must_use]
    pub fn new(number: u32, episode_count: u32, path: PathBuf) -> Self {
        Self {
            number,
            episode_count,
            path,
            episodes: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.episodes.len() == self.episode_count as usize
    }

    /// Episode keys between 1 and the declared count with no file.
    #[must_use]
    pub fn missing_episodes(&self) -> Vec<String> {
        (1..=self.episode_count)
            .map(episode_key)
            .filter(|key| !self.episodes.contains_key(key))
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum TitleContent {
    Anime { seasons: BTreeMap<String, Season> },
    Show { seasons: BTreeMap<String, Season> },
    Movie { file: Option<FileVariant> },
}

impl TitleContent {
    #[must_use]
    pub fn empty(kind: MediaKind) -> Self {
        match kind {
            MediaKind::Anime => Self::Anime {
                seasons: BTreeMap::new(),
            },
            MediaKind::Show => Self::Show {
                seasons: BTreeMap::new(),
            },
            MediaKind::Movie => Self::Movie { file: None },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Title {
    pub id: TitleId,
    pub name: String,
    pub path: PathBuf,
    #[serde(flatten)]
    pub content: TitleContent,
}

impl Title {
    #[must_use]
    pub const fn kind(&self) -> MediaKind {
        match self.content {
            TitleContent::Anime { .. } => MediaKind::Anime,
            TitleContent::Show { .. } => MediaKind::Show,
            TitleContent::Movie { .. } => MediaKind::Movie,
        }
    }

    #[must_use]
    pub const fn seasons(&self) -> Option<&BTreeMap<String, Season>> {
        match &self.content {
            TitleContent::Anime { seasons } | TitleContent::Show { seasons } => Some(seasons),
            TitleContent::Movie { .. } => None,
        }
    }

    pub const fn seasons_mut(&mut self) -> Option<&mut BTreeMap<String, Season>> {
        match &mut self.content {
            TitleContent::Anime { seasons } | TitleContent::Show { seasons } => Some(seasons),
            TitleContent::Movie { .. } => None,
        }
    }

    #[must_use]
    pub fn season(&self, key: &str) -> Option<&Season> {
        self.seasons().and_then(|s| s.get(key))
    }

    #[must_use]
    pub fn episode(&self, season: &str, episode: &str) -> Option<&FileVariant> {
        self.season(season).and_then(|s| s.episodes.get(episode))
    }

    #[must_use]
    pub const fn movie_file(&self) -> Option<&FileVariant> {
        match &self.content {
            TitleContent::Movie { file } => file.as_ref(),
            _ => None,
        }
    }

    /// Rewrites every stored path under `self.path` to live under `new_path`.
    pub fn relocate(&mut self, new_path: PathBuf) {
        let old = std::mem::replace(&mut self.path, new_path);
        let new = self.path.clone();

        match &mut self.content {
            TitleContent::Anime { seasons } | TitleContent::Show { seasons } => {
                for season in seasons.values_mut() {
                    season.path = rebase(&season.path, &old, &new);
                    for variant in season.episodes.values_mut() {
                        variant.path = rebase(&variant.path, &old, &new);
                    }
                }
            }
            TitleContent::Movie { file } => {
                if let Some(variant) = file {
                    variant.path = rebase(&variant.path, &old, &new);
                }
            }
        }
    }
}

fn rebase(path: &Path, old_root: &Path, new_root: &Path) -> PathBuf {
    path.strip_prefix(old_root)
        .map_or_else(|_| path.to_path_buf(), |rest| new_root.join(rest))
}
