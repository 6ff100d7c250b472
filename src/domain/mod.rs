//! Domain primitives shared by the parser, the catalog and the workers.
//!
//! Identifiers are newtypes so a provider id can never be confused with a
//! season or episode number, and the media kind is an enum instead of the
//! string tags the on-disk layout uses.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Identifier assigned to a title by the metadata provider.
///
/// Serialized as a bare integer; when used as a map key the JSON stores
/// write it as a decimal string.
///
/// # Examples
///
/// ```rust
/// use mediarr::domain::TitleId;
///
/// let id = TitleId::new(1429);
/// assert_eq!(id.value(), 1429);
/// assert_eq!(id.to_string(), "1429");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct TitleId(u64);

impl TitleId {
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    #[must_use]
    pub const fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for TitleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for TitleId {
    fn from(id: u64) -> Self {
        Self::new(id)
    }
}

impl From<TitleId> for u64 {
    fn from(id: TitleId) -> Self {
        id.0
    }
}

impl FromStr for TitleId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse::<u64>().map(Self::new)
    }
}

impl Serialize for TitleId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_u64(self.0)
    }
}

impl<'de> Deserialize<'de> for TitleId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let id = u64::deserialize(deserializer)?;
        Ok(Self::new(id))
    }
}

/// The three independent catalog categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Anime,
    Show,
    Movie,
}

impl MediaKind {
    pub const ALL: [Self; 3] = [Self::Anime, Self::Show, Self::Movie];

    /// Anime and shows are organised in seasons; movies hold a single file.
    #[must_use]
    pub const fn is_episodic(self) -> bool {
        !matches!(self, Self::Movie)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Anime => "anime",
            Self::Show => "show",
            Self::Movie => "movie",
        }
    }

    #[must_use]
    pub const fn store_file(self) -> &'static str {
        use crate::constants::store;
        match self {
            Self::Anime => store::ANIME_FILE,
            Self::Show => store::SHOWS_FILE,
            Self::Movie => store::MOVIES_FILE,
        }
    }

    pub(crate) const fn index(self) -> usize {
        match self {
            Self::Anime => 0,
            Self::Show => 1,
            Self::Movie => 2,
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MediaKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "anime" => Ok(Self::Anime),
            "show" | "shows" | "tv" => Ok(Self::Show),
            "movie" | "movies" | "film" => Ok(Self::Movie),
            other => Err(format!("unknown media kind: {other}")),
        }
    }
}

/// Language label attached to every file variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Language {
    Vf,
    Vostfr,
    VfVostfr,
    MultiSubs { multi_audio: bool },
    #[default]
    Unknown,
}

impl Language {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Vf => "VF",
            Self::Vostfr => "VOSTFR",
            Self::VfVostfr => "VF/VOSTFR",
            Self::MultiSubs { multi_audio: false } => "Multi-Subs",
            Self::MultiSubs { multi_audio: true } => "Multi-Subs Multi-Audios",
            Self::Unknown => "Unknown",
        }
    }

    #[must_use]
    pub fn from_label(label: &str) -> Self {
        match label {
            "VF" => Self::Vf,
            "VOSTFR" => Self::Vostfr,
            "VF/VOSTFR" => Self::VfVostfr,
            "Multi-Subs" => Self::MultiSubs { multi_audio: false },
            "Multi-Subs Multi-Audios" => Self::MultiSubs { multi_audio: true },
            _ => Self::Unknown,
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl Serialize for Language {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.label())
    }
}

impl<'de> Deserialize<'de> for Language {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let label = String::deserialize(deserializer)?;
        Ok(Self::from_label(&label))
    }
}

/// Season map key: always two digits.
#[must_use]
pub fn season_key(season: u32) -> String {
    format!("{season:02}")
}

/// Episode map key: two digits up to 99, then the natural width.
#[must_use]
pub fn episode_key(episode: u32) -> String {
    format!("{episode:02}")
}
