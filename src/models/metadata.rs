use serde::{Deserialize, Serialize};

use crate::domain::{MediaKind, TitleId};

/// One entry of a provider search response, best match first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchHit {
    pub id: TitleId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeasonInfo {
    pub number: u32,
    pub episode_count: u32,
}

/// Full provider record for a title, kept verbatim in the by-id snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TitleMetadata {
    pub id: TitleId,
    pub name: String,
    pub kind: MediaKind,
    #[serde(default)]
    pub seasons: Vec<SeasonInfo>,
    #[serde(default)]
    pub alternate_titles: Vec<String>,
    #[serde(default)]
    pub translations: Vec<String>,
}

impl TitleMetadata {
    #[must_use]
    pub fn season(&self, number: u32) -> Option<&SeasonInfo> {
        self.seasons.iter().find(|s| s.number == number)
    }
}
