//! Per-kind title cleanup tables.
//!
//! Anime and shows share the delimited strategy; movies accumulate words
//! until a year or resolution token shows up.

use crate::domain::MediaKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TitleStrategy {
    /// Text before `" - "`, an `SxxEyy` marker, or the first digit.
    Delimited,
    /// Leading words up to a year or resolution token.
    Accumulate,
}

#[derive(Debug)]
pub struct TitleRules {
    pub strategy: TitleStrategy,
    /// Regex removed from the name before the title is cut out.
    pub noise: &'static str,
    /// Words that end the title when met (case-insensitive, whole words).
    pub stop_words: &'static [&'static str],
    /// Longest `-GROUP` tag cut from the end of the cleaned name.
    pub tail_dash_window: usize,
}

pub const RESOLUTIONS: &[u32] = &[480, 720, 1080, 2160];

pub static EPISODIC: TitleRules = TitleRules {
    strategy: TitleStrategy::Delimited,
    noise: r"(?i)\b\d{1,2}(?:st|nd|rd|th)\s+season\b|\bcour\s*\d+\b|\boav\b",
    stop_words: &[],
    tail_dash_window: 0,
};

pub static MOVIE: TitleRules = TitleRules {
    strategy: TitleStrategy::Accumulate,
    noise: r"(?i)\b(?:bluray|bdrip|webrip|web-dl|hdlight|remux|[xh]26[45]|hevc|10bits?)\b",
    stop_words: &[
        "movie",
        "film",
        "vostfr",
        "french",
        "truefrench",
        "english",
        "japanese",
    ],
    tail_dash_window: 15,
};

#[must_use]
pub const fn rules_for(kind: MediaKind) -> &'static TitleRules {
    match kind {
        MediaKind::Anime | MediaKind::Show => &EPISODIC,
        MediaKind::Movie => &MOVIE,
    }
}
