pub const VIDEO_EXTENSIONS: &[&str] = &["mkv", "mp4", "avi", "webm", "mov", "wmv", "flv", "m4v"];

/// Characters removed from every name written to disk.
pub const FORBIDDEN_CHARS: &[char] = &['?', '"', '/', '\\', '*', ':', '<', '>', '|'];

pub const UNKNOWN: &str = "Unknown";

pub mod store {
    pub const ANIME_FILE: &str = "anime.json";

    pub const SHOWS_FILE: &str = "shows.json";

    pub const MOVIES_FILE: &str = "movies.json";
}

pub mod balancer {
    pub const TARGET_RATIO: f64 = 0.9;

    pub const MAX_MOVES_PER_VOLUME: usize = 25;

    /// Upper bound on donor recomputations in one planning run.
    pub const MAX_PASSES: usize = 64;
}

pub mod filesystem {
    pub const RETRY_ATTEMPTS: u32 = 2;

    pub const RETRY_DELAY_MS: u64 = 1000;
}

pub mod limits {
    /// Integer runs longer than this are ignored when looking for season/episode numbers.
    pub const MAX_NUMBER_DIGITS: usize = 4;

    /// A trailing release tag is only looked for this close to the end of the name.
    pub const SOURCE_TAIL_CHARS: usize = 15;
}
