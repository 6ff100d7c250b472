use chrono::Datelike;
use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;

use crate::constants::{UNKNOWN, limits};
use crate::domain::{Language, MediaKind, episode_key, season_key};
use crate::models::identity::{CandidateIdentity, Slot};
use crate::models::media::MediaInfo;
use crate::parser::IdentityError;
use crate::parser::rules::{RESOLUTIONS, TitleRules, TitleStrategy, rules_for};

/// Parses a video file name into a candidate identity.
///
/// `tracks` carries the probe result for reachable files; `None` means the
/// file could not be inspected and every track attribute stays unknown.
pub fn parse_identity(
    path: &Path,
    kind: MediaKind,
    tracks: Option<&MediaInfo>,
) -> Result<CandidateIdentity, IdentityError> {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| IdentityError::NoFileName(path.to_path_buf()))?;

    let extension = path
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();
    let stem = file_name
        .strip_suffix(&extension)
        .unwrap_or(&file_name)
        .to_string();

    let clean = clean_name(&stem);
    let rules = rules_for(kind);

    let (title, slot) = if kind.is_episodic() {
        let season = extract_season(&clean);
        let title = extract_title(&clean, rules, season);
        let slot = extract_episode(remainder_after(&clean, &title), season).map_or(
            Slot::Movie,
            |episode| Slot::Episode {
                season: season_key(season),
                episode: episode_key(episode),
            },
        );
        (title, slot)
    } else {
        (extract_title(&clean, rules, 1), Slot::Movie)
    };

    if title.is_empty() {
        return Err(IdentityError::EmptyTitle { filename: file_name });
    }

    let language = detect_language(&file_name, tracks);
    let (codec, resolution, subtitle_languages, audio_languages) = match tracks {
        Some(info) => (
            info.codec_label().unwrap_or_else(|| UNKNOWN.to_string()),
            info.height,
            info.subtitle_languages.clone(),
            info.audio_languages.clone(),
        ),
        None => (UNKNOWN.to_string(), None, Vec::new(), Vec::new()),
    };

    Ok(CandidateIdentity {
        source: extract_source(&file_name, &stem),
        original_filename: file_name,
        title,
        kind,
        slot,
        language,
        subtitle_languages,
        audio_languages,
        resolution,
        codec,
        extension,
    })
}

fn get_regex(re: &'static OnceLock<Regex>, pattern: &str) -> &'static Regex {
    re.get_or_init(|| Regex::new(pattern).expect("Invalid regex pattern defined in code"))
}

/// Removes every `[...]`, `(...)` and `{...}` group, innermost first.
#[must_use]
pub fn strip_annotations(name: &str) -> String {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = get_regex(&RE, r"\[[^\[\]]*\]|\([^()]*\)|\{[^{}]*\}");

    let mut current = name.to_string();
    loop {
        let next = re.replace_all(&current, " ").into_owned();
        if next == current {
            return current;
        }
        current = next;
    }
}

fn clean_name(stem: &str) -> String {
    static WS: OnceLock<Regex> = OnceLock::new();
    let ws = get_regex(&WS, r"\s+");

    let stripped = strip_annotations(stem).replace(['.', '_'], " ");
    ws.replace_all(&stripped, " ").into_owned()
}

/// Integer runs of at most four digits, with their byte offsets.
fn number_runs(text: &str) -> Vec<(usize, &str)> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = get_regex(&RE, r"\d+");

    re.find_iter(text)
        .filter(|m| m.as_str().len() <= limits::MAX_NUMBER_DIGITS)
        .map(|m| (m.start(), m.as_str()))
        .collect()
}

fn preceded_by_bare(text: &str, start: usize, letter: char) -> bool {
    let mut before = text[..start].chars().rev();
    match before.next() {
        Some(c) if c.eq_ignore_ascii_case(&letter) => {
            before.next().is_none_or(|c| !c.is_alphabetic())
        }
        _ => false,
    }
}

fn extract_season(clean: &str) -> u32 {
    static ORDINAL: OnceLock<Regex> = OnceLock::new();
    static OAV: OnceLock<Regex> = OnceLock::new();
    let ordinal = get_regex(&ORDINAL, r"(?i)\b(\d{1,2})(?:st|nd|rd|th)\s+season\b");
    let oav = get_regex(&OAV, r"(?i)\boav\b");

    if oav.is_match(clean) {
        return 0;
    }
    if let Some(n) = ordinal
        .captures(clean)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
    {
        return n;
    }

    let body = clean.trim_start_matches(|c: char| c.is_ascii_digit());
    let runs = number_runs(body);
    if runs.len() <= 1 {
        return 1;
    }

    let pick = runs
        .iter()
        .find(|(start, _)| preceded_by_bare(body, *start, 's'))
        .or_else(|| {
            runs.iter()
                .find(|(start, _)| body[..*start].ends_with("eason "))
        });

    pick.and_then(|(_, run)| run.parse().ok()).unwrap_or(1)
}

fn extract_title(clean: &str, rules: &TitleRules, season: u32) -> String {
    let denoised = noise_regex(rules).replace_all(clean, " ");
    let title = match rules.strategy {
        TitleStrategy::Delimited => delimited_title(&denoised, season),
        TitleStrategy::Accumulate => accumulated_title(&denoised, rules),
    };
    tidy(&title)
}

fn noise_regex(rules: &TitleRules) -> &'static Regex {
    static DELIMITED: OnceLock<Regex> = OnceLock::new();
    static ACCUMULATE: OnceLock<Regex> = OnceLock::new();
    match rules.strategy {
        TitleStrategy::Delimited => get_regex(&DELIMITED, rules.noise),
        TitleStrategy::Accumulate => get_regex(&ACCUMULATE, rules.noise),
    }
}

fn delimited_title(name: &str, season: u32) -> String {
    static MARKER: OnceLock<Regex> = OnceLock::new();
    let marker = get_regex(&MARKER, r"(?i)\bs\d{1,2}e\d");

    if let Some((head, _)) = name.split_once(" - ") {
        let mut head = cut_at_season_marker(head, season).trim_end().to_string();
        let mut tail = head.chars().rev();
        if let (Some(last), Some(' ')) = (tail.next(), tail.next())
            && last.is_ascii_digit()
        {
            head.truncate(head.len() - 2);
        }
        return head;
    }

    if let Some(m) = marker.find(name) {
        return name[..m.start()].to_string();
    }

    if let Some(index) = name.find(|c: char| c.is_ascii_digit())
        && !name[..index].trim().is_empty()
    {
        return name[..index].to_string();
    }

    name.split_whitespace().next().unwrap_or_default().to_string()
}

fn cut_at_season_marker(head: &str, season: u32) -> &str {
    static WORD: OnceLock<Regex> = OnceLock::new();
    static SHORT: OnceLock<Regex> = OnceLock::new();
    let word = get_regex(&WORD, r"(?i)\bseason\b");
    let short = get_regex(&SHORT, r"(?i)\bs(\d{1,2})\b");

    let mut cut = head.len();
    if let Some(m) = word.find(head) {
        cut = m.start();
    }
    if let Some(m) = short.captures_iter(head).find_map(|c| {
        let n: u32 = c.get(1)?.as_str().parse().ok()?;
        (n == season).then(|| c.get(0)).flatten()
    }) {
        cut = cut.min(m.start());
    }
    &head[..cut]
}

fn accumulated_title(name: &str, rules: &TitleRules) -> String {
    let mut name = name.split_once(" - ").map_or(name, |(head, _)| head).trim();
    if let Some(dash) = release_tail(name, rules.tail_dash_window) {
        name = &name[..dash];
    }
    if let Some(paren) = name.find('(') {
        name = &name[..paren];
    }

    let current_year = u32::try_from(chrono::Utc::now().year()).unwrap_or(u32::MAX);
    let mut words = Vec::new();
    for (i, word) in name.split_whitespace().enumerate() {
        if i > 0 && (is_stop_word(word, rules) || is_year_or_resolution(word, current_year)) {
            break;
        }
        words.push(word);
    }
    words.join(" ")
}

/// Offset of a trailing `-GROUP` tag. A dash inside the first word
/// ("Spider-Man") never starts one.
fn release_tail(name: &str, window: usize) -> Option<usize> {
    let dash = name.rfind('-')?;
    let tag = &name[dash + 1..];
    let first_word_end = name.find(char::is_whitespace)?;
    (dash > first_word_end
        && !tag.is_empty()
        && tag.len() <= window
        && !tag.contains(char::is_whitespace))
    .then_some(dash)
}

fn is_stop_word(word: &str, rules: &TitleRules) -> bool {
    let lower = word.to_lowercase();
    rules.stop_words.iter().any(|w| *w == lower)
}

fn is_year_or_resolution(word: &str, current_year: u32) -> bool {
    let digits = word.trim_end_matches(['p', 'P']);
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return false;
    }
    let Ok(value) = digits.parse::<u32>() else {
        return false;
    };
    let is_year = digits.len() == 4 && word.len() == 4 && (1901..=current_year).contains(&value);
    is_year || RESOLUTIONS.contains(&value)
}

fn tidy(title: &str) -> String {
    title
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .trim_end_matches([' ', '-'])
        .trim_start_matches([' ', '-'])
        .to_string()
}

fn remainder_after<'a>(clean: &'a str, title: &str) -> &'a str {
    if title.is_empty() {
        return clean;
    }
    clean
        .find(title)
        .map_or(clean, |start| &clean[start + title.len()..])
}

/// Episode number from the text following the title; `None` means no number
/// at all, i.e. the file is a movie.
fn extract_episode(remainder: &str, season: u32) -> Option<u32> {
    let runs = number_runs(remainder);

    match runs.as_slice() {
        [] => None,
        [(_, only)] => to_number(only),
        _ => {
            if let Some((_, run)) = runs.iter().find(|(start, _)| {
                preceded_by_bare(remainder, *start, 'e') || remainder[..*start].ends_with('E')
            }) {
                return to_number(run);
            }

            let season = season_key(season);
            let mut same_as_season = None;
            for (_, run) in runs.iter().filter(|(_, run)| run.len() == 2) {
                if *run != season {
                    return to_number(run);
                }
                same_as_season.get_or_insert(run);
            }
            if let Some(run) = same_as_season {
                return to_number(run);
            }

            runs.iter().filter_map(|(_, run)| to_number(run)).max()
        }
    }
}

fn to_number(run: &str) -> Option<u32> {
    run.parse().ok()
}

fn extract_source(file_name: &str, stem: &str) -> Option<String> {
    static RENDERED: OnceLock<Regex> = OnceLock::new();
    static EPISODE_LIKE: OnceLock<Regex> = OnceLock::new();
    let rendered = get_regex(&RENDERED, r"\] -(\S+)\s*$");
    let episode_like = get_regex(&EPISODE_LIKE, r"(?i)^(?:s\d+e\d+|e?\d+)$");

    let candidate = if let Some(rest) = file_name.strip_prefix('[') {
        rest.split_once(']').map(|(group, _)| group.trim().to_string())
    } else if let Some(caps) = rendered.captures(stem) {
        caps.get(1).map(|m| m.as_str().to_string())
    } else if file_name
        .chars()
        .rev()
        .take(limits::SOURCE_TAIL_CHARS)
        .any(|c| c == '-')
    {
        stem.rsplit_once('-').map(|(_, tag)| {
            tag.trim()
                .trim_matches(['[', ']', '(', ')'])
                .trim()
                .to_string()
        })
    } else {
        None
    }?;

    let valid = !candidate.is_empty()
        && !candidate.chars().any(char::is_whitespace)
        && !episode_like.is_match(&candidate);
    valid.then_some(candidate)
}

fn detect_language(file_name: &str, tracks: Option<&MediaInfo>) -> Language {
    let lower = file_name.to_lowercase();
    let vf = lower.contains("vf");
    let vostfr = lower.contains("vostfr");

    match (vf, vostfr) {
        (true, true) => return Language::VfVostfr,
        (true, false) => return Language::Vf,
        (false, true) => return Language::Vostfr,
        (false, false) => {}
    }

    let Some(info) = tracks else {
        return Language::Unknown;
    };
    if info.has_multiple_subtitle_languages() {
        Language::MultiSubs {
            multi_audio: info.has_multiple_audio_languages(),
        }
    } else if info.has_french_subtitles() && info.has_japanese_audio() {
        Language::Vostfr
    } else {
        Language::Unknown
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn parse(name: &str, kind: MediaKind) -> CandidateIdentity {
        parse_identity(&PathBuf::from("/intake").join(name), kind, None).unwrap()
    }

    fn slot(season: &str, episode: &str) -> Slot {
        Slot::Episode {
            season: season.to_string(),
            episode: episode.to_string(),
        }
    }

    #[test]
    fn test_plain_sxxexx_with_language_tag() {
        let id = parse("Attack on Titan S01E12 [VOSTFR].mkv", MediaKind::Anime);
        assert_eq!(id.title, "Attack on Titan");
        assert_eq!(id.slot, slot("01", "12"));
        assert_eq!(id.language, Language::Vostfr);
        assert_eq!(id.source, None);
        assert_eq!(id.codec, "Unknown");
        assert_eq!(id.resolution, None);
        assert_eq!(id.extension, ".mkv");
    }

    #[test]
    fn test_leading_group_is_source() {
        let id = parse("[Judas] Vinland Saga - S02E23.mkv", MediaKind::Anime);
        assert_eq!(id.title, "Vinland Saga");
        assert_eq!(id.source.as_deref(), Some("Judas"));
        assert_eq!(id.slot, slot("02", "23"));
    }

    #[test]
    fn test_dot_separated_release() {
        let id = parse(
            "Blue.Exorcist.S02E01.VOSTFR.1080p.x264-LIGHTNING.mkv",
            MediaKind::Anime,
        );
        assert_eq!(id.title, "Blue Exorcist");
        assert_eq!(id.slot, slot("02", "01"));
        assert_eq!(id.source.as_deref(), Some("LIGHTNING"));
        assert_eq!(id.language, Language::Vostfr);
    }

    #[test]
    fn test_absolute_episode_after_dash() {
        let id = parse("[SubsPlease] One Piece - 1071 (1080p).mkv", MediaKind::Anime);
        assert_eq!(id.title, "One Piece");
        assert_eq!(id.slot, slot("01", "1071"));
    }

    #[test]
    fn test_three_digit_episode_keeps_width() {
        let id = parse("[Group] Naruto Shippuden - 345.mkv", MediaKind::Anime);
        assert_eq!(id.slot, slot("01", "345"));
    }

    #[test]
    fn test_ordinal_season_cue() {
        let id = parse("[Group] Mushoku Tensei 2nd Season - 05.mkv", MediaKind::Anime);
        assert_eq!(id.title, "Mushoku Tensei");
        assert_eq!(id.slot, slot("02", "05"));
    }

    #[test]
    fn test_oav_is_season_zero() {
        let id = parse("Hellsing OAV - 03.mkv", MediaKind::Anime);
        assert_eq!(id.slot, slot("00", "03"));
    }

    #[test]
    fn test_season_word() {
        let id = parse("The Expanse Season 03 - 07.mkv", MediaKind::Show);
        assert_eq!(id.title, "The Expanse");
        assert_eq!(id.slot, slot("03", "07"));
    }

    #[test]
    fn test_trailing_lone_digit_dropped_from_title() {
        let id = parse("Overlord 4 - 02.mkv", MediaKind::Anime);
        assert_eq!(id.title, "Overlord");
        assert_eq!(id.slot, slot("01", "02"));
    }

    #[test]
    fn test_short_season_marker_cut_from_title() {
        let id = parse("DanMachi S4 - 06.mkv", MediaKind::Anime);
        assert_eq!(id.title, "DanMachi");
        assert_eq!(id.slot, slot("04", "06"));
    }

    #[test]
    fn test_title_before_first_digit() {
        let id = parse("Frieren 07 VF.mkv", MediaKind::Anime);
        assert_eq!(id.title, "Frieren");
        assert_eq!(id.slot, slot("01", "07"));
        assert_eq!(id.language, Language::Vf);
    }

    #[test]
    fn test_episode_skips_run_equal_to_season() {
        // Season comes from "S03"; "03" must not be taken again as the episode.
        assert_eq!(extract_episode(" S03 03 11", 3), Some(11));
        assert_eq!(extract_episode(" 03 03", 3), Some(3));
        assert_eq!(extract_episode(" 7 9", 1), Some(9));
        assert_eq!(extract_episode(" 01 1080p", 1), Some(1));
        assert_eq!(extract_episode(" no digits", 1), None);
    }

    #[test]
    fn test_episode_equal_to_season_beats_resolution() {
        let id = parse("Show - 01 1080p.mkv", MediaKind::Anime);
        assert_eq!(id.title, "Show");
        assert_eq!(id.slot, slot("01", "01"));

        let id = parse("Show - 01 VOSTFR 720p.mkv", MediaKind::Show);
        assert_eq!(id.slot, slot("01", "01"));
    }

    #[test]
    fn test_no_number_is_movie_slot() {
        let id = parse("[Group] Kimi no Na wa.mkv", MediaKind::Anime);
        assert_eq!(id.slot, Slot::Movie);
    }

    #[test]
    fn test_both_language_markers() {
        let id = parse("Naruto S01E01 VF VOSTFR.mkv", MediaKind::Anime);
        assert_eq!(id.language, Language::VfVostfr);
    }

    #[test]
    fn test_numeric_tail_is_not_a_source() {
        let id = parse("Show - 05.mkv", MediaKind::Show);
        assert_eq!(id.source, None);
        assert_eq!(id.slot, slot("01", "05"));

        let id = parse("Mob Psycho 100 - S02E05.mkv", MediaKind::Anime);
        assert_eq!(id.source, None);
    }

    #[test]
    fn test_movie_title_stops_at_year() {
        let id = parse("Spirited.Away.2001.1080p.BluRay.x264-GRP.mkv", MediaKind::Movie);
        assert_eq!(id.title, "Spirited Away");
        assert_eq!(id.slot, Slot::Movie);
        assert_eq!(id.source.as_deref(), Some("GRP"));
    }

    #[test]
    fn test_movie_title_stops_at_language_and_marketing() {
        let id = parse("Your Name FRENCH 720p.mkv", MediaKind::Movie);
        assert_eq!(id.title, "Your Name");

        let id = parse("Akira Film VOSTFR.mkv", MediaKind::Movie);
        assert_eq!(id.title, "Akira");
    }

    #[test]
    fn test_movie_group_tail_stays_out_of_title() {
        let id = parse("Akira x264-GRP.mkv", MediaKind::Movie);
        assert_eq!(id.title, "Akira");
        assert_eq!(id.source.as_deref(), Some("GRP"));

        let id = parse("Spider-Man.mkv", MediaKind::Movie);
        assert_eq!(id.title, "Spider-Man");
    }

    #[test]
    fn test_movie_first_word_kept_even_if_numeric() {
        let id = parse("1917 (2019) 2160p.mkv", MediaKind::Movie);
        assert_eq!(id.title, "1917");
    }

    #[test]
    fn test_empty_title_is_an_error() {
        let err = parse_identity(Path::new("/intake/[Group].mkv"), MediaKind::Anime, None);
        assert!(matches!(err, Err(IdentityError::EmptyTitle { .. })));
    }

    #[test]
    fn test_track_attributes_when_reachable() {
        let info = MediaInfo {
            video_codec: Some("h264".into()),
            height: Some(1080),
            audio_languages: vec!["jpn".into()],
            subtitle_languages: vec!["fre".into()],
        };
        let id = parse_identity(
            Path::new("/intake/[Judas] Dororo - 04.mkv"),
            MediaKind::Anime,
            Some(&info),
        )
        .unwrap();
        assert_eq!(id.language, Language::Vostfr);
        assert_eq!(id.codec, "H264");
        assert_eq!(id.resolution, Some(1080));

        let multi = MediaInfo {
            subtitle_languages: vec!["fre".into(), "eng".into()],
            audio_languages: vec!["jpn".into(), "eng".into()],
            ..info
        };
        let id = parse_identity(
            Path::new("/intake/Dororo - 04.mkv"),
            MediaKind::Anime,
            Some(&multi),
        )
        .unwrap();
        assert_eq!(id.language, Language::MultiSubs { multi_audio: true });
    }

    #[test]
    fn test_render_format() {
        let id = parse("[Judas] Vinland Saga - S02E23.mkv", MediaKind::Anime);
        assert_eq!(
            id.render(),
            "Vinland Saga - S02E23 - [Unknown Unknown Unknown] -Judas .mkv"
        );

        let id = parse("Attack on Titan S01E12 [VOSTFR].mkv", MediaKind::Anime);
        assert_eq!(
            id.render(),
            "Attack on Titan - S01E12 - [VOSTFR Unknown Unknown] .mkv"
        );
    }

    #[test]
    fn test_render_strips_forbidden_characters() {
        let mut id = parse("Re Zero - 05.mkv", MediaKind::Anime);
        id.title = "Re:Zero? <Part/1>".into();
        assert_eq!(id.render(), "ReZero Part1 - S01E05 - [Unknown Unknown Unknown] .mkv");
    }

    #[test]
    fn test_reparse_of_rendering_is_stable() {
        let names = [
            "Attack on Titan S01E12 [VOSTFR].mkv",
            "[Judas] Vinland Saga - S02E23.mkv",
            "Blue.Exorcist.S02E01.VOSTFR.1080p.x264-LIGHTNING.mkv",
            "[SubsPlease] One Piece - 1071 (1080p).mkv",
            "[Group] Mushoku Tensei 2nd Season - 05.mkv",
            "The Expanse Season 03 - 07.mkv",
            "Mob Psycho 100 - S02E05.mkv",
            "Naruto S01E01 VF VOSTFR.mkv",
            "DanMachi S4 - 06.mkv",
        ];

        let movies = [
            "Spirited.Away.2001.1080p.BluRay.x264-GRP.mkv",
            "Akira x264-GRP.mkv",
            "Your Name FRENCH 720p.mkv",
            "1917 (2019) 2160p.mkv",
        ];

        let cases = names
            .iter()
            .map(|name| (*name, MediaKind::Anime))
            .chain(movies.iter().map(|name| (*name, MediaKind::Movie)));
        for (name, kind) in cases {
            let first = parse(name, kind);
            let second = parse(&first.render(), kind);
            assert_eq!(first.slot, second.slot, "slot changed for {name}");
            assert_eq!(first.source, second.source, "source changed for {name}");
            assert_eq!(first.title, second.title, "title changed for {name}");
        }
    }

    #[test]
    fn test_rendered_movie_parses_back() {
        let id = parse("Spirited.Away.2001.1080p.BluRay.x264-GRP.mkv", MediaKind::Movie);
        let rendered = id.render();
        assert_eq!(rendered, "Spirited Away - [Unknown Unknown Unknown] -GRP .mkv");

        let again = parse(&rendered, MediaKind::Movie);
        assert_eq!(again.title, "Spirited Away");
        assert_eq!(again.source.as_deref(), Some("GRP"));
    }
}
