use serde::{Deserialize, Serialize};

/// Track summary of a video file as reported by the media-inspection tool.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaInfo {
    pub video_codec: Option<String>,
    pub height: Option<u32>,
    pub audio_languages: Vec<String>,
    pub subtitle_languages: Vec<String>,
}

impl MediaInfo {
    #[must_use]
    pub fn has_multiple_subtitle_languages(&self) -> bool {
        distinct(&self.subtitle_languages) > 1
    }

    #[must_use]
    pub fn has_multiple_audio_languages(&self) -> bool {
        distinct(&self.audio_languages) > 1
    }

    #[must_use]
    pub fn has_french_subtitles(&self) -> bool {
        self.subtitle_languages.iter().any(|l| is_french(l))
    }

    #[must_use]
    pub fn has_japanese_audio(&self) -> bool {
        self.audio_languages.iter().any(|l| is_japanese(l))
    }

    /// Codec label as stored in file variants (upper case).
    #[must_use]
    pub fn codec_label(&self) -> Option<String> {
        self.video_codec.as_deref().map(str::to_uppercase)
    }
}

fn distinct(languages: &[String]) -> usize {
    let mut seen: Vec<String> = languages.iter().map(|l| l.to_lowercase()).collect();
    seen.sort();
    seen.dedup();
    seen.len()
}

fn is_french(lang: &str) -> bool {
    matches!(lang.to_lowercase().as_str(), "fre" | "fra" | "fr" | "french")
}

fn is_japanese(lang: &str) -> bool {
    matches!(lang.to_lowercase().as_str(), "jpn" | "ja" | "japanese")
}
