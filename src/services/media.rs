use anyhow::{Context, Result};
use std::path::Path;
use tracing::debug;

use crate::models::media::MediaInfo;

/// Inspects the embedded tracks of a video file.
pub trait MediaProbe: Send + Sync {
    fn probe(&self, path: &Path) -> Result<MediaInfo>;
}

/// `ffprobe`-backed probe.
pub struct MediaService;

impl Default for MediaService {
    fn default() -> Self {
        Self::new()
    }
}

impl MediaService {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl MediaProbe for MediaService {
    fn probe(&self, path: &Path) -> Result<MediaInfo> {
        let output = ffprobe::ffprobe(path)
            .with_context(|| format!("Failed to run ffprobe on {}", path.display()))?;

        let video_stream = output
            .streams
            .iter()
            .find(|s| s.codec_type.as_deref() == Some("video"))
            .context("No video stream found")?;

        let languages = |kind: &str| -> Vec<String> {
            output
                .streams
                .iter()
                .filter(|s| s.codec_type.as_deref() == Some(kind))
                .filter_map(|s| s.tags.as_ref().and_then(|t| t.language.clone()))
                .collect()
        };

        let info = MediaInfo {
            video_codec: video_stream.codec_name.clone(),
            height: video_stream.height.and_then(|h| u32::try_from(h).ok()),
            audio_languages: languages("audio"),
            subtitle_languages: languages("subtitle"),
        };

        debug!(
            "Analyzed media {:?}: {:?} {:?}p, audio {:?}, subs {:?}",
            path, info.video_codec, info.height, info.audio_languages, info.subtitle_languages
        );

        Ok(info)
    }
}
