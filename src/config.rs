use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::constants::{VIDEO_EXTENSIONS, balancer, filesystem};
use crate::domain::{MediaKind, TitleId};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub general: GeneralConfig,

    pub library: LibraryConfig,

    pub tmdb: TmdbConfig,

    pub arbiter: ArbiterConfig,

    pub balancer: BalancerConfig,

    pub filesystem: FilesystemConfig,

    pub scheduler: SchedulerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    pub log_level: String,

    /// "text" or "json"
    pub log_format: String,

    /// Number of tokio worker threads (default: 2)
    /// Set to 0 to use the number of CPU cores
    pub worker_threads: usize,

    /// Directory holding the catalog stores and the resolver caches.
    pub data_dir: PathBuf,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: "text".to_string(),
            worker_threads: 2,
            data_dir: PathBuf::from("data"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LibraryConfig {
    pub anime_roots: Vec<PathBuf>,

    pub show_roots: Vec<PathBuf>,

    pub movie_roots: Vec<PathBuf>,

    pub anime_intake: Vec<PathBuf>,

    pub show_intake: Vec<PathBuf>,

    pub movie_intake: Vec<PathBuf>,

    /// Titles purged from the catalog whenever they are seen.
    pub banned_ids: Vec<TitleId>,

    pub video_extensions: Vec<String>,
}

impl Default for LibraryConfig {
    fn default() -> Self {
        Self {
            anime_roots: vec![],
            show_roots: vec![],
            movie_roots: vec![],
            anime_intake: vec![],
            show_intake: vec![],
            movie_intake: vec![],
            banned_ids: vec![],
            video_extensions: VIDEO_EXTENSIONS.iter().map(ToString::to_string).collect(),
        }
    }
}

impl LibraryConfig {
    #[must_use]
    pub fn roots(&self, kind: MediaKind) -> &[PathBuf] {
        match kind {
            MediaKind::Anime => &self.anime_roots,
            MediaKind::Show => &self.show_roots,
            MediaKind::Movie => &self.movie_roots,
        }
    }

    #[must_use]
    pub fn intake(&self, kind: MediaKind) -> &[PathBuf] {
        match kind {
            MediaKind::Anime => &self.anime_intake,
            MediaKind::Show => &self.show_intake,
            MediaKind::Movie => &self.movie_intake,
        }
    }

    #[must_use]
    pub fn is_video(&self, path: &Path) -> bool {
        path.extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .is_some_and(|ext| self.video_extensions.iter().any(|v| *v == ext))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TmdbConfig {
    pub api_key: String,

    pub base_url: String,

    /// Language requested for names, e.g. "fr-FR".
    pub language: String,

    /// Request timeout in seconds (default: 10)
    pub request_timeout_seconds: u64,
}

impl Default for TmdbConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: "https://api.themoviedb.org/3".to_string(),
            language: "fr-FR".to_string(),
            request_timeout_seconds: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ArbiterConfig {
    /// Release group that always wins against any other group.
    pub privileged_group: String,
}

impl Default for ArbiterConfig {
    fn default() -> Self {
        Self {
            privileged_group: "Judas".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BalancerConfig {
    pub target_ratio: f64,

    pub max_moves_per_volume: usize,
}

impl Default for BalancerConfig {
    fn default() -> Self {
        Self {
            target_ratio: balancer::TARGET_RATIO,
            max_moves_per_volume: balancer::MAX_MOVES_PER_VOLUME,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FilesystemConfig {
    pub retry_attempts: u32,

    pub retry_delay_ms: u64,
}

impl Default for FilesystemConfig {
    fn default() -> Self {
        Self {
            retry_attempts: filesystem::RETRY_ATTEMPTS,
            retry_delay_ms: filesystem::RETRY_DELAY_MS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    pub enabled: bool,

    pub sort_interval_seconds: u64,

    pub missing_interval_minutes: u64,

    pub balance_interval_hours: u64,

    /// Overrides `balance_interval_hours` when set.
    pub balance_cron: Option<String>,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            sort_interval_seconds: 60,
            missing_interval_minutes: 10,
            balance_interval_hours: 24,
            balance_cron: None,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let paths = Self::config_paths();

        for path in &paths {
            if path.exists() {
                info!("Loading config from: {}", path.display());
                return Self::load_from_path(path);
            }
        }

        info!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Loads `path` when given, otherwise searches the default locations.
    pub fn load_with_override(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load_from_path(path),
            None => Self::load(),
        }
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        info!("Config saved to: {}", path.display());
        Ok(())
    }

    fn config_paths() -> Vec<PathBuf> {
        let mut paths = vec![];

        paths.push(PathBuf::from("config.toml"));

        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("mediarr").join("config.toml"));
        }

        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".mediarr").join("config.toml"));
        }

        paths
    }

    fn default_config_path() -> PathBuf {
        PathBuf::from("config.toml")
    }

    pub fn create_default_if_missing() -> Result<bool> {
        let path = Self::default_config_path();
        if path.exists() {
            Ok(false)
        } else {
            let config = Self::default();
            config.save_to_path(&path)?;
            info!("Created default config file: {}", path.display());
            Ok(true)
        }
    }

    /// Checks the settings the process cannot run without.
    pub fn validate(&self) -> Result<()> {
        if MediaKind::ALL
            .iter()
            .all(|kind| self.library.roots(*kind).is_empty())
        {
            anyhow::bail!("At least one storage root must be configured");
        }

        for kind in MediaKind::ALL {
            for dir in self
                .library
                .roots(kind)
                .iter()
                .chain(self.library.intake(kind))
            {
                if !dir.is_dir() {
                    anyhow::bail!(
                        "Configured {kind} directory does not exist: {}",
                        dir.display()
                    );
                }
            }
        }

        if self.tmdb.api_key.trim().is_empty() {
            anyhow::bail!("TMDB api key cannot be empty");
        }

        if !(self.balancer.target_ratio > 0.0 && self.balancer.target_ratio <= 1.0) {
            anyhow::bail!("Balancer target ratio must be in (0, 1]");
        }

        if self.scheduler.enabled
            && (self.scheduler.sort_interval_seconds == 0
                || self.scheduler.missing_interval_minutes == 0
                || (self.scheduler.balance_interval_hours == 0
                    && self.scheduler.balance_cron.is_none()))
        {
            anyhow::bail!("Scheduler intervals must be > 0");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn valid_config(root: &Path) -> Config {
        let mut config = Config::default();
        config.library.anime_roots = vec![root.to_path_buf()];
        config.tmdb.api_key = "key".to_string();
        config
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.scheduler.sort_interval_seconds, 60);
        assert_eq!(config.arbiter.privileged_group, "Judas");
        assert_eq!(config.filesystem.retry_attempts, 2);
        assert!((config.balancer.target_ratio - 0.9).abs() < f64::EPSILON);
        assert_eq!(config.tmdb.base_url, "https://api.themoviedb.org/3");
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("[general]"));
        assert!(toml_str.contains("[library]"));
        assert!(toml_str.contains("[scheduler]"));
    }

    #[test]
    fn test_config_deserialization() {
        let toml_str = r#"
            [general]
            log_level = "debug"

            [library]
            show_roots = ["/mnt/a", "/mnt/b"]
            banned_ids = [42]

            [scheduler]
            balance_cron = "0 0 4 * * *"
        "#;

        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.general.log_level, "debug");
        assert_eq!(config.library.roots(MediaKind::Show).len(), 2);
        assert_eq!(config.library.banned_ids, vec![TitleId::new(42)]);
        assert_eq!(config.scheduler.balance_cron.as_deref(), Some("0 0 4 * * *"));

        assert_eq!(config.scheduler.sort_interval_seconds, 60);
    }

    #[test]
    fn test_validate_accepts_existing_dirs() {
        let temp = TempDir::new().unwrap();
        assert!(valid_config(temp.path()).validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_missing_dir() {
        let temp = TempDir::new().unwrap();
        let mut config = valid_config(temp.path());
        config.library.movie_intake = vec![temp.path().join("nope")];
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_missing_key_and_roots() {
        let temp = TempDir::new().unwrap();
        let mut config = valid_config(temp.path());
        config.tmdb.api_key.clear();
        assert!(config.validate().is_err());

        let mut config = valid_config(temp.path());
        config.library.anime_roots.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_is_video() {
        let config = LibraryConfig::default();
        assert!(config.is_video(Path::new("/x/a.MKV")));
        assert!(!config.is_video(Path::new("/x/a.srt")));
    }
}
