//! Fakes and fixtures shared by the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

use mediarr::catalog::Catalog;
use mediarr::clients::{MetadataProvider, ProviderError};
use mediarr::config::{Config, LibraryConfig};
use mediarr::domain::{MediaKind, TitleId};
use mediarr::library::RetryPolicy;
use mediarr::models::{MediaInfo, SearchHit, SeasonInfo, TitleMetadata};
use mediarr::services::{MediaProbe, MetadataResolver, VolumeSpace};
use mediarr::state::AppState;

/// In-memory provider answering exact (case-insensitive) queries.
#[derive(Default)]
pub struct FakeProvider {
    entries: Vec<(String, TitleMetadata)>,
    pub searches: AtomicUsize,
}

impl FakeProvider {
    pub fn with(mut self, query: &str, id: u64, name: &str, kind: MediaKind, seasons: &[(u32, u32)]) -> Self {
        self.entries.push((
            query.to_lowercase(),
            TitleMetadata {
                id: TitleId::new(id),
                name: name.to_string(),
                kind,
                seasons: seasons
                    .iter()
                    .map(|&(number, episode_count)| SeasonInfo {
                        number,
                        episode_count,
                    })
                    .collect(),
                alternate_titles: vec![],
                translations: vec![],
            },
        ));
        self
    }

    pub fn search_count(&self) -> usize {
        self.searches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MetadataProvider for FakeProvider {
    async fn search(&self, query: &str, kind: MediaKind) -> Result<Vec<SearchHit>, ProviderError> {
        self.searches.fetch_add(1, Ordering::SeqCst);
        let query = query.to_lowercase();
        Ok(self
            .entries
            .iter()
            .filter(|(q, meta)| *q == query && meta.kind == kind)
            .map(|(_, meta)| SearchHit {
                id: meta.id,
                name: meta.name.clone(),
            })
            .collect())
    }

    async fn fetch(&self, id: TitleId, kind: MediaKind) -> Result<TitleMetadata, ProviderError> {
        self.entries
            .iter()
            .map(|(_, meta)| meta)
            .find(|meta| meta.id == id && meta.kind == kind)
            .cloned()
            .ok_or_else(|| ProviderError::NotFound(id.to_string()))
    }
}

/// Free space per root, fixed by the test.
#[derive(Default)]
pub struct FixedSpace {
    free: Mutex<HashMap<PathBuf, u64>>,
}

impl FixedSpace {
    pub fn set(&self, root: &Path, free: u64) {
        self.free.lock().unwrap().insert(root.to_path_buf(), free);
    }
}

impl VolumeSpace for FixedSpace {
    fn free_space(&self, path: &Path) -> io::Result<u64> {
        Ok(self
            .free
            .lock()
            .unwrap()
            .get(path)
            .copied()
            .unwrap_or(1_000_000_000))
    }
}

/// Reports a 1080p H264 file with Japanese audio and French subtitles.
pub struct FakeProbe;

impl MediaProbe for FakeProbe {
    fn probe(&self, _path: &Path) -> anyhow::Result<MediaInfo> {
        Ok(MediaInfo {
            video_codec: Some("h264".to_string()),
            height: Some(1080),
            audio_languages: vec!["jpn".to_string()],
            subtitle_languages: vec!["fre".to_string()],
        })
    }
}

pub struct TestEnv {
    pub temp: TempDir,
    pub data_dir: PathBuf,
    pub roots: Vec<PathBuf>,
    pub intake: PathBuf,
    pub space: Arc<FixedSpace>,
}

impl TestEnv {
    /// Data dir, one intake dir and `roots` storage volumes, all created.
    pub fn new(roots: usize) -> Self {
        let temp = TempDir::new().unwrap();
        let data_dir = temp.path().join("data");
        let intake = temp.path().join("intake");
        std::fs::create_dir_all(&data_dir).unwrap();
        std::fs::create_dir_all(&intake).unwrap();

        let roots = (0..roots)
            .map(|i| {
                let root = temp.path().join(format!("vol{i}"));
                std::fs::create_dir_all(&root).unwrap();
                root
            })
            .collect();

        Self {
            temp,
            data_dir,
            roots,
            intake,
            space: Arc::new(FixedSpace::default()),
        }
    }

    /// Same roots for every kind, intake for anime only.
    pub fn library(&self) -> LibraryConfig {
        LibraryConfig {
            anime_roots: self.roots.clone(),
            show_roots: self.roots.clone(),
            movie_roots: self.roots.clone(),
            anime_intake: vec![self.intake.clone()],
            ..LibraryConfig::default()
        }
    }

    pub fn config(&self) -> Config {
        let mut config = Config::default();
        config.general.data_dir = self.data_dir.clone();
        config.library = self.library();
        config.tmdb.api_key = "test".to_string();
        config.filesystem.retry_attempts = 0;
        config.filesystem.retry_delay_ms = 0;
        config
    }

    pub async fn catalog(&self, provider: Arc<FakeProvider>, library: LibraryConfig) -> Catalog {
        let resolver = Arc::new(MetadataResolver::open(&self.data_dir, provider).await.unwrap());
        Catalog::open(
            &self.data_dir,
            library,
            resolver,
            self.space.clone(),
            RetryPolicy::none(),
        )
        .await
        .unwrap()
    }

    pub async fn state(&self, provider: Arc<FakeProvider>) -> AppState {
        AppState::with_collaborators(self.config(), provider, Arc::new(FakeProbe), self.space.clone())
            .await
            .unwrap()
    }

    /// Writes `len` bytes to `dir/name` and returns the path.
    pub fn drop_file(&self, dir: &Path, name: &str, len: usize) -> PathBuf {
        std::fs::create_dir_all(dir).unwrap();
        let path = dir.join(name);
        std::fs::write(&path, vec![0u8; len]).unwrap();
        path
    }
}

pub fn anime_provider() -> FakeProvider {
    FakeProvider::default()
        .with("Attack on Titan", 1429, "L'Attaque des Titans", MediaKind::Anime, &[(1, 25), (2, 12)])
        .with("Vinland Saga", 88803, "Vinland Saga", MediaKind::Anime, &[(1, 24), (2, 24)])
        .with("Frieren", 209_867, "Frieren", MediaKind::Anime, &[(1, 2)])
}
