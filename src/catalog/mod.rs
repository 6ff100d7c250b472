//! Media catalog: one independently locked, wholesale-persisted store per kind.
//!
//! Every mutation clones the in-memory map, applies the change, writes the
//! whole document and only then swaps the new map in. A failed write leaves
//! both the file and the in-memory state untouched.

pub mod store;

use serde::Serialize;
use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::config::LibraryConfig;
use crate::domain::{MediaKind, TitleId, season_key};
use crate::library::{self, RetryPolicy, move_path, remove_path, with_retry};
use crate::models::catalog::{FileVariant, Season, Title, TitleContent};
use crate::services::disk::{self, VolumeSpace};
use crate::services::resolver::{MetadataResolver, ResolveError};
use store::{JsonFile, StoreError};

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error("{kind} title {id} is not catalogued")]
    UnknownTitle { kind: MediaKind, id: TitleId },

    #[error("title {id} has no season {season}")]
    UnknownSeason { id: TitleId, season: String },

    #[error("operation does not apply to {kind} title {id}")]
    KindMismatch { kind: MediaKind, id: TitleId },

    #[error("title {0} is banned")]
    Banned(TitleId),

    #[error("no usable storage root for {0}")]
    NoStorageRoot(MediaKind),

    #[error("destination already exists: {}", .0.display())]
    DestinationExists(PathBuf),

    #[error("refusing to touch storage root {}", .0.display())]
    RootPath(PathBuf),

    #[error("filesystem error on {}: {source}", path.display())]
    Fs {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl CatalogError {
    fn fs(path: &Path) -> impl FnOnce(io::Error) -> Self + '_ {
        move |source| Self::Fs {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Outcome of [`Catalog::add`].
#[derive(Debug, Clone)]
pub enum Added {
    Created(Title),
    Existing(Title),
}

impl Added {
    #[must_use]
    pub const fn title(&self) -> &Title {
        match self {
            Self::Created(title) | Self::Existing(title) => title,
        }
    }

    #[must_use]
    pub fn into_title(self) -> Title {
        match self {
            Self::Created(title) | Self::Existing(title) => title,
        }
    }

    #[must_use]
    pub const fn is_created(&self) -> bool {
        matches!(self, Self::Created(_))
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ConsistencyReport {
    pub dropped_missing: Vec<TitleId>,
    pub dropped_banned: Vec<TitleId>,
}

impl ConsistencyReport {
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.dropped_missing.is_empty() && self.dropped_banned.is_empty()
    }
}

/// Episodes a season declares but the catalog has no file for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MissingEpisodes {
    pub id: TitleId,
    pub name: String,
    pub season: String,
    pub episodes: Vec<String>,
}

type TitleMap = BTreeMap<TitleId, Title>;

struct CategoryStore {
    kind: MediaKind,
    file: JsonFile,
    titles: Mutex<TitleMap>,
}

impl CategoryStore {
    async fn open(data_dir: &Path, kind: MediaKind) -> Result<Self, StoreError> {
        let file = JsonFile::new(data_dir.join(kind.store_file()));
        let titles: TitleMap = file.load().await?;
        info!(
            kind = %kind,
            titles = titles.len(),
            path = %file.path().display(),
            "Loaded catalog store"
        );
        Ok(Self {
            kind,
            file,
            titles: Mutex::new(titles),
        })
    }

    async fn commit(&self, current: &mut TitleMap, next: TitleMap) -> Result<(), StoreError> {
        self.file.save(&next).await?;
        debug!(kind = %self.kind, titles = next.len(), "Persisted catalog store");
        *current = next;
        Ok(())
    }
}

pub struct Catalog {
    stores: [CategoryStore; 3],
    resolver: Arc<MetadataResolver>,
    space: Arc<dyn VolumeSpace>,
    library: LibraryConfig,
    retry: RetryPolicy,
}

impl Catalog {
    /// Loads the three category stores; unreadable content fails the whole open.
    pub async fn open(
        data_dir: &Path,
        library: LibraryConfig,
        resolver: Arc<MetadataResolver>,
        space: Arc<dyn VolumeSpace>,
        retry: RetryPolicy,
    ) -> Result<Self, StoreError> {
        let stores = [
            CategoryStore::open(data_dir, MediaKind::Anime).await?,
            CategoryStore::open(data_dir, MediaKind::Show).await?,
            CategoryStore::open(data_dir, MediaKind::Movie).await?,
        ];

        Ok(Self {
            stores,
            resolver,
            space,
            library,
            retry,
        })
    }

    fn store(&self, kind: MediaKind) -> &CategoryStore {
        &self.stores[kind.index()]
    }

    #[must_use]
    pub const fn resolver(&self) -> &Arc<MetadataResolver> {
        &self.resolver
    }

    #[must_use]
    pub fn roots(&self, kind: MediaKind) -> &[PathBuf] {
        self.library.roots(kind)
    }

    #[must_use]
    pub const fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    pub async fn free_space(&self, path: &Path) -> io::Result<u64> {
        disk::free_space(&self.space, path).await
    }

    /// Resolves `raw` and returns the catalogued title for it, if any.
    pub async fn find(&self, raw: &str, kind: MediaKind) -> Result<Option<Title>, CatalogError> {
        let meta = self.resolver.resolve(raw, kind).await?;
        Ok(self.get(kind, meta.id).await)
    }

    pub async fn get(&self, kind: MediaKind, id: TitleId) -> Option<Title> {
        self.store(kind).titles.lock().await.get(&id).cloned()
    }

    pub async fn list(&self, kind: MediaKind) -> Vec<Title> {
        self.store(kind).titles.lock().await.values().cloned().collect()
    }

    /// Resolves `raw` and creates the title, with its season directories, if it is new.
    pub async fn add(&self, raw: &str, kind: MediaKind) -> Result<Added, CatalogError> {
        let meta = self.resolver.resolve(raw, kind).await?;
        if self.library.banned_ids.contains(&meta.id) {
            return Err(CatalogError::Banned(meta.id));
        }

        let store = self.store(kind);
        let mut titles = store.titles.lock().await;
        if let Some(existing) = titles.get(&meta.id) {
            return Ok(Added::Existing(existing.clone()));
        }

        let root = self.roomiest_root(kind).await?;
        let mut dir_name = library::title_dir_name(&meta.name, meta.id);
        if titles.values().any(|t| t.path == root.join(&dir_name)) {
            dir_name = format!("{dir_name} [{}]", meta.id);
        }
        let path = root.join(dir_name);
        self.create_dir(&path).await?;

        let mut content = TitleContent::empty(kind);
        if let TitleContent::Anime { seasons } | TitleContent::Show { seasons } = &mut content {
            for info in &meta.seasons {
                let season_path = path.join(library::season_dir_name(info.number));
                self.create_dir(&season_path).await?;
                seasons.insert(
                    season_key(info.number),
                    Season::new(info.number, info.episode_count, season_path),
                );
            }
        }

        let title = Title {
            id: meta.id,
            name: meta.name.clone(),
            path,
            content,
        };

        let mut next = titles.clone();
        next.insert(title.id, title.clone());
        store.commit(&mut titles, next).await?;

        info!(
            event = "title_added",
            kind = %kind,
            title_id = %title.id,
            name = %title.name,
            path = %title.path.display(),
            "Added title to catalog"
        );
        Ok(Added::Created(title))
    }

    /// Writes or overwrites one episode slot of an existing season.
    pub async fn add_episode(
        &self,
        kind: MediaKind,
        id: TitleId,
        season: &str,
        episode: &str,
        variant: FileVariant,
    ) -> Result<(), CatalogError> {
        let store = self.store(kind);
        let mut titles = store.titles.lock().await;
        let mut next = titles.clone();

        let title = next
            .get_mut(&id)
            .ok_or(CatalogError::UnknownTitle { kind, id })?;
        let target = title
            .seasons_mut()
            .ok_or(CatalogError::KindMismatch { kind, id })?
            .get_mut(season)
            .ok_or_else(|| CatalogError::UnknownSeason {
                id,
                season: season.to_string(),
            })?;
        target.episodes.insert(episode.to_string(), variant);
        let complete = target.is_complete();

        store.commit(&mut titles, next).await?;
        info!(
            event = "episode_recorded",
            kind = %kind,
            title_id = %id,
            season,
            episode,
            complete,
            "Recorded episode"
        );
        Ok(())
    }

    /// Movie counterpart of [`Catalog::add_episode`].
    pub async fn set_movie_file(&self, id: TitleId, variant: FileVariant) -> Result<(), CatalogError> {
        let kind = MediaKind::Movie;
        let store = self.store(kind);
        let mut titles = store.titles.lock().await;
        let mut next = titles.clone();

        let title = next
            .get_mut(&id)
            .ok_or(CatalogError::UnknownTitle { kind, id })?;
        let TitleContent::Movie { file } = &mut title.content else {
            return Err(CatalogError::KindMismatch { kind, id });
        };
        *file = Some(variant);

        store.commit(&mut titles, next).await?;
        info!(event = "movie_recorded", title_id = %id, "Recorded movie file");
        Ok(())
    }

    pub async fn delete_movie_file(&self, id: TitleId) -> Result<bool, CatalogError> {
        let store = self.store(MediaKind::Movie);
        let mut titles = store.titles.lock().await;

        let Some(path) = titles
            .get(&id)
            .and_then(Title::movie_file)
            .map(|v| v.path.clone())
        else {
            return Ok(false);
        };
        self.remove(&path).await?;

        let mut next = titles.clone();
        if let Some(Title {
            content: TitleContent::Movie { file },
            ..
        }) = next.get_mut(&id)
        {
            *file = None;
        }
        store.commit(&mut titles, next).await?;
        info!(event = "movie_deleted", title_id = %id, "Deleted movie file");
        Ok(true)
    }

    /// Removes one episode file and its slot; `false` when there is no such slot.
    pub async fn delete_episode(
        &self,
        kind: MediaKind,
        id: TitleId,
        season: &str,
        episode: &str,
    ) -> Result<bool, CatalogError> {
        let store = self.store(kind);
        let mut titles = store.titles.lock().await;

        let Some(path) = titles
            .get(&id)
            .and_then(|t| t.episode(season, episode))
            .map(|v| v.path.clone())
        else {
            return Ok(false);
        };
        self.remove(&path).await?;

        let mut next = titles.clone();
        if let Some(s) = next
            .get_mut(&id)
            .and_then(Title::seasons_mut)
            .and_then(|seasons| seasons.get_mut(season))
        {
            s.episodes.remove(episode);
        }
        store.commit(&mut titles, next).await?;
        info!(
            event = "episode_deleted",
            kind = %kind,
            title_id = %id,
            season,
            episode,
            "Deleted episode"
        );
        Ok(true)
    }

    pub async fn delete_season(
        &self,
        kind: MediaKind,
        id: TitleId,
        season: &str,
    ) -> Result<bool, CatalogError> {
        let store = self.store(kind);
        let mut titles = store.titles.lock().await;

        let Some(path) = titles
            .get(&id)
            .and_then(|t| t.season(season))
            .map(|s| s.path.clone())
        else {
            return Ok(false);
        };
        self.remove(&path).await?;

        let mut next = titles.clone();
        if let Some(seasons) = next.get_mut(&id).and_then(Title::seasons_mut) {
            seasons.remove(season);
        }
        store.commit(&mut titles, next).await?;
        info!(event = "season_deleted", kind = %kind, title_id = %id, season, "Deleted season");
        Ok(true)
    }

    pub async fn delete_title(&self, kind: MediaKind, id: TitleId) -> Result<bool, CatalogError> {
        let store = self.store(kind);
        let mut titles = store.titles.lock().await;

        let Some(path) = titles.get(&id).map(|t| t.path.clone()) else {
            return Ok(false);
        };
        self.ensure_below_root(kind, &path)?;
        self.remove(&path).await?;

        let mut next = titles.clone();
        next.remove(&id);
        store.commit(&mut titles, next).await?;
        info!(event = "title_deleted", kind = %kind, title_id = %id, "Deleted title");
        Ok(true)
    }

    /// Moves a title's directory under `volume` and rebases every stored path.
    pub async fn move_title(
        &self,
        kind: MediaKind,
        id: TitleId,
        volume: &Path,
    ) -> Result<PathBuf, CatalogError> {
        let store = self.store(kind);
        let mut titles = store.titles.lock().await;

        let title = titles
            .get(&id)
            .ok_or(CatalogError::UnknownTitle { kind, id })?;
        let source = title.path.clone();
        self.ensure_below_root(kind, &source)?;
        let dir_name = source
            .file_name()
            .map_or_else(|| library::title_dir_name(&title.name, id).into(), |n| n.to_os_string());
        let destination = volume.join(dir_name);

        if destination == source {
            return Ok(destination);
        }
        if destination.exists() {
            return Err(CatalogError::DestinationExists(destination));
        }

        with_retry(self.retry, "move_title", || move_path(&source, &destination))
            .await
            .map_err(CatalogError::fs(&source))?;
        if !destination.is_dir() {
            return Err(CatalogError::Fs {
                path: destination,
                source: io::Error::new(io::ErrorKind::NotFound, "directory missing after move"),
            });
        }

        let mut next = titles.clone();
        if let Some(t) = next.get_mut(&id) {
            t.relocate(destination.clone());
        }
        if let Err(e) = store.commit(&mut titles, next).await {
            // Keep the store truthful: put the tree back where it is recorded.
            if let Err(undo) = move_path(&destination, &source).await {
                error!(
                    event = "move_rollback_failed",
                    title_id = %id,
                    from = %destination.display(),
                    to = %source.display(),
                    error = %undo,
                    "Catalog write failed and the move could not be undone"
                );
            }
            return Err(e.into());
        }

        info!(
            event = "title_moved",
            kind = %kind,
            title_id = %id,
            from = %source.display(),
            to = %destination.display(),
            "Moved title"
        );
        Ok(destination)
    }

    /// Drops titles whose directory vanished and titles on the ban list.
    pub async fn check_consistency(&self, kind: MediaKind) -> Result<ConsistencyReport, CatalogError> {
        let store = self.store(kind);
        let mut titles = store.titles.lock().await;
        let mut report = ConsistencyReport::default();

        let mut next = titles.clone();
        next.retain(|id, title| {
            if self.library.banned_ids.contains(id) {
                info!(event = "banned_title_dropped", kind = %kind, title_id = %id, "Dropped banned title");
                report.dropped_banned.push(*id);
                false
            } else if !title.path.is_dir() {
                warn!(
                    event = "repaired_inconsistency",
                    kind = %kind,
                    title_id = %id,
                    path = %title.path.display(),
                    "Title directory is gone, dropping catalog entry"
                );
                report.dropped_missing.push(*id);
                false
            } else {
                true
            }
        });

        if !report.is_clean() {
            store.commit(&mut titles, next).await?;
        }
        debug!(kind = %kind, titles = titles.len(), "Consistency check done");
        Ok(report)
    }

    /// Incomplete seasons of every title, specials excluded.
    pub async fn missing_episodes(&self, kind: MediaKind) -> Vec<MissingEpisodes> {
        let titles = self.store(kind).titles.lock().await;
        titles
            .values()
            .filter_map(|title| title.seasons().map(|seasons| (title, seasons)))
            .flat_map(|(title, seasons)| {
                seasons
                    .iter()
                    .filter(|(_, season)| season.number != 0 && !season.is_complete())
                    .map(move |(key, season)| MissingEpisodes {
                        id: title.id,
                        name: title.name.clone(),
                        season: key.clone(),
                        episodes: season.missing_episodes(),
                    })
                    .filter(|m| !m.episodes.is_empty())
            })
            .collect()
    }

    async fn roomiest_root(&self, kind: MediaKind) -> Result<PathBuf, CatalogError> {
        let mut best: Option<(u64, &PathBuf)> = None;
        for root in self.library.roots(kind) {
            match self.free_space(root).await {
                Ok(free) if best.is_none_or(|(b, _)| free > b) => best = Some((free, root)),
                Ok(_) => {}
                Err(e) => {
                    warn!(root = %root.display(), error = %e, "Could not read free space, skipping root");
                }
            }
        }
        best.map(|(_, root)| root.clone())
            .ok_or(CatalogError::NoStorageRoot(kind))
    }

    /// Title paths must sit strictly below a storage root.
    fn ensure_below_root(&self, kind: MediaKind, path: &Path) -> Result<(), CatalogError> {
        let is_root = MediaKind::ALL
            .iter()
            .flat_map(|k| self.library.roots(*k))
            .chain(self.library.intake(kind))
            .any(|root| root.as_path() == path);
        if is_root || path.file_name().is_none() {
            error!(kind = %kind, path = %path.display(), "Title path is a storage root, refusing");
            return Err(CatalogError::RootPath(path.to_path_buf()));
        }
        Ok(())
    }

    async fn create_dir(&self, path: &Path) -> Result<(), CatalogError> {
        with_retry(self.retry, "create_dir", || tokio::fs::create_dir_all(path))
            .await
            .map_err(CatalogError::fs(path))
    }

    /// Filesystem half of a delete. A target that is already gone is repaired, not an error.
    async fn remove(&self, path: &Path) -> Result<(), CatalogError> {
        match with_retry(self.retry, "remove", || remove_path(path)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                warn!(
                    event = "repaired_inconsistency",
                    path = %path.display(),
                    "Path already gone, dropping catalog entry"
                );
                Ok(())
            }
            Err(source) => Err(CatalogError::Fs {
                path: path.to_path_buf(),
                source,
            }),
        }
    }
}
