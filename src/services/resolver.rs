//! Maps fuzzy title guesses to provider records.
//!
//! Every media kind keeps two documents in the data directory: a title
//! cache (raw guess or canonical name -> canonical name) and a snapshot of
//! the full provider record per id. Entries are only ever added.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::catalog::store::{JsonFile, StoreError};
use crate::clients::{MetadataProvider, ProviderError};
use crate::domain::{MediaKind, TitleId};
use crate::models::metadata::{SearchHit, TitleMetadata};

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("no provider match for '{0}'")]
    NoMatch(String),

    #[error("provider error: {0}")]
    Provider(#[from] ProviderError),
}

struct KindCache {
    titles: BTreeMap<String, String>,
    snapshots: BTreeMap<TitleId, TitleMetadata>,
    by_name: HashMap<String, TitleId>,
    titles_file: JsonFile,
    snapshots_file: JsonFile,
}

impl KindCache {
    async fn open(data_dir: &Path, kind: MediaKind) -> Result<Self, StoreError> {
        let titles_file = JsonFile::new(data_dir.join(format!("titles_{kind}.json")));
        let snapshots_file = JsonFile::new(data_dir.join(format!("metadata_{kind}.json")));

        let titles: BTreeMap<String, String> = titles_file.load().await?;
        let snapshots: BTreeMap<TitleId, TitleMetadata> = snapshots_file.load().await?;
        let by_name = snapshots
            .values()
            .map(|meta| (meta.name.clone(), meta.id))
            .collect();

        Ok(Self {
            titles,
            snapshots,
            by_name,
            titles_file,
            snapshots_file,
        })
    }

    fn lookup(&self, raw: &str) -> Option<&TitleMetadata> {
        let name = self.titles.get(raw)?;
        let id = self.by_name.get(name)?;
        self.snapshots.get(id)
    }

    async fn record(&mut self, raw: &str, meta: &TitleMetadata) {
        self.titles.insert(raw.to_string(), meta.name.clone());
        self.titles.insert(meta.name.clone(), meta.name.clone());
        self.by_name.insert(meta.name.clone(), meta.id);
        self.snapshots.insert(meta.id, meta.clone());

        // Losing a cache write only costs a repeated lookup later.
        if let Err(e) = self.titles_file.save(&self.titles).await {
            warn!(event = "resolver_cache_write_failed", error = %e, "Failed to persist title cache");
        }
        if let Err(e) = self.snapshots_file.save(&self.snapshots).await {
            warn!(event = "resolver_cache_write_failed", error = %e, "Failed to persist metadata snapshot");
        }
    }
}

pub struct MetadataResolver {
    provider: Arc<dyn MetadataProvider>,
    caches: [Mutex<KindCache>; 3],
}

impl MetadataResolver {
    pub async fn open(
        data_dir: &Path,
        provider: Arc<dyn MetadataProvider>,
    ) -> Result<Self, StoreError> {
        let caches = [
            Mutex::new(KindCache::open(data_dir, MediaKind::Anime).await?),
            Mutex::new(KindCache::open(data_dir, MediaKind::Show).await?),
            Mutex::new(KindCache::open(data_dir, MediaKind::Movie).await?),
        ];
        Ok(Self { provider, caches })
    }

    fn cache(&self, kind: MediaKind) -> &Mutex<KindCache> {
        &self.caches[kind.index()]
    }

    /// Canonical record for a raw title guess.
    pub async fn resolve(&self, raw: &str, kind: MediaKind) -> Result<TitleMetadata, ResolveError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(ResolveError::NoMatch(String::new()));
        }

        if let Some(meta) = self.cache(kind).lock().await.lookup(raw) {
            debug!(kind = %kind, raw, id = %meta.id, "Title cache hit");
            return Ok(meta.clone());
        }

        let hit = self.search(raw, kind).await?;
        let cached = self.cache(kind).lock().await.snapshots.get(&hit.id).cloned();
        let meta = match cached {
            Some(meta) => meta,
            None => self.provider.fetch(hit.id, kind).await?,
        };

        info!(
            event = "title_resolved",
            kind = %kind,
            raw,
            id = %meta.id,
            name = %meta.name,
            "Resolved title"
        );
        self.cache(kind).lock().await.record(raw, &meta).await;
        Ok(meta)
    }

    /// Record for a known id, from the snapshot when available.
    pub async fn by_id(&self, id: TitleId, kind: MediaKind) -> Result<TitleMetadata, ResolveError> {
        if let Some(meta) = self.cache(kind).lock().await.snapshots.get(&id) {
            return Ok(meta.clone());
        }

        let meta = self.provider.fetch(id, kind).await?;
        let name = meta.name.clone();
        self.cache(kind).lock().await.record(&name, &meta).await;
        Ok(meta)
    }

    /// Top search hit, dropping trailing words from the query while nothing matches.
    async fn search(&self, raw: &str, kind: MediaKind) -> Result<SearchHit, ResolveError> {
        let mut words: Vec<&str> = raw.split_whitespace().collect();

        loop {
            let query = words.join(" ");
            let hits = self.provider.search(&query, kind).await?;
            if let Some(hit) = hits.into_iter().next() {
                return Ok(hit);
            }
            if words.len() <= 1 {
                return Err(ResolveError::NoMatch(raw.to_string()));
            }
            words.pop();
            debug!(kind = %kind, raw, query = %words.join(" "), "No match, retrying shorter query");
        }
    }
}
