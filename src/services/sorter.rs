//! Intake worker: files dropped in an intake directory are identified,
//! arbitrated against the catalog and moved to their canonical location.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info, warn};
use walkdir::WalkDir;

use crate::catalog::{Catalog, CatalogError};
use crate::config::LibraryConfig;
use crate::domain::{MediaKind, TitleId};
use crate::library::{RetryPolicy, move_path, remove_path, with_retry};
use crate::models::identity::{CandidateIdentity, Slot};
use crate::parser::{self, IdentityError};
use crate::services::arbiter::{VersionArbiter, Verdict};
use crate::services::balancer::StorageBalancer;
use crate::services::media::MediaProbe;

#[derive(Debug, Error)]
pub enum SortError {
    #[error(transparent)]
    Identity(#[from] IdentityError),

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error("not an episode: {}", .0.display())]
    NotEpisode(PathBuf),

    #[error("failed to move {} to {}: {source}", from.display(), to.display())]
    Move {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl SortError {
    /// Errors that only mean "not this file, not now".
    #[must_use]
    pub const fn is_skip(&self) -> bool {
        matches!(
            self,
            Self::Identity(_)
                | Self::NotEpisode(_)
                | Self::Catalog(
                    CatalogError::Resolve(_)
                        | CatalogError::Banned(_)
                        | CatalogError::UnknownSeason { .. }
                )
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SortOutcome {
    Placed { id: TitleId, path: PathBuf },
    Replaced { id: TitleId, path: PathBuf },
    Discarded { id: TitleId },
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SortSummary {
    pub placed: usize,
    pub replaced: usize,
    pub discarded: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl SortSummary {
    fn absorb(&mut self, other: Self) {
        self.placed += other.placed;
        self.replaced += other.replaced;
        self.discarded += other.discarded;
        self.skipped += other.skipped;
        self.failed += other.failed;
    }
}

pub struct Sorter {
    catalog: Arc<Catalog>,
    balancer: Arc<StorageBalancer>,
    arbiter: VersionArbiter,
    probe: Arc<dyn MediaProbe>,
    library: LibraryConfig,
    retry: RetryPolicy,
}

impl Sorter {
    pub fn new(
        catalog: Arc<Catalog>,
        balancer: Arc<StorageBalancer>,
        arbiter: VersionArbiter,
        probe: Arc<dyn MediaProbe>,
        library: LibraryConfig,
    ) -> Self {
        let retry = catalog.retry_policy();
        Self {
            catalog,
            balancer,
            arbiter,
            probe,
            library,
            retry,
        }
    }

    pub async fn run_all(&self) -> SortSummary {
        let mut total = SortSummary::default();
        for kind in MediaKind::ALL {
            total.absorb(self.run(kind).await);
        }
        total
    }

    /// Sorts every video file in the intake directories of `kind`.
    pub async fn run(&self, kind: MediaKind) -> SortSummary {
        let mut summary = SortSummary::default();
        if self.library.intake(kind).is_empty() {
            return summary;
        }

        if let Err(e) = self.catalog.check_consistency(kind).await {
            error!(kind = %kind, error = %e, "Consistency check failed, skipping sort");
            summary.failed += 1;
            return summary;
        }

        let files = match self.scan(kind).await {
            Ok(files) => files,
            Err(e) => {
                error!(kind = %kind, error = %e, "Intake scan failed");
                summary.failed += 1;
                return summary;
            }
        };
        debug!(kind = %kind, files = files.len(), "Scanned intake directories");

        for file in files {
            match self.sort_file(&file, kind).await {
                Ok(SortOutcome::Placed { .. }) => summary.placed += 1,
                Ok(SortOutcome::Replaced { .. }) => summary.replaced += 1,
                Ok(SortOutcome::Discarded { .. }) => summary.discarded += 1,
                Err(e) if e.is_skip() => {
                    warn!(kind = %kind, path = %file.display(), error = %e, "Skipping file");
                    summary.skipped += 1;
                }
                Err(e) => {
                    error!(kind = %kind, path = %file.display(), error = %e, "Failed to sort file");
                    summary.failed += 1;
                }
            }
        }

        if summary != SortSummary::default() {
            info!(
                event = "sort_finished",
                kind = %kind,
                placed = summary.placed,
                replaced = summary.replaced,
                discarded = summary.discarded,
                skipped = summary.skipped,
                failed = summary.failed,
                "Intake sort finished"
            );
        }
        summary
    }

    /// Identifies one file and settles it against its catalog slot.
    pub async fn sort_file(&self, path: &Path, kind: MediaKind) -> Result<SortOutcome, SortError> {
        let candidate = self.identify(path, kind).await?;
        if kind.is_episodic() && candidate.slot == Slot::Movie {
            return Err(SortError::NotEpisode(path.to_path_buf()));
        }

        let title = self.catalog.add(&candidate.title, kind).await?.into_title();
        let (dir, existing) = match &candidate.slot {
            Slot::Episode { season, episode } => {
                let s = title.season(season).ok_or_else(|| CatalogError::UnknownSeason {
                    id: title.id,
                    season: season.clone(),
                })?;
                (s.path.clone(), s.episodes.get(episode).cloned())
            }
            Slot::Movie => (title.path.clone(), title.movie_file().cloned()),
        };

        let renamed = candidate.render_as(&title.name);
        let destination = dir.join(&renamed);
        let incoming = candidate
            .clone()
            .into_variant(renamed.clone(), path.to_path_buf());

        if self.arbiter.arbitrate(existing.as_ref(), &incoming) == Verdict::KeepExisting {
            self.discard(path).await;
            info!(
                event = "candidate_discarded",
                title_id = %title.id,
                file = %candidate.original_filename,
                "Existing file wins, discarded candidate"
            );
            return Ok(SortOutcome::Discarded { id: title.id });
        }

        self.place(path, &destination, kind).await?;

        let variant = candidate.clone().into_variant(renamed, destination.clone());
        let recorded = match &candidate.slot {
            Slot::Episode { season, episode } => {
                self.catalog
                    .add_episode(kind, title.id, season, episode, variant)
                    .await
            }
            Slot::Movie => self.catalog.set_movie_file(title.id, variant).await,
        };
        if let Err(e) = recorded {
            if let Err(undo) = move_path(&destination, path).await {
                error!(
                    from = %destination.display(),
                    to = %path.display(),
                    error = %undo,
                    "Could not return file to intake after catalog failure"
                );
            }
            return Err(e.into());
        }

        let replaced = match existing {
            Some(old) if old.path != destination && old.is_present() => {
                self.discard(&old.path).await;
                true
            }
            Some(old) => old.path == destination,
            None => false,
        };

        info!(
            event = "file_sorted",
            kind = %kind,
            title_id = %title.id,
            file = %candidate.original_filename,
            path = %destination.display(),
            replaced,
            "Sorted file"
        );
        Ok(if replaced {
            SortOutcome::Replaced {
                id: title.id,
                path: destination,
            }
        } else {
            SortOutcome::Placed {
                id: title.id,
                path: destination,
            }
        })
    }

    async fn identify(&self, path: &Path, kind: MediaKind) -> Result<CandidateIdentity, SortError> {
        let probe = Arc::clone(&self.probe);
        let path = path.to_path_buf();
        let candidate =
            tokio::task::spawn_blocking(move || parser::parse_file(&path, kind, true, probe.as_ref()))
                .await??;
        Ok(candidate)
    }

    /// Retried move; when retries run out, one balance pass and one last attempt.
    async fn place(&self, source: &Path, destination: &Path, kind: MediaKind) -> Result<(), SortError> {
        let Err(first) = with_retry(self.retry, "sort_move", || move_path(source, destination)).await
        else {
            return Ok(());
        };

        warn!(
            from = %source.display(),
            to = %destination.display(),
            error = %first,
            "Move failed after retries, balancing storage"
        );
        if let Err(e) = self.balancer.run(kind).await {
            warn!(kind = %kind, error = %e, "Balance pass failed");
        }

        move_path(source, destination).await.map_err(|source_err| {
            error!(
                event = "move_abandoned",
                from = %source.display(),
                to = %destination.display(),
                error = %source_err,
                "Move abandoned"
            );
            SortError::Move {
                from: source.to_path_buf(),
                to: destination.to_path_buf(),
                source: source_err,
            }
        })
    }

    async fn discard(&self, path: &Path) {
        if let Err(e) = with_retry(self.retry, "discard", || remove_path(path)).await {
            warn!(path = %path.display(), error = %e, "Failed to delete losing file");
        }
    }

    async fn scan(&self, kind: MediaKind) -> io::Result<Vec<PathBuf>> {
        let dirs = self.library.intake(kind).to_vec();
        let library = self.library.clone();

        tokio::task::spawn_blocking(move || {
            let mut files: Vec<PathBuf> = dirs
                .iter()
                .flat_map(|dir| WalkDir::new(dir).follow_links(true))
                .filter_map(Result::ok)
                .filter(|e| e.file_type().is_file() && library.is_video(e.path()))
                .map(walkdir::DirEntry::into_path)
                .collect();
            files.sort();
            files
        })
        .await
        .map_err(io::Error::other)
    }
}
