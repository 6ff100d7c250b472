//! Levels free space between the storage roots of one media kind by
//! relocating whole title directories.
//!
//! Planning is pure and works on tracked numbers only; execution goes through
//! [`Catalog::move_title`] so the store follows every relocation.

use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

use crate::catalog::Catalog;
use crate::config::BalancerConfig;
use crate::constants::balancer::MAX_PASSES;
use crate::domain::{MediaKind, TitleId};
use crate::library::{dir_size, format_size};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TitleDir {
    pub id: TitleId,
    pub size: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VolumeState {
    pub root: PathBuf,
    pub free: u64,
    pub titles: Vec<TitleDir>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relocation {
    pub id: TitleId,
    pub size: u64,
    pub from: PathBuf,
    pub to: PathBuf,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BalanceSummary {
    pub planned: usize,
    pub moved: usize,
    pub failed: usize,
    pub bytes_moved: u64,
}

fn ratio(free: u64, donor_free: u64) -> f64 {
    if donor_free == 0 {
        1.0
    } else {
        free as f64 / donor_free as f64
    }
}

/// Greedy leveling plan.
///
/// Each pass takes the volume with the most tracked free space as donor of
/// space: every volume below `target_ratio` of it hands over its smallest
/// directories. A move transfers the directory size from the donor's tracked
/// free space to the giver's and is only made when it narrows the gap between
/// the two.
#[must_use]
pub fn plan(mut volumes: Vec<VolumeState>, target_ratio: f64, max_moves: usize) -> Vec<Relocation> {
    let mut relocations = Vec::new();
    let mut given = vec![0usize; volumes.len()];

    for _ in 0..MAX_PASSES {
        let Some(donor) = (0..volumes.len()).max_by_key(|&i| (volumes[i].free, std::cmp::Reverse(i)))
        else {
            break;
        };
        let mut moved = false;

        for source in 0..volumes.len() {
            if source == donor {
                continue;
            }

            while given[source] < max_moves
                && ratio(volumes[source].free, volumes[donor].free) < target_ratio
            {
                let gap = volumes[donor].free - volumes[source].free;
                let Some(pos) = smallest(&volumes[source].titles) else {
                    break;
                };
                if volumes[source].titles[pos].size.saturating_mul(2) > gap {
                    break;
                }

                let dir = volumes[source].titles.remove(pos);
                volumes[donor].free -= dir.size;
                volumes[source].free += dir.size;
                given[source] += 1;
                relocations.push(Relocation {
                    id: dir.id,
                    size: dir.size,
                    from: volumes[source].root.clone(),
                    to: volumes[donor].root.clone(),
                });
                volumes[donor].titles.push(dir);
                moved = true;
            }
        }

        if !moved {
            break;
        }
    }

    relocations
}

fn smallest(titles: &[TitleDir]) -> Option<usize> {
    titles
        .iter()
        .enumerate()
        .filter(|(_, t)| t.size > 0)
        .min_by_key(|(_, t)| (t.size, t.id))
        .map(|(i, _)| i)
}

pub struct StorageBalancer {
    catalog: Arc<Catalog>,
    config: BalancerConfig,
}

impl StorageBalancer {
    pub const fn new(catalog: Arc<Catalog>, config: BalancerConfig) -> Self {
        Self { catalog, config }
    }

    /// Reads the current volume state of `kind` and carries out one plan.
    pub async fn run(&self, kind: MediaKind) -> anyhow::Result<BalanceSummary> {
        let roots = self.catalog.roots(kind);
        if roots.len() < 2 {
            return Ok(BalanceSummary::default());
        }

        self.catalog.check_consistency(kind).await?;
        let volumes = self.volumes(kind).await;
        let relocations = plan(
            volumes,
            self.config.target_ratio,
            self.config.max_moves_per_volume,
        );

        let mut summary = BalanceSummary {
            planned: relocations.len(),
            ..BalanceSummary::default()
        };
        for relocation in relocations {
            match self
                .catalog
                .move_title(kind, relocation.id, &relocation.to)
                .await
            {
                Ok(_) => {
                    summary.moved += 1;
                    summary.bytes_moved += relocation.size;
                }
                Err(e) => {
                    summary.failed += 1;
                    warn!(
                        kind = %kind,
                        title_id = %relocation.id,
                        to = %relocation.to.display(),
                        error = %e,
                        "Relocation failed, skipping"
                    );
                }
            }
        }

        info!(
            event = "balance_finished",
            kind = %kind,
            planned = summary.planned,
            moved = summary.moved,
            failed = summary.failed,
            bytes = %format_size(summary.bytes_moved),
            "Storage balance finished"
        );
        Ok(summary)
    }

    pub async fn run_all(&self) -> anyhow::Result<BalanceSummary> {
        let mut total = BalanceSummary::default();
        for kind in MediaKind::ALL {
            let summary = self.run(kind).await?;
            total.planned += summary.planned;
            total.moved += summary.moved;
            total.failed += summary.failed;
            total.bytes_moved += summary.bytes_moved;
        }
        Ok(total)
    }

    async fn volumes(&self, kind: MediaKind) -> Vec<VolumeState> {
        let titles = self.catalog.list(kind).await;
        let mut volumes = Vec::new();

        for root in self.catalog.roots(kind) {
            let free = match self.catalog.free_space(root).await {
                Ok(free) => free,
                Err(e) => {
                    warn!(root = %root.display(), error = %e, "Could not read free space, leaving volume out");
                    continue;
                }
            };

            let mut dirs = Vec::new();
            for title in titles.iter().filter(|t| t.path.parent() == Some(root.as_path())) {
                match dir_size(&title.path).await {
                    Ok(size) => dirs.push(TitleDir { id: title.id, size }),
                    Err(e) => {
                        warn!(title_id = %title.id, error = %e, "Could not size title directory");
                    }
                }
            }

            volumes.push(VolumeState {
                root: root.clone(),
                free,
                titles: dirs,
            });
        }
        volumes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn volume(root: &str, free: u64, sizes: &[(u64, u64)]) -> VolumeState {
        VolumeState {
            root: PathBuf::from(root),
            free,
            titles: sizes
                .iter()
                .map(|&(id, size)| TitleDir {
                    id: TitleId::new(id),
                    size,
                })
                .collect(),
        }
    }

    fn max_gap(volumes: &[VolumeState]) -> u64 {
        let max = volumes.iter().map(|v| v.free).max().unwrap_or(0);
        let min = volumes.iter().map(|v| v.free).min().unwrap_or(0);
        max - min
    }

    fn apply(volumes: &mut [VolumeState], relocation: &Relocation) {
        for v in volumes.iter_mut() {
            if v.root == relocation.from {
                v.free += relocation.size;
            }
            if v.root == relocation.to {
                v.free -= relocation.size;
            }
        }
    }

    // Titles travel onto the roomiest volume, never off it: taking a directory
    // away from the donor would raise its free space and widen the gap.
    #[test]
    fn test_smallest_directory_moves_first() {
        let volumes = vec![volume("/a", 100, &[]), volume("/b", 50, &[(1, 20), (2, 15)])];
        let moves = plan(volumes, 0.9, 25);

        assert_eq!(moves.len(), 1);
        assert_eq!(moves[0].id, TitleId::new(2));
        assert_eq!(moves[0].from, PathBuf::from("/b"));
        assert_eq!(moves[0].to, PathBuf::from("/a"));
    }

    #[test]
    fn test_roomiest_volume_never_gives_titles_away() {
        let volumes = vec![volume("/a", 100, &[(1, 20), (2, 15)]), volume("/b", 50, &[])];
        assert!(plan(volumes, 0.9, 25).is_empty());
    }

    #[test]
    fn test_balanced_volumes_stay_put() {
        let volumes = vec![volume("/a", 100, &[(1, 5)]), volume("/b", 95, &[(2, 5)])];
        assert!(plan(volumes, 0.9, 25).is_empty());
    }

    #[test]
    fn test_every_move_narrows_the_gap() {
        let mut volumes = vec![
            volume("/a", 1000, &[(6, 30), (7, 70)]),
            volume("/b", 300, &[(1, 40), (2, 90), (3, 15), (4, 200), (5, 60)]),
            volume("/c", 550, &[(8, 25)]),
        ];
        let moves = plan(volumes.clone(), 0.9, 25);
        assert!(!moves.is_empty());

        let mut gap = max_gap(&volumes);
        for relocation in &moves {
            apply(&mut volumes, relocation);
            let next = max_gap(&volumes);
            assert!(next <= gap, "gap grew from {gap} to {next}");
            gap = next;
        }
    }

    #[test]
    fn test_stops_when_directory_pool_is_exhausted() {
        let volumes = vec![volume("/a", 100, &[]), volume("/b", 10, &[(1, 20), (2, 15)])];
        let moves = plan(volumes, 0.9, 25);
        assert_eq!(moves.len(), 2);
    }

    #[test]
    fn test_moves_per_volume_are_capped() {
        let titles: Vec<(u64, u64)> = (1..=100).map(|id| (id, 1)).collect();
        let volumes = vec![volume("/a", 10_000, &[]), volume("/b", 0, &titles)];
        let moves = plan(volumes, 0.9, 25);
        assert_eq!(moves.len(), 25);
    }

    #[test]
    fn test_empty_directories_are_not_moved() {
        let volumes = vec![volume("/a", 100, &[]), volume("/b", 10, &[(1, 0)])];
        assert!(plan(volumes, 0.9, 25).is_empty());
    }

    #[test]
    fn test_single_volume_plans_nothing() {
        assert!(plan(vec![volume("/a", 100, &[(1, 10)])], 0.9, 25).is_empty());
        assert!(plan(vec![], 0.9, 25).is_empty());
    }
}
