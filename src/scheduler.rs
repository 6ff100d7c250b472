use anyhow::Result;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tokio::time::{Duration, MissedTickBehavior, interval};
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{debug, error, info, warn};

use crate::catalog::store::JsonFile;
use crate::config::SchedulerConfig;
use crate::domain::MediaKind;
use crate::state::AppState;

/// Runs the sort, missing-episode and balance workers on their own cadences.
///
/// Each worker loops on its own timer and awaits its run before the next
/// tick, so a worker never overlaps with itself.
pub struct Scheduler {
    state: AppState,
    config: SchedulerConfig,
    running: Arc<RwLock<bool>>,
}

impl Scheduler {
    pub fn new(state: AppState, config: SchedulerConfig) -> Self {
        Self {
            state,
            config,
            running: Arc::new(RwLock::new(false)),
        }
    }

    pub async fn start(&self) -> Result<()> {
        if !self.config.enabled {
            info!("Scheduler is disabled in config");
            return Ok(());
        }

        *self.running.write().await = true;
        info!("Starting background scheduler");

        let sort_every = Duration::from_secs(self.config.sort_interval_seconds);
        let missing_every = Duration::from_secs(self.config.missing_interval_minutes * 60);

        let sort = {
            let state = self.state.clone();
            self.worker("sort", sort_every, move || {
                let state = state.clone();
                async move {
                    state.sorter.run_all().await;
                }
            })
        };

        let missing = {
            let state = self.state.clone();
            self.worker("missing", missing_every, move || {
                let state = state.clone();
                async move {
                    if let Err(e) = write_missing_reports(&state).await {
                        error!("Missing episode report failed: {e:#}");
                    }
                }
            })
        };

        let balance = async {
            if let Some(cron_expr) = self.config.balance_cron.clone() {
                self.balance_with_cron(&cron_expr).await
            } else {
                let state = self.state.clone();
                let every = Duration::from_secs(self.config.balance_interval_hours * 60 * 60);
                self.worker("balance", every, move || {
                    let state = state.clone();
                    async move {
                        if let Err(e) = state.balancer.run_all().await {
                            error!("Scheduled balance failed: {e:#}");
                        }
                    }
                })
                .await;
                Ok(())
            }
        };

        let ((), (), balanced) = tokio::join!(sort, missing, balance);
        balanced
    }

    async fn worker<F, Fut>(&self, name: &'static str, every: Duration, mut job: F)
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = ()>,
    {
        info!(worker = name, every_secs = every.as_secs(), "Worker scheduled");
        let mut ticker = interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;
            if !*self.running.read().await {
                break;
            }
            debug!(worker = name, "Worker run starting");
            job().await;
        }
        debug!(worker = name, "Worker stopped");
    }

    async fn balance_with_cron(&self, cron_expr: &str) -> Result<()> {
        let mut sched = JobScheduler::new().await?;

        let state = self.state.clone();
        let running = Arc::clone(&self.running);
        let busy = Arc::new(Mutex::new(()));

        let job = Job::new_async(cron_expr, move |_uuid, _lock| {
            let state = state.clone();
            let running = Arc::clone(&running);
            let busy = Arc::clone(&busy);
            Box::pin(async move {
                if !*running.read().await {
                    return;
                }
                let Ok(_guard) = busy.try_lock() else {
                    warn!("Previous balance run still in progress, skipping");
                    return;
                };
                if let Err(e) = state.balancer.run_all().await {
                    error!("Scheduled balance failed: {e:#}");
                }
            })
        })?;

        sched.add(job).await?;
        sched.start().await?;
        info!("Balance worker running with cron: {}", cron_expr);

        loop {
            if !*self.running.read().await {
                break;
            }
            tokio::time::sleep(Duration::from_secs(1)).await;
        }

        sched.shutdown().await?;
        Ok(())
    }

    pub async fn stop(&self) {
        info!("Stopping scheduler...");
        *self.running.write().await = false;
    }

    pub async fn is_running(&self) -> bool {
        *self.running.read().await
    }

    /// One run of every worker, in order.
    pub async fn run_once(&self) -> Result<()> {
        info!("Running all workers once...");
        self.state.sorter.run_all().await;
        write_missing_reports(&self.state).await?;
        self.state.balancer.run_all().await?;
        Ok(())
    }
}

/// Logs the missing episodes of every kind and writes them to `missing_<kind>.json`.
pub async fn write_missing_reports(state: &AppState) -> Result<()> {
    for kind in MediaKind::ALL {
        if !kind.is_episodic() {
            continue;
        }

        let missing = state.catalog.missing_episodes(kind).await;
        let total: usize = missing.iter().map(|m| m.episodes.len()).sum();
        if total > 0 {
            info!(
                event = "missing_episodes",
                kind = %kind,
                seasons = missing.len(),
                episodes = total,
                "Seasons with missing episodes"
            );
        }

        let report = JsonFile::new(
            state
                .config
                .general
                .data_dir
                .join(format!("missing_{kind}.json")),
        );
        report.save(&missing).await?;
    }
    Ok(())
}
