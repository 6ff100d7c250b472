use anyhow::Context;
use std::sync::Arc;

use crate::catalog::Catalog;
use crate::clients::{MetadataProvider, TmdbClient};
use crate::config::Config;
use crate::library::RetryPolicy;
use crate::services::disk::{DfSpace, VolumeSpace};
use crate::services::{
    MediaProbe, MediaService, MetadataResolver, Sorter, StorageBalancer, VersionArbiter,
};

/// Everything a worker or a command needs, wired once at startup.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,

    pub resolver: Arc<MetadataResolver>,

    pub catalog: Arc<Catalog>,

    pub balancer: Arc<StorageBalancer>,

    pub sorter: Arc<Sorter>,
}

impl AppState {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let provider = Arc::new(TmdbClient::new(&config.tmdb).context("Failed to build TMDB client")?);
        Self::with_collaborators(config, provider, Arc::new(MediaService::new()), Arc::new(DfSpace)).await
    }

    /// Wires the state around the given external collaborators.
    pub async fn with_collaborators(
        config: Config,
        provider: Arc<dyn MetadataProvider>,
        probe: Arc<dyn MediaProbe>,
        space: Arc<dyn VolumeSpace>,
    ) -> anyhow::Result<Self> {
        let data_dir = config.general.data_dir.clone();
        tokio::fs::create_dir_all(&data_dir)
            .await
            .with_context(|| format!("Failed to create data directory {}", data_dir.display()))?;

        let resolver = Arc::new(
            MetadataResolver::open(&data_dir, provider)
                .await
                .context("Failed to load resolver caches")?,
        );

        let catalog = Arc::new(
            Catalog::open(
                &data_dir,
                config.library.clone(),
                Arc::clone(&resolver),
                space,
                RetryPolicy::from(&config.filesystem),
            )
            .await
            .context("Failed to load catalog")?,
        );

        let balancer = Arc::new(StorageBalancer::new(
            Arc::clone(&catalog),
            config.balancer.clone(),
        ));

        let sorter = Arc::new(Sorter::new(
            Arc::clone(&catalog),
            Arc::clone(&balancer),
            VersionArbiter::new(config.arbiter.privileged_group.clone()),
            probe,
            config.library.clone(),
        ));

        Ok(Self {
            config: Arc::new(config),
            resolver,
            catalog,
            balancer,
            sorter,
        })
    }
}
