pub mod catalog;
pub mod cli;
pub mod clients;
pub mod config;
pub mod constants;
pub mod domain;
pub mod library;
pub mod models;
pub mod parser;
pub mod scheduler;
pub mod services;
pub mod state;

use clap::CommandFactory;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

pub use cli::{Cli, Commands};
pub use config::Config;
use config::GeneralConfig;
use domain::MediaKind;
use scheduler::Scheduler;
use state::AppState;

pub async fn run(cli: Cli, config: Config) -> anyhow::Result<()> {
    init_tracing(&config.general);

    let Some(command) = cli.command else {
        Cli::command().print_help()?;
        return Ok(());
    };

    match command {
        Commands::Init => {
            if Config::create_default_if_missing()? {
                println!("Created config.toml, fill in the storage roots and the TMDB api key.");
            } else {
                println!("config.toml already exists.");
            }
            Ok(())
        }
        Commands::Parse { file, kind, probe } => cli::cmd_parse(&file, kind, probe),
        command => {
            config.validate()?;
            let state = AppState::new(config).await?;
            dispatch(&state, command).await
        }
    }
}

async fn dispatch(state: &AppState, command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Daemon => run_daemon(state.clone()).await,
        Commands::Sort { kind } => cli::cmd_sort(state, &cli::kinds(kind)).await,
        Commands::Balance { kind } => cli::cmd_balance(state, &cli::kinds(kind)).await,
        Commands::Check { kind } => cli::cmd_check(state, &cli::kinds(kind)).await,
        Commands::Missing { kind } => cli::cmd_missing(state, &cli::kinds(kind)).await,
        Commands::List { kind } => cli::cmd_list(state, kind).await,
        Commands::Init | Commands::Parse { .. } => Ok(()),
    }
}

fn init_tracing(general: &GeneralConfig) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&general.log_level));

    let registry = tracing_subscriber::registry().with(env_filter);

    if general.log_format.eq_ignore_ascii_case("json") {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

async fn run_daemon(state: AppState) -> anyhow::Result<()> {
    info!(
        "Mediarr v{} starting in daemon mode...",
        env!("CARGO_PKG_VERSION")
    );

    for kind in MediaKind::ALL {
        let report = state.catalog.check_consistency(kind).await?;
        if !report.is_clean() {
            warn!(
                kind = %kind,
                missing = report.dropped_missing.len(),
                banned = report.dropped_banned.len(),
                "Startup consistency check dropped titles"
            );
        }
    }

    let scheduler = Arc::new(Scheduler::new(state.clone(), state.config.scheduler.clone()));

    let scheduler_handle = {
        let sched = Arc::clone(&scheduler);
        tokio::spawn(async move {
            if let Err(e) = sched.start().await {
                error!("Scheduler error: {}", e);
            }
        })
    };

    info!("Daemon running. Press Ctrl+C to stop.");

    match signal::ctrl_c().await {
        Ok(()) => {
            info!("Shutdown signal received");
        }
        Err(e) => {
            error!("Error listening for shutdown: {}", e);
        }
    }

    scheduler.stop().await;
    scheduler_handle.abort();
    info!("Daemon stopped");

    Ok(())
}
