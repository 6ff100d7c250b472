//! Missing episodes command handler

use crate::domain::MediaKind;
use crate::scheduler::write_missing_reports;
use crate::state::AppState;

pub async fn cmd_missing(state: &AppState, kinds: &[MediaKind]) -> anyhow::Result<()> {
    let mut any = false;

    for &kind in kinds.iter().filter(|k| k.is_episodic()) {
        for entry in state.catalog.missing_episodes(kind).await {
            any = true;
            println!(
                "{} [{}] S{}: {}",
                entry.name,
                entry.id,
                entry.season,
                entry.episodes.join(", ")
            );
        }
    }

    if !any {
        println!("No missing episodes.");
    }

    write_missing_reports(state).await
}
