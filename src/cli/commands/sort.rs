//! Sort command handler

use crate::domain::MediaKind;
use crate::state::AppState;

pub async fn cmd_sort(state: &AppState, kinds: &[MediaKind]) -> anyhow::Result<()> {
    for &kind in kinds {
        let summary = state.sorter.run(kind).await;
        println!(
            "{kind}: {} placed, {} replaced, {} discarded, {} skipped, {} failed",
            summary.placed, summary.replaced, summary.discarded, summary.skipped, summary.failed
        );
    }
    Ok(())
}
