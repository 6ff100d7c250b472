//! Balance command handler

use crate::domain::MediaKind;
use crate::library::format_size;
use crate::state::AppState;

pub async fn cmd_balance(state: &AppState, kinds: &[MediaKind]) -> anyhow::Result<()> {
    for &kind in kinds {
        let summary = state.balancer.run(kind).await?;
        if summary.planned == 0 {
            println!("{kind}: volumes already balanced");
            continue;
        }
        println!(
            "{kind}: moved {}/{} titles ({}), {} failed",
            summary.moved,
            summary.planned,
            format_size(summary.bytes_moved),
            summary.failed
        );
    }
    Ok(())
}
