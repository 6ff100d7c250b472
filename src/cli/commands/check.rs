//! Consistency check command handler

use crate::domain::MediaKind;
use crate::state::AppState;

pub async fn cmd_check(state: &AppState, kinds: &[MediaKind]) -> anyhow::Result<()> {
    for &kind in kinds {
        let report = state.catalog.check_consistency(kind).await?;
        if report.is_clean() {
            println!("{kind}: catalog consistent");
            continue;
        }

        for id in &report.dropped_missing {
            println!("{kind}: dropped {id} (directory missing)");
        }
        for id in &report.dropped_banned {
            println!("{kind}: dropped {id} (banned)");
        }
    }
    Ok(())
}
