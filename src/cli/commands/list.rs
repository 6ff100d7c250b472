//! List titles command handler

use crate::domain::MediaKind;
use crate::state::AppState;

pub async fn cmd_list(state: &AppState, kind: MediaKind) -> anyhow::Result<()> {
    let titles = state.catalog.list(kind).await;

    if titles.is_empty() {
        println!("No {kind} titles catalogued.");
        return Ok(());
    }

    println!("{} ({} total)", kind, titles.len());
    println!("{:-<70}", "");

    for title in titles {
        match title.seasons() {
            Some(seasons) => {
                let have: usize = seasons.values().map(|s| s.episodes.len()).sum();
                let total: u32 = seasons.values().map(|s| s.episode_count).sum();
                let complete = seasons.values().all(|s| s.is_complete());
                let indicator = if complete { "✓" } else { "•" };
                println!("{indicator} {} [{have}/{total}]", title.name);
            }
            None => {
                let indicator = if title.movie_file().is_some() { "✓" } else { "•" };
                println!("{indicator} {}", title.name);
            }
        }
        println!("  ID: {} | Path: {}", title.id, title.path.display());
    }

    Ok(())
}
