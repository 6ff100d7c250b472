//! Parse command handler

use anyhow::Context;
use std::path::Path;

use crate::domain::MediaKind;
use crate::models::identity::Slot;
use crate::parser::parse_file;
use crate::services::MediaService;

pub fn cmd_parse(file: &Path, kind: MediaKind, probe: bool) -> anyhow::Result<()> {
    let identity = parse_file(file, kind, probe, &MediaService::new())
        .with_context(|| format!("Could not identify {}", file.display()))?;

    println!("Title:      {}", identity.title);
    match &identity.slot {
        Slot::Episode { season, episode } => {
            println!("Season:     {season}");
            println!("Episode:    {episode}");
        }
        Slot::Movie => println!("Movie"),
    }
    println!("Source:     {}", identity.source.as_deref().unwrap_or("-"));
    println!("Language:   {}", identity.language);
    println!(
        "Resolution: {}",
        identity
            .resolution
            .map_or_else(|| "Unknown".to_string(), |h| format!("{h}p"))
    );
    println!("Codec:      {}", identity.codec);
    println!("Renamed:    {}", identity.render());

    Ok(())
}
