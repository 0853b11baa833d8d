//! Metadata lookup and tagging commands.

use std::path::Path;

use anyhow::Context;
use tokio::runtime::Runtime;

use crate::config::Config;
use crate::library::Library;
use crate::metadata::{FieldAccess, MetadataCollection};

/// Look up candidate metadata for a release
pub fn cmd_search(rt: &Runtime, config: Config, path: &Path) -> anyhow::Result<()> {
    let library = Library::new(config);
    let tree = library.build_tree(path)?;
    let root = tree.root();
    let track_count = tree.count(root)?;

    let candidates = rt.block_on(library.resolve(&tree, root));
    if candidates.is_empty() {
        println!("no match");
        return Ok(());
    }
    print_candidates(&candidates, track_count);
    Ok(())
}

/// Look up metadata, write tags and rename a release
pub fn cmd_tag(
    rt: &Runtime,
    config: Config,
    path: &Path,
    pick: usize,
    dry_run: bool,
    json: bool,
) -> anyhow::Result<()> {
    let library = Library::new(config);
    let mut tree = library.build_tree(path)?;
    let root = tree.root();
    let track_count = tree.count(root)?;

    let candidates = rt.block_on(library.resolve(&tree, root));
    if candidates.is_empty() {
        println!("no match");
        return Ok(());
    }
    let chosen = candidates
        .get(pick)
        .with_context(|| format!("no candidate {pick}, {} found", candidates.len()))?;

    if chosen.track_count() != track_count {
        tracing::warn!(
            on_disk = track_count,
            candidate = chosen.track_count(),
            "Track counts differ, extra tracks keep their tags"
        );
    }

    if dry_run {
        println!("[DRY RUN MODE - No files will be changed]\n");
        println!("{chosen}");
        for (track, record) in tree.tracks(root).zip(chosen.iter()) {
            let node = tree.node(track)?;
            println!(
                "WOULD TAG: {} <- {}",
                node.file_name(),
                record.title.as_deref().unwrap_or_default()
            );
        }
        return Ok(());
    }

    let report = rt
        .block_on(library.apply(&mut tree, root, chosen))
        .with_context(|| format!("tagging {}", path.display()))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!(
        "{}: {} tracks written, {} failed",
        report.status,
        report.tracks_written,
        report.failures.len()
    );
    for failure in &report.failures {
        eprintln!("ERROR {}: {}", failure.path.display(), failure.message);
    }
    if let Some(art) = &report.art {
        println!("Art: {}", art.display());
    }
    print!("{}", tree.outline());
    Ok(())
}

/// Numbered listing; `*` marks candidates with the on-disk track count.
fn print_candidates(candidates: &[MetadataCollection], track_count: usize) {
    for (i, candidate) in candidates.iter().enumerate() {
        let marker = if candidate.track_count() == track_count { "*" } else { " " };
        println!("{marker}[{i}] {} tracks", candidate.track_count());
        println!("{candidate}");
    }
}
