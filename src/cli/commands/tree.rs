//! Tree listing and collapse commands.

use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::library::Library;
use crate::model::{NodeId, NodeKind};
use crate::tree::Tree;

/// Print the release tree of a directory
pub fn cmd_tree(config: Config, path: &Path) -> anyhow::Result<()> {
    let library = Library::new(config);
    let tree = library.build_tree(path)?;
    print!("{}", tree.outline());
    println!(
        "\n{} releases, {} tracks",
        count_kind(&tree, tree.root(), NodeKind::Release),
        count_kind(&tree, tree.root(), NodeKind::Track)
    );
    Ok(())
}

/// Flatten nested release directories
pub fn cmd_collapse(config: Config, path: &Path, dry_run: bool) -> anyhow::Result<()> {
    let library = Library::new(config);
    let mut tree = library.build_tree(path)?;

    if dry_run {
        println!("[DRY RUN MODE - No files will be moved]\n");
        let moves = planned_moves(&tree);
        for (from, to) in &moves {
            println!("WOULD MOVE: {} -> {}", from.display(), to.display());
        }
        println!("\n{} tracks would move", moves.len());
        return Ok(());
    }

    let root = tree.root();
    library.collapse(&mut tree, root)?;
    print!("{}", tree.outline());
    Ok(())
}

/// Tracks below the second level, with the top-level release they land in.
pub(crate) fn planned_moves(tree: &Tree) -> Vec<(PathBuf, PathBuf)> {
    let mut moves = Vec::new();
    let mut stack = vec![tree.root()];
    while let Some(id) = stack.pop() {
        let Ok(node) = tree.node(id) else {
            continue;
        };
        match node.kind() {
            NodeKind::Release => stack.extend(tree.children(id).unwrap_or_default().iter().rev()),
            NodeKind::Track if node.depth() > 2 => {
                if let Some(top) = top_release(tree, id) {
                    let target = top.join(node.file_name());
                    moves.push((node.path().to_path_buf(), target));
                }
            }
            _ => {}
        }
    }
    moves
}

fn top_release(tree: &Tree, mut id: NodeId) -> Option<PathBuf> {
    loop {
        let node = tree.node(id).ok()?;
        if node.depth() == 1 {
            return Some(node.path().to_path_buf());
        }
        id = node.parent()?;
    }
}

fn count_kind(tree: &Tree, id: NodeId, kind: NodeKind) -> usize {
    let own = usize::from(tree.kind(id) == Some(kind) && id != tree.root());
    own + tree
        .children(id)
        .unwrap_or_default()
        .iter()
        .map(|&c| count_kind(tree, c, kind))
        .sum::<usize>()
}
