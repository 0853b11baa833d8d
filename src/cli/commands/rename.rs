//! Rename command.

use std::path::Path;

use crate::config::Config;
use crate::library::Library;

/// Rename a release from its current tags
pub fn cmd_rename(config: Config, path: &Path) -> anyhow::Result<()> {
    let library = Library::new(config);
    let mut tree = library.build_tree(path)?;
    let root = tree.root();

    library.format(&mut tree, root)?;
    library.rename(&mut tree, root)?;
    print!("{}", tree.outline());
    Ok(())
}
