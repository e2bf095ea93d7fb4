//! Implementation of the `layerpack tree` command.

use std::path::Path;

use anyhow::Result;

use crate::output::print_stat;

/// Print the compiled layer tree, marking layers outside the selection.
pub fn cmd_tree(project_dir: &Path, pattern: Option<&str>) -> Result<()> {
  let (_, tree) = super::load_tree(project_dir, pattern)?;

  println!("{}", tree.render());

  if pattern.is_some() {
    println!();
    print_stat(
      "Selected",
      &format!("{} of {} layers", tree.selected_layers().len(), tree.layers().len()),
    );
  }

  Ok(())
}
