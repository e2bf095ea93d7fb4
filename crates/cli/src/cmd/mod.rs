mod build;
mod clean;
mod list;
mod tree;

use std::path::Path;

use anyhow::{Context, Result};

use layerpack_lib::project::Project;
use layerpack_lib::tree::{Tree, compile};

pub use build::{BuildArgs, cmd_build};
pub use clean::cmd_clean;
pub use list::cmd_list;
pub use tree::cmd_tree;

/// Load the project at `project_dir`.
fn load_project(project_dir: &Path) -> Result<Project> {
  Project::load(project_dir).with_context(|| format!("Failed to load project at {}", project_dir.display()))
}

/// Load the project and compile its layer tree.
fn load_tree(project_dir: &Path, pattern: Option<&str>) -> Result<(Project, Tree)> {
  let project = load_project(project_dir)?;
  let catalog = project.catalog().context("Failed to load dataset declarations")?;
  let tree = compile(&project.layers_dir, &catalog, pattern).context("Failed to compile layer tree")?;
  Ok((project, tree))
}
