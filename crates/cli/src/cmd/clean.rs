//! Implementation of the `layerpack clean` command.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use layerpack_lib::clean::{CleanOptions, clean};
use layerpack_lib::output_lock::OutputLock;

use crate::output::{OutputFormat, print_info, print_json, print_stat, print_success};

/// Remove build outputs so that the affected tasks run again.
pub fn cmd_clean(
  project_dir: &Path,
  options: CleanOptions,
  output_dir: Option<PathBuf>,
  format: OutputFormat,
) -> Result<()> {
  let project = super::load_project(project_dir)?;
  let project = match output_dir {
    Some(dir) => project.with_output_dir(dir),
    None => project,
  };
  let layout = project.layout();

  if !layout.root().exists() {
    if format.is_json() {
      print_json(&serde_json::json!({ "dry_run": options.dry_run, "removed": [] }))?;
    } else {
      print_info("Nothing to clean.");
    }
    return Ok(());
  }

  let _lock = OutputLock::acquire(layout.root(), "clean").context("Failed to lock output directory")?;
  let result = clean(&layout, &options).context("Clean failed")?;

  if format.is_json() {
    let removed: Vec<String> = result.removed.iter().map(|p| p.display().to_string()).collect();
    print_json(&serde_json::json!({ "dry_run": result.dry_run, "removed": removed }))?;
    return Ok(());
  }

  if result.removed.is_empty() {
    print_info("Nothing to clean.");
    return Ok(());
  }

  if result.dry_run {
    print_info("Dry run, nothing was removed");
  }
  for path in &result.removed {
    println!("  {}", path.display());
  }
  println!();
  if !result.dry_run {
    print_success("Clean complete");
  }
  print_stat(
    if result.dry_run { "Would remove" } else { "Removed" },
    &result.removed.len().to_string(),
  );

  Ok(())
}
