//! Implementation of the `layerpack list` command.

use std::path::Path;

use anyhow::Result;

use crate::output::{OutputFormat, print_json, symbols};

pub fn cmd_list(project_dir: &Path, pattern: Option<&str>, format: OutputFormat) -> Result<()> {
  let (_, tree) = super::load_tree(project_dir, pattern)?;
  let layers = tree.selected_layers();

  if format.is_json() {
    let items: Vec<_> = layers
      .iter()
      .map(|entry| {
        let layer = &entry.layer;
        serde_json::json!({
          "id": layer.id,
          "title": layer.title,
          "group": entry.group_path,
          "dataset": layer.input.dataset.id,
          "asset": layer.input.asset.id,
          "kind": layer.input.asset.kind.as_str(),
          "steps": layer.steps.len(),
        })
      })
      .collect();
    print_json(&items)?;
    return Ok(());
  }

  for entry in &layers {
    let layer = &entry.layer;
    let group = if entry.group_path.is_empty() {
      String::new()
    } else {
      format!("{} / ", entry.group_path.join(" / "))
    };
    println!(
      "  {} {} ({}{}) {}.{} [{}]",
      symbols::INFO,
      layer.id,
      group,
      layer.title,
      layer.input.dataset.id,
      layer.input.asset.id,
      layer.input.asset.kind.as_str()
    );
  }

  Ok(())
}
