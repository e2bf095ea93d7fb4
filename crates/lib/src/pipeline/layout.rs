//! Output locations of every task kind under the output root.

use std::path::{Path, PathBuf};

use crate::consts::{FETCH_DIR, FINAL_DIR, WIP_DIR};

/// Directory layout of a build output root.
///
/// ```text
/// <root>/fetch/<dataset>.<asset>/
/// <root>/wip/<layer>/<NN>-<step kind>/
/// <root>/final/<group>/.../<layer title>/
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildLayout {
  root: PathBuf,
}

impl BuildLayout {
  pub fn new(root: &Path) -> Self {
    Self { root: root.to_path_buf() }
  }

  pub fn root(&self) -> &Path {
    &self.root
  }

  pub fn fetch_root(&self) -> PathBuf {
    self.root.join(FETCH_DIR)
  }

  pub fn wip_root(&self) -> PathBuf {
    self.root.join(WIP_DIR)
  }

  pub fn final_root(&self) -> PathBuf {
    self.root.join(FINAL_DIR)
  }

  pub fn fetch_dir(&self, dataset_id: &str, asset_id: &str) -> PathBuf {
    self.fetch_root().join(datasource_dirname(dataset_id, asset_id))
  }

  pub fn step_dir(&self, layer_id: &str, index: usize, kind: &str) -> PathBuf {
    self.wip_root().join(layer_id).join(format!("{:02}-{}", index, kind))
  }

  pub fn final_dir(&self, group_path: &[String], title: &str) -> PathBuf {
    self.final_root().join(final_relpath(group_path, title))
  }
}

/// A layer's final directory relative to `final/`.
pub fn final_relpath(group_path: &[String], title: &str) -> PathBuf {
  group_path
    .iter()
    .map(|group| path_component(group))
    .chain(std::iter::once(path_component(title)))
    .collect()
}

/// Name of a fetch directory: `<dataset>.<asset>`.
pub fn datasource_dirname(dataset_id: &str, asset_id: &str) -> String {
  format!("{}.{}", dataset_id, asset_id)
}

/// Titles are free text; keep them to a single, visible path component.
fn path_component(name: &str) -> String {
  let name = name.replace(['/', '\\'], "-");
  match name.strip_prefix('.') {
    Some(rest) => format!("_{}", rest),
    None => name,
  }
}
