//! Compiling a layers directory into a [`Tree`].

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info};

use crate::consts::{DECLARATION_EXT, SETTINGS_FILE};
use crate::dataset::DatasetCatalog;
use crate::layer::{LayerDecl, LayerFile};
use crate::pipeline::final_relpath;
use crate::util::path::is_plain_component;

use super::order::{Child, resolve_order};
use super::types::{GroupNode, GroupSettings, LayerInput, LayerNode, Node, Selection, Tree};

/// Configuration errors. Any of these aborts the compile; no partial tree is produced.
#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("failed to read {path}: {source}")]
  Io {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to parse {path}: {source}")]
  Parse {
    path: PathBuf,
    #[source]
    source: toml::de::Error,
  },

  #[error("layers directory not found: {0}")]
  NotADirectory(PathBuf),

  /// The order declaration does not enumerate the directory's children exactly once each.
  #[error(
    "order declaration in {dir} does not match directory contents (missing: {missing:?}, extra: {extra:?}, duplicated: {duplicates:?})"
  )]
  Ordering {
    dir: PathBuf,
    missing: Vec<String>,
    extra: Vec<String>,
    duplicates: Vec<String>,
  },

  /// A `file:layer_id` order entry matched zero or several layers.
  #[error("order entry '{reference}' in {dir} matches {found} layers, expected exactly 1")]
  UnresolvedReference {
    dir: PathBuf,
    reference: String,
    found: usize,
  },

  #[error("duplicate layer ids: {}", ids.join(", "))]
  DuplicateLayerIds { ids: Vec<String> },

  /// An id or title that cannot name an output directory.
  #[error("layer '{layer}' has an unusable {field} '{value}'")]
  UnusableName {
    layer: String,
    field: &'static str,
    value: String,
  },

  /// Two layers whose final directories are equal or nested.
  #[error("layers '{first}' and '{second}' both build into final/{}", path.display())]
  ConflictingOutput {
    first: String,
    second: String,
    path: PathBuf,
  },

  #[error("layer '{layer}' references unknown dataset '{dataset}'")]
  UnknownDataset { layer: String, dataset: String },

  #[error("layer '{layer}' references unknown asset '{asset}' of dataset '{dataset}'")]
  UnknownAsset {
    layer: String,
    dataset: String,
    asset: String,
  },

  #[error("invalid layer pattern '{pattern}': {source}")]
  InvalidPattern {
    pattern: String,
    #[source]
    source: glob::PatternError,
  },

  #[error("no layers found matching pattern '{pattern}'")]
  NoLayersMatched { pattern: String },
}

/// Compile the layers directory rooted at `layers_dir`.
///
/// `pattern` is a glob matched against layer ids. It only narrows the
/// selection recorded on the tree; the hierarchy is always complete.
pub fn compile(layers_dir: &Path, catalog: &DatasetCatalog, pattern: Option<&str>) -> Result<Tree, ConfigError> {
  let selection = match pattern {
    Some(p) => Selection::pattern(glob::Pattern::new(p).map_err(|source| ConfigError::InvalidPattern {
      pattern: p.to_string(),
      source,
    })?),
    None => Selection::all(),
  };

  if !layers_dir.is_dir() {
    return Err(ConfigError::NotADirectory(layers_dir.to_path_buf()));
  }

  let root = compile_dir(layers_dir, catalog)?;
  let tree = Tree { root, selection };

  check_duplicate_layer_ids(&tree)?;
  check_final_paths(&tree)?;

  let selected = tree.selected_layers().len();
  if selected == 0 {
    return Err(ConfigError::NoLayersMatched {
      pattern: pattern.unwrap_or("*").to_string(),
    });
  }

  info!(
    layers = tree.layers().len(),
    selected,
    pattern = pattern.unwrap_or("*"),
    "compiled layer tree"
  );

  Ok(tree)
}

/// Everything found directly inside one layers directory.
struct DirContents {
  children: Vec<Child>,
  settings: GroupSettings,
}

fn compile_dir(dir: &Path, catalog: &DatasetCatalog) -> Result<GroupNode, ConfigError> {
  let DirContents { children, settings } = read_dir_contents(dir)?;

  let ordered = resolve_order(dir, children, settings.order.as_deref())?;

  let mut nodes = Vec::with_capacity(ordered.len());
  for child in ordered {
    match child {
      Child::Group { name } => nodes.push(Node::Group(compile_dir(&dir.join(&name), catalog)?)),
      Child::Layer { decl, .. } => nodes.push(Node::Layer(Arc::new(resolve_layer(decl, catalog)?))),
    }
  }

  let name = dir
    .file_name()
    .map(|n| n.to_string_lossy().into_owned())
    .unwrap_or_default();

  debug!(group = %name, children = nodes.len(), "compiled group");

  Ok(GroupNode {
    name,
    settings,
    children: nodes,
  })
}

fn read_dir_contents(dir: &Path) -> Result<DirContents, ConfigError> {
  let io_err = |source| ConfigError::Io {
    path: dir.to_path_buf(),
    source,
  };

  let mut entries: Vec<(String, PathBuf)> = Vec::new();
  for entry in fs::read_dir(dir).map_err(io_err)? {
    let entry = entry.map_err(io_err)?;
    let name = entry.file_name().to_string_lossy().into_owned();
    if name.starts_with('.') {
      continue;
    }
    entries.push((name, entry.path()));
  }
  // read_dir order is platform dependent
  entries.sort();

  let mut children = Vec::new();
  let mut settings = GroupSettings::default();

  for (name, path) in entries {
    if path.is_dir() {
      children.push(Child::Group { name });
    } else if name == SETTINGS_FILE {
      settings = parse_toml(&path)?;
    } else if path.extension().is_some_and(|ext| ext == DECLARATION_EXT) {
      let file: LayerFile = parse_toml(&path)?;
      for decl in file.layers {
        children.push(Child::Layer {
          file: name.clone(),
          decl,
        });
      }
    } else {
      debug!(path = %path.display(), "ignoring non-declaration file");
    }
  }

  Ok(DirContents { children, settings })
}

fn parse_toml<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
  let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
    path: path.to_path_buf(),
    source,
  })?;
  toml::from_str(&content).map_err(|source| ConfigError::Parse {
    path: path.to_path_buf(),
    source,
  })
}

fn resolve_layer(decl: LayerDecl, catalog: &DatasetCatalog) -> Result<LayerNode, ConfigError> {
  let unusable = |field, value: &str| ConfigError::UnusableName {
    layer: decl.id.clone(),
    field,
    value: value.to_string(),
  };
  if !is_plain_component(&decl.id) {
    return Err(unusable("id", &decl.id));
  }
  if decl.title.trim().is_empty() {
    return Err(unusable("title", &decl.title));
  }

  let dataset = catalog.get(&decl.input.dataset).ok_or_else(|| ConfigError::UnknownDataset {
    layer: decl.id.clone(),
    dataset: decl.input.dataset.clone(),
  })?;

  let asset = dataset
    .asset(&decl.input.asset)
    .ok_or_else(|| ConfigError::UnknownAsset {
      layer: decl.id.clone(),
      dataset: decl.input.dataset.clone(),
      asset: decl.input.asset.clone(),
    })?
    .clone();

  Ok(LayerNode {
    id: decl.id,
    title: decl.title,
    description: decl.description,
    tags: decl.tags,
    style: decl.style,
    show: decl.show,
    input: LayerInput {
      dataset: Arc::clone(dataset),
      asset,
    },
    steps: decl.steps,
  })
}

/// Leaf ids must be unique across the whole tree, not just within a group.
fn check_duplicate_layer_ids(tree: &Tree) -> Result<(), ConfigError> {
  let mut counts: BTreeMap<String, usize> = BTreeMap::new();
  for id in tree.layer_ids() {
    *counts.entry(id).or_default() += 1;
  }

  let ids: Vec<String> = counts.into_iter().filter(|(_, n)| *n > 1).map(|(id, _)| id).collect();
  if ids.is_empty() {
    Ok(())
  } else {
    Err(ConfigError::DuplicateLayerIds { ids })
  }
}

/// A layer's final directory may neither equal nor contain another's: the
/// outer one would count as complete as soon as the inner one is built.
fn check_final_paths(tree: &Tree) -> Result<(), ConfigError> {
  let mut paths: Vec<(PathBuf, String)> = tree
    .layers()
    .into_iter()
    .filter(|entry| !entry.layer.is_online())
    .map(|entry| (final_relpath(&entry.group_path, &entry.layer.title), entry.layer.id.clone()))
    .collect();
  // Ancestors sort directly before their descendants
  paths.sort();

  for (i, (outer, first)) in paths.iter().enumerate() {
    if let Some((_, second)) = paths[i + 1..].iter().find(|(inner, _)| inner.starts_with(outer)) {
      return Err(ConfigError::ConflictingOutput {
        first: first.clone(),
        second: second.clone(),
        path: outer.clone(),
      });
    }
  }
  Ok(())
}
