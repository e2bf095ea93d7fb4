//! Loading datasets from a declaration directory.

use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;
use tracing::debug;

use crate::consts::DECLARATION_EXT;
use crate::util::path::is_plain_component;

use super::types::Dataset;

/// Errors raised while loading the dataset catalog.
#[derive(Debug, Error)]
pub enum DatasetError {
  #[error("failed to read {path}: {source}")]
  Read {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to parse dataset declaration {path}: {source}")]
  Parse {
    path: PathBuf,
    #[source]
    source: toml::de::Error,
  },

  #[error("dataset id '{id}' declared in both {first} and {second}")]
  DuplicateDatasetId { id: String, first: PathBuf, second: PathBuf },

  #[error("dataset '{dataset}' declares asset id '{asset}' more than once")]
  DuplicateAssetId { dataset: String, asset: String },

  /// Ids name fetch directories, so they must be plain path components.
  #[error("{kind} id '{id}' cannot be used as a directory name")]
  UnusableId { kind: &'static str, id: String },
}

/// All datasets known to a project, keyed by dataset id.
#[derive(Debug, Clone, Default)]
pub struct DatasetCatalog {
  datasets: BTreeMap<String, (Arc<Dataset>, PathBuf)>,
}

impl DatasetCatalog {
  /// Load every `*.toml` file in `dir` as one dataset declaration.
  ///
  /// A missing directory yields an empty catalog.
  pub fn load(dir: &Path) -> Result<Self, DatasetError> {
    let mut catalog = Self::default();

    if !dir.exists() {
      debug!(dir = %dir.display(), "no dataset directory, catalog is empty");
      return Ok(catalog);
    }

    let entries = fs::read_dir(dir).map_err(|source| DatasetError::Read {
      path: dir.to_path_buf(),
      source,
    })?;

    let mut paths = Vec::new();
    for entry in entries {
      let entry = entry.map_err(|source| DatasetError::Read {
        path: dir.to_path_buf(),
        source,
      })?;
      let path = entry.path();
      if path.is_file() && path.extension().is_some_and(|ext| ext == DECLARATION_EXT) {
        paths.push(path);
      }
    }
    paths.sort();

    for path in paths {
      let content = fs::read_to_string(&path).map_err(|source| DatasetError::Read {
        path: path.clone(),
        source,
      })?;
      let dataset: Dataset = toml::from_str(&content).map_err(|source| DatasetError::Parse {
        path: path.clone(),
        source,
      })?;
      catalog.insert(dataset, path)?;
    }

    debug!(count = catalog.len(), "loaded dataset catalog");
    Ok(catalog)
  }

  /// Add a dataset, validating id uniqueness.
  pub fn insert(&mut self, dataset: Dataset, source: PathBuf) -> Result<(), DatasetError> {
    if !is_plain_component(&dataset.id) {
      return Err(DatasetError::UnusableId {
        kind: "dataset",
        id: dataset.id.clone(),
      });
    }

    let mut seen = HashSet::new();
    for asset in &dataset.assets {
      if !is_plain_component(&asset.id) {
        return Err(DatasetError::UnusableId {
          kind: "asset",
          id: asset.id.clone(),
        });
      }
      if !seen.insert(asset.id.as_str()) {
        return Err(DatasetError::DuplicateAssetId {
          dataset: dataset.id.clone(),
          asset: asset.id.clone(),
        });
      }
    }

    if let Some((_, first)) = self.datasets.get(&dataset.id) {
      return Err(DatasetError::DuplicateDatasetId {
        id: dataset.id.clone(),
        first: first.clone(),
        second: source,
      });
    }

    self.datasets.insert(dataset.id.clone(), (Arc::new(dataset), source));
    Ok(())
  }

  pub fn get(&self, id: &str) -> Option<&Arc<Dataset>> {
    self.datasets.get(id).map(|(dataset, _)| dataset)
  }

  pub fn len(&self) -> usize {
    self.datasets.len()
  }

  pub fn is_empty(&self) -> bool {
    self.datasets.is_empty()
  }

  pub fn iter(&self) -> impl Iterator<Item = &Arc<Dataset>> {
    self.datasets.values().map(|(dataset, _)| dataset)
  }
}
