//! Project configuration.
//!
//! A project is a directory holding the `layers/` and `datasets/`
//! declaration trees, an `assets/` directory of static files, and an
//! optional `layerpack.toml`:
//!
//! ```toml
//! [paths]
//! layers = "layers"
//! datasets = "datasets"
//! assets = "assets"
//! output = "/srv/layerpack"
//! archive = "/private-archive"
//!
//! [build]
//! jobs = 8
//! ```
//!
//! Relative paths resolve against the project directory. The output root is
//! taken from the CLI, then `LAYERPACK_OUTPUT`, then the file, then the
//! per-user data directory.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::consts::PROJECT_FILE;
use crate::dataset::{DatasetCatalog, DatasetError};
use crate::pipeline::BuildLayout;
use crate::platform::paths::{default_output_dir, output_dir_from_env};

#[derive(Debug, Error)]
pub enum ProjectError {
  #[error("project directory not found: {0}")]
  NotFound(PathBuf),

  #[error("failed to read {path}: {source}")]
  Read {
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
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ProjectFile {
  #[serde(default)]
  paths: PathsSection,
  #[serde(default)]
  build: BuildSection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct PathsSection {
  layers: Option<PathBuf>,
  datasets: Option<PathBuf>,
  assets: Option<PathBuf>,
  output: Option<PathBuf>,
  archive: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct BuildSection {
  jobs: Option<usize>,
}

/// Resolved project locations and build defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Project {
  pub root: PathBuf,
  pub layers_dir: PathBuf,
  pub datasets_dir: PathBuf,
  pub assets_dir: PathBuf,
  pub archive_dir: Option<PathBuf>,
  pub output_dir: PathBuf,
  pub jobs: Option<usize>,
}

impl Project {
  /// Load the project rooted at `root`.
  pub fn load(root: &Path) -> Result<Self, ProjectError> {
    if !root.is_dir() {
      return Err(ProjectError::NotFound(root.to_path_buf()));
    }

    let file_path = root.join(PROJECT_FILE);
    let file = if file_path.exists() {
      let content = fs::read_to_string(&file_path).map_err(|source| ProjectError::Read {
        path: file_path.clone(),
        source,
      })?;
      toml::from_str(&content).map_err(|source| ProjectError::Parse {
        path: file_path.clone(),
        source,
      })?
    } else {
      debug!(path = %file_path.display(), "no project file, using defaults");
      ProjectFile::default()
    };

    let resolve = |p: Option<PathBuf>, default: &str| {
      let p = p.unwrap_or_else(|| PathBuf::from(default));
      if p.is_absolute() { p } else { root.join(p) }
    };

    let output_dir = output_dir_from_env()
      .or_else(|| file.paths.output.clone().map(|p| resolve(Some(p), "")))
      .unwrap_or_else(default_output_dir);

    Ok(Self {
      root: root.to_path_buf(),
      layers_dir: resolve(file.paths.layers, "layers"),
      datasets_dir: resolve(file.paths.datasets, "datasets"),
      assets_dir: resolve(file.paths.assets, "assets"),
      archive_dir: file.paths.archive.map(|p| resolve(Some(p), "")),
      output_dir,
      jobs: file.build.jobs,
    })
  }

  /// Replace the output root, e.g. from a command-line flag.
  pub fn with_output_dir(mut self, output_dir: PathBuf) -> Self {
    self.output_dir = output_dir;
    self
  }

  pub fn catalog(&self) -> Result<DatasetCatalog, DatasetError> {
    DatasetCatalog::load(&self.datasets_dir)
  }

  pub fn layout(&self) -> BuildLayout {
    BuildLayout::new(&self.output_dir)
  }
}
