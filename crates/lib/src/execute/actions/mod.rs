//! Default task runner.
//!
//! Runs command steps through the platform shell and retrieves assets over
//! HTTP or from local directories.

pub mod cmd;
pub mod fetch;

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{debug, info};

use crate::dataset::{Asset, AssetKind, Dataset};
use crate::execute::{RunnerError, TaskRunner};
use crate::layer::Step;
use crate::project::Project;

pub use cmd::run_shell;
pub use fetch::{copy_into, download};

/// [`TaskRunner`] backed by the shell, the network and the local filesystem.
#[derive(Debug, Clone)]
pub struct CommandRunner {
  project_root: PathBuf,
  assets_dir: PathBuf,
  archive_dir: Option<PathBuf>,
  shell: Option<String>,
  client: reqwest::Client,
}

impl CommandRunner {
  pub fn new(project_root: &Path, assets_dir: &Path, archive_dir: Option<&Path>) -> Self {
    Self {
      project_root: project_root.to_path_buf(),
      assets_dir: assets_dir.to_path_buf(),
      archive_dir: archive_dir.map(Path::to_path_buf),
      shell: None,
      client: reqwest::Client::new(),
    }
  }

  pub fn for_project(project: &Project) -> Self {
    Self::new(&project.root, &project.assets_dir, project.archive_dir.as_deref())
  }

  /// Use `shell` instead of the platform default.
  pub fn with_shell(mut self, shell: impl Into<String>) -> Self {
    self.shell = Some(shell.into());
    self
  }

  fn project_path(&self, path: &Path) -> PathBuf {
    if path.is_absolute() {
      path.to_path_buf()
    } else {
      self.project_root.join(path)
    }
  }
}

#[async_trait]
impl TaskRunner for CommandRunner {
  async fn fetch(&self, dataset: &Dataset, asset: &Asset, output_dir: &Path) -> Result<(), RunnerError> {
    info!(dataset = %dataset.id, asset = %asset.id, kind = asset.kind.as_str(), "fetching asset");

    match &asset.kind {
      AssetKind::Http { urls } => {
        if urls.is_empty() {
          return Err(RunnerError::new(format!("{}.{} has no urls", dataset.id, asset.id)));
        }
        for url in urls {
          download(&self.client, url, output_dir).await?;
        }
        Ok(())
      }
      AssetKind::Repository { path } => copy_into(&self.project_path(path), output_dir).await,
      AssetKind::Manual { path } => {
        let archive = self.archive_dir.as_ref().ok_or_else(|| {
          RunnerError::new(format!(
            "{}.{} is a manual asset but no archive directory is configured",
            dataset.id, asset.id
          ))
        })?;
        copy_into(&archive.join(path), output_dir).await
      }
      AssetKind::Cmr { granule_ur, .. } => Err(RunnerError::new(format!(
        "cmr assets are not supported by this runner (granule {})",
        granule_ur
      ))),
      AssetKind::Online { url, .. } => Err(RunnerError::new(format!(
        "online asset {} is never fetched locally",
        url
      ))),
    }
  }

  async fn run_step(&self, step: &Step, input_dir: &Path, output_dir: &Path) -> Result<(), RunnerError> {
    match step {
      Step::Online => {
        debug!("online step, nothing to run");
        Ok(())
      }
      Step::Command { .. } => {
        let args = step.render_args(input_dir, output_dir, &self.assets_dir);
        if args.is_empty() {
          return Err(RunnerError::new("command step has no args"));
        }
        run_shell(&args.join(" "), output_dir, self.shell.as_deref()).await?;
        Ok(())
      }
    }
  }
}
