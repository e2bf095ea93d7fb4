//! Running a single task into its declared output location.
//!
//! Every task writes into a hidden temporary directory next to its output
//! and is renamed onto the output only on success. A crash before the rename
//! leaves at most a stale temporary directory, never a partial output.

use std::path::Path;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, warn};

use crate::consts::TMP_PREFIX;
use crate::dataset::{Asset, Dataset};
use crate::layer::Step;
use crate::pipeline::{Task, TaskId, TaskKind};

use super::finalize;
use super::types::ExecuteError;

/// Diagnostic returned by a failing collaborator.
#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct RunnerError(pub String);

impl RunnerError {
  pub fn new(message: impl Into<String>) -> Self {
    Self(message.into())
  }
}

/// The opaque collaborators that fetch assets and run processing steps.
///
/// Implementations write only into `output_dir`, which exists and is empty
/// when called.
#[async_trait]
pub trait TaskRunner: Send + Sync {
  async fn fetch(&self, dataset: &Dataset, asset: &Asset, output_dir: &Path) -> Result<(), RunnerError>;

  async fn run_step(&self, step: &Step, input_dir: &Path, output_dir: &Path) -> Result<(), RunnerError>;
}

/// Run `task` and atomically promote its output.
pub async fn run_task(task: &Task, runner: &dyn TaskRunner) -> Result<(), ExecuteError> {
  let io_err = |path: &Path| {
    let task = task.id.clone();
    let path = path.to_path_buf();
    move |source| ExecuteError::Io { task, path, source }
  };

  let parent = task
    .output
    .parent()
    .ok_or_else(|| io_err(&task.output)(std::io::Error::other("output has no parent directory")))?;
  std::fs::create_dir_all(parent).map_err(io_err(parent))?;

  let name = task
    .output
    .file_name()
    .map(|n| n.to_string_lossy().into_owned())
    .unwrap_or_default();
  let temp = tempfile::Builder::new()
    .prefix(&format!("{}{}-", TMP_PREFIX, name))
    .tempdir_in(parent)
    .map_err(io_err(parent))?;

  debug!(task = %task.id, temp = %temp.path().display(), "running task");

  // `temp` is removed on drop, so every early return below cleans up
  match &task.kind {
    TaskKind::Fetch { dataset, asset } => runner
      .fetch(dataset, asset, temp.path())
      .await
      .map_err(|e| step_error(&task.id, e))?,
    TaskKind::Step { layer, index } => {
      let step = layer.steps.get(*index).ok_or_else(|| ExecuteError::StepExecution {
        task: task.id.clone(),
        message: format!("layer {} has no step {}", layer.id, index),
      })?;
      let input = input_dir(task)?;
      runner
        .run_step(step, input, temp.path())
        .await
        .map_err(|e| step_error(&task.id, e))?
    }
    TaskKind::Finalize { layer } => finalize::finalize(&task.id, layer, input_dir(task)?, temp.path()).await?,
  }

  promote(temp, task)
}

/// Rename the finished temporary directory onto the task output.
fn promote(temp: tempfile::TempDir, task: &Task) -> Result<(), ExecuteError> {
  let path = temp.keep();
  if let Err(source) = std::fs::rename(&path, &task.output) {
    if let Err(e) = std::fs::remove_dir_all(&path) {
      warn!(path = %path.display(), error = %e, "failed to remove temporary directory");
    }
    return Err(ExecuteError::Io {
      task: task.id.clone(),
      path: task.output.clone(),
      source,
    });
  }
  Ok(())
}

fn input_dir(task: &Task) -> Result<&Path, ExecuteError> {
  task.input.as_deref().ok_or_else(|| ExecuteError::StepExecution {
    task: task.id.clone(),
    message: "task has no input".to_string(),
  })
}

fn step_error(task: &TaskId, err: RunnerError) -> ExecuteError {
  ExecuteError::StepExecution {
    task: task.clone(),
    message: err.0,
  }
}
