//! Tasks: the schedulable units of a build.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use crate::dataset::{Asset, Dataset};
use crate::tree::LayerNode;

/// Stable identity of a task, derived only from configuration.
///
/// Fetch tasks are keyed by dataset and asset, not by layer, so that layers
/// sharing an asset share one fetch.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TaskId {
  Fetch { dataset_id: String, asset_id: String },
  Step { layer_id: String, index: usize, kind: String },
  Finalize { layer_id: String },
}

impl TaskId {
  /// The layer this task belongs to; `None` for shared fetch tasks.
  pub fn layer_id(&self) -> Option<&str> {
    match self {
      TaskId::Fetch { .. } => None,
      TaskId::Step { layer_id, .. } | TaskId::Finalize { layer_id } => Some(layer_id),
    }
  }
}

impl fmt::Display for TaskId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      TaskId::Fetch { dataset_id, asset_id } => write!(f, "fetch:{}.{}", dataset_id, asset_id),
      TaskId::Step { layer_id, index, kind } => write!(f, "step:{}#{:02}-{}", layer_id, index, kind),
      TaskId::Finalize { layer_id } => write!(f, "finalize:{}", layer_id),
    }
  }
}

/// What a task does when it runs.
#[derive(Debug, Clone)]
pub enum TaskKind {
  /// Retrieve an asset into the task's output directory.
  Fetch { dataset: Arc<Dataset>, asset: Asset },
  /// Run step `index` of `layer`.
  Step { layer: Arc<LayerNode>, index: usize },
  /// Copy the single artifact of the previous task and write provenance.
  Finalize { layer: Arc<LayerNode> },
}

/// One unit of execution.
///
/// A task is complete iff its `output` exists; tasks are rebuilt from the
/// tree every run and never persisted.
#[derive(Debug, Clone)]
pub struct Task {
  pub id: TaskId,
  pub kind: TaskKind,
  /// Declared output location.
  pub output: PathBuf,
  /// The single predecessor, or `None` for the head of a chain.
  pub depends_on: Option<TaskId>,
  /// Output location of the predecessor, which is this task's input.
  pub input: Option<PathBuf>,
}

impl Task {
  pub fn is_complete(&self) -> bool {
    self.output.exists()
  }
}

/// The ordered tasks building one layer.
#[derive(Debug, Clone)]
pub struct TaskChain {
  pub layer_id: String,
  pub tasks: Vec<Task>,
}

impl TaskChain {
  pub fn last(&self) -> Option<&Task> {
    self.tasks.last()
  }

  pub fn task_ids(&self) -> Vec<TaskId> {
    self.tasks.iter().map(|t| t.id.clone()).collect()
  }
}
