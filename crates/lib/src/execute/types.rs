//! Types for task execution.
//!
//! Error types, per-task states, the run report and the runtime knobs of
//! the scheduler.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use thiserror::Error;

use crate::pipeline::TaskId;

/// Errors that can occur while building the task graph or running a task.
#[derive(Debug, Error)]
pub enum ExecuteError {
  /// A fetch or step collaborator reported failure.
  #[error("{task} failed: {message}")]
  StepExecution { task: TaskId, message: String },

  /// Finalize found zero or several candidate artifacts.
  #[error("{task}: expected exactly one .tif or .gpkg artifact in {}, found {}", dir.display(), found.len())]
  AmbiguousArtifact {
    task: TaskId,
    dir: PathBuf,
    found: Vec<PathBuf>,
  },

  /// The task graph cannot be scheduled: unknown predecessor, cycle or
  /// conflicting outputs.
  #[error("cannot schedule tasks: {0}")]
  SchedulingDeadlock(String),

  /// Filesystem error while preparing or promoting a task's output.
  #[error("{task}: io error at {}: {source}", path.display())]
  Io {
    task: TaskId,
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  /// The tokio task running the work panicked.
  #[error("{task}: worker panicked: {message}")]
  Panicked { task: TaskId, message: String },
}

impl ExecuteError {
  /// The task this error is scoped to, if any.
  pub fn task(&self) -> Option<&TaskId> {
    match self {
      ExecuteError::StepExecution { task, .. }
      | ExecuteError::AmbiguousArtifact { task, .. }
      | ExecuteError::Io { task, .. }
      | ExecuteError::Panicked { task, .. } => Some(task),
      ExecuteError::SchedulingDeadlock(_) => None,
    }
  }
}

/// Why a task was never started.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockedBy {
  /// An upstream task failed.
  Failed(TaskId),
  /// The abort signal was raised before the task became runnable.
  Aborted,
}

impl fmt::Display for BlockedBy {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      BlockedBy::Failed(id) => write!(f, "upstream failure in {}", id),
      BlockedBy::Aborted => write!(f, "run aborted"),
    }
  }
}

/// State of a single task.
#[derive(Debug, Clone)]
pub enum TaskState {
  Pending,
  Running,
  /// Output location exists. `cached` when it existed before this run.
  Complete { cached: bool },
  /// Output missing, but every consumer downstream is already complete.
  NotRequired,
  Failed(Arc<ExecuteError>),
  Blocked(BlockedBy),
}

impl TaskState {
  pub fn is_complete(&self) -> bool {
    matches!(self, TaskState::Complete { .. })
  }
}

/// Final outcome of one selected layer.
#[derive(Debug, Clone)]
pub enum LayerOutcome {
  /// The chain reached its terminal task.
  Complete,
  /// A task of the chain failed.
  Failed { task: TaskId, error: Arc<ExecuteError> },
  /// The layer has no pipeline (live remote reference).
  Skipped,
  /// The chain was never finished because of an upstream failure or abort.
  Blocked(BlockedBy),
}

impl LayerOutcome {
  pub fn is_ok(&self) -> bool {
    matches!(self, LayerOutcome::Complete | LayerOutcome::Skipped)
  }

  pub fn label(&self) -> &'static str {
    match self {
      LayerOutcome::Complete => "complete",
      LayerOutcome::Failed { .. } => "failed",
      LayerOutcome::Skipped => "skipped",
      LayerOutcome::Blocked(_) => "blocked",
    }
  }
}

/// Outcome of a layer, in tree order.
#[derive(Debug, Clone)]
pub struct LayerReport {
  pub layer_id: String,
  pub outcome: LayerOutcome,
}

/// Result of one run.
#[derive(Debug, Default)]
pub struct RunReport {
  pub tasks: BTreeMap<TaskId, TaskState>,
  pub layers: Vec<LayerReport>,
}

impl RunReport {
  /// True when every selected layer completed or has no pipeline.
  pub fn is_success(&self) -> bool {
    self.layers.iter().all(|l| l.outcome.is_ok())
  }

  pub fn state(&self, id: &TaskId) -> Option<&TaskState> {
    self.tasks.get(id)
  }

  pub fn outcome(&self, layer_id: &str) -> Option<&LayerOutcome> {
    self.layers.iter().find(|l| l.layer_id == layer_id).map(|l| &l.outcome)
  }

  /// Tasks that ran to completion during this run.
  pub fn executed(&self) -> usize {
    self.count(|s| matches!(s, TaskState::Complete { cached: false }))
  }

  /// Tasks whose output already existed.
  pub fn cached(&self) -> usize {
    self.count(|s| matches!(s, TaskState::Complete { cached: true }))
  }

  pub fn failed(&self) -> usize {
    self.count(|s| matches!(s, TaskState::Failed(_)))
  }

  pub fn blocked(&self) -> usize {
    self.count(|s| matches!(s, TaskState::Blocked(_)))
  }

  /// Every task failure, in task order.
  pub fn failures(&self) -> impl Iterator<Item = (&TaskId, &ExecuteError)> {
    self.tasks.iter().filter_map(|(id, state)| match state {
      TaskState::Failed(e) => Some((id, e.as_ref())),
      _ => None,
    })
  }

  fn count(&self, f: impl Fn(&TaskState) -> bool) -> usize {
    self.tasks.values().filter(|s| f(s)).count()
  }
}

/// Cooperative stop request shared between the caller and the scheduler.
///
/// Once raised no new task starts; tasks already running finish.
#[derive(Debug, Clone, Default)]
pub struct AbortSignal(Arc<AtomicBool>);

impl AbortSignal {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn raise(&self) {
    self.0.store(true, Ordering::SeqCst);
  }

  pub fn is_raised(&self) -> bool {
    self.0.load(Ordering::SeqCst)
  }
}

/// Configuration for task execution.
#[derive(Debug, Clone)]
pub struct ExecuteConfig {
  /// Maximum number of tasks running at once.
  pub parallelism: usize,

  /// Raise the abort signal on the first failure.
  pub fail_fast: bool,

  pub abort: AbortSignal,
}

impl Default for ExecuteConfig {
  fn default() -> Self {
    Self {
      parallelism: num_cpus(),
      fail_fast: false,
      abort: AbortSignal::new(),
    }
  }
}

/// Get the number of CPUs for default parallelism.
fn num_cpus() -> usize {
  std::thread::available_parallelism().map(|p| p.get()).unwrap_or(4)
}
