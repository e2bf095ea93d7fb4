//! Task execution.
//!
//! This module runs a [`PipelinePlan`]:
//! - merges its chains into a deduplicated task DAG
//! - skips every task whose output already exists
//! - runs the rest on a bounded pool, each as soon as its dependency completes
//! - blocks everything downstream of a failure while other chains continue

pub mod actions;
mod finalize;
mod graph;
mod runner;
mod types;

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::sync::Arc;

use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::pipeline::{PipelinePlan, TaskChain, TaskId};

pub use actions::CommandRunner;
pub use finalize::{artifact_candidates, provenance};
pub use graph::TaskGraph;
pub use runner::{RunnerError, TaskRunner, run_task};
pub use types::{
  AbortSignal, BlockedBy, ExecuteConfig, ExecuteError, LayerOutcome, LayerReport, RunReport, TaskState,
};

/// Execute every task of `plan`.
///
/// Only tasks whose output is missing and which feed an incomplete
/// downstream task are run. Task failures are reported in the returned
/// [`RunReport`]; an `Err` means the plan could not be scheduled at all.
pub async fn execute(
  plan: &PipelinePlan,
  runner: Arc<dyn TaskRunner>,
  config: &ExecuteConfig,
) -> Result<RunReport, ExecuteError> {
  let graph = TaskGraph::from_plan(plan)?;
  let order = graph.topological()?;

  info!(
    tasks = graph.len(),
    parallelism = config.parallelism,
    fail_fast = config.fail_fast,
    "starting task execution"
  );

  let mut states = initial_states(&graph, &order);

  // Pending tasks still waiting on pending predecessors
  let mut waiting: HashMap<TaskId, usize> = HashMap::new();
  let mut ready: VecDeque<TaskId> = VecDeque::new();
  for task in graph.tasks() {
    if !matches!(states.get(&task.id), Some(TaskState::Pending)) {
      continue;
    }
    let pending_deps = graph
      .dependencies(&task.id)
      .iter()
      .filter(|dep| matches!(states.get(*dep), Some(TaskState::Pending)))
      .count();
    if pending_deps == 0 {
      ready.push_back(task.id.clone());
    } else {
      waiting.insert(task.id.clone(), pending_deps);
    }
  }

  let parallelism = config.parallelism.max(1);
  let mut running: JoinSet<(TaskId, Result<(), ExecuteError>)> = JoinSet::new();
  let mut spawned: HashMap<tokio::task::Id, TaskId> = HashMap::new();

  loop {
    while running.len() < parallelism && !config.abort.is_raised() {
      let Some(id) = ready.pop_front() else {
        break;
      };
      let Some(task) = graph.task(&id).cloned() else {
        continue;
      };
      info!(task = %id, "starting task");
      states.insert(id.clone(), TaskState::Running);

      let runner = Arc::clone(&runner);
      let handle = running.spawn(async move {
        let result = run_task(&task, runner.as_ref()).await;
        (task.id, result)
      });
      spawned.insert(handle.id(), id);
    }

    let Some(joined) = running.join_next().await else {
      break;
    };
    let (id, result) = match joined {
      Ok(done) => done,
      Err(e) => {
        let Some(id) = spawned.get(&e.id()).cloned() else {
          error!(error = %e, "lost track of a worker task");
          continue;
        };
        let message = e.to_string();
        (id.clone(), Err(ExecuteError::Panicked { task: id, message }))
      }
    };

    match result {
      Ok(()) => {
        info!(task = %id, "task complete");
        for dependent in graph.dependents(&id) {
          if let Some(count) = waiting.get_mut(&dependent) {
            *count -= 1;
            if *count == 0 {
              waiting.remove(&dependent);
              ready.push_back(dependent);
            }
          }
        }
        states.insert(id, TaskState::Complete { cached: false });
      }
      Err(e) => {
        error!(task = %id, error = %e, "task failed");
        for downstream in graph.descendants(&id) {
          if matches!(states.get(&downstream), Some(TaskState::Pending)) {
            warn!(task = %downstream, failed = %id, "blocked by upstream failure");
            waiting.remove(&downstream);
            states.insert(downstream, TaskState::Blocked(BlockedBy::Failed(id.clone())));
          }
        }
        states.insert(id, TaskState::Failed(Arc::new(e)));

        if config.fail_fast && !config.abort.is_raised() {
          warn!("fail-fast: no further tasks will be started");
          config.abort.raise();
        }
      }
    }
  }

  for (id, state) in states.iter_mut() {
    if matches!(state, TaskState::Pending) {
      if !config.abort.is_raised() {
        return Err(ExecuteError::SchedulingDeadlock(format!("{} never became ready", id)));
      }
      debug!(task = %id, "not started, run aborted");
      *state = TaskState::Blocked(BlockedBy::Aborted);
    }
  }

  let report = RunReport {
    layers: layer_reports(plan, &states),
    tasks: states,
  };

  info!(
    executed = report.executed(),
    cached = report.cached(),
    failed = report.failed(),
    blocked = report.blocked(),
    success = report.is_success(),
    "task execution complete"
  );

  Ok(report)
}

/// Decide, before anything runs, which tasks need running.
///
/// Walking dependents before dependencies: a task with an existing output
/// is complete; a missing output is only worth producing when it has no
/// consumer or some consumer will run.
fn initial_states(graph: &TaskGraph, order: &[TaskId]) -> BTreeMap<TaskId, TaskState> {
  let mut states = BTreeMap::new();
  let mut required: HashSet<TaskId> = HashSet::new();

  for id in order.iter().rev() {
    let Some(task) = graph.task(id) else {
      continue;
    };
    let state = if task.is_complete() {
      debug!(task = %id, output = %task.output.display(), "output exists, skipping");
      TaskState::Complete { cached: true }
    } else {
      let dependents = graph.dependents(id);
      if dependents.is_empty() || dependents.iter().any(|d| required.contains(d)) {
        required.insert(id.clone());
        TaskState::Pending
      } else {
        debug!(task = %id, "downstream already complete, not required");
        TaskState::NotRequired
      }
    };
    states.insert(id.clone(), state);
  }

  states
}

fn layer_reports(plan: &PipelinePlan, states: &BTreeMap<TaskId, TaskState>) -> Vec<LayerReport> {
  let chains: HashMap<&str, &TaskChain> = plan.chains.iter().map(|c| (c.layer_id.as_str(), c)).collect();

  plan
    .layers
    .iter()
    .map(|layer_id| {
      let outcome = match chains.get(layer_id.as_str()) {
        Some(chain) => chain_outcome(chain, states),
        None => LayerOutcome::Skipped,
      };
      LayerReport {
        layer_id: layer_id.clone(),
        outcome,
      }
    })
    .collect()
}

fn chain_outcome(chain: &TaskChain, states: &BTreeMap<TaskId, TaskState>) -> LayerOutcome {
  for task in &chain.tasks {
    if let Some(TaskState::Failed(error)) = states.get(&task.id) {
      return LayerOutcome::Failed {
        task: task.id.clone(),
        error: Arc::clone(error),
      };
    }
  }
  for task in &chain.tasks {
    if let Some(TaskState::Blocked(by)) = states.get(&task.id) {
      return LayerOutcome::Blocked(by.clone());
    }
  }
  match chain.last().and_then(|t| states.get(&t.id)) {
    Some(TaskState::Complete { .. }) => LayerOutcome::Complete,
    _ => LayerOutcome::Blocked(BlockedBy::Aborted),
  }
}
