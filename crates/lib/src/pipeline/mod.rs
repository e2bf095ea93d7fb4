//! Pipeline planning.
//!
//! Derives, for every selected layer, the linear chain of tasks that builds
//! it: Fetch, then one task per step, then Finalize.

mod layout;
mod task;

use std::sync::Arc;

use tracing::{debug, info};

use crate::tree::{LayerEntry, Tree};

pub use layout::{BuildLayout, datasource_dirname, final_relpath};
pub use task::{Task, TaskChain, TaskId, TaskKind};

/// Everything a run has to do.
#[derive(Debug, Clone, Default)]
pub struct PipelinePlan {
  /// Every selected layer id, in tree order.
  pub layers: Vec<String>,
  /// One chain per selected layer that needs building, in tree order.
  pub chains: Vec<TaskChain>,
  /// Selected layers whose asset is a live remote reference; nothing to build.
  pub no_pipeline: Vec<String>,
  pub fetch_only: bool,
}

impl PipelinePlan {
  /// Number of distinct tasks across all chains (shared fetches counted once).
  pub fn task_count(&self) -> usize {
    let mut ids: Vec<&TaskId> = self.chains.iter().flat_map(|c| c.tasks.iter().map(|t| &t.id)).collect();
    ids.sort();
    ids.dedup();
    ids.len()
  }
}

/// Build task chains for the selected layers of `tree`.
pub fn build_chains(tree: &Tree, layout: &BuildLayout, fetch_only: bool) -> PipelinePlan {
  let mut plan = PipelinePlan {
    fetch_only,
    ..Default::default()
  };

  for entry in tree.selected_layers() {
    plan.layers.push(entry.layer.id.clone());
    if entry.layer.is_online() {
      debug!(layer = %entry.layer.id, "online layer, no pipeline");
      plan.no_pipeline.push(entry.layer.id.clone());
      continue;
    }
    plan.chains.push(layer_chain(&entry, layout, fetch_only));
  }

  info!(
    chains = plan.chains.len(),
    tasks = plan.task_count(),
    no_pipeline = plan.no_pipeline.len(),
    fetch_only,
    "planned layer pipelines"
  );

  plan
}

fn layer_chain(entry: &LayerEntry, layout: &BuildLayout, fetch_only: bool) -> TaskChain {
  let layer = &entry.layer;
  let dataset = &layer.input.dataset;
  let asset = &layer.input.asset;

  let fetch = Task {
    id: TaskId::Fetch {
      dataset_id: dataset.id.clone(),
      asset_id: asset.id.clone(),
    },
    kind: TaskKind::Fetch {
      dataset: Arc::clone(dataset),
      asset: asset.clone(),
    },
    output: layout.fetch_dir(&dataset.id, &asset.id),
    depends_on: None,
    input: None,
  };

  let mut tasks = vec![fetch];

  if !fetch_only {
    for (index, step) in layer.steps.iter().enumerate() {
      let kind = step.kind();
      let task = chained(
        &tasks,
        TaskId::Step {
          layer_id: layer.id.clone(),
          index,
          kind: kind.clone(),
        },
        TaskKind::Step {
          layer: Arc::clone(layer),
          index,
        },
        layout.step_dir(&layer.id, index, &kind),
      );
      tasks.push(task);
    }

    let finalize = chained(
      &tasks,
      TaskId::Finalize {
        layer_id: layer.id.clone(),
      },
      TaskKind::Finalize {
        layer: Arc::clone(layer),
      },
      layout.final_dir(&entry.group_path, &layer.title),
    );
    tasks.push(finalize);
  }

  TaskChain {
    layer_id: layer.id.clone(),
    tasks,
  }
}

/// A task depending on the last task of `previous`.
fn chained(previous: &[Task], id: TaskId, kind: TaskKind, output: std::path::PathBuf) -> Task {
  let prev = previous.last();
  Task {
    id,
    kind,
    output,
    depends_on: prev.map(|t| t.id.clone()),
    input: prev.map(|t| t.output.clone()),
  }
}
