//! Task dependency graph.
//!
//! Chains from the plan are merged into one DAG. Tasks are deduplicated by
//! id, which is how layers sharing an asset end up sharing a single fetch.

use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;

use petgraph::Direction;
use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::Bfs;

use crate::pipeline::{PipelinePlan, Task, TaskId};

use super::types::ExecuteError;

/// A DAG of tasks, edges pointing from a task to the tasks consuming its output.
#[derive(Debug)]
pub struct TaskGraph {
  graph: DiGraph<TaskId, ()>,
  nodes: HashMap<TaskId, NodeIndex>,
  tasks: HashMap<TaskId, Task>,
}

impl TaskGraph {
  /// Build the graph for every chain of `plan`.
  ///
  /// # Errors
  ///
  /// Returns `SchedulingDeadlock` if a task names a predecessor that is not
  /// part of the plan, if two distinct tasks declare the same or nested
  /// output locations, or if the dependencies form a cycle. Compiled trees
  /// never produce conflicting outputs; hand-built plans can.
  pub fn from_plan(plan: &PipelinePlan) -> Result<Self, ExecuteError> {
    let mut graph = DiGraph::new();
    let mut nodes = HashMap::new();
    let mut tasks = HashMap::new();
    let mut outputs: BTreeMap<PathBuf, TaskId> = BTreeMap::new();

    // First pass: one node per distinct task id
    for task in plan.chains.iter().flat_map(|chain| &chain.tasks) {
      if nodes.contains_key(&task.id) {
        continue;
      }
      if let Some(other) = outputs.insert(task.output.clone(), task.id.clone()) {
        return Err(ExecuteError::SchedulingDeadlock(format!(
          "{} and {} both declare output {}",
          other,
          task.id,
          task.output.display()
        )));
      }
      let idx = graph.add_node(task.id.clone());
      nodes.insert(task.id.clone(), idx);
      tasks.insert(task.id.clone(), task.clone());
    }

    // A nested output would make its ancestor look complete
    let sorted: Vec<_> = outputs.iter().collect();
    for pair in sorted.windows(2) {
      let ((outer, outer_id), (inner, inner_id)) = (pair[0], pair[1]);
      if inner.starts_with(outer) {
        return Err(ExecuteError::SchedulingDeadlock(format!(
          "{} declares output {} inside the output of {}",
          inner_id,
          inner.display(),
          outer_id
        )));
      }
    }

    // Second pass: edges from dependency to dependent
    for idx in graph.node_indices().collect::<Vec<_>>() {
      let id = &graph[idx];
      let Some(dep) = tasks.get(id).and_then(|t| t.depends_on.as_ref()) else {
        continue;
      };
      let Some(&dep_idx) = nodes.get(dep) else {
        return Err(ExecuteError::SchedulingDeadlock(format!(
          "{} depends on unknown task {}",
          id, dep
        )));
      };
      graph.add_edge(dep_idx, idx, ());
    }

    let graph = Self { graph, nodes, tasks };
    graph.topological()?;
    Ok(graph)
  }

  /// Task ids with dependencies before dependents.
  pub fn topological(&self) -> Result<Vec<TaskId>, ExecuteError> {
    let sorted = toposort(&self.graph, None).map_err(|cycle| {
      ExecuteError::SchedulingDeadlock(format!("dependency cycle through {}", self.graph[cycle.node_id()]))
    })?;
    Ok(sorted.into_iter().map(|idx| self.graph[idx].clone()).collect())
  }

  pub fn task(&self, id: &TaskId) -> Option<&Task> {
    self.tasks.get(id)
  }

  /// All tasks, in the order they first appear in the plan.
  pub fn tasks(&self) -> impl Iterator<Item = &Task> {
    self.graph.node_indices().filter_map(|idx| self.tasks.get(&self.graph[idx]))
  }

  pub fn len(&self) -> usize {
    self.graph.node_count()
  }

  pub fn is_empty(&self) -> bool {
    self.graph.node_count() == 0
  }

  /// Direct predecessors of `id`.
  pub fn dependencies(&self, id: &TaskId) -> Vec<TaskId> {
    self.neighbors(id, Direction::Incoming)
  }

  /// Direct consumers of `id`'s output.
  pub fn dependents(&self, id: &TaskId) -> Vec<TaskId> {
    self.neighbors(id, Direction::Outgoing)
  }

  /// Every task transitively downstream of `id`, excluding `id` itself.
  pub fn descendants(&self, id: &TaskId) -> Vec<TaskId> {
    let Some(&start) = self.nodes.get(id) else {
      return Vec::new();
    };
    let mut bfs = Bfs::new(&self.graph, start);
    let mut out = Vec::new();
    while let Some(idx) = bfs.next(&self.graph) {
      if idx != start {
        out.push(self.graph[idx].clone());
      }
    }
    out.sort();
    out
  }

  fn neighbors(&self, id: &TaskId, direction: Direction) -> Vec<TaskId> {
    let Some(&idx) = self.nodes.get(id) else {
      return Vec::new();
    };
    let mut out: Vec<TaskId> = self
      .graph
      .neighbors_directed(idx, direction)
      .map(|n| self.graph[n].clone())
      .collect();
    out.sort();
    out
  }
}
