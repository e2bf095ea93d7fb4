//! Tree node types.

use std::sync::Arc;

use serde::Deserialize;

use crate::dataset::{Asset, Dataset};
use crate::layer::Step;

/// Display settings and ordering declared by a directory's settings file.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GroupSettings {
  /// Explicit child order: sub-group names or `file.toml:layer_id` references.
  #[serde(default)]
  pub order: Option<Vec<String>>,
  /// Group visible by default.
  #[serde(default)]
  pub show: bool,
  /// Group expanded by default.
  #[serde(default)]
  pub expand: bool,
}

/// The resolved input of a layer: a dataset and one of its assets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerInput {
  pub dataset: Arc<Dataset>,
  pub asset: Asset,
}

/// A leaf of the tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerNode {
  pub id: String,
  pub title: String,
  pub description: String,
  pub tags: Vec<String>,
  pub style: Option<String>,
  pub show: bool,
  pub input: LayerInput,
  pub steps: Vec<Step>,
}

impl LayerNode {
  /// Whether this layer needs no fetch or processing.
  pub fn is_online(&self) -> bool {
    self.input.asset.is_online()
  }
}

/// A directory of the layers hierarchy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupNode {
  pub name: String,
  pub settings: GroupSettings,
  pub children: Vec<Node>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
  Group(GroupNode),
  Layer(Arc<LayerNode>),
}

impl Node {
  pub fn name(&self) -> &str {
    match self {
      Node::Group(group) => &group.name,
      Node::Layer(layer) => &layer.id,
    }
  }
}

/// A layer together with the names of the groups it lives in, root excluded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerEntry {
  pub group_path: Vec<String>,
  pub layer: Arc<LayerNode>,
}

/// Which layers a run is about. Never alters the tree itself.
#[derive(Debug, Clone, Default)]
pub struct Selection {
  pattern: Option<glob::Pattern>,
}

impl Selection {
  pub fn all() -> Self {
    Self::default()
  }

  pub fn pattern(pattern: glob::Pattern) -> Self {
    Self { pattern: Some(pattern) }
  }

  pub fn as_str(&self) -> Option<&str> {
    self.pattern.as_ref().map(|p| p.as_str())
  }

  pub fn matches(&self, layer_id: &str) -> bool {
    self.pattern.as_ref().is_none_or(|p| p.matches(layer_id))
  }
}

/// The compiled, validated layer hierarchy.
#[derive(Debug, Clone)]
pub struct Tree {
  pub root: GroupNode,
  pub selection: Selection,
}

impl Tree {
  /// All layers in tree order (depth first, children in resolved order).
  pub fn layers(&self) -> Vec<LayerEntry> {
    let mut entries = Vec::new();
    collect_layers(&self.root, &mut Vec::new(), &mut entries);
    entries
  }

  /// Layers matching the selection, in tree order.
  pub fn selected_layers(&self) -> Vec<LayerEntry> {
    self
      .layers()
      .into_iter()
      .filter(|entry| self.selection.matches(&entry.layer.id))
      .collect()
  }

  pub fn find_layer(&self, id: &str) -> Option<LayerEntry> {
    self.layers().into_iter().find(|entry| entry.layer.id == id)
  }

  /// Ids of all layers in tree order.
  pub fn layer_ids(&self) -> Vec<String> {
    self.layers().into_iter().map(|entry| entry.layer.id.clone()).collect()
  }
}

fn collect_layers(group: &GroupNode, path: &mut Vec<String>, out: &mut Vec<LayerEntry>) {
  for child in &group.children {
    match child {
      Node::Group(sub) => {
        path.push(sub.name.clone());
        collect_layers(sub, path, out);
        path.pop();
      }
      Node::Layer(layer) => out.push(LayerEntry {
        group_path: path.clone(),
        layer: Arc::clone(layer),
      }),
    }
  }
}
