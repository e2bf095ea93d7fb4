//! Text rendering of a tree for diagnostics.

use super::types::{GroupNode, Node, Tree};

impl Tree {
  /// Render the hierarchy with box-drawing guides.
  ///
  /// Layers outside the selection are shown but marked as `(not selected)`
  /// when a pattern is in effect.
  pub fn render(&self) -> String {
    let mut lines = vec![self.root.name.clone()];
    render_children(self, &self.root, "", &mut lines);
    lines.join("\n")
  }
}

fn render_children(tree: &Tree, group: &GroupNode, prefix: &str, lines: &mut Vec<String>) {
  let count = group.children.len();
  for (i, child) in group.children.iter().enumerate() {
    let last = i + 1 == count;
    let branch = if last { "└── " } else { "├── " };

    match child {
      Node::Group(sub) => {
        lines.push(format!("{}{}{}", prefix, branch, sub.name));
        let extension = if last { "    " } else { "│   " };
        render_children(tree, sub, &format!("{}{}", prefix, extension), lines);
      }
      Node::Layer(layer) => {
        let marker = if tree.selection.matches(&layer.id) {
          ""
        } else {
          " (not selected)"
        };
        lines.push(format!("{}{}{} [{}]{}", prefix, branch, layer.title, layer.id, marker));
      }
    }
  }
}
