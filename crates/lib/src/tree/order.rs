//! Directory ordering.
//!
//! Resolves the final order of a directory's children, either from its
//! explicit `order` declaration or from the default strategy.

use std::path::Path;

use tracing::trace;

use crate::layer::LayerDecl;

use super::compile::ConfigError;

/// A child discovered in a layers directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Child {
  /// A sub-directory, i.e. a nested group.
  Group { name: String },
  /// A layer declared in `file` (file name with extension).
  Layer { file: String, decl: LayerDecl },
}

impl Child {
  /// How an order declaration refers to this child.
  pub fn reference(&self) -> String {
    match self {
      Child::Group { name } => name.clone(),
      Child::Layer { file, decl } => format!("{}:{}", file, decl.id),
    }
  }
}

/// Return `children` in their final order.
///
/// Without a declaration, groups come first sorted by name, then layers
/// sorted by title (id breaks ties). With a declaration, every entry must
/// name exactly one child and every child must be named exactly once.
pub fn resolve_order(dir: &Path, children: Vec<Child>, order: Option<&[String]>) -> Result<Vec<Child>, ConfigError> {
  match order {
    None => Ok(default_order(children)),
    Some(order) => declared_order(dir, children, order),
  }
}

fn default_order(children: Vec<Child>) -> Vec<Child> {
  let (mut groups, mut layers): (Vec<Child>, Vec<Child>) =
    children.into_iter().partition(|c| matches!(c, Child::Group { .. }));

  groups.sort_by(|a, b| a.reference().cmp(&b.reference()));
  layers.sort_by(|a, b| match (a, b) {
    (Child::Layer { decl: a, .. }, Child::Layer { decl: b, .. }) => a.title.cmp(&b.title).then_with(|| a.id.cmp(&b.id)),
    _ => std::cmp::Ordering::Equal,
  });

  groups.extend(layers);
  groups
}

fn declared_order(dir: &Path, children: Vec<Child>, order: &[String]) -> Result<Vec<Child>, ConfigError> {
  let mut picked: Vec<usize> = Vec::with_capacity(order.len());
  let mut extra = Vec::new();
  let mut duplicates = Vec::new();

  for entry in order {
    let index = match entry.split_once(':') {
      Some((file, id)) => {
        let matches: Vec<usize> = children
          .iter()
          .enumerate()
          .filter(|(_, child)| matches!(child, Child::Layer { file: f, decl } if f == file && decl.id == id))
          .map(|(i, _)| i)
          .collect();

        if matches.len() != 1 {
          return Err(ConfigError::UnresolvedReference {
            dir: dir.to_path_buf(),
            reference: entry.clone(),
            found: matches.len(),
          });
        }
        matches[0]
      }
      None => {
        let found = children
          .iter()
          .position(|child| matches!(child, Child::Group { name } if name == entry));
        match found {
          Some(i) => i,
          None => {
            extra.push(entry.clone());
            continue;
          }
        }
      }
    };

    if picked.contains(&index) {
      duplicates.push(entry.clone());
      continue;
    }

    trace!(dir = %dir.display(), entry = %entry, "resolved order entry");
    picked.push(index);
  }

  let missing: Vec<String> = children
    .iter()
    .enumerate()
    .filter(|(i, _)| !picked.contains(i))
    .map(|(_, child)| child.reference())
    .collect();

  if !missing.is_empty() || !extra.is_empty() || !duplicates.is_empty() {
    return Err(ConfigError::Ordering {
      dir: dir.to_path_buf(),
      missing,
      extra,
      duplicates,
    });
  }

  let mut slots: Vec<Option<Child>> = children.into_iter().map(Some).collect();
  Ok(picked.into_iter().filter_map(|i| slots[i].take()).collect())
}
