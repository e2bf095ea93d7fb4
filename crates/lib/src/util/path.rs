//! Configuration names used as path components.

/// Whether `name` can be joined onto an output directory as-is.
///
/// Rejects names that would leave the directory, nest below it, or be
/// mistaken for a hidden temporary entry.
pub fn is_plain_component(name: &str) -> bool {
  !name.is_empty() && !name.starts_with('.') && !name.contains(['/', '\\'])
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn plain_components() {
    assert!(is_plain_component("bed_elevation"));
    assert!(is_plain_component("ne-10m.v5"));
    assert!(!is_plain_component(""));
    assert!(!is_plain_component(".."));
    assert!(!is_plain_component(".tmp-x"));
    assert!(!is_plain_component("a/b"));
    assert!(!is_plain_component("a\\b"));
  }
}
