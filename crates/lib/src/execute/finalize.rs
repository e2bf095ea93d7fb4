//! The built-in terminal task of every chain.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::consts::{ARTIFACT_EXTENSIONS, PROVENANCE_FILE};
use crate::pipeline::TaskId;
use crate::tree::LayerNode;

use super::types::ExecuteError;

/// Files directly inside `dir` with a recognized artifact extension, sorted.
pub fn artifact_candidates(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
  let mut found = Vec::new();
  for entry in std::fs::read_dir(dir)? {
    let path = entry?.path();
    let recognized = path
      .extension()
      .and_then(|e| e.to_str())
      .is_some_and(|ext| ARTIFACT_EXTENSIONS.contains(&ext));
    if recognized && path.is_file() {
      found.push(path);
    }
  }
  found.sort();
  Ok(found)
}

/// Provenance record: each step's account, in order, separated by a blank line.
pub fn provenance(layer: &LayerNode) -> String {
  let mut text = layer
    .steps
    .iter()
    .map(|s| s.provenance())
    .collect::<Vec<_>>()
    .join("\n\n");
  text.push('\n');
  text
}

/// Copy the single artifact found in `input_dir` to `output_dir` as
/// `<layer id>.<ext>`, and write the provenance record beside it.
pub async fn finalize(task: &TaskId, layer: &LayerNode, input_dir: &Path, output_dir: &Path) -> Result<(), ExecuteError> {
  let io_err = |path: &Path| {
    let task = task.clone();
    let path = path.to_path_buf();
    move |source| ExecuteError::Io { task, path, source }
  };

  let mut found = artifact_candidates(input_dir).map_err(io_err(input_dir))?;
  if found.len() != 1 {
    return Err(ExecuteError::AmbiguousArtifact {
      task: task.clone(),
      dir: input_dir.to_path_buf(),
      found,
    });
  }
  let artifact = found.remove(0);

  let ext = artifact.extension().and_then(|e| e.to_str()).unwrap_or_default();
  let target = output_dir.join(format!("{}.{}", layer.id, ext));
  debug!(task = %task, artifact = %artifact.display(), target = %target.display(), "copying artifact");
  tokio::fs::copy(&artifact, &target).await.map_err(io_err(&target))?;

  let record = output_dir.join(PROVENANCE_FILE);
  tokio::fs::write(&record, provenance(layer)).await.map_err(io_err(&record))?;

  Ok(())
}
