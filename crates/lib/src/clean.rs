//! Removal of build outputs.
//!
//! Deleting a task's output is how a user forces it to run again, so this
//! is the only supported way to invalidate work.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::consts::TMP_PREFIX;
use crate::pipeline::BuildLayout;

#[derive(Debug, Error)]
pub enum CleanError {
  #[error("invalid pattern '{pattern}': {source}")]
  InvalidPattern {
    pattern: String,
    #[source]
    source: glob::PatternError,
  },

  #[error("failed to remove {}: {source}", path.display())]
  Io {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },
}

/// What to remove.
#[derive(Debug, Clone, Default)]
pub struct CleanOptions {
  /// Globs matched against fetch directory names (`<dataset>.<asset>`).
  pub fetch: Vec<String>,
  /// Globs matched against layer ids of WIP directories.
  pub wip: Vec<String>,
  pub all_fetch: bool,
  pub all_wip: bool,
  /// Leave `final/` in place.
  pub keep_final: bool,
  /// Report what would be removed without removing it.
  pub dry_run: bool,
}

#[derive(Debug, Clone, Default)]
pub struct CleanResult {
  /// Removed paths, or the paths that would be removed on a dry run.
  pub removed: Vec<PathBuf>,
  pub dry_run: bool,
}

/// Remove the outputs selected by `options` under `layout`.
///
/// Hidden temporary directories left behind by interrupted tasks are
/// always removed.
pub fn clean(layout: &BuildLayout, options: &CleanOptions) -> Result<CleanResult, CleanError> {
  let mut targets = Vec::new();

  if options.all_fetch {
    targets.push(layout.fetch_root());
  } else {
    targets.extend(matching_children(&layout.fetch_root(), &options.fetch)?);
  }

  if options.all_wip {
    targets.push(layout.wip_root());
  } else {
    targets.extend(matching_children(&layout.wip_root(), &options.wip)?);
  }

  if !options.keep_final {
    targets.push(layout.final_root());
  }

  targets.extend(stale_temp_dirs(layout.root()));

  targets.retain(|p| p.exists());
  targets.sort();
  targets.dedup();
  // Drop paths nested in another target
  let mut removed: Vec<PathBuf> = Vec::new();
  for target in targets {
    if !removed.iter().any(|kept| target.starts_with(kept)) {
      removed.push(target);
    }
  }

  for path in &removed {
    if options.dry_run {
      info!(path = %path.display(), "would remove");
      continue;
    }
    info!(path = %path.display(), "removing");
    let result = if path.is_dir() {
      std::fs::remove_dir_all(path)
    } else {
      std::fs::remove_file(path)
    };
    result.map_err(|source| CleanError::Io {
      path: path.clone(),
      source,
    })?;
  }

  Ok(CleanResult {
    removed,
    dry_run: options.dry_run,
  })
}

/// Direct children of `dir` whose name matches any of `patterns`.
fn matching_children(dir: &Path, patterns: &[String]) -> Result<Vec<PathBuf>, CleanError> {
  let patterns = patterns
    .iter()
    .map(|p| {
      glob::Pattern::new(p).map_err(|source| CleanError::InvalidPattern {
        pattern: p.clone(),
        source,
      })
    })
    .collect::<Result<Vec<_>, _>>()?;

  if patterns.is_empty() {
    return Ok(Vec::new());
  }
  let Ok(entries) = std::fs::read_dir(dir) else {
    debug!(dir = %dir.display(), "nothing to clean");
    return Ok(Vec::new());
  };

  let mut out = Vec::new();
  for entry in entries.flatten() {
    let name = entry.file_name().to_string_lossy().into_owned();
    if name.starts_with(TMP_PREFIX) {
      continue;
    }
    if patterns.iter().any(|p| p.matches(&name)) {
      out.push(entry.path());
    }
  }
  Ok(out)
}

/// Temporary task directories anywhere below `root`.
fn stale_temp_dirs(root: &Path) -> Vec<PathBuf> {
  let mut out = Vec::new();
  let mut walker = WalkDir::new(root).min_depth(1).into_iter();
  while let Some(entry) = walker.next() {
    let Ok(entry) = entry else {
      continue;
    };
    if !entry.file_type().is_dir() {
      continue;
    }
    if entry.file_name().to_string_lossy().starts_with(TMP_PREFIX) {
      out.push(entry.into_path());
      walker.skip_current_dir();
    }
  }
  out
}
