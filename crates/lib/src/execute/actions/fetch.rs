//! Asset retrieval: HTTP downloads and local file copies.

use std::path::{Path, PathBuf};

use reqwest::header::CONTENT_DISPOSITION;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::execute::RunnerError;

/// Download `url` into `out_dir`.
///
/// The file is named after the `content-disposition` header when the server
/// sends one, else after the last URL path segment.
pub async fn download(client: &reqwest::Client, url: &str, out_dir: &Path) -> Result<PathBuf, RunnerError> {
  info!(url = %url, "fetching URL");

  let fail = |message: String| RunnerError::new(format!("fetch failed for {}: {}", url, message));

  let mut response = client.get(url).send().await.map_err(|e| fail(e.to_string()))?;

  if !response.status().is_success() {
    return Err(fail(format!("HTTP {}", response.status())));
  }

  let filename = response
    .headers()
    .get(CONTENT_DISPOSITION)
    .and_then(|v| v.to_str().ok())
    .and_then(disposition_filename)
    .unwrap_or_else(|| url_to_filename(url));
  let dest_path = out_dir.join(&filename);

  let mut file = fs::File::create(&dest_path).await.map_err(|e| fail(e.to_string()))?;
  let mut size = 0usize;
  while let Some(chunk) = response.chunk().await.map_err(|e| fail(e.to_string()))? {
    size += chunk.len();
    file.write_all(&chunk).await.map_err(|e| fail(e.to_string()))?;
  }
  file.flush().await.map_err(|e| fail(e.to_string()))?;

  info!(path = ?dest_path, size, "download complete");

  Ok(dest_path)
}

/// Copy a file, or the contents of a directory, into `out_dir`.
pub async fn copy_into(src: &Path, out_dir: &Path) -> Result<(), RunnerError> {
  let fail = |e: &dyn std::fmt::Display| RunnerError::new(format!("copy from {} failed: {}", src.display(), e));

  if src.is_file() {
    let name = src.file_name().ok_or_else(|| fail(&"not a file name"))?;
    fs::copy(src, out_dir.join(name)).await.map_err(|e| fail(&e))?;
    return Ok(());
  }
  if !src.is_dir() {
    return Err(fail(&"no such file or directory"));
  }

  for entry in WalkDir::new(src).min_depth(1).sort_by_file_name() {
    let entry = entry.map_err(|e| fail(&e))?;
    let rel = entry.path().strip_prefix(src).map_err(|e| fail(&e))?;
    let dest = out_dir.join(rel);
    if entry.file_type().is_dir() {
      fs::create_dir_all(&dest).await.map_err(|e| fail(&e))?;
    } else {
      debug!(from = ?entry.path(), to = ?dest, "copying");
      fs::copy(entry.path(), &dest).await.map_err(|e| fail(&e))?;
    }
  }
  Ok(())
}

/// Extract `filename` from a `content-disposition` header value.
fn disposition_filename(value: &str) -> Option<String> {
  value.split(';').map(str::trim).find_map(|part| {
    let name = part.strip_prefix("filename=")?;
    let name = sanitize(name.trim_matches('"'));
    is_plain_name(&name).then_some(name)
  })
}

/// Convert a URL to a safe filename.
///
/// Takes the last path component and sanitizes it. Falls back to
/// `download` if no suitable filename can be extracted.
fn url_to_filename(url: &str) -> String {
  let last = url.rsplit('/').next().unwrap_or_default();
  let last = last.split('?').next().unwrap_or(last);
  let sanitized = sanitize(last);
  if is_plain_name(&sanitized) {
    sanitized
  } else {
    "download".to_string()
  }
}

/// A name that stays inside the directory it is joined onto.
fn is_plain_name(name: &str) -> bool {
  !name.is_empty() && name != "." && name != ".."
}

/// Only allow alphanumeric, dash, underscore and dot.
fn sanitize(name: &str) -> String {
  name
    .chars()
    .map(|c| {
      if c.is_alphanumeric() || c == '-' || c == '_' || c == '.' {
        c
      } else {
        '_'
      }
    })
    .collect()
}
