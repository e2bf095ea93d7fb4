//! Per-user default directories.

use std::path::PathBuf;

use crate::consts::{APP_NAME, OUTPUT_ENV};

/// Returns the user's home directory
#[cfg(windows)]
pub fn home_dir() -> PathBuf {
  std::env::var_os("USERPROFILE").map(PathBuf::from).unwrap_or_else(|| PathBuf::from("."))
}

/// Returns the user's home directory
#[cfg(not(windows))]
pub fn home_dir() -> PathBuf {
  std::env::var_os("HOME").map(PathBuf::from).unwrap_or_else(|| PathBuf::from("."))
}

/// Returns the directory for data files for the application
#[cfg(windows)]
pub fn data_dir() -> PathBuf {
  std::env::var_os("APPDATA")
    .map(PathBuf::from)
    .unwrap_or_else(home_dir)
    .join(APP_NAME)
}

/// Returns the directory for data files for the application
#[cfg(not(windows))]
pub fn data_dir() -> PathBuf {
  let data_home = std::env::var("XDG_DATA_HOME")
    .map(PathBuf::from)
    .unwrap_or_else(|_| home_dir().join(".local").join("share"));
  data_home.join(APP_NAME)
}

/// Output root from the environment, if set.
pub fn output_dir_from_env() -> Option<PathBuf> {
  std::env::var_os(OUTPUT_ENV).filter(|v| !v.is_empty()).map(PathBuf::from)
}

/// Default output root when neither the project nor the environment sets one.
pub fn default_output_dir() -> PathBuf {
  data_dir().join("build")
}
