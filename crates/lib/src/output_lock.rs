//! Exclusive ownership of an output root.
//!
//! `build` and `clean` both rewrite the `fetch/`, `wip/` and `final/` trees
//! under an output root. Whoever holds `<output>/.lock` owns that root until
//! the guard is dropped. A second process does not wait: it fails at once,
//! naming the pid and command recorded by the holder.
//!
//! The lock is `flock` on unix and `LockFileEx` on Windows, so it dies with
//! the process and a crashed build never leaves the root locked.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

const LOCK_FILENAME: &str = ".lock";
const RECORD_VERSION: u32 = 1;

/// The process owning an output root, as recorded in its lock file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockHolder {
  pub version: u32,
  pub pid: u32,
  pub command: String,
  pub started_at_unix: u64,
  pub output: PathBuf,
}

impl LockHolder {
  fn current(command: &str, output: &Path) -> Self {
    Self {
      version: RECORD_VERSION,
      pid: std::process::id(),
      command: command.to_string(),
      started_at_unix: now_unix(),
      output: output.to_path_buf(),
    }
  }

  /// Seconds since the holder took the lock.
  pub fn age_secs(&self) -> u64 {
    now_unix().saturating_sub(self.started_at_unix)
  }
}

#[derive(Debug, Error)]
pub enum OutputLockError {
  /// Another process owns the output root.
  #[error(
    "output root {} is in use{}\nif no other build or clean is running, delete {}",
    output.display(),
    describe_holder(holder),
    lock_path.display()
  )]
  Busy {
    output: PathBuf,
    lock_path: PathBuf,
    /// `None` when the record could not be read.
    holder: Option<LockHolder>,
  },

  #[error("cannot {action} {}: {source}", path.display())]
  Io {
    action: &'static str,
    path: PathBuf,
    #[source]
    source: io::Error,
  },
}

fn describe_holder(holder: &Option<LockHolder>) -> String {
  match holder {
    Some(h) => format!(" by `{}` (pid {}, started {}s ago)", h.command, h.pid, h.age_secs()),
    None => " by an unknown process".to_string(),
  }
}

fn io_err(action: &'static str, path: &Path) -> impl FnOnce(io::Error) -> OutputLockError {
  let path = path.to_path_buf();
  move |source| OutputLockError::Io { action, path, source }
}

/// Guard over an output root. Dropping it releases the root.
#[derive(Debug)]
pub struct OutputLock {
  file: File,
  path: PathBuf,
}

impl OutputLock {
  /// Take ownership of `output` on behalf of `command`, creating the
  /// directory if needed.
  pub fn acquire(output: &Path, command: &str) -> Result<Self, OutputLockError> {
    fs::create_dir_all(output).map_err(io_err("create", output))?;

    let path = output.join(LOCK_FILENAME);
    let file = OpenOptions::new()
      .read(true)
      .write(true)
      .create(true)
      .truncate(false)
      .open(&path)
      .map_err(io_err("open", &path))?;

    match try_lock_exclusive(&file) {
      Ok(()) => {}
      Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
        return Err(OutputLockError::Busy {
          output: output.to_path_buf(),
          holder: read_holder(&path),
          lock_path: path,
        });
      }
      Err(e) => return Err(io_err("lock", &path)(e)),
    }

    let lock = Self { file, path };
    lock.record(&LockHolder::current(command, output))?;
    debug!(lock = %lock.path.display(), command, "took output lock");
    Ok(lock)
  }

  /// The record written by this process, read through the locked handle.
  ///
  /// Windows refuses a second handle on a locked file.
  pub fn holder(&self) -> io::Result<LockHolder> {
    let mut file = &self.file;
    file.seek(SeekFrom::Start(0))?;
    let mut contents = String::new();
    file.read_to_string(&mut contents)?;
    serde_json::from_str(&contents).map_err(io::Error::other)
  }

  pub fn path(&self) -> &Path {
    &self.path
  }

  fn record(&self, holder: &LockHolder) -> Result<(), OutputLockError> {
    let write = || -> io::Result<()> {
      let mut file = &self.file;
      file.set_len(0)?;
      file.seek(SeekFrom::Start(0))?;
      serde_json::to_writer_pretty(&mut file, holder).map_err(io::Error::other)?;
      file.flush()
    };
    write().map_err(io_err("record holder in", &self.path))
  }
}

impl Drop for OutputLock {
  fn drop(&mut self) {
    debug!(lock = %self.path.display(), "released output lock");
  }
}

/// Best effort: the holder may be mid-write, or an older format.
fn read_holder(path: &Path) -> Option<LockHolder> {
  let contents = fs::read_to_string(path).ok()?;
  serde_json::from_str(&contents).ok()
}

fn now_unix() -> u64 {
  SystemTime::now()
    .duration_since(UNIX_EPOCH)
    .map(|d| d.as_secs())
    .unwrap_or_default()
}

#[cfg(unix)]
fn try_lock_exclusive(file: &File) -> io::Result<()> {
  use rustix::fs::{FlockOperation, flock};
  use std::os::unix::io::AsFd;

  flock(file.as_fd(), FlockOperation::NonBlockingLockExclusive)
    .map_err(|e| io::Error::from_raw_os_error(e.raw_os_error()))
}

#[cfg(windows)]
fn try_lock_exclusive(file: &File) -> io::Result<()> {
  use std::os::windows::io::AsRawHandle;
  use windows_sys::Win32::Foundation::{ERROR_LOCK_VIOLATION, HANDLE};
  use windows_sys::Win32::Storage::FileSystem::{LOCKFILE_EXCLUSIVE_LOCK, LOCKFILE_FAIL_IMMEDIATELY, LockFileEx};

  let handle = file.as_raw_handle() as HANDLE;

  // SAFETY: `handle` is a valid open file handle and a zeroed OVERLAPPED
  // (offset 0, no event) is a valid argument.
  let ok = unsafe {
    let mut overlapped = std::mem::zeroed();
    LockFileEx(
      handle,
      LOCKFILE_FAIL_IMMEDIATELY | LOCKFILE_EXCLUSIVE_LOCK,
      0,
      1,
      0,
      &mut overlapped,
    )
  };

  if ok != 0 {
    return Ok(());
  }
  let err = io::Error::last_os_error();
  // A held lock reports ERROR_LOCK_VIOLATION rather than WouldBlock
  if err.raw_os_error() == Some(ERROR_LOCK_VIOLATION as i32) {
    Err(io::Error::from(io::ErrorKind::WouldBlock))
  } else {
    Err(err)
  }
}
