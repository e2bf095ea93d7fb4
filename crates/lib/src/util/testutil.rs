//! Test utilities for layerpack-lib.
//!
//! A scratch project with a small dataset catalog, helpers that write layer
//! declarations, and a [`TaskRunner`] double that records what it was asked
//! to do.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tempfile::TempDir;

use crate::consts::TMP_PREFIX;
use crate::dataset::{Asset, Dataset, DatasetCatalog};
use crate::execute::{RunnerError, TaskRunner};
use crate::layer::Step;
use crate::pipeline::BuildLayout;
use crate::tree::{ConfigError, Tree, compile};

const COAST_TOML: &str = r#"
id = "coast"

[metadata]
title = "Natural Earth coastlines"
abstract = "Coastline vectors."

[metadata.citation]
text = "Natural Earth"
url = "https://www.naturalearthdata.com"

[[assets]]
id = "only"
type = "repository"
path = "assets/coast.gpkg"
"#;

const BEDMACHINE_TOML: &str = r#"
id = "bedmachine"

[metadata]
title = "BedMachine Greenland"
abstract = "Bed topography and ice thickness."

[metadata.citation]
text = "Morlighem et al."
url = "https://nsidc.org/data/idbmg4"

[[assets]]
id = "only"
type = "http"
urls = ["https://example.com/BedMachineGreenland.nc"]
"#;

const IMAGERY_TOML: &str = r#"
id = "imagery"

[metadata]
title = "Satellite imagery"
abstract = "Live imagery service."

[metadata.citation]
text = "Imagery provider"
url = "https://example.com"

[[assets]]
id = "wms"
type = "online"
provider = "wms"
url = "https://example.com/wms"
"#;

/// A throwaway project directory with `layers/`, `datasets/` and `assets/`.
///
/// Datasets: `coast.only` (repository), `bedmachine.only` (http) and
/// `imagery.wms` (online).
pub struct ProjectFixture {
  temp: TempDir,
}

impl ProjectFixture {
  pub fn new() -> Self {
    let fixture = Self {
      temp: TempDir::new().unwrap(),
    };
    std::fs::create_dir_all(fixture.layers_dir()).unwrap();
    fixture.write("datasets/coast.toml", COAST_TOML);
    fixture.write("datasets/bedmachine.toml", BEDMACHINE_TOML);
    fixture.write("datasets/imagery.toml", IMAGERY_TOML);
    fixture.write("assets/coast.gpkg", "gpkg");
    fixture
  }

  pub fn root(&self) -> &Path {
    self.temp.path()
  }

  pub fn layers_dir(&self) -> PathBuf {
    self.root().join("layers")
  }

  /// Write `content` at `rel` under the project root, creating parents.
  pub fn write(&self, rel: &str, content: &str) {
    let path = self.root().join(rel);
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, content).unwrap();
  }

  /// Write a layer file at `rel` under `layers/` holding `layers`.
  pub fn layer_file(&self, rel: &str, layers: &[String]) {
    self.write(&format!("layers/{}", rel), &layers.join("\n"));
  }

  pub fn catalog(&self) -> DatasetCatalog {
    DatasetCatalog::load(&self.root().join("datasets")).unwrap()
  }

  pub fn compile(&self, pattern: Option<&str>) -> Result<Tree, ConfigError> {
    compile(&self.layers_dir(), &self.catalog(), pattern)
  }

  /// Build layout rooted at `output/` inside the project.
  pub fn layout(&self) -> BuildLayout {
    BuildLayout::new(&self.root().join("output"))
  }
}

/// A `[[layers]]` table without steps.
pub fn layer_toml(id: &str, title: &str, dataset: &str, asset: &str) -> String {
  layer_toml_with_steps(id, title, dataset, asset, &[])
}

/// A `[[layers]]` table followed by the given step tables.
pub fn layer_toml_with_steps(id: &str, title: &str, dataset: &str, asset: &str, steps: &[String]) -> String {
  let mut out = format!(
    "[[layers]]\nid = {}\ntitle = {}\ndescription = {}\ninput = {{ dataset = {}, asset = {} }}\n",
    quote(id),
    quote(title),
    quote(&format!("{} layer.", title)),
    quote(dataset),
    quote(asset),
  );
  for step in steps {
    out.push_str(step);
  }
  out
}

/// A `[[layers.steps]]` command table.
pub fn command_step(args: &[&str]) -> String {
  let args: Vec<String> = args.iter().map(|a| quote(a)).collect();
  format!("[[layers.steps]]\ntype = \"command\"\nargs = [{}]\n", args.join(", "))
}

fn quote(s: &str) -> String {
  toml::Value::String(s.to_string()).to_string()
}

/// Names of hidden temporary task directories directly inside `dir`.
pub fn tmp_entries(dir: &Path) -> Vec<String> {
  let Ok(entries) = std::fs::read_dir(dir) else {
    return Vec::new();
  };
  let mut names: Vec<String> = entries
    .filter_map(|e| e.ok())
    .map(|e| e.file_name().to_string_lossy().into_owned())
    .filter(|name| name.starts_with(TMP_PREFIX))
    .collect();
  names.sort();
  names
}

/// [`TaskRunner`] double.
///
/// Records every call as `fetch:<dataset>.<asset>` or `step:<program>`,
/// writes `artifact.tif` (or configured files) into the output directory,
/// and fails the configured datasets and programs.
#[derive(Default)]
pub struct RecordingRunner {
  calls: Mutex<Vec<String>>,
  failing_fetches: HashSet<String>,
  failing_steps: HashSet<String>,
  step_files: HashMap<String, Vec<String>>,
  delay: Option<Duration>,
  active: AtomicUsize,
  max_active: AtomicUsize,
}

impl RecordingRunner {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn fail_fetch(mut self, dataset_id: &str) -> Self {
    self.failing_fetches.insert(dataset_id.to_string());
    self
  }

  pub fn fail_step(mut self, program: &str) -> Self {
    self.failing_steps.insert(program.to_string());
    self
  }

  /// Steps running `program` write `files` instead of `artifact.tif`.
  pub fn with_step_files(mut self, program: &str, files: &[&str]) -> Self {
    self
      .step_files
      .insert(program.to_string(), files.iter().map(|f| f.to_string()).collect());
    self
  }

  /// Sleep this long inside every call.
  pub fn with_delay(mut self, millis: u64) -> Self {
    self.delay = Some(Duration::from_millis(millis));
    self
  }

  pub fn calls(&self) -> Vec<String> {
    self.calls.lock().unwrap().clone()
  }

  /// Highest number of calls observed in flight at once.
  pub fn max_active(&self) -> usize {
    self.max_active.load(Ordering::SeqCst)
  }

  async fn record(&self, call: String, fail: bool, files: &[String], output_dir: &Path) -> Result<(), RunnerError> {
    self.calls.lock().unwrap().push(call.clone());
    let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
    self.max_active.fetch_max(now, Ordering::SeqCst);

    if let Some(delay) = self.delay {
      tokio::time::sleep(delay).await;
    }

    // Partial output that must never become visible
    std::fs::write(output_dir.join("partial.tmp"), b"partial").unwrap();
    let result = if fail {
      Err(RunnerError::new(format!("{} exited with status 1", call)))
    } else {
      std::fs::remove_file(output_dir.join("partial.tmp")).unwrap();
      for file in files {
        std::fs::write(output_dir.join(file), b"data").unwrap();
      }
      Ok(())
    };

    self.active.fetch_sub(1, Ordering::SeqCst);
    result
  }
}

#[async_trait]
impl TaskRunner for RecordingRunner {
  async fn fetch(&self, dataset: &Dataset, asset: &Asset, output_dir: &Path) -> Result<(), RunnerError> {
    let fail = self.failing_fetches.contains(&dataset.id);
    let files = vec!["artifact.tif".to_string()];
    self
      .record(format!("fetch:{}.{}", dataset.id, asset.id), fail, &files, output_dir)
      .await
  }

  async fn run_step(&self, step: &Step, _input_dir: &Path, output_dir: &Path) -> Result<(), RunnerError> {
    let program = match step {
      Step::Command { args, .. } => args.first().cloned().unwrap_or_default(),
      Step::Online => "online".to_string(),
    };
    let fail = self.failing_steps.contains(&program);
    let files = self
      .step_files
      .get(&program)
      .cloned()
      .unwrap_or_else(|| vec!["artifact.tif".to_string()]);
    self.record(format!("step:{}", program), fail, &files, output_dir).await
  }
}
