//! Shared test helpers for CLI integration tests.

use std::path::{Path, PathBuf};

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use tempfile::TempDir;

pub const COAST_DATASET: &str = r#"
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

pub const IMAGERY_DATASET: &str = r#"
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

/// Isolated project directory.
///
/// Each test gets its own project with a `coast.only` repository asset, an
/// `imagery.wms` online asset and a private output root.
pub struct TestEnv {
  pub temp: TempDir,
}

impl TestEnv {
  /// Create a project with datasets and assets but no layers.
  pub fn new() -> Self {
    let temp = TempDir::new().unwrap();
    let env = Self { temp };
    env.write_file("datasets/coast.toml", COAST_DATASET);
    env.write_file("datasets/imagery.toml", IMAGERY_DATASET);
    env.write_file("assets/coast.gpkg", "gpkg");
    std::fs::create_dir_all(env.root().join("layers")).unwrap();
    env
  }

  pub fn root(&self) -> &Path {
    self.temp.path()
  }

  /// Write a file relative to the project root.
  pub fn write_file(&self, relative_path: &str, content: &str) {
    let path = self.root().join(relative_path);
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(&path, content).unwrap();
  }

  /// Write a layer declaration under `layers/`.
  pub fn layer(&self, relative_path: &str, id: &str, title: &str, input: (&str, &str), steps: &[&[&str]]) {
    let mut content = format!(
      "[[layers]]\nid = \"{}\"\ntitle = \"{}\"\ndescription = \"{} layer.\"\ninput = {{ dataset = \"{}\", asset = \"{}\" }}\n",
      id, title, title, input.0, input.1
    );
    for args in steps {
      let args: Vec<String> = args.iter().map(|a| format!("\"{}\"", a)).collect();
      content.push_str(&format!("[[layers.steps]]\ntype = \"command\"\nargs = [{}]\n", args.join(", ")));
    }
    let path = self.root().join("layers").join(relative_path);
    let existing = std::fs::read_to_string(&path).unwrap_or_default();
    self.write_file(
      &format!("layers/{}", relative_path),
      &format!("{}{}", existing, content),
    );
  }

  /// Output root (isolated per test).
  pub fn output_path(&self) -> PathBuf {
    let p = self.root().join("output");
    std::fs::create_dir_all(&p).unwrap();
    dunce::canonicalize(&p).unwrap_or(p)
  }

  pub fn final_path(&self) -> PathBuf {
    self.output_path().join("final")
  }

  /// Get a pre-configured Command for the layerpack binary.
  ///
  /// Runs against this project and sets `LAYERPACK_OUTPUT` to the isolated
  /// output root.
  pub fn cmd(&self) -> Command {
    let mut cmd: Command = cargo_bin_cmd!("layerpack");
    cmd.arg("-C").arg(self.root());
    cmd.env("LAYERPACK_OUTPUT", self.output_path());
    cmd.env("XDG_DATA_HOME", self.root().join("data"));
    cmd.env("APPDATA", self.root().join("data"));
    cmd.env_remove("RUST_LOG");
    cmd
  }
}
