//! Declarative layer definitions as written in layer files.
//!
//! A layer file holds one or more `[[layers]]` tables. These are plain data;
//! the tree compiler resolves their dataset references and turns them into
//! [`LayerNode`](crate::tree::LayerNode)s.

mod step;

use serde::{Deserialize, Serialize};

pub use step::Step;

/// Reference from a layer to the dataset asset it is built from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputRef {
  pub dataset: String,
  pub asset: String,
}

/// A layer as declared in a layer file, before dataset resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LayerDecl {
  pub id: String,
  pub title: String,
  pub description: String,
  #[serde(default)]
  pub tags: Vec<String>,
  #[serde(default)]
  pub style: Option<String>,
  /// Visible by default in the packaged project.
  #[serde(default)]
  pub show: bool,
  pub input: InputRef,
  #[serde(default)]
  pub steps: Vec<Step>,
}

/// Contents of one layer file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LayerFile {
  #[serde(default)]
  pub layers: Vec<LayerDecl>,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parses_layer_file() {
    let file: LayerFile = toml::from_str(
      r#"
[[layers]]
id = "background"
title = "Background (500m)"
description = "Stylized shaded-relief map."
tags = ["background"]
show = true
input = { dataset = "background", asset = "high_res" }

[[layers.steps]]
type = "command"
args = ["unzip", "{input_dir}/*.zip", "-d", "{output_dir}"]

[[layers.steps]]
type = "command"
args = ["gdalwarp", "{input_dir}/NE2.tif", "{output_dir}/warped.tif"]
description = "Reproject to the project CRS."

[[layers]]
id = "coastlines"
title = "Coastlines"
description = "Coast."
input = { dataset = "coast", asset = "only" }
"#,
    )
    .unwrap();

    assert_eq!(file.layers.len(), 2);
    let background = &file.layers[0];
    assert!(background.show);
    assert_eq!(background.steps.len(), 2);
    assert_eq!(background.input.asset, "high_res");
    assert!(file.layers[1].steps.is_empty());
    assert!(file.layers[1].style.is_none());
  }

  #[test]
  fn rejects_unknown_fields() {
    let result = toml::from_str::<LayerFile>(
      r#"
[[layers]]
id = "x"
title = "X"
description = "x"
colour = "red"
input = { dataset = "d", asset = "a" }
"#,
    );
    assert!(result.is_err());
  }
}
