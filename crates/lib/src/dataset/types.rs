//! Dataset and asset value types.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Bibliographic citation of a dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Citation {
  pub text: String,
  pub url: String,
}

/// Descriptive metadata carried along with a dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetMetadata {
  pub title: String,
  #[serde(rename = "abstract")]
  pub abstract_text: String,
  pub citation: Citation,
}

/// How an asset is retrieved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum AssetKind {
  /// One or more downloadable resources.
  Http { urls: Vec<String> },
  /// A granule in an archival collection.
  Cmr {
    granule_ur: String,
    collection_concept_id: String,
  },
  /// A file shipped inside the project directory (relative to the project root).
  Repository { path: PathBuf },
  /// A file placed by hand under the private archive directory.
  Manual { path: PathBuf },
  /// A live remote reference (e.g. a map service). Never materialized locally.
  Online { provider: String, url: String },
}

impl AssetKind {
  /// Short lowercase name of the kind, as written in declarations.
  pub fn as_str(&self) -> &'static str {
    match self {
      AssetKind::Http { .. } => "http",
      AssetKind::Cmr { .. } => "cmr",
      AssetKind::Repository { .. } => "repository",
      AssetKind::Manual { .. } => "manual",
      AssetKind::Online { .. } => "online",
    }
  }
}

/// One retrievable form of a dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Asset {
  pub id: String,
  #[serde(flatten)]
  pub kind: AssetKind,
}

impl Asset {
  /// Whether this asset is a live remote reference with no local materialization.
  pub fn is_online(&self) -> bool {
    matches!(self.kind, AssetKind::Online { .. })
  }
}

/// A source data product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dataset {
  pub id: String,
  pub assets: Vec<Asset>,
  pub metadata: DatasetMetadata,
}

impl Dataset {
  /// Look up an asset by id.
  pub fn asset(&self, id: &str) -> Option<&Asset> {
    self.assets.iter().find(|a| a.id == id)
  }
}

impl fmt::Display for Dataset {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.id)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  const DATASET_TOML: &str = r#"
id = "background"

[metadata]
title = "Natural Earth II"
abstract = "Shaded relief."

[metadata.citation]
text = "Natural Earth"
url = "https://www.naturalearthdata.com"

[[assets]]
id = "high_res"
type = "http"
urls = ["https://example.com/NE2_HR_LC_SR_W.zip"]

[[assets]]
id = "wms"
type = "online"
provider = "wms"
url = "https://example.com/wms"
"#;

  #[test]
  fn parses_tagged_asset_kinds() {
    let dataset: Dataset = toml::from_str(DATASET_TOML).unwrap();

    assert_eq!(dataset.id, "background");
    assert_eq!(dataset.metadata.abstract_text, "Shaded relief.");
    assert_eq!(dataset.assets.len(), 2);
    assert_eq!(
      dataset.asset("high_res").map(|a| a.kind.as_str()),
      Some("http")
    );
    assert!(dataset.asset("wms").unwrap().is_online());
    assert!(dataset.asset("missing").is_none());
  }

  #[test]
  fn rejects_unknown_asset_type() {
    let bad = DATASET_TOML.replace("type = \"http\"", "type = \"carrier-pigeon\"");
    assert!(toml::from_str::<Dataset>(&bad).is_err());
  }
}
