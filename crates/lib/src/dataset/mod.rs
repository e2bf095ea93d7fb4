//! Source datasets and their retrievable assets.
//!
//! Datasets are declared one per TOML file under `<project>/datasets/` and
//! collected into a [`DatasetCatalog`]. Layers reference a dataset by id and
//! one of its assets by id.

mod catalog;
mod types;

pub use catalog::{DatasetCatalog, DatasetError};
pub use types::{Asset, AssetKind, Citation, Dataset, DatasetMetadata};
