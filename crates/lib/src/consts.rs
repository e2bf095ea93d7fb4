//! Shared names and file-layout constants.

pub const APP_NAME: &str = "layerpack";

/// Project configuration file looked up at the project root.
pub const PROJECT_FILE: &str = "layerpack.toml";

/// Per-directory group settings file inside the layers tree.
pub const SETTINGS_FILE: &str = "__settings__.toml";

/// Extension of layer and dataset declaration files.
pub const DECLARATION_EXT: &str = "toml";

/// Provenance record written next to every finalized artifact.
pub const PROVENANCE_FILE: &str = "provenance.txt";

/// Artifact extensions recognized by the finalize task.
pub const ARTIFACT_EXTENSIONS: &[&str] = &["tif", "gpkg"];

/// Subdirectories of the output root.
pub const FETCH_DIR: &str = "fetch";
pub const WIP_DIR: &str = "wip";
pub const FINAL_DIR: &str = "final";

/// Prefix of the hidden temporary directories tasks write into before promotion.
pub const TMP_PREFIX: &str = ".tmp-";

/// Environment variable overriding the output root.
pub const OUTPUT_ENV: &str = "LAYERPACK_OUTPUT";
