//! Processing steps.

use std::path::Path;

use serde::{Deserialize, Serialize};

/// One declarative transformation stage of a layer.
///
/// The core never interprets a step; it only orders them and hands them to
/// a [`TaskRunner`](crate::execute::TaskRunner).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Step {
  /// An opaque command template. Args may contain the `{input_dir}`,
  /// `{output_dir}` and `{assets_dir}` slugs.
  Command {
    args: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,
  },
  /// No local processing is needed.
  Online,
}

impl Step {
  /// Short label used in task identities and work directory names,
  /// e.g. `command-ogr2ogr`.
  pub fn kind(&self) -> String {
    match self {
      Step::Command { args, .. } => match program_name(args) {
        Some(program) => format!("command-{}", program),
        None => "command".to_string(),
      },
      Step::Online => "online".to_string(),
    }
  }

  /// Human-readable account of what the step did, for the provenance record.
  pub fn provenance(&self) -> String {
    match self {
      Step::Command {
        description: Some(description),
        ..
      } => description.trim().to_string(),
      Step::Command { args, .. } => args.iter().filter(|a| !a.is_empty()).cloned().collect::<Vec<_>>().join(" "),
      Step::Online => "Online layer, no local processing.".to_string(),
    }
  }

  /// Interpolate the directory slugs into the command args.
  pub fn render_args(&self, input_dir: &Path, output_dir: &Path, assets_dir: &Path) -> Vec<String> {
    match self {
      Step::Command { args, .. } => args
        .iter()
        .map(|arg| {
          arg
            .replace("{input_dir}", &input_dir.to_string_lossy())
            .replace("{output_dir}", &output_dir.to_string_lossy())
            .replace("{assets_dir}", &assets_dir.to_string_lossy())
        })
        .collect(),
      Step::Online => Vec::new(),
    }
  }
}

/// First argument that is not an environment assignment, reduced to a file name.
fn program_name(args: &[String]) -> Option<String> {
  let program = args.iter().find(|a| !a.is_empty() && !a.contains('='))?;
  let base = Path::new(program).file_name()?.to_string_lossy();
  let sanitized: String = base
    .chars()
    .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
    .collect();
  Some(sanitized)
}
