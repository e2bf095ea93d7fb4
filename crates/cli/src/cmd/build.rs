//! Implementation of the `layerpack build` command.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result, bail};
use owo_colors::{OwoColorize, Stream};
use tracing::{info, warn};

use layerpack_lib::execute::{CommandRunner, ExecuteConfig, LayerOutcome, RunReport, execute};
use layerpack_lib::output_lock::OutputLock;
use layerpack_lib::pipeline::build_chains;

use crate::output::{OutputFormat, format_duration, print_error, print_json, print_stat, print_success, symbols};

/// Options of a build run collected from the command line.
#[derive(Debug, Default)]
pub struct BuildArgs {
  pub pattern: Option<String>,
  pub fetch_only: bool,
  pub jobs: Option<usize>,
  pub fail_fast: bool,
  pub output_dir: Option<PathBuf>,
}

/// Execute the build command.
///
/// Compiles the layer tree, derives the task chains of the selected layers
/// and runs them. Tasks whose output already exists are not run again, so an
/// interrupted build resumes where it stopped. Ctrl-C stops new tasks from
/// starting and lets running ones finish.
pub fn cmd_build(project_dir: &Path, args: BuildArgs, format: OutputFormat) -> Result<()> {
  let start = Instant::now();

  let (project, tree) = super::load_tree(project_dir, args.pattern.as_deref())?;
  let project = match args.output_dir {
    Some(dir) => project.with_output_dir(dir),
    None => project,
  };
  let layout = project.layout();
  let plan = build_chains(&tree, &layout, args.fetch_only);

  let _lock = OutputLock::acquire(layout.root(), "build").context("Failed to lock output directory")?;

  let mut config = ExecuteConfig {
    fail_fast: args.fail_fast,
    ..Default::default()
  };
  if let Some(jobs) = args.jobs.or(project.jobs) {
    config.parallelism = jobs.max(1);
  }

  info!(
    output = %layout.root().display(),
    layers = plan.layers.len(),
    tasks = plan.task_count(),
    parallelism = config.parallelism,
    "starting build"
  );

  let runner = Arc::new(CommandRunner::for_project(&project));
  let rt = tokio::runtime::Runtime::new().context("Failed to create async runtime")?;
  let report = rt
    .block_on(async {
      let abort = config.abort.clone();
      tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
          warn!("interrupted, waiting for running tasks");
          abort.raise();
        }
      });
      execute(&plan, runner, &config).await
    })
    .context("Build failed")?;

  let duration = start.elapsed();

  if format.is_json() {
    print_json(&json_report(&report, duration))?;
  } else {
    print_text_report(&report, &layout.final_root(), duration);
  }

  if !report.is_success() {
    let failed = report.layers.iter().filter(|l| !l.outcome.is_ok()).count();
    bail!("{} of {} layers did not build", failed, report.layers.len());
  }

  Ok(())
}

fn print_text_report(report: &RunReport, final_root: &Path, duration: std::time::Duration) {
  for layer in &report.layers {
    match &layer.outcome {
      LayerOutcome::Complete => println!(
        "  {} {}",
        symbols::SUCCESS.if_supports_color(Stream::Stdout, |s| s.green()),
        layer.layer_id
      ),
      LayerOutcome::Skipped => println!(
        "  {} {} (online, nothing to build)",
        symbols::SKIPPED.if_supports_color(Stream::Stdout, |s| s.dimmed()),
        layer.layer_id
      ),
      LayerOutcome::Failed { task, .. } => println!(
        "  {} {} (failed at {})",
        symbols::ERROR.if_supports_color(Stream::Stdout, |s| s.red()),
        layer.layer_id,
        task
      ),
      LayerOutcome::Blocked(reason) => println!(
        "  {} {} ({})",
        symbols::WARNING.if_supports_color(Stream::Stdout, |s| s.yellow()),
        layer.layer_id,
        reason
      ),
    }
  }

  for (_, error) in report.failures() {
    print_error(&error.to_string());
  }

  println!();
  if report.is_success() {
    print_success("Build complete");
  }
  print_stat("Tasks run", &report.executed().to_string());
  print_stat("Tasks cached", &report.cached().to_string());
  if report.failed() > 0 {
    print_stat("Tasks failed", &report.failed().to_string());
  }
  if report.blocked() > 0 {
    print_stat("Tasks blocked", &report.blocked().to_string());
  }
  print_stat("Output", &final_root.display().to_string());
  print_stat("Duration", &format_duration(duration));
}

fn json_report(report: &RunReport, duration: std::time::Duration) -> serde_json::Value {
  let layers: Vec<_> = report
    .layers
    .iter()
    .map(|layer| {
      let mut value = serde_json::json!({
        "id": layer.layer_id,
        "outcome": layer.outcome.label(),
      });
      match &layer.outcome {
        LayerOutcome::Failed { task, error } => {
          value["task"] = task.to_string().into();
          value["error"] = error.to_string().into();
        }
        LayerOutcome::Blocked(reason) => {
          value["reason"] = reason.to_string().into();
        }
        LayerOutcome::Complete | LayerOutcome::Skipped => {}
      }
      value
    })
    .collect();

  serde_json::json!({
    "success": report.is_success(),
    "layers": layers,
    "tasks": {
      "executed": report.executed(),
      "cached": report.cached(),
      "failed": report.failed(),
      "blocked": report.blocked(),
    },
    "duration_ms": duration.as_millis() as u64,
  })
}
