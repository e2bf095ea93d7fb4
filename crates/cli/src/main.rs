mod cmd;
mod output;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::output::OutputFormat;

/// layerpack - build geospatial layer packages from declarative layer trees
#[derive(Parser)]
#[command(name = "layerpack")]
#[command(author, version, about, long_about = None)]
struct Cli {
  /// Enable verbose output
  #[arg(short, long, global = true)]
  verbose: bool,

  /// Project directory
  #[arg(short = 'C', long, global = true, default_value = ".")]
  project: PathBuf,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Compile the layer tree and print it
  Tree {
    /// Glob selecting layer ids
    #[arg(short, long)]
    pattern: Option<String>,
  },

  /// List the selected layers
  List {
    /// Glob selecting layer ids
    #[arg(short, long)]
    pattern: Option<String>,

    /// Output format
    #[arg(short = 'o', long = "format", value_enum, default_value_t)]
    format: OutputFormat,
  },

  /// Fetch, process and finalize the selected layers
  Build {
    /// Glob selecting layer ids
    #[arg(short, long)]
    pattern: Option<String>,

    /// Only fetch assets, skip processing and finalizing
    #[arg(long)]
    fetch_only: bool,

    /// Maximum number of tasks running at once
    #[arg(short, long)]
    jobs: Option<usize>,

    /// Start no new task after the first failure
    #[arg(long)]
    fail_fast: bool,

    /// Output root (overrides the project file and LAYERPACK_OUTPUT)
    #[arg(long = "output")]
    output_dir: Option<PathBuf>,

    /// Output format
    #[arg(short = 'o', long = "format", value_enum, default_value_t)]
    format: OutputFormat,
  },

  /// Remove build outputs so that they are rebuilt
  Clean {
    /// Remove fetch directories matching this glob (`<dataset>.<asset>`)
    #[arg(long = "fetch", value_name = "GLOB")]
    fetch: Vec<String>,

    /// Remove WIP directories of layers matching this glob
    #[arg(long = "wip", value_name = "GLOB")]
    wip: Vec<String>,

    /// Remove every fetch directory
    #[arg(long)]
    all_fetch: bool,

    /// Remove every WIP directory
    #[arg(long)]
    all_wip: bool,

    /// Keep the finalized outputs
    #[arg(long)]
    keep_final: bool,

    /// Show what would be removed without removing anything
    #[arg(long)]
    dry_run: bool,

    /// Output root (overrides the project file and LAYERPACK_OUTPUT)
    #[arg(long = "output")]
    output_dir: Option<PathBuf>,

    /// Output format
    #[arg(short = 'o', long = "format", value_enum, default_value_t)]
    format: OutputFormat,
  },
}

fn main() -> Result<()> {
  let cli = Cli::parse();

  let filter = if cli.verbose {
    EnvFilter::new("debug")
  } else {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
  };
  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(std::io::stderr)
    .without_time()
    .init();

  match cli.command {
    Commands::Tree { pattern } => cmd::cmd_tree(&cli.project, pattern.as_deref()),
    Commands::List { pattern, format } => cmd::cmd_list(&cli.project, pattern.as_deref(), format),
    Commands::Build {
      pattern,
      fetch_only,
      jobs,
      fail_fast,
      output_dir,
      format,
    } => cmd::cmd_build(
      &cli.project,
      cmd::BuildArgs {
        pattern,
        fetch_only,
        jobs,
        fail_fast,
        output_dir,
      },
      format,
    ),
    Commands::Clean {
      fetch,
      wip,
      all_fetch,
      all_wip,
      keep_final,
      dry_run,
      output_dir,
      format,
    } => cmd::cmd_clean(
      &cli.project,
      layerpack_lib::clean::CleanOptions {
        fetch,
        wip,
        all_fetch,
        all_wip,
        keep_final,
        dry_run,
      },
      output_dir,
      format,
    ),
  }
}
