//! CLI: Replay an edit script onto a pipeline stage graph.
//!
//! Starts from a fresh `start -> stage_0 -> end` graph (or a snapshot given with
//! `--snapshot-in`), applies each `append <id>` / `fork <id>` line of the
//! script in order, and writes the resulting snapshot as JSON.
//!
//! Usage: `stage_editor [OPTIONS] [path-to-script]`
//! Example: stage_editor --snapshot-out out/pipeline.json demos/fork.stages
//!
//! Set RUST_LOG=stageweave=trace for TRACE-level span enter/exit and events.

use clap::Parser;
use stageweave::config::{EditorConfig, load_config};
use stageweave::invariants::collect_violations;
use stageweave::snapshot_io::{restore_editor, save_snapshot};
use stageweave::{PipelineEditor, script};
use std::env;
use std::fs;
use std::path::PathBuf;
use std::process;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt::format::FmtSpan};

/// Replay an edit script onto a pipeline stage graph.
#[derive(Parser, Debug)]
#[command(name = "stage_editor")]
#[command(
  after_help = r#"Environment variables (override the matching flags when set):
  STAGEWEAVE_FORK_WIDTH     Legs per fork (default: 2, or the config file's value).
  STAGEWEAVE_SNAPSHOT_OUT   Where to write the resulting snapshot JSON.

Script format, one command per line (# and // start comments):
  append stage_0
  fork stage_1

Examples:
  stage_editor demos/fork.stages
  stage_editor --snapshot-in pipeline.json --snapshot-out pipeline.json more.stages"#
)]
struct Args {
  /// Editor config JSON (placement, stage_height, lateral_offset, fork_width).
  #[arg(long, value_name = "FILE")]
  config: Option<PathBuf>,

  /// Legs per fork. Overridden by STAGEWEAVE_FORK_WIDTH if set.
  #[arg(long, value_name = "N")]
  fork_width: Option<usize>,

  /// Snapshot to start from instead of a fresh graph.
  #[arg(long, value_name = "FILE")]
  snapshot_in: Option<PathBuf>,

  /// Write the snapshot here instead of stdout. Overridden by STAGEWEAVE_SNAPSHOT_OUT if set.
  #[arg(long, value_name = "FILE")]
  snapshot_out: Option<PathBuf>,

  /// Verify structural invariants after replay; exit 1 on any violation.
  #[arg(long)]
  check: bool,

  /// Edit script to replay. Without one, the starting graph is written unchanged.
  #[arg(value_name = "path-to-script")]
  script: Option<PathBuf>,
}

fn main() {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
    .with_span_events(FmtSpan::ENTER | FmtSpan::EXIT)
    .with_writer(std::io::stderr)
    .init();

  info!("stage_editor starting");
  let args = Args::parse();

  // Env vars override flags.
  let fork_width = match env::var("STAGEWEAVE_FORK_WIDTH") {
    Ok(v) => match v.parse::<usize>() {
      Ok(n) => Some(n),
      Err(e) => {
        eprintln!("Error parsing STAGEWEAVE_FORK_WIDTH '{}': {}", v, e);
        process::exit(1);
      }
    },
    Err(_) => args.fork_width,
  };
  let snapshot_out = env::var("STAGEWEAVE_SNAPSHOT_OUT")
    .ok()
    .map(PathBuf::from)
    .or_else(|| args.snapshot_out.clone());

  let mut config = match &args.config {
    Some(path) => match load_config(path) {
      Ok(c) => c,
      Err(e) => {
        eprintln!("Error reading config {}: {}", path.display(), e);
        process::exit(1);
      }
    },
    None => EditorConfig::default(),
  };
  if let Some(n) = fork_width {
    config.fork_width = n;
  }
  info!(fork_width = config.fork_width, snapshot_out = ?snapshot_out, "options (env or flags)");

  let commands = match &args.script {
    Some(path) => {
      let source = match fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) => {
          eprintln!("Error reading {}: {}", path.display(), e);
          process::exit(1);
        }
      };
      match script::parse_script(&source) {
        Ok(c) => c,
        Err(e) => {
          eprintln!("Error parsing script: {}", e);
          process::exit(1);
        }
      }
    }
    None => Vec::new(),
  };

  let editor = match &args.snapshot_in {
    Some(path) => restore_editor(path, config)
      .map_err(|e| format!("Error loading snapshot {}: {}", path.display(), e)),
    None => PipelineEditor::new(config).map_err(|e| format!("Error: {}", e)),
  };
  let mut editor = match editor {
    Ok(e) => e,
    Err(msg) => {
      eprintln!("{}", msg);
      process::exit(1);
    }
  };

  for (i, command) in commands.iter().enumerate() {
    if let Err(e) = editor.apply(command) {
      eprintln!("Edit error (command {}: {}): {}", i + 1, command, e);
      process::exit(1);
    }
  }
  info!(
    commands = commands.len(),
    nodes = editor.graph().node_count(),
    links = editor.graph().link_count(),
    forks = editor.forks().len(),
    "script replayed"
  );

  if args.check {
    let violations = collect_violations(editor.graph());
    if !violations.is_empty() {
      for v in &violations {
        eprintln!("Invariant violation: {}", v);
      }
      process::exit(1);
    }
    info!("invariants hold");
  }

  let snapshot = editor.snapshot();
  match snapshot_out {
    Some(path) => {
      if let Err(e) = save_snapshot(&path, &snapshot) {
        eprintln!("Error writing {}: {}", path.display(), e);
        process::exit(1);
      }
      println!("Pipeline written to {}.", path.display());
      println!("  Nodes: {}", editor.graph().node_count());
      println!("  Links: {}", editor.graph().link_count());
      println!("  Forks: {}", editor.forks().len());
    }
    None => match serde_json::to_string_pretty(&snapshot) {
      Ok(json) => println!("{}", json),
      Err(e) => {
        eprintln!("Error serializing snapshot: {}", e);
        process::exit(1);
      }
    },
  }
}
