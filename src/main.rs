use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use serde_json::json;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use sequin_flow::Project;
use sequin_runtime::{
  BreakpointSet, Command, ComponentRegistry, DebugInfo, FlowRunner, LogKind, Runtime,
  RuntimeConfig, RuntimeHandle, SingleStepMode,
};

/// Sequin - a dataflow runtime for flow-graph projects
#[derive(Parser)]
#[command(name = "sequin")]
#[command(version, about, long_about = None)]
struct Cli {
  /// Path to the data directory (default: ~/.sequin)
  #[arg(long, global = true)]
  data_dir: Option<PathBuf>,

  #[command(subcommand)]
  command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
  /// Run a project until it stops
  Run {
    /// Path to the project file (JSON)
    project_file: PathBuf,

    /// Start paused with the debugger active. Debugger commands are read
    /// from stdin, one per line.
    #[arg(long)]
    debugger: bool,

    /// Start this action flow after the pages
    #[arg(long)]
    action: Option<String>,

    /// Component path to break on, e.g. "main/components/add"
    #[arg(long = "breakpoint")]
    breakpoints: Vec<String>,

    /// Milliseconds between scheduler passes
    #[arg(long, default_value_t = 10)]
    tick_ms: u64,

    /// Stop once nothing is queued or running
    #[arg(long)]
    until_idle: bool,

    /// Write a debug-info snapshot here when the runtime stops
    #[arg(long)]
    debug_info: Option<PathBuf>,
  },

  /// Summarize a debug-info snapshot
  Inspect {
    /// Path to the debug-info file (JSON)
    debug_info_file: PathBuf,
  },
}

struct RunOptions {
  project_file: PathBuf,
  debugger: bool,
  action: Option<String>,
  breakpoints: Vec<String>,
  tick_ms: u64,
  until_idle: bool,
  debug_info: Option<PathBuf>,
}

fn main() -> Result<()> {
  let cli = Cli::parse();

  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
    .with_writer(std::io::stderr)
    .init();

  let data_dir = match cli.data_dir {
    Some(dir) => dir,
    None => dirs::home_dir()
      .context("could not determine home directory")?
      .join(".sequin"),
  };

  match cli.command {
    Some(Commands::Run {
      project_file,
      debugger,
      action,
      breakpoints,
      tick_ms,
      until_idle,
      debug_info,
    }) => {
      let options = RunOptions {
        project_file,
        debugger,
        action,
        breakpoints,
        tick_ms,
        until_idle,
        debug_info,
      };
      let rt = tokio::runtime::Runtime::new()?;
      rt.block_on(async { run_project(options, data_dir).await })?;
    }
    Some(Commands::Inspect { debug_info_file }) => {
      inspect(&debug_info_file)?;
    }
    None => {
      println!("sequin - use --help to see available commands");
    }
  }

  Ok(())
}

async fn run_project(options: RunOptions, data_dir: PathBuf) -> Result<()> {
  let content = tokio::fs::read_to_string(&options.project_file)
    .await
    .with_context(|| {
      format!(
        "failed to read project file: {}",
        options.project_file.display()
      )
    })?;
  let project = Project::from_json(&content).with_context(|| {
    format!(
      "failed to load project file: {}",
      options.project_file.display()
    )
  })?;
  let project = Arc::new(project);

  eprintln!("Loaded project: {}", project.name);

  let mut breakpoints = BreakpointSet::new();
  for path in &options.breakpoints {
    let component = project
      .resolve_component_path(path)
      .with_context(|| format!("breakpoint component '{path}' not found"))?;
    breakpoints.add(component);
  }

  let config = RuntimeConfig {
    tick: Duration::from_millis(options.tick_ms),
    debugger: options.debugger,
    settings_path: Some(data_dir.join("settings.json")),
    stop_when_idle: options.until_idle,
  };
  let mut runtime = Runtime::new(Arc::clone(&project), ComponentRegistry::builtin(), config)
    .context("failed to create runtime")?
    .with_breakpoints(Box::new(breakpoints));

  if let Some(action) = &options.action {
    runtime.start_runtime(options.debugger);
    runtime
      .start_action(action)
      .with_context(|| format!("failed to start action '{action}'"))?;
  }

  let runner = FlowRunner::new(runtime).context("failed to create flow runner")?;
  let cancel = CancellationToken::new();

  let ctrl_c = cancel.clone();
  tokio::spawn(async move {
    if tokio::signal::ctrl_c().await.is_ok() {
      info!("interrupt received");
      ctrl_c.cancel();
    }
  });

  if options.debugger {
    tokio::spawn(control_from_stdin(runner.handle()));
  }

  let runtime = runner.run(cancel).await;

  if let Some(path) = &options.debug_info {
    runtime
      .save_debug_info(path)
      .with_context(|| format!("failed to write debug info: {}", path.display()))?;
    eprintln!("Debug info written to {}", path.display());
  }

  let output: Vec<&str> = runtime
    .logs()
    .iter()
    .filter(|item| item.kind == LogKind::User)
    .map(|item| item.message.as_str())
    .collect();
  let summary = json!({
    "state": runtime.state(),
    "error": runtime.error(),
    "output": output,
  });
  println!("{}", serde_json::to_string_pretty(&summary)?);

  if let Some(error) = runtime.error() {
    bail!("runtime stopped with error: {error}");
  }
  Ok(())
}

/// Forward debugger commands typed on stdin to the runner.
async fn control_from_stdin(handle: RuntimeHandle) {
  let mut lines = BufReader::new(tokio::io::stdin()).lines();

  while let Ok(Some(line)) = lines.next_line().await {
    let command = match line.trim() {
      "" => continue,
      "pause" => Command::Pause,
      "resume" => Command::Resume,
      "run" => Command::Run,
      "step" | "step-into" => Command::SingleStep(Some(SingleStepMode::StepInto)),
      "step-over" => Command::SingleStep(Some(SingleStepMode::StepOver)),
      "step-out" => Command::SingleStep(Some(SingleStepMode::StepOut)),
      "toggle" => Command::ToggleDebugger,
      "stop" => Command::Stop,
      other => {
        warn!(command = other, "unknown debugger command");
        continue;
      }
    };

    if handle.send(command).is_err() {
      break;
    }
  }
}

fn inspect(path: &Path) -> Result<()> {
  let info = DebugInfo::read(path)
    .with_context(|| format!("failed to read debug info: {}", path.display()))?;

  let flow_states: Vec<_> = info
    .flow_states
    .iter()
    .map(|flow_state| {
      json!({
        "id": flow_state.id,
        "flow": flow_state.flow,
        "isFinished": flow_state.is_finished,
        "numActiveComponents": flow_state.num_active_components,
        "children": flow_state.flow_states.len(),
      })
    })
    .collect();
  let queue: Vec<&str> = info
    .queue
    .iter()
    .map(|task| task.component.as_str())
    .collect();

  let summary = json!({
    "state": info.state,
    "error": info.error,
    "flowStates": flow_states,
    "queue": queue,
    "logs": info.logs.len(),
    "globalVariables": info.global_variables,
  });
  println!("{}", serde_json::to_string_pretty(&summary)?);
  Ok(())
}
