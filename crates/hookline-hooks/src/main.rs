//! `hookline` — hook entry points for the work-tracking database.
//!
//! # Usage
//!
//! ```text
//! echo '{"tool_name":"mcp__postgres__execute_sql","tool_input":{"sql":"..."}}' \
//!   | hookline validate-write
//! hookline session-start < event.json
//! hookline fallback status
//! hookline fallback replay --hook mcp_usage --max 50
//! ```
//!
//! Stdout carries exactly one JSON object; logs go to the hooks log file.

use std::{
  fs::{self, OpenOptions},
  io::{self, Read},
  path::Path,
  process::ExitCode,
  sync::Mutex,
};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use hookline_hooks::{
  config::HookConfig,
  handlers::{
    HookContext, fallback, mcp_usage, session_end, session_start, subagent_start, validate_write,
  },
  input::HookInput,
  output::HookOutcome,
  store::{self, AnyStore},
};
use tracing::{error, level_filters::LevelFilter, warn};
use tracing_subscriber::EnvFilter;

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(author, version, about = "Hook handlers for the work-tracking database")]
struct Cli {
  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug, Clone)]
enum Command {
  /// PreToolUse: validate a database write (exit 0 allow, 1 warn, 2 block).
  ValidateWrite,
  /// SessionStart: replay queued records and restore saved state.
  SessionStart,
  /// SessionEnd: save session state and close the session.
  SessionEnd,
  /// SubagentStart: record an agent spawn.
  SubagentStart,
  /// PostToolUse: record an MCP tool call.
  McpUsage,
  /// Inspect or drain the fallback queue.
  Fallback {
    #[command(subcommand)]
    action: FallbackAction,
  },
}

#[derive(Subcommand, Debug, Clone)]
enum FallbackAction {
  /// Pending entries per hook.
  Status,
  /// Replay pending entries into the database.
  Replay {
    /// Only this hook's log.
    #[arg(long)]
    hook: Option<String>,
    /// Maximum entries per hook (default: HOOKLINE_REPLAY_MAX).
    #[arg(long)]
    max:  Option<usize>,
  },
}

impl Command {
  fn reads_stdin(&self) -> bool { !matches!(self, Self::Fallback { .. }) }
}

// ─── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
  let cli = Cli::parse();

  let (input, input_error) = read_input(&cli.command);

  let loaded = HookConfig::load(input.cwd.as_deref()).context("resolving configuration");
  let config = match &loaded {
    Ok(config) => config.clone(),
    Err(_) => HookConfig::fallback_defaults(),
  };
  init_tracing(&config.log_file);

  if let Some(e) = &input_error {
    warn!(error = %format!("{e:#}"), "hook input unusable; treating as empty");
  }
  if let Err(e) = &loaded {
    warn!(error = %format!("{e:#}"), "using default configuration");
  }

  let answer = fail_open(&cli.command);
  std::panic::set_hook(Box::new(move |info| {
    error!(panic = %info, "hook panicked; failing open");
    println!("{}", answer.output);
    std::process::exit(i32::from(answer.exit));
  }));

  let outcome = run(&cli.command, config, &input).await;
  println!("{}", outcome.output);
  ExitCode::from(outcome.exit)
}

async fn run(command: &Command, config: HookConfig, input: &HookInput) -> HookOutcome {
  let needs_store = match command {
    Command::ValidateWrite => {
      validate_write::is_database_tool(input.tool_name.as_deref().unwrap_or_default())
    }
    Command::Fallback { action: FallbackAction::Status } => false,
    _ => true,
  };
  let store = if needs_store { store::connect(&config).await } else { None };
  let ctx: HookContext<AnyStore> = HookContext::new(config, store);

  match command {
    Command::ValidateWrite => validate_write::run(&ctx, input).await,
    Command::SessionStart => session_start::run(&ctx, input).await,
    Command::SessionEnd => session_end::run(&ctx, input).await,
    Command::SubagentStart => subagent_start::run(&ctx, input).await,
    Command::McpUsage => mcp_usage::run(&ctx, input).await,
    Command::Fallback { action: FallbackAction::Status } => fallback::status(&ctx),
    Command::Fallback { action: FallbackAction::Replay { hook, max } } => {
      fallback::replay(&ctx, hook.as_deref(), *max).await
    }
  }
}

/// The answer printed if the handler panics.
fn fail_open(command: &Command) -> HookOutcome {
  match command {
    Command::ValidateWrite => HookOutcome::allow("Validation unavailable; allowing"),
    _ => HookOutcome::empty(),
  }
}

/// The parsed stdin event, plus the error to log once tracing is up.
fn read_input(command: &Command) -> (HookInput, Option<anyhow::Error>) {
  if !command.reads_stdin() {
    return (HookInput::default(), None);
  }
  match read_stdin().and_then(|raw| HookInput::parse(&raw).context("parsing hook input")) {
    Ok(input) => (input, None),
    Err(e) => (HookInput::default(), Some(e)),
  }
}

fn read_stdin() -> Result<String> {
  let mut raw = String::new();
  io::stdin().read_to_string(&mut raw).context("reading hook input from stdin")?;
  Ok(raw)
}

// ─── Logging ──────────────────────────────────────────────────────────────────

/// Log to `log_file` in append mode, or to stderr if it cannot be opened.
/// Stdout belongs to the hook answer.
fn init_tracing(log_file: &Path) {
  let filter = EnvFilter::builder()
    .with_default_directive(LevelFilter::INFO.into())
    .from_env_lossy();

  if let Some(parent) = log_file.parent() {
    let _ = fs::create_dir_all(parent);
  }
  match OpenOptions::new().create(true).append(true).open(log_file) {
    Ok(file) => tracing_subscriber::fmt()
      .with_env_filter(filter)
      .with_ansi(false)
      .with_writer(Mutex::new(file))
      .init(),
    Err(_) => tracing_subscriber::fmt()
      .with_env_filter(filter)
      .with_writer(io::stderr)
      .init(),
  }
}
