//! Layered configuration.
//!
//! Sources, highest priority first:
//!
//! 1. the process environment,
//! 2. `.env` next to the running executable,
//! 3. `.env` in the project root,
//! 4. `.env` in the shared directory (`HOOKLINE_SHARED_DIR`, default
//!    `/etc/hookline`),
//! 5. `~/.claude/.env`,
//! 6. the legacy `~/.config/hookline/.env`.
//!
//! Each `.env` file is parsed into a key map and fed to the `config` crate as
//! an environment source, lowest priority first, so later sources override
//! earlier ones. The result is one [`HookConfig`] built per process and passed
//! by reference from there on.

use std::{
  fs,
  path::{Path, PathBuf},
  str::FromStr,
  time::Duration,
};

use serde::Deserialize;
use tracing::{debug, warn};

use crate::Result;

const DEFAULT_SHARED_DIR: &str = "/etc/hookline";
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 3;
const DEFAULT_STATEMENT_TIMEOUT_MS: u64 = 5000;
const DEFAULT_REPLAY_MAX: usize = 100;

// ─── Resolved configuration ──────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct HookConfig {
  /// Connection string, if any source provides or implies one.
  pub database_url:      Option<String>,
  pub fallback_dir:      PathBuf,
  pub log_file:          PathBuf,
  pub connect_timeout:   Duration,
  pub statement_timeout: Duration,
  /// Upper bound on entries replayed per hook per run.
  pub replay_max:        usize,
  /// Set by the host for the session the hook belongs to.
  pub session_id:        Option<String>,
  pub project_name:      Option<String>,
  pub voyage_api_key:    Option<String>,
  pub anthropic_api_key: Option<String>,
}

/// Raw keys as they appear in the environment (lower-cased by `config`).
/// Numbers stay strings here so one bad value cannot sink the rest.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawSettings {
  database_uri:                  Option<String>,
  database_url:                  Option<String>,
  postgres_connection_string:    Option<String>,
  postgres_host:                 Option<String>,
  postgres_port:                 Option<String>,
  postgres_database:             Option<String>,
  postgres_user:                 Option<String>,
  postgres_password:             Option<String>,
  voyage_api_key:                Option<String>,
  anthropic_api_key:             Option<String>,
  hookline_fallback_dir:         Option<String>,
  hookline_log_file:             Option<String>,
  hookline_connect_timeout_secs: Option<String>,
  hookline_statement_timeout_ms: Option<String>,
  hookline_replay_max:           Option<String>,
  claude_session_id:             Option<String>,
  claude_project_name:           Option<String>,
  home:                          Option<String>,
}

impl HookConfig {
  /// Resolve configuration for a hook running against `project_root`.
  pub fn load(project_root: Option<&Path>) -> Result<Self> {
    let process_env: config::Map<String, String> = std::env::vars().collect();
    let files = env_file_locations(project_root, &process_env);
    Self::from_sources(&files, process_env)
  }

  /// Build from explicit `.env` paths (highest priority first) and an
  /// explicit process environment.
  pub fn from_sources(
    env_files: &[PathBuf],
    process_env: config::Map<String, String>,
  ) -> Result<Self> {
    let mut builder = config::Config::builder();
    for path in env_files.iter().rev() {
      if let Some(vars) = read_env_file(path) {
        debug!(path = %path.display(), keys = vars.len(), "loaded env file");
        builder = builder.add_source(env_source(vars));
      }
    }
    builder = builder.add_source(env_source(process_env));

    let raw: RawSettings = builder.build()?.try_deserialize()?;
    Ok(Self::from_raw(raw))
  }

  /// Defaults only; used when configuration cannot be read at all.
  pub fn fallback_defaults() -> Self { Self::from_raw(RawSettings::default()) }

  fn from_raw(raw: RawSettings) -> Self {
    let home = raw.home.as_deref().map(PathBuf::from);
    let in_claude_dir = |rest: &str| {
      home.as_deref().map_or_else(|| PathBuf::from(".claude").join(rest), |h| {
        h.join(".claude").join(rest)
      })
    };

    let fallback_dir = raw
      .hookline_fallback_dir
      .as_deref()
      .and_then(non_placeholder)
      .map(|p| expand_tilde(Path::new(p), home.as_deref()))
      .unwrap_or_else(|| in_claude_dir("hook_fallback"));
    let log_file = raw
      .hookline_log_file
      .as_deref()
      .and_then(non_placeholder)
      .map(|p| expand_tilde(Path::new(p), home.as_deref()))
      .unwrap_or_else(|| in_claude_dir("hooks.log"));

    Self {
      database_url: resolve_database_url(&raw),
      fallback_dir,
      log_file,
      connect_timeout: Duration::from_secs(number_or(
        "HOOKLINE_CONNECT_TIMEOUT_SECS",
        raw.hookline_connect_timeout_secs.as_deref(),
        DEFAULT_CONNECT_TIMEOUT_SECS,
      )),
      statement_timeout: Duration::from_millis(number_or(
        "HOOKLINE_STATEMENT_TIMEOUT_MS",
        raw.hookline_statement_timeout_ms.as_deref(),
        DEFAULT_STATEMENT_TIMEOUT_MS,
      )),
      replay_max: number_or(
        "HOOKLINE_REPLAY_MAX",
        raw.hookline_replay_max.as_deref(),
        DEFAULT_REPLAY_MAX,
      ),
      session_id: raw.claude_session_id.filter(|s| !s.is_empty()),
      project_name: raw.claude_project_name.filter(|s| !s.is_empty()),
      voyage_api_key: raw.voyage_api_key.filter(|s| non_placeholder(s).is_some()),
      anthropic_api_key: raw.anthropic_api_key.filter(|s| non_placeholder(s).is_some()),
    }
  }
}

// ─── Connection string ───────────────────────────────────────────────────────

/// `DATABASE_URI` > `DATABASE_URL` > `POSTGRES_CONNECTION_STRING`, else a URL
/// built from the `POSTGRES_*` parts. The built form needs a password.
fn resolve_database_url(raw: &RawSettings) -> Option<String> {
  let explicit = [&raw.database_uri, &raw.database_url, &raw.postgres_connection_string]
    .into_iter()
    .flatten()
    .find_map(|s| non_placeholder(s));
  if let Some(url) = explicit {
    return Some(url.to_owned());
  }

  let password = raw.postgres_password.as_deref().and_then(non_placeholder)?;
  let host = raw.postgres_host.as_deref().and_then(non_placeholder).unwrap_or("localhost");
  let port: u16 = number_or("POSTGRES_PORT", raw.postgres_port.as_deref(), 5432);
  let database = raw
    .postgres_database
    .as_deref()
    .and_then(non_placeholder)
    .unwrap_or("ai_company_foundation");
  let user = raw.postgres_user.as_deref().and_then(non_placeholder).unwrap_or("postgres");

  Some(format!(
    "postgresql://{}:{}@{host}:{port}/{database}",
    encode_userinfo(user),
    encode_userinfo(password),
  ))
}

/// Percent-encode everything outside the URL "unreserved" set.
fn encode_userinfo(s: &str) -> String {
  let mut out = String::with_capacity(s.len());
  for b in s.bytes() {
    if b.is_ascii_alphanumeric() || matches!(b, b'-' | b'.' | b'_' | b'~') {
      out.push(b as char);
    } else {
      out.push_str(&format!("%{b:02X}"));
    }
  }
  out
}

/// One environment layer. Empty values count as unset.
fn env_source(vars: config::Map<String, String>) -> config::Environment {
  config::Environment::default().ignore_empty(true).source(Some(vars))
}

/// Parse a numeric setting, keeping `default` when it is unset or malformed.
fn number_or<T: FromStr>(key: &str, value: Option<&str>, default: T) -> T {
  let Some(value) = value.and_then(non_placeholder) else {
    return default;
  };
  value.parse().unwrap_or_else(|_| {
    warn!(key, value, "ignoring non-numeric setting");
    default
  })
}

/// Trimmed value, or `None` for empty values and literal `${VAR}`
/// placeholders some launchers leave unexpanded.
fn non_placeholder(value: &str) -> Option<&str> {
  let value = value.trim();
  let placeholder = value.starts_with("${") && value.ends_with('}');
  (!value.is_empty() && !placeholder).then_some(value)
}

// ─── .env files ──────────────────────────────────────────────────────────────

/// Candidate `.env` files, highest priority first.
fn env_file_locations(
  project_root: Option<&Path>,
  process_env: &config::Map<String, String>,
) -> Vec<PathBuf> {
  let mut files = Vec::new();

  if let Ok(exe) = std::env::current_exe()
    && let Some(dir) = exe.parent()
  {
    files.push(dir.join(".env"));
  }

  let project_root = project_root
    .map(Path::to_path_buf)
    .or_else(|| process_env.get("CLAUDE_PROJECT_DIR").map(PathBuf::from))
    .or_else(|| std::env::current_dir().ok());
  if let Some(root) = project_root {
    files.push(root.join(".env"));
  }

  let shared = process_env
    .get("HOOKLINE_SHARED_DIR")
    .map(String::as_str)
    .unwrap_or(DEFAULT_SHARED_DIR);
  files.push(Path::new(shared).join(".env"));

  if let Some(home) = process_env.get("HOME").map(PathBuf::from) {
    files.push(home.join(".claude").join(".env"));
    files.push(home.join(".config").join("hookline").join(".env"));
  }

  files.dedup();
  files
}

fn read_env_file(path: &Path) -> Option<config::Map<String, String>> {
  let contents = fs::read_to_string(path).ok()?;
  Some(parse_env(&contents))
}

/// Parse `.env` text: `KEY=VALUE` lines, `#` comments, optional `export`
/// prefix, matching surrounding quotes stripped, `${VAR}` placeholders
/// skipped. Within one file the first definition of a key wins.
pub fn parse_env(contents: &str) -> config::Map<String, String> {
  let mut vars = config::Map::new();
  for line in contents.lines() {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
      continue;
    }
    let line = line.strip_prefix("export ").unwrap_or(line);
    let Some((key, value)) = line.split_once('=') else {
      continue;
    };
    let key = key.trim();
    let mut value = value.trim();
    if value.len() >= 2 {
      let (first, last) = (value.as_bytes()[0], value.as_bytes()[value.len() - 1]);
      if first == last && (first == b'"' || first == b'\'') {
        value = &value[1..value.len() - 1];
      }
    }
    if key.is_empty() || (value.starts_with("${") && value.ends_with('}')) {
      continue;
    }
    vars.entry(key.to_owned()).or_insert_with(|| value.to_owned());
  }
  vars
}

/// Expand a leading `~` to `home`.
pub fn expand_tilde(path: &Path, home: Option<&Path>) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Some(home) = home
  {
    return home.join(rest);
  }
  path.to_path_buf()
}
