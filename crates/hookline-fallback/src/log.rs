use std::{
  collections::BTreeMap,
  fs::{self, OpenOptions},
  io::{self, Write},
  path::{Path, PathBuf},
};

use tracing::{debug, warn};

use crate::{
  entry::FallbackEntry,
  error::{Error, Result},
};

const LOG_SUFFIX: &str = "_fallback.jsonl";
const LOCK_SUFFIX: &str = "_fallback.lock";

/// A directory of per-hook fallback logs.
#[derive(Debug, Clone)]
pub struct FallbackLog {
  dir: PathBuf,
}

impl FallbackLog {
  pub fn new(dir: impl Into<PathBuf>) -> Self { Self { dir: dir.into() } }

  pub fn dir(&self) -> &Path { &self.dir }

  /// Path of the log file for `hook`.
  pub fn path(&self, hook: &str) -> Result<PathBuf> {
    validate_hook_name(hook)?;
    Ok(self.dir.join(format!("{hook}{LOG_SUFFIX}")))
  }

  pub(crate) fn lock_path(&self, hook: &str) -> Result<PathBuf> {
    validate_hook_name(hook)?;
    Ok(self.dir.join(format!("{hook}{LOCK_SUFFIX}")))
  }

  // ─── Append ──────────────────────────────────────────────────────────────

  /// Append `payload` under `hook`. Never panics and never returns an
  /// error; `false` means the record was lost and a warning was logged.
  pub fn append(&self, hook: &str, payload: &serde_json::Value) -> bool {
    match self.try_append(hook, payload) {
      Ok(()) => {
        debug!(hook, dir = %self.dir.display(), "wrote fallback entry");
        true
      }
      Err(e) => {
        warn!(hook, error = %e, "failed to write fallback entry");
        false
      }
    }
  }

  /// Fallible form of [`FallbackLog::append`].
  ///
  /// The line is handed to the OS in one `O_APPEND` write so concurrent
  /// appenders from separate processes do not interleave.
  pub fn try_append(&self, hook: &str, payload: &serde_json::Value) -> Result<()> {
    let path = self.path(hook)?;
    fs::create_dir_all(&self.dir)?;

    let entry = FallbackEntry::new(hook, payload.clone());
    let mut line = serde_json::to_vec(&entry)?;
    line.push(b'\n');

    let mut file = OpenOptions::new().create(true).append(true).open(&path)?;
    file.write_all(&line)?;
    Ok(())
  }

  // ─── Inspection ──────────────────────────────────────────────────────────

  /// Entries of `hook` not yet replayed. Missing files count as zero and
  /// malformed lines are skipped.
  pub fn pending_count(&self, hook: &str) -> usize {
    match self.read_entries(hook) {
      Ok(Some((entries, _))) => entries.iter().filter(|e| !e.replayed).count(),
      Ok(None) => 0,
      Err(e) => {
        warn!(hook, error = %e, "could not read fallback log");
        0
      }
    }
  }

  /// Pending counts for every hook with a log in the directory, omitting
  /// hooks with nothing pending.
  pub fn all_pending(&self) -> BTreeMap<String, usize> {
    let mut out = BTreeMap::new();
    let read_dir = match fs::read_dir(&self.dir) {
      Ok(rd) => rd,
      Err(e) if e.kind() == io::ErrorKind::NotFound => return out,
      Err(e) => {
        warn!(dir = %self.dir.display(), error = %e, "could not list fallback directory");
        return out;
      }
    };

    for dirent in read_dir.flatten() {
      let name = dirent.file_name();
      let Some(hook) = name.to_str().and_then(|n| n.strip_suffix(LOG_SUFFIX)) else {
        continue;
      };
      if validate_hook_name(hook).is_err() {
        continue;
      }
      let count = self.pending_count(hook);
      if count > 0 {
        out.insert(hook.to_owned(), count);
      }
    }
    out
  }

  /// Every parseable entry of `hook`, in file order.
  pub fn entries(&self, hook: &str) -> Result<Vec<FallbackEntry>> {
    Ok(self.read_entries(hook)?.map(|(entries, _)| entries).unwrap_or_default())
  }

  /// Parsed entries plus the number of bytes read, or `None` when the file
  /// does not exist.
  pub(crate) fn read_entries(
    &self,
    hook: &str,
  ) -> Result<Option<(Vec<FallbackEntry>, usize)>> {
    let path = self.path(hook)?;
    let raw = match fs::read(&path) {
      Ok(raw) => raw,
      Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
      Err(e) => return Err(e.into()),
    };
    // A line torn by a killed writer may not even be UTF-8; skip it alone.
    let entries = raw
      .split(|b| *b == b'\n')
      .filter_map(|line| std::str::from_utf8(line).ok())
      .filter_map(FallbackEntry::parse_line)
      .collect();
    Ok(Some((entries, raw.len())))
  }
}

fn validate_hook_name(hook: &str) -> Result<()> {
  let ok = !hook.is_empty()
    && hook.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-');
  if ok { Ok(()) } else { Err(Error::InvalidHookName(hook.to_owned())) }
}
