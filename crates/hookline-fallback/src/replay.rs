use std::{
  fs::{self, File, OpenOptions},
  io::{self, Write},
  path::Path,
};

use fd_lock::RwLock;
use tempfile::NamedTempFile;
use tracing::{info, warn};

use crate::{
  entry::FallbackEntry,
  error::{Error, Result},
  log::FallbackLog,
};

impl FallbackLog {
  /// Replay pending entries of `hook` through `replay_fn`, oldest first.
  ///
  /// Stops at the first entry `replay_fn` rejects, or after `max_entries`
  /// successes. Entries it accepted are marked replayed and the file is
  /// rewritten in place; once nothing in the file is pending it is deleted.
  /// Malformed lines are dropped on rewrite. Returns the number of entries
  /// replayed by this call; a missing file replays zero.
  ///
  /// Fails with [`Error::Busy`] when another replay of `hook` holds the
  /// lock.
  pub async fn replay<F, Fut>(
    &self,
    hook: &str,
    max_entries: usize,
    mut replay_fn: F,
  ) -> Result<usize>
  where
    F: FnMut(serde_json::Value) -> Fut,
    Fut: Future<Output = bool>,
  {
    let lock_path = self.lock_path(hook)?;
    let path = self.path(hook)?;
    if !path.exists() {
      return Ok(0);
    }

    let mut lock = open_lock(&lock_path)?;
    let _guard = lock.try_write().map_err(|e| match e.kind() {
      io::ErrorKind::WouldBlock => Error::Busy(hook.to_owned()),
      _ => Error::Io(e),
    })?;

    // Re-read under the lock; a concurrent replay may have drained it.
    let Some((mut entries, consumed)) = self.read_entries(hook)? else {
      return Ok(0);
    };

    let mut replayed = 0;
    for entry in entries.iter_mut().filter(|e| !e.replayed) {
      if replayed >= max_entries {
        break;
      }
      if replay_fn(entry.data.clone()).await {
        entry.replayed = true;
        replayed += 1;
      } else {
        warn!(hook, timestamp = %entry.timestamp, "replay rejected entry, stopping");
        break;
      }
    }

    // Lines appended while we were replaying.
    let tail = appended_since(&path, consumed)?;
    let drained = tail.iter().all(u8::is_ascii_whitespace) && entries.iter().all(|e| e.replayed);

    if drained {
      fs::remove_file(&path)?;
      info!(hook, replayed, "fallback log drained");
    } else {
      rewrite(&path, &entries, &tail)?;
      let remaining = entries.iter().filter(|e| !e.replayed).count();
      info!(hook, replayed, remaining, "fallback log rewritten");
    }

    Ok(replayed)
  }
}

fn open_lock(lock_path: &Path) -> Result<RwLock<File>> {
  if let Some(parent) = lock_path.parent() {
    fs::create_dir_all(parent)?;
  }
  let file = OpenOptions::new().create(true).truncate(false).write(true).open(lock_path)?;
  Ok(RwLock::new(file))
}

fn appended_since(path: &Path, consumed: usize) -> Result<Vec<u8>> {
  let current = fs::read(path)?;
  Ok(current.get(consumed..).map(<[u8]>::to_vec).unwrap_or_default())
}

/// Replace `path` with `entries` followed by the raw `tail`, via a sibling
/// temp file so readers never see a partial log.
fn rewrite(path: &Path, entries: &[FallbackEntry], tail: &[u8]) -> Result<()> {
  let dir = path.parent().unwrap_or_else(|| Path::new("."));
  let mut tmp = NamedTempFile::new_in(dir)?;
  for entry in entries {
    serde_json::to_writer(&mut tmp, entry)?;
    tmp.write_all(b"\n")?;
  }
  tmp.write_all(tail)?;
  tmp.as_file().sync_all()?;
  tmp.persist(path).map_err(|e| e.error)?;
  Ok(())
}
