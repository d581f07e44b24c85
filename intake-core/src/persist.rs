//! Crash-safe JSON persistence: temp-write-then-rename, guarded by a
//! per-path advisory lock so a listener firing and an operator saving from
//! the same process never interleave writes to the same file.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use dashmap::DashMap;
use once_cell::sync::Lazy;
use serde::{Serialize, de::DeserializeOwned};
use tokio::sync::Mutex;

static FILE_LOCKS: Lazy<DashMap<PathBuf, Arc<Mutex<()>>>> = Lazy::new(DashMap::new);

fn lock_for(path: &Path) -> Arc<Mutex<()>> {
    FILE_LOCKS
        .entry(path.to_path_buf())
        .or_insert_with(|| Arc::new(Mutex::new(())))
        .clone()
}

/// Serialize `value` as JSON and write it to `path` atomically: write to a
/// sibling temp file in the same directory, then rename over the target.
/// The rename is what makes this crash-safe — a reader never observes a
/// partially-written file.
pub async fn write_atomic<T: Serialize + Send + 'static>(
    path: impl AsRef<Path>,
    value: T,
) -> io::Result<()> {
    let path = path.as_ref().to_path_buf();
    let lock = lock_for(&path);
    let _guard = lock.lock().await;

    tokio::task::spawn_blocking(move || {
        let dir = path.parent().unwrap_or_else(|| Path::new("."));
        std::fs::create_dir_all(dir)?;
        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        serde_json::to_writer_pretty(&mut tmp, &value)
            .map_err(|err| io::Error::new(io::ErrorKind::Other, err))?;
        use std::io::Write;
        tmp.flush()?;
        tmp.persist(&path)
            .map_err(|err| err.error)?;
        Ok(())
    })
    .await
    .map_err(|err| io::Error::new(io::ErrorKind::Other, err))?
}

/// Load and deserialize JSON from `path`. Returns `Ok(None)` for a missing
/// or malformed file — callers fall back to an empty default rather than
/// propagating a load error, per the "tolerant of missing/corrupt state"
/// rule shared by the UID store and the ledger.
pub async fn read_json_tolerant<T: DeserializeOwned + Send + 'static>(
    path: impl AsRef<Path>,
) -> Option<T> {
    let path = path.as_ref().to_path_buf();
    tokio::task::spawn_blocking(move || {
        let bytes = std::fs::read(&path).ok()?;
        match serde_json::from_slice(&bytes) {
            Ok(value) => Some(value),
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "malformed state file, falling back to empty state");
                None
            }
        }
    })
    .await
    .ok()
    .flatten()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Serialize, Deserialize, Debug, PartialEq)]
    struct Sample {
        value: u32,
    }

    #[tokio::test]
    async fn round_trips_through_atomic_write() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sample.json");

        write_atomic(&path, Sample { value: 42 }).await.unwrap();
        let loaded: Sample = read_json_tolerant(&path).await.unwrap();
        assert_eq!(loaded, Sample { value: 42 });
    }

    #[tokio::test]
    async fn missing_file_yields_none() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.json");
        let loaded: Option<Sample> = read_json_tolerant(&path).await;
        assert!(loaded.is_none());
    }

    #[tokio::test]
    async fn malformed_file_yields_none() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        tokio::fs::write(&path, b"not json").await.unwrap();
        let loaded: Option<Sample> = read_json_tolerant(&path).await;
        assert!(loaded.is_none());
    }
}
