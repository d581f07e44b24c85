//! Durable per-mailbox UID cursor (component A). Two files per mailbox,
//! named by a sanitized mailbox key: `uidStore_<key>.json` and
//! `seenUids_<key>.json`. Both written atomically; a missing or malformed
//! file yields an empty cursor, never an error.

use std::path::{Path, PathBuf};

use intake_model::cursor::{MailboxCursor, SEEN_UIDS_CAP};
use serde::{Deserialize, Serialize};

use crate::persist::{read_json_tolerant, write_atomic};

/// Replace every run of non-word characters in `mailbox` with `_`, so it is
/// safe to embed in a filename.
pub fn sanitize_mailbox_key(mailbox: &str) -> String {
    mailbox
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '_' { c } else { '_' })
        .collect()
}

#[derive(Debug, Serialize, Deserialize)]
struct UidStoreFile {
    #[serde(rename = "lastSeenUid")]
    last_seen_uid: u32,
}

/// Durable UID store rooted at `data_dir`. One instance is shared across
/// all listeners; each listener only ever touches its own mailbox's pair
/// of files.
#[derive(Debug, Clone)]
pub struct UidStore {
    data_dir: PathBuf,
}

impl UidStore {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    fn uid_store_path(&self, mailbox: &str) -> PathBuf {
        self.data_dir
            .join(format!("uidStore_{}.json", sanitize_mailbox_key(mailbox)))
    }

    fn seen_uids_path(&self, mailbox: &str) -> PathBuf {
        self.data_dir
            .join(format!("seenUids_{}.json", sanitize_mailbox_key(mailbox)))
    }

    /// Load the cursor for `mailbox`. Missing or malformed files yield the
    /// default `(0, {})` cursor without error.
    pub async fn load(&self, mailbox: &str) -> MailboxCursor {
        let last_seen_uid = read_json_tolerant::<UidStoreFile>(self.uid_store_path(mailbox))
            .await
            .map(|f| f.last_seen_uid)
            .unwrap_or(0);
        let mut seen_uids: Vec<u32> = read_json_tolerant(self.seen_uids_path(mailbox))
            .await
            .unwrap_or_default();
        seen_uids.truncate(SEEN_UIDS_CAP);

        MailboxCursor {
            last_seen_uid,
            seen_uids: seen_uids.into_iter().collect(),
        }
    }

    /// Persist `cursor` for `mailbox`. `seen_uids` is capped at the
    /// numerically-largest [`SEEN_UIDS_CAP`] entries before write (the
    /// cursor itself already maintains this invariant via `advance`, this
    /// is a defensive re-assertion at the persistence boundary).
    ///
    /// Write failures are logged, never propagated: the listener re-dedups
    /// via IMAP state on next start regardless of whether this succeeded.
    pub async fn save(&self, mailbox: &str, cursor: &MailboxCursor) {
        let mut seen_uids: Vec<u32> = cursor.seen_uids.iter().copied().collect();
        seen_uids.sort_unstable();
        if seen_uids.len() > SEEN_UIDS_CAP {
            let drop = seen_uids.len() - SEEN_UIDS_CAP;
            seen_uids.drain(0..drop);
        }

        if let Err(err) = write_atomic(
            self.uid_store_path(mailbox),
            UidStoreFile {
                last_seen_uid: cursor.last_seen_uid,
            },
        )
        .await
        {
            tracing::error!(mailbox, error = %err, "failed to persist uid store");
        }

        if let Err(err) = write_atomic(self.seen_uids_path(mailbox), seen_uids).await {
            tracing::error!(mailbox, error = %err, "failed to persist seen uids");
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitizes_non_word_characters() {
        assert_eq!(sanitize_mailbox_key("orders@vendor.com"), "orders_vendor_com");
        assert_eq!(sanitize_mailbox_key("mailbox-1"), "mailbox_1");
    }

    #[tokio::test]
    async fn missing_files_yield_default_cursor() {
        let dir = tempfile::tempdir().unwrap();
        let store = UidStore::new(dir.path());
        let cursor = store.load("inbox").await;
        assert_eq!(cursor.last_seen_uid, 0);
        assert!(cursor.seen_uids.is_empty());
    }

    #[tokio::test]
    async fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = UidStore::new(dir.path());

        let mut cursor = MailboxCursor::new();
        cursor.advance(&[101, 102, 105]);
        store.save("inbox", &cursor).await;

        let loaded = store.load("inbox").await;
        assert_eq!(loaded.last_seen_uid, 105);
        assert!(loaded.contains(101));
        assert!(loaded.contains(105));
    }

    #[tokio::test]
    async fn save_caps_seen_uids_at_persistence_boundary() {
        let dir = tempfile::tempdir().unwrap();
        let store = UidStore::new(dir.path());

        let mut cursor = MailboxCursor::new();
        let uids: Vec<u32> = (1..=(SEEN_UIDS_CAP as u32 + 20)).collect();
        cursor.advance(&uids);
        store.save("inbox", &cursor).await;

        let loaded = store.load("inbox").await;
        assert_eq!(loaded.seen_uids.len(), SEEN_UIDS_CAP);
        assert!(loaded.contains(SEEN_UIDS_CAP as u32 + 20));
    }
}
