use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Maximum number of UIDs retained in a cursor's dedup set. Mandated by the
/// spec unconditionally; a documented bug in the source system left this
/// uncapped on some paths, which is not reproduced here.
pub const SEEN_UIDS_CAP: usize = 1000;

/// Per-mailbox "already processed" marker: the last UID whose batch fully
/// committed, plus a defensive set of recently-seen UIDs guarding against
/// cursor/fetch races.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MailboxCursor {
    pub last_seen_uid: u32,
    pub seen_uids: BTreeSet<u32>,
}

impl MailboxCursor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, uid: u32) -> bool {
        self.seen_uids.contains(&uid)
    }

    /// Merge freshly-fetched UIDs in, advance `last_seen_uid` to their max,
    /// and trim the dedup set back down to [`SEEN_UIDS_CAP`] entries,
    /// keeping the numerically largest.
    pub fn advance(&mut self, fetched_uids: &[u32]) {
        if fetched_uids.is_empty() {
            return;
        }
        for &uid in fetched_uids {
            self.seen_uids.insert(uid);
        }
        if let Some(&max) = fetched_uids.iter().max() {
            self.last_seen_uid = self.last_seen_uid.max(max);
        }
        self.trim();
    }

    fn trim(&mut self) {
        while self.seen_uids.len() > SEEN_UIDS_CAP {
            let smallest = *self.seen_uids.iter().next().expect("non-empty");
            self.seen_uids.remove(&smallest);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advance_tracks_max_uid_and_merges() {
        let mut cursor = MailboxCursor::new();
        cursor.advance(&[101, 102, 105]);
        assert_eq!(cursor.last_seen_uid, 105);
        assert!(cursor.contains(101));
        assert!(cursor.contains(105));
    }

    #[test]
    fn advance_caps_seen_uids_keeping_largest() {
        let mut cursor = MailboxCursor::new();
        let uids: Vec<u32> = (1..=(SEEN_UIDS_CAP as u32 + 50)).collect();
        cursor.advance(&uids);
        assert_eq!(cursor.seen_uids.len(), SEEN_UIDS_CAP);
        assert!(cursor.contains(SEEN_UIDS_CAP as u32 + 50));
        assert!(!cursor.contains(1));
    }

    #[test]
    fn advance_with_empty_batch_is_noop() {
        let mut cursor = MailboxCursor::new();
        cursor.advance(&[10, 20]);
        let before = cursor.clone();
        cursor.advance(&[]);
        assert_eq!(cursor, before);
    }

    #[test]
    fn s5_redelivered_uid_is_recognized_as_seen() {
        let mut cursor = MailboxCursor::new();
        cursor.advance(&[101]);
        assert!(cursor.contains(101), "a replayed UID must be skippable via contains()");
        cursor.advance(&[101]);
        assert_eq!(cursor.last_seen_uid, 101, "re-advancing with an already-seen UID does not regress the cursor");
    }
}
