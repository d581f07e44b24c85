//! Shared data types for the task-intake service: the parser's output,
//! the ledger's persisted records, and the mailbox cursor.

pub mod cursor;
pub mod ledger;
pub mod offer;

pub use cursor::MailboxCursor;
pub use ledger::{AcceptedTask, AllocationEntry, CapacityLogEntry, OverrideMap};
pub use offer::TaskOffer;
