//! The eight error kinds the core reports through, per the error handling
//! design: each operation propagates one of these, never a raw I/O or
//! network error.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    /// IMAP timeouts, resets, DNS, TLS handshake. Recovered by listener
    /// reconnect.
    #[error("transient network error: {0}")]
    TransientNetwork(String),

    /// Malformed IMAP response, unexpected connection state.
    #[error("protocol error: {0}")]
    ProtocolError(String),

    /// Message parsing failed for a UID. The UID is still marked processed.
    #[error("parse error: {0}")]
    ParseError(String),

    /// `allocate` could not cover the requested word count by the deadline.
    #[error("insufficient capacity: could not allocate {amount_words} words by {planned_end_date}")]
    InsufficientCapacity {
        amount_words: f64,
        planned_end_date: String,
    },

    /// `allocate` called with no deadline.
    #[error("missing deadline: allocate requires a planned end date")]
    MissingDeadline,

    /// A disk write failed. In-memory state remains authoritative.
    #[error("persistence error: {0}")]
    Persistence(String),

    /// Operator API input validation failure.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Anything else in an API handler.
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

pub type CoreResult<T> = Result<T, CoreError>;
