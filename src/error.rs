//! Error types for the book-replay crate.
//!
//! Every failure the engine can raise is fatal for the replay that raised it:
//! a malformed message, a non-snapshot message before boot, or a sequence gap.
//! Nothing is retried, since re-applying a delta would corrupt the book.

use crate::types::SeqId;

/// The main error type for this crate
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A capture line could not be parsed as JSON at all
    #[error("line {line}: invalid JSON: {source}")]
    Parse {
        /// 1-based line number in the capture
        line: usize,
        /// Underlying parser error
        #[source]
        source: serde_json::Error,
    },

    /// A message is well-formed JSON but does not have the expected shape
    /// (missing `data`, non-integer sequence ids, unknown action, bad levels)
    #[error("line {line}: schema violation: {reason}")]
    SchemaViolation {
        /// 1-based line number in the capture
        line: usize,
        /// What was wrong with the message
        reason: String,
    },

    /// A non-snapshot message arrived before the book was booted
    #[error("protocol order violation: update seqId={seq_id} before initial snapshot")]
    ProtocolOrder {
        /// Sequence id of the offending message
        seq_id: SeqId,
    },

    /// Orderbook sequence gap detected (missed messages)
    #[error("sequence gap: seqId={seq_id} prevSeqId={prev_seq_id} last={last_seq_id} (gap {gap})")]
    SequenceGap {
        /// Sequence id of the offending message
        seq_id: SeqId,
        /// Sequence the sender believed was current
        prev_seq_id: SeqId,
        /// Last sequence applied to the book
        last_seq_id: SeqId,
        /// `prev_seq_id - last_seq_id`, saturating at `i64::MAX`
        gap: i64,
    },

    /// The expected-lock record could not be used
    #[error("invalid lock: {0}")]
    Lock(String),

    /// A required input was not supplied by the caller
    #[error("required input missing: {0}")]
    InputMissing(String),

    /// JSON serialization/deserialization error outside of capture parsing
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error while the caller reads its inputs
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
