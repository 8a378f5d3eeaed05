//! Capture and lock types.
//!
//! - [`messages`] - Exchange push messages, validated at parse time
//! - [`lock`] - Sealed expected-lock records

pub mod lock;
pub mod messages;

pub use lock::{ExpectedLock, LockField};
pub use messages::{Action, BookMessage, IncomingMessage, PriceLevel};

/// Exchange sequence counter
///
/// Signed because snapshots carry `prevSeqId = -1`.
pub type SeqId = i64;

/// `prevSeqId` value marking a full snapshot, and the cursor of an unbooted book
pub const UNSET_SEQ_ID: SeqId = -1;
