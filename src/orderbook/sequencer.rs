//! Sequence state machine for snapshot + delta feeds.
//!
//! Every message carries `seqId` and `prevSeqId`. The machine classifies each
//! one against the book's cursor and mutates the book accordingly:
//!
//! | condition                                   | result      |
//! |---------------------------------------------|-------------|
//! | `seqId == prevSeqId`                        | `Skip`      |
//! | snapshot with `prevSeqId == -1`             | `Boot` / `Reset` |
//! | not yet booted                              | `ProtocolOrder` error |
//! | `prevSeqId == lastSeqId`                    | `Apply`     |
//! | `prevSeqId <  lastSeqId`                    | `ResetPath` |
//! | `prevSeqId >  lastSeqId`                    | `SequenceGap` error |
//!
//! Errors are fatal. The machine has no recovery state; the caller aborts.

use std::fmt;

use serde::Serialize;
use tracing::{debug, warn};

use super::BookState;
use crate::error::Error;
use crate::types::{IncomingMessage, SeqId, UNSET_SEQ_ID};

/// Classified outcome of one message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Transition {
    /// First snapshot; the book is now booted
    Boot {
        /// Bid levels after boot
        bids_n: usize,
        /// Ask levels after boot
        asks_n: usize,
    },
    /// A later full snapshot replaced the book
    Reset {
        /// Snapshot sequence id
        seq_id: SeqId,
    },
    /// A sequential delta was merged
    Apply {
        /// Bid levels in the delta
        bids_delta_n: usize,
        /// Ask levels in the delta
        asks_delta_n: usize,
        /// Both delta lists were empty
        empty: bool,
    },
    /// Stale `prevSeqId`; cursor moved, deltas dropped, book kept
    ResetPath {
        /// Message sequence id
        seq_id: SeqId,
        /// Message's stale reference
        prev_seq_id: SeqId,
    },
    /// `prevSeqId` ahead of the cursor; only produced from a
    /// [`Error::SequenceGap`] for reporting
    Gap {
        /// Message sequence id
        seq_id: SeqId,
        /// Message's reference
        prev_seq_id: SeqId,
        /// `prev_seq_id - last_seq_id`, saturating at `i64::MAX`
        gap: i64,
    },
    /// `seqId == prevSeqId`; nothing changed
    Skip {
        /// Message sequence id
        seq_id: SeqId,
    },
}

impl Transition {
    /// Reporting form of a fatal gap error; `None` for any other error
    #[must_use]
    pub fn from_gap(err: &Error) -> Option<Self> {
        match *err {
            Error::SequenceGap {
                seq_id,
                prev_seq_id,
                gap,
                ..
            } => Some(Transition::Gap {
                seq_id,
                prev_seq_id,
                gap,
            }),
            _ => None,
        }
    }

    /// Short upper-case name, e.g. `RESET_PATH`
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Transition::Boot { .. } => "BOOT",
            Transition::Reset { .. } => "RESET",
            Transition::Apply { .. } => "APPLY",
            Transition::ResetPath { .. } => "RESET_PATH",
            Transition::Gap { .. } => "GAP",
            Transition::Skip { .. } => "SKIP",
        }
    }
}

impl fmt::Display for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Lifecycle of the machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequenceState {
    /// Waiting for the first snapshot
    Unbooted,
    /// A snapshot has been applied; all further messages operate from here
    Booted,
}

/// Drives one [`BookState`] through a capture.
///
/// # Example
///
/// ```rust
/// use book_replay::orderbook::{SequenceStateMachine, Transition};
/// use book_replay::types::IncomingMessage;
///
/// let mut machine = SequenceStateMachine::new();
/// let boot = machine
///     .apply(&IncomingMessage::snapshot(1, -1, &[("100", "1")], &[("101", "1")]))
///     .unwrap();
/// assert_eq!(boot, Transition::Boot { bids_n: 1, asks_n: 1 });
///
/// let apply = machine
///     .apply(&IncomingMessage::update(2, 1, &[("100", "0")], &[]))
///     .unwrap();
/// assert!(matches!(apply, Transition::Apply { bids_delta_n: 1, .. }));
/// assert!(machine.book().bids().is_empty());
/// ```
#[derive(Debug, Default)]
pub struct SequenceStateMachine {
    book: BookState,
}

impl SequenceStateMachine {
    /// Create a machine owning an empty book
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current lifecycle state
    #[must_use]
    pub fn state(&self) -> SequenceState {
        if self.book.is_booted() {
            SequenceState::Booted
        } else {
            SequenceState::Unbooted
        }
    }

    /// Read access to the book
    #[must_use]
    pub fn book(&self) -> &BookState {
        &self.book
    }

    /// Consume the machine, returning the final book
    #[must_use]
    pub fn into_book(self) -> BookState {
        self.book
    }

    /// Classify `msg` and apply it to the book.
    ///
    /// # Errors
    ///
    /// - [`Error::ProtocolOrder`] for a non-snapshot message before boot
    /// - [`Error::SequenceGap`] if `prevSeqId` is ahead of the cursor
    ///
    /// The book is not modified when an error is returned.
    pub fn apply(&mut self, msg: &IncomingMessage) -> Result<Transition, Error> {
        let body = msg.body();
        let (seq_id, prev_seq_id) = (body.seq_id, body.prev_seq_id);

        if seq_id == prev_seq_id {
            debug!(seq_id, "no-op message");
            return Ok(Transition::Skip { seq_id });
        }

        if let IncomingMessage::Snapshot(snapshot) = msg {
            if prev_seq_id == UNSET_SEQ_ID {
                self.book.replace(&snapshot.bids, &snapshot.asks);
                self.book.set_last_seq_id(seq_id);
                let transition = if self.book.boot() {
                    Transition::Reset { seq_id }
                } else {
                    let (bids_n, asks_n) = self.book.num_levels();
                    Transition::Boot { bids_n, asks_n }
                };
                debug!(seq_id, %transition, "snapshot applied");
                return Ok(transition);
            }
        }

        if !self.book.is_booted() {
            return Err(Error::ProtocolOrder { seq_id });
        }

        let last_seq_id = self.book.last_seq_id();
        if prev_seq_id == last_seq_id {
            self.book.merge(&body.bids, &body.asks);
            self.book.set_last_seq_id(seq_id);
            Ok(Transition::Apply {
                bids_delta_n: body.bids.len(),
                asks_delta_n: body.asks.len(),
                empty: body.bids.is_empty() && body.asks.is_empty(),
            })
        } else if prev_seq_id < last_seq_id {
            // Stale reference: keep the book, move the cursor, drop the deltas.
            warn!(
                seq_id,
                prev_seq_id,
                last_seq_id,
                "stale prevSeqId, deltas not merged"
            );
            self.book.set_last_seq_id(seq_id);
            Ok(Transition::ResetPath {
                seq_id,
                prev_seq_id,
            })
        } else {
            Err(Error::SequenceGap {
                seq_id,
                prev_seq_id,
                last_seq_id,
                // Ids come straight from the capture and may span the whole i64 range.
                gap: prev_seq_id.saturating_sub(last_seq_id),
            })
        }
    }
}
