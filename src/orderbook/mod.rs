//! Order book reconstruction.
//!
//! This module provides:
//!
//! - [`book`] - Bid/ask sides and the sequence cursor ([`BookState`])
//! - [`sequencer`] - The snapshot/delta state machine ([`SequenceStateMachine`])
//! - [`digest`] - Canonical serialization and SHA-256 book digest
//!
//! # Example
//!
//! ```rust
//! use book_replay::orderbook::{book_digest, SequenceStateMachine};
//! use book_replay::types::IncomingMessage;
//!
//! let mut machine = SequenceStateMachine::new();
//! machine
//!     .apply(&IncomingMessage::snapshot(1, -1, &[("100", "1")], &[("101", "1")]))
//!     .unwrap();
//!
//! let digest = book_digest(machine.book()).unwrap();
//! assert_eq!(digest.len(), 64);
//! ```

pub mod book;
pub mod digest;
pub mod sequencer;

pub use book::{BookSide, BookState};
pub use digest::{book_digest, canonical_json, sha256_hex};
pub use sequencer::{SequenceState, SequenceStateMachine, Transition};
