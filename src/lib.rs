//! # book-replay
//!
//! Deterministic replay of captured order-book feeds and verification of the
//! reconstructed book against a sealed lock.
//!
//! ## Features
//!
//! - **Sequence State Machine** - Snapshot boot, sequential deltas, stale-reference
//!   resets, and fatal gap detection from `seqId` / `prevSeqId`
//! - **Exact Decimals** - Prices and sizes stay strings; ordering never touches a float
//! - **Canonical Digest** - One byte-exact serialization of the book, hashed with SHA-256
//! - **Lock Verification** - Compare a replay with a previously sealed record
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use book_replay::audit::TracingSink;
//! use book_replay::replay::verify_capture;
//! use book_replay::types::ExpectedLock;
//! use book_replay::Config;
//!
//! # fn example() -> book_replay::Result<()> {
//! let raw = std::fs::read("capture.jsonl")?;
//! let lock = ExpectedLock::from_json(&std::fs::read_to_string("capture.lock.json")?)?;
//!
//! let result = verify_capture(&raw, &lock, &Config::new("okx-books"), TracingSink);
//! std::process::exit(result.exit_code());
//! # }
//! ```
//!
//! ## Architecture
//!
//! - [`decimal`] - Total order over decimal strings
//! - [`types`] - Capture messages and lock records
//! - [`orderbook`] - Book state, sequence state machine, canonical digest
//! - [`replay`] - Replay driver and lock comparison
//! - [`audit`] - Audit record sink
//! - [`config`] - Caller-side verification settings
//! - [`error`] - Error types for the crate
//!
//! ## Determinism
//!
//! - Messages are applied strictly in file order
//! - Book sides are `BTreeMap`s; output order comes from the decimal comparator
//! - No wall-clock, hash-map iteration order, or float formatting reaches the digest

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![deny(unsafe_code)]

pub mod audit;
pub mod config;
pub mod decimal;
pub mod error;
pub mod orderbook;
pub mod replay;
pub mod types;

// Re-export main types at crate root for convenience
pub use config::Config;
pub use error::Error;
pub use replay::{verify, verify_capture, ReplayReport, ReplayVerifier, VerifyResult};

/// Result type alias using the crate's Error type
pub type Result<T> = std::result::Result<T, Error>;
