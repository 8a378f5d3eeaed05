//! Audit records emitted during replay.
//!
//! The replay engine needs exactly one capability from its environment: a
//! place to append audit records. [`AuditSink`] is that seam. Appending is
//! fire-and-forget; nothing a sink does can influence the replay.
//!
//! Provided sinks:
//!
//! - [`MemorySink`] - collects records in a `Vec` for inspection
//! - [`TracingSink`] - forwards records to `tracing` at `info` level

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;
use tracing::{info, warn};

use crate::orderbook::Transition;

/// Audit event kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditEvent {
    /// First snapshot applied
    BookBoot,
    /// Book replaced by a later snapshot, or cursor moved past a stale reference
    BookReset,
    /// Delta merged, or a no-op message skipped
    BookApply,
    /// Fatal sequence gap
    BookGap,
    /// Replay finished and the digest was compared against the lock
    BookSeal,
}

impl AuditEvent {
    /// Wire name, e.g. `BOOK_GAP`
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            AuditEvent::BookBoot => "BOOK_BOOT",
            AuditEvent::BookReset => "BOOK_RESET",
            AuditEvent::BookApply => "BOOK_APPLY",
            AuditEvent::BookGap => "BOOK_GAP",
            AuditEvent::BookSeal => "BOOK_SEAL",
        }
    }
}

impl fmt::Display for AuditEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Scalar attribute value
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Scalar {
    /// Integer
    Int(i64),
    /// Boolean
    Bool(bool),
    /// String
    Str(String),
}

impl From<i64> for Scalar {
    fn from(v: i64) -> Self {
        Scalar::Int(v)
    }
}

impl From<u64> for Scalar {
    fn from(v: u64) -> Self {
        Scalar::Int(i64::try_from(v).unwrap_or(i64::MAX))
    }
}

impl From<usize> for Scalar {
    fn from(v: usize) -> Self {
        Scalar::Int(i64::try_from(v).unwrap_or(i64::MAX))
    }
}

impl From<bool> for Scalar {
    fn from(v: bool) -> Self {
        Scalar::Bool(v)
    }
}

impl From<&str> for Scalar {
    fn from(v: &str) -> Self {
        Scalar::Str(v.to_string())
    }
}

impl From<String> for Scalar {
    fn from(v: String) -> Self {
        Scalar::Str(v)
    }
}

/// One audit record
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuditRecord {
    /// Event kind
    pub event: AuditEvent,
    /// Stable machine-readable reason
    pub reason_code: &'static str,
    /// Event attributes, ordered by key
    pub attrs: BTreeMap<&'static str, Scalar>,
}

impl AuditRecord {
    /// Create a record with no attributes
    #[must_use]
    pub fn new(event: AuditEvent, reason_code: &'static str) -> Self {
        Self {
            event,
            reason_code,
            attrs: BTreeMap::new(),
        }
    }

    /// Add an attribute
    #[must_use]
    pub fn with_attr(mut self, key: &'static str, value: impl Into<Scalar>) -> Self {
        self.attrs.insert(key, value.into());
        self
    }

    /// Record carrying a transition's fields
    #[must_use]
    pub fn from_transition(transition: &Transition) -> Self {
        let (event, reason_code) = match *transition {
            Transition::Boot { .. } => (AuditEvent::BookBoot, "SNAPSHOT_BOOT"),
            Transition::Reset { .. } => (AuditEvent::BookReset, "SNAPSHOT_RESET"),
            Transition::Apply { empty: true, .. } => (AuditEvent::BookApply, "DELTA_EMPTY"),
            Transition::Apply { .. } => (AuditEvent::BookApply, "DELTA_APPLIED"),
            Transition::ResetPath { .. } => (AuditEvent::BookReset, "STALE_PREV_SEQ"),
            Transition::Gap { .. } => (AuditEvent::BookGap, "PREV_SEQ_AHEAD"),
            Transition::Skip { .. } => (AuditEvent::BookApply, "SEQ_UNCHANGED"),
        };

        let mut record = Self::new(event, reason_code);
        let attrs = &mut record.attrs;
        match *transition {
            Transition::Boot { bids_n, asks_n } => {
                attrs.insert("bids_n", bids_n.into());
                attrs.insert("asks_n", asks_n.into());
            }
            Transition::Reset { seq_id } | Transition::Skip { seq_id } => {
                attrs.insert("seqId", seq_id.into());
            }
            Transition::Apply {
                bids_delta_n,
                asks_delta_n,
                empty,
            } => {
                attrs.insert("bids_delta_n", bids_delta_n.into());
                attrs.insert("asks_delta_n", asks_delta_n.into());
                attrs.insert("empty", empty.into());
            }
            Transition::ResetPath {
                seq_id,
                prev_seq_id,
            } => {
                attrs.insert("seqId", seq_id.into());
                attrs.insert("prevSeqId", prev_seq_id.into());
            }
            Transition::Gap {
                seq_id,
                prev_seq_id,
                gap,
            } => {
                attrs.insert("seqId", seq_id.into());
                attrs.insert("prevSeqId", prev_seq_id.into());
                attrs.insert("gap", gap.into());
            }
        }
        record
    }
}

/// Destination for audit records
pub trait AuditSink {
    /// Append one record
    fn append(&mut self, record: AuditRecord);
}

impl<S: AuditSink + ?Sized> AuditSink for &mut S {
    fn append(&mut self, record: AuditRecord) {
        (**self).append(record);
    }
}

/// Sink that keeps every record in memory
#[derive(Debug, Default)]
pub struct MemorySink {
    records: Vec<AuditRecord>,
}

impl MemorySink {
    /// Create an empty sink
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All records in append order
    #[must_use]
    pub fn records(&self) -> &[AuditRecord] {
        &self.records
    }

    /// Number of records of the given kind
    #[must_use]
    pub fn count(&self, event: AuditEvent) -> usize {
        self.records.iter().filter(|r| r.event == event).count()
    }

    /// Write all records as JSON lines
    ///
    /// # Errors
    ///
    /// Returns an error if a record fails to serialize.
    pub fn to_json_lines(&self) -> serde_json::Result<String> {
        let mut out = String::new();
        for record in &self.records {
            out.push_str(&serde_json::to_string(record)?);
            out.push('\n');
        }
        Ok(out)
    }
}

impl AuditSink for MemorySink {
    fn append(&mut self, record: AuditRecord) {
        self.records.push(record);
    }
}

/// Sink that logs each record through `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl AuditSink for TracingSink {
    fn append(&mut self, record: AuditRecord) {
        let attrs = match serde_json::to_string(&record.attrs) {
            Ok(attrs) => attrs,
            Err(err) => {
                warn!(target: "book_replay::audit", error = %err, "attrs not serializable");
                format!("{:?}", record.attrs)
            }
        };
        info!(
            target: "book_replay::audit",
            event = %record.event,
            reason_code = record.reason_code,
            attrs = %attrs,
            "audit"
        );
    }
}
