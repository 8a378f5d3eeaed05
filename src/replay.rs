//! Capture replay and lock verification.
//!
//! A replay parses every capture line up front, feeds the messages through a
//! [`SequenceStateMachine`] in file order, and digests the final book. The
//! result is compared against an [`ExpectedLock`].
//!
//! Parsing is all-or-nothing: a single bad line fails the replay before any
//! message is applied. A sequence gap aborts the replay before a digest is
//! computed. Neither is retried.
//!
//! # Example
//!
//! ```rust
//! use book_replay::audit::MemorySink;
//! use book_replay::replay::{seal, verify, VerifyResult};
//!
//! let capture = [
//!     r#"{"action":"snapshot","data":[{"seqId":1,"prevSeqId":-1,"bids":[["100","1"]]}]}"#,
//!     r#"{"action":"update","data":[{"seqId":2,"prevSeqId":1,"bids":[["100","2"]]}]}"#,
//! ]
//! .join("\n");
//!
//! let lock = seal(capture.as_bytes(), "demo", None, &mut MemorySink::new()).unwrap();
//! let result = verify(capture.lines(), &lock, &mut MemorySink::new());
//! assert!(matches!(result, VerifyResult::Pass(_)));
//! assert_eq!(result.exit_code(), 0);
//! ```

use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::audit::{AuditEvent, AuditRecord, AuditSink};
use crate::config::{Config, DEFAULT_SCHEMA_VERSION};
use crate::error::Error;
use crate::orderbook::{book_digest, sha256_hex, SequenceStateMachine, Transition};
use crate::types::{ExpectedLock, IncomingMessage, LockField, SeqId};

/// Process exit code for a passing verification
pub const EXIT_PASS: i32 = 0;
/// Process exit code for a fatal replay or a lock mismatch
pub const EXIT_FAIL: i32 = 1;
/// Process exit code when a required input is missing
pub const EXIT_INPUT_MISSING: i32 = 2;

/// Transition counts for one replay
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TransitionStats {
    /// `Boot` transitions (0 or 1)
    pub boot: u64,
    /// `Reset` transitions
    pub reset: u64,
    /// `Apply` transitions, empty ones included
    pub apply: u64,
    /// `Apply` transitions with no levels
    pub apply_empty: u64,
    /// `ResetPath` transitions
    pub reset_path: u64,
    /// `Skip` transitions
    pub skip: u64,
}

impl TransitionStats {
    fn record(&mut self, transition: &Transition) {
        match transition {
            Transition::Boot { .. } => self.boot += 1,
            Transition::Reset { .. } => self.reset += 1,
            Transition::Apply { empty, .. } => {
                self.apply += 1;
                if *empty {
                    self.apply_empty += 1;
                }
            }
            Transition::ResetPath { .. } => self.reset_path += 1,
            Transition::Skip { .. } => self.skip += 1,
            // Gaps abort the replay and are never tallied.
            Transition::Gap { .. } => {}
        }
    }

    /// Total transitions recorded
    #[must_use]
    pub fn total(&self) -> u64 {
        self.boot + self.reset + self.apply + self.reset_path + self.skip
    }
}

/// Outcome of a completed (non-fatal) replay
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReplayReport {
    /// Messages replayed
    pub messages_n: u64,
    /// Book cursor after the last message
    #[serde(rename = "final_seqId")]
    pub final_seq_id: SeqId,
    /// Canonical book digest (lowercase hex SHA-256)
    pub canonical_digest: String,
    /// Transition counts
    pub stats: TransitionStats,
}

/// One field that did not match the lock
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldMismatch {
    /// Which field
    pub field: LockField,
    /// Value in the lock (or configuration)
    pub expected: String,
    /// Value observed
    pub actual: String,
}

impl FieldMismatch {
    fn new(field: LockField, expected: impl ToString, actual: impl ToString) -> Self {
        Self {
            field,
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }
}

/// Result of verifying a capture against a lock
#[derive(Debug)]
pub enum VerifyResult {
    /// Every compared field matched
    Pass(ReplayReport),
    /// At least one field differed
    Mismatch {
        /// The fields that differed, in comparison order
        fields: Vec<FieldMismatch>,
        /// The replay outcome; `None` if a precondition failed before replay
        report: Option<ReplayReport>,
    },
    /// The replay could not complete
    Fatal(Error),
}

impl VerifyResult {
    /// Exit code per the verification contract: 0 pass, 1 fail, 2 input missing
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self {
            VerifyResult::Pass(_) => EXIT_PASS,
            VerifyResult::Fatal(Error::InputMissing(_)) => EXIT_INPUT_MISSING,
            VerifyResult::Mismatch { .. } | VerifyResult::Fatal(_) => EXIT_FAIL,
        }
    }

    /// Check if verification passed
    #[must_use]
    pub fn is_pass(&self) -> bool {
        matches!(self, VerifyResult::Pass(_))
    }

    /// The first mismatched field, if any
    #[must_use]
    pub fn mismatched_field(&self) -> Option<LockField> {
        match self {
            VerifyResult::Mismatch { fields, .. } => fields.first().map(|m| m.field),
            _ => None,
        }
    }
}

/// Parse capture lines into messages.
///
/// Blank lines are ignored and not counted. Line numbers in errors are
/// 1-based positions in the input, blank lines included.
///
/// # Errors
///
/// The first [`Error::Parse`] or [`Error::SchemaViolation`] encountered.
pub fn parse_lines<I, S>(lines: I) -> Result<Vec<IncomingMessage>, Error>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    lines
        .into_iter()
        .enumerate()
        .filter(|(_, line)| !line.as_ref().trim().is_empty())
        .map(|(idx, line)| IncomingMessage::parse_line(line.as_ref(), idx + 1))
        .collect()
}

/// Split raw capture bytes into lines, requiring UTF-8.
///
/// # Errors
///
/// [`Error::SchemaViolation`] naming the first line that is not UTF-8.
pub fn split_lines(raw: &[u8]) -> Result<Vec<&str>, Error> {
    raw.split(|&b| b == b'\n')
        .enumerate()
        .map(|(idx, line)| {
            let line = line.strip_suffix(b"\r").unwrap_or(line);
            std::str::from_utf8(line).map_err(|e| Error::SchemaViolation {
                line: idx + 1,
                reason: format!("not valid UTF-8: {e}"),
            })
        })
        .collect()
}

/// Lowercase hex SHA-256 of the raw capture bytes
#[must_use]
pub fn raw_sha256(raw: &[u8]) -> String {
    sha256_hex(raw)
}

/// Drives a replay and reports each transition to an audit sink.
#[derive(Debug)]
pub struct ReplayVerifier<S> {
    sink: S,
}

impl<S: AuditSink> ReplayVerifier<S> {
    /// Create a verifier writing to `sink`
    pub fn new(sink: S) -> Self {
        Self { sink }
    }

    /// Consume the verifier, returning its sink
    pub fn into_sink(self) -> S {
        self.sink
    }

    /// Replay messages in order and digest the final book.
    ///
    /// Emits one audit record per transition. On a sequence gap a single
    /// `BOOK_GAP` record is emitted and no digest is computed.
    ///
    /// # Errors
    ///
    /// [`Error::ProtocolOrder`] or [`Error::SequenceGap`] from the state machine.
    pub fn replay(&mut self, messages: &[IncomingMessage]) -> Result<ReplayReport, Error> {
        info!(messages = messages.len(), "starting book replay");

        let mut machine = SequenceStateMachine::new();
        let mut stats = TransitionStats::default();

        for (index, msg) in messages.iter().enumerate() {
            match machine.apply(msg) {
                Ok(transition) => {
                    stats.record(&transition);
                    let record = AuditRecord::from_transition(&transition);
                    self.sink.append(record.with_attr("msg_index", index));
                }
                Err(err) => {
                    error!(msg_index = index, error = %err, "replay aborted");
                    if let Some(gap) = Transition::from_gap(&err) {
                        let record = AuditRecord::from_transition(&gap);
                        self.sink.append(record.with_attr("msg_index", index));
                    }
                    return Err(err);
                }
            }
        }

        let book = machine.into_book();
        let report = ReplayReport {
            messages_n: messages.len() as u64,
            final_seq_id: book.last_seq_id(),
            canonical_digest: book_digest(&book)?,
            stats,
        };

        info!(
            messages_n = report.messages_n,
            final_seq_id = report.final_seq_id,
            digest = %report.canonical_digest,
            resets = report.stats.reset,
            reset_paths = report.stats.reset_path,
            "replay complete"
        );
        Ok(report)
    }

    /// Parse `lines`, replay them, and compare the outcome with `expected`.
    ///
    /// Compares `messages_n`, `final_seqId` and the canonical digest. The
    /// raw capture hash is the caller's concern; see [`verify_capture`].
    pub fn verify<I, L>(&mut self, lines: I, expected: &ExpectedLock) -> VerifyResult
    where
        I: IntoIterator<Item = L>,
        L: AsRef<str>,
    {
        let messages = match parse_lines(lines) {
            Ok(messages) => messages,
            Err(err) => {
                error!(error = %err, "capture rejected");
                return VerifyResult::Fatal(err);
            }
        };
        let report = match self.replay(&messages) {
            Ok(report) => report,
            Err(err) => return VerifyResult::Fatal(err),
        };

        let mut fields = Vec::new();
        if report.messages_n != expected.messages_n {
            fields.push(FieldMismatch::new(
                LockField::MessagesN,
                expected.messages_n,
                report.messages_n,
            ));
        }
        if report.final_seq_id != expected.final_seq_id {
            fields.push(FieldMismatch::new(
                LockField::FinalSeqId,
                expected.final_seq_id,
                report.final_seq_id,
            ));
        }
        if report.canonical_digest != expected.canonical_book_digest_sha256 {
            fields.push(FieldMismatch::new(
                LockField::CanonicalDigest,
                &expected.canonical_book_digest_sha256,
                &report.canonical_digest,
            ));
        }

        let reason = if fields.is_empty() {
            "LOCK_MATCH"
        } else {
            "LOCK_MISMATCH"
        };
        let mut seal = AuditRecord::new(AuditEvent::BookSeal, reason)
            .with_attr("digest", report.canonical_digest.as_str())
            .with_attr("messages_n", report.messages_n)
            .with_attr("final_seqId", report.final_seq_id);
        if !fields.is_empty() {
            let names: Vec<_> = fields.iter().map(|m| m.field.as_str()).collect();
            seal = seal.with_attr("mismatched", names.join(","));
        }
        self.sink.append(seal);

        if fields.is_empty() {
            VerifyResult::Pass(report)
        } else {
            for m in &fields {
                warn!(
                    field = %m.field,
                    expected = %m.expected,
                    actual = %m.actual,
                    "lock mismatch"
                );
            }
            VerifyResult::Mismatch {
                fields,
                report: Some(report),
            }
        }
    }
}

/// Verify capture lines against a lock, auditing into `sink`
pub fn verify<I, L, S>(lines: I, expected: &ExpectedLock, sink: S) -> VerifyResult
where
    I: IntoIterator<Item = L>,
    L: AsRef<str>,
    S: AuditSink,
{
    ReplayVerifier::new(sink).verify(lines, expected)
}

/// Verify raw capture bytes against a lock, including the caller-side checks.
///
/// Before replaying, the lock's provider, schema version (when pinned) and
/// raw SHA-256 (when enabled) are checked against `config`. Any failure there
/// is reported as a mismatch without replaying.
pub fn verify_capture<S: AuditSink>(
    raw: &[u8],
    expected: &ExpectedLock,
    config: &Config,
    sink: S,
) -> VerifyResult {
    if let Err(err) = expected.validate() {
        return VerifyResult::Fatal(err);
    }

    let mut fields = Vec::new();
    if expected.provider_id != config.provider_id() {
        fields.push(FieldMismatch::new(
            LockField::ProviderId,
            config.provider_id(),
            &expected.provider_id,
        ));
    }
    if let Some(version) = config.schema_version() {
        if expected.schema_version != version {
            fields.push(FieldMismatch::new(
                LockField::SchemaVersion,
                version,
                &expected.schema_version,
            ));
        }
    }
    if config.check_raw_digest() {
        let actual = raw_sha256(raw);
        if actual != expected.raw_sha256 {
            fields.push(FieldMismatch::new(LockField::RawSha256, &expected.raw_sha256, actual));
        }
    } else {
        debug!("raw digest check disabled");
    }
    if !fields.is_empty() {
        warn!(
            fields = fields.len(),
            "capture preconditions failed, not replaying"
        );
        return VerifyResult::Mismatch {
            fields,
            report: None,
        };
    }

    match split_lines(raw) {
        Ok(lines) => verify(lines, expected, sink),
        Err(err) => VerifyResult::Fatal(err),
    }
}

/// Replay a clean capture and seal a new lock for it.
///
/// # Errors
///
/// Any parse or replay error; a capture that cannot be replayed cannot be sealed.
pub fn seal<S: AuditSink>(
    raw: &[u8],
    provider_id: &str,
    schema_version: Option<&str>,
    sink: S,
) -> Result<ExpectedLock, Error> {
    let messages = parse_lines(split_lines(raw)?)?;
    let mut verifier = ReplayVerifier::new(sink);
    let report = verifier.replay(&messages)?;

    let schema_version = schema_version.unwrap_or(DEFAULT_SCHEMA_VERSION);
    let lock = ExpectedLock {
        provider_id: provider_id.to_string(),
        schema_version: schema_version.to_string(),
        raw_sha256: raw_sha256(raw),
        canonical_book_digest_sha256: report.canonical_digest,
        messages_n: report.messages_n,
        final_seq_id: report.final_seq_id,
    };
    let record = AuditRecord::new(AuditEvent::BookSeal, "LOCK_SEALED")
        .with_attr("digest", lock.canonical_book_digest_sha256.as_str())
        .with_attr("messages_n", lock.messages_n)
        .with_attr("final_seqId", lock.final_seq_id);
    verifier.sink.append(record);
    info!(provider_id, digest = %lock.canonical_book_digest_sha256, "lock sealed");
    Ok(lock)
}
