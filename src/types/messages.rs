//! Capture message types.
//!
//! Each capture line is one exchange push of the form
//!
//! ```json
//! {"action":"update","data":[{"seqId":2,"prevSeqId":1,"bids":[["99","0"]],"asks":[]}]}
//! ```
//!
//! Lines are validated once, here, into an [`IncomingMessage`]. Nothing past
//! this module ever looks at raw JSON.

use serde::{Deserialize, Serialize};

use super::SeqId;
use crate::decimal::is_decimal;
use crate::error::Error;

/// Message action as sent by the exchange
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    /// Full book replacement
    Snapshot,
    /// Incremental delta since `prevSeqId`
    Update,
}

/// A single price level: `[price, size]`
///
/// A size of exactly `"0"` is a tombstone meaning "remove this level".
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PriceLevel {
    /// Price as received
    pub price: String,
    /// Size as received
    pub size: String,
}

impl PriceLevel {
    /// Create a level from price and size strings
    pub fn new(price: impl Into<String>, size: impl Into<String>) -> Self {
        Self {
            price: price.into(),
            size: size.into(),
        }
    }

    /// Whether this level deletes its price
    #[must_use]
    pub fn is_tombstone(&self) -> bool {
        self.size == "0"
    }
}

/// Body shared by snapshots and updates
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookMessage {
    /// Sequence id of this message
    pub seq_id: SeqId,
    /// Sequence the sender believed was current before this message
    pub prev_seq_id: SeqId,
    /// Bid levels (full side for snapshots, changed levels for updates)
    pub bids: Vec<PriceLevel>,
    /// Ask levels (full side for snapshots, changed levels for updates)
    pub asks: Vec<PriceLevel>,
}

/// A validated capture message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IncomingMessage {
    /// Full book state
    Snapshot(BookMessage),
    /// Incremental update
    Update(BookMessage),
}

impl IncomingMessage {
    /// Parse and validate one capture line.
    ///
    /// `line_no` is 1-based and only used for error reporting.
    ///
    /// # Errors
    ///
    /// - [`Error::Parse`] if the line is not JSON
    /// - [`Error::SchemaViolation`] if it is JSON of the wrong shape
    pub fn parse_line(line: &str, line_no: usize) -> Result<Self, Error> {
        let invalid = |e: serde_json::Error| classify(e, line_no);
        let envelope: RawEnvelope = serde_json::from_str(line).map_err(invalid)?;

        // Only the first entry of `data` describes the book.
        let Some(first) = envelope.data.first() else {
            return Err(Error::SchemaViolation {
                line: line_no,
                reason: "missing or empty `data` container".to_string(),
            });
        };
        let raw = RawBookData::deserialize(first).map_err(invalid)?;

        let body = BookMessage {
            seq_id: raw.seq_id,
            prev_seq_id: raw.prev_seq_id,
            bids: levels(raw.bids, "bids", line_no)?,
            asks: levels(raw.asks, "asks", line_no)?,
        };

        Ok(match envelope.action {
            Action::Snapshot => IncomingMessage::Snapshot(body),
            Action::Update => IncomingMessage::Update(body),
        })
    }

    /// Build a snapshot from `(price, size)` pairs
    pub fn snapshot(
        seq_id: SeqId,
        prev_seq_id: SeqId,
        bids: &[(&str, &str)],
        asks: &[(&str, &str)],
    ) -> Self {
        IncomingMessage::Snapshot(BookMessage::from_pairs(seq_id, prev_seq_id, bids, asks))
    }

    /// Build an update from `(price, size)` pairs
    pub fn update(
        seq_id: SeqId,
        prev_seq_id: SeqId,
        bids: &[(&str, &str)],
        asks: &[(&str, &str)],
    ) -> Self {
        IncomingMessage::Update(BookMessage::from_pairs(seq_id, prev_seq_id, bids, asks))
    }

    /// The message action
    #[must_use]
    pub fn action(&self) -> Action {
        match self {
            IncomingMessage::Snapshot(_) => Action::Snapshot,
            IncomingMessage::Update(_) => Action::Update,
        }
    }

    /// The message body
    #[must_use]
    pub fn body(&self) -> &BookMessage {
        match self {
            IncomingMessage::Snapshot(body) | IncomingMessage::Update(body) => body,
        }
    }

    /// Sequence id of this message
    #[must_use]
    pub fn seq_id(&self) -> SeqId {
        self.body().seq_id
    }

    /// Sequence the sender believed was current
    #[must_use]
    pub fn prev_seq_id(&self) -> SeqId {
        self.body().prev_seq_id
    }
}

impl BookMessage {
    fn from_pairs(
        seq_id: SeqId,
        prev_seq_id: SeqId,
        bids: &[(&str, &str)],
        asks: &[(&str, &str)],
    ) -> Self {
        let to_levels = |pairs: &[(&str, &str)]| {
            pairs
                .iter()
                .map(|&(price, size)| PriceLevel::new(price, size))
                .collect()
        };
        Self {
            seq_id,
            prev_seq_id,
            bids: to_levels(bids),
            asks: to_levels(asks),
        }
    }
}

/// Outer push envelope
#[derive(Debug, Deserialize)]
struct RawEnvelope {
    action: Action,
    #[serde(default)]
    data: Vec<serde_json::Value>,
}

/// `data[0]` of a push
#[derive(Debug, Deserialize)]
struct RawBookData {
    #[serde(rename = "seqId")]
    seq_id: SeqId,
    #[serde(rename = "prevSeqId")]
    prev_seq_id: SeqId,
    #[serde(default)]
    bids: Vec<Vec<serde_json::Value>>,
    #[serde(default)]
    asks: Vec<Vec<serde_json::Value>>,
}

/// Wrong-shape JSON is a schema violation; anything else is a parse failure.
fn classify(err: serde_json::Error, line: usize) -> Error {
    if err.is_data() {
        Error::SchemaViolation {
            line,
            reason: err.to_string(),
        }
    } else {
        Error::Parse { line, source: err }
    }
}

/// Validate raw `[price, size, ...]` arrays. Trailing elements (order counts
/// on some venues) are ignored.
fn levels(
    raw: Vec<Vec<serde_json::Value>>,
    side: &str,
    line: usize,
) -> Result<Vec<PriceLevel>, Error> {
    raw.into_iter()
        .enumerate()
        .map(|(idx, level)| -> Result<PriceLevel, Error> {
            let field = |pos: usize, name: &str| -> Result<String, Error> {
                match level.get(pos).and_then(serde_json::Value::as_str) {
                    Some(s) if is_decimal(s) => Ok(s.to_string()),
                    _ => Err(Error::SchemaViolation {
                        line,
                        reason: format!("{side}[{idx}] {name} is not a decimal string"),
                    }),
                }
            };
            Ok(PriceLevel {
                price: field(0, "price")?,
                size: field(1, "size")?,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_snapshot() {
        let line = concat!(
            r#"{"action":"snapshot","data":[{"seqId":1,"prevSeqId":-1,"#,
            r#""bids":[["100","1","0","2"]],"asks":[["101","1"]]}]}"#,
        );
        let msg = IncomingMessage::parse_line(line, 1).unwrap();
        assert_eq!(msg.action(), Action::Snapshot);
        assert_eq!(msg.seq_id(), 1);
        assert_eq!(msg.prev_seq_id(), -1);
        assert_eq!(msg.body().bids, vec![PriceLevel::new("100", "1")]);
        assert_eq!(msg.body().asks, vec![PriceLevel::new("101", "1")]);
    }

    #[test]
    fn test_parse_update_defaults_missing_sides() {
        let line = r#"{"action":"update","data":[{"seqId":5,"prevSeqId":4}]}"#;
        let msg = IncomingMessage::parse_line(line, 2).unwrap();
        assert_eq!(msg, IncomingMessage::update(5, 4, &[], &[]));
    }

    #[test]
    fn test_only_first_data_entry_is_read() {
        let line = r#"{"action":"update","data":[{"seqId":5,"prevSeqId":4},{"seqId":"junk"}]}"#;
        assert!(IncomingMessage::parse_line(line, 1).is_ok());
    }

    #[test]
    fn test_empty_data_is_schema_violation() {
        for line in [
            r#"{"action":"update","data":[]}"#,
            r#"{"action":"update"}"#,
        ] {
            match IncomingMessage::parse_line(line, 7) {
                Err(Error::SchemaViolation { line, .. }) => assert_eq!(line, 7),
                other => panic!("Expected SchemaViolation, got {:?}", other),
            }
        }
    }

    #[test]
    fn test_non_integer_seq_is_schema_violation() {
        for line in [
            r#"{"action":"update","data":[{"seqId":"5","prevSeqId":4}]}"#,
            r#"{"action":"update","data":[{"seqId":5.5,"prevSeqId":4}]}"#,
            r#"{"action":"update","data":[{"prevSeqId":4}]}"#,
        ] {
            assert!(matches!(
                IncomingMessage::parse_line(line, 1),
                Err(Error::SchemaViolation { .. })
            ));
        }
    }

    #[test]
    fn test_unknown_action_is_schema_violation() {
        let line = r#"{"action":"partial","data":[{"seqId":5,"prevSeqId":4}]}"#;
        assert!(matches!(
            IncomingMessage::parse_line(line, 1),
            Err(Error::SchemaViolation { .. })
        ));
    }

    #[test]
    fn test_bad_level_is_schema_violation() {
        for line in [
            r#"{"action":"update","data":[{"seqId":5,"prevSeqId":4,"bids":[[100,"1"]]}]}"#,
            r#"{"action":"update","data":[{"seqId":5,"prevSeqId":4,"asks":[["1e3","1"]]}]}"#,
            r#"{"action":"update","data":[{"seqId":5,"prevSeqId":4,"asks":[["100"]]}]}"#,
        ] {
            assert!(matches!(
                IncomingMessage::parse_line(line, 1),
                Err(Error::SchemaViolation { .. })
            ));
        }
    }

    #[test]
    fn test_invalid_json_is_parse_error() {
        assert!(matches!(
            IncomingMessage::parse_line("{\"action\":", 9),
            Err(Error::Parse { line: 9, .. })
        ));
    }

    #[test]
    fn test_tombstone() {
        assert!(PriceLevel::new("100", "0").is_tombstone());
        assert!(!PriceLevel::new("100", "0.5").is_tombstone());
    }
}
