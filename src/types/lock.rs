//! Expected-lock records.
//!
//! A lock is the sealed outcome of a previous replay: the hash of the raw
//! capture bytes, the canonical book digest, the message count and the final
//! sequence id. A later replay of the same capture must reproduce it exactly.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::SeqId;
use crate::error::Error;

/// Sealed reference record for one capture
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpectedLock {
    /// Venue / feed identifier the capture came from
    pub provider_id: String,
    /// Version of the capture schema
    pub schema_version: String,
    /// SHA-256 of the raw capture bytes (lowercase hex)
    pub raw_sha256: String,
    /// SHA-256 of the canonical book serialization (lowercase hex)
    pub canonical_book_digest_sha256: String,
    /// Number of messages in the capture
    pub messages_n: u64,
    /// Last sequence id applied to the book
    #[serde(rename = "final_seqId")]
    pub final_seq_id: SeqId,
}

impl ExpectedLock {
    /// Parse a lock from its JSON form and check the digest fields.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`] if the document does not deserialize and
    /// [`Error::Lock`] if a digest is not 64 lowercase hex characters.
    pub fn from_json(json: &str) -> Result<Self, Error> {
        let lock: ExpectedLock = serde_json::from_str(json)?;
        lock.validate()?;
        Ok(lock)
    }

    /// Check that both digests are well-formed SHA-256 hex strings
    ///
    /// # Errors
    ///
    /// Returns [`Error::Lock`] naming the first malformed field.
    pub fn validate(&self) -> Result<(), Error> {
        for (field, value) in [
            (LockField::RawSha256, &self.raw_sha256),
            (LockField::CanonicalDigest, &self.canonical_book_digest_sha256),
        ] {
            if !is_sha256_hex(value) {
                let reason = format!("{field} is not a 64-character lowercase hex digest");
                return Err(Error::Lock(reason));
            }
        }
        Ok(())
    }

    /// Serialize the lock as pretty JSON for writing to disk
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`] if serialization fails.
    pub fn to_json_pretty(&self) -> Result<String, Error> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// A lock field that can fail comparison
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum LockField {
    /// `provider_id`
    ProviderId,
    /// `schema_version`
    SchemaVersion,
    /// `raw_sha256`
    RawSha256,
    /// `messages_n`
    MessagesN,
    /// `final_seqId`
    FinalSeqId,
    /// `canonical_book_digest_sha256`
    CanonicalDigest,
}

impl LockField {
    /// Field name as it appears in the lock JSON
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            LockField::ProviderId => "provider_id",
            LockField::SchemaVersion => "schema_version",
            LockField::RawSha256 => "raw_sha256",
            LockField::MessagesN => "messages_n",
            LockField::FinalSeqId => "final_seqId",
            LockField::CanonicalDigest => "canonical_book_digest_sha256",
        }
    }
}

impl fmt::Display for LockField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn is_sha256_hex(s: &str) -> bool {
    s.len() == 64 && s.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}
