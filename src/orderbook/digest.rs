//! Canonical book serialization and digest.
//!
//! The canonical form of a book is
//!
//! ```text
//! {"asks":[["101","1"],...],"bids":[["100","1"],...]}
//! ```
//!
//! with asks ascending and bids descending by decimal price, `[price, size]`
//! pairs only, and no whitespace. The digest is the lowercase hex SHA-256 of
//! those UTF-8 bytes. Ordering and formatting are part of the lock contract:
//! changing either invalidates every sealed lock.

use serde::Serialize;
use sha2::{Digest, Sha256};

use super::BookState;

#[derive(Serialize)]
struct CanonicalBook<'a> {
    asks: Vec<(&'a str, &'a str)>,
    bids: Vec<(&'a str, &'a str)>,
}

fn live<'a>(levels: Vec<(&'a str, &'a str)>) -> Vec<(&'a str, &'a str)> {
    // Sides never hold tombstones; filter anyway so the digest cannot depend on it.
    levels
        .into_iter()
        .filter(|&(_, size)| size != "0")
        .collect()
}

fn canonical(book: &BookState) -> CanonicalBook<'_> {
    CanonicalBook {
        asks: live(book.asks().ascending()),
        bids: live(book.bids().descending()),
    }
}

/// The exact canonical JSON the digest is computed over
///
/// # Errors
///
/// Returns an error only if `serde_json` fails to serialize string pairs.
pub fn canonical_json(book: &BookState) -> serde_json::Result<String> {
    serde_json::to_string(&canonical(book))
}

/// SHA-256 (lowercase hex) of [`canonical_json`]
///
/// # Errors
///
/// See [`canonical_json`].
pub fn book_digest(book: &BookState) -> serde_json::Result<String> {
    Ok(sha256_hex(canonical_json(book)?.as_bytes()))
}

/// Lowercase hex SHA-256 of arbitrary bytes
#[must_use]
pub fn sha256_hex(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}
