//! Book state reconstructed from a capture.
//!
//! Each side is a `BTreeMap` keyed by the raw price string. The map keeps
//! keys in byte order, which makes iteration deterministic, but that is not
//! the book order: price order always comes from [`crate::decimal::compare`]
//! when a side is read sorted.

use std::collections::BTreeMap;

use crate::decimal::DecimalStr;
use crate::types::{PriceLevel, SeqId, UNSET_SEQ_ID};

/// One side of the book: price -> size
///
/// Prices are kept exactly as received, so `"100.5"` and `"100.50"` are two
/// keys. No entry ever holds the tombstone size `"0"`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookSide {
    levels: BTreeMap<String, String>,
}

impl BookSide {
    /// Create an empty side
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one level: a tombstone deletes the price, any other size upserts it
    pub fn apply(&mut self, level: &PriceLevel) {
        if level.is_tombstone() {
            self.levels.remove(&level.price);
        } else {
            self.levels.insert(level.price.clone(), level.size.clone());
        }
    }

    /// Get the size resting at `price`
    #[must_use]
    pub fn get(&self, price: &str) -> Option<&str> {
        self.levels.get(price).map(String::as_str)
    }

    /// Remove every level
    pub fn clear(&mut self) {
        self.levels.clear();
    }

    /// Number of price levels
    #[must_use]
    pub fn len(&self) -> usize {
        self.levels.len()
    }

    /// Check if the side has no levels
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    /// Levels in key (byte) order, not price order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> + '_ {
        self.levels.iter().map(|(p, s)| (p.as_str(), s.as_str()))
    }

    /// Levels sorted by price ascending
    ///
    /// Numerically equal prices keep their byte order, so the result is
    /// fully determined by the side's contents.
    #[must_use]
    pub fn ascending(&self) -> Vec<(&str, &str)> {
        let mut levels: Vec<_> = self.iter().collect();
        levels.sort_by_key(|&(price, _)| DecimalStr(price));
        levels
    }

    /// Levels sorted by price descending
    ///
    /// Numerically equal prices keep their byte order, as in [`Self::ascending`].
    #[must_use]
    pub fn descending(&self) -> Vec<(&str, &str)> {
        let mut levels: Vec<_> = self.iter().collect();
        levels.sort_by(|a, b| DecimalStr(b.0).cmp(&DecimalStr(a.0)));
        levels
    }
}

/// Reconstructed order book plus its sequence cursor.
///
/// # Design Decisions
///
/// 1. **String prices**: Prices and sizes stay decimal strings end to end.
///    Ordering uses [`crate::decimal::compare`], never a float.
///
/// 2. **Sequence cursor**: `last_seq_id` is [`UNSET_SEQ_ID`] until the first
///    snapshot boots the book.
///
/// 3. **Single owner**: A `BookState` belongs to one
///    [`SequenceStateMachine`](super::SequenceStateMachine) for one replay.
///    Mutation goes through the state machine; everything else reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookState {
    bids: BookSide,
    asks: BookSide,
    last_seq_id: SeqId,
    booted: bool,
}

impl BookState {
    /// Create an empty, unbooted book
    #[must_use]
    pub fn new() -> Self {
        Self {
            bids: BookSide::new(),
            asks: BookSide::new(),
            last_seq_id: UNSET_SEQ_ID,
            booted: false,
        }
    }

    /// Bid side
    #[must_use]
    pub fn bids(&self) -> &BookSide {
        &self.bids
    }

    /// Ask side
    #[must_use]
    pub fn asks(&self) -> &BookSide {
        &self.asks
    }

    /// Last sequence id applied, or [`UNSET_SEQ_ID`] before boot
    #[must_use]
    pub const fn last_seq_id(&self) -> SeqId {
        self.last_seq_id
    }

    /// Whether a snapshot has been applied
    #[must_use]
    pub const fn is_booted(&self) -> bool {
        self.booted
    }

    /// Replace both sides with a snapshot's levels
    ///
    /// Tombstones in a snapshot are dropped.
    pub(crate) fn replace(&mut self, bids: &[PriceLevel], asks: &[PriceLevel]) {
        self.bids.clear();
        self.asks.clear();
        self.merge(bids, asks);
    }

    /// Merge delta levels into both sides
    pub(crate) fn merge(&mut self, bids: &[PriceLevel], asks: &[PriceLevel]) {
        for level in bids {
            self.bids.apply(level);
        }
        for level in asks {
            self.asks.apply(level);
        }
    }

    pub(crate) fn set_last_seq_id(&mut self, seq_id: SeqId) {
        self.last_seq_id = seq_id;
    }

    /// Mark the book booted, returning whether it already was
    pub(crate) fn boot(&mut self) -> bool {
        std::mem::replace(&mut self.booted, true)
    }

    /// Check if the book is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bids.is_empty() && self.asks.is_empty()
    }

    /// Get the number of price levels
    #[must_use]
    pub fn num_levels(&self) -> (usize, usize) {
        (self.bids.len(), self.asks.len())
    }
}

impl Default for BookState {
    fn default() -> Self {
        Self::new()
    }
}
