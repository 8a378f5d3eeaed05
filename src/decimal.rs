//! Exact ordering of decimal price and size strings.
//!
//! Exchange feeds send prices and sizes as decimal strings (`"100.5"`,
//! `"0.00012"`). Converting those to `f64` loses precision and makes the
//! book ordering platform dependent, so the comparison here works on the
//! digits directly:
//!
//! - the integer part is compared by significant-digit count, then digit by digit
//! - the fractional part is compared as if both sides were right-padded with `0`
//!
//! `"100.5"` and `"100.50"` therefore compare [`Ordering::Equal`] even though
//! they are distinct strings.
//!
//! # Example
//!
//! ```rust
//! use std::cmp::Ordering;
//! use book_replay::decimal::compare;
//!
//! assert_eq!(compare("9", "10"), Ordering::Less);
//! assert_eq!(compare("100.5", "100.50"), Ordering::Equal);
//! ```

use std::cmp::Ordering;

/// Split a decimal string into its significant integer and fractional digits.
///
/// Leading zeros of the integer part and trailing zeros of the fraction are
/// dropped, so `"007.250"` yields `("7", "25")` and `"0.0"` yields `("", "")`.
#[inline]
fn significant_parts(s: &str) -> (&str, &str) {
    let (int, frac) = s.split_once('.').unwrap_or((s, ""));
    (int.trim_start_matches('0'), frac.trim_end_matches('0'))
}

/// Compare two non-negative decimal strings by numeric value.
///
/// Both inputs are expected to satisfy [`is_decimal`]; the parser rejects
/// anything else before it reaches the book.
#[must_use]
pub fn compare(a: &str, b: &str) -> Ordering {
    let (a_int, a_frac) = significant_parts(a);
    let (b_int, b_frac) = significant_parts(b);

    // Without leading zeros, more integer digits means a larger number.
    a_int
        .len()
        .cmp(&b_int.len())
        .then_with(|| a_int.cmp(b_int))
        // Trailing zeros are already trimmed, so a plain byte comparison is
        // the same as comparing the zero-padded fractions.
        .then_with(|| a_frac.cmp(b_frac))
}

/// Check that `s` is a non-negative base-10 number with at most one `.`.
///
/// At least one digit is required; `".5"` and `"5."` are accepted.
#[must_use]
pub fn is_decimal(s: &str) -> bool {
    let mut digits = 0usize;
    let mut dots = 0usize;
    for b in s.bytes() {
        match b {
            b'0'..=b'9' => digits += 1,
            b'.' => dots += 1,
            _ => return false,
        }
    }
    digits > 0 && dots <= 1
}

/// A borrowed decimal string ordered by numeric value.
///
/// Useful as a sort key: `levels.sort_by_key(|&(p, _)| DecimalStr(p))`.
/// Equality follows [`compare`], so `DecimalStr("1.0") == DecimalStr("1")`.
#[derive(Debug, Clone, Copy)]
pub struct DecimalStr<'a>(pub &'a str);

impl PartialEq for DecimalStr<'_> {
    fn eq(&self, other: &Self) -> bool {
        compare(self.0, other.0) == Ordering::Equal
    }
}

impl Eq for DecimalStr<'_> {}

impl PartialOrd for DecimalStr<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for DecimalStr<'_> {
    fn cmp(&self, other: &Self) -> Ordering {
        compare(self.0, other.0)
    }
}
