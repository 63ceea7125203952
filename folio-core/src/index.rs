//! Fractional ordering indices.
//!
//! Siblings are painted in ascending [`OrderIndex`] order. A key is a string of
//! base-62 digits read as a fraction in `[0, 1)`, so a fresh key can always be
//! generated strictly between two existing keys without touching any other
//! sibling. Keys never end in the zero digit, which keeps the mapping from
//! fractions to strings one-to-one.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{CanvasError, CanvasResult};

/// Digit alphabet, in ascending ASCII order.
const DIGITS: &[u8; 62] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";

/// Number of digits in the alphabet.
const BASE: u8 = 62;

/// A paint-order key. Lexicographic order of the underlying string is the
/// paint order (lowest paints first, i.e. at the bottom).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct OrderIndex(String);

impl OrderIndex {
    /// Parse and validate a key.
    ///
    /// # Errors
    ///
    /// Returns [`CanvasError::InvalidIndex`] if the key is empty, contains a
    /// character outside the digit alphabet, or ends in the zero digit.
    pub fn parse(key: &str) -> CanvasResult<Self> {
        if key.is_empty() {
            return Err(CanvasError::InvalidIndex("empty key".to_string()));
        }
        if let Some(bad) = key.bytes().find(|b| digit_value(*b).is_none()) {
            return Err(CanvasError::InvalidIndex(format!(
                "{key}: unexpected character {:?}",
                char::from(bad)
            )));
        }
        if key.ends_with('0') {
            return Err(CanvasError::InvalidIndex(format!(
                "{key}: trailing zero digit"
            )));
        }
        Ok(Self(key.to_string()))
    }

    /// Generate a key strictly between `lower` and `upper`.
    ///
    /// `None` stands for the open end of the range on that side.
    ///
    /// # Errors
    ///
    /// Returns [`CanvasError::InvalidIndex`] if `lower >= upper`.
    pub fn between(lower: Option<&Self>, upper: Option<&Self>) -> CanvasResult<Self> {
        let mut keys = Self::n_between(lower, upper, 1)?;
        keys.pop()
            .ok_or_else(|| CanvasError::InvalidIndex("no key generated".to_string()))
    }

    /// Generate `count` ascending keys strictly between `lower` and `upper`.
    ///
    /// Keys are spread by bisection so their length grows logarithmically in
    /// `count` rather than linearly.
    ///
    /// # Errors
    ///
    /// Returns [`CanvasError::InvalidIndex`] if `lower >= upper`.
    pub fn n_between(
        lower: Option<&Self>,
        upper: Option<&Self>,
        count: usize,
    ) -> CanvasResult<Vec<Self>> {
        if let (Some(lo), Some(hi)) = (lower, upper) {
            if lo >= hi {
                return Err(CanvasError::InvalidIndex(format!(
                    "lower bound {lo} is not below upper bound {hi}"
                )));
            }
        }

        let lower_digits = lower.map(Self::digits).unwrap_or_default();
        let upper_digits = upper.map(Self::digits);

        let mut out = Vec::with_capacity(count);
        spread(&lower_digits, upper_digits.as_deref(), count, &mut out);
        Ok(out.into_iter().map(|d| Self(encode(&d))).collect())
    }

    /// A key that sorts immediately above this one with nothing in between
    /// reserved, i.e. the midpoint between `self` and the open top end.
    #[must_use]
    pub fn above(&self) -> Self {
        Self(encode(&midpoint(&self.digits(), None)))
    }

    /// A key that sorts below this one.
    #[must_use]
    pub fn below(&self) -> Self {
        Self(encode(&midpoint(&[], Some(&self.digits()))))
    }

    /// The key as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn digits(&self) -> Vec<u8> {
        self.0.bytes().filter_map(digit_value).collect()
    }
}

impl Default for OrderIndex {
    /// The midpoint of the whole key space.
    fn default() -> Self {
        Self(encode(&midpoint(&[], None)))
    }
}

impl fmt::Display for OrderIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for OrderIndex {
    type Error = CanvasError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<OrderIndex> for String {
    fn from(index: OrderIndex) -> Self {
        index.0
    }
}

fn digit_value(byte: u8) -> Option<u8> {
    match byte {
        b'0'..=b'9' => Some(byte - b'0'),
        b'A'..=b'Z' => Some(byte - b'A' + 10),
        b'a'..=b'z' => Some(byte - b'a' + 36),
        _ => None,
    }
}

fn encode(digits: &[u8]) -> String {
    digits
        .iter()
        .map(|d| char::from(DIGITS[usize::from(*d)]))
        .collect()
}

/// Fill `out` with `count` ascending keys between `lower` and `upper`.
fn spread(lower: &[u8], upper: Option<&[u8]>, count: usize, out: &mut Vec<Vec<u8>>) {
    if count == 0 {
        return;
    }
    let mid = midpoint(lower, upper);
    let left = count / 2;
    spread(lower, Some(&mid), left, out);
    out.push(mid.clone());
    spread(&mid, upper, count - left - 1, out);
}

/// Digits of a fraction strictly between `a` and `b` (`None` = 1.0).
///
/// Requires `a < b`. Missing trailing digits of `a` read as zero.
fn midpoint(a: &[u8], b: Option<&[u8]>) -> Vec<u8> {
    if let Some(b) = b {
        let mut shared = 0;
        while shared < b.len() && a.get(shared).copied().unwrap_or(0) == b[shared] {
            shared += 1;
        }
        if shared > 0 {
            let mut out = b[..shared].to_vec();
            let rest = a.get(shared..).unwrap_or(&[]);
            out.extend(midpoint(rest, Some(&b[shared..])));
            return out;
        }
    }

    let digit_a = a.first().copied().unwrap_or(0);
    let digit_b = b.and_then(|b| b.first().copied()).unwrap_or(BASE);

    if digit_b - digit_a > 1 {
        vec![(digit_a + digit_b) / 2]
    } else if let Some(b) = b.filter(|b| b.len() > 1) {
        vec![b[0]]
    } else {
        let mut out = vec![digit_a];
        out.extend(midpoint(a.get(1..).unwrap_or(&[]), None));
        out
    }
}
