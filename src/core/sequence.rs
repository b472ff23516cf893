//! Sequential document numbering
//!
//! Human-readable record numbers such as `RNC-0007`, `END-0042` or
//! `LA-2025-003` are derived by scanning the numbers already in use for a
//! family and incrementing the highest numeric suffix found. Nothing is kept
//! in memory between allocations: every call recomputes from the scan.
//!
//! Numbers are advisory. Two allocations that read the same store before
//! either one writes will produce the same number; records are identified by
//! their [`EntityId`](crate::core::EntityId), never by their number.

use std::fmt;

/// Numbering convention for one sequence family
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequenceFormat {
    /// Literal prefix, matched case-sensitively (e.g. "RNC-")
    pub prefix: String,

    /// Minimum number of digits; shorter numbers are left-padded with zeros
    pub pad_width: usize,

    /// Lowest value considered already taken
    pub floor: u64,

    /// When set, numbers are scoped per calendar year (`PREFIX-YYYY-NNN`)
    pub yearly: bool,
}

impl SequenceFormat {
    /// A plain `PREFIX####` sequence with a floor of zero
    pub fn new(prefix: impl Into<String>, pad_width: usize) -> Self {
        Self {
            prefix: prefix.into(),
            pad_width,
            floor: 0,
            yearly: false,
        }
    }

    /// A sequence that restarts every calendar year
    pub fn year_scoped(prefix: impl Into<String>, pad_width: usize) -> Self {
        Self {
            yearly: true,
            ..Self::new(prefix, pad_width)
        }
    }

    /// Set the numeric floor
    pub fn with_floor(mut self, floor: u64) -> Self {
        self.floor = floor;
        self
    }

    /// Resolve a year-scoped format into the concrete format for `year`.
    ///
    /// `LA-` for 2025 becomes a plain format with prefix `LA-2025-`. Formats
    /// that are not year-scoped are returned unchanged.
    pub fn for_year(&self, year: i32) -> Self {
        if !self.yearly {
            return self.clone();
        }
        Self {
            prefix: format!("{}{}-", self.prefix, year),
            pad_width: self.pad_width,
            floor: self.floor,
            yearly: false,
        }
    }

    /// Compute the number that follows everything in `existing`
    pub fn next_after<I, S>(&self, existing: I) -> String
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        allocate_next_number(existing, &self.prefix, self.pad_width, self.floor)
    }
}

impl fmt::Display for SequenceFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let digits = "#".repeat(self.pad_width.max(1));
        if self.yearly {
            write!(f, "{}YYYY-{}", self.prefix, digits)
        } else {
            write!(f, "{}{}", self.prefix, digits)
        }
    }
}

/// Extract the numeric suffix of `candidate` if it belongs to `prefix`.
///
/// Every non-digit character after the prefix is dropped before parsing, so
/// `RNC-12a` yields 12. Returns `None` when the prefix does not match, when no
/// digits remain, or when the value does not fit in a `u64`.
pub fn parse_suffix(candidate: &str, prefix: &str) -> Option<u64> {
    let rest = candidate.strip_prefix(prefix)?;
    let digits: String = rest.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return None;
    }
    digits.parse().ok()
}

/// Produce the next sequence number for a family of documents.
///
/// Entries that do not start with `prefix`, or whose suffix has no parseable
/// digits, are ignored. The result is `prefix` followed by
/// `max(floor, suffixes...) + 1`, zero-padded to `pad_width`.
pub fn allocate_next_number<I, S>(existing: I, prefix: &str, pad_width: usize, floor: u64) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let highest = existing
        .into_iter()
        .filter_map(|n| parse_suffix(n.as_ref(), prefix))
        .fold(floor, u64::max);

    // u128 so that u64::MAX still has a successor
    let next = u128::from(highest) + 1;
    format!("{}{:0width$}", prefix, next, width = pad_width)
}

/// Supplies the numbers already in use for a sequence family.
///
/// Keeping the read behind this trait leaves the allocation itself pure, so a
/// caller that needs stronger guarantees can wrap read, compute and write in
/// a transaction of its own.
pub trait NumberSource<F: ?Sized> {
    type Error;

    /// Every `number` value currently stored for `family`
    fn existing_numbers(&self, family: &F) -> Result<Vec<String>, Self::Error>;
}

impl<F: ?Sized> NumberSource<F> for [String] {
    type Error = std::convert::Infallible;

    fn existing_numbers(&self, _family: &F) -> Result<Vec<String>, Self::Error> {
        Ok(self.to_vec())
    }
}

impl<F: ?Sized> NumberSource<F> for Vec<String> {
    type Error = std::convert::Infallible;

    fn existing_numbers(&self, _family: &F) -> Result<Vec<String>, Self::Error> {
        Ok(self.clone())
    }
}

/// Read the numbers in use from `source` and allocate the next one
pub fn allocate_from<F, N>(source: &N, family: &F, format: &SequenceFormat) -> Result<String, N::Error>
where
    F: ?Sized,
    N: NumberSource<F> + ?Sized,
{
    let existing = source.existing_numbers(family)?;
    Ok(format.next_after(&existing))
}
