//! An ordered map over disjoint byte ranges.
//!
//! This module provides [`RangeMap`], a compact associative container whose keys are
//! half-open byte intervals `[start, end)`. It is the building block for analyses that
//! track per-byte-range facts, such as which writers reach a given slice of a memory
//! object.
//!
//! # Representation
//!
//! The map always holds a *partition*: intervals are pairwise disjoint and sorted by
//! their start offset. Mutating operations split intervals at overlap boundaries so
//! that updates apply exactly to the requested range, and adjacent intervals carrying
//! equal values are coalesced back together. Because the representation is canonical,
//! two maps compare equal iff they associate the same value with every byte.
//!
//! # Example
//!
//! ```rust,ignore
//! use defflow::utils::{ByteRange, RangeMap};
//!
//! let mut map: RangeMap<u32> = RangeMap::new();
//! map.replace(ByteRange::new(0, 8), 1);
//! map.replace(ByteRange::new(0, 4), 2);
//!
//! // [0, 4) -> 2, [4, 8) -> 1
//! assert_eq!(map.len(), 2);
//! ```

use std::fmt;

/// A half-open byte interval `[start, end)`.
///
/// Ranges are always non-empty: `start < end`. Empty queries must be filtered out by
/// the caller before a `ByteRange` is constructed.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ByteRange {
    /// First byte covered by the range.
    pub start: u64,
    /// First byte past the range.
    pub end: u64,
}

impl ByteRange {
    /// Creates a new byte range.
    ///
    /// # Panics
    ///
    /// Panics if `start >= end` (ranges must be non-empty).
    #[must_use]
    pub fn new(start: u64, end: u64) -> Self {
        assert!(start < end, "byte range must be non-empty");
        Self { start, end }
    }

    /// Returns the number of bytes covered.
    #[must_use]
    pub const fn len(&self) -> u64 {
        self.end - self.start
    }

    /// Returns `true` if this range shares at least one byte with `other`.
    #[must_use]
    pub const fn intersects(&self, other: &ByteRange) -> bool {
        self.start < other.end && other.start < self.end
    }
}

impl fmt::Debug for ByteRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}

impl fmt::Display for ByteRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

/// An ordered map from disjoint byte ranges to values.
///
/// The map maintains the partition invariant described in the module documentation:
/// entries are sorted by start offset, never overlap, and neighboring entries with
/// equal values are merged. All range-shaped mutations split entries at the overlap
/// boundaries, so a value attached to `[0, 8)` survives on `[4, 8)` when `[0, 4)` is
/// replaced.
#[derive(Clone, PartialEq, Eq)]
pub struct RangeMap<V> {
    /// Entries sorted by `ByteRange::start`, pairwise disjoint.
    entries: Vec<(ByteRange, V)>,
}

impl<V> Default for RangeMap<V> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<V> RangeMap<V> {
    /// Creates an empty range map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of disjoint ranges stored.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the map holds no ranges.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Removes all entries.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Returns an iterator over `(range, value)` pairs in ascending range order.
    pub fn iter(&self) -> impl Iterator<Item = (&ByteRange, &V)> {
        self.entries.iter().map(|(r, v)| (r, v))
    }

    /// Returns a mutating iterator over the stored values.
    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut V> {
        self.entries.iter_mut().map(|(_, v)| v)
    }

    /// Returns an iterator over the entries intersecting `range`.
    pub fn overlapping(&self, range: ByteRange) -> impl Iterator<Item = (&ByteRange, &V)> {
        // Entries are sorted and disjoint: skip everything that ends at or
        // before the query, then take while starts fall inside it.
        let first = self.entries.partition_point(|(r, _)| r.end <= range.start);
        self.entries[first..]
            .iter()
            .take_while(move |(r, _)| r.start < range.end)
            .map(|(r, v)| (r, v))
    }

    /// Removes every entry matching `pred` and returns the removed pairs.
    pub fn take_where<F>(&mut self, mut pred: F) -> Vec<(ByteRange, V)>
    where
        F: FnMut(&V) -> bool,
    {
        let mut taken = Vec::new();
        let mut kept = Vec::with_capacity(self.entries.len());
        for (r, v) in self.entries.drain(..) {
            if pred(&v) {
                taken.push((r, v));
            } else {
                kept.push((r, v));
            }
        }
        self.entries = kept;
        taken
    }
}

impl<V: Clone + PartialEq> RangeMap<V> {
    /// Replaces `range` with a single entry carrying `value`.
    ///
    /// Overlapped portions of existing entries are removed; parts of existing
    /// entries outside `range` keep their previous value. This is the carving
    /// primitive behind strong updates.
    pub fn replace(&mut self, range: ByteRange, value: V) {
        let old = std::mem::take(&mut self.entries);
        let mut out = Vec::with_capacity(old.len() + 2);
        for (r, v) in old {
            if !r.intersects(&range) {
                out.push((r, v));
                continue;
            }
            if r.start < range.start {
                out.push((ByteRange::new(r.start, range.start), v.clone()));
            }
            if r.end > range.end {
                out.push((ByteRange::new(range.end, r.end), v));
            }
        }
        let pos = out.partition_point(|(r, _)| r.start < range.start);
        out.insert(pos, (range, value));
        self.entries = out;
        self.coalesce();
    }

    /// Applies `edit` to every byte of `range`.
    ///
    /// Existing entries are split at the boundaries of `range` and `edit` is run on
    /// each piece inside it; sub-ranges not covered by any entry are first seeded
    /// with `fill()`. This is the splitting primitive behind weak updates: values
    /// outside `range` are untouched.
    pub fn apply<F, G>(&mut self, range: ByteRange, mut fill: G, mut edit: F)
    where
        F: FnMut(&mut V),
        G: FnMut() -> V,
    {
        let old = std::mem::take(&mut self.entries);
        let mut out = Vec::with_capacity(old.len() + 2);
        let mut cursor = range.start;
        for (r, v) in old {
            if r.end <= range.start {
                out.push((r, v));
                continue;
            }
            if r.start >= range.end {
                if cursor < range.end {
                    let mut fresh = fill();
                    edit(&mut fresh);
                    out.push((ByteRange::new(cursor, range.end), fresh));
                    cursor = range.end;
                }
                out.push((r, v));
                continue;
            }
            // Overlap: gap before, untouched prefix, edited middle, untouched suffix.
            if cursor < r.start {
                let mut fresh = fill();
                edit(&mut fresh);
                out.push((ByteRange::new(cursor, r.start), fresh));
            }
            if r.start < range.start {
                out.push((ByteRange::new(r.start, range.start), v.clone()));
            }
            let mid = ByteRange::new(r.start.max(range.start), r.end.min(range.end));
            let mut edited = v.clone();
            edit(&mut edited);
            out.push((mid, edited));
            if r.end > range.end {
                out.push((ByteRange::new(range.end, r.end), v));
            }
            cursor = mid.end;
        }
        if cursor < range.end {
            let mut fresh = fill();
            edit(&mut fresh);
            out.push((ByteRange::new(cursor, range.end), fresh));
        }
        self.entries = out;
        self.coalesce();
    }

    /// Merges adjacent entries carrying equal values and checks the partition
    /// invariant.
    fn coalesce(&mut self) {
        let old = std::mem::take(&mut self.entries);
        let mut out: Vec<(ByteRange, V)> = Vec::with_capacity(old.len());
        for (r, v) in old {
            if let Some((prev, pv)) = out.last_mut() {
                debug_assert!(prev.end <= r.start, "range map entries must be disjoint");
                if prev.end == r.start && *pv == v {
                    prev.end = r.end;
                    continue;
                }
            }
            out.push((r, v));
        }
        self.entries = out;
    }
}

impl<V: fmt::Debug> fmt::Debug for RangeMap<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.entries.iter().map(|(r, v)| (r, v)))
            .finish()
    }
}
