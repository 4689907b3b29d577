//! The definitions map: per-object, interval-keyed writer sets.
//!
//! A [`DefinitionsMap`] records, for each abstract memory object, which writer nodes
//! may have produced the bytes currently observable in it. Per target it keeps an
//! ordered partition of disjoint byte ranges (see
//! [`RangeMap`](crate::utils::intervals::RangeMap)) plus an *unknown bucket* for
//! writes whose start offset the front-end could not determine. A write with a
//! known offset but unknown length stays in the partition as a half-infinite
//! range, so later strong updates can still carve the overwritten prefix out of
//! it; a write at an unknown offset lands "somewhere in the target" and can never
//! be killed by a bounded overwrite.
//!
//! # Strong vs weak updates
//!
//! - [`DefinitionsMap::update`] models a strong update: the written range is carved
//!   out of the partition (prior writers survive only on the uncovered remainder)
//!   and replaced by the single new writer.
//! - [`DefinitionsMap::add`] models a weak update: the new writer is unioned into
//!   every overlapped piece, and uncovered gaps are seeded with it.
//!
//! # Precision cap
//!
//! Every mutation that can grow a writer set takes a `max_set_size` bound. When the
//! writers observable for a range (its own set unioned with the target's unknown
//! bucket) would exceed the bound, the range is dropped and the
//! [`UNKNOWN_MEMORY`](crate::graph::UNKNOWN_MEMORY) sentinel is merged into the
//! unknown bucket instead. This keeps the lattice height finite on any finite node
//! set, which is what guarantees termination of the fixpoint.

use std::collections::{BTreeMap, BTreeSet};

use crate::graph::{NodeId, UNKNOWN_MEMORY};
use crate::mem::{DefSite, Offset};
use crate::utils::{ByteRange, RangeMap};

/// An ordered set of writer nodes.
pub type WriterSet = BTreeSet<NodeId>;

/// Per-target state: the interval partition plus the unknown bucket.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct TargetEntry {
    /// Disjoint byte ranges with the writers that may have produced them.
    ranges: RangeMap<WriterSet>,
    /// Writers of ranges with an unknown endpoint ("somewhere in the target").
    unknown: WriterSet,
}

impl TargetEntry {
    /// Collapses oversized writer sets to the unknown sentinel.
    ///
    /// A range counts as oversized when its writers unioned with the unknown bucket
    /// exceed `max_set_size`; the bucket itself collapses to `{UNKNOWN_MEMORY}` past
    /// the bound. Returns `true` if anything changed.
    fn enforce_cap(&mut self, max_set_size: usize) -> bool {
        let mut changed = false;
        loop {
            let bucket = self.unknown.clone();
            let over = self
                .ranges
                .take_where(|set| set.union(&bucket).count() > max_set_size);
            if over.is_empty() {
                break;
            }
            changed = true;
            self.unknown.insert(UNKNOWN_MEMORY);
            if self.unknown == bucket {
                break;
            }
        }
        if self.unknown.len() > max_set_size {
            self.unknown.clear();
            self.unknown.insert(UNKNOWN_MEMORY);
            changed = true;
        }
        changed
    }
}

/// A map from memory objects to interval-keyed sets of writer nodes.
///
/// This is the value the reaching-definitions fixpoint iterates over: every node's
/// incoming map and every block's cached out-state is a `DefinitionsMap`. Maps grow
/// monotonically under [`merge`](Self::merge), and equality is representation
/// independent (the underlying partitions are kept canonical), so the driver can
/// detect stabilization with a plain comparison.
///
/// # Example
///
/// ```rust
/// use defflow::{DefSite, DefinitionsMap, NodeId, Offset};
///
/// let target = NodeId::new(1);
/// let w1 = NodeId::new(2);
/// let w2 = NodeId::new(3);
///
/// let mut map = DefinitionsMap::new();
/// map.update(&DefSite::new(target, 0u64, 8u64), w1);
/// map.update(&DefSite::new(target, 0u64, 4u64), w2);
///
/// // w1 still reaches bytes 4..8.
/// let writers = map.get(target, Offset::Byte(0), Offset::Byte(8));
/// assert!(writers.contains(&w1) && writers.contains(&w2));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DefinitionsMap {
    targets: BTreeMap<NodeId, TargetEntry>,
}

impl DefinitionsMap {
    /// Creates an empty definitions map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if no writers are recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    /// Returns an iterator over the targets with recorded writers.
    pub fn targets(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.targets.keys().copied()
    }

    /// Strong update: `writer` overwrites the whole range described by `ds`.
    ///
    /// Prior writers are removed from the overlapped portion of the partition;
    /// their entries survive on any uncovered remainder. A site with an unknown
    /// offset overwrites everything known about the target: the partition and the
    /// unknown bucket are cleared and replaced by the single writer.
    ///
    /// Note that writers in the unknown bucket are not killed by a bounded strong
    /// update, since they may have written bytes outside the overwritten range.
    pub fn update(&mut self, ds: &DefSite, writer: NodeId) {
        if let Some(range) = ds.byte_range() {
            let entry = self.targets.entry(ds.target).or_default();
            entry.ranges.replace(range, WriterSet::from([writer]));
        } else if ds.has_unknown_bounds() {
            let entry = self.targets.entry(ds.target).or_default();
            entry.ranges.clear();
            entry.unknown.clear();
            entry.unknown.insert(writer);
        }
        // Zero-length finite sites write no bytes.
    }

    /// Weak update: `writer` may have written the range described by `ds`.
    ///
    /// The writer is unioned into every overlapped piece of the partition, and
    /// uncovered gaps inside the range are seeded with it. A site with an unknown
    /// offset goes to the unknown bucket and is additionally unioned into every
    /// existing range of the target. Returns `true` if the map changed.
    pub fn add(&mut self, ds: &DefSite, writer: NodeId, max_set_size: usize) -> bool {
        let mut changed = false;
        if let Some(range) = ds.byte_range() {
            let entry = self.targets.entry(ds.target).or_default();
            entry.ranges.apply(range, WriterSet::new, |set| {
                changed |= set.insert(writer);
            });
            changed |= entry.enforce_cap(max_set_size);
        } else if ds.has_unknown_bounds() {
            let entry = self.targets.entry(ds.target).or_default();
            changed |= entry.unknown.insert(writer);
            for set in entry.ranges.values_mut() {
                changed |= set.insert(writer);
            }
            changed |= entry.enforce_cap(max_set_size);
        }
        changed
    }

    /// Pointwise union of `other` into `self`.
    ///
    /// For every `(target, range)` of `other` the writer sets are unioned into this
    /// map, splitting ranges at overlap boundaries so the partitions stay disjoint.
    /// Returns `true` if `self` changed — the signal the fixpoint driver uses.
    pub fn merge(&mut self, other: &DefinitionsMap, max_set_size: usize) -> bool {
        let mut changed = false;
        for (&target, oentry) in &other.targets {
            let entry = self.targets.entry(target).or_default();
            for &w in &oentry.unknown {
                changed |= entry.unknown.insert(w);
            }
            for (&range, oset) in oentry.ranges.iter() {
                entry.ranges.apply(range, WriterSet::new, |set| {
                    for &w in oset {
                        changed |= set.insert(w);
                    }
                });
            }
            changed |= entry.enforce_cap(max_set_size);
        }
        changed
    }

    /// Collects every writer that may reach the queried byte range into `out`.
    ///
    /// The result unions three sources: the writers of every range of `target`
    /// intersecting `[offset, offset + len)` (the open tail for an unknown length,
    /// every range for an unknown offset), the target's unknown bucket, and
    /// everything recorded under
    /// [`UNKNOWN_MEMORY`] (a write to an unspecified object may alias any target).
    /// Querying `UNKNOWN_MEMORY` itself reads everything in the map.
    ///
    /// # Returns
    ///
    /// The size of `out` after collection.
    pub fn collect(&self, target: NodeId, offset: Offset, len: Offset, out: &mut WriterSet) -> usize {
        if target == UNKNOWN_MEMORY {
            for entry in self.targets.values() {
                for (_, set) in entry.ranges.iter() {
                    out.extend(set.iter().copied());
                }
                out.extend(entry.unknown.iter().copied());
            }
            return out.len();
        }

        if let Some(entry) = self.targets.get(&target) {
            match offset {
                Offset::Byte(start) => {
                    let end = match len {
                        Offset::Byte(l) => start.saturating_add(l),
                        Offset::Unknown => u64::MAX,
                    };
                    if end > start {
                        let query = ByteRange::new(start, end);
                        for (_, set) in entry.ranges.overlapping(query) {
                            out.extend(set.iter().copied());
                        }
                    }
                }
                Offset::Unknown => {
                    for (_, set) in entry.ranges.iter() {
                        out.extend(set.iter().copied());
                    }
                }
            }
            out.extend(entry.unknown.iter().copied());
        }

        if let Some(entry) = self.targets.get(&UNKNOWN_MEMORY) {
            for (_, set) in entry.ranges.iter() {
                out.extend(set.iter().copied());
            }
            out.extend(entry.unknown.iter().copied());
        }

        out.len()
    }

    /// Convenience wrapper around [`collect`](Self::collect) returning a fresh set.
    #[must_use]
    pub fn get(&self, target: NodeId, offset: Offset, len: Offset) -> WriterSet {
        let mut out = WriterSet::new();
        self.collect(target, offset, len, &mut out);
        out
    }
}
