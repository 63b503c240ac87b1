//! Cross-segment ordinal mapping.
//!
//! Each segment assigns its own dense ordinals to its own term dictionary.
//! [`OrdinalMap`] unifies them: a k-way merge over the per-segment
//! dictionaries assigns one global ordinal per distinct term, and records
//! both directions of the translation. [`MultiSortedSetDocValues`] is the
//! reader-wide doc-values view built on top of the map.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::sync::Arc;

use crate::docset::{DocSet, TERMINATED};
use crate::error::Result;
use crate::index::ReaderCacheKey;
use crate::DocId;

use super::{SortedSetDocValues, NO_MORE_ORDS};

// ── OrdinalMap ───────────────────────────────────────────────────────────

/// Maps per-segment ordinals to a single global ordinal space and back.
pub struct OrdinalMap {
    /// Cache key of the reader this map was built against.
    pub owner: ReaderCacheKey,
    /// Per segment: seg ord -> global ord.
    seg_to_global: Vec<Vec<u64>>,
    /// Global ord -> (first segment holding the term, its seg ord).
    first_segment: Vec<(u32, u64)>,
}

/// Merge-heap entry; ordered so the smallest term pops first, ties broken by
/// segment index for a stable merge.
struct MergeEntry {
    term: Vec<u8>,
    segment: usize,
    seg_ord: u64,
}

impl PartialEq for MergeEntry {
    fn eq(&self, other: &Self) -> bool {
        self.term == other.term && self.segment == other.segment
    }
}
impl Eq for MergeEntry {}
impl PartialOrd for MergeEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for MergeEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed: BinaryHeap pops the max, we want the smallest term
        other
            .term
            .cmp(&self.term)
            .then_with(|| other.segment.cmp(&self.segment))
    }
}

impl OrdinalMap {
    /// Build a map by merging the dictionaries of `values`.
    pub fn build(owner: ReaderCacheKey, values: &[Box<dyn SortedSetDocValues>]) -> Result<Self> {
        let mut seg_to_global: Vec<Vec<u64>> = values
            .iter()
            .map(|v| vec![0; v.get_value_count() as usize])
            .collect();
        let mut first_segment = Vec::new();

        let mut heap = BinaryHeap::new();
        for (segment, v) in values.iter().enumerate() {
            if v.get_value_count() > 0 {
                heap.push(MergeEntry {
                    term: v.lookup_ord(0)?,
                    segment,
                    seg_ord: 0,
                });
            }
        }

        let mut last_term: Option<Vec<u8>> = None;
        while let Some(entry) = heap.pop() {
            if last_term.as_deref() != Some(entry.term.as_slice()) {
                first_segment.push((entry.segment as u32, entry.seg_ord));
                last_term = Some(entry.term.clone());
            }
            let global = first_segment.len() as u64 - 1;
            seg_to_global[entry.segment][entry.seg_ord as usize] = global;

            let next_ord = entry.seg_ord + 1;
            if next_ord < values[entry.segment].get_value_count() {
                heap.push(MergeEntry {
                    term: values[entry.segment].lookup_ord(next_ord)?,
                    segment: entry.segment,
                    seg_ord: next_ord,
                });
            }
        }

        Ok(Self {
            owner,
            seg_to_global,
            first_segment,
        })
    }

    /// Number of distinct terms across all segments.
    pub fn value_count(&self) -> u64 {
        self.first_segment.len() as u64
    }

    /// Translate a segment-local ordinal to its global ordinal.
    #[inline]
    pub fn global_ord(&self, segment: usize, seg_ord: u64) -> u64 {
        self.seg_to_global[segment][seg_ord as usize]
    }

    /// The first segment holding a global ordinal, and its local ordinal.
    #[inline]
    pub fn first_segment(&self, global_ord: u64) -> (usize, u64) {
        let (segment, seg_ord) = self.first_segment[global_ord as usize];
        (segment as usize, seg_ord)
    }
}

// ── MultiSortedSetDocValues ──────────────────────────────────────────────

/// Reader-wide sorted-set view: concatenates per-segment cursors by doc base
/// and resolves ordinals through the global [`OrdinalMap`].
pub struct MultiSortedSetDocValues {
    values: Vec<Box<dyn SortedSetDocValues>>,
    /// Per segment doc base, plus a trailing entry holding `max_doc`.
    doc_starts: Vec<DocId>,
    mapping: Arc<OrdinalMap>,
    current: usize,
    single_valued: bool,
}

impl MultiSortedSetDocValues {
    pub fn new(
        values: Vec<Box<dyn SortedSetDocValues>>,
        doc_starts: Vec<DocId>,
        mapping: Arc<OrdinalMap>,
    ) -> Self {
        debug_assert_eq!(doc_starts.len(), values.len() + 1);
        let single_valued = values.iter().all(|v| v.is_single_valued());
        let mut dv = Self {
            values,
            doc_starts,
            mapping,
            current: 0,
            single_valued,
        };
        dv.roll_forward();
        dv
    }

    /// The ordinal map carried by this view.
    pub fn mapping(&self) -> &Arc<OrdinalMap> {
        &self.mapping
    }

    /// Skip past exhausted segment cursors.
    fn roll_forward(&mut self) {
        while self.current < self.values.len()
            && self.values[self.current].doc() == TERMINATED
        {
            self.current += 1;
        }
    }
}

impl DocSet for MultiSortedSetDocValues {
    fn doc(&self) -> DocId {
        if self.current >= self.values.len() {
            TERMINATED
        } else {
            self.doc_starts[self.current] + self.values[self.current].doc()
        }
    }

    fn advance(&mut self) -> DocId {
        if self.current >= self.values.len() {
            return TERMINATED;
        }
        self.values[self.current].advance();
        self.roll_forward();
        self.doc()
    }

    fn seek(&mut self, target: DocId) -> DocId {
        while self.current < self.values.len() {
            // Segment containing target, or a later one if target is behind
            if target < self.doc_starts[self.current + 1] {
                let local = target.saturating_sub(self.doc_starts[self.current]);
                self.values[self.current].seek(local);
                self.roll_forward();
                return self.doc();
            }
            self.current += 1;
        }
        TERMINATED
    }

    fn size_hint(&self) -> u32 {
        self.values[self.current..]
            .iter()
            .map(|v| v.size_hint())
            .sum()
    }
}

impl SortedSetDocValues for MultiSortedSetDocValues {
    fn get_value_count(&self) -> u64 {
        self.mapping.value_count()
    }

    fn lookup_ord(&self, ord: u64) -> Result<Vec<u8>> {
        let (segment, seg_ord) = self.mapping.first_segment(ord);
        self.values[segment].lookup_ord(seg_ord)
    }

    fn lookup_term(&self, key: &[u8]) -> Result<i64> {
        // Binary search the global ordinal space, resolving terms on demand
        let mut lo = 0i64;
        let mut hi = self.mapping.value_count() as i64 - 1;
        while lo <= hi {
            let mid = (lo + hi) >> 1;
            let term = self.lookup_ord(mid as u64)?;
            match term.as_slice().cmp(key) {
                Ordering::Less => lo = mid + 1,
                Ordering::Greater => hi = mid - 1,
                Ordering::Equal => return Ok(mid),
            }
        }
        Ok(-lo - 1)
    }

    fn next_ord(&mut self) -> i64 {
        if self.current >= self.values.len() {
            return NO_MORE_ORDS;
        }
        let seg_ord = self.values[self.current].next_ord();
        if seg_ord == NO_MORE_ORDS {
            return NO_MORE_ORDS;
        }
        self.mapping.global_ord(self.current, seg_ord as u64) as i64
    }

    fn is_single_valued(&self) -> bool {
        self.single_valued
    }

    fn ord_value(&self) -> u64 {
        self.mapping
            .global_ord(self.current, self.values[self.current].ord_value())
    }
}
