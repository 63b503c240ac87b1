//! The harvested-hits contract consumed by the counting engines.
//!
//! Query execution happens elsewhere; what reaches the facet engines is a
//! [`FacetsCollector`]: one [`MatchingDocs`] per segment, holding the bitset
//! of matching documents. [`FastMatchFilter`] is the optional per-segment
//! pre-filter some engines intersect on top of the hits.

use crate::bitset::FixedBitSet;
use crate::docset::DocSet;
use crate::error::Result;
use crate::index::{IndexReader, LeafReaderContext};

/// Matching documents of one segment.
pub struct MatchingDocs {
    pub context: LeafReaderContext,
    /// One bit per segment doc; set bits matched the query.
    pub bits: FixedBitSet,
    /// Number of set bits.
    pub total_hits: u32,
}

impl MatchingDocs {
    pub fn new(context: LeafReaderContext, bits: FixedBitSet) -> Self {
        let total_hits = bits.cardinality();
        Self {
            context,
            bits,
            total_hits,
        }
    }
}

/// Per-segment matching docs harvested from a query.
#[derive(Default)]
pub struct FacetsCollector {
    matching_docs: Vec<MatchingDocs>,
}

impl FacetsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, docs: MatchingDocs) {
        self.matching_docs.push(docs);
    }

    pub fn matching_docs(&self) -> &[MatchingDocs] {
        &self.matching_docs
    }

    /// Hits equivalent to a match-all query: every live doc of every segment.
    pub fn match_all(reader: &IndexReader) -> Self {
        let mut collector = Self::new();
        for context in reader.leaves() {
            let max_doc = context.reader.max_doc();
            let mut bits = FixedBitSet::new(max_doc);
            match context.reader.live_docs() {
                Some(live) => {
                    for doc in 0..max_doc {
                        if live.get(doc) {
                            bits.set(doc);
                        }
                    }
                }
                None => {
                    for doc in 0..max_doc {
                        bits.set(doc);
                    }
                }
            }
            collector.add(MatchingDocs::new(context.clone(), bits));
        }
        collector
    }
}

/// Optional pre-filter intersected with the hits of each segment.
pub trait FastMatchFilter {
    /// A cursor over the docs this filter accepts in the given segment, or
    /// `None` when the filter cannot run there (the segment is then skipped).
    fn docset(&self, context: &LeafReaderContext) -> Result<Option<Box<dyn DocSet>>>;
}
