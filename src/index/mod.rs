//! Reader model consumed by the facet engines.
//!
//! An [`IndexReader`] is an ordered list of segment leaves. Each leaf hands
//! out doc-values cursors; the reader carries a process-unique cache key used
//! to validate cached ordinal maps and to detect, eagerly, the classic bug of
//! counting against a state built for a different reader.
//!
//! [`ram`] provides the in-memory implementation backing every test.

pub mod ram;

pub use ram::{RamDocument, RamLeafReader, RamSegmentBuilder};

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::bitset::FixedBitSet;
use crate::docvalues::{BinaryDocValues, SortedSetDocValues};
use crate::error::Result;
use crate::DocId;

/// Process-unique identity of an open reader.
pub type ReaderCacheKey = u64;

static NEXT_READER_KEY: AtomicU64 = AtomicU64::new(1);

// ── LeafReader ───────────────────────────────────────────────────────────

/// One segment's reader: doc-values access plus liveness.
pub trait LeafReader: Send + Sync {
    /// One greater than the largest doc ID in this segment.
    fn max_doc(&self) -> u32;

    /// Bitset of live (non-deleted) documents, or `None` when all are live.
    fn live_docs(&self) -> Option<&FixedBitSet>;

    /// Sorted-set doc values for `field`, or `None` if the segment has none.
    /// Fails if the field is indexed with a different doc-values kind.
    fn sorted_set_doc_values(&self, field: &str)
        -> Result<Option<Box<dyn SortedSetDocValues>>>;

    /// Binary doc values for `field`, or `None` if the segment has none.
    /// Fails if the field is indexed with a different doc-values kind.
    fn binary_doc_values(&self, field: &str) -> Result<Option<Box<dyn BinaryDocValues>>>;
}

/// A leaf's position within its parent reader.
#[derive(Clone)]
pub struct LeafReaderContext {
    /// Index of this leaf in the parent's leaf list.
    pub ord: usize,
    /// First parent-wide doc ID belonging to this leaf.
    pub doc_base: DocId,
    /// Cache key of the parent reader.
    pub parent: ReaderCacheKey,
    pub reader: Arc<dyn LeafReader>,
}

// ── IndexReader ──────────────────────────────────────────────────────────

/// A point-in-time composite reader over one or more segments.
pub struct IndexReader {
    leaves: Vec<LeafReaderContext>,
    cache_key: ReaderCacheKey,
    max_doc: u32,
}

impl IndexReader {
    pub fn new(segments: Vec<Arc<dyn LeafReader>>) -> Arc<Self> {
        let cache_key = NEXT_READER_KEY.fetch_add(1, Ordering::Relaxed);
        let mut leaves = Vec::with_capacity(segments.len());
        let mut doc_base = 0;
        for (ord, reader) in segments.into_iter().enumerate() {
            let max_doc = reader.max_doc();
            leaves.push(LeafReaderContext {
                ord,
                doc_base,
                parent: cache_key,
                reader,
            });
            doc_base += max_doc;
        }
        Arc::new(Self {
            leaves,
            cache_key,
            max_doc: doc_base,
        })
    }

    pub fn leaves(&self) -> &[LeafReaderContext] {
        &self.leaves
    }

    pub fn cache_key(&self) -> ReaderCacheKey {
        self.cache_key
    }

    pub fn max_doc(&self) -> u32 {
        self.max_doc
    }
}
