//! Doc-values contracts consumed by the facet counting engines.
//!
//! Two per-document value shapes are read here:
//!
//! - [`SortedSetDocValues`]: a dictionary-coded set of byte terms per doc.
//!   Ordinals are dense `[0, value_count)` in the dictionary's sorted order.
//!   Multi-segment readers expose a reader-wide view that translates
//!   per-segment ordinals through an [`OrdinalMap`](ordinal_map::OrdinalMap).
//! - [`BinaryDocValues`]: one opaque byte payload per doc. Facet sets and
//!   range boxes are packed into this payload at index time.
//!
//! Both cursors double as [`DocSet`]s over the documents that carry a value,
//! so the counting engines can leapfrog them against the matching-doc bitset.

mod ordinal_map;

pub use ordinal_map::{MultiSortedSetDocValues, OrdinalMap};

use crate::docset::{DocSet, TERMINATED};
use crate::error::Result;
use crate::DocId;

/// Returned by [`SortedSetDocValues::next_ord`] once the current document's
/// ordinals are exhausted.
pub const NO_MORE_ORDS: i64 = -1;

// ── SortedSetDocValues ───────────────────────────────────────────────────

/// Dictionary-coded string set per document.
///
/// The dictionary side (`lookup_ord`, `lookup_term`, `get_value_count`) is
/// stateless; the per-document side is a forward-only [`DocSet`] cursor over
/// the documents that have at least one value, with `next_ord` yielding the
/// current document's ordinals in ascending order.
pub trait SortedSetDocValues: DocSet {
    /// Number of unique terms in the dictionary.
    fn get_value_count(&self) -> u64;

    /// The term bytes for a dictionary ordinal.
    fn lookup_ord(&self, ord: u64) -> Result<Vec<u8>>;

    /// The ordinal of `key`, or `-(insertion_point) - 1` if not present.
    fn lookup_term(&self, key: &[u8]) -> Result<i64>;

    /// Next ordinal of the current document, or [`NO_MORE_ORDS`].
    fn next_ord(&mut self) -> i64;

    /// Whether every document in this cursor carries exactly one value.
    /// When true, [`Self::ord_value`] is the faster per-doc access path.
    fn is_single_valued(&self) -> bool {
        false
    }

    /// The single ordinal of the current document. Only valid when positioned
    /// on a document and [`Self::is_single_valued`] is true.
    fn ord_value(&self) -> u64;
}

impl DocSet for Box<dyn SortedSetDocValues> {
    #[inline]
    fn doc(&self) -> DocId {
        (**self).doc()
    }
    #[inline]
    fn advance(&mut self) -> DocId {
        (**self).advance()
    }
    #[inline]
    fn seek(&mut self, target: DocId) -> DocId {
        (**self).seek(target)
    }
    #[inline]
    fn size_hint(&self) -> u32 {
        (**self).size_hint()
    }
}

/// Sorted-set doc values for a segment without the field.
pub struct EmptySortedSetDocValues;

impl DocSet for EmptySortedSetDocValues {
    fn doc(&self) -> DocId {
        TERMINATED
    }
    fn advance(&mut self) -> DocId {
        TERMINATED
    }
    fn seek(&mut self, _target: DocId) -> DocId {
        TERMINATED
    }
    fn size_hint(&self) -> u32 {
        0
    }
}

impl SortedSetDocValues for EmptySortedSetDocValues {
    fn get_value_count(&self) -> u64 {
        0
    }
    fn lookup_ord(&self, _ord: u64) -> Result<Vec<u8>> {
        Ok(Vec::new())
    }
    fn lookup_term(&self, _key: &[u8]) -> Result<i64> {
        Ok(-1)
    }
    fn next_ord(&mut self) -> i64 {
        NO_MORE_ORDS
    }
    fn ord_value(&self) -> u64 {
        0
    }
}

// ── BinaryDocValues ──────────────────────────────────────────────────────

/// Per-document opaque byte payload.
pub trait BinaryDocValues: DocSet {
    /// The payload of the current document. Only valid when positioned.
    fn binary_value(&self) -> &[u8];
}

// ── BinaryRangeDocValues ─────────────────────────────────────────────────

/// Fixed-stride view over a binary field holding packed range boxes.
///
/// Each document's payload is one or more boxes of
/// `dims * bytes_per_dim * 2` bytes (`dims` mins then `dims` maxes).
pub struct BinaryRangeDocValues {
    inner: Box<dyn BinaryDocValues>,
    box_bytes: usize,
}

impl BinaryRangeDocValues {
    pub fn new(inner: Box<dyn BinaryDocValues>, dims: usize, bytes_per_dim: usize) -> Self {
        Self {
            inner,
            box_bytes: dims * bytes_per_dim * 2,
        }
    }

    /// Position on `doc` if it has a value. Targets must be non-decreasing.
    pub fn advance_exact(&mut self, doc: DocId) -> bool {
        let mut current = self.inner.doc();
        if current < doc {
            current = self.inner.seek(doc);
        }
        current == doc
    }

    /// The packed boxes of the current document.
    pub fn packed_value(&self) -> Result<&[u8]> {
        let packed = self.inner.binary_value();
        if packed.is_empty() || packed.len() % self.box_bytes != 0 {
            return Err(crate::error::Error::Corruption(format!(
                "packed range value length ({}) is not a positive multiple of {}",
                packed.len(),
                self.box_bytes
            )));
        }
        Ok(packed)
    }
}
