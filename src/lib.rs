//! Hermes-facet - facet aggregation for a search library
//!
//! Given the matching documents of a query, this crate computes counts over
//! categorical, hierarchical, multi-dimensional, and range-valued document
//! attributes. Three counting engines share one contract:
//! - Sorted-set facets: flat and hierarchical string taxonomies encoded as
//!   per-segment ordinals with a global ordinal map across segments
//! - Facet sets: per-doc N-tuples of typed numeric values evaluated against
//!   a catalog of exact/range matchers
//! - Range-on-range: per-doc multi-dimensional boxes counted by spatial
//!   relation (intersects/contains/within/crosses) against query boxes
//!
//! Reader state is built once per reader open and shared across queries;
//! counters and result queues are per-query. Counting itself is synchronous
//! and single-threaded per query.

pub mod bitset;
pub mod docset;
pub mod docvalues;
pub mod encoding;
pub mod error;
pub mod facets;
pub mod facetset;
pub mod index;
pub mod rangeonrange;
pub mod sortedset;

#[cfg(test)]
mod tests;

// Re-exports from bitset / docset
pub use bitset::{BitSetDocSet, FixedBitSet};
pub use docset::{
    AllDocSet, DocSet, EmptyDocSet, IntersectionDocSet, SortedVecDocSet, TERMINATED,
};

// Re-exports from docvalues
pub use docvalues::{
    BinaryDocValues, BinaryRangeDocValues, MultiSortedSetDocValues, OrdinalMap,
    SortedSetDocValues, NO_MORE_ORDS,
};

// Re-exports from index
pub use index::{
    IndexReader, LeafReader, LeafReaderContext, RamDocument, RamLeafReader, RamSegmentBuilder,
    ReaderCacheKey,
};

// Re-exports from facets
pub use facets::{
    path_to_string, string_to_path, FacetResult, Facets, FacetsCollector, FastMatchFilter,
    LabelAndValue, MatchingDocs,
};

// Re-exports from the counting engines
pub use facetset::{
    pack_facet_sets, DimRange, DoubleFacetSet, ExactFacetSetMatcher, FacetSet, FacetSetMatcher,
    FloatFacetSet, IntFacetSet, LongFacetSet, MatchingFacetSetCounts, RangeFacetSetMatcher,
};
pub use rangeonrange::{
    DoubleRange, FloatRange, IntRange, LongRange, QueryType, Range, RangeOnRangeFacetCounts,
};
pub use sortedset::{
    DimAndOrd, OrdRange, SortedSetFacetCounts, SortedSetReaderState, INVALID_ORDINAL,
};

pub use error::{Error, Result};

pub type DocId = u32;
