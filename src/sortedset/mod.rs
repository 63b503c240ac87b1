//! Ordinal-set faceting: flat and hierarchical string taxonomies counted
//! through sorted-set doc values, without a separate taxonomy index.
//!
//! [`SortedSetReaderState`] is built once per reader open and reused across
//! queries; [`SortedSetFacetCounts`] is the per-query counting engine.

mod counts;
mod state;

pub use counts::SortedSetFacetCounts;
pub use state::{ChildOrds, DimAndOrd, OrdRange, SortedSetReaderState, INVALID_ORDINAL};
