//! Facet results, the shared aggregation contract, and top-K selection.
//!
//! Every counting engine implements [`Facets`]: given a previously counted
//! set of matching documents, produce labelled counts per dimension. Results
//! are assembled as [`FacetResult`] values; top-K selection runs through a
//! fixed-capacity min-heap whose ordering is chosen so that popping in
//! ascending order yields the user-visible `(count desc, label asc)`.

pub mod collector;
pub mod path;

pub use collector::{FacetsCollector, FastMatchFilter, MatchingDocs};
pub use path::{path_to_string, string_to_path};

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::fmt;

use crate::error::{Error, Result};

// ── Result types ─────────────────────────────────────────────────────────

/// A single labelled count.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct LabelAndValue {
    pub label: String,
    pub value: i64,
}

impl LabelAndValue {
    pub fn new(label: impl Into<String>, value: i64) -> Self {
        Self {
            label: label.into(),
            value,
        }
    }
}

/// Counts for a single dimension/path.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct FacetResult {
    /// Dimension that was requested.
    pub dim: String,
    /// Path within the dimension that was requested.
    pub path: Vec<String>,
    /// Count for the path itself.
    pub value: i64,
    /// Child labels and counts, best first.
    pub label_values: Vec<LabelAndValue>,
    /// Number of children with a non-zero count (may exceed `label_values.len()`).
    pub child_count: usize,
}

impl fmt::Display for FacetResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "dim={} path=[{}] value={} childCount={}",
            self.dim,
            self.path.join(", "),
            self.value,
            self.child_count
        )?;
        for lv in &self.label_values {
            writeln!(f, "  {} ({})", lv.label, lv.value)?;
        }
        Ok(())
    }
}

// ── Facets contract ──────────────────────────────────────────────────────

/// Common aggregation contract shared by all counting engines.
pub trait Facets {
    /// Top `top_n` children of the given dim/path, or `None` when the path
    /// was never indexed or has no children with a count.
    fn get_top_children(&self, top_n: usize, dim: &str, path: &[&str])
        -> Result<Option<FacetResult>>;

    /// Every child of the given dim/path regardless of count, in an
    /// engine-defined order. Unsupported by default.
    fn get_all_children(&self, _dim: &str, _path: &[&str]) -> Result<Option<FacetResult>> {
        Err(Error::Unsupported(
            "getAllChildren is not supported by this engine".to_string(),
        ))
    }

    /// The count for a single leaf value, or -1 if it was never indexed.
    fn get_specific_value(&self, dim: &str, path: &[&str]) -> Result<i64>;

    /// One result per root dimension, each holding its own top `top_n`,
    /// sorted by `(value desc, dim asc)`.
    fn get_all_dims(&self, top_n: usize) -> Result<Vec<FacetResult>>;
}

/// Reject non-positive `top_n` requests.
pub fn validate_top_n(top_n: usize) -> Result<()> {
    if top_n == 0 {
        return Err(Error::invalid_argument("topN must be > 0 (got: 0)"));
    }
    Ok(())
}

/// Sort results across dimensions: highest value first, ties by dim name.
pub fn sort_all_dims(results: &mut Vec<FacetResult>) {
    results.sort_by(|a, b| b.value.cmp(&a.value).then_with(|| a.dim.cmp(&b.dim)));
}

// ── Top-K ordinal queue ──────────────────────────────────────────────────

/// An ordinal with its accumulated count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrdAndValue {
    pub ord: u32,
    pub value: i32,
}

impl PartialOrd for OrdAndValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for OrdAndValue {
    fn cmp(&self, other: &Self) -> Ordering {
        // Inverted so BinaryHeap::peek is the weakest entry: lowest value,
        // ties resolved against the larger ordinal (= later label). Popping
        // in this order and filling results back-to-front yields
        // (count desc, label asc).
        other
            .value
            .cmp(&self.value)
            .then_with(|| self.ord.cmp(&other.ord))
    }
}

/// Fixed-capacity min-heap keeping the best `capacity` (ord, value) entries.
pub struct TopOrdAndIntQueue {
    heap: BinaryHeap<OrdAndValue>,
    capacity: usize,
}

impl TopOrdAndIntQueue {
    pub fn new(capacity: usize) -> Self {
        Self {
            heap: BinaryHeap::with_capacity(capacity + 1),
            capacity,
        }
    }

    /// Insert, evicting the weakest entry on overflow.
    pub fn insert_with_overflow(&mut self, entry: OrdAndValue) {
        if self.heap.len() < self.capacity {
            self.heap.push(entry);
        } else if let Some(top) = self.heap.peek()
            && top.cmp(&entry) == Ordering::Greater
        {
            self.heap.pop();
            self.heap.push(entry);
        }
    }

    /// The weakest entry currently held.
    pub fn top(&self) -> Option<&OrdAndValue> {
        self.heap.peek()
    }

    /// Remove and return the weakest entry.
    pub fn pop(&mut self) -> Option<OrdAndValue> {
        self.heap.pop()
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}
