//! Per-query counting of documents whose boxes relate to each query range.
//!
//! Every matching doc's packed boxes are tested against every query range
//! under the configured [`QueryType`] relation. Docs with no value, and docs
//! matching no range, accumulate a missing count that is subtracted from the
//! per-segment hit total at the end.

use crate::bitset::BitSetDocSet;
use crate::docset::{DocSet, IntersectionDocSet, TERMINATED};
use crate::docvalues::BinaryRangeDocValues;
use crate::error::{Error, Result};
use crate::facets::{
    validate_top_n, FacetResult, Facets, FacetsCollector, FastMatchFilter, LabelAndValue,
};

use super::{QueryType, Range};

/// Counts per query range over a binary doc-values field of packed boxes.
pub struct RangeOnRangeFacetCounts {
    field: String,
    labels: Vec<String>,
    encoded_ranges: Vec<Vec<u8>>,
    bytes_per_dim: usize,
    dims: usize,
    query_type: QueryType,
    /// Per range, in user order.
    counts: Vec<i32>,
    /// Hits that had at least one matching box.
    tot_count: i64,
}

impl RangeOnRangeFacetCounts {
    /// Count the hits against every range. `fast_match` optionally narrows
    /// each segment's hits before boxes are read.
    pub fn new<R: Range>(
        field: &str,
        hits: &FacetsCollector,
        query_type: QueryType,
        fast_match: Option<&dyn FastMatchFilter>,
        ranges: &[R],
    ) -> Result<Self> {
        if ranges.is_empty() {
            return Err(Error::invalid_argument("ranges cannot be empty"));
        }
        let dims = ranges[0].dims();
        if ranges.iter().any(|r| r.dims() != dims) {
            return Err(Error::invalid_argument(
                "all ranges must be the same dimensionality",
            ));
        }
        let bytes_per_dim = ranges[0].encoded_value_bytes();
        let encoded_ranges: Vec<Vec<u8>> = ranges.iter().map(|r| r.encode_packed()).collect();
        debug_assert!(encoded_ranges
            .iter()
            .all(|e| e.len() == 2 * dims * bytes_per_dim));

        let mut counts = Self {
            field: field.to_string(),
            labels: ranges.iter().map(|r| r.label().to_string()).collect(),
            encoded_ranges,
            bytes_per_dim,
            dims,
            query_type,
            counts: vec![0; ranges.len()],
            tot_count: 0,
        };
        counts.count(hits, fast_match)?;
        Ok(counts)
    }

    /// Per-range counts in user order.
    pub fn counts(&self) -> &[i32] {
        &self.counts
    }

    /// Hits that had at least one matching box.
    pub fn total_count(&self) -> i64 {
        self.tot_count
    }

    fn count(&mut self, hits: &FacetsCollector, fast_match: Option<&dyn FastMatchFilter>) -> Result<()> {
        // Ranges are checked exhaustively per doc; a space-partitioning
        // structure over the ranges array would prune this
        let mut missing_count: i64 = 0;

        for matching in hits.matching_docs() {
            let Some(binary) = matching.context.reader.binary_doc_values(&self.field)? else {
                continue;
            };
            let mut range_values =
                BinaryRangeDocValues::new(binary, self.dims, self.bytes_per_dim);

            let mut it: Box<dyn DocSet + '_> = match fast_match {
                Some(filter) => match filter.docset(&matching.context)? {
                    Some(filter_docs) => Box::new(IntersectionDocSet::new(
                        BitSetDocSet::new(&matching.bits),
                        filter_docs,
                    )),
                    None => continue,
                },
                None => Box::new(BitSetDocSet::new(&matching.bits)),
            };

            self.tot_count += matching.total_hits as i64;
            let mut doc = it.doc();
            while doc != TERMINATED {
                if range_values.advance_exact(doc) {
                    let packed = range_values.packed_value()?;
                    let mut has_valid_range = false;
                    for (range, encoded) in self.encoded_ranges.iter().enumerate() {
                        if self.query_type.matches(encoded, packed, self.dims, self.bytes_per_dim)
                        {
                            self.counts[range] += 1;
                            has_valid_range = true;
                        }
                    }
                    if !has_valid_range {
                        missing_count += 1;
                    }
                } else {
                    missing_count += 1;
                }
                doc = it.advance();
            }
        }

        self.tot_count -= missing_count;
        Ok(())
    }

    fn validate_dim_and_path(&self, dim: &str, path: &[&str]) -> Result<()> {
        if dim != self.field {
            return Err(Error::invalid_argument(format!(
                "invalid dim \"{dim}\"; should be \"{}\"",
                self.field
            )));
        }
        if !path.is_empty() {
            return Err(Error::invalid_argument("path.length should be 0"));
        }
        Ok(())
    }
}

/// Top-children heap entry; the weakest is the lowest count, ties resolved
/// against the later label so that popped output comes back label-ascending.
#[derive(PartialEq, Eq)]
struct Entry {
    count: i32,
    label: String,
}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Entry {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        other
            .count
            .cmp(&self.count)
            .then_with(|| self.label.cmp(&other.label))
    }
}

impl Facets for RangeOnRangeFacetCounts {
    fn get_top_children(
        &self,
        top_n: usize,
        dim: &str,
        path: &[&str],
    ) -> Result<Option<FacetResult>> {
        validate_top_n(top_n)?;
        self.validate_dim_and_path(dim, path)?;

        let capacity = top_n.min(self.counts.len());
        let mut pq: std::collections::BinaryHeap<Entry> =
            std::collections::BinaryHeap::with_capacity(capacity + 1);

        let mut child_count = 0;
        for (i, &count) in self.counts.iter().enumerate() {
            if count != 0 {
                child_count += 1;
                let entry = Entry {
                    count,
                    label: self.labels[i].clone(),
                };
                if pq.len() < capacity {
                    pq.push(entry);
                } else if let Some(top) = pq.peek()
                    && top.cmp(&entry) == std::cmp::Ordering::Greater
                {
                    pq.pop();
                    pq.push(entry);
                }
            }
        }

        let mut label_values: Vec<LabelAndValue> = Vec::with_capacity(pq.len());
        while let Some(entry) = pq.pop() {
            label_values.push(LabelAndValue::new(entry.label, entry.count as i64));
        }
        label_values.reverse();

        Ok(Some(FacetResult {
            dim: dim.to_string(),
            path: Vec::new(),
            value: self.tot_count,
            label_values,
            child_count,
        }))
    }

    /// Children come back in the order the ranges were given, zeros included.
    fn get_all_children(&self, dim: &str, path: &[&str]) -> Result<Option<FacetResult>> {
        self.validate_dim_and_path(dim, path)?;
        let label_values: Vec<LabelAndValue> = self
            .labels
            .iter()
            .zip(&self.counts)
            .map(|(label, &count)| LabelAndValue::new(label, count as i64))
            .collect();
        let child_count = label_values.len();
        Ok(Some(FacetResult {
            dim: dim.to_string(),
            path: Vec::new(),
            value: self.tot_count,
            label_values,
            child_count,
        }))
    }

    fn get_specific_value(&self, _dim: &str, _path: &[&str]) -> Result<i64> {
        Err(Error::Unsupported(
            "getSpecificValue is not supported for range-on-range counts".to_string(),
        ))
    }

    fn get_all_dims(&self, top_n: usize) -> Result<Vec<FacetResult>> {
        validate_top_n(top_n)?;
        let field = self.field.clone();
        Ok(self
            .get_top_children(top_n, &field, &[])?
            .into_iter()
            .collect())
    }
}
