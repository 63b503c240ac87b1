//! Per-query counting of matching facet sets.
//!
//! Walks the binary doc values of the facet-set field, decodes or scans each
//! packed tuple, and evaluates every registered matcher against it. A doc
//! contributes to `tot_count` once if any of its tuples matched any matcher.

use crate::bitset::BitSetDocSet;
use crate::docset::{DocSet, TERMINATED};
use crate::encoding::{sortable_bytes_to_long, LONG_BYTES};
use crate::error::{Error, Result};
use crate::facets::{
    validate_top_n, FacetResult, Facets, FacetsCollector, LabelAndValue, MatchingDocs,
};

use super::FacetSetMatcher;

/// Counts for each given facet-set matcher over a binary doc-values field.
pub struct MatchingFacetSetCounts {
    field: String,
    matchers: Vec<Box<dyn FacetSetMatcher>>,
    /// Per matcher, in registration order.
    counts: Vec<i32>,
    /// Docs with at least one matching tuple.
    tot_count: u32,
}

impl MatchingFacetSetCounts {
    /// Count the hits against every matcher. `count_bytes` selects the
    /// zero-decode packed evaluation path over the decode-once path.
    pub fn new(
        field: &str,
        hits: &FacetsCollector,
        count_bytes: bool,
        matchers: Vec<Box<dyn FacetSetMatcher>>,
    ) -> Result<Self> {
        if matchers.is_empty() {
            return Err(Error::invalid_argument("matchers cannot be empty"));
        }
        let dims = matchers[0].dims();
        if matchers.iter().any(|m| m.dims() != dims) {
            return Err(Error::invalid_argument(
                "all facet set matchers must be the same dimensionality",
            ));
        }

        let mut counts = Self {
            field: field.to_string(),
            counts: vec![0; matchers.len()],
            matchers,
            tot_count: 0,
        };
        if count_bytes {
            counts.count_bytes(hits.matching_docs())?;
        } else {
            counts.count_longs(hits.matching_docs())?;
        }
        Ok(counts)
    }

    /// Per-matcher counts in registration order.
    pub fn counts(&self) -> &[i32] {
        &self.counts
    }

    /// Number of docs with at least one matching tuple.
    pub fn total_count(&self) -> u32 {
        self.tot_count
    }

    fn count_bytes(&mut self, matching_docs: &[MatchingDocs]) -> Result<()> {
        let mut expected_num_dims: Option<usize> = None;

        for hits in matching_docs {
            let Some(mut values) = hits.context.reader.binary_doc_values(&self.field)? else {
                continue;
            };

            let mut it = BitSetDocSet::new(&hits.bits);
            let mut doc = it.doc();
            while doc != TERMINATED {
                if values.seek(doc) == doc {
                    let packed = values.binary_value();
                    let num_dims = read_num_dims(packed, &mut expected_num_dims, doc)?;
                    let mut should_count_doc = false;
                    let mut start = LONG_BYTES;
                    while start < packed.len() {
                        for (j, matcher) in self.matchers.iter().enumerate() {
                            if matcher.matches_packed(packed, start, num_dims) {
                                self.counts[j] += 1;
                                should_count_doc = true;
                            }
                        }
                        start += num_dims * LONG_BYTES;
                    }
                    if should_count_doc {
                        self.tot_count += 1;
                    }
                } else if values.doc() == TERMINATED {
                    break;
                }
                doc = it.advance();
            }
        }
        Ok(())
    }

    fn count_longs(&mut self, matching_docs: &[MatchingDocs]) -> Result<()> {
        // Dimension values buffer, reused across docs
        let mut dim_values: Vec<i64> = Vec::new();
        let mut expected_num_dims: Option<usize> = None;

        for hits in matching_docs {
            let Some(mut values) = hits.context.reader.binary_doc_values(&self.field)? else {
                continue;
            };

            let mut it = BitSetDocSet::new(&hits.bits);
            let mut doc = it.doc();
            while doc != TERMINATED {
                if values.seek(doc) == doc {
                    let packed = values.binary_value();
                    let num_dims = read_num_dims(packed, &mut expected_num_dims, doc)?;
                    dim_values.resize(num_dims, 0);
                    let mut should_count_doc = false;
                    let mut start = LONG_BYTES;
                    while start < packed.len() {
                        for (i, value) in dim_values.iter_mut().enumerate() {
                            let offset = start + i * LONG_BYTES;
                            *value = sortable_bytes_to_long(&packed[offset..offset + LONG_BYTES]);
                        }
                        for (j, matcher) in self.matchers.iter().enumerate() {
                            if matcher.matches(&dim_values) {
                                self.counts[j] += 1;
                                should_count_doc = true;
                            }
                        }
                        start += num_dims * LONG_BYTES;
                    }
                    if should_count_doc {
                        self.tot_count += 1;
                    }
                } else if values.doc() == TERMINATED {
                    break;
                }
                doc = it.advance();
            }
        }
        Ok(())
    }
}

/// Read and validate the tuple width header of one doc's payload. All docs
/// in a field share their dimensionality; the first doc seen pins it.
fn read_num_dims(
    packed: &[u8],
    expected: &mut Option<usize>,
    doc: u32,
) -> Result<usize> {
    if packed.len() < LONG_BYTES {
        return Err(Error::Corruption(format!(
            "facet set payload of doc {doc} is shorter than its header"
        )));
    }
    let num_dims = sortable_bytes_to_long(&packed[..LONG_BYTES]);
    if num_dims <= 0 {
        return Err(Error::Corruption(format!(
            "facet set payload of doc {doc} declares {num_dims} dimensions"
        )));
    }
    let num_dims = num_dims as usize;
    if (packed.len() - LONG_BYTES) % (num_dims * LONG_BYTES) != 0 {
        return Err(Error::Corruption(format!(
            "facet set payload of doc {doc} is not a whole number of {num_dims}-dim tuples"
        )));
    }
    match expected {
        None => *expected = Some(num_dims),
        Some(expected) => debug_assert_eq!(
            num_dims, *expected,
            "expected ({expected}) dimensions, found ({num_dims}) for doc ({doc})"
        ),
    }
    Ok(num_dims)
}

impl Facets for MatchingFacetSetCounts {
    // Returns all children rather than the top `top_n`, in matcher
    // registration order; top-K semantics for facet sets are still open
    // upstream, so the observable behaviour is preserved.
    fn get_top_children(
        &self,
        top_n: usize,
        dim: &str,
        path: &[&str],
    ) -> Result<Option<FacetResult>> {
        validate_top_n(top_n)?;
        if dim != self.field {
            return Err(Error::invalid_argument(format!(
                "invalid dim \"{dim}\"; should be \"{}\"",
                self.field
            )));
        }
        if !path.is_empty() {
            return Err(Error::invalid_argument("path.length should be 0"));
        }
        let label_values: Vec<LabelAndValue> = self
            .matchers
            .iter()
            .zip(&self.counts)
            .map(|(matcher, &count)| LabelAndValue::new(matcher.label(), count as i64))
            .collect();
        let child_count = label_values.len();
        Ok(Some(FacetResult {
            dim: dim.to_string(),
            path: Vec::new(),
            value: self.tot_count as i64,
            label_values,
            child_count,
        }))
    }

    fn get_specific_value(&self, _dim: &str, _path: &[&str]) -> Result<i64> {
        Err(Error::Unsupported(
            "getSpecificValue is not supported for facet set counts".to_string(),
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
