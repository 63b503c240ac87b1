//! Per-query counting over sorted-set facet ordinals.
//!
//! Walks each segment's matching docs, tallies ordinal hits into a counter
//! array in the global ordinal space, then answers top-K questions from it.
//! Multi-segment readers remap segment ordinals through the state's global
//! ordinal map; a density heuristic picks between remapping every visited
//! ordinal on the fly (sparse hits) and counting in segment-ordinal space
//! first, migrating non-zero slots afterwards (dense hits).

use crate::bitset::FixedBitSet;
use crate::docset::{DocSet, TERMINATED};
use crate::docvalues::{OrdinalMap, SortedSetDocValues, NO_MORE_ORDS};
use crate::error::{Error, Result};
use crate::facets::path::{path_to_string, string_to_path};
use crate::facets::{
    sort_all_dims, validate_top_n, FacetResult, Facets, FacetsCollector, LabelAndValue,
    MatchingDocs, OrdAndValue, TopOrdAndIntQueue,
};
use crate::index::LeafReaderContext;

use super::{OrdRange, SortedSetReaderState};

/// Facet counts over a sorted-set field.
///
/// Holds a thread-private doc-values cursor; instantiate and use from a
/// single thread. Tie-break across equal counts is by label in byte order.
pub struct SortedSetFacetCounts<'a> {
    state: &'a SortedSetReaderState,
    dv: Box<dyn SortedSetDocValues>,
    /// Per global ordinal.
    counts: Vec<i32>,
    /// Distinct matching docs that contributed at least one count.
    tot_count: u32,
}

impl<'a> SortedSetFacetCounts<'a> {
    /// Count facets across the provided hits, or across every live document
    /// when `hits` is `None` (browse-only).
    pub fn new(state: &'a SortedSetReaderState, hits: Option<&FacetsCollector>) -> Result<Self> {
        let dv = state.get_doc_values()?;
        let mut counts = Self {
            state,
            dv,
            counts: vec![0; state.size() as usize],
            tot_count: 0,
        };
        match hits {
            Some(hits) => counts.count(hits.matching_docs())?,
            None => counts.count_all()?,
        }
        Ok(counts)
    }

    /// The counter array in the global ordinal space.
    pub fn counts(&self) -> &[i32] {
        &self.counts
    }

    /// Number of distinct docs that contributed at least one count.
    pub fn total_count(&self) -> u32 {
        self.tot_count
    }

    fn count(&mut self, matching_docs: &[MatchingDocs]) -> Result<()> {
        let ordinal_map = if self.state.reader().leaves().len() > 1 && matching_docs.len() > 1 {
            self.state.ordinal_map()?
        } else {
            None
        };

        for hits in matching_docs {
            // Counting against a state built for a different reader produces
            // silently wrong ordinals; detect it eagerly.
            if hits.context.parent != self.state.reader().cache_key() {
                return Err(Error::ReaderMismatch);
            }
            self.count_one_segment(ordinal_map.as_deref(), &hits.context, Some(hits), None)?;
        }
        Ok(())
    }

    fn count_all(&mut self) -> Result<()> {
        let ordinal_map = if self.state.reader().leaves().len() > 1 {
            self.state.ordinal_map()?
        } else {
            None
        };

        for context in self.state.reader().leaves().to_vec() {
            let live_docs = context.reader.live_docs();
            self.count_one_segment(ordinal_map.as_deref(), &context, None, live_docs)?;
        }
        Ok(())
    }

    fn count_one_segment(
        &mut self,
        ordinal_map: Option<&OrdinalMap>,
        context: &LeafReaderContext,
        hits: Option<&MatchingDocs>,
        live_docs: Option<&FixedBitSet>,
    ) -> Result<()> {
        let Some(mut seg_values) = context.reader.sorted_set_doc_values(self.state.field())?
        else {
            return Ok(());
        };
        // Single-valued fields skip the per-doc ordinal loop
        let single_valued = seg_values.is_single_valued();
        let num_seg_ords = seg_values.get_value_count();

        if let Some(map) = ordinal_map {
            let segment = context.ord;
            let sparse = hits.is_some_and(|h| (h.total_hits as u64) < num_seg_ords / 10);
            if sparse {
                // Few hits against a large dictionary: remap each visited
                // ordinal to the global space as we go
                if single_valued {
                    for_each_doc(&mut seg_values, hits, live_docs, |dv| {
                        self.counts[map.global_ord(segment, dv.ord_value()) as usize] += 1;
                        self.tot_count += 1;
                    });
                } else {
                    for_each_doc(&mut seg_values, hits, live_docs, |dv| {
                        let mut term = dv.next_ord();
                        while term != NO_MORE_ORDS {
                            self.counts[map.global_ord(segment, term as u64) as usize] += 1;
                            term = dv.next_ord();
                        }
                        self.tot_count += 1;
                    });
                }
            } else {
                // Dense hits: count in segment-ordinal space first, then
                // migrate the non-zero slots
                let mut seg_counts = vec![0i32; num_seg_ords as usize];
                if single_valued {
                    for_each_doc(&mut seg_values, hits, live_docs, |dv| {
                        seg_counts[dv.ord_value() as usize] += 1;
                        self.tot_count += 1;
                    });
                } else {
                    for_each_doc(&mut seg_values, hits, live_docs, |dv| {
                        let mut term = dv.next_ord();
                        while term != NO_MORE_ORDS {
                            seg_counts[term as usize] += 1;
                            term = dv.next_ord();
                        }
                        self.tot_count += 1;
                    });
                }
                for (ord, &count) in seg_counts.iter().enumerate() {
                    if count != 0 {
                        self.counts[map.global_ord(segment, ord as u64) as usize] += count;
                    }
                }
            }
        } else {
            // Single segment (or single matching segment): segment ordinals
            // are already global
            if single_valued {
                for_each_doc(&mut seg_values, hits, live_docs, |dv| {
                    self.counts[dv.ord_value() as usize] += 1;
                    self.tot_count += 1;
                });
            } else {
                for_each_doc(&mut seg_values, hits, live_docs, |dv| {
                    let mut term = dv.next_ord();
                    while term != NO_MORE_ORDS {
                        self.counts[term as usize] += 1;
                        term = dv.next_ord();
                    }
                    self.tot_count += 1;
                });
            }
        }
        Ok(())
    }

    fn get_flat_dim(
        &self,
        dim: &str,
        range: OrdRange,
        top_n: usize,
    ) -> Result<Option<FacetResult>> {
        let mut q = TopOrdAndIntQueue::new(top_n);
        let mut bottom_count = 0;
        let mut dim_count = 0i64;
        let mut child_count = 0;

        for ord in range.iter() {
            let count = self.counts[ord as usize];
            if count > 0 {
                dim_count += count as i64;
                child_count += 1;
                if count > bottom_count {
                    q.insert_with_overflow(OrdAndValue { ord, value: count });
                    if q.len() == top_n {
                        bottom_count = q.top().expect("non-empty queue").value;
                    }
                }
            }
        }

        if child_count == 0 {
            return Ok(None);
        }

        let label_values = self.drain_queue(q)?;
        Ok(Some(FacetResult {
            dim: dim.to_string(),
            path: Vec::new(),
            value: dim_count,
            label_values,
            child_count,
        }))
    }

    fn get_hierarchical_dim(
        &self,
        dim: &str,
        path: &[&str],
        path_ord: u32,
        top_n: usize,
    ) -> Result<Option<FacetResult>> {
        let mut q = TopOrdAndIntQueue::new(top_n);
        let mut bottom_count = 0;
        let mut child_count = 0;

        for ord in self.state.child_ords(path_ord)? {
            let count = self.counts[ord as usize];
            if count > 0 {
                child_count += 1;
                if count > bottom_count {
                    q.insert_with_overflow(OrdAndValue { ord, value: count });
                    if q.len() == top_n {
                        bottom_count = q.top().expect("non-empty queue").value;
                    }
                }
            }
        }

        if q.is_empty() {
            return Ok(None);
        }

        let label_values = self.drain_queue(q)?;
        Ok(Some(FacetResult {
            dim: dim.to_string(),
            path: path.iter().map(|p| p.to_string()).collect(),
            value: self.counts[path_ord as usize] as i64,
            label_values,
            child_count,
        }))
    }

    /// Pop ascending, fill descending: best count first, ties by label.
    fn drain_queue(&self, mut q: TopOrdAndIntQueue) -> Result<Vec<LabelAndValue>> {
        let mut label_values = Vec::with_capacity(q.len());
        while let Some(OrdAndValue { ord, value }) = q.pop() {
            let term = self.dv.lookup_ord(ord as u64)?;
            let label = String::from_utf8(term)
                .map_err(|_| Error::Corruption(format!("non-UTF-8 label at ord {ord}")))?;
            let parts = string_to_path(&label);
            label_values.push(LabelAndValue::new(
                parts.last().cloned().unwrap_or_default(),
                value as i64,
            ));
        }
        label_values.reverse();
        Ok(label_values)
    }
}

impl Facets for SortedSetFacetCounts<'_> {
    fn get_top_children(
        &self,
        top_n: usize,
        dim: &str,
        path: &[&str],
    ) -> Result<Option<FacetResult>> {
        validate_top_n(top_n)?;

        if self.state.is_hierarchical() {
            let path_ord = self
                .dv
                .lookup_term(path_to_string(dim, path).as_bytes())?;
            if path_ord < 0 {
                // Never indexed
                return Ok(None);
            }
            self.get_hierarchical_dim(dim, path, path_ord as u32, top_n)
        } else {
            if !path.is_empty() {
                return Err(Error::invalid_argument(
                    "path should be 0 length for flat facets",
                ));
            }
            let Some(range) = self.state.get_ord_range(dim)? else {
                return Ok(None);
            };
            self.get_flat_dim(dim, range, top_n)
        }
    }

    fn get_specific_value(&self, dim: &str, path: &[&str]) -> Result<i64> {
        if !self.state.is_hierarchical() && path.len() != 1 {
            return Err(Error::invalid_argument("path must be length=1"));
        }
        let ord = self
            .dv
            .lookup_term(path_to_string(dim, path).as_bytes())?;
        if ord < 0 {
            return Ok(-1);
        }
        Ok(self.counts[ord as usize] as i64)
    }

    fn get_all_dims(&self, top_n: usize) -> Result<Vec<FacetResult>> {
        validate_top_n(top_n)?;
        let mut results = Vec::new();
        if self.state.is_hierarchical() {
            for dim_and_ord in self.state.get_dims()? {
                if let Some(result) =
                    self.get_hierarchical_dim(&dim_and_ord.dim, &[], dim_and_ord.ord, top_n)?
                {
                    results.push(result);
                }
            }
        } else {
            for (dim, range) in self.state.prefix_to_ord_range()? {
                if let Some(result) = self.get_flat_dim(dim, *range, top_n)? {
                    results.push(result);
                }
            }
        }
        sort_all_dims(&mut results);
        Ok(results)
    }
}

/// Visit every doc that both matches and carries a value: leapfrog the hit
/// bitset against the values cursor, or walk the cursor directly (skipping
/// deleted docs) when counting everything.
fn for_each_doc(
    seg_values: &mut Box<dyn SortedSetDocValues>,
    hits: Option<&MatchingDocs>,
    live_docs: Option<&FixedBitSet>,
    mut visit: impl FnMut(&mut dyn SortedSetDocValues),
) {
    match hits {
        Some(hits) => {
            let mut it = hits.bits.iter();
            let mut doc = it.doc();
            while doc != TERMINATED {
                let with_value = seg_values.seek(doc);
                if with_value == TERMINATED {
                    break;
                }
                if with_value == doc {
                    visit(seg_values.as_mut());
                    doc = it.advance();
                } else {
                    doc = it.seek(with_value);
                }
            }
        }
        None => {
            let mut doc = seg_values.doc();
            while doc != TERMINATED {
                if live_docs.is_none_or(|live| live.get(doc)) {
                    visit(seg_values.as_mut());
                }
                doc = seg_values.advance();
            }
        }
    }
}
