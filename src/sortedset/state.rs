//! Per-reader ordinal state for sorted-set faceting.
//!
//! Construction makes a single forward scan over the field's term dictionary
//! and derives either the flat `dim -> ord range` map or the hierarchical
//! ordinal tree (`has_children` bits, `siblings` links, root dims). The
//! state is immutable afterwards and safe to share across queries; the
//! cross-segment ordinal map is built lazily on the first doc-values request
//! and cached under a lock.

use std::sync::Arc;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use crate::bitset::FixedBitSet;
use crate::docvalues::{
    EmptySortedSetDocValues, MultiSortedSetDocValues, OrdinalMap, SortedSetDocValues,
};
use crate::error::{Error, Result};
use crate::facets::path::string_to_path;
use crate::index::IndexReader;
use crate::DocId;

/// Marks a missing sibling link.
pub const INVALID_ORDINAL: i32 = -1;

// ── Flat layout ──────────────────────────────────────────────────────────

/// Start/end ordinal range of one flat dimension. Both ends inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrdRange {
    pub start: u32,
    pub end: u32,
}

impl OrdRange {
    /// Iterate the ordinals of this range in ascending order.
    pub fn iter(self) -> impl Iterator<Item = u32> {
        self.start..=self.end
    }
}

// ── Hierarchical layout ──────────────────────────────────────────────────

/// A root dimension and the ordinal of its own label.
#[derive(Debug, Clone)]
pub struct DimAndOrd {
    pub dim: String,
    pub ord: u32,
}

/// Stack entry for an ordinal whose sibling link is still unresolved.
struct OrdAndComponents {
    ord: u32,
    components: Vec<String>,
}

// ── Reader state ─────────────────────────────────────────────────────────

/// Immutable per-reader facet state for one sorted-set field.
pub struct SortedSetReaderState {
    reader: Arc<IndexReader>,
    field: String,
    value_count: u32,
    hierarchical: bool,

    // Hierarchical: ord i's first child (if any) is ord i+1
    has_children: Option<FixedBitSet>,
    siblings: Vec<i32>,
    dims: Vec<DimAndOrd>,

    // Flat
    prefix_to_ord_range: FxHashMap<String, OrdRange>,

    cached_ord_maps: Mutex<FxHashMap<String, Arc<OrdinalMap>>>,
}

impl SortedSetReaderState {
    /// Build state for `field`, scanning its dictionary once. `hierarchical`
    /// selects the taxonomy layout the field was indexed with.
    pub fn new(reader: Arc<IndexReader>, field: &str, hierarchical: bool) -> Result<Self> {
        let mut state = Self {
            reader,
            field: field.to_string(),
            value_count: 0,
            hierarchical,
            has_children: None,
            siblings: Vec::new(),
            dims: Vec::new(),
            prefix_to_ord_range: FxHashMap::default(),
            cached_ord_maps: Mutex::new(FxHashMap::default()),
        };

        let dv = state.get_doc_values()?;
        if dv.get_value_count() > i32::MAX as u64 {
            return Err(Error::invalid_argument(format!(
                "can only handle valueCount < i32::MAX; got {}",
                dv.get_value_count()
            )));
        }
        state.value_count = dv.get_value_count() as u32;

        if hierarchical {
            state.has_children = Some(FixedBitSet::new(state.value_count));
            state.siblings = vec![0; state.value_count as usize];
            state.create_hierarchical_state(dv.as_ref())?;
        } else {
            state.create_flat_state(dv.as_ref())?;
        }

        log::debug!(
            "built sorted-set facet state: field={} values={} hierarchical={}",
            state.field,
            state.value_count,
            state.hierarchical
        );
        Ok(state)
    }

    fn create_hierarchical_state(&mut self, dv: &dyn SortedSetDocValues) -> Result<()> {
        // Ordinals whose sibling links cannot be resolved until a later
        // ordinal leaves their subtree
        let mut sibling_stack: Vec<OrdAndComponents> = Vec::new();
        let mut next_components: Option<Vec<String>> = None;

        for ord in 0..self.value_count {
            let components = match next_components.take() {
                Some(components) => components,
                None => self.parse_label(dv, ord)?,
            };

            if components.len() == 1 {
                self.dims.push(DimAndOrd {
                    dim: components[0].clone(),
                    ord,
                });
            }

            while let Some(top) = sibling_stack.last()
                && top.components.len() >= components.len()
            {
                let popped = sibling_stack.pop().expect("peeked entry");
                let sibling = if popped.components.len() > components.len() {
                    INVALID_ORDINAL
                } else {
                    // Equal depth: siblings iff the parent prefixes match
                    let depth = popped.components.len();
                    if popped.components[..depth - 1] == components[..depth - 1] {
                        ord as i32
                    } else {
                        INVALID_ORDINAL
                    }
                };
                self.siblings[popped.ord as usize] = sibling;
            }

            if ord + 1 == self.value_count {
                // Last ordinal cannot have children or further siblings
                self.siblings[ord as usize] = INVALID_ORDINAL;
                break;
            }

            let upcoming = self.parse_label(dv, ord + 1)?;
            if components.len() < upcoming.len() {
                // All ancestral paths are indexed, so the next ordinal must
                // be a direct child of this one
                self.has_children
                    .as_mut()
                    .expect("hierarchical state")
                    .set(ord);
                sibling_stack.push(OrdAndComponents { ord, components });
            } else if components.len() == upcoming.len() {
                // Same depth next means no descendants exist for this ord
                self.siblings[ord as usize] = ord as i32 + 1;
            } else {
                self.siblings[ord as usize] = INVALID_ORDINAL;
            }
            next_components = Some(upcoming);
        }

        for entry in sibling_stack {
            self.siblings[entry.ord as usize] = INVALID_ORDINAL;
        }
        Ok(())
    }

    fn create_flat_state(&mut self, dv: &dyn SortedSetDocValues) -> Result<()> {
        let mut last_dim: Option<String> = None;
        let mut start_ord = 0;

        for ord in 0..self.value_count {
            let components = self.parse_label(dv, ord)?;
            if components.len() != 2 {
                return Err(Error::invalid_argument(format!(
                    "dimension not configured to handle hierarchical field; got: {components:?}"
                )));
            }
            if last_dim.as_deref() != Some(components[0].as_str()) {
                if let Some(dim) = last_dim.take() {
                    self.prefix_to_ord_range.insert(
                        dim,
                        OrdRange {
                            start: start_ord,
                            end: ord - 1,
                        },
                    );
                }
                start_ord = ord;
                last_dim = Some(components[0].clone());
            }
        }

        if let Some(dim) = last_dim {
            self.prefix_to_ord_range.insert(
                dim,
                OrdRange {
                    start: start_ord,
                    end: self.value_count - 1,
                },
            );
        }
        Ok(())
    }

    fn parse_label(&self, dv: &dyn SortedSetDocValues, ord: u32) -> Result<Vec<String>> {
        let term = dv.lookup_ord(ord as u64)?;
        let label = String::from_utf8(term)
            .map_err(|_| Error::Corruption(format!("non-UTF-8 label at ord {ord}")))?;
        Ok(string_to_path(&label))
    }

    /// Reader-wide doc values for the facet field.
    ///
    /// Multi-segment readers get a view carrying the global ordinal map; the
    /// map is built on first use and cached while the reader is unchanged.
    pub fn get_doc_values(&self) -> Result<Box<dyn SortedSetDocValues>> {
        let leaves = self.reader.leaves();
        if leaves.is_empty() {
            return Ok(Box::new(EmptySortedSetDocValues));
        }
        if leaves.len() == 1 {
            return match leaves[0].reader.sorted_set_doc_values(&self.field)? {
                Some(dv) => Ok(dv),
                None => Err(Error::FieldNotFound(format!(
                    "field \"{}\" was not indexed with sorted-set doc values",
                    self.field
                ))),
            };
        }

        let values = self.open_segment_values()?;
        let mut doc_starts: Vec<DocId> = leaves.iter().map(|ctx| ctx.doc_base).collect();
        doc_starts.push(self.reader.max_doc());

        let map = {
            let mut cache = self.cached_ord_maps.lock();
            match cache.get(&self.field) {
                Some(map) if map.owner == self.reader.cache_key() => map.clone(),
                _ => {
                    let map = Arc::new(OrdinalMap::build(self.reader.cache_key(), &values)?);
                    cache.insert(self.field.clone(), map.clone());
                    map
                }
            }
        };

        Ok(Box::new(MultiSortedSetDocValues::new(
            values, doc_starts, map,
        )))
    }

    /// The global ordinal map, or `None` for single-segment readers where
    /// segment ordinals are already global.
    pub fn ordinal_map(&self) -> Result<Option<Arc<OrdinalMap>>> {
        if self.reader.leaves().len() < 2 {
            return Ok(None);
        }
        {
            let cache = self.cached_ord_maps.lock();
            if let Some(map) = cache.get(&self.field)
                && map.owner == self.reader.cache_key()
            {
                return Ok(Some(map.clone()));
            }
        }
        let values = self.open_segment_values()?;
        let map = Arc::new(OrdinalMap::build(self.reader.cache_key(), &values)?);
        self.cached_ord_maps
            .lock()
            .insert(self.field.clone(), map.clone());
        Ok(Some(map))
    }

    fn open_segment_values(&self) -> Result<Vec<Box<dyn SortedSetDocValues>>> {
        let mut values: Vec<Box<dyn SortedSetDocValues>> = Vec::new();
        let mut any = false;
        for context in self.reader.leaves() {
            match context.reader.sorted_set_doc_values(&self.field)? {
                Some(dv) => {
                    any = true;
                    values.push(dv);
                }
                None => values.push(Box::new(EmptySortedSetDocValues)),
            }
        }
        if !any {
            return Err(Error::FieldNotFound(format!(
                "field \"{}\" was not indexed with sorted-set doc values",
                self.field
            )));
        }
        Ok(values)
    }

    // ── Accessors ────────────────────────────────────────────────────────

    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn reader(&self) -> &Arc<IndexReader> {
        &self.reader
    }

    /// Number of unique labels in the dictionary.
    pub fn size(&self) -> u32 {
        self.value_count
    }

    pub fn is_hierarchical(&self) -> bool {
        self.hierarchical
    }

    // ── Flat facet operations ────────────────────────────────────────────

    /// The ordinal range of a flat dimension, or `None` if never indexed.
    pub fn get_ord_range(&self, dim: &str) -> Result<Option<OrdRange>> {
        if self.hierarchical {
            return Err(Error::Unsupported(
                "this operation is only supported for flat facets".to_string(),
            ));
        }
        Ok(self.prefix_to_ord_range.get(dim).copied())
    }

    /// Mapping from dimension to its ordinal range.
    pub fn prefix_to_ord_range(&self) -> Result<&FxHashMap<String, OrdRange>> {
        if self.hierarchical {
            return Err(Error::Unsupported(
                "this operation is only supported for flat facets".to_string(),
            ));
        }
        Ok(&self.prefix_to_ord_range)
    }

    // ── Hierarchical facet operations ────────────────────────────────────

    /// Iterate the direct children of `path_ord`.
    pub fn child_ords(&self, path_ord: u32) -> Result<ChildOrds<'_>> {
        if !self.hierarchical {
            return Err(Error::Unsupported(
                "this operation is only supported for hierarchical facets".to_string(),
            ));
        }
        Ok(ChildOrds {
            state: self,
            current: path_ord as i64,
            at_start: true,
        })
    }

    /// The root dimensions in dictionary order.
    pub fn get_dims(&self) -> Result<&[DimAndOrd]> {
        if !self.hierarchical {
            return Err(Error::Unsupported(
                "this operation is only supported for hierarchical facets".to_string(),
            ));
        }
        Ok(&self.dims)
    }
}

/// Iterator over the direct children of one ordinal: the first child is
/// `ord + 1` when present, the rest follow sibling links.
pub struct ChildOrds<'a> {
    state: &'a SortedSetReaderState,
    current: i64,
    at_start: bool,
}

impl Iterator for ChildOrds<'_> {
    type Item = u32;

    fn next(&mut self) -> Option<u32> {
        let has_children = self.state.has_children.as_ref().expect("hierarchical state");
        if self.at_start {
            self.at_start = false;
            if self.current < 0 || self.current >= self.state.value_count as i64 {
                return None;
            }
            if has_children.get(self.current as u32) {
                self.current += 1;
                return Some(self.current as u32);
            }
            return None;
        }
        let sibling = self.state.siblings[self.current as usize];
        if sibling == INVALID_ORDINAL {
            return None;
        }
        self.current = sibling as i64;
        Some(sibling as u32)
    }
}
