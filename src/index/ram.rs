//! In-memory segments for tests and small indexes.
//!
//! The RAM reader is the doc-values analog of an in-memory directory: a
//! builder accumulates documents, `build()` freezes them into immutable
//! columns (sorted term dictionary + per-doc ordinals for sorted-set fields,
//! raw payloads for binary fields) shared via `Arc` with every cursor.

use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::bitset::FixedBitSet;
use crate::docset::{DocSet, TERMINATED};
use crate::docvalues::{BinaryDocValues, SortedSetDocValues, NO_MORE_ORDS};
use crate::error::{Error, Result};
use crate::DocId;

use super::LeafReader;

// ── Documents ────────────────────────────────────────────────────────────

/// A document under construction: field values to be frozen into columns.
#[derive(Debug, Clone, Default)]
pub struct RamDocument {
    sorted_set: Vec<(String, Vec<u8>)>,
    binary: Vec<(String, Vec<u8>)>,
}

impl RamDocument {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one term to a sorted-set field. May be called repeatedly per field.
    pub fn add_sorted_set(&mut self, field: &str, term: impl Into<Vec<u8>>) -> &mut Self {
        self.sorted_set.push((field.to_string(), term.into()));
        self
    }

    /// Set a binary field payload.
    pub fn add_binary(&mut self, field: &str, payload: Vec<u8>) -> &mut Self {
        self.binary.push((field.to_string(), payload));
        self
    }
}

// ── Builder ──────────────────────────────────────────────────────────────

/// Accumulates documents and freezes them into a [`RamLeafReader`].
#[derive(Debug, Default)]
pub struct RamSegmentBuilder {
    docs: Vec<RamDocument>,
    deleted: Vec<DocId>,
}

impl RamSegmentBuilder {
    pub fn add_document(&mut self, doc: RamDocument) -> DocId {
        self.docs.push(doc);
        self.docs.len() as DocId - 1
    }

    /// Mark a doc as deleted; it stays in the segment but off the live set.
    pub fn delete_document(&mut self, doc: DocId) {
        self.deleted.push(doc);
    }

    pub fn build(self) -> Arc<RamLeafReader> {
        let max_doc = self.docs.len() as u32;

        // Group values per field
        let mut sorted_set_raw: FxHashMap<String, Vec<(DocId, Vec<u8>)>> = FxHashMap::default();
        let mut binary_raw: FxHashMap<String, Vec<(DocId, Vec<u8>)>> = FxHashMap::default();
        for (doc_id, doc) in self.docs.into_iter().enumerate() {
            for (field, term) in doc.sorted_set {
                sorted_set_raw
                    .entry(field)
                    .or_default()
                    .push((doc_id as DocId, term));
            }
            for (field, payload) in doc.binary {
                binary_raw
                    .entry(field)
                    .or_default()
                    .push((doc_id as DocId, payload));
            }
        }

        let sorted_set = sorted_set_raw
            .into_iter()
            .map(|(field, values)| (field, Arc::new(SortedSetColumn::build(values))))
            .collect();
        let binary = binary_raw
            .into_iter()
            .map(|(field, values)| (field, Arc::new(BinaryColumn::build(values))))
            .collect();

        let live_docs = if self.deleted.is_empty() {
            None
        } else {
            let mut bits = FixedBitSet::new(max_doc);
            for doc in 0..max_doc {
                bits.set(doc);
            }
            for doc in self.deleted {
                bits.clear(doc);
            }
            Some(bits)
        };

        Arc::new(RamLeafReader {
            max_doc,
            live_docs,
            sorted_set,
            binary,
        })
    }
}

// ── Columns ──────────────────────────────────────────────────────────────

#[derive(Debug)]
struct SortedSetColumn {
    /// Sorted dictionary of distinct terms.
    terms: Vec<Vec<u8>>,
    /// Doc IDs carrying at least one term, ascending.
    docs: Vec<DocId>,
    /// Ascending ordinals per doc, parallel to `docs`.
    per_doc: Vec<Vec<u64>>,
    single_valued: bool,
}

impl SortedSetColumn {
    fn build(mut values: Vec<(DocId, Vec<u8>)>) -> Self {
        let mut terms: Vec<Vec<u8>> = values.iter().map(|(_, t)| t.clone()).collect();
        terms.sort_unstable();
        terms.dedup();

        values.sort_by(|a, b| a.0.cmp(&b.0));
        let mut docs = Vec::new();
        let mut per_doc: Vec<Vec<u64>> = Vec::new();
        for (doc, term) in values {
            let ord = terms.binary_search(&term).unwrap() as u64;
            if docs.last() == Some(&doc) {
                let ords = per_doc.last_mut().unwrap();
                if !ords.contains(&ord) {
                    ords.push(ord);
                }
            } else {
                docs.push(doc);
                per_doc.push(vec![ord]);
            }
        }
        for ords in &mut per_doc {
            ords.sort_unstable();
        }
        let single_valued = per_doc.iter().all(|ords| ords.len() == 1);

        Self {
            terms,
            docs,
            per_doc,
            single_valued,
        }
    }
}

#[derive(Debug)]
struct BinaryColumn {
    docs: Vec<DocId>,
    payloads: Vec<Vec<u8>>,
}

impl BinaryColumn {
    fn build(mut values: Vec<(DocId, Vec<u8>)>) -> Self {
        values.sort_by(|a, b| a.0.cmp(&b.0));
        let (docs, payloads) = values.into_iter().unzip();
        Self { docs, payloads }
    }
}

// ── RamLeafReader ────────────────────────────────────────────────────────

/// Immutable in-memory segment.
#[derive(Debug)]
pub struct RamLeafReader {
    max_doc: u32,
    live_docs: Option<FixedBitSet>,
    sorted_set: FxHashMap<String, Arc<SortedSetColumn>>,
    binary: FxHashMap<String, Arc<BinaryColumn>>,
}

impl LeafReader for RamLeafReader {
    fn max_doc(&self) -> u32 {
        self.max_doc
    }

    fn live_docs(&self) -> Option<&FixedBitSet> {
        self.live_docs.as_ref()
    }

    fn sorted_set_doc_values(
        &self,
        field: &str,
    ) -> Result<Option<Box<dyn SortedSetDocValues>>> {
        match self.sorted_set.get(field) {
            Some(column) => Ok(Some(Box::new(RamSortedSetDocValues::new(column.clone())))),
            None if self.binary.contains_key(field) => Err(Error::InvalidFieldType {
                expected: "sorted-set doc values".to_string(),
                got: "binary doc values".to_string(),
            }),
            None => Ok(None),
        }
    }

    fn binary_doc_values(&self, field: &str) -> Result<Option<Box<dyn BinaryDocValues>>> {
        match self.binary.get(field) {
            Some(column) => Ok(Some(Box::new(RamBinaryDocValues::new(column.clone())))),
            None if self.sorted_set.contains_key(field) => Err(Error::InvalidFieldType {
                expected: "binary doc values".to_string(),
                got: "sorted-set doc values".to_string(),
            }),
            None => Ok(None),
        }
    }
}

// ── Cursors ──────────────────────────────────────────────────────────────

struct RamSortedSetDocValues {
    column: Arc<SortedSetColumn>,
    /// Position in `column.docs`.
    pos: usize,
    /// Next ordinal index within the current doc.
    ord_idx: usize,
}

impl RamSortedSetDocValues {
    fn new(column: Arc<SortedSetColumn>) -> Self {
        Self {
            column,
            pos: 0,
            ord_idx: 0,
        }
    }
}

impl DocSet for RamSortedSetDocValues {
    #[inline]
    fn doc(&self) -> DocId {
        self.column.docs.get(self.pos).copied().unwrap_or(TERMINATED)
    }

    fn advance(&mut self) -> DocId {
        if self.pos < self.column.docs.len() {
            self.pos += 1;
        }
        self.ord_idx = 0;
        self.doc()
    }

    fn seek(&mut self, target: DocId) -> DocId {
        if self.pos >= self.column.docs.len() {
            return TERMINATED;
        }
        let remaining = &self.column.docs[self.pos..];
        let offset = match remaining.binary_search(&target) {
            Ok(offset) => offset,
            Err(offset) => offset,
        };
        if offset > 0 {
            self.pos += offset;
            self.ord_idx = 0;
        }
        self.doc()
    }

    fn size_hint(&self) -> u32 {
        self.column.docs.len().saturating_sub(self.pos) as u32
    }
}

impl SortedSetDocValues for RamSortedSetDocValues {
    fn get_value_count(&self) -> u64 {
        self.column.terms.len() as u64
    }

    fn lookup_ord(&self, ord: u64) -> Result<Vec<u8>> {
        self.column
            .terms
            .get(ord as usize)
            .cloned()
            .ok_or_else(|| Error::invalid_argument(format!("ordinal out of range: {ord}")))
    }

    fn lookup_term(&self, key: &[u8]) -> Result<i64> {
        Ok(match self.column.terms.binary_search_by(|t| t.as_slice().cmp(key)) {
            Ok(ord) => ord as i64,
            Err(insertion) => -(insertion as i64) - 1,
        })
    }

    fn next_ord(&mut self) -> i64 {
        let ords = match self.column.per_doc.get(self.pos) {
            Some(ords) => ords,
            None => return NO_MORE_ORDS,
        };
        if self.ord_idx >= ords.len() {
            return NO_MORE_ORDS;
        }
        let ord = ords[self.ord_idx];
        self.ord_idx += 1;
        ord as i64
    }

    fn is_single_valued(&self) -> bool {
        self.column.single_valued
    }

    fn ord_value(&self) -> u64 {
        self.column.per_doc[self.pos][0]
    }
}

struct RamBinaryDocValues {
    column: Arc<BinaryColumn>,
    pos: usize,
}

impl RamBinaryDocValues {
    fn new(column: Arc<BinaryColumn>) -> Self {
        Self { column, pos: 0 }
    }
}

impl DocSet for RamBinaryDocValues {
    #[inline]
    fn doc(&self) -> DocId {
        self.column.docs.get(self.pos).copied().unwrap_or(TERMINATED)
    }

    fn advance(&mut self) -> DocId {
        if self.pos < self.column.docs.len() {
            self.pos += 1;
        }
        self.doc()
    }

    fn seek(&mut self, target: DocId) -> DocId {
        if self.pos >= self.column.docs.len() {
            return TERMINATED;
        }
        let remaining = &self.column.docs[self.pos..];
        self.pos += match remaining.binary_search(&target) {
            Ok(offset) => offset,
            Err(offset) => offset,
        };
        self.doc()
    }

    fn size_hint(&self) -> u32 {
        self.column.docs.len().saturating_sub(self.pos) as u32
    }
}

impl BinaryDocValues for RamBinaryDocValues {
    fn binary_value(&self) -> &[u8] {
        &self.column.payloads[self.pos]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::IndexReader;

    #[test]
    fn test_sorted_set_column_ordinals_follow_term_order() {
        let mut builder = RamSegmentBuilder::default();
        let mut doc = RamDocument::new();
        doc.add_sorted_set("f", "b").add_sorted_set("f", "a");
        builder.add_document(doc);
        let mut doc = RamDocument::new();
        doc.add_sorted_set("f", "c");
        builder.add_document(doc);

        let reader = builder.build();
        let mut dv = reader.sorted_set_doc_values("f").unwrap().unwrap();
        assert_eq!(dv.get_value_count(), 3);
        assert_eq!(dv.lookup_ord(0).unwrap(), b"a");
        assert_eq!(dv.lookup_ord(2).unwrap(), b"c");
        assert_eq!(dv.lookup_term(b"b").unwrap(), 1);
        assert_eq!(dv.lookup_term(b"bb").unwrap(), -3); // between b and c

        // doc 0 has ords {0, 1}, doc 1 has {2}
        assert_eq!(dv.doc(), 0);
        assert_eq!(dv.next_ord(), 0);
        assert_eq!(dv.next_ord(), 1);
        assert_eq!(dv.next_ord(), NO_MORE_ORDS);
        assert_eq!(dv.advance(), 1);
        assert_eq!(dv.next_ord(), 2);
        assert_eq!(dv.next_ord(), NO_MORE_ORDS);
        assert!(!dv.is_single_valued());
    }

    #[test]
    fn test_missing_field_and_type_mismatch() {
        let mut builder = RamSegmentBuilder::default();
        let mut doc = RamDocument::new();
        doc.add_binary("payload", vec![1, 2, 3]);
        builder.add_document(doc);
        let reader = builder.build();

        assert!(reader.sorted_set_doc_values("absent").unwrap().is_none());
        assert!(matches!(
            reader.sorted_set_doc_values("payload"),
            Err(Error::InvalidFieldType { .. })
        ));
    }

    #[test]
    fn test_binary_cursor_skips_docs_without_value() {
        let mut builder = RamSegmentBuilder::default();
        builder.add_document(RamDocument::new());
        let mut doc = RamDocument::new();
        doc.add_binary("b", vec![7]);
        builder.add_document(doc);
        builder.add_document(RamDocument::new());

        let reader = builder.build();
        let mut dv = reader.binary_doc_values("b").unwrap().unwrap();
        assert_eq!(dv.doc(), 1);
        assert_eq!(dv.binary_value(), &[7]);
        assert_eq!(dv.advance(), TERMINATED);
    }

    #[test]
    fn test_live_docs() {
        let mut builder = RamSegmentBuilder::default();
        builder.add_document(RamDocument::new());
        builder.add_document(RamDocument::new());
        builder.delete_document(0);
        let segment = builder.build();
        let reader = IndexReader::new(vec![segment]);

        let live = reader.leaves()[0].reader.live_docs().unwrap();
        assert!(!live.get(0));
        assert!(live.get(1));
    }
}
