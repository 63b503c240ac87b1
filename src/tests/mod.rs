//! End-to-end scenarios over the in-memory reader.

mod sortedset;

use std::sync::Arc;

use crate::bitset::FixedBitSet;
use crate::facets::path::path_to_string;
use crate::facets::{FacetsCollector, MatchingDocs};
use crate::index::{IndexReader, RamDocument, RamSegmentBuilder};

pub(crate) const FACET_FIELD: &str = "$facets";

/// A doc carrying one flat `dim/value` label.
pub(crate) fn flat_doc(dim: &str, value: &str) -> RamDocument {
    let mut doc = RamDocument::new();
    doc.add_sorted_set(FACET_FIELD, path_to_string(dim, &[value]));
    doc
}

/// A doc carrying a hierarchical label plus all its ancestral prefixes.
pub(crate) fn hierarchical_doc(path: &[&str]) -> RamDocument {
    let mut doc = RamDocument::new();
    for depth in 1..=path.len() {
        doc.add_sorted_set(FACET_FIELD, path_to_string(path[0], &path[1..depth]));
    }
    doc
}

pub(crate) fn single_segment_reader(docs: Vec<RamDocument>) -> Arc<IndexReader> {
    let mut builder = RamSegmentBuilder::default();
    for doc in docs {
        builder.add_document(doc);
    }
    IndexReader::new(vec![builder.build()])
}

/// A collector holding exactly the given parent-wide doc IDs as hits.
pub(crate) fn collector_with_docs(reader: &IndexReader, docs: &[u32]) -> FacetsCollector {
    let mut collector = FacetsCollector::new();
    for context in reader.leaves() {
        let max_doc = context.reader.max_doc();
        let mut bits = FixedBitSet::new(max_doc);
        for &doc in docs {
            if doc >= context.doc_base && doc < context.doc_base + max_doc {
                bits.set(doc - context.doc_base);
            }
        }
        collector.add(MatchingDocs::new(context.clone(), bits));
    }
    collector
}
