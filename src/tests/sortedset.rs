use std::collections::BTreeMap;
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::Error;
use crate::facets::{Facets, FacetsCollector, LabelAndValue};
use crate::index::{IndexReader, LeafReader, RamDocument, RamSegmentBuilder};
use crate::sortedset::{SortedSetFacetCounts, SortedSetReaderState};

use super::{collector_with_docs, flat_doc, hierarchical_doc, single_segment_reader, FACET_FIELD};

#[test]
fn test_flat_counts_basic() {
    let reader = single_segment_reader(vec![
        flat_doc("A", "x"),
        flat_doc("A", "y"),
        flat_doc("A", "x"),
    ]);
    let state = SortedSetReaderState::new(reader.clone(), FACET_FIELD, false).unwrap();
    let hits = FacetsCollector::match_all(&reader);
    let facets = SortedSetFacetCounts::new(&state, Some(&hits)).unwrap();

    let result = facets.get_top_children(10, "A", &[]).unwrap().unwrap();
    assert_eq!(result.value, 3);
    assert_eq!(result.child_count, 2);
    assert_eq!(
        result.label_values,
        vec![LabelAndValue::new("x", 2), LabelAndValue::new("y", 1)]
    );

    assert_eq!(facets.get_specific_value("A", &["x"]).unwrap(), 2);
    assert_eq!(facets.get_specific_value("A", &["missing"]).unwrap(), -1);
    assert_eq!(facets.total_count(), 3);
}

#[test]
fn test_hierarchical_counts_basic() {
    let reader = single_segment_reader(vec![
        hierarchical_doc(&["a"]),
        hierarchical_doc(&["a", "b"]),
        hierarchical_doc(&["a", "b", "c"]),
        hierarchical_doc(&["a", "d"]),
    ]);
    let state = SortedSetReaderState::new(reader.clone(), FACET_FIELD, true).unwrap();
    let hits = FacetsCollector::match_all(&reader);
    let facets = SortedSetFacetCounts::new(&state, Some(&hits)).unwrap();

    let result = facets.get_top_children(10, "a", &[]).unwrap().unwrap();
    assert_eq!(result.value, 4);
    assert_eq!(
        result.label_values,
        vec![LabelAndValue::new("b", 2), LabelAndValue::new("d", 1)]
    );

    let result = facets.get_top_children(10, "a", &["b"]).unwrap().unwrap();
    assert_eq!(result.value, 2);
    assert_eq!(result.label_values, vec![LabelAndValue::new("c", 1)]);

    // Never indexed path
    assert!(facets.get_top_children(10, "a", &["z"]).unwrap().is_none());
}

#[test]
fn test_hierarchy_closure_invariant() {
    let reader = single_segment_reader(vec![
        hierarchical_doc(&["a", "b", "c"]),
        hierarchical_doc(&["a", "b", "d"]),
        hierarchical_doc(&["a", "e"]),
        hierarchical_doc(&["f"]),
    ]);
    let state = SortedSetReaderState::new(reader.clone(), FACET_FIELD, true).unwrap();
    let hits = FacetsCollector::match_all(&reader);
    let facets = SortedSetFacetCounts::new(&state, Some(&hits)).unwrap();

    // Every parent count is at least the max of its children's counts
    fn check(state: &SortedSetReaderState, counts: &[i32], ord: u32) {
        for child in state.child_ords(ord).unwrap() {
            assert!(counts[ord as usize] >= counts[child as usize]);
            check(state, counts, child);
        }
    }
    let mut root_sum = 0i64;
    for dim in state.get_dims().unwrap() {
        check(&state, facets.counts(), dim.ord);
        root_sum += facets.counts()[dim.ord as usize] as i64;
    }

    // Conservation: root counts cover every contributing doc at least once
    assert!(root_sum >= facets.total_count() as i64);
    assert_eq!(facets.total_count(), 4);
}

#[test]
fn test_empty_hits_and_unknown_dim() {
    let reader = single_segment_reader(vec![flat_doc("A", "x")]);
    let state = SortedSetReaderState::new(reader.clone(), FACET_FIELD, false).unwrap();

    let empty = collector_with_docs(&reader, &[]);
    let facets = SortedSetFacetCounts::new(&state, Some(&empty)).unwrap();
    assert!(facets.get_top_children(10, "A", &[]).unwrap().is_none());
    assert!(facets.get_all_dims(10).unwrap().is_empty());
    assert_eq!(facets.total_count(), 0);

    let hits = FacetsCollector::match_all(&reader);
    let facets = SortedSetFacetCounts::new(&state, Some(&hits)).unwrap();
    assert!(facets.get_top_children(10, "B", &[]).unwrap().is_none());
}

#[test]
fn test_validation_errors() {
    let reader = single_segment_reader(vec![flat_doc("A", "x")]);
    let state = SortedSetReaderState::new(reader.clone(), FACET_FIELD, false).unwrap();
    let hits = FacetsCollector::match_all(&reader);
    let facets = SortedSetFacetCounts::new(&state, Some(&hits)).unwrap();

    assert!(matches!(
        facets.get_top_children(0, "A", &[]),
        Err(Error::InvalidArgument(_))
    ));
    // Deep paths are not addressable in the flat layout
    assert!(matches!(
        facets.get_top_children(10, "A", &["x"]),
        Err(Error::InvalidArgument(_))
    ));
    assert!(matches!(
        facets.get_specific_value("A", &[]),
        Err(Error::InvalidArgument(_))
    ));
}

#[test]
fn test_reader_mismatch_detected() {
    let reader = single_segment_reader(vec![flat_doc("A", "x")]);
    let other_reader = single_segment_reader(vec![flat_doc("A", "x")]);
    let state = SortedSetReaderState::new(reader, FACET_FIELD, false).unwrap();

    let foreign_hits = FacetsCollector::match_all(&other_reader);
    assert!(matches!(
        SortedSetFacetCounts::new(&state, Some(&foreign_hits)),
        Err(Error::ReaderMismatch)
    ));
}

#[test]
fn test_top_k_tie_break_is_label_ascending() {
    let reader = single_segment_reader(vec![
        flat_doc("A", "z"),
        flat_doc("A", "y"),
        flat_doc("A", "x"),
    ]);
    let state = SortedSetReaderState::new(reader.clone(), FACET_FIELD, false).unwrap();
    let hits = FacetsCollector::match_all(&reader);
    let facets = SortedSetFacetCounts::new(&state, Some(&hits)).unwrap();

    let result = facets.get_top_children(2, "A", &[]).unwrap().unwrap();
    assert_eq!(
        result.label_values,
        vec![LabelAndValue::new("x", 1), LabelAndValue::new("y", 1)]
    );
    // All three children exist even though only two are returned
    assert_eq!(result.child_count, 3);
}

#[test]
fn test_get_all_dims_sorted_by_value_then_dim() {
    let reader = single_segment_reader(vec![
        flat_doc("B", "x"),
        flat_doc("B", "y"),
        flat_doc("C", "z"),
        flat_doc("A", "w"),
    ]);
    let state = SortedSetReaderState::new(reader.clone(), FACET_FIELD, false).unwrap();
    let hits = FacetsCollector::match_all(&reader);
    let facets = SortedSetFacetCounts::new(&state, Some(&hits)).unwrap();

    let results = facets.get_all_dims(10).unwrap();
    let order: Vec<(&str, i64)> = results.iter().map(|r| (r.dim.as_str(), r.value)).collect();
    assert_eq!(order, vec![("B", 2), ("A", 1), ("C", 1)]);
}

#[test]
fn test_multi_valued_docs_count_every_dim_once() {
    let mut doc = RamDocument::new();
    doc.add_sorted_set(FACET_FIELD, crate::facets::path_to_string("A", &["x"]));
    doc.add_sorted_set(FACET_FIELD, crate::facets::path_to_string("B", &["y"]));
    let reader = single_segment_reader(vec![doc]);
    let state = SortedSetReaderState::new(reader.clone(), FACET_FIELD, false).unwrap();
    let hits = FacetsCollector::match_all(&reader);
    let facets = SortedSetFacetCounts::new(&state, Some(&hits)).unwrap();

    assert_eq!(facets.get_specific_value("A", &["x"]).unwrap(), 1);
    assert_eq!(facets.get_specific_value("B", &["y"]).unwrap(), 1);
    // One doc, two ordinals: counts sum past tot_count is fine
    assert_eq!(facets.total_count(), 1);
}

#[test]
fn test_browse_all_honours_deleted_docs() {
    let mut builder = RamSegmentBuilder::default();
    builder.add_document(flat_doc("A", "x"));
    builder.add_document(flat_doc("A", "x"));
    builder.add_document(flat_doc("A", "y"));
    builder.delete_document(1);
    let reader = IndexReader::new(vec![builder.build()]);

    let state = SortedSetReaderState::new(reader, FACET_FIELD, false).unwrap();
    let facets = SortedSetFacetCounts::new(&state, None).unwrap();

    let result = facets.get_top_children(10, "A", &[]).unwrap().unwrap();
    assert_eq!(result.value, 2);
    assert_eq!(
        result.label_values,
        vec![LabelAndValue::new("x", 1), LabelAndValue::new("y", 1)]
    );
}

// ── Multi-segment and strategy-equivalence coverage ──────────────────────

fn multi_segment_reader(segments: Vec<Vec<RamDocument>>) -> Arc<IndexReader> {
    let mut leaves: Vec<Arc<dyn LeafReader>> = Vec::new();
    for docs in segments {
        let mut builder = RamSegmentBuilder::default();
        for doc in docs {
            builder.add_document(doc);
        }
        leaves.push(builder.build());
    }
    IndexReader::new(leaves)
}

/// Recompute expected per-label counts by hand from the doc descriptions.
fn brute_force_counts(
    docs_per_segment: &[Vec<(&str, &str)>],
    matching: &[u32],
) -> BTreeMap<String, i64> {
    let mut expected = BTreeMap::new();
    let mut doc_id = 0u32;
    for segment in docs_per_segment {
        for labels in segment {
            if matching.contains(&doc_id) {
                *expected
                    .entry(format!("{}/{}", labels.0, labels.1))
                    .or_insert(0) += 1;
            }
            doc_id += 1;
        }
    }
    expected
}

fn assert_counts_match(
    facets: &SortedSetFacetCounts<'_>,
    expected: &BTreeMap<String, i64>,
) {
    for (label, &count) in expected {
        let (dim, value) = label.split_once('/').unwrap();
        assert_eq!(
            facets.get_specific_value(dim, &[value]).unwrap(),
            count,
            "count mismatch for {label}"
        );
    }
}

#[test]
fn test_multi_segment_dense_strategy_matches_brute_force() {
    // Dense: match-all hits trigger the seg-ord counting + migrate path
    let docs: Vec<Vec<(&str, &str)>> = vec![
        vec![("A", "x"), ("A", "y"), ("B", "z")],
        vec![("A", "x"), ("B", "z"), ("B", "w"), ("A", "q")],
    ];
    let reader = multi_segment_reader(
        docs.iter()
            .map(|segment| segment.iter().map(|&(d, v)| flat_doc(d, v)).collect())
            .collect(),
    );
    let state = SortedSetReaderState::new(reader.clone(), FACET_FIELD, false).unwrap();
    let hits = FacetsCollector::match_all(&reader);
    let facets = SortedSetFacetCounts::new(&state, Some(&hits)).unwrap();

    let all: Vec<u32> = (0..7).collect();
    assert_counts_match(&facets, &brute_force_counts(&docs, &all));
    assert_eq!(facets.total_count(), 7);
}

#[test]
fn test_multi_segment_sparse_strategy_matches_brute_force() {
    // Sparse: few hits against a large dictionary trigger the remap-as-you-go
    // path (total_hits < num_seg_ords / 10)
    let mut docs: Vec<Vec<(&str, &str)>> = vec![Vec::new(), Vec::new()];
    let values: Vec<String> = (0..200).map(|i| format!("v{i:03}")).collect();
    for (i, value) in values.iter().enumerate() {
        docs[i % 2].push(("A", value.as_str()));
    }
    let reader = multi_segment_reader(
        docs.iter()
            .map(|segment| segment.iter().map(|&(d, v)| flat_doc(d, v)).collect())
            .collect(),
    );
    let state = SortedSetReaderState::new(reader.clone(), FACET_FIELD, false).unwrap();

    let matching = vec![0, 5, 101, 199];
    let hits = collector_with_docs(&reader, &matching);
    let facets = SortedSetFacetCounts::new(&state, Some(&hits)).unwrap();

    assert_counts_match(&facets, &brute_force_counts(&docs, &matching));
    assert_eq!(facets.total_count(), 4);
}

#[test]
fn test_randomized_counts_match_brute_force() {
    let mut rng = StdRng::seed_from_u64(0xface7);
    let dims = ["color", "size", "brand"];
    let values = ["a", "b", "c", "d", "e", "f", "g", "h"];

    for _ in 0..10 {
        let num_segments = rng.random_range(1..=3);
        let mut docs: Vec<Vec<(&str, &str)>> = Vec::new();
        let mut total_docs = 0u32;
        for _ in 0..num_segments {
            let num_docs = rng.random_range(1..=20);
            let mut segment = Vec::new();
            for _ in 0..num_docs {
                segment.push((
                    dims[rng.random_range(0..dims.len())],
                    values[rng.random_range(0..values.len())],
                ));
                total_docs += 1;
            }
            docs.push(segment);
        }

        let matching: Vec<u32> = (0..total_docs).filter(|_| rng.random_bool(0.4)).collect();

        let reader = multi_segment_reader(
            docs.iter()
                .map(|segment| segment.iter().map(|&(d, v)| flat_doc(d, v)).collect())
                .collect(),
        );
        let state = SortedSetReaderState::new(reader.clone(), FACET_FIELD, false).unwrap();
        let hits = collector_with_docs(&reader, &matching);
        let facets = SortedSetFacetCounts::new(&state, Some(&hits)).unwrap();

        assert_counts_match(&facets, &brute_force_counts(&docs, &matching));
        assert_eq!(facets.total_count() as usize, matching.len());
    }
}

#[test]
fn test_multi_segment_hierarchical() {
    let reader = multi_segment_reader(vec![
        vec![
            hierarchical_doc(&["a", "b", "c"]),
            hierarchical_doc(&["a", "d"]),
        ],
        vec![
            hierarchical_doc(&["a", "b"]),
            hierarchical_doc(&["e"]),
        ],
    ]);
    let state = SortedSetReaderState::new(reader.clone(), FACET_FIELD, true).unwrap();
    let hits = FacetsCollector::match_all(&reader);
    let facets = SortedSetFacetCounts::new(&state, Some(&hits)).unwrap();

    let result = facets.get_top_children(10, "a", &[]).unwrap().unwrap();
    assert_eq!(result.value, 3);
    assert_eq!(
        result.label_values,
        vec![LabelAndValue::new("b", 2), LabelAndValue::new("d", 1)]
    );

    // "e" is a root with no children, so it yields no result
    let results = facets.get_all_dims(10).unwrap();
    let order: Vec<(&str, i64)> = results.iter().map(|r| (r.dim.as_str(), r.value)).collect();
    assert_eq!(order, vec![("a", 3)]);
}
