//! Facet sets: N-tuples of typed numeric dimension values attached to docs.
//!
//! Every dimensional type reduces to the `i64` value space for matching:
//! longs are taken as-is, ints sign-extend, floats and doubles go through
//! the sortable-bits encodings. A document's binary payload is
//! `num_dims (sortable i64) || tuples of num_dims sortable i64 values`.

mod counts;
mod matcher;

pub use counts::MatchingFacetSetCounts;
pub use matcher::{DimRange, ExactFacetSetMatcher, FacetSetMatcher, RangeFacetSetMatcher};

use crate::encoding::{
    double_to_sortable_long, float_to_sortable_int, int_to_sortable_bytes, long_to_sortable_bytes,
    INT_BYTES, LONG_BYTES,
};

// ── FacetSet contract ────────────────────────────────────────────────────

/// A set of facet dimension values.
pub trait FacetSet {
    /// The number of dimension values in this set.
    fn dims(&self) -> usize;

    /// The dimension values as comparable longs, the canonical form matchers
    /// operate on.
    fn comparable_values(&self) -> &[i64];

    /// Pack the raw-typed dimension values into `buf` at `start`, returning
    /// the number of bytes written.
    fn pack_values(&self, buf: &mut [u8], start: usize) -> usize;

    /// Size of the packed raw-typed values.
    fn size_packed_bytes(&self) -> usize;
}

/// Encode facet sets into the binary doc-values payload read at query time.
///
/// All sets must share the same dimensionality.
pub fn pack_facet_sets(sets: &[&dyn FacetSet]) -> Vec<u8> {
    assert!(!sets.is_empty(), "sets must not be empty");
    let num_dims = sets[0].dims();
    let mut buf = vec![0u8; LONG_BYTES * (1 + num_dims * sets.len())];
    long_to_sortable_bytes(num_dims as i64, &mut buf[..LONG_BYTES]);
    let mut offset = LONG_BYTES;
    for set in sets {
        assert_eq!(set.dims(), num_dims, "all sets must have the same dims");
        for &value in set.comparable_values() {
            long_to_sortable_bytes(value, &mut buf[offset..offset + LONG_BYTES]);
            offset += LONG_BYTES;
        }
    }
    buf
}

// ── Concrete facet sets ──────────────────────────────────────────────────

/// A facet set of `i64` dimension values.
pub struct LongFacetSet {
    pub values: Vec<i64>,
}

impl LongFacetSet {
    pub fn new(values: Vec<i64>) -> Self {
        assert!(!values.is_empty(), "values must not be empty");
        Self { values }
    }
}

impl FacetSet for LongFacetSet {
    fn dims(&self) -> usize {
        self.values.len()
    }

    fn comparable_values(&self) -> &[i64] {
        &self.values
    }

    fn pack_values(&self, buf: &mut [u8], start: usize) -> usize {
        let mut offset = start;
        for &v in &self.values {
            long_to_sortable_bytes(v, &mut buf[offset..offset + LONG_BYTES]);
            offset += LONG_BYTES;
        }
        offset - start
    }

    fn size_packed_bytes(&self) -> usize {
        self.values.len() * LONG_BYTES
    }
}

/// A facet set of `i32` dimension values.
pub struct IntFacetSet {
    pub values: Vec<i32>,
    comparable: Vec<i64>,
}

impl IntFacetSet {
    pub fn new(values: Vec<i32>) -> Self {
        assert!(!values.is_empty(), "values must not be empty");
        let comparable = values.iter().map(|&v| v as i64).collect();
        Self { values, comparable }
    }
}

impl FacetSet for IntFacetSet {
    fn dims(&self) -> usize {
        self.values.len()
    }

    fn comparable_values(&self) -> &[i64] {
        &self.comparable
    }

    fn pack_values(&self, buf: &mut [u8], start: usize) -> usize {
        let mut offset = start;
        for &v in &self.values {
            int_to_sortable_bytes(v, &mut buf[offset..offset + INT_BYTES]);
            offset += INT_BYTES;
        }
        offset - start
    }

    fn size_packed_bytes(&self) -> usize {
        self.values.len() * INT_BYTES
    }
}

/// A facet set of `f32` dimension values.
pub struct FloatFacetSet {
    pub float_values: Vec<f32>,
    comparable: Vec<i64>,
}

impl FloatFacetSet {
    pub fn new(values: Vec<f32>) -> Self {
        assert!(!values.is_empty(), "values must not be empty");
        let comparable = values
            .iter()
            .map(|&v| float_to_sortable_int(v) as i64)
            .collect();
        Self {
            float_values: values,
            comparable,
        }
    }
}

impl FacetSet for FloatFacetSet {
    fn dims(&self) -> usize {
        self.float_values.len()
    }

    fn comparable_values(&self) -> &[i64] {
        &self.comparable
    }

    fn pack_values(&self, buf: &mut [u8], start: usize) -> usize {
        let mut offset = start;
        for &v in &self.float_values {
            int_to_sortable_bytes(float_to_sortable_int(v), &mut buf[offset..offset + INT_BYTES]);
            offset += INT_BYTES;
        }
        offset - start
    }

    fn size_packed_bytes(&self) -> usize {
        self.float_values.len() * INT_BYTES
    }
}

/// A facet set of `f64` dimension values.
pub struct DoubleFacetSet {
    pub double_values: Vec<f64>,
    comparable: Vec<i64>,
}

impl DoubleFacetSet {
    pub fn new(values: Vec<f64>) -> Self {
        assert!(!values.is_empty(), "values must not be empty");
        let comparable = values.iter().map(|&v| double_to_sortable_long(v)).collect();
        Self {
            double_values: values,
            comparable,
        }
    }
}

impl FacetSet for DoubleFacetSet {
    fn dims(&self) -> usize {
        self.double_values.len()
    }

    fn comparable_values(&self) -> &[i64] {
        &self.comparable
    }

    fn pack_values(&self, buf: &mut [u8], start: usize) -> usize {
        let mut offset = start;
        for &v in &self.double_values {
            long_to_sortable_bytes(
                double_to_sortable_long(v),
                &mut buf[offset..offset + LONG_BYTES],
            );
            offset += LONG_BYTES;
        }
        offset - start
    }

    fn size_packed_bytes(&self) -> usize {
        self.double_values.len() * LONG_BYTES
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoding::sortable_bytes_to_long;

    #[test]
    fn test_pack_facet_sets_layout() {
        let a = LongFacetSet::new(vec![1, 2, 3]);
        let b = LongFacetSet::new(vec![4, 5, 6]);
        let packed = pack_facet_sets(&[&a, &b]);

        assert_eq!(packed.len(), LONG_BYTES * (1 + 6));
        assert_eq!(sortable_bytes_to_long(&packed[..LONG_BYTES]), 3);
        let values: Vec<i64> = (0..6)
            .map(|i| {
                let start = LONG_BYTES * (1 + i);
                sortable_bytes_to_long(&packed[start..start + LONG_BYTES])
            })
            .collect();
        assert_eq!(values, vec![1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn test_comparable_values_preserve_order() {
        let floats = FloatFacetSet::new(vec![-2.5, 0.0, 3.5]);
        let cv = floats.comparable_values();
        assert!(cv[0] < cv[1] && cv[1] < cv[2]);

        let doubles = DoubleFacetSet::new(vec![-1e10, 0.25]);
        let cv = doubles.comparable_values();
        assert!(cv[0] < cv[1]);

        let ints = IntFacetSet::new(vec![-5, 7]);
        assert_eq!(ints.comparable_values(), &[-5, 7]);
    }

    #[test]
    fn test_packed_sizes() {
        assert_eq!(LongFacetSet::new(vec![1, 2]).size_packed_bytes(), 16);
        assert_eq!(IntFacetSet::new(vec![1, 2]).size_packed_bytes(), 8);
        assert_eq!(FloatFacetSet::new(vec![1.0]).size_packed_bytes(), 4);
        assert_eq!(DoubleFacetSet::new(vec![1.0]).size_packed_bytes(), 8);
    }

    #[test]
    #[should_panic(expected = "values must not be empty")]
    fn test_empty_values_panic() {
        LongFacetSet::new(Vec::new());
    }
}
