//! Range-on-range faceting: documents carry multi-dimensional boxes, and
//! queries count how many documents relate to each named query box.
//!
//! Boxes are matched in packed sortable-byte form, so one unsigned byte
//! comparison per dimension slice covers every value type. Longs/doubles
//! encode to 8 bytes per value, ints/floats to 4.

mod counts;

pub use counts::RangeOnRangeFacetCounts;

use std::fmt;

use crate::encoding::{
    double_to_sortable_long, float_to_sortable_int, int_to_sortable_bytes, long_to_sortable_bytes,
    INT_BYTES, LONG_BYTES,
};
use crate::error::{Error, Result};

// ── Spatial relation ─────────────────────────────────────────────────────

/// The relation counted between a query box and a document box.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryType {
    /// Boxes overlap in every dimension.
    Intersects,
    /// The document box contains the query box.
    Contains,
    /// The document box lies within the query box.
    Within,
    /// Boxes intersect but neither contains the other.
    Crosses,
}

impl QueryType {
    /// Whether any box in `packed` relates to the encoded query box.
    pub(crate) fn matches(
        self,
        query: &[u8],
        packed: &[u8],
        dims: usize,
        bytes_per_dim: usize,
    ) -> bool {
        let box_bytes = 2 * dims * bytes_per_dim;
        debug_assert_eq!(query.len(), box_bytes);
        (0..packed.len())
            .step_by(box_bytes)
            .any(|start| self.matches_box(query, &packed[start..start + box_bytes], dims, bytes_per_dim))
    }

    fn matches_box(self, query: &[u8], doc: &[u8], dims: usize, bytes_per_dim: usize) -> bool {
        match self {
            QueryType::Intersects => relation_holds(query, doc, dims, bytes_per_dim, |qmin, qmax, dmin, dmax| {
                qmin <= dmax && dmin <= qmax
            }),
            QueryType::Contains => relation_holds(query, doc, dims, bytes_per_dim, |qmin, qmax, dmin, dmax| {
                dmin <= qmin && qmax <= dmax
            }),
            QueryType::Within => relation_holds(query, doc, dims, bytes_per_dim, |qmin, qmax, dmin, dmax| {
                qmin <= dmin && dmax <= qmax
            }),
            QueryType::Crosses => {
                QueryType::Intersects.matches_box(query, doc, dims, bytes_per_dim)
                    && !QueryType::Within.matches_box(query, doc, dims, bytes_per_dim)
                    && !QueryType::Contains.matches_box(query, doc, dims, bytes_per_dim)
            }
        }
    }
}

/// Evaluate a per-dimension predicate over the min/max byte slices of two
/// boxes. Slice comparison is unsigned lexicographic, which matches numeric
/// order for every sortable encoding used here.
fn relation_holds(
    query: &[u8],
    doc: &[u8],
    dims: usize,
    bytes_per_dim: usize,
    predicate: impl Fn(&[u8], &[u8], &[u8], &[u8]) -> bool,
) -> bool {
    for dim in 0..dims {
        let min = dim * bytes_per_dim..(dim + 1) * bytes_per_dim;
        let max = (dims + dim) * bytes_per_dim..(dims + dim + 1) * bytes_per_dim;
        if !predicate(&query[min.clone()], &query[max.clone()], &doc[min], &doc[max]) {
            return false;
        }
    }
    true
}

// ── Range contract ───────────────────────────────────────────────────────

/// A named query box: per-dimension inclusive min/max bounds.
pub trait Range {
    /// Label that identifies this range.
    fn label(&self) -> &str;

    /// Number of dimensions per box.
    fn dims(&self) -> usize;

    /// Bytes used to encode one dimension value.
    fn encoded_value_bytes(&self) -> usize;

    /// Encode to packed form: `dims` mins then `dims` maxes, sortable bytes.
    fn encode_packed(&self) -> Vec<u8>;
}

macro_rules! check_multi_dim_args {
    ($label:ident, $min:ident, $max:ident) => {
        if $min.is_empty() || $max.is_empty() {
            return Err(Error::invalid_argument(
                "min/max range values cannot be empty",
            ));
        }
        if $min.len() != $max.len() {
            return Err(Error::invalid_argument("min/max ranges must agree"));
        }
        for i in 0..$min.len() {
            if $min[i] > $max[i] {
                return Err(Error::invalid_argument(format!(
                    "range \"{}\" dim {i}: min should be less than max",
                    $label
                )));
            }
        }
    };
}

// ── LongRange ────────────────────────────────────────────────────────────

/// A range over `i64` boxes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LongRange {
    pub label: String,
    /// Minimum (inclusive) per dimension.
    pub min: Vec<i64>,
    /// Maximum (inclusive) per dimension.
    pub max: Vec<i64>,
}

impl LongRange {
    /// Single-dimension range, normalising exclusive bounds.
    pub fn new(
        label: impl Into<String>,
        min: i64,
        min_inclusive: bool,
        max: i64,
        max_inclusive: bool,
    ) -> Result<Self> {
        let label = label.into();
        let min = if min_inclusive {
            min
        } else {
            min.checked_add(1)
                .ok_or_else(|| Error::invalid_argument(format!("invalid min input: {min}")))?
        };
        let max = if max_inclusive {
            max
        } else {
            max.checked_sub(1)
                .ok_or_else(|| Error::invalid_argument(format!("invalid max input: {max}")))?
        };
        if min > max {
            return fail_no_match(&label);
        }
        Ok(Self {
            label,
            min: vec![min],
            max: vec![max],
        })
    }

    /// Multi-dimension range over already-inclusive bounds.
    pub fn with_bounds(label: impl Into<String>, min: Vec<i64>, max: Vec<i64>) -> Result<Self> {
        let label = label.into();
        check_multi_dim_args!(label, min, max);
        Ok(Self { label, min, max })
    }
}

impl Range for LongRange {
    fn label(&self) -> &str {
        &self.label
    }
    fn dims(&self) -> usize {
        self.min.len()
    }
    fn encoded_value_bytes(&self) -> usize {
        LONG_BYTES
    }
    fn encode_packed(&self) -> Vec<u8> {
        let dims = self.dims();
        let mut packed = vec![0u8; 2 * dims * LONG_BYTES];
        for i in 0..dims {
            long_to_sortable_bytes(self.min[i], &mut packed[i * LONG_BYTES..(i + 1) * LONG_BYTES]);
            long_to_sortable_bytes(
                self.max[i],
                &mut packed[(dims + i) * LONG_BYTES..(dims + i + 1) * LONG_BYTES],
            );
        }
        packed
    }
}

impl fmt::Display for LongRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "LongRange(label: {}, min: {:?}, max: {:?})",
            self.label, self.min, self.max
        )
    }
}

// ── IntRange ─────────────────────────────────────────────────────────────

/// A range over `i32` boxes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntRange {
    pub label: String,
    pub min: Vec<i32>,
    pub max: Vec<i32>,
}

impl IntRange {
    pub fn new(
        label: impl Into<String>,
        min: i32,
        min_inclusive: bool,
        max: i32,
        max_inclusive: bool,
    ) -> Result<Self> {
        let label = label.into();
        let min = if min_inclusive {
            min
        } else {
            min.checked_add(1)
                .ok_or_else(|| Error::invalid_argument(format!("invalid min input: {min}")))?
        };
        let max = if max_inclusive {
            max
        } else {
            max.checked_sub(1)
                .ok_or_else(|| Error::invalid_argument(format!("invalid max input: {max}")))?
        };
        if min > max {
            return fail_no_match(&label);
        }
        Ok(Self {
            label,
            min: vec![min],
            max: vec![max],
        })
    }

    pub fn with_bounds(label: impl Into<String>, min: Vec<i32>, max: Vec<i32>) -> Result<Self> {
        let label = label.into();
        check_multi_dim_args!(label, min, max);
        Ok(Self { label, min, max })
    }
}

impl Range for IntRange {
    fn label(&self) -> &str {
        &self.label
    }
    fn dims(&self) -> usize {
        self.min.len()
    }
    fn encoded_value_bytes(&self) -> usize {
        INT_BYTES
    }
    fn encode_packed(&self) -> Vec<u8> {
        let dims = self.dims();
        let mut packed = vec![0u8; 2 * dims * INT_BYTES];
        for i in 0..dims {
            int_to_sortable_bytes(self.min[i], &mut packed[i * INT_BYTES..(i + 1) * INT_BYTES]);
            int_to_sortable_bytes(
                self.max[i],
                &mut packed[(dims + i) * INT_BYTES..(dims + i + 1) * INT_BYTES],
            );
        }
        packed
    }
}

impl fmt::Display for IntRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "IntRange(label: {}, min: {:?}, max: {:?})",
            self.label, self.min, self.max
        )
    }
}

// ── DoubleRange ──────────────────────────────────────────────────────────

/// A range over `f64` boxes.
#[derive(Debug, Clone, PartialEq)]
pub struct DoubleRange {
    pub label: String,
    pub min: Vec<f64>,
    pub max: Vec<f64>,
}

impl DoubleRange {
    /// Single-dimension range. NaN bounds are rejected; an exclusive min
    /// moves one ULP up and an exclusive max one value toward negative
    /// infinity (identical to `next_down` for every finite bound, including
    /// the `-0.0` edge, which both map to the largest negative value).
    pub fn new(
        label: impl Into<String>,
        min: f64,
        min_inclusive: bool,
        max: f64,
        max_inclusive: bool,
    ) -> Result<Self> {
        let label = label.into();
        if min.is_nan() {
            return Err(Error::invalid_argument("min cannot be NaN"));
        }
        if max.is_nan() {
            return Err(Error::invalid_argument("max cannot be NaN"));
        }
        let min = if min_inclusive { min } else { min.next_up() };
        let max = if max_inclusive { max } else { max.next_down() };
        if min > max {
            return fail_no_match(&label);
        }
        Ok(Self {
            label,
            min: vec![min],
            max: vec![max],
        })
    }

    pub fn with_bounds(label: impl Into<String>, min: Vec<f64>, max: Vec<f64>) -> Result<Self> {
        let label = label.into();
        if min.iter().chain(max.iter()).any(|v| v.is_nan()) {
            return Err(Error::invalid_argument("range bounds cannot be NaN"));
        }
        check_multi_dim_args!(label, min, max);
        Ok(Self { label, min, max })
    }
}

impl Range for DoubleRange {
    fn label(&self) -> &str {
        &self.label
    }
    fn dims(&self) -> usize {
        self.min.len()
    }
    fn encoded_value_bytes(&self) -> usize {
        LONG_BYTES
    }
    fn encode_packed(&self) -> Vec<u8> {
        let dims = self.dims();
        let mut packed = vec![0u8; 2 * dims * LONG_BYTES];
        for i in 0..dims {
            long_to_sortable_bytes(
                double_to_sortable_long(self.min[i]),
                &mut packed[i * LONG_BYTES..(i + 1) * LONG_BYTES],
            );
            long_to_sortable_bytes(
                double_to_sortable_long(self.max[i]),
                &mut packed[(dims + i) * LONG_BYTES..(dims + i + 1) * LONG_BYTES],
            );
        }
        packed
    }
}

impl fmt::Display for DoubleRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "DoubleRange(label: {}, min: {:?}, max: {:?})",
            self.label, self.min, self.max
        )
    }
}

// ── FloatRange ───────────────────────────────────────────────────────────

/// A range over `f32` boxes.
#[derive(Debug, Clone, PartialEq)]
pub struct FloatRange {
    pub label: String,
    pub min: Vec<f32>,
    pub max: Vec<f32>,
}

impl FloatRange {
    pub fn new(
        label: impl Into<String>,
        min: f32,
        min_inclusive: bool,
        max: f32,
        max_inclusive: bool,
    ) -> Result<Self> {
        let label = label.into();
        if min.is_nan() {
            return Err(Error::invalid_argument("min cannot be NaN"));
        }
        if max.is_nan() {
            return Err(Error::invalid_argument("max cannot be NaN"));
        }
        let min = if min_inclusive { min } else { min.next_up() };
        let max = if max_inclusive { max } else { max.next_down() };
        if min > max {
            return fail_no_match(&label);
        }
        Ok(Self {
            label,
            min: vec![min],
            max: vec![max],
        })
    }

    pub fn with_bounds(label: impl Into<String>, min: Vec<f32>, max: Vec<f32>) -> Result<Self> {
        let label = label.into();
        if min.iter().chain(max.iter()).any(|v| v.is_nan()) {
            return Err(Error::invalid_argument("range bounds cannot be NaN"));
        }
        check_multi_dim_args!(label, min, max);
        Ok(Self { label, min, max })
    }
}

impl Range for FloatRange {
    fn label(&self) -> &str {
        &self.label
    }
    fn dims(&self) -> usize {
        self.min.len()
    }
    fn encoded_value_bytes(&self) -> usize {
        INT_BYTES
    }
    fn encode_packed(&self) -> Vec<u8> {
        let dims = self.dims();
        let mut packed = vec![0u8; 2 * dims * INT_BYTES];
        for i in 0..dims {
            int_to_sortable_bytes(
                float_to_sortable_int(self.min[i]),
                &mut packed[i * INT_BYTES..(i + 1) * INT_BYTES],
            );
            int_to_sortable_bytes(
                float_to_sortable_int(self.max[i]),
                &mut packed[(dims + i) * INT_BYTES..(dims + i + 1) * INT_BYTES],
            );
        }
        packed
    }
}

impl fmt::Display for FloatRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "FloatRange(label: {}, min: {:?}, max: {:?})",
            self.label, self.min, self.max
        )
    }
}

fn fail_no_match<T>(label: &str) -> Result<T> {
    Err(Error::invalid_argument(format!(
        "range \"{label}\" matches nothing"
    )))
}

/// Pack one or more boxes into a document's binary payload.
///
/// Boxes must share dimensionality and width; each contributes
/// `dims * encoded_value_bytes * 2` bytes.
pub fn pack_ranges<R: Range>(ranges: &[R]) -> Vec<u8> {
    assert!(!ranges.is_empty(), "ranges must not be empty");
    let mut packed = Vec::with_capacity(ranges.len() * 2 * ranges[0].dims() * ranges[0].encoded_value_bytes());
    for range in ranges {
        assert_eq!(range.dims(), ranges[0].dims(), "boxes must share dims");
        packed.extend_from_slice(&range.encode_packed());
    }
    packed
}
