//! Matchers deciding which logical bucket each facet-set tuple counts into.
//!
//! A matcher evaluates either a decoded tuple of comparable longs or the raw
//! packed bytes of a tuple (the zero-decode path). Bounds are normalised to
//! inclusive comparable-long form at construction, so matching is plain
//! comparison regardless of the original value type.

use crate::encoding::{
    double_to_sortable_long, float_to_sortable_int, long_to_sortable_bytes, LONG_BYTES,
};
use crate::error::{Error, Result};

use super::FacetSet;

// ── Matcher contract ─────────────────────────────────────────────────────

/// Decides whether one facet-set tuple belongs to this matcher's bucket.
pub trait FacetSetMatcher {
    /// Label associated with this matcher's aggregated value.
    fn label(&self) -> &str;

    /// Number of dimensions this matcher evaluates.
    fn dims(&self) -> usize;

    /// Whether the decoded tuple matches.
    fn matches(&self, dim_values: &[i64]) -> bool;

    /// Whether the packed tuple at `start` matches, without decoding.
    fn matches_packed(&self, packed: &[u8], start: usize, num_dims: usize) -> bool;
}

// ── Exact matcher ────────────────────────────────────────────────────────

/// Matches a tuple only when every dimension value equals the given set's.
pub struct ExactFacetSetMatcher {
    label: String,
    values: Vec<i64>,
    packed: Vec<u8>,
}

impl ExactFacetSetMatcher {
    pub fn new(label: impl Into<String>, facet_set: &dyn FacetSet) -> Self {
        let values = facet_set.comparable_values().to_vec();
        let mut packed = vec![0u8; values.len() * LONG_BYTES];
        for (i, &v) in values.iter().enumerate() {
            long_to_sortable_bytes(v, &mut packed[i * LONG_BYTES..(i + 1) * LONG_BYTES]);
        }
        Self {
            label: label.into(),
            values,
            packed,
        }
    }
}

impl FacetSetMatcher for ExactFacetSetMatcher {
    fn label(&self) -> &str {
        &self.label
    }

    fn dims(&self) -> usize {
        self.values.len()
    }

    fn matches(&self, dim_values: &[i64]) -> bool {
        debug_assert_eq!(
            dim_values.len(),
            self.values.len(),
            "encoded dimensions are incompatible with this matcher's dimensions"
        );
        dim_values == self.values
    }

    fn matches_packed(&self, packed: &[u8], start: usize, num_dims: usize) -> bool {
        debug_assert_eq!(
            num_dims,
            self.values.len(),
            "encoded dimensions are incompatible with this matcher's dimensions"
        );
        packed[start..start + num_dims * LONG_BYTES] == self.packed[..]
    }
}

// ── Range matcher ────────────────────────────────────────────────────────

/// One inclusive range in a facet-set dimension, in comparable-long form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DimRange {
    /// Inclusive min.
    pub min: i64,
    /// Inclusive max.
    pub max: i64,
}

impl DimRange {
    /// Range over `i64` values, normalising exclusive bounds.
    pub fn new_long(min: i64, min_inclusive: bool, max: i64, max_inclusive: bool) -> Result<Self> {
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
            return Err(Error::invalid_argument(format!(
                "minimum cannot be greater than maximum, max={max}, min={min}"
            )));
        }
        Ok(Self { min, max })
    }

    /// Range over `i32` values, normalising exclusive bounds.
    pub fn new_int(min: i32, min_inclusive: bool, max: i32, max_inclusive: bool) -> Result<Self> {
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
            return Err(Error::invalid_argument(format!(
                "minimum cannot be greater than maximum, max={max}, min={min}"
            )));
        }
        Ok(Self {
            min: min as i64,
            max: max as i64,
        })
    }

    /// Range over `f32` values. Exclusive bounds move one ULP inward.
    pub fn new_float(min: f32, min_inclusive: bool, max: f32, max_inclusive: bool) -> Result<Self> {
        if min.is_nan() {
            return Err(Error::invalid_argument("min cannot be NaN"));
        }
        if max.is_nan() {
            return Err(Error::invalid_argument("max cannot be NaN"));
        }
        let min = if min_inclusive { min } else { min.next_up() };
        let max = if max_inclusive { max } else { max.next_down() };
        if min > max {
            return Err(Error::invalid_argument(
                "minimum cannot be greater than maximum",
            ));
        }
        Ok(Self {
            min: float_to_sortable_int(min) as i64,
            max: float_to_sortable_int(max) as i64,
        })
    }

    /// Range over `f64` values. Exclusive bounds move one ULP inward.
    pub fn new_double(
        min: f64,
        min_inclusive: bool,
        max: f64,
        max_inclusive: bool,
    ) -> Result<Self> {
        if min.is_nan() {
            return Err(Error::invalid_argument("min cannot be NaN"));
        }
        if max.is_nan() {
            return Err(Error::invalid_argument("max cannot be NaN"));
        }
        let min = if min_inclusive { min } else { min.next_up() };
        let max = if max_inclusive { max } else { max.next_down() };
        if min > max {
            return Err(Error::invalid_argument(
                "minimum cannot be greater than maximum",
            ));
        }
        Ok(Self {
            min: double_to_sortable_long(min),
            max: double_to_sortable_long(max),
        })
    }
}

/// Matches a tuple when every dimension falls within its corresponding range.
pub struct RangeFacetSetMatcher {
    label: String,
    lower: Vec<i64>,
    upper: Vec<i64>,
    lower_packed: Vec<u8>,
    upper_packed: Vec<u8>,
}

impl RangeFacetSetMatcher {
    pub fn new(label: impl Into<String>, dim_ranges: Vec<DimRange>) -> Self {
        assert!(!dim_ranges.is_empty(), "dim_ranges must not be empty");
        let lower: Vec<i64> = dim_ranges.iter().map(|r| r.min).collect();
        let upper: Vec<i64> = dim_ranges.iter().map(|r| r.max).collect();
        let mut lower_packed = vec![0u8; lower.len() * LONG_BYTES];
        let mut upper_packed = vec![0u8; upper.len() * LONG_BYTES];
        for i in 0..lower.len() {
            long_to_sortable_bytes(lower[i], &mut lower_packed[i * LONG_BYTES..(i + 1) * LONG_BYTES]);
            long_to_sortable_bytes(upper[i], &mut upper_packed[i * LONG_BYTES..(i + 1) * LONG_BYTES]);
        }
        Self {
            label: label.into(),
            lower,
            upper,
            lower_packed,
            upper_packed,
        }
    }
}

impl FacetSetMatcher for RangeFacetSetMatcher {
    fn label(&self) -> &str {
        &self.label
    }

    fn dims(&self) -> usize {
        self.lower.len()
    }

    fn matches(&self, dim_values: &[i64]) -> bool {
        debug_assert_eq!(
            dim_values.len(),
            self.lower.len(),
            "encoded dimensions are incompatible with this matcher's dimensions"
        );
        for (i, &value) in dim_values.iter().enumerate() {
            if value < self.lower[i] {
                // Doc's value is too low in this dimension
                return false;
            }
            if value > self.upper[i] {
                // Doc's value is too high in this dimension
                return false;
            }
        }
        true
    }

    fn matches_packed(&self, packed: &[u8], start: usize, num_dims: usize) -> bool {
        debug_assert_eq!(
            num_dims,
            self.lower.len(),
            "encoded dimensions are incompatible with this matcher's dimensions"
        );
        for i in 0..num_dims {
            let offset = start + i * LONG_BYTES;
            let value = &packed[offset..offset + LONG_BYTES];
            let dim = i * LONG_BYTES..(i + 1) * LONG_BYTES;
            if value < &self.lower_packed[dim.clone()] || value > &self.upper_packed[dim] {
                return false;
            }
        }
        true
    }
}
