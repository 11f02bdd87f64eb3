// ResourceVector - multi-dimensional resource quantity

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A multi-dimensional resource quantity: named dimension -> amount.
///
/// Dimension names and units are caller-defined and opaque ("mem", "vcore",
/// "gpu", ...). An absent dimension reads as zero. Entries are kept in a
/// `BTreeMap` so display, snapshots and serialization are deterministically
/// ordered.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceVector {
    entries: BTreeMap<String, i64>,
}

impl ResourceVector {
    /// An empty (zero) vector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a vector from dimension/amount pairs.
    pub fn from_pairs<S: Into<String>>(pairs: impl IntoIterator<Item = (S, i64)>) -> Self {
        Self {
            entries: pairs.into_iter().map(|(d, v)| (d.into(), v)).collect(),
        }
    }

    /// Amount for a dimension; absent dimensions read as zero.
    pub fn get(&self, dimension: &str) -> i64 {
        self.entries.get(dimension).copied().unwrap_or(0)
    }

    /// Iterate over present dimensions and amounts.
    pub fn iter(&self) -> impl Iterator<Item = (&str, i64)> {
        self.entries.iter().map(|(d, v)| (d.as_str(), *v))
    }

    /// True when every present dimension is zero (an empty vector is zero).
    pub fn is_zero(&self) -> bool {
        self.entries.values().all(|v| *v == 0)
    }

    /// Elementwise sum over the dimension union.
    pub fn add(&self, other: &ResourceVector) -> ResourceVector {
        let mut out = self.clone();
        out.add_assign(other);
        out
    }

    /// In-place elementwise sum.
    pub fn add_assign(&mut self, other: &ResourceVector) {
        for (dimension, amount) in &other.entries {
            *self.entries.entry(dimension.clone()).or_insert(0) += amount;
        }
    }

    /// First dimension where `self - delta` would go negative, if any.
    ///
    /// Callers run this before `sub_assign`; a would-be-negative result is an
    /// accounting error, never silently clamped.
    pub fn underflow_dimension<'a>(&self, delta: &'a ResourceVector) -> Option<&'a str> {
        delta
            .entries
            .iter()
            .find(|(dimension, amount)| self.get(dimension) - **amount < 0)
            .map(|(dimension, _)| dimension.as_str())
    }

    /// In-place elementwise subtract over the dimension union.
    ///
    /// Check `underflow_dimension` first; this does not guard against
    /// negative results.
    pub fn sub_assign(&mut self, delta: &ResourceVector) {
        for (dimension, amount) in &delta.entries {
            *self.entries.entry(dimension.clone()).or_insert(0) -= amount;
        }
    }

    /// Minimum over the dimension union.
    ///
    /// A dimension absent from one operand is unconstrained there, so the
    /// other operand's value wins outright.
    pub fn component_min(&self, other: &ResourceVector) -> ResourceVector {
        let mut out = self.clone();
        for (dimension, amount) in &other.entries {
            out.entries
                .entry(dimension.clone())
                .and_modify(|v| *v = (*v).min(*amount))
                .or_insert(*amount);
        }
        out
    }

    /// Treating `self` as a limit: `limit - usage` for every dimension the
    /// limit defines, and only those. Dimensions the limit does not define
    /// are unconstrained and never appear in the result.
    pub fn remaining_under(&self, usage: &ResourceVector) -> ResourceVector {
        ResourceVector {
            entries: self
                .entries
                .iter()
                .map(|(dimension, cap)| (dimension.clone(), cap - usage.get(dimension)))
                .collect(),
        }
    }

    /// First dimension where `self` exceeds `limit`, with the attempted
    /// amount and the cap. Only dimensions the limit defines constrain;
    /// anything else passes.
    pub fn first_dimension_over<'a>(&self, limit: &'a ResourceVector) -> Option<(&'a str, i64, i64)> {
        limit
            .entries
            .iter()
            .find(|(dimension, cap)| self.get(dimension) > **cap)
            .map(|(dimension, cap)| (dimension.as_str(), self.get(dimension), *cap))
    }

    /// Scalar multiply.
    pub fn multiply(&self, factor: i64) -> ResourceVector {
        ResourceVector {
            entries: self
                .entries
                .iter()
                .map(|(dimension, amount)| (dimension.clone(), amount * factor))
                .collect(),
        }
    }
}

// Absent dimensions compare as zero: {mem: 0} == {}
impl PartialEq for ResourceVector {
    fn eq(&self, other: &Self) -> bool {
        self.entries
            .keys()
            .chain(other.entries.keys())
            .all(|dimension| self.get(dimension) == other.get(dimension))
    }
}

impl Eq for ResourceVector {}

impl fmt::Display for ResourceVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, (dimension, amount)) in self.entries.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}: {}", dimension, amount)?;
        }
        write!(f, "}}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absent_dimension_reads_zero() {
        let v = ResourceVector::from_pairs([("mem", 10)]);
        assert_eq!(v.get("mem"), 10);
        assert_eq!(v.get("vcore"), 0);
    }

    #[test]
    fn test_add_over_dimension_union() {
        let a = ResourceVector::from_pairs([("mem", 10), ("vcore", 2)]);
        let b = ResourceVector::from_pairs([("mem", 5), ("gpu", 1)]);
        let sum = a.add(&b);
        assert_eq!(
            sum,
            ResourceVector::from_pairs([("mem", 15), ("vcore", 2), ("gpu", 1)])
        );
    }

    #[test]
    fn test_underflow_detected_before_subtract() {
        let usage = ResourceVector::from_pairs([("mem", 10), ("vcore", 2)]);
        let delta = ResourceVector::from_pairs([("mem", 11)]);
        assert_eq!(usage.underflow_dimension(&delta), Some("mem"));

        let ok = ResourceVector::from_pairs([("mem", 10)]);
        assert_eq!(usage.underflow_dimension(&ok), None);
    }

    #[test]
    fn test_underflow_on_dimension_never_charged() {
        let usage = ResourceVector::from_pairs([("mem", 10)]);
        let delta = ResourceVector::from_pairs([("gpu", 1)]);
        assert_eq!(usage.underflow_dimension(&delta), Some("gpu"));
    }

    #[test]
    fn test_sub_to_zero_is_zero_not_missing() {
        let mut usage = ResourceVector::from_pairs([("mem", 10)]);
        usage.sub_assign(&ResourceVector::from_pairs([("mem", 10)]));
        assert!(usage.is_zero());
        assert_eq!(usage, ResourceVector::new());
    }

    #[test]
    fn test_component_min_absent_dimension_wins_outright() {
        let a = ResourceVector::from_pairs([("mem", 10), ("vcore", 4)]);
        let b = ResourceVector::from_pairs([("mem", 3), ("gpu", 1)]);
        let min = a.component_min(&b);
        assert_eq!(
            min,
            ResourceVector::from_pairs([("mem", 3), ("vcore", 4), ("gpu", 1)])
        );
    }

    #[test]
    fn test_remaining_under_limit_dimensions_only() {
        let limit = ResourceVector::from_pairs([("mem", 20), ("vcore", 10)]);
        let usage = ResourceVector::from_pairs([("mem", 5), ("gpu", 100)]);
        // gpu is untracked by this limit and must not appear
        assert_eq!(
            limit.remaining_under(&usage),
            ResourceVector::from_pairs([("mem", 15), ("vcore", 10)])
        );
    }

    #[test]
    fn test_first_dimension_over_ignores_undefined_dimensions() {
        let limit = ResourceVector::from_pairs([("mem", 20)]);
        let inside = ResourceVector::from_pairs([("mem", 20), ("vcore", 999)]);
        assert_eq!(inside.first_dimension_over(&limit), None);

        let over = ResourceVector::from_pairs([("mem", 21)]);
        assert_eq!(over.first_dimension_over(&limit), Some(("mem", 21, 20)));
    }

    #[test]
    fn test_multiply() {
        let v = ResourceVector::from_pairs([("mem", 10), ("vcore", 10)]);
        assert_eq!(
            v.multiply(6),
            ResourceVector::from_pairs([("mem", 60), ("vcore", 60)])
        );
    }

    #[test]
    fn test_display_sorted() {
        let v = ResourceVector::from_pairs([("vcore", 10), ("mem", 10)]);
        assert_eq!(v.to_string(), "{mem: 10, vcore: 10}");
    }
}
