// Copyright 2024 The Ray Authors.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//  http://www.apache.org/licenses/LICENSE-2.0

//! Scheduling types: ResourceSet, FixedPoint arithmetic.
//!
//! Replaces `ResourceSet` from `src/ray/common/task/scheduling_resources.h`.

use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};

use crate::constants::RESOURCE_UNIT_SCALING;

/// Fixed-point representation for fractional resource quantities.
///
/// Resources in Ray can be fractional (e.g., 0.5 CPU). FixedPoint stores
/// the value as `(value * RESOURCE_UNIT_SCALING)` internally for exact
/// integer arithmetic.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct FixedPoint(i64);

impl FixedPoint {
    pub const ZERO: Self = Self(0);
    pub const ONE: Self = Self(RESOURCE_UNIT_SCALING as i64);

    /// Quantities beyond the representable range saturate. NaN maps to zero.
    pub fn from_f64(value: f64) -> Self {
        Self((value * RESOURCE_UNIT_SCALING as f64).round() as i64)
    }

    pub fn to_f64(self) -> f64 {
        self.0 as f64 / RESOURCE_UNIT_SCALING as f64
    }

    pub fn raw(self) -> i64 {
        self.0
    }

    pub fn is_zero(self) -> bool {
        self.0 == 0
    }

    pub fn is_positive(self) -> bool {
        self.0 > 0
    }

    pub fn is_negative(self) -> bool {
        self.0 < 0
    }

    /// Subtraction that never goes below zero.
    pub fn saturating_sub(self, rhs: Self) -> Self {
        Self(self.0.saturating_sub(rhs.0).max(0))
    }
}

impl std::ops::Add for FixedPoint {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self(self.0.saturating_add(rhs.0))
    }
}

impl std::ops::AddAssign for FixedPoint {
    fn add_assign(&mut self, rhs: Self) {
        self.0 = self.0.saturating_add(rhs.0);
    }
}

impl std::ops::Sub for FixedPoint {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self(self.0.saturating_sub(rhs.0))
    }
}

impl fmt::Debug for FixedPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FixedPoint({})", self.to_f64())
    }
}

impl fmt::Display for FixedPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_f64())
    }
}

/// A set of named resources with fixed-point quantities.
///
/// Missing names read as zero. Explicit zero entries are kept so a fully
/// acquired resource stays visible (`{CPU: 0}`), but equality and hashing
/// ignore them: `{CPU: 0} == {}`. No operation stores a negative quantity.
#[derive(Clone, Default)]
pub struct ResourceSet {
    resources: HashMap<String, FixedPoint>,
}

impl ResourceSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create from `(name, quantity)` pairs. Negative quantities are dropped.
    pub fn from_map<K, I>(map: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, f64)>,
    {
        Self {
            resources: map
                .into_iter()
                .filter(|(_, v)| *v >= 0.0)
                .map(|(k, v)| (k.into(), FixedPoint::from_f64(v)))
                .collect(),
        }
    }

    /// Get the quantity of a resource, zero if absent.
    pub fn get(&self, resource: &str) -> FixedPoint {
        self.resources
            .get(resource)
            .copied()
            .unwrap_or(FixedPoint::ZERO)
    }

    pub fn contains(&self, resource: &str) -> bool {
        self.resources.contains_key(resource)
    }

    /// Set the quantity of a resource. Negative values are stored as zero.
    pub fn set(&mut self, resource: impl Into<String>, value: FixedPoint) {
        let value = if value.is_negative() {
            FixedPoint::ZERO
        } else {
            value
        };
        self.resources.insert(resource.into(), value);
    }

    pub fn remove(&mut self, resource: &str) -> Option<FixedPoint> {
        self.resources.remove(resource)
    }

    /// Returns `self - other`, or `None` (leaving `self` untouched) unless
    /// `other` is a subset of `self`.
    pub fn checked_sub(&self, other: &ResourceSet) -> Option<ResourceSet> {
        if !other.is_subset_of(self) {
            return None;
        }
        Some(self - other)
    }

    /// True iff every entry of `self` is <= the same entry in `other`.
    pub fn is_subset_of(&self, other: &ResourceSet) -> bool {
        self.resources
            .iter()
            .all(|(name, amount)| *amount <= other.get(name))
    }

    pub fn is_superset_of(&self, other: &ResourceSet) -> bool {
        other.is_subset_of(self)
    }

    pub fn is_equal(&self, other: &ResourceSet) -> bool {
        self.is_subset_of(other) && other.is_subset_of(self)
    }

    /// Entry-wise minimum with `bound`. Names absent from `bound` are dropped.
    pub fn clamp_to(&self, bound: &ResourceSet) -> ResourceSet {
        let resources = self
            .resources
            .iter()
            .filter_map(|(name, amount)| {
                bound
                    .resources
                    .get(name)
                    .map(|limit| (name.clone(), (*amount).min(*limit)))
            })
            .collect();
        ResourceSet { resources }
    }

    /// True if no resource has a non-zero quantity.
    pub fn is_empty(&self) -> bool {
        self.resources.values().all(|v| v.is_zero())
    }

    /// Number of stored entries, zero-valued ones included.
    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, FixedPoint)> {
        self.resources.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn to_map(&self) -> HashMap<String, f64> {
        self.resources
            .iter()
            .map(|(k, v)| (k.clone(), v.to_f64()))
            .collect()
    }

    fn sorted_nonzero(&self) -> Vec<(&str, FixedPoint)> {
        let mut entries: Vec<_> = self.iter().filter(|(_, v)| !v.is_zero()).collect();
        entries.sort_unstable_by(|a, b| a.0.cmp(b.0));
        entries
    }
}

/// Adds every entry of `rhs` into this set.
impl std::ops::AddAssign<&ResourceSet> for ResourceSet {
    fn add_assign(&mut self, rhs: &ResourceSet) {
        for (name, amount) in &rhs.resources {
            *self
                .resources
                .entry(name.clone())
                .or_insert(FixedPoint::ZERO) += *amount;
        }
    }
}

impl std::ops::Add for &ResourceSet {
    type Output = ResourceSet;
    fn add(self, rhs: &ResourceSet) -> ResourceSet {
        let mut result = self.clone();
        result += rhs;
        result
    }
}

/// Entry-wise difference, saturating at zero. Callers that need rejection
/// instead of saturation use [`ResourceSet::checked_sub`].
impl std::ops::Sub for &ResourceSet {
    type Output = ResourceSet;
    fn sub(self, rhs: &ResourceSet) -> ResourceSet {
        let mut result = self.clone();
        for (name, amount) in &rhs.resources {
            if let Some(entry) = result.resources.get_mut(name) {
                *entry = entry.saturating_sub(*amount);
            }
        }
        result
    }
}

impl PartialEq for ResourceSet {
    fn eq(&self, other: &Self) -> bool {
        self.is_equal(other)
    }
}

impl Eq for ResourceSet {}

impl Hash for ResourceSet {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.sorted_nonzero().hash(state);
    }
}

impl fmt::Display for ResourceSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut entries: Vec<_> = self.iter().collect();
        entries.sort_unstable_by(|a, b| a.0.cmp(b.0));
        f.write_str("{")?;
        for (i, (name, amount)) in entries.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{name}: {amount}")?;
        }
        f.write_str("}")
    }
}

impl fmt::Debug for ResourceSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ResourceSet{self}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn rs(pairs: &[(&str, f64)]) -> ResourceSet {
        ResourceSet::from_map(pairs.iter().map(|(k, v)| (*k, *v)))
    }

    #[test]
    fn test_fixed_point_arithmetic() {
        let a = FixedPoint::from_f64(1.5);
        let b = FixedPoint::from_f64(0.5);
        assert_eq!((a + b).to_f64(), 2.0);
        assert_eq!((a - b).to_f64(), 1.0);
        assert_eq!(b.saturating_sub(a), FixedPoint::ZERO);
    }

    #[test]
    fn test_fixed_point_precision() {
        // 0.0001 is the smallest representable unit (1/10000)
        let tiny = FixedPoint::from_f64(0.0001);
        assert_eq!(tiny.raw(), 1);
        assert!(!tiny.is_zero());
        assert_eq!(
            FixedPoint::from_f64(0.1) + FixedPoint::from_f64(0.2),
            FixedPoint::from_f64(0.3)
        );
    }

    #[test]
    fn test_get_defaults_to_zero() {
        let set = rs(&[("CPU", 4.0)]);
        assert_eq!(set.get("GPU"), FixedPoint::ZERO);
        assert_eq!(set.get("CPU").to_f64(), 4.0);
    }

    #[test]
    fn test_subset_treats_missing_as_zero() {
        let available = rs(&[("CPU", 4.0), ("GPU", 2.0)]);
        assert!(rs(&[("CPU", 2.0), ("GPU", 1.0)]).is_subset_of(&available));
        assert!(!rs(&[("GPU", 3.0)]).is_subset_of(&available));
        assert!(!rs(&[("TPU", 1.0)]).is_subset_of(&available));
        assert!(rs(&[("TPU", 0.0)]).is_subset_of(&available));
        assert!(ResourceSet::new().is_subset_of(&available));
        assert!(available.is_superset_of(&rs(&[("CPU", 4.0)])));
    }

    #[test]
    fn test_checked_sub_rejects_before_mutation() {
        let available = rs(&[("CPU", 4.0)]);
        assert!(available.checked_sub(&rs(&[("CPU", 5.0)])).is_none());
        assert_eq!(available.get("CPU").to_f64(), 4.0);

        let rest = available.checked_sub(&rs(&[("CPU", 4.0)])).unwrap();
        assert_eq!(rest.get("CPU"), FixedPoint::ZERO);
        assert!(rest.contains("CPU"));
    }

    #[test]
    fn test_add_and_operators() {
        let mut a = rs(&[("CPU", 2.0)]);
        let b = rs(&[("CPU", 1.0), ("memory", 1024.0)]);
        a += &b;
        assert_eq!(a.get("CPU").to_f64(), 3.0);
        assert_eq!(a.get("memory").to_f64(), 1024.0);

        let back = &a - &b;
        assert_eq!(back, rs(&[("CPU", 2.0)]));
        assert_eq!(&back + &b, a);
    }

    #[test]
    fn test_add_operator_leaves_operands_untouched() {
        let a = rs(&[("CPU", 2.0), ("GPU", 0.0)]);
        let b = rs(&[("CPU", 0.5), ("custom", 3.0)]);
        let sum = &a + &b;
        assert_eq!(sum, rs(&[("CPU", 2.5), ("custom", 3.0)]));
        assert!(sum.contains("GPU"));
        assert_eq!(a, rs(&[("CPU", 2.0)]));
        assert_eq!(b, rs(&[("CPU", 0.5), ("custom", 3.0)]));
        assert_eq!(&ResourceSet::new() + &b, b);
    }

    #[test]
    fn test_fixed_point_saturates_on_large_quantities() {
        let huge = FixedPoint::from_f64(1e300);
        assert_eq!(huge.raw(), i64::MAX);
        assert_eq!(huge + FixedPoint::ONE, huge);
        let mut acc = huge;
        acc += huge;
        assert_eq!(acc, huge);
        assert_eq!(FixedPoint::from_f64(-1e300) - huge, FixedPoint::from_f64(-1e300));
        assert_eq!(FixedPoint::ZERO.saturating_sub(huge), FixedPoint::ZERO);
        assert_eq!(FixedPoint::from_f64(f64::NAN), FixedPoint::ZERO);
    }

    #[test]
    fn test_large_quantities_never_go_negative() {
        let mut set = rs(&[("CPU", 1e15)]);
        set += &rs(&[("CPU", 1e15)]);
        assert!(set.get("CPU").is_positive());
        assert_eq!(set.get("CPU").raw(), i64::MAX);

        let clamped = set.clamp_to(&rs(&[("CPU", 4.0)]));
        assert_eq!(clamped.get("CPU").to_f64(), 4.0);
        let rest = &set - &rs(&[("CPU", 1e16)]);
        assert_eq!(rest.get("CPU"), FixedPoint::ZERO);
        assert!(set.iter().all(|(_, v)| !v.is_negative()));
    }

    #[test]
    fn test_equality_ignores_zero_entries() {
        assert_eq!(rs(&[("CPU", 0.0)]), ResourceSet::new());
        assert_ne!(rs(&[("CPU", 1.0)]), rs(&[("CPU", 0.5)]));

        let mut seen = HashSet::new();
        seen.insert(rs(&[("CPU", 2.0), ("GPU", 0.0)]));
        assert!(seen.contains(&rs(&[("CPU", 2.0)])));
        assert!(!seen.contains(&rs(&[("CPU", 1.0)])));
    }

    #[test]
    fn test_clamp_to() {
        let reported = rs(&[("CPU", 8.0), ("GPU", 1.0), ("custom", 3.0)]);
        let total = rs(&[("CPU", 4.0), ("GPU", 2.0)]);
        let clamped = reported.clamp_to(&total);
        assert_eq!(clamped, rs(&[("CPU", 4.0), ("GPU", 1.0)]));
        assert!(!clamped.contains("custom"));
    }

    #[test]
    fn test_negative_quantities_never_stored() {
        let set = rs(&[("CPU", -1.0), ("GPU", 1.0)]);
        assert!(!set.contains("CPU"));
        let mut set = set;
        set.set("GPU", FixedPoint::from_f64(-2.0));
        assert_eq!(set.get("GPU"), FixedPoint::ZERO);
    }

    #[test]
    fn test_display_is_sorted() {
        let set = rs(&[("memory", 100.0), ("CPU", 0.5)]);
        assert_eq!(set.to_string(), "{CPU: 0.5, memory: 100}");
    }
}
