//! Integration test harness for flatfield.
//!
//! This crate provides fixture builders for end-to-end testing of the store
//! pipeline: Declare types → Build store → Pack → Operate → Verify.

use std::sync::Arc;

use flatfield::{
    DomainSetRef, ErrorEstimate, ErrorMode, FieldPolicy, FunctionType, IrregularSet1D, LinearSet,
    RangeStore, RangeType, RealTupleType, RealType, SamplingMode, ValueSpaceRef,
};
use flatfield_units::Unit;

/// Builder for range stores over a one-dimensional domain.
pub struct FieldHarness {
    domain: DomainSetRef,
    domain_type: RealType,
    range: Vec<RealType>,
    spaces: Option<Vec<ValueSpaceRef>>,
    policy: FieldPolicy,
}

impl FieldHarness {
    /// Evenly spaced domain of `count` points from `first` to `last`.
    ///
    /// # Panics
    ///
    /// Panics if the axis is invalid.
    pub fn linear(first: f64, last: f64, count: usize) -> Self {
        let domain = LinearSet::linear_1d(first, last, count, None).expect("invalid linear axis");
        Self::over(Arc::new(domain))
    }

    /// Domain at arbitrary sorted points.
    ///
    /// # Panics
    ///
    /// Panics if the points are not distinct and finite.
    pub fn irregular(points: Vec<f64>) -> Self {
        let domain = IrregularSet1D::new(points, None).expect("invalid irregular points");
        Self::over(Arc::new(domain))
    }

    /// Use an existing domain sampling.
    pub fn over(domain: DomainSetRef) -> Self {
        Self {
            domain,
            domain_type: RealType::new("x", None),
            range: Vec::new(),
            spaces: None,
            policy: FieldPolicy::default(),
        }
    }

    /// Append a range component.
    pub fn component(mut self, name: &str, unit: Option<Unit>) -> Self {
        self.range.push(RealType::new(name, unit));
        self
    }

    /// Value spaces for the range components, in order.
    pub fn spaces(mut self, spaces: Vec<ValueSpaceRef>) -> Self {
        self.spaces = Some(spaces);
        self
    }

    pub fn policy(mut self, policy: FieldPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// The declared function type: a real range for one component, a real
    /// tuple otherwise.
    pub fn function_type(&self) -> FunctionType {
        let range = match self.range.as_slice() {
            [single] => RangeType::Real(single.clone()),
            many => RangeType::RealTuple(RealTupleType::new(many.to_vec())),
        };
        FunctionType::new(RealTupleType::new(vec![self.domain_type.clone()]), range)
    }

    pub fn domain(&self) -> DomainSetRef {
        self.domain.clone()
    }

    /// Build an empty (missing) store.
    ///
    /// # Panics
    ///
    /// Panics if the declaration is inconsistent.
    pub fn build(&self) -> RangeStore {
        let mut builder =
            RangeStore::builder(self.function_type(), self.domain.clone()).policy(self.policy);
        if let Some(spaces) = &self.spaces {
            builder = builder.range_spaces(spaces.clone());
        }
        builder.build().expect("store construction failed")
    }

    /// Build a store and pack `values`, component-major.
    ///
    /// # Panics
    ///
    /// Panics if construction or packing fails.
    pub fn with_values(&self, values: Vec<Vec<f64>>) -> RangeStore {
        let store = self.build();
        store.set_samples(values, None).expect("packing failed");
        store
    }

    /// Build a store, pack `values` and attach one error estimate per
    /// component.
    ///
    /// # Panics
    ///
    /// Panics if construction or packing fails.
    pub fn with_errors(&self, values: Vec<Vec<f64>>, errors: &[f64]) -> RangeStore {
        let estimates = values
            .iter()
            .zip(errors)
            .zip(&self.range)
            .map(|((column, error), real)| {
                ErrorEstimate::for_values(column, *error, real.default_unit().copied())
            })
            .collect();
        let store = self.build();
        store.set_samples(values, Some(estimates)).expect("packing failed");
        store
    }
}

/// Resample with `mode`, dropping error estimates, and always yield an
/// owned store.
///
/// # Panics
///
/// Panics if resampling fails.
pub fn resampled(store: &RangeStore, set: DomainSetRef, mode: SamplingMode) -> RangeStore {
    store
        .resample(set, mode, ErrorMode::NoErrors)
        .expect("resample failed")
        .into_owned()
}

/// Assert two columns agree within `tolerance`, treating NaN as equal to NaN.
///
/// # Panics
///
/// Panics on the first differing element.
pub fn assert_close(actual: &[f64], expected: &[f64], tolerance: f64) {
    assert_eq!(actual.len(), expected.len(), "length mismatch");
    for (i, (a, e)) in actual.iter().zip(expected).enumerate() {
        if a.is_nan() && e.is_nan() {
            continue;
        }
        assert!(
            (a - e).abs() <= tolerance,
            "element {i}: {a} differs from {e} by more than {tolerance}"
        );
    }
}
