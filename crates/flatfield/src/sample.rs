//! Structured single-sample values.
//!
//! A [`Sample`] is one range tuple with its units, error estimates and
//! coordinate systems: what `get_sample` returns, what `set_sample` accepts,
//! and the scalar operand form of binary arithmetic.

use flatfield_units::Unit;

use crate::coord::CoordinateSystemRef;
use crate::error::{Error, Result};
use crate::error_estimate::ErrorEstimate;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Scalar {
    value: f64,
    unit: Option<Unit>,
    error: Option<ErrorEstimate>,
}

impl Scalar {
    pub fn new(value: f64, unit: Option<Unit>) -> Self {
        Self {
            value,
            unit,
            error: None,
        }
    }

    pub fn missing(unit: Option<Unit>) -> Self {
        Self::new(f64::NAN, unit)
    }

    pub fn with_error(mut self, error: Option<ErrorEstimate>) -> Self {
        self.error = error;
        self
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn unit(&self) -> Option<&Unit> {
        self.unit.as_ref()
    }

    pub fn error(&self) -> Option<&ErrorEstimate> {
        self.error.as_ref()
    }

    pub fn is_missing(&self) -> bool {
        self.value.is_nan()
    }
}

#[derive(Debug, Clone)]
pub enum Sample {
    Real(Scalar),
    RealTuple {
        components: Vec<Scalar>,
        coordinate_system: Option<CoordinateSystemRef>,
    },
    Tuple(Vec<Sample>),
}

impl Sample {
    pub fn real(value: f64, unit: Option<Unit>) -> Self {
        Sample::Real(Scalar::new(value, unit))
    }

    pub fn real_tuple(components: Vec<Scalar>) -> Self {
        Sample::RealTuple {
            components,
            coordinate_system: None,
        }
    }

    /// All scalars in flattened order.
    pub fn scalars(&self) -> Vec<Scalar> {
        match self {
            Sample::Real(s) => vec![*s],
            Sample::RealTuple { components, .. } => components.clone(),
            Sample::Tuple(items) => items.iter().flat_map(Sample::scalars).collect(),
        }
    }

    pub fn dimension(&self) -> usize {
        match self {
            Sample::Real(_) => 1,
            Sample::RealTuple { components, .. } => components.len(),
            Sample::Tuple(items) => items.iter().map(Sample::dimension).sum(),
        }
    }

    /// True when every scalar is missing.
    pub fn is_missing(&self) -> bool {
        self.scalars().iter().all(Scalar::is_missing)
    }

    /// Flattened values.
    pub fn values(&self) -> Vec<f64> {
        self.scalars().iter().map(Scalar::value).collect()
    }

    /// Coordinate-bearing groups: each top-level real or real tuple with its
    /// coordinate system, in order.
    pub(crate) fn groups(&self) -> Result<Vec<(Vec<Scalar>, Option<CoordinateSystemRef>)>> {
        match self {
            Sample::Real(s) => Ok(vec![(vec![*s], None)]),
            Sample::RealTuple {
                components,
                coordinate_system,
            } => Ok(vec![(components.clone(), coordinate_system.clone())]),
            Sample::Tuple(items) => items
                .iter()
                .map(|item| match item {
                    Sample::Real(s) => Ok((vec![*s], None)),
                    Sample::RealTuple {
                        components,
                        coordinate_system,
                    } => Ok((components.clone(), coordinate_system.clone())),
                    Sample::Tuple(_) => Err(Error::TypeMismatch(
                        "nested tuples are not valid range samples".into(),
                    )),
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flatten() {
        let sample = Sample::Tuple(vec![
            Sample::real(1.0, Some(Unit::kelvin())),
            Sample::real_tuple(vec![Scalar::new(2.0, None), Scalar::missing(None)]),
        ]);
        assert_eq!(sample.dimension(), 3);
        assert_eq!(sample.scalars()[1].value(), 2.0);
        assert!(!sample.is_missing());
        assert_eq!(sample.groups().unwrap().len(), 2);
    }

    #[test]
    fn test_nested_tuple_rejected() {
        let sample = Sample::Tuple(vec![Sample::Tuple(vec![])]);
        assert!(matches!(sample.groups(), Err(Error::TypeMismatch(_))));
    }
}
