//! Per-component value spaces.
//!
//! A finite value space enumerates the legal values of a range component so
//! they can be stored as small integer indices. A continuous space stores
//! values directly at its floating precision.

use std::fmt::Debug;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::real::Precision;
use crate::sets::grid::LinearAxis;

pub type ValueSpaceRef = Arc<dyn ValueSpace>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpaceKind {
    Continuous(Precision),
    Finite { cardinality: usize },
}

pub trait ValueSpace: Debug + Send + Sync {
    fn kind(&self) -> SpaceKind;

    /// Index of the closest legal value, or None when `value` is outside the
    /// space (always None for continuous spaces).
    fn value_to_index(&self, value: f64) -> Option<usize>;

    /// Value at `index`, NaN when out of range.
    fn index_to_value(&self, index: usize) -> f64;

    fn cardinality(&self) -> Option<usize> {
        match self.kind() {
            SpaceKind::Finite { cardinality } => Some(cardinality),
            SpaceKind::Continuous(_) => None,
        }
    }
}

/// Unbounded reals at a fixed precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContinuousSpace {
    precision: Precision,
}

impl ContinuousSpace {
    pub const fn new(precision: Precision) -> Self {
        Self { precision }
    }

    pub const fn single() -> Self {
        Self::new(Precision::Single)
    }

    pub const fn double() -> Self {
        Self::new(Precision::Double)
    }

    pub fn shared(precision: Precision) -> ValueSpaceRef {
        Arc::new(Self::new(precision))
    }
}

impl ValueSpace for ContinuousSpace {
    fn kind(&self) -> SpaceKind {
        SpaceKind::Continuous(self.precision)
    }

    fn value_to_index(&self, _value: f64) -> Option<usize> {
        None
    }

    fn index_to_value(&self, _index: usize) -> f64 {
        f64::NAN
    }
}

/// `count` evenly spaced legal values from `first` to `last`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearSpace {
    axis: LinearAxis,
}

impl LinearSpace {
    pub fn new(first: f64, last: f64, count: usize) -> Result<Self> {
        Ok(Self {
            axis: LinearAxis::new(first, last, count)?,
        })
    }

    pub fn axis(&self) -> &LinearAxis {
        &self.axis
    }
}

impl ValueSpace for LinearSpace {
    fn kind(&self) -> SpaceKind {
        SpaceKind::Finite {
            cardinality: self.axis.count(),
        }
    }

    fn value_to_index(&self, value: f64) -> Option<usize> {
        self.axis.nearest(value)
    }

    fn index_to_value(&self, index: usize) -> f64 {
        self.axis.value(index)
    }
}

/// The integers `0..count`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntegerSpace {
    count: usize,
}

impl IntegerSpace {
    pub fn new(count: usize) -> Result<Self> {
        if count == 0 {
            return Err(Error::InvalidSet("integer space needs at least one value".into()));
        }
        Ok(Self { count })
    }
}

impl ValueSpace for IntegerSpace {
    fn kind(&self) -> SpaceKind {
        SpaceKind::Finite {
            cardinality: self.count,
        }
    }

    fn value_to_index(&self, value: f64) -> Option<usize> {
        let rounded = value.round();
        if !value.is_finite() || (value - rounded).abs() > 0.5 || rounded < 0.0 {
            return None;
        }
        let index = rounded as usize;
        (index < self.count).then_some(index)
    }

    fn index_to_value(&self, index: usize) -> f64 {
        if index < self.count {
            index as f64
        } else {
            f64::NAN
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linear_space_lookup() {
        let space = LinearSpace::new(1.0, 4.0, 4).unwrap();
        assert_eq!(space.kind(), SpaceKind::Finite { cardinality: 4 });
        assert_eq!(space.value_to_index(3.0), Some(2));
        assert_eq!(space.index_to_value(2), 3.0);
        assert_eq!(space.value_to_index(9.0), None);
        assert!(space.index_to_value(4).is_nan());
    }

    #[test]
    fn test_integer_space() {
        let space = IntegerSpace::new(300).unwrap();
        assert_eq!(space.cardinality(), Some(300));
        assert_eq!(space.value_to_index(299.2), Some(299));
        assert_eq!(space.value_to_index(-0.2), Some(0));
        assert_eq!(space.value_to_index(300.0), None);
        assert_eq!(space.value_to_index(f64::NAN), None);
    }

    #[test]
    fn test_continuous_space_is_not_enumerable() {
        let space = ContinuousSpace::double();
        assert_eq!(space.cardinality(), None);
        assert_eq!(space.value_to_index(1.0), None);
    }
}
