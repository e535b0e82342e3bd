//! Floating element types for the numeric pipeline.
//!
//! The engines are written once, generic over [`Real`], and instantiated for
//! `f32` or `f64` according to [`Precision::for_operands`].

use std::fmt::Debug;

use num_traits::Float;
use serde::{Deserialize, Serialize};

use crate::codec::Encoding;

/// Floating-point precision of a computation or a continuous value space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Precision {
    Single,
    Double,
}

impl Precision {
    /// Precision of an operation over the given component encodings: double
    /// when any component of either operand is stored as `f64`, single
    /// otherwise.
    pub fn for_operands(left: &[Encoding], right: &[Encoding]) -> Precision {
        if left
            .iter()
            .chain(right.iter())
            .any(|e| *e == Encoding::Double)
        {
            Precision::Double
        } else {
            Precision::Single
        }
    }
}

/// A floating element type the range pipeline can run on.
pub trait Real: Float + Default + Debug + Send + Sync + 'static {
    const PRECISION: Precision;

    /// Narrow or keep an `f64`.
    fn lift(value: f64) -> Self;

    /// Widen to `f64`.
    fn widen(self) -> f64;

    /// Take ownership of a column as `f64`, without copying when `Self` is
    /// already `f64`.
    fn into_doubles(values: Vec<Self>) -> Vec<f64>;

    /// Take ownership of a column as `f32`, without copying when `Self` is
    /// already `f32`.
    fn into_singles(values: Vec<Self>) -> Vec<f32>;

    fn from_doubles(values: &[f64]) -> Vec<Self> {
        values.iter().map(|v| Self::lift(*v)).collect()
    }

    fn from_singles(values: &[f32]) -> Vec<Self> {
        values.iter().map(|v| Self::lift(f64::from(*v))).collect()
    }
}

impl Real for f64 {
    const PRECISION: Precision = Precision::Double;

    #[inline]
    fn lift(value: f64) -> Self {
        value
    }

    #[inline]
    fn widen(self) -> f64 {
        self
    }

    fn into_doubles(values: Vec<Self>) -> Vec<f64> {
        values
    }

    fn into_singles(values: Vec<Self>) -> Vec<f32> {
        values.into_iter().map(|v| v as f32).collect()
    }

    fn from_doubles(values: &[f64]) -> Vec<Self> {
        values.to_vec()
    }
}

impl Real for f32 {
    const PRECISION: Precision = Precision::Single;

    #[inline]
    fn lift(value: f64) -> Self {
        value as f32
    }

    #[inline]
    fn widen(self) -> f64 {
        f64::from(self)
    }

    fn into_doubles(values: Vec<Self>) -> Vec<f64> {
        values.into_iter().map(f64::from).collect()
    }

    fn into_singles(values: Vec<Self>) -> Vec<f32> {
        values
    }

    fn from_singles(values: &[f32]) -> Vec<Self> {
        values.to_vec()
    }
}

/// Convert every column of a component-major tuple to another element type.
pub fn cast_columns<S: Real, T: Real>(columns: Vec<Vec<S>>) -> Vec<Vec<T>> {
    columns
        .into_iter()
        .map(|column| match T::PRECISION {
            Precision::Double => T::from_doubles(&S::into_doubles(column)),
            Precision::Single => T::from_singles(&S::into_singles(column)),
        })
        .collect()
}

/// Mean of the non-missing values of a column, or None when all are missing.
pub fn finite_mean<T: Real>(values: &[T]) -> Option<f64> {
    let (sum, count) = values
        .iter()
        .filter(|v| !v.is_nan())
        .fold((0.0, 0usize), |(s, n), v| (s + v.widen(), n + 1));
    (count > 0).then(|| sum / count as f64)
}
