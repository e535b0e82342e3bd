//! Value conversion between convertible units.
//!
//! Every conversion is a linear map `out = v * factor + shift` derived from
//! the two units' scales and affine offsets, so it applies equally to `f32`
//! and `f64` lanes and leaves NaN (missing) values NaN.

use num_traits::Float;
use thiserror::Error;

use crate::unit::Unit;

/// Errors raised by unit conversion and unit arithmetic.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum UnitError {
    #[error("cannot convert from {from} to {to}")]
    Inconvertible { from: Unit, to: Unit },

    /// Unit algebra on an affine or logarithmic unit, or an exponent
    /// outside the `i8` range.
    #[error("{op} is undefined for unit {unit}")]
    Algebra { op: &'static str, unit: Unit },

    #[error("{what}: expected {expected} units, found {found}")]
    Arity {
        what: &'static str,
        expected: usize,
        found: usize,
    },
}

/// The linear map taking values in one unit to another.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Conversion {
    pub factor: f64,
    pub shift: f64,
}

impl Conversion {
    pub const IDENTITY: Conversion = Conversion {
        factor: 1.0,
        shift: 0.0,
    };

    /// Build the map from `from` to `to`.
    pub fn between(from: &Unit, to: &Unit) -> Result<Self, UnitError> {
        if !from.can_convert(to) {
            return Err(UnitError::Inconvertible {
                from: *from,
                to: *to,
            });
        }
        if from.is_promiscuous() || to.is_promiscuous() || from == to {
            return Ok(Self::IDENTITY);
        }
        if from.is_logarithmic() {
            // can_convert admits only identical logarithmic scales
            return Ok(Self::IDENTITY);
        }
        Ok(Conversion {
            factor: from.scale() / to.scale(),
            shift: (from.offset() - to.offset()) / to.scale(),
        })
    }

    pub fn is_identity(&self) -> bool {
        *self == Self::IDENTITY
    }

    #[inline]
    pub fn apply<T: Float>(&self, value: T) -> T {
        let factor = T::from(self.factor).unwrap_or_else(T::one);
        let shift = T::from(self.shift).unwrap_or_else(T::zero);
        value * factor + shift
    }

    /// Apply to a slice in place.
    pub fn apply_slice<T: Float>(&self, values: &mut [T]) {
        if self.is_identity() {
            return;
        }
        let factor = T::from(self.factor).unwrap_or_else(T::one);
        let shift = T::from(self.shift).unwrap_or_else(T::zero);
        for v in values.iter_mut() {
            *v = *v * factor + shift;
        }
    }
}

/// Convert a single value.
pub fn convert_value(value: f64, from: &Unit, to: &Unit) -> Result<f64, UnitError> {
    Ok(Conversion::between(from, to)?.apply(value))
}

/// Convert a slice of values in place.
pub fn convert_values<T: Float>(values: &mut [T], from: &Unit, to: &Unit) -> Result<(), UnitError> {
    Conversion::between(from, to)?.apply_slice(values);
    Ok(())
}

/// Convert a component-major tuple of value columns in place.
///
/// Components where either side has no unit are left untouched.
pub fn convert_tuple<T: Float>(
    columns: &mut [Vec<T>],
    from: &[Option<Unit>],
    to: &[Option<Unit>],
) -> Result<(), UnitError> {
    if from.len() != columns.len() || to.len() != columns.len() {
        return Err(UnitError::Arity {
            what: "convert_tuple",
            expected: columns.len(),
            found: from.len().min(to.len()),
        });
    }
    for ((column, f), t) in columns.iter_mut().zip(from).zip(to) {
        if let (Some(f), Some(t)) = (f, t) {
            convert_values(column, f, t)?;
        }
    }
    Ok(())
}
