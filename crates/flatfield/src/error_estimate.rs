//! Per-component uncertainty estimates and their propagation rules.
//!
//! An [`ErrorEstimate`] summarises every sample of one range component: an
//! error magnitude, the mean of the non-missing samples it was derived from,
//! the number of those samples, and the unit both are expressed in.
//!
//! Propagation follows first-order partial derivatives evaluated at the
//! operand means; the per-operand contributions are combined by the
//! [`ErrorMode`] (root-sum-of-squares or linear sum).

use std::f64::consts::PI;

use flatfield_units::{Conversion, Unit, UnitError};
use serde::{Deserialize, Serialize};

use crate::engine::ops::{BinaryOp, UnaryOp};
use crate::policy::ErrorMode;
use crate::real::{finite_mean, Real};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ErrorEstimate {
    error: f64,
    mean: f64,
    count: usize,
    unit: Option<Unit>,
}

impl ErrorEstimate {
    pub fn new(error: f64, mean: f64, count: usize, unit: Option<Unit>) -> Self {
        Self {
            error: error.abs(),
            mean,
            count,
            unit,
        }
    }

    /// Estimate for a column of values sharing one error magnitude.
    ///
    /// Returns None when the magnitude is not finite.
    pub fn for_values<T: Real>(values: &[T], error: f64, unit: Option<Unit>) -> Option<Self> {
        if !error.is_finite() {
            return None;
        }
        let count = values.iter().filter(|v| !v.is_nan()).count();
        let mean = finite_mean(values).unwrap_or(f64::NAN);
        Some(Self::new(error, mean, count, unit))
    }

    pub fn error(&self) -> f64 {
        self.error
    }

    pub fn mean(&self) -> f64 {
        self.mean
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn unit(&self) -> Option<&Unit> {
        self.unit.as_ref()
    }

    pub fn with_unit(mut self, unit: Option<Unit>) -> Self {
        self.unit = unit;
        self
    }

    /// Re-express the estimate in another unit.
    ///
    /// The interval `mean ± error/2` is converted endpoint by endpoint; the new
    /// mean is its midpoint and the new error its width. An estimate without
    /// a unit simply adopts `to`.
    pub fn convert(&self, to: &Unit) -> Result<Self, UnitError> {
        let Some(from) = self.unit else {
            return Ok(self.with_unit(Some(*to)));
        };
        let conversion = Conversion::between(&from, to)?;
        if conversion.is_identity() {
            return Ok(self.with_unit(Some(*to)));
        }
        let lo = conversion.apply(self.mean - self.error / 2.0);
        let hi = conversion.apply(self.mean + self.error / 2.0);
        Ok(Self::new(hi - lo, (lo + hi) / 2.0, self.count, Some(*to)))
    }

    /// Fold one more sample into a running estimate.
    pub fn accumulate(&self, value: f64, error: f64) -> Self {
        if value.is_nan() || !error.is_finite() {
            return *self;
        }
        let n = self.count as f64;
        let mean = if self.count == 0 || self.mean.is_nan() {
            value
        } else {
            (self.mean * n + value) / (n + 1.0)
        };
        let error = (self.error * n + error.abs()) / (n + 1.0);
        Self::new(error, mean, self.count + 1, self.unit)
    }

    /// Error of `op(a, b)`, or None when an input is absent, the mode does
    /// not track errors, or the result is not finite.
    pub fn binary(
        op: BinaryOp,
        a: Option<&ErrorEstimate>,
        b: Option<&ErrorEstimate>,
        mode: ErrorMode,
        mean: f64,
        count: usize,
        unit: Option<Unit>,
    ) -> Option<Self> {
        if !mode.tracks_errors() {
            return None;
        }
        let (a, b) = (a?, b?);
        let (x, y) = if op.is_reversed() { (b, a) } else { (a, b) };
        let (e1, e2, m1, m2) = (x.error, y.error, x.mean, y.mean);

        let error = match op.forward() {
            BinaryOp::Multiply => mode.combine(m2.abs() * e1, m1.abs() * e2),
            BinaryOp::Divide => mode.combine(e1 / m2.abs(), m1.abs() * e2 / (m2 * m2)),
            BinaryOp::Pow => mode.combine(
                (m2 * m1.powf(m2 - 1.0)).abs() * e1,
                (m1.powf(m2) * m1.ln()).abs() * e2,
            ),
            BinaryOp::Atan2 | BinaryOp::Atan2Degrees => {
                let d = m1 * m1 + m2 * m2;
                let radians = mode.combine(m2.abs() / d * e1, m1.abs() / d * e2);
                if op.yields_degrees() {
                    radians * 180.0 / PI
                } else {
                    radians
                }
            }
            _ => mode.combine(e1, e2),
        };

        error
            .is_finite()
            .then(|| Self::new(error, mean, count, unit))
    }

    /// Error of `op(a)`; same absence rules as [`ErrorEstimate::binary`].
    ///
    /// `a` must already be expressed in the unit the operator consumes
    /// (degrees for the degree-input trigonometric operators).
    pub fn unary(
        op: UnaryOp,
        a: Option<&ErrorEstimate>,
        mode: ErrorMode,
        mean: f64,
        count: usize,
        unit: Option<Unit>,
    ) -> Option<Self> {
        if !mode.tracks_errors() {
            return None;
        }
        let a = a?;
        let (e, m) = (a.error, a.mean);
        let to_rad = PI / 180.0;
        let to_deg = 180.0 / PI;

        let error = match op {
            UnaryOp::Abs
            | UnaryOp::Ceil
            | UnaryOp::Floor
            | UnaryOp::Rint
            | UnaryOp::Round
            | UnaryOp::Negate
            | UnaryOp::Nop => e,
            UnaryOp::Sqrt => e / (2.0 * m.abs().sqrt()),
            UnaryOp::Exp => e * m.exp(),
            UnaryOp::Log => e / m.abs(),
            UnaryOp::Sin => m.cos().abs() * e,
            UnaryOp::SinDegrees => (m * to_rad).cos().abs() * e * to_rad,
            UnaryOp::Cos => m.sin().abs() * e,
            UnaryOp::CosDegrees => (m * to_rad).sin().abs() * e * to_rad,
            UnaryOp::Tan => e / (m.cos() * m.cos()),
            UnaryOp::TanDegrees => {
                let c = (m * to_rad).cos();
                e * to_rad / (c * c)
            }
            UnaryOp::Asin | UnaryOp::Acos => e / (1.0 - m * m).sqrt(),
            UnaryOp::AsinDegrees | UnaryOp::AcosDegrees => e / (1.0 - m * m).sqrt() * to_deg,
            UnaryOp::Atan => e / (1.0 + m * m),
            UnaryOp::AtanDegrees => e / (1.0 + m * m) * to_deg,
        };

        error
            .is_finite()
            .then(|| Self::new(error, mean, count, unit))
    }
}
