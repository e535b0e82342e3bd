//! Physical units as SI exponent vectors plus a kind tag.
//!
//! A [`Unit`] is a scale relative to the coherent SI unit of its
//! [`UnitDimensions`], refined by a [`UnitKind`]:
//!
//! | Kind | `*` `/` `pow` | `absolute()` | converts to |
//! |------|---------------|--------------|-------------|
//! | Multiplicative | yes | itself | same dimensions |
//! | Affine (°C, °F) | no | the multiplicative scale | same dimensions |
//! | Logarithmic (dB) | no | itself | the identical scale only |
//! | Promiscuous | adopts the other operand | itself | anything |
//!
//! ```rust
//! # use flatfield_units::unit::*;
//! let speed = Unit::meters().divide(&Unit::seconds()).unwrap();
//! assert_eq!(speed.dims().exponent(Dimension::Time), -1);
//! assert_eq!(Unit::celsius().absolute(), Unit::kelvin());
//! ```

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::fmt;

use crate::convert::UnitError;

/// SI base quantities, plus plane angle.
///
/// Angle is dimensionless in SI; it is tracked here so degree and radian
/// values are not mistaken for plain ratios.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Dimension {
    Length,
    Mass,
    Time,
    Temperature,
    Current,
    Amount,
    Luminosity,
    Angle,
}

impl Dimension {
    pub const ALL: [Dimension; 8] = [
        Dimension::Length,
        Dimension::Mass,
        Dimension::Time,
        Dimension::Temperature,
        Dimension::Current,
        Dimension::Amount,
        Dimension::Luminosity,
        Dimension::Angle,
    ];

    pub const fn symbol(self) -> &'static str {
        match self {
            Dimension::Length => "m",
            Dimension::Mass => "kg",
            Dimension::Time => "s",
            Dimension::Temperature => "K",
            Dimension::Current => "A",
            Dimension::Amount => "mol",
            Dimension::Luminosity => "cd",
            Dimension::Angle => "rad",
        }
    }

    const fn slot(self) -> usize {
        self as usize
    }
}

/// Exponents of each [`Dimension`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct UnitDimensions([i8; 8]);

impl UnitDimensions {
    pub const NONE: UnitDimensions = UnitDimensions([0; 8]);

    /// The dimensions of a single base quantity.
    pub const fn of(dim: Dimension) -> Self {
        Self::NONE.with(dim, 1)
    }

    /// These dimensions with the exponent of `dim` replaced.
    pub const fn with(mut self, dim: Dimension, exponent: i8) -> Self {
        self.0[dim.slot()] = exponent;
        self
    }

    pub const fn exponent(&self, dim: Dimension) -> i8 {
        self.0[dim.slot()]
    }

    pub fn is_none(&self) -> bool {
        self.0.iter().all(|&e| e == 0)
    }

    pub fn is_angle(&self) -> bool {
        *self == Self::of(Dimension::Angle)
    }

    /// Exponents summed, as for a product of units. None on overflow.
    pub fn plus(&self, other: &UnitDimensions) -> Option<UnitDimensions> {
        self.combine(other, i8::checked_add)
    }

    /// Exponents subtracted, as for a quotient of units. None on overflow.
    pub fn minus(&self, other: &UnitDimensions) -> Option<UnitDimensions> {
        self.combine(other, i8::checked_sub)
    }

    pub fn times(&self, n: i8) -> Option<UnitDimensions> {
        self.combine(&Self::NONE, |e, _| e.checked_mul(n))
    }

    /// Exponents halved; None when any exponent is odd.
    pub fn halved(&self) -> Option<UnitDimensions> {
        if self.0.iter().any(|e| e % 2 != 0) {
            return None;
        }
        Some(UnitDimensions(self.0.map(|e| e / 2)))
    }

    fn combine(
        &self,
        other: &UnitDimensions,
        f: impl Fn(i8, i8) -> Option<i8>,
    ) -> Option<UnitDimensions> {
        let mut exps = self.0;
        for (e, o) in exps.iter_mut().zip(other.0) {
            *e = f(*e, o)?;
        }
        Some(UnitDimensions(exps))
    }
}

/// How values in a unit relate to the coherent SI value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum UnitKind {
    /// `si = v * scale`
    Multiplicative,
    /// `si = v * scale + offset`
    Affine { offset: f64 },
    /// A logarithmic scale in the given base.
    Logarithmic { base: f64 },
    /// Unconstrained; adopts the other operand's unit.
    Promiscuous,
}

/// A physical unit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Unit {
    kind: UnitKind,
    dims: UnitDimensions,
    scale: f64,
}

impl Unit {
    /// The unity ratio.
    pub const DIMENSIONLESS: Unit = Unit::linear(UnitDimensions::NONE, 1.0);

    const PROMISCUOUS: Unit = Unit {
        kind: UnitKind::Promiscuous,
        dims: UnitDimensions::NONE,
        scale: 1.0,
    };

    pub const fn new(kind: UnitKind, dims: UnitDimensions, scale: f64) -> Self {
        Unit { kind, dims, scale }
    }

    const fn linear(dims: UnitDimensions, scale: f64) -> Self {
        Unit::new(UnitKind::Multiplicative, dims, scale)
    }

    /// The coherent SI unit of one base quantity.
    pub const fn base(dim: Dimension) -> Self {
        Unit::linear(UnitDimensions::of(dim), 1.0)
    }

    pub const fn dimensionless() -> Self {
        Self::DIMENSIONLESS
    }

    pub const fn promiscuous() -> Self {
        Self::PROMISCUOUS
    }

    pub const fn meters() -> Self {
        Unit::base(Dimension::Length)
    }

    pub const fn kilometers() -> Self {
        Unit::linear(UnitDimensions::of(Dimension::Length), 1000.0)
    }

    pub const fn kilograms() -> Self {
        Unit::base(Dimension::Mass)
    }

    pub const fn seconds() -> Self {
        Unit::base(Dimension::Time)
    }

    pub const fn hours() -> Self {
        Unit::linear(UnitDimensions::of(Dimension::Time), 3600.0)
    }

    pub const fn kelvin() -> Self {
        Unit::base(Dimension::Temperature)
    }

    pub const fn radians() -> Self {
        Unit::base(Dimension::Angle)
    }

    pub const fn degrees() -> Self {
        Unit::linear(UnitDimensions::of(Dimension::Angle), PI / 180.0)
    }

    /// kg·m⁻¹·s⁻²
    pub const fn pascals() -> Self {
        let dims = UnitDimensions::NONE
            .with(Dimension::Mass, 1)
            .with(Dimension::Length, -1)
            .with(Dimension::Time, -2);
        Unit::linear(dims, 1.0)
    }

    pub const fn percent() -> Self {
        Unit::linear(UnitDimensions::NONE, 0.01)
    }

    pub const fn celsius() -> Self {
        Unit::new(
            UnitKind::Affine { offset: 273.15 },
            UnitDimensions::of(Dimension::Temperature),
            1.0,
        )
    }

    pub const fn fahrenheit() -> Self {
        // K = (°F + 459.67) * 5/9
        Unit::new(
            UnitKind::Affine {
                offset: 459.67 * 5.0 / 9.0,
            },
            UnitDimensions::of(Dimension::Temperature),
            5.0 / 9.0,
        )
    }

    pub const fn decibels() -> Self {
        Unit::new(UnitKind::Logarithmic { base: 10.0 }, UnitDimensions::NONE, 1.0)
    }

    pub const fn kind(&self) -> &UnitKind {
        &self.kind
    }

    pub const fn dims(&self) -> &UnitDimensions {
        &self.dims
    }

    pub const fn scale(&self) -> f64 {
        self.scale
    }

    /// SI value of this unit's zero; 0.0 unless affine.
    pub const fn offset(&self) -> f64 {
        match self.kind {
            UnitKind::Affine { offset } => offset,
            _ => 0.0,
        }
    }

    pub fn is_dimensionless(&self) -> bool {
        !self.is_promiscuous() && self.dims.is_none()
    }

    pub fn is_multiplicative(&self) -> bool {
        self.kind == UnitKind::Multiplicative
    }

    pub fn is_affine(&self) -> bool {
        matches!(self.kind, UnitKind::Affine { .. })
    }

    pub fn is_logarithmic(&self) -> bool {
        matches!(self.kind, UnitKind::Logarithmic { .. })
    }

    pub fn is_promiscuous(&self) -> bool {
        self.kind == UnitKind::Promiscuous
    }

    // ============================================================================
    // Algebra
    // ============================================================================

    /// This unit with its scale multiplied by `factor`. Multiplicative only.
    pub fn scaled(&self, factor: f64) -> Option<Unit> {
        self.is_multiplicative()
            .then(|| Unit::linear(self.dims, self.scale * factor))
    }

    /// The form in which ratios of values are meaningful: °C and °F drop
    /// their offset, every other kind is returned unchanged.
    pub fn absolute(&self) -> Unit {
        if self.is_affine() {
            Unit::linear(self.dims, self.scale)
        } else {
            *self
        }
    }

    /// Product of two units.
    ///
    /// Fails for affine and logarithmic operands and when an exponent leaves
    /// the `i8` range.
    pub fn multiply(&self, other: &Unit) -> Result<Unit, UnitError> {
        if self.is_promiscuous() {
            return Ok(*other);
        }
        if other.is_promiscuous() {
            return Ok(*self);
        }
        self.require_linear("multiply", other)?;
        let dims = self.dims.plus(&other.dims).ok_or(UnitError::Algebra {
            op: "multiply",
            unit: *self,
        })?;
        Ok(Unit::linear(dims, self.scale * other.scale))
    }

    /// Quotient of two units. Fails like [`multiply`](Self::multiply).
    pub fn divide(&self, other: &Unit) -> Result<Unit, UnitError> {
        if other.is_promiscuous() {
            return Ok(*self);
        }
        if self.is_promiscuous() {
            return other.pow(-1);
        }
        self.require_linear("divide", other)?;
        let dims = self.dims.minus(&other.dims).ok_or(UnitError::Algebra {
            op: "divide",
            unit: *self,
        })?;
        Ok(Unit::linear(dims, self.scale / other.scale))
    }

    pub fn pow(&self, n: i8) -> Result<Unit, UnitError> {
        if self.is_promiscuous() {
            return Ok(*self);
        }
        self.require_linear("pow", self)?;
        let dims = self.dims.times(n).ok_or(UnitError::Algebra {
            op: "pow",
            unit: *self,
        })?;
        Ok(Unit::linear(dims, self.scale.powi(i32::from(n))))
    }

    /// Square root; fails unless every exponent is even (m² → m, m → error).
    pub fn sqrt(&self) -> Result<Unit, UnitError> {
        if self.is_promiscuous() {
            return Ok(*self);
        }
        self.require_linear("sqrt", self)?;
        let dims = self.dims.halved().ok_or(UnitError::Algebra {
            op: "sqrt",
            unit: *self,
        })?;
        Ok(Unit::linear(dims, self.scale.sqrt()))
    }

    fn require_linear(&self, op: &'static str, other: &Unit) -> Result<(), UnitError> {
        match [self, other].into_iter().find(|u| !u.is_multiplicative()) {
            Some(unit) => Err(UnitError::Algebra { op, unit: *unit }),
            None => Ok(()),
        }
    }

    /// Whether values in `self` can be expressed in `other`.
    ///
    /// A promiscuous unit converts both ways with anything. Logarithmic
    /// scales convert only to an identical scale. Otherwise the dimensions
    /// must agree.
    pub fn can_convert(&self, other: &Unit) -> bool {
        if self.is_promiscuous() || other.is_promiscuous() {
            return true;
        }
        if self.dims != other.dims {
            return false;
        }
        match (self.kind, other.kind) {
            (UnitKind::Logarithmic { .. }, _) | (_, UnitKind::Logarithmic { .. }) => {
                self == other
            }
            _ => true,
        }
    }

    /// True for ratio-like units such as percent; false for angles.
    pub fn is_convertible_to_dimensionless(&self) -> bool {
        !self.is_promiscuous()
            && !self.is_logarithmic()
            && self.absolute().can_convert(&Unit::DIMENSIONLESS)
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_promiscuous() {
            return f.write_str("*");
        }
        if let UnitKind::Logarithmic { base } = self.kind {
            return write!(f, "log{base}({})", self.dims);
        }
        if self.scale != 1.0 {
            write!(f, "{} ", self.scale)?;
        }
        write!(f, "{}", self.dims)?;
        if let UnitKind::Affine { offset } = self.kind {
            write!(f, " @ {offset}")?;
        }
        Ok(())
    }
}

impl fmt::Display for UnitDimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_none() {
            return f.write_str("1");
        }
        let mut first = true;
        for dim in Dimension::ALL {
            let exp = self.exponent(dim);
            if exp == 0 {
                continue;
            }
            if !first {
                f.write_str("·")?;
            }
            first = false;
            match exp {
                1 => f.write_str(dim.symbol())?,
                _ => write!(f, "{}^{exp}", dim.symbol())?,
            }
        }
        Ok(())
    }
}
