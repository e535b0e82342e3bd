//! Elementwise arithmetic over range stores.
//!
//! Both operations build a new store and never mutate their operands. The
//! precision of the whole computation is decided once by
//! [`Precision::for_operands`]; the pipeline itself is generic over [`Real`].
//!
//! Unit handling per binary family:
//!
//! | Family | Operand conversion | Output unit |
//! |--------|-------------------|-------------|
//! | add, subtract, max, min | both to `absolute(left)` | `absolute(left)` |
//! | multiply, divide | each to its own absolute unit | product / quotient |
//! | pow | both to rational form | base unit if dimensionless, else none |
//! | atan2 | both to `absolute(left)` | radian or degree |
//! | remainder | both to the dividend's absolute unit | that unit |
//!
//! A promiscuous operand adopts the other side's unit; an operand without a
//! unit makes the additive, multiplicative and angular results unit-free.

use flatfield_units::{Conversion, Unit, UnitError};
use tracing::{debug, instrument, trace, warn};

use crate::coord::{transform_coordinates_free_units, Frame};
use crate::engine::ops::{BinaryFamily, BinaryOp, UnaryOp};
use crate::error::{Error, Result};
use crate::error_estimate::ErrorEstimate;
use crate::policy::{ErrorMode, SamplingMode};
use crate::real::{cast_columns, finite_mean, Precision, Real};
use crate::sample::Sample;
use crate::sets::ContinuousSpace;
use crate::store::{RangeStore, StoreParts};
use crate::types::FunctionType;

/// Right-hand operand of [`RangeStore::binary`].
#[derive(Debug, Clone, Copy)]
pub enum Operand<'a> {
    /// Another store; resampled onto the left store's domain when needed.
    Field(&'a RangeStore),
    /// One range value applied at every sample. A single real applies to
    /// every component.
    Value(&'a Sample),
}

/// A column of operand values, or one value broadcast to every sample.
#[derive(Debug, Clone)]
enum Lane<T> {
    Array(Vec<T>),
    Const(T),
}

impl<T: Real> Lane<T> {
    #[inline]
    fn get(&self, index: usize) -> T {
        match self {
            Lane::Array(values) => values.get(index).copied().unwrap_or_else(T::nan),
            Lane::Const(value) => *value,
        }
    }

    fn convert(&mut self, from: Option<&Unit>, to: Option<&Unit>) -> Result<()> {
        match self {
            Lane::Array(values) => convert_column(values, from, to),
            Lane::Const(value) => convert_column(std::slice::from_mut(value), from, to),
        }
    }
}

fn convert_column<T: Real>(values: &mut [T], from: Option<&Unit>, to: Option<&Unit>) -> Result<()> {
    if let (Some(from), Some(to)) = (from, to) {
        Conversion::between(from, to)?.apply_slice(values);
    }
    Ok(())
}

/// Operand values, units and errors, all on the left store's domain and in
/// its coordinate systems.
struct Prepared<T> {
    lanes: Vec<Lane<T>>,
    units: Vec<Option<Unit>>,
    errors: Vec<Option<ErrorEstimate>>,
}

/// Units each side is converted to and the unit of the result.
#[derive(Debug, Clone, Copy, PartialEq)]
struct UnitPlan {
    left: Option<Unit>,
    right: Option<Unit>,
    out: Option<Unit>,
}

/// Absolute unit, reduced to unity when dimensionless.
pub(crate) fn rational_form(unit: Option<Unit>) -> Option<Unit> {
    let unit = unit?;
    if unit.is_promiscuous() {
        return Some(unit);
    }
    let absolute = unit.absolute();
    if absolute.is_convertible_to_dimensionless() {
        Some(Unit::DIMENSIONLESS)
    } else {
        Some(absolute)
    }
}

/// Both sides converted to the absolute form of `primary`'s unit, or of
/// `secondary`'s when `primary` is promiscuous. Returns `(primary_to,
/// secondary_to, shared)`.
fn shared_absolute(
    primary: Option<Unit>,
    secondary: Option<Unit>,
) -> Result<(Option<Unit>, Option<Unit>, Option<Unit>)> {
    let (Some(p), Some(s)) = (primary, secondary) else {
        return Ok((None, None, None));
    };
    if p.is_promiscuous() {
        let target = s.absolute();
        return Ok((None, Some(target), Some(target)));
    }
    let target = p.absolute();
    if s.is_promiscuous() {
        return Ok((Some(target), None, Some(target)));
    }
    if !s.can_convert(&target) {
        return Err(UnitError::Inconvertible {
            from: s,
            to: target,
        }
        .into());
    }
    Ok((Some(target), Some(target), Some(target)))
}

fn plan_units(op: BinaryOp, a: Option<Unit>, b: Option<Unit>) -> Result<UnitPlan> {
    let plan = match op.family() {
        BinaryFamily::Additive => {
            let (left, right, out) = shared_absolute(a, b)?;
            UnitPlan { left, right, out }
        }
        BinaryFamily::Multiplicative => match (a, b) {
            (Some(a), Some(b)) => {
                let (la, lb) = (a.absolute(), b.absolute());
                let product = match op {
                    BinaryOp::Multiply => la.multiply(&lb),
                    BinaryOp::InvDivide => lb.divide(&la),
                    _ => la.divide(&lb),
                };
                let out = match product {
                    Ok(unit) => Some(unit),
                    Err(err) => {
                        warn!(?op, %err, "result unit undefined");
                        None
                    }
                };
                UnitPlan {
                    left: Some(la),
                    right: Some(lb),
                    out,
                }
            }
            _ => UnitPlan {
                left: None,
                right: None,
                out: None,
            },
        },
        BinaryFamily::Power => {
            let (ra, rb) = (rational_form(a), rational_form(b));
            let base = if op.is_reversed() { rb } else { ra };
            let out = match base {
                Some(u) if u.is_promiscuous() || u.is_dimensionless() => Some(u),
                Some(u) => {
                    warn!(?op, base = %u, "power of a dimensioned unit has no unit");
                    None
                }
                None => None,
            };
            UnitPlan {
                left: ra,
                right: rb,
                out,
            }
        }
        BinaryFamily::Angular => {
            let (left, right, shared) = shared_absolute(a, b)?;
            let angle = if op.yields_degrees() {
                Unit::degrees()
            } else {
                Unit::radians()
            };
            UnitPlan {
                left,
                right,
                out: shared.map(|_| angle),
            }
        }
        BinaryFamily::Remainder => {
            if op.is_reversed() {
                let (right, left, out) = shared_absolute(b, a)?;
                UnitPlan { left, right, out }
            } else {
                let (left, right, out) = shared_absolute(a, b)?;
                UnitPlan { left, right, out }
            }
        }
    };
    trace!(?op, ?plan, "reconciled operand units");
    Ok(plan)
}

#[inline]
fn apply_binary<T: Real>(op: BinaryOp, a: T, b: T) -> T {
    match op {
        BinaryOp::Add => a + b,
        BinaryOp::Subtract => a - b,
        BinaryOp::InvSubtract => b - a,
        BinaryOp::Multiply => a * b,
        BinaryOp::Divide => a / b,
        BinaryOp::InvDivide => b / a,
        BinaryOp::Pow => a.powf(b),
        BinaryOp::InvPow => b.powf(a),
        BinaryOp::Max | BinaryOp::Min if a.is_nan() || b.is_nan() => T::nan(),
        BinaryOp::Max => a.max(b),
        BinaryOp::Min => a.min(b),
        BinaryOp::Atan2 => a.atan2(b),
        BinaryOp::Atan2Degrees => a.atan2(b).to_degrees(),
        BinaryOp::InvAtan2 => b.atan2(a),
        BinaryOp::InvAtan2Degrees => b.atan2(a).to_degrees(),
        BinaryOp::Remainder => a % b,
        BinaryOp::InvRemainder => b % a,
    }
}

/// Round half to even.
fn rint<T: Real>(v: T) -> T {
    let half = T::lift(0.5);
    let two = T::lift(2.0);
    if (v - v.trunc()).abs() == half {
        (v / two).round() * two
    } else {
        v.round()
    }
}

#[inline]
fn apply_unary<T: Real>(op: UnaryOp, v: T) -> T {
    match op {
        UnaryOp::Abs => v.abs(),
        UnaryOp::Acos => v.acos(),
        UnaryOp::AcosDegrees => v.acos().to_degrees(),
        UnaryOp::Asin => v.asin(),
        UnaryOp::AsinDegrees => v.asin().to_degrees(),
        UnaryOp::Atan => v.atan(),
        UnaryOp::AtanDegrees => v.atan().to_degrees(),
        UnaryOp::Ceil => v.ceil(),
        UnaryOp::Cos => v.cos(),
        UnaryOp::CosDegrees => v.to_radians().cos(),
        UnaryOp::Exp => v.exp(),
        UnaryOp::Floor => v.floor(),
        UnaryOp::Log => v.ln(),
        UnaryOp::Rint => rint(v),
        UnaryOp::Round => (v + T::lift(0.5)).floor(),
        UnaryOp::Sin => v.sin(),
        UnaryOp::SinDegrees => v.to_radians().sin(),
        UnaryOp::Sqrt => v.sqrt(),
        UnaryOp::Tan => v.tan(),
        UnaryOp::TanDegrees => v.to_radians().tan(),
        UnaryOp::Negate => -v,
        UnaryOp::Nop => v,
    }
}

fn unary_unit(op: UnaryOp, input: Option<Unit>) -> Option<Unit> {
    if op.preserves_unit() {
        return input;
    }
    if op.is_inverse_trig() {
        return Some(if op.uses_degrees() {
            Unit::degrees()
        } else {
            Unit::radians()
        });
    }
    if op.is_direct_trig() {
        return input.map(|_| Unit::DIMENSIONLESS);
    }
    match (op, input) {
        (_, None) => None,
        (UnaryOp::Sqrt, Some(u)) => match u.sqrt() {
            Ok(root) => Some(root),
            Err(err) => {
                warn!(%err, "square root of unit undefined");
                None
            }
        },
        (_, Some(u)) if u.is_dimensionless() || u.is_promiscuous() => Some(u),
        (_, Some(u)) => {
            warn!(?op, unit = %u, "operator requires a dimensionless input");
            None
        }
    }
}

fn convert_error(
    error: Option<ErrorEstimate>,
    from: Option<&Unit>,
    to: Option<&Unit>,
) -> Result<Option<ErrorEstimate>> {
    match (error, from, to) {
        (Some(e), Some(_), Some(to)) => Ok(Some(e.convert(to)?)),
        (e, _, _) => Ok(e),
    }
}

fn column_statistics<T: Real>(column: &[T]) -> (f64, usize) {
    let count = column.iter().filter(|v| !v.is_nan()).count();
    (finite_mean(column).unwrap_or(f64::NAN), count)
}

impl RangeStore {
    /// `op(self, operand)` sample by sample, declared as `new_type`.
    ///
    /// `new_type` must equal this store's type except for names; otherwise
    /// the call fails with [`Error::TypeMismatch`]. Operands are converted
    /// into this store's range coordinate systems before combining.
    ///
    /// A field operand on a different domain sampling is first resampled
    /// onto this store's domain with `sampling`. A missing operand yields a
    /// missing result without touching any sample.
    #[instrument(skip_all, fields(op = ?op, length = self.length()))]
    pub fn binary(
        &self,
        op: BinaryOp,
        operand: Operand<'_>,
        new_type: &FunctionType,
        sampling: SamplingMode,
        error_mode: ErrorMode,
    ) -> Result<RangeStore> {
        if !self.function_type().equals_except_name(new_type) {
            return Err(Error::TypeMismatch(format!(
                "declared result type of {:?} must equal the operand type except for names",
                op
            )));
        }
        if self.is_missing() {
            return self.missing_like(new_type, self.domain().clone());
        }

        match operand {
            Operand::Field(other) => {
                if !self.function_type().range().same_shape(other.function_type().range()) {
                    return Err(Error::TypeMismatch(
                        "operand ranges have different shapes".into(),
                    ));
                }
                if other.is_missing() {
                    return self.missing_like(new_type, self.domain().clone());
                }
                let other = other.resample(self.domain().clone(), sampling, error_mode)?;
                let precision = Precision::for_operands(self.encodings(), other.encodings());
                debug!(?precision, "binary over fields");
                match precision {
                    Precision::Double => self.binary_fields::<f64>(op, &other, new_type, error_mode),
                    Precision::Single => self.binary_fields::<f32>(op, &other, new_type, error_mode),
                }
            }
            Operand::Value(sample) => {
                if sample.is_missing() {
                    return self.missing_like(new_type, self.domain().clone());
                }
                let precision = self.precision();
                debug!(?precision, "binary with value");
                match precision {
                    Precision::Double => self.binary_value::<f64>(op, sample, new_type, error_mode),
                    Precision::Single => self.binary_value::<f32>(op, sample, new_type, error_mode),
                }
            }
        }
    }

    fn binary_fields<T: Real>(
        &self,
        op: BinaryOp,
        other: &RangeStore,
        new_type: &FunctionType,
        error_mode: ErrorMode,
    ) -> Result<RangeStore> {
        let Some(right) = other.snapshot::<T>()? else {
            return self.missing_like(new_type, self.domain().clone());
        };

        let prepared = if self.same_range_coordinates(other) {
            Prepared {
                lanes: right.values.into_iter().map(Lane::Array).collect(),
                units: other.range_units().to_vec(),
                errors: right.errors,
            }
        } else {
            // into this store's coordinate systems, keeping natural units
            let mut columns = vec![Vec::new(); self.range_dimension()];
            let mut units = vec![None; self.range_dimension()];
            let mut errors = vec![None; self.range_dimension()];
            let values = cast_columns::<T, f64>(right.values);
            for (slot, theirs) in self.tuple_slots().iter().zip(other.tuple_slots()) {
                let range = slot.range();
                let from = Frame::new(
                    &theirs.ty,
                    theirs.cs.as_ref(),
                    &other.range_units()[range.clone()],
                    &right.errors[range.clone()],
                );
                let to = Frame::new(&slot.ty, slot.cs.as_ref(), &self.range_units()[range.clone()], &[]);
                let out = transform_coordinates_free_units(&from, &to, values[range.clone()].to_vec())?;
                for (k, i) in range.enumerate() {
                    columns[i] = T::from_doubles(&out.values[k]);
                    units[i] = out.units[k];
                    errors[i] = out.errors[k];
                }
            }
            Prepared {
                lanes: columns.into_iter().map(Lane::Array).collect(),
                units,
                errors,
            }
        };
        self.combine(op, prepared, new_type, error_mode)
    }

    fn binary_value<T: Real>(
        &self,
        op: BinaryOp,
        sample: &Sample,
        new_type: &FunctionType,
        error_mode: ErrorMode,
    ) -> Result<RangeStore> {
        let n = self.range_dimension();
        let prepared = match sample {
            Sample::Real(scalar) if n > 1 => Prepared {
                lanes: vec![Lane::Const(T::lift(scalar.value())); n],
                units: vec![scalar.unit().copied(); n],
                errors: vec![scalar.error().copied(); n],
            },
            _ => {
                let groups = sample.groups()?;
                let slots = self.tuple_slots();
                if groups.len() != slots.len()
                    || groups
                        .iter()
                        .zip(&slots)
                        .any(|((scalars, _), slot)| scalars.len() != slot.dimension())
                {
                    return Err(Error::TypeMismatch(format!(
                        "value of dimension {} does not match range of dimension {}",
                        sample.dimension(),
                        n
                    )));
                }
                let mut prepared = Prepared {
                    lanes: Vec::with_capacity(n),
                    units: Vec::with_capacity(n),
                    errors: Vec::with_capacity(n),
                };
                for ((scalars, cs), slot) in groups.iter().zip(&slots) {
                    let units: Vec<Option<Unit>> = scalars.iter().map(|s| s.unit().copied()).collect();
                    let errors: Vec<Option<ErrorEstimate>> =
                        scalars.iter().map(|s| s.error().copied()).collect();
                    let from = Frame::new(slot.value_type(cs.as_ref()), cs.as_ref(), &units, &errors);
                    let to = Frame::new(&slot.ty, slot.cs.as_ref(), &self.range_units()[slot.range()], &[]);
                    let columns = scalars.iter().map(|s| vec![s.value()]).collect();
                    let out = transform_coordinates_free_units(&from, &to, columns)?;
                    prepared
                        .lanes
                        .extend(out.values.iter().map(|c| Lane::Const(T::lift(c[0]))));
                    prepared.units.extend(out.units);
                    prepared.errors.extend(out.errors);
                }
                prepared
            }
        };
        self.combine(op, prepared, new_type, error_mode)
    }

    /// Apply `op` component by component against a prepared operand.
    fn combine<T: Real>(
        &self,
        op: BinaryOp,
        right: Prepared<T>,
        new_type: &FunctionType,
        error_mode: ErrorMode,
    ) -> Result<RangeStore> {
        let Some(left) = self.snapshot::<T>()? else {
            return self.missing_like(new_type, self.domain().clone());
        };
        let length = self.length();
        let n = self.range_dimension();

        let mut columns = Vec::with_capacity(n);
        let mut units = Vec::with_capacity(n);
        let mut errors = Vec::with_capacity(n);
        let lanes = left.values.into_iter().zip(right.lanes);
        for (i, (left_column, mut right_lane)) in lanes.enumerate() {
            let (ua, ub) = (self.range_units()[i], right.units[i]);
            let plan = plan_units(op, ua, ub)?;

            let mut left_lane = Lane::Array(left_column);
            left_lane.convert(ua.as_ref(), plan.left.as_ref())?;
            right_lane.convert(ub.as_ref(), plan.right.as_ref())?;

            let column: Vec<T> = (0..length)
                .map(|k| apply_binary(op, left_lane.get(k), right_lane.get(k)))
                .collect();

            let error = if error_mode.tracks_errors() {
                let ea = convert_error(left.errors[i], ua.as_ref(), plan.left.as_ref())?;
                let eb = convert_error(right.errors[i], ub.as_ref(), plan.right.as_ref())?;
                let (mean, count) = column_statistics(&column);
                ErrorEstimate::binary(op, ea.as_ref(), eb.as_ref(), error_mode, mean, count, plan.out)
            } else {
                None
            };

            columns.push(column);
            units.push(plan.out);
            errors.push(error);
        }

        self.derive(new_type, columns, units, errors)
    }

    /// `op(self)` sample by sample, declared as `new_type`.
    ///
    /// Values are first brought to rational form (absolute unit, unity when
    /// dimensionless); trigonometric inputs are then converted to the angle
    /// unit the operator consumes.
    ///
    /// `new_type` must have this store's shape and range coordinate systems;
    /// its units may differ because the result units are computed.
    ///
    /// Result units: direct trigonometric functions yield
    /// [`Unit::DIMENSIONLESS`] for any input that carries a unit and no unit
    /// for a unitless input. Inverse trigonometric functions yield radians
    /// or degrees.
    #[instrument(skip_all, fields(op = ?op, length = self.length()))]
    pub fn unary(
        &self,
        op: UnaryOp,
        new_type: &FunctionType,
        error_mode: ErrorMode,
    ) -> Result<RangeStore> {
        if !self.function_type().same_frames(new_type) {
            return Err(Error::TypeMismatch(format!(
                "declared result type of {:?} must keep the shape and coordinate systems of the operand",
                op
            )));
        }
        if self.is_missing() {
            return self.missing_like(new_type, self.domain().clone());
        }
        match self.precision() {
            Precision::Double => self.unary_in::<f64>(op, new_type, error_mode),
            Precision::Single => self.unary_in::<f32>(op, new_type, error_mode),
        }
    }

    fn unary_in<T: Real>(
        &self,
        op: UnaryOp,
        new_type: &FunctionType,
        error_mode: ErrorMode,
    ) -> Result<RangeStore> {
        let Some(snapshot) = self.snapshot::<T>()? else {
            return self.missing_like(new_type, self.domain().clone());
        };
        let n = self.range_dimension();

        let mut columns = Vec::with_capacity(n);
        let mut units = Vec::with_capacity(n);
        let mut errors = Vec::with_capacity(n);
        for (i, mut column) in snapshot.values.into_iter().enumerate() {
            let unit = self.range_units()[i];
            let mut input = rational_form(unit);

            convert_column(&mut column, unit.as_ref(), input.as_ref())?;
            let mut error = convert_error(snapshot.errors[i], unit.as_ref(), input.as_ref())?;

            if op.is_direct_trig() {
                let angle = if op.uses_degrees() {
                    Unit::degrees()
                } else {
                    Unit::radians()
                };
                if let Some(u) = input.filter(|u| !u.is_promiscuous() && u.can_convert(&angle)) {
                    convert_column(&mut column, Some(&u), Some(&angle))?;
                    error = convert_error(error, Some(&u), Some(&angle))?;
                    input = Some(angle);
                }
            }

            let out = unary_unit(op, input);
            column.iter_mut().for_each(|v| *v = apply_unary(op, *v));

            let (mean, count) = column_statistics(&column);
            errors.push(ErrorEstimate::unary(op, error.as_ref(), error_mode, mean, count, out));
            columns.push(column);
            units.push(out);
        }

        self.derive(new_type, columns, units, errors)
    }

    /// A new store on this domain holding computed columns.
    fn derive<T: Real>(
        &self,
        new_type: &FunctionType,
        columns: Vec<Vec<T>>,
        units: Vec<Option<Unit>>,
        errors: Vec<Option<ErrorEstimate>>,
    ) -> Result<RangeStore> {
        let parts = self.parts();
        let store = RangeStore::from_parts(StoreParts {
            ty: new_type.clone(),
            spaces: vec![ContinuousSpace::shared(T::PRECISION); columns.len()],
            units,
            ..parts
        });
        store.set_samples(columns, Some(errors))?;
        Ok(store)
    }
}
