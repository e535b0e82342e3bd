//! Coordinate systems and the coordinate transform service.
//!
//! A [`CoordinateSystem`] maps tuples between its own coordinates (expressed
//! in [`CoordinateSystem::units`]) and a reference [`RealTupleType`]
//! (expressed in the reference's default units). Two tuples can be
//! transformed into one another when their references agree.
//!
//! [`transform_coordinates`] converts into the caller's requested units;
//! [`transform_coordinates_free_units`] leaves each output component in the
//! unit natural to the target coordinates, which is what arithmetic wants
//! before it reconciles units itself.

use std::f64::consts::PI;
use std::fmt::Debug;
use std::sync::Arc;

use flatfield_units::{Conversion, Unit};

use crate::error::{Error, Result};
use crate::error_estimate::ErrorEstimate;
use crate::policy::ErrorMode;
use crate::types::{RealTupleType, RealType};

pub type CoordinateSystemRef = Arc<dyn CoordinateSystem>;

pub trait CoordinateSystem: Debug + Send + Sync {
    /// Identifies the mapping; two systems with the same name, reference and
    /// units are interchangeable.
    fn name(&self) -> &str;

    fn reference(&self) -> &RealTupleType;

    /// Units of this system's own coordinates.
    fn units(&self) -> &[Option<Unit>];

    fn dimension(&self) -> usize {
        self.reference().dimension()
    }

    /// Component-major columns in [`CoordinateSystem::units`] to reference
    /// coordinates in the reference's default units.
    fn to_reference(&self, values: &[Vec<f64>]) -> Result<Vec<Vec<f64>>>;

    fn from_reference(&self, values: &[Vec<f64>]) -> Result<Vec<Vec<f64>>>;

    fn equals(&self, other: &dyn CoordinateSystem) -> bool {
        self.name() == other.name()
            && self.units() == other.units()
            && self.reference().equals_except_name(other.reference())
    }
}

pub fn same_coordinate_system(
    a: Option<&CoordinateSystemRef>,
    b: Option<&CoordinateSystemRef>,
) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => Arc::ptr_eq(a, b) || a.equals(b.as_ref()),
        _ => false,
    }
}

fn check_columns(values: &[Vec<f64>], expected: usize) -> Result<()> {
    if values.len() != expected {
        return Err(Error::DimensionMismatch {
            expected,
            found: values.len(),
        });
    }
    Ok(())
}

// ============================================================================
// Polar coordinates
// ============================================================================

/// Polar `(radius, azimuth)` over a Cartesian `(x, y)` reference in meters.
/// Azimuth is measured in degrees counter-clockwise from +x.
#[derive(Debug, Clone)]
pub struct PolarCoordinateSystem {
    reference: RealTupleType,
    units: [Option<Unit>; 2],
}

impl PolarCoordinateSystem {
    pub fn new() -> Self {
        Self {
            reference: RealTupleType::new(vec![
                RealType::new("x", Some(Unit::meters())),
                RealType::new("y", Some(Unit::meters())),
            ]),
            units: [Some(Unit::meters()), Some(Unit::degrees())],
        }
    }
}

impl Default for PolarCoordinateSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl CoordinateSystem for PolarCoordinateSystem {
    fn name(&self) -> &str {
        "polar"
    }

    fn reference(&self) -> &RealTupleType {
        &self.reference
    }

    fn units(&self) -> &[Option<Unit>] {
        &self.units
    }

    fn to_reference(&self, values: &[Vec<f64>]) -> Result<Vec<Vec<f64>>> {
        check_columns(values, 2)?;
        let (x, y): (Vec<f64>, Vec<f64>) = values[0]
            .iter()
            .zip(&values[1])
            .map(|(r, az)| {
                let theta = az * PI / 180.0;
                (r * theta.cos(), r * theta.sin())
            })
            .unzip();
        Ok(vec![x, y])
    }

    fn from_reference(&self, values: &[Vec<f64>]) -> Result<Vec<Vec<f64>>> {
        check_columns(values, 2)?;
        let (r, az): (Vec<f64>, Vec<f64>) = values[0]
            .iter()
            .zip(&values[1])
            .map(|(x, y)| (x.hypot(*y), y.atan2(*x) * 180.0 / PI))
            .unzip();
        Ok(vec![r, az])
    }
}

// ============================================================================
// Transform service
// ============================================================================

/// Where a tuple of values lives: its type, coordinate system, per-component
/// units and error estimates.
#[derive(Debug, Clone, Copy)]
pub struct Frame<'a> {
    pub ty: &'a RealTupleType,
    pub cs: Option<&'a CoordinateSystemRef>,
    pub units: &'a [Option<Unit>],
    pub errors: &'a [Option<ErrorEstimate>],
}

impl<'a> Frame<'a> {
    pub fn new(
        ty: &'a RealTupleType,
        cs: Option<&'a CoordinateSystemRef>,
        units: &'a [Option<Unit>],
        errors: &'a [Option<ErrorEstimate>],
    ) -> Self {
        Self {
            ty,
            cs,
            units,
            errors,
        }
    }

    fn reference(&self) -> &RealTupleType {
        self.cs.map(|cs| cs.reference()).unwrap_or(self.ty)
    }

    fn unit(&self, i: usize) -> Option<&Unit> {
        self.units.get(i).and_then(Option::as_ref)
    }
}

/// Values, units and errors after a transform.
#[derive(Debug, Clone)]
pub struct Transformed {
    pub values: Vec<Vec<f64>>,
    pub units: Vec<Option<Unit>>,
    pub errors: Vec<Option<ErrorEstimate>>,
}

/// Transform `values` from one frame into another, converting to the target
/// frame's units.
pub fn transform_coordinates(
    from: &Frame<'_>,
    to: &Frame<'_>,
    values: Vec<Vec<f64>>,
) -> Result<Transformed> {
    transform(from, to, values, false)
}

/// Transform `values` from one frame into another, leaving each component
/// in whatever unit the target coordinates produce.
pub fn transform_coordinates_free_units(
    from: &Frame<'_>,
    to: &Frame<'_>,
    values: Vec<Vec<f64>>,
) -> Result<Transformed> {
    transform(from, to, values, true)
}

fn transform(
    from: &Frame<'_>,
    to: &Frame<'_>,
    values: Vec<Vec<f64>>,
    free: bool,
) -> Result<Transformed> {
    let dim = from.ty.dimension();
    check_columns(&values, dim)?;
    if to.ty.dimension() != dim {
        return Err(Error::DimensionMismatch {
            expected: dim,
            found: to.ty.dimension(),
        });
    }

    let (values, units) = map_values(from, to, values, free)?;
    let errors = propagate_errors(from, to, free, &units)?;
    Ok(Transformed {
        values,
        units,
        errors,
    })
}

fn convert_column(column: &mut [f64], from: Option<&Unit>, to: Option<&Unit>) -> Result<()> {
    if let (Some(from), Some(to)) = (from, to) {
        Conversion::between(from, to)?.apply_slice(column);
    }
    Ok(())
}

/// Core value mapping shared by the value path and the error probes.
fn map_values(
    from: &Frame<'_>,
    to: &Frame<'_>,
    mut values: Vec<Vec<f64>>,
    free: bool,
) -> Result<(Vec<Vec<f64>>, Vec<Option<Unit>>)> {
    let dim = values.len();

    if same_coordinate_system(from.cs, to.cs) {
        let mut units = Vec::with_capacity(dim);
        for (i, column) in values.iter_mut().enumerate() {
            if free {
                units.push(from.unit(i).copied());
            } else {
                convert_column(column, from.unit(i), to.unit(i))?;
                units.push(to.unit(i).or(from.unit(i)).copied());
            }
        }
        return Ok((values, units));
    }

    let reference = from.reference();
    if !reference.equals_except_name(to.reference()) {
        return Err(Error::CoordinateSystem(format!(
            "references differ: {:?} vs {:?}",
            names(reference),
            names(to.reference())
        )));
    }
    let reference_units = reference.default_units();

    // into reference coordinates
    let reference_values = match from.cs {
        Some(cs) => {
            for (i, column) in values.iter_mut().enumerate() {
                convert_column(column, from.unit(i), cs.units()[i].as_ref())?;
            }
            cs.to_reference(&values)?
        }
        None => {
            for (i, column) in values.iter_mut().enumerate() {
                convert_column(column, from.unit(i), reference_units[i].as_ref())?;
            }
            values
        }
    };

    // out of reference coordinates
    let (mut out, natural) = match to.cs {
        Some(cs) => (cs.from_reference(&reference_values)?, cs.units().to_vec()),
        None => (reference_values, reference_units),
    };
    check_columns(&out, dim)?;

    if free {
        return Ok((out, natural));
    }
    let mut units = Vec::with_capacity(dim);
    for (i, column) in out.iter_mut().enumerate() {
        convert_column(column, natural[i].as_ref(), to.unit(i))?;
        units.push(to.unit(i).copied().or(natural[i]));
    }
    Ok((out, units))
}

/// Push the source error estimates through the mapping by probing it at
/// `mean ± error/2` along each input axis and combining the per-axis output
/// spreads in quadrature.
fn propagate_errors(
    from: &Frame<'_>,
    to: &Frame<'_>,
    free: bool,
    units: &[Option<Unit>],
) -> Result<Vec<Option<ErrorEstimate>>> {
    let dim = from.ty.dimension();
    let inputs: Option<Vec<&ErrorEstimate>> = (0..dim)
        .map(|i| from.errors.get(i).and_then(Option::as_ref))
        .collect();
    let Some(inputs) = inputs else {
        return Ok(vec![None; dim]);
    };
    if inputs.iter().any(|e| !e.mean().is_finite()) {
        return Ok(vec![None; dim]);
    }

    // column k holds: center, then (+, -) pairs for each axis
    let probes = 1 + 2 * dim;
    let mut columns = vec![Vec::with_capacity(probes); dim];
    for (k, column) in columns.iter_mut().enumerate() {
        column.push(inputs[k].mean());
        for axis in 0..dim {
            let half = if axis == k { inputs[k].error() / 2.0 } else { 0.0 };
            column.push(inputs[k].mean() + half);
            column.push(inputs[k].mean() - half);
        }
    }
    let (out, _) = map_values(from, to, columns, free)?;

    Ok(out
        .iter()
        .enumerate()
        .map(|(i, column)| {
            let spreads = (0..dim).map(|axis| (column[1 + 2 * axis] - column[2 + 2 * axis]).abs());
            let error = ErrorMode::Independent.combine_all(spreads);
            (error.is_finite() && column[0].is_finite())
                .then(|| ErrorEstimate::new(error, column[0], inputs[i].count(), units[i]))
        })
        .collect())
}

fn names(ty: &RealTupleType) -> Vec<&str> {
    ty.components().iter().map(RealType::name).collect()
}
