//! Domain samplings.
//!
//! A [`DomainSet`] is the finite set of points a function is sampled at. It
//! answers nearest-neighbor and interpolation queries in its own coordinates
//! and units; callers transform foreign points into those coordinates first.

use std::fmt::Debug;
use std::sync::Arc;

use flatfield_units::Unit;

use crate::coord::{same_coordinate_system, CoordinateSystemRef};
use crate::error::{Error, Result};
use crate::error_estimate::ErrorEstimate;
use crate::sets::grid::{interp_position, nearest_position, LinearAxis};

pub type DomainSetRef = Arc<dyn DomainSet>;

pub trait DomainSet: Debug + Send + Sync {
    fn dimension(&self) -> usize;

    fn length(&self) -> usize;

    fn units(&self) -> &[Option<Unit>];

    fn coordinate_system(&self) -> Option<&CoordinateSystemRef>;

    /// Per-axis uncertainty of the sample coordinates.
    fn errors(&self) -> &[Option<ErrorEstimate>];

    /// All sample points, component-major: `samples()[axis][index]`.
    fn samples(&self) -> Vec<Vec<f64>>;

    /// Index of the sample nearest `point`, or None outside the set.
    fn value_to_index(&self, point: &[f64]) -> Option<usize>;

    /// Enclosing samples and their multilinear weights, or None outside the
    /// set. Weights sum to one.
    fn value_to_interp(&self, point: &[f64]) -> Option<Vec<(usize, f64)>>;

    /// Previous and next sample along `axis`, when they exist.
    fn axis_neighbors(&self, index: usize, axis: usize) -> (Option<usize>, Option<usize>);

    /// Value equality: same points in the same coordinates and units.
    fn same_samples(&self, other: &dyn DomainSet) -> bool {
        self.dimension() == other.dimension()
            && self.length() == other.length()
            && self.units() == other.units()
            && same_coordinate_system(self.coordinate_system(), other.coordinate_system())
            && self.samples() == other.samples()
    }
}

fn check_units(units: &[Option<Unit>], dimension: usize) -> Result<()> {
    if units.len() != dimension {
        return Err(Error::InvalidSet(format!(
            "{} units for a {}-dimensional set",
            units.len(),
            dimension
        )));
    }
    Ok(())
}

fn check_coordinate_system(cs: &CoordinateSystemRef, dimension: usize) -> Result<()> {
    if cs.dimension() != dimension {
        return Err(Error::DimensionMismatch {
            expected: dimension,
            found: cs.dimension(),
        });
    }
    Ok(())
}

fn check_errors(errors: &[Option<ErrorEstimate>], dimension: usize) -> Result<()> {
    if errors.len() != dimension {
        return Err(Error::TupleLength {
            expected: dimension,
            found: errors.len(),
        });
    }
    Ok(())
}

// ============================================================================
// LinearSet
// ============================================================================

/// Cartesian product of evenly spaced axes. Axis 0 varies fastest.
#[derive(Debug, Clone)]
pub struct LinearSet {
    axes: Vec<LinearAxis>,
    units: Vec<Option<Unit>>,
    coordinate_system: Option<CoordinateSystemRef>,
    errors: Vec<Option<ErrorEstimate>>,
}

impl LinearSet {
    pub fn new(axes: Vec<LinearAxis>, units: Vec<Option<Unit>>) -> Result<Self> {
        if axes.is_empty() {
            return Err(Error::InvalidSet("linear set needs at least one axis".into()));
        }
        check_units(&units, axes.len())?;
        let errors = vec![None; axes.len()];
        Ok(Self {
            axes,
            units,
            coordinate_system: None,
            errors,
        })
    }

    /// One-dimensional set of `count` points from `first` to `last`.
    pub fn linear_1d(first: f64, last: f64, count: usize, unit: Option<Unit>) -> Result<Self> {
        Self::new(vec![LinearAxis::new(first, last, count)?], vec![unit])
    }

    pub fn with_coordinate_system(mut self, cs: CoordinateSystemRef) -> Result<Self> {
        check_coordinate_system(&cs, self.axes.len())?;
        self.coordinate_system = Some(cs);
        Ok(self)
    }

    pub fn with_errors(mut self, errors: Vec<Option<ErrorEstimate>>) -> Result<Self> {
        check_errors(&errors, self.axes.len())?;
        self.errors = errors;
        Ok(self)
    }

    pub fn axes(&self) -> &[LinearAxis] {
        &self.axes
    }

    fn stride(&self, axis: usize) -> usize {
        self.axes[..axis].iter().map(LinearAxis::count).product()
    }
}

impl DomainSet for LinearSet {
    fn dimension(&self) -> usize {
        self.axes.len()
    }

    fn length(&self) -> usize {
        self.axes.iter().map(LinearAxis::count).product()
    }

    fn units(&self) -> &[Option<Unit>] {
        &self.units
    }

    fn coordinate_system(&self) -> Option<&CoordinateSystemRef> {
        self.coordinate_system.as_ref()
    }

    fn errors(&self) -> &[Option<ErrorEstimate>] {
        &self.errors
    }

    fn samples(&self) -> Vec<Vec<f64>> {
        let length = self.length();
        self.axes
            .iter()
            .enumerate()
            .map(|(k, axis)| {
                let stride = self.stride(k);
                (0..length)
                    .map(|i| axis.value((i / stride) % axis.count()))
                    .collect()
            })
            .collect()
    }

    fn value_to_index(&self, point: &[f64]) -> Option<usize> {
        if point.len() != self.axes.len() {
            return None;
        }
        let mut index = 0;
        let mut stride = 1;
        for (axis, value) in self.axes.iter().zip(point) {
            index += nearest_position(axis.position(*value), axis.count())? * stride;
            stride *= axis.count();
        }
        Some(index)
    }

    fn value_to_interp(&self, point: &[f64]) -> Option<Vec<(usize, f64)>> {
        if point.len() != self.axes.len() {
            return None;
        }
        let mut corners = vec![(0usize, 1.0f64)];
        let mut stride = 1;
        for (axis, value) in self.axes.iter().zip(point) {
            let weights = interp_position(axis.position(*value), axis.count())?;
            corners = corners
                .iter()
                .flat_map(|(base, w)| {
                    weights
                        .iter()
                        .map(move |(i, wi)| (base + i * stride, w * wi))
                })
                .collect();
            stride *= axis.count();
        }
        Some(corners)
    }

    fn axis_neighbors(&self, index: usize, axis: usize) -> (Option<usize>, Option<usize>) {
        let Some(line) = self.axes.get(axis) else {
            return (None, None);
        };
        if index >= self.length() {
            return (None, None);
        }
        let stride = self.stride(axis);
        let position = (index / stride) % line.count();
        let lower = (position > 0).then(|| index - stride);
        let upper = (position + 1 < line.count()).then(|| index + stride);
        (lower, upper)
    }
}

// ============================================================================
// IrregularSet1D
// ============================================================================

/// Strictly increasing one-dimensional sample points.
#[derive(Debug, Clone)]
pub struct IrregularSet1D {
    points: Vec<f64>,
    units: [Option<Unit>; 1],
    coordinate_system: Option<CoordinateSystemRef>,
    errors: [Option<ErrorEstimate>; 1],
}

impl IrregularSet1D {
    /// Points are sorted; NaN or repeated points are rejected.
    pub fn new(mut points: Vec<f64>, unit: Option<Unit>) -> Result<Self> {
        if points.is_empty() {
            return Err(Error::InvalidSet("irregular set needs at least one point".into()));
        }
        if points.iter().any(|p| !p.is_finite()) {
            return Err(Error::InvalidSet("irregular set points must be finite".into()));
        }
        points.sort_by(f64::total_cmp);
        if points.windows(2).any(|w| w[0] == w[1]) {
            return Err(Error::InvalidSet("irregular set points must be distinct".into()));
        }
        Ok(Self {
            points,
            units: [unit],
            coordinate_system: None,
            errors: [None],
        })
    }

    pub fn with_coordinate_system(mut self, cs: CoordinateSystemRef) -> Result<Self> {
        check_coordinate_system(&cs, 1)?;
        self.coordinate_system = Some(cs);
        Ok(self)
    }

    pub fn with_errors(mut self, error: Option<ErrorEstimate>) -> Self {
        self.errors = [error];
        self
    }

    pub fn points(&self) -> &[f64] {
        &self.points
    }

    /// Fractional position of `value` between the bracketing points.
    fn position(&self, value: f64) -> f64 {
        let n = self.points.len();
        if value.is_nan() {
            return f64::NAN;
        }
        if n == 1 {
            return if value == self.points[0] { 0.0 } else { f64::NAN };
        }
        let upper = self.points.partition_point(|p| *p < value);
        let (lo, hi) = match upper {
            0 => (0, 1),
            u if u >= n => (n - 2, n - 1),
            u => (u - 1, u),
        };
        lo as f64 + (value - self.points[lo]) / (self.points[hi] - self.points[lo])
    }
}

impl DomainSet for IrregularSet1D {
    fn dimension(&self) -> usize {
        1
    }

    fn length(&self) -> usize {
        self.points.len()
    }

    fn units(&self) -> &[Option<Unit>] {
        &self.units
    }

    fn coordinate_system(&self) -> Option<&CoordinateSystemRef> {
        self.coordinate_system.as_ref()
    }

    fn errors(&self) -> &[Option<ErrorEstimate>] {
        &self.errors
    }

    fn samples(&self) -> Vec<Vec<f64>> {
        vec![self.points.clone()]
    }

    fn value_to_index(&self, point: &[f64]) -> Option<usize> {
        let [value] = point else { return None };
        nearest_position(self.position(*value), self.points.len())
    }

    fn value_to_interp(&self, point: &[f64]) -> Option<Vec<(usize, f64)>> {
        let [value] = point else { return None };
        interp_position(self.position(*value), self.points.len())
    }

    fn axis_neighbors(&self, index: usize, axis: usize) -> (Option<usize>, Option<usize>) {
        if axis != 0 || index >= self.points.len() {
            return (None, None);
        }
        let lower = index.checked_sub(1);
        let upper = (index + 1 < self.points.len()).then_some(index + 1);
        (lower, upper)
    }
}

// ============================================================================
// SingletonSet
// ============================================================================

/// A single point.
#[derive(Debug, Clone)]
pub struct SingletonSet {
    point: Vec<f64>,
    units: Vec<Option<Unit>>,
    coordinate_system: Option<CoordinateSystemRef>,
    errors: Vec<Option<ErrorEstimate>>,
}

impl SingletonSet {
    pub fn new(point: Vec<f64>, units: Vec<Option<Unit>>) -> Result<Self> {
        if point.is_empty() {
            return Err(Error::InvalidSet("singleton needs at least one coordinate".into()));
        }
        check_units(&units, point.len())?;
        let errors = vec![None; point.len()];
        Ok(Self {
            point,
            units,
            coordinate_system: None,
            errors,
        })
    }

    pub fn with_coordinate_system(mut self, cs: CoordinateSystemRef) -> Result<Self> {
        check_coordinate_system(&cs, self.point.len())?;
        self.coordinate_system = Some(cs);
        Ok(self)
    }

    pub fn with_errors(mut self, errors: Vec<Option<ErrorEstimate>>) -> Result<Self> {
        check_errors(&errors, self.point.len())?;
        self.errors = errors;
        Ok(self)
    }
}

impl DomainSet for SingletonSet {
    fn dimension(&self) -> usize {
        self.point.len()
    }

    fn length(&self) -> usize {
        1
    }

    fn units(&self) -> &[Option<Unit>] {
        &self.units
    }

    fn coordinate_system(&self) -> Option<&CoordinateSystemRef> {
        self.coordinate_system.as_ref()
    }

    fn errors(&self) -> &[Option<ErrorEstimate>] {
        &self.errors
    }

    fn samples(&self) -> Vec<Vec<f64>> {
        self.point.iter().map(|v| vec![*v]).collect()
    }

    fn value_to_index(&self, point: &[f64]) -> Option<usize> {
        (point == self.point.as_slice()).then_some(0)
    }

    fn value_to_interp(&self, point: &[f64]) -> Option<Vec<(usize, f64)>> {
        self.value_to_index(point).map(|i| vec![(i, 1.0)])
    }

    fn axis_neighbors(&self, _index: usize, _axis: usize) -> (Option<usize>, Option<usize>) {
        (None, None)
    }
}
