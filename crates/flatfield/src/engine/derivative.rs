//! Partial derivatives along domain axes and component extraction.

use flatfield_units::{Conversion, Unit};
use tracing::{debug, instrument};

use crate::engine::ops::BinaryOp;
use crate::error::{Error, Result};
use crate::error_estimate::ErrorEstimate;
use crate::policy::ErrorMode;
use crate::real::finite_mean;
use crate::sets::ContinuousSpace;
use crate::store::{RangeCoordinates, RangeStore, StoreParts};
use crate::types::{FunctionType, RangeComponent, RangeType, RealTupleType, RealType};

/// `values` re-expressed in the absolute form of `unit`.
fn to_absolute(values: &mut [f64], unit: Option<Unit>) -> Result<Option<Unit>> {
    let Some(unit) = unit else {
        return Ok(None);
    };
    let absolute = unit.absolute();
    Conversion::between(&unit, &absolute)?.apply_slice(values);
    Ok(Some(absolute))
}

fn absolute_error(error: Option<ErrorEstimate>, unit: Option<Unit>) -> Result<Option<ErrorEstimate>> {
    match (error, unit) {
        (Some(e), Some(u)) => Ok(Some(e.convert(&u.absolute())?)),
        (e, _) => Ok(e),
    }
}

impl RangeStore {
    /// Partial derivative of every range component along domain `axis`.
    ///
    /// Interior samples use centered differences over the actual sample
    /// coordinates; edge samples use one-sided differences. Result units
    /// are range unit over domain unit.
    #[instrument(skip_all, fields(axis = axis, length = self.length()))]
    pub fn derivative(&self, axis: usize, error_mode: ErrorMode) -> Result<RangeStore> {
        let domain = self.domain().clone();
        if axis >= domain.dimension() {
            return Err(Error::DimensionMismatch {
                expected: domain.dimension(),
                found: axis + 1,
            });
        }
        let n = self.range_dimension();
        let domain_unit = domain.units()[axis];
        let absolute_domain = domain_unit.map(|u| u.absolute());

        let out_units: Vec<Option<Unit>> = self
            .range_units()
            .iter()
            .map(|unit| match (unit, absolute_domain) {
                (Some(r), Some(d)) => r.absolute().divide(&d).ok(),
                _ => None,
            })
            .collect();

        let axis_name = self.function_type().domain().components()[axis].name().to_string();
        let reals: Vec<RealType> = self
            .function_type()
            .flat_range()
            .iter()
            .zip(&out_units)
            .map(|(real, unit)| RealType::new(format!("d{}_d{}", real.name(), axis_name), *unit))
            .collect();
        let range = match self.function_type().range() {
            RangeType::Real(_) => RangeType::Real(reals[0].clone()),
            _ => RangeType::RealTuple(RealTupleType::new(reals)),
        };
        let ty = FunctionType::new(self.function_type().domain().clone(), range);

        let store = RangeStore::from_parts(StoreParts {
            ty,
            domain: domain.clone(),
            spaces: vec![ContinuousSpace::shared(self.precision()); n],
            units: out_units.clone(),
            coords: RangeCoordinates::Shared(None),
            policy: *self.policy(),
        });
        let Some(snapshot) = self.snapshot::<f64>()? else {
            return Ok(store);
        };

        let mut coordinates = domain.samples().swap_remove(axis);
        to_absolute(&mut coordinates, domain_unit)?;

        let propagate = self.policy().derivative.propagate_errors && error_mode.tracks_errors();
        let domain_error = if propagate {
            absolute_error(domain.errors()[axis], domain_unit)?
        } else {
            None
        };

        let mut columns = Vec::with_capacity(n);
        let mut errors = Vec::with_capacity(n);
        for (i, mut values) in snapshot.values.into_iter().enumerate() {
            let unit = self.range_units()[i];
            to_absolute(&mut values, unit)?;

            let column: Vec<f64> = (0..self.length())
                .map(|k| {
                    let (lower, upper) = domain.axis_neighbors(k, axis);
                    let (a, b) = match (lower, upper) {
                        (Some(lo), Some(hi)) => (lo, hi),
                        (None, Some(hi)) => (k, hi),
                        (Some(lo), None) => (lo, k),
                        (None, None) => return f64::NAN,
                    };
                    (values[b] - values[a]) / (coordinates[b] - coordinates[a])
                })
                .collect();

            let error = if propagate {
                let range_error = absolute_error(snapshot.errors[i], unit)?;
                let count = column.iter().filter(|v| !v.is_nan()).count();
                let mean = finite_mean(&column).unwrap_or(f64::NAN);
                ErrorEstimate::binary(
                    BinaryOp::Divide,
                    range_error.as_ref(),
                    domain_error.as_ref(),
                    error_mode,
                    mean,
                    count,
                    out_units[i],
                )
            } else {
                None
            };
            columns.push(column);
            errors.push(error);
        }

        store.set_samples(columns, Some(errors))?;
        debug!(components = n, "computed derivative");
        Ok(store)
    }

    /// One derivative store per domain axis.
    pub fn derivatives(&self, error_mode: ErrorMode) -> Result<Vec<RangeStore>> {
        (0..self.domain().dimension())
            .map(|axis| self.derivative(axis, error_mode))
            .collect()
    }

    /// Top-level range component `index` as a store of its own.
    ///
    /// A real tuple range exposes each of its reals; a tuple range exposes
    /// its items. The component keeps its value spaces, units, errors and
    /// coordinate system.
    pub fn extract_component(&self, index: usize) -> Result<RangeStore> {
        let components = self.function_type().range().components();
        let Some(component) = components.get(index) else {
            return Err(Error::IndexOutOfRange {
                index,
                length: components.len(),
            });
        };
        if self.function_type().is_real_range() && self.range_dimension() == 1 {
            return Ok(self.clone());
        }

        let offset: usize = components[..index].iter().map(RangeComponent::dimension).sum();
        let span = offset..offset + component.dimension();
        let (range, cs) = match component {
            RangeComponent::Real(r) => (RangeType::Real(r.clone()), None),
            RangeComponent::RealTuple(t) => {
                let cs = match self.range_coordinates() {
                    RangeCoordinates::PerSubTuple(systems) => systems.get(index).cloned().flatten(),
                    RangeCoordinates::Shared(_) => None,
                };
                (RangeType::RealTuple(t.clone()), cs)
            }
        };

        let store = RangeStore::from_parts(StoreParts {
            ty: FunctionType::new(self.function_type().domain().clone(), range),
            domain: self.domain().clone(),
            spaces: self.range_spaces()[span.clone()].to_vec(),
            units: self.range_units()[span.clone()].to_vec(),
            coords: RangeCoordinates::Shared(cs),
            policy: *self.policy(),
        });
        let Some(snapshot) = self.snapshot::<f64>()? else {
            return Ok(store);
        };
        let values = snapshot.values[span.clone()].to_vec();
        store.set_samples(values, Some(snapshot.errors[span].to_vec()))?;
        Ok(store)
    }
}
