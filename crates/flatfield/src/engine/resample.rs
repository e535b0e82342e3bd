//! Resampling a store onto another domain sampling.

use std::borrow::Cow;

use tracing::{debug, instrument, trace, warn};

use crate::codec::Encoding;
use crate::coord::{same_coordinate_system, transform_coordinates, Frame};
use crate::error::{Error, Result};
use crate::error_estimate::ErrorEstimate;
use crate::policy::{ErrorMode, SamplingMode};
use crate::sets::{DomainSet, DomainSetRef};
use crate::store::{RangeStore, StoreParts};

/// Where looked-up range values come from.
enum Source<'a> {
    /// The whole range, unpacked up front.
    Columns(&'a [Vec<f64>]),
    /// One source sample at a time, under the store lock.
    Reader(&'a dyn Fn(usize) -> Vec<f64>),
}

impl Source<'_> {
    fn accumulate(&self, index: usize, weight: f64, out: &mut [f64]) {
        match self {
            Source::Columns(columns) => {
                for (acc, column) in out.iter_mut().zip(columns.iter()) {
                    *acc += weight * column[index];
                }
            }
            Source::Reader(read) => {
                for (acc, value) in out.iter_mut().zip(read(index)) {
                    *acc += weight * value;
                }
            }
        }
    }
}

/// Range values at each of `count` points (component-major `points`),
/// NaN where a point falls outside `domain`.
fn lookup(
    domain: &dyn DomainSet,
    points: &[Vec<f64>],
    count: usize,
    components: usize,
    mode: SamplingMode,
    source: &Source<'_>,
) -> Vec<Vec<f64>> {
    let mut out = vec![vec![f64::NAN; count]; components];
    let mut point = vec![0.0; points.len()];
    let mut acc = vec![0.0; components];
    for j in 0..count {
        for (p, axis) in point.iter_mut().zip(points) {
            *p = axis[j];
        }
        let weights = match mode {
            SamplingMode::NearestNeighbor => domain.value_to_index(&point).map(|i| vec![(i, 1.0)]),
            SamplingMode::WeightedAverage => domain.value_to_interp(&point),
        };
        let Some(weights) = weights else {
            continue;
        };
        acc.fill(0.0);
        for (index, weight) in weights {
            if weight != 0.0 {
                source.accumulate(index, weight, &mut acc);
            }
        }
        for (column, value) in out.iter_mut().zip(&acc) {
            column[j] = *value;
        }
    }
    out
}

/// Probe points `mean ± error/2` along each axis, as columns of `2 * dim`
/// points ordered `(+axis0, -axis0, +axis1, ...)`.
fn error_probes(errors: &[&ErrorEstimate]) -> Vec<Vec<f64>> {
    let dim = errors.len();
    (0..dim)
        .map(|k| {
            (0..dim)
                .flat_map(|axis| {
                    let half = if axis == k { errors[k].error() / 2.0 } else { 0.0 };
                    [errors[k].mean() + half, errors[k].mean() - half]
                })
                .collect()
        })
        .collect()
}

impl RangeStore {
    /// This store's function sampled at the points of `set`.
    ///
    /// Returns the store itself when `set` holds the same samples as the
    /// current domain. Points outside the domain become missing.
    #[instrument(skip_all, fields(source = self.length(), target = set.length(), mode = ?mode))]
    pub fn resample(
        &self,
        set: DomainSetRef,
        mode: SamplingMode,
        error_mode: ErrorMode,
    ) -> Result<Cow<'_, RangeStore>> {
        let domain = self.domain().clone();
        if domain.same_samples(set.as_ref()) {
            trace!("target sampling equals domain");
            return Ok(Cow::Borrowed(self));
        }
        let dim = domain.dimension();
        if set.dimension() != dim {
            return Err(Error::DimensionMismatch {
                expected: dim,
                found: set.dimension(),
            });
        }
        if self.is_missing() {
            return Ok(Cow::Owned(RangeStore::from_parts(StoreParts {
                domain: set,
                ..self.parts()
            })));
        }

        // target points in domain coordinates and units
        let domain_type = self.function_type().domain();
        let from = Frame::new(domain_type, set.coordinate_system(), set.units(), set.errors());
        let to = Frame::new(domain_type, domain.coordinate_system(), domain.units(), &[]);
        let points = transform_coordinates(&from, &to, set.samples()).map_err(|e| {
            Error::DomainIncompatible(format!("Sampling set is not compatible with domain: {e}"))
        })?;
        let coord_transform = !same_coordinate_system(set.coordinate_system(), domain.coordinate_system());

        let count = set.length();
        let n = self.range_dimension();
        let range_errors = if error_mode.tracks_errors() {
            self.range_errors()
        } else {
            vec![None; n]
        };
        let domain_errors: Option<Vec<&ErrorEstimate>> = points.errors.iter().map(Option::as_ref).collect();
        let sampling_errors = error_mode.tracks_errors()
            && domain_errors.is_some()
            && range_errors.iter().any(Option::is_some);

        let bulk = sampling_errors
            || self.policy().resample.prefers_bulk(count, self.length())
            || self.encodings().contains(&Encoding::Double)
            || mode == SamplingMode::WeightedAverage;
        debug!(bulk, sampling_errors, coord_transform, "resampling");

        let mut partials: Vec<Vec<f64>> = vec![Vec::new(); n];
        let mut values = if bulk {
            let columns = self.unpack::<f64>()?;
            let source = Source::Columns(&columns);
            if let (true, Some(errors)) = (sampling_errors, &domain_errors) {
                let probes = error_probes(errors);
                let probed = lookup(domain.as_ref(), &probes, 2 * dim, n, mode, &source);
                for (partial, column) in partials.iter_mut().zip(&probed) {
                    *partial = column
                        .chunks_exact(2)
                        .map(|pair| (pair[0] - pair[1]).abs())
                        .collect();
                }
            }
            lookup(domain.as_ref(), &points.values, count, n, mode, &source)
        } else {
            self.with_sample_reader(|read| {
                lookup(domain.as_ref(), &points.values, count, n, mode, &Source::Reader(read))
            })
        };

        let mut errors: Vec<Option<ErrorEstimate>> = vec![None; n];
        for (i, estimate) in range_errors.iter().enumerate() {
            let Some(estimate) = estimate else {
                continue;
            };
            let error = if sampling_errors {
                error_mode.combine_all(
                    std::iter::once(estimate.error()).chain(partials[i].iter().copied()),
                )
            } else {
                estimate.error()
            };
            errors[i] = ErrorEstimate::for_values(&values[i], error, self.range_units()[i]);
        }

        if coord_transform {
            self.transform_vectors(&set, &points.values, &mut values)?;
        }

        let store = RangeStore::from_parts(StoreParts {
            domain: set,
            ..self.parts()
        });
        store.set_samples(values, Some(errors))?;
        Ok(Cow::Owned(store))
    }

    /// Re-express vector range tuples along the target domain's axes.
    ///
    /// Each vector is mapped through a finite-difference Jacobian of the
    /// domain-to-target transform at its sample point and rescaled to keep
    /// its magnitude.
    fn transform_vectors(
        &self,
        set: &DomainSetRef,
        points: &[Vec<f64>],
        values: &mut [Vec<f64>],
    ) -> Result<()> {
        let dim = points.len();
        let count = points.first().map_or(0, Vec::len);
        let slots: Vec<_> = self
            .tuple_slots()
            .into_iter()
            .filter(|slot| slot.ty.is_vector())
            .collect();
        if slots.is_empty() {
            return Ok(());
        }

        // column layout: for each sample, the point then one step per axis
        let mut probes = vec![Vec::with_capacity(count * (dim + 1)); dim];
        let mut steps = Vec::with_capacity(count * dim);
        for j in 0..count {
            for (k, probe) in probes.iter_mut().enumerate() {
                probe.push(points[k][j]);
            }
            for axis in 0..dim {
                let h = 1e-4 * points[axis][j].abs().max(1.0);
                steps.push(h);
                for (k, probe) in probes.iter_mut().enumerate() {
                    probe.push(if k == axis { points[k][j] + h } else { points[k][j] });
                }
            }
        }

        let domain = self.domain();
        let domain_type = self.function_type().domain();
        let from = Frame::new(domain_type, domain.coordinate_system(), domain.units(), &[]);
        let to = Frame::new(domain_type, set.coordinate_system(), set.units(), &[]);
        let mapped = transform_coordinates(&from, &to, probes)?.values;

        for slot in slots {
            if slot.dimension() != dim {
                warn!(
                    vector = slot.dimension(),
                    domain = dim,
                    "vector range does not match domain dimension; left untransformed"
                );
                continue;
            }
            let range = slot.range();
            let mut vector = vec![0.0; dim];
            let mut rotated = vec![0.0; dim];
            for j in 0..count {
                let base = j * (dim + 1);
                for (k, v) in vector.iter_mut().enumerate() {
                    *v = values[range.start + k][j];
                }
                rotated.fill(0.0);
                for axis in 0..dim {
                    let h = steps[j * dim + axis];
                    for (row, out) in rotated.iter_mut().enumerate() {
                        let derivative = (mapped[row][base + 1 + axis] - mapped[row][base]) / h;
                        *out += derivative * vector[axis];
                    }
                }
                let before = vector.iter().map(|v| v * v).sum::<f64>().sqrt();
                let after = rotated.iter().map(|v| v * v).sum::<f64>().sqrt();
                let scale = if after > 0.0 { before / after } else { 1.0 };
                for (k, out) in rotated.iter().enumerate() {
                    values[range.start + k][j] = out * scale;
                }
            }
        }
        Ok(())
    }
}
