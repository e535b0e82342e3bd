//! The range store: a finite sampling of a function, one compact array per
//! range component.
//!
//! # Lifecycle
//!
//! ```text
//! Uninitialized ──set_sample / set_samples_at──▶ Partial
//!       │                                          │
//!       └──────────────set_samples─────────────────┴──▶ Full
//! ```
//!
//! A store starts missing with no storage allocated. Bulk writes reset all
//! storage; single and partial writes allocate a component lazily, filled
//! with the missing sentinel. The whole-store `missing` flag is independent
//! of per-sample sentinels.
//!
//! # Locking
//!
//! One mutex guards the storage arrays, the missing flag, the error
//! estimates and the lifecycle marker. Every public accessor holds it for its
//! whole duration; engines copy an operand out and release it before
//! building their result.

use std::sync::Arc;

use flatfield_units::{convert_tuple, Unit, UnitError};
use parking_lot::Mutex;
use tracing::{debug, instrument, trace};

use crate::codec::{ComponentStorage, Encoding};
use crate::coord::{same_coordinate_system, transform_coordinates, CoordinateSystemRef, Frame};
use crate::error::{Error, Result};
use crate::error_estimate::ErrorEstimate;
use crate::policy::FieldPolicy;
use crate::real::{Precision, Real};
use crate::sample::{Sample, Scalar};
use crate::sets::{ContinuousSpace, DomainSetRef, ValueSpaceRef};
use crate::types::{range_coordinate_systems, FunctionType, RangeComponent, RangeType, RealTupleType};

/// Coordinate systems of a range: one shared by the whole range when it is
/// a real or real tuple, one per top-level member of a tuple range.
#[derive(Debug, Clone)]
pub enum RangeCoordinates {
    Shared(Option<CoordinateSystemRef>),
    PerSubTuple(Vec<Option<CoordinateSystemRef>>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    Uninitialized,
    Partial,
    Full,
}

/// A coordinate-bearing group of range components.
#[derive(Debug, Clone)]
pub(crate) struct TupleSlot {
    pub offset: usize,
    pub ty: RealTupleType,
    pub cs: Option<CoordinateSystemRef>,
}

impl TupleSlot {
    pub fn dimension(&self) -> usize {
        self.ty.dimension()
    }

    pub fn range(&self) -> std::ops::Range<usize> {
        self.offset..self.offset + self.dimension()
    }

    /// Type of incoming values tagged with `cs`. Untagged values are read in
    /// the reference coordinates of this slot's coordinate system.
    pub fn value_type<'a>(&'a self, cs: Option<&'a CoordinateSystemRef>) -> &'a RealTupleType {
        match (cs, &self.cs) {
            (None, Some(own)) => own.reference(),
            _ => &self.ty,
        }
    }
}

/// Values and errors copied out of a store under its lock.
pub(crate) struct Snapshot<T> {
    pub values: Vec<Vec<T>>,
    pub errors: Vec<Option<ErrorEstimate>>,
}

#[derive(Debug, Clone)]
struct StoreState {
    storage: Vec<Option<ComponentStorage>>,
    errors: Vec<Option<ErrorEstimate>>,
    missing: bool,
    lifecycle: Lifecycle,
}

impl StoreState {
    fn new(components: usize) -> Self {
        Self {
            storage: vec![None; components],
            errors: vec![None; components],
            missing: true,
            lifecycle: Lifecycle::Uninitialized,
        }
    }

    fn touch(&mut self) {
        self.missing = false;
        if self.lifecycle == Lifecycle::Uninitialized {
            self.lifecycle = Lifecycle::Partial;
        }
    }
}

#[derive(Debug)]
pub struct RangeStore {
    ty: FunctionType,
    domain: DomainSetRef,
    spaces: Vec<ValueSpaceRef>,
    encodings: Vec<Encoding>,
    units: Vec<Option<Unit>>,
    coords: RangeCoordinates,
    policy: FieldPolicy,
    state: Mutex<StoreState>,
}

/// Everything a derived store needs, already validated by the engine that
/// computed it.
pub(crate) struct StoreParts {
    pub ty: FunctionType,
    pub domain: DomainSetRef,
    pub spaces: Vec<ValueSpaceRef>,
    pub units: Vec<Option<Unit>>,
    pub coords: RangeCoordinates,
    pub policy: FieldPolicy,
}

// ============================================================================
// Construction
// ============================================================================

pub struct RangeStoreBuilder {
    ty: FunctionType,
    domain: DomainSetRef,
    spaces: Option<Vec<ValueSpaceRef>>,
    units: Option<Vec<Option<Unit>>>,
    coords: Option<RangeCoordinates>,
    policy: FieldPolicy,
}

impl RangeStoreBuilder {
    /// Per-component value spaces. Defaults to single-precision continuous.
    pub fn range_spaces(mut self, spaces: Vec<ValueSpaceRef>) -> Self {
        self.spaces = Some(spaces);
        self
    }

    /// Per-component units. Defaults to the range type's default units.
    pub fn range_units(mut self, units: Vec<Option<Unit>>) -> Self {
        self.units = Some(units);
        self
    }

    /// Coordinate system shared by a real or real tuple range.
    pub fn coordinate_system(mut self, cs: CoordinateSystemRef) -> Self {
        self.coords = Some(RangeCoordinates::Shared(Some(cs)));
        self
    }

    /// One coordinate system slot per top-level member of a tuple range.
    pub fn sub_coordinate_systems(mut self, systems: Vec<Option<CoordinateSystemRef>>) -> Self {
        self.coords = Some(RangeCoordinates::PerSubTuple(systems));
        self
    }

    pub fn policy(mut self, policy: FieldPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn build(self) -> Result<RangeStore> {
        let ty = self.ty;
        let domain = self.domain;
        let n = ty.range_dimension();

        if domain.dimension() != ty.domain_dimension() {
            return Err(Error::DimensionMismatch {
                expected: ty.domain_dimension(),
                found: domain.dimension(),
            });
        }
        check_convertible(domain.units(), &ty.domain().default_units())?;

        let spaces = match self.spaces {
            Some(spaces) => spaces,
            None => vec![ContinuousSpace::shared(Precision::Single); n],
        };
        if spaces.len() != n {
            return Err(Error::TupleLength {
                expected: n,
                found: spaces.len(),
            });
        }

        let defaults = ty.default_range_units();
        let mut units = match self.units {
            Some(units) => {
                if units.len() != n {
                    return Err(Error::TupleLength {
                        expected: n,
                        found: units.len(),
                    });
                }
                check_convertible(&units, &defaults)?;
                units
            }
            None => defaults,
        };
        for (unit, real) in units.iter_mut().zip(ty.flat_range()) {
            if real.is_interval() {
                *unit = unit.map(|u| u.absolute());
            }
        }

        let declared = range_coordinate_systems(ty.range());
        let coords = match self.coords {
            None if ty.is_real_range() => RangeCoordinates::Shared(declared.into_iter().next().flatten()),
            None => RangeCoordinates::PerSubTuple(declared),
            Some(RangeCoordinates::Shared(cs)) => {
                if !ty.is_real_range() {
                    return Err(Error::TypeMismatch(
                        "a tuple range needs one coordinate system per sub-tuple".into(),
                    ));
                }
                check_reference(cs.as_ref(), declared.first().and_then(Option::as_ref), n)?;
                RangeCoordinates::Shared(cs)
            }
            Some(RangeCoordinates::PerSubTuple(systems)) => {
                let RangeType::Tuple(items) = ty.range() else {
                    return Err(Error::TypeMismatch(
                        "a real or real tuple range has one shared coordinate system".into(),
                    ));
                };
                if systems.len() != items.len() {
                    return Err(Error::TupleLength {
                        expected: items.len(),
                        found: systems.len(),
                    });
                }
                for ((cs, item), decl) in systems.iter().zip(items).zip(&declared) {
                    check_reference(cs.as_ref(), decl.as_ref(), item.dimension())?;
                }
                RangeCoordinates::PerSubTuple(systems)
            }
        };

        let store = RangeStore::from_parts(StoreParts {
            ty,
            domain,
            spaces,
            units,
            coords,
            policy: self.policy,
        });
        for slot in store.tuple_slots() {
            if let Some(cs) = &slot.cs {
                check_convertible(&store.units[slot.range()], cs.units())?;
            }
        }
        debug!(
            length = store.length(),
            components = n,
            encodings = ?store.encodings,
            "constructed range store"
        );
        Ok(store)
    }
}

fn check_convertible(units: &[Option<Unit>], expected: &[Option<Unit>]) -> Result<()> {
    for (unit, target) in units.iter().zip(expected) {
        if let (Some(unit), Some(target)) = (unit, target) {
            if !unit.can_convert(target) {
                return Err(UnitError::Inconvertible {
                    from: *unit,
                    to: *target,
                }
                .into());
            }
        }
    }
    Ok(())
}

fn check_reference(
    cs: Option<&CoordinateSystemRef>,
    declared: Option<&CoordinateSystemRef>,
    dimension: usize,
) -> Result<()> {
    let Some(cs) = cs else {
        return Ok(());
    };
    if cs.dimension() != dimension {
        return Err(Error::DimensionMismatch {
            expected: dimension,
            found: cs.dimension(),
        });
    }
    if let Some(declared) = declared {
        if !cs.reference().equals_except_name(declared.reference()) {
            return Err(Error::CoordinateSystem(format!(
                "{} does not share the reference of declared {}",
                cs.name(),
                declared.name()
            )));
        }
    }
    Ok(())
}

impl RangeStore {
    pub fn builder(ty: FunctionType, domain: DomainSetRef) -> RangeStoreBuilder {
        RangeStoreBuilder {
            ty,
            domain,
            spaces: None,
            units: None,
            coords: None,
            policy: FieldPolicy::default(),
        }
    }

    /// A store with default value spaces, units and coordinate systems.
    pub fn new(ty: FunctionType, domain: DomainSetRef) -> Result<Self> {
        Self::builder(ty, domain).build()
    }

    pub(crate) fn from_parts(parts: StoreParts) -> Self {
        let encodings = parts.spaces.iter().map(|s| Encoding::choose(s.as_ref())).collect();
        let n = parts.spaces.len();
        Self {
            ty: parts.ty,
            domain: parts.domain,
            spaces: parts.spaces,
            encodings,
            units: parts.units,
            coords: parts.coords,
            policy: parts.policy,
            state: Mutex::new(StoreState::new(n)),
        }
    }

    /// A missing store of `ty` over `domain`, inheriting this store's policy.
    pub(crate) fn missing_like(&self, ty: &FunctionType, domain: DomainSetRef) -> Result<Self> {
        Self::builder(ty.clone(), domain).policy(self.policy).build()
    }

    // ========================================================================
    // Metadata
    // ========================================================================

    pub fn function_type(&self) -> &FunctionType {
        &self.ty
    }

    pub fn domain(&self) -> &DomainSetRef {
        &self.domain
    }

    /// Number of domain samples.
    pub fn length(&self) -> usize {
        self.domain.length()
    }

    pub fn range_dimension(&self) -> usize {
        self.encodings.len()
    }

    pub fn encodings(&self) -> &[Encoding] {
        &self.encodings
    }

    pub fn range_spaces(&self) -> &[ValueSpaceRef] {
        &self.spaces
    }

    pub fn range_units(&self) -> &[Option<Unit>] {
        &self.units
    }

    pub fn default_range_units(&self) -> Vec<Option<Unit>> {
        self.ty.default_range_units()
    }

    pub fn range_coordinates(&self) -> &RangeCoordinates {
        &self.coords
    }

    pub fn policy(&self) -> &FieldPolicy {
        &self.policy
    }

    /// Double when any component is stored as `f64`.
    pub fn precision(&self) -> Precision {
        Precision::for_operands(&self.encodings, &[])
    }

    pub(crate) fn parts(&self) -> StoreParts {
        StoreParts {
            ty: self.ty.clone(),
            domain: self.domain.clone(),
            spaces: self.spaces.clone(),
            units: self.units.clone(),
            coords: self.coords.clone(),
            policy: self.policy,
        }
    }

    /// Coordinate-bearing groups of the range in component order.
    pub(crate) fn tuple_slots(&self) -> Vec<TupleSlot> {
        let systems: Vec<Option<CoordinateSystemRef>> = match &self.coords {
            RangeCoordinates::Shared(cs) => vec![cs.clone()],
            RangeCoordinates::PerSubTuple(systems) => systems.clone(),
        };
        let members: Vec<RealTupleType> = match self.ty.range() {
            RangeType::Real(r) => vec![RealTupleType::new(vec![r.clone()])],
            RangeType::RealTuple(t) => vec![t.clone()],
            RangeType::Tuple(items) => items
                .iter()
                .map(|item| match item {
                    RangeComponent::Real(r) => RealTupleType::new(vec![r.clone()]),
                    RangeComponent::RealTuple(t) => t.clone(),
                })
                .collect(),
        };
        let mut offset = 0;
        members
            .into_iter()
            .zip(systems)
            .map(|(ty, cs)| {
                let slot = TupleSlot { offset, ty, cs };
                offset += slot.dimension();
                slot
            })
            .collect()
    }

    /// Whether `other` carries the same range coordinate systems.
    pub(crate) fn same_range_coordinates(&self, other: &RangeStore) -> bool {
        let (a, b) = (self.tuple_slots(), other.tuple_slots());
        a.len() == b.len()
            && a.iter()
                .zip(&b)
                .all(|(x, y)| same_coordinate_system(x.cs.as_ref(), y.cs.as_ref()))
    }

    // ========================================================================
    // Missing state and errors
    // ========================================================================

    pub fn is_missing(&self) -> bool {
        self.state.lock().missing
    }

    /// Mark the whole store missing. Storage is kept but no longer read.
    pub fn set_missing(&self) {
        self.state.lock().missing = true;
    }

    pub fn clear_missing(&self) {
        self.state.lock().missing = false;
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.state.lock().lifecycle
    }

    pub fn range_errors(&self) -> Vec<Option<ErrorEstimate>> {
        self.state.lock().errors.clone()
    }

    pub fn set_range_errors(&self, errors: Vec<Option<ErrorEstimate>>) -> Result<()> {
        self.check_tuple(errors.len())?;
        self.state.lock().errors = errors;
        Ok(())
    }

    fn check_tuple(&self, found: usize) -> Result<()> {
        if found != self.range_dimension() {
            return Err(Error::TupleLength {
                expected: self.range_dimension(),
                found,
            });
        }
        Ok(())
    }

    fn check_index(&self, index: usize) -> Result<()> {
        if index >= self.length() {
            return Err(Error::IndexOutOfRange {
                index,
                length: self.length(),
            });
        }
        Ok(())
    }

    // ========================================================================
    // Writers
    // ========================================================================

    /// Replace every sample. Columns are component-major, one value per
    /// domain sample, in the store's range units; they are taken over without
    /// copying where the encoding allows.
    #[instrument(skip_all, fields(components = values.len()))]
    pub fn set_samples<T: Real>(
        &self,
        values: Vec<Vec<T>>,
        errors: Option<Vec<Option<ErrorEstimate>>>,
    ) -> Result<()> {
        self.check_tuple(values.len())?;
        let length = self.length();
        for (component, column) in values.iter().enumerate() {
            if column.len() != length {
                return Err(Error::SampleCount {
                    component,
                    expected: length,
                    found: column.len(),
                });
            }
        }
        let errors = match errors {
            Some(errors) => {
                self.check_tuple(errors.len())?;
                errors
            }
            None => vec![None; self.range_dimension()],
        };

        let mut state = self.state.lock();
        let storage = values
            .into_iter()
            .enumerate()
            .map(|(i, column)| {
                ComponentStorage::pack(i, self.encodings[i], self.spaces[i].as_ref(), column)
                    .map(Some)
            })
            .collect::<Result<Vec<_>>>()?;
        state.storage = storage;
        state.errors = errors;
        state.missing = false;
        state.lifecycle = Lifecycle::Full;
        debug!(length, "packed all range components");
        Ok(())
    }

    /// Write the samples at `indices`. Existing error estimates are kept.
    pub fn set_samples_at<T: Real>(&self, indices: &[usize], values: &[Vec<T>]) -> Result<()> {
        self.check_tuple(values.len())?;
        for (component, column) in values.iter().enumerate() {
            if column.len() != indices.len() {
                return Err(Error::SampleCount {
                    component,
                    expected: indices.len(),
                    found: column.len(),
                });
            }
        }
        for index in indices {
            self.check_index(*index)?;
        }

        let length = self.length();
        let mut state = self.state.lock();
        for (i, column) in values.iter().enumerate() {
            let space = self.spaces[i].as_ref();
            let storage = state.storage[i]
                .get_or_insert_with(|| ComponentStorage::missing(self.encodings[i], length));
            for (index, value) in indices.iter().zip(column) {
                storage.set(*index, value.widen(), space);
            }
        }
        state.touch();
        trace!(count = indices.len(), "packed scattered samples");
        Ok(())
    }

    /// Write a contiguous run of samples beginning at `start`.
    pub fn set_samples_from<T: Real>(&self, start: usize, values: &[Vec<T>]) -> Result<()> {
        let count = values.first().map(Vec::len).unwrap_or(0);
        let length = self.length();
        let end = start
            .checked_add(count)
            .filter(|&end| end <= length)
            .ok_or(Error::IndexOutOfRange {
                index: start.max(length),
                length,
            })?;
        let indices: Vec<usize> = (start..end).collect();
        self.set_samples_at(&indices, values)
    }

    /// Write one sample, converting it into the store's units and coordinate
    /// systems. Error estimates attached to the sample are folded into the
    /// running per-component estimates.
    pub fn set_sample(&self, index: usize, sample: &Sample) -> Result<()> {
        self.check_index(index)?;
        let (values, errors) = self.sample_to_range(sample)?;

        let length = self.length();
        let mut state = self.state.lock();
        for (i, value) in values.iter().enumerate() {
            let storage = state.storage[i]
                .get_or_insert_with(|| ComponentStorage::missing(self.encodings[i], length));
            storage.set(index, *value, self.spaces[i].as_ref());

            if let Some(incoming) = errors[i] {
                if !value.is_nan() {
                    state.errors[i] = Some(match state.errors[i] {
                        Some(current) => current.accumulate(*value, incoming.error()),
                        None => ErrorEstimate::new(incoming.error(), *value, 1, self.units[i]),
                    });
                }
            }
        }
        state.touch();
        Ok(())
    }

    /// Flatten a sample into this store's units and coordinate systems.
    fn sample_to_range(&self, sample: &Sample) -> Result<(Vec<f64>, Vec<Option<ErrorEstimate>>)> {
        let groups = sample.groups()?;
        let slots = self.tuple_slots();
        if groups.len() != slots.len()
            || groups
                .iter()
                .zip(&slots)
                .any(|((scalars, _), slot)| scalars.len() != slot.dimension())
        {
            return Err(Error::TypeMismatch(format!(
                "sample of dimension {} does not match range of dimension {}",
                sample.dimension(),
                self.range_dimension()
            )));
        }

        let mut values = Vec::with_capacity(self.range_dimension());
        let mut errors = Vec::with_capacity(self.range_dimension());
        for ((scalars, cs), slot) in groups.iter().zip(&slots) {
            let units: Vec<Option<Unit>> = scalars.iter().map(|s| s.unit().copied()).collect();
            let errs: Vec<Option<ErrorEstimate>> =
                scalars.iter().map(|s| s.error().copied()).collect();
            let columns = scalars.iter().map(|s| vec![s.value()]).collect();
            let from = Frame::new(slot.value_type(cs.as_ref()), cs.as_ref(), &units, &errs);
            let to = Frame::new(&slot.ty, slot.cs.as_ref(), &self.units[slot.range()], &[]);
            let out = transform_coordinates(&from, &to, columns)?;
            values.extend(out.values.iter().map(|c| c[0]));
            errors.extend(out.errors);
        }
        Ok((values, errors))
    }

    // ========================================================================
    // Readers
    // ========================================================================

    fn unpack_locked<T: Real>(&self, state: &StoreState) -> Result<Vec<Vec<T>>> {
        let length = self.length();
        (0..self.range_dimension())
            .map(|i| match (&state.storage[i], state.missing) {
                (Some(storage), false) => storage.unpack(i, self.spaces[i].as_ref()),
                _ => Ok(vec![T::nan(); length]),
            })
            .collect()
    }

    /// All range values in the store's own units, component-major. A missing
    /// store yields NaN columns.
    pub fn unpack<T: Real>(&self) -> Result<Vec<Vec<T>>> {
        let state = self.state.lock();
        self.unpack_locked(&state)
    }

    pub fn unpack_values(&self) -> Result<Vec<Vec<f64>>> {
        self.unpack()
    }

    pub fn unpack_floats(&self) -> Result<Vec<Vec<f32>>> {
        self.unpack()
    }

    pub fn unpack_component<T: Real>(&self, component: usize) -> Result<Vec<T>> {
        if component >= self.range_dimension() {
            return Err(Error::IndexOutOfRange {
                index: component,
                length: self.range_dimension(),
            });
        }
        let state = self.state.lock();
        match (&state.storage[component], state.missing) {
            (Some(storage), false) => storage.unpack(component, self.spaces[component].as_ref()),
            _ => Ok(vec![T::nan(); self.length()]),
        }
    }

    /// Range tuple of one sample in the store's own units.
    pub fn unpack_sample(&self, index: usize) -> Result<Vec<f64>> {
        self.check_index(index)?;
        let state = self.state.lock();
        Ok(self.sample_locked(&state, index))
    }

    fn sample_locked(&self, state: &StoreState, index: usize) -> Vec<f64> {
        (0..self.range_dimension())
            .map(|i| match (&state.storage[i], state.missing) {
                (Some(storage), false) => storage.get(index, self.spaces[i].as_ref()),
                _ => f64::NAN,
            })
            .collect()
    }

    /// Copy values and errors out under one lock; None when missing.
    pub(crate) fn snapshot<T: Real>(&self) -> Result<Option<Snapshot<T>>> {
        let state = self.state.lock();
        if state.missing {
            return Ok(None);
        }
        Ok(Some(Snapshot {
            values: self.unpack_locked(&state)?,
            errors: state.errors.clone(),
        }))
    }

    /// Run `f` with per-index read access to the packed storage.
    pub(crate) fn with_sample_reader<R>(&self, f: impl FnOnce(&dyn Fn(usize) -> Vec<f64>) -> R) -> R {
        let state = self.state.lock();
        let read = |index: usize| self.sample_locked(&state, index);
        f(&read)
    }

    /// All range values converted to the range type's default units.
    pub fn get_values(&self) -> Result<Vec<Vec<f64>>> {
        self.get::<f64>()
    }

    pub fn get_floats(&self) -> Result<Vec<Vec<f32>>> {
        self.get::<f32>()
    }

    fn get<T: Real>(&self) -> Result<Vec<Vec<T>>> {
        let mut values = self.unpack::<T>()?;
        convert_tuple(&mut values, &self.units, &self.default_range_units())?;
        Ok(values)
    }

    /// One sample converted to the range type's default units.
    pub fn get_values_at(&self, index: usize) -> Result<Vec<f64>> {
        let values = self.unpack_sample(index)?;
        let mut columns: Vec<Vec<f64>> = values.into_iter().map(|v| vec![v]).collect();
        convert_tuple(&mut columns, &self.units, &self.default_range_units())?;
        Ok(columns.into_iter().map(|c| c[0]).collect())
    }

    /// Structured value of one sample. Out-of-range indices and missing
    /// stores give the range type's missing sample.
    pub fn get_sample(&self, index: usize) -> Result<Sample> {
        let n = self.range_dimension();
        let (values, errors) = if index < self.length() {
            let state = self.state.lock();
            (self.sample_locked(&state, index), state.errors.clone())
        } else {
            (vec![f64::NAN; n], vec![None; n])
        };

        let scalars: Vec<Scalar> = values
            .iter()
            .zip(&self.units)
            .zip(&errors)
            .map(|((v, u), e)| Scalar::new(*v, *u).with_error(*e))
            .collect();

        let groups: Vec<Sample> = self
            .tuple_slots()
            .iter()
            .enumerate()
            .map(|(k, slot)| {
                let single = match self.ty.range() {
                    RangeType::Real(_) => true,
                    RangeType::RealTuple(_) => false,
                    RangeType::Tuple(items) => matches!(items.get(k), Some(RangeComponent::Real(_))),
                };
                if single {
                    Sample::Real(scalars[slot.offset])
                } else {
                    Sample::RealTuple {
                        components: scalars[slot.range()].to_vec(),
                        coordinate_system: slot.cs.clone(),
                    }
                }
            })
            .collect();

        Ok(match self.ty.range() {
            RangeType::Tuple(_) => Sample::Tuple(groups),
            _ => groups.into_iter().next().unwrap_or(Sample::Tuple(Vec::new())),
        })
    }
}

impl Clone for RangeStore {
    /// Deep copy: storage and metadata are duplicated, collaborators shared.
    fn clone(&self) -> Self {
        let state = self.state.lock().clone();
        Self {
            ty: self.ty.clone(),
            domain: self.domain.clone(),
            spaces: self.spaces.clone(),
            encodings: self.encodings.clone(),
            units: self.units.clone(),
            coords: self.coords.clone(),
            policy: self.policy,
            state: Mutex::new(state),
        }
    }
}

/// Shared handle for stores read by several threads.
pub type RangeStoreRef = Arc<RangeStore>;
