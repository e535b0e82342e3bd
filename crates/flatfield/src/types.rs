//! Math types describing a sampled function.
//!
//! A [`FunctionType`] maps a [`RealTupleType`] domain to a [`RangeType`]. The
//! range is either a single real, a real tuple sharing one coordinate system,
//! or a tuple of those, each sub-tuple with its own coordinate system.
//!
//! Type checks throughout the crate use `equals_except_name`: two types match
//! when their structure, interval flags, unit convertibility and coordinate
//! systems agree, whatever their names.

use std::fmt;
use std::sync::Arc;

use flatfield_units::Unit;
use serde::{Deserialize, Serialize};

use crate::coord::{same_coordinate_system, CoordinateSystem, CoordinateSystemRef};
use crate::error::{Error, Result};

// ============================================================================
// RealType
// ============================================================================

/// A named scalar quantity with an optional default unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RealType {
    name: String,
    default_unit: Option<Unit>,
    /// Interval quantities (differences) are always carried in absolute units.
    interval: bool,
}

impl RealType {
    pub fn new(name: impl Into<String>, default_unit: Option<Unit>) -> Self {
        Self {
            name: name.into(),
            default_unit,
            interval: false,
        }
    }

    pub fn interval(name: impl Into<String>, default_unit: Option<Unit>) -> Self {
        Self {
            name: name.into(),
            default_unit: default_unit.map(|u| u.absolute()),
            interval: true,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn default_unit(&self) -> Option<&Unit> {
        self.default_unit.as_ref()
    }

    pub fn is_interval(&self) -> bool {
        self.interval
    }

    pub fn equals_except_name(&self, other: &RealType) -> bool {
        self.interval == other.interval
            && units_compatible(self.default_unit.as_ref(), other.default_unit.as_ref())
    }
}

fn units_compatible(a: Option<&Unit>, b: Option<&Unit>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => a.can_convert(b),
        _ => false,
    }
}

impl fmt::Display for RealType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.default_unit {
            Some(unit) => write!(f, "{}[{}]", self.name, unit),
            None => write!(f, "{}", self.name),
        }
    }
}

// ============================================================================
// RealTupleType
// ============================================================================

/// An ordered tuple of reals, optionally bound to a coordinate system.
///
/// Vector tuples (wind, velocity) are re-expressed in new domain axes when
/// a field is resampled across a domain coordinate transform.
#[derive(Debug, Clone)]
pub struct RealTupleType {
    components: Vec<RealType>,
    coordinate_system: Option<CoordinateSystemRef>,
    vector: bool,
}

impl RealTupleType {
    pub fn new(components: Vec<RealType>) -> Self {
        Self {
            components,
            coordinate_system: None,
            vector: false,
        }
    }

    /// Bind a coordinate system. Its reference must have the tuple's
    /// dimension and its units must convert with the component defaults.
    pub fn with_coordinate_system(
        components: Vec<RealType>,
        cs: CoordinateSystemRef,
    ) -> Result<Self> {
        if cs.dimension() != components.len() {
            return Err(Error::DimensionMismatch {
                expected: components.len(),
                found: cs.dimension(),
            });
        }
        for (component, cs_unit) in components.iter().zip(cs.units()) {
            if let (Some(default), Some(cs_unit)) = (component.default_unit(), cs_unit) {
                if !default.can_convert(cs_unit) {
                    return Err(Error::CoordinateSystem(format!(
                        "{} units {} do not convert with component {}",
                        cs.name(),
                        cs_unit,
                        component
                    )));
                }
            }
        }
        Ok(Self {
            components,
            coordinate_system: Some(cs),
            vector: false,
        })
    }

    /// Mark the tuple as a vector quantity.
    pub fn into_vector(mut self) -> Self {
        self.vector = true;
        self
    }

    pub fn components(&self) -> &[RealType] {
        &self.components
    }

    pub fn dimension(&self) -> usize {
        self.components.len()
    }

    pub fn coordinate_system(&self) -> Option<&CoordinateSystemRef> {
        self.coordinate_system.as_ref()
    }

    pub fn is_vector(&self) -> bool {
        self.vector
    }

    pub fn default_units(&self) -> Vec<Option<Unit>> {
        self.components
            .iter()
            .map(|c| c.default_unit().copied())
            .collect()
    }

    pub fn equals_except_name(&self, other: &RealTupleType) -> bool {
        self.dimension() == other.dimension()
            && self.vector == other.vector
            && self
                .components
                .iter()
                .zip(&other.components)
                .all(|(a, b)| a.equals_except_name(b))
            && same_coordinate_system(self.coordinate_system(), other.coordinate_system())
    }
}

impl PartialEq for RealTupleType {
    fn eq(&self, other: &Self) -> bool {
        self.components == other.components
            && self.vector == other.vector
            && same_coordinate_system(self.coordinate_system(), other.coordinate_system())
    }
}

// ============================================================================
// RangeType
// ============================================================================

/// One top-level member of a tuple range.
#[derive(Debug, Clone, PartialEq)]
pub enum RangeComponent {
    Real(RealType),
    RealTuple(RealTupleType),
}

impl RangeComponent {
    pub fn dimension(&self) -> usize {
        match self {
            RangeComponent::Real(_) => 1,
            RangeComponent::RealTuple(t) => t.dimension(),
        }
    }

    pub fn reals(&self) -> Vec<RealType> {
        match self {
            RangeComponent::Real(r) => vec![r.clone()],
            RangeComponent::RealTuple(t) => t.components().to_vec(),
        }
    }

    pub fn coordinate_system(&self) -> Option<&CoordinateSystemRef> {
        match self {
            RangeComponent::Real(_) => None,
            RangeComponent::RealTuple(t) => t.coordinate_system(),
        }
    }

    fn equals_except_name(&self, other: &RangeComponent) -> bool {
        match (self, other) {
            (RangeComponent::Real(a), RangeComponent::Real(b)) => a.equals_except_name(b),
            (RangeComponent::RealTuple(a), RangeComponent::RealTuple(b)) => {
                a.equals_except_name(b)
            }
            _ => false,
        }
    }

    fn same_shape(&self, other: &RangeComponent) -> bool {
        match (self, other) {
            (RangeComponent::Real(_), RangeComponent::Real(_)) => true,
            (RangeComponent::RealTuple(a), RangeComponent::RealTuple(b)) => {
                a.dimension() == b.dimension()
            }
            _ => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RangeType {
    Real(RealType),
    RealTuple(RealTupleType),
    Tuple(Vec<RangeComponent>),
}

impl RangeType {
    /// Number of scalar components after flattening.
    pub fn dimension(&self) -> usize {
        match self {
            RangeType::Real(_) => 1,
            RangeType::RealTuple(t) => t.dimension(),
            RangeType::Tuple(items) => items.iter().map(RangeComponent::dimension).sum(),
        }
    }

    /// Whether the whole range shares one coordinate system slot.
    pub fn is_real(&self) -> bool {
        !matches!(self, RangeType::Tuple(_))
    }

    pub fn flat_components(&self) -> Vec<RealType> {
        self.components()
            .iter()
            .flat_map(RangeComponent::reals)
            .collect()
    }

    /// Top-level components as seen by component extraction. A real tuple
    /// range exposes each of its reals.
    pub fn components(&self) -> Vec<RangeComponent> {
        match self {
            RangeType::Real(r) => vec![RangeComponent::Real(r.clone())],
            RangeType::RealTuple(t) => t
                .components()
                .iter()
                .cloned()
                .map(RangeComponent::Real)
                .collect(),
            RangeType::Tuple(items) => items.clone(),
        }
    }

    pub fn equals_except_name(&self, other: &RangeType) -> bool {
        match (self, other) {
            (RangeType::Real(a), RangeType::Real(b)) => a.equals_except_name(b),
            (RangeType::RealTuple(a), RangeType::RealTuple(b)) => a.equals_except_name(b),
            (RangeType::Tuple(a), RangeType::Tuple(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.equals_except_name(y))
            }
            _ => false,
        }
    }

    /// Structural equality ignoring names, units and coordinate systems.
    pub fn same_shape(&self, other: &RangeType) -> bool {
        match (self, other) {
            (RangeType::Real(_), RangeType::Real(_)) => true,
            (RangeType::RealTuple(a), RangeType::RealTuple(b)) => a.dimension() == b.dimension(),
            (RangeType::Tuple(a), RangeType::Tuple(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.same_shape(y))
            }
            _ => false,
        }
    }
}

// ============================================================================
// FunctionType
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionType {
    domain: RealTupleType,
    range: RangeType,
}

impl FunctionType {
    pub fn new(domain: RealTupleType, range: RangeType) -> Self {
        Self { domain, range }
    }

    /// A function from a one-dimensional domain to a single real.
    pub fn scalar(domain: RealType, range: RealType) -> Self {
        Self::new(RealTupleType::new(vec![domain]), RangeType::Real(range))
    }

    pub fn domain(&self) -> &RealTupleType {
        &self.domain
    }

    pub fn range(&self) -> &RangeType {
        &self.range
    }

    pub fn domain_dimension(&self) -> usize {
        self.domain.dimension()
    }

    pub fn range_dimension(&self) -> usize {
        self.range.dimension()
    }

    pub fn flat_range(&self) -> Vec<RealType> {
        self.range.flat_components()
    }

    pub fn default_range_units(&self) -> Vec<Option<Unit>> {
        self.flat_range()
            .iter()
            .map(|r| r.default_unit().copied())
            .collect()
    }

    pub fn is_real_range(&self) -> bool {
        self.range.is_real()
    }

    pub fn equals_except_name(&self, other: &FunctionType) -> bool {
        self.domain.equals_except_name(&other.domain)
            && self.range.equals_except_name(&other.range)
    }

    /// Whether `other` can describe the result of an elementwise operation
    /// on this type: same domain, same range structure.
    pub fn same_shape(&self, other: &FunctionType) -> bool {
        self.domain.equals_except_name(&other.domain) && self.range.same_shape(&other.range)
    }

    /// [`same_shape`](Self::same_shape), and the range coordinate systems
    /// match slot by slot. Units may differ.
    pub fn same_frames(&self, other: &FunctionType) -> bool {
        self.same_shape(other)
            && range_coordinate_systems(&self.range)
                .iter()
                .zip(range_coordinate_systems(&other.range))
                .all(|(a, b)| same_coordinate_system(a.as_ref(), b.as_ref()))
    }
}

/// Coordinate system slots of a range, in declaration order.
pub(crate) fn range_coordinate_systems(range: &RangeType) -> Vec<Option<Arc<dyn CoordinateSystem>>> {
    match range {
        RangeType::Real(_) => vec![None],
        RangeType::RealTuple(t) => vec![t.coordinate_system().cloned()],
        RangeType::Tuple(items) => items
            .iter()
            .map(|item| item.coordinate_system().cloned())
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coord::PolarCoordinateSystem;

    fn time() -> RealType {
        RealType::new("time", Some(Unit::seconds()))
    }

    #[test]
    fn test_equals_except_name() {
        let a = FunctionType::scalar(time(), RealType::new("temp", Some(Unit::celsius())));
        let b = FunctionType::scalar(
            RealType::new("t", Some(Unit::hours())),
            RealType::new("temperature", Some(Unit::kelvin())),
        );
        assert!(a.equals_except_name(&b));

        let c = FunctionType::scalar(time(), RealType::new("len", Some(Unit::meters())));
        assert!(!a.equals_except_name(&c));
        assert!(a.same_shape(&c));
    }

    #[test]
    fn test_interval_is_absolute() {
        let dt = RealType::interval("dT", Some(Unit::celsius()));
        assert_eq!(dt.default_unit(), Some(&Unit::kelvin()));
        assert!(dt.is_interval());
    }

    #[test]
    fn test_flatten_tuple_range() {
        let polar = RealTupleType::with_coordinate_system(
            vec![
                RealType::new("r", Some(Unit::meters())),
                RealType::new("theta", Some(Unit::degrees())),
            ],
            Arc::new(PolarCoordinateSystem::new()),
        )
        .unwrap();
        let range = RangeType::Tuple(vec![
            RangeComponent::Real(RealType::new("temp", Some(Unit::kelvin()))),
            RangeComponent::RealTuple(polar),
        ]);
        assert_eq!(range.dimension(), 3);
        assert!(!range.is_real());
        assert_eq!(range.flat_components()[2].name(), "theta");

        let slots = range_coordinate_systems(&range);
        assert!(slots[0].is_none());
        assert!(slots[1].is_some());
    }

    #[test]
    fn test_coordinate_system_dimension_checked() {
        let result = RealTupleType::with_coordinate_system(
            vec![RealType::new("r", None)],
            Arc::new(PolarCoordinateSystem::new()),
        );
        assert!(matches!(result, Err(Error::DimensionMismatch { .. })));
    }
}
