// Allow unwrap in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]

//! Typed range-value store for sampled functions.
//!
//! A [`RangeStore`] holds the range values of a function sampled over a
//! finite domain set. Each range component is packed into the most compact
//! [`Encoding`] its value space allows; arithmetic, resampling and
//! derivatives unpack, compute in a single generic pipeline and pack the
//! result into a new store.
//!
//! # Modules
//!
//! - [`types`]: function, range and real types
//! - [`sets`]: value spaces and domain samplings
//! - [`coord`]: coordinate systems and the transform service
//! - [`codec`]: encoding choice and per-component packing
//! - [`store`]: the range store itself
//! - [`error_estimate`]: uncertainty estimates and propagation rules
//! - [`engine`]: arithmetic, resampling and derivative engines
//! - [`policy`]: sampling and error modes, tunable heuristics
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use flatfield::{
//!     BinaryOp, ErrorMode, FunctionType, LinearSet, Operand, RangeStore, RealType, SamplingMode,
//! };
//! use flatfield_units::Unit;
//!
//! let ty = FunctionType::scalar(
//!     RealType::new("time", Some(Unit::seconds())),
//!     RealType::new("temperature", Some(Unit::kelvin())),
//! );
//! let domain = Arc::new(LinearSet::linear_1d(0.0, 2.0, 3, Some(Unit::seconds())).unwrap());
//! let store = RangeStore::new(ty.clone(), domain).unwrap();
//! store.set_samples(vec![vec![280.0f32, 290.0, 300.0]], None).unwrap();
//!
//! let doubled = store
//!     .binary(BinaryOp::Add, Operand::Field(&store), &ty, SamplingMode::NearestNeighbor, ErrorMode::NoErrors)
//!     .unwrap();
//! assert_eq!(doubled.unpack_values().unwrap(), vec![vec![560.0, 580.0, 600.0]]);
//! ```

pub mod codec;
pub mod coord;
pub mod engine;
pub mod error;
pub mod error_estimate;
pub mod policy;
pub mod real;
pub mod sample;
pub mod sets;
pub mod store;
pub mod types;

pub use codec::{ComponentStorage, Encoding};
pub use coord::{
    transform_coordinates, transform_coordinates_free_units, CoordinateSystem,
    CoordinateSystemRef, Frame, PolarCoordinateSystem, Transformed,
};
pub use engine::{BinaryFamily, BinaryOp, Operand, UnaryOp};
pub use error::{Error, Result};
pub use error_estimate::ErrorEstimate;
pub use policy::{DerivativePolicy, ErrorMode, FieldPolicy, ResamplePolicy, SamplingMode};
pub use real::{Precision, Real};
pub use sample::{Sample, Scalar};
pub use sets::{
    ContinuousSpace, DomainSet, DomainSetRef, IntegerSpace, IrregularSet1D, LinearAxis,
    LinearSet, LinearSpace, SingletonSet, SpaceKind, ValueSpace, ValueSpaceRef,
};
pub use store::{Lifecycle, RangeCoordinates, RangeStore, RangeStoreBuilder, RangeStoreRef};
pub use types::{FunctionType, RangeComponent, RangeType, RealTupleType, RealType};
