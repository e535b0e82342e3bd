//! Errors raised by range stores and their engines.
//!
//! # Error Categories
//!
//! - **Shape errors**: [`Error::TupleLength`], [`Error::SampleCount`],
//!   [`Error::IndexOutOfRange`], [`Error::DimensionMismatch`]
//! - **Compatibility errors**: [`Error::Unit`], [`Error::CoordinateSystem`],
//!   [`Error::DomainIncompatible`]
//! - **Operation errors**: [`Error::TypeMismatch`], [`Error::UnsupportedOperation`]
//! - **Invariant violations**: [`Error::StorageConsistency`], [`Error::InvalidSet`]
//!
//! Shape and compatibility errors are detected before any mutation, so a store
//! that returns one is left unchanged. Per-sample numeric failures are never
//! reported here: they degrade to the missing sentinel for that sample.

use flatfield_units::UnitError;
use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// The number of range components supplied does not match the range
    /// tuple dimension of the store.
    #[error("tuple length mismatch: expected {expected} components, found {found}")]
    TupleLength { expected: usize, found: usize },

    /// A component column does not have one value per target sample.
    #[error("component {component} has {found} samples, expected {expected}")]
    SampleCount {
        component: usize,
        expected: usize,
        found: usize,
    },

    #[error("sample index {index} out of range for length {length}")]
    IndexOutOfRange { index: usize, length: usize },

    /// Domain dimensionality differs between two samplings, or an axis is
    /// outside the domain.
    #[error("dimension mismatch: expected {expected}, found {found}")]
    DimensionMismatch { expected: usize, found: usize },

    #[error(transparent)]
    Unit(#[from] UnitError),

    #[error("coordinate system mismatch: {0}")]
    CoordinateSystem(String),

    #[error("domain incompatible: {0}")]
    DomainIncompatible(String),

    /// A declared output type does not have the shape of the algebraic result.
    #[error("type mismatch: {0}")]
    TypeMismatch(String),

    #[error("unsupported operation: {0}")]
    UnsupportedOperation(String),

    /// A component's storage does not agree with its encoding or value space.
    ///
    /// Indicates a construction invariant violation; never expected at runtime.
    #[error("storage consistency violated for component {component}: {reason}")]
    StorageConsistency { component: usize, reason: String },

    #[error("invalid set: {0}")]
    InvalidSet(String),
}
