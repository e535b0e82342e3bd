//! Sampling collaborators: per-component value spaces and domain samplings.

pub mod domain;
pub mod grid;
pub mod value_space;

pub use domain::{DomainSet, DomainSetRef, IrregularSet1D, LinearSet, SingletonSet};
pub use grid::LinearAxis;
pub use value_space::{
    ContinuousSpace, IntegerSpace, LinearSpace, SpaceKind, ValueSpace, ValueSpaceRef,
};
