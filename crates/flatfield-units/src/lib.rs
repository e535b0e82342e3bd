// Allow unwrap in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]

//! Physical units for range-value stores.
//!
//! Provides the [`Unit`] type with SI dimensional analysis, the affine and
//! promiscuous kinds needed by field arithmetic, and conversion of value
//! columns between convertible units.

pub mod convert;
pub mod unit;

pub use convert::{convert_tuple, convert_value, convert_values, Conversion, UnitError};
pub use unit::{Dimension, Unit, UnitDimensions, UnitKind};
