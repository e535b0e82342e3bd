//! Numeric engines over range stores: elementwise arithmetic, resampling,
//! and derivatives.

pub mod arithmetic;
pub mod derivative;
pub mod ops;
pub mod resample;

pub use arithmetic::Operand;
pub use ops::{BinaryFamily, BinaryOp, UnaryOp};
