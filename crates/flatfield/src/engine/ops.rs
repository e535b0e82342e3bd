//! Operator codes for the arithmetic engine.
//!
//! The integer codes are stable and accepted through `TryFrom<i32>`; an
//! unknown code is an [`Error::UnsupportedOperation`].

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Elementwise binary operators. `Inv*` variants swap the operand order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BinaryOp {
    Add,
    Subtract,
    InvSubtract,
    Multiply,
    Divide,
    InvDivide,
    Pow,
    InvPow,
    Max,
    Min,
    Atan2,
    Atan2Degrees,
    InvAtan2,
    InvAtan2Degrees,
    Remainder,
    InvRemainder,
}

/// How a binary operator reconciles operand units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryFamily {
    /// Operands share one absolute unit; output keeps it.
    Additive,
    /// Operands are made absolute; output unit is their product/quotient.
    Multiplicative,
    /// Base keeps its unit when dimensionless; exponent made rational.
    Power,
    /// Operands share one absolute unit; output is an angle.
    Angular,
    /// Operands share one absolute unit; output keeps it.
    Remainder,
}

impl BinaryOp {
    pub const ALL: [BinaryOp; 16] = [
        BinaryOp::Add,
        BinaryOp::Subtract,
        BinaryOp::InvSubtract,
        BinaryOp::Multiply,
        BinaryOp::Divide,
        BinaryOp::InvDivide,
        BinaryOp::Pow,
        BinaryOp::InvPow,
        BinaryOp::Max,
        BinaryOp::Min,
        BinaryOp::Atan2,
        BinaryOp::Atan2Degrees,
        BinaryOp::InvAtan2,
        BinaryOp::InvAtan2Degrees,
        BinaryOp::Remainder,
        BinaryOp::InvRemainder,
    ];

    pub const fn code(self) -> i32 {
        match self {
            BinaryOp::Add => 1,
            BinaryOp::Subtract => 2,
            BinaryOp::InvSubtract => 3,
            BinaryOp::Multiply => 4,
            BinaryOp::Divide => 5,
            BinaryOp::InvDivide => 6,
            BinaryOp::Pow => 7,
            BinaryOp::InvPow => 8,
            BinaryOp::Max => 9,
            BinaryOp::Min => 10,
            BinaryOp::Atan2 => 11,
            BinaryOp::Atan2Degrees => 12,
            BinaryOp::InvAtan2 => 13,
            BinaryOp::InvAtan2Degrees => 14,
            BinaryOp::Remainder => 15,
            BinaryOp::InvRemainder => 16,
        }
    }

    /// The operator computing the same result with the operands swapped.
    pub const fn invert(self) -> BinaryOp {
        match self {
            BinaryOp::Add => BinaryOp::Add,
            BinaryOp::Subtract => BinaryOp::InvSubtract,
            BinaryOp::InvSubtract => BinaryOp::Subtract,
            BinaryOp::Multiply => BinaryOp::Multiply,
            BinaryOp::Divide => BinaryOp::InvDivide,
            BinaryOp::InvDivide => BinaryOp::Divide,
            BinaryOp::Pow => BinaryOp::InvPow,
            BinaryOp::InvPow => BinaryOp::Pow,
            BinaryOp::Max => BinaryOp::Max,
            BinaryOp::Min => BinaryOp::Min,
            BinaryOp::Atan2 => BinaryOp::InvAtan2,
            BinaryOp::Atan2Degrees => BinaryOp::InvAtan2Degrees,
            BinaryOp::InvAtan2 => BinaryOp::Atan2,
            BinaryOp::InvAtan2Degrees => BinaryOp::Atan2Degrees,
            BinaryOp::Remainder => BinaryOp::InvRemainder,
            BinaryOp::InvRemainder => BinaryOp::Remainder,
        }
    }

    /// True for `Inv*` operators, which evaluate `f(b, a)`.
    pub const fn is_reversed(self) -> bool {
        matches!(
            self,
            BinaryOp::InvSubtract
                | BinaryOp::InvDivide
                | BinaryOp::InvPow
                | BinaryOp::InvAtan2
                | BinaryOp::InvAtan2Degrees
                | BinaryOp::InvRemainder
        )
    }

    /// The operator in natural operand order (`InvDivide` → `Divide`).
    pub const fn forward(self) -> BinaryOp {
        if self.is_reversed() {
            self.invert()
        } else {
            self
        }
    }

    pub const fn family(self) -> BinaryFamily {
        match self.forward() {
            BinaryOp::Multiply | BinaryOp::Divide => BinaryFamily::Multiplicative,
            BinaryOp::Pow => BinaryFamily::Power,
            BinaryOp::Atan2 | BinaryOp::Atan2Degrees => BinaryFamily::Angular,
            BinaryOp::Remainder => BinaryFamily::Remainder,
            _ => BinaryFamily::Additive,
        }
    }

    pub const fn yields_degrees(self) -> bool {
        matches!(self, BinaryOp::Atan2Degrees | BinaryOp::InvAtan2Degrees)
    }
}

impl TryFrom<i32> for BinaryOp {
    type Error = Error;

    fn try_from(code: i32) -> Result<Self, Self::Error> {
        BinaryOp::ALL
            .into_iter()
            .find(|op| op.code() == code)
            .ok_or_else(|| Error::UnsupportedOperation(format!("unknown binary operator {code}")))
    }
}

/// Elementwise unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnaryOp {
    Abs,
    Acos,
    AcosDegrees,
    Asin,
    AsinDegrees,
    Atan,
    AtanDegrees,
    Ceil,
    Cos,
    CosDegrees,
    Exp,
    Floor,
    Log,
    Rint,
    Round,
    Sin,
    SinDegrees,
    Sqrt,
    Tan,
    TanDegrees,
    Negate,
    Nop,
}

impl UnaryOp {
    pub const ALL: [UnaryOp; 22] = [
        UnaryOp::Abs,
        UnaryOp::Acos,
        UnaryOp::AcosDegrees,
        UnaryOp::Asin,
        UnaryOp::AsinDegrees,
        UnaryOp::Atan,
        UnaryOp::AtanDegrees,
        UnaryOp::Ceil,
        UnaryOp::Cos,
        UnaryOp::CosDegrees,
        UnaryOp::Exp,
        UnaryOp::Floor,
        UnaryOp::Log,
        UnaryOp::Rint,
        UnaryOp::Round,
        UnaryOp::Sin,
        UnaryOp::SinDegrees,
        UnaryOp::Sqrt,
        UnaryOp::Tan,
        UnaryOp::TanDegrees,
        UnaryOp::Negate,
        UnaryOp::Nop,
    ];

    pub const fn code(self) -> i32 {
        match self {
            UnaryOp::Abs => 21,
            UnaryOp::Acos => 22,
            UnaryOp::AcosDegrees => 23,
            UnaryOp::Asin => 24,
            UnaryOp::AsinDegrees => 25,
            UnaryOp::Atan => 26,
            UnaryOp::AtanDegrees => 27,
            UnaryOp::Ceil => 28,
            UnaryOp::Cos => 29,
            UnaryOp::CosDegrees => 30,
            UnaryOp::Exp => 31,
            UnaryOp::Floor => 32,
            UnaryOp::Log => 33,
            UnaryOp::Rint => 34,
            UnaryOp::Round => 35,
            UnaryOp::Sin => 36,
            UnaryOp::SinDegrees => 37,
            UnaryOp::Sqrt => 38,
            UnaryOp::Tan => 39,
            UnaryOp::TanDegrees => 40,
            UnaryOp::Negate => 41,
            UnaryOp::Nop => 42,
        }
    }

    /// Inverse trigonometric operators, whose output is an angle.
    pub const fn is_inverse_trig(self) -> bool {
        matches!(
            self,
            UnaryOp::Acos
                | UnaryOp::AcosDegrees
                | UnaryOp::Asin
                | UnaryOp::AsinDegrees
                | UnaryOp::Atan
                | UnaryOp::AtanDegrees
        )
    }

    /// Direct trigonometric operators, whose input is an angle.
    pub const fn is_direct_trig(self) -> bool {
        matches!(
            self,
            UnaryOp::Cos
                | UnaryOp::CosDegrees
                | UnaryOp::Sin
                | UnaryOp::SinDegrees
                | UnaryOp::Tan
                | UnaryOp::TanDegrees
        )
    }

    /// Operators whose angle (input or output) is measured in degrees.
    pub const fn uses_degrees(self) -> bool {
        matches!(
            self,
            UnaryOp::AcosDegrees
                | UnaryOp::AsinDegrees
                | UnaryOp::AtanDegrees
                | UnaryOp::CosDegrees
                | UnaryOp::SinDegrees
                | UnaryOp::TanDegrees
        )
    }

    /// Operators that leave the unit of their input unchanged.
    pub const fn preserves_unit(self) -> bool {
        matches!(
            self,
            UnaryOp::Abs
                | UnaryOp::Ceil
                | UnaryOp::Floor
                | UnaryOp::Rint
                | UnaryOp::Round
                | UnaryOp::Negate
                | UnaryOp::Nop
        )
    }
}

impl TryFrom<i32> for UnaryOp {
    type Error = Error;

    fn try_from(code: i32) -> Result<Self, Self::Error> {
        UnaryOp::ALL
            .into_iter()
            .find(|op| op.code() == code)
            .ok_or_else(|| Error::UnsupportedOperation(format!("unknown unary operator {code}")))
    }
}
