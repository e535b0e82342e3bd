//! Store policy configuration.
//!
//! Defines the sampling and error-propagation modes accepted by the engines
//! and the tunables every store carries. Derived stores inherit the policy of
//! the store they were computed from.

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Tunables carried by every range store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FieldPolicy {
    #[serde(default)]
    pub resample: ResamplePolicy,

    #[serde(default)]
    pub derivative: DerivativePolicy,
}

/// Resampling cost heuristics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResamplePolicy {
    /// Unpack the whole source range up front when
    /// `bulk_unpack_ratio * target_len > source_len`.
    pub bulk_unpack_ratio: usize,
}

impl Default for ResamplePolicy {
    fn default() -> Self {
        Self {
            bulk_unpack_ratio: 10,
        }
    }
}

impl ResamplePolicy {
    /// Whether a bulk unpack is cheaper than per-index lookups for a target
    /// sampling of `target_len` points.
    pub fn prefers_bulk(&self, target_len: usize, source_len: usize) -> bool {
        self.bulk_unpack_ratio.saturating_mul(target_len) > source_len
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DerivativePolicy {
    /// Attach error estimates to derivative results.
    pub propagate_errors: bool,
}

/// How range values are looked up at target domain points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SamplingMode {
    /// Value of the closest source sample.
    #[default]
    NearestNeighbor,
    /// Multilinear interpolation between enclosing source samples.
    WeightedAverage,
}

impl SamplingMode {
    pub const fn code(self) -> i32 {
        match self {
            SamplingMode::NearestNeighbor => 100,
            SamplingMode::WeightedAverage => 101,
        }
    }
}

impl TryFrom<i32> for SamplingMode {
    type Error = Error;

    fn try_from(code: i32) -> Result<Self, Self::Error> {
        match code {
            100 => Ok(SamplingMode::NearestNeighbor),
            101 => Ok(SamplingMode::WeightedAverage),
            other => Err(Error::UnsupportedOperation(format!(
                "unknown sampling mode {other}"
            ))),
        }
    }
}

/// How error magnitudes from separate sources combine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorMode {
    /// Errors are uncorrelated: root-sum-of-squares.
    Independent,
    /// Errors are correlated: linear sum.
    Dependent,
    /// Do not track errors; results carry no estimates.
    #[default]
    NoErrors,
}

impl ErrorMode {
    pub const fn code(self) -> i32 {
        match self {
            ErrorMode::Independent => 200,
            ErrorMode::Dependent => 201,
            ErrorMode::NoErrors => 202,
        }
    }

    pub fn tracks_errors(self) -> bool {
        !matches!(self, ErrorMode::NoErrors)
    }

    /// Combine two error magnitudes.
    pub fn combine(self, a: f64, b: f64) -> f64 {
        match self {
            ErrorMode::Independent => (a * a + b * b).sqrt(),
            ErrorMode::Dependent | ErrorMode::NoErrors => a + b,
        }
    }

    /// Combine any number of error magnitudes.
    pub fn combine_all(self, parts: impl IntoIterator<Item = f64>) -> f64 {
        match self {
            ErrorMode::Independent => parts.into_iter().map(|p| p * p).sum::<f64>().sqrt(),
            ErrorMode::Dependent | ErrorMode::NoErrors => parts.into_iter().sum(),
        }
    }
}

impl TryFrom<i32> for ErrorMode {
    type Error = Error;

    fn try_from(code: i32) -> Result<Self, Self::Error> {
        match code {
            200 => Ok(ErrorMode::Independent),
            201 => Ok(ErrorMode::Dependent),
            202 => Ok(ErrorMode::NoErrors),
            other => Err(Error::UnsupportedOperation(format!(
                "unknown error mode {other}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_codes() {
        assert_eq!(SamplingMode::try_from(101).unwrap(), SamplingMode::WeightedAverage);
        assert_eq!(ErrorMode::try_from(200).unwrap(), ErrorMode::Independent);
        assert!(ErrorMode::try_from(7).is_err());
        assert_eq!(ErrorMode::Dependent.code(), 201);
    }

    #[test]
    fn test_combine() {
        assert!((ErrorMode::Independent.combine(3.0, 4.0) - 5.0).abs() < 1e-12);
        assert!((ErrorMode::Dependent.combine(3.0, 4.0) - 7.0).abs() < 1e-12);
        assert!((ErrorMode::Independent.combine_all([1.0, 2.0, 2.0]) - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_bulk_heuristic() {
        let policy = ResamplePolicy::default();
        assert!(policy.prefers_bulk(11, 100));
        assert!(!policy.prefers_bulk(10, 100));
    }

    #[test]
    fn test_policy_serde_defaults() {
        let policy: FieldPolicy = serde_json::from_str("{}").unwrap();
        assert_eq!(policy, FieldPolicy::default());

        let policy: FieldPolicy =
            serde_json::from_str(r#"{"resample":{"bulk_unpack_ratio":4}}"#).unwrap();
        assert_eq!(policy.resample.bulk_unpack_ratio, 4);
        assert!(!policy.derivative.propagate_errors);
    }
}
