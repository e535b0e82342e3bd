//! Evenly spaced axes and the index/weight lookups shared by value spaces
//! and gridded domain samplings.

use crate::error::{Error, Result};

/// `count` evenly spaced values from `first` to `last` inclusive.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearAxis {
    first: f64,
    last: f64,
    count: usize,
}

impl LinearAxis {
    pub fn new(first: f64, last: f64, count: usize) -> Result<Self> {
        if count == 0 {
            return Err(Error::InvalidSet("axis needs at least one sample".into()));
        }
        if !first.is_finite() || !last.is_finite() {
            return Err(Error::InvalidSet(format!(
                "axis bounds must be finite, got [{first}, {last}]"
            )));
        }
        if count > 1 && first == last {
            return Err(Error::InvalidSet(format!(
                "axis of {count} samples has zero extent at {first}"
            )));
        }
        Ok(Self { first, last, count })
    }

    pub fn first(&self) -> f64 {
        self.first
    }

    pub fn last(&self) -> f64 {
        self.last
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn step(&self) -> f64 {
        if self.count > 1 {
            (self.last - self.first) / (self.count - 1) as f64
        } else {
            0.0
        }
    }

    pub fn value(&self, index: usize) -> f64 {
        if index >= self.count {
            return f64::NAN;
        }
        self.first + index as f64 * self.step()
    }

    /// Fractional grid position of `value`; 0.0 at `first`, `count - 1` at
    /// `last`.
    pub fn position(&self, value: f64) -> f64 {
        if self.count == 1 {
            return if value == self.first { 0.0 } else { f64::NAN };
        }
        (value - self.first) / self.step()
    }

    pub fn nearest(&self, value: f64) -> Option<usize> {
        nearest_position(self.position(value), self.count)
    }

    pub fn interp(&self, value: f64) -> Option<Vec<(usize, f64)>> {
        interp_position(self.position(value), self.count)
    }
}

fn outside(position: f64, count: usize) -> bool {
    position.is_nan() || count == 0 || position < -0.5 || position > (count - 1) as f64 + 0.5
}

/// Nearest grid index to a fractional position. Exact midpoints go to the
/// lower index; positions more than half a step beyond either end are
/// outside.
pub fn nearest_position(position: f64, count: usize) -> Option<usize> {
    if outside(position, count) {
        return None;
    }
    let index = (position - 0.5).ceil().max(0.0) as usize;
    Some(index.min(count - 1))
}

/// Linear interpolation neighbors and weights for a fractional position.
/// Positions within half a step beyond an end take that end's value.
pub fn interp_position(position: f64, count: usize) -> Option<Vec<(usize, f64)>> {
    if outside(position, count) {
        return None;
    }
    if count == 1 {
        return Some(vec![(0, 1.0)]);
    }
    let clamped = position.clamp(0.0, (count - 1) as f64);
    let lower = (clamped.floor() as usize).min(count - 2);
    let weight = clamped - lower as f64;
    if weight == 0.0 {
        return Some(vec![(lower, 1.0)]);
    }
    if weight == 1.0 {
        return Some(vec![(lower + 1, 1.0)]);
    }
    Some(vec![(lower, 1.0 - weight), (lower + 1, weight)])
}
