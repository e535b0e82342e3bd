//! Quantization codec: compact per-component storage.
//!
//! Each range component is stored in exactly one [`ComponentStorage`]
//! variant, selected once from its value space by [`Encoding::choose`].
//! Quantized variants store `index + MIN + 1`, where `MIN` is the smallest
//! value of the integer type; `MIN` itself is the missing sentinel. Floating
//! variants store values directly with NaN as the sentinel.

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::error::{Error, Result};
use crate::real::{Precision, Real};
use crate::sets::{SpaceKind, ValueSpace};

/// Storage encoding of one range component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Encoding {
    Double,
    Single,
    I32,
    I16,
    I8,
}

impl Encoding {
    /// Most compact encoding that preserves every value of `space`.
    pub fn choose(space: &dyn ValueSpace) -> Encoding {
        let encoding = match space.kind() {
            SpaceKind::Continuous(Precision::Double) => Encoding::Double,
            SpaceKind::Continuous(Precision::Single) => Encoding::Single,
            SpaceKind::Finite { cardinality } if cardinality < 256 => Encoding::I8,
            SpaceKind::Finite { cardinality } if cardinality < 65536 => Encoding::I16,
            SpaceKind::Finite { .. } => Encoding::I32,
        };
        trace!(kind = ?space.kind(), ?encoding, "chose component encoding");
        encoding
    }

    pub fn is_quantized(self) -> bool {
        matches!(self, Encoding::I32 | Encoding::I16 | Encoding::I8)
    }

    fn admits(self, kind: SpaceKind) -> bool {
        match kind {
            SpaceKind::Continuous(Precision::Double) => self == Encoding::Double,
            SpaceKind::Continuous(Precision::Single) => self == Encoding::Single,
            SpaceKind::Finite { .. } => self.is_quantized(),
        }
    }
}

/// Integer codes with a reserved missing sentinel at the type minimum.
trait IndexCode: Copy + PartialEq {
    const MISSING: Self;

    fn encode(index: Option<usize>) -> Self;

    fn decode(self) -> Option<usize>;
}

macro_rules! index_code {
    ($($ty:ty),*) => {$(
        impl IndexCode for $ty {
            const MISSING: Self = <$ty>::MIN;

            #[inline]
            fn encode(index: Option<usize>) -> Self {
                index
                    .and_then(|i| i64::try_from(i).ok())
                    .and_then(|i| i.checked_add(i64::from(<$ty>::MIN) + 1))
                    .and_then(|code| <$ty>::try_from(code).ok())
                    .unwrap_or(Self::MISSING)
            }

            #[inline]
            fn decode(self) -> Option<usize> {
                if self == Self::MISSING {
                    return None;
                }
                usize::try_from(i64::from(self) - i64::from(<$ty>::MIN) - 1).ok()
            }
        }
    )*};
}

index_code!(i8, i16, i32);

fn quantize<C: IndexCode, T: Real>(space: &dyn ValueSpace, values: &[T]) -> Vec<C> {
    values
        .iter()
        .map(|v| {
            if v.is_nan() {
                C::MISSING
            } else {
                C::encode(space.value_to_index(v.widen()))
            }
        })
        .collect()
}

fn dequantize<C: IndexCode, T: Real>(space: &dyn ValueSpace, codes: &[C]) -> Vec<T> {
    codes
        .iter()
        .map(|c| match c.decode() {
            Some(index) => T::lift(space.index_to_value(index)),
            None => T::nan(),
        })
        .collect()
}

fn decode_one<C: IndexCode>(space: &dyn ValueSpace, code: C) -> f64 {
    code.decode()
        .map(|index| space.index_to_value(index))
        .unwrap_or(f64::NAN)
}

fn encode_one<C: IndexCode>(space: &dyn ValueSpace, value: f64) -> C {
    if value.is_nan() {
        C::MISSING
    } else {
        C::encode(space.value_to_index(value))
    }
}

/// Backing array of one range component.
#[derive(Debug, Clone, PartialEq)]
pub enum ComponentStorage {
    Double(Vec<f64>),
    Single(Vec<f32>),
    I32(Vec<i32>),
    I16(Vec<i16>),
    I8(Vec<i8>),
}

impl ComponentStorage {
    /// Storage of `len` missing samples.
    pub fn missing(encoding: Encoding, len: usize) -> Self {
        match encoding {
            Encoding::Double => ComponentStorage::Double(vec![f64::NAN; len]),
            Encoding::Single => ComponentStorage::Single(vec![f32::NAN; len]),
            Encoding::I32 => ComponentStorage::I32(vec![i32::MISSING; len]),
            Encoding::I16 => ComponentStorage::I16(vec![i16::MISSING; len]),
            Encoding::I8 => ComponentStorage::I8(vec![i8::MISSING; len]),
        }
    }

    pub fn encoding(&self) -> Encoding {
        match self {
            ComponentStorage::Double(_) => Encoding::Double,
            ComponentStorage::Single(_) => Encoding::Single,
            ComponentStorage::I32(_) => Encoding::I32,
            ComponentStorage::I16(_) => Encoding::I16,
            ComponentStorage::I8(_) => Encoding::I8,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            ComponentStorage::Double(v) => v.len(),
            ComponentStorage::Single(v) => v.len(),
            ComponentStorage::I32(v) => v.len(),
            ComponentStorage::I16(v) => v.len(),
            ComponentStorage::I8(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Pack a column of raw values for `component`.
    ///
    /// Floating columns are taken over without copying when their element
    /// type matches the encoding. Values outside a finite space become the
    /// missing sentinel.
    pub fn pack<T: Real>(
        component: usize,
        encoding: Encoding,
        space: &dyn ValueSpace,
        values: Vec<T>,
    ) -> Result<Self> {
        check(component, encoding, space)?;
        Ok(match encoding {
            Encoding::Double => ComponentStorage::Double(T::into_doubles(values)),
            Encoding::Single => ComponentStorage::Single(T::into_singles(values)),
            Encoding::I32 => ComponentStorage::I32(quantize(space, &values)),
            Encoding::I16 => ComponentStorage::I16(quantize(space, &values)),
            Encoding::I8 => ComponentStorage::I8(quantize(space, &values)),
        })
    }

    /// Unpack to raw values; sentinels become NaN.
    pub fn unpack<T: Real>(&self, component: usize, space: &dyn ValueSpace) -> Result<Vec<T>> {
        check(component, self.encoding(), space)?;
        Ok(match self {
            ComponentStorage::Double(v) => T::from_doubles(v),
            ComponentStorage::Single(v) => T::from_singles(v),
            ComponentStorage::I32(v) => dequantize(space, v),
            ComponentStorage::I16(v) => dequantize(space, v),
            ComponentStorage::I8(v) => dequantize(space, v),
        })
    }

    /// Raw value of one sample; NaN when missing or out of range.
    pub fn get(&self, index: usize, space: &dyn ValueSpace) -> f64 {
        let value = match self {
            ComponentStorage::Double(v) => v.get(index).copied(),
            ComponentStorage::Single(v) => v.get(index).map(|x| f64::from(*x)),
            ComponentStorage::I32(v) => v.get(index).map(|c| decode_one(space, *c)),
            ComponentStorage::I16(v) => v.get(index).map(|c| decode_one(space, *c)),
            ComponentStorage::I8(v) => v.get(index).map(|c| decode_one(space, *c)),
        };
        value.unwrap_or(f64::NAN)
    }

    /// Store one sample. Indices past the end are ignored; callers validate
    /// them against the domain length first.
    pub fn set(&mut self, index: usize, value: f64, space: &dyn ValueSpace) {
        match self {
            ComponentStorage::Double(v) => {
                if let Some(slot) = v.get_mut(index) {
                    *slot = value;
                }
            }
            ComponentStorage::Single(v) => {
                if let Some(slot) = v.get_mut(index) {
                    *slot = value as f32;
                }
            }
            ComponentStorage::I32(v) => {
                if let Some(slot) = v.get_mut(index) {
                    *slot = encode_one(space, value);
                }
            }
            ComponentStorage::I16(v) => {
                if let Some(slot) = v.get_mut(index) {
                    *slot = encode_one(space, value);
                }
            }
            ComponentStorage::I8(v) => {
                if let Some(slot) = v.get_mut(index) {
                    *slot = encode_one(space, value);
                }
            }
        }
    }
}

fn check(component: usize, encoding: Encoding, space: &dyn ValueSpace) -> Result<()> {
    if encoding.admits(space.kind()) {
        Ok(())
    } else {
        Err(Error::StorageConsistency {
            component,
            reason: format!("encoding {:?} cannot hold {:?}", encoding, space.kind()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sets::{ContinuousSpace, IntegerSpace, LinearSpace};

    #[test]
    fn test_encoding_thresholds() {
        let choose = |n| Encoding::choose(&IntegerSpace::new(n).unwrap());
        assert_eq!(choose(255), Encoding::I8);
        assert_eq!(choose(256), Encoding::I16);
        assert_eq!(choose(65535), Encoding::I16);
        assert_eq!(choose(65536), Encoding::I32);
        assert_eq!(Encoding::choose(&ContinuousSpace::double()), Encoding::Double);
        assert_eq!(Encoding::choose(&ContinuousSpace::single()), Encoding::Single);
    }

    #[test]
    fn test_int8_roundtrip() {
        let space = LinearSpace::new(1.0, 4.0, 4).unwrap();
        let packed =
            ComponentStorage::pack(0, Encoding::I8, &space, vec![1.0f64, 2.0, 3.0, 4.0]).unwrap();
        assert_eq!(packed, ComponentStorage::I8(vec![-127, -126, -125, -124]));
        let values: Vec<f64> = packed.unpack(0, &space).unwrap();
        assert_eq!(values, vec![1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_sentinel_for_missing_and_outside() {
        let space = LinearSpace::new(1.0, 4.0, 4).unwrap();
        let packed =
            ComponentStorage::pack(0, Encoding::I8, &space, vec![f32::NAN, 9.0, 2.2]).unwrap();
        assert_eq!(packed, ComponentStorage::I8(vec![i8::MIN, i8::MIN, -126]));
        let values: Vec<f32> = packed.unpack(0, &space).unwrap();
        assert!(values[0].is_nan());
        assert!(values[1].is_nan());
        assert_eq!(values[2], 2.0);
    }

    #[test]
    fn test_largest_int8_index_fits() {
        let space = IntegerSpace::new(255).unwrap();
        let packed = ComponentStorage::pack(0, Encoding::I8, &space, vec![254.0f64, 0.0]).unwrap();
        assert_eq!(packed, ComponentStorage::I8(vec![127, -127]));
        assert_eq!(packed.get(0, &space), 254.0);
    }

    #[test]
    fn test_int16_roundtrip_within_step() {
        let space = LinearSpace::new(0.0, 100.0, 1001).unwrap();
        let values = vec![0.0f64, 12.34, 99.96];
        let packed = ComponentStorage::pack(0, Encoding::I16, &space, values.clone()).unwrap();
        let back: Vec<f64> = packed.unpack(0, &space).unwrap();
        for (a, b) in values.iter().zip(&back) {
            assert!((a - b).abs() <= 0.1);
        }
    }

    #[test]
    fn test_float_passthrough() {
        let space = ContinuousSpace::single();
        let packed = ComponentStorage::pack(0, Encoding::Single, &space, vec![1.5f32, f32::NAN]).unwrap();
        let back: Vec<f64> = packed.unpack(0, &space).unwrap();
        assert_eq!(back[0], 1.5);
        assert!(back[1].is_nan());
    }

    #[test]
    fn test_mismatch_is_storage_error() {
        let space = ContinuousSpace::double();
        let err = ComponentStorage::pack(3, Encoding::I8, &space, vec![1.0f64]).unwrap_err();
        assert!(matches!(err, Error::StorageConsistency { component: 3, .. }));

        let packed = ComponentStorage::I16(vec![0]);
        assert!(packed.unpack::<f64>(1, &space).is_err());
    }

    #[test]
    fn test_set_single_sample() {
        let space = LinearSpace::new(1.0, 4.0, 4).unwrap();
        let mut storage = ComponentStorage::missing(Encoding::I8, 3);
        storage.set(1, 3.0, &space);
        assert!(storage.get(0, &space).is_nan());
        assert_eq!(storage.get(1, &space), 3.0);
        assert!(storage.get(7, &space).is_nan());
    }
}
