use bytemuck::{Pod, Zeroable};
use core::fmt::{Debug, Display};
use half::f16;

/// A 8-bit floating point type with 5 exponent bits and 2 mantissa bits.
///
/// It shares the exponent layout of [`f16`]: a value is the upper byte of the equivalent half
/// precision bit pattern, so conversions go through [`f16`].
///
/// [`Minifloat`]: https://en.wikipedia.org/wiki/Minifloat
#[allow(non_camel_case_types)]
#[repr(transparent)]
#[derive(
    Clone, Copy, Default, Zeroable, Pod, PartialEq, PartialOrd, serde::Serialize, serde::Deserialize,
)]
pub struct e5m2(u8);

impl e5m2 {
    /// Maximum representable value
    pub const MAX: f64 = 57344.0;
    /// Minimum representable value
    pub const MIN: f64 = -57344.0;
    /// Positive zero.
    pub const ZERO: e5m2 = e5m2(0);

    /// Constructs a [`e5m2`] value from the raw bits.
    #[inline]
    #[must_use]
    pub const fn from_bits(bits: u8) -> e5m2 {
        e5m2(bits)
    }

    /// Converts a [`e5m2`] into the underlying bit representation.
    #[inline]
    #[must_use]
    pub const fn to_bits(self) -> u8 {
        self.0
    }

    /// Constructs a [`e5m2`] value from a 32-bit floating point value.
    ///
    /// This operation is lossy. The value is first rounded to [`f16`], then to the nearest
    /// representable value with ties to even. Values too large to fit result in ±∞ and NaN
    /// values are preserved.
    #[inline]
    #[must_use]
    pub fn from_f32(value: f32) -> e5m2 {
        Self::from_f16(f16::from_f32(value))
    }

    /// Constructs a [`e5m2`] value from a 64-bit floating point value.
    ///
    /// See [`e5m2::from_f32`] for the rounding behaviour.
    #[inline]
    #[must_use]
    pub fn from_f64(value: f64) -> e5m2 {
        Self::from_f16(f16::from_f64(value))
    }

    /// Constructs a [`e5m2`] value from a half precision value, rounding the two dropped
    /// mantissa bytes to nearest even.
    #[must_use]
    pub fn from_f16(value: f16) -> e5m2 {
        let bits = value.to_bits();

        if value.is_nan() {
            // Keep a mantissa bit set so the value stays a NaN after truncation.
            return e5m2(((bits >> 8) as u8) | 0x02);
        }

        let lsb = (bits >> 8) & 1;
        let rounded = bits.wrapping_add(0x7F + lsb);

        e5m2((rounded >> 8) as u8)
    }

    /// Converts a [`e5m2`] value into a [`f16`] value.
    ///
    /// This conversion is lossless.
    #[inline]
    #[must_use]
    pub fn to_f16(self) -> f16 {
        f16::from_bits((self.0 as u16) << 8)
    }

    /// Converts a [`e5m2`] value into an [`f32`] value.
    ///
    /// This conversion is lossless as all values can be represented exactly in [`f32`].
    #[inline]
    #[must_use]
    pub fn to_f32(self) -> f32 {
        self.to_f16().to_f32()
    }

    /// Converts a [`e5m2`] value into an [`f64`] value.
    ///
    /// This conversion is lossless as all values can be represented exactly in [`f64`].
    #[inline]
    #[must_use]
    pub fn to_f64(self) -> f64 {
        self.to_f16().to_f64()
    }

    /// Returns `true` if this value is NaN.
    #[inline]
    pub fn is_nan(self) -> bool {
        self.to_f16().is_nan()
    }
}

impl Display for e5m2 {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.to_f32())
    }
}

impl Debug for e5m2 {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "e5m2({}, {:#04x})", self.to_f32(), self.0)
    }
}

mod numeric {
    use num_traits::{NumCast, ToPrimitive};

    use super::*;
    use core::ops::{Add, AddAssign, Mul, MulAssign, Neg, Sub};

    impl Neg for e5m2 {
        type Output = Self;

        fn neg(self) -> Self::Output {
            e5m2(self.0 ^ 0x80)
        }
    }

    impl Mul for e5m2 {
        type Output = Self;

        fn mul(self, rhs: Self) -> Self::Output {
            Self::from_f32(self.to_f32() * rhs.to_f32())
        }
    }

    impl MulAssign for e5m2 {
        fn mul_assign(&mut self, rhs: Self) {
            *self = *self * rhs;
        }
    }

    impl Add for e5m2 {
        type Output = Self;

        fn add(self, rhs: Self) -> Self::Output {
            Self::from_f32(self.to_f32() + rhs.to_f32())
        }
    }

    impl AddAssign for e5m2 {
        fn add_assign(&mut self, rhs: Self) {
            *self = *self + rhs;
        }
    }

    impl Sub for e5m2 {
        type Output = Self;

        fn sub(self, rhs: Self) -> Self::Output {
            Self::from_f32(self.to_f32() - rhs.to_f32())
        }
    }

    impl ToPrimitive for e5m2 {
        fn to_i64(&self) -> Option<i64> {
            Some(e5m2::to_f32(*self) as i64)
        }

        fn to_u64(&self) -> Option<u64> {
            Some(e5m2::to_f32(*self) as u64)
        }

        fn to_f32(&self) -> Option<f32> {
            Some(e5m2::to_f32(*self))
        }

        fn to_f64(&self) -> Option<f64> {
            Some(e5m2::to_f64(*self))
        }
    }

    impl NumCast for e5m2 {
        fn from<T: num_traits::ToPrimitive>(n: T) -> Option<Self> {
            Some(Self::from_f32(n.to_f32()?))
        }
    }
}
