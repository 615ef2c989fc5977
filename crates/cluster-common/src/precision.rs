use core::fmt::{Debug, Display};

use bytemuck::Pod;
use half::f16;
use num_traits::Float;
use serde::{Deserialize, Serialize};

use crate::float::e5m2;

/// Floating-point width of the operands of a GEMM.
///
/// The discriminant is the width of one element in bytes, which is also how the precision is
/// encoded in a GEMM descriptor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u32)]
pub enum Precision {
    /// 64-bit IEEE float.
    #[serde(rename = "fp64")]
    Fp64 = 8,
    /// 32-bit IEEE float.
    #[serde(rename = "fp32")]
    Fp32 = 4,
    /// 16-bit IEEE float.
    #[serde(rename = "fp16")]
    Fp16 = 2,
    /// 8-bit float with 5 exponent bits and 2 mantissa bits.
    #[serde(rename = "fp8")]
    Fp8 = 1,
}

impl Precision {
    /// All supported precisions, widest first.
    pub const ALL: [Precision; 4] = [
        Precision::Fp64,
        Precision::Fp32,
        Precision::Fp16,
        Precision::Fp8,
    ];

    /// Size of one element in bytes.
    pub const fn size(self) -> usize {
        self as usize
    }

    /// Decodes a precision from its size in bytes.
    pub fn from_size(size: u32) -> Option<Self> {
        match size {
            8 => Some(Precision::Fp64),
            4 => Some(Precision::Fp32),
            2 => Some(Precision::Fp16),
            1 => Some(Precision::Fp8),
            _ => None,
        }
    }
}

impl Display for Precision {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Precision::Fp64 => f.write_str("fp64"),
            Precision::Fp32 => f.write_str("fp32"),
            Precision::Fp16 => f.write_str("fp16"),
            Precision::Fp8 => f.write_str("fp8"),
        }
    }
}

/// An element type that a GEMM can operate on.
///
/// Each element names the accumulator its micro-kernel sums products in. Conversions into the
/// accumulator are exact; [`GemmElement::from_acc`] rounds once.
pub trait GemmElement: Pod + Copy + Send + Sync + Debug + Display + PartialEq + 'static {
    /// Type the dot products are accumulated in.
    type Acc: Float + Send + Sync + Debug;

    /// Precision tag of this element.
    const PRECISION: Precision;

    /// Widens the element into its accumulator type.
    fn to_acc(self) -> Self::Acc;

    /// Rounds an accumulator value into the element type.
    fn from_acc(acc: Self::Acc) -> Self;

    /// Converts a scalar parameter (e.g. alpha) into the accumulator type.
    fn acc_from_f64(value: f64) -> Self::Acc;

    /// Rounds a 64-bit float into the element type.
    fn from_f64(value: f64) -> Self;

    /// Widens the element into a 64-bit float.
    fn to_f64(self) -> f64;

    /// Whether two elements share the same bit pattern.
    fn bit_eq(self, other: Self) -> bool {
        bytemuck::bytes_of(&self) == bytemuck::bytes_of(&other)
    }
}

impl GemmElement for f64 {
    type Acc = f64;
    const PRECISION: Precision = Precision::Fp64;

    fn to_acc(self) -> f64 {
        self
    }

    fn from_acc(acc: f64) -> Self {
        acc
    }

    fn acc_from_f64(value: f64) -> f64 {
        value
    }

    fn from_f64(value: f64) -> Self {
        value
    }

    fn to_f64(self) -> f64 {
        self
    }
}

impl GemmElement for f32 {
    type Acc = f32;
    const PRECISION: Precision = Precision::Fp32;

    fn to_acc(self) -> f32 {
        self
    }

    fn from_acc(acc: f32) -> Self {
        acc
    }

    fn acc_from_f64(value: f64) -> f32 {
        value as f32
    }

    fn from_f64(value: f64) -> Self {
        value as f32
    }

    fn to_f64(self) -> f64 {
        self as f64
    }
}

impl GemmElement for f16 {
    type Acc = f32;
    const PRECISION: Precision = Precision::Fp16;

    fn to_acc(self) -> f32 {
        self.to_f32()
    }

    fn from_acc(acc: f32) -> Self {
        f16::from_f32(acc)
    }

    fn acc_from_f64(value: f64) -> f32 {
        value as f32
    }

    fn from_f64(value: f64) -> Self {
        f16::from_f64(value)
    }

    fn to_f64(self) -> f64 {
        f16::to_f64(self)
    }
}

impl GemmElement for e5m2 {
    type Acc = f32;
    const PRECISION: Precision = Precision::Fp8;

    fn to_acc(self) -> f32 {
        self.to_f32()
    }

    fn from_acc(acc: f32) -> Self {
        e5m2::from_f32(acc)
    }

    fn acc_from_f64(value: f64) -> f32 {
        value as f32
    }

    fn from_f64(value: f64) -> Self {
        e5m2::from_f64(value)
    }

    fn to_f64(self) -> f64 {
        e5m2::to_f64(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn size_round_trips_through_the_tag() {
        for precision in Precision::ALL {
            assert_eq!(Precision::from_size(precision.size() as u32), Some(precision));
        }
        assert_eq!(Precision::from_size(3), None);
    }

    #[test]
    fn element_sizes_match_their_tag() {
        assert_eq!(size_of::<f64>(), <f64 as GemmElement>::PRECISION.size());
        assert_eq!(size_of::<f32>(), <f32 as GemmElement>::PRECISION.size());
        assert_eq!(size_of::<f16>(), <f16 as GemmElement>::PRECISION.size());
        assert_eq!(size_of::<e5m2>(), <e5m2 as GemmElement>::PRECISION.size());
    }

    #[test]
    fn bit_equality_distinguishes_signed_zeros() {
        assert!(!0.0f32.bit_eq(-0.0));
        assert!(1.5f32.bit_eq(1.5));
    }
}
