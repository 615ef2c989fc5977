/// Bits of the table index.
pub const EXP2F_TABLE_BITS: u32 = 5;

/// Entries of the table.
pub const EXP2F_TABLE_SIZE: usize = 1 << EXP2F_TABLE_BITS;

const N: f64 = EXP2F_TABLE_SIZE as f64;

/// `asuint64(2^(i/N)) - (i << 52) / N` for `i` in `0..N`.
const EXP2F_TABLE: [u64; EXP2F_TABLE_SIZE] = [
    0x3ff0000000000000, 0x3fefd9b0d3158574, 0x3fefb5586cf9890f, 0x3fef9301d0125b51,
    0x3fef72b83c7d517b, 0x3fef54873168b9aa, 0x3fef387a6e756238, 0x3fef1e9df51fdee1,
    0x3fef06fe0a31b715, 0x3feef1a7373aa9cb, 0x3feedea64c123422, 0x3feece086061892d,
    0x3feebfdad5362a27, 0x3feeb42b569d4f82, 0x3feeab07dd485429, 0x3feea47eb03a5585,
    0x3feea09e667f3bcd, 0x3fee9f75e8ec5f74, 0x3feea11473eb0187, 0x3feea589994cce13,
    0x3feeace5422aa0db, 0x3feeb737b0cdc5e5, 0x3feec49182a3f090, 0x3feed503b23e255d,
    0x3feee89f995ad3ad, 0x3feeff76f2fb5e47, 0x3fef199bdd85529c, 0x3fef3720dcef9069,
    0x3fef5818dcfba487, 0x3fef7c97337b9b5f, 0x3fefa4afa2a490da, 0x3fefd0765b6e4540,
];

/// Constants and table of the exponential, owned by one compute unit.
///
/// `exp(x) = 2^(k/N) * 2^(r/N)` with `k` an integer and `|r| <= 1/2`: the first factor comes
/// from the table, the second from a cubic polynomial.
#[derive(Clone, Debug, PartialEq)]
pub struct ExpContext {
    table: [u64; EXP2F_TABLE_SIZE],
    /// `N / ln(2)`.
    pub inv_ln2_n: f64,
    /// `1.5 * 2^52`; adding it rounds to an integer kept in the low mantissa bits.
    pub shift: f64,
    /// Polynomial coefficients, highest degree first.
    pub poly: [f64; 4],
}

impl Default for ExpContext {
    fn default() -> Self {
        Self::new()
    }
}

impl ExpContext {
    pub fn new() -> Self {
        Self {
            table: EXP2F_TABLE,
            inv_ln2_n: f64::from_bits(0x3ff71547652b82fe) * N,
            shift: f64::from_bits(0x4338000000000000),
            poly: [
                f64::from_bits(0x3fac6af84b912394) / N / N / N,
                f64::from_bits(0x3fcebfce50fac4f3) / N / N,
                f64::from_bits(0x3fe62e42ff0c52d6) / N,
                1.0,
            ],
        }
    }

    /// First phase: scales `x` and rounds it. Returns `(kd, z)` with `kd` still shifted.
    #[inline(always)]
    pub fn reduce(&self, x: f32) -> (f64, f64) {
        let z = self.inv_ln2_n * f64::from(x);
        (z + self.shift, z)
    }

    /// Second phase: `2^(k/N)` as the bits of a double, from the bits of the shifted `kd`.
    #[inline(always)]
    pub fn scale_bits(&self, ki: u64) -> u64 {
        let entry = self.table[(ki % EXP2F_TABLE_SIZE as u64) as usize];
        entry.wrapping_add(ki << (52 - EXP2F_TABLE_BITS))
    }

    /// Third phase: evaluates the polynomial on the remainder and applies the scale.
    #[inline(always)]
    pub fn evaluate(&self, kd: f64, z: f64, scale_bits: u64) -> f32 {
        let [c0, c1, c2, c3] = self.poly;
        let r = z - (kd - self.shift);
        let lhs = c0.mul_add(r, c1);
        let rhs = c2.mul_add(r, c3);
        let y = lhs.mul_add(r * r, rhs);

        (y * f64::from_bits(scale_bits)) as f32
    }
}
