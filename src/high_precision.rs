//! Signed 128-bit fixed-point numbers.
//!
//! A [`HighPrecision`] holds a Q64.64 value in an `i128`: the high 64 bits
//! are the integer part and the low 64 bits the binary fraction. It is the
//! numeric substrate of [`Time`](crate::time::Time).
//!
//! Arithmetic never wraps. Every operation comes in two forms:
//!
//! - `checked_*` returns `None` on overflow (or division by zero);
//! - `overflowing_*` returns the result together with an overflow flag.
//!   On overflow the result saturates at [`HighPrecision::MIN`] or
//!   [`HighPrecision::MAX`] according to the sign of the exact result.

use std::fmt;

const FRAC_BITS: u32 = 64;
const FRAC_MASK: u128 = (1u128 << FRAC_BITS) - 1;
const HALF: u128 = 1u128 << (FRAC_BITS - 1);
const SCALE: f64 = 18_446_744_073_709_551_616.0; // 2^64

/// A signed Q64.64 fixed-point value.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HighPrecision(i128);

impl HighPrecision {
    /// The additive identity.
    pub const ZERO: HighPrecision = HighPrecision(0);
    /// The multiplicative identity.
    pub const ONE: HighPrecision = HighPrecision(1i128 << FRAC_BITS);
    /// Largest representable value.
    pub const MAX: HighPrecision = HighPrecision(i128::MAX);
    /// Smallest representable value.
    pub const MIN: HighPrecision = HighPrecision(i128::MIN);

    /// Returns zero.
    #[inline]
    pub const fn zero() -> Self {
        Self::ZERO
    }

    /// Builds a value from its raw Q64.64 bit pattern.
    #[inline]
    pub const fn from_raw(raw: i128) -> Self {
        HighPrecision(raw)
    }

    /// Returns the raw Q64.64 bit pattern.
    #[inline]
    pub const fn raw(self) -> i128 {
        self.0
    }

    /// Builds an exact value from an integer.
    #[inline]
    pub const fn from_integer(value: i64) -> Self {
        HighPrecision((value as i128) << FRAC_BITS)
    }

    /// Builds the representable value nearest to `value`.
    ///
    /// NaN maps to zero; values beyond the range saturate.
    pub fn from_f64(value: f64) -> Self {
        if value.is_nan() {
            return Self::ZERO;
        }
        // Scaling by a power of two is exact; `as` saturates out-of-range floats.
        HighPrecision((value * SCALE).round() as i128)
    }

    /// Returns the integer part, rounded toward negative infinity.
    #[inline]
    pub fn get_integer(self) -> i64 {
        (self.0 >> FRAC_BITS) as i64
    }

    /// Returns the nearest integer, ties away from zero, saturating at the
    /// `i64` range.
    pub fn round_to_integer(self) -> i64 {
        let rounded = (self.0.unsigned_abs() + HALF) >> FRAC_BITS;
        if self.0 >= 0 {
            i64::try_from(rounded).unwrap_or(i64::MAX)
        } else {
            // rounded <= 2^63 here, so the negation fits.
            (0i128 - rounded as i128) as i64
        }
    }

    /// Returns the value as a double; lossy beyond 53 significant bits.
    #[inline]
    pub fn get_double(self) -> f64 {
        self.0 as f64 / SCALE
    }

    /// Returns true if the value is exactly zero.
    #[inline]
    pub fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Returns true if the value is strictly below zero.
    #[inline]
    pub fn is_negative(self) -> bool {
        self.0 < 0
    }

    /// Returns true if the value has a non-zero fractional part.
    #[inline]
    pub fn has_fraction(self) -> bool {
        (self.0 as u128) & FRAC_MASK != 0
    }

    pub fn checked_add(self, rhs: Self) -> Option<Self> {
        self.0.checked_add(rhs.0).map(HighPrecision)
    }

    pub fn checked_sub(self, rhs: Self) -> Option<Self> {
        self.0.checked_sub(rhs.0).map(HighPrecision)
    }

    pub fn checked_neg(self) -> Option<Self> {
        self.0.checked_neg().map(HighPrecision)
    }

    /// Fixed-point multiplication; the fraction below 2^-64 is truncated.
    pub fn checked_mul(self, rhs: Self) -> Option<Self> {
        let negative = (self.0 < 0) != (rhs.0 < 0);
        let a = self.0.unsigned_abs();
        let b = rhs.0.unsigned_abs();
        let (a_hi, a_lo) = (a >> FRAC_BITS, a & FRAC_MASK);
        let (b_hi, b_lo) = (b >> FRAC_BITS, b & FRAC_MASK);

        // (a_hi 2^64 + a_lo)(b_hi 2^64 + b_lo) / 2^64
        //   = a_hi b_hi 2^64 + (a_hi b_lo + a_lo b_hi) + a_lo b_lo / 2^64
        let high = a_hi * b_hi;
        if high >> FRAC_BITS != 0 {
            return None;
        }
        let middle = (a_hi * b_lo).checked_add(a_lo * b_hi)?;
        let low = (a_lo * b_lo) >> FRAC_BITS;
        let magnitude = (high << FRAC_BITS).checked_add(middle)?.checked_add(low)?;
        apply_sign(magnitude, negative)
    }

    /// Fixed-point division; returns `None` on overflow or division by zero.
    pub fn checked_div(self, rhs: Self) -> Option<Self> {
        if rhs.0 == 0 {
            return None;
        }
        let negative = (self.0 < 0) != (rhs.0 < 0);
        let a = self.0.unsigned_abs();
        let b = rhs.0.unsigned_abs();

        let quotient = a / b;
        if quotient >> FRAC_BITS != 0 {
            return None;
        }
        // Long division for the 64 fractional bits; remainder < b <= 2^127
        // so the shift below cannot overflow.
        let mut remainder = a % b;
        let mut fraction: u128 = 0;
        for _ in 0..FRAC_BITS {
            remainder <<= 1;
            fraction <<= 1;
            if remainder >= b {
                remainder -= b;
                fraction |= 1;
            }
        }
        apply_sign((quotient << FRAC_BITS) | fraction, negative)
    }

    pub fn overflowing_add(self, rhs: Self) -> (Self, bool) {
        match self.checked_add(rhs) {
            Some(v) => (v, false),
            None => (HighPrecision(self.0.saturating_add(rhs.0)), true),
        }
    }

    pub fn overflowing_sub(self, rhs: Self) -> (Self, bool) {
        match self.checked_sub(rhs) {
            Some(v) => (v, false),
            None => (HighPrecision(self.0.saturating_sub(rhs.0)), true),
        }
    }

    pub fn overflowing_mul(self, rhs: Self) -> (Self, bool) {
        match self.checked_mul(rhs) {
            Some(v) => (v, false),
            None => (saturate((self.0 < 0) != (rhs.0 < 0)), true),
        }
    }

    /// Division by zero saturates toward the sign of the dividend.
    pub fn overflowing_div(self, rhs: Self) -> (Self, bool) {
        match self.checked_div(rhs) {
            Some(v) => (v, false),
            None if rhs.0 == 0 => (saturate(self.0 < 0), true),
            None => (saturate((self.0 < 0) != (rhs.0 < 0)), true),
        }
    }
}

fn saturate(negative: bool) -> HighPrecision {
    if negative {
        HighPrecision::MIN
    } else {
        HighPrecision::MAX
    }
}

fn apply_sign(magnitude: u128, negative: bool) -> Option<HighPrecision> {
    if negative {
        if magnitude > 1u128 << 127 {
            return None;
        }
        Some(HighPrecision(0i128.wrapping_sub(magnitude as i128)))
    } else {
        i128::try_from(magnitude).ok().map(HighPrecision)
    }
}

impl From<i64> for HighPrecision {
    fn from(value: i64) -> Self {
        Self::from_integer(value)
    }
}

impl fmt::Display for HighPrecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.get_double())
    }
}
