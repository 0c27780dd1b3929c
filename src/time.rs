//! Simulation time.
//!
//! A [`Time`] is a [`HighPrecision`] count of the process-wide time step
//! unit selected by [`Precision`] (nanoseconds unless configured). It is
//! used both as a timestamp relative to the start of the simulation and as
//! a delay.
//!
//! The unit factories ([`seconds`], [`milli_seconds`], ...) convert their
//! argument into time steps and round to the nearest whole step, so sums
//! and differences of times built in mixed units are exact at the
//! configured precision.
//!
//! The precision must be chosen before the first event is scheduled:
//! values already built keep their step count, so changing the unit
//! afterwards would silently rescale them. [`Precision::set`] refuses a
//! change once the simulator has scheduled anything.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Div, Mul, Neg, Sub, SubAssign};
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};

use crate::error::{SimError, SimResult};
use crate::high_precision::HighPrecision;

/// The unit of one time step.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Precision {
    Seconds,
    MilliSeconds,
    MicroSeconds,
    #[default]
    NanoSeconds,
    PicoSeconds,
    FemtoSeconds,
}

static PRECISION: AtomicU8 = AtomicU8::new(Precision::NanoSeconds as u8);
static PRECISION_LOCKED: AtomicBool = AtomicBool::new(false);

impl Precision {
    const ALL: [Precision; 6] = [
        Precision::Seconds,
        Precision::MilliSeconds,
        Precision::MicroSeconds,
        Precision::NanoSeconds,
        Precision::PicoSeconds,
        Precision::FemtoSeconds,
    ];

    /// Power of ten of one second expressed in this unit.
    pub fn exponent(self) -> u32 {
        match self {
            Precision::Seconds => 0,
            Precision::MilliSeconds => 3,
            Precision::MicroSeconds => 6,
            Precision::NanoSeconds => 9,
            Precision::PicoSeconds => 12,
            Precision::FemtoSeconds => 15,
        }
    }

    /// Short unit suffix used when displaying times.
    pub fn suffix(self) -> &'static str {
        match self {
            Precision::Seconds => "s",
            Precision::MilliSeconds => "ms",
            Precision::MicroSeconds => "us",
            Precision::NanoSeconds => "ns",
            Precision::PicoSeconds => "ps",
            Precision::FemtoSeconds => "fs",
        }
    }

    /// Returns the process-wide time step unit.
    pub fn get() -> Precision {
        let index = PRECISION.load(Ordering::Acquire) as usize;
        Self::ALL[index.min(Self::ALL.len() - 1)]
    }

    /// Sets the process-wide time step unit.
    ///
    /// Setting the current value again always succeeds. Any other value is
    /// rejected with [`SimError::PrecisionLocked`] once an event has been
    /// scheduled in this process.
    pub fn set(precision: Precision) -> SimResult<()> {
        if precision == Self::get() {
            return Ok(());
        }
        if PRECISION_LOCKED.load(Ordering::Acquire) {
            return Err(SimError::PrecisionLocked);
        }
        PRECISION.store(precision as u8, Ordering::Release);
        tracing::debug!(unit = precision.suffix(), "time precision changed");
        Ok(())
    }

    /// Returns true once the precision can no longer change.
    pub fn is_locked() -> bool {
        PRECISION_LOCKED.load(Ordering::Acquire)
    }

    /// Freezes the precision; called when the first event is scheduled.
    pub(crate) fn lock() {
        if !PRECISION_LOCKED.swap(true, Ordering::AcqRel) {
            tracing::debug!(unit = Self::get().suffix(), "time precision locked");
        }
    }
}

fn pow10(exp: u32) -> HighPrecision {
    // exp <= 15 so the power fits in an i64.
    HighPrecision::from_integer(10i64.pow(exp))
}

/// Converts `value` expressed in `from` into `to` units, reporting overflow.
fn rescale(value: HighPrecision, from: Precision, to: Precision) -> (HighPrecision, bool) {
    let (from, to) = (from.exponent(), to.exponent());
    if to >= from {
        value.overflowing_mul(pow10(to - from))
    } else {
        value.overflowing_div(pow10(from - to))
    }
}

/// A simulation timestamp or duration.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Time(HighPrecision);

impl Time {
    /// Time zero.
    pub const ZERO: Time = Time(HighPrecision::ZERO);

    fn from_unit(value: HighPrecision, unit: Precision) -> Time {
        let (steps, overflow) = rescale(value, unit, Precision::get());
        if overflow {
            tracing::warn!(unit = unit.suffix(), "time value out of range, saturating");
        }
        Time(HighPrecision::from_integer(steps.round_to_integer()))
    }

    /// Like the unit factories, but `None` instead of saturating when
    /// `value` does not fit in the current precision.
    pub fn checked_from_unit(value: i64, unit: Precision) -> Option<Time> {
        Self::checked_from(HighPrecision::from_integer(value), unit)
    }

    /// Like [`seconds`](Self::seconds), but `None` for non-finite or out of
    /// range values.
    pub fn checked_seconds(value: f64) -> Option<Time> {
        // 2^63 is the first magnitude outside the Q64.64 integer range.
        if !value.is_finite() || value.abs() >= 9_223_372_036_854_775_808.0 {
            return None;
        }
        Self::checked_from(HighPrecision::from_f64(value), Precision::Seconds)
    }

    fn checked_from(value: HighPrecision, unit: Precision) -> Option<Time> {
        match rescale(value, unit, Precision::get()) {
            (_, true) => None,
            (steps, false) => Some(Time(HighPrecision::from_integer(steps.round_to_integer()))),
        }
    }

    /// Wraps a raw high-precision step count.
    pub fn from_high_precision(value: HighPrecision) -> Time {
        Time(value)
    }

    pub fn seconds(value: f64) -> Time {
        Self::from_unit(HighPrecision::from_f64(value), Precision::Seconds)
    }

    pub fn milli_seconds(value: i64) -> Time {
        Self::from_unit(HighPrecision::from_integer(value), Precision::MilliSeconds)
    }

    pub fn micro_seconds(value: i64) -> Time {
        Self::from_unit(HighPrecision::from_integer(value), Precision::MicroSeconds)
    }

    pub fn nano_seconds(value: i64) -> Time {
        Self::from_unit(HighPrecision::from_integer(value), Precision::NanoSeconds)
    }

    pub fn pico_seconds(value: i64) -> Time {
        Self::from_unit(HighPrecision::from_integer(value), Precision::PicoSeconds)
    }

    pub fn femto_seconds(value: i64) -> Time {
        Self::from_unit(HighPrecision::from_integer(value), Precision::FemtoSeconds)
    }

    /// Builds a time from a count of the global time step unit.
    pub fn from_time_step(steps: i64) -> Time {
        Time(HighPrecision::from_integer(steps))
    }

    /// The largest schedulable time; used to mean "never".
    ///
    /// Bounded by the `i64` step count the scheduler orders on, not by the
    /// wider `HighPrecision` range, so it has no fractional part.
    pub fn max() -> Time {
        Time(HighPrecision::from_integer(i64::MAX))
    }

    /// The smallest whole step count, mirroring [`max`](Self::max).
    pub fn min() -> Time {
        Time(HighPrecision::from_integer(i64::MIN))
    }

    pub fn get_high_precision(self) -> HighPrecision {
        self.0
    }

    /// Number of time steps since time zero, rounded to nearest.
    ///
    /// This is the key the scheduler orders events by.
    pub fn get_time_step(self) -> i64 {
        self.0.round_to_integer()
    }

    /// Approximate value in seconds.
    pub fn get_seconds(self) -> f64 {
        self.0.get_double() / 10f64.powi(Precision::get().exponent() as i32)
    }

    fn get_in(self, unit: Precision) -> i64 {
        rescale(self.0, Precision::get(), unit).0.get_integer()
    }

    /// Whole milliseconds, rounded toward negative infinity.
    pub fn get_milli_seconds(self) -> i64 {
        self.get_in(Precision::MilliSeconds)
    }

    pub fn get_micro_seconds(self) -> i64 {
        self.get_in(Precision::MicroSeconds)
    }

    pub fn get_nano_seconds(self) -> i64 {
        self.get_in(Precision::NanoSeconds)
    }

    pub fn get_pico_seconds(self) -> i64 {
        self.get_in(Precision::PicoSeconds)
    }

    pub fn get_femto_seconds(self) -> i64 {
        self.get_in(Precision::FemtoSeconds)
    }

    pub fn is_zero(self) -> bool {
        self.0.is_zero()
    }

    /// True for zero and positive times.
    pub fn is_positive(self) -> bool {
        !self.0.is_negative()
    }

    /// True for zero and negative times.
    pub fn is_negative(self) -> bool {
        self.0 <= HighPrecision::ZERO
    }

    pub fn is_strictly_positive(self) -> bool {
        self.0 > HighPrecision::ZERO
    }

    pub fn is_strictly_negative(self) -> bool {
        self.0.is_negative()
    }

    pub fn checked_add(self, rhs: Time) -> Option<Time> {
        self.0.checked_add(rhs.0).map(Time)
    }

    pub fn checked_sub(self, rhs: Time) -> Option<Time> {
        self.0.checked_sub(rhs.0).map(Time)
    }

    pub fn checked_mul(self, factor: f64) -> Option<Time> {
        self.0.checked_mul(HighPrecision::from_f64(factor)).map(Time)
    }

    pub fn checked_div(self, divisor: i64) -> Option<Time> {
        self.0.checked_div(HighPrecision::from_integer(divisor)).map(Time)
    }
}

impl Add for Time {
    type Output = Time;

    fn add(self, rhs: Time) -> Time {
        self.checked_add(rhs).expect("overflow when adding times")
    }
}

impl AddAssign for Time {
    fn add_assign(&mut self, rhs: Time) {
        *self = *self + rhs;
    }
}

impl Sub for Time {
    type Output = Time;

    fn sub(self, rhs: Time) -> Time {
        self.checked_sub(rhs).expect("overflow when subtracting times")
    }
}

impl SubAssign for Time {
    fn sub_assign(&mut self, rhs: Time) {
        *self = *self - rhs;
    }
}

impl Neg for Time {
    type Output = Time;

    fn neg(self) -> Time {
        Time(self.0.checked_neg().expect("overflow when negating time"))
    }
}

impl Mul<i64> for Time {
    type Output = Time;

    fn mul(self, rhs: i64) -> Time {
        self.0
            .checked_mul(HighPrecision::from_integer(rhs))
            .map(Time)
            .expect("overflow when multiplying time")
    }
}

impl Mul<f64> for Time {
    type Output = Time;

    fn mul(self, rhs: f64) -> Time {
        self.checked_mul(rhs).expect("overflow when multiplying time")
    }
}

impl Div<i64> for Time {
    type Output = Time;

    fn div(self, rhs: i64) -> Time {
        self.checked_div(rhs).expect("overflow or division by zero when dividing time")
    }
}

impl fmt::Display for Time {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let suffix = Precision::get().suffix();
        if self.0.has_fraction() {
            write!(f, "{}{}", self.0.get_double(), suffix)
        } else {
            write!(f, "{}{}", self.0.get_integer(), suffix)
        }
    }
}

/// A time of `value` seconds.
pub fn seconds(value: f64) -> Time {
    Time::seconds(value)
}

/// A time of `value` milliseconds.
pub fn milli_seconds(value: i64) -> Time {
    Time::milli_seconds(value)
}

/// A time of `value` microseconds.
pub fn micro_seconds(value: i64) -> Time {
    Time::micro_seconds(value)
}

/// A time of `value` nanoseconds.
pub fn nano_seconds(value: i64) -> Time {
    Time::nano_seconds(value)
}

/// A time of `value` picoseconds.
pub fn pico_seconds(value: i64) -> Time {
    Time::pico_seconds(value)
}

/// A time of `value` femtoseconds.
pub fn femto_seconds(value: i64) -> Time {
    Time::femto_seconds(value)
}

/// A time of `steps` global time steps.
pub fn time_step(steps: i64) -> Time {
    Time::from_time_step(steps)
}
