//! Physical units.
//!
//! These newtypes keep sampling rates, time stamps and analog levels from
//! being mixed up at API boundaries, e.g. a sample spacing passed where a
//! sampling frequency is expected.

use serde::{Deserialize, Serialize};
use std::ops::{Add, Div, Mul, Sub};

/// Same-unit addition and subtraction, scaling by `f64`, and the
/// dimensionless ratio of two values.
macro_rules! linear_unit {
    ($unit:ident) => {
        impl $unit {
            pub const ZERO: Self = Self(0.0);
        }

        impl Add for $unit {
            type Output = Self;
            fn add(self, rhs: Self) -> Self {
                Self(self.0 + rhs.0)
            }
        }

        impl Sub for $unit {
            type Output = Self;
            fn sub(self, rhs: Self) -> Self {
                Self(self.0 - rhs.0)
            }
        }

        impl Mul<f64> for $unit {
            type Output = Self;
            fn mul(self, k: f64) -> Self {
                Self(self.0 * k)
            }
        }

        impl Div<f64> for $unit {
            type Output = Self;
            fn div(self, k: f64) -> Self {
                Self(self.0 / k)
            }
        }

        impl Div for $unit {
            type Output = f64;
            fn div(self, rhs: Self) -> f64 {
                self.0 / rhs.0
            }
        }
    };
}

/// Time in seconds.
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
pub struct Seconds(pub f64);

linear_unit!(Seconds);

impl Seconds {
    pub fn from_days(d: f64) -> Self {
        Self(d * 86_400.0)
    }

    pub fn from_hours(h: f64) -> Self {
        Self(h * 3_600.0)
    }

    pub fn from_ms(ms: f64) -> Self {
        Self(ms * 1e-3)
    }

    pub fn from_us(us: f64) -> Self {
        Self(us * 1e-6)
    }

    pub fn from_ns(ns: f64) -> Self {
        Self(ns * 1e-9)
    }

    pub fn from_ps(ps: f64) -> Self {
        Self(ps * 1e-12)
    }

    /// Rate of an event repeating every `self`.
    pub fn rate(self) -> Hertz {
        Hertz(self.0.recip())
    }
}

/// Frequency in Hertz.
///
/// A sampling frequency of zero means "no physical time axis"; use
/// [`Hertz::is_set`] rather than comparing against zero.
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
pub struct Hertz(pub f64);

linear_unit!(Hertz);

impl Hertz {
    /// Whether this frequency can be used to build a physical axis.
    #[inline]
    pub fn is_set(self) -> bool {
        self.0 > 0.0 && self.0.is_finite()
    }

    /// Sample spacing at this sampling frequency.
    pub fn period(self) -> Seconds {
        Seconds(self.0.recip())
    }
}

/// Analog level in Volts.
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
pub struct Volts(pub f64);

linear_unit!(Volts);

impl Volts {
    /// `20·log10(self/reference)`.
    pub fn db_over(self, reference: Volts) -> f64 {
        20.0 * (self / reference).log10()
    }
}
