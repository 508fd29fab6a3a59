use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Neg, Sub};

use bigdecimal::{BigDecimal, RoundingMode, ToPrimitive};
use serde::{Deserialize, Serialize};

/// Signed whole minutes. Every deviation, limit and ledger amount inside the
/// engine is expressed in this type; decimals and hours are converted once at
/// the storage boundary.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    sqlx::Type,
)]
#[serde(transparent)]
#[sqlx(transparent)]
pub struct Minutes(pub i32);

impl Minutes {
    pub const ZERO: Minutes = Minutes(0);

    /// Converts a `NUMERIC` hours value (e.g. `37.5`) into minutes, rounding
    /// half away from zero.
    pub fn from_decimal_hours(hours: &BigDecimal) -> Option<Self> {
        let minutes = (hours * BigDecimal::from(60)).with_scale_round(0, RoundingMode::HalfUp);
        minutes.to_i32().map(Minutes)
    }

    /// Converts a `NUMERIC` minutes value, truncating any fractional part.
    pub fn from_decimal_minutes(minutes: &BigDecimal) -> Option<Self> {
        minutes
            .with_scale_round(0, RoundingMode::Down)
            .to_i32()
            .map(Minutes)
    }

    pub fn value(self) -> i32 {
        self.0
    }

    pub fn is_zero(self) -> bool {
        self.0 == 0
    }

    pub fn is_positive(self) -> bool {
        self.0 > 0
    }

    pub fn is_negative(self) -> bool {
        self.0 < 0
    }

    pub fn abs(self) -> Self {
        Minutes(self.0.saturating_abs())
    }

    pub fn max(self, other: Minutes) -> Self {
        Minutes(self.0.max(other.0))
    }

    pub fn min(self, other: Minutes) -> Self {
        Minutes(self.0.min(other.0))
    }
}

impl From<i32> for Minutes {
    fn from(value: i32) -> Self {
        Minutes(value)
    }
}

impl fmt::Display for Minutes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} min", self.0)
    }
}

impl Add for Minutes {
    type Output = Minutes;

    fn add(self, rhs: Minutes) -> Minutes {
        Minutes(self.0.saturating_add(rhs.0))
    }
}

impl AddAssign for Minutes {
    fn add_assign(&mut self, rhs: Minutes) {
        self.0 = self.0.saturating_add(rhs.0);
    }
}

impl Sub for Minutes {
    type Output = Minutes;

    fn sub(self, rhs: Minutes) -> Minutes {
        Minutes(self.0.saturating_sub(rhs.0))
    }
}

impl Neg for Minutes {
    type Output = Minutes;

    fn neg(self) -> Minutes {
        Minutes(self.0.saturating_neg())
    }
}

impl Sum for Minutes {
    fn sum<I: Iterator<Item = Minutes>>(iter: I) -> Minutes {
        iter.fold(Minutes::ZERO, |acc, m| acc + m)
    }
}

impl<'a> Sum<&'a Minutes> for Minutes {
    fn sum<I: Iterator<Item = &'a Minutes>>(iter: I) -> Minutes {
        iter.copied().sum()
    }
}
