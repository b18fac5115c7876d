use std::{
    fmt::Display,
    iter::Sum,
    ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign},
};

use serde::{Deserialize, Serialize};
use sqlx::Type;
use thiserror::Error;

use crate::op;

pub const CURRENCY_CODE: &str = "INR";
pub const CURRENCY_SYMBOL: &str = "₹";

//--------------------------------------       Rupees        ---------------------------------------------------------
/// A whole-rupee amount. Every price, charge and share in the system is an integer number of rupees; fractional
/// intermediate values are rounded up with [`Rupees::ceil`].
#[derive(Debug, Clone, Copy, Default, Type, Ord, PartialOrd, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[sqlx(transparent)]
pub struct Rupees(i64);

op!(binary Rupees, Add, add);
op!(binary Rupees, Sub, sub);
op!(inplace Rupees, AddAssign, add_assign);
op!(inplace Rupees, SubAssign, sub_assign);
op!(unary Rupees, Neg, neg);

impl Mul<i64> for Rupees {
    type Output = Self;

    fn mul(self, rhs: i64) -> Self::Output {
        Self::from(self.value() * rhs)
    }
}

impl Sum for Rupees {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

#[derive(Debug, Clone, Error)]
#[error("Value cannot be represented in rupees: {0}")]
pub struct RupeesConversionError(String);

impl From<i64> for Rupees {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl TryFrom<f64> for Rupees {
    type Error = RupeesConversionError;

    /// Converts a fractional amount by rounding it up to the next whole rupee.
    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Self::ceil(value)
    }
}

impl Display for Rupees {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{CURRENCY_SYMBOL}{}", self.0)
    }
}

impl Rupees {
    pub fn value(&self) -> i64 {
        self.0
    }

    pub fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Rounds `amount` up to the next whole rupee.
    pub fn ceil(amount: f64) -> Result<Self, RupeesConversionError> {
        if !amount.is_finite() {
            return Err(RupeesConversionError(format!("{amount} is not a finite amount")));
        }
        let rounded = amount.ceil();
        if rounded > i64::MAX as f64 || rounded < i64::MIN as f64 {
            return Err(RupeesConversionError(format!("{amount} is out of range")));
        }
        #[allow(clippy::cast_possible_truncation)]
        Ok(Self(rounded as i64))
    }

    /// `percent`% of this amount, rounded up to the next whole rupee. Integer arithmetic only, so the result is exact.
    pub fn percent_ceil(&self, percent: u8) -> Self {
        let scaled = self.0 * i64::from(percent);
        Self(scaled.div_euclid(100) + i64::from(scaled.rem_euclid(100) > 0))
    }
}
