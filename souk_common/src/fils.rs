use std::{
    fmt::Display,
    iter::Sum,
    ops::{Add, Mul, Neg, Sub, SubAssign},
};

use serde::{Deserialize, Serialize};
use sqlx::Type;
use thiserror::Error;

use crate::op;

pub const AED_CURRENCY_CODE: &str = "AED";
pub const AED_CURRENCY_CODE_LOWER: &str = "aed";

//--------------------------------------       Fils        -----------------------------------------------------------
/// An AED amount in fils (1 AED = 100 fils). All monetary arithmetic in the system happens on this
/// fixed-point type; floating point never touches a price.
#[derive(Debug, Clone, Copy, Default, Type, Ord, PartialOrd, Serialize, Deserialize)]
#[sqlx(transparent)]
pub struct Fils(i64);

op!(binary Fils, Add, add);
op!(binary Fils, Sub, sub);
op!(inplace Fils, SubAssign, sub_assign);
op!(unary Fils, Neg, neg);

impl Mul<i64> for Fils {
    type Output = Self;

    fn mul(self, rhs: i64) -> Self::Output {
        Self::from(self.value() * rhs)
    }
}

impl Sum for Fils {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

#[derive(Debug, Clone, Error)]
#[error("Value cannot be represented in fils: {0}")]
pub struct FilsConversionError(String);

impl From<i64> for Fils {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl PartialEq for Fils {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl Eq for Fils {}

impl TryFrom<u64> for Fils {
    type Error = FilsConversionError;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        if value > i64::MAX as u64 {
            Err(FilsConversionError(format!("Value {} is too large to convert to Fils", value)))
        } else {
            #[allow(clippy::cast_possible_wrap)]
            Ok(Self(value as i64))
        }
    }
}

impl Display for Fils {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let whole = self.0 / 100;
        let cents = (self.0 % 100).abs();
        if self.0 < 0 && whole == 0 {
            write!(f, "-0.{cents:02} {AED_CURRENCY_CODE}")
        } else {
            write!(f, "{whole}.{cents:02} {AED_CURRENCY_CODE}")
        }
    }
}

impl Fils {
    pub fn value(&self) -> i64 {
        self.0
    }

    pub const fn from_fils(value: i64) -> Self {
        Self(value)
    }

    pub fn from_aed(aed: i64) -> Self {
        Self(aed * 100)
    }

    pub fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Applies a percentage to the amount, rounding half-up at the fils. This is how VAT is
    /// calculated: `Fils::from_aed(100).percentage(5)` is exactly 5.00 AED.
    pub fn percentage(&self, pct: i64) -> Self {
        let numerator = self.0 * pct;
        let rounded = if numerator >= 0 { (numerator + 50) / 100 } else { -((-numerator + 50) / 100) };
        Self(rounded)
    }
}

#[cfg(test)]
mod test {
    use super::Fils;

    #[test]
    fn arithmetic_on_fils() {
        let a = Fils::from(1050);
        let b = Fils::from_aed(2);
        assert_eq!(a + b, Fils::from(1250));
        assert_eq!(a - b, Fils::from(850));
        assert_eq!(a * 3, Fils::from(3150));
        let total: Fils = [a, b, Fils::from(5)].into_iter().sum();
        assert_eq!(total, Fils::from(1255));
    }

    #[test]
    fn percentage_rounds_half_up_at_the_fils() {
        // 5% of 100.00 AED = 5.00 AED
        assert_eq!(Fils::from_aed(100).percentage(5), Fils::from_aed(5));
        // 5% of 0.10 AED = 0.005 AED, rounds up to 0.01
        assert_eq!(Fils::from(10).percentage(5), Fils::from(1));
        // 5% of 0.09 AED = 0.0045 AED, rounds down to 0.00
        assert_eq!(Fils::from(9).percentage(5), Fils::from(0));
        // 5% of 123.45 AED = 6.1725, rounds up to 6.17
        assert_eq!(Fils::from(12345).percentage(5), Fils::from(617));
    }

    #[test]
    fn display_formats_as_aed() {
        assert_eq!(Fils::from(1250).to_string(), "12.50 AED");
        assert_eq!(Fils::from(5).to_string(), "0.05 AED");
        assert_eq!(Fils::from(-75).to_string(), "-0.75 AED");
        assert_eq!(Fils::from(-1275).to_string(), "-12.75 AED");
    }
}
