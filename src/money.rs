use rust_decimal::Decimal;
use rusty_money::{define_currency_set, FormattableCurrency};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, Div, Mul, Neg, Sub};
use std::str::FromStr;

pub const CURRENCY_CODE: &str = "USD";

define_currency_set!(
    currencies {
        USD: {
            code: "USD",
            exponent: 2,
            locale: EnUs,
            minor_units: 100,
            name: "United States Dollar",
            symbol: "$",
            symbol_first: true,
        }
    }
);

/// An exact amount of money in the single reporting currency.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(Decimal);

impl Money {
    pub const ZERO: Money = Money(Decimal::ZERO);

    pub fn new(amount: Decimal) -> Self {
        Money(amount)
    }

    pub fn is_negative(&self) -> bool {
        self.0.is_sign_negative() && !self.0.is_zero()
    }
}

impl FromStr for Money {
    type Err = rust_decimal::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Decimal::from_str(s.trim()).map(Money)
    }
}

impl Add for Money {
    type Output = Money;

    fn add(self, rhs: Money) -> Money {
        Money(self.0 + rhs.0)
    }
}

impl Sub for Money {
    type Output = Money;

    fn sub(self, rhs: Money) -> Money {
        Money(self.0 - rhs.0)
    }
}

impl Neg for Money {
    type Output = Money;

    fn neg(self) -> Money {
        Money(-self.0)
    }
}

/// Scale a per-unit price by a signed quantity
impl Mul<i64> for Money {
    type Output = Money;

    fn mul(self, quantity: i64) -> Money {
        Money(self.0 * Decimal::from(quantity))
    }
}

impl Mul<Decimal> for Money {
    type Output = Money;

    fn mul(self, factor: Decimal) -> Money {
        Money(self.0 * factor)
    }
}

/// Per-unit amount. Panics on a zero quantity, callers must check first.
impl Div<i64> for Money {
    type Output = Money;

    fn div(self, quantity: i64) -> Money {
        Money(self.0 / Decimal::from(quantity))
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Money {
        iter.fold(Money::ZERO, Add::add)
    }
}

/// en-US style: `$1,234.56`, `-$15.00`
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let exponent = currencies::USD.exponent();
        let rounded = self.0.round_dp(exponent);
        // amounts that round to zero print unsigned
        let mut amount = if rounded.is_zero() { Decimal::ZERO } else { rounded };
        amount.rescale(exponent);
        let money = rusty_money::Money::from_decimal(amount, currencies::USD);
        f.pad(&money.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn display_en_us() {
        assert_eq!(Money::new(dec!(15)).to_string(), "$15.00");
        assert_eq!(Money::new(dec!(-15)).to_string(), "-$15.00");
        assert_eq!(Money::new(dec!(1234567.891)).to_string(), "$1,234,567.89");
        assert_eq!(Money::new(dec!(999.999)).to_string(), "$1,000.00");
        assert_eq!(Money::ZERO.to_string(), "$0.00");
        assert_eq!(Money::new(dec!(-0.001)).to_string(), "$0.00");
    }

    #[test]
    fn display_respects_width() {
        assert_eq!(format!("{:>8}", Money::new(dec!(1.5))), "   $1.50");
    }

    #[test]
    fn arithmetic_is_exact() {
        let price = Money::new(dec!(0.10));
        assert_eq!(price * 3, Money::new(dec!(0.30)));
        assert_eq!(price * -3, Money::new(dec!(-0.30)));
        assert_eq!(-(price * 3) + price, Money::new(dec!(-0.20)));
        assert_eq!(price * dec!(2.5), Money::new(dec!(0.25)));
        assert_eq!(Money::new(dec!(3000)) / 200, Money::new(dec!(15)));
        assert_eq!(Money::new(dec!(10)) - Money::new(dec!(15)), Money::new(dec!(-5)));
    }

    #[test]
    fn sums() {
        let amounts = [Money::new(dec!(1.25)), Money::new(dec!(2.75)), Money::new(dec!(-1))];
        assert_eq!(amounts.into_iter().sum::<Money>(), Money::new(dec!(3)));
        assert_eq!(Vec::<Money>::new().into_iter().sum::<Money>(), Money::ZERO);
    }

    #[test]
    fn parse() {
        assert_eq!(" 1.50 ".parse::<Money>().unwrap(), Money::new(dec!(1.5)));
        assert!("abc".parse::<Money>().is_err());
        assert!(Money::new(dec!(-1)).is_negative());
        assert!(!Money::ZERO.is_negative());
    }
}
