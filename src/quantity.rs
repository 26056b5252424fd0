pub mod cost;
pub mod energy;
pub mod power;
pub mod rate;

use std::ops::Div;

use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};

#[derive(
    Clone,
    Copy,
    Deserialize,
    Eq,
    Ord,
    PartialEq,
    PartialOrd,
    Serialize,
    derive_more::Add,
    derive_more::From,
    derive_more::FromStr,
    derive_more::Sum,
)]
#[from(f64, OrderedFloat<f64>)]
#[must_use]
pub struct Quantity<const POWER: isize, const TIME: isize, const COST: isize>(
    pub OrderedFloat<f64>,
);

impl<const POWER: isize, const TIME: isize, const COST: isize> Quantity<POWER, TIME, COST> {
    pub const ZERO: Self = Self(OrderedFloat(0.0));

    pub const fn new(value: f64) -> Self {
        Self(OrderedFloat(value))
    }

    #[must_use]
    pub const fn into_inner(self) -> f64 {
        self.0.0
    }

    /// Round the exact binary value to the specified number of decimal places.
    pub fn round_to(self, decimals: usize) -> Self {
        format!("{:.*}", decimals, self.0.0).parse::<f64>().map_or(self, Self::from)
    }
}

impl<const POWER: isize, const TIME: isize, const COST: isize> Div<f64>
    for Quantity<POWER, TIME, COST>
{
    type Output = Self;

    fn div(self, rhs: f64) -> Self::Output {
        Self(self.0 / rhs)
    }
}

#[cfg(test)]
mod tests {
    use std::fmt::{Debug, Formatter};

    use approx::assert_abs_diff_eq;

    use super::*;

    pub type Bare = Quantity<0, 0, 0>;

    impl Debug for Bare {
        fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
            write!(f, "{:?}", self.0)
        }
    }

    #[test]
    fn test_ordering() {
        assert!(Bare::from(1.0) < Bare::from(2.0));
        assert_eq!(Bare::from(1.0).min(Bare::from(2.0)), Bare::from(1.0));
    }

    #[test]
    fn test_round_to() {
        assert_abs_diff_eq!(Bare::from(0.123_46).round_to(4).into_inner(), 0.1235);
        assert_abs_diff_eq!(Bare::from(0.744_999).round_to(2).into_inner(), 0.74);
        assert_abs_diff_eq!(Bare::from(-0.135).round_to(2).into_inner(), -0.14);
    }

    #[test]
    fn test_round_to_below_tie() {
        // 50.05 / 1000 is 0.050049999…, while multiplying it by 10⁴ gives exactly 500.5:
        assert_eq!(Bare::from(50.05 / 1000.0).round_to(4), Bare::from(0.05));
    }

    #[test]
    fn test_sum() {
        let total: Bare = [1.0, 2.5, 0.5].into_iter().map(Bare::from).sum();
        assert_eq!(total, Bare::from(4.0));
    }
}
