use std::fmt::{Debug, Display, Formatter};

use crate::quantity::Quantity;

/// Euro per kilowatt-hour.
pub type KilowattHourRate = Quantity<1, 1, -1>;

impl KilowattHourRate {
    /// Convert a price quoted in €/MWh.
    pub fn from_megawatt_hour_rate(rate: f64) -> Self {
        Self::from(rate / 1000.0)
    }
}

impl Display for KilowattHourRate {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.4} €/kWh", self.0)
    }
}

impl Debug for KilowattHourRate {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.4}€/kWh", self.0)
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;

    #[test]
    fn test_from_megawatt_hour_rate() {
        assert_abs_diff_eq!(
            KilowattHourRate::from_megawatt_hour_rate(123.45).into_inner(),
            0.123_45,
        );
    }
}
