use bon::Builder;
use itertools::Itertools;

use crate::{
    core::{
        hour_range::{Hour, HourRange},
        series::{HourlyPrice, PriceSeries, mean_price},
    },
    error::AdvisorError,
    prelude::*,
    quantity::rate::KilowattHourRate,
};

/// Run of hours with the lowest mean price.
#[must_use]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChargingWindow {
    pub prices: Vec<HourlyPrice>,
    pub mean_price: KilowattHourRate,
}

impl ChargingWindow {
    pub fn hours(&self) -> impl Iterator<Item = Hour> + '_ {
        self.prices.iter().map(|point| point.hour)
    }
}

#[derive(Builder)]
pub struct WindowOptimizer<'a> {
    series: &'a PriceSeries,
    allowed_hours: HourRange,

    /// Requested window length in hours.
    n_hours: usize,
}

impl WindowOptimizer<'_> {
    /// Find the contiguous run of `n_hours` allowed hours with the minimal mean price.
    ///
    /// The allowed hours are taken in ascending hour order, so with a range that wraps past
    /// midnight the run is a slice of that sorted list and not necessarily adjacent on the clock.
    /// The earliest run wins a tie.
    #[instrument(skip_all, fields(allowed_hours = ?self.allowed_hours, n_hours = self.n_hours))]
    pub fn optimize(self) -> Result<ChargingWindow, AdvisorError> {
        let allowed = self.series.filter(self.allowed_hours).collect_vec();
        if allowed.is_empty() {
            return Err(AdvisorError::NoPricesInRange);
        }
        let n_hours = self.n_hours.clamp(1, allowed.len());
        if n_hours != self.n_hours {
            debug!(
                n_range_hours = self.allowed_hours.len(),
                n_allowed = allowed.len(),
                n_hours,
                "clamped the window length"
            );
        }

        let mut best: Option<(usize, KilowattHourRate)> = None;
        for (start, window) in allowed.windows(n_hours).enumerate() {
            let Some(mean) = mean_price(window) else { continue };
            if best.is_none_or(|(_, best_mean)| mean < best_mean) {
                best = Some((start, mean));
            }
        }
        let (start, mean_price) = best.ok_or(AdvisorError::NoPricesInRange)?;

        let window = ChargingWindow { prices: allowed[start..start + n_hours].to_vec(), mean_price };
        info!(start_hour = window.prices[0].hour, ?mean_price, "found the cheapest window");
        Ok(window)
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use chrono::NaiveDate;

    use super::*;

    fn series(points: impl IntoIterator<Item = (Hour, f64)>) -> PriceSeries {
        PriceSeries::from_points(NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(), points)
    }

    fn optimize(
        series: &PriceSeries,
        start: Hour,
        end: Hour,
        n_hours: usize,
    ) -> Result<ChargingWindow, AdvisorError> {
        WindowOptimizer::builder()
            .series(series)
            .allowed_hours(HourRange::try_new(start, end)?)
            .n_hours(n_hours)
            .build()
            .optimize()
    }

    #[test]
    fn test_slice_of_sorted_hours() -> Result {
        // Hours 22, 23, 0..=7 as inserted, but the filter sorts them ascending:
        let series = series(
            [22, 23, 0, 1, 2, 3, 4, 5, 6, 7]
                .into_iter()
                .zip([0.10, 0.10, 0.30, 0.05, 0.05, 0.05, 0.40, 0.40, 0.40, 0.40]),
        );
        let window = optimize(&series, 22, 7, 2)?;
        assert_eq!(window.hours().collect_vec(), [1, 2]);
        assert_abs_diff_eq!(window.mean_price.into_inner(), 0.05);
        Ok(())
    }

    #[test]
    fn test_window_may_jump_over_the_gap() -> Result {
        let series = series((0..24).map(|hour| match hour {
            7 | 22 => (hour, 0.01),
            _ => (hour, 0.5),
        }));
        let window = optimize(&series, 22, 7, 2)?;
        assert_eq!(window.hours().collect_vec(), [7, 22]);
        Ok(())
    }

    #[test]
    fn test_tie_goes_to_the_earliest() -> Result {
        let series = series((0..24).map(|hour| (hour, if hour % 2 == 0 { 0.1 } else { 0.2 })));
        let window = optimize(&series, 0, 23, 2)?;
        assert_eq!(window.hours().collect_vec(), [0, 1]);
        let window = optimize(&series, 0, 23, 1)?;
        assert_eq!(window.hours().collect_vec(), [0]);
        Ok(())
    }

    #[test]
    fn test_clamps_to_allowed_hours() -> Result {
        let series = series((0..24).map(|hour| (hour, f64::from(hour))));
        let window = optimize(&series, 10, 12, 5)?;
        assert_eq!(window.hours().collect_vec(), [10, 11, 12]);
        assert_abs_diff_eq!(window.mean_price.into_inner(), 11.0);
        Ok(())
    }

    #[test]
    fn test_zero_hours_means_one() -> Result {
        let series = series((0..24).map(|hour| (hour, f64::from(24 - hour))));
        let window = optimize(&series, 0, 23, 0)?;
        assert_eq!(window.hours().collect_vec(), [23]);
        Ok(())
    }

    #[test]
    fn test_no_prices_in_range() {
        let series = series([(0, 0.1), (1, 0.2)]);
        assert!(matches!(optimize(&series, 10, 12, 1), Err(AdvisorError::NoPricesInRange)));
    }

    #[test]
    fn test_mean_is_minimal_among_all_slices() -> Result {
        let prices = [
            0.131, 0.118, 0.104, 0.099, 0.097, 0.101, 0.122, 0.145, 0.167, 0.151, 0.133, 0.121,
            0.104, 0.098, 0.102, 0.117, 0.139, 0.172, 0.214, 0.231, 0.226, 0.193, 0.152, 0.135,
        ];
        let series = series((0..24).zip(prices));
        for (start, end) in [(0, 23), (22, 7), (8, 18), (18, 2)] {
            let range = HourRange::try_new(start, end)?;
            let allowed = series.filter(range).collect_vec();
            for n_hours in 1..=allowed.len() {
                let window = optimize(&series, start, end, n_hours)?;
                assert_eq!(window.prices.len(), n_hours);
                for slice in allowed.windows(n_hours) {
                    assert!(window.mean_price <= mean_price(slice).unwrap());
                }
            }
        }
        Ok(())
    }
}
