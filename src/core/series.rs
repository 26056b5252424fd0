use chrono::{NaiveDate, Timelike};
use itertools::{Itertools, MinMaxResult};

use crate::{
    api::ree::{DayPayload, SeriesRecord},
    core::hour_range::{Hour, HourRange},
    error::AdvisorError,
    prelude::*,
    quantity::rate::KilowattHourRate,
};

#[must_use]
#[derive(Copy, Clone, Debug, PartialEq, Eq, derive_more::Constructor)]
pub struct HourlyPrice {
    pub hour: Hour,
    pub price: KilowattHourRate,
}

/// Hourly prices of a single day, sorted by hour, with unique hours.
#[must_use]
#[derive(Clone, Debug)]
pub struct PriceSeries {
    pub date: NaiveDate,
    points: Vec<HourlyPrice>,
}

impl PriceSeries {
    /// Pick the PVPC series out of the payload and convert the readings
    /// into per-kilowatt-hour prices keyed by the local hour of day.
    #[instrument(skip_all, fields(date = %payload.date, n_series = payload.series.len()))]
    pub fn try_from_payload(payload: DayPayload) -> Result<Self, AdvisorError> {
        let date = payload.date;
        if payload.series.is_empty() {
            return Err(AdvisorError::NoData(date));
        }
        let record = payload
            .series
            .into_iter()
            .find(SeriesRecord::is_pvpc)
            .ok_or(AdvisorError::NoPvpcData(date))?;
        debug!(
            type_tag = %record.type_tag,
            id = %record.id,
            n_readings = record.attributes.values.len(),
            "selected"
        );

        let mut points = record
            .attributes
            .values
            .into_iter()
            .map(|reading| {
                HourlyPrice::new(
                    reading.datetime.hour(),
                    KilowattHourRate::from_megawatt_hour_rate(reading.value),
                )
            })
            .collect_vec();
        if points.is_empty() {
            return Err(AdvisorError::NoPvpcData(date));
        }

        // Stable sort, so the earlier reading wins on a repeated hour (DST fall-back):
        points.sort_by_key(|point| point.hour);
        let n_readings = points.len();
        points.dedup_by_key(|point| point.hour);
        if points.len() != n_readings {
            warn!(n_readings, n_hours = points.len(), "dropped repeated hours");
        }

        Ok(Self { date, points })
    }

    #[cfg(test)]
    pub fn from_points(date: NaiveDate, points: impl IntoIterator<Item = (Hour, f64)>) -> Self {
        let points = points
            .into_iter()
            .map(|(hour, price)| HourlyPrice::new(hour, KilowattHourRate::from(price)))
            .sorted_by_key(|point| point.hour)
            .collect();
        Self { date, points }
    }

    #[must_use]
    pub fn points(&self) -> &[HourlyPrice] {
        &self.points
    }

    /// Keep only the allowed hours, still in ascending hour order.
    pub fn filter(&self, range: HourRange) -> impl Iterator<Item = HourlyPrice> + '_ {
        self.points.iter().copied().filter(move |point| range.contains(point.hour))
    }

    /// Cheapest and the most expensive prices of the day.
    #[must_use]
    pub fn min_max(&self) -> Option<(KilowattHourRate, KilowattHourRate)> {
        match self.points.iter().map(|point| point.price).minmax() {
            MinMaxResult::NoElements => None,
            MinMaxResult::OneElement(price) => Some((price, price)),
            MinMaxResult::MinMax(min, max) => Some((min, max)),
        }
    }

    #[must_use]
    pub fn mean(&self) -> Option<KilowattHourRate> {
        mean_price(&self.points)
    }
}

/// Plain arithmetic mean of the prices.
pub fn mean_price(points: &[HourlyPrice]) -> Option<KilowattHourRate> {
    if points.is_empty() {
        return None;
    }
    let total: KilowattHourRate = points.iter().map(|point| point.price).sum();
    #[expect(clippy::cast_precision_loss)]
    let n_points = points.len() as f64;
    Some(total / n_points)
}
