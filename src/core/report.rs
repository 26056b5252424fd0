use chrono::NaiveDate;
use itertools::Itertools;
use serde::Serialize;

use crate::{
    core::{hour_range::Hour, series::PriceSeries, window::ChargingWindow},
    error::AdvisorError,
    quantity::{cost::Cost, energy::KilowattHours, rate::KilowattHourRate},
};

/// Rates are reported with 4 decimals.
const RATE_DECIMALS: usize = 4;

/// Costs are reported in cents.
const COST_DECIMALS: usize = 2;

/// Format the hour as `HH:00`.
///
/// Not wrapped around midnight: `24` renders as `24:00`.
#[must_use]
pub fn format_hour(hour: Hour) -> String {
    format!("{hour:02}:00")
}

#[must_use]
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ChargingRecommendation {
    pub recommended_hours: Vec<String>,
    pub average_price_eur_kwh: KilowattHourRate,
    pub total_cost_eur: Cost,
    pub explanation: String,
    pub query_date: NaiveDate,
}

impl ChargingRecommendation {
    pub fn new(window: &ChargingWindow, energy: KilowattHours, query_date: NaiveDate) -> Self {
        let total_cost = energy * window.mean_price;
        let mean_price = window.mean_price.into_inner();
        let explanation = match window.prices.as_slice() {
            [single] => format!(
                "Recommended charging time: {}. With {energy} consumption, cost will be {:.2}€ (price: {mean_price:.4}€/kWh).",
                format_hour(single.hour),
                total_cost.into_inner(),
            ),
            [first, .., last] => format!(
                "Recommended charging period: {} to {}. With {energy} consumption, cost will be {:.2}€ (average price: {mean_price:.4}€/kWh).",
                format_hour(first.hour),
                // Exclusive end, not wrapped past midnight: a window ending at 23:00 reads «to 24:00».
                format_hour(last.hour + 1),
                total_cost.into_inner(),
            ),
            [] => String::from("No charging window found."),
        };
        Self {
            recommended_hours: window.hours().map(format_hour).collect_vec(),
            average_price_eur_kwh: window.mean_price.round_to(RATE_DECIMALS),
            total_cost_eur: total_cost.round_to(COST_DECIMALS),
            explanation,
            query_date,
        }
    }
}

#[must_use]
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HourlyPriceReport {
    pub hour: String,
    pub price_eur_kwh: KilowattHourRate,
}

#[must_use]
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DailyPriceSummary {
    pub date: NaiveDate,
    pub hourly_prices: Vec<HourlyPriceReport>,
    pub min_price: KilowattHourRate,
    pub max_price: KilowattHourRate,
    pub average_price: KilowattHourRate,
}

impl DailyPriceSummary {
    /// Statistics are taken over the unrounded prices.
    pub fn try_from_series(series: &PriceSeries) -> Result<Self, AdvisorError> {
        let (Some((min_price, max_price)), Some(average_price)) = (series.min_max(), series.mean())
        else {
            return Err(AdvisorError::NoPvpcData(series.date));
        };
        let hourly_prices = series
            .points()
            .iter()
            .map(|point| HourlyPriceReport {
                hour: format_hour(point.hour),
                price_eur_kwh: point.price.round_to(RATE_DECIMALS),
            })
            .collect();
        Ok(Self {
            date: series.date,
            hourly_prices,
            min_price: min_price.round_to(RATE_DECIMALS),
            max_price: max_price.round_to(RATE_DECIMALS),
            average_price: average_price.round_to(RATE_DECIMALS),
        })
    }
}
