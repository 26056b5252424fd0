use std::{ops::RangeInclusive, sync::Arc};

use chrono::{Local, NaiveDate};
use serde::Deserialize;

use crate::{
    api::price_source::PriceSource,
    core::{
        hour_range::{Hour, HourRange},
        report::{ChargingRecommendation, DailyPriceSummary},
        series::PriceSeries,
        window::WindowOptimizer,
    },
    error::AdvisorError,
    prelude::*,
    quantity::{energy::KilowattHours, power::Kilowatts},
};

/// Accepted charging energy, kilowatt-hours.
const ENERGY_BOUNDS: RangeInclusive<f64> = 0.1..=100.0;

/// Best charging window query, defaults to the night hours and 10 kWh.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct WindowRequest {
    /// `YYYY-MM-DD`, today if not set.
    pub date: Option<String>,

    pub start_hour: Hour,
    pub end_hour: Hour,

    #[serde(rename = "kwh")]
    pub energy: KilowattHours,
}

impl Default for WindowRequest {
    fn default() -> Self {
        Self { date: None, start_hour: 22, end_hour: 7, energy: KilowattHours::from(10.0) }
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct SummaryRequest {
    pub date: Option<String>,
}

pub struct ChargingAdvisor {
    source: Arc<dyn PriceSource>,
    charger_power: Kilowatts,
}

impl ChargingAdvisor {
    pub fn new(source: Arc<dyn PriceSource>, charger_power: Kilowatts) -> Self {
        Self { source, charger_power }
    }

    /// Find the cheapest contiguous run of allowed hours long enough to charge the energy.
    #[instrument(
        skip_all,
        fields(
            date = ?request.date,
            start_hour = request.start_hour,
            end_hour = request.end_hour,
            energy = ?request.energy
        )
    )]
    pub async fn best_window(
        &self,
        request: &WindowRequest,
    ) -> Result<ChargingRecommendation, AdvisorError> {
        let date = parse_date(request.date.as_deref())?;
        let allowed_hours = HourRange::try_new(request.start_hour, request.end_hour)?;
        let energy = validate_energy(request.energy)?;
        let n_hours = self.window_length(energy);
        debug!(hours = ?allowed_hours.expand(), n_hours, "validated");

        let series = self.fetch_series(date).await?;
        let window = WindowOptimizer::builder()
            .series(&series)
            .allowed_hours(allowed_hours)
            .n_hours(n_hours)
            .build()
            .optimize()?;
        Ok(ChargingRecommendation::new(&window, energy, date))
    }

    /// All hourly prices of the day together with the statistics.
    #[instrument(skip_all, fields(date = ?request.date))]
    pub async fn daily_summary(
        &self,
        request: &SummaryRequest,
    ) -> Result<DailyPriceSummary, AdvisorError> {
        let date = parse_date(request.date.as_deref())?;
        let series = self.fetch_series(date).await?;
        DailyPriceSummary::try_from_series(&series)
    }

    /// Whole hours needed at the charger power: rounded half up, at least one.
    #[must_use]
    pub fn window_length(&self, energy: KilowattHours) -> usize {
        let hours = energy / self.charger_power;
        #[expect(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let n_hours = (hours + 0.5).floor() as usize;
        n_hours.max(1)
    }

    async fn fetch_series(&self, date: NaiveDate) -> Result<PriceSeries, AdvisorError> {
        let payload = self.source.fetch_day(date).await?;
        let series = PriceSeries::try_from_payload(payload)?;
        info!(%date, n_hours = series.points().len(), "parsed the prices");
        Ok(series)
    }
}

/// Parse a strict `YYYY-MM-DD` date, falling back to today.
pub fn parse_date(date: Option<&str>) -> Result<NaiveDate, AdvisorError> {
    let Some(date) = date else {
        return Ok(Local::now().date_naive());
    };
    let is_well_formed = date.len() == 10
        && date.bytes().enumerate().all(|(index, byte)| {
            if index == 4 || index == 7 { byte == b'-' } else { byte.is_ascii_digit() }
        });
    if !is_well_formed {
        return Err(AdvisorError::InvalidDate);
    }
    NaiveDate::parse_from_str(date, "%Y-%m-%d").map_err(|_| AdvisorError::InvalidDate)
}

fn validate_energy(energy: KilowattHours) -> Result<KilowattHours, AdvisorError> {
    if ENERGY_BOUNDS.contains(&energy.into_inner()) {
        Ok(energy)
    } else {
        Err(AdvisorError::InvalidArgument(format!(
            "kwh must be within 0.1-100.0, got {}",
            energy.into_inner(),
        )))
    }
}
