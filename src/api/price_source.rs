use async_trait::async_trait;
use chrono::NaiveDate;

use crate::{api::ree::DayPayload, error::AdvisorError};

/// Where the raw day-ahead prices come from.
#[async_trait]
pub trait PriceSource: Send + Sync {
    /// Fetch the raw price bundle published for the day.
    async fn fetch_day(&self, on: NaiveDate) -> Result<DayPayload, AdvisorError>;
}

/// Serves a fixed REE response for any day.
#[cfg(test)]
pub struct StaticPriceSource(pub &'static str);

#[cfg(test)]
#[async_trait]
impl PriceSource for StaticPriceSource {
    async fn fetch_day(&self, on: NaiveDate) -> Result<DayPayload, AdvisorError> {
        let response = serde_json::from_str::<crate::api::ree::Response>(self.0)
            .map_err(|error| AdvisorError::InvalidPayload(error.to_string()))?;
        Ok(DayPayload::new(on, response.included))
    }
}

/// Fails every fetch with the error produced by the closure.
#[cfg(test)]
pub struct FailingPriceSource(pub fn(NaiveDate) -> AdvisorError);

#[cfg(test)]
#[async_trait]
impl PriceSource for FailingPriceSource {
    async fn fetch_day(&self, on: NaiveDate) -> Result<DayPayload, AdvisorError> {
        Err((self.0)(on))
    }
}
