//! [Red Eléctrica «REData»](https://www.ree.es/en/apidatos) client.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, NaiveDate};
use reqwest::{Client, StatusCode, Url, header};
use serde::{Deserialize, Serialize};
use serde_with::{DefaultOnNull, serde_as};

use crate::{api::price_source::PriceSource, error::AdvisorError, prelude::*};

/// Series tag marking the PVPC prices within a bundle.
const PVPC_MARKER: &str = "PVPC";

pub struct Api {
    client: Client,
    endpoint: Url,
}

impl Api {
    pub fn new(base_url: &Url, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        let endpoint = Url::parse(&format!(
            "{}/mercados/precios-mercados-tiempo-real",
            base_url.as_str().trim_end_matches('/'),
        ))
        .context("invalid REE base URL")?;
        Ok(Self { client, endpoint })
    }
}

#[async_trait]
impl PriceSource for Api {
    #[instrument(skip_all, fields(on = %on))]
    async fn fetch_day(&self, on: NaiveDate) -> Result<DayPayload, AdvisorError> {
        info!("fetching…");
        let response = self
            .client
            .get(self.endpoint.clone())
            .header(header::ACCEPT, "application/json")
            .query(&Query::new(on))
            .send()
            .await?;
        match response.status() {
            StatusCode::OK => {}
            StatusCode::NOT_FOUND => return Err(AdvisorError::NoData(on)),
            status => {
                warn!(%status, "request failed");
                return Err(AdvisorError::SourceHttp(status));
            }
        }
        let included = response.json::<Response>().await?.included;
        info!(n_series = included.len(), "fetched");
        Ok(DayPayload::new(on, included))
    }
}

#[derive(Serialize)]
struct Query {
    start_date: String,
    end_date: String,
    time_trunc: &'static str,
}

impl Query {
    fn new(on: NaiveDate) -> Self {
        Self {
            start_date: format!("{on}T00:00"),
            end_date: format!("{on}T23:59"),
            time_trunc: "hour",
        }
    }
}

/// Series bundle published for one day.
#[must_use]
#[derive(Debug, derive_more::Constructor)]
pub struct DayPayload {
    pub date: NaiveDate,
    pub series: Vec<SeriesRecord>,
}

#[serde_as]
#[derive(Deserialize)]
pub struct Response {
    #[serde_as(as = "DefaultOnNull")]
    #[serde(default)]
    pub included: Vec<SeriesRecord>,
}

/// One named series of the bundle.
#[serde_as]
#[derive(Debug, Deserialize)]
pub struct SeriesRecord {
    #[serde_as(as = "DefaultOnNull")]
    #[serde(rename = "type", default)]
    pub type_tag: String,

    #[serde_as(as = "DefaultOnNull")]
    #[serde(default)]
    pub id: String,

    #[serde_as(as = "DefaultOnNull")]
    #[serde(default)]
    pub attributes: Attributes,
}

impl SeriesRecord {
    #[must_use]
    pub fn is_pvpc(&self) -> bool {
        self.type_tag.contains(PVPC_MARKER) || self.id.contains(PVPC_MARKER)
    }
}

#[serde_as]
#[derive(Debug, Default, Deserialize)]
pub struct Attributes {
    #[serde_as(as = "DefaultOnNull")]
    #[serde(default)]
    pub values: Vec<Reading>,
}

#[derive(Debug, Deserialize)]
pub struct Reading {
    /// Euro per megawatt-hour.
    pub value: f64,

    /// Start of the hour with the local offset.
    pub datetime: DateTime<FixedOffset>,
}
