use chrono::NaiveDate;
use reqwest::StatusCode;

/// Everything that may go wrong while advising on a charging window.
///
/// These propagate unchanged up to the tool gateway, which is the only place
/// that turns them into user-visible text.
#[derive(thiserror::Error, Debug)]
pub enum AdvisorError {
    #[error("Invalid date format. Use YYYY-MM-DD")]
    InvalidDate,

    #[error("Invalid arguments: {0}")]
    InvalidArgument(String),

    #[error("Timeout querying REE API")]
    SourceTimeout,

    #[error("Connection error with REE API: {0}")]
    SourceConnection(#[source] reqwest::Error),

    #[error("REE API error: {}", .0.as_u16())]
    SourceHttp(StatusCode),

    #[error("Invalid response from REE API: {0}")]
    InvalidPayload(String),

    /// The day has not been published.
    #[error("No price data available for date {0}")]
    NoData(NaiveDate),

    /// The bundle contains no PVPC series, or the series is empty.
    #[error("No PVPC data available for date {0}")]
    NoPvpcData(NaiveDate),

    #[error("No prices available in specified hour range")]
    NoPricesInRange,

    #[error("Unknown tool: {0}")]
    UnknownTool(String),
}

impl AdvisorError {
    /// Whether the error means that there are simply no prices to work with.
    #[must_use]
    pub const fn is_no_data(&self) -> bool {
        matches!(self, Self::NoData(_) | Self::NoPvpcData(_))
    }
}

impl From<reqwest::Error> for AdvisorError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            Self::SourceTimeout
        } else if error.is_decode() {
            Self::InvalidPayload(error.to_string())
        } else {
            Self::SourceConnection(error)
        }
    }
}
