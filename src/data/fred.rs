//! FRED observations API client.
//!
//! Used for the 10-year Treasury yield (`DGS10`) and, optionally, as an index
//! source (`DTWEXBGS`, the broad trade-weighted dollar).

use std::time::Duration;

use reqwest::blocking::Client;
use serde::Deserialize;
use tracing::{debug, info};

use crate::data::SeriesSource;
use crate::domain::{DateRange, Series};
use crate::error::SourceError;
use crate::io::ingest::series_from_raw;

const BASE_URL: &str = "https://api.stlouisfed.org/fred/series/observations";
const OBS_LIMIT: usize = 100_000;
const TIMEOUT: Duration = Duration::from_secs(30);

/// FRED series id of the 10-year constant-maturity Treasury yield.
pub const SERIES_DGS10: &str = "DGS10";

pub struct FredClient {
    client: Client,
    api_key: String,
    series_id: String,
}

impl FredClient {
    /// Build a client for `series_id` using `FRED_API_KEY` from the environment
    /// (or `.env`).
    pub fn from_env(series_id: impl Into<String>) -> Result<Self, SourceError> {
        dotenvy::dotenv().ok();
        let api_key = std::env::var("FRED_API_KEY")
            .map_err(|_| SourceError::Credentials("FRED_API_KEY is not set (environment or .env)".to_string()))?;
        let client = Client::builder()
            .timeout(TIMEOUT)
            .build()
            .map_err(|e| SourceError::Http(e.to_string()))?;
        Ok(Self {
            client,
            api_key,
            series_id: series_id.into(),
        })
    }

    fn fetch_body(&self, window: &DateRange) -> Result<ObservationsResponse, SourceError> {
        let start = window.start.to_string();
        let end = window.end.to_string();
        let limit = OBS_LIMIT.to_string();

        debug!(series_id = %self.series_id, %start, %end, "requesting FRED observations");
        let resp = self
            .client
            .get(BASE_URL)
            .query(&[
                ("series_id", self.series_id.as_str()),
                ("api_key", self.api_key.as_str()),
                ("file_type", "json"),
                ("sort_order", "asc"),
                ("observation_start", start.as_str()),
                ("observation_end", end.as_str()),
                ("limit", limit.as_str()),
            ])
            .send()
            .map_err(|e| SourceError::Http(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(SourceError::Status(resp.status().as_u16()));
        }

        resp.json().map_err(|e| SourceError::Decode(e.to_string()))
    }
}

impl SeriesSource for FredClient {
    fn name(&self) -> &'static str {
        "fred"
    }

    fn symbol(&self) -> &str {
        &self.series_id
    }

    fn fetch(&self, window: &DateRange) -> Result<Series, SourceError> {
        let body = self.fetch_body(window)?;
        let series = observations_to_series(&body);
        if series.is_empty() {
            return Err(SourceError::Empty(self.series_id.clone()));
        }
        info!(series_id = %self.series_id, rows = series.len(), "fetched FRED series");
        Ok(series)
    }
}

#[derive(Debug, Deserialize)]
struct ObservationsResponse {
    observations: Vec<Observation>,
}

#[derive(Debug, Deserialize)]
struct Observation {
    date: String,
    value: String,
}

/// FRED marks missing observations with `"."`; they become null points.
fn observations_to_series(body: &ObservationsResponse) -> Series {
    series_from_raw(body.observations.iter().map(|o| (o.date.as_str(), o.value.as_str())))
}
