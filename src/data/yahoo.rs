//! Yahoo Finance chart API client (daily closes).

use std::time::Duration;

use chrono::{DateTime, Days, NaiveDate, NaiveTime};
use reqwest::blocking::Client;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::data::SeriesSource;
use crate::domain::{DateRange, Series, TimePoint};
use crate::error::SourceError;

const BASE_URL: &str = "https://query1.finance.yahoo.com/v8/finance/chart";
const TIMEOUT: Duration = Duration::from_secs(30);
// The chart endpoint rejects requests without a browser-like agent.
const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) dxy-yield/0.1";

pub struct YahooClient {
    client: Client,
    symbol: String,
}

impl YahooClient {
    pub fn new(symbol: impl Into<String>) -> Result<Self, SourceError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(TIMEOUT)
            .build()
            .map_err(|e| SourceError::Http(e.to_string()))?;
        Ok(Self {
            client,
            symbol: symbol.into(),
        })
    }
}

impl SeriesSource for YahooClient {
    fn name(&self) -> &'static str {
        "yahoo"
    }

    fn symbol(&self) -> &str {
        &self.symbol
    }

    fn fetch(&self, window: &DateRange) -> Result<Series, SourceError> {
        let (period1, period2) = period_bounds(window);
        let url = format!("{BASE_URL}/{}", self.symbol);

        debug!(symbol = %self.symbol, period1, period2, "requesting Yahoo chart");
        let resp = self
            .client
            .get(&url)
            .query(&[
                ("period1", period1.to_string()),
                ("period2", period2.to_string()),
                ("interval", "1d".to_string()),
                ("events", "history".to_string()),
            ])
            .send()
            .map_err(|e| SourceError::Http(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(SourceError::Status(resp.status().as_u16()));
        }

        let body: ChartResponse = resp.json().map_err(|e| SourceError::Decode(e.to_string()))?;
        let series = chart_to_series(body, &self.symbol)?;
        let series = Series::from_points(
            series
                .into_points()
                .into_iter()
                .filter(|p| window.contains(p.date))
                .collect(),
        );

        if series.is_empty() {
            return Err(SourceError::Empty(self.symbol.clone()));
        }
        info!(symbol = %self.symbol, rows = series.len(), "fetched Yahoo series");
        Ok(series)
    }
}

/// Unix-second bounds covering `window` inclusively (`period2` is exclusive).
fn period_bounds(window: &DateRange) -> (i64, i64) {
    let to_ts = |d: NaiveDate| d.and_time(NaiveTime::MIN).and_utc().timestamp();
    let end_exclusive = window.end.checked_add_days(Days::new(1)).unwrap_or(window.end);
    (to_ts(window.start), to_ts(end_exclusive))
}

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: Chart,
}

#[derive(Debug, Deserialize)]
struct Chart {
    result: Option<Vec<ChartResult>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    meta: ChartMeta,
    #[serde(default)]
    timestamp: Vec<i64>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct ChartMeta {
    #[serde(default)]
    gmtoffset: i64,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    #[serde(default)]
    quote: Vec<Quote>,
}

#[derive(Debug, Deserialize)]
struct Quote {
    #[serde(default)]
    close: Vec<Option<f64>>,
}

/// Convert a chart payload to a date-sorted series of closes.
///
/// Timestamps are shifted by the exchange's GMT offset so each bar lands on
/// its local trading date. Missing closes become null points.
fn chart_to_series(body: ChartResponse, symbol: &str) -> Result<Series, SourceError> {
    if let Some(err) = body.chart.error {
        return Err(SourceError::Decode(format!("{}: {}", err.code, err.description)));
    }
    let result = body
        .chart
        .result
        .and_then(|r| r.into_iter().next())
        .ok_or_else(|| SourceError::Empty(symbol.to_string()))?;

    let closes = result
        .indicators
        .quote
        .into_iter()
        .next()
        .map(|q| q.close)
        .unwrap_or_default();

    if closes.len() != result.timestamp.len() {
        warn!(
            symbol,
            timestamps = result.timestamp.len(),
            closes = closes.len(),
            "Yahoo chart arrays differ in length; extra entries ignored"
        );
    }

    let offset = result.meta.gmtoffset;
    let points = result
        .timestamp
        .iter()
        .zip(closes)
        .filter_map(|(&ts, close)| {
            let date = DateTime::from_timestamp(ts + offset, 0)?.date_naive();
            Some(TimePoint::new(date, close.filter(|v| v.is_finite())))
        })
        .collect();

    Ok(Series::from_unsorted(points))
}
