use async_trait::async_trait;
use chrono::{DateTime, NaiveDate};
use log::{debug, info, warn};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

use crate::config::{ProviderConfig, ProviderKind};
use crate::csv_source::CsvSource;
use crate::error::DataIngestionError;
use crate::series::{PriceBar, PriceSeries};

/// A daily-bar lookup. `end` is exclusive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceRequest {
    pub ticker: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl PriceRequest {
    pub fn new(ticker: &str, start: NaiveDate, end: NaiveDate) -> Result<Self, DataIngestionError> {
        let ticker = normalize_ticker(ticker)?;
        if start >= end {
            return Err(DataIngestionError::InvalidRequest(format!(
                "start date {start} must be before end date {end}"
            )));
        }
        Ok(Self { ticker, start, end })
    }
}

/// Trims and uppercases a user-typed symbol.
pub fn normalize_ticker(raw: &str) -> Result<String, DataIngestionError> {
    let ticker = raw.trim().to_uppercase();
    if ticker.is_empty() {
        return Err(DataIngestionError::InvalidRequest(
            "ticker symbol is empty".to_string(),
        ));
    }
    if let Some(bad) = ticker
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '.' | '^' | '=' | '-')))
    {
        return Err(DataIngestionError::InvalidRequest(format!(
            "ticker symbol contains unsupported character {bad:?}"
        )));
    }
    Ok(ticker)
}

#[async_trait]
pub trait MarketDataSource: Send + Sync {
    /// Returns the bars in `[start, end)`. An empty series means the provider has
    /// nothing for this ticker and range.
    async fn fetch_daily(&self, request: &PriceRequest) -> Result<PriceSeries, DataIngestionError>;

    fn name(&self) -> &str;
}

pub fn build_source(config: &ProviderConfig) -> Result<Arc<dyn MarketDataSource>, DataIngestionError> {
    let source: Arc<dyn MarketDataSource> = match config.kind {
        ProviderKind::Yahoo => Arc::new(YahooChartSource::new(config)?),
        ProviderKind::Csv => Arc::new(CsvSource::new(config.csv_dir.clone())),
    };
    info!("Using {} market data source", source.name());
    Ok(source)
}

/// Daily bars from the Yahoo Finance v8 chart endpoint.
pub struct YahooChartSource {
    client: Client,
    base_url: String,
    auto_adjust: bool,
}

impl YahooChartSource {
    pub fn new(config: &ProviderConfig) -> Result<Self, DataIngestionError> {
        let mut builder = Client::builder().user_agent(config.user_agent.clone());
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }

        Ok(Self {
            client: builder.build()?,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            auto_adjust: config.auto_adjust,
        })
    }

    fn chart_url(&self, ticker: &str) -> String {
        format!("{}/v8/finance/chart/{}", self.base_url, ticker)
    }
}

#[async_trait]
impl MarketDataSource for YahooChartSource {
    async fn fetch_daily(&self, request: &PriceRequest) -> Result<PriceSeries, DataIngestionError> {
        let period1 = midnight_timestamp(request.start);
        let period2 = midnight_timestamp(request.end);
        info!(
            "Requesting daily bars for {} from {} to {} (exclusive)",
            request.ticker, request.start, request.end
        );

        let response = self
            .client
            .get(self.chart_url(&request.ticker))
            .header("Accept", "application/json")
            .query(&[
                ("period1", period1.to_string()),
                ("period2", period2.to_string()),
                ("interval", "1d".to_string()),
                ("events", "div,split".to_string()),
            ])
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            info!("Provider has no chart for {}", request.ticker);
            return Ok(PriceSeries::empty(request.ticker.clone()));
        }

        let body = response.text().await?;
        if !status.is_success() {
            return Err(DataIngestionError::ProviderError {
                status: status.as_u16(),
                message: body.chars().take(200).collect(),
            });
        }

        let series = parse_chart_response(&request.ticker, &body, self.auto_adjust)?
            .between(request.start, request.end);
        info!("Received {} daily bars for {}", series.len(), request.ticker);
        Ok(series)
    }

    fn name(&self) -> &str {
        "yahoo"
    }
}

fn midnight_timestamp(date: NaiveDate) -> i64 {
    date.and_hms_opt(0, 0, 0)
        .map(|dt| dt.and_utc().timestamp())
        .unwrap_or_default()
}

#[derive(Debug, Deserialize)]
struct ChartEnvelope {
    chart: ChartBody,
}

#[derive(Debug, Deserialize)]
struct ChartBody {
    #[serde(default)]
    result: Option<Vec<ChartResult>>,
    #[serde(default)]
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    #[serde(default)]
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    #[serde(default)]
    meta: ChartMeta,
    #[serde(default)]
    timestamp: Vec<i64>,
    #[serde(default)]
    indicators: ChartIndicators,
}

#[derive(Debug, Default, Deserialize)]
struct ChartMeta {
    /// Exchange offset from UTC in seconds.
    #[serde(default)]
    gmtoffset: i64,
}

#[derive(Debug, Default, Deserialize)]
struct ChartIndicators {
    #[serde(default)]
    quote: Vec<ChartQuote>,
    #[serde(default)]
    adjclose: Vec<ChartAdjClose>,
}

#[derive(Debug, Default, Deserialize)]
struct ChartQuote {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<f64>>,
}

#[derive(Debug, Default, Deserialize)]
struct ChartAdjClose {
    #[serde(default)]
    adjclose: Vec<Option<f64>>,
}

/// Decodes a v8 chart payload into a series.
///
/// A `Not Found` chart error yields an empty series; any other chart error is a
/// provider error. Timestamps are shifted by the exchange offset so each bar lands
/// on its local trading date.
pub fn parse_chart_response(
    ticker: &str,
    body: &str,
    auto_adjust: bool,
) -> Result<PriceSeries, DataIngestionError> {
    let envelope: ChartEnvelope = serde_json::from_str(body)?;

    if let Some(error) = envelope.chart.error {
        if error.code.eq_ignore_ascii_case("Not Found") {
            info!("Provider reports no data for {}: {}", ticker, error.description);
            return Ok(PriceSeries::empty(ticker));
        }
        return Err(DataIngestionError::ProviderError {
            status: 200,
            message: format!("{}: {}", error.code, error.description),
        });
    }

    let Some(result) = envelope.chart.result.and_then(|r| r.into_iter().next()) else {
        return Ok(PriceSeries::empty(ticker));
    };
    let Some(quote) = result.indicators.quote.first() else {
        return Ok(PriceSeries::empty(ticker));
    };
    let adjclose = result.indicators.adjclose.first().map(|a| a.adjclose.as_slice());

    let mut bars = Vec::with_capacity(result.timestamp.len());
    for (i, &ts) in result.timestamp.iter().enumerate() {
        let Some(date) = DateTime::from_timestamp(ts + result.meta.gmtoffset, 0).map(|dt| dt.date_naive())
        else {
            warn!("Skipping bar with out-of-range timestamp {}", ts);
            continue;
        };

        let (Some(Some(open)), Some(Some(high)), Some(Some(low)), Some(Some(close))) = (
            quote.open.get(i),
            quote.high.get(i),
            quote.low.get(i),
            quote.close.get(i),
        ) else {
            debug!("Skipping incomplete bar on {}", date);
            continue;
        };
        let volume = quote.volume.get(i).copied().flatten().unwrap_or(0.0);
        if !volume.is_finite() || volume < 0.0 {
            warn!("Invalid Volume data on {}", date);
            continue;
        }

        let mut bar = PriceBar::new(date, *open, *high, *low, *close, volume.round() as u64);
        if auto_adjust {
            if let Some(Some(adjusted)) = adjclose.and_then(|a| a.get(i)) {
                adjust_bar(&mut bar, *adjusted);
            }
        }
        bars.push(bar);
    }

    Ok(PriceSeries::from_unordered(ticker, bars))
}

fn adjust_bar(bar: &mut PriceBar, adjusted_close: f64) {
    if bar.close <= 0.0 {
        return;
    }
    let factor = adjusted_close / bar.close;
    bar.open *= factor;
    bar.high *= factor;
    bar.low *= factor;
    bar.close = adjusted_close;
}

#[cfg(test)]
mod tests {
    use super::*;

    const CHART: &str = r#"{
        "chart": {
            "result": [{
                "meta": { "symbol": "AAPL", "gmtoffset": -18000 },
                "timestamp": [1704292200, 1704378600, 1704465000, 1704724200],
                "indicators": {
                    "quote": [{
                        "open":   [184.22, 182.15, null, 182.09],
                        "high":   [185.88, 183.09, 182.76, 185.60],
                        "low":    [183.43, 180.88, 180.17, 181.50],
                        "close":  [184.25, 181.91, 181.18, 185.56],
                        "volume": [58414500, 71983600, 62303300, 59144500]
                    }],
                    "adjclose": [{ "adjclose": [92.125, 181.91, 181.18, 185.56] }]
                }
            }],
            "error": null
        }
    }"#;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn parses_bars_on_exchange_local_dates() {
        let series = parse_chart_response("AAPL", CHART, false).unwrap();
        let dates: Vec<_> = series.bars().iter().map(|b| b.date).collect();
        // null open on 2024-01-05 is dropped
        assert_eq!(dates, vec![date(2024, 1, 3), date(2024, 1, 4), date(2024, 1, 8)]);
        assert_eq!(series.bars()[0].close, 184.25);
        assert_eq!(series.bars()[0].volume, 58_414_500);
    }

    #[test]
    fn auto_adjust_scales_prices_to_adjusted_close() {
        let series = parse_chart_response("AAPL", CHART, true).unwrap();
        let first = series.bars()[0];
        assert_eq!(first.close, 92.125);
        assert!((first.open - 184.22 * 0.5).abs() < 1e-9);
        assert!((first.high - 185.88 * 0.5).abs() < 1e-9);
        assert_eq!(first.volume, 58_414_500);
    }

    #[test]
    fn not_found_error_is_an_empty_series() {
        let body = r#"{"chart":{"result":null,"error":{"code":"Not Found","description":"No data found, symbol may be delisted"}}}"#;
        let series = parse_chart_response("ZZZZZZ", body, true).unwrap();
        assert!(series.is_empty());
        assert_eq!(series.ticker(), "ZZZZZZ");
    }

    #[test]
    fn other_chart_errors_propagate() {
        let body = r#"{"chart":{"result":null,"error":{"code":"Bad Request","description":"Invalid input"}}}"#;
        let err = parse_chart_response("AAPL", body, true).unwrap_err();
        assert!(matches!(err, DataIngestionError::ProviderError { .. }));
    }

    #[test]
    fn result_without_timestamps_is_empty() {
        let body = r#"{"chart":{"result":[{"meta":{"gmtoffset":0},"indicators":{"quote":[{}]}}],"error":null}}"#;
        assert!(parse_chart_response("AAPL", body, true).unwrap().is_empty());
    }

    #[test]
    fn normalize_ticker_uppercases_and_trims() {
        assert_eq!(normalize_ticker("  aapl ").unwrap(), "AAPL");
        assert_eq!(normalize_ticker("brk-b").unwrap(), "BRK-B");
        assert_eq!(normalize_ticker("^gspc").unwrap(), "^GSPC");
        assert!(normalize_ticker("   ").is_err());
        assert!(normalize_ticker("AA PL").is_err());
        assert!(normalize_ticker("<script>").is_err());
    }

    #[test]
    fn request_requires_start_before_end() {
        let start = date(2024, 1, 10);
        assert!(PriceRequest::new("aapl", start, start).is_err());
        let request = PriceRequest::new("aapl", start, date(2024, 2, 1)).unwrap();
        assert_eq!(request.ticker, "AAPL");
    }

    #[test]
    fn period_bounds_are_utc_midnight() {
        assert_eq!(midnight_timestamp(date(2024, 1, 1)), 1_704_067_200);
    }

    #[test]
    fn build_source_follows_configured_kind() {
        let yahoo = build_source(&ProviderConfig::default()).unwrap();
        assert_eq!(yahoo.name(), "yahoo");

        let csv = build_source(&ProviderConfig {
            kind: ProviderKind::Csv,
            ..ProviderConfig::default()
        })
        .unwrap();
        assert_eq!(csv.name(), "csv");
    }
}
