use async_trait::async_trait;
use chrono::NaiveDate;
use log::{info, warn};
use serde::Deserialize;
use std::path::PathBuf;

use crate::error::DataIngestionError;
use crate::fetcher::{MarketDataSource, PriceRequest};
use crate::series::{PriceBar, PriceSeries};

/// Reads `<dir>/<TICKER>.csv` files with a `Date,Open,High,Low,Close,Volume` header.
pub struct CsvSource {
    dir: PathBuf,
}

#[derive(Debug, Deserialize)]
struct CsvBar {
    #[serde(rename = "Date")]
    date: NaiveDate,
    #[serde(rename = "Open")]
    open: f64,
    #[serde(rename = "High")]
    high: f64,
    #[serde(rename = "Low")]
    low: f64,
    #[serde(rename = "Close")]
    close: f64,
    #[serde(rename = "Volume")]
    volume: f64,
}

impl CsvSource {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    pub fn read_series(&self, ticker: &str) -> Result<PriceSeries, DataIngestionError> {
        let path = self.dir.join(format!("{ticker}.csv"));
        if !path.exists() {
            info!("No CSV file for {} at {:?}", ticker, path);
            return Ok(PriceSeries::empty(ticker));
        }

        let mut reader = csv::Reader::from_path(&path)?;
        let mut bars = Vec::new();
        for record in reader.deserialize::<CsvBar>() {
            let row = record?;
            if !row.volume.is_finite() || row.volume < 0.0 {
                warn!("Invalid Volume data on {}", row.date);
                continue;
            }
            bars.push(PriceBar::new(
                row.date,
                row.open,
                row.high,
                row.low,
                row.close,
                row.volume.round() as u64,
            ));
        }
        Ok(PriceSeries::from_unordered(ticker, bars))
    }
}

#[async_trait]
impl MarketDataSource for CsvSource {
    async fn fetch_daily(&self, request: &PriceRequest) -> Result<PriceSeries, DataIngestionError> {
        let series = self
            .read_series(&request.ticker)?
            .between(request.start, request.end);
        info!("Loaded {} daily bars for {} from CSV", series.len(), request.ticker);
        Ok(series)
    }

    fn name(&self) -> &str {
        "csv"
    }
}
