#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{Duration, NaiveDate};
use data_ingestion::error::DataIngestionError;
use data_ingestion::fetcher::{MarketDataSource, PriceRequest};
use data_ingestion::series::{PriceBar, PriceSeries};
use prediction_dashboard::engine::{FeatureSchema, InferenceEngine};
use prediction_dashboard::model::{LinearModel, ModelArtifact};
use prediction_dashboard::pipeline::Pipeline;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

pub const INTERCEPT: f64 = 0.5;

pub fn first_day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2023, 1, 2).unwrap()
}

/// A wavy upward series so every RSI window sees both gains and losses.
pub fn wavy_series(ticker: &str, len: usize) -> PriceSeries {
    let bars = (0..len)
        .map(|i| {
            let x = i as f64;
            let close = 100.0 + 5.0 * (x * 0.7).sin() + 0.1 * x;
            let open = close - 0.4 * (x * 1.3).cos();
            PriceBar::new(
                first_day() + Duration::days(i as i64),
                open,
                open.max(close) + 1.0,
                open.min(close) - 1.0,
                close,
                1_000_000 + (i as u64 % 7) * 10_000,
            )
        })
        .collect();
    PriceSeries::new(ticker, bars).unwrap()
}

/// Serves a fixed series, clipped to the requested range.
pub struct FixedSource {
    series: PriceSeries,
    pub calls: AtomicUsize,
}

impl FixedSource {
    pub fn new(series: PriceSeries) -> Self {
        Self {
            series,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl MarketDataSource for FixedSource {
    async fn fetch_daily(&self, request: &PriceRequest) -> Result<PriceSeries, DataIngestionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if request.ticker != self.series.ticker() {
            return Ok(PriceSeries::empty(request.ticker.clone()));
        }
        Ok(self.series.clone().between(request.start, request.end))
    }

    fn name(&self) -> &str {
        "fixed"
    }
}

pub struct BrokenSource;

#[async_trait]
impl MarketDataSource for BrokenSource {
    async fn fetch_daily(&self, _request: &PriceRequest) -> Result<PriceSeries, DataIngestionError> {
        Err(DataIngestionError::ProviderError {
            status: 503,
            message: "upstream unavailable".to_string(),
        })
    }

    fn name(&self) -> &str {
        "broken"
    }
}

/// Predicts `Close + INTERCEPT`.
pub fn close_plus_intercept() -> Arc<InferenceEngine> {
    let schema = FeatureSchema::from_names(&["Close", "MA_5"]).unwrap();
    let model = ModelArtifact::Linear(LinearModel {
        feature_names: Some(vec!["Close".to_string(), "MA_5".to_string()]),
        coefficients: vec![1.0, 0.0],
        intercept: INTERCEPT,
    });
    Arc::new(InferenceEngine::new(schema, Box::new(model)).unwrap())
}

pub fn pipeline(source: Arc<dyn MarketDataSource>) -> Pipeline {
    Pipeline::new(source, close_plus_intercept())
}
