use data_ingestion::fetcher::{MarketDataSource, PriceRequest};
use data_ingestion::series::PriceSeries;
use feature_processing::error::FeatureError;
use feature_processing::processor::extract_features;
use log::{error, info, warn};
use std::sync::Arc;

use crate::engine::InferenceEngine;
use crate::error::PipelineError;
use crate::report::PredictionReport;

/// fetch -> features -> predict, once per user action. Holds only read-only
/// handles; every invocation owns its own data.
pub struct Pipeline {
    source: Arc<dyn MarketDataSource>,
    engine: Arc<InferenceEngine>,
}

impl Pipeline {
    pub fn new(source: Arc<dyn MarketDataSource>, engine: Arc<InferenceEngine>) -> Self {
        Self { source, engine }
    }

    pub async fn run(&self, request: &PriceRequest) -> Result<PredictionReport, PipelineError> {
        // a failed download reads as an empty one
        let series = match self.source.fetch_daily(request).await {
            Ok(series) => series,
            Err(err) => {
                error!(
                    "Fetching {} from {} failed: {}",
                    request.ticker,
                    self.source.name(),
                    err
                );
                PriceSeries::empty(request.ticker.clone())
            }
        };
        if series.is_empty() {
            warn!(
                "No bars for {} in [{}, {})",
                request.ticker, request.start, request.end
            );
            return Err(PipelineError::NoData {
                ticker: request.ticker.clone(),
                start: request.start,
                end: request.end,
            });
        }

        let table = extract_features(&series).map_err(|err| match err {
            FeatureError::InsufficientHistory { available, .. } => {
                warn!("{}: {} bars are not enough for features", request.ticker, available);
                PipelineError::InsufficientHistory {
                    ticker: request.ticker.clone(),
                    available,
                }
            }
            other => PipelineError::Features(other),
        })?;

        let predicted = self.engine.predict(table.latest())?;
        info!(
            "{}: predicted next close {:.2} after {}",
            request.ticker,
            predicted,
            table.latest().date
        );
        Ok(PredictionReport::new(&table, predicted))
    }
}
