use thiserror::Error;

#[derive(Error, Debug)]
pub enum FeatureError {
    #[error("Insufficient history: {available} bars yield no complete feature row (at least {required} are needed)")]
    InsufficientHistory { available: usize, required: usize },

    #[error("Polars error: {0}")]
    PolarsError(#[from] polars::prelude::PolarsError),

    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}
