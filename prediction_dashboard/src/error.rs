use chrono::NaiveDate;
use feature_processing::error::FeatureError;
use feature_processing::misc::UnknownFeatureName;
use std::path::PathBuf;
use thiserror::Error;

pub const NO_DATA_MESSAGE: &str =
    "No data found for this ticker symbol within the selected date range.";
pub const INSUFFICIENT_HISTORY_MESSAGE: &str =
    "Not enough data to generate sophisticated features.";

/// Problems with the model artifact or its feature list. All of them are fatal at
/// startup.
#[derive(Error, Debug)]
pub enum ModelError {
    #[error("Failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse {path:?}: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error(transparent)]
    UnknownFeature(#[from] UnknownFeatureName),

    #[error("Feature list is empty")]
    EmptySchema,

    #[error("Feature {0} is listed more than once")]
    DuplicateFeature(String),

    #[error("Model was trained on {expected:?} but the feature list is {actual:?}")]
    FeatureMismatch {
        expected: Vec<String>,
        actual: Vec<String>,
    },

    #[error("Model expects {expected} inputs but the feature list has {actual}")]
    WidthMismatch { expected: usize, actual: usize },

    #[error("Malformed tree {tree}: {reason}")]
    MalformedTree { tree: usize, reason: String },

    #[error("Model produced a non-finite prediction")]
    NonFinite,

    #[error("{0:?} is an ONNX model but this build lacks the `onnx` feature")]
    OnnxDisabled(PathBuf),

    #[cfg(feature = "onnx")]
    #[error("ONNX runtime error: {0}")]
    Onnx(#[from] onnxruntime::error::OrtError),

    #[cfg(feature = "onnx")]
    #[error("ONNX model returned no output")]
    EmptyOutput,
}

/// Why a single dashboard invocation stopped.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("No data for {ticker} between {start} and {end}")]
    NoData {
        ticker: String,
        start: NaiveDate,
        end: NaiveDate,
    },

    #[error("Not enough history for {ticker}: {available} bars")]
    InsufficientHistory { ticker: String, available: usize },

    #[error("Feature error: {0}")]
    Features(#[from] FeatureError),

    #[error("Model error: {0}")]
    Model(#[from] ModelError),
}

impl PipelineError {
    /// Text shown to the person at the dashboard.
    pub fn user_message(&self) -> String {
        match self {
            PipelineError::InvalidInput(reason) => reason.clone(),
            PipelineError::NoData { .. } => NO_DATA_MESSAGE.to_string(),
            PipelineError::InsufficientHistory { .. } => INSUFFICIENT_HISTORY_MESSAGE.to_string(),
            other => format!("Something went wrong: {other}"),
        }
    }
}
