pub mod error;
pub mod export;
pub mod indicators;
pub mod misc;
pub mod processor;

pub use error::FeatureError;
pub use misc::{FeatureName, FeatureRow};
pub use processor::{FeatureTable, IndicatorRow, compute_indicators, extract_features};
