use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Columns a model can be trained on. The string form is the column name used when
/// the model was fitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FeatureName {
    #[serde(rename = "Open")]
    Open,
    #[serde(rename = "High")]
    High,
    #[serde(rename = "Low")]
    Low,
    #[serde(rename = "Close")]
    Close,
    #[serde(rename = "Volume")]
    Volume,
    #[serde(rename = "MA_5")]
    Ma5,
    #[serde(rename = "MA_10")]
    Ma10,
    #[serde(rename = "MA_20")]
    Ma20,
    #[serde(rename = "MA_50")]
    Ma50,
    #[serde(rename = "RSI")]
    Rsi,
    #[serde(rename = "BB_Middle")]
    BbMiddle,
    #[serde(rename = "BB_Upper")]
    BbUpper,
    #[serde(rename = "BB_Lower")]
    BbLower,
    #[serde(rename = "High_Low_Pct")]
    HighLowPct,
    #[serde(rename = "Price_Change")]
    PriceChange,
    #[serde(rename = "Volume_Change")]
    VolumeChange,
    #[serde(rename = "Close_Lag_1")]
    CloseLag1,
    #[serde(rename = "Volume_Lag_1")]
    VolumeLag1,
    #[serde(rename = "Close_Lag_2")]
    CloseLag2,
    #[serde(rename = "Volume_Lag_2")]
    VolumeLag2,
    #[serde(rename = "Close_Lag_3")]
    CloseLag3,
    #[serde(rename = "Volume_Lag_3")]
    VolumeLag3,
    #[serde(rename = "Close_Lag_5")]
    CloseLag5,
    #[serde(rename = "Volume_Lag_5")]
    VolumeLag5,
}

impl FeatureName {
    pub const ALL: [FeatureName; 24] = [
        FeatureName::Open,
        FeatureName::High,
        FeatureName::Low,
        FeatureName::Close,
        FeatureName::Volume,
        FeatureName::Ma5,
        FeatureName::Ma10,
        FeatureName::Ma20,
        FeatureName::Ma50,
        FeatureName::Rsi,
        FeatureName::BbMiddle,
        FeatureName::BbUpper,
        FeatureName::BbLower,
        FeatureName::HighLowPct,
        FeatureName::PriceChange,
        FeatureName::VolumeChange,
        FeatureName::CloseLag1,
        FeatureName::VolumeLag1,
        FeatureName::CloseLag2,
        FeatureName::VolumeLag2,
        FeatureName::CloseLag3,
        FeatureName::VolumeLag3,
        FeatureName::CloseLag5,
        FeatureName::VolumeLag5,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            FeatureName::Open => "Open",
            FeatureName::High => "High",
            FeatureName::Low => "Low",
            FeatureName::Close => "Close",
            FeatureName::Volume => "Volume",
            FeatureName::Ma5 => "MA_5",
            FeatureName::Ma10 => "MA_10",
            FeatureName::Ma20 => "MA_20",
            FeatureName::Ma50 => "MA_50",
            FeatureName::Rsi => "RSI",
            FeatureName::BbMiddle => "BB_Middle",
            FeatureName::BbUpper => "BB_Upper",
            FeatureName::BbLower => "BB_Lower",
            FeatureName::HighLowPct => "High_Low_Pct",
            FeatureName::PriceChange => "Price_Change",
            FeatureName::VolumeChange => "Volume_Change",
            FeatureName::CloseLag1 => "Close_Lag_1",
            FeatureName::VolumeLag1 => "Volume_Lag_1",
            FeatureName::CloseLag2 => "Close_Lag_2",
            FeatureName::VolumeLag2 => "Volume_Lag_2",
            FeatureName::CloseLag3 => "Close_Lag_3",
            FeatureName::VolumeLag3 => "Volume_Lag_3",
            FeatureName::CloseLag5 => "Close_Lag_5",
            FeatureName::VolumeLag5 => "Volume_Lag_5",
        }
    }
}

impl fmt::Display for FeatureName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownFeatureName(pub String);

impl fmt::Display for UnknownFeatureName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown feature name {:?}", self.0)
    }
}

impl std::error::Error for UnknownFeatureName {}

impl FromStr for FeatureName {
    type Err = UnknownFeatureName;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FeatureName::ALL
            .into_iter()
            .find(|name| name.as_str() == s)
            .ok_or_else(|| UnknownFeatureName(s.to_string()))
    }
}

/// A price bar plus every derived indicator, all windows satisfied.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureRow {
    #[serde(rename = "Date")]
    pub date: NaiveDate,
    #[serde(rename = "Open")]
    pub open: f64,
    #[serde(rename = "High")]
    pub high: f64,
    #[serde(rename = "Low")]
    pub low: f64,
    #[serde(rename = "Close")]
    pub close: f64,
    #[serde(rename = "Volume")]
    pub volume: u64,
    #[serde(rename = "MA_5")]
    pub ma_5: f64,
    #[serde(rename = "MA_10")]
    pub ma_10: f64,
    #[serde(rename = "MA_20")]
    pub ma_20: f64,
    #[serde(rename = "MA_50")]
    pub ma_50: f64,
    #[serde(rename = "RSI")]
    pub rsi: f64,
    #[serde(rename = "BB_Middle")]
    pub bb_middle: f64,
    #[serde(rename = "BB_Upper")]
    pub bb_upper: f64,
    #[serde(rename = "BB_Lower")]
    pub bb_lower: f64,
    #[serde(rename = "High_Low_Pct")]
    pub high_low_pct: f64,
    #[serde(rename = "Price_Change")]
    pub price_change: f64,
    #[serde(rename = "Volume_Change")]
    pub volume_change: f64,
    #[serde(rename = "Close_Lag_1")]
    pub close_lag_1: f64,
    #[serde(rename = "Volume_Lag_1")]
    pub volume_lag_1: f64,
    #[serde(rename = "Close_Lag_2")]
    pub close_lag_2: f64,
    #[serde(rename = "Volume_Lag_2")]
    pub volume_lag_2: f64,
    #[serde(rename = "Close_Lag_3")]
    pub close_lag_3: f64,
    #[serde(rename = "Volume_Lag_3")]
    pub volume_lag_3: f64,
    #[serde(rename = "Close_Lag_5")]
    pub close_lag_5: f64,
    #[serde(rename = "Volume_Lag_5")]
    pub volume_lag_5: f64,
}

impl FeatureRow {
    pub fn value(&self, name: FeatureName) -> f64 {
        match name {
            FeatureName::Open => self.open,
            FeatureName::High => self.high,
            FeatureName::Low => self.low,
            FeatureName::Close => self.close,
            FeatureName::Volume => self.volume as f64,
            FeatureName::Ma5 => self.ma_5,
            FeatureName::Ma10 => self.ma_10,
            FeatureName::Ma20 => self.ma_20,
            FeatureName::Ma50 => self.ma_50,
            FeatureName::Rsi => self.rsi,
            FeatureName::BbMiddle => self.bb_middle,
            FeatureName::BbUpper => self.bb_upper,
            FeatureName::BbLower => self.bb_lower,
            FeatureName::HighLowPct => self.high_low_pct,
            FeatureName::PriceChange => self.price_change,
            FeatureName::VolumeChange => self.volume_change,
            FeatureName::CloseLag1 => self.close_lag_1,
            FeatureName::VolumeLag1 => self.volume_lag_1,
            FeatureName::CloseLag2 => self.close_lag_2,
            FeatureName::VolumeLag2 => self.volume_lag_2,
            FeatureName::CloseLag3 => self.close_lag_3,
            FeatureName::VolumeLag3 => self.volume_lag_3,
            FeatureName::CloseLag5 => self.close_lag_5,
            FeatureName::VolumeLag5 => self.volume_lag_5,
        }
    }

    /// Values in the order given by `names`.
    pub fn select(&self, names: &[FeatureName]) -> Vec<f64> {
        names.iter().map(|&name| self.value(name)).collect()
    }
}
