use data_ingestion::series::{PriceBar, PriceSeries};
use log::{debug, info};
use polars::prelude::*;

use crate::error::FeatureError;
use crate::indicators::{lag, pct_change, rolling_mean, rolling_std, rsi};
use crate::misc::{FeatureName, FeatureRow};

pub const MA_WINDOWS: [usize; 4] = [5, 10, 20, 50];
pub const LONGEST_WINDOW: usize = 50;
pub const RSI_PERIOD: usize = 14;
pub const BOLLINGER_WINDOW: usize = 20;
pub const BOLLINGER_WIDTH: f64 = 2.0;
pub const LAGS: [usize; 4] = [1, 2, 3, 5];

const MA_COLUMNS: [FeatureName; 4] = [
    FeatureName::Ma5,
    FeatureName::Ma10,
    FeatureName::Ma20,
    FeatureName::Ma50,
];
const CLOSE_LAGS: [FeatureName; 4] = [
    FeatureName::CloseLag1,
    FeatureName::CloseLag2,
    FeatureName::CloseLag3,
    FeatureName::CloseLag5,
];
const VOLUME_LAGS: [FeatureName; 4] = [
    FeatureName::VolumeLag1,
    FeatureName::VolumeLag2,
    FeatureName::VolumeLag3,
    FeatureName::VolumeLag5,
];

/// A bar with its derived columns. `None` means the column's lookback window is
/// not satisfied at this position (or, for RSI, that the average loss is zero).
#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorRow {
    pub bar: PriceBar,
    pub ma_5: Option<f64>,
    pub ma_10: Option<f64>,
    pub ma_20: Option<f64>,
    pub ma_50: Option<f64>,
    pub rsi: Option<f64>,
    pub bb_middle: Option<f64>,
    pub bb_upper: Option<f64>,
    pub bb_lower: Option<f64>,
    pub high_low_pct: Option<f64>,
    pub price_change: Option<f64>,
    pub volume_change: Option<f64>,
    /// Indexed like `LAGS`.
    pub close_lags: [Option<f64>; 4],
    pub volume_lags: [Option<f64>; 4],
}

impl IndicatorRow {
    /// The row is usable for prediction only when every derived value exists and
    /// is finite.
    pub fn to_feature_row(&self) -> Option<FeatureRow> {
        let valid = |value: Option<f64>| value.filter(|v| v.is_finite());
        let [c1, c2, c3, c5] = self.close_lags;
        let [v1, v2, v3, v5] = self.volume_lags;

        Some(FeatureRow {
            date: self.bar.date,
            open: self.bar.open,
            high: self.bar.high,
            low: self.bar.low,
            close: self.bar.close,
            volume: self.bar.volume,
            ma_5: valid(self.ma_5)?,
            ma_10: valid(self.ma_10)?,
            ma_20: valid(self.ma_20)?,
            ma_50: valid(self.ma_50)?,
            rsi: valid(self.rsi)?,
            bb_middle: valid(self.bb_middle)?,
            bb_upper: valid(self.bb_upper)?,
            bb_lower: valid(self.bb_lower)?,
            high_low_pct: valid(self.high_low_pct)?,
            price_change: valid(self.price_change)?,
            volume_change: valid(self.volume_change)?,
            close_lag_1: valid(c1)?,
            volume_lag_1: valid(v1)?,
            close_lag_2: valid(c2)?,
            volume_lag_2: valid(v2)?,
            close_lag_3: valid(c3)?,
            volume_lag_3: valid(v3)?,
            close_lag_5: valid(c5)?,
            volume_lag_5: valid(v5)?,
        })
    }
}

fn to_dataframe(series: &PriceSeries) -> Result<DataFrame, FeatureError> {
    let bars = series.bars();
    let high: Vec<f64> = bars.iter().map(|b| b.high).collect();
    let low: Vec<f64> = bars.iter().map(|b| b.low).collect();

    let df = DataFrame::new(vec![
        Series::new(FeatureName::High.as_str(), high),
        Series::new(FeatureName::Low.as_str(), low),
        Series::new(FeatureName::Close.as_str(), series.closes()),
        Series::new(FeatureName::Volume.as_str(), series.volumes()),
    ])?;
    Ok(df)
}

/// Derived columns, each aliased to its schema name.
fn indicator_exprs() -> Vec<Expr> {
    let close = || col(FeatureName::Close.as_str());
    let volume = || col(FeatureName::Volume.as_str());
    let band = |sign: f64| {
        rolling_mean(close(), BOLLINGER_WINDOW)
            + lit(sign * BOLLINGER_WIDTH) * rolling_std(close(), BOLLINGER_WINDOW)
    };

    let mut exprs: Vec<Expr> = MA_WINDOWS
        .iter()
        .zip(MA_COLUMNS)
        .map(|(&window, name)| rolling_mean(close(), window).alias(name.as_str()))
        .collect();
    exprs.extend([
        rsi(close(), RSI_PERIOD).alias(FeatureName::Rsi.as_str()),
        rolling_mean(close(), BOLLINGER_WINDOW).alias(FeatureName::BbMiddle.as_str()),
        band(1.0).alias(FeatureName::BbUpper.as_str()),
        band(-1.0).alias(FeatureName::BbLower.as_str()),
        ((col(FeatureName::High.as_str()) - col(FeatureName::Low.as_str())) / close()
            * lit(100.0))
        .alias(FeatureName::HighLowPct.as_str()),
        pct_change(close()).alias(FeatureName::PriceChange.as_str()),
        pct_change(volume()).alias(FeatureName::VolumeChange.as_str()),
    ]);
    for ((&offset, close_name), volume_name) in LAGS.iter().zip(CLOSE_LAGS).zip(VOLUME_LAGS) {
        exprs.push(lag(close(), offset).alias(close_name.as_str()));
        exprs.push(lag(volume(), offset).alias(volume_name.as_str()));
    }
    exprs
}

fn column(frame: &DataFrame, name: FeatureName) -> Result<Vec<Option<f64>>, FeatureError> {
    Ok(frame.column(name.as_str())?.f64()?.into_iter().collect())
}

/// Computes every indicator column for the series, one row per bar.
pub fn compute_indicators(series: &PriceSeries) -> Result<Vec<IndicatorRow>, FeatureError> {
    if series.is_empty() {
        return Ok(Vec::new());
    }

    let frame = to_dataframe(series)?
        .lazy()
        .with_columns(indicator_exprs())
        .collect()?;

    let [ma_5, ma_10, ma_20, ma_50] = [
        column(&frame, FeatureName::Ma5)?,
        column(&frame, FeatureName::Ma10)?,
        column(&frame, FeatureName::Ma20)?,
        column(&frame, FeatureName::Ma50)?,
    ];
    let rsi = column(&frame, FeatureName::Rsi)?;
    let bb_middle = column(&frame, FeatureName::BbMiddle)?;
    let bb_upper = column(&frame, FeatureName::BbUpper)?;
    let bb_lower = column(&frame, FeatureName::BbLower)?;
    let high_low_pct = column(&frame, FeatureName::HighLowPct)?;
    let price_change = column(&frame, FeatureName::PriceChange)?;
    let volume_change = column(&frame, FeatureName::VolumeChange)?;
    let mut close_lags = Vec::with_capacity(LAGS.len());
    let mut volume_lags = Vec::with_capacity(LAGS.len());
    for (close_name, volume_name) in CLOSE_LAGS.into_iter().zip(VOLUME_LAGS) {
        close_lags.push(column(&frame, close_name)?);
        volume_lags.push(column(&frame, volume_name)?);
    }

    let rows = series
        .bars()
        .iter()
        .enumerate()
        .map(|(i, bar)| IndicatorRow {
            bar: *bar,
            ma_5: ma_5[i],
            ma_10: ma_10[i],
            ma_20: ma_20[i],
            ma_50: ma_50[i],
            rsi: rsi[i],
            bb_middle: bb_middle[i],
            bb_upper: bb_upper[i],
            bb_lower: bb_lower[i],
            high_low_pct: high_low_pct[i],
            price_change: price_change[i],
            volume_change: volume_change[i],
            close_lags: [0, 1, 2, 3].map(|k| close_lags[k][i]),
            volume_lags: [0, 1, 2, 3].map(|k| volume_lags[k][i]),
        })
        .collect();
    Ok(rows)
}

/// Complete feature rows for a series, chronological.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureTable {
    ticker: String,
    rows: Vec<FeatureRow>,
}

impl FeatureTable {
    pub fn ticker(&self) -> &str {
        &self.ticker
    }

    pub fn rows(&self) -> &[FeatureRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Most recent complete row.
    pub fn latest(&self) -> &FeatureRow {
        // never empty: extract_features refuses to build an empty table
        &self.rows[self.rows.len() - 1]
    }
}

/// Builds the feature table, keeping only rows that pass the validity predicate.
///
/// Fails with `InsufficientHistory` when no row survives.
pub fn extract_features(series: &PriceSeries) -> Result<FeatureTable, FeatureError> {
    let indicators = compute_indicators(series)?;
    let rows: Vec<FeatureRow> = indicators
        .iter()
        .filter_map(IndicatorRow::to_feature_row)
        .collect();

    debug!(
        "{}: {} of {} rows have complete features",
        series.ticker(),
        rows.len(),
        indicators.len()
    );

    if rows.is_empty() {
        return Err(FeatureError::InsufficientHistory {
            available: series.len(),
            required: LONGEST_WINDOW,
        });
    }

    info!(
        "Built {} feature rows for {} (latest {})",
        rows.len(),
        series.ticker(),
        rows[rows.len() - 1].date
    );
    Ok(FeatureTable {
        ticker: series.ticker().to_string(),
        rows,
    })
}
