//! Trailing-window indicator expressions.
//!
//! Every expression yields one value per input row. Nulls mark positions whose
//! window is not yet satisfied.

use polars::prelude::*;
use polars::series::ops::NullBehavior;

/// A window of `size` rows that must be full before it produces a value.
fn full_window(size: usize) -> RollingOptions {
    RollingOptions {
        window_size: Duration::parse(&format!("{size}i")),
        min_periods: size,
        ..Default::default()
    }
}

/// Arithmetic mean over the trailing `window` values.
pub fn rolling_mean(values: Expr, window: usize) -> Expr {
    values.rolling_mean(full_window(window))
}

/// Sample standard deviation (n - 1 denominator) over the trailing `window` values.
pub fn rolling_std(values: Expr, window: usize) -> Expr {
    values.rolling_std(full_window(window))
}

/// Fractional change from the previous value. A zero previous value gives a
/// non-finite result, which the caller must treat as invalid.
pub fn pct_change(values: Expr) -> Expr {
    values.pct_change(lit(1i64))
}

/// Value `offset` rows back.
pub fn lag(values: Expr, offset: usize) -> Expr {
    values.shift(lit(offset as i64))
}

/// RSI from simple rolling means of gains and losses over `period` closes.
///
/// The first close has no predecessor and contributes a zero gain and zero loss.
/// Positions whose average loss is exactly zero are null: the gain/loss ratio is
/// undefined there.
pub fn rsi(closes: Expr, period: usize) -> Expr {
    let delta = closes.diff(1, NullBehavior::Ignore).fill_null(lit(0.0));
    let gain = when(delta.clone().gt(lit(0.0)))
        .then(delta.clone())
        .otherwise(lit(0.0));
    let loss = when(delta.clone().lt(lit(0.0)))
        .then(lit(0.0) - delta)
        .otherwise(lit(0.0));

    let avg_gain = rolling_mean(gain, period);
    let avg_loss = rolling_mean(loss, period);

    when(avg_loss.clone().gt(lit(0.0)))
        .then(lit(100.0) - lit(100.0) / (lit(1.0) + avg_gain / avg_loss))
        .otherwise(lit(NULL))
        .cast(DataType::Float64)
}
