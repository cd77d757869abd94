use chrono::NaiveDate;
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::error::DataIngestionError;

/// One daily OHLCV record.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

impl PriceBar {
    pub fn new(date: NaiveDate, open: f64, high: f64, low: f64, close: f64, volume: u64) -> Self {
        Self {
            date,
            open,
            high,
            low,
            close,
            volume,
        }
    }
}

/// Daily bars for one ticker, strictly increasing by date.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PriceSeries {
    ticker: String,
    bars: Vec<PriceBar>,
}

impl PriceSeries {
    /// Builds a series from bars that must already be ordered and valid.
    pub fn new(ticker: impl Into<String>, bars: Vec<PriceBar>) -> Result<Self, DataIngestionError> {
        if let Some(bad) = bars.iter().find(|bar| !validate_data(bar)) {
            return Err(DataIngestionError::InvalidSeries(format!(
                "invalid bar on {}",
                bad.date
            )));
        }
        if let Some(pair) = bars.windows(2).find(|pair| pair[0].date >= pair[1].date) {
            return Err(DataIngestionError::InvalidSeries(format!(
                "dates not strictly increasing: {} then {}",
                pair[0].date, pair[1].date
            )));
        }
        Ok(Self {
            ticker: ticker.into(),
            bars,
        })
    }

    pub fn empty(ticker: impl Into<String>) -> Self {
        Self {
            ticker: ticker.into(),
            bars: Vec::new(),
        }
    }

    /// Builds a series from raw provider rows: invalid bars are skipped, rows are
    /// sorted by date and a repeated date keeps the row seen last.
    pub fn from_unordered(ticker: impl Into<String>, bars: Vec<PriceBar>) -> Self {
        let mut kept: Vec<PriceBar> = bars.into_iter().filter(validate_data).collect();
        // stable sort keeps provider order among equal dates
        kept.sort_by_key(|bar| bar.date);

        let mut deduped: Vec<PriceBar> = Vec::with_capacity(kept.len());
        for bar in kept {
            match deduped.last_mut() {
                Some(last) if last.date == bar.date => {
                    debug!("Duplicate bar for {}, keeping latest", bar.date);
                    *last = bar;
                }
                _ => deduped.push(bar),
            }
        }

        Self {
            ticker: ticker.into(),
            bars: deduped,
        }
    }

    /// Bars with `start <= date < end`.
    pub fn between(self, start: NaiveDate, end: NaiveDate) -> Self {
        let bars = self
            .bars
            .into_iter()
            .filter(|bar| bar.date >= start && bar.date < end)
            .collect();
        Self {
            ticker: self.ticker,
            bars,
        }
    }

    pub fn ticker(&self) -> &str {
        &self.ticker
    }

    pub fn bars(&self) -> &[PriceBar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn last(&self) -> Option<&PriceBar> {
        self.bars.last()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|bar| bar.close).collect()
    }

    pub fn volumes(&self) -> Vec<f64> {
        self.bars.iter().map(|bar| bar.volume as f64).collect()
    }
}

pub fn validate_data(data: &PriceBar) -> bool {
    let mut is_valid = true;
    for (name, value) in [
        ("Open", data.open),
        ("High", data.high),
        ("Low", data.low),
        ("Close", data.close),
    ] {
        if !value.is_finite() {
            warn!("{} is not a finite number on {}", name, data.date);
            is_valid = false;
        } else if value < 0.0 {
            warn!("{} cannot be negative on {}", name, data.date);
            is_valid = false;
        }
    }

    is_valid
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    fn bar(d: u32, close: f64) -> PriceBar {
        PriceBar::new(day(d), close, close + 1.0, close - 1.0, close, 1_000)
    }

    #[test]
    fn new_rejects_unordered_dates() {
        let err = PriceSeries::new("AAPL", vec![bar(2, 10.0), bar(1, 11.0)]).unwrap_err();
        assert!(matches!(err, DataIngestionError::InvalidSeries(_)));
    }

    #[test]
    fn new_rejects_duplicate_dates() {
        assert!(PriceSeries::new("AAPL", vec![bar(1, 10.0), bar(1, 11.0)]).is_err());
    }

    #[test]
    fn new_rejects_negative_prices() {
        let mut negative = bar(1, 10.0);
        negative.low = -0.5;
        assert!(PriceSeries::new("AAPL", vec![negative]).is_err());
    }

    #[test]
    fn from_unordered_sorts_dedups_and_skips_invalid() {
        let mut broken = bar(4, 10.0);
        broken.close = f64::NAN;
        let series = PriceSeries::from_unordered(
            "MSFT",
            vec![bar(3, 30.0), bar(1, 10.0), bar(3, 31.0), broken, bar(2, 20.0)],
        );

        let dates: Vec<_> = series.bars().iter().map(|b| b.date).collect();
        assert_eq!(dates, vec![day(1), day(2), day(3)]);
        assert_eq!(series.last().unwrap().close, 31.0);
        assert_eq!(series.ticker(), "MSFT");
    }

    #[test]
    fn between_keeps_start_and_drops_end() {
        let series = PriceSeries::new("AAPL", vec![bar(1, 1.0), bar(2, 2.0), bar(3, 3.0)]).unwrap();
        let window = series.between(day(2), day(3));
        assert_eq!(window.len(), 1);
        assert_eq!(window.bars()[0].date, day(2));
    }
}
