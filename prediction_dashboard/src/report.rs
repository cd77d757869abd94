use chrono::NaiveDate;
use feature_processing::misc::FeatureRow;
use feature_processing::processor::FeatureTable;
use serde::Serialize;

/// Direction of the latest session, from its open to its close.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "class", content = "change", rename_all = "lowercase")]
pub enum Trend {
    Bullish(f64),
    Bearish(f64),
    Neutral,
}

impl Trend {
    pub fn classify(open: f64, close: f64) -> Self {
        let change = close - open;
        if change > 0.0 {
            Trend::Bullish(change)
        } else if change < 0.0 {
            Trend::Bearish(change)
        } else {
            Trend::Neutral
        }
    }

    pub fn css_class(&self) -> &'static str {
        match self {
            Trend::Bullish(_) => "bullish",
            Trend::Bearish(_) => "bearish",
            Trend::Neutral => "neutral",
        }
    }

    pub fn label(&self) -> String {
        match self {
            Trend::Bullish(change) => format!("Bullish (+{change:.2})"),
            Trend::Bearish(change) => format!("Bearish ({change:.2})"),
            Trend::Neutral => "Neutral".to_string(),
        }
    }
}

/// Everything one dashboard render needs.
#[derive(Debug, Clone, Serialize)]
pub struct PredictionReport {
    pub ticker: String,
    pub as_of: NaiveDate,
    pub open: f64,
    pub close: f64,
    pub volume: u64,
    pub trend: Trend,
    pub predicted_price: f64,
    pub features: Vec<FeatureRow>,
}

impl PredictionReport {
    pub fn new(table: &FeatureTable, predicted_price: f64) -> Self {
        let latest = table.latest();
        Self {
            ticker: table.ticker().to_string(),
            as_of: latest.date,
            open: latest.open,
            close: latest.close,
            volume: latest.volume,
            trend: Trend::classify(latest.open, latest.close),
            predicted_price,
            features: table.rows().to_vec(),
        }
    }

    pub fn cards(&self) -> [Card; 3] {
        [
            Card {
                title: "Current Price & Volume",
                class: "highlight",
                lines: vec![
                    self.as_of.format("%Y-%m-%d").to_string(),
                    format_price(self.close),
                    format_volume(self.volume),
                ],
            },
            Card {
                title: "Market Trend",
                class: self.trend.css_class(),
                lines: vec![self.trend.label()],
            },
            Card {
                title: "Predicted Next Day Price",
                class: "prediction",
                lines: vec![format_price(self.predicted_price)],
            },
        ]
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Card {
    pub title: &'static str,
    pub class: &'static str,
    pub lines: Vec<String>,
}

pub fn format_price(value: f64) -> String {
    if value < 0.0 {
        format!("-${:.2}", -value)
    } else {
        format!("${value:.2}")
    }
}

/// `1234567` -> `1,234,567`
pub fn format_volume(volume: u64) -> String {
    let digits = volume.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification_is_three_way() {
        assert_eq!(Trend::classify(10.0, 12.5), Trend::Bullish(2.5));
        assert_eq!(Trend::classify(10.0, 9.25), Trend::Bearish(-0.75));
        assert_eq!(Trend::classify(10.0, 10.0), Trend::Neutral);
    }

    #[test]
    fn tiny_moves_are_not_neutral() {
        assert!(matches!(Trend::classify(1.0, 1.0 + 1e-12), Trend::Bullish(_)));
        assert!(matches!(Trend::classify(1.0, 1.0 - 1e-12), Trend::Bearish(_)));
    }

    #[test]
    fn labels_carry_signed_change() {
        assert_eq!(Trend::Bullish(1.234).label(), "Bullish (+1.23)");
        assert_eq!(Trend::Bearish(-0.5).label(), "Bearish (-0.50)");
        assert_eq!(Trend::Neutral.label(), "Neutral");
        assert_eq!(Trend::Bearish(-0.5).css_class(), "bearish");
    }

    #[test]
    fn trend_serializes_with_class_and_change() {
        let json = serde_json::to_value(Trend::Bullish(1.5)).unwrap();
        assert_eq!(json, serde_json::json!({"class": "bullish", "change": 1.5}));
        let json = serde_json::to_value(Trend::Neutral).unwrap();
        assert_eq!(json, serde_json::json!({"class": "neutral"}));
    }

    #[test]
    fn volume_gets_thousands_separators() {
        assert_eq!(format_volume(0), "0");
        assert_eq!(format_volume(999), "999");
        assert_eq!(format_volume(1_000), "1,000");
        assert_eq!(format_volume(58_414_500), "58,414,500");
    }

    #[test]
    fn prices_have_two_decimals() {
        assert_eq!(format_price(184.257), "$184.26");
        assert_eq!(format_price(3.0), "$3.00");
        assert_eq!(format_price(-1.5), "-$1.50");
    }
}
