//! HTML dashboard and Plotly figure JSON.

use chrono::NaiveDate;
use serde_json::{Value, json};
use std::fmt::Write;

use crate::report::{Card, PredictionReport};

pub const PLOTLY_CDN: &str = "https://cdn.plot.ly/plotly-2.35.2.min.js";
pub const IDLE_MESSAGE: &str = "Enter parameters in the sidebar and click 'Fetch & Predict' to begin.";

/// One line color per moving average.
pub const MA_COLORS: [(&str, &str); 4] = [
    ("MA_5", "#FFD700"),
    ("MA_10", "#00FFFF"),
    ("MA_20", "#FF69B4"),
    ("MA_50", "#8A2BE2"),
];
pub const RSI_COLOR: &str = "#FFA500";

/// What the sidebar form shows.
#[derive(Debug, Clone, PartialEq)]
pub struct FormValues {
    pub ticker: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

pub enum PageBody<'a> {
    Idle,
    Error(String),
    Report(&'a PredictionReport),
}

/// Candlesticks plus the four moving averages.
pub fn price_chart(report: &PredictionReport) -> Value {
    let dates: Vec<String> = report.features.iter().map(|r| r.date.to_string()).collect();
    let mut traces = vec![json!({
        "type": "candlestick",
        "name": "Candlesticks",
        "x": dates,
        "open": report.features.iter().map(|r| r.open).collect::<Vec<_>>(),
        "high": report.features.iter().map(|r| r.high).collect::<Vec<_>>(),
        "low": report.features.iter().map(|r| r.low).collect::<Vec<_>>(),
        "close": report.features.iter().map(|r| r.close).collect::<Vec<_>>(),
        "increasing": { "line": { "color": "green" } },
        "decreasing": { "line": { "color": "red" } },
    })];

    let averages: [Vec<f64>; 4] = [
        report.features.iter().map(|r| r.ma_5).collect(),
        report.features.iter().map(|r| r.ma_10).collect(),
        report.features.iter().map(|r| r.ma_20).collect(),
        report.features.iter().map(|r| r.ma_50).collect(),
    ];
    for ((name, color), values) in MA_COLORS.iter().zip(averages) {
        traces.push(json!({
            "type": "scatter",
            "mode": "lines",
            "name": name,
            "x": dates,
            "y": values,
            "line": { "color": color, "width": 2 },
        }));
    }

    json!({
        "data": traces,
        "layout": {
            "title": { "text": format!("{} Price Chart", report.ticker) },
            "xaxis": { "title": { "text": "Date" } },
            "yaxis": { "title": { "text": "Price (USD)" } },
            "plot_bgcolor": "#060505",
            "paper_bgcolor": "#000000",
            "font": { "color": "#fff" },
        },
    })
}

/// RSI line on a fixed 0..100 axis.
pub fn rsi_chart(report: &PredictionReport) -> Value {
    json!({
        "data": [{
            "type": "scatter",
            "mode": "lines",
            "name": "RSI",
            "x": report.features.iter().map(|r| r.date.to_string()).collect::<Vec<_>>(),
            "y": report.features.iter().map(|r| r.rsi).collect::<Vec<_>>(),
            "line": { "color": RSI_COLOR },
        }],
        "layout": {
            "title": { "text": "RSI (Relative Strength Index)" },
            "yaxis": { "range": [0, 100] },
            "height": 250,
            "plot_bgcolor": "#010101",
            "paper_bgcolor": "#000000",
            "font": { "color": "#fff" },
            "margin": { "l": 30, "r": 10, "t": 30, "b": 30 },
        },
    })
}

pub fn render_page(form: &FormValues, body: &PageBody<'_>) -> String {
    let mut html = String::with_capacity(16 * 1024);
    html.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n");
    html.push_str("<title>Stock Prediction Pro</title>\n");
    let _ = writeln!(html, "<script src=\"{PLOTLY_CDN}\"></script>");
    let _ = writeln!(html, "<style>{STYLE}</style>\n</head>\n<body>");
    render_sidebar(&mut html, form);
    html.push_str("<main>\n");

    match body {
        PageBody::Idle => {
            let _ = writeln!(html, "<div class=\"info\">{}</div>", escape_html(IDLE_MESSAGE));
        }
        PageBody::Error(message) => {
            let _ = writeln!(html, "<div class=\"error\">{}</div>", escape_html(message));
        }
        PageBody::Report(report) => render_report(&mut html, report),
    }

    html.push_str("</main>\n</body>\n</html>\n");
    html
}

fn render_sidebar(html: &mut String, form: &FormValues) {
    let _ = write!(
        html,
        r#"<aside class="sidebar">
<h2>Stock Selection</h2>
<form method="get" action="/">
<label for="ticker">Enter Stock Symbol:</label>
<input id="ticker" name="ticker" type="text" value="{ticker}">
<label for="start">Start Date:</label>
<input id="start" name="start" type="date" value="{start}">
<label for="end">End Date:</label>
<input id="end" name="end" type="date" value="{end}">
<button type="submit">Fetch &amp; Predict</button>
</form>
</aside>
"#,
        ticker = escape_html(&form.ticker),
        start = form.start.format("%Y-%m-%d"),
        end = form.end.format("%Y-%m-%d"),
    );
}

fn render_report(html: &mut String, report: &PredictionReport) {
    let _ = writeln!(
        html,
        "<h1>{} Stock Prediction Pro</h1>\n<div class=\"cards\">",
        escape_html(&report.ticker)
    );
    for card in report.cards() {
        render_card(html, &card);
    }
    html.push_str("</div>\n");

    let _ = writeln!(html, "<div id=\"price-chart\"></div>\n<div id=\"rsi-chart\"></div>");
    let _ = writeln!(
        html,
        "<script>\nconst priceFig = {};\nconst rsiFig = {};\n\
         Plotly.newPlot('price-chart', priceFig.data, priceFig.layout, {{responsive: true}});\n\
         Plotly.newPlot('rsi-chart', rsiFig.data, rsiFig.layout, {{responsive: true}});\n</script>",
        script_json(&price_chart(report)),
        script_json(&rsi_chart(report)),
    );
}

fn render_card(html: &mut String, card: &Card) {
    let _ = writeln!(html, "<div class=\"card {}\">", card.class);
    let _ = writeln!(html, "<h2>{}</h2>", escape_html(card.title));
    for line in &card.lines {
        let _ = writeln!(html, "<p><b>{}</b></p>", escape_html(line));
    }
    html.push_str("</div>\n");
}

/// JSON that is safe to inline inside a `<script>` element.
fn script_json(value: &Value) -> String {
    value.to_string().replace("</", "<\\/")
}

pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

const STYLE: &str = r#"
body { background-color: #4a4a4a; color: #fff; font-family: 'Segoe UI', Tahoma, Geneva, Verdana, sans-serif; margin: 0; display: flex; }
h1, h2, h3 { font-weight: 700; }
.sidebar { background: #383838; border-radius: 15px; padding: 10px 15px; margin: 10px; min-width: 220px; }
.sidebar label, .sidebar input, .sidebar button { display: block; width: 100%; margin-bottom: 8px; }
main { flex: 1; padding: 10px 20px; }
.cards { display: grid; grid-template-columns: 3fr 3fr 4fr; gap: 20px; }
.card { border-radius: 15px; padding: 20px; margin-bottom: 20px; box-shadow: 0 8px 24px rgba(0,0,0,0.25); background: linear-gradient(145deg, #3b3b3b, #2f2f2f); transition: transform 0.3s ease; color: white; }
.card:hover { transform: translateY(-6px); }
.card.highlight { background: linear-gradient(135deg, #283e6b, #4361ee); color: white; font-weight: 800; }
.bullish, .bearish, .neutral, .prediction { color: black; font-weight: 800; }
.card.bullish { background: linear-gradient(135deg, #00c853, #a5d6a7); }
.card.bearish { background: linear-gradient(135deg, #d50000, #ef9a9a); }
.card.neutral { background: linear-gradient(135deg, #1e88e5, #90caf9); }
.card.prediction { background: linear-gradient(135deg, #ff6f00, #ffcc80); }
.info { background: #1e3a5f; border-radius: 10px; padding: 15px; }
.error { background: #5f1e1e; border-radius: 10px; padding: 15px; }
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::Trend;
    use feature_processing::misc::FeatureRow;

    fn row(day: u32, close: f64) -> FeatureRow {
        FeatureRow {
            date: NaiveDate::from_ymd_opt(2024, 4, day).unwrap(),
            open: close - 1.0,
            high: close + 1.0,
            low: close - 2.0,
            close,
            volume: 1_234_567,
            ma_5: close - 0.5,
            ma_10: close - 0.6,
            ma_20: close - 0.7,
            ma_50: close - 0.8,
            rsi: 61.5,
            bb_middle: close - 0.7,
            bb_upper: close + 3.0,
            bb_lower: close - 4.0,
            high_low_pct: 1.0,
            price_change: 0.01,
            volume_change: 0.02,
            close_lag_1: close - 1.0,
            volume_lag_1: 1.0,
            close_lag_2: close - 2.0,
            volume_lag_2: 1.0,
            close_lag_3: close - 3.0,
            volume_lag_3: 1.0,
            close_lag_5: close - 5.0,
            volume_lag_5: 1.0,
        }
    }

    fn report() -> PredictionReport {
        PredictionReport {
            ticker: "AAPL".to_string(),
            as_of: NaiveDate::from_ymd_opt(2024, 4, 2).unwrap(),
            open: 99.0,
            close: 100.0,
            volume: 1_234_567,
            trend: Trend::Bullish(1.0),
            predicted_price: 101.456,
            features: vec![row(1, 99.0), row(2, 100.0)],
        }
    }

    fn form() -> FormValues {
        FormValues {
            ticker: "AAPL".to_string(),
            start: NaiveDate::from_ymd_opt(2023, 1, 1).unwrap(),
            end: NaiveDate::from_ymd_opt(2024, 4, 3).unwrap(),
        }
    }

    #[test]
    fn price_chart_has_candles_and_four_averages() {
        let fig = price_chart(&report());
        let data = fig["data"].as_array().unwrap();
        assert_eq!(data.len(), 5);
        assert_eq!(data[0]["type"], "candlestick");
        assert_eq!(data[0]["close"], json!([99.0, 100.0]));
        let names: Vec<_> = data[1..].iter().map(|t| t["name"].as_str().unwrap()).collect();
        assert_eq!(names, ["MA_5", "MA_10", "MA_20", "MA_50"]);
        assert_eq!(data[4]["line"]["color"], "#8A2BE2");
        assert_eq!(fig["layout"]["title"]["text"], "AAPL Price Chart");
    }

    #[test]
    fn rsi_chart_is_pinned_to_0_100() {
        let fig = rsi_chart(&report());
        assert_eq!(fig["layout"]["yaxis"]["range"], json!([0, 100]));
        assert_eq!(fig["data"][0]["y"], json!([61.5, 61.5]));
        assert_eq!(fig["data"][0]["line"]["color"], RSI_COLOR);
    }

    #[test]
    fn report_page_shows_cards_and_charts() {
        let report = report();
        let page = render_page(&form(), &PageBody::Report(&report));
        assert!(page.contains("AAPL Stock Prediction Pro"));
        assert!(page.contains("2024-04-02"));
        assert!(page.contains("$100.00"));
        assert!(page.contains("1,234,567"));
        assert!(page.contains("class=\"card bullish\""));
        assert!(page.contains("Bullish (+1.00)"));
        assert!(page.contains("$101.46"));
        assert!(page.contains("Plotly.newPlot('price-chart'"));
        assert!(page.contains("Plotly.newPlot('rsi-chart'"));
    }

    #[test]
    fn idle_and_error_pages() {
        let idle = render_page(&form(), &PageBody::Idle);
        assert!(idle.contains("Fetch &amp; Predict"));
        assert!(idle.contains("click &#39;Fetch &amp; Predict&#39; to begin"));
        assert!(!idle.contains("Plotly.newPlot"));

        let error = render_page(&form(), &PageBody::Error("bad <input>".to_string()));
        assert!(error.contains("bad &lt;input&gt;"));
    }

    #[test]
    fn form_values_are_escaped() {
        let mut values = form();
        values.ticker = "\"><script>".to_string();
        let page = render_page(&values, &PageBody::Idle);
        assert!(!page.contains("\"><script>"));
        assert!(page.contains("value=\"2023-01-01\""));
    }

    #[test]
    fn inline_json_cannot_close_the_script() {
        assert_eq!(script_json(&json!("</script>")), "\"<\\/script>\"");
    }
}
