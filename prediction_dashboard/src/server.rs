use anyhow::Result;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Json, Response};
use axum::{
    Router,
    extract::{Query, State},
    routing::get,
};
use chrono::{Local, NaiveDate};
use data_ingestion::fetcher::PriceRequest;
use log::{error, info};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

use crate::config::DefaultsConfig;
use crate::error::PipelineError;
use crate::pipeline::Pipeline;
use crate::render::{FormValues, PageBody, render_page};

/// Read-only handles shared by all requests.
#[derive(Clone)]
pub struct AppState {
    pipeline: Arc<Pipeline>,
    defaults: DefaultsConfig,
}

impl AppState {
    pub fn new(pipeline: Arc<Pipeline>, defaults: DefaultsConfig) -> Self {
        Self { pipeline, defaults }
    }
}

/// Raw form fields; all optional so an empty query renders the idle page.
#[derive(Debug, Default, Deserialize)]
pub struct PredictQuery {
    pub ticker: Option<String>,
    pub start: Option<String>,
    pub end: Option<String>,
}

impl PredictQuery {
    /// Form values to echo back, falling back to the configured defaults.
    fn form_values(&self, defaults: &DefaultsConfig, today: NaiveDate) -> FormValues {
        FormValues {
            ticker: self
                .ticker
                .as_deref()
                .map(|t| t.trim().to_uppercase())
                .unwrap_or_else(|| defaults.ticker.clone()),
            start: parse_date(self.start.as_deref()).unwrap_or(defaults.start_date),
            end: parse_date(self.end.as_deref()).unwrap_or(today),
        }
    }

    /// `None` when the form has not been submitted.
    pub fn to_request(
        &self,
        defaults: &DefaultsConfig,
        today: NaiveDate,
    ) -> Result<Option<PriceRequest>, PipelineError> {
        let Some(ticker) = self.ticker.as_deref() else {
            return Ok(None);
        };
        let start = date_field("start", self.start.as_deref())?.unwrap_or(defaults.start_date);
        let end = date_field("end", self.end.as_deref())?.unwrap_or(today);
        PriceRequest::new(ticker, start, end)
            .map(Some)
            .map_err(|err| PipelineError::InvalidInput(err.to_string()))
    }
}

fn parse_date(raw: Option<&str>) -> Option<NaiveDate> {
    raw.and_then(|s| NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok())
}

fn date_field(name: &str, raw: Option<&str>) -> Result<Option<NaiveDate>, PipelineError> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => NaiveDate::parse_from_str(value, "%Y-%m-%d")
            .map(Some)
            .map_err(|_| PipelineError::InvalidInput(format!("{name} date {value:?} is not YYYY-MM-DD"))),
    }
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// GET / renders the form, and the dashboard once a ticker is submitted.
async fn dashboard(State(state): State<AppState>, Query(query): Query<PredictQuery>) -> Html<String> {
    let today = today();
    let form = query.form_values(&state.defaults, today);

    let outcome = match query.to_request(&state.defaults, today) {
        Ok(None) => return Html(render_page(&form, &PageBody::Idle)),
        Ok(Some(request)) => state.pipeline.run(&request).await,
        Err(err) => Err(err),
    };

    match outcome {
        Ok(report) => Html(render_page(&form, &PageBody::Report(&report))),
        Err(err) => {
            log_failure(&err);
            Html(render_page(&form, &PageBody::Error(err.user_message())))
        }
    }
}

/// GET /api/predict returns the report as JSON.
async fn api_predict(State(state): State<AppState>, Query(query): Query<PredictQuery>) -> Response {
    let request = match query.to_request(&state.defaults, today()) {
        Ok(Some(request)) => request,
        Ok(None) => {
            return error_response(&PipelineError::InvalidInput(
                "ticker is required".to_string(),
            ));
        }
        Err(err) => return error_response(&err),
    };

    match state.pipeline.run(&request).await {
        Ok(report) => Json(report).into_response(),
        Err(err) => {
            log_failure(&err);
            error_response(&err)
        }
    }
}

async fn health() -> &'static str {
    "ok"
}

fn error_response(err: &PipelineError) -> Response {
    let status = match err {
        PipelineError::NoData { .. } => StatusCode::NOT_FOUND,
        PipelineError::InsufficientHistory { .. } | PipelineError::InvalidInput(_) => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(json!({ "error": err.user_message() }))).into_response()
}

fn log_failure(err: &PipelineError) {
    match err {
        PipelineError::Features(_) | PipelineError::Model(_) => {
            error!("Invocation aborted: {}", err)
        }
        _ => info!("Invocation stopped: {}", err),
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(dashboard))
        .route("/api/predict", get(api_predict))
        .route("/health", get(health))
        .with_state(state)
}

pub struct Server {
    state: AppState,
    bind_addr: String,
}

impl Server {
    pub fn init(state: AppState, bind_addr: impl Into<String>) -> Self {
        Self {
            state,
            bind_addr: bind_addr.into(),
        }
    }

    pub async fn run(self) -> Result<()> {
        let app = router(self.state);
        let listener = tokio::net::TcpListener::bind(&self.bind_addr).await?;
        info!("Dashboard running on http://{}", listener.local_addr()?);
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;
        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to install CTRL+C handler: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Received shutdown signal, stopping dashboard");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn defaults() -> DefaultsConfig {
        DefaultsConfig::default()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn empty_query_is_not_a_request() {
        let query = PredictQuery::default();
        assert!(query.to_request(&defaults(), date(2024, 1, 1)).unwrap().is_none());
    }

    #[test]
    fn missing_dates_use_defaults() {
        let query = PredictQuery {
            ticker: Some("msft".to_string()),
            start: None,
            end: Some(String::new()),
        };
        let request = query
            .to_request(&defaults(), date(2024, 6, 30))
            .unwrap()
            .unwrap();
        assert_eq!(request.ticker, "MSFT");
        assert_eq!(request.start, date(2023, 1, 1));
        assert_eq!(request.end, date(2024, 6, 30));
    }

    #[test]
    fn bad_dates_are_invalid_input() {
        let query = PredictQuery {
            ticker: Some("AAPL".to_string()),
            start: Some("01/02/2023".to_string()),
            end: None,
        };
        assert!(matches!(
            query.to_request(&defaults(), date(2024, 1, 1)),
            Err(PipelineError::InvalidInput(_))
        ));
    }

    #[test]
    fn reversed_range_is_invalid_input() {
        let query = PredictQuery {
            ticker: Some("AAPL".to_string()),
            start: Some("2024-05-01".to_string()),
            end: Some("2024-04-01".to_string()),
        };
        assert!(matches!(
            query.to_request(&defaults(), date(2024, 6, 1)),
            Err(PipelineError::InvalidInput(_))
        ));
    }

    #[test]
    fn form_echoes_normalised_ticker() {
        let query = PredictQuery {
            ticker: Some(" tsla ".to_string()),
            start: Some("garbage".to_string()),
            end: None,
        };
        let form = query.form_values(&defaults(), date(2024, 2, 2));
        assert_eq!(form.ticker, "TSLA");
        assert_eq!(form.start, date(2023, 1, 1));
        assert_eq!(form.end, date(2024, 2, 2));
    }
}
