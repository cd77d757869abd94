use anyhow::{Context, Result};
use chrono::Local;
use clap::Parser;
use data_ingestion::fetcher::{PriceRequest, build_source};
use data_ingestion::logger::init_logger;
use feature_processing::export::export_to_path;
use log::info;
use std::sync::Arc;

use prediction_dashboard::cli::{Cli, Command, PredictArgs};
use prediction_dashboard::config::AppConfig;
use prediction_dashboard::engine::InferenceEngine;
use prediction_dashboard::error::PipelineError;
use prediction_dashboard::pipeline::Pipeline;
use prediction_dashboard::server::{AppState, Server};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_logger();

    let cli = Cli::parse();
    let config = AppConfig::load(cli.config.as_deref()).context("loading configuration")?;

    let engine = InferenceEngine::load(&config.model).with_context(|| {
        format!(
            "loading model {} with schema {}",
            config.model.artifact_path.display(),
            config.model.features_path.display()
        )
    })?;
    info!("Model ready: {}", engine.describe());

    let source = build_source(&config.provider)?;
    let pipeline = Arc::new(Pipeline::new(source, Arc::new(engine)));

    match cli.command {
        Some(Command::Predict(args)) => predict_once(&pipeline, &config, args).await,
        Some(Command::Serve(args)) => {
            let bind = args.bind.unwrap_or(config.server.bind_addr.clone());
            serve(pipeline, &config, bind).await
        }
        None => serve(pipeline, &config, config.server.bind_addr.clone()).await,
    }
}

async fn serve(pipeline: Arc<Pipeline>, config: &AppConfig, bind: String) -> Result<()> {
    let state = AppState::new(pipeline, config.defaults.clone());
    Server::init(state, bind).run().await?;
    info!("Dashboard has been shut down gracefully");
    Ok(())
}

async fn predict_once(pipeline: &Pipeline, config: &AppConfig, args: PredictArgs) -> Result<()> {
    let start = args.start.unwrap_or(config.defaults.start_date);
    let end = args.end.unwrap_or_else(|| Local::now().date_naive());
    let request = PriceRequest::new(&args.ticker, start, end)?;

    let report = match pipeline.run(&request).await {
        Ok(report) => report,
        Err(err @ (PipelineError::NoData { .. } | PipelineError::InsufficientHistory { .. })) => {
            println!("{}", err.user_message());
            return Ok(());
        }
        Err(err) => return Err(err.into()),
    };

    for card in report.cards() {
        println!("{}", card.title);
        for line in &card.lines {
            println!("  {line}");
        }
    }

    if let Some(path) = args.export {
        export_to_path(&report.features, &path)
            .with_context(|| format!("exporting features to {}", path.display()))?;
    }
    Ok(())
}
