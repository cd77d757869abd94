use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Next-day closing price dashboard.
///
/// Without a subcommand the web dashboard is served on the configured address.
#[derive(Debug, Parser)]
#[command(name = "prediction_dashboard", version, about)]
pub struct Cli {
    /// TOML config file. Defaults to `dashboard.toml` when present.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Serve the dashboard over HTTP.
    Serve(ServeArgs),
    /// Run one fetch, feature and predict cycle and print the cards.
    Predict(PredictArgs),
}

#[derive(Debug, Args)]
pub struct ServeArgs {
    /// Overrides `server.bind_addr`.
    #[arg(long)]
    pub bind: Option<String>,
}

#[derive(Debug, Args)]
pub struct PredictArgs {
    #[arg(long)]
    pub ticker: String,

    /// First trading day, inclusive (YYYY-MM-DD).
    #[arg(long)]
    pub start: Option<NaiveDate>,

    /// Last day, exclusive (YYYY-MM-DD). Defaults to today.
    #[arg(long)]
    pub end: Option<NaiveDate>,

    /// Also write the feature table to this CSV file.
    #[arg(long)]
    pub export: Option<PathBuf>,
}
