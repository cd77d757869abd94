pub mod config;
pub mod csv_source;
pub mod error;
pub mod fetcher;
pub mod logger;
pub mod series;

pub use config::{ProviderConfig, ProviderKind};
pub use error::DataIngestionError;
pub use fetcher::{MarketDataSource, PriceRequest, YahooChartSource, build_source};
pub use series::{PriceBar, PriceSeries};
