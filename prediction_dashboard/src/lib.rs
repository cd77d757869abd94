pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod model;
pub mod pipeline;
pub mod render;
pub mod report;
pub mod server;
