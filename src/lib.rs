pub mod aggregator;
pub mod app;
pub mod config;
pub mod domain;
pub mod error;
pub mod gateway;
pub mod ingest;
pub mod media;
pub mod output;
pub mod store;
