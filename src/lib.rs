pub mod config;
pub mod definition;
pub mod error;
pub mod export;
pub mod graph;
pub mod ingest;
pub mod marketplace;
pub mod query;
pub mod upload;
pub mod version;
pub mod walker;
