//! CLI command implementations.

pub mod features;
pub mod forecast;
pub mod ingest;
pub mod models;
pub mod summary;
