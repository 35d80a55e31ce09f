//! Environment comparator: probes a local deployment and a staging
//! deployment (HTTP endpoints, relational schema, runtime configuration,
//! rendered UI) and emits a stable, categorized difference report with
//! severity-tagged recommendations and a CI-friendly exit-code contract.

pub mod api;
pub mod config;
pub mod diff;
pub mod endpoint;
pub mod environment;
pub mod error;
pub mod report;
pub mod runner;
pub mod schema;
pub mod ui;

pub use error::CompareError;
