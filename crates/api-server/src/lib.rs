#![warn(clippy::unwrap_used)]

pub mod registry;
pub mod rest;
pub mod server;

pub use registry::{NewReportDefinition, ReportRegistry};
pub use server::ApiServer;
