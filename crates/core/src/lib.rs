pub mod config;
pub mod error;
pub mod source;
pub mod types;

pub use config::AppConfig;
pub use error::{ReportError, ReportResult};
pub use source::InsightsSource;
