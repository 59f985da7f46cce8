//! Insights sources: the Marketing Graph API client and an in-memory
//! source for demos and tests.

pub mod fixture;
pub mod meta;

pub use fixture::StaticSource;
pub use meta::MetaGraphClient;
