//! Dataset catalog integration
//!
//! The synchronizer reads from a remote registry through the
//! `DatasetCatalog` trait. OpenML is the only implementation.

pub mod http_client;
pub mod openml;
pub mod traits;

// Re-export commonly used types
pub use http_client::RateLimitedClient;
pub use openml::OpenmlCatalog;
pub use traits::{DatasetCatalog, ProviderError, ProviderResult};
