//! service-core: Shared infrastructure for the FixGeni services.
pub mod config;
pub mod error;
pub mod middleware;
pub mod observability;
pub mod utils;

pub use axum;
pub use tracing;
pub use validator;
