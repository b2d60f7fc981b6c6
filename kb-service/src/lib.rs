//! kb-service: FixGeni knowledge-base API.
//!
//! Serves categories and how-to articles and keeps the reference catalog
//! reconciled into the store (on boot, on admin request, or from `kb-seed`).

pub mod catalog;
pub mod config;
pub mod dtos;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;
pub mod startup;

pub use services::metrics::init_metrics;
