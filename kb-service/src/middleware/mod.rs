pub mod admin;
pub mod metrics;

pub use admin::{ADMIN_SECRET_HEADER, admin_gate_middleware};
pub use metrics::http_metrics_middleware;
