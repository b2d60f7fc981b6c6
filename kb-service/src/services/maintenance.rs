//! Named, parameterless maintenance operations run in-process.

#![allow(clippy::should_implement_trait)]

use crate::services::seeder::{SeedReport, SeedTrigger, Seeder};
use crate::services::store::Store;
use serde::Serialize;
use service_core::error::AppError;
use std::time::{Duration, Instant};
use tracing::{info, instrument};

/// Upper bound for a whole maintenance operation.
pub const MAINTENANCE_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MaintenanceOp {
    Migrate,
    Seed,
}

impl MaintenanceOp {
    pub const ALL: [MaintenanceOp; 2] = [MaintenanceOp::Migrate, MaintenanceOp::Seed];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Migrate => "migrate",
            Self::Seed => "seed",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "migrate" => Some(Self::Migrate),
            "seed" => Some(Self::Seed),
            _ => None,
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Migrate => "Apply pending schema migrations",
            Self::Seed => "Reconcile the reference catalog into the store",
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MaintenanceReport {
    pub ok: bool,
    pub op: MaintenanceOp,
    pub elapsed_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<SeedReport>,
}

#[instrument(skip(op, store, seeder), fields(op = op.as_str()))]
pub async fn run_op(
    op: MaintenanceOp,
    store: &dyn Store,
    seeder: &Seeder,
) -> Result<MaintenanceReport, AppError> {
    let started = Instant::now();

    let work = async {
        match op {
            MaintenanceOp::Migrate => store.migrate().await.map(|_| None).map_err(AppError::from),
            MaintenanceOp::Seed => seeder
                .run(SeedTrigger::Maintenance)
                .await
                .map(Some)
                .map_err(AppError::from),
        }
    };

    let seed = tokio::time::timeout(MAINTENANCE_TIMEOUT, work)
        .await
        .map_err(|_| {
            AppError::ServiceUnavailable(format!(
                "maintenance op '{}' timed out after {:?}",
                op.as_str(),
                MAINTENANCE_TIMEOUT
            ))
        })??;

    let elapsed_ms = started.elapsed().as_millis() as u64;
    info!(elapsed_ms, "Maintenance op completed");

    Ok(MaintenanceReport {
        ok: true,
        op,
        elapsed_ms,
        seed,
    })
}
