//! Catalog reconciliation.
//!
//! Every entry is an independent upsert keyed on its slug, so a pass can be
//! repeated, interrupted, or raced by another instance without duplicating
//! rows. Categories are always processed before articles. Rows that are not
//! in the catalog are never touched.

use crate::catalog::{ArticleSeed, SeedCatalog};
use crate::models::{ArticleInput, CategoryInput};
use crate::services::metrics;
use crate::services::store::{Store, StoreError};
use serde::Serialize;
use service_core::error::AppError;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, instrument, warn};

#[derive(Debug, Error)]
pub enum SeedError {
    /// The store is unreachable or a call exceeded the per-operation timeout.
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("store error during seeding: {0}")]
    Store(StoreError),
}

impl From<StoreError> for SeedError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Unavailable(reason) => SeedError::StoreUnavailable(reason),
            other => SeedError::Store(other),
        }
    }
}

impl From<SeedError> for AppError {
    fn from(err: SeedError) -> Self {
        match err {
            SeedError::StoreUnavailable(reason) => AppError::ServiceUnavailable(reason),
            SeedError::Store(e) => e.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryOutcome {
    Created,
    Updated,
    Unchanged,
}

impl EntryOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Updated => "updated",
            Self::Unchanged => "unchanged",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Tally {
    pub created: usize,
    pub updated: usize,
    pub unchanged: usize,
}

impl Tally {
    fn record(&mut self, outcome: EntryOutcome) {
        match outcome {
            EntryOutcome::Created => self.created += 1,
            EntryOutcome::Updated => self.updated += 1,
            EntryOutcome::Unchanged => self.unchanged += 1,
        }
    }
}

/// An article whose category is neither in the catalog nor in the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IntegrityViolation {
    pub article_slug: String,
    pub missing_category_slug: String,
    pub message: String,
}

impl IntegrityViolation {
    fn missing_category(seed: &ArticleSeed) -> Self {
        Self {
            article_slug: seed.slug.clone(),
            missing_category_slug: seed.category_slug.clone(),
            message: format!(
                "article '{}' references unknown category '{}'",
                seed.slug, seed.category_slug
            ),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SeedReport {
    pub categories: Tally,
    pub articles: Tally,
    pub violations: Vec<IntegrityViolation>,
}

impl SeedReport {
    pub fn created(&self) -> usize {
        self.categories.created + self.articles.created
    }

    pub fn updated(&self) -> usize {
        self.categories.updated + self.articles.updated
    }

    pub fn unchanged(&self) -> usize {
        self.categories.unchanged + self.articles.unchanged
    }

    /// True when the pass wrote nothing.
    pub fn is_noop(&self) -> bool {
        self.created() == 0 && self.updated() == 0
    }
}

/// Who asked for a pass; only used for logs and metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeedTrigger {
    Boot,
    Admin,
    Maintenance,
    Cli,
}

impl SeedTrigger {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Boot => "boot",
            Self::Admin => "admin",
            Self::Maintenance => "maintenance",
            Self::Cli => "cli",
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SeedPolicy {
    pub skip_when_populated: bool,
    pub force: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SeedOutcome {
    Skipped { category_count: i64 },
    Reconciled(SeedReport),
}

pub struct Seeder {
    store: Arc<dyn Store>,
    catalog: Arc<SeedCatalog>,
    op_timeout: Duration,
}

impl Seeder {
    pub fn new(store: Arc<dyn Store>, catalog: Arc<SeedCatalog>, op_timeout: Duration) -> Self {
        Self {
            store,
            catalog,
            op_timeout,
        }
    }

    /// Full pass plus run metrics.
    pub async fn run(&self, trigger: SeedTrigger) -> Result<SeedReport, SeedError> {
        let result = self.ensure_seeded().await;
        let outcome = match &result {
            Ok(report) if report.violations.is_empty() => "ok",
            Ok(_) => "partial",
            Err(SeedError::StoreUnavailable(_)) => "unavailable",
            Err(SeedError::Store(_)) => "error",
        };
        metrics::record_seed_run(trigger.as_str(), outcome);
        result
    }

    /// Boot entry point. The populated-store shortcut only applies when
    /// enabled and not forced; otherwise this is a full pass.
    #[instrument(skip(self))]
    pub async fn seed_if_needed(&self, policy: SeedPolicy) -> Result<SeedOutcome, SeedError> {
        if policy.skip_when_populated && !policy.force {
            let category_count = self
                .bounded("count_categories", self.store.count_categories())
                .await?;
            if category_count > 0 {
                info!(category_count, "Store already populated, skipping seed");
                metrics::record_seed_run(SeedTrigger::Boot.as_str(), "skipped");
                return Ok(SeedOutcome::Skipped { category_count });
            }
        }

        self.run(SeedTrigger::Boot)
            .await
            .map(SeedOutcome::Reconciled)
    }

    /// Brings every catalog entry to its canonical values.
    ///
    /// Aborts on the first store failure; a missing parent category only
    /// skips that article and is reported in [`SeedReport::violations`].
    #[instrument(
        skip(self),
        fields(
            categories = self.catalog.categories.len(),
            articles = self.catalog.articles.len()
        )
    )]
    pub async fn ensure_seeded(&self) -> Result<SeedReport, SeedError> {
        let mut report = SeedReport::default();

        for seed in &self.catalog.categories {
            let outcome = self.reconcile_category(&seed.to_input()).await?;
            metrics::record_seed_entry("category", outcome.as_str());
            report.categories.record(outcome);
        }

        for seed in &self.catalog.articles {
            let parent = self
                .bounded(
                    "find_category_by_slug",
                    self.store.find_category_by_slug(&seed.category_slug),
                )
                .await?;

            let Some(parent) = parent else {
                let violation = IntegrityViolation::missing_category(seed);
                warn!(
                    article = %violation.article_slug,
                    category = %violation.missing_category_slug,
                    "Skipping article with unknown category"
                );
                metrics::record_seed_entry("article", "skipped");
                report.violations.push(violation);
                continue;
            };

            let input = ArticleInput {
                slug: seed.slug.clone(),
                title: seed.title.clone(),
                content: seed.content.clone(),
                category_id: parent.id,
                difficulty: seed.difficulty,
                time_estimate_min: seed.time_estimate_min,
                tools: seed.tools.clone(),
                steps: seed.steps.clone(),
                status: seed.status,
            };
            let outcome = self.reconcile_article(&input).await?;
            metrics::record_seed_entry("article", outcome.as_str());
            report.articles.record(outcome);
        }

        info!(
            created = report.created(),
            updated = report.updated(),
            unchanged = report.unchanged(),
            violations = report.violations.len(),
            "Catalog reconciled"
        );

        Ok(report)
    }

    async fn reconcile_category(&self, input: &CategoryInput) -> Result<EntryOutcome, SeedError> {
        let existing = self
            .bounded(
                "find_category_by_slug",
                self.store.find_category_by_slug(&input.slug),
            )
            .await?;

        if let Some(row) = &existing {
            if input.is_satisfied_by(row) {
                return Ok(EntryOutcome::Unchanged);
            }
        }

        let row = self
            .bounded("upsert_category", self.store.upsert_category(input))
            .await?;
        let outcome = if existing.is_some() {
            EntryOutcome::Updated
        } else {
            EntryOutcome::Created
        };

        info!(
            category_id = row.id,
            slug = %row.slug,
            outcome = outcome.as_str(),
            "Category reconciled"
        );
        Ok(outcome)
    }

    async fn reconcile_article(&self, input: &ArticleInput) -> Result<EntryOutcome, SeedError> {
        let existing = self
            .bounded(
                "find_article_by_slug",
                self.store.find_article_by_slug(&input.slug),
            )
            .await?;

        if let Some(row) = &existing {
            if input.is_satisfied_by(row) {
                return Ok(EntryOutcome::Unchanged);
            }
        }

        let row = self
            .bounded("upsert_article", self.store.upsert_article(input))
            .await?;
        let outcome = if existing.is_some() {
            EntryOutcome::Updated
        } else {
            EntryOutcome::Created
        };

        info!(
            article_id = row.id,
            slug = %row.slug,
            category_id = row.category_id,
            outcome = outcome.as_str(),
            "Article reconciled"
        );
        Ok(outcome)
    }

    async fn bounded<T, F>(&self, operation: &'static str, fut: F) -> Result<T, SeedError>
    where
        F: Future<Output = Result<T, StoreError>>,
    {
        match tokio::time::timeout(self.op_timeout, fut).await {
            Ok(result) => result.map_err(SeedError::from),
            Err(_) => {
                warn!(operation, timeout = ?self.op_timeout, "Store call timed out");
                Err(SeedError::StoreUnavailable(format!(
                    "{} timed out after {:?}",
                    operation, self.op_timeout
                )))
            }
        }
    }
}
