//! Store abstraction shared by the seeder and the read handlers.
//!
//! Handlers and the seeder only ever see `Arc<dyn Store>`; the concrete
//! adapter is picked from the `DATABASE_URL` scheme at startup.

use crate::config::{DatabaseConfig, StoreBackend, redact_url};
use crate::models::{
    Article, ArticleInput, ArticleQuery, ArticleSummary, Category, CategoryFilter, CategoryInput,
};
use crate::services::postgres::PgStore;
use crate::services::sqlite::SqliteStore;
use async_trait::async_trait;
use service_core::error::AppError;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum StoreError {
    /// The store could not be reached (connect, pool timeout, io).
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("store query failed: {0}")]
    Query(sqlx::Error),

    #[error("stored row could not be decoded: {0}")]
    Corrupt(String),

    #[error("migration failed: {0}")]
    Migration(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed
            | sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::Protocol(_) => StoreError::Unavailable(err.to_string()),
            other => StoreError::Query(other),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for StoreError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        match err {
            sqlx::migrate::MigrateError::Execute(e) => StoreError::from(e),
            other => StoreError::Migration(other.to_string()),
        }
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Unavailable(reason) => AppError::ServiceUnavailable(reason),
            other => AppError::DatabaseError(anyhow::Error::new(other)),
        }
    }
}

#[async_trait]
pub trait Store: Send + Sync {
    fn backend(&self) -> StoreBackend;

    /// Applies the embedded schema migrations for this backend.
    async fn migrate(&self) -> Result<(), StoreError>;

    async fn health_check(&self) -> Result<(), StoreError>;

    async fn count_categories(&self) -> Result<i64, StoreError>;

    async fn find_category_by_slug(&self, slug: &str) -> Result<Option<Category>, StoreError>;

    /// Insert-or-update keyed on `slug`, atomic at the row level.
    ///
    /// A row that already matches is left untouched, `updated_at` included.
    async fn upsert_category(&self, input: &CategoryInput) -> Result<Category, StoreError>;

    /// Insert only. `None` when the slug is already taken.
    async fn create_category(&self, input: &CategoryInput) -> Result<Option<Category>, StoreError>;

    /// Categories sorted by name ascending.
    async fn list_categories(&self, filter: CategoryFilter) -> Result<Vec<Category>, StoreError>;

    /// Most recently created category.
    async fn latest_category(&self) -> Result<Option<Category>, StoreError>;

    async fn find_article_by_slug(&self, slug: &str) -> Result<Option<Article>, StoreError>;

    /// Same contract as [`Store::upsert_category`].
    async fn upsert_article(&self, input: &ArticleInput) -> Result<Article, StoreError>;

    /// One page of summaries, newest first, plus the total matching the filter.
    async fn list_articles(
        &self,
        query: ArticleQuery,
    ) -> Result<(Vec<ArticleSummary>, i64), StoreError>;

    async fn close(&self);
}

/// Builds the adapter for `config.url`. Pools connect lazily, so this
/// succeeds while the database is still down.
pub fn connect_store(config: &DatabaseConfig) -> Result<Arc<dyn Store>, AppError> {
    let backend = config.backend()?;
    info!(
        backend = backend.as_str(),
        url = %redact_url(&config.url),
        max_connections = config.max_connections,
        "Initializing store"
    );

    let store: Arc<dyn Store> = match backend {
        StoreBackend::Postgres => Arc::new(PgStore::connect_lazy(config)?),
        StoreBackend::Sqlite => Arc::new(SqliteStore::connect_lazy(config)?),
    };

    Ok(store)
}
