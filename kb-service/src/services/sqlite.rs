//! Embedded SQLite adapter.

use crate::config::{DatabaseConfig, StoreBackend};
use crate::models::{
    Article, ArticleInput, ArticleQuery, ArticleRow, ArticleSummary, ArticleSummaryRow, Category,
    CategoryFilter, CategoryInput,
};
use crate::services::metrics::DB_QUERY_DURATION;
use crate::services::store::{Store, StoreError};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use sqlx::types::Json;
use std::path::PathBuf;
use std::str::FromStr;
use tracing::{info, instrument};

#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Opens (creating if needed) the database file named by `config.url`.
    #[instrument(skip(config), fields(backend = "sqlite"))]
    pub fn connect_lazy(config: &DatabaseConfig) -> Result<Self, StoreError> {
        if let Some(parent) = sqlite_file_path(&config.url)
            .as_deref()
            .and_then(|p| p.parent())
            .filter(|p| !p.as_os_str().is_empty())
        {
            std::fs::create_dir_all(parent).map_err(|e| {
                StoreError::Unavailable(format!(
                    "cannot create database directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        let options = SqliteConnectOptions::from_str(&config.url)?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .foreign_keys(true)
            .busy_timeout(config.acquire_timeout);

        let mut pool_options = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.acquire_timeout);

        // An in-memory database lives only as long as one of its connections.
        if config.url.contains(":memory:") {
            pool_options = pool_options
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None);
        }

        Ok(Self {
            pool: pool_options.connect_lazy_with(options),
        })
    }
}

fn sqlite_file_path(url: &str) -> Option<PathBuf> {
    let rest = url
        .strip_prefix("sqlite://")
        .or_else(|| url.strip_prefix("sqlite:"))?;
    let path = rest.split('?').next().unwrap_or(rest);
    if path.is_empty() || path.starts_with(":memory:") || path.starts_with("file:") {
        return None;
    }
    Some(PathBuf::from(path))
}

fn query_timer(operation: &str) -> prometheus::HistogramTimer {
    DB_QUERY_DURATION
        .with_label_values(&["sqlite", operation])
        .start_timer()
}

#[async_trait]
impl Store for SqliteStore {
    fn backend(&self) -> StoreBackend {
        StoreBackend::Sqlite
    }

    #[instrument(skip(self))]
    async fn migrate(&self) -> Result<(), StoreError> {
        info!("Running database migrations");
        sqlx::migrate!("./migrations/sqlite").run(&self.pool).await?;
        info!("Database migrations completed");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn health_check(&self) -> Result<(), StoreError> {
        let timer = query_timer("health_check");
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        timer.observe_duration();
        Ok(())
    }

    // ========================================================================
    // Categories
    // ========================================================================

    #[instrument(skip(self))]
    async fn count_categories(&self) -> Result<i64, StoreError> {
        let timer = query_timer("count_categories");
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM categories")
            .fetch_one(&self.pool)
            .await?;
        timer.observe_duration();
        Ok(count)
    }

    #[instrument(skip(self))]
    async fn find_category_by_slug(&self, slug: &str) -> Result<Option<Category>, StoreError> {
        let timer = query_timer("find_category_by_slug");
        let category = sqlx::query_as::<_, Category>(
            r#"
            SELECT id, slug, name, description, icon, is_active, created_at, updated_at
            FROM categories
            WHERE slug = ?1
            "#,
        )
        .bind(slug)
        .fetch_optional(&self.pool)
        .await?;
        timer.observe_duration();
        Ok(category)
    }

    #[instrument(skip(self, input), fields(slug = %input.slug))]
    async fn upsert_category(&self, input: &CategoryInput) -> Result<Category, StoreError> {
        let timer = query_timer("upsert_category");

        sqlx::query(
            r#"
            INSERT INTO categories (slug, name, description, icon, is_active, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)
            ON CONFLICT (slug) DO UPDATE SET
                name = excluded.name,
                description = COALESCE(excluded.description, categories.description),
                icon = COALESCE(excluded.icon, categories.icon),
                is_active = excluded.is_active,
                updated_at = excluded.updated_at
            WHERE categories.name IS NOT excluded.name
               OR categories.is_active IS NOT excluded.is_active
               OR (excluded.description IS NOT NULL
                   AND categories.description IS NOT excluded.description)
               OR (excluded.icon IS NOT NULL
                   AND categories.icon IS NOT excluded.icon)
            "#,
        )
        .bind(&input.slug)
        .bind(&input.name)
        .bind(&input.description)
        .bind(&input.icon)
        .bind(input.is_active)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        let category = sqlx::query_as::<_, Category>(
            r#"
            SELECT id, slug, name, description, icon, is_active, created_at, updated_at
            FROM categories
            WHERE slug = ?1
            "#,
        )
        .bind(&input.slug)
        .fetch_one(&self.pool)
        .await?;

        timer.observe_duration();
        Ok(category)
    }

    #[instrument(skip(self, input), fields(slug = %input.slug))]
    async fn create_category(&self, input: &CategoryInput) -> Result<Option<Category>, StoreError> {
        let timer = query_timer("create_category");

        let category = sqlx::query_as::<_, Category>(
            r#"
            INSERT INTO categories (slug, name, description, icon, is_active, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)
            ON CONFLICT (slug) DO NOTHING
            RETURNING id, slug, name, description, icon, is_active, created_at, updated_at
            "#,
        )
        .bind(&input.slug)
        .bind(&input.name)
        .bind(&input.description)
        .bind(&input.icon)
        .bind(input.is_active)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await?;

        timer.observe_duration();

        if let Some(ref c) = category {
            info!(category_id = c.id, slug = %c.slug, "Category created");
        }

        Ok(category)
    }

    #[instrument(skip(self))]
    async fn list_categories(&self, filter: CategoryFilter) -> Result<Vec<Category>, StoreError> {
        let timer = query_timer("list_categories");
        let categories = sqlx::query_as::<_, Category>(
            r#"
            SELECT id, slug, name, description, icon, is_active, created_at, updated_at
            FROM categories
            WHERE (?1 = 0 OR is_active = 1)
            ORDER BY name ASC, id ASC
            "#,
        )
        .bind(filter.active_only)
        .fetch_all(&self.pool)
        .await?;
        timer.observe_duration();
        Ok(categories)
    }

    #[instrument(skip(self))]
    async fn latest_category(&self) -> Result<Option<Category>, StoreError> {
        let timer = query_timer("latest_category");
        let category = sqlx::query_as::<_, Category>(
            r#"
            SELECT id, slug, name, description, icon, is_active, created_at, updated_at
            FROM categories
            ORDER BY created_at DESC, id DESC
            LIMIT 1
            "#,
        )
        .fetch_optional(&self.pool)
        .await?;
        timer.observe_duration();
        Ok(category)
    }

    // ========================================================================
    // Articles
    // ========================================================================

    #[instrument(skip(self))]
    async fn find_article_by_slug(&self, slug: &str) -> Result<Option<Article>, StoreError> {
        let timer = query_timer("find_article_by_slug");
        let row = sqlx::query_as::<_, ArticleRow>(
            r#"
            SELECT id, slug, title, content, category_id, difficulty, time_estimate_min,
                   tools_json, steps_json, status, created_at, updated_at
            FROM articles
            WHERE slug = ?1
            "#,
        )
        .bind(slug)
        .fetch_optional(&self.pool)
        .await?;
        timer.observe_duration();

        row.map(Article::try_from)
            .transpose()
            .map_err(StoreError::Corrupt)
    }

    #[instrument(skip(self, input), fields(slug = %input.slug))]
    async fn upsert_article(&self, input: &ArticleInput) -> Result<Article, StoreError> {
        let timer = query_timer("upsert_article");

        sqlx::query(
            r#"
            INSERT INTO articles (
                slug, title, content, category_id, difficulty, time_estimate_min,
                tools_json, steps_json, status, created_at, updated_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?10)
            ON CONFLICT (slug) DO UPDATE SET
                title = excluded.title,
                content = excluded.content,
                category_id = excluded.category_id,
                difficulty = excluded.difficulty,
                time_estimate_min = excluded.time_estimate_min,
                tools_json = excluded.tools_json,
                steps_json = excluded.steps_json,
                status = excluded.status,
                updated_at = excluded.updated_at
            WHERE articles.title IS NOT excluded.title
               OR articles.content IS NOT excluded.content
               OR articles.category_id IS NOT excluded.category_id
               OR articles.difficulty IS NOT excluded.difficulty
               OR articles.time_estimate_min IS NOT excluded.time_estimate_min
               OR articles.tools_json IS NOT excluded.tools_json
               OR articles.steps_json IS NOT excluded.steps_json
               OR articles.status IS NOT excluded.status
            "#,
        )
        .bind(&input.slug)
        .bind(&input.title)
        .bind(&input.content)
        .bind(input.category_id)
        .bind(input.difficulty.as_str())
        .bind(input.time_estimate_min)
        .bind(Json(&input.tools))
        .bind(Json(&input.steps))
        .bind(input.status.as_str())
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        let row = sqlx::query_as::<_, ArticleRow>(
            r#"
            SELECT id, slug, title, content, category_id, difficulty, time_estimate_min,
                   tools_json, steps_json, status, created_at, updated_at
            FROM articles
            WHERE slug = ?1
            "#,
        )
        .bind(&input.slug)
        .fetch_one(&self.pool)
        .await?;

        timer.observe_duration();
        Article::try_from(row).map_err(StoreError::Corrupt)
    }

    #[instrument(skip(self))]
    async fn list_articles(
        &self,
        query: ArticleQuery,
    ) -> Result<(Vec<ArticleSummary>, i64), StoreError> {
        let timer = query_timer("list_articles");
        let status = query.status.map(|s| s.as_str());

        let rows = sqlx::query_as::<_, ArticleSummaryRow>(
            r#"
            SELECT id, slug, title, category_id, difficulty, time_estimate_min, status,
                   created_at, updated_at
            FROM articles
            WHERE (?1 IS NULL OR status = ?1)
            ORDER BY created_at DESC, id DESC
            LIMIT ?2 OFFSET ?3
            "#,
        )
        .bind(status)
        .bind(query.limit)
        .bind(query.offset)
        .fetch_all(&self.pool)
        .await?;

        let total = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM articles WHERE (?1 IS NULL OR status = ?1)",
        )
        .bind(status)
        .fetch_one(&self.pool)
        .await?;

        timer.observe_duration();

        let items = rows
            .into_iter()
            .map(ArticleSummary::try_from)
            .collect::<Result<Vec<_>, _>>()
            .map_err(StoreError::Corrupt)?;

        Ok((items, total))
    }

    async fn close(&self) {
        info!("Closing SQLite pool");
        self.pool.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_path_from_url() {
        assert_eq!(
            sqlite_file_path("sqlite:data/fixgeni.db"),
            Some(PathBuf::from("data/fixgeni.db"))
        );
        assert_eq!(
            sqlite_file_path("sqlite:///var/lib/kb/app.db?mode=rwc"),
            Some(PathBuf::from("/var/lib/kb/app.db"))
        );
        assert_eq!(sqlite_file_path("sqlite::memory:"), None);
        assert_eq!(sqlite_file_path("postgres://localhost/kb"), None);
    }
}
