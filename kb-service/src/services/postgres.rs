//! PostgreSQL adapter.

use crate::config::{DatabaseConfig, StoreBackend};
use crate::models::{
    Article, ArticleInput, ArticleQuery, ArticleRow, ArticleSummary, ArticleSummaryRow, Category,
    CategoryFilter, CategoryInput,
};
use crate::services::metrics::DB_QUERY_DURATION;
use crate::services::store::{Store, StoreError};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::types::Json;
use std::time::Duration;
use tracing::{info, instrument};

/// Database connection pool wrapper.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    #[instrument(skip(config), fields(backend = "postgres"))]
    pub fn connect_lazy(config: &DatabaseConfig) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.acquire_timeout)
            .idle_timeout(Duration::from_secs(600))
            .connect_lazy(&config.url)?;

        Ok(Self { pool })
    }
}

fn query_timer(operation: &str) -> prometheus::HistogramTimer {
    DB_QUERY_DURATION
        .with_label_values(&["postgres", operation])
        .start_timer()
}

#[async_trait]
impl Store for PgStore {
    fn backend(&self) -> StoreBackend {
        StoreBackend::Postgres
    }

    #[instrument(skip(self))]
    async fn migrate(&self) -> Result<(), StoreError> {
        info!("Running database migrations");
        sqlx::migrate!("./migrations/postgres")
            .run(&self.pool)
            .await?;
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
            WHERE slug = $1
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
            VALUES ($1, $2, $3, $4, $5, $6, $6)
            ON CONFLICT (slug) DO UPDATE SET
                name = EXCLUDED.name,
                description = COALESCE(EXCLUDED.description, categories.description),
                icon = COALESCE(EXCLUDED.icon, categories.icon),
                is_active = EXCLUDED.is_active,
                updated_at = EXCLUDED.updated_at
            WHERE categories.name IS DISTINCT FROM EXCLUDED.name
               OR categories.is_active IS DISTINCT FROM EXCLUDED.is_active
               OR (EXCLUDED.description IS NOT NULL
                   AND categories.description IS DISTINCT FROM EXCLUDED.description)
               OR (EXCLUDED.icon IS NOT NULL
                   AND categories.icon IS DISTINCT FROM EXCLUDED.icon)
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
            WHERE slug = $1
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
        let now = Utc::now();

        let category = sqlx::query_as::<_, Category>(
            r#"
            INSERT INTO categories (slug, name, description, icon, is_active, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $6)
            ON CONFLICT (slug) DO NOTHING
            RETURNING id, slug, name, description, icon, is_active, created_at, updated_at
            "#,
        )
        .bind(&input.slug)
        .bind(&input.name)
        .bind(&input.description)
        .bind(&input.icon)
        .bind(input.is_active)
        .bind(now)
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
            WHERE ($1::boolean = FALSE OR is_active = TRUE)
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
            WHERE slug = $1
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
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $10)
            ON CONFLICT (slug) DO UPDATE SET
                title = EXCLUDED.title,
                content = EXCLUDED.content,
                category_id = EXCLUDED.category_id,
                difficulty = EXCLUDED.difficulty,
                time_estimate_min = EXCLUDED.time_estimate_min,
                tools_json = EXCLUDED.tools_json,
                steps_json = EXCLUDED.steps_json,
                status = EXCLUDED.status,
                updated_at = EXCLUDED.updated_at
            WHERE articles.title IS DISTINCT FROM EXCLUDED.title
               OR articles.content IS DISTINCT FROM EXCLUDED.content
               OR articles.category_id IS DISTINCT FROM EXCLUDED.category_id
               OR articles.difficulty IS DISTINCT FROM EXCLUDED.difficulty
               OR articles.time_estimate_min IS DISTINCT FROM EXCLUDED.time_estimate_min
               OR articles.tools_json IS DISTINCT FROM EXCLUDED.tools_json
               OR articles.steps_json IS DISTINCT FROM EXCLUDED.steps_json
               OR articles.status IS DISTINCT FROM EXCLUDED.status
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
            WHERE slug = $1
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
            WHERE ($1::text IS NULL OR status = $1)
            ORDER BY created_at DESC, id DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(status)
        .bind(query.limit)
        .bind(query.offset)
        .fetch_all(&self.pool)
        .await?;

        let total = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM articles WHERE ($1::text IS NULL OR status = $1)",
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
        info!("Closing PostgreSQL pool");
        self.pool.close().await;
    }
}
