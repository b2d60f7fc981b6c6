use crate::models::{Article, ArticleStatus, ArticleSummary, Category, CategoryInput};
use crate::services::seeder::{IntegrityViolation, SeedReport};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

pub const DEFAULT_PAGE_SIZE: i64 = 20;
pub const MAX_PAGE_SIZE: i64 = 50;

// ============================================================================
// Categories
// ============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryListParams {
    pub active_only: Option<String>,
}

impl CategoryListParams {
    pub fn active_only(&self) -> bool {
        matches!(
            self.active_only.as_deref().map(str::trim),
            Some("true") | Some("1") | Some("yes")
        )
    }
}

#[derive(Debug, Serialize)]
pub struct CategoryListResponse {
    pub items: Vec<Category>,
    pub total: usize,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateCategoryRequest {
    #[validate(length(min = 1, max = 120), custom(function = "not_blank"))]
    pub name: String,
    #[validate(length(min = 1, max = 120))]
    pub slug: Option<String>,
    #[validate(length(max = 500))]
    pub description: Option<String>,
    #[validate(length(max = 64))]
    pub icon: Option<String>,
    pub is_active: Option<bool>,
}

impl CreateCategoryRequest {
    /// Resolves the slug (explicit or derived from the name; a blank slug
    /// counts as absent). `None` when nothing slug-worthy remains.
    pub fn into_input(self) -> Option<CategoryInput> {
        let slug = slugify(
            self.slug
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .unwrap_or(&self.name),
        );
        if slug.is_empty() {
            return None;
        }
        Some(CategoryInput {
            slug,
            name: self.name.trim().to_string(),
            description: self.description,
            icon: self.icon,
            is_active: self.is_active.unwrap_or(true),
        })
    }
}

fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("blank"));
    }
    Ok(())
}

/// Lowercase ASCII slug: runs of anything that is not a letter or digit
/// collapse into one `-`, with no leading or trailing dash.
pub fn slugify(raw: &str) -> String {
    let mut slug = String::with_capacity(raw.len());
    let mut pending_dash = false;

    for ch in raw.chars() {
        if ch.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(ch.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }

    slug
}

// ============================================================================
// Articles
// ============================================================================

/// Raw query strings: junk values fall back to defaults instead of a 400.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticleListParams {
    pub page: Option<String>,
    pub page_size: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: i64,
    pub page_size: i64,
}

impl PageRequest {
    pub fn new(page: Option<i64>, page_size: Option<i64>) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            page_size: page_size
                .unwrap_or(DEFAULT_PAGE_SIZE)
                .clamp(1, MAX_PAGE_SIZE),
        }
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.page_size)
    }
}

impl ArticleListParams {
    pub fn page_request(&self) -> PageRequest {
        PageRequest::new(parse_int(&self.page), parse_int(&self.page_size))
    }

    /// `published` unless asked otherwise; `all` lifts the filter.
    pub fn status_filter(&self) -> Result<Option<ArticleStatus>, String> {
        match self.status.as_deref().map(str::trim) {
            None | Some("") => Ok(Some(ArticleStatus::Published)),
            Some("all") => Ok(None),
            Some(raw) => ArticleStatus::from_str(raw)
                .map(Some)
                .ok_or_else(|| format!("unknown status '{}'", raw)),
        }
    }
}

fn parse_int(raw: &Option<String>) -> Option<i64> {
    raw.as_deref().and_then(|s| s.trim().parse().ok())
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticleListResponse {
    pub items: Vec<ArticleSummary>,
    pub page: i64,
    pub page_size: i64,
    pub total: i64,
}

#[derive(Debug, Serialize)]
pub struct ArticleResponse {
    pub article: Article,
}

// ============================================================================
// Seeding
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedStatusResponse {
    pub category_count: i64,
    pub latest: Option<Category>,
}

#[derive(Debug, Serialize)]
pub struct SeedResponse {
    pub ok: bool,
    pub created: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub violations: Vec<IntegrityViolation>,
}

impl From<SeedReport> for SeedResponse {
    fn from(report: SeedReport) -> Self {
        Self {
            ok: true,
            created: report.created(),
            updated: report.updated(),
            unchanged: report.unchanged(),
            violations: report.violations,
        }
    }
}
