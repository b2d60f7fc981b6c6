//! Domain models for kb-service.

#![allow(clippy::should_implement_trait)]

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use sqlx::types::Json;

// ============================================================================
// Category Models
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: i64,
    pub slug: String,
    pub name: String,
    pub description: Option<String>,
    pub icon: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Desired field values for one category, keyed by `slug`.
///
/// `None` for `description`/`icon` means "leave whatever is stored".
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryInput {
    pub slug: String,
    pub name: String,
    pub description: Option<String>,
    pub icon: Option<String>,
    pub is_active: bool,
}

impl CategoryInput {
    /// True when the stored row already carries every canonical value.
    pub fn is_satisfied_by(&self, row: &Category) -> bool {
        row.slug == self.slug
            && row.name == self.name
            && row.is_active == self.is_active
            && (self.description.is_none() || row.description == self.description)
            && (self.icon.is_none() || row.icon == self.icon)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CategoryFilter {
    pub active_only: bool,
}

// ============================================================================
// Article Models
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Easy => "easy",
            Self::Medium => "medium",
            Self::Hard => "hard",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "easy" => Some(Self::Easy),
            "medium" => Some(Self::Medium),
            "hard" => Some(Self::Hard),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArticleStatus {
    Draft,
    Published,
}

impl ArticleStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Published => "published",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "draft" => Some(Self::Draft),
            "published" => Some(Self::Published),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticleTool {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub purpose: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub affiliate_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticleStep {
    pub instruction: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    pub id: i64,
    pub slug: String,
    pub title: String,
    pub content: String,
    pub category_id: i64,
    pub difficulty: Difficulty,
    pub time_estimate_min: i32,
    #[serde(rename = "toolsJson")]
    pub tools: Vec<ArticleTool>,
    #[serde(rename = "stepsJson")]
    pub steps: Vec<ArticleStep>,
    pub status: ArticleStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Listing projection: everything but the body, tools and steps.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticleSummary {
    pub id: i64,
    pub slug: String,
    pub title: String,
    pub category_id: i64,
    pub difficulty: Difficulty,
    pub time_estimate_min: i32,
    pub status: ArticleStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Desired field values for one article, keyed by `slug`, with the parent
/// category already resolved to its stored id.
#[derive(Debug, Clone, PartialEq)]
pub struct ArticleInput {
    pub slug: String,
    pub title: String,
    pub content: String,
    pub category_id: i64,
    pub difficulty: Difficulty,
    pub time_estimate_min: i32,
    pub tools: Vec<ArticleTool>,
    pub steps: Vec<ArticleStep>,
    pub status: ArticleStatus,
}

impl ArticleInput {
    pub fn is_satisfied_by(&self, row: &Article) -> bool {
        row.slug == self.slug
            && row.title == self.title
            && row.content == self.content
            && row.category_id == self.category_id
            && row.difficulty == self.difficulty
            && row.time_estimate_min == self.time_estimate_min
            && row.tools == self.tools
            && row.steps == self.steps
            && row.status == self.status
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ArticleQuery {
    pub status: Option<ArticleStatus>,
    pub limit: i64,
    pub offset: i64,
}

// ============================================================================
// Row Mapping
// ============================================================================

#[derive(Debug, FromRow)]
pub struct ArticleRow {
    pub id: i64,
    pub slug: String,
    pub title: String,
    pub content: String,
    pub category_id: i64,
    pub difficulty: String,
    pub time_estimate_min: i32,
    pub tools_json: Json<Vec<ArticleTool>>,
    pub steps_json: Json<Vec<ArticleStep>>,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, FromRow)]
pub struct ArticleSummaryRow {
    pub id: i64,
    pub slug: String,
    pub title: String,
    pub category_id: i64,
    pub difficulty: String,
    pub time_estimate_min: i32,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn parse_difficulty(slug: &str, raw: &str) -> Result<Difficulty, String> {
    Difficulty::from_str(raw)
        .ok_or_else(|| format!("article '{}' has unknown difficulty '{}'", slug, raw))
}

fn parse_status(slug: &str, raw: &str) -> Result<ArticleStatus, String> {
    ArticleStatus::from_str(raw)
        .ok_or_else(|| format!("article '{}' has unknown status '{}'", slug, raw))
}

impl TryFrom<ArticleRow> for Article {
    type Error = String;

    fn try_from(row: ArticleRow) -> Result<Self, Self::Error> {
        Ok(Self {
            difficulty: parse_difficulty(&row.slug, &row.difficulty)?,
            status: parse_status(&row.slug, &row.status)?,
            id: row.id,
            slug: row.slug,
            title: row.title,
            content: row.content,
            category_id: row.category_id,
            time_estimate_min: row.time_estimate_min,
            tools: row.tools_json.0,
            steps: row.steps_json.0,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

impl TryFrom<ArticleSummaryRow> for ArticleSummary {
    type Error = String;

    fn try_from(row: ArticleSummaryRow) -> Result<Self, Self::Error> {
        Ok(Self {
            difficulty: parse_difficulty(&row.slug, &row.difficulty)?,
            status: parse_status(&row.slug, &row.status)?,
            id: row.id,
            slug: row.slug,
            title: row.title,
            category_id: row.category_id,
            time_estimate_min: row.time_estimate_min,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stored_category() -> Category {
        Category {
            id: 7,
            slug: "plumbing".into(),
            name: "Plumbing".into(),
            description: Some("Pipes".into()),
            icon: None,
            is_active: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn category_drift_on_is_active() {
        let input = CategoryInput {
            slug: "plumbing".into(),
            name: "Plumbing".into(),
            description: None,
            icon: None,
            is_active: true,
        };
        assert!(!input.is_satisfied_by(&stored_category()));

        let mut row = stored_category();
        row.is_active = true;
        assert!(input.is_satisfied_by(&row));
    }

    #[test]
    fn absent_optional_fields_do_not_count_as_drift() {
        let mut row = stored_category();
        row.is_active = true;
        let input = CategoryInput {
            slug: "plumbing".into(),
            name: "Plumbing".into(),
            description: None,
            icon: None,
            is_active: true,
        };
        assert!(input.is_satisfied_by(&row));

        let with_description = CategoryInput {
            description: Some("Leaks and clogs".into()),
            ..input
        };
        assert!(!with_description.is_satisfied_by(&row));
    }

    #[test]
    fn enum_round_trip_through_text() {
        for d in [Difficulty::Easy, Difficulty::Medium, Difficulty::Hard] {
            assert_eq!(Difficulty::from_str(d.as_str()), Some(d));
        }
        assert_eq!(ArticleStatus::from_str("archived"), None);
    }
}
