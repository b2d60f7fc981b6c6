//! Reference data the seeder drives the store towards.
//!
//! The catalog is plain data: a JSON document compiled into the binary, or a
//! file named by configuration. Declaration order is processing order.

use crate::models::{ArticleStatus, ArticleStep, ArticleTool, CategoryInput, Difficulty};
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;
use thiserror::Error;

const DEFAULT_CATALOG: &str = include_str!("../catalog/default.json");

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read catalog file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("catalog is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("duplicate {entity} slug '{slug}' in catalog")]
    DuplicateSlug { entity: &'static str, slug: String },

    #[error("invalid catalog entry '{slug}': {reason}")]
    InvalidEntry { slug: String, reason: String },
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategorySeed {
    pub slug: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

impl CategorySeed {
    pub fn new(slug: &str, name: &str) -> Self {
        Self {
            slug: slug.to_string(),
            name: name.to_string(),
            description: None,
            icon: None,
            is_active: true,
        }
    }

    pub fn to_input(&self) -> CategoryInput {
        CategoryInput {
            slug: self.slug.clone(),
            name: self.name.clone(),
            description: self.description.clone(),
            icon: self.icon.clone(),
            is_active: self.is_active,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticleSeed {
    pub slug: String,
    pub title: String,
    pub content: String,
    pub category_slug: String,
    pub difficulty: Difficulty,
    pub time_estimate_min: i32,
    #[serde(default)]
    pub tools: Vec<ArticleTool>,
    #[serde(default)]
    pub steps: Vec<ArticleStep>,
    #[serde(default = "default_status")]
    pub status: ArticleStatus,
}

fn default_status() -> ArticleStatus {
    ArticleStatus::Draft
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SeedCatalog {
    #[serde(default)]
    pub categories: Vec<CategorySeed>,
    #[serde(default)]
    pub articles: Vec<ArticleSeed>,
}

impl SeedCatalog {
    /// The catalog shipped with the service.
    pub fn builtin() -> Result<Self, CatalogError> {
        Self::from_json(DEFAULT_CATALOG)
    }

    /// Loads `path` when given, the built-in catalog otherwise.
    pub fn load(path: Option<&Path>) -> Result<Self, CatalogError> {
        match path {
            Some(path) => {
                let raw = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
                    path: path.display().to_string(),
                    source,
                })?;
                Self::from_json(&raw)
            }
            None => Self::builtin(),
        }
    }

    pub fn from_json(raw: &str) -> Result<Self, CatalogError> {
        let catalog: SeedCatalog = serde_json::from_str(raw)?;
        catalog.validate()?;
        Ok(catalog)
    }

    pub fn validate(&self) -> Result<(), CatalogError> {
        let mut seen = HashSet::new();
        for c in &self.categories {
            check_text(&c.slug, "slug", &c.slug)?;
            check_text(&c.slug, "name", &c.name)?;
            if !seen.insert(c.slug.as_str()) {
                return Err(CatalogError::DuplicateSlug {
                    entity: "category",
                    slug: c.slug.clone(),
                });
            }
        }

        let mut seen = HashSet::new();
        for a in &self.articles {
            check_text(&a.slug, "slug", &a.slug)?;
            check_text(&a.slug, "title", &a.title)?;
            check_text(&a.slug, "categorySlug", &a.category_slug)?;
            if a.time_estimate_min <= 0 {
                return Err(CatalogError::InvalidEntry {
                    slug: a.slug.clone(),
                    reason: format!("timeEstimateMin must be positive, got {}", a.time_estimate_min),
                });
            }
            if !seen.insert(a.slug.as_str()) {
                return Err(CatalogError::DuplicateSlug {
                    entity: "article",
                    slug: a.slug.clone(),
                });
            }
        }

        Ok(())
    }
}

fn check_text(slug: &str, field: &str, value: &str) -> Result<(), CatalogError> {
    if value.trim().is_empty() {
        return Err(CatalogError::InvalidEntry {
            slug: slug.to_string(),
            reason: format!("{} must not be empty", field),
        });
    }
    Ok(())
}
