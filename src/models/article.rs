use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::normalize::normalize;

/// What the extractor read out of one container element, before normalization.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RawArticle {
    pub source: String,
    pub url: String,
    pub title: String,
    pub description: String,
}

impl RawArticle {
    /// An element is only worth keeping with both a link and a title.
    pub fn is_complete(&self) -> bool {
        !self.url.is_empty() && !self.title.is_empty()
    }
}

/// A raw article whose URL has been canonicalized; the URL is its identity.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CanonicalArticle {
    pub source: String,
    pub url: String,
    pub title: String,
    pub description: String,
}

impl CanonicalArticle {
    pub fn from_raw(raw: RawArticle, base_url: &str) -> Self {
        Self {
            url: normalize(&raw.url, base_url),
            source: raw.source,
            title: raw.title,
            description: raw.description,
        }
    }
}

/// A stored article. `relevance` and `comment` belong to the classification stage.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct ArticleRecord {
    pub id: i64,
    pub source: String,
    pub url: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub scraped_at: DateTime<Utc>,
    pub relevance: Option<i64>,
    pub comment: Option<String>,
}

impl ArticleRecord {
    pub fn is_classified(&self) -> bool {
        self.relevance.is_some()
    }
}
