use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;
use validator::{Validate, ValidationError};

use crate::locator::{Field, Locator};
use crate::utils::error::{AppError, Result};

/// One configured news site. Field names also accept the keys of the
/// legacy `sources.json` (`url`, `el_to_wait_for`, `el_article`, ...).
#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq)]
pub struct SourceConfig {
    #[validate(length(min = 1, message = "name must not be empty"))]
    pub name: String,

    #[serde(alias = "url")]
    #[validate(url(message = "listing_url must be an absolute URL"))]
    pub listing_url: String,

    #[validate(custom(function = "validate_base_url"))]
    pub base_url: String,

    #[serde(alias = "el_to_wait_for")]
    #[validate(length(min = 1))]
    pub wait_selector: String,

    #[serde(alias = "el_article")]
    #[validate(length(min = 1))]
    pub article_selector: String,

    #[serde(alias = "el_link")]
    #[validate(length(min = 1))]
    pub link_selector: String,

    #[serde(alias = "el_title")]
    #[validate(length(min = 1))]
    pub title_selector: String,

    #[serde(alias = "el_desc")]
    #[validate(length(min = 1))]
    pub description_selector: String,

    #[serde(default = "default_link_attribute")]
    #[validate(length(min = 1))]
    pub link_attribute: String,
}

fn default_link_attribute() -> String {
    "href".to_string()
}

/// Relative links are resolved by plain concatenation, so the base must be a
/// bare http(s) URL for canonical URLs to stay stable.
fn validate_base_url(base_url: &str) -> std::result::Result<(), ValidationError> {
    let parsed = url::Url::parse(base_url).map_err(|_| ValidationError::new("base_url_invalid"))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(ValidationError::new("base_url_scheme"));
    }
    if base_url.contains('?') {
        return Err(ValidationError::new("base_url_query"));
    }
    Ok(())
}

/// Compiled selectors of a source.
#[derive(Debug, Clone)]
pub struct SourceSelectors {
    pub wait: Locator,
    pub article: Locator,
    pub link: Field,
    pub title: Field,
    pub description: Field,
}

impl SourceConfig {
    pub fn selectors(&self) -> Result<SourceSelectors> {
        Ok(SourceSelectors {
            wait: Locator::parse(&self.wait_selector)?,
            article: Locator::parse(&self.article_selector)?,
            link: Field::Attribute {
                locator: Locator::parse(&self.link_selector)?,
                name: self.link_attribute.clone(),
            },
            title: Field::Text(Locator::parse(&self.title_selector)?),
            description: Field::Text(Locator::parse(&self.description_selector)?),
        })
    }
}

#[derive(Debug, Deserialize)]
struct SourcesTable {
    sources: Vec<SourceConfig>,
}

/// Parses a source list. `.toml` files hold a `[[sources]]` table array,
/// anything else is read as a JSON array.
pub fn parse_sources(content: &str, toml_format: bool) -> Result<Vec<SourceConfig>> {
    let sources = if toml_format {
        toml::from_str::<SourcesTable>(content)?.sources
    } else {
        serde_json::from_str::<Vec<SourceConfig>>(content)?
    };

    if sources.is_empty() {
        return Err(AppError::Validation("source list is empty".to_string()));
    }

    let mut names = HashSet::new();
    for (index, source) in sources.iter().enumerate() {
        source.validate().map_err(|e| {
            AppError::Validation(format!("source #{} ({}): {}", index + 1, source.name, e))
        })?;
        source.selectors()?;
        if !names.insert(source.name.as_str()) {
            return Err(AppError::Validation(format!(
                "source #{}: duplicate name {}",
                index + 1,
                source.name
            )));
        }
    }

    Ok(sources)
}

pub fn load_sources(path: &Path) -> Result<Vec<SourceConfig>> {
    let content = std::fs::read_to_string(path)?;
    let toml_format = path.extension().and_then(|e| e.to_str()) == Some("toml");
    let sources = parse_sources(&content, toml_format)?;
    info!("Loaded {} sources from {}", sources.len(), path.display());
    Ok(sources)
}
