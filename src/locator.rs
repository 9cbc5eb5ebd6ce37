//! Selector dialects understood by the page layer.
//!
//! Source files carry free-form selector strings. They are compiled once, at
//! load time, into a [`Locator`] so a malformed selector fails the run before
//! any navigation happens.

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;

use crate::page::PageElement;
use crate::utils::error::{AppError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectorType {
    Css,
    Xpath,
    Text,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Locator {
    Css(String),
    XPath(String),
    /// `tag:contains('needle')`. An empty tag matches any element.
    Text { tag: String, needle: String },
}

fn contains_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r#"^([A-Za-z][\w-]*)?:contains\((?:'([^']*)'|"([^"]*)")\)$"#)
            .expect("static pattern compiles")
    })
}

impl Locator {
    pub fn parse(selector: &str) -> Result<Self> {
        let selector = selector.trim();
        if selector.is_empty() {
            return Err(AppError::InvalidSelector {
                selector: selector.to_string(),
                message: "selector is empty".to_string(),
            });
        }

        if selector.starts_with('/') || selector.starts_with("./") || selector.starts_with('(') {
            return Ok(Locator::XPath(selector.to_string()));
        }

        if let Some(caps) = contains_pattern().captures(selector) {
            let tag = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
            let needle = caps
                .get(2)
                .or_else(|| caps.get(3))
                .map(|m| m.as_str())
                .unwrap_or_default();
            if needle.is_empty() {
                return Err(AppError::InvalidSelector {
                    selector: selector.to_string(),
                    message: ":contains() needs a non-empty text".to_string(),
                });
            }
            return Ok(Locator::Text {
                tag: tag.to_string(),
                needle: needle.to_string(),
            });
        }

        if selector.contains(":contains(") {
            return Err(AppError::InvalidSelector {
                selector: selector.to_string(),
                message: "only `tag:contains('text')` is supported".to_string(),
            });
        }

        Ok(Locator::Css(selector.to_string()))
    }

    pub fn selector_type(&self) -> SelectorType {
        match self {
            Locator::Css(_) => SelectorType::Css,
            Locator::XPath(_) => SelectorType::Xpath,
            Locator::Text { .. } => SelectorType::Text,
        }
    }

    /// XPath equivalent of a text locator, rooted at the document or at a context node.
    pub fn text_xpath(tag: &str, needle: &str, scoped: bool) -> String {
        let tag = if tag.is_empty() { "*" } else { tag };
        let literal = if needle.contains('\'') {
            format!("\"{}\"", needle)
        } else {
            format!("'{}'", needle)
        };
        let prefix = if scoped { ".//" } else { "//" };
        // Outer elements contain their descendants' text; only the innermost match counts.
        format!(
            "{prefix}{tag}[contains(normalize-space(.), {literal})][not(.//{tag}[contains(normalize-space(.), {literal})])]"
        )
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locator::Css(s) | Locator::XPath(s) => f.write_str(s),
            Locator::Text { tag, needle } => write!(f, "{tag}:contains('{needle}')"),
        }
    }
}

/// Reads one article field out of a container element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Field {
    Text(Locator),
    Attribute { locator: Locator, name: String },
}

impl Field {
    /// Never fails: a missing element, a stale handle or an empty value all read as `None`.
    pub fn read<E: PageElement>(&self, container: &E) -> Option<String> {
        let (locator, attribute) = match self {
            Field::Text(locator) => (locator, None),
            Field::Attribute { locator, name } => (locator, Some(name.as_str())),
        };

        let element = match container.find(locator) {
            Ok(element) => element,
            Err(e) => {
                tracing::trace!("field {} not located: {}", locator, e);
                return None;
            }
        };

        let value = match attribute {
            Some(name) => element.attribute(name),
            None => element.text(),
        };

        match value {
            Ok(Some(v)) => {
                let v = v.trim();
                (!v.is_empty()).then(|| v.to_string())
            }
            Ok(None) => None,
            Err(e) => {
                tracing::trace!("field {} unreadable: {}", locator, e);
                None
            }
        }
    }
}
