use std::cell::RefCell;
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use scraper::{ElementRef, Html, Selector};
use tracing::debug;

use crate::locator::Locator;
use crate::page::{Page, PageElement};
use crate::utils::error::{AppError, Result};

fn compile(selector: &str) -> Result<Selector> {
    Selector::parse(selector).map_err(|e| AppError::InvalidSelector {
        selector: selector.to_string(),
        message: format!("{:?}", e),
    })
}

fn collect_text(element: &ElementRef<'_>) -> String {
    element
        .text()
        .flat_map(|t| t.split_whitespace())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Matches for `locator` in document order, below `scope` or across the whole document.
fn select<'a>(document: &'a Html, scope: Option<&ElementRef<'a>>, locator: &Locator) -> Result<Vec<ElementRef<'a>>> {
    let (css, needle) = match locator {
        Locator::Css(selector) => (selector.as_str(), None),
        Locator::Text { tag, needle } => (if tag.is_empty() { "*" } else { tag.as_str() }, Some(needle.as_str())),
        Locator::XPath(xpath) => {
            return Err(AppError::InvalidSelector {
                selector: xpath.clone(),
                message: "XPath requires a browser session".to_string(),
            });
        }
    };
    let selector = compile(css)?;
    let matches: Vec<ElementRef<'a>> = match scope {
        Some(element) => element.select(&selector).collect(),
        None => document.select(&selector).collect(),
    };
    let Some(needle) = needle else {
        return Ok(matches);
    };
    let hits: Vec<ElementRef<'a>> = matches
        .into_iter()
        .filter(|el| collect_text(el).contains(needle))
        .collect();
    // Ancestors contain their descendants' text; keep only the innermost hits.
    Ok(hits
        .iter()
        .filter(|el| {
            !hits
                .iter()
                .any(|other| other.id() != el.id() && other.ancestors().any(|a| a.id() == el.id()))
        })
        .copied()
        .collect())
}

/// Static HTML snapshots keyed by URL. Nothing renders, so waits either
/// succeed immediately or time out immediately.
pub struct HtmlPage {
    documents: HashMap<String, Html>,
    current: RefCell<Option<String>>,
    clicks: RefCell<Vec<String>>,
    clicked_tags: RefCell<Vec<String>>,
}

impl HtmlPage {
    pub fn new() -> Self {
        Self {
            documents: HashMap::new(),
            current: RefCell::new(None),
            clicks: RefCell::new(Vec::new()),
            clicked_tags: RefCell::new(Vec::new()),
        }
    }

    pub fn with_document(mut self, url: impl Into<String>, html: &str) -> Self {
        self.documents.insert(url.into(), Html::parse_document(html));
        self
    }

    /// Loads every `*.html` file in `dir`; each file is served for the listing
    /// URL named in `urls` by its file stem.
    pub fn from_dir(dir: &Path, urls: &HashMap<String, String>) -> Result<Self> {
        let mut page = Self::new();
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("html") {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            match urls.get(stem) {
                Some(url) => {
                    let html = std::fs::read_to_string(&path)?;
                    page = page.with_document(url.clone(), &html);
                }
                None => debug!("Snapshot {} matches no source", path.display()),
            }
        }
        Ok(page)
    }

    /// Locators clicked so far, in order.
    pub fn clicks(&self) -> Vec<String> {
        self.clicks.borrow().clone()
    }

    /// Tag names of the elements those clicks landed on.
    pub fn clicked_tags(&self) -> Vec<String> {
        self.clicked_tags.borrow().clone()
    }

    fn document(&self) -> Result<&Html> {
        let current = self.current.borrow();
        let url = current
            .as_deref()
            .ok_or_else(|| AppError::Browser("No page loaded".to_string()))?;
        self.documents
            .get(url)
            .ok_or_else(|| AppError::Browser(format!("No snapshot for {}", url)))
    }
}

impl Default for HtmlPage {
    fn default() -> Self {
        Self::new()
    }
}

impl Page for HtmlPage {
    type Element<'a> = HtmlElement<'a>;

    fn goto(&self, url: &str) -> Result<()> {
        if !self.documents.contains_key(url) {
            return Err(AppError::Browser(format!("Navigation failed: no snapshot for {}", url)));
        }
        *self.current.borrow_mut() = Some(url.to_string());
        Ok(())
    }

    fn is_visible(&self, locator: &Locator, _timeout: Duration) -> Result<bool> {
        Ok(!select(self.document()?, None, locator)?.is_empty())
    }

    fn click(&self, locator: &Locator) -> Result<()> {
        let target = select(self.document()?, None, locator)?
            .into_iter()
            .next()
            .ok_or_else(|| AppError::ElementNotFound {
                selector: locator.to_string(),
            })?;
        self.clicks.borrow_mut().push(locator.to_string());
        self.clicked_tags
            .borrow_mut()
            .push(target.value().name().to_string());
        Ok(())
    }

    fn wait_for(&self, locator: &Locator, timeout: Duration) -> Result<()> {
        if select(self.document()?, None, locator)?.is_empty() {
            return Err(AppError::Timeout {
                selector: locator.to_string(),
                timeout_ms: timeout.as_millis() as u64,
            });
        }
        Ok(())
    }

    fn find_all(&self, locator: &Locator) -> Result<Vec<HtmlElement<'_>>> {
        let document = self.document()?;
        Ok(select(document, None, locator)?
            .into_iter()
            .map(|element| HtmlElement { document, element })
            .collect())
    }
}

#[derive(Debug)]
pub struct HtmlElement<'a> {
    document: &'a Html,
    element: ElementRef<'a>,
}

impl<'a> PageElement for HtmlElement<'a> {
    type Child<'s>
        = HtmlElement<'s>
    where
        Self: 's;

    fn find<'s>(&'s self, locator: &Locator) -> Result<HtmlElement<'s>> {
        select(self.document, Some(&self.element), locator)?
            .into_iter()
            .next()
            .map(|element| HtmlElement {
                document: self.document,
                element,
            })
            .ok_or_else(|| AppError::ElementNotFound {
                selector: locator.to_string(),
            })
    }

    fn attribute(&self, name: &str) -> Result<Option<String>> {
        Ok(self.element.value().attr(name).map(str::to_string))
    }

    fn text(&self) -> Result<Option<String>> {
        Ok(Some(collect_text(&self.element)))
    }
}
