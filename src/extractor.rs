use std::time::Duration;

use tracing::{debug, info};

use crate::consent::ConsentHandler;
use crate::models::{RawArticle, SourceConfig};
use crate::page::Page;
use crate::utils::error::Result;

/// Pulls candidate articles off one source's listing page.
#[derive(Debug, Clone)]
pub struct ArticleExtractor {
    consent: ConsentHandler,
    settle_delay: Duration,
    wait_timeout: Duration,
}

impl ArticleExtractor {
    pub fn new(consent: ConsentHandler, settle_delay: Duration, wait_timeout: Duration) -> Self {
        Self {
            consent,
            settle_delay,
            wait_timeout,
        }
    }

    /// Navigates to the listing and returns every complete article on it.
    ///
    /// Navigation failures and a wait target that never shows up are errors
    /// for this source. A page without containers yields an empty vector.
    pub fn extract<P: Page>(&self, page: &P, source: &SourceConfig) -> Result<Vec<RawArticle>> {
        let selectors = source.selectors()?;

        info!("Scraping {}", source.name);
        page.goto(&source.listing_url)?;
        if !self.settle_delay.is_zero() {
            std::thread::sleep(self.settle_delay);
        }

        let consent = self.consent.dismiss(page);
        debug!(source = %source.name, ?consent, "Consent handling finished");

        page.wait_for(&selectors.wait, self.wait_timeout)?;

        let containers = page.find_all(&selectors.article)?;
        if containers.is_empty() {
            info!("No articles found on {}", source.name);
            return Ok(Vec::new());
        }

        let mut articles = Vec::new();
        let mut skipped = 0usize;
        for container in &containers {
            let article = RawArticle {
                source: source.name.clone(),
                url: selectors.link.read(container).unwrap_or_default(),
                title: selectors.title.read(container).unwrap_or_default(),
                description: selectors.description.read(container).unwrap_or_default(),
            };

            if article.is_complete() {
                articles.push(article);
            } else {
                skipped += 1;
            }
        }

        info!(
            "Found {} articles on {} ({} incomplete elements skipped)",
            articles.len(),
            source.name,
            skipped
        );
        Ok(articles)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::locator::Locator;
    use crate::page::HtmlPage;
    use crate::utils::error::AppError;

    const LISTING_URL: &str = "https://news.example.com/tech";

    const LISTING: &str = r#"
        <html><body>
            <button class="cookie-accept">Accept</button>
            <main class="feed">
                <div class="card">
                    <a class="card__link" href="/2024/ai-in-schools?utm_source=home">
                        <h3 class="card__title">AI tutors arrive in schools</h3>
                    </a>
                    <p class="card__lead">Pilot programme in three regions.</p>
                </div>
                <div class="card">
                    <a class="card__link" href="https://other.example.org/story">
                        <h3 class="card__title">Delivery riders and the algorithm</h3>
                    </a>
                </div>
                <div class="card">
                    <a class="card__link" href="/no-title"></a>
                    <p class="card__lead">Teaser without a headline.</p>
                </div>
                <div class="card">
                    <h3 class="card__title">Headline without a link</h3>
                </div>
            </main>
        </body></html>
    "#;

    fn source(article_selector: &str) -> SourceConfig {
        SourceConfig {
            name: "Example News".to_string(),
            listing_url: LISTING_URL.to_string(),
            base_url: "https://news.example.com".to_string(),
            wait_selector: "main.feed".to_string(),
            article_selector: article_selector.to_string(),
            link_selector: "a.card__link".to_string(),
            title_selector: ".card__title".to_string(),
            description_selector: ".card__lead".to_string(),
            link_attribute: "href".to_string(),
        }
    }

    fn extractor() -> ArticleExtractor {
        ArticleExtractor::new(
            ConsentHandler::new(
                vec![Locator::parse("button:contains('Accept')").unwrap()],
                Duration::from_millis(10),
                Duration::ZERO,
            ),
            Duration::ZERO,
            Duration::from_millis(50),
        )
    }

    #[test]
    fn test_extracts_complete_articles_only() {
        let page = HtmlPage::new().with_document(LISTING_URL, LISTING);
        let articles = extractor().extract(&page, &source("div.card")).unwrap();

        assert_eq!(articles.len(), 2);
        assert_eq!(articles[0].url, "/2024/ai-in-schools?utm_source=home");
        assert_eq!(articles[0].title, "AI tutors arrive in schools");
        assert_eq!(articles[0].description, "Pilot programme in three regions.");
        assert_eq!(articles[1].url, "https://other.example.org/story");
        assert_eq!(articles[1].description, "");
        assert!(articles.iter().all(|a| a.source == "Example News"));
        assert_eq!(page.clicks(), vec!["button:contains('Accept')".to_string()]);
    }

    #[test]
    fn test_no_containers_is_empty_not_error() {
        let page = HtmlPage::new().with_document(LISTING_URL, LISTING);
        let articles = extractor().extract(&page, &source("div.missing")).unwrap();
        assert!(articles.is_empty());
    }

    #[test]
    fn test_missing_wait_target_fails_the_source() {
        let page = HtmlPage::new().with_document(LISTING_URL, "<html><body><p>loading</p></body></html>");
        let err = extractor().extract(&page, &source("div.card")).unwrap_err();
        assert!(matches!(err, AppError::Timeout { timeout_ms: 50, .. }));
    }

    #[test]
    fn test_navigation_failure_fails_the_source() {
        let page = HtmlPage::new();
        let err = extractor().extract(&page, &source("div.card")).unwrap_err();
        assert!(matches!(err, AppError::Browser(_)));
    }

    #[test]
    fn test_extraction_is_repeatable() {
        let page = HtmlPage::new().with_document(LISTING_URL, LISTING);
        let extractor = extractor();
        let first = extractor.extract(&page, &source("div.card")).unwrap();
        let second = extractor.extract(&page, &source("div.card")).unwrap();
        assert_eq!(first, second);
    }
}
