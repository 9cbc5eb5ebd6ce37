pub mod harvest_tests;
pub mod store_tests;

use std::time::Duration;

use news_harvester::config::DEFAULT_CONSENT_SELECTORS;
use news_harvester::locator::Locator;
use news_harvester::page::HtmlPage;
use news_harvester::{ArticleExtractor, ArticleStore, ConsentHandler, Harvester, SourceConfig};

/// A source whose listing uses `.story` containers inside `#stories`.
pub fn test_source(name: &str, listing_url: &str, base_url: &str) -> SourceConfig {
    SourceConfig {
        name: name.to_string(),
        listing_url: listing_url.to_string(),
        base_url: base_url.to_string(),
        wait_selector: "#stories".to_string(),
        article_selector: ".story".to_string(),
        link_selector: "a".to_string(),
        title_selector: "h2".to_string(),
        description_selector: "p.summary".to_string(),
        link_attribute: "href".to_string(),
    }
}

/// Listing page with one `.story` per `(href, title)` pair.
pub fn listing_html(stories: &[(&str, &str)]) -> String {
    let items: String = stories
        .iter()
        .map(|(href, title)| {
            format!(
                r#"<div class="story"><a href="{href}"><h2>{title}</h2></a><p class="summary">About {title}</p></div>"#
            )
        })
        .collect();
    format!(
        r#"<html><body><div class="cmp"><button>Accept cookies</button></div><div id="stories">{items}</div></body></html>"#
    )
}

pub fn test_extractor() -> ArticleExtractor {
    let consent = ConsentHandler::new(
        DEFAULT_CONSENT_SELECTORS
            .iter()
            .map(|s| Locator::parse(s).unwrap())
            .collect(),
        Duration::from_millis(10),
        Duration::ZERO,
    );
    ArticleExtractor::new(consent, Duration::ZERO, Duration::from_millis(100))
}

pub async fn test_harvester(page: HtmlPage) -> anyhow::Result<Harvester<HtmlPage>> {
    let store = ArticleStore::in_memory().await?;
    Ok(Harvester::new(page, test_extractor(), store, Duration::ZERO))
}
