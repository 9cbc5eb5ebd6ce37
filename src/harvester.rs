use std::fmt;
use std::time::{Duration, Instant};

use metrics::counter;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::extractor::ArticleExtractor;
use crate::models::{CanonicalArticle, SourceConfig};
use crate::normalize::dedupe;
use crate::page::Page;
use crate::store::ArticleStore;
use crate::utils::error::Result;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum SourceStatus {
    Completed,
    Failed { reason: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceReport {
    pub source: String,
    pub extracted: usize,
    pub inserted: usize,
    pub duplicates: usize,
    pub status: SourceStatus,
    pub elapsed_ms: u64,
}

impl SourceReport {
    pub fn is_failed(&self) -> bool {
        matches!(self.status, SourceStatus::Failed { .. })
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunReport {
    pub sources: Vec<SourceReport>,
}

impl RunReport {
    pub fn extracted(&self) -> usize {
        self.sources.iter().map(|s| s.extracted).sum()
    }

    pub fn inserted(&self) -> usize {
        self.sources.iter().map(|s| s.inserted).sum()
    }

    pub fn duplicates(&self) -> usize {
        self.sources.iter().map(|s| s.duplicates).sum()
    }

    pub fn failed_sources(&self) -> usize {
        self.sources.iter().filter(|s| s.is_failed()).count()
    }

    pub fn source(&self, name: &str) -> Option<&SourceReport> {
        self.sources.iter().find(|s| s.source == name)
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for source in &self.sources {
            match &source.status {
                SourceStatus::Completed => writeln!(
                    f,
                    "  {}: {} found, {} added, {} duplicates",
                    source.source, source.extracted, source.inserted, source.duplicates
                )?,
                SourceStatus::Failed { reason } => {
                    writeln!(f, "  {}: FAILED ({})", source.source, reason)?
                }
            }
        }
        write!(
            f,
            "Total: {} found, {} added, {} duplicates, {} of {} sources failed",
            self.extracted(),
            self.inserted(),
            self.duplicates(),
            self.failed_sources(),
            self.sources.len()
        )
    }
}

/// Runs every configured source through one rendering session.
///
/// The harvester owns the session; dropping it releases the browser.
pub struct Harvester<P: Page> {
    session: P,
    extractor: ArticleExtractor,
    store: ArticleStore,
    source_delay: Duration,
}

impl<P: Page> Harvester<P> {
    pub fn new(session: P, extractor: ArticleExtractor, store: ArticleStore, source_delay: Duration) -> Self {
        Self {
            session,
            extractor,
            store,
            source_delay,
        }
    }

    pub fn session(&self) -> &P {
        &self.session
    }

    pub fn store(&self) -> &ArticleStore {
        &self.store
    }

    /// A source that fails to extract is logged and reported as failed; the
    /// run moves on. A storage fault aborts the run.
    pub async fn run_all(&self, sources: &[SourceConfig]) -> Result<RunReport> {
        let mut report = RunReport::default();

        for (index, source) in sources.iter().enumerate() {
            if index > 0 && !self.source_delay.is_zero() {
                tokio::time::sleep(self.source_delay).await;
            }

            let source_report = self.run_source(source).await?;
            report.sources.push(source_report);
        }

        info!(
            "Run finished: {} added, {} duplicates, {} failed sources",
            report.inserted(),
            report.duplicates(),
            report.failed_sources()
        );
        Ok(report)
    }

    async fn run_source(&self, source: &SourceConfig) -> Result<SourceReport> {
        let start_time = Instant::now();

        let raw = match self.extractor.extract(&self.session, source) {
            Ok(raw) => raw,
            Err(e) => {
                warn!("Could not scrape {}: {}", source.name, e);
                counter!("harvest_sources_failed_total", "source" => source.name.clone()).increment(1);
                return Ok(SourceReport {
                    source: source.name.clone(),
                    extracted: 0,
                    inserted: 0,
                    duplicates: 0,
                    status: SourceStatus::Failed {
                        reason: e.to_string(),
                    },
                    elapsed_ms: start_time.elapsed().as_millis() as u64,
                });
            }
        };

        let extracted = raw.len();
        let canonical: Vec<CanonicalArticle> = raw
            .into_iter()
            .map(|article| CanonicalArticle::from_raw(article, &source.base_url))
            .collect();
        let (unique, repeats) = dedupe(canonical);

        let summary = self.store.commit(&unique).await?;
        let duplicates = summary.duplicates + repeats;

        counter!("harvest_articles_inserted_total", "source" => source.name.clone())
            .increment(summary.inserted as u64);
        counter!("harvest_articles_duplicate_total", "source" => source.name.clone())
            .increment(duplicates as u64);

        Ok(SourceReport {
            source: source.name.clone(),
            extracted,
            inserted: summary.inserted,
            duplicates,
            status: SourceStatus::Completed,
            elapsed_ms: start_time.elapsed().as_millis() as u64,
        })
    }
}
