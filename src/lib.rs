pub mod config;
pub mod consent;
pub mod extractor;
pub mod harvester;
pub mod locator;
pub mod models;
pub mod normalize;
pub mod page;
pub mod store;
pub mod utils;

// Re-export commonly used types
pub use config::AppConfig;
pub use consent::{ConsentHandler, ConsentOutcome};
pub use extractor::ArticleExtractor;
pub use harvester::{Harvester, RunReport, SourceReport, SourceStatus};
pub use models::{ArticleRecord, CanonicalArticle, RawArticle, SourceConfig};
pub use store::{ArticleQuery, ArticleStore, CommitSummary, InsertOutcome};
pub use utils::error::AppError;

pub type Result<T> = std::result::Result<T, AppError>;
