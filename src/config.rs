use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

use crate::locator::Locator;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub scraper: ScraperConfig,
    pub consent: ConsentConfig,
    pub sources: SourcesConfig,
    pub logging: LoggingConfig,
    pub metrics: MetricsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub acquire_timeout: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScraperConfig {
    pub headless: bool,
    pub chrome_path: Option<String>,
    pub user_agent: String,
    pub window_width: u32,
    pub window_height: u32,
    /// Pause after navigation for client-side rendering.
    pub settle_delay_ms: u64,
    /// Bound on waiting for a source's article-wait selector.
    pub wait_timeout_ms: u64,
    /// Politeness delay between two sources.
    pub source_delay_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsentConfig {
    pub selectors: Vec<String>,
    pub timeout_ms: u64,
    pub pause_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourcesConfig {
    pub path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub directory: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    pub enabled: bool,
    pub port: u16,
}

pub const DEFAULT_CONSENT_SELECTORS: &[&str] = &[
    "button:contains('Accept')",
    "button:contains('Accetto')",
    "button:contains('Souhlasím')",
    "button:contains('Prihvaćam')",
    "button:contains('Agree')",
    "button:contains('Consent')",
    "#didomi-notice-agree-button",
    "button[class*='accept']",
    "button[class*='consent']",
    "a:contains('Souhlasím')",
];

impl ScraperConfig {
    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn wait_timeout(&self) -> Duration {
        Duration::from_millis(self.wait_timeout_ms)
    }

    pub fn source_delay(&self) -> Duration {
        Duration::from_millis(self.source_delay_ms)
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = Config::builder()
            .set_default("database.url", "sqlite://news_articles.db")?
            .set_default("database.max_connections", 4)?
            .set_default("database.acquire_timeout", 30)?
            .set_default("scraper.headless", true)?
            .set_default(
                "scraper.user_agent",
                "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0 Safari/537.36",
            )?
            .set_default("scraper.window_width", 1366)?
            .set_default("scraper.window_height", 900)?
            .set_default("scraper.settle_delay_ms", 2000)?
            .set_default("scraper.wait_timeout_ms", 10_000)?
            .set_default("scraper.source_delay_ms", 2000)?
            .set_default(
                "consent.selectors",
                DEFAULT_CONSENT_SELECTORS
                    .iter()
                    .map(|s| s.to_string())
                    .collect::<Vec<_>>(),
            )?
            .set_default("consent.timeout_ms", 5000)?
            .set_default("consent.pause_ms", 1000)?
            .set_default("sources.path", "sources.json")?
            .set_default("logging.level", "info")?
            .set_default("metrics.enabled", false)?
            .set_default("metrics.port", 9001)?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // Local overrides, ignored by git
            .add_source(File::with_name("config/local").required(false))
            .add_source(
                Environment::with_prefix("HARVEST")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("consent.selectors")
                    .try_parsing(true),
            )
            .build()?;

        let mut config: AppConfig = s.try_deserialize()?;

        if config.scraper.chrome_path.is_none() {
            config.scraper.chrome_path = env::var("CHROME_PATH").ok();
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.database.url.starts_with("sqlite:") {
            return Err(ConfigError::Message("Database url must be a sqlite: url".into()));
        }

        if self.database.max_connections == 0 {
            return Err(ConfigError::Message("Database max_connections must be greater than 0".into()));
        }

        if self.scraper.wait_timeout_ms == 0 {
            return Err(ConfigError::Message("Scraper wait_timeout_ms must be greater than 0".into()));
        }

        if self.scraper.window_width == 0 || self.scraper.window_height == 0 {
            return Err(ConfigError::Message("Scraper window size must be non-zero".into()));
        }

        for selector in &self.consent.selectors {
            if let Err(e) = Locator::parse(selector) {
                return Err(ConfigError::Message(format!("Invalid consent selector: {}", e)));
            }
        }

        if self.sources.path.trim().is_empty() {
            return Err(ConfigError::Message("Sources path must not be empty".into()));
        }

        if self.metrics.enabled && self.metrics.port == 0 {
            return Err(ConfigError::Message("Metrics port must be greater than 0".into()));
        }

        Ok(())
    }
}
