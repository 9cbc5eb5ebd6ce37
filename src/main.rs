use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use tracing::{error, info};
use tracing_appender::non_blocking::WorkerGuard;

use news_harvester::config::{AppConfig, LoggingConfig};
use news_harvester::models::load_sources;
use news_harvester::page::{ChromeSession, HtmlPage, Page};
use news_harvester::store::ArticleOrder;
use news_harvester::{
    ArticleExtractor, ArticleQuery, ArticleStore, ConsentHandler, Harvester, RunReport, SourceConfig,
};

/// Exit status of a harvest in which some sources failed.
const EXIT_PARTIAL: u8 = 2;

#[derive(Parser)]
#[command(name = "news-harvester", version, about = "Harvest news articles into a sqlite store")]
struct Cli {
    /// Database URL, overrides `database.url`
    #[arg(long, global = true)]
    database: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Scrape every configured source once
    Harvest {
        /// Source list (.json or .toml), overrides `sources.path`
        #[arg(long)]
        sources: Option<PathBuf>,
        /// Serve listings from `<DIR>/<source name>.html` instead of a browser
        #[arg(long)]
        snapshots: Option<PathBuf>,
        /// Show the browser window
        #[arg(long)]
        headful: bool,
    },
    /// Article counts in the store
    Stats,
    /// Stored articles, newest or most relevant first
    List {
        /// Only articles captured on or after this date (YYYY-MM-DD)
        #[arg(long)]
        since: Option<NaiveDate>,
        #[arg(long)]
        min_relevance: Option<i64>,
        #[arg(long, value_enum, default_value_t = OrderArg::Captured)]
        order: OrderArg,
        #[arg(long, default_value_t = 50)]
        limit: i64,
    },
    /// Articles awaiting classification, one JSON object per line
    Pending {
        #[arg(long, default_value_t = 100)]
        limit: i64,
    },
    /// Store a classification result for an article
    Annotate {
        id: i64,
        relevance: i64,
        comment: String,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum OrderArg {
    Relevance,
    Captured,
}

impl From<OrderArg> for ArticleOrder {
    fn from(order: OrderArg) -> Self {
        match order {
            OrderArg::Relevance => ArticleOrder::Relevance,
            OrderArg::Captured => ArticleOrder::Captured,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            error!("{:#}", e);
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let mut config = AppConfig::from_env().context("Failed to load configuration")?;
    if let Some(url) = cli.database {
        config.database.url = url;
    }

    let _guard = init_tracing(&config.logging)?;

    match cli.command {
        Command::Harvest {
            sources,
            snapshots,
            headful,
        } => {
            if headful {
                config.scraper.headless = false;
            }
            let sources_path = sources.unwrap_or_else(|| PathBuf::from(&config.sources.path));
            harvest(config, sources_path, snapshots).await
        }
        Command::Stats => {
            let store = ArticleStore::connect(&config.database).await?;
            print_stats(&store).await?;
            Ok(ExitCode::SUCCESS)
        }
        Command::List {
            since,
            min_relevance,
            order,
            limit,
        } => {
            let store = ArticleStore::connect(&config.database).await?;
            let query = ArticleQuery {
                since,
                min_relevance,
                order: order.into(),
                limit: Some(limit),
            };
            for article in store.query(&query).await? {
                println!("Source:    {}", article.source);
                println!("URL:       {}", article.url);
                println!("Title:     {}", article.title.as_deref().unwrap_or_default());
                match article.relevance {
                    Some(relevance) => println!("Relevance: {}", relevance),
                    None => println!("Relevance: (pending)"),
                }
                if let Some(comment) = &article.comment {
                    println!("Comment:   {}", comment);
                }
                println!("Captured:  {}", article.scraped_at.format("%Y-%m-%d %H:%M"));
                println!("{}", "-".repeat(80));
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::Pending { limit } => {
            let store = ArticleStore::connect(&config.database).await?;
            for article in store.pending_classification(limit).await? {
                println!("{}", serde_json::to_string(&article)?);
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::Annotate {
            id,
            relevance,
            comment,
        } => {
            let store = ArticleStore::connect(&config.database).await?;
            store.record_classification(id, relevance, &comment).await?;
            info!("Article {} classified with relevance {}", id, relevance);
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn init_tracing(config: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    let filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive(format!("news_harvester={}", config.level).parse()?);

    match &config.directory {
        Some(directory) => {
            let appender = tracing_appender::rolling::daily(directory, "news-harvester.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(writer)
                .with_ansi(false)
                .init();
            Ok(Some(guard))
        }
        None => {
            tracing_subscriber::fmt().with_env_filter(filter).init();
            Ok(None)
        }
    }
}

async fn harvest(config: AppConfig, sources_path: PathBuf, snapshots: Option<PathBuf>) -> Result<ExitCode> {
    // Sources are validated before the browser or the store is touched
    let sources = load_sources(&sources_path)
        .with_context(|| format!("Failed to load sources from {}", sources_path.display()))?;

    if config.metrics.enabled {
        let addr = SocketAddr::from(([0, 0, 0, 0], config.metrics.port));
        metrics_exporter_prometheus::PrometheusBuilder::new()
            .with_http_listener(addr)
            .install()
            .context("Failed to install metrics exporter")?;
        info!("Metrics exported on {}", addr);
    }

    let store = ArticleStore::connect(&config.database).await?;
    let consent = ConsentHandler::from_config(&config.consent)?;

    let report = match snapshots {
        Some(dir) => {
            let urls: HashMap<String, String> = sources
                .iter()
                .map(|s| (s.name.clone(), s.listing_url.clone()))
                .collect();
            let session = HtmlPage::from_dir(&dir, &urls)?;
            let extractor = ArticleExtractor::new(consent, Duration::ZERO, config.scraper.wait_timeout());
            run_with(session, extractor, store.clone(), Duration::ZERO, &sources).await?
        }
        None => {
            let session = ChromeSession::launch(&config.scraper)?;
            let extractor =
                ArticleExtractor::new(consent, config.scraper.settle_delay(), config.scraper.wait_timeout());
            run_with(session, extractor, store.clone(), config.scraper.source_delay(), &sources).await?
        }
    };

    println!("{}", report);
    print_stats(&store).await?;

    if report.failed_sources() > 0 {
        Ok(ExitCode::from(EXIT_PARTIAL))
    } else {
        Ok(ExitCode::SUCCESS)
    }
}

/// The session lives exactly as long as this call.
async fn run_with<P: Page>(
    session: P,
    extractor: ArticleExtractor,
    store: ArticleStore,
    source_delay: Duration,
    sources: &[SourceConfig],
) -> Result<RunReport> {
    let harvester = Harvester::new(session, extractor, store, source_delay);
    Ok(harvester.run_all(sources).await?)
}

async fn print_stats(store: &ArticleStore) -> Result<()> {
    println!("Total articles in database: {}", store.count().await?);
    for (source, count) in store.count_by_source().await? {
        println!("  {}: {} articles", source, count);
    }
    Ok(())
}
