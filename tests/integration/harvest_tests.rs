use std::collections::HashMap;

use news_harvester::page::HtmlPage;
use news_harvester::{AppError, SourceStatus};

use super::*;

const ALPHA: &str = "https://alpha.example.com/news";
const BETA: &str = "https://beta.example.org/latest";
const GAMMA: &str = "https://gamma.example.net/";

#[tokio::test]
async fn test_single_source_run() -> anyhow::Result<()> {
    let page = HtmlPage::new().with_document(
        ALPHA,
        &listing_html(&[
            ("/2024/06/ai-triage?utm_source=home", "AI triage in hospitals"),
            ("https://alpha.example.com/2024/06/riders", "Riders managed by app"),
            ("/2024/06/untitled", ""),
        ]),
    );
    let harvester = test_harvester(page).await?;
    let sources = vec![test_source("Alpha", ALPHA, "https://alpha.example.com")];

    let report = harvester.run_all(&sources).await?;

    let alpha = report.source("Alpha").unwrap();
    assert_eq!(alpha.status, SourceStatus::Completed);
    assert_eq!(alpha.extracted, 2);
    assert_eq!(alpha.inserted, 2);
    assert_eq!(alpha.duplicates, 0);

    let stored = harvester.store().pending_classification(10).await?;
    let urls: Vec<&str> = stored.iter().map(|r| r.url.as_str()).collect();
    assert_eq!(
        urls,
        vec![
            "https://alpha.example.com/2024/06/ai-triage",
            "https://alpha.example.com/2024/06/riders"
        ]
    );
    assert_eq!(stored[0].description.as_deref(), Some("About AI triage in hospitals"));
    assert_eq!(harvester.session().clicks().len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_rerun_counts_duplicates() -> anyhow::Result<()> {
    let page = HtmlPage::new().with_document(ALPHA, &listing_html(&[("/a", "First"), ("/b", "Second")]));
    let harvester = test_harvester(page).await?;
    let sources = vec![test_source("Alpha", ALPHA, "https://alpha.example.com")];

    let first = harvester.run_all(&sources).await?;
    let second = harvester.run_all(&sources).await?;

    assert_eq!(first.inserted(), 2);
    assert_eq!(second.inserted(), 0);
    assert_eq!(second.duplicates(), 2);
    assert_eq!(harvester.store().count().await?, 2);
    Ok(())
}

#[tokio::test]
async fn test_shared_url_across_sources_is_stored_once() -> anyhow::Result<()> {
    let shared = "https://wire.example.com/story/42";
    let tracked = format!("{}?ref=beta", shared);
    let page = HtmlPage::new()
        .with_document(ALPHA, &listing_html(&[(shared, "Wire story"), ("/own", "Alpha exclusive")]))
        .with_document(BETA, &listing_html(&[(tracked.as_str(), "Wire story again")]));
    let harvester = test_harvester(page).await?;
    let sources = vec![
        test_source("Alpha", ALPHA, "https://alpha.example.com"),
        test_source("Beta", BETA, "https://beta.example.org"),
    ];

    let report = harvester.run_all(&sources).await?;

    assert_eq!(report.extracted(), 3);
    assert_eq!(report.inserted() + report.duplicates(), report.extracted());
    assert_eq!(report.source("Beta").unwrap().duplicates, 1);
    assert_eq!(harvester.store().count().await?, 2);
    Ok(())
}

#[tokio::test]
async fn test_repeated_url_within_one_listing() -> anyhow::Result<()> {
    let page = HtmlPage::new().with_document(
        ALPHA,
        &listing_html(&[("/a?pos=top", "Lead story"), ("/a?pos=sidebar", "Lead story"), ("/b", "Other")]),
    );
    let harvester = test_harvester(page).await?;

    let report = harvester
        .run_all(&[test_source("Alpha", ALPHA, "https://alpha.example.com")])
        .await?;

    let alpha = report.source("Alpha").unwrap();
    assert_eq!(alpha.extracted, 3);
    assert_eq!(alpha.inserted, 2);
    assert_eq!(alpha.duplicates, 1);
    Ok(())
}

#[tokio::test]
async fn test_failed_source_does_not_stop_the_run() -> anyhow::Result<()> {
    let page = HtmlPage::new()
        .with_document(ALPHA, &listing_html(&[("/a", "Alpha one")]))
        // never renders the wait target
        .with_document(BETA, "<html><body><div class=\"spinner\"></div></body></html>")
        .with_document(GAMMA, &listing_html(&[("/g", "Gamma one")]));
    let harvester = test_harvester(page).await?;
    let sources = vec![
        test_source("Alpha", ALPHA, "https://alpha.example.com"),
        test_source("Beta", BETA, "https://beta.example.org"),
        test_source("Unreachable", "https://down.example.com/", "https://down.example.com"),
        test_source("Gamma", GAMMA, "https://gamma.example.net"),
    ];

    let report = harvester.run_all(&sources).await?;

    assert_eq!(report.sources.len(), 4);
    assert_eq!(report.failed_sources(), 2);
    assert_eq!(report.inserted(), 2);

    let beta = report.source("Beta").unwrap();
    assert!(beta.is_failed());
    assert_eq!((beta.inserted, beta.duplicates), (0, 0));
    assert!(matches!(&beta.status, SourceStatus::Failed { reason } if reason.contains("#stories")));

    assert!(report.source("Unreachable").unwrap().is_failed());
    assert_eq!(report.source("Gamma").unwrap().status, SourceStatus::Completed);
    Ok(())
}

#[tokio::test]
async fn test_storage_fault_aborts_the_run() -> anyhow::Result<()> {
    let page = HtmlPage::new().with_document(ALPHA, &listing_html(&[("/a", "Alpha one")]));
    let harvester = test_harvester(page).await?;
    harvester.store().pool().close().await;

    let result = harvester
        .run_all(&[test_source("Alpha", ALPHA, "https://alpha.example.com")])
        .await;

    assert!(matches!(result, Err(AppError::Database(_))));
    Ok(())
}

#[tokio::test]
async fn test_snapshot_directory() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    std::fs::write(dir.path().join("Alpha.html"), listing_html(&[("/a", "Alpha one")]))?;
    std::fs::write(dir.path().join("Stray.html"), listing_html(&[("/s", "Stray")]))?;
    std::fs::write(dir.path().join("notes.txt"), "not a snapshot")?;

    let urls = HashMap::from([("Alpha".to_string(), ALPHA.to_string())]);
    let page = HtmlPage::from_dir(dir.path(), &urls)?;
    let harvester = test_harvester(page).await?;

    let report = harvester
        .run_all(&[test_source("Alpha", ALPHA, "https://alpha.example.com")])
        .await?;

    assert_eq!(report.inserted(), 1);
    Ok(())
}
