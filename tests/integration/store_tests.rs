use news_harvester::config::DatabaseConfig;
use news_harvester::{ArticleStore, CanonicalArticle, InsertOutcome};

fn article(url: &str) -> CanonicalArticle {
    CanonicalArticle {
        source: "Example".to_string(),
        url: url.to_string(),
        title: "Headline".to_string(),
        description: "Lead".to_string(),
    }
}

async fn file_store(dir: &tempfile::TempDir) -> anyhow::Result<ArticleStore> {
    let config = DatabaseConfig {
        url: format!("sqlite://{}", dir.path().join("articles.db").display()),
        max_connections: 4,
        acquire_timeout: 10,
    };
    Ok(ArticleStore::connect(&config).await?)
}

#[tokio::test]
async fn test_concurrent_inserts_of_same_url() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let store = file_store(&dir).await?;
    let a = article("https://example.com/a");

    let (first, second) = tokio::join!(store.insert(&a), store.insert(&a));
    let mut outcomes = vec![first?, second?];
    outcomes.sort_by_key(|o| matches!(o, InsertOutcome::Duplicate));

    assert!(matches!(outcomes[0], InsertOutcome::Inserted(_)));
    assert_eq!(outcomes[1], InsertOutcome::Duplicate);
    assert_eq!(store.count().await?, 1);
    Ok(())
}

#[tokio::test]
async fn test_records_survive_reopening() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    {
        let store = file_store(&dir).await?;
        store.commit(&[article("https://example.com/a"), article("https://example.com/b")]).await?;
        store.pool().close().await;
    }

    let reopened = file_store(&dir).await?;
    assert_eq!(reopened.count().await?, 2);
    assert_eq!(reopened.insert(&article("https://example.com/a")).await?, InsertOutcome::Duplicate);
    Ok(())
}
