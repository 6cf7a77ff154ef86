mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{InstantSleeper, MockSite};
use crawl_core::{ArticleStub, ResolvedArticle};
use crawl_engine::{article_dir_name, ArticleResolver};
use pretty_assertions::assert_eq;
use tempfile::TempDir;

const URL: &str = "https://site.test/article/7";

fn resolver(site: Arc<MockSite>, sleeper: Arc<InstantSleeper>, dir: &TempDir) -> ArticleResolver {
    ArticleResolver::new(
        site,
        sleeper,
        Duration::from_secs(2),
        dir.path().to_path_buf(),
    )
}

#[tokio::test]
async fn resolves_and_creates_article_directory() {
    let dir = TempDir::new().unwrap();
    let site = Arc::new(MockSite::new().article(
        URL,
        "Night market",
        vec!["https://cdn.test/1.webp".to_string()],
    ));
    let sleeper = Arc::new(InstantSleeper::default());

    let resolved = resolver(Arc::clone(&site), Arc::clone(&sleeper), &dir)
        .resolve(&ArticleStub::new("Listed title", URL), 3)
        .await;

    let expected_dir = dir.path().join(article_dir_name("Night market", URL));
    match resolved {
        ResolvedArticle::Resolved(detail) => {
            assert_eq!(detail.title, "Night market");
            assert_eq!(detail.source_url, URL);
            assert_eq!(detail.asset_urls, vec!["https://cdn.test/1.webp"]);
            assert_eq!(detail.dest_dir, expected_dir);
        }
        other => panic!("expected a resolved article, got {other:?}"),
    }
    assert!(expected_dir.is_dir());
    assert!(sleeper.naps().is_empty());
}

#[tokio::test]
async fn retries_until_the_site_answers() {
    let dir = TempDir::new().unwrap();
    let site = Arc::new(
        MockSite::new()
            .article(URL, "Night market", Vec::new())
            .flaky_article(URL, 2),
    );
    let sleeper = Arc::new(InstantSleeper::default());

    let resolved = resolver(Arc::clone(&site), Arc::clone(&sleeper), &dir)
        .resolve(&ArticleStub::new("Listed title", URL), 3)
        .await;

    assert!(matches!(resolved, ResolvedArticle::Resolved(_)));
    assert_eq!(site.article_calls().len(), 3);
    assert_eq!(sleeper.naps(), vec![Duration::from_secs(2); 2]);
}

#[tokio::test]
async fn exhausted_retries_come_back_unresolved() {
    let dir = TempDir::new().unwrap();
    let site = Arc::new(
        MockSite::new()
            .article(URL, "Night market", Vec::new())
            .flaky_article(URL, 5),
    );
    let stub = ArticleStub::new("Listed title", URL);

    let resolved = resolver(
        Arc::clone(&site),
        Arc::new(InstantSleeper::default()),
        &dir,
    )
    .resolve(&stub, 3)
    .await;

    assert_eq!(resolved, ResolvedArticle::unresolved(&stub));
    assert_eq!(site.article_calls().len(), 3);
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn same_title_gets_distinct_directories() {
    let dir = TempDir::new().unwrap();
    let other = "https://site.test/article/8";
    let site = Arc::new(
        MockSite::new()
            .article(URL, "Untitled set", Vec::new())
            .article(other, "Untitled set", Vec::new()),
    );
    let resolver = resolver(site, Arc::new(InstantSleeper::default()), &dir);

    let first = resolver.resolve(&ArticleStub::new("a", URL), 1).await;
    let second = resolver.resolve(&ArticleStub::new("b", other), 1).await;

    match (first, second) {
        (ResolvedArticle::Resolved(a), ResolvedArticle::Resolved(b)) => {
            assert_ne!(a.dest_dir, b.dest_dir);
        }
        other => panic!("expected both resolved, got {other:?}"),
    }
}
