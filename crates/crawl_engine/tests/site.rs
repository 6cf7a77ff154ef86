use std::sync::Arc;

use crawl_core::ArticleStub;
use crawl_engine::{
    CatalogInfo, FetchSettings, HtmlSiteAdapter, ListingError, ReqwestFetcher, SiteAdapter,
    SiteError, SiteProfile,
};
use pretty_assertions::assert_eq;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const LISTING: &str = r#"
<html><body>
  <div class="card"><a class="visited" href="/article/1">  First
     article </a></div>
  <div class="card"><span>no link here</span></div>
  <div class="card"><a class="visited" href="https://other.test/article/2">Second</a></div>
  <a class="visited" href="/outside-card">Ignored</a>
</body></html>
"#;

const ARTICLE: &str = r#"
<html><body>
  <h1 class="title">Harbour at dusk</h1>
  <img src="/media/photo/1.webp?w=300">
  <img src="https://cdn.test/media/photo/2.webp">
  <img src="/static/logo.png">
  <img data-src="/media/photo/3.webp">
</body></html>
"#;

fn profile(base: &str) -> SiteProfile {
    SiteProfile {
        catalog_url: format!("{base}/catalog"),
        listing_url: format!("{base}/catalog?page={{page}}"),
        asset_pattern: Some("/media/photo/".to_string()),
        catalog_link_selector: Some("a.catalog".to_string()),
        ..SiteProfile::default()
    }
}

fn adapter(profile: SiteProfile) -> HtmlSiteAdapter {
    let fetcher = ReqwestFetcher::new(FetchSettings::default()).unwrap();
    HtmlSiteAdapter::new(Arc::new(fetcher), profile).unwrap()
}

async fn serve_html(server: &MockServer, route: &str, body: &str) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/html; charset=utf-8"))
        .mount(server)
        .await;
}

#[tokio::test]
async fn lists_article_links_inside_cards() {
    let server = MockServer::start().await;
    serve_html(&server, "/catalog", LISTING).await;

    let site = adapter(profile(&server.uri()));
    let stubs = site.list_articles(2).await.unwrap();

    assert_eq!(
        stubs,
        vec![
            ArticleStub::new("First article", format!("{}/article/1", server.uri())),
            ArticleStub::new("Second", "https://other.test/article/2"),
        ]
    );
}

#[test]
fn listing_url_substitutes_page_number() {
    let site = adapter(profile("https://site.test"));
    assert_eq!(site.listing_url(7), "https://site.test/catalog?page=7");
}

#[tokio::test]
async fn listing_fetch_failure_names_the_page() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/catalog"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&server)
        .await;

    let site = adapter(profile(&server.uri()));
    let err = site.list_articles(4).await.unwrap_err();

    assert!(matches!(err, ListingError::Fetch { page: 4, .. }));
}

#[tokio::test]
async fn article_page_yields_title_and_filtered_assets() {
    let server = MockServer::start().await;
    serve_html(&server, "/article/1", ARTICLE).await;

    let site = adapter(profile(&server.uri()));
    let content = site
        .fetch_article(&format!("{}/article/1", server.uri()))
        .await
        .unwrap();

    assert_eq!(content.title, "Harbour at dusk");
    assert_eq!(
        content.asset_urls,
        vec![
            format!("{}/media/photo/1.webp", server.uri()),
            "https://cdn.test/media/photo/2.webp".to_string(),
        ]
    );
}

#[tokio::test]
async fn article_without_title_is_untitled() {
    let server = MockServer::start().await;
    serve_html(
        &server,
        "/article/9",
        "<html><body><img src='/media/photo/a.webp'></body></html>",
    )
    .await;

    let site = adapter(SiteProfile {
        asset_pattern: None,
        strip_asset_query: false,
        ..profile(&server.uri())
    });
    let content = site
        .fetch_article(&format!("{}/article/9", server.uri()))
        .await
        .unwrap();

    assert_eq!(content.title, "untitled");
    assert_eq!(content.asset_urls.len(), 1);
}

#[tokio::test]
async fn discover_reads_catalog_name_and_count() {
    let server = MockServer::start().await;
    serve_html(
        &server,
        "/catalog",
        r#"<html><body><a class="catalog" href="/catalog">Street photos 1234</a></body></html>"#,
    )
    .await;

    let site = adapter(profile(&server.uri()));
    let info = site.discover().await.unwrap();

    assert_eq!(
        info,
        CatalogInfo {
            name: Some("Street photos 1234".to_string()),
            total_articles: Some(1234),
        }
    );
}

#[tokio::test]
async fn discover_without_selector_is_empty() {
    let site = adapter(SiteProfile {
        catalog_link_selector: None,
        ..profile("https://site.test")
    });

    assert_eq!(site.discover().await.unwrap(), CatalogInfo::default());
}

#[test]
fn listing_template_needs_page_placeholder() {
    let fetcher = ReqwestFetcher::new(FetchSettings::default()).unwrap();
    let result = HtmlSiteAdapter::new(
        Arc::new(fetcher),
        SiteProfile {
            listing_url: "https://site.test/catalog".to_string(),
            ..SiteProfile::default()
        },
    );

    assert!(matches!(
        result.err(),
        Some(SiteError::MissingPagePlaceholder(_))
    ));
}

#[test]
fn invalid_selector_is_rejected() {
    let fetcher = ReqwestFetcher::new(FetchSettings::default()).unwrap();
    let result = HtmlSiteAdapter::new(
        Arc::new(fetcher),
        SiteProfile {
            card_selector: "div[[".to_string(),
            ..profile("https://site.test")
        },
    );

    assert!(matches!(
        result.err(),
        Some(SiteError::InvalidSelector { .. })
    ));
}
