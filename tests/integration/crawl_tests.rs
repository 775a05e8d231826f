//! Integration tests for the crawler
//!
//! These tests use wiremock to stand in for bookstore websites and run the full
//! per-bookstore pipeline end-to-end.

use bookstore_finder::config::{parse_config, Config};
use bookstore_finder::crawler::Coordinator;
use bookstore_finder::input::load_targets;
use bookstore_finder::output::{export_json, RecordSource};
use bookstore_finder::state::{BookstoreTarget, ErrorKind};
use bookstore_finder::storage::{SqliteStorage, Storage};
use std::io::Write;
use wiremock::matchers::{any, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const PRODUCT_PATH: &str = "/a/walter-van-den-berg/zanger-ronald-zingt-de-blues/501634390";

const PRODUCT_PAGE: &str = r#"<html><head><title>Zanger Ronald zingt de blues</title></head><body>
    <h1>Zanger Ronald zingt de blues</h1>
    <p>Paperback, ISBN 9789048853366</p>
    </body></html>"#;

const HOMEPAGE_WITH_ADDRESS: &str = r#"<html><body>
    <h1>Boekhandel X</h1>
    <footer>Hoofdstraat 1, 1234 AB Voorbeeldstad</footer>
    </body></html>"#;

/// Creates a test configuration; `search` is extra TOML for the `[search]` section
fn create_test_config(search: &str) -> Config {
    parse_config(&format!(
        r#"
        [book]
        title = "Zanger Ronald zingt de blues"
        author = "Walter van den Berg"
        isbn = "9789048853366"

        [crawler]
        delay-between-requests = 0
        request-timeout = 5
        max-retries = 0
        backoff-base = 1

        [search]
        {}
        "#,
        search
    ))
    .expect("test config should be valid")
}

fn coordinator(config: Config) -> Coordinator {
    let storage = SqliteStorage::in_memory().expect("in-memory database");
    Coordinator::new(config, storage, "test-hash").expect("coordinator")
}

fn html(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(body, "text/html; charset=utf-8")
}

async fn mount_no_robots(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(404))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_direct_crawl_finds_product_and_footer_address() {
    let server = MockServer::start().await;
    mount_no_robots(&server).await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(&format!(
            r#"<html><body>
            <nav><a href="{}">Zanger Ronald zingt de blues</a></nav>
            <footer>Hoofdstraat 1, 1234 AB Voorbeeldstad</footer>
            </body></html>"#,
            PRODUCT_PATH
        )))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path(PRODUCT_PATH))
        .respond_with(html(PRODUCT_PAGE))
        .expect(1)
        .mount(&server)
        .await;

    let coordinator = coordinator(create_test_config("known-paths = []"));
    let target = BookstoreTarget::new("Boekhandel X", server.uri());
    let result = coordinator.crawl_bookstore(&target).await;

    assert!(result.success, "unexpected failure: {:?}", result.error_message);
    assert!(result.product_url.as_deref().unwrap().ends_with("/501634390"));
    assert_eq!(result.postal_code.as_deref(), Some("1234 AB"));
    assert_eq!(result.city.as_deref(), Some("Voorbeeldstad"));
    assert_eq!(result.error_kind, None);
}

#[tokio::test]
async fn test_known_template_then_homepage_address() {
    let server = MockServer::start().await;
    mount_no_robots(&server).await;

    Mock::given(method("GET"))
        .and(path(PRODUCT_PATH))
        .respond_with(html(PRODUCT_PAGE))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(HOMEPAGE_WITH_ADDRESS))
        .expect(1)
        .mount(&server)
        .await;

    let coordinator = coordinator(create_test_config(""));
    let target = BookstoreTarget::new("Boekhandel X", server.uri());
    let result = coordinator.crawl_bookstore(&target).await;

    assert!(result.success);
    assert!(result.product_url.as_deref().unwrap().contains("501634390"));
    assert_eq!(result.postal_code.as_deref(), Some("1234 AB"));
    assert_eq!(result.city.as_deref(), Some("Voorbeeldstad"));
}

#[tokio::test]
async fn test_forbidden_everywhere() {
    let server = MockServer::start().await;

    Mock::given(any())
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let coordinator = coordinator(create_test_config(""));
    let target = BookstoreTarget::new("Boekhandel Dicht", server.uri());
    let result = coordinator.crawl_bookstore(&target).await;

    assert!(!result.success);
    assert_eq!(result.error_kind, Some(ErrorKind::Forbidden));
    assert_eq!(result.product_url, None);
}

#[tokio::test]
async fn test_robots_disallowed_homepage() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string("User-agent: *\nDisallow: /\n"))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(HOMEPAGE_WITH_ADDRESS))
        .expect(0)
        .mount(&server)
        .await;

    let coordinator = coordinator(create_test_config(""));
    let target = BookstoreTarget::new("Boekhandel Robots", server.uri());
    let result = coordinator.crawl_bookstore(&target).await;

    assert!(!result.success);
    assert_eq!(result.error_kind, Some(ErrorKind::Robots));
}

#[tokio::test]
async fn test_robots_disallowed_product_path_is_skipped() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string("User-agent: *\nDisallow: /a/\n"))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(&format!(
            r#"<html><body><a href="{}">Zanger Ronald zingt de blues</a></body></html>"#,
            PRODUCT_PATH
        )))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path(PRODUCT_PATH))
        .respond_with(html(PRODUCT_PAGE))
        .expect(0)
        .mount(&server)
        .await;

    let coordinator = coordinator(create_test_config(""));
    let target = BookstoreTarget::new("Boekhandel X", server.uri());
    let result = coordinator.crawl_bookstore(&target).await;

    assert!(!result.success);
    assert_eq!(result.error_kind, Some(ErrorKind::NoProductPage));
}

#[tokio::test]
async fn test_known_address_skips_extraction() {
    let server = MockServer::start().await;
    mount_no_robots(&server).await;

    Mock::given(method("GET"))
        .and(path(PRODUCT_PATH))
        .respond_with(html(PRODUCT_PAGE))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(HOMEPAGE_WITH_ADDRESS))
        .expect(0)
        .mount(&server)
        .await;

    let coordinator = coordinator(create_test_config(""));
    let mut target = BookstoreTarget::new("Boekhandel Bekend", server.uri());
    target.known_postal_code = Some("5611gh".to_string());
    target.known_city = Some("Eindhoven".to_string());
    let result = coordinator.crawl_bookstore(&target).await;

    assert!(result.success);
    assert_eq!(result.postal_code.as_deref(), Some("5611 GH"));
    assert_eq!(result.city.as_deref(), Some("Eindhoven"));
}

#[tokio::test]
async fn test_address_from_contact_page() {
    let server = MockServer::start().await;
    mount_no_robots(&server).await;

    Mock::given(method("GET"))
        .and(path(PRODUCT_PATH))
        .respond_with(html(PRODUCT_PAGE))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(
            r#"<html><body><a href="/onze-winkel">Onze winkel</a></body></html>"#,
        ))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/onze-winkel"))
        .respond_with(html(
            "<html><body><p>Kerkstraat 7</p><p>5611 GH Eindhoven</p></body></html>",
        ))
        .expect(1)
        .mount(&server)
        .await;

    let coordinator = coordinator(create_test_config(""));
    let target = BookstoreTarget::new("Boekhandel Contact", server.uri());
    let result = coordinator.crawl_bookstore(&target).await;

    assert!(result.success);
    assert_eq!(result.postal_code.as_deref(), Some("5611 GH"));
    assert_eq!(result.city.as_deref(), Some("Eindhoven"));
}

#[tokio::test]
async fn test_no_postal_code_anywhere() {
    let server = MockServer::start().await;
    mount_no_robots(&server).await;

    Mock::given(method("GET"))
        .and(path(PRODUCT_PATH))
        .respond_with(html(PRODUCT_PAGE))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html("<html><body><h1>Welkom</h1></body></html>"))
        .mount(&server)
        .await;

    let coordinator = coordinator(create_test_config(""));
    let target = BookstoreTarget::new("Boekhandel Zonder Adres", server.uri());
    let result = coordinator.crawl_bookstore(&target).await;

    assert!(!result.success);
    assert!(result.product_url.is_some());
    assert_eq!(result.postal_code, None);
    assert_eq!(result.error_kind, Some(ErrorKind::NoPostalCode));
}

#[tokio::test]
async fn test_run_stores_results_and_exports_json() {
    let good = MockServer::start().await;
    mount_no_robots(&good).await;
    Mock::given(method("GET"))
        .and(path(PRODUCT_PATH))
        .respond_with(html(PRODUCT_PAGE))
        .mount(&good)
        .await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(HOMEPAGE_WITH_ADDRESS))
        .mount(&good)
        .await;

    let closed = MockServer::start().await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(403))
        .mount(&closed)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let input_path = dir.path().join("bookstores.csv");
    let mut input = std::fs::File::create(&input_path).unwrap();
    writeln!(input, "name,url,postal_code,city").unwrap();
    writeln!(input, "Boekhandel X,{},,", good.uri()).unwrap();
    writeln!(input, "Boekhandel Dicht,{},,", closed.uri()).unwrap();
    drop(input);

    let manual_path = dir.path().join("manual.csv");
    std::fs::write(
        &manual_path,
        "name,product_url,postal_code,city\n\
         Boekhandel Handmatig,https://handmatig.example/p/1,9711 AB,Groningen\n",
    )
    .unwrap();

    let targets = load_targets(&input_path).unwrap();
    assert_eq!(targets.len(), 2);

    let mut coordinator = coordinator(create_test_config(""));
    let stats = coordinator.run(&targets).await.unwrap();
    assert_eq!((stats.total, stats.successful, stats.failed), (2, 1, 1));
    assert_eq!(stats.success_rate(), 50.0);

    let all = coordinator.storage().get_all().unwrap();
    assert_eq!(all.len(), 2);
    let closed_row = all.iter().find(|r| r.name == "Boekhandel Dicht").unwrap();
    assert_eq!(closed_row.error_kind, Some(ErrorKind::Forbidden));

    let json_path = dir.path().join("out").join("bookstores.json");
    let book = coordinator.config().book.clone();
    let export = export_json(coordinator.storage(), &book, &manual_path, &json_path).unwrap();

    assert_eq!(export.metadata.total_bookstores, 2);
    assert_eq!(export.metadata.crawled_count, 1);
    assert_eq!(export.metadata.manual_count, 1);
    // sorted by city: Groningen before Voorbeeldstad
    assert_eq!(export.bookstores[0].source, RecordSource::Manual);
    assert_eq!(export.bookstores[1].name, "Boekhandel X");

    let written: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&json_path).unwrap()).unwrap();
    assert_eq!(written["metadata"]["book_title"], "Zanger Ronald zingt de blues");
    assert_eq!(written["bookstores"][1]["postal_code"], "1234 AB");
}

#[tokio::test]
async fn test_rerun_updates_existing_rows() {
    let server = MockServer::start().await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("results.db");
    let targets = vec![BookstoreTarget::new("Boekhandel Dicht", server.uri())];

    for _ in 0..2 {
        let storage = SqliteStorage::new(&db_path).unwrap();
        let mut coordinator =
            Coordinator::new(create_test_config(""), storage, "test-hash").unwrap();
        coordinator.run(&targets).await.unwrap();
    }

    let storage = SqliteStorage::new(&db_path).unwrap();
    let stats = storage.get_statistics().unwrap();
    assert_eq!(stats.total_bookstores, 1);
    assert_eq!(stats.successful, 0);

    let run = storage.get_run(2).unwrap();
    assert_eq!(run.total, 1);
    assert_eq!(run.failed, 1);
}

const SLUG_PATH: &str = "/boek/zanger-ronald-zingt-de-blues";

const SEARCH_RESULTS: &str = r#"<html><body>
    <ul class="results">
      <li><a href="/boek/zanger-ronald-zingt-de-blues">Zanger Ronald zingt de blues</a></li>
    </ul>
    </body></html>"#;

async fn mount_page(server: &MockServer, page: &str, body: &str, times: u64) {
    Mock::given(method("GET"))
        .and(path(page))
        .respond_with(html(body))
        .expect(times)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_homepage_search_form_is_submitted() {
    let server = MockServer::start().await;
    mount_no_robots(&server).await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(
            r#"<html><body>
            <form action="/winkel/zoek" method="get">
              <input type="hidden" name="lang" value="nl">
              <input type="text" name="q">
            </form>
            <footer>Hoofdstraat 1, 1234 AB Voorbeeldstad</footer>
            </body></html>"#,
        ))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/winkel/zoek"))
        .and(query_param("q", "Zanger Ronald zingt de blues"))
        .respond_with(html(SEARCH_RESULTS))
        .expect(1)
        .mount(&server)
        .await;

    mount_page(&server, SLUG_PATH, PRODUCT_PAGE, 1).await;
    mount_page(&server, "/zoeken", SEARCH_RESULTS, 0).await;

    let coordinator = coordinator(create_test_config("known-paths = []"));
    let target = BookstoreTarget::new("Boekhandel Zoek", server.uri());
    let result = coordinator.crawl_bookstore(&target).await;

    assert!(result.success, "unexpected failure: {:?}", result.error_message);
    assert!(result.product_url.as_deref().unwrap().ends_with(SLUG_PATH));
    assert_eq!(result.postal_code.as_deref(), Some("1234 AB"));
}

#[tokio::test]
async fn test_fallback_search_path_without_form() {
    let server = MockServer::start().await;
    mount_no_robots(&server).await;

    mount_page(&server, "/", HOMEPAGE_WITH_ADDRESS, 1).await;

    Mock::given(method("GET"))
        .and(path("/zoeken"))
        .and(query_param("q", "Zanger Ronald zingt de blues"))
        .respond_with(html(SEARCH_RESULTS))
        .expect(1)
        .mount(&server)
        .await;

    mount_page(&server, SLUG_PATH, PRODUCT_PAGE, 1).await;

    let coordinator = coordinator(create_test_config("known-paths = []"));
    let target = BookstoreTarget::new("Boekhandel X", server.uri());
    let result = coordinator.crawl_bookstore(&target).await;

    assert!(result.success, "unexpected failure: {:?}", result.error_message);
    assert!(result.product_url.as_deref().unwrap().ends_with(SLUG_PATH));
    assert_eq!(result.city.as_deref(), Some("Voorbeeldstad"));
}

#[tokio::test]
async fn test_product_found_one_level_into_catalog() {
    let server = MockServer::start().await;
    mount_no_robots(&server).await;

    mount_page(
        &server,
        "/",
        r#"<html><body>
        <nav><a href="/boeken">Boeken</a><a href="/over-ons">Over ons</a></nav>
        <footer>Hoofdstraat 1, 1234 AB Voorbeeldstad</footer>
        </body></html>"#,
        1,
    )
    .await;
    mount_page(&server, "/boeken", SEARCH_RESULTS, 1).await;
    mount_page(&server, SLUG_PATH, PRODUCT_PAGE, 1).await;

    let coordinator = coordinator(create_test_config("known-paths = []"));
    let target = BookstoreTarget::new("Boekhandel Catalogus", server.uri());
    let result = coordinator.crawl_bookstore(&target).await;

    assert!(result.success, "unexpected failure: {:?}", result.error_message);
    assert!(result.product_url.as_deref().unwrap().ends_with(SLUG_PATH));
}

#[tokio::test]
async fn test_catalog_pages_are_capped() {
    let server = MockServer::start().await;
    mount_no_robots(&server).await;

    mount_page(
        &server,
        "/",
        r#"<html><body><nav>
        <a href="/boeken">Boeken</a>
        <a href="/catalogus">Catalogus</a>
        <a href="/assortiment">Assortiment</a>
        <a href="/literatuur">Literatuur</a>
        </nav></body></html>"#,
        1,
    )
    .await;

    let empty = "<html><body><p>Niets gevonden</p></body></html>";
    mount_page(&server, "/boeken", empty, 1).await;
    mount_page(&server, "/catalogus", empty, 1).await;
    mount_page(&server, "/assortiment", empty, 1).await;
    mount_page(&server, "/literatuur", SEARCH_RESULTS, 0).await;

    let coordinator = coordinator(create_test_config("known-paths = []"));
    let target = BookstoreTarget::new("Boekhandel Groot", server.uri());
    let result = coordinator.crawl_bookstore(&target).await;

    assert!(!result.success);
    assert_eq!(result.error_kind, Some(ErrorKind::NoProductPage));
}

#[tokio::test]
async fn test_search_engine_strategy_end_to_end() {
    let shop = MockServer::start().await;
    let engine = MockServer::start().await;
    mount_no_robots(&shop).await;
    mount_no_robots(&engine).await;

    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(html(&format!(
            r#"<html><body>
            <div class="g"><a href="/url?q={shop}{slug}&amp;sa=U">Zanger Ronald zingt de blues</a></div>
            <div class="g"><a href="https://elders.example/boek/1">Elders</a></div>
            </body></html>"#,
            shop = shop.uri(),
            slug = SLUG_PATH
        )))
        .expect(1)
        .mount(&engine)
        .await;

    mount_page(&shop, SLUG_PATH, PRODUCT_PAGE, 1).await;
    // direct crawl never runs; the homepage is fetched once, for the address
    mount_page(&shop, "/", HOMEPAGE_WITH_ADDRESS, 1).await;
    mount_page(&shop, "/zoeken", SEARCH_RESULTS, 0).await;

    let coordinator = coordinator(create_test_config(&format!(
        "known-paths = []\nuse-search-engine = true\nsearch-engine-url = \"{}/search\"",
        engine.uri()
    )));
    let target = BookstoreTarget::new("Boekhandel Zoekmachine", shop.uri());
    let result = coordinator.crawl_bookstore(&target).await;

    assert!(result.success, "unexpected failure: {:?}", result.error_message);
    assert!(result.product_url.as_deref().unwrap().ends_with(SLUG_PATH));
    assert_eq!(result.city.as_deref(), Some("Voorbeeldstad"));
}

#[tokio::test]
async fn test_search_engine_disallowed_by_robots_falls_through() {
    let shop = MockServer::start().await;
    let engine = MockServer::start().await;
    mount_no_robots(&shop).await;

    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string("User-agent: *\nDisallow: /search"))
        .mount(&engine)
        .await;
    mount_page(&engine, "/search", "<html></html>", 0).await;

    mount_page(
        &shop,
        "/",
        &format!(
            r#"<html><body>
            <a href="{}">Zanger Ronald zingt de blues</a>
            <footer>Hoofdstraat 1, 1234 AB Voorbeeldstad</footer>
            </body></html>"#,
            SLUG_PATH
        ),
        1,
    )
    .await;
    mount_page(&shop, SLUG_PATH, PRODUCT_PAGE, 1).await;

    let coordinator = coordinator(create_test_config(&format!(
        "known-paths = []\nuse-search-engine = true\nsearch-engine-url = \"{}/search\"",
        engine.uri()
    )));
    let target = BookstoreTarget::new("Boekhandel X", shop.uri());
    let result = coordinator.crawl_bookstore(&target).await;

    assert!(result.success, "unexpected failure: {:?}", result.error_message);
    assert!(result.product_url.as_deref().unwrap().ends_with(SLUG_PATH));
}

#[tokio::test]
async fn test_known_template_wins_before_direct_crawl() {
    let server = MockServer::start().await;
    mount_no_robots(&server).await;

    mount_page(&server, PRODUCT_PATH, PRODUCT_PAGE, 1).await;
    mount_page(
        &server,
        "/",
        &format!(
            r#"<html><body>
            <a href="{}">Zanger Ronald zingt de blues</a>
            <footer>Hoofdstraat 1, 1234 AB Voorbeeldstad</footer>
            </body></html>"#,
            SLUG_PATH
        ),
        1,
    )
    .await;
    mount_page(&server, SLUG_PATH, PRODUCT_PAGE, 0).await;
    mount_page(&server, "/zoeken", SEARCH_RESULTS, 0).await;

    let coordinator = coordinator(create_test_config(""));
    let target = BookstoreTarget::new("Boekhandel X", server.uri());
    let result = coordinator.crawl_bookstore(&target).await;

    assert!(result.success, "unexpected failure: {:?}", result.error_message);
    assert!(result.product_url.as_deref().unwrap().contains("501634390"));
}

#[tokio::test]
async fn test_product_looking_page_without_book_is_rejected() {
    let server = MockServer::start().await;
    mount_no_robots(&server).await;

    mount_page(
        &server,
        "/",
        &format!(
            r#"<html><body>
            <a href="{}">Zanger Ronald zingt de blues</a>
            <footer>Hoofdstraat 1, 1234 AB Voorbeeldstad</footer>
            </body></html>"#,
            SLUG_PATH
        ),
        1,
    )
    .await;
    // the slug matches but the page is about something else
    mount_page(
        &server,
        SLUG_PATH,
        "<html><body><h1>Cadeaubon</h1><p>Tijdelijk niet leverbaar</p></body></html>",
        1,
    )
    .await;

    let coordinator = coordinator(create_test_config("known-paths = []"));
    let target = BookstoreTarget::new("Boekhandel X", server.uri());
    let result = coordinator.crawl_bookstore(&target).await;

    assert!(!result.success);
    assert_eq!(result.product_url, None);
    assert_eq!(result.error_kind, Some(ErrorKind::NoProductPage));
}
