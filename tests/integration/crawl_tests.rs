//! Integration tests for the crawler
//!
//! These tests use wiremock to create mock HTTP servers and test
//! the full crawl cycle end-to-end.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use sumi_harvest::config::{Config, FieldEntry, RuleEntry};
use sumi_harvest::crawler::{Coordinator, CrawlState};
use sumi_harvest::state::{PageOutcome, UrlState};
use sumi_harvest::storage::{RecordStore, SqliteStorage};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Wraps `body` in a minimal HTML page with a title
fn page(title: &str, body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(
        format!(
            "<html><head><title>{}</title></head><body>{}</body></html>",
            title, body
        ),
        "text/html; charset=utf-8",
    )
}

fn link_list(hrefs: &[&str]) -> String {
    let items: String = hrefs
        .iter()
        .map(|href| format!(r#"<li><a href="{}">{}</a></li>"#, href, href))
        .collect();
    format!(r#"<ul class="links">{}</ul>"#, items)
}

/// A rule over the whole site that records the title and follows list links
fn site_rule(root: &str) -> RuleEntry {
    RuleEntry {
        pattern: format!("^{}", regex::escape(root)),
        child_selector: Some("ul.links > li".to_string()),
        required: vec![],
        fields: BTreeMap::from([(
            "page_title".to_string(),
            FieldEntry::Text("title".to_string()),
        )]),
    }
}

/// Creates a test configuration rooted at `root`
fn create_test_config(root: &str, max_depth: u32, rules: Vec<RuleEntry>) -> Config {
    let mut config = Config::default();
    config.crawler.root_url = root.to_string();
    config.crawler.max_depth = max_depth;
    config.crawler.max_in_flight = 4;
    config.crawler.poll_interval_ms = 10;
    config.crawler.request_timeout_secs = 1;
    config.user_agent.crawler_name = "TestBot".to_string();
    config.rules = rules;
    config
}

fn in_memory_coordinator(config: Config) -> (Coordinator, Arc<Mutex<SqliteStorage>>) {
    let storage = Arc::new(Mutex::new(
        SqliteStorage::new_in_memory().expect("Failed to create storage"),
    ));
    let coordinator =
        Coordinator::with_store(config, storage.clone()).expect("Failed to create coordinator");
    (coordinator, storage)
}

#[tokio::test]
async fn test_crawl_stays_in_scope() {
    let mock_server = MockServer::start().await;
    let root = format!("{}/", mock_server.uri());

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(page(
            "Home",
            &link_list(&["/a", "http://external.org/b"]),
        ))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/a"))
        .respond_with(page("A", ""))
        .expect(1)
        .mount(&mock_server)
        .await;

    let config = create_test_config(&root, 1, vec![site_rule(&root)]);
    let (mut coordinator, _storage) = in_memory_coordinator(config);
    let summary = coordinator.run().await.expect("Crawl failed");

    assert_eq!(coordinator.state(), CrawlState::Stopped);
    assert_eq!(
        coordinator.frontier().completed_urls(),
        vec![root.clone(), format!("{}a", root)]
    );
    assert_eq!(coordinator.frontier().state_of("http://external.org/b"), None);
    assert_eq!(summary.frontier.pending, 0);
    assert_eq!(summary.frontier.in_flight, 0);
    assert_eq!(summary.frontier.succeeded, 2);
}

#[tokio::test]
async fn test_transport_error_marks_url_failed() {
    let mock_server = MockServer::start().await;
    let root = format!("{}/", mock_server.uri());

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(page("Home", &link_list(&["/slow", "/ok"])))
        .mount(&mock_server)
        .await;

    // Responds after the request timeout, so the client gives up
    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(
            page("Slow", &link_list(&["/never"])).set_delay(std::time::Duration::from_secs(3)),
        )
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/ok"))
        .respond_with(page("Ok", ""))
        .mount(&mock_server)
        .await;

    let config = create_test_config(&root, 2, vec![site_rule(&root)]);
    let (mut coordinator, _storage) = in_memory_coordinator(config);
    let summary = coordinator.run().await.expect("Crawl failed");

    let slow = format!("{}slow", root);
    assert_eq!(coordinator.frontier().success_of(&slow), Some(false));
    assert_eq!(
        coordinator.frontier().outcome_of(&slow),
        Some(PageOutcome::Failed)
    );
    assert_eq!(
        coordinator.frontier().state_of(&format!("{}never", root)),
        None
    );
    assert!(coordinator.frontier().is_quiescent());
    assert_eq!(summary.frontier.completed, 3);
    assert_eq!(summary.frontier.failed, 1);
    assert_eq!(summary.frontier.succeeded, 2);
}

#[tokio::test]
async fn test_unreachable_root_still_terminates() {
    let root = "http://127.0.0.1:1/";
    let config = create_test_config(root, 1, vec![site_rule(root)]);
    let (mut coordinator, _storage) = in_memory_coordinator(config);

    let summary = coordinator.run().await.expect("Crawl failed");

    assert_eq!(summary.frontier.completed, 1);
    assert_eq!(summary.frontier.succeeded, 0);
    assert_eq!(coordinator.frontier().success_of(root), Some(false));
}

#[tokio::test]
async fn test_shared_child_fetched_once() {
    let mock_server = MockServer::start().await;
    let root = format!("{}/", mock_server.uri());

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(page("Home", &link_list(&["/left", "/right"])))
        .mount(&mock_server)
        .await;

    for sibling in ["/left", "/right"] {
        Mock::given(method("GET"))
            .and(path(sibling))
            .respond_with(page(sibling, &link_list(&["/shared", "/shared#top"])))
            .mount(&mock_server)
            .await;
    }

    Mock::given(method("GET"))
        .and(path("/shared"))
        .respond_with(page("Shared", ""))
        .expect(1)
        .mount(&mock_server)
        .await;

    let config = create_test_config(&root, 2, vec![site_rule(&root)]);
    let (mut coordinator, _storage) = in_memory_coordinator(config);
    let summary = coordinator.run().await.expect("Crawl failed");

    assert_eq!(summary.frontier.completed, 4);
    assert_eq!(
        coordinator.frontier().state_of(&format!("{}shared", root)),
        Some(UrlState::Completed)
    );
}

#[tokio::test]
async fn test_missing_required_field_still_follows_links() {
    let mock_server = MockServer::start().await;
    let root = format!("{}/", mock_server.uri());

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(page("Home", &link_list(&["/child"])))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/child"))
        .respond_with(page("Child", ""))
        .expect(1)
        .mount(&mock_server)
        .await;

    let mut rule = site_rule(&root);
    rule.fields.insert(
        "site_name".to_string(),
        FieldEntry::Text("h2.site-name".to_string()),
    );
    rule.required = vec!["site_name".to_string()];

    let config = create_test_config(&root, 1, vec![rule]);
    let (mut coordinator, storage) = in_memory_coordinator(config);
    let summary = coordinator.run().await.expect("Crawl failed");

    assert_eq!(summary.frontier.completed, 2);
    assert_eq!(summary.records.saved, 0);
    assert_eq!(summary.records_incomplete, 2);
    assert_eq!(storage.lock().unwrap().count_records().unwrap(), 0);
}

#[tokio::test]
async fn test_zero_depth_fetches_only_root() {
    let mock_server = MockServer::start().await;
    let root = format!("{}/", mock_server.uri());

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(page("Home", &link_list(&["/a", "/b"])))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/a"))
        .respond_with(page("A", ""))
        .expect(0)
        .mount(&mock_server)
        .await;

    let config = create_test_config(&root, 0, vec![site_rule(&root)]);
    let (mut coordinator, _storage) = in_memory_coordinator(config);
    let summary = coordinator.run().await.expect("Crawl failed");

    assert_eq!(coordinator.frontier().completed_urls(), vec![root]);
    assert_eq!(summary.frontier.completed, 1);
}

#[tokio::test]
async fn test_content_type_handling() {
    let mock_server = MockServer::start().await;
    let root = format!("{}/", mock_server.uri());

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(page("Home", &link_list(&["/doc.pdf", "/gone"])))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/doc.pdf"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("%PDF-1.4", "application/pdf"))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/gone"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    let config = create_test_config(&root, 1, vec![site_rule(&root)]);
    let (mut coordinator, storage) = in_memory_coordinator(config);
    let summary = coordinator.run().await.expect("Crawl failed");

    for skipped in ["doc.pdf", "gone"] {
        let url = format!("{}{}", root, skipped);
        assert_eq!(
            coordinator.frontier().outcome_of(&url),
            Some(PageOutcome::Skipped)
        );
        assert_eq!(coordinator.frontier().success_of(&url), Some(true));
    }
    assert_eq!(summary.frontier.processed, 1);
    assert_eq!(summary.frontier.skipped, 2);
    assert_eq!(storage.lock().unwrap().count_records().unwrap(), 1);
}

#[tokio::test]
async fn test_records_persist_to_database_file() {
    let mock_server = MockServer::start().await;
    let root = format!("{}/", mock_server.uri());
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let db_path = dir.path().join("harvest.db");

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(page("Directory", &link_list(&["/listing/"])))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/listing/"))
        .respond_with(page(
            "Listing",
            r#"<ul class="directory-url">
                 <li><a href="http://site.example/">Example Site</a> A fine site</li>
               </ul>"#,
        ))
        .mount(&mock_server)
        .await;

    let listing_rule = RuleEntry {
        pattern: format!("^{}listing/", regex::escape(&root)),
        child_selector: None,
        required: vec!["site_name".to_string()],
        fields: BTreeMap::from([
            (
                "site_name".to_string(),
                FieldEntry::Text("ul.directory-url > li > a".to_string()),
            ),
            (
                "site_url".to_string(),
                FieldEntry::Attr {
                    selector: "ul.directory-url > li > a".to_string(),
                    attr: "href".to_string(),
                },
            ),
        ]),
    };
    let home_rule = RuleEntry {
        pattern: format!("^{}$", regex::escape(&root)),
        ..site_rule(&root)
    };

    let mut config = create_test_config(&root, 1, vec![home_rule, listing_rule]);
    config.output.database_path = db_path.to_string_lossy().to_string();
    config.output.commit_every = 1;

    let mut coordinator = Coordinator::new(config).expect("Failed to create coordinator");
    let summary = coordinator.run().await.expect("Crawl failed");
    assert_eq!(summary.records.saved, 2);
    drop(coordinator);

    let storage = SqliteStorage::new(&db_path).expect("Failed to reopen database");
    let records = storage.all_records().expect("Failed to load records");
    assert_eq!(records.len(), 2);

    let listing = records
        .iter()
        .find(|r| r.page_url.ends_with("/listing/"))
        .expect("Listing record missing");
    assert_eq!(listing.get("site_name"), Some("Example Site"));
    assert_eq!(listing.get("site_url"), Some("http://site.example/"));
    assert_eq!(listing.get("page_title"), None);
}

#[tokio::test]
async fn test_cancel_mid_crawl_admits_no_new_work() {
    let mock_server = MockServer::start().await;
    let root = format!("{}/", mock_server.uri());

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(page("Home", &link_list(&["/slow"])))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(
            page("Slow", &link_list(&["/child"]))
                .set_delay(std::time::Duration::from_millis(500)),
        )
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/child"))
        .respond_with(page("Child", ""))
        .expect(0)
        .mount(&mock_server)
        .await;

    let config = create_test_config(&root, 2, vec![site_rule(&root)]);
    let (mut coordinator, _storage) = in_memory_coordinator(config);

    let cancel = coordinator.cancellation_token();
    tokio::spawn(async move {
        tokio::time::sleep(std::time::Duration::from_millis(150)).await;
        cancel.cancel();
    });

    let started = std::time::Instant::now();
    let summary = coordinator.run().await.expect("Crawl failed");

    assert!(started.elapsed() < std::time::Duration::from_millis(450));
    assert!(summary.interrupted);
    assert_eq!(coordinator.state(), CrawlState::Stopped);
    assert_eq!(summary.frontier.completed, 1);
    assert_eq!(summary.frontier.in_flight, 1);

    // Let the slow page finish; the links it carries must be refused
    tokio::time::sleep(std::time::Duration::from_millis(800)).await;

    let slow = format!("{}slow", root);
    let child = format!("{}child", root);
    assert_eq!(
        coordinator.frontier().state_of(&slow),
        Some(UrlState::Completed)
    );
    assert_eq!(coordinator.frontier().state_of(&child), None);

    let counts = coordinator.frontier().counts();
    assert_eq!(counts.completed, 2);
    assert_eq!(counts.in_flight, 0);
}
