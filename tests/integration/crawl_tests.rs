//! Integration tests for the crawler
//!
//! These tests use wiremock to create mock API servers and test
//! the full fetch/retry cycle end-to-end.

use paged_harvest::config::{
    load_config, ApiConfig, Config, CrawlerConfig, CredentialsConfig, OutputConfig, TargetsConfig,
};
use paged_harvest::crawler::{run_crawl, Coordinator, CrawlInput};
use paged_harvest::output::FailureLedger;
use paged_harvest::CrawlError;
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tempfile::TempDir;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration writing into `dir`
fn create_test_config(dir: &TempDir, max_retries: u32, concurrency: u32) -> Config {
    Config {
        crawler: CrawlerConfig {
            max_retries,
            concurrency,
            request_timeout: 5,
            connect_timeout: 5,
        },
        api: ApiConfig {
            rate_limit_poll_interval: 50,
            ..ApiConfig::default()
        },
        output: OutputConfig {
            directory: out_dir(dir).display().to_string(),
            log_path: log_path(dir).display().to_string(),
            pretty_json: false,
        },
        credentials: CredentialsConfig::default(),
        targets: TargetsConfig::default(),
    }
}

fn out_dir(dir: &TempDir) -> PathBuf {
    dir.path().join("out")
}

fn log_path(dir: &TempDir) -> PathBuf {
    dir.path().join("failures.json")
}

fn read_artifact(path: &Path) -> Vec<Value> {
    let content = std::fs::read_to_string(path).expect("artifact should exist");
    serde_json::from_str(&content).expect("artifact should be JSON")
}

/// A successful page with plenty of rate-limit budget left
fn page(body: Value) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .set_body_json(body)
        .insert_header("X-RateLimit-Remaining", "4999")
}

/// A page whose `Link` header advertises a last page
fn page_with_more(body: Value, base_url: &str) -> ResponseTemplate {
    let link = format!(
        r#"<{base}/next>; rel="next", <{base}/last>; rel="last""#,
        base = base_url
    );
    page(body).insert_header("Link", link.as_str())
}

/// A response that cannot be decoded
fn garbage() -> ResponseTemplate {
    ResponseTemplate::new(200)
        .set_body_string("<html>oops</html>")
        .insert_header("X-RateLimit-Remaining", "4999")
}

#[tokio::test]
async fn test_pagination_accumulates_pages_in_order() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();
    let dir = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path("/repos/a/issues"))
        .and(query_param("per_page", "100"))
        .and(query_param("page", "1"))
        .respond_with(page_with_more(json!([{"n": 1}, {"n": 2}]), &base_url))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/repos/a/issues"))
        .and(query_param("page", "2"))
        .respond_with(page_with_more(json!([{"n": 3}]), &base_url))
        .expect(1)
        .mount(&mock_server)
        .await;

    // The last page only links backwards
    Mock::given(method("GET"))
        .and(path("/repos/a/issues"))
        .and(query_param("page", "3"))
        .respond_with(
            page(json!([{"n": 4}, {"n": 5}]))
                .insert_header("Link", format!(r#"<{}/prev>; rel="prev""#, base_url).as_str()),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let config = create_test_config(&dir, 3, 1);
    let coordinator = Coordinator::new(&config).expect("Failed to create coordinator");
    let input = CrawlInput::from_strings(
        ["issues-a"],
        [format!("{}/repos/a/issues", base_url)],
        ["token"],
    );

    let report = coordinator.crawl(&input).await.expect("Crawl failed");

    assert!(report.is_complete());
    assert_eq!(report.rounds, 1);
    assert_eq!(
        read_artifact(&out_dir(&dir).join("issues-a.json")),
        vec![
            json!({"n": 1}),
            json!({"n": 2}),
            json!({"n": 3}),
            json!({"n": 4}),
            json!({"n": 5})
        ]
    );
}

#[tokio::test]
async fn test_single_objects_are_wrapped_compact_and_pretty() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    for i in 1..=3 {
        Mock::given(method("GET"))
            .and(path(format!("/api/{}", i)))
            .respond_with(page(json!({"test": format!("test{}", i)})))
            .mount(&mock_server)
            .await;
    }

    let destinations = ["test1", "test2", "test3"];
    let urls: Vec<String> = (1..=3).map(|i| format!("{}/api/{}", base_url, i)).collect();

    // Compact
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&dir, 3, 3);
    let coordinator = Coordinator::new(&config).unwrap();
    let input = CrawlInput::from_strings(destinations, urls.clone(), ["token"]);
    let report = coordinator.crawl(&input).await.unwrap();

    assert!(report.is_complete());
    assert_eq!(std::fs::read_to_string(log_path(&dir)).unwrap(), "[]");
    for i in 1..=3 {
        let content = std::fs::read_to_string(out_dir(&dir).join(format!("test{}.json", i))).unwrap();
        assert_eq!(content, format!(r#"[{{"test": "test{}"}}]"#, i));
    }

    // Pretty
    let dir = TempDir::new().unwrap();
    let mut config = create_test_config(&dir, 3, 3);
    config.output.pretty_json = true;
    let coordinator = Coordinator::new(&config).unwrap();
    let input = CrawlInput::from_strings(destinations, urls, ["token"]);
    coordinator.crawl(&input).await.unwrap();

    for i in 1..=3 {
        let content = std::fs::read_to_string(out_dir(&dir).join(format!("test{}.json", i))).unwrap();
        assert_eq!(
            content,
            format!("[\n    {{\n        \"test\": \"test{}\"\n    }}\n]", i)
        );
    }
}

#[tokio::test]
async fn test_rate_limit_with_past_reset_repeats_page_once() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();
    let dir = TempDir::new().unwrap();
    let past_reset = (chrono::Utc::now().timestamp() - 100).to_string();

    // First answer for page 1: window exhausted, body must be discarded
    Mock::given(method("GET"))
        .and(path("/items"))
        .and(query_param("page", "1"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([{"stale": true}]))
                .insert_header("X-RateLimit-Remaining", "0")
                .insert_header("X-RateLimit-Reset", past_reset.as_str()),
        )
        .up_to_n_times(1)
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/items"))
        .and(query_param("page", "1"))
        .respond_with(page_with_more(json!([{"id": 1}]), &base_url))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/items"))
        .and(query_param("page", "2"))
        .respond_with(page(json!([{"id": 2}])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let config = create_test_config(&dir, 1, 1);
    let coordinator = Coordinator::new(&config).unwrap();
    let input = CrawlInput::from_strings(["items"], [format!("{}/items", base_url)], ["token"]);

    let report = coordinator.crawl(&input).await.unwrap();

    assert!(report.is_complete());
    assert_eq!(
        read_artifact(&out_dir(&dir).join("items.json")),
        vec![json!({"id": 1}), json!({"id": 2})]
    );
}

#[tokio::test]
async fn test_rate_limit_with_future_reset_waits_then_continues() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();
    let dir = TempDir::new().unwrap();
    let reset = chrono::Utc::now().timestamp() + 1;

    Mock::given(method("GET"))
        .and(path("/items"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([]))
                .insert_header("X-RateLimit-Remaining", "0")
                .insert_header("X-RateLimit-Reset", reset.to_string().as_str()),
        )
        .up_to_n_times(1)
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/items"))
        .respond_with(page(json!([{"id": 1}])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let config = create_test_config(&dir, 1, 1);
    let coordinator = Coordinator::new(&config).unwrap();
    let input = CrawlInput::from_strings(["items"], [format!("{}/items", base_url)], ["token"]);

    let report = coordinator.crawl(&input).await.unwrap();

    assert!(report.is_complete());
    assert!(chrono::Utc::now().timestamp() >= reset);
    assert_eq!(
        read_artifact(&out_dir(&dir).join("items.json")),
        vec![json!({"id": 1})]
    );
}

#[tokio::test]
async fn test_exhausted_window_without_reset_header_fails_target() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();
    let dir = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path("/items"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([]))
                .insert_header("X-RateLimit-Remaining", "0"),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let config = create_test_config(&dir, 1, 1);
    let coordinator = Coordinator::new(&config).unwrap();
    let url = format!("{}/items", base_url);
    let input = CrawlInput::from_strings(["items"], [url.clone()], ["token"]);

    let report = coordinator.crawl(&input).await.unwrap();

    assert_eq!(report.ledger.len(), 1);
    assert_eq!(report.ledger.entries()[0].url(), url);
    assert_eq!(
        report.ledger.entries()[0].reason(),
        "missing or malformed header X-RateLimit-Reset"
    );
    assert!(!out_dir(&dir).join("items.json").exists());
}

#[tokio::test]
async fn test_retry_converges_after_failed_first_round() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();
    let dir = TempDir::new().unwrap();

    for i in 1..=3 {
        Mock::given(method("GET"))
            .and(path(format!("/api/{}", i)))
            .respond_with(garbage())
            .up_to_n_times(1)
            .expect(1)
            .mount(&mock_server)
            .await;

        Mock::given(method("GET"))
            .and(path(format!("/api/{}", i)))
            .respond_with(page(json!([{"id": i}])))
            .expect(1)
            .mount(&mock_server)
            .await;
    }

    let config = create_test_config(&dir, 3, 2);
    let coordinator = Coordinator::new(&config).unwrap();
    let input = CrawlInput::from_strings(
        ["test1", "test2", "test3"],
        (1..=3).map(|i| format!("{}/api/{}", base_url, i)),
        ["token"],
    );

    let report = coordinator.crawl(&input).await.unwrap();

    assert_eq!(report.rounds, 2);
    assert!(report.is_complete());
    assert_eq!(report.succeeded(), 3);
    assert!(FailureLedger::read(&log_path(&dir)).unwrap().is_empty());
    for i in 1..=3 {
        assert_eq!(
            read_artifact(&out_dir(&dir).join(format!("test{}.json", i))),
            vec![json!({"id": i})]
        );
    }
}

#[tokio::test]
async fn test_ledger_keeps_only_last_round_failure() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();
    let dir = TempDir::new().unwrap();

    // Rounds 1 and 2 fail on decoding, round 3 on a missing header
    Mock::given(method("GET"))
        .and(path("/broken"))
        .respond_with(garbage())
        .up_to_n_times(2)
        .expect(2)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/broken"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&mock_server)
        .await;

    // Fails once, then recovers: must not show up in the ledger
    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(garbage())
        .up_to_n_times(1)
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(page(json!([])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let config = create_test_config(&dir, 3, 2);
    let coordinator = Coordinator::new(&config).unwrap();
    let broken = format!("{}/broken", base_url);
    let flaky = format!("{}/flaky", base_url);
    let input = CrawlInput::from_strings(["broken", "flaky"], [broken.clone(), flaky], ["token"]);

    let report = coordinator.crawl(&input).await.unwrap();

    assert_eq!(report.rounds, 3);
    let ledger = FailureLedger::read(&log_path(&dir)).unwrap();
    assert_eq!(ledger, report.ledger);
    assert_eq!(ledger.len(), 1);
    assert_eq!(ledger.entries()[0].url(), broken);
    assert_eq!(
        ledger.entries()[0].reason(),
        "missing or malformed header X-RateLimit-Remaining"
    );

    assert_eq!(read_artifact(&out_dir(&dir).join("flaky.json")), Vec::<Value>::new());
    assert!(!out_dir(&dir).join("broken.json").exists());
}

#[tokio::test]
async fn test_existing_artifact_is_not_refetched() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();
    let dir = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .respond_with(page(json!([{"fresh": true}])))
        .expect(0)
        .mount(&mock_server)
        .await;

    std::fs::create_dir_all(out_dir(&dir)).unwrap();
    let existing = out_dir(&dir).join("done.json");
    std::fs::write(&existing, r#"[{"old":true}]"#).unwrap();

    let config = create_test_config(&dir, 3, 1);
    let coordinator = Coordinator::new(&config).unwrap();
    let input = CrawlInput::from_strings(["done"], [format!("{}/done", base_url)], ["token"]);

    let report = coordinator.crawl(&input).await.unwrap();

    assert!(report.is_complete());
    assert_eq!(
        std::fs::read_to_string(&existing).unwrap(),
        r#"[{"old":true}]"#
    );
}

#[tokio::test]
async fn test_credentials_are_assigned_round_robin() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();
    let dir = TempDir::new().unwrap();
    let tokens = ["tok-a", "tok-b"];

    for i in 0..5 {
        Mock::given(method("GET"))
            .and(path(format!("/api/{}", i)))
            .and(header("Authorization", format!("token {}", tokens[i % 2]).as_str()))
            .respond_with(page(json!([{"id": i}])))
            .expect(1)
            .mount(&mock_server)
            .await;
    }

    let config = create_test_config(&dir, 1, 5);
    let coordinator = Coordinator::new(&config).unwrap();
    let input = CrawlInput::from_strings(
        (0..5).map(|i| format!("t{}", i)),
        (0..5).map(|i| format!("{}/api/{}", base_url, i)),
        tokens,
    );

    let report = coordinator.crawl(&input).await.unwrap();

    assert!(report.is_complete(), "ledger: {:?}", report.ledger);
}

#[tokio::test]
async fn test_error_status_handling() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(
            ResponseTemplate::new(404)
                .set_body_json(json!({"message": "Not Found"}))
                .insert_header("X-RateLimit-Remaining", "4999"),
        )
        .mount(&mock_server)
        .await;

    let url = format!("{}/missing", base_url);

    // By default the error payload is stored like any other object
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&dir, 1, 1);
    let input = CrawlInput::from_strings(["missing"], [url.clone()], ["token"]);
    let report = Coordinator::new(&config).unwrap().crawl(&input).await.unwrap();
    assert!(report.is_complete());
    assert_eq!(
        read_artifact(&out_dir(&dir).join("missing.json")),
        vec![json!({"message": "Not Found"})]
    );

    // Opting in turns it into a failure
    let dir = TempDir::new().unwrap();
    let mut config = create_test_config(&dir, 1, 1);
    config.api.fail_on_error_status = true;
    let report = Coordinator::new(&config).unwrap().crawl(&input).await.unwrap();
    assert_eq!(report.ledger.len(), 1);
    assert_eq!(report.ledger.entries()[0].reason(), "HTTP 404");
}

#[tokio::test]
async fn test_invalid_input_is_rejected_before_any_work() {
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&dir, 3, 1);
    let coordinator = Coordinator::new(&config).unwrap();

    let no_tokens = CrawlInput::from_strings(["1", "1", "1"], ["1", "1", "1"], Vec::<String>::new());
    assert!(matches!(
        coordinator.crawl(&no_tokens).await,
        Err(CrawlError::NoCredentials)
    ));

    let mismatch = CrawlInput::from_strings(["1", "1", "1"], ["1"], ["token"]);
    assert!(matches!(
        coordinator.crawl(&mismatch).await,
        Err(CrawlError::LengthMismatch {
            destinations: 3,
            urls: 1
        })
    ));

    let mut not_string = CrawlInput::from_strings(["1", "1", "1"], ["1", "1", "1"], ["token"]);
    not_string.urls[2] = toml::Value::Integer(1);
    let err = coordinator.crawl(&not_string).await.unwrap_err();
    assert_eq!(err.to_string(), "urls must contain only strings");

    assert!(!out_dir(&dir).exists());
    assert!(!log_path(&dir).exists());
}

#[tokio::test]
async fn test_run_crawl_from_config_file() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();
    let dir = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path("/repos/x"))
        .and(header("Authorization", "Bearer secret"))
        .and(query_param("per_page", "25"))
        .respond_with(page(json!([{"name": "x"}])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let config_content = format!(
        r#"
[crawler]
max-retries = 2
concurrency = 2

[api]
per-page = 25
auth-scheme = "Bearer"

[output]
directory = "{out}"
log-path = "{log}"

[credentials]
tokens = ["secret"]

[targets]
destinations = ["x"]
urls = ["{base}/repos/x"]
"#,
        out = out_dir(&dir).display(),
        log = log_path(&dir).display(),
        base = base_url
    );
    let config_path = dir.path().join("harvest.toml");
    std::fs::write(&config_path, config_content).unwrap();

    let config = load_config(&config_path).expect("Failed to load config");
    let report = run_crawl(&config).await.expect("Crawl failed");

    assert!(report.is_complete());
    assert_eq!(
        read_artifact(&out_dir(&dir).join("x.json")),
        vec![json!({"name": "x"})]
    );
}

#[tokio::test]
async fn test_round_keeps_at_most_concurrency_targets_in_flight() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();
    let dir = TempDir::new().unwrap();
    let delay = Duration::from_millis(400);

    for i in 0..4 {
        Mock::given(method("GET"))
            .and(path(format!("/slow/{}", i)))
            .respond_with(page(json!([{"id": i}])).set_delay(delay))
            .expect(1)
            .mount(&mock_server)
            .await;
    }

    let config = create_test_config(&dir, 1, 2);
    let coordinator = Coordinator::new(&config).unwrap();
    let input = CrawlInput::from_strings(
        (0..4).map(|i| format!("t{}", i)),
        (0..4).map(|i| format!("{}/slow/{}", base_url, i)),
        ["token"],
    );

    let start = Instant::now();
    let report = coordinator.crawl(&input).await.unwrap();
    let elapsed = start.elapsed();

    assert!(report.is_complete(), "ledger: {:?}", report.ledger);
    // Two batches of two: slower than full fan-out, faster than one at a time
    assert!(elapsed >= delay * 2, "elapsed {:?}", elapsed);
    assert!(elapsed < delay * 4, "elapsed {:?}", elapsed);
}

#[tokio::test]
async fn test_hung_request_times_out_into_ledger() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();
    let dir = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(page(json!([{"late": true}])).set_delay(Duration::from_secs(3)))
        .mount(&mock_server)
        .await;

    let mut config = create_test_config(&dir, 2, 1);
    config.crawler.request_timeout = 1;
    let coordinator = Coordinator::new(&config).unwrap();
    let url = format!("{}/slow", base_url);
    let input = CrawlInput::from_strings(["slow"], [url.clone()], ["token"]);

    let report = coordinator.crawl(&input).await.unwrap();

    assert_eq!(report.rounds, 2);
    assert_eq!(report.ledger.len(), 1);
    let entry = &report.ledger.entries()[0];
    assert_eq!(entry.url(), url);
    assert!(
        entry.reason().starts_with("request failed") && entry.reason().contains("timed out"),
        "reason: {}",
        entry.reason()
    );
    assert!(!out_dir(&dir).join("slow.json").exists());
}
