//! Integration tests for the crawler
//!
//! These tests use wiremock to stand in for the platform and run the full
//! crawl cycle end-to-end, including fault, resume and cancellation.

use serde_json::json;
use std::fs;
use std::path::Path;
use subreddit_mapper::config::{
    Config, CrawlerConfig, OutputConfig, PlatformConfig, SeedConfig, UserAgentConfig,
};
use subreddit_mapper::crawler::{run_crawl, CrawlOutcome, RunExit};
use subreddit_mapper::storage::read_checkpoint;
use subreddit_mapper::NodeId;
use tempfile::TempDir;
use tokio::sync::watch;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration pointed at the mock server
fn create_test_config(base_url: &str, output_dir: &Path, seeds: &[&str]) -> Config {
    Config {
        crawler: CrawlerConfig {
            checkpoint_interval: 2,
            request_delay_ms: 0, // No pacing against the mock
            seed_delay_ms: 0,
            skip_missing_nodes: false,
        },
        user_agent: UserAgentConfig {
            crawler_name: "TestBot".to_string(),
            crawler_version: "1.0.0".to_string(),
            contact_url: "https://example.com/contact".to_string(),
            contact_email: "test@example.com".to_string(),
        },
        platform: PlatformConfig {
            base_url: base_url.to_string(),
            timeout_secs: 5,
        },
        output: OutputConfig {
            directory: output_dir.to_path_buf(),
            ..OutputConfig::default()
        },
        seeds: SeedConfig {
            names: seeds.iter().map(|s| s.to_string()).collect(),
        },
    }
}

fn about(subscribers: u64, kind: &str, description: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "kind": "t5",
        "data": {
            "subscribers": subscribers,
            "over18": false,
            "submission_type": kind,
            "description": description
        }
    }))
}

async fn mount_node(server: &MockServer, name: &str, response: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path(format!("/r/{}/about.json", name)))
        .respond_with(response)
        .mount(server)
        .await;
}

/// mathematics -> statistics, plus a collection with probability and statistics
async fn mount_math_graph(server: &MockServer, statistics: ResponseTemplate) {
    mount_node(
        server,
        "mathematics",
        about(
            500000,
            "any",
            "Related: /r/statistics, /r/mathematics and /user/bob/m/mathstuff",
        ),
    )
    .await;
    mount_node(server, "statistics", statistics).await;
    mount_node(server, "probability", about(1000, "link", "Back to /r/Mathematics")).await;

    Mock::given(method("GET"))
        .and(path("/api/multi/user/bob/m/mathstuff"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "kind": "LabeledMulti",
            "data": {"subreddits": [{"name": "Probability"}, {"name": "statistics"}]}
        })))
        .mount(server)
        .await;
}

fn output_lines(dir: &Path) -> Vec<String> {
    fs::read_to_string(dir.join("output.csv"))
        .expect("output should exist")
        .lines()
        .map(str::to_string)
        .collect()
}

fn never_cancel() -> watch::Receiver<bool> {
    // The receiver keeps reading the last value after the sender is gone
    watch::channel(false).1
}

#[tokio::test]
async fn test_full_crawl() {
    let mock_server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    mount_math_graph(&mock_server, about(90000, "self", "See /r/probability")).await;

    let config = create_test_config(&mock_server.uri(), dir.path(), &["mathematics"]);
    let outcome = run_crawl(config, false, never_cancel()).await.unwrap();

    assert!(matches!(outcome, CrawlOutcome::Completed { visited: 3 }));
    assert_eq!(RunExit::from_outcome(&outcome), RunExit::Success);
    assert_eq!(
        output_lines(dir.path()),
        vec![
            "mathematics,500000,false,any,probability;statistics",
            "statistics,90000,false,text,probability",
            "probability,1000,false,link,mathematics",
        ]
    );

    let snapshot = read_checkpoint(&dir.path().join("checkpoint.json")).unwrap();
    assert!(snapshot.state.is_exhausted());
    assert_eq!(snapshot.state.visited_len(), 3);
    assert!(!dir.path().join("errors.log").exists());
}

#[tokio::test]
async fn test_fault_then_resume_has_no_duplicates() {
    let mock_server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    mount_math_graph(&mock_server, ResponseTemplate::new(503)).await;

    // First run faults on statistics
    let config = create_test_config(&mock_server.uri(), dir.path(), &["mathematics"]);
    let outcome = run_crawl(config.clone(), false, never_cancel()).await.unwrap();

    let CrawlOutcome::Faulted { node, .. } = &outcome else {
        panic!("expected a fault, got {:?}", outcome);
    };
    assert_eq!(node.as_str(), "statistics");
    assert_eq!(RunExit::from_outcome(&outcome), RunExit::Faulted);

    let snapshot = read_checkpoint(&dir.path().join("checkpoint.json")).unwrap();
    assert_eq!(
        snapshot.state.peek(),
        Some(&NodeId::normalize("statistics").unwrap())
    );
    let log = fs::read_to_string(dir.path().join("errors.log")).unwrap();
    assert!(log.contains("node: statistics"));
    assert!(log.contains("503"));

    // The platform recovers and the crawl is resumed
    mock_server.reset().await;
    mount_math_graph(&mock_server, about(90000, "self", "See /r/probability")).await;

    let outcome = run_crawl(config, false, never_cancel()).await.unwrap();
    assert!(matches!(outcome, CrawlOutcome::Completed { visited: 2 }));

    let lines = output_lines(dir.path());
    assert_eq!(
        lines,
        vec![
            "mathematics,500000,false,any,probability;statistics",
            "statistics,90000,false,text,probability",
            "probability,1000,false,link,mathematics",
        ]
    );
}

#[tokio::test]
async fn test_permission_denied_node_is_skipped() {
    let mock_server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    mount_math_graph(&mock_server, ResponseTemplate::new(403)).await;

    let config = create_test_config(&mock_server.uri(), dir.path(), &["mathematics"]);
    let outcome = run_crawl(config, false, never_cancel()).await.unwrap();

    assert!(matches!(outcome, CrawlOutcome::Completed { visited: 2 }));
    let lines = output_lines(dir.path());
    assert_eq!(lines.len(), 2);
    assert!(lines.iter().all(|line| !line.starts_with("statistics,")));
    assert!(!dir.path().join("errors.log").exists());
}

#[tokio::test]
async fn test_missing_output_blocks_resume() {
    let mock_server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    mount_math_graph(&mock_server, ResponseTemplate::new(500)).await;

    let config = create_test_config(&mock_server.uri(), dir.path(), &["mathematics"]);
    run_crawl(config.clone(), false, never_cancel()).await.unwrap();
    fs::remove_file(dir.path().join("output.csv")).unwrap();

    let error = run_crawl(config, false, never_cancel()).await.unwrap_err();
    assert_eq!(RunExit::from_error(&error), RunExit::MissingOutput);
    assert_eq!(RunExit::MissingOutput.code(), 66);
}

#[tokio::test]
async fn test_cancellation_then_resume() {
    let mock_server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    mount_math_graph(&mock_server, about(90000, "self", "")).await;

    let config = create_test_config(&mock_server.uri(), dir.path(), &["mathematics"]);
    let (tx, rx) = watch::channel(true);
    let outcome = run_crawl(config.clone(), false, rx).await.unwrap();
    drop(tx);

    assert!(matches!(outcome, CrawlOutcome::Cancelled { visited: 0 }));
    assert_eq!(RunExit::from_outcome(&outcome), RunExit::Cancelled);
    assert!(output_lines(dir.path()).is_empty());
    assert!(!dir.path().join("errors.log").exists());

    let outcome = run_crawl(config, false, never_cancel()).await.unwrap();
    assert!(matches!(outcome, CrawlOutcome::Completed { visited: 3 }));
}

#[tokio::test]
async fn test_fresh_run_rotates_previous_output() {
    let mock_server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    mount_math_graph(&mock_server, about(90000, "self", "")).await;

    let config = create_test_config(&mock_server.uri(), dir.path(), &["mathematics"]);
    run_crawl(config.clone(), false, never_cancel()).await.unwrap();
    let first = output_lines(dir.path());

    let outcome = run_crawl(config, true, never_cancel()).await.unwrap();
    assert!(matches!(outcome, CrawlOutcome::Completed { visited: 3 }));

    let rotated: Vec<_> = fs::read_dir(dir.path())
        .unwrap()
        .map(|entry| entry.unwrap().path())
        .filter(|p| {
            p.file_name()
                .map(|n| n.to_string_lossy().starts_with("output_"))
                .unwrap_or(false)
        })
        .collect();
    assert_eq!(rotated.len(), 1);
    assert_eq!(fs::read_to_string(&rotated[0]).unwrap().lines().count(), first.len());
    assert_eq!(output_lines(dir.path()), first);
}

#[tokio::test]
async fn test_rerun_after_completion_starts_over() {
    let mock_server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    mount_math_graph(&mock_server, about(90000, "self", "")).await;

    let config = create_test_config(&mock_server.uri(), dir.path(), &["mathematics"]);
    run_crawl(config.clone(), false, never_cancel()).await.unwrap();
    let first = output_lines(dir.path());

    let outcome = run_crawl(config, false, never_cancel()).await.unwrap();
    assert!(matches!(outcome, CrawlOutcome::Completed { visited: 3 }));
    assert_eq!(output_lines(dir.path()), first);

    let rotated = fs::read_dir(dir.path())
        .unwrap()
        .filter(|entry| {
            entry
                .as_ref()
                .unwrap()
                .file_name()
                .to_string_lossy()
                .starts_with("output_")
        })
        .count();
    assert_eq!(rotated, 1);
}

#[tokio::test]
async fn test_seeds_from_default_listing() {
    let mock_server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path("/subreddits/default.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "kind": "Listing",
            "data": {"children": [
                {"kind": "t5", "data": {"display_name": "Pics"}},
                {"kind": "t5", "data": {"display_name": "funny"}}
            ]}
        })))
        .expect(1)
        .mount(&mock_server)
        .await;
    mount_node(&mock_server, "pics", about(10, "link", "")).await;
    mount_node(&mock_server, "funny", about(20, "any", "/r/pics")).await;

    let config = create_test_config(&mock_server.uri(), dir.path(), &[]);
    let outcome = run_crawl(config, false, never_cancel()).await.unwrap();

    assert!(matches!(outcome, CrawlOutcome::Completed { visited: 2 }));
    assert_eq!(
        output_lines(dir.path()),
        vec!["funny,20,false,any,pics", "pics,10,false,link,"]
    );

    let cache = fs::read_to_string(dir.path().join("default.json")).unwrap();
    let cached: Vec<String> = serde_json::from_str(&cache).unwrap();
    assert_eq!(cached, vec!["Pics".to_string(), "funny".to_string()]);
}
