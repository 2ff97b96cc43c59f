//! Integration tests for the `yuihub` binary.
//!
//! These tests run the real binary against a mock YuiHub server with an
//! in-memory token store and a temporary state file.

use std::path::Path;

use tempfile::TempDir;
use tokio::process::Command;
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{method, path},
};

/// Helper to run `yuihub` with isolated settings and state.
async fn run_yuihub(server: &MockServer, temp: &Path, args: &[&str]) -> std::process::Output {
    Command::new(env!("CARGO_BIN_EXE_yuihub"))
        .arg("--config")
        .arg(temp.join("settings.toml"))
        .arg("--state-file")
        .arg(temp.join("state.json"))
        .arg("--base-url")
        .arg(server.uri())
        .arg("--no-keyring")
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .await
        .unwrap()
}

#[tokio::test]
async fn test_health_prints_summary() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "ok": true, "version": "2.1.0", "environment": "staging"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let temp = TempDir::new().unwrap();
    let output = run_yuihub(&server, temp.path(), &["health"]).await;

    assert!(output.status.success());
    assert_eq!(
        String::from_utf8_lossy(&output.stdout).trim(),
        "OK version=2.1.0 env=staging"
    );
}

#[tokio::test]
async fn test_unauthorized_prints_token_hint() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(401))
        .expect(2)
        .mount(&server)
        .await;

    let temp = TempDir::new().unwrap();
    std::fs::write(temp.path().join("settings.toml"), "api_key = \"wrong-key\"\n").unwrap();
    let output = run_yuihub(&server, temp.path(), &["health"]).await;

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Unauthorized (401). Set the API token with `yuihub token set`"));
    assert!(!stderr.contains("wrong-key"));
}

#[tokio::test]
async fn test_search_without_hits() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "ok": true, "total": 0, "hits": []
        })))
        .mount(&server)
        .await;

    let temp = TempDir::new().unwrap();
    let output = run_yuihub(&server, temp.path(), &["search", "nothing"]).await;

    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "No hits.");
}

#[tokio::test]
async fn test_issue_thread_becomes_current() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/threads/new"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "ok": true, "data": {"thread": "th-77"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let temp = TempDir::new().unwrap();
    let output = run_yuihub(&server, temp.path(), &["issue-thread"]).await;
    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "Thread: th-77");

    let output = run_yuihub(&server, temp.path(), &["current-thread"]).await;
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "th-77");
}

#[tokio::test]
async fn test_large_document_needs_confirmation() {
    let server = MockServer::start().await;

    let temp = TempDir::new().unwrap();
    std::fs::write(
        temp.path().join("settings.toml"),
        "save_confirm_threshold_bytes = 16\ndefault_thread_id = \"th-1\"\n",
    )
    .unwrap();
    let document = temp.path().join("notes.md");
    std::fs::write(&document, "a document longer than sixteen bytes").unwrap();

    let output = run_yuihub(
        &server,
        temp.path(),
        &["save", "--file", document.to_str().unwrap()],
    )
    .await;

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("--yes"));
    assert!(server.received_requests().await.unwrap().is_empty());
}
