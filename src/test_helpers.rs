//! Test factories: app state wired to mock upstream servers and an
//! in-memory store, plus canned GitHub / generator payloads.
#![allow(dead_code)]

use std::sync::Arc;

use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::{github, llm, store, AppState, Config};

/// App state backed by a `:memory:` store and the given mock servers.
pub async fn test_state(github_server: &MockServer, llm_server: &MockServer) -> AppState {
    let config = Config {
        database_path: ":memory:".to_string(),
        gemini_api_key: "test-key".to_string(),
        gemini_api_url: llm_server.uri(),
        gemini_model: llm::DEFAULT_MODEL.to_string(),
        github_api_url: github_server.uri(),
        github_token: None,
        server_port: 0,
    };
    AppState {
        store: store::Store::open_in_memory().expect("in-memory store"),
        github: github::GithubClient::new(github_server.uri(), None),
        generator: llm::Generator::new(llm_server.uri(), "test-key", llm::DEFAULT_MODEL),
        config: Arc::new(config),
    }
}

/// A minimal GitHub commit list entry.
pub fn commit_json(sha: &str, message: &str) -> serde_json::Value {
    serde_json::json!({
        "sha": sha,
        "commit": {
            "message": message,
            "author": {"name": "Alice", "date": "2026-08-29T08:00:00Z"}
        },
        "author": {"login": "alice"}
    })
}

/// Serve the given commits for every commits-list request against
/// `acme/widgets` (both the `per_page=1` probe and windowed fetches).
pub async fn mount_commits(server: &MockServer, commits: Vec<serde_json::Value>) {
    Mock::given(method("GET"))
        .and(path("/repos/acme/widgets/commits"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::Value::Array(commits)))
        .mount(server)
        .await;
}

/// Catch-all generator mock wrapping `payload` in a candidate envelope.
pub async fn generator_response(server: &MockServer, payload: serde_json::Value) {
    let envelope = serde_json::json!({
        "candidates": [{
            "content": {"parts": [{"text": payload.to_string()}]}
        }]
    });
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(envelope))
        .mount(server)
        .await;
}
