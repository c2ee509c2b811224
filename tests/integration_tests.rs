//! Integration tests for postboard
//!
//! A real server on an ephemeral port, backed by a scripted model provider,
//! exercised through the flow client, the board orchestrator, raw HTTP and
//! the compiled binary.

use std::net::SocketAddr;
use std::sync::Arc;

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::sync::oneshot;

use postboard::board::KanbanOrchestrator;
use postboard::client::{Endpoint, FlowClient, FlowTransport};
use postboard::config::Settings;
use postboard::errors::ProviderError;
use postboard::provider::ScriptedProvider;
use postboard::server::serve_on;

/// Helper to create a postboard Command
fn postboard() -> Command {
    cargo_bin_cmd!("postboard")
}

fn blog_post(title: &str) -> Value {
    json!({
        "title": title,
        "summary": "How the multi-threaded scheduler keeps workers busy.",
        "mainPoints": ["Local run queues", "Stealing half a queue", "The LIFO slot"],
        "readingTime": 7,
        "tags": ["rust", "tokio", "async"],
        "content": "Tokio runs one worker per core."
    })
}

fn scripted() -> ScriptedProvider {
    ScriptedProvider::new()
        .with_fragment_len(9)
        .respond(
            "subtopics for the main topic",
            json!([{"id": "s1", "title": "Executors", "description": "How futures are polled"}]),
        )
        .respond(
            "blog post ideas",
            json!([{"id": "p1", "summary": "Work stealing explained", "readingTime": 7}]),
        )
        .respond(
            "complete, well-structured blog post",
            blog_post("Work Stealing in Tokio"),
        )
        .respond(
            "six detailed blog post outlines",
            json!([blog_post("One"), blog_post("Two")]),
        )
        .fail(
            "Create a detailed blog post outline about",
            ProviderError::Status {
                status: 503,
                body: "model overloaded".into(),
            },
        )
}

/// Running server; shuts down when dropped.
struct TestServer {
    addr: SocketAddr,
    _shutdown: oneshot::Sender<()>,
}

impl TestServer {
    async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, rx) = oneshot::channel::<()>();
        tokio::spawn(serve_on(
            listener,
            Settings::default(),
            Arc::new(scripted()),
            async move {
                rx.await.ok();
            },
        ));
        Self {
            addr,
            _shutdown: tx,
        }
    }

    fn url(&self) -> String {
        format!("http://{}", self.addr)
    }
}

// =============================================================================
// Board over a real server
// =============================================================================

mod board_end_to_end {
    use super::*;

    #[tokio::test]
    async fn test_rust_async_runtimes_board() {
        let server = TestServer::start().await;
        let client = FlowClient::new(server.url()).unwrap();
        let mut board = KanbanOrchestrator::new(Arc::new(client));

        board
            .generate("Rust async runtimes", Some("backend engineers"))
            .await
            .unwrap();

        let state = board.state();
        assert!(state.error.is_none());
        assert!(!state.is_generating);
        assert_eq!(state.columns.len(), 1);

        let column = &state.columns[0];
        assert_eq!(column.subtopic, "Executors");
        assert!(!column.is_loading);
        assert_eq!(column.cards.len(), 1);

        let card = &column.cards[0];
        assert_eq!(card.id, "p1");
        assert!(card.is_complete());
        assert_eq!(card.title.as_deref(), Some("Work Stealing in Tokio"));
        assert_eq!(card.reading_time, Some(7.0));
        assert_eq!(card.source_summary, "Work stealing explained");
        assert!(card.error.is_none());
    }

    #[tokio::test]
    async fn test_empty_topic_never_reaches_server() {
        let server = TestServer::start().await;
        let client = FlowClient::new(server.url()).unwrap();
        let mut board = KanbanOrchestrator::new(Arc::new(client));

        let err = board.generate("", None).await.unwrap_err();
        assert_eq!(err.to_string(), "Please enter a topic");
        assert!(board.state().columns.is_empty());
    }
}

// =============================================================================
// Flow client against the wire format
// =============================================================================

mod flow_client {
    use super::*;
    use futures::StreamExt;
    use postboard::client::StreamFrame;

    #[tokio::test]
    async fn test_stream_ends_with_result_frame() {
        let server = TestServer::start().await;
        let client = FlowClient::new(server.url()).unwrap();

        let frames: Vec<_> = client
            .stream(Endpoint::Subtopics, json!({"topic": "Rust"}))
            .await
            .unwrap()
            .collect()
            .await;

        assert!(frames.len() > 1);
        assert!(frames[..frames.len() - 1]
            .iter()
            .all(|f| matches!(f, Ok(StreamFrame::Chunk(_)))));
        match frames.last() {
            Some(Ok(StreamFrame::Result(value))) => assert_eq!(value[0]["title"], "Executors"),
            other => panic!("unexpected last frame {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_validation_error_surfaces_as_status() {
        let server = TestServer::start().await;
        let client = FlowClient::new(server.url()).unwrap();

        let err = match client.stream(Endpoint::Subtopics, json!({"topic": ""})).await {
            Err(e) => e,
            Ok(_) => panic!("expected a 400"),
        };
        assert_eq!(err.to_string(), "Topic is required");
    }

    #[tokio::test]
    async fn test_non_streaming_call_returns_result() {
        let server = TestServer::start().await;
        let client = FlowClient::new(server.url()).unwrap();

        let value = client
            .call(Endpoint::AnalyzeBlogPost, json!({"topic": "Rust"}))
            .await
            .unwrap();
        assert_eq!(value.as_array().unwrap().len(), 2);
    }
}

// =============================================================================
// Raw HTTP surface
// =============================================================================

mod http_surface {
    use super::*;

    #[tokio::test]
    async fn test_structured_output_failure_is_json_500() {
        let server = TestServer::start().await;
        let response = reqwest::Client::new()
            .post(format!("{}/api/blog/structured-output", server.url()))
            .json(&json!({"topic": "Rust"}))
            .send()
            .await
            .unwrap();

        assert_eq!(response.status().as_u16(), 500);
        let body: Value = response.json().await.unwrap();
        assert_eq!(body["status"], 500);
        assert!(body["error"].as_str().unwrap().contains("503"));
        assert!(body.get("data").is_none());
    }

    #[tokio::test]
    async fn test_health_and_unknown_route() {
        let server = TestServer::start().await;
        let http = reqwest::Client::new();

        let health: Value = http
            .get(format!("{}/health", server.url()))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(health["status"], "OK");
        assert!(health["timestamp"].is_string());

        let missing = http
            .get(format!("{}/api/nope", server.url()))
            .send()
            .await
            .unwrap();
        assert_eq!(missing.status().as_u16(), 404);
        assert!(missing.headers().contains_key("x-request-id"));
    }

    #[tokio::test]
    async fn test_stream_query_parameter_negotiates_sse() {
        let server = TestServer::start().await;
        let response = reqwest::Client::new()
            .post(format!("{}/api/blog/post?stream=true", server.url()))
            .json(&json!({"data": {"topic": "Rust", "subtopic": "Executors", "summary": "Work stealing"}}))
            .send()
            .await
            .unwrap();

        assert_eq!(response.status().as_u16(), 200);
        let content_type = response.headers()["content-type"].to_str().unwrap().to_string();
        assert!(content_type.starts_with("text/event-stream"));
        let text = response.text().await.unwrap();
        assert!(text.contains("data: {\"message\""));
        assert!(text.contains("data: {\"result\""));
    }
}

// =============================================================================
// Binary
// =============================================================================

mod cli_basics {
    use super::*;

    #[test]
    fn test_postboard_help() {
        postboard()
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("serve"))
            .stdout(predicate::str::contains("board"));
    }

    #[test]
    fn test_postboard_version() {
        postboard().arg("--version").assert().success();
    }

    #[test]
    fn test_board_rejects_empty_topic() {
        postboard()
            .args(["board", "", "--server", "http://127.0.0.1:9", "--ui", "quiet"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Please enter a topic"));
    }

    #[test]
    fn test_serve_requires_api_key() {
        let dir = tempfile::TempDir::new().unwrap();
        postboard()
            .current_dir(dir.path())
            .env_remove("GEMINI_API_KEY")
            .args(["serve", "--port", "0"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("GEMINI_API_KEY"));
    }

    #[test]
    fn test_serve_rejects_bad_config_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("postboard.toml");
        std::fs::write(&path, "[server]\nunknown = 1\n").unwrap();
        postboard()
            .current_dir(dir.path())
            .args(["serve", "--config"])
            .arg(&path)
            .assert()
            .failure()
            .stderr(predicate::str::contains("Failed to parse config file"));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_board_command_prints_json_board() {
        let server = TestServer::start().await;
        let url = server.url();

        let output = tokio::task::spawn_blocking(move || {
            postboard()
                .args(["board", "Rust async runtimes", "--json", "--server"])
                .arg(url)
                .output()
                .unwrap()
        })
        .await
        .unwrap();

        assert!(output.status.success());
        let board: Value = serde_json::from_slice(&output.stdout).unwrap();
        assert_eq!(board["topic"], "Rust async runtimes");
        assert_eq!(board["columns"][0]["subtopic"], "Executors");
        assert_eq!(board["columns"][0]["cards"][0]["id"], "p1");
        assert_eq!(board["columns"][0]["cards"][0]["readingTime"], 7);
    }
}
