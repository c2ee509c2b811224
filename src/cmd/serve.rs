//! HTTP backend command: `postboard serve`.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use serde_json::json;
use tracing::info;

use postboard::config::Settings;
use postboard::provider::{GeminiProvider, ModelProvider, ScriptedProvider};

pub async fn cmd_serve(
    verbose: bool,
    port: Option<u16>,
    host: Option<String>,
    config: Option<PathBuf>,
    offline: bool,
) -> Result<()> {
    let mut settings = Settings::load(config.as_deref()).context("Failed to load settings")?;
    if let Some(port) = port {
        settings.port = port;
    }
    if let Some(host) = host {
        settings.host = host;
    }
    postboard::logging::init(verbose, settings.is_production());

    let provider: Arc<dyn ModelProvider> = if offline {
        info!("serving canned demo content; Gemini will not be called");
        Arc::new(demo_provider())
    } else {
        settings.require_api_key()?;
        Arc::new(GeminiProvider::from_settings(&settings)?)
    };

    postboard::server::start_server(settings, provider).await
}

/// Canned answers keyed on phrases from each flow's prompt.
fn demo_provider() -> ScriptedProvider {
    let post = json!({
        "title": "Work Stealing in Tokio",
        "summary": "How the multi-threaded scheduler keeps every worker busy by \
                    taking tasks from its neighbours.",
        "mainPoints": [
            "Each worker owns a local run queue",
            "Idle workers steal half of a busy queue",
            "The LIFO slot favours freshly woken tasks",
            "A global injection queue handles tasks spawned from outside",
            "Cooperative budgeting keeps tasks from hogging a worker"
        ],
        "readingTime": 7,
        "tags": ["rust", "tokio", "async", "scheduling", "performance"],
        "content": "Tokio's multi-threaded runtime runs one worker per core.\n\n\
                    When a worker runs out of tasks it picks a random sibling and \
                    takes half of its queue."
    });

    ScriptedProvider::new()
        .respond(
            "subtopics for the main topic",
            json!([
                {"id": "executors", "title": "Executors", "description": "How futures get polled to completion"},
                {"id": "reactors", "title": "Reactors", "description": "Turning OS readiness events into wakeups"},
                {"id": "timers", "title": "Timers", "description": "Hierarchical timer wheels and sleeping tasks"}
            ]),
        )
        .respond(
            "blog post ideas",
            json!([
                {"id": "stealing", "title": "Work Stealing", "summary": "Why idle workers raid their neighbours.", "readingTime": 7},
                {"id": "budgets", "title": "Cooperative Budgets", "summary": "How a task is made to yield.", "readingTime": 5}
            ]),
        )
        .respond("complete, well-structured blog post", post.clone())
        .respond(
            "six detailed blog post outlines",
            json!(std::iter::repeat_n(post.clone(), 6).collect::<Vec<_>>()),
        )
        .respond("Create a detailed blog post outline about", post)
}
