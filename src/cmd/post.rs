//! Single-article command: `postboard post <topic>`.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use indicatif::{ProgressBar, ProgressStyle};

use postboard::board::PostView;
use postboard::client::FlowClient;
use postboard::ui::{DEFAULT_WIDTH, render_post};

pub async fn cmd_post(
    topic: &str,
    audience: Option<&str>,
    server: &str,
    stream: bool,
    json: bool,
) -> Result<()> {
    if topic.is_empty() {
        bail!("Please enter a topic");
    }

    let client = FlowClient::new(server)?;
    let mut view = PostView::new(Arc::new(client));

    let spinner = (!json).then(|| {
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        bar.set_message(if stream {
            "streaming outlines…"
        } else {
            "generating post…"
        });
        bar.enable_steady_tick(Duration::from_millis(100));
        bar
    });

    if stream {
        let mut updates = view.subscribe();
        let watcher = spinner.clone().map(|bar| {
            tokio::spawn(async move {
                while updates.changed().await.is_ok() {
                    let count = updates.borrow_and_update().outlines.len();
                    bar.set_message(format!("streaming outlines… {} so far", count));
                }
            })
        });
        view.generate_streaming(topic, audience).await;
        let state = view.state().clone();
        drop(view);
        if let Some(watcher) = watcher {
            watcher.await.ok();
        }
        return finish(spinner, &state, json);
    }

    view.generate_non_streaming(topic, audience).await;
    let state = view.state().clone();
    finish(spinner, &state, json)
}

fn finish(
    spinner: Option<ProgressBar>,
    state: &postboard::board::PostViewState,
    json: bool,
) -> Result<()> {
    if let Some(bar) = spinner {
        bar.finish_and_clear();
    }
    if json {
        let text = serde_json::to_string_pretty(state).context("Failed to serialize post")?;
        println!("{}", text);
    } else {
        print!("{}", render_post(state, DEFAULT_WIDTH));
    }
    match &state.error {
        Some(error) => bail!("{}", error),
        None => Ok(()),
    }
}
