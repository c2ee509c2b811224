//! Kanban board command: `postboard board <topic>`.

use std::sync::Arc;

use anyhow::{Context, Result};
use console::style;
use tracing::info;

use postboard::board::KanbanOrchestrator;
use postboard::client::FlowClient;
use postboard::ui::{BoardProgress, DEFAULT_WIDTH, UiMode, render_board};

pub struct BoardArgs {
    pub topic: String,
    pub audience: Option<String>,
    pub server: String,
    pub retry_failed: bool,
    pub json: bool,
    pub ui: String,
}

pub async fn cmd_board(args: BoardArgs) -> Result<()> {
    let client = FlowClient::new(&args.server)?;
    info!(server = client.base_url(), "using backend");
    let mut board = KanbanOrchestrator::new(Arc::new(client));

    let mode = if args.json {
        UiMode::Quiet
    } else {
        UiMode::parse(&args.ui)
    };
    let progress = tokio::spawn(BoardProgress::new(mode).follow(board.subscribe()));

    let result = board.generate(&args.topic, args.audience.as_deref()).await;
    if result.is_ok() && args.retry_failed {
        for (column, card_id) in board.state().failed_cards() {
            board.retry_card(column, &card_id).await;
        }
    }

    let state = board.state().clone();
    drop(board);
    if let Err(e) = progress.await {
        tracing::warn!(error = %e, "progress display task failed");
    }
    result?;

    if args.json {
        let text = serde_json::to_string_pretty(&state).context("Failed to serialize board")?;
        println!("{}", text);
    } else {
        let width = console::Term::stdout()
            .size_checked()
            .map(|(_, cols)| cols as usize)
            .unwrap_or(DEFAULT_WIDTH)
            .min(DEFAULT_WIDTH * 2);
        println!();
        print!("{}", render_board(&state, width));
        let failed = state.failed_cards().len();
        if failed > 0 && !args.retry_failed {
            println!();
            println!(
                "{}",
                style(format!(
                    "{} card(s) failed; rerun with --retry-failed to retry them once",
                    failed
                ))
                .dim()
            );
        }
    }
    Ok(())
}
