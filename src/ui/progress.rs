use std::time::{Duration, Instant};

use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::watch;

use crate::board::BoardState;
use crate::ui::icons::{CHECK, CROSS, SPARKLE};

/// How live progress is shown while a board generates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UiMode {
    /// Spinner with running counts
    #[default]
    Full,
    /// One stderr line whenever the counts change
    Minimal,
    /// Nothing until the end
    Quiet,
}

impl std::str::FromStr for UiMode {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_lowercase().as_str() {
            "minimal" => Self::Minimal,
            "quiet" | "none" => Self::Quiet,
            _ => Self::Full,
        })
    }
}

impl UiMode {
    pub fn parse(s: &str) -> Self {
        s.parse().unwrap_or_default()
    }
}

/// Summary counts of a board snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BoardCounts {
    pub columns: usize,
    pub loading_columns: usize,
    pub cards: usize,
    pub complete: usize,
    pub failed: usize,
}

impl BoardCounts {
    pub fn of(state: &BoardState) -> Self {
        let cards = state.columns.iter().flat_map(|c| c.cards.iter());
        Self {
            columns: state.columns.len(),
            loading_columns: state.columns.iter().filter(|c| c.is_loading).count(),
            cards: state.total_cards(),
            complete: cards.clone().filter(|c| c.is_complete()).count(),
            failed: cards.filter(|c| c.error.is_some()).count(),
        }
    }

    fn describe(&self) -> String {
        let mut text = format!(
            "{} columns · {} cards · {} written",
            self.columns, self.cards, self.complete
        );
        if self.loading_columns > 0 {
            text.push_str(&format!(" · {} loading", self.loading_columns));
        }
        if self.failed > 0 {
            text.push_str(&format!(" · {} failed", self.failed));
        }
        text
    }
}

/// Live progress for one board generation, fed from the orchestrator's
/// state channel.
pub struct BoardProgress {
    mode: UiMode,
    spinner: Option<ProgressBar>,
    last: BoardCounts,
    started: Instant,
}

impl BoardProgress {
    pub fn new(mode: UiMode) -> Self {
        let spinner = (mode == UiMode::Full).then(|| {
            let bar = ProgressBar::new_spinner();
            let spinner_style = ProgressStyle::default_spinner()
                .template("{prefix:.bold.dim} {spinner} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner());
            bar.set_style(spinner_style);
            bar.set_prefix("Board");
            bar.set_message("requesting subtopics…");
            bar.enable_steady_tick(Duration::from_millis(100));
            bar
        });
        Self {
            mode,
            spinner,
            last: BoardCounts::default(),
            started: Instant::now(),
        }
    }

    pub fn observe(&mut self, state: &BoardState) {
        let counts = BoardCounts::of(state);
        if counts == self.last {
            return;
        }
        self.last = counts;
        match self.mode {
            UiMode::Full => {
                if let Some(bar) = &self.spinner {
                    bar.set_message(counts.describe());
                }
            }
            UiMode::Minimal => eprintln!("{}", counts.describe()),
            UiMode::Quiet => {}
        }
    }

    pub fn finish(self, state: &BoardState) {
        let counts = BoardCounts::of(state);
        let elapsed = self.started.elapsed().as_secs_f32();
        let line = if state.error.is_some() {
            format!("{}Board failed after {:.1}s", CROSS, elapsed)
        } else if counts.failed > 0 {
            format!(
                "{}{} ({} card(s) failed, {:.1}s)",
                CROSS,
                counts.describe(),
                counts.failed,
                elapsed
            )
        } else {
            format!("{}{} in {:.1}s", CHECK, counts.describe(), elapsed)
        };
        match (self.mode, self.spinner) {
            (UiMode::Full, Some(bar)) => bar.finish_with_message(line),
            (UiMode::Minimal, _) => eprintln!("{} {}", SPARKLE, style(line).bold()),
            _ => {}
        }
    }

    /// Observe every snapshot until the sender is dropped.
    pub async fn follow(mut self, mut updates: watch::Receiver<BoardState>) {
        while updates.changed().await.is_ok() {
            let state = updates.borrow_and_update().clone();
            self.observe(&state);
        }
        let last = updates.borrow().clone();
        self.finish(&last);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::{BoardEvent, ErrorKind, reduce};
    use crate::schema::{PartialPostSummary, PartialSubtopic};

    #[test]
    fn test_ui_mode_parse() {
        assert_eq!(UiMode::parse("minimal"), UiMode::Minimal);
        assert_eq!(UiMode::parse("QUIET"), UiMode::Quiet);
        assert_eq!(UiMode::parse("none"), UiMode::Quiet);
        assert_eq!(UiMode::parse("anything"), UiMode::Full);
    }

    #[test]
    fn test_counts_track_cards() {
        let events = [
            BoardEvent::SubtopicsReceived(vec![
                PartialSubtopic::default(),
                PartialSubtopic::default(),
            ]),
            BoardEvent::SummariesReceived {
                column: 0,
                summaries: vec![PartialPostSummary {
                    id: Some("p1".into()),
                    ..Default::default()
                }],
            },
            BoardEvent::CardFailed {
                column: 0,
                card_id: "p1".into(),
                kind: ErrorKind::Network,
                message: "down".into(),
                at: chrono::Utc::now(),
            },
        ];
        let state = events
            .iter()
            .fold(BoardState::default(), |s, e| reduce(&s, e));

        let counts = BoardCounts::of(&state);
        assert_eq!(counts.columns, 2);
        assert_eq!(counts.loading_columns, 1);
        assert_eq!(counts.cards, 1);
        assert_eq!(counts.complete, 0);
        assert_eq!(counts.failed, 1);
        assert_eq!(
            counts.describe(),
            "2 columns · 1 cards · 0 written · 1 loading · 1 failed"
        );
    }

    #[tokio::test]
    async fn test_follow_ends_when_sender_drops() {
        let (tx, rx) = watch::channel(BoardState::default());
        let handle = tokio::spawn(BoardProgress::new(UiMode::Quiet).follow(rx));
        tx.send_replace(BoardState {
            topic: "Rust".into(),
            ..Default::default()
        });
        drop(tx);
        handle.await.unwrap();
    }
}
