//! Board model and its reducer.
//!
//! All board mutation goes through [`reduce`]: the orchestrator turns every
//! stream update into a [`BoardEvent`] and folds it into a fresh
//! [`BoardState`]. The reducer is pure so it can be tested without any
//! transport.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::classify::ErrorKind;
use crate::schema::blog::minutes;
use crate::schema::{PartialBlogPost, PartialPostSummary, PartialSubtopic};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardError {
    #[serde(rename = "type")]
    pub kind: ErrorKind,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub retry_count: u32,
}

/// A blog post as far as it has been generated, keyed by the id of the
/// summary it came from.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Card {
    pub id: String,
    /// Summary text the card was created from; retries regenerate from it.
    pub source_summary: String,
    pub title: Option<String>,
    pub summary: Option<String>,
    #[serde(serialize_with = "minutes::serialize_opt")]
    pub reading_time: Option<f64>,
    pub tags: Option<Vec<String>>,
    pub main_points: Option<Vec<String>>,
    pub content: Option<String>,
    pub retry_count: u32,
    pub error: Option<CardError>,
}

impl Card {
    fn placeholder(id: String, summary: String) -> Self {
        Self {
            id,
            source_summary: summary.clone(),
            summary: Some(summary),
            ..Default::default()
        }
    }

    /// Every post field has arrived.
    pub fn is_complete(&self) -> bool {
        self.title.is_some()
            && self.summary.is_some()
            && self.reading_time.is_some()
            && self.tags.is_some()
            && self.main_points.is_some()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Column {
    pub id: String,
    pub subtopic: String,
    pub description: String,
    pub cards: Vec<Card>,
    pub is_loading: bool,
    pub error: Option<String>,
}

impl Column {
    pub fn card(&self, card_id: &str) -> Option<&Card> {
        self.cards.iter().find(|c| c.id == card_id)
    }

    fn card_mut(&mut self, card_id: &str) -> Option<&mut Card> {
        self.cards.iter_mut().find(|c| c.id == card_id)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardState {
    pub topic: String,
    pub audience: Option<String>,
    pub columns: Vec<Column>,
    pub is_generating: bool,
    pub error: Option<String>,
    /// Token of the generation this state belongs to.
    pub generation: u64,
}

impl BoardState {
    pub fn total_cards(&self) -> usize {
        self.columns.iter().map(|c| c.cards.len()).sum()
    }

    pub fn card(&self, column: usize, card_id: &str) -> Option<&Card> {
        self.columns.get(column).and_then(|c| c.card(card_id))
    }

    /// `(column index, card id)` of every card currently showing an error.
    pub fn failed_cards(&self) -> Vec<(usize, String)> {
        self.columns
            .iter()
            .enumerate()
            .flat_map(|(i, col)| {
                col.cards
                    .iter()
                    .filter(|c| c.error.is_some())
                    .map(move |c| (i, c.id.clone()))
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum BoardEvent {
    /// A new generation begins; everything from earlier generations is dropped.
    Started {
        generation: u64,
        topic: String,
        audience: Option<String>,
    },
    /// Input was refused before any request was made.
    Rejected { message: String },
    SubtopicsReceived(Vec<PartialSubtopic>),
    SubtopicsFailed { message: String },
    SummariesReceived {
        column: usize,
        summaries: Vec<PartialPostSummary>,
    },
    SummariesFailed { column: usize, message: String },
    PostChunk {
        column: usize,
        card_id: String,
        post: PartialBlogPost,
    },
    CardFailed {
        column: usize,
        card_id: String,
        kind: ErrorKind,
        message: String,
        at: DateTime<Utc>,
    },
    RetryRequested { column: usize, card_id: String },
    ErrorDismissed { column: usize, card_id: String },
    Finished,
}

pub fn reduce(state: &BoardState, event: &BoardEvent) -> BoardState {
    let mut next = state.clone();
    match event {
        BoardEvent::Started {
            generation,
            topic,
            audience,
        } => {
            next = BoardState {
                topic: topic.clone(),
                audience: audience.clone(),
                columns: Vec::new(),
                is_generating: true,
                error: None,
                generation: *generation,
            };
        }
        BoardEvent::Rejected { message } => {
            next.error = Some(message.clone());
            next.is_generating = false;
        }
        BoardEvent::SubtopicsReceived(subtopics) => {
            next.columns = subtopics
                .iter()
                .enumerate()
                .map(|(i, sub)| Column {
                    id: sub.id.clone().unwrap_or_else(|| format!("column-{}", i)),
                    subtopic: sub.title.clone().unwrap_or_default(),
                    description: sub.description.clone().unwrap_or_default(),
                    cards: Vec::new(),
                    is_loading: true,
                    error: None,
                })
                .collect();
        }
        BoardEvent::SubtopicsFailed { message } => {
            next.error = Some(message.clone());
            next.is_generating = false;
        }
        BoardEvent::SummariesReceived { column, summaries } => {
            if let Some(col) = next.columns.get_mut(*column) {
                col.cards = summaries
                    .iter()
                    .enumerate()
                    .map(|(i, s)| {
                        Card::placeholder(
                            s.id.clone().unwrap_or_else(|| format!("{}-{}", col.id, i)),
                            s.summary.clone().unwrap_or_default(),
                        )
                    })
                    .collect();
                col.is_loading = false;
                col.error = None;
            }
        }
        BoardEvent::SummariesFailed { column, message } => {
            if let Some(col) = next.columns.get_mut(*column) {
                col.error = Some(message.clone());
                col.is_loading = false;
            }
        }
        BoardEvent::PostChunk {
            column,
            card_id,
            post,
        } => {
            if let Some(col) = next.columns.get_mut(*column) {
                let (source_summary, retry_count) = match col.card(card_id) {
                    Some(existing) => (existing.source_summary.clone(), existing.retry_count),
                    None => (post.summary.clone().unwrap_or_default(), 0),
                };
                let card = Card {
                    id: card_id.clone(),
                    source_summary,
                    title: post.title.clone(),
                    summary: post.summary.clone(),
                    reading_time: post.reading_time,
                    tags: post.tags.clone(),
                    main_points: post.main_points.clone(),
                    content: post.content.clone(),
                    retry_count,
                    error: None,
                };
                match col.card_mut(card_id) {
                    Some(slot) => *slot = card,
                    None => col.cards.push(card),
                }
            }
        }
        BoardEvent::CardFailed {
            column,
            card_id,
            kind,
            message,
            at,
        } => {
            if let Some(card) = next
                .columns
                .get_mut(*column)
                .and_then(|c| c.card_mut(card_id))
            {
                card.error = Some(CardError {
                    kind: *kind,
                    message: message.clone(),
                    timestamp: *at,
                    retry_count: card.retry_count,
                });
            }
        }
        BoardEvent::RetryRequested { column, card_id } => {
            if let Some(card) = next
                .columns
                .get_mut(*column)
                .and_then(|c| c.card_mut(card_id))
                && let Some(error) = card.error.as_mut()
            {
                card.retry_count += 1;
                error.retry_count = card.retry_count;
            }
        }
        BoardEvent::ErrorDismissed { column, card_id } => {
            if let Some(card) = next
                .columns
                .get_mut(*column)
                .and_then(|c| c.card_mut(card_id))
            {
                card.error = None;
            }
        }
        BoardEvent::Finished => {
            next.is_generating = false;
        }
    }
    next
}

#[cfg(test)]
mod tests {
    use super::*;

    fn subtopic(id: &str, title: &str) -> PartialSubtopic {
        PartialSubtopic {
            id: Some(id.into()),
            title: Some(title.into()),
            description: Some(format!("{} description", title)),
        }
    }

    fn summary(id: &str, text: &str) -> PartialPostSummary {
        PartialPostSummary {
            id: Some(id.into()),
            summary: Some(text.into()),
            ..Default::default()
        }
    }

    fn board_with_card() -> BoardState {
        let events = [
            BoardEvent::Started {
                generation: 1,
                topic: "Rust async runtimes".into(),
                audience: None,
            },
            BoardEvent::SubtopicsReceived(vec![subtopic("s1", "Executors")]),
            BoardEvent::SummariesReceived {
                column: 0,
                summaries: vec![summary("p1", "Work stealing")],
            },
        ];
        events
            .iter()
            .fold(BoardState::default(), |state, event| reduce(&state, event))
    }

    fn failure(message: &str) -> BoardEvent {
        BoardEvent::CardFailed {
            column: 0,
            card_id: "p1".into(),
            kind: ErrorKind::Post,
            message: message.into(),
            at: Utc::now(),
        }
    }

    fn retry() -> BoardEvent {
        BoardEvent::RetryRequested {
            column: 0,
            card_id: "p1".into(),
        }
    }

    #[test]
    fn test_subtopic_chunks_replace_columns_wholesale() {
        let state = reduce(
            &BoardState::default(),
            &BoardEvent::SubtopicsReceived(vec![subtopic("s1", "Exec")]),
        );
        let state = reduce(
            &state,
            &BoardEvent::SubtopicsReceived(vec![
                subtopic("s1", "Executors"),
                PartialSubtopic::default(),
            ]),
        );
        assert_eq!(state.columns.len(), 2);
        assert_eq!(state.columns[0].subtopic, "Executors");
        assert!(state.columns[0].cards.is_empty());
        assert!(state.columns[0].is_loading);
        assert_eq!(state.columns[1].id, "column-1");
        assert_eq!(state.columns[1].subtopic, "");
    }

    #[test]
    fn test_summaries_create_placeholders_and_stop_loading() {
        let state = board_with_card();
        let col = &state.columns[0];
        assert!(!col.is_loading);
        assert_eq!(col.cards.len(), 1);
        let card = &col.cards[0];
        assert_eq!(card.id, "p1");
        assert_eq!(card.summary.as_deref(), Some("Work stealing"));
        assert_eq!(card.source_summary, "Work stealing");
        assert_eq!(card.title, None);
        assert_eq!(card.reading_time, None);
        assert_eq!(card.tags, None);
    }

    #[test]
    fn test_post_chunks_replace_card_wholesale() {
        let state = board_with_card();
        let state = reduce(
            &state,
            &BoardEvent::PostChunk {
                column: 0,
                card_id: "p1".into(),
                post: PartialBlogPost {
                    title: Some("Work stealing".into()),
                    tags: Some(vec!["rust".into()]),
                    ..Default::default()
                },
            },
        );
        let state = reduce(
            &state,
            &BoardEvent::PostChunk {
                column: 0,
                card_id: "p1".into(),
                post: PartialBlogPost {
                    title: Some("Work stealing in tokio".into()),
                    ..Default::default()
                },
            },
        );
        let card = state.card(0, "p1").unwrap();
        assert_eq!(card.title.as_deref(), Some("Work stealing in tokio"));
        assert_eq!(card.tags, None);
        assert_eq!(card.summary, None);
        assert_eq!(card.source_summary, "Work stealing");
        assert_eq!(state.columns[0].cards.len(), 1);
    }

    #[test]
    fn test_post_chunk_for_unknown_card_appends() {
        let state = reduce(
            &board_with_card(),
            &BoardEvent::PostChunk {
                column: 0,
                card_id: "p9".into(),
                post: PartialBlogPost {
                    summary: Some("Late arrival".into()),
                    ..Default::default()
                },
            },
        );
        assert_eq!(state.columns[0].cards.len(), 2);
        assert_eq!(state.columns[0].cards[1].id, "p9");
        assert_eq!(state.columns[0].cards[1].source_summary, "Late arrival");
    }

    #[test]
    fn test_failure_keeps_last_fields() {
        let state = reduce(&board_with_card(), &failure("quota exceeded"));
        let card = state.card(0, "p1").unwrap();
        let error = card.error.as_ref().unwrap();
        assert_eq!(error.kind, ErrorKind::Post);
        assert_eq!(error.message, "quota exceeded");
        assert_eq!(error.retry_count, 0);
        assert_eq!(card.summary.as_deref(), Some("Work stealing"));
    }

    #[test]
    fn test_retry_increments_exactly_once_only_with_error() {
        let state = reduce(&board_with_card(), &retry());
        assert_eq!(state.card(0, "p1").unwrap().retry_count, 0);

        let state = reduce(&state, &failure("boom"));
        let state = reduce(&state, &retry());
        let card = state.card(0, "p1").unwrap();
        assert_eq!(card.retry_count, 1);
        assert_eq!(card.error.as_ref().unwrap().retry_count, 1);
    }

    #[test]
    fn test_successful_chunk_clears_error_and_keeps_retry_count() {
        let state = reduce(&board_with_card(), &failure("boom"));
        let state = reduce(&state, &retry());
        let state = reduce(
            &state,
            &BoardEvent::PostChunk {
                column: 0,
                card_id: "p1".into(),
                post: PartialBlogPost {
                    title: Some("T".into()),
                    ..Default::default()
                },
            },
        );
        let card = state.card(0, "p1").unwrap();
        assert!(card.error.is_none());
        assert_eq!(card.retry_count, 1);
    }

    #[test]
    fn test_repeat_failure_carries_retry_count() {
        let state = reduce(&board_with_card(), &failure("first"));
        let state = reduce(&state, &retry());
        let state = reduce(&state, &failure("second"));
        let error = state.card(0, "p1").unwrap().error.clone().unwrap();
        assert_eq!(error.message, "second");
        assert_eq!(error.retry_count, 1);
    }

    #[test]
    fn test_dismiss_clears_without_incrementing() {
        let state = reduce(&board_with_card(), &failure("boom"));
        let state = reduce(
            &state,
            &BoardEvent::ErrorDismissed {
                column: 0,
                card_id: "p1".into(),
            },
        );
        let card = state.card(0, "p1").unwrap();
        assert!(card.error.is_none());
        assert_eq!(card.retry_count, 0);
    }

    #[test]
    fn test_summary_failure_is_column_level() {
        let state = reduce(
            &board_with_card(),
            &BoardEvent::SummariesFailed {
                column: 0,
                message: "network down".into(),
            },
        );
        assert_eq!(state.columns[0].error.as_deref(), Some("network down"));
        assert!(!state.columns[0].is_loading);
        assert!(state.error.is_none());
    }

    #[test]
    fn test_started_clears_previous_board() {
        let state = reduce(&board_with_card(), &failure("boom"));
        let state = reduce(
            &state,
            &BoardEvent::Started {
                generation: 2,
                topic: "Other".into(),
                audience: Some("students".into()),
            },
        );
        assert!(state.columns.is_empty());
        assert_eq!(state.total_cards(), 0);
        assert_eq!(state.generation, 2);
        assert!(state.is_generating);
    }

    #[test]
    fn test_out_of_range_column_is_ignored() {
        let before = board_with_card();
        let after = reduce(
            &before,
            &BoardEvent::SummariesReceived {
                column: 7,
                summaries: vec![summary("x", "y")],
            },
        );
        assert_eq!(before, after);
    }

    #[test]
    fn test_failed_cards_lists_errors() {
        let state = reduce(&board_with_card(), &failure("boom"));
        assert_eq!(state.failed_cards(), vec![(0, "p1".to_string())]);
    }

    #[test]
    fn test_card_serializes_camel_case_with_error_type() {
        let state = reduce(&board_with_card(), &failure("boom"));
        let value = serde_json::to_value(state.card(0, "p1").unwrap()).unwrap();
        assert_eq!(value["sourceSummary"], "Work stealing");
        assert_eq!(value["retryCount"], 0);
        assert_eq!(value["error"]["type"], "post");
        assert_eq!(value["error"]["retryCount"], 0);
    }
}
