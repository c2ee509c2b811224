//! Kanban board orchestration.
//!
//! One board generation runs in three stages: a subtopics stream (one
//! column per subtopic), then per column a summaries stream (one
//! placeholder card per summary), then per card a complete-post stream.
//! Columns and cards run concurrently as tasks in a [`JoinSet`]; the tasks
//! never touch the board themselves but send [`BoardEvent`]s back to the
//! driver loop, which is the only place state changes.

use std::sync::Arc;

use chrono::Utc;
use futures::stream::StreamExt;
use serde_json::{Value, json};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use super::classify::{ErrorClassifier, ErrorKind, KeywordClassifier, display_message};
use super::state::{BoardEvent, BoardState, reduce};
use crate::client::{Endpoint, FlowTransport, Update, typed};
use crate::errors::{BoardError, ClientError};
use crate::schema::{
    BlogPost, PartialBlogPost, PartialPostSummary, PartialSubtopic, PostSummary, Subtopic,
};

const TOPIC_MAX: usize = 500;
const AUDIENCE_MAX: usize = 500;

/// A board event tagged with the generation it was issued under.
#[derive(Debug, Clone)]
pub struct Envelope {
    pub generation: u64,
    pub event: BoardEvent,
}

/// Everything a column or card task needs; cheap to clone into each task.
#[derive(Clone)]
struct TaskContext {
    transport: Arc<dyn FlowTransport>,
    classifier: Arc<dyn ErrorClassifier>,
    events: mpsc::UnboundedSender<Envelope>,
    generation: u64,
    topic: String,
    audience: Option<String>,
}

impl TaskContext {
    fn send(&self, event: BoardEvent) {
        let envelope = Envelope {
            generation: self.generation,
            event,
        };
        if self.events.send(envelope).is_err() {
            debug!("board driver gone; dropping event");
        }
    }
}

pub struct KanbanOrchestrator {
    transport: Arc<dyn FlowTransport>,
    classifier: Arc<dyn ErrorClassifier>,
    state: BoardState,
    generation: u64,
    updates: watch::Sender<BoardState>,
}

impl KanbanOrchestrator {
    pub fn new(transport: Arc<dyn FlowTransport>) -> Self {
        Self::with_classifier(transport, Arc::new(KeywordClassifier))
    }

    pub fn with_classifier(
        transport: Arc<dyn FlowTransport>,
        classifier: Arc<dyn ErrorClassifier>,
    ) -> Self {
        let (updates, _) = watch::channel(BoardState::default());
        Self {
            transport,
            classifier,
            state: BoardState::default(),
            generation: 0,
            updates,
        }
    }

    pub fn state(&self) -> &BoardState {
        &self.state
    }

    /// Receive a snapshot after every state change.
    pub fn subscribe(&self) -> watch::Receiver<BoardState> {
        self.updates.subscribe()
    }

    fn apply(&mut self, event: BoardEvent) {
        self.state = reduce(&self.state, &event);
        self.updates.send_replace(self.state.clone());
    }

    /// Apply an event from a task, unless it belongs to an older generation.
    pub fn apply_envelope(&mut self, envelope: Envelope) -> bool {
        if envelope.generation != self.generation {
            debug!(
                stale = envelope.generation,
                current = self.generation,
                "discarding stale board event"
            );
            return false;
        }
        self.apply(envelope.event);
        true
    }

    fn context(&self, events: mpsc::UnboundedSender<Envelope>) -> TaskContext {
        TaskContext {
            transport: Arc::clone(&self.transport),
            classifier: Arc::clone(&self.classifier),
            events,
            generation: self.generation,
            topic: self.state.topic.clone(),
            audience: self.state.audience.clone(),
        }
    }

    /// Generate a full board for `topic`.
    ///
    /// Returns once every column and card stream has finished. Invalid input
    /// and a failed subtopics stream are reported both on the board (as its
    /// top-level error) and as the returned error; summary and post failures
    /// only show up on the board.
    pub async fn generate(
        &mut self,
        topic: &str,
        audience: Option<&str>,
    ) -> Result<(), BoardError> {
        let audience = audience.map(str::trim).filter(|a| !a.is_empty());
        if let Err(message) = check_input(topic, audience) {
            self.apply(BoardEvent::Rejected {
                message: message.clone(),
            });
            return Err(BoardError::InvalidInput(message));
        }

        self.generation += 1;
        info!(generation = self.generation, topic, "generating board");
        self.apply(BoardEvent::Started {
            generation: self.generation,
            topic: topic.to_string(),
            audience: audience.map(str::to_string),
        });

        let subtopics = match self.stream_subtopics().await {
            Ok(subtopics) => subtopics,
            Err(e) => {
                warn!(error = %e, "subtopics stream failed");
                self.apply(BoardEvent::SubtopicsFailed {
                    message: e.to_string(),
                });
                return Err(e.into());
            }
        };

        let (tx, rx) = mpsc::unbounded_channel();
        let mut tasks = JoinSet::new();
        for (column, subtopic) in subtopics.into_iter().enumerate() {
            tasks.spawn(column_task(self.context(tx.clone()), column, subtopic));
        }
        drop(tx);

        self.drive(tasks, rx).await;
        self.apply(BoardEvent::Finished);
        info!(
            generation = self.generation,
            columns = self.state.columns.len(),
            cards = self.state.total_cards(),
            failed = self.state.failed_cards().len(),
            "board complete"
        );
        Ok(())
    }

    /// Regenerate one card from its source summary. Returns `false` when the
    /// card does not exist.
    pub async fn retry_card(&mut self, column: usize, card_id: &str) -> bool {
        let Some(col) = self.state.columns.get(column) else {
            return false;
        };
        let Some(card) = col.card(card_id) else {
            return false;
        };
        let subtopic = col.subtopic.clone();
        let summary = card.source_summary.clone();
        info!(column, card_id, "retrying card");

        self.apply(BoardEvent::RetryRequested {
            column,
            card_id: card_id.to_string(),
        });

        let (tx, rx) = mpsc::unbounded_channel();
        let mut tasks = JoinSet::new();
        tasks.spawn(post_task(
            self.context(tx),
            column,
            subtopic,
            card_id.to_string(),
            summary,
        ));
        self.drive(tasks, rx).await;
        true
    }

    pub fn dismiss_error(&mut self, column: usize, card_id: &str) {
        self.apply(BoardEvent::ErrorDismissed {
            column,
            card_id: card_id.to_string(),
        });
    }

    async fn stream_subtopics(&mut self) -> Result<Vec<Subtopic>, ClientError> {
        let frames = self
            .transport
            .stream(Endpoint::Subtopics, json!({ "topic": self.state.topic }))
            .await?;
        let mut updates = typed::<Vec<PartialSubtopic>, Vec<Subtopic>>(frames);

        while let Some(update) = updates.next().await {
            match update? {
                Update::Partial(partial) => self.apply(BoardEvent::SubtopicsReceived(partial)),
                Update::Final(subtopics) => {
                    self.apply(BoardEvent::SubtopicsReceived(
                        subtopics.iter().cloned().map(PartialSubtopic::from).collect(),
                    ));
                    return Ok(subtopics);
                }
            }
        }
        Err(ClientError::Incomplete)
    }

    /// Apply task events until every task has finished.
    async fn drive(&mut self, mut tasks: JoinSet<()>, mut rx: mpsc::UnboundedReceiver<Envelope>) {
        loop {
            tokio::select! {
                biased;
                Some(envelope) = rx.recv() => {
                    self.apply_envelope(envelope);
                }
                joined = tasks.join_next() => match joined {
                    Some(Ok(())) => {}
                    Some(Err(e)) => warn!(error = %e, "board task panicked or was cancelled"),
                    None => break,
                },
            }
        }
        while let Ok(envelope) = rx.try_recv() {
            self.apply_envelope(envelope);
        }
    }
}

fn check_input(topic: &str, audience: Option<&str>) -> Result<(), String> {
    if topic.is_empty() {
        return Err("Please enter a topic".to_string());
    }
    if topic.chars().count() > TOPIC_MAX {
        return Err(format!("Topic must be less than {} characters", TOPIC_MAX));
    }
    if audience.is_some_and(|a| a.chars().count() > AUDIENCE_MAX) {
        return Err(format!(
            "Audience must be less than {} characters",
            AUDIENCE_MAX
        ));
    }
    Ok(())
}

async fn column_task(ctx: TaskContext, column: usize, subtopic: Subtopic) {
    let summaries = match stream_summaries(&ctx, column, &subtopic).await {
        Ok(summaries) => summaries,
        Err(e) => {
            warn!(column, subtopic = %subtopic.title, error = %e, "summaries stream failed");
            let message = display_message(&e.to_string(), ErrorKind::Summary);
            ctx.send(BoardEvent::SummariesFailed { column, message });
            return;
        }
    };

    let posts = summaries.into_iter().map(|summary| {
        post_task(
            ctx.clone(),
            column,
            subtopic.title.clone(),
            summary.id,
            summary.summary,
        )
    });
    futures::future::join_all(posts).await;
}

async fn stream_summaries(
    ctx: &TaskContext,
    column: usize,
    subtopic: &Subtopic,
) -> Result<Vec<PostSummary>, ClientError> {
    let input = json!({
        "topic": ctx.topic,
        "subtopic": subtopic.title,
        "description": subtopic.description,
    });
    let frames = ctx.transport.stream(Endpoint::PostSummaries, input).await?;
    let mut updates = typed::<Vec<PartialPostSummary>, Vec<PostSummary>>(frames);

    while let Some(update) = updates.next().await {
        match update? {
            Update::Partial(summaries) => {
                ctx.send(BoardEvent::SummariesReceived { column, summaries })
            }
            Update::Final(summaries) => {
                ctx.send(BoardEvent::SummariesReceived {
                    column,
                    summaries: summaries.iter().cloned().map(Into::into).collect(),
                });
                return Ok(summaries);
            }
        }
    }
    Err(ClientError::Incomplete)
}

async fn post_task(
    ctx: TaskContext,
    column: usize,
    subtopic: String,
    card_id: String,
    summary: String,
) {
    let mut input = json!({
        "topic": ctx.topic,
        "subtopic": subtopic,
        "summary": summary,
    });
    if let Some(audience) = &ctx.audience {
        input["audience"] = Value::String(audience.clone());
    }

    if let Err(e) = stream_post(&ctx, column, &card_id, input).await {
        let message = e.to_string();
        let kind = ctx.classifier.classify(&message, ErrorKind::Post);
        warn!(column, card_id = %card_id, kind = %kind, error = %message, "post stream failed");
        ctx.send(BoardEvent::CardFailed {
            column,
            card_id,
            kind,
            message: display_message(&message, kind),
            at: Utc::now(),
        });
    }
}

async fn stream_post(
    ctx: &TaskContext,
    column: usize,
    card_id: &str,
    input: Value,
) -> Result<(), ClientError> {
    let frames = ctx.transport.stream(Endpoint::Post, input).await?;
    let mut updates = typed::<PartialBlogPost, BlogPost>(frames);

    while let Some(update) = updates.next().await {
        let post = match update? {
            Update::Partial(post) => post,
            Update::Final(post) => post.into(),
        };
        ctx.send(BoardEvent::PostChunk {
            column,
            card_id: card_id.to_string(),
            post,
        });
    }
    Ok(())
}
