//! Client-side board model: the kanban orchestrator, its reducer, card error
//! classification, and the single-article view.

pub mod classify;
pub mod orchestrator;
pub mod post_view;
pub mod state;

pub use classify::{ErrorClassifier, ErrorKind, KeywordClassifier};
pub use orchestrator::KanbanOrchestrator;
pub use post_view::{PostView, PostViewState};
pub use state::{BoardEvent, BoardState, Card, CardError, Column, reduce};
