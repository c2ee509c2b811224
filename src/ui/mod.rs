//! Terminal presentation: icons, live progress and board rendering.

pub mod icons;
pub mod progress;
pub mod render;

pub use progress::{BoardCounts, BoardProgress, UiMode};
pub use render::{DEFAULT_WIDTH, render_board, render_post};
