//! CLI command implementations.
//!
//! | Module  | Command |
//! |---------|---------|
//! | `serve` | `Serve` |
//! | `board` | `Board` |
//! | `post`  | `Post`  |

pub mod board;
pub mod post;
pub mod serve;

pub use board::{BoardArgs, cmd_board};
pub use post::cmd_post;
pub use serve::cmd_serve;
