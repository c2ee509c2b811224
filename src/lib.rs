pub mod board;
pub mod client;
pub mod config;
pub mod errors;
pub mod flows;
pub mod logging;
pub mod provider;
pub mod schema;
pub mod server;
pub mod stream;
pub mod ui;
