use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use postboard::client::DEFAULT_SERVER_URL;

mod cmd;

#[derive(Parser)]
#[command(name = "postboard")]
#[command(version, about = "LLM blog generator: streaming flow backend and kanban board")]
pub struct Cli {
    /// Raise the log level to debug
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the HTTP backend
    Serve {
        /// Port to listen on (overrides PORT)
        #[arg(short, long)]
        port: Option<u16>,

        /// Address to bind (overrides HOST)
        #[arg(long)]
        host: Option<String>,

        /// Config file (defaults to ./postboard.toml when present)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Answer from canned demo content instead of calling Gemini
        #[arg(long)]
        offline: bool,
    },
    /// Generate a kanban board of blog posts for a topic
    Board {
        /// Main topic of the board
        topic: String,

        /// Target audience for the posts
        #[arg(short, long)]
        audience: Option<String>,

        /// Backend base URL
        #[arg(long, env = "POSTBOARD_SERVER", default_value = DEFAULT_SERVER_URL)]
        server: String,

        /// Retry every failed card once after the board finishes
        #[arg(long)]
        retry_failed: bool,

        /// Print the final board as JSON
        #[arg(long)]
        json: bool,

        /// Live progress: full, minimal, quiet
        #[arg(long, default_value = "full")]
        ui: String,
    },
    /// Generate a single article view for a topic
    Post {
        /// Topic of the post
        topic: String,

        /// Target audience
        #[arg(short, long)]
        audience: Option<String>,

        /// Backend base URL
        #[arg(long, env = "POSTBOARD_SERVER", default_value = DEFAULT_SERVER_URL)]
        server: String,

        /// Stream six outlines instead of one structured post
        #[arg(long)]
        stream: bool,

        /// Print the final view as JSON
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve {
            port,
            host,
            config,
            offline,
        } => cmd::cmd_serve(cli.verbose, port, host, config, offline).await?,
        Commands::Board {
            topic,
            audience,
            server,
            retry_failed,
            json,
            ui,
        } => {
            postboard::logging::init(cli.verbose, false);
            cmd::cmd_board(cmd::BoardArgs {
                topic,
                audience,
                server,
                retry_failed,
                json,
                ui,
            })
            .await?
        }
        Commands::Post {
            topic,
            audience,
            server,
            stream,
            json,
        } => {
            postboard::logging::init(cli.verbose, false);
            cmd::cmd_post(&topic, audience.as_deref(), &server, stream, json).await?
        }
    }

    Ok(())
}
