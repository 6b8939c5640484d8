//! Quarry CLI: the main entry point.
//!
//! Commands:
//! - `agent`   Interactive console, or one task with `--message`
//! - `serve`   Start the `handle_search` HTTP service
//! - `cache`   Inspect or clear the persisted page cache and blacklist

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "quarry",
    about = "Quarry: tool-calling research agent",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run tasks from the console
    Agent {
        /// Run a single task instead of entering interactive mode
        #[arg(short, long)]
        message: Option<String>,
    },

    /// Start the HTTP service
    Serve {
        /// Override the port
        #[arg(short, long, env = "SEARCH_AGENT_PORT")]
        port: Option<u16>,
    },

    /// Inspect the page cache and domain blacklist
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

#[derive(Subcommand)]
enum CacheAction {
    /// List cached pages, newest first
    List,
    /// List blacklisted domains
    Blacklist,
    /// Delete all cached pages and the blacklist
    Clear,
}

fn init_tracing(verbose: bool, json: bool) {
    let filter = if verbose { "debug" } else { "info" };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.json);

    match cli.command {
        Commands::Agent { message } => commands::agent::run(message).await?,
        Commands::Serve { port } => commands::serve::run(port).await?,
        Commands::Cache { action } => match action {
            CacheAction::List => commands::cache::list().await?,
            CacheAction::Blacklist => commands::cache::blacklist().await?,
            CacheAction::Clear => commands::cache::clear()?,
        },
    }

    Ok(())
}
