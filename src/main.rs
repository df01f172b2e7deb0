//! # QA Harness CLI (`qa`)
//!
//! ## Usage
//!
//! ```bash
//! qa --config ./config/qa.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `qa init` | Create the SQLite database and run schema migrations |
//! | `qa add <question> [answer]` | Add an entry (`"question - answer"` also accepted) |
//! | `qa remove <question>` | Remove entries whose question matches exactly |
//! | `qa list` | Print every entry |
//! | `qa clear` | Delete every entry |
//! | `qa ask <question>` | Answer a question from the knowledge base |
//! | `qa feedback <question> <rating>` | Record a 1-5 rating |
//! | `qa serve` | Start the HTTP server |

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use qa_harness::auth::LOCAL_OPERATOR;
use qa_harness::{ask, config, kb, migrate, server};

/// QA Harness CLI: an embedding-based FAQ answering engine.
#[derive(Parser)]
#[command(name = "qa", version, about)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/qa.toml")]
    config: PathBuf,

    /// Log at debug level (overridden by `RUST_LOG`).
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Idempotent; running it multiple times is safe.
    Init,

    /// Add a question/answer pair to the knowledge base.
    Add {
        /// The question, or `"question - answer"` when no answer is given.
        question: String,
        /// The answer.
        answer: Option<String>,
    },

    /// Remove entries whose question matches exactly.
    Remove {
        question: String,
    },

    /// List every entry in insertion order.
    List,

    /// Delete every entry.
    Clear,

    /// Answer a question from the knowledge base.
    Ask {
        question: String,

        /// Identity recorded in the interaction log.
        #[arg(long, default_value = LOCAL_OPERATOR)]
        user: String,

        /// Return the stored answer without calling the rewrite service.
        #[arg(long)]
        no_rewrite: bool,
    },

    /// Record a 1-5 rating for a question.
    Feedback {
        question: String,
        rating: i64,

        #[arg(long, default_value = LOCAL_OPERATOR)]
        user: String,
    },

    /// Start the HTTP server on `[server].bind`.
    Serve,
}

fn init_tracing(verbose: bool) {
    let default_filter = if verbose {
        "qa_harness=debug,qa_harness_core=debug"
    } else {
        "qa_harness=info,qa_harness_core=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::Add { question, answer } => {
            kb::run_add(&cfg, &question, answer.as_deref()).await?;
        }
        Commands::Remove { question } => {
            kb::run_remove(&cfg, &question).await?;
        }
        Commands::List => {
            kb::run_list(&cfg).await?;
        }
        Commands::Clear => {
            kb::run_clear(&cfg).await?;
        }
        Commands::Ask {
            question,
            user,
            no_rewrite,
        } => {
            ask::run_ask(&cfg, &user, &question, !no_rewrite).await?;
        }
        Commands::Feedback {
            question,
            rating,
            user,
        } => {
            ask::run_feedback(&cfg, &user, &question, rating).await?;
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
    }

    Ok(())
}
