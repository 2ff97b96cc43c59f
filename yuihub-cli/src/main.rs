//! YuiHub CLI
//!
//! Command-line client for the YuiHub knowledge service.
//!
//! # Usage
//!
//! ```bash
//! # Store the API token in the OS keyring
//! yuihub token set
//!
//! # Check that the service is reachable
//! yuihub health
//!
//! # Search notes
//! yuihub search "storage decision" --limit 5
//!
//! # Save a note to the current thread
//! echo "We chose SQLite" | yuihub save
//! ```

mod commands;
mod state;

use std::io::{IsTerminal, Read};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, fmt};
use yuihub_client::ClientError;
use yuihub_core::{AuthHeaderPreference, AuthScheme, Settings};

use crate::commands::{App, Overrides, SaveInput, load_settings, startup_summary};
use crate::state::ThreadState;

#[derive(Parser)]
#[command(name = "yuihub")]
#[command(about = "Search and save notes in YuiHub")]
#[command(version)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Settings file (defaults to the platform config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// State file remembering the current thread
    #[arg(long, global = true)]
    state_file: Option<PathBuf>,

    /// Base URL of the YuiHub service
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Header carrying the token (auto, authorization, x-yuihub-token)
    #[arg(long, global = true)]
    auth_header: Option<AuthHeaderPreference>,

    /// Authorization scheme (bearer, none)
    #[arg(long, global = true)]
    auth_scheme: Option<AuthScheme>,

    /// Per-attempt timeout in milliseconds
    #[arg(long, global = true)]
    timeout_ms: Option<u64>,

    /// Keep the token in memory only instead of the OS keyring
    #[arg(long, global = true)]
    no_keyring: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check that the service is up
    Health,

    /// Search notes
    Search {
        /// Search query
        query: String,

        /// Maximum number of hits (defaults to search_limit)
        #[arg(short, long)]
        limit: Option<u32>,

        /// Print each hit as an insertion snippet
        #[arg(long)]
        insert: bool,
    },

    /// Start a new thread and make it current
    IssueThread,

    /// Show the current thread
    CurrentThread,

    /// Save a note
    Save {
        /// File to save as a whole document (reads stdin if omitted)
        #[arg(short, long)]
        file: Option<PathBuf>,

        /// Thread to save to (defaults to the current thread)
        #[arg(short, long)]
        thread: Option<String>,

        /// Author recorded with the note
        #[arg(long)]
        author: Option<String>,

        /// Source recorded with the note
        #[arg(long)]
        source: Option<String>,

        /// Skip the size confirmation for large documents
        #[arg(short, long)]
        yes: bool,
    },

    /// Manage the API token
    Token {
        #[command(subcommand)]
        action: TokenAction,
    },

    /// Show the effective settings
    Config,
}

#[derive(Subcommand)]
enum TokenAction {
    /// Store the API token (reads stdin if omitted; empty clears it)
    Set {
        token: Option<String>,
    },

    /// Remove the stored API token
    Clear,

    /// Show whether a token is configured
    Status,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("{}", present_error(&e));
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let overrides = Overrides {
        base_url: cli.base_url.clone(),
        auth_header: cli.auth_header,
        auth_scheme: cli.auth_scheme,
        timeout_ms: cli.timeout_ms,
    };
    let settings = load_settings(cli.config.as_deref(), &overrides)?;
    init_logging(&settings, cli.verbose);

    let state_path = match cli.state_file {
        Some(path) => path,
        None => ThreadState::default_path()?,
    };
    let state = ThreadState::load_from_path(state_path)?;
    let mut app = App::start(settings, !cli.no_keyring, state).await?;

    match cli.command {
        Commands::Health => {
            println!("{}", app.health().await?);
        }
        Commands::Search {
            query,
            limit,
            insert,
        } => {
            let response = app.search(&query, limit).await?;
            if !response.has_hits() {
                println!("No hits.");
                return Ok(());
            }
            for hit in &response.hits {
                if insert {
                    println!("{}\n", hit.insertion_text());
                } else {
                    println!("{}\n    {}", hit.label(), hit.description());
                }
            }
        }
        Commands::IssueThread => {
            let thread = app.issue_thread().await?;
            println!("Thread: {}", thread);
        }
        Commands::CurrentThread => match app.current_thread() {
            Some(thread) => println!("{}", thread),
            None => println!("No current thread."),
        },
        Commands::Save {
            file,
            thread,
            author,
            source,
            yes,
        } => {
            let (text, whole_document) = match &file {
                Some(path) => (
                    std::fs::read_to_string(path)
                        .with_context(|| format!("failed to read {}", path.display()))?,
                    true,
                ),
                None => (read_stdin()?, false),
            };
            let note = app
                .save(SaveInput {
                    text,
                    whole_document,
                    thread,
                    author,
                    source,
                    confirmed: yes,
                })
                .await?;
            println!("Saved {} to {} at {}", note.id, note.thread, note.when);
        }
        Commands::Token { action } => match action {
            TokenAction::Set { token } => {
                let token = match token {
                    Some(token) => token,
                    None => strip_line_ending(read_stdin()?),
                };
                app.set_token(&token).await?;
                println!("{}", app.token_status());
            }
            TokenAction::Clear => {
                app.clear_token().await?;
                println!("{}", app.token_status());
            }
            TokenAction::Status => {
                println!("{}", app.token_status());
            }
        },
        Commands::Config => {
            let settings: &Settings = app.settings();
            println!("{}", startup_summary(settings, app.has_credential()));
            println!("searchLimit={}", settings.search_limit);
            println!(
                "defaultThread={}",
                settings.default_thread_id.as_deref().unwrap_or("(none)")
            );
            let state = app.thread_state();
            println!(
                "currentThread={}",
                app.current_thread().as_deref().unwrap_or("(none)")
            );
            if let Some(updated_at) = state.updated_at() {
                println!("threadUpdatedAt={}", updated_at.to_rfc3339());
            }
            println!("stateFile={}", state.path().display());
            if settings.is_insecure_remote() {
                println!("warning: plain HTTP to a remote host");
            }
        }
    }

    Ok(())
}

/// `RUST_LOG` wins; otherwise the configured level, or debug with `--verbose`.
fn init_logging(settings: &Settings, verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&settings.log_level))
    };

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn read_stdin() -> Result<String> {
    let mut stdin = std::io::stdin();
    if stdin.is_terminal() {
        eprintln!("Reading from stdin, end with Ctrl-D");
    }
    let mut buffer = String::new();
    stdin
        .read_to_string(&mut buffer)
        .context("failed to read stdin")?;
    Ok(buffer)
}

/// Drop the newline that ends piped or typed input.
fn strip_line_ending(mut input: String) -> String {
    if input.ends_with('\n') {
        input.pop();
        if input.ends_with('\r') {
            input.pop();
        }
    }
    input
}

/// User-facing message for a failed command.
fn present_error(error: &anyhow::Error) -> String {
    let client_error = error
        .chain()
        .find_map(|cause| cause.downcast_ref::<ClientError>());
    match client_error {
        Some(e) if e.is_unauthorized() => {
            "Unauthorized (401). Set the API token with `yuihub token set`".to_string()
        }
        Some(e) => format!("Error: {}", e),
        None => format!("Error: {:#}", error),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_global_overrides() {
        let cli = Cli::try_parse_from([
            "yuihub",
            "search",
            "sqlite",
            "--auth-header",
            "x-yuihub-token",
            "--auth-scheme",
            "none",
            "--limit",
            "3",
        ])
        .unwrap();

        assert_eq!(cli.auth_header, Some(AuthHeaderPreference::Token));
        assert_eq!(cli.auth_scheme, Some(AuthScheme::None));
        assert!(matches!(
            cli.command,
            Commands::Search { limit: Some(3), .. }
        ));
    }

    #[test]
    fn test_unknown_auth_header_rejected() {
        assert!(Cli::try_parse_from(["yuihub", "health", "--auth-header", "cookie"]).is_err());
    }

    #[test]
    fn test_strip_line_ending_keeps_token_body() {
        assert_eq!(strip_line_ending("abc123\n".into()), "abc123");
        assert_eq!(strip_line_ending("abc123\r\n".into()), "abc123");
        assert_eq!(strip_line_ending(" abc123 ".into()), " abc123 ");
    }

    #[test]
    fn test_present_unauthorized() {
        let error = anyhow::Error::from(ClientError::Auth {
            status: 401,
            reason: "Unauthorized".into(),
            snippet: None,
        });
        assert_eq!(
            present_error(&error),
            "Unauthorized (401). Set the API token with `yuihub token set`"
        );

        let forbidden = anyhow::Error::from(ClientError::Auth {
            status: 403,
            reason: "Forbidden".into(),
            snippet: None,
        });
        assert_eq!(present_error(&forbidden), "Error: HTTP 403 Forbidden");
    }

    #[test]
    fn test_present_wrapped_client_error() {
        let error = anyhow::Error::from(ClientError::Timeout(std::time::Duration::from_millis(
            250,
        )))
        .context("health check failed");
        assert_eq!(present_error(&error), "Error: request timed out after 250ms");
    }
}
