// crates/book-review-cli/src/main.rs
// ============================================================================
// Module: Book Review CLI Entry Point
// Description: Command dispatcher for serving, importing, and config tasks.
// Purpose: Provide the `book-review` binary.
// Dependencies: clap, book-review-config, book-review-web, thiserror, tokio.
// ============================================================================

//! ## Overview
//! `book-review serve` runs the web application, `book-review import` loads a
//! catalog file into the database, and `book-review config` validates or
//! prints configuration. Errors go to stderr and yield a failing exit code.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use book_review_cli::import::import_catalog_file;
use book_review_config::BookReviewConfig;
use book_review_config::config_toml_example;
use book_review_store_sqlite::SqliteBookStore;
use book_review_store_sqlite::SqliteStoreConfig;
use book_review_web::BookReviewServer;
use clap::Args;
use clap::Parser;
use clap::Subcommand;
use thiserror::Error;

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(name = "book-review", version, disable_help_subcommand = true)]
struct Cli {
    /// Selected subcommand to execute.
    #[command(subcommand)]
    command: Commands,
}

/// Supported CLI subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the web server.
    Serve(ServeCommand),
    /// Load a catalog file into the books table.
    Import(ImportCommand),
    /// Configuration utilities.
    Config {
        /// Selected config subcommand.
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

/// Configuration for the `serve` command.
#[derive(Args, Debug)]
struct ServeCommand {
    /// Optional config file path (defaults to book-review.toml or env override).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

/// Configuration for the `import` command.
#[derive(Args, Debug)]
struct ImportCommand {
    /// Catalog file with a header row and isbn,title,author,year records.
    #[arg(value_name = "CSV")]
    input: PathBuf,
    /// Optional config file path used to locate the database.
    #[arg(long, value_name = "PATH", conflicts_with = "database")]
    config: Option<PathBuf>,
    /// SQLite database path; skips loading the config file.
    #[arg(long, value_name = "PATH")]
    database: Option<PathBuf>,
}

/// Config subcommands.
#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Load and validate a config file.
    Validate(ConfigValidateCommand),
    /// Print a commented example config.
    Example,
}

/// Configuration for the `config validate` command.
#[derive(Args, Debug)]
struct ConfigValidateCommand {
    /// Optional config file path (defaults to book-review.toml or env override).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// CLI error wrapper carrying the message shown to the user.
#[derive(Debug, Error)]
#[error("{message}")]
struct CliError {
    /// Human-readable error message.
    message: String,
}

impl CliError {
    /// Constructs a new [`CliError`].
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// CLI result alias for fallible operations.
type CliResult<T> = Result<T, CliError>;

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// CLI entry point returning an exit code.
#[tokio::main(flavor = "multi_thread")]
async fn main() -> ExitCode {
    match run().await {
        Ok(code) => code,
        Err(err) => emit_error(&err.to_string()),
    }
}

/// Executes the CLI command dispatcher.
async fn run() -> CliResult<ExitCode> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Serve(command) => command_serve(command).await,
        Commands::Import(command) => command_import(command).await,
        Commands::Config {
            command,
        } => command_config(command),
    }
}

// ============================================================================
// SECTION: Serve Command
// ============================================================================

/// Executes the `serve` command.
async fn command_serve(command: ServeCommand) -> CliResult<ExitCode> {
    let config = BookReviewConfig::load(command.config.as_deref())
        .map_err(|err| CliError::new(format!("failed to load config: {err}")))?;
    let server = tokio::task::spawn_blocking(move || BookReviewServer::from_config(config))
        .await
        .map_err(|err| CliError::new(format!("server init failed: init join failed: {err}")))?
        .map_err(|err| CliError::new(format!("server init failed: {err}")))?;
    server.serve().await.map_err(|err| CliError::new(format!("server failed: {err}")))?;
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Import Command
// ============================================================================

/// Executes the `import` command.
async fn command_import(command: ImportCommand) -> CliResult<ExitCode> {
    let store_config = match command.database {
        Some(path) => SqliteStoreConfig::for_path(path),
        None => {
            let config = BookReviewConfig::load(command.config.as_deref())
                .map_err(|err| CliError::new(format!("failed to load config: {err}")))?;
            config
                .database
                .store_config()
                .map_err(|err| CliError::new(format!("failed to load config: {err}")))?
        }
    };
    let input = command.input;
    let inserted = tokio::task::spawn_blocking(move || {
        let store = SqliteBookStore::new(&store_config)
            .map_err(|err| CliError::new(format!("failed to open database: {err}")))?;
        import_catalog_file(&input, &store)
            .map_err(|err| CliError::new(format!("import failed: {err}")))
    })
    .await
    .map_err(|err| CliError::new(format!("import failed: join failed: {err}")))??;
    write_stdout_line(&format!("imported {inserted} books"))
        .map_err(|err| CliError::new(output_error("stdout", &err)))?;
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Config Commands
// ============================================================================

/// Dispatches config subcommands.
fn command_config(command: ConfigCommand) -> CliResult<ExitCode> {
    match command {
        ConfigCommand::Validate(command) => command_config_validate(&command),
        ConfigCommand::Example => {
            write_stdout_line(&config_toml_example())
                .map_err(|err| CliError::new(output_error("stdout", &err)))?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Executes the config validation command.
fn command_config_validate(command: &ConfigValidateCommand) -> CliResult<ExitCode> {
    let _config = BookReviewConfig::load(command.config.as_deref())
        .map_err(|err| CliError::new(format!("failed to load config: {err}")))?;
    write_stdout_line("config ok").map_err(|err| CliError::new(output_error("stdout", &err)))?;
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Output Helpers
// ============================================================================

/// Writes a line to stdout.
fn write_stdout_line(message: &str) -> std::io::Result<()> {
    let mut stdout = std::io::stdout();
    writeln!(&mut stdout, "{message}")
}

/// Writes a line to stderr.
fn write_stderr_line(message: &str) -> std::io::Result<()> {
    let mut stderr = std::io::stderr();
    writeln!(&mut stderr, "{message}")
}

/// Formats an output error message.
fn output_error(stream: &str, error: &std::io::Error) -> String {
    format!("failed to write to {stream}: {error}")
}

/// Emits an error message and returns a failing exit code.
fn emit_error(message: &str) -> ExitCode {
    let _ = write_stderr_line(message);
    ExitCode::FAILURE
}
