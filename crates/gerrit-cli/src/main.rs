//! gerrit-mcp CLI - MCP server and command-line interface for Gerrit.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use gerrit_api::GerritClient;
use gerrit_core::{CommandSyncTool, Config, ConnectionConfig, ReviewProvider};
use gerrit_mcp::{McpServer, ToolHandler};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "gerrit-mcp")]
#[command(author, version, about = "Gerrit code review tools over MCP", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to the config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the MCP server on stdin/stdout (default)
    Serve,

    /// List changes matching a query
    Changes {
        /// Gerrit search query
        #[arg(short, long, default_value = "status:open")]
        query: String,

        /// Maximum number of results
        #[arg(short, long, default_value = "25")]
        limit: u32,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Show current configuration
    Show,

    /// Get a value (e.g. gerrit.url)
    Get { key: String },

    /// Set a value (e.g. batch.vote_delay_ms 1500)
    Set { key: String, value: String },

    /// Print the config file location
    Path,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // stdout carries MCP messages, so logs go to stderr.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("info")
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config_path = match cli.config {
        Some(path) => path,
        None => Config::config_path()?,
    };

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => serve(&config_path).await,
        Commands::Changes { query, limit } => list_changes(&config_path, &query, limit).await,
        Commands::Config { command } => handle_config(&config_path, command),
    }
}

fn connect(config: &Config) -> anyhow::Result<GerritClient> {
    let connection = ConnectionConfig::resolve(config, |key| std::env::var(key).ok())
        .context("Gerrit connection is not configured")?;
    tracing::info!(url = %connection.url, user = %connection.username, "Using Gerrit server");
    Ok(GerritClient::new(&connection))
}

async fn serve(config_path: &Path) -> anyhow::Result<()> {
    let config = Config::load_from(config_path)?;
    let client = connect(&config)?;

    let handler = ToolHandler::new(
        Arc::new(client),
        Arc::new(CommandSyncTool::new(config.sync.command.clone())),
    )
    .with_batch_settings(config.batch.vote_submit_settings());

    McpServer::new(handler).run().await?;
    Ok(())
}

async fn list_changes(config_path: &Path, query: &str, limit: u32) -> anyhow::Result<()> {
    let config = Config::load_from(config_path)?;
    let client = connect(&config)?;

    let changes = client.query_changes(query, Some(limit)).await?;
    tracing::debug!(count = changes.len(), "Fetched changes");
    println!("{}", serde_json::to_string_pretty(&changes)?);
    Ok(())
}

fn handle_config(config_path: &Path, command: ConfigCommands) -> anyhow::Result<()> {
    match command {
        ConfigCommands::Show => {
            let config = Config::load_from(config_path)?;
            print!("{}", toml::to_string_pretty(&config)?);
        }
        ConfigCommands::Get { key } => {
            let config = Config::load_from(config_path)?;
            match config.get(&key)? {
                Some(value) => println!("{}", value),
                None => println!("(not set)"),
            }
        }
        ConfigCommands::Set { key, value } => {
            let mut config = Config::load_from(config_path)?;
            config.set(&key, &value)?;
            config.save_to(config_path)?;
            println!("Set {} = {}", key, value);
        }
        ConfigCommands::Path => {
            println!("{}", config_path.display());
        }
    }
    Ok(())
}
