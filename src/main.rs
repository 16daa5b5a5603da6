use anyhow::Result;
use clap::{Parser, Subcommand};
use engram::{cli, config, server};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "engram", version, about = "Memory substrate MCP server for AI coding agents")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Start the MCP server (stdio transport)
    Serve,
    /// Export memories to a JSONL file
    Export {
        /// Output file path
        out: PathBuf,
        /// Include embedding vectors in the export
        #[arg(long)]
        with_embeddings: bool,
        /// Export only memories of this kind
        #[arg(long)]
        kind: Option<String>,
        /// Maximum number of records to export
        #[arg(long)]
        limit: Option<i64>,
    },
    /// Import memories from a JSONL file
    Import {
        /// Input file path
        file: PathBuf,
        /// Skip records whose id already exists
        #[arg(long)]
        skip_existing: bool,
        /// Generate new embeddings instead of using exported ones
        #[arg(long)]
        regenerate_embeddings: bool,
        /// Validate without writing to the database
        #[arg(long)]
        dry_run: bool,
    },
    /// Re-embed all memories under a target model
    #[command(name = "re-embed")]
    Reembed {
        /// Memories per batch
        #[arg(long, default_value_t = 100)]
        batch_size: i64,
        /// Delay between batches (e.g. 100ms, 2s)
        #[arg(long, default_value = "100ms")]
        delay: String,
        /// Delete other models' embeddings after a successful upsert
        #[arg(long)]
        delete_old: bool,
        /// Skip memories that already have a target-model embedding
        #[arg(long)]
        skip_existing: bool,
        /// Target model (defaults to the primary embedding model)
        #[arg(long)]
        model: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = config::EngramConfig::load()?;

    // Log to stderr so stdout stays clean for MCP JSON-RPC.
    let filter = EnvFilter::try_new(&config.server.log_level)
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => {
            server::serve_stdio(config).await?;
        }
        Command::Export {
            out,
            with_embeddings,
            kind,
            limit,
        } => {
            cli::export::export(&config, &out, with_embeddings, kind, limit).await?;
        }
        Command::Import {
            file,
            skip_existing,
            regenerate_embeddings,
            dry_run,
        } => {
            cli::import::import(&config, &file, skip_existing, regenerate_embeddings, dry_run)
                .await?;
        }
        Command::Reembed {
            batch_size,
            delay,
            delete_old,
            skip_existing,
            model,
        } => {
            let delay = config::parse_duration(&delay)?;
            cli::re_embed::re_embed(&config, batch_size, delay, delete_old, skip_existing, model)
                .await?;
        }
    }

    Ok(())
}
