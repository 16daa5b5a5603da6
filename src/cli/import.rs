//! CLI `import` command — load a JSONL file into the partition.

use crate::config::EngramConfig;
use crate::memory::service::ImportArgs;
use crate::server;
use anyhow::{Context, Result};
use std::path::Path;

pub async fn import(
    config: &EngramConfig,
    file: &Path,
    skip_existing: bool,
    regenerate_embeddings: bool,
    dry_run: bool,
) -> Result<()> {
    let data = std::fs::read_to_string(file)
        .with_context(|| format!("failed to read import file: {}", file.display()))?;

    let service = server::setup_service(config).await?;

    let stats = service
        .import(ImportArgs {
            data,
            skip_existing,
            regenerate_embeddings,
            dry_run,
        })
        .await
        .context("import failed")?;

    if dry_run {
        println!("(dry run) would import {} of {} records:", stats.imported, stats.total);
    } else {
        println!("Import complete ({} records):", stats.total);
    }
    println!("  Imported: {}", stats.imported);
    println!("  Skipped:  {}", stats.skipped);
    if stats.errors > 0 {
        println!("  Errors:   {}", stats.errors);
    }

    Ok(())
}
