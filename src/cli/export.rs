//! CLI `export` command — dump the partition to a JSONL file.

use crate::config::EngramConfig;
use crate::server;
use anyhow::{Context, Result};
use std::path::Path;

pub async fn export(
    config: &EngramConfig,
    out: &Path,
    with_embeddings: bool,
    kind: Option<String>,
    limit: Option<i64>,
) -> Result<()> {
    let service = server::setup_service(config).await?;

    let output = service
        .export(crate::memory::service::ExportArgs {
            include_embeddings: with_embeddings,
            kind,
            limit,
        })
        .await
        .context("export failed")?;

    std::fs::write(out, &output.data)
        .with_context(|| format!("failed to write {}", out.display()))?;

    println!(
        "Exported {} memories to {} ({} errors).",
        output.exported,
        out.display(),
        output.errors
    );

    anyhow::ensure!(output.errors == 0, "{} records failed to export", output.errors);
    Ok(())
}
