//! CLI `re-embed` command — regenerate embeddings under a target model.

use crate::config::EngramConfig;
use crate::embedding::EmbeddingProvider;
use crate::reembed::{ReembedConfig, Reembedder};
use crate::server;
use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Arc;
use std::time::Duration;

pub async fn re_embed(
    config: &EngramConfig,
    batch_size: i64,
    delay: Duration,
    delete_old: bool,
    skip_existing: bool,
    model: Option<String>,
) -> Result<()> {
    let service = server::setup_service(config).await?;
    let db = Arc::clone(service.db());
    let embedder = Arc::clone(service.embedder());

    let target = model
        .clone()
        .unwrap_or_else(|| embedder.primary().to_string());
    println!("Re-embedding all memories with model '{target}'...");

    let engine = Reembedder::new(db, embedder as Arc<dyn EmbeddingProvider>).with_config(
        ReembedConfig {
            batch_size,
            delay_between_batches: delay,
            delete_old_embeddings: delete_old,
            skip_existing,
            target_model: model,
        },
    );

    let pb = ProgressBar::new(0);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("  {bar:40.cyan/blue} {pos}/{len} ({eta})")
            .expect("valid template")
            .progress_chars("##-"),
    );

    let stats = engine
        .run(None, |processed, total| {
            pb.set_length(total as u64);
            pb.set_position(processed as u64);
        })
        .await
        .context("re-embed failed")?;

    pb.finish_and_clear();

    println!(
        "Re-embedded {} memories in {}ms ({} skipped, {} errors).",
        stats.processed - stats.skipped,
        stats.duration_ms,
        stats.skipped,
        stats.errors
    );

    anyhow::ensure!(stats.errors == 0, "{} memories failed to re-embed", stats.errors);
    Ok(())
}
