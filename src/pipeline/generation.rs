//! Stage 2: workshop item generation
//!
//! `batch_count` independent batches are requested concurrently. A batch that
//! errors or fails to parse contributes no items; the stage only fails when
//! every batch comes back empty.

use futures::future::join_all;
use std::time::Instant;
use tracing::{debug, info, instrument, warn};

use super::prompts;
use crate::config::PipelineConfig;
use crate::error::{Error, Result};
use crate::generation::replies::{ItemReply, ItemsReply};
use crate::generation::{generate, GenerationClient};
use crate::model::{AnalysisOutput, EssayRequest, WorkshopItem, MAX_SUGGESTIONS};

/// Turn one batch's reply into items with stable `b{batch}-i{n}` ids.
///
/// Items with an empty quote are discarded, at most `limit` items are kept and
/// suggestion lists are capped at [`MAX_SUGGESTIONS`].
pub fn normalize_batch(batch: usize, limit: usize, replies: Vec<ItemReply>) -> Vec<WorkshopItem> {
    replies
        .into_iter()
        .filter(|reply| !reply.quote.trim().is_empty())
        .take(limit)
        .enumerate()
        .map(|(index, reply)| WorkshopItem {
            id: format!("b{batch}-i{}", index + 1),
            quote: reply.quote.trim().to_string(),
            problem: reply.problem,
            severity: reply.severity,
            dimension: reply.dimension,
            suggestions: reply
                .suggestions
                .into_iter()
                .take(MAX_SUGGESTIONS)
                .enumerate()
                .map(|(position, s)| s.into_suggestion(position))
                .collect(),
        })
        .collect()
}

async fn run_batch(
    client: &dyn GenerationClient,
    request: &EssayRequest,
    analysis: &AnalysisOutput,
    batch: usize,
    config: &PipelineConfig,
) -> Vec<WorkshopItem> {
    let prompt = prompts::workshop_items(
        request,
        analysis,
        batch,
        config.batch_count,
        config.items_per_batch,
    );
    match generate::<ItemsReply>(client, &prompt).await {
        Ok(reply) => {
            let items = normalize_batch(batch, config.items_per_batch, reply.items);
            debug!(batch, items = items.len(), "batch complete");
            items
        }
        Err(e) => {
            warn!(batch, error = %e, "generation batch failed; skipping");
            Vec::new()
        }
    }
}

#[instrument(skip_all, fields(stage = 2, batches = config.batch_count))]
pub async fn run_generation(
    client: &dyn GenerationClient,
    request: &EssayRequest,
    analysis: &AnalysisOutput,
    config: &PipelineConfig,
) -> Result<Vec<WorkshopItem>> {
    let start = Instant::now();
    let batches = (1..=config.batch_count)
        .map(|batch| run_batch(client, request, analysis, batch, config));
    let items: Vec<WorkshopItem> = join_all(batches).await.into_iter().flatten().collect();

    if items.is_empty() {
        return Err(Error::StageFailed {
            stage: 2,
            reason: format!("all {} generation batches returned no items", config.batch_count),
        });
    }

    info!(
        items = items.len(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "generation stage complete"
    );
    Ok(items)
}
