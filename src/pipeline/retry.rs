//! Stage 3: validate, regenerate, revalidate
//!
//! Each item runs a small state machine. `Attempt(1)` validates the item's
//! own suggestions; every further attempt first issues one regeneration call
//! carrying the guidance gathered from rejected suggestions. The machine
//! stops in `Success` once `target_suggestions` have passed, or in
//! `Exhausted` after `max_attempts` regeneration rounds.

use futures::future::join_all;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tracing::{debug, info, instrument, warn};

use super::prompts;
use super::validator::QualityValidator;
use crate::config::PipelineConfig;
use crate::generation::replies::SuggestionsReply;
use crate::generation::{generate, GenerationClient};
use crate::model::{
    AnalysisOutput, EssayRequest, FinalResult, ItemOutcome, Suggestion, ValidatedItem,
    ValidationResult, ValidationSummary, WorkshopItem, MAX_SUGGESTIONS,
};
use crate::rules::RuleEngine;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryState {
    /// Validating the candidates of attempt `n`, starting at 1.
    Attempt(u32),
    Success,
    Exhausted,
}

/// What the coordinator produced for one item.
#[derive(Debug, Clone)]
pub struct ItemReport {
    /// `None` when no suggestion passed; the item is dropped.
    pub item: Option<ValidatedItem>,
    pub final_state: RetryState,
    pub attempts: u32,
    pub regeneration_calls: u32,
    pub judge_calls: u32,
    pub fail_open_count: u32,
}

pub struct RetryCoordinator {
    client: Arc<dyn GenerationClient>,
    validator: QualityValidator,
    max_attempts: u32,
    target: usize,
}

impl RetryCoordinator {
    pub fn new(
        client: Arc<dyn GenerationClient>,
        rules: Arc<RuleEngine>,
        config: &PipelineConfig,
    ) -> Self {
        Self {
            validator: QualityValidator::new(client.clone(), rules, config),
            client,
            max_attempts: config.max_attempts,
            target: config.target_suggestions.clamp(1, MAX_SUGGESTIONS),
        }
    }

    /// Drive one item to `Success` or `Exhausted`.
    pub async fn validate_item(&self, request: &EssayRequest, item: &WorkshopItem) -> ItemReport {
        let mut state = RetryState::Attempt(1);
        let mut attempts = 0;
        let mut candidates = item.suggestions.clone();
        let mut accepted: Vec<(Suggestion, ValidationResult)> = Vec::new();
        let mut guidance: Vec<String> = Vec::new();
        let mut rejected: Vec<String> = Vec::new();
        let mut regeneration_calls = 0;
        let mut judge_calls = 0;
        let mut fail_open_count = 0;

        while let RetryState::Attempt(n) = state {
            attempts = n;
            if !candidates.is_empty() {
                let batch = self
                    .validator
                    .validate_batch(request, item, &candidates)
                    .await;
                judge_calls += u32::from(batch.judge_called);
                fail_open_count += batch.fail_open_count;

                for (suggestion, result) in candidates.drain(..).zip(batch.results) {
                    if result.passed {
                        accepted.push((suggestion, result));
                    } else {
                        collect_guidance(&result, &mut guidance);
                        rejected.push(suggestion.text);
                    }
                }
            }

            state = if accepted.len() >= self.target {
                RetryState::Success
            } else if n > self.max_attempts {
                RetryState::Exhausted
            } else {
                regeneration_calls += 1;
                candidates = self.regenerate(request, item, &guidance, &rejected).await;
                RetryState::Attempt(n + 1)
            };
            debug!(item = %item.id, attempt = n, accepted = accepted.len(), next = ?state, "attempt finished");
        }

        ItemReport {
            item: finalize(item, accepted, self.target, attempts, state),
            final_state: state,
            attempts,
            regeneration_calls,
            judge_calls,
            fail_open_count,
        }
    }

    async fn regenerate(
        &self,
        request: &EssayRequest,
        item: &WorkshopItem,
        guidance: &[String],
        rejected: &[String],
    ) -> Vec<Suggestion> {
        let prompt =
            prompts::regenerate_suggestions(request, item, guidance, rejected, MAX_SUGGESTIONS);
        match generate::<SuggestionsReply>(self.client.as_ref(), &prompt).await {
            Ok(reply) => reply
                .suggestions
                .into_iter()
                .take(MAX_SUGGESTIONS)
                .enumerate()
                .map(|(position, s)| s.into_suggestion(position))
                .collect(),
            Err(e) => {
                warn!(item = %item.id, error = %e, "regeneration failed; attempt consumed");
                Vec::new()
            }
        }
    }
}

fn collect_guidance(result: &ValidationResult, guidance: &mut Vec<String>) {
    let mut push = |line: String| {
        if !line.trim().is_empty() && !guidance.contains(&line) {
            guidance.push(line);
        }
    };
    push(result.retry_guidance.clone());
    for failure in &result.failures {
        push(format!("{}: {}", failure.category, failure.detail));
    }
}

/// Keep at most `target` accepted suggestions. Suggestions accepted on the
/// first attempt keep the order the item was generated with; once later
/// attempts contribute, the best scores come first and ties keep acceptance
/// order.
fn finalize(
    item: &WorkshopItem,
    mut accepted: Vec<(Suggestion, ValidationResult)>,
    target: usize,
    attempts: u32,
    state: RetryState,
) -> Option<ValidatedItem> {
    if accepted.is_empty() {
        return None;
    }
    if attempts > 1 {
        accepted.sort_by(|a, b| b.1.score.cmp(&a.1.score));
    }
    accepted.truncate(target);
    let (suggestions, validations): (Vec<_>, Vec<_>) = accepted.into_iter().unzip();
    Some(ValidatedItem {
        item: item.with_suggestions(suggestions),
        validations,
        attempts,
        outcome: if state == RetryState::Success {
            ItemOutcome::Success
        } else {
            ItemOutcome::Exhausted
        },
    })
}

fn summarize(total_items: usize, reports: &[ItemReport]) -> ValidationSummary {
    let retained: Vec<&ValidatedItem> = reports.iter().filter_map(|r| r.item.as_ref()).collect();
    let scores: Vec<f64> = retained
        .iter()
        .flat_map(|item| item.validations.iter().map(|v| f64::from(v.score)))
        .collect();
    let average_quality = if scores.is_empty() {
        0.0
    } else {
        let mean = scores.iter().sum::<f64>() / scores.len() as f64;
        (mean * 10.0).round() / 10.0
    };

    ValidationSummary {
        total_items,
        retained_items: retained.len(),
        dropped_items: total_items - retained.len(),
        regeneration_calls: reports.iter().map(|r| r.regeneration_calls).sum(),
        judge_calls: reports.iter().map(|r| r.judge_calls).sum(),
        fail_open_count: reports.iter().map(|r| r.fail_open_count).sum(),
        average_quality,
    }
}

#[instrument(skip_all, fields(stage = 3, items = items.len()))]
pub async fn run_validation_stage(
    client: Arc<dyn GenerationClient>,
    rules: Arc<RuleEngine>,
    config: &PipelineConfig,
    request: &EssayRequest,
    analysis: AnalysisOutput,
    items: &[WorkshopItem],
) -> FinalResult {
    let start = Instant::now();
    let coordinator = RetryCoordinator::new(client, rules, config);
    let semaphore = Semaphore::new(config.max_concurrent_items.max(1));

    let runs = items.iter().map(|item| {
        let coordinator = &coordinator;
        let semaphore = &semaphore;
        async move {
            // Held until the item finishes; the semaphore is never closed.
            let _permit = semaphore.acquire().await;
            coordinator.validate_item(request, item).await
        }
    });
    let reports = join_all(runs).await;

    let summary = summarize(items.len(), &reports);
    info!(
        retained = summary.retained_items,
        dropped = summary.dropped_items,
        regenerations = summary.regeneration_calls,
        fail_open = summary.fail_open_count,
        elapsed_ms = start.elapsed().as_millis() as u64,
        "validation stage complete"
    );

    FinalResult {
        items: reports.into_iter().filter_map(|r| r.item).collect(),
        summary,
        analysis,
    }
}
