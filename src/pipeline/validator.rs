//! Two-tier suggestion validation
//!
//! Every suggestion first passes through the deterministic [`RuleEngine`]. A
//! critical finding rejects it without a judge call. Survivors are scored in
//! a single judge call per batch, and the threshold is enforced locally on
//! the recomputed component total. When the judge cannot be consulted, each
//! survivor fails open with the configured default score.

use std::sync::Arc;
use tracing::{debug, warn};

use super::prompts;
use crate::config::PipelineConfig;
use crate::generation::replies::{JudgeEvaluation, JudgeReply};
use crate::generation::{generate, GenerationClient};
use crate::model::{EssayRequest, Suggestion, ValidationFailure, ValidationResult, WorkshopItem};
use crate::rules::{self, Finding, RuleEngine, Severity};

/// Outcome of validating one batch of suggestions.
#[derive(Debug, Clone)]
pub struct BatchValidation {
    /// Index-aligned with the validated suggestions.
    pub results: Vec<ValidationResult>,
    pub judge_called: bool,
    pub fail_open_count: u32,
}

pub struct QualityValidator {
    client: Arc<dyn GenerationClient>,
    rules: Arc<RuleEngine>,
    threshold: u8,
    fail_open_score: u8,
}

impl QualityValidator {
    pub fn new(client: Arc<dyn GenerationClient>, rules: Arc<RuleEngine>, config: &PipelineConfig) -> Self {
        Self {
            client,
            rules,
            threshold: config.pass_threshold,
            fail_open_score: config.fail_open_score,
        }
    }

    pub fn threshold(&self) -> u8 {
        self.threshold
    }

    /// Validate `suggestions` for `item`. Issues at most one judge call.
    pub async fn validate_batch(
        &self,
        request: &EssayRequest,
        item: &WorkshopItem,
        suggestions: &[Suggestion],
    ) -> BatchValidation {
        let mut results: Vec<Option<ValidationResult>> = vec![None; suggestions.len()];
        let mut survivors = Vec::new();
        let mut survivor_warnings = Vec::new();

        for (index, suggestion) in suggestions.iter().enumerate() {
            let findings = self.rules.check(&suggestion.text);
            if rules::has_critical(&findings) {
                debug!(item = %item.id, index, "suggestion rejected by pre-filter");
                results[index] = Some(prefilter_rejection(&findings));
            } else {
                survivors.push(index);
                survivor_warnings.push(rules::warnings(&findings).cloned().collect::<Vec<_>>());
            }
        }

        let mut judge_called = false;
        let mut fail_open_count = 0;

        if !survivors.is_empty() {
            judge_called = true;
            let judged: Vec<&Suggestion> = survivors.iter().map(|&i| &suggestions[i]).collect();
            let prompt = prompts::judge_suggestions(request, item, &judged, &survivor_warnings);

            let evaluations = match generate::<JudgeReply>(self.client.as_ref(), &prompt).await {
                Ok(reply) => reply.evaluations,
                Err(e) => {
                    warn!(item = %item.id, error = %e, "judge unavailable; failing open");
                    Vec::new()
                }
            };

            for (position, &index) in survivors.iter().enumerate() {
                let evaluation = evaluations.iter().find(|e| e.index == position).cloned();
                results[index] = Some(match evaluation {
                    Some(evaluation) => self.score(evaluation, &survivor_warnings[position]),
                    None => {
                        fail_open_count += 1;
                        ValidationResult::fail_open(self.fail_open_score)
                    }
                });
            }
        }

        BatchValidation {
            results: results
                .into_iter()
                .map(|r| r.unwrap_or_else(|| ValidationResult::fail_open(self.fail_open_score)))
                .collect(),
            judge_called,
            fail_open_count,
        }
    }

    fn score(&self, evaluation: JudgeEvaluation, warnings: &[Finding]) -> ValidationResult {
        let mut failures: Vec<ValidationFailure> = evaluation
            .failures
            .into_iter()
            .map(|f| ValidationFailure {
                category: f.category,
                severity: Severity::Warning,
                detail: f.detail,
            })
            .collect();
        failures.extend(warnings.iter().map(finding_to_failure));

        ValidationResult::from_components(
            evaluation.components.into_scores(),
            self.threshold,
            failures,
            evaluation.strengths,
            evaluation.retry_guidance,
        )
    }
}

fn finding_to_failure(finding: &Finding) -> ValidationFailure {
    let detail = if finding.evidence.is_empty() {
        finding.fix_hint.clone()
    } else {
        format!("\"{}\": {}", finding.evidence, finding.fix_hint)
    };
    ValidationFailure {
        category: finding.category.as_str().to_string(),
        severity: finding.severity,
        detail,
    }
}

fn prefilter_rejection(findings: &[Finding]) -> ValidationResult {
    let critical: Vec<&Finding> = findings
        .iter()
        .filter(|f| f.severity == Severity::Critical)
        .collect();
    let guidance = critical
        .iter()
        .map(|f| f.fix_hint.as_str())
        .collect::<Vec<_>>()
        .join(" ");
    ValidationResult::rejected(findings.iter().map(finding_to_failure).collect(), guidance)
}
