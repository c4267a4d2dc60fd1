use serde::{Deserialize, Serialize};

use super::{AnalysisOutput, WorkshopItem};
use crate::rules::Severity;

/// Weighted components of the suggestion quality score. Weights sum to 100.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityComponent {
    PurposefulContribution,
    StorytellingStrength,
    Authenticity,
    StructuralOriginality,
    WordEfficiency,
}

impl QualityComponent {
    pub const ALL: [QualityComponent; 5] = [
        QualityComponent::PurposefulContribution,
        QualityComponent::StorytellingStrength,
        QualityComponent::Authenticity,
        QualityComponent::StructuralOriginality,
        QualityComponent::WordEfficiency,
    ];

    pub fn weight(self) -> u8 {
        match self {
            QualityComponent::PurposefulContribution => 30,
            QualityComponent::StorytellingStrength => 30,
            QualityComponent::Authenticity => 20,
            QualityComponent::StructuralOriginality => 15,
            QualityComponent::WordEfficiency => 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentScore {
    pub component: QualityComponent,
    pub weight: u8,
    /// Points earned, between 0 and `weight`.
    pub score: f64,
}

impl ComponentScore {
    /// Clamp a raw points value into `0..=weight`.
    pub fn clamped(component: QualityComponent, raw: f64) -> Self {
        let weight = component.weight();
        let score = if raw.is_finite() {
            raw.clamp(0.0, f64::from(weight))
        } else {
            0.0
        };
        Self {
            component,
            weight,
            score,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationFailure {
    pub category: String,
    pub severity: Severity,
    pub detail: String,
}

/// Verdict for one suggestion on one attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    pub passed: bool,
    /// 0-100, the rounded sum of `components`.
    pub score: u8,
    pub components: Vec<ComponentScore>,
    pub failures: Vec<ValidationFailure>,
    pub strengths: Vec<String>,
    pub retry_guidance: String,
    /// False when the semantic judge was skipped or unavailable.
    pub judged: bool,
}

impl ValidationResult {
    /// Assemble a result from component scores, enforcing `threshold` locally.
    ///
    /// The pass decision uses the unrounded component total; `score` is the
    /// rounded total for display.
    pub fn from_components(
        components: Vec<ComponentScore>,
        threshold: u8,
        failures: Vec<ValidationFailure>,
        strengths: Vec<String>,
        retry_guidance: String,
    ) -> Self {
        let total: f64 = components.iter().map(|c| c.score).sum();
        let score = total.round().clamp(0.0, 100.0) as u8;
        Self {
            passed: total >= f64::from(threshold),
            score,
            components,
            failures,
            strengths,
            retry_guidance,
            judged: true,
        }
    }

    /// Passing result used when the judge cannot be consulted.
    pub fn fail_open(score: u8) -> Self {
        let fraction = f64::from(score) / 100.0;
        let components = QualityComponent::ALL
            .iter()
            .map(|&c| ComponentScore::clamped(c, f64::from(c.weight()) * fraction))
            .collect();
        Self {
            passed: true,
            score,
            components,
            failures: Vec::new(),
            strengths: Vec::new(),
            retry_guidance: String::new(),
            judged: false,
        }
    }

    /// Failing result from the deterministic pre-filter alone.
    pub fn rejected(failures: Vec<ValidationFailure>, retry_guidance: String) -> Self {
        let components = QualityComponent::ALL
            .iter()
            .map(|&c| ComponentScore::clamped(c, 0.0))
            .collect();
        Self {
            passed: false,
            score: 0,
            components,
            failures,
            strengths: Vec::new(),
            retry_guidance,
            judged: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemOutcome {
    Success,
    Exhausted,
}

/// A workshop item after the validation stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidatedItem {
    /// The item with its suggestions replaced by the accepted ones.
    #[serde(flatten)]
    pub item: WorkshopItem,
    /// Index-aligned with `item.suggestions`.
    pub validations: Vec<ValidationResult>,
    pub attempts: u32,
    pub outcome: ItemOutcome,
}

impl ValidatedItem {
    pub fn quality_scores(&self) -> Vec<u8> {
        self.validations.iter().map(|v| v.score).collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationSummary {
    pub total_items: usize,
    pub retained_items: usize,
    pub dropped_items: usize,
    pub regeneration_calls: u32,
    pub judge_calls: u32,
    pub fail_open_count: u32,
    pub average_quality: f64,
}

/// Payload returned by the final stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalResult {
    pub items: Vec<ValidatedItem>,
    pub summary: ValidationSummary,
    pub analysis: AnalysisOutput,
}
