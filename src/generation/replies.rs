//! Expected reply shapes for every call kind
//!
//! Replies that do not deserialize into these types surface as
//! [`crate::error::Error::Parse`]. Fields the service commonly omits are
//! defaulted; fields the pipeline cannot work without are required.

use serde::Deserialize;

use crate::model::{
    ComponentScore, DimensionScore, IssueSeverity, QualityComponent, Suggestion, SuggestionType,
};
use crate::pipeline::calibration::calibrate_score;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RubricReply {
    pub dimensions: Vec<DimensionReply>,
    #[serde(alias = "nqi", alias = "narrative_quality_index")]
    pub narrative_quality_index: f64,
    #[serde(default)]
    pub summary: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DimensionReply {
    #[serde(alias = "name")]
    pub dimension: String,
    pub score: f64,
    #[serde(default, alias = "rationale")]
    pub evidence: String,
}

impl DimensionReply {
    pub fn into_calibrated(self) -> DimensionScore {
        DimensionScore {
            calibrated_score: calibrate_score(self.score),
            raw_score: self.score,
            dimension: self.dimension,
            evidence: self.evidence,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ItemsReply {
    #[serde(alias = "workshopItems")]
    pub items: Vec<ItemReply>,
}

fn default_severity() -> IssueSeverity {
    IssueSeverity::Major
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemReply {
    #[serde(alias = "excerpt", alias = "quotedText")]
    pub quote: String,
    #[serde(alias = "issue")]
    pub problem: String,
    #[serde(default = "default_severity")]
    pub severity: IssueSeverity,
    #[serde(default, alias = "rubricDimension", alias = "rubric_dimension")]
    pub dimension: String,
    #[serde(default)]
    pub suggestions: Vec<SuggestionReply>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SuggestionsReply {
    pub suggestions: Vec<SuggestionReply>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestionReply {
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(alias = "suggestion", alias = "rewrite")]
    pub text: String,
    #[serde(default)]
    pub rationale: String,
}

impl SuggestionReply {
    /// Convert into a suggestion, falling back to the positional type when the
    /// reply's tag is missing or unrecognised.
    pub fn into_suggestion(self, position: usize) -> Suggestion {
        let fallback = SuggestionType::ALL[position % SuggestionType::ALL.len()];
        let kind = self
            .kind
            .and_then(|tag| {
                let normalized = tag.trim().to_lowercase().replace([' ', '-'], "_");
                serde_json::from_value::<SuggestionType>(serde_json::Value::String(normalized))
                    .ok()
            })
            .unwrap_or(fallback);
        Suggestion::new(kind, self.text, self.rationale)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct JudgeReply {
    pub evaluations: Vec<JudgeEvaluation>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentPoints {
    #[serde(default, alias = "purposeful_contribution")]
    pub purposeful_contribution: f64,
    #[serde(default, alias = "storytelling_strength")]
    pub storytelling_strength: f64,
    #[serde(default)]
    pub authenticity: f64,
    #[serde(default, alias = "structural_originality")]
    pub structural_originality: f64,
    #[serde(default, alias = "word_efficiency")]
    pub word_efficiency: f64,
}

impl ComponentPoints {
    pub fn into_scores(self) -> Vec<ComponentScore> {
        QualityComponent::ALL
            .iter()
            .map(|&component| {
                let raw = match component {
                    QualityComponent::PurposefulContribution => self.purposeful_contribution,
                    QualityComponent::StorytellingStrength => self.storytelling_strength,
                    QualityComponent::Authenticity => self.authenticity,
                    QualityComponent::StructuralOriginality => self.structural_originality,
                    QualityComponent::WordEfficiency => self.word_efficiency,
                };
                ComponentScore::clamped(component, raw)
            })
            .collect()
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JudgeFailure {
    pub category: String,
    #[serde(default, alias = "message")]
    pub detail: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JudgeEvaluation {
    /// Zero-based position of the suggestion in the judged batch.
    pub index: usize,
    #[serde(alias = "scores")]
    pub components: ComponentPoints,
    #[serde(default)]
    pub failures: Vec<JudgeFailure>,
    #[serde(default)]
    pub strengths: Vec<String>,
    #[serde(default, alias = "retry_guidance")]
    pub retry_guidance: String,
}
