//! Data model shared by every pipeline stage
//!
//! All entities live only for the duration of one pipeline run. Anything that
//! must survive between stage calls travels inside the continuation token.

pub mod validation;
pub mod workshop;

pub use validation::{
    ComponentScore, FinalResult, ItemOutcome, QualityComponent, ValidatedItem, ValidationFailure,
    ValidationResult, ValidationSummary,
};
pub use workshop::{IssueSeverity, Suggestion, SuggestionType, WorkshopItem, MAX_SUGGESTIONS};

use serde::{Deserialize, Serialize};

use crate::rules::Finding;

/// The caller's original essay submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EssayRequest {
    pub essay_text: String,
    pub prompt_text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub essay_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

impl EssayRequest {
    pub fn new(essay_text: impl Into<String>, prompt_text: impl Into<String>) -> Self {
        Self {
            essay_text: essay_text.into(),
            prompt_text: prompt_text.into(),
            essay_type: None,
            title: None,
        }
    }

    pub fn with_essay_type(mut self, essay_type: impl Into<String>) -> Self {
        self.essay_type = Some(essay_type.into());
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn word_count(&self) -> usize {
        self.essay_text.split_whitespace().count()
    }
}

/// How the writer sounds: cadence, diction and recurring moves.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoiceFingerprint {
    #[serde(default)]
    pub tone: String,
    #[serde(default)]
    pub sentence_structure: String,
    #[serde(default)]
    pub vocabulary: String,
    #[serde(default)]
    pub signature_moves: Vec<String>,
}

/// What makes the writer's material distinctive versus commonplace.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExperienceFingerprint {
    #[serde(default)]
    pub unique_elements: Vec<String>,
    #[serde(default)]
    pub common_elements: Vec<String>,
    #[serde(default)]
    pub underused_material: Vec<String>,
    /// 0-10, as judged by the generation service.
    #[serde(default)]
    pub uniqueness_score: f64,
}

/// One rubric dimension with its raw and calibrated score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DimensionScore {
    pub dimension: String,
    pub raw_score: f64,
    pub calibrated_score: f64,
    #[serde(default)]
    pub evidence: String,
}

/// Rubric result after local calibration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RubricAnalysis {
    pub dimensions: Vec<DimensionScore>,
    /// Narrative quality index as returned by the service.
    pub raw_nqi: f64,
    /// Narrative quality index after calibration.
    pub nqi: f64,
    #[serde(default)]
    pub summary: String,
}

impl RubricAnalysis {
    pub fn dimension(&self, name: &str) -> Option<&DimensionScore> {
        self.dimensions
            .iter()
            .find(|d| d.dimension.eq_ignore_ascii_case(name))
    }

    /// Dimensions ordered weakest first, used to steer item generation.
    pub fn weakest_dimensions(&self, count: usize) -> Vec<&DimensionScore> {
        let mut sorted: Vec<&DimensionScore> = self.dimensions.iter().collect();
        sorted.sort_by(|a, b| a.calibrated_score.total_cmp(&b.calibrated_score));
        sorted.into_iter().take(count).collect()
    }
}

/// Output of the analysis stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisOutput {
    pub voice_fingerprint: Option<VoiceFingerprint>,
    pub experience_fingerprint: Option<ExperienceFingerprint>,
    pub rubric_analysis: RubricAnalysis,
    /// Informational rule-engine findings over the whole essay.
    #[serde(default)]
    pub essay_flags: Vec<Finding>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rubric() -> RubricAnalysis {
        RubricAnalysis {
            dimensions: vec![
                DimensionScore {
                    dimension: "Voice".to_string(),
                    raw_score: 7.0,
                    calibrated_score: 7.5,
                    evidence: String::new(),
                },
                DimensionScore {
                    dimension: "Reflection".to_string(),
                    raw_score: 4.0,
                    calibrated_score: 4.5,
                    evidence: String::new(),
                },
                DimensionScore {
                    dimension: "Specificity".to_string(),
                    raw_score: 9.0,
                    calibrated_score: 9.0,
                    evidence: String::new(),
                },
            ],
            raw_nqi: 62.0,
            nqi: 69.0,
            summary: String::new(),
        }
    }

    #[test]
    fn test_weakest_dimensions_sorted_ascending() {
        let rubric = rubric();
        let weakest: Vec<&str> = rubric
            .weakest_dimensions(2)
            .iter()
            .map(|d| d.dimension.as_str())
            .collect();
        assert_eq!(weakest, vec!["Reflection", "Voice"]);
    }

    #[test]
    fn test_dimension_lookup_is_case_insensitive() {
        assert!(rubric().dimension("voice").is_some());
        assert!(rubric().dimension("structure").is_none());
    }

    #[test]
    fn test_essay_request_uses_camel_case_on_the_wire() {
        let request = EssayRequest::new("My essay", "Prompt").with_title("Title");
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["essayText"], "My essay");
        assert_eq!(json["promptText"], "Prompt");
        assert_eq!(json["title"], "Title");
        assert!(json.get("essayType").is_none());
    }
}
