use serde::{Deserialize, Serialize};

/// Maximum number of suggestions an item carries.
pub const MAX_SUGGESTIONS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestionType {
    #[serde(alias = "minimal", alias = "polished_original")]
    MinimalEdit,
    #[serde(alias = "voice_amplifier", alias = "voice_preserving_amplification")]
    VoiceAmplification,
    #[serde(alias = "divergent", alias = "bold_alternative")]
    DivergentAlternative,
}

impl SuggestionType {
    pub const ALL: [SuggestionType; 3] = [
        SuggestionType::MinimalEdit,
        SuggestionType::VoiceAmplification,
        SuggestionType::DivergentAlternative,
    ];

    pub fn label(self) -> &'static str {
        match self {
            SuggestionType::MinimalEdit => "minimal edit",
            SuggestionType::VoiceAmplification => "voice-preserving amplification",
            SuggestionType::DivergentAlternative => "divergent alternative",
        }
    }
}

/// A proposed rewrite. Never edited after creation; regeneration produces new ones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Suggestion {
    #[serde(rename = "type")]
    pub kind: SuggestionType,
    pub text: String,
    #[serde(default)]
    pub rationale: String,
}

impl Suggestion {
    pub fn new(kind: SuggestionType, text: impl Into<String>, rationale: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
            rationale: rationale.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueSeverity {
    #[serde(alias = "high")]
    Critical,
    #[serde(alias = "medium", alias = "moderate")]
    Major,
    #[serde(alias = "low")]
    Minor,
}

/// One improvable excerpt of the essay and its candidate rewrites.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkshopItem {
    pub id: String,
    /// Verbatim excerpt from the essay.
    pub quote: String,
    pub problem: String,
    pub severity: IssueSeverity,
    /// Rubric dimension this item addresses.
    pub dimension: String,
    #[serde(default)]
    pub suggestions: Vec<Suggestion>,
}

impl WorkshopItem {
    /// Returns a copy of this item carrying `suggestions` instead of its own.
    pub fn with_suggestions(&self, suggestions: Vec<Suggestion>) -> Self {
        Self {
            suggestions,
            ..self.clone()
        }
    }
}
