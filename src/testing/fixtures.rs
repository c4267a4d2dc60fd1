//! Canned inputs and reply bodies

use serde_json::json;

use crate::model::{
    AnalysisOutput, DimensionScore, EssayRequest, ExperienceFingerprint, IssueSeverity,
    RubricAnalysis, Suggestion, SuggestionType, VoiceFingerprint, WorkshopItem,
};
use crate::pipeline::prompts::RUBRIC_DIMENSIONS;

pub const ESSAY: &str = "The first time I opened the hood of my grandfather's truck, the \
smell of old oil hit me before anything else. He handed me a socket wrench and said nothing. \
For three summers we rebuilt that engine one bolt at a time.\n\n\
I was very sad when he moved into the care home. The truck sat in the driveway with a tarp \
over it. I learned that some things take patience.\n\n\
Last spring I finally turned the key. The engine coughed, caught, and idled rough. I sat \
there with grease under my nails and listened until the light went orange.";

pub const PROMPT: &str = "Describe a problem you have solved or would like to solve.";

pub const VOICE_REPLY: &str = r#"```json
{
  "tone": "quiet, understated",
  "sentenceStructure": "short declaratives broken by one longer sentence",
  "vocabulary": "concrete, mechanical",
  "signatureMoves": ["sensory openings", "withheld emotion"]
}
```"#;

pub const EXPERIENCE_REPLY: &str = r#"{
  "uniqueElements": ["three summers rebuilding an engine"],
  "commonElements": ["grandparent illness"],
  "underusedMaterial": ["the silence between them while working"],
  "uniquenessScore": 7
}"#;

/// Rubric reply with a raw index of 80. "Voice and Authenticity" scores 5
/// and "Opening Hook" scores 9.5.
pub const RUBRIC_REPLY: &str = r#"Here is my assessment.
{
  "dimensions": [
    {"dimension": "Opening Hook", "score": 9.5, "evidence": "smell of old oil"},
    {"dimension": "Character Development", "score": 7, "evidence": "grandfather sketched"},
    {"dimension": "Stakes and Tension", "score": 6, "evidence": "care home"},
    {"dimension": "Sensory Detail", "score": 8, "evidence": "grease under my nails"},
    {"dimension": "Show vs Tell", "score": 4, "evidence": "I was very sad"},
    {"dimension": "Reflection and Insight", "score": 5, "evidence": "I learned that"},
    {"dimension": "Voice and Authenticity", "score": 5, "evidence": "plain but honest"},
    {"dimension": "Structure and Pacing", "score": 7, "evidence": "three movements"},
    {"dimension": "Prompt Alignment", "score": 6, "evidence": "problem is implicit"},
    {"dimension": "Conclusion", "score": 8, "evidence": "light went orange"}
  ],
  "narrativeQualityIndex": 80,
  "summary": "A strong sensory frame around a told middle section."
}"#;

pub fn essay_request() -> EssayRequest {
    EssayRequest::new(ESSAY, PROMPT).with_essay_type("personal statement")
}

pub fn analysis_output() -> AnalysisOutput {
    let dimensions = RUBRIC_DIMENSIONS
        .iter()
        .enumerate()
        .map(|(i, name)| {
            let raw = 4.0 + (i % 5) as f64;
            DimensionScore {
                dimension: (*name).to_string(),
                raw_score: raw,
                calibrated_score: raw + 0.5,
                evidence: format!("evidence for {name}"),
            }
        })
        .collect();

    AnalysisOutput {
        voice_fingerprint: Some(VoiceFingerprint {
            tone: "quiet".to_string(),
            sentence_structure: "short declaratives".to_string(),
            vocabulary: "mechanical".to_string(),
            signature_moves: vec!["withheld emotion".to_string()],
        }),
        experience_fingerprint: Some(ExperienceFingerprint {
            unique_elements: vec!["engine rebuild".to_string()],
            common_elements: vec!["grandparent illness".to_string()],
            underused_material: vec!["silence while working".to_string()],
            uniqueness_score: 7.0,
        }),
        rubric_analysis: RubricAnalysis {
            dimensions,
            raw_nqi: 72.0,
            nqi: 81.0,
            summary: "Sensory frame, told middle.".to_string(),
        },
        essay_flags: Vec::new(),
    }
}

/// Suggestion texts that pass every deterministic rule.
pub const CLEAN_SUGGESTIONS: [&str; 3] = [
    "When the ambulance pulled away, I pulled the tarp over the truck and did not lift it for a year.",
    "I kept his wrench in my backpack. Some mornings I checked that it was still there.",
    "The driveway held two things he could not take with him: the truck, and me.",
];

pub fn workshop_item(id: &str) -> WorkshopItem {
    WorkshopItem {
        id: id.to_string(),
        quote: "I was very sad when he moved into the care home.".to_string(),
        problem: "Names the emotion instead of dramatizing it".to_string(),
        severity: IssueSeverity::Major,
        dimension: "Show vs Tell".to_string(),
        suggestions: SuggestionType::ALL
            .iter()
            .zip(CLEAN_SUGGESTIONS)
            .map(|(&kind, text)| Suggestion::new(kind, text, "Shows the loss through action"))
            .collect(),
    }
}

fn suggestion_json() -> serde_json::Value {
    json!([
        {"type": "minimal_edit", "text": CLEAN_SUGGESTIONS[0], "rationale": "action"},
        {"type": "voice_amplification", "text": CLEAN_SUGGESTIONS[1], "rationale": "voice"},
        {"type": "divergent_alternative", "text": CLEAN_SUGGESTIONS[2], "rationale": "reframe"}
    ])
}

/// A generation batch reply with one item per quote.
pub fn items_reply(quotes: &[&str]) -> String {
    let items: Vec<_> = quotes
        .iter()
        .map(|quote| {
            json!({
                "quote": quote,
                "problem": "Tells the reader what to feel",
                "severity": "major",
                "dimension": "Show vs Tell",
                "suggestions": suggestion_json()
            })
        })
        .collect();
    json!({ "items": items }).to_string()
}

/// A regeneration reply carrying `texts` as suggestions.
pub fn suggestions_reply(texts: &[&str]) -> String {
    let suggestions: Vec<_> = texts
        .iter()
        .zip(SuggestionType::ALL.iter().cycle())
        .map(|(text, kind)| json!({"type": kind, "text": text, "rationale": "regenerated"}))
        .collect();
    format!("```json\n{}\n```", json!({ "suggestions": suggestions }))
}

/// Split a 0-100 total across the weighted components, filling the
/// heaviest first, so the recomputed total equals `total` exactly.
fn component_points(total: u8) -> serde_json::Value {
    let mut remaining = u32::from(total.min(100));
    let mut take = |cap: u32| {
        let points = remaining.min(cap);
        remaining -= points;
        points
    };
    json!({
        "purposefulContribution": take(30),
        "storytellingStrength": take(30),
        "authenticity": take(20),
        "structuralOriginality": take(15),
        "wordEfficiency": take(5)
    })
}

/// A judge reply with one evaluation per score, in order.
pub fn judge_reply(totals: &[u8]) -> String {
    let evaluations: Vec<_> = totals
        .iter()
        .enumerate()
        .map(|(index, &total)| {
            json!({
                "index": index,
                "components": component_points(total),
                "failures": if total < 70 {
                    json!([{"category": "generic", "detail": "Could appear in any essay"}])
                } else {
                    json!([])
                },
                "strengths": ["concrete image"],
                "retryGuidance": if total < 70 { "Anchor the line in a specific object" } else { "" }
            })
        })
        .collect();
    json!({ "evaluations": evaluations }).to_string()
}
