//! Instructions and payloads sent to the generation service
//!
//! Each builder returns a [`GenerationRequest`] whose system instruction pins
//! the JSON reply shape parsed in [`crate::generation::replies`].

use std::fmt::Write;

use crate::generation::{CallKind, GenerationRequest};
use crate::model::{
    AnalysisOutput, EssayRequest, RubricAnalysis, Suggestion, SuggestionType, WorkshopItem,
};
use crate::rules::Finding;

/// Rubric dimensions scored by the analysis stage.
pub const RUBRIC_DIMENSIONS: &[&str] = &[
    "Opening Hook",
    "Character Development",
    "Stakes and Tension",
    "Sensory Detail",
    "Show vs Tell",
    "Reflection and Insight",
    "Voice and Authenticity",
    "Structure and Pacing",
    "Prompt Alignment",
    "Conclusion",
];

fn essay_block(request: &EssayRequest) -> String {
    let mut block = String::new();
    let _ = writeln!(block, "PROMPT:\n{}\n", request.prompt_text);
    if let Some(essay_type) = &request.essay_type {
        let _ = writeln!(block, "ESSAY TYPE: {essay_type}\n");
    }
    if let Some(title) = &request.title {
        let _ = writeln!(block, "TITLE: {title}\n");
    }
    let _ = writeln!(
        block,
        "ESSAY ({} words):\n{}",
        request.word_count(),
        request.essay_text
    );
    block
}

pub fn voice_fingerprint(request: &EssayRequest) -> GenerationRequest {
    let system = "You analyze the writing voice of a student essay. Reply with only a JSON \
        object: {\"tone\": string, \"sentenceStructure\": string, \"vocabulary\": string, \
        \"signatureMoves\": [string]}. Describe what the writer actually does; do not judge.";
    GenerationRequest::new(CallKind::VoiceFingerprint, system, essay_block(request))
        .with_max_tokens(1024)
        .with_temperature(0.3)
}

pub fn experience_fingerprint(request: &EssayRequest) -> GenerationRequest {
    let system = "You identify what is distinctive about the experiences in a student essay. \
        Reply with only a JSON object: {\"uniqueElements\": [string], \"commonElements\": \
        [string], \"underusedMaterial\": [string], \"uniquenessScore\": number 0-10}.";
    GenerationRequest::new(CallKind::ExperienceFingerprint, system, essay_block(request))
        .with_max_tokens(1024)
        .with_temperature(0.3)
}

pub fn rubric_analysis(request: &EssayRequest) -> GenerationRequest {
    let system = format!(
        "You score a student essay against a fixed rubric. Score each dimension from 0 to 10 \
         and give one sentence of evidence quoting the essay. Dimensions: {}. Then give an \
         overall narrative quality index from 0 to 100. Reply with only a JSON object: \
         {{\"dimensions\": [{{\"dimension\": string, \"score\": number, \"evidence\": string}}], \
         \"narrativeQualityIndex\": number, \"summary\": string}}.",
        RUBRIC_DIMENSIONS.join(", ")
    );
    GenerationRequest::new(CallKind::RubricAnalysis, system, essay_block(request))
        .with_max_tokens(2048)
        .with_temperature(0.2)
}

fn rubric_focus(rubric: &RubricAnalysis) -> String {
    rubric
        .weakest_dimensions(4)
        .iter()
        .map(|d| format!("- {} ({:.1}/10): {}", d.dimension, d.calibrated_score, d.evidence))
        .collect::<Vec<_>>()
        .join("\n")
}

fn suggestion_types() -> String {
    SuggestionType::ALL
        .iter()
        .map(|t| {
            format!(
                "\"{}\" ({})",
                serde_json::to_value(t)
                    .ok()
                    .and_then(|v| v.as_str().map(str::to_string))
                    .unwrap_or_default(),
                t.label()
            )
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// One generation batch. `batch` is 1-based and steers batches toward
/// different passages.
pub fn workshop_items(
    request: &EssayRequest,
    analysis: &AnalysisOutput,
    batch: usize,
    batch_count: usize,
    items_per_batch: usize,
) -> GenerationRequest {
    let system = format!(
        "You are an essay workshop coach. Find exactly {items_per_batch} distinct passages in \
         the essay that most need work. Quote each passage verbatim. For each, give a problem \
         description, a severity (critical, major or minor), the rubric dimension it affects, \
         and three suggestions, one of each type: {}. Preserve the writer's voice. Reply with \
         only a JSON object: {{\"items\": [{{\"quote\": string, \"problem\": string, \
         \"severity\": string, \"dimension\": string, \"suggestions\": [{{\"type\": string, \
         \"text\": string, \"rationale\": string}}]}}]}}.",
        suggestion_types()
    );

    let mut user = essay_block(request);
    let _ = writeln!(user, "\nWEAKEST RUBRIC DIMENSIONS:\n{}", rubric_focus(&analysis.rubric_analysis));
    if let Some(voice) = &analysis.voice_fingerprint {
        let _ = writeln!(
            user,
            "\nVOICE TO PRESERVE: tone {}; sentences {}; moves {}",
            voice.tone,
            voice.sentence_structure,
            voice.signature_moves.join(", ")
        );
    }
    if let Some(experience) = &analysis.experience_fingerprint {
        if !experience.underused_material.is_empty() {
            let _ = writeln!(
                user,
                "\nUNDERUSED MATERIAL: {}",
                experience.underused_material.join("; ")
            );
        }
    }
    let _ = writeln!(
        user,
        "\nThis is batch {batch} of {batch_count}. Work through the essay in order and focus \
         on the portion roughly {}% to {}% of the way through.",
        (batch - 1) * 100 / batch_count,
        batch * 100 / batch_count
    );

    GenerationRequest::new(CallKind::WorkshopItems, system, user)
        .with_temperature(0.8)
}

fn warning_context(warnings: &[Finding]) -> String {
    if warnings.is_empty() {
        return "none".to_string();
    }
    warnings
        .iter()
        .map(|f| format!("{} \"{}\"", f.category.as_str(), f.evidence))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Judge every suggestion of one item in a single call. `warnings` holds the
/// pre-filter warnings per suggestion, index-aligned with `suggestions`.
pub fn judge_suggestions(
    request: &EssayRequest,
    item: &WorkshopItem,
    suggestions: &[&Suggestion],
    warnings: &[Vec<Finding>],
) -> GenerationRequest {
    let system = "You are a strict judge of essay revision suggestions. Score each suggestion \
        on five components with these maximum points: purposefulContribution 30, \
        storytellingStrength 30, authenticity 20, structuralOriginality 15, wordEfficiency 5. \
        List concrete failures and strengths, and give retry guidance a writer could act on. \
        Reply with only a JSON object: {\"evaluations\": [{\"index\": number, \"components\": \
        {\"purposefulContribution\": number, \"storytellingStrength\": number, \
        \"authenticity\": number, \"structuralOriginality\": number, \"wordEfficiency\": \
        number}, \"failures\": [{\"category\": string, \"detail\": string}], \"strengths\": \
        [string], \"retryGuidance\": string}]}.";

    let mut user = String::new();
    let _ = writeln!(user, "ESSAY PROMPT: {}\n", request.prompt_text);
    let _ = writeln!(user, "ORIGINAL PASSAGE: \"{}\"", item.quote);
    let _ = writeln!(user, "PROBLEM: {} ({})\n", item.problem, item.dimension);
    for (index, suggestion) in suggestions.iter().enumerate() {
        let flags = warnings.get(index).map(Vec::as_slice).unwrap_or_default();
        let _ = writeln!(
            user,
            "[{index}] {}:\n{}\nRationale: {}\nAutomated warnings: {}\n",
            suggestion.kind.label(),
            suggestion.text,
            suggestion.rationale,
            warning_context(flags)
        );
    }

    GenerationRequest::new(CallKind::JudgeSuggestions, system, user)
        .with_max_tokens(2048)
        .with_temperature(0.1)
}

/// Ask for brand-new suggestions for `item`, carrying the accumulated guidance.
pub fn regenerate_suggestions(
    request: &EssayRequest,
    item: &WorkshopItem,
    guidance: &[String],
    rejected: &[String],
    count: usize,
) -> GenerationRequest {
    let system = format!(
        "You are an essay workshop coach rewriting a passage. Earlier suggestions were \
         rejected. Write {count} brand-new suggestions, one of each type: {}. Address every \
         point of feedback. Do not reuse rejected wording. Reply with only a JSON object: \
         {{\"suggestions\": [{{\"type\": string, \"text\": string, \"rationale\": string}}]}}.",
        suggestion_types()
    );

    let mut user = essay_block(request);
    let _ = writeln!(user, "\nPASSAGE: \"{}\"", item.quote);
    let _ = writeln!(user, "PROBLEM: {} ({})", item.problem, item.dimension);
    let _ = writeln!(user, "\nFEEDBACK ON REJECTED SUGGESTIONS:");
    for line in guidance {
        let _ = writeln!(user, "- {line}");
    }
    if !rejected.is_empty() {
        let _ = writeln!(user, "\nREJECTED WORDING:");
        for text in rejected {
            let _ = writeln!(user, "- {text}");
        }
    }

    GenerationRequest::new(CallKind::RegenerateSuggestions, system, user)
        .with_max_tokens(2048)
        .with_temperature(0.9)
}
