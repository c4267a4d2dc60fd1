//! End-to-end stage flow against a scripted generation service

use std::sync::Arc;

use narrative_workshop::config::PipelineConfig;
use narrative_workshop::controller::{Stage, StageController, StageRequest};
use narrative_workshop::generation::CallKind;
use narrative_workshop::model::{FinalResult, ItemOutcome};
use narrative_workshop::testing::{fixtures, ScriptedClient};
use narrative_workshop::Error;

const QUOTES: [&str; 3] = [
    "I was very sad when he moved into the care home.",
    "I learned that some things take patience.",
    "The truck sat in the driveway with a tarp over it.",
];

fn scripted_analysis(client: ScriptedClient) -> ScriptedClient {
    client
        .with_reply(CallKind::VoiceFingerprint, fixtures::VOICE_REPLY)
        .with_reply(CallKind::ExperienceFingerprint, fixtures::EXPERIENCE_REPLY)
        .with_reply(CallKind::RubricAnalysis, fixtures::RUBRIC_REPLY)
}

async fn run_all_stages(client: Arc<ScriptedClient>) -> Result<FinalResult, Error> {
    let controller = StageController::new(client, PipelineConfig::default());

    let first = controller
        .dispatch(
            Stage::Analysis,
            StageRequest::from_essay(&fixtures::essay_request()),
        )
        .await?;
    assert_eq!(first.next_stage, Some(2));

    let second = controller
        .dispatch(
            Stage::Generation,
            StageRequest::from_token(first.continue_token.unwrap()),
        )
        .await?;
    assert_eq!(second.next_stage, Some(3));

    let third = controller
        .dispatch(
            Stage::Validation,
            StageRequest::from_token(second.continue_token.unwrap()),
        )
        .await?;
    assert!(third.continue_token.is_none());

    Ok(serde_json::from_value(third.data).unwrap())
}

#[tokio::test]
async fn test_all_suggestions_pass_without_regeneration() {
    let client = Arc::new(
        scripted_analysis(ScriptedClient::new())
            .with_default_reply(CallKind::WorkshopItems, fixtures::items_reply(&QUOTES))
            .with_default_reply(CallKind::JudgeSuggestions, fixtures::judge_reply(&[90, 85, 80])),
    );

    let result = run_all_stages(client.clone()).await.unwrap();

    assert_eq!(result.items.len(), 9);
    assert_eq!(result.summary.regeneration_calls, 0);
    assert_eq!(result.summary.judge_calls, 9);
    assert_eq!(client.calls(CallKind::RegenerateSuggestions), 0);
    assert_eq!(client.calls(CallKind::JudgeSuggestions), 9);
    for item in &result.items {
        assert_eq!(item.item.suggestions.len(), 3);
        assert_eq!(item.validations.len(), 3);
        assert_eq!(item.outcome, ItemOutcome::Success);
        assert_eq!(item.quality_scores(), vec![90, 85, 80]);
    }
    assert_eq!(result.analysis.rubric_analysis.nqi, 85.0);
}

#[tokio::test]
async fn test_persistent_rejection_is_bounded_and_items_are_dropped() {
    let client = Arc::new(
        scripted_analysis(ScriptedClient::new())
            .with_default_reply(CallKind::WorkshopItems, fixtures::items_reply(&QUOTES[..1]))
            .with_default_reply(CallKind::JudgeSuggestions, fixtures::judge_reply(&[20, 30, 40]))
            .with_default_reply(
                CallKind::RegenerateSuggestions,
                fixtures::suggestions_reply(&["Try one.", "Try two.", "Try three."]),
            ),
    );

    let result = run_all_stages(client.clone()).await.unwrap();

    assert!(result.items.is_empty());
    assert_eq!(result.summary.total_items, 3);
    assert_eq!(result.summary.dropped_items, 3);
    // Three items, each allowed two regeneration rounds.
    assert_eq!(client.calls(CallKind::RegenerateSuggestions), 6);
    assert_eq!(client.calls(CallKind::JudgeSuggestions), 9);
}

#[tokio::test]
async fn test_regeneration_feedback_reaches_the_service() {
    let client = Arc::new(
        scripted_analysis(ScriptedClient::new())
            .with_default_reply(CallKind::WorkshopItems, fixtures::items_reply(&QUOTES[..1]))
            .with_default_reply(CallKind::JudgeSuggestions, fixtures::judge_reply(&[90, 50, 50]))
            .with_default_reply(
                CallKind::RegenerateSuggestions,
                fixtures::suggestions_reply(&["Try one.", "Try two."]),
            ),
    );

    let result = run_all_stages(client.clone()).await.unwrap();

    assert_eq!(result.items.len(), 3);
    for request in client.requests(CallKind::RegenerateSuggestions) {
        assert!(request.user.contains("Anchor the line in a specific object"));
    }
    for item in &result.items {
        assert!(item.item.suggestions.len() <= 3);
        assert!(item.attempts <= 3);
    }
}

#[tokio::test]
async fn test_branch_failures_are_isolated() {
    let items = fixtures::items_reply(&QUOTES);
    let client = Arc::new(
        ScriptedClient::new()
            .with_upstream_error(CallKind::VoiceFingerprint, 503)
            .with_reply(CallKind::ExperienceFingerprint, "not json")
            .with_reply(CallKind::RubricAnalysis, fixtures::RUBRIC_REPLY)
            .with_reply(CallKind::WorkshopItems, items.clone())
            .with_upstream_error(CallKind::WorkshopItems, 500)
            .with_reply(CallKind::WorkshopItems, items)
            .with_default_reply(CallKind::JudgeSuggestions, fixtures::judge_reply(&[88, 77, 71])),
    );

    let result = run_all_stages(client).await.unwrap();

    assert!(result.analysis.voice_fingerprint.is_none());
    assert!(result.analysis.experience_fingerprint.is_none());
    assert_eq!(result.items.len(), 6);
}

#[tokio::test]
async fn test_judge_outage_fails_open() {
    let client = Arc::new(
        scripted_analysis(ScriptedClient::new())
            .with_default_reply(CallKind::WorkshopItems, fixtures::items_reply(&QUOTES[..1]))
            .with_default_error(CallKind::JudgeSuggestions, 529),
    );

    let result = run_all_stages(client.clone()).await.unwrap();

    assert_eq!(result.items.len(), 3);
    assert_eq!(result.summary.fail_open_count, 9);
    assert_eq!(client.calls(CallKind::RegenerateSuggestions), 0);
    for item in &result.items {
        assert!(item.validations.iter().all(|v| v.score == 65 && !v.judged));
    }
}

#[tokio::test]
async fn test_rubric_failure_fails_stage_one() {
    let client = Arc::new(
        ScriptedClient::new()
            .with_reply(CallKind::VoiceFingerprint, fixtures::VOICE_REPLY)
            .with_reply(CallKind::ExperienceFingerprint, fixtures::EXPERIENCE_REPLY)
            .with_reply(CallKind::RubricAnalysis, "I'd rather not score this."),
    );

    let err = run_all_stages(client.clone()).await.unwrap_err();

    assert!(matches!(err, Error::StageFailed { stage: 1, .. }));
    assert!(!err.is_client_error());
    assert_eq!(client.calls(CallKind::WorkshopItems), 0);
}

#[tokio::test]
async fn test_in_process_run_matches_staged_run() {
    let client = Arc::new(
        scripted_analysis(ScriptedClient::new())
            .with_default_reply(CallKind::WorkshopItems, fixtures::items_reply(&QUOTES[..2]))
            .with_default_reply(CallKind::JudgeSuggestions, fixtures::judge_reply(&[75, 75, 75])),
    );
    let controller = StageController::new(client, PipelineConfig::default());

    let result = controller
        .run_to_completion(fixtures::essay_request())
        .await
        .unwrap();

    assert_eq!(result.items.len(), 6);
    assert_eq!(result.summary.average_quality, 75.0);
}
