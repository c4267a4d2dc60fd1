//! Stage 1: essay analysis
//!
//! Three independent calls run concurrently. The voice and experience
//! fingerprints are optional: a failure there is logged and recorded as
//! `None`. The rubric analysis is required downstream, so its failure fails
//! the stage.

use std::time::Instant;
use tracing::{info, instrument, warn};

use super::calibration::calibrate_nqi;
use super::prompts;
use crate::error::{Error, Result};
use crate::generation::replies::RubricReply;
use crate::generation::{generate, GenerationClient};
use crate::model::{
    AnalysisOutput, EssayRequest, ExperienceFingerprint, RubricAnalysis, VoiceFingerprint,
};
use crate::rules::RuleEngine;

fn optional_branch<T>(name: &str, result: Result<T>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(branch = name, error = %e, "optional analysis branch failed; continuing without it");
            None
        }
    }
}

/// Convert the service's rubric reply into a calibrated analysis.
pub fn calibrate_rubric(reply: RubricReply) -> RubricAnalysis {
    RubricAnalysis {
        raw_nqi: reply.narrative_quality_index,
        nqi: calibrate_nqi(reply.narrative_quality_index),
        dimensions: reply
            .dimensions
            .into_iter()
            .map(|d| d.into_calibrated())
            .collect(),
        summary: reply.summary,
    }
}

#[instrument(skip_all, fields(stage = 1, words = request.word_count()))]
pub async fn run_analysis(
    client: &dyn GenerationClient,
    rules: &RuleEngine,
    request: &EssayRequest,
) -> Result<AnalysisOutput> {
    let start = Instant::now();
    let voice_request = prompts::voice_fingerprint(request);
    let experience_request = prompts::experience_fingerprint(request);
    let rubric_request = prompts::rubric_analysis(request);

    let (voice, experience, rubric) = tokio::join!(
        generate::<VoiceFingerprint>(client, &voice_request),
        generate::<ExperienceFingerprint>(client, &experience_request),
        generate::<RubricReply>(client, &rubric_request),
    );

    let rubric = rubric.map_err(|e| Error::StageFailed {
        stage: 1,
        reason: format!("rubric analysis failed: {e}"),
    })?;
    if rubric.dimensions.is_empty() {
        return Err(Error::StageFailed {
            stage: 1,
            reason: "rubric analysis returned no dimensions".to_string(),
        });
    }

    let output = AnalysisOutput {
        voice_fingerprint: optional_branch("voice_fingerprint", voice),
        experience_fingerprint: optional_branch("experience_fingerprint", experience),
        rubric_analysis: calibrate_rubric(rubric),
        essay_flags: rules.check(&request.essay_text),
    };

    info!(
        nqi = output.rubric_analysis.nqi,
        dimensions = output.rubric_analysis.dimensions.len(),
        voice = output.voice_fingerprint.is_some(),
        experience = output.experience_fingerprint.is_some(),
        flags = output.essay_flags.len(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "analysis stage complete"
    );
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::CallKind;
    use crate::testing::{fixtures, ScriptedClient};

    fn healthy_client() -> ScriptedClient {
        ScriptedClient::new()
            .with_reply(CallKind::VoiceFingerprint, fixtures::VOICE_REPLY)
            .with_reply(CallKind::ExperienceFingerprint, fixtures::EXPERIENCE_REPLY)
            .with_reply(CallKind::RubricAnalysis, fixtures::RUBRIC_REPLY)
    }

    #[tokio::test]
    async fn test_all_branches_succeed() {
        let client = healthy_client();
        let output = run_analysis(&client, &RuleEngine::standard(), &fixtures::essay_request())
            .await
            .unwrap();

        assert!(output.voice_fingerprint.is_some());
        assert!(output.experience_fingerprint.is_some());
        assert_eq!(output.rubric_analysis.raw_nqi, 80.0);
        assert_eq!(output.rubric_analysis.nqi, 85.0);
        let voice = output.rubric_analysis.dimension("Voice and Authenticity").unwrap();
        assert_eq!(voice.raw_score, 5.0);
        assert_eq!(voice.calibrated_score, 5.5);
        let hook = output.rubric_analysis.dimension("Opening Hook").unwrap();
        assert_eq!(hook.calibrated_score, 9.5);
    }

    #[tokio::test]
    async fn test_voice_failure_is_isolated() {
        let client = healthy_client().with_upstream_error(CallKind::VoiceFingerprint, 500);
        let output = run_analysis(&client, &RuleEngine::standard(), &fixtures::essay_request())
            .await
            .unwrap();

        assert!(output.voice_fingerprint.is_none());
        assert!(output.experience_fingerprint.is_some());
        assert!(!output.rubric_analysis.dimensions.is_empty());
    }

    #[tokio::test]
    async fn test_experience_parse_error_is_isolated() {
        let client =
            healthy_client().with_reply(CallKind::ExperienceFingerprint, "no json here, sorry");
        let output = run_analysis(&client, &RuleEngine::standard(), &fixtures::essay_request())
            .await
            .unwrap();

        assert!(output.voice_fingerprint.is_some());
        assert!(output.experience_fingerprint.is_none());
    }

    #[tokio::test]
    async fn test_rubric_failure_is_fatal() {
        let client = healthy_client().with_upstream_error(CallKind::RubricAnalysis, 502);
        let err = run_analysis(&client, &RuleEngine::standard(), &fixtures::essay_request())
            .await
            .unwrap_err();

        assert!(matches!(err, Error::StageFailed { stage: 1, .. }));
        assert_eq!(client.calls(CallKind::VoiceFingerprint), 1);
        assert_eq!(client.calls(CallKind::ExperienceFingerprint), 1);
    }

    #[tokio::test]
    async fn test_empty_rubric_is_fatal() {
        let client = healthy_client()
            .with_reply(CallKind::RubricAnalysis, r#"{"dimensions": [], "nqi": 40}"#);
        let err = run_analysis(&client, &RuleEngine::standard(), &fixtures::essay_request())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::StageFailed { stage: 1, .. }));
    }

    #[tokio::test]
    async fn test_essay_flags_are_recorded() {
        let client = healthy_client();
        let request = EssayRequest::new(
            "Ever since I was a child I loved robots. I felt so proud when mine walked.",
            "Tell us about a passion.",
        );
        let output = run_analysis(&client, &RuleEngine::standard(), &request)
            .await
            .unwrap();
        assert!(output.essay_flags.len() >= 2);
    }
}
