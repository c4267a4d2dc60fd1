//! Generation client
//!
//! Uniform call-and-parse wrapper around the external text-generation
//! capability. A call either yields a value of the expected reply shape or an
//! explicit error; nothing here retries. Whether a failed call is fatal, absorbed,
//! or regenerated is decided by the calling stage.

pub mod api;
pub mod parse;
pub mod replies;

pub use api::{AnthropicClient, CredentialSource};
pub use parse::{extract_json, parse_reply};

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::fmt;
use tracing::debug;

use crate::error::Result;

/// Which pipeline call a request belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallKind {
    VoiceFingerprint,
    ExperienceFingerprint,
    RubricAnalysis,
    WorkshopItems,
    JudgeSuggestions,
    RegenerateSuggestions,
}

impl fmt::Display for CallKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CallKind::VoiceFingerprint => "voice_fingerprint",
            CallKind::ExperienceFingerprint => "experience_fingerprint",
            CallKind::RubricAnalysis => "rubric_analysis",
            CallKind::WorkshopItems => "workshop_items",
            CallKind::JudgeSuggestions => "judge_suggestions",
            CallKind::RegenerateSuggestions => "regenerate_suggestions",
        };
        f.write_str(name)
    }
}

/// One call to the generation capability.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub kind: CallKind,
    pub system: String,
    pub user: String,
    /// Response-shape hints for the service.
    pub max_tokens: Option<u32>,
    pub temperature: f32,
}

impl GenerationRequest {
    pub fn new(kind: CallKind, system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            kind,
            system: system.into(),
            user: user.into(),
            max_tokens: None,
            temperature: 0.7,
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }
}

/// Seam between the pipeline and the text-generation service.
///
/// Implementations issue exactly one call per invocation and return the raw
/// reply text.
#[async_trait]
pub trait GenerationClient: Send + Sync {
    async fn complete(&self, request: &GenerationRequest) -> Result<String>;
}

/// Issue `request` and parse the reply into `T`.
pub async fn generate<T>(client: &dyn GenerationClient, request: &GenerationRequest) -> Result<T>
where
    T: DeserializeOwned,
{
    let reply = client.complete(request).await?;
    debug!(kind = %request.kind, bytes = reply.len(), "generation reply received");
    parse_reply(&reply)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::model::VoiceFingerprint;
    use crate::testing::ScriptedClient;

    #[tokio::test]
    async fn test_generate_parses_fenced_reply() {
        let client = ScriptedClient::new().with_reply(
            CallKind::VoiceFingerprint,
            "Here you go:\n```json\n{\"tone\": \"wry\", \"signatureMoves\": [\"lists\"]}\n```",
        );
        let request = GenerationRequest::new(CallKind::VoiceFingerprint, "sys", "user");

        let voice: VoiceFingerprint = generate(&client, &request).await.unwrap();
        assert_eq!(voice.tone, "wry");
        assert_eq!(voice.signature_moves, vec!["lists".to_string()]);
    }

    #[tokio::test]
    async fn test_generate_surfaces_upstream_error() {
        let client = ScriptedClient::new().with_upstream_error(CallKind::RubricAnalysis, 503);
        let request = GenerationRequest::new(CallKind::RubricAnalysis, "sys", "user");

        let err = generate::<VoiceFingerprint>(&client, &request)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::UpstreamService { status: 503, .. }));
        assert_eq!(client.calls(CallKind::RubricAnalysis), 1);
    }

    #[test]
    fn test_request_builder() {
        let request = GenerationRequest::new(CallKind::JudgeSuggestions, "s", "u")
            .with_max_tokens(512)
            .with_temperature(0.2);
        assert_eq!(request.max_tokens, Some(512));
        assert_eq!(request.temperature, 0.2);
        assert_eq!(request.kind.to_string(), "judge_suggestions");
    }
}
