//! Stateless stage dispatcher
//!
//! Each call runs exactly one stage. Stage 1 takes the essay and prompt from
//! the request; stages 2 and 3 take everything from the continuation token
//! returned by the previous stage. Nothing is kept between calls.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, instrument};

use crate::config::PipelineConfig;
use crate::error::{Error, Result};
use crate::generation::GenerationClient;
use crate::model::{EssayRequest, FinalResult, WorkshopItem};
use crate::pipeline::{run_analysis, run_generation, run_validation_stage};
use crate::rules::RuleEngine;
use crate::token::ContinuationToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Analysis,
    Generation,
    Validation,
}

impl Stage {
    pub fn number(self) -> u8 {
        match self {
            Stage::Analysis => 1,
            Stage::Generation => 2,
            Stage::Validation => 3,
        }
    }

    pub fn next(self) -> Option<Stage> {
        match self {
            Stage::Analysis => Some(Stage::Generation),
            Stage::Generation => Some(Stage::Validation),
            Stage::Validation => None,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.number())
    }
}

impl FromStr for Stage {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "1" => Ok(Stage::Analysis),
            "2" => Ok(Stage::Generation),
            "3" => Ok(Stage::Validation),
            other => Err(Error::InvalidStage(format!(
                "expected 1, 2 or 3, got {other:?}"
            ))),
        }
    }
}

/// Request body accepted by every stage.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageRequest {
    #[serde(default)]
    pub essay_text: Option<String>,
    #[serde(default)]
    pub prompt_text: Option<String>,
    #[serde(default)]
    pub essay_type: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub continue_token: Option<String>,
}

impl StageRequest {
    pub fn from_essay(request: &EssayRequest) -> Self {
        Self {
            essay_text: Some(request.essay_text.clone()),
            prompt_text: Some(request.prompt_text.clone()),
            essay_type: request.essay_type.clone(),
            title: request.title.clone(),
            continue_token: None,
        }
    }

    pub fn from_token(token: impl Into<String>) -> Self {
        Self {
            continue_token: Some(token.into()),
            ..Self::default()
        }
    }

    fn essay_request(self) -> Result<EssayRequest> {
        let essay_text = non_empty(self.essay_text).ok_or(Error::MissingField("essayText"))?;
        let prompt_text = non_empty(self.prompt_text).ok_or(Error::MissingField("promptText"))?;
        Ok(EssayRequest {
            essay_text,
            prompt_text,
            essay_type: non_empty(self.essay_type),
            title: non_empty(self.title),
        })
    }

    fn token(&self) -> Result<ContinuationToken> {
        let encoded = self
            .continue_token
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .ok_or(Error::MissingField("continueToken"))?;
        Ok(ContinuationToken::decode(encoded)?)
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StageStatus {
    Complete,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Timing {
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
}

/// Successful stage response.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StageEnvelope {
    pub stage: u8,
    pub status: StageStatus,
    pub data: serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub continue_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_stage: Option<u8>,
    pub timing: Timing,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationData<'a> {
    item_count: usize,
    items: &'a [WorkshopItem],
}

pub struct StageController {
    client: Arc<dyn GenerationClient>,
    rules: Arc<RuleEngine>,
    config: Arc<PipelineConfig>,
}

impl StageController {
    pub fn new(client: Arc<dyn GenerationClient>, config: PipelineConfig) -> Self {
        Self::with_rules(client, Arc::new(RuleEngine::standard()), config)
    }

    pub fn with_rules(
        client: Arc<dyn GenerationClient>,
        rules: Arc<RuleEngine>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            client,
            rules,
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run `stage` and wrap its output in the response envelope.
    #[instrument(skip_all, fields(stage = stage.number()))]
    pub async fn dispatch(&self, stage: Stage, request: StageRequest) -> Result<StageEnvelope> {
        let started_at = Utc::now();
        let start = Instant::now();

        let (data, continue_token) = match stage {
            Stage::Analysis => {
                let token = self.analyze(request.essay_request()?).await?;
                let data = serde_json::to_value(token.analysis.as_ref())?;
                (data, Some(token.encode()?))
            }
            Stage::Generation => {
                let token = self.generate(request.token()?).await?;
                let items = token.items.as_deref().unwrap_or_default();
                let data = serde_json::to_value(GenerationData {
                    item_count: items.len(),
                    items,
                })?;
                (data, Some(token.encode()?))
            }
            Stage::Validation => {
                let result = self.validate(request.token()?).await?;
                (serde_json::to_value(&result)?, None)
            }
        };

        let duration_ms = start.elapsed().as_millis() as u64;
        info!(duration_ms, "stage complete");
        Ok(StageEnvelope {
            stage: stage.number(),
            status: StageStatus::Complete,
            data,
            continue_token,
            next_stage: stage.next().map(Stage::number),
            timing: Timing {
                started_at,
                duration_ms,
            },
        })
    }

    /// Stage 1. Returns the token for stage 2.
    pub async fn analyze(&self, request: EssayRequest) -> Result<ContinuationToken> {
        let analysis = run_analysis(self.client.as_ref(), &self.rules, &request).await?;
        Ok(ContinuationToken::after_analysis(request, analysis))
    }

    /// Stage 2. Requires a token carrying the analysis.
    pub async fn generate(&self, token: ContinuationToken) -> Result<ContinuationToken> {
        let analysis = token.analysis.as_ref().ok_or_else(|| {
            Error::IncompleteToken("stage 2 needs a token produced by stage 1".to_string())
        })?;
        let items =
            run_generation(self.client.as_ref(), &token.request, analysis, &self.config).await?;
        Ok(token.with_items(items))
    }

    /// Stage 3. Requires a token carrying both the analysis and the items.
    pub async fn validate(&self, token: ContinuationToken) -> Result<FinalResult> {
        let ContinuationToken {
            request,
            analysis,
            items,
            ..
        } = token;
        let (analysis, items) = match (analysis, items) {
            (Some(analysis), Some(items)) => (analysis, items),
            _ => {
                return Err(Error::IncompleteToken(
                    "stage 3 needs a token produced by stage 2".to_string(),
                ))
            }
        };

        Ok(run_validation_stage(
            self.client.clone(),
            self.rules.clone(),
            &self.config,
            &request,
            analysis,
            &items,
        )
        .await)
    }

    /// Drive all three stages in-process, passing each token through its
    /// encoded form exactly as a remote caller would.
    pub async fn run_to_completion(&self, request: EssayRequest) -> Result<FinalResult> {
        let token = self.analyze(request).await?;
        let token = ContinuationToken::decode(&token.encode()?)?;
        let token = self.generate(token).await?;
        let token = ContinuationToken::decode(&token.encode()?)?;
        self.validate(token).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::CallKind;
    use crate::testing::{fixtures, ScriptedClient};

    fn controller(client: ScriptedClient) -> StageController {
        StageController::new(Arc::new(client), PipelineConfig::default())
    }

    fn analysis_client() -> ScriptedClient {
        ScriptedClient::new()
            .with_reply(CallKind::VoiceFingerprint, fixtures::VOICE_REPLY)
            .with_reply(CallKind::ExperienceFingerprint, fixtures::EXPERIENCE_REPLY)
            .with_reply(CallKind::RubricAnalysis, fixtures::RUBRIC_REPLY)
    }

    #[test]
    fn test_stage_parsing() {
        assert_eq!("1".parse::<Stage>().unwrap(), Stage::Analysis);
        assert_eq!(" 3 ".parse::<Stage>().unwrap(), Stage::Validation);
        assert!(matches!("4".parse::<Stage>(), Err(Error::InvalidStage(_))));
        assert!(matches!("".parse::<Stage>(), Err(Error::InvalidStage(_))));
        assert_eq!(Stage::Validation.next(), None);
    }

    #[tokio::test]
    async fn test_stage_one_requires_essay_and_prompt() {
        let controller = controller(ScriptedClient::new());
        let request = StageRequest {
            prompt_text: Some("prompt".to_string()),
            essay_text: Some("   ".to_string()),
            ..StageRequest::default()
        };
        let err = controller.dispatch(Stage::Analysis, request).await.unwrap_err();
        assert!(matches!(err, Error::MissingField("essayText")));

        let request = StageRequest {
            essay_text: Some("essay".to_string()),
            ..StageRequest::default()
        };
        let err = controller.dispatch(Stage::Analysis, request).await.unwrap_err();
        assert!(matches!(err, Error::MissingField("promptText")));
    }

    #[tokio::test]
    async fn test_later_stages_require_a_token() {
        let client = Arc::new(ScriptedClient::new());
        let controller = StageController::new(client.clone(), PipelineConfig::default());

        let err = controller
            .dispatch(Stage::Generation, StageRequest::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::MissingField("continueToken")));

        let err = controller
            .dispatch(Stage::Validation, StageRequest::from_token("%%%"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidToken(_)));
        assert_eq!(client.total_calls(), 0);
    }

    #[tokio::test]
    async fn test_stage_three_rejects_stage_one_token() {
        let token = ContinuationToken::after_analysis(
            fixtures::essay_request(),
            fixtures::analysis_output(),
        );
        let controller = controller(ScriptedClient::new());
        let err = controller
            .dispatch(
                Stage::Validation,
                StageRequest::from_token(token.encode().unwrap()),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, Error::IncompleteToken(_)));
        assert!(err.is_client_error());
    }

    #[tokio::test]
    async fn test_stage_one_envelope() {
        let controller = controller(analysis_client());
        let envelope = controller
            .dispatch(
                Stage::Analysis,
                StageRequest::from_essay(&fixtures::essay_request()),
            )
            .await
            .unwrap();

        assert_eq!(envelope.stage, 1);
        assert_eq!(envelope.next_stage, Some(2));
        assert_eq!(envelope.data["rubricAnalysis"]["nqi"], 85.0);

        let token = ContinuationToken::decode(envelope.continue_token.as_deref().unwrap()).unwrap();
        assert_eq!(token.completed_stage, 1);
        assert_eq!(token.request, fixtures::essay_request());
    }

    #[tokio::test]
    async fn test_final_envelope_has_no_token() {
        let token = ContinuationToken::after_analysis(
            fixtures::essay_request(),
            fixtures::analysis_output(),
        )
        .with_items(vec![fixtures::workshop_item("b1-i1")]);
        let client = ScriptedClient::new().with_reply(
            CallKind::JudgeSuggestions,
            fixtures::judge_reply(&[90, 85, 80]),
        );

        let envelope = controller(client)
            .dispatch(
                Stage::Validation,
                StageRequest::from_token(token.encode().unwrap()),
            )
            .await
            .unwrap();

        let json = serde_json::to_value(&envelope).unwrap();
        assert!(json.get("continueToken").is_none());
        assert!(json.get("nextStage").is_none());
        assert_eq!(json["status"], "complete");
        assert_eq!(json["data"]["items"][0]["id"], "b1-i1");
        assert_eq!(json["data"]["summary"]["retainedItems"], 1);
    }
}
