//! Messages API client for the text-generation service

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{GenerationClient, GenerationRequest};
use crate::config::GenerationSettings;
use crate::error::{Error, Result};

const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Where the API key comes from. Environment sources are read on every call.
#[derive(Debug, Clone)]
pub enum CredentialSource {
    Env(String),
    Static(String),
}

impl CredentialSource {
    fn resolve(&self) -> Result<String> {
        match self {
            CredentialSource::Static(key) => Ok(key.clone()),
            CredentialSource::Env(var) => std::env::var(var)
                .ok()
                .filter(|key| !key.is_empty())
                .ok_or_else(|| Error::MissingCredential(var.clone())),
        }
    }
}

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    system: &'a str,
    messages: Vec<Message<'a>>,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
    #[serde(default)]
    stop_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: Option<String>,
}

/// HTTP client for the messages endpoint. Constructed once and shared.
pub struct AnthropicClient {
    client: Client,
    settings: GenerationSettings,
    credential: CredentialSource,
}

impl AnthropicClient {
    pub fn new(settings: GenerationSettings) -> Result<Self> {
        let credential = CredentialSource::Env(settings.api_key_env.clone());
        Self::with_credential(settings, credential)
    }

    pub fn with_credential(settings: GenerationSettings, credential: CredentialSource) -> Result<Self> {
        let client = Client::builder()
            .timeout(settings.request_timeout())
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            settings,
            credential,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/v1/messages", self.settings.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl GenerationClient for AnthropicClient {
    async fn complete(&self, request: &GenerationRequest) -> Result<String> {
        let api_key = self.credential.resolve()?;
        let body = MessagesRequest {
            model: &self.settings.model,
            max_tokens: request.max_tokens.unwrap_or(self.settings.max_tokens),
            temperature: request.temperature,
            system: &request.system,
            messages: vec![Message {
                role: "user",
                content: &request.user,
            }],
        };

        debug!(kind = %request.kind, model = %self.settings.model, "calling generation service");
        let response = self
            .client
            .post(self.endpoint())
            .header("x-api-key", api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(kind = %request.kind, status = status.as_u16(), "generation service returned an error");
            return Err(Error::UpstreamService {
                status: status.as_u16(),
                body,
            });
        }

        let reply: MessagesResponse = response.json().await?;
        if reply.stop_reason.as_deref() == Some("max_tokens") {
            warn!(kind = %request.kind, "generation reply was truncated at max_tokens");
        }
        let text: String = reply
            .content
            .into_iter()
            .filter_map(|block| block.text)
            .collect::<Vec<_>>()
            .join("");
        Ok(text)
    }
}
