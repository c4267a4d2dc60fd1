//! Continuation token codec
//!
//! A continuation token is the only channel through which state crosses stage
//! calls. It carries the original request and the accumulated output of every
//! completed stage, encoded as base64 over UTF-8 JSON. Callers must treat the
//! encoded string as opaque and send it in a request body.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{AnalysisOutput, EssayRequest, WorkshopItem};

/// Wire format version written by [`ContinuationToken::encode`].
pub const TOKEN_VERSION: u8 = 1;

#[derive(Error, Debug)]
pub enum TokenError {
    #[error("token is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("token payload is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("token payload is not a valid token document: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unsupported token version {found} (expected {expected})", expected = TOKEN_VERSION)]
    UnsupportedVersion { found: u8 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContinuationToken {
    pub version: u8,
    /// Highest stage whose output is recorded in this token.
    pub completed_stage: u8,
    pub request: EssayRequest,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analysis: Option<AnalysisOutput>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Vec<WorkshopItem>>,
}

impl ContinuationToken {
    /// Token produced by the analysis stage.
    pub fn after_analysis(request: EssayRequest, analysis: AnalysisOutput) -> Self {
        Self {
            version: TOKEN_VERSION,
            completed_stage: 1,
            request,
            analysis: Some(analysis),
            items: None,
        }
    }

    /// Extend this token with the generation stage's items.
    pub fn with_items(self, items: Vec<WorkshopItem>) -> Self {
        Self {
            completed_stage: 2,
            items: Some(items),
            ..self
        }
    }

    pub fn encode(&self) -> Result<String, TokenError> {
        let json = serde_json::to_string(self)?;
        Ok(BASE64.encode(json.as_bytes()))
    }

    pub fn decode(encoded: &str) -> Result<Self, TokenError> {
        let bytes = BASE64.decode(encoded.trim())?;
        let json = String::from_utf8(bytes)?;
        let token: ContinuationToken = serde_json::from_str(&json)?;
        if token.version != TOKEN_VERSION {
            return Err(TokenError::UnsupportedVersion {
                found: token.version,
            });
        }
        Ok(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::fixtures;

    #[test]
    fn test_round_trip_preserves_non_ascii_text() {
        let request = EssayRequest::new(
            "Mi abuela decía «paciencia». 我们一起包饺子 🥟 и всё.",
            "Describe a tradition: ¿qué significa?",
        )
        .with_essay_type("personal statement")
        .with_title("Ñoquis & 饺子");
        let token = ContinuationToken::after_analysis(request, fixtures::analysis_output());

        let decoded = ContinuationToken::decode(&token.encode().unwrap()).unwrap();
        assert_eq!(decoded, token);
    }

    #[test]
    fn test_round_trip_with_items() {
        let token = ContinuationToken::after_analysis(
            fixtures::essay_request(),
            fixtures::analysis_output(),
        )
        .with_items(vec![fixtures::workshop_item("b1-i1")]);

        let decoded = ContinuationToken::decode(&token.encode().unwrap()).unwrap();
        assert_eq!(decoded.completed_stage, 2);
        assert_eq!(decoded, token);
    }

    #[test]
    fn test_malformed_base64_is_rejected() {
        let err = ContinuationToken::decode("not base64 at all!").unwrap_err();
        assert!(matches!(err, TokenError::Base64(_)));
    }

    #[test]
    fn test_non_utf8_payload_is_rejected() {
        let encoded = BASE64.encode([0xffu8, 0xfe, 0xfd]);
        let err = ContinuationToken::decode(&encoded).unwrap_err();
        assert!(matches!(err, TokenError::Utf8(_)));
    }

    #[test]
    fn test_wrong_document_is_rejected() {
        let encoded = BASE64.encode(r#"{"hello":"world"}"#);
        let err = ContinuationToken::decode(&encoded).unwrap_err();
        assert!(matches!(err, TokenError::Json(_)));
    }

    #[test]
    fn test_unknown_version_is_rejected() {
        let mut token = ContinuationToken::after_analysis(
            fixtures::essay_request(),
            fixtures::analysis_output(),
        );
        token.version = 9;
        let err = ContinuationToken::decode(&token.encode().unwrap()).unwrap_err();
        assert!(matches!(err, TokenError::UnsupportedVersion { found: 9 }));
    }
}
