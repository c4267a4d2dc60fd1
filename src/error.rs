use thiserror::Error;

use crate::token::TokenError;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Invalid stage: {0}")]
    InvalidStage(String),

    #[error("Invalid request body: {0}")]
    InvalidRequest(String),

    #[error("Invalid continuation token: {0}")]
    InvalidToken(#[from] TokenError),

    #[error("Incomplete continuation token: {0}")]
    IncompleteToken(String),

    #[error("Upstream service error {status}: {body}")]
    UpstreamService { status: u16, body: String },

    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Parse error: {message}")]
    Parse { message: String, excerpt: String },

    #[error("Missing credential: environment variable {0} is not set")]
    MissingCredential(String),

    #[error("Stage {stage} failed: {reason}")]
    StageFailed { stage: u8, reason: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl Error {
    /// Build a parse error, keeping a bounded excerpt of the offending reply.
    pub fn parse(message: impl Into<String>, reply: &str) -> Self {
        let excerpt: String = reply.chars().take(200).collect();
        Error::Parse {
            message: message.into(),
            excerpt,
        }
    }

    /// Errors the caller caused and must fix before retrying.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Error::MissingField(_)
                | Error::InvalidStage(_)
                | Error::InvalidRequest(_)
                | Error::InvalidToken(_)
                | Error::IncompleteToken(_)
        )
    }

    /// Short machine-readable code reported alongside the message.
    pub fn code(&self) -> &'static str {
        match self {
            Error::MissingField(_) => "missing_field",
            Error::InvalidStage(_) => "invalid_stage",
            Error::InvalidRequest(_) => "invalid_request",
            Error::InvalidToken(_) => "invalid_token",
            Error::IncompleteToken(_) => "incomplete_token",
            Error::UpstreamService { .. } => "upstream_service",
            Error::Transport(_) => "transport",
            Error::Parse { .. } => "parse",
            Error::MissingCredential(_) => "missing_credential",
            Error::StageFailed { .. } => "stage_failed",
            Error::Config(_) => "config",
            Error::Io(_) => "io",
            Error::Serialization(_) => "serialization",
            Error::Toml(_) => "toml",
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_errors_are_classified() {
        assert!(Error::MissingField("essayText").is_client_error());
        assert!(Error::InvalidStage("4".to_string()).is_client_error());
        assert!(Error::IncompleteToken("no analysis".to_string()).is_client_error());
        assert!(!Error::UpstreamService {
            status: 529,
            body: "overloaded".to_string()
        }
        .is_client_error());
        assert!(!Error::Config("bad".to_string()).is_client_error());
    }

    #[test]
    fn test_parse_error_excerpt_is_bounded() {
        let reply = "x".repeat(1000);
        match Error::parse("no json", &reply) {
            Error::Parse { excerpt, .. } => assert_eq!(excerpt.chars().count(), 200),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_upstream_error_display_carries_status_and_body() {
        let err = Error::UpstreamService {
            status: 500,
            body: "boom".to_string(),
        };
        assert_eq!(err.to_string(), "Upstream service error 500: boom");
        assert_eq!(err.code(), "upstream_service");
    }
}
