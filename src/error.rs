//! Error types for rvr

use thiserror::Error;

/// Main error type for rvr operations
#[derive(Debug, Error)]
pub enum RvrError {
    #[error("Invalid video ID or URL: {0}")]
    InvalidInput(String),

    #[error("No source yielded a player URL")]
    PlayerUnavailable,

    #[error("Player script parse failed: {0}")]
    PlayerParseFailed(String),

    #[error("PO token unavailable: {0}")]
    TokenUnavailable(String),

    #[error("API rejected request: {status}{}", .reason.as_deref().map(|r| format!(" - {}", r)).unwrap_or_default())]
    ApiRejected {
        status: String,
        reason: Option<String>,
    },

    #[error("All clients failed, last error: {last}")]
    AllClientsFailed { last: Box<RvrError> },

    #[error("Signature cipher malformed: {0}")]
    CipherFailed(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("URL parsing error: {0}")]
    Url(#[from] url::ParseError),

    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Operation cancelled")]
    Cancelled,
}

impl RvrError {
    /// Check if the error is worth retrying at the transport level
    pub fn is_retryable(&self) -> bool {
        matches!(self, RvrError::Network(_) | RvrError::Io(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_variants() {
        assert_eq!(
            format!("{}", RvrError::InvalidInput("abc".to_string())),
            "Invalid video ID or URL: abc"
        );
        assert_eq!(
            format!("{}", RvrError::PlayerUnavailable),
            "No source yielded a player URL"
        );
        assert_eq!(
            format!("{}", RvrError::PlayerParseFailed("no actions object".to_string())),
            "Player script parse failed: no actions object"
        );
        assert_eq!(
            format!("{}", RvrError::TokenUnavailable("oracle unreachable".to_string())),
            "PO token unavailable: oracle unreachable"
        );
        assert_eq!(
            format!("{}", RvrError::CipherFailed("no url field".to_string())),
            "Signature cipher malformed: no url field"
        );
        assert_eq!(format!("{}", RvrError::Cancelled), "Operation cancelled");
    }

    #[test]
    fn test_api_rejected_display() {
        let with_reason = RvrError::ApiRejected {
            status: "ERROR".to_string(),
            reason: Some("Video unavailable".to_string()),
        };
        assert_eq!(
            format!("{}", with_reason),
            "API rejected request: ERROR - Video unavailable"
        );

        let without_reason = RvrError::ApiRejected {
            status: "LOGIN_REQUIRED".to_string(),
            reason: None,
        };
        assert_eq!(
            format!("{}", without_reason),
            "API rejected request: LOGIN_REQUIRED"
        );
    }

    #[test]
    fn test_all_clients_failed_preserves_last() {
        let last = RvrError::ApiRejected {
            status: "ERROR".to_string(),
            reason: Some("Private video".to_string()),
        };
        let err = RvrError::AllClientsFailed { last: Box::new(last) };
        let msg = format!("{}", err);
        assert!(msg.contains("All clients failed"));
        assert!(msg.contains("Private video"));

        match err {
            RvrError::AllClientsFailed { last } => match *last {
                RvrError::ApiRejected { status, reason } => {
                    assert_eq!(status, "ERROR");
                    assert_eq!(reason.as_deref(), Some("Private video"));
                }
                _ => panic!("Expected ApiRejected"),
            },
            _ => panic!("Expected AllClientsFailed"),
        }
    }

    #[test]
    fn test_from_conversions() {
        let json_err = serde_json::from_str::<serde_json::Value>("not json").unwrap_err();
        let err: RvrError = json_err.into();
        assert!(matches!(err, RvrError::Json(_)));

        let url_err = url::Url::parse("not a url").unwrap_err();
        let err: RvrError = url_err.into();
        assert!(matches!(err, RvrError::Url(_)));

        let regex_err = regex::Regex::new("[").unwrap_err();
        let err: RvrError = regex_err.into();
        assert!(matches!(err, RvrError::Regex(_)));

        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: RvrError = io_err.into();
        assert!(matches!(err, RvrError::Io(_)));
    }

    #[test]
    fn test_is_retryable() {
        let io_err: RvrError = std::io::Error::new(std::io::ErrorKind::TimedOut, "slow").into();
        assert!(io_err.is_retryable());

        assert!(!RvrError::PlayerUnavailable.is_retryable());
        assert!(!RvrError::InvalidInput("x".to_string()).is_retryable());
        assert!(!RvrError::Cancelled.is_retryable());
        assert!(!RvrError::ApiRejected {
            status: "403 Forbidden".to_string(),
            reason: None,
        }
        .is_retryable());
    }
}
