use thiserror::Error;

/// Top-level error for the `navsync` binary.
///
/// Carries the process exit code so `main` can stay a thin wrapper:
/// - `2`: configuration or input files
/// - `3`: publishing to the destination table failed
#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        AppError::new(3, format!("Publishing failed: {err}"))
    }
}

/// Coarse classification of a failed fetch, used in records and the run summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    Timeout,
    Transport,
    Parse,
    Upstream,
}

impl FailureKind {
    pub fn label(self) -> &'static str {
        match self {
            FailureKind::Timeout => "timeout",
            FailureKind::Transport => "transport",
            FailureKind::Parse => "parse",
            FailureKind::Upstream => "upstream",
        }
    }
}

/// Why a source adapter could not produce a series for a product.
///
/// Always recoverable at the task level: the runner turns it into an `Error`
/// record for that task only.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchFailure {
    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("upstream error: {0}")]
    Upstream(String),
}

impl FetchFailure {
    pub fn kind(&self) -> FailureKind {
        match self {
            FetchFailure::Timeout(_) => FailureKind::Timeout,
            FetchFailure::Transport(_) => FailureKind::Transport,
            FetchFailure::Parse(_) => FailureKind::Parse,
            FetchFailure::Upstream(_) => FailureKind::Upstream,
        }
    }
}

impl From<reqwest::Error> for FetchFailure {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FetchFailure::Timeout(err.to_string())
        } else if err.is_decode() {
            FetchFailure::Parse(err.to_string())
        } else if err.is_status() {
            FetchFailure::Upstream(err.to_string())
        } else {
            FetchFailure::Transport(err.to_string())
        }
    }
}

impl From<serde_json::Error> for FetchFailure {
    fn from(err: serde_json::Error) -> Self {
        FetchFailure::Parse(err.to_string())
    }
}

/// No usable point survived normalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("series is empty after normalization")]
pub struct EmptySeries;

/// Failures reported by the destination table store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("listing records failed: {0}")]
    List(String),

    #[error("write failed: {0}")]
    Write(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fetch_failure_kind_matches_variant() {
        assert_eq!(FetchFailure::Timeout("x".into()).kind(), FailureKind::Timeout);
        assert_eq!(FetchFailure::Transport("x".into()).kind(), FailureKind::Transport);
        assert_eq!(FetchFailure::Parse("x".into()).kind(), FailureKind::Parse);
        assert_eq!(FetchFailure::Upstream("x".into()).kind(), FailureKind::Upstream);
    }

    #[test]
    fn store_error_maps_to_publish_exit_code() {
        let err: AppError = StoreError::List("code 99991663".to_string()).into();
        assert_eq!(err.exit_code(), 3);
        assert_eq!(
            err.to_string(),
            "Publishing failed: listing records failed: code 99991663"
        );
    }

    #[test]
    fn json_errors_are_parse_failures() {
        let err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        assert_eq!(FetchFailure::from(err).kind(), FailureKind::Parse);
    }
}
