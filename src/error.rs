use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Unexpected response from {url}: HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("Parse error: {0}")]
    Parse(String),

    /// The referenced project board structure is missing.
    #[error("Project column not found: {0}")]
    ColumnNotFound(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Task failed: {0}")]
    Task(String),
}

impl ReportError {
    /// Whether a second attempt could plausibly succeed. Nothing retries yet,
    /// but absorbed failures are logged with this flag.
    pub fn is_retryable(&self) -> bool {
        match self {
            ReportError::Transport(_) => true,
            ReportError::Status { status, .. } => *status == 429 || *status >= 500,
            ReportError::Task(_) => true,
            ReportError::Parse(_) | ReportError::ColumnNotFound(_) | ReportError::Config(_) => {
                false
            }
        }
    }
}

impl From<reqwest::Error> for ReportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ReportError::Parse(err.to_string())
        } else if let Some(status) = err.status() {
            ReportError::Status {
                url: err.url().map(|u| u.to_string()).unwrap_or_default(),
                status: status.as_u16(),
            }
        } else {
            ReportError::Transport(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ReportError {
    fn from(err: serde_json::Error) -> Self {
        ReportError::Parse(err.to_string())
    }
}

impl From<tokio::task::JoinError> for ReportError {
    fn from(err: tokio::task::JoinError) -> Self {
        ReportError::Task(err.to_string())
    }
}
