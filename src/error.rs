use thiserror::Error;

/// Connector error taxonomy. Transport and Backend abort the current
/// operation, Protocol is logged and skipped, Data aborts the current
/// reconciliation or submission step. None of these crash the process.
#[derive(Debug, Error)]
pub enum ConnectorError {
    /// Socket or HTTP connect/read failure. Not retried automatically.
    #[error("transport error: {0}")]
    Transport(String),

    /// Unrecognized or malformed protocol line/response. Skipped.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Missing or malformed artifact, unresolved camera/marker reference.
    #[error("data error in {context}: {message}")]
    Data { context: String, message: String },

    /// Non-success HTTP status from the reconstruction service.
    #[error("backend error at {step}: HTTP {status}")]
    Backend { step: String, status: u16 },
}

impl ConnectorError {
    pub fn data(context: impl Into<String>, message: impl std::fmt::Display) -> Self {
        Self::Data {
            context: context.into(),
            message: message.to_string(),
        }
    }

    pub fn backend(step: impl Into<String>, status: u16) -> Self {
        Self::Backend {
            step: step.into(),
            status,
        }
    }
}

impl From<std::io::Error> for ConnectorError {
    fn from(err: std::io::Error) -> Self {
        Self::Transport(err.to_string())
    }
}

impl From<reqwest::Error> for ConnectorError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ConnectorError>;
