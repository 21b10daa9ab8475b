//! Error types for the service clients

use aggregator_core::AggregatorError;
use thiserror::Error;

/// Errors raised while talking to a remote API or running a CLI tool.
#[derive(Error, Debug)]
pub enum ServiceError {
    /// A required setting (token, URL) is empty.
    #[error("missing required setting: {0}")]
    MissingSetting(&'static str),

    /// Request could not be sent or its body not read.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with a status other than the expected one.
    #[error("http response {status} from {url}: {body}")]
    Status { url: String, status: u16, body: String },

    /// The response body did not have the expected shape.
    #[error("decoding response of {url}: {detail}")]
    Decode { url: String, detail: String },

    /// A CLI tool could not be started or exited unsuccessfully.
    #[error("running {command}: {detail}")]
    Command { command: String, detail: String },

    /// A CLI tool did not finish in time.
    #[error("{command} timed out after {secs} seconds")]
    Timeout { command: String, secs: u64 },
}

pub type ServiceResult<T> = std::result::Result<T, ServiceError>;

impl ServiceError {
    /// What the failed call was aimed at, for error reporting upstream.
    pub fn target(&self) -> String {
        match self {
            ServiceError::MissingSetting(name) => (*name).to_string(),
            ServiceError::Http(e) => e
                .url()
                .map(|u| u.to_string())
                .unwrap_or_else(|| "http".to_string()),
            ServiceError::Status { url, .. } | ServiceError::Decode { url, .. } => url.clone(),
            ServiceError::Command { command, .. } | ServiceError::Timeout { command, .. } => {
                command.clone()
            }
        }
    }
}

impl From<ServiceError> for AggregatorError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Decode { url, detail } => {
                AggregatorError::MalformedConfig(format!("response of {url}: {detail}"))
            }
            other => AggregatorError::transport(other.target(), other),
        }
    }
}
