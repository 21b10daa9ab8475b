//! Error taxonomy for the build orchestration core.
//!
//! Errors raised while resolving or triggering a single project are turned
//! into [`crate::Skip`]s by the trigger; everything raised by the poller, the
//! catalog or the exporter aborts the run.

use thiserror::Error;

/// Errors produced by the orchestration layer and its collaborators.
#[derive(Debug, Error)]
pub enum AggregatorError {
    /// A network call failed or answered with a non-success status.
    #[error("transport error for {target}: {detail}")]
    Transport { target: String, detail: String },

    /// A response or webhook configuration did not have the expected shape.
    #[error("malformed configuration: {0}")]
    MalformedConfig(String),

    /// The repository is wired to more than one build target.
    #[error("{repo} has webhooks for multiple build targets: {targets:?}")]
    AmbiguousEndpoint { repo: String, targets: Vec<String> },

    /// The repository has no webhooks at all.
    #[error("{repo} has no webhooks, no build endpoint to trigger")]
    NoEndpoint { repo: String },

    /// Several webhooks share a target but none listens to pull requests.
    #[error("{repo} has {hooks} webhooks but none is subscribed to pull_request events")]
    NoPullRequestHook { repo: String, hooks: usize },

    /// The source URL does not identify an `owner/name` repository.
    #[error("invalid repository url: {0}")]
    InvalidRepositoryUrl(String),

    /// The workflow decision procedure failed or produced unreadable output.
    #[error("workflow resolution failed: {0}")]
    WorkflowResolution(String),

    /// A structured response lacked a required field.
    #[error("missing field '{field}' in {context}")]
    MissingField { field: String, context: String },

    /// The remote system answered with an unexpected HTTP status.
    #[error("unexpected http status {actual} from {target} (expected {expected}): {body}")]
    UnexpectedStatus {
        target: String,
        expected: u16,
        actual: u16,
        body: String,
    },

    /// The build trigger endpoint accepted the request but did not report `ok`.
    #[error("trigger of app {app} rejected, response body: {body}")]
    TriggerRejected { app: String, body: String },

    /// Builds were still running when the maximum wait elapsed.
    #[error("gave up after {waited_secs}s waiting for {} unfinished builds: {unfinished:?}", .unfinished.len())]
    PollTimeout {
        waited_secs: u64,
        unfinished: Vec<String>,
    },

    /// The run was interrupted by a cancellation signal.
    #[error("run cancelled with {unfinished} builds still running")]
    Cancelled { unfinished: usize },

    /// The step catalog could not be fetched or parsed.
    #[error("catalog error: {0}")]
    Catalog(String),

    /// Publishing an output value failed.
    #[error("exporting output {key} failed: {detail}")]
    Export { key: String, detail: String },
}

/// Convenience result alias.
pub type AggregatorResult<T> = std::result::Result<T, AggregatorError>;

impl AggregatorError {
    /// Shorthand for a [`AggregatorError::Transport`] error.
    pub fn transport(target: impl Into<String>, detail: impl ToString) -> Self {
        Self::Transport {
            target: target.into(),
            detail: detail.to_string(),
        }
    }

    /// Shorthand for a [`AggregatorError::MissingField`] error.
    pub fn missing_field(field: impl Into<String>, context: impl Into<String>) -> Self {
        Self::MissingField {
            field: field.into(),
            context: context.into(),
        }
    }
}
