//! Injectable collaborators.
//!
//! Implement these traits to plug in the real source-hosting and CI APIs
//! (see the `aggregator-services` crate) or the in-memory fakes in
//! [`crate::fakes`].

use async_trait::async_trait;

use crate::catalog::Catalog;
use crate::domain::{BuildStatus, RepoRef, TriggerResponse, Webhook};
use crate::error::AggregatorResult;

/// Lists the webhooks configured on a repository.
#[async_trait]
pub trait WebhookProvider: Send + Sync {
    /// Fetch every webhook of `repo`. Non-success responses are errors.
    async fn list_hooks(&self, repo: &RepoRef) -> AggregatorResult<Vec<Webhook>>;
}

/// The remote build system: configuration, triggering and status.
#[async_trait]
pub trait BuildService: Send + Sync {
    /// Fetch the raw CI configuration of `app_slug`.
    async fn fetch_config(&self, app_slug: &str) -> AggregatorResult<Vec<u8>>;

    /// Start a build. The raw response is returned so the caller decides
    /// what counts as accepted.
    async fn trigger(
        &self,
        app_slug: &str,
        workflow: &str,
        trigger_token: &str,
    ) -> AggregatorResult<TriggerResponse>;

    /// Fetch the current status snapshot of a build.
    async fn fetch_status(&self, app_slug: &str, build_slug: &str)
        -> AggregatorResult<BuildStatus>;
}

/// Inputs of a pull-request trigger simulation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggerCheck {
    pub source_branch: String,
    pub target_branch: String,
    /// Base64 encoded CI configuration.
    pub config_base64: String,
}

/// Decides which workflow a pull request would run.
#[async_trait]
pub trait WorkflowDecider: Send + Sync {
    /// Run the decision procedure and return its raw (one-line JSON) output.
    async fn trigger_check(&self, check: &TriggerCheck) -> AggregatorResult<String>;
}

/// Source of the step catalog.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    async fn fetch_catalog(&self) -> AggregatorResult<Catalog>;
}

/// Publishes final key/value outputs to the calling environment.
#[async_trait]
pub trait OutputExporter: Send + Sync {
    async fn export(&self, key: &str, value: &str) -> AggregatorResult<()>;
}
