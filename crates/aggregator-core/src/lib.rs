//! Build Aggregator Core
//!
//! Triggers the CI build of every step in a catalog, in bounded batches,
//! waits for each batch to finish and reports failures and skipped steps.
//!
//! The remote systems sit behind the traits in [`remote`]; real
//! implementations live in the `aggregator-services` crate and in-memory
//! ones in [`fakes`].

pub mod batcher;
pub mod catalog;
pub mod domain;
pub mod endpoint;
pub mod error;
pub mod fakes;
pub mod pipeline;
pub mod poller;
pub mod remote;
pub mod report;
pub mod telemetry;
pub mod trigger;
pub mod workflow;

pub use batcher::Batcher;
pub use catalog::{compare_versions, filter_by_org, Catalog, StepGroup, DEFAULT_SOURCE_HOST};
pub use domain::{
    Build, BuildStatus, Endpoint, Project, RepoRef, Skip, TriggerResponse, Webhook,
    SUCCESS_STATUS_TEXT,
};
pub use endpoint::{EndpointResolver, ResolverSettings};
pub use error::{AggregatorError, AggregatorResult};
pub use pipeline::{
    collect_projects, export_report, AggregateOutcome, BuildAggregator, DEFAULT_BATCH_SIZE,
};
pub use poller::{CompletionPoller, PollConfig};
pub use remote::{
    BuildService, CatalogSource, OutputExporter, TriggerCheck, WebhookProvider, WorkflowDecider,
};
pub use report::{Report, ReportStyle, DEFAULT_REPORT_COLOR};
pub use telemetry::init_tracing;
pub use trigger::{BuildTrigger, TriggerOutcome};
pub use workflow::WorkflowSelector;
