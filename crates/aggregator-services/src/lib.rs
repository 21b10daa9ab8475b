//! Build Aggregator Services
//!
//! Real implementations of the `aggregator-core` collaborator traits:
//!
//! - [`GithubClient`]: repository webhooks
//! - [`BitriseClient`]: configuration, build trigger and build status
//! - [`SteplibClient`]: the step library catalog
//! - [`BitriseCli`]: workflow selection through `bitrise trigger-check`
//! - [`EnvmanExporter`]: output export through `envman add`

pub mod bitrise;
pub mod config;
pub mod envman;
pub mod error;
pub mod github;
mod http;
mod process;
pub mod steplib;
pub mod trigger_check;

pub use bitrise::BitriseClient;
pub use config::ServiceConfig;
pub use envman::EnvmanExporter;
pub use error::{ServiceError, ServiceResult};
pub use github::GithubClient;
pub use steplib::SteplibClient;
pub use trigger_check::BitriseCli;
