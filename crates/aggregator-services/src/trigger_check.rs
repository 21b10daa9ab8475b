//! `bitrise trigger-check` as the workflow decision procedure.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;

use aggregator_core::{AggregatorResult, TriggerCheck, WorkflowDecider};

use crate::config::ServiceConfig;
use crate::error::ServiceResult;
use crate::process::ToolRun;

/// Runs the bitrise CLI with a scrubbed environment, so settings such as
/// `DEBUG` in the caller's environment cannot change its output format.
#[derive(Debug, Clone)]
pub struct BitriseCli {
    program: PathBuf,
    timeout: Duration,
}

impl BitriseCli {
    pub fn new(config: &ServiceConfig) -> Self {
        Self {
            program: config.bitrise_program.clone(),
            timeout: config.command_timeout,
        }
    }

    pub fn args(check: &TriggerCheck) -> Vec<String> {
        vec![
            "trigger-check".to_string(),
            format!("--pr-source-branch={}", check.source_branch),
            format!("--pr-target-branch={}", check.target_branch),
            format!("--config-base64={}", check.config_base64),
            "--format=json".to_string(),
        ]
    }

    pub async fn run(&self, check: &TriggerCheck) -> ServiceResult<String> {
        ToolRun {
            program: &self.program,
            args: Self::args(check),
            timeout: self.timeout,
            scrub_env: true,
        }
        .stdout()
        .await
    }
}

#[async_trait]
impl WorkflowDecider for BitriseCli {
    async fn trigger_check(&self, check: &TriggerCheck) -> AggregatorResult<String> {
        Ok(self.run(check).await?)
    }
}
