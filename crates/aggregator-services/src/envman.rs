//! Output export through `envman add`.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;

use aggregator_core::{AggregatorError, AggregatorResult, OutputExporter};

use crate::config::ServiceConfig;
use crate::process::ToolRun;

/// Publishes each output with `envman add --key <K> --value <V>`.
#[derive(Debug, Clone)]
pub struct EnvmanExporter {
    program: PathBuf,
    timeout: Duration,
}

impl EnvmanExporter {
    pub fn new(config: &ServiceConfig) -> Self {
        Self {
            program: config.envman_program.clone(),
            timeout: config.command_timeout,
        }
    }
}

#[async_trait]
impl OutputExporter for EnvmanExporter {
    async fn export(&self, key: &str, value: &str) -> AggregatorResult<()> {
        ToolRun {
            program: &self.program,
            args: vec![
                "add".to_string(),
                "--key".to_string(),
                key.to_string(),
                "--value".to_string(),
                value.to_string(),
            ],
            timeout: self.timeout,
            scrub_env: false,
        }
        .stdout()
        .await
        .map(|_| ())
        .map_err(|e| AggregatorError::Export {
            key: key.to_string(),
            detail: e.to_string(),
        })
    }
}
