//! Workflow selection for a simulated pull request.

use std::sync::Arc;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use tracing::debug;

use crate::error::{AggregatorError, AggregatorResult};
use crate::remote::{TriggerCheck, WorkflowDecider};

/// Placeholder source branch of the simulated pull request.
pub const PR_SOURCE_BRANCH: &str = "whatever";
/// Target branch of the simulated pull request.
pub const PR_TARGET_BRANCH: &str = "master";

/// Asks a [`WorkflowDecider`] which workflow a pull request would run.
pub struct WorkflowSelector {
    decider: Arc<dyn WorkflowDecider>,
}

impl WorkflowSelector {
    pub fn new(decider: Arc<dyn WorkflowDecider>) -> Self {
        Self { decider }
    }

    /// Select the workflow for a PR from [`PR_SOURCE_BRANCH`] into
    /// [`PR_TARGET_BRANCH`] against `config`.
    pub async fn select(&self, config: &[u8]) -> AggregatorResult<String> {
        let check = TriggerCheck {
            source_branch: PR_SOURCE_BRANCH.to_string(),
            target_branch: PR_TARGET_BRANCH.to_string(),
            config_base64: STANDARD.encode(config),
        };

        let output = self
            .decider
            .trigger_check(&check)
            .await
            .map_err(|e| match e {
                AggregatorError::WorkflowResolution(_) => e,
                other => AggregatorError::WorkflowResolution(other.to_string()),
            })?;
        debug!(output = %output.trim(), "trigger check finished");

        parse_workflow(&output, &check)
    }
}

/// Read the `workflow` field of the decision procedure's JSON output.
pub fn parse_workflow(output: &str, check: &TriggerCheck) -> AggregatorResult<String> {
    let value: serde_json::Value = serde_json::from_str(output.trim()).map_err(|e| {
        AggregatorError::WorkflowResolution(format!("reading trigger check output {output:?}: {e}"))
    })?;

    value
        .get("workflow")
        .and_then(serde_json::Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| {
            AggregatorError::missing_field(
                "workflow",
                format!(
                    "trigger check output for pr {} -> {}",
                    check.source_branch, check.target_branch
                ),
            )
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fakes::StubWorkflowDecider;

    #[tokio::test]
    async fn test_select_encodes_config_and_reads_workflow() {
        let decider = Arc::new(StubWorkflowDecider::answering(r#"{"workflow":"ci"}"#));
        let selector = WorkflowSelector::new(decider.clone());

        let workflow = selector.select(b"format_version: 11\n").await.unwrap();
        assert_eq!(workflow, "ci");

        let calls = decider.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].source_branch, "whatever");
        assert_eq!(calls[0].target_branch, "master");
        assert_eq!(calls[0].config_base64, "Zm9ybWF0X3ZlcnNpb246IDExCg==");
    }

    #[tokio::test]
    async fn test_missing_workflow_field() {
        let decider = Arc::new(StubWorkflowDecider::answering(r#"{"pipeline":"x"}"#));
        let err = WorkflowSelector::new(decider).select(b"cfg").await.unwrap_err();
        assert!(matches!(err, AggregatorError::MissingField { ref field, .. } if field == "workflow"));
    }

    #[tokio::test]
    async fn test_non_json_output_is_resolution_error() {
        let decider = Arc::new(StubWorkflowDecider::answering("Error: invalid bitrise.yml"));
        let err = WorkflowSelector::new(decider).select(b"cfg").await.unwrap_err();
        assert!(matches!(err, AggregatorError::WorkflowResolution(_)));
    }

    #[tokio::test]
    async fn test_decider_failure_is_resolution_error() {
        let decider = Arc::new(StubWorkflowDecider::failing("exit status: 1"));
        let err = WorkflowSelector::new(decider).select(b"cfg").await.unwrap_err();
        match err {
            AggregatorError::WorkflowResolution(msg) => assert!(msg.contains("exit status: 1")),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_parse_workflow_tolerates_trailing_newline() {
        let check = TriggerCheck {
            source_branch: "a".to_string(),
            target_branch: "b".to_string(),
            config_base64: String::new(),
        };
        assert_eq!(parse_workflow("{\"workflow\": \"primary\"}\n", &check).unwrap(), "primary");
    }
}
