//! In-memory fakes for the collaborator traits (testing only)
//!
//! Provides `MemoryWebhookProvider`, `StubWorkflowDecider`,
//! `MemoryBuildService`, `MemoryCatalogSource` and `MemoryOutputExporter`.
//! Each one records the calls it receives so tests can assert on them.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::catalog::Catalog;
use crate::domain::{BuildStatus, RepoRef, TriggerResponse, Webhook};
use crate::error::{AggregatorError, AggregatorResult};
use crate::remote::*;

// ---------------------------------------------------------------------------
// MemoryWebhookProvider
// ---------------------------------------------------------------------------

/// Webhooks keyed by `owner/name`. Unknown repositories answer with a
/// transport error, like a 404 from the hosting API.
#[derive(Debug, Default)]
pub struct MemoryWebhookProvider {
    hooks: HashMap<String, Vec<Webhook>>,
    requests: Mutex<Vec<RepoRef>>,
}

impl MemoryWebhookProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_hooks(mut self, repo: &str, hooks: Vec<Webhook>) -> Self {
        self.hooks.insert(repo.to_string(), hooks);
        self
    }

    /// Repositories whose hooks were listed, in call order.
    pub fn requests(&self) -> Vec<RepoRef> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl WebhookProvider for MemoryWebhookProvider {
    async fn list_hooks(&self, repo: &RepoRef) -> AggregatorResult<Vec<Webhook>> {
        self.requests.lock().unwrap().push(repo.clone());
        self.hooks
            .get(&repo.to_string())
            .cloned()
            .ok_or_else(|| AggregatorError::transport(repo.to_string(), "404 Not Found"))
    }
}

// ---------------------------------------------------------------------------
// StubWorkflowDecider
// ---------------------------------------------------------------------------

/// Answers every trigger check with the same output or the same failure.
#[derive(Debug)]
pub struct StubWorkflowDecider {
    answer: Result<String, String>,
    calls: Mutex<Vec<TriggerCheck>>,
}

impl StubWorkflowDecider {
    pub fn answering(output: &str) -> Self {
        Self {
            answer: Ok(output.to_string()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            answer: Err(message.to_string()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<TriggerCheck> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl WorkflowDecider for StubWorkflowDecider {
    async fn trigger_check(&self, check: &TriggerCheck) -> AggregatorResult<String> {
        self.calls.lock().unwrap().push(check.clone());
        self.answer
            .clone()
            .map_err(AggregatorError::WorkflowResolution)
    }
}

// ---------------------------------------------------------------------------
// MemoryBuildService
// ---------------------------------------------------------------------------

/// A recorded trigger call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggerCall {
    pub app_slug: String,
    pub workflow: String,
    pub trigger_token: String,
}

#[derive(Debug, Default)]
struct BuildServiceState {
    triggers: Vec<TriggerCall>,
    config_requests: Vec<String>,
    status_requests: Vec<String>,
    /// Remaining scripted snapshots per build slug.
    statuses: HashMap<String, Vec<BuildStatus>>,
}

/// Scripted build service.
///
/// Configurations and trigger responses are keyed by app slug. Status
/// snapshots are keyed by build slug and handed out in order; the last one
/// repeats once the script runs out.
#[derive(Debug, Default)]
pub struct MemoryBuildService {
    configs: HashMap<String, Vec<u8>>,
    trigger_responses: HashMap<String, TriggerResponse>,
    state: Mutex<BuildServiceState>,
}

impl MemoryBuildService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(mut self, app_slug: &str, config: Vec<u8>) -> Self {
        self.configs.insert(app_slug.to_string(), config);
        self
    }

    pub fn with_trigger_response(mut self, app_slug: &str, response: TriggerResponse) -> Self {
        self.trigger_responses.insert(app_slug.to_string(), response);
        self
    }

    pub fn with_statuses(self, build_slug: &str, statuses: Vec<BuildStatus>) -> Self {
        self.state
            .lock()
            .unwrap()
            .statuses
            .insert(build_slug.to_string(), statuses);
        self
    }

    pub fn triggers(&self) -> Vec<TriggerCall> {
        self.state.lock().unwrap().triggers.clone()
    }

    /// App slugs whose configuration was fetched, in call order.
    pub fn config_requests(&self) -> Vec<String> {
        self.state.lock().unwrap().config_requests.clone()
    }

    /// Build slugs whose status was fetched, in call order.
    pub fn status_requests(&self) -> Vec<String> {
        self.state.lock().unwrap().status_requests.clone()
    }
}

#[async_trait]
impl BuildService for MemoryBuildService {
    async fn fetch_config(&self, app_slug: &str) -> AggregatorResult<Vec<u8>> {
        self.state
            .lock()
            .unwrap()
            .config_requests
            .push(app_slug.to_string());
        self.configs.get(app_slug).cloned().ok_or_else(|| {
            AggregatorError::transport(format!("config of app {app_slug}"), "404 Not Found")
        })
    }

    async fn trigger(
        &self,
        app_slug: &str,
        workflow: &str,
        trigger_token: &str,
    ) -> AggregatorResult<TriggerResponse> {
        self.state.lock().unwrap().triggers.push(TriggerCall {
            app_slug: app_slug.to_string(),
            workflow: workflow.to_string(),
            trigger_token: trigger_token.to_string(),
        });
        self.trigger_responses.get(app_slug).cloned().ok_or_else(|| {
            AggregatorError::transport(format!("trigger of app {app_slug}"), "connection refused")
        })
    }

    async fn fetch_status(&self, app_slug: &str, build_slug: &str) -> AggregatorResult<BuildStatus> {
        let mut state = self.state.lock().unwrap();
        state.status_requests.push(build_slug.to_string());
        let script = state.statuses.get_mut(build_slug).ok_or_else(|| {
            AggregatorError::transport(
                format!("status of build {build_slug} of app {app_slug}"),
                "404 Not Found",
            )
        })?;
        match script.len() {
            0 => Ok(BuildStatus::default()),
            1 => Ok(script[0].clone()),
            _ => Ok(script.remove(0)),
        }
    }
}

// ---------------------------------------------------------------------------
// MemoryCatalogSource
// ---------------------------------------------------------------------------

/// Serves a fixed catalog.
#[derive(Debug, Default)]
pub struct MemoryCatalogSource {
    catalog: Catalog,
}

impl MemoryCatalogSource {
    pub fn new(catalog: Catalog) -> Self {
        Self { catalog }
    }
}

#[async_trait]
impl CatalogSource for MemoryCatalogSource {
    async fn fetch_catalog(&self) -> AggregatorResult<Catalog> {
        Ok(self.catalog.clone())
    }
}

// ---------------------------------------------------------------------------
// MemoryOutputExporter
// ---------------------------------------------------------------------------

/// Collects exported outputs in call order.
#[derive(Debug, Default)]
pub struct MemoryOutputExporter {
    exported: Mutex<Vec<(String, String)>>,
}

impl MemoryOutputExporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn exported(&self) -> Vec<(String, String)> {
        self.exported.lock().unwrap().clone()
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.exported
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.clone())
    }
}

#[async_trait]
impl OutputExporter for MemoryOutputExporter {
    async fn export(&self, key: &str, value: &str) -> AggregatorResult<()> {
        self.exported
            .lock()
            .unwrap()
            .push((key.to_string(), value.to_string()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_status_script_repeats_last_snapshot() {
        let service = MemoryBuildService::new()
            .with_statuses("b1", vec![BuildStatus::default(), BuildStatus::new(1, "success")]);
        assert_eq!(service.fetch_status("a", "b1").await.unwrap().status, 0);
        assert_eq!(service.fetch_status("a", "b1").await.unwrap().status, 1);
        assert_eq!(service.fetch_status("a", "b1").await.unwrap().status, 1);
        assert_eq!(service.status_requests().len(), 3);
        assert!(service.fetch_status("a", "unknown").await.is_err());
    }

    #[tokio::test]
    async fn test_exporter_keeps_latest_value() {
        let exporter = MemoryOutputExporter::new();
        exporter.export("K", "1").await.unwrap();
        exporter.export("K", "2").await.unwrap();
        assert_eq!(exporter.get("K").as_deref(), Some("2"));
        assert_eq!(exporter.exported().len(), 2);
    }
}
