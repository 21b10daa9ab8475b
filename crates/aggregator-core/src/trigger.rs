//! Build triggering with per-project failure isolation.
//!
//! Every project goes through endpoint resolution, configuration fetch,
//! workflow selection and the trigger call. Any failure along the way turns
//! that project into a [`Skip`]; the rest of the batch is unaffected.
//! Trigger calls start real builds and are never retried, so a pending
//! cancellation is checked before each project rather than after the batch.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::domain::{Build, BuildStatus, Project, Skip, TriggerResponse};
use crate::endpoint::EndpointResolver;
use crate::error::{AggregatorError, AggregatorResult};
use crate::poller::cancel_requested;
use crate::remote::BuildService;
use crate::workflow::WorkflowSelector;

/// HTTP status the trigger endpoint answers with when a build was created.
pub const TRIGGER_CREATED: u16 = 201;

/// Builds started and projects skipped while triggering one batch.
#[derive(Debug, Clone, Default)]
pub struct TriggerOutcome {
    pub builds: Vec<Build>,
    pub skips: Vec<Skip>,
}

/// Starts one remote build per project.
pub struct BuildTrigger {
    resolver: EndpointResolver,
    selector: WorkflowSelector,
    service: Arc<dyn BuildService>,
    cancel: Option<watch::Receiver<bool>>,
}

impl BuildTrigger {
    pub fn new(
        resolver: EndpointResolver,
        selector: WorkflowSelector,
        service: Arc<dyn BuildService>,
    ) -> Self {
        Self {
            resolver,
            selector,
            service,
            cancel: None,
        }
    }

    /// Stop before the next project once `true` is published on `cancel`.
    pub fn with_cancellation(mut self, cancel: watch::Receiver<bool>) -> Self {
        self.cancel = Some(cancel);
        self
    }

    /// Trigger every project of `batch` in order, collecting failures as skips.
    ///
    /// Only cancellation is an error; builds already started in the batch are
    /// counted in [`AggregatorError::Cancelled`].
    pub async fn trigger_batch(&self, batch: &[Project]) -> AggregatorResult<TriggerOutcome> {
        let mut outcome = TriggerOutcome::default();
        for project in batch {
            if cancel_requested(self.cancel.as_ref()) {
                return Err(AggregatorError::Cancelled {
                    unfinished: outcome.builds.len(),
                });
            }
            info!(project = %project.title, repo = %project.source_url, "trigger build");
            match self.trigger_project(project).await {
                Ok(build) => {
                    info!(
                        project = %build.title,
                        app = %build.app_slug,
                        build = %build.build_slug,
                        url = %build.build_url,
                        "build started"
                    );
                    outcome.builds.push(build);
                }
                Err(e) => {
                    warn!(repo = %project.source_url, error = %e, "could not trigger build");
                    outcome.skips.push(Skip {
                        title: project.title.clone(),
                        source_url: project.source_url.clone(),
                        reason: format!("trigger build: {e}"),
                    });
                }
            }
        }
        Ok(outcome)
    }

    /// Resolve, configure and start the build of a single project.
    pub async fn trigger_project(&self, project: &Project) -> AggregatorResult<Build> {
        let endpoint = self.resolver.resolve(&project.source_url).await?;
        let app = endpoint.app_slug.as_str();

        let config = self.service.fetch_config(app).await?;
        let workflow = self.selector.select(&config).await?;

        let response = self
            .service
            .trigger(app, &workflow, &endpoint.trigger_token)
            .await?;
        let (build_slug, build_url) = accept_trigger_response(app, &workflow, &response)?;

        Ok(Build {
            title: project.title.clone(),
            app_slug: endpoint.app_slug,
            build_slug,
            build_url,
            started_at: Utc::now(),
            status: BuildStatus::default(),
            finished_at: None,
        })
    }
}

/// Check a trigger response and extract `(build_slug, build_url)`.
pub fn accept_trigger_response(
    app: &str,
    workflow: &str,
    response: &TriggerResponse,
) -> AggregatorResult<(String, String)> {
    if response.http_status != TRIGGER_CREATED {
        return Err(AggregatorError::UnexpectedStatus {
            target: format!("{workflow} workflow trigger on app {app}"),
            expected: TRIGGER_CREATED,
            actual: response.http_status,
            body: response.body.to_string(),
        });
    }

    let body = &response.body;
    if body.get("status").and_then(serde_json::Value::as_str) != Some("ok") {
        return Err(AggregatorError::TriggerRejected {
            app: app.to_string(),
            body: body.to_string(),
        });
    }

    let field = |name: &str| {
        body.get(name)
            .and_then(serde_json::Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| AggregatorError::missing_field(name, format!("trigger response of app {app}")))
    };
    Ok((field("build_slug")?, field("build_url")?))
}
