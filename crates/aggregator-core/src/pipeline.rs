//! End-to-end orchestration: catalog → batches → trigger → poll → report.
//!
//! Batches are strictly serialized. A batch is triggered, then polled until
//! every build in it finished, and only then is the next batch taken. This
//! bounds the number of builds running remotely to the batch size.
//!
//! One cancellation channel is shared by the aggregator, the trigger and the
//! poller. It is checked before every batch, before every trigger call and
//! during every wait between sweeps.

use tokio::sync::watch;
use tracing::{info, warn};

use crate::batcher::Batcher;
use crate::catalog::filter_by_org;
use crate::domain::{Build, Project, Skip};
use crate::error::{AggregatorError, AggregatorResult};
use crate::poller::{cancel_requested, CompletionPoller};
use crate::remote::{CatalogSource, OutputExporter};
use crate::report::{Report, ReportStyle};
use crate::trigger::BuildTrigger;

/// Default number of builds triggered and polled together.
pub const DEFAULT_BATCH_SIZE: usize = 5;

/// Everything a run produced.
#[derive(Debug, Clone, Default)]
pub struct AggregateOutcome {
    /// Builds that reached a terminal status, in trigger order.
    pub finished: Vec<Build>,
    /// Projects that never became a build, in project order.
    pub skips: Vec<Skip>,
}

impl AggregateOutcome {
    pub fn failed(&self) -> impl Iterator<Item = &Build> {
        self.finished.iter().filter(|b| b.failed())
    }

    pub fn report(&self, style: &ReportStyle) -> Report {
        Report::generate(&self.finished, &self.skips, style)
    }

    /// Log counts and per-build durations.
    pub fn log_summary(&self) {
        for build in &self.finished {
            let secs = build.duration().map(|d| d.num_seconds()).unwrap_or_default();
            info!(
                project = %build.title,
                status = %build.status.status_text,
                duration_secs = secs,
                url = %build.build_url,
                "build result"
            );
        }
        info!(
            triggered = self.finished.len(),
            skipped = self.skips.len(),
            failed = self.failed().count(),
            "aggregation finished"
        );
    }
}

/// Fetch the catalog and keep the latest project of each step whose source
/// lives under one of `orgs` on `host`.
pub async fn collect_projects(
    source: &dyn CatalogSource,
    orgs: &[String],
    host: &str,
) -> AggregatorResult<Vec<Project>> {
    let catalog = source.fetch_catalog().await?;
    let latest = catalog.latest_projects();
    let total = latest.len();
    let projects = filter_by_org(latest, orgs, host);
    info!(steps = total, selected = projects.len(), orgs = ?orgs, "catalog loaded");
    Ok(projects)
}

/// Drives triggering and polling batch by batch.
pub struct BuildAggregator {
    trigger: BuildTrigger,
    poller: CompletionPoller,
    batch_size: usize,
    cancel: Option<watch::Receiver<bool>>,
}

impl BuildAggregator {
    /// `batch_size` below 1 is raised to 1.
    pub fn new(trigger: BuildTrigger, poller: CompletionPoller, batch_size: usize) -> Self {
        Self {
            trigger,
            poller,
            batch_size: batch_size.max(1),
            cancel: None,
        }
    }

    /// Abort the run once `true` is published on `cancel`. The trigger and
    /// the poller observe the same channel.
    pub fn with_cancellation(self, cancel: watch::Receiver<bool>) -> Self {
        Self {
            trigger: self.trigger.with_cancellation(cancel.clone()),
            poller: self.poller.with_cancellation(cancel.clone()),
            batch_size: self.batch_size,
            cancel: Some(cancel),
        }
    }

    /// Build every project. Per-project trigger failures become skips;
    /// polling errors and cancellation abort the run.
    pub async fn run(&self, projects: &[Project]) -> AggregatorResult<AggregateOutcome> {
        let mut outcome = AggregateOutcome::default();
        let mut batcher = Batcher::new(projects);
        let mut batch_no = 0usize;

        while batcher.has_next() {
            if cancel_requested(self.cancel.as_ref()) {
                warn!(remaining = batcher.remaining(), "cancelled before next batch");
                return Err(AggregatorError::Cancelled { unfinished: 0 });
            }
            let batch = batcher.next(self.batch_size);
            batch_no += 1;
            info!(
                batch = batch_no,
                size = batch.len(),
                remaining = batcher.remaining(),
                "starting batch"
            );

            let triggered = self.trigger.trigger_batch(batch).await?;
            outcome.skips.extend(triggered.skips);

            let mut builds = triggered.builds;
            if builds.is_empty() {
                warn!(batch = batch_no, "no builds started in batch");
                continue;
            }
            info!(batch = batch_no, builds = builds.len(), "waiting for builds");
            self.poller.poll(&mut builds).await?;
            outcome.finished.extend(builds);
        }

        Ok(outcome)
    }
}

/// Publish every report output, stopping at the first failure.
pub async fn export_report(exporter: &dyn OutputExporter, report: &Report) -> AggregatorResult<()> {
    for (key, value) in report.outputs() {
        exporter.export(key, &value).await?;
        info!("{key}: {value}");
    }
    Ok(())
}
