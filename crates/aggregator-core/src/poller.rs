//! Completion polling for one batch of triggered builds.
//!
//! Each sweep fetches the status of every unfinished build, one call at a
//! time. Between sweeps the poller sleeps for the configured interval; that
//! sleep is raced against an optional cancellation signal and bounded by an
//! optional maximum wait. Any fetch error ends the poll.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::domain::Build;
use crate::error::{AggregatorError, AggregatorResult};
use crate::remote::BuildService;

/// Timing of the completion poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollConfig {
    /// Wait between two sweeps.
    pub interval: Duration,
    /// Give up with [`AggregatorError::PollTimeout`] once this much time has
    /// passed and builds are still running. `None` waits forever.
    pub max_wait: Option<Duration>,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(10),
            max_wait: None,
        }
    }
}

/// Blocks until every build of a batch reports a terminal status.
pub struct CompletionPoller {
    service: Arc<dyn BuildService>,
    config: PollConfig,
    cancel: Option<watch::Receiver<bool>>,
}

impl CompletionPoller {
    pub fn new(service: Arc<dyn BuildService>, config: PollConfig) -> Self {
        Self {
            service,
            config,
            cancel: None,
        }
    }

    /// Stop waiting as soon as `true` is published on `cancel`.
    pub fn with_cancellation(mut self, cancel: watch::Receiver<bool>) -> Self {
        self.cancel = Some(cancel);
        self
    }

    /// Poll until all `builds` are finished, updating each one in place.
    pub async fn poll(&self, builds: &mut [Build]) -> AggregatorResult<()> {
        if builds.is_empty() {
            return Ok(());
        }

        let started = Instant::now();
        let mut finished = builds.iter().filter(|b| b.is_finished()).count();
        let mut sweep = 0u32;

        loop {
            sweep += 1;
            for build in builds.iter_mut().filter(|b| !b.is_finished()) {
                build.status = self
                    .service
                    .fetch_status(&build.app_slug, &build.build_slug)
                    .await?;

                if build.is_finished() {
                    build.finished_at = Some(Utc::now());
                    finished += 1;
                    info!(
                        project = %build.title,
                        build = %build.build_slug,
                        status = %build.status.status_text,
                        "build finished"
                    );
                }
            }

            let running = builds.len() - finished;
            debug!(sweep, finished, running, "poll sweep done");
            if running == 0 {
                return Ok(());
            }

            if let Some(max_wait) = self.config.max_wait {
                let waited = started.elapsed();
                if waited >= max_wait {
                    return Err(AggregatorError::PollTimeout {
                        waited_secs: waited.as_secs(),
                        unfinished: unfinished_slugs(builds),
                    });
                }
            }

            self.pause(running).await?;
        }
    }

    /// Sleep one interval unless cancellation arrives first.
    async fn pause(&self, running: usize) -> AggregatorResult<()> {
        let sleep = tokio::time::sleep(self.config.interval);
        let Some(cancel) = &self.cancel else {
            sleep.await;
            return Ok(());
        };

        let mut cancel = cancel.clone();
        tokio::pin!(sleep);
        tokio::select! {
            _ = &mut sleep => return Ok(()),
            signal = cancel.wait_for(|cancelled| *cancelled) => {
                if signal.is_ok() {
                    return Err(AggregatorError::Cancelled { unfinished: running });
                }
            }
        }
        // Sender dropped: nobody can cancel any more.
        sleep.await;
        Ok(())
    }
}

/// Whether `true` has been published on `cancel`.
pub(crate) fn cancel_requested(cancel: Option<&watch::Receiver<bool>>) -> bool {
    cancel.is_some_and(|rx| *rx.borrow())
}

fn unfinished_slugs(builds: &[Build]) -> Vec<String> {
    builds
        .iter()
        .filter(|b| !b.is_finished())
        .map(|b| b.build_slug.clone())
        .collect()
}
