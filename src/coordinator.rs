//! The job coordinator: the state machine owning a render job from
//! submission to its single terminal outcome.

use std::time::Duration;

use log::debug;

use crate::capture;
use crate::host::{PageHost, CACHE_BUSTING_HEADERS};
use crate::job::RenderJob;
use crate::outcome::{await_load_outcome, validate, DefaultLoadValidator, LoadValidator};
use crate::readiness;
use crate::{RenderConfig, Result};

/// The produced artifact: raw bytes plus the format they encode.
#[derive(Debug, Clone)]
pub struct RenderArtifact {
    /// What the bytes encode
    pub format: ArtifactFormat,
    /// Raw PDF or image bytes
    pub bytes: Vec<u8>,
}

/// Encoding of a [`RenderArtifact`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactFormat {
    Pdf,
    Png,
    Jpeg,
}

impl ArtifactFormat {
    /// The media type of artifacts in this format
    pub fn media_type(&self) -> &'static str {
        match self {
            ArtifactFormat::Pdf => "application/pdf",
            ArtifactFormat::Png => "image/png",
            ArtifactFormat::Jpeg => "image/jpeg",
        }
    }
}

/// Runs render jobs against a page host.
///
/// One coordinator can run any number of jobs, one at a time per host; it
/// holds the process-wide defaults and the load-failure policy.
pub struct JobCoordinator {
    config: RenderConfig,
    validator: Box<dyn LoadValidator>,
}

impl JobCoordinator {
    /// A coordinator with the default load-failure policy
    pub fn new(config: RenderConfig) -> Self {
        Self::with_validator(config, Box::new(DefaultLoadValidator))
    }

    /// A coordinator with a caller-supplied load-failure policy
    pub fn with_validator(config: RenderConfig, validator: Box<dyn LoadValidator>) -> Self {
        Self { config, validator }
    }

    /// Run one job to its terminal outcome.
    ///
    /// Resolves exactly once with the artifact or the job's error. The
    /// phases in order: load with cache-busting headers under the job's
    /// deadline, validate the merged load outcome, detect readiness, then
    /// dispatch to the capture strategy. The deadline bounds only the load
    /// phase; readiness and capture carry their own bounded budgets. Every
    /// host subscription taken during the job is consumed or dropped by
    /// the time this returns.
    pub async fn run(&self, job: &RenderJob, host: &dyn PageHost) -> Result<RenderArtifact> {
        let timeout_seconds = job.timeout_seconds.unwrap_or(self.config.timeout_seconds);
        let viewport = (
            job.browser_width.unwrap_or(self.config.viewport.width),
            job.browser_height.unwrap_or(self.config.viewport.height),
        );

        // Subscribe before loading so the first terminal signal cannot be
        // missed, then merge it with the deadline into one tagged outcome
        let signal = host.subscribe_load();
        debug!("job: loading {} (deadline {}s)", job.url, timeout_seconds);
        host.load(&job.url, &CACHE_BUSTING_HEADERS).await?;
        let outcome = await_load_outcome(signal, Duration::from_secs(timeout_seconds)).await;
        debug!("job: load outcome {:?}", outcome);
        validate(&outcome, self.validator.as_ref(), timeout_seconds)?;

        let target_size = readiness::await_ready(job, host, timeout_seconds, viewport).await?;
        debug!("job: ready, dispatching capture for {}", job.url);
        capture::capture(job, host, viewport, target_size).await
    }
}
