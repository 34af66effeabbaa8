//! Load-outcome merging and validation.
//!
//! The host's terminal lifecycle events and the coordinator's deadline are
//! folded into one tagged [`LoadOutcome`] by an explicit merge, then judged
//! by a [`LoadValidator`] before readiness detection may begin.

use std::time::Duration;

use log::warn;
use tokio::sync::oneshot;
use tokio::time::timeout;

use crate::host::{LoadFailure, LoadSignal};
use crate::{Error, Result};

/// Chromium net error for an aborted request; ignorable by default because
/// redirect-heavy pages abort their own initial request.
const ERR_ABORTED: i32 = -3;

/// The merged terminal outcome of a page load: the first of the host's
/// lifecycle signals, or deadline expiry when none arrived in time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    /// The page finished loading
    Finished,
    /// The host reported a load failure
    Failed(LoadFailure),
    /// The host's renderer process crashed
    Crashed,
    /// The deadline expired before any terminal signal arrived
    TimedOut,
}

/// Await the host's one-shot load signal under `deadline`, synthesizing
/// [`LoadOutcome::TimedOut`] on expiry. The deadline timer is dropped as
/// soon as the merge resolves and is never re-armed; later phases carry
/// their own retry/settle budgets.
pub async fn await_load_outcome(
    signal: oneshot::Receiver<LoadSignal>,
    deadline: Duration,
) -> LoadOutcome {
    match timeout(deadline, signal).await {
        Ok(Ok(LoadSignal::Finished)) => LoadOutcome::Finished,
        Ok(Ok(LoadSignal::Failed(failure))) => LoadOutcome::Failed(failure),
        Ok(Ok(LoadSignal::Crashed)) => LoadOutcome::Crashed,
        // Sender dropped without a signal: the host went away mid-load
        Ok(Err(_)) => LoadOutcome::Crashed,
        Err(_) => LoadOutcome::TimedOut,
    }
}

/// Policy deciding whether a host-reported load failure may be ignored.
///
/// Embedders can supply their own policy; the crate ships
/// [`DefaultLoadValidator`].
pub trait LoadValidator: Send + Sync {
    /// Whether the job may proceed to readiness detection despite `failure`
    fn is_ignorable(&self, failure: &LoadFailure) -> bool;
}

/// Default policy: sub-resource failures and aborted requests are
/// ignorable; any main-frame failure with another code is fatal.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultLoadValidator;

impl LoadValidator for DefaultLoadValidator {
    fn is_ignorable(&self, failure: &LoadFailure) -> bool {
        !failure.main_frame || failure.code == ERR_ABORTED
    }
}

/// Judge a merged outcome: `Ok(())` means readiness detection may begin.
///
/// `timeout_seconds` only labels the [`Error::TimedOut`] variant so callers
/// can tell "page never signaled completion" apart from "page explicitly
/// failed".
pub fn validate(
    outcome: &LoadOutcome,
    validator: &dyn LoadValidator,
    timeout_seconds: u64,
) -> Result<()> {
    match outcome {
        LoadOutcome::Finished => Ok(()),
        LoadOutcome::Failed(failure) => {
            if validator.is_ignorable(failure) {
                warn!(
                    "ignoring load failure {} ({}) for {}",
                    failure.code, failure.description, failure.url
                );
                Ok(())
            } else {
                Err(Error::LoadFailed {
                    code: failure.code,
                    description: failure.description.clone(),
                    url: failure.url.clone(),
                })
            }
        }
        LoadOutcome::Crashed => Err(Error::Crashed),
        LoadOutcome::TimedOut => Err(Error::TimedOut(timeout_seconds)),
    }
}
