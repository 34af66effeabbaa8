//! Readiness detection: deciding when a loaded page is safe to capture.
//!
//! Four mutually exclusive strategies, selected by the job's fields (see
//! [`RenderJob::readiness_mode`]). Each strategy resolves once and leaves
//! no timers or subscriptions behind; abandonment on an early error is by
//! dropping the job future, so there is no ambient retry registry to clean
//! up.

use std::time::Duration;

use log::debug;
use tokio::sync::oneshot;
use tokio::time::{sleep, timeout};

use crate::host::{PageHost, StopFindAction, SIDE_CHANNEL_BINDING};
use crate::job::{ReadinessMode, RenderJob};
use crate::{Error, Result};

/// Lower bound of the text-poll retry interval
pub const TEXT_POLL_MIN_INTERVAL: Duration = Duration::from_millis(750);
/// Upper bound of the text-poll retry interval
pub const TEXT_POLL_MAX_INTERVAL: Duration = Duration::from_millis(1000);
/// Growth factor of the retry interval (1 = constant backoff)
const TEXT_POLL_GROWTH_FACTOR: u64 = 1;

/// Settle delay when the target element already matches the viewport
pub const MATCH_SETTLE: Duration = Duration::from_millis(100);
/// Settle delay after an explicit viewport resize, long enough for reflow
pub const RESIZE_SETTLE: Duration = Duration::from_millis(1000);

/// Retry interval for attempt `n` (1-based): `min * factor^(n-1)` clamped
/// into the `[min, max]` window. With factor 1 this is a constant 750ms.
fn poll_interval(attempt: u64) -> Duration {
    let base = TEXT_POLL_MIN_INTERVAL
        .as_millis()
        .saturating_mul(TEXT_POLL_GROWTH_FACTOR.saturating_pow(attempt.saturating_sub(1) as u32) as u128)
        as u64;
    Duration::from_millis(base.clamp(
        TEXT_POLL_MIN_INTERVAL.as_millis() as u64,
        TEXT_POLL_MAX_INTERVAL.as_millis() as u64,
    ))
}

/// Wait until the page is ready to capture, per the job's strategy.
///
/// `viewport` is the job's effective browser size; `timeout_seconds` is
/// the job's effective timeout, reused here as the retry budget for text
/// polling and as the bound on the side-channel rendezvous. Returns the
/// resolved target size in target mode, `None` otherwise.
pub async fn await_ready(
    job: &RenderJob,
    host: &dyn PageHost,
    timeout_seconds: u64,
    viewport: (u32, u32),
) -> Result<Option<(u32, u32)>> {
    match job.readiness_mode() {
        ReadinessMode::FixedDelay(ms) => {
            debug!("readiness: fixed delay of {}ms", ms);
            sleep(Duration::from_millis(ms)).await;
            Ok(None)
        }
        ReadinessMode::TextPoll(text) => {
            poll_for_text(host, text, timeout_seconds).await?;
            Ok(None)
        }
        ReadinessMode::TargetElementSize(id) => {
            let size = measure_target_element(host, id, timeout_seconds).await?;
            if size == viewport {
                sleep(MATCH_SETTLE).await;
            } else {
                host.set_size(size.0, size.1).await?;
                sleep(RESIZE_SETTLE).await;
            }
            Ok(Some(size))
        }
        ReadinessMode::DomReady => {
            await_dom_ready(host, timeout_seconds).await?;
            Ok(None)
        }
    }
}

/// Bounded find-in-page retry loop: one attempt per budgeted second, with
/// a constant interval between attempts. Ready once a pass reports a match
/// and is final; exhaustion surfaces [`Error::ReadinessTimeout`].
async fn poll_for_text(host: &dyn PageHost, text: &str, timeout_seconds: u64) -> Result<()> {
    for attempt in 1..=timeout_seconds {
        let result = host.find_in_page(text).await?;
        if result.matches > 0 && result.final_update {
            debug!("readiness: found {:?} on attempt {}", text, attempt);
            host.stop_find_in_page(StopFindAction::ClearSelection).await?;
            return Ok(());
        }
        debug!("readiness: {:?} not found on attempt {}", text, attempt);
        if attempt < timeout_seconds {
            sleep(poll_interval(attempt)).await;
        }
    }
    Err(Error::ReadinessTimeout(timeout_seconds))
}

/// Inject the measuring script and await its one-shot size report.
/// An absent element reports `{0,0}`, which is a valid target size.
async fn measure_target_element(
    host: &dyn PageHost,
    element_id: &str,
    timeout_seconds: u64,
) -> Result<(u32, u32)> {
    // Subscribe before injecting so a fast page cannot report into the void
    let report = host.subscribe_side_channel();
    host.execute_script(&target_measure_script(element_id)).await?;
    let payload = await_report(report, timeout_seconds).await?;
    let width = payload.get("width").and_then(|v| v.as_u64()).unwrap_or(0) as u32;
    let height = payload.get("height").and_then(|v| v.as_u64()).unwrap_or(0) as u32;
    debug!("readiness: element {:?} measured {}x{}", element_id, width, height);
    Ok((width, height))
}

/// Inject the DOM-ready probe and await its one-shot report.
async fn await_dom_ready(host: &dyn PageHost, timeout_seconds: u64) -> Result<()> {
    let report = host.subscribe_side_channel();
    host.execute_script(DOM_READY_SCRIPT).await?;
    await_report(report, timeout_seconds).await?;
    Ok(())
}

/// Await a side-channel report, bounded by the job's timeout budget so a
/// page that never reports cannot hang the job.
async fn await_report(
    report: oneshot::Receiver<serde_json::Value>,
    timeout_seconds: u64,
) -> Result<serde_json::Value> {
    match timeout(Duration::from_secs(timeout_seconds), report).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(_)) => Err(Error::ReadinessTimeout(timeout_seconds)),
        Err(_) => Err(Error::ReadinessTimeout(timeout_seconds)),
    }
}

/// Probe that reports once the document has finished loading. Guarded so a
/// double injection cannot register a second page-side listener.
const DOM_READY_SCRIPT: &str = r#"(function () {
  if (window.__presshotDomReadyHooked) { return; }
  window.__presshotDomReadyHooked = true;
  var report = function () { window.__presshotReport({ ready: true }); };
  if (document.readyState === 'complete') { report(); }
  else { window.addEventListener('load', report, { once: true }); }
})();"#;

/// Script measuring the named element's box once the document has loaded.
/// The element id is embedded as a JSON string literal, so arbitrary ids
/// cannot break out of the script.
fn target_measure_script(element_id: &str) -> String {
    let id = serde_json::Value::from(element_id).to_string();
    format!(
        r#"(function () {{
  if (window.__presshotTargetHooked) {{ return; }}
  window.__presshotTargetHooked = true;
  var measure = function () {{
    var el = document.getElementById({id});
    window.{binding}({{
      width: el ? el.offsetWidth : 0,
      height: el ? el.offsetHeight : 0
    }});
  }};
  if (document.readyState === 'complete') {{ measure(); }}
  else {{ window.addEventListener('load', measure, {{ once: true }}); }}
}})();"#,
        id = id,
        binding = SIDE_CHANNEL_BINDING,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn poll_interval_is_constant_within_window() {
        for attempt in 1..=10 {
            let interval = poll_interval(attempt);
            assert!(interval >= TEXT_POLL_MIN_INTERVAL);
            assert!(interval <= TEXT_POLL_MAX_INTERVAL);
            assert_eq!(interval, TEXT_POLL_MIN_INTERVAL);
        }
    }

    #[test]
    fn measure_script_escapes_element_id() {
        let script = target_measure_script(r#"x"); alert(1); ("#);
        assert!(script.contains(r#"getElementById("x\"); alert(1); (")"#));
    }

    #[test]
    fn injected_scripts_are_guarded() {
        assert!(DOM_READY_SCRIPT.contains("__presshotDomReadyHooked"));
        assert!(target_measure_script("chart").contains("__presshotTargetHooked"));
    }

    #[test]
    fn scripts_report_through_the_side_channel_binding() {
        assert!(DOM_READY_SCRIPT.contains(SIDE_CHANNEL_BINDING));
        assert!(target_measure_script("chart").contains(SIDE_CHANNEL_BINDING));
    }
}
