//! An in-memory, fully scriptable [`PageHost`] for tests and downstream
//! consumers that need deterministic host behavior.
//!
//! The host is driven by a plan: how the load terminates (and after what
//! delay), what each find-in-page pass reports, what the injected-script
//! side channel reports back, and which canned bytes captures and exports
//! produce. Every call is appended to an ordered log so tests can assert
//! on sequencing, and the subscription probes expose whether the one-shot
//! channels handed to a job are still alive.
//!
//! Delayed deliveries are spawned on the ambient tokio runtime, so a
//! `ScriptedHost` must be used inside one (`#[tokio::test]`).

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::oneshot;
use tokio::time::sleep;

use crate::host::{
    FindResult, LoadFailure, LoadSignal, PageHost, PageImage, PdfExportOptions, Rect,
    StopFindAction, SIDE_CHANNEL_BINDING,
};
use crate::{Error, Result};

/// How a scripted load terminates
#[derive(Debug, Clone)]
pub enum LoadPlan {
    /// Emit `did-finish-load` after the delay
    Finish { after: Duration },
    /// Emit `did-fail-load` with the given failure after the delay
    Fail { after: Duration, failure: LoadFailure },
    /// Emit `crashed` after the delay
    Crash { after: Duration },
    /// Never emit a terminal signal (exercises the deadline)
    Never,
}

struct Inner {
    load_plan: LoadPlan,
    load_tx: Option<oneshot::Sender<LoadSignal>>,
    side_tx: Option<oneshot::Sender<serde_json::Value>>,
    side_report: Option<(Duration, serde_json::Value)>,
    find_passes: VecDeque<FindResult>,
    size: (u32, u32),
    pdf_bytes: Vec<u8>,
    png_bytes: Vec<u8>,
    jpeg_bytes: Vec<u8>,
    capture_failure: Option<String>,
    export_failure: Option<String>,
    last_load_headers: Vec<(String, String)>,
    calls: Vec<String>,
}

/// Scriptable in-memory page host
#[derive(Clone)]
pub struct ScriptedHost {
    inner: Arc<Mutex<Inner>>,
}

impl ScriptedHost {
    /// A host whose load finishes immediately, with default canned bytes
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                load_plan: LoadPlan::Finish {
                    after: Duration::ZERO,
                },
                load_tx: None,
                side_tx: None,
                side_report: None,
                find_passes: VecDeque::new(),
                size: (1280, 720),
                pdf_bytes: b"%PDF-1.4 scripted".to_vec(),
                png_bytes: b"\x89PNG\r\n\x1a\n scripted".to_vec(),
                jpeg_bytes: b"\xff\xd8\xff scripted".to_vec(),
                capture_failure: None,
                export_failure: None,
                last_load_headers: Vec::new(),
                calls: Vec::new(),
            })),
        }
    }

    /// Replace the load plan
    pub fn with_load_plan(self, plan: LoadPlan) -> Self {
        self.lock().load_plan = plan;
        self
    }

    /// Queue the results of successive find-in-page passes; once the queue
    /// is exhausted, passes report zero final matches
    pub fn with_find_passes(self, passes: impl IntoIterator<Item = FindResult>) -> Self {
        self.lock().find_passes = passes.into_iter().collect();
        self
    }

    /// Deliver `payload` through the side channel after `after`, once a
    /// reporting script has been injected
    pub fn with_side_report(self, after: Duration, payload: serde_json::Value) -> Self {
        self.lock().side_report = Some((after, payload));
        self
    }

    /// Set the initial viewport size
    pub fn with_size(self, width: u32, height: u32) -> Self {
        self.lock().size = (width, height);
        self
    }

    /// Canned bytes returned by PDF export
    pub fn with_pdf_bytes(self, bytes: Vec<u8>) -> Self {
        self.lock().pdf_bytes = bytes;
        self
    }

    /// Canned bytes returned by PNG encoding
    pub fn with_png_bytes(self, bytes: Vec<u8>) -> Self {
        self.lock().png_bytes = bytes;
        self
    }

    /// Canned bytes returned by JPEG encoding
    pub fn with_jpeg_bytes(self, bytes: Vec<u8>) -> Self {
        self.lock().jpeg_bytes = bytes;
        self
    }

    /// Make `capture_page` fail with the given message
    pub fn with_capture_failure(self, message: impl Into<String>) -> Self {
        self.lock().capture_failure = Some(message.into());
        self
    }

    /// Make `print_to_pdf` fail with the given message
    pub fn with_export_failure(self, message: impl Into<String>) -> Self {
        self.lock().export_failure = Some(message.into());
        self
    }

    /// Ordered log of every host call made so far
    pub fn calls(&self) -> Vec<String> {
        self.lock().calls.clone()
    }

    /// Current viewport size
    pub fn current_size(&self) -> (u32, u32) {
        self.lock().size
    }

    /// Headers attached to the most recent load instruction
    pub fn last_load_headers(&self) -> Vec<(String, String)> {
        self.lock().last_load_headers.clone()
    }

    /// Whether the load subscription handed to a job is still live
    /// (not yet fired, receiver not dropped)
    pub fn load_subscription_open(&self) -> bool {
        self.lock()
            .load_tx
            .as_ref()
            .map(|tx| !tx.is_closed())
            .unwrap_or(false)
    }

    /// Whether the side-channel subscription is still live
    pub fn side_subscription_open(&self) -> bool {
        self.lock()
            .side_tx
            .as_ref()
            .map(|tx| !tx.is_closed())
            .unwrap_or(false)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn record(&self, call: String) {
        self.lock().calls.push(call);
    }
}

impl Default for ScriptedHost {
    fn default() -> Self {
        Self::new()
    }
}

struct ScriptedImage {
    host: ScriptedHost,
}

impl PageImage for ScriptedImage {
    fn to_png(&self) -> Result<Vec<u8>> {
        self.host.record("to_png".to_string());
        Ok(self.host.lock().png_bytes.clone())
    }

    fn to_jpeg(&self, quality: u8) -> Result<Vec<u8>> {
        self.host.record(format!("to_jpeg quality={}", quality));
        Ok(self.host.lock().jpeg_bytes.clone())
    }
}

#[async_trait]
impl PageHost for ScriptedHost {
    async fn load(&self, url: &str, extra_headers: &[(&str, &str)]) -> Result<()> {
        let plan = {
            let mut inner = self.lock();
            inner.calls.push(format!("load {}", url));
            inner.last_load_headers = extra_headers
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect();
            inner.load_plan.clone()
        };

        let (after, signal) = match plan {
            LoadPlan::Finish { after } => (after, LoadSignal::Finished),
            LoadPlan::Fail { after, failure } => (after, LoadSignal::Failed(failure)),
            LoadPlan::Crash { after } => (after, LoadSignal::Crashed),
            LoadPlan::Never => return Ok(()),
        };

        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            sleep(after).await;
            let tx = inner
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner())
                .load_tx
                .take();
            if let Some(tx) = tx {
                let _ = tx.send(signal);
            }
        });
        Ok(())
    }

    async fn execute_script(&self, code: &str) -> Result<serde_json::Value> {
        self.record(format!("execute_script {}", code));

        // A reporting script was injected: deliver the planned side-channel
        // payload after its delay
        if code.contains(SIDE_CHANNEL_BINDING) {
            let report = self.lock().side_report.take();
            if let Some((after, payload)) = report {
                let inner = Arc::clone(&self.inner);
                tokio::spawn(async move {
                    sleep(after).await;
                    let tx = inner
                        .lock()
                        .unwrap_or_else(|poisoned| poisoned.into_inner())
                        .side_tx
                        .take();
                    if let Some(tx) = tx {
                        let _ = tx.send(payload);
                    }
                });
            }
        }
        Ok(serde_json::Value::Null)
    }

    async fn find_in_page(&self, text: &str) -> Result<FindResult> {
        self.record(format!("find_in_page {}", text));
        Ok(self.lock().find_passes.pop_front().unwrap_or(FindResult {
            matches: 0,
            final_update: true,
        }))
    }

    async fn stop_find_in_page(&self, action: StopFindAction) -> Result<()> {
        self.record(format!("stop_find_in_page {:?}", action));
        Ok(())
    }

    async fn capture_page(&self, rect: Option<Rect>) -> Result<Box<dyn PageImage>> {
        match rect {
            Some(r) => self.record(format!(
                "capture_page {},{} {}x{}",
                r.x, r.y, r.width, r.height
            )),
            None => self.record("capture_page full".to_string()),
        }
        if let Some(message) = self.lock().capture_failure.clone() {
            return Err(Error::Host(message));
        }
        Ok(Box::new(ScriptedImage { host: self.clone() }))
    }

    async fn set_size(&self, width: u32, height: u32) -> Result<()> {
        let mut inner = self.lock();
        inner.calls.push(format!("set_size {}x{}", width, height));
        inner.size = (width, height);
        Ok(())
    }

    async fn get_size(&self) -> Result<(u32, u32)> {
        self.record("get_size".to_string());
        Ok(self.lock().size)
    }

    async fn print_to_pdf(&self, options: &PdfExportOptions) -> Result<Vec<u8>> {
        let options_json =
            serde_json::to_string(options).map_err(|e| Error::Host(e.to_string()))?;
        self.record(format!("print_to_pdf {}", options_json));
        let inner = self.lock();
        if let Some(message) = inner.export_failure.clone() {
            return Err(Error::Host(message));
        }
        Ok(inner.pdf_bytes.clone())
    }

    fn subscribe_load(&self) -> oneshot::Receiver<LoadSignal> {
        let (tx, rx) = oneshot::channel();
        self.lock().load_tx = Some(tx);
        rx
    }

    fn subscribe_side_channel(&self) -> oneshot::Receiver<serde_json::Value> {
        let (tx, rx) = oneshot::channel();
        self.lock().side_tx = Some(tx);
        rx
    }
}
