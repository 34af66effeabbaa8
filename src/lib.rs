//! Presshot
//!
//! Readiness-aware rendering of web pages to PDF documents and raster
//! images. The crate does not host pages itself: it drives an external
//! [`PageHost`] (an Electron window, a CDP tab, a test double) through one
//! render job at a time, deciding *when* a dynamically loading page is
//! ready to capture and routing to the right capture strategy.
//!
//! # Features
//!
//! - **Readiness strategies**: fixed delay, find-in-page text polling,
//!   target-element sizing, or the DOM-ready default
//! - **Deadline enforcement**: a per-job load deadline merged with the
//!   host's lifecycle signals into one tagged outcome
//! - **Capture dispatch**: PDF export with page-size parsing and
//!   print-stylesheet stripping, or PNG/JPEG capture with per-mode
//!   resize/settle rules
//!
//! # Example
//!
//! ```no_run
//! use presshot::{JobCoordinator, RenderConfig, RenderJob, ScriptedHost};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let coordinator = JobCoordinator::new(RenderConfig::default());
//! let host = ScriptedHost::new();
//!
//! let job = RenderJob {
//!     wait_for_text: Some("Report complete".to_string()),
//!     ..RenderJob::pdf("https://example.com/report")
//! };
//!
//! let artifact = coordinator.run(&job, &host).await?;
//! println!("{}: {} bytes", artifact.format.media_type(), artifact.bytes.len());
//! # Ok(())
//! # }
//! ```

pub mod error;
pub use error::{Error, Result};

pub mod host;
pub use host::{
    FindResult, LoadFailure, LoadSignal, MarginsType, PageHost, PageImage, PageSize,
    PdfExportOptions, Rect, StopFindAction, CACHE_BUSTING_HEADERS, SIDE_CHANNEL_BINDING,
};

pub mod job;
pub use job::{
    ImageCaptureOptions, ImageFormat, PdfCaptureOptions, ReadinessMode, RenderJob, RenderType,
};

pub mod outcome;
pub use outcome::{DefaultLoadValidator, LoadOutcome, LoadValidator};

pub mod coordinator;
pub use coordinator::{ArtifactFormat, JobCoordinator, RenderArtifact};

pub mod capture;
pub mod readiness;

// Scriptable in-memory host for tests and downstream consumers
pub mod scripted;
pub use scripted::{LoadPlan, ScriptedHost};

/// Process-wide defaults handed to the coordinator at construction.
///
/// Jobs may override both fields; these apply when a job leaves them
/// unset.
#[derive(Debug, Clone)]
pub struct RenderConfig {
    /// Default load deadline in seconds
    pub timeout_seconds: u64,
    /// Default viewport dimensions
    pub viewport: Viewport,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: 30,
            viewport: Viewport::default(),
        }
    }
}

/// Viewport dimensions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
        }
    }
}
