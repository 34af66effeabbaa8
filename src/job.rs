//! Render-job description: what to load, how to decide it is ready, and
//! how to capture it.

use serde::Serialize;

use crate::host::{MarginsType, Rect};

/// A single render job, immutable once submitted to the coordinator.
#[derive(Debug, Clone)]
pub struct RenderJob {
    /// Page to load
    pub url: String,
    /// Artifact to produce, with its per-type capture options
    pub render_type: RenderType,
    /// Fixed readiness delay in milliseconds; `> 0` overrides every other
    /// readiness mode
    pub delay_ms: u64,
    /// Wait until this text is found in the page (empty = unset)
    pub wait_for_text: Option<String>,
    /// Wait for this element and adopt its box size as the capture size
    /// (empty = unset)
    pub target_element: Option<String>,
    /// Per-job load deadline in seconds, overriding the coordinator default
    pub timeout_seconds: Option<u64>,
    /// Viewport width override for this job
    pub browser_width: Option<u32>,
    /// Viewport height override for this job
    pub browser_height: Option<u32>,
}

impl RenderJob {
    /// A PDF job for `url` with default capture options
    pub fn pdf(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            render_type: RenderType::Pdf(PdfCaptureOptions::default()),
            ..Default::default()
        }
    }

    /// An image job for `url` with default capture options
    pub fn image(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            render_type: RenderType::Image(ImageCaptureOptions::default()),
            ..Default::default()
        }
    }

    /// The readiness strategy this job selects.
    ///
    /// Exactly one strategy is active. Precedence: a positive fixed delay
    /// beats wait-for-text beats target-element beats the DOM-ready
    /// default; empty strings count as unset.
    pub fn readiness_mode(&self) -> ReadinessMode<'_> {
        if self.delay_ms > 0 {
            return ReadinessMode::FixedDelay(self.delay_ms);
        }
        if let Some(text) = self.wait_for_text.as_deref() {
            if !text.is_empty() {
                return ReadinessMode::TextPoll(text);
            }
        }
        if let Some(id) = self.target_element.as_deref() {
            if !id.is_empty() {
                return ReadinessMode::TargetElementSize(id);
            }
        }
        ReadinessMode::DomReady
    }
}

impl Default for RenderJob {
    fn default() -> Self {
        Self {
            url: String::new(),
            render_type: RenderType::Pdf(PdfCaptureOptions::default()),
            delay_ms: 0,
            wait_for_text: None,
            target_element: None,
            timeout_seconds: None,
            browser_width: None,
            browser_height: None,
        }
    }
}

/// Artifact type to produce, with its capture options
#[derive(Debug, Clone)]
pub enum RenderType {
    /// Export the page as a PDF document
    Pdf(PdfCaptureOptions),
    /// Capture the page as a raster image
    Image(ImageCaptureOptions),
}

/// Capture options for PDF jobs
#[derive(Debug, Clone)]
pub struct PdfCaptureOptions {
    /// Page size: a named size (`"A4"`) or a `WIDTHxHEIGHT` micron pair
    /// (`"210x297"`), parsed with [`crate::host::PageSize::parse`] at
    /// capture time
    pub page_size: String,
    /// Remove `<link rel=stylesheet media=print>` elements before export
    pub remove_print_media: bool,
    /// Landscape orientation
    pub landscape: bool,
    /// Margin preset
    pub margins: MarginsType,
    /// Print CSS backgrounds
    pub print_background: bool,
}

impl Default for PdfCaptureOptions {
    fn default() -> Self {
        Self {
            page_size: "A4".to_string(),
            remove_print_media: false,
            landscape: false,
            margins: MarginsType::Default,
            print_background: true,
        }
    }
}

/// Encoding for image captures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    Png,
    Jpeg,
}

/// Capture options for image jobs
#[derive(Debug, Clone)]
pub struct ImageCaptureOptions {
    /// Output encoding
    pub format: ImageFormat,
    /// JPEG quality (0-100); ignored for PNG, defaults to 80 when unset
    pub quality: Option<u8>,
    /// Capture only this region instead of the whole viewport
    pub clipping_rect: Option<Rect>,
}

impl Default for ImageCaptureOptions {
    fn default() -> Self {
        Self {
            format: ImageFormat::Png,
            quality: None,
            clipping_rect: None,
        }
    }
}

/// The readiness strategy selected by a job's fields. See
/// [`RenderJob::readiness_mode`] for the precedence rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadinessMode<'a> {
    /// Wait a fixed number of milliseconds after load completion
    FixedDelay(u64),
    /// Poll find-in-page until the text appears
    TextPoll(&'a str),
    /// Measure the named element and resize the viewport to its box
    TargetElementSize(&'a str),
    /// Wait for the page's DOM-ready signal
    DomReady,
}
