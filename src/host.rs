//! The `PageHost` contract: the external capability that loads pages and
//! captures pixels/PDF bytes on behalf of a render job.
//!
//! The crate never creates or configures a host; it consumes one through
//! this trait. Hosts are expected to be Chromium-family embedders (an
//! Electron `BrowserWindow`, a CDP tab, a test double), but nothing here
//! depends on a particular backend.

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::oneshot;

use crate::Result;

/// Headers attached to every job's load instruction so a reused host never
/// serves a stale copy of the page.
pub const CACHE_BUSTING_HEADERS: [(&str, &str); 2] = [
    ("Cache-Control", "no-cache, no-store, must-revalidate"),
    ("Pragma", "no-cache"),
];

/// Name of the page-global function injected scripts call to report a value
/// back to the host process. Hosts wire this binding to the receiver handed
/// out by [`PageHost::subscribe_side_channel`].
pub const SIDE_CHANNEL_BINDING: &str = "__presshotReport";

/// Terminal lifecycle signal for a page load, delivered at most once per job.
///
/// Hosts coalesce their native `did-finish-load` / `did-fail-load` /
/// `crashed` events into the first of these; deadline expiry is synthesized
/// by the coordinator, not by the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadSignal {
    /// The page finished loading normally
    Finished,
    /// The host reported a load failure
    Failed(LoadFailure),
    /// The host's renderer process crashed
    Crashed,
}

/// Details of a host-reported load failure
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadFailure {
    /// Host error code (Chromium net error numbering, e.g. -3 = aborted)
    pub code: i32,
    /// Human-readable error description
    pub description: String,
    /// URL of the resource that failed
    pub url: String,
    /// Whether the failure concerned the main frame (sub-resource failures
    /// are typically ignorable)
    pub main_frame: bool,
}

/// Outcome of one find-in-page pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FindResult {
    /// Number of matches found so far
    pub matches: u32,
    /// Whether this is the final update of the search pass
    pub final_update: bool,
}

/// What to do with the selection when a find session is stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopFindAction {
    /// Clear the match selection
    ClearSelection,
    /// Keep the current selection highlighted
    KeepSelection,
}

/// A clipping rectangle in page coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// A PDF page size: either a named paper size passed through to the host
/// unchanged, or an explicit size in microns.
///
/// Serializes the way Chromium-family hosts expect it: a bare string for
/// named sizes, a `{width, height}` object for custom ones.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum PageSize {
    /// A named paper size such as `"A4"` or `"Letter"`
    Named(String),
    /// An explicit page size in microns
    Custom { width: u64, height: u64 },
}

impl PageSize {
    /// Parse a page-size string. Strings of the form `NxN` (both halves
    /// all-digits, e.g. `"210x297"`) become an explicit micron size; every
    /// other string passes through as a named size.
    pub fn parse(s: &str) -> Self {
        if let Some((w, h)) = s.split_once('x') {
            if let (Ok(width), Ok(height)) = (w.parse::<u64>(), h.parse::<u64>()) {
                return PageSize::Custom { width, height };
            }
        }
        PageSize::Named(s.to_string())
    }
}

/// Margin preset forwarded to the host's PDF export
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MarginsType {
    /// The host's default margins
    Default,
    /// No margins
    None,
    /// Minimum printable margins
    Minimum,
}

/// Resolved options handed to [`PageHost::print_to_pdf`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PdfExportOptions {
    /// Page size, already parsed from the job's page-size string
    pub page_size: PageSize,
    /// Landscape orientation
    pub landscape: bool,
    /// Margin preset
    pub margins_type: MarginsType,
    /// Whether to print CSS backgrounds
    pub print_background: bool,
}

/// A captured page image that can be encoded on demand
pub trait PageImage: Send {
    /// Encode the image as PNG
    fn to_png(&self) -> Result<Vec<u8>>;
    /// Encode the image as JPEG with the given quality (0-100)
    fn to_jpeg(&self, quality: u8) -> Result<Vec<u8>>;
}

/// The page-hosting capability a render job runs against.
///
/// Exactly one job runs per host at a time; the caller owns host pooling.
/// The two `subscribe_*` methods hand out one-shot receivers; a fresh
/// receiver must be taken per job, and the host must deliver each signal at
/// most once. Receivers the job drops without consuming must not leave the
/// host holding live listeners (oneshot senders make this structural).
#[async_trait]
pub trait PageHost: Send + Sync {
    /// Begin navigating to `url` with the given extra request headers.
    /// Lifecycle events are delivered through [`Self::subscribe_load`].
    async fn load(&self, url: &str, extra_headers: &[(&str, &str)]) -> Result<()>;

    /// Execute script in the loaded page's context and resolve with its
    /// completion value.
    async fn execute_script(&self, code: &str) -> Result<serde_json::Value>;

    /// Run one find-in-page pass for `text`, resolving with the final
    /// update of that pass.
    async fn find_in_page(&self, text: &str) -> Result<FindResult>;

    /// Stop an active find session
    async fn stop_find_in_page(&self, action: StopFindAction) -> Result<()>;

    /// Capture the page, or only `rect` when given
    async fn capture_page(&self, rect: Option<Rect>) -> Result<Box<dyn PageImage>>;

    /// Resize the host viewport
    async fn set_size(&self, width: u32, height: u32) -> Result<()>;

    /// Current viewport size as `(width, height)`
    async fn get_size(&self) -> Result<(u32, u32)>;

    /// Export the loaded page as PDF bytes
    async fn print_to_pdf(&self, options: &PdfExportOptions) -> Result<Vec<u8>>;

    /// Take the one-shot receiver for this job's terminal load signal.
    /// Must be called before [`Self::load`] so no signal can be missed.
    fn subscribe_load(&self) -> oneshot::Receiver<LoadSignal>;

    /// Take the one-shot receiver for the injected-script side channel
    /// (the page-side [`SIDE_CHANNEL_BINDING`] function). Must be called
    /// before the reporting script is injected.
    fn subscribe_side_channel(&self) -> oneshot::Receiver<serde_json::Value>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_page_size_parses_to_microns() {
        assert_eq!(
            PageSize::parse("800x600"),
            PageSize::Custom {
                width: 800,
                height: 600
            }
        );
        assert_eq!(
            PageSize::parse("210x297"),
            PageSize::Custom {
                width: 210,
                height: 297
            }
        );
    }

    #[test]
    fn named_page_size_passes_through() {
        assert_eq!(PageSize::parse("A4"), PageSize::Named("A4".to_string()));
        assert_eq!(
            PageSize::parse("Letter"),
            PageSize::Named("Letter".to_string())
        );
        // Not all-digits on both sides: still a name
        assert_eq!(
            PageSize::parse("800xwide"),
            PageSize::Named("800xwide".to_string())
        );
        assert_eq!(PageSize::parse("x600"), PageSize::Named("x600".to_string()));
    }

    #[test]
    fn page_size_serializes_in_host_shape() {
        let named = serde_json::to_value(PageSize::Named("A4".into())).unwrap();
        assert_eq!(named, serde_json::json!("A4"));

        let custom = serde_json::to_value(PageSize::Custom {
            width: 210,
            height: 297,
        })
        .unwrap();
        assert_eq!(custom, serde_json::json!({"width": 210, "height": 297}));
    }

    #[test]
    fn pdf_export_options_serialize_camel_case() {
        let opts = PdfExportOptions {
            page_size: PageSize::Named("A4".into()),
            landscape: false,
            margins_type: MarginsType::None,
            print_background: true,
        };
        let v = serde_json::to_value(&opts).unwrap();
        assert_eq!(v["pageSize"], serde_json::json!("A4"));
        assert_eq!(v["marginsType"], serde_json::json!("none"));
        assert_eq!(v["printBackground"], serde_json::json!(true));
    }
}
