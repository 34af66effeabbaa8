//! Capture dispatch: routing a ready page to the PDF or image strategy and
//! encoding the result.

use std::time::Duration;

use log::debug;
use tokio::time::sleep;

use crate::coordinator::{ArtifactFormat, RenderArtifact};
use crate::host::{PageHost, PageSize, PdfExportOptions};
use crate::job::{ImageCaptureOptions, ImageFormat, PdfCaptureOptions, RenderJob, RenderType};
use crate::readiness::{MATCH_SETTLE, RESIZE_SETTLE};
use crate::{Error, Result};

/// Settle delay after resizing the viewport for a plain or clipped capture
pub const VIEWPORT_SETTLE: Duration = Duration::from_millis(50);

/// JPEG quality used when the job leaves it unset
pub const DEFAULT_JPEG_QUALITY: u8 = 80;

/// Removes print-media stylesheet links so the PDF export renders with
/// screen styles. Awaited before export; a removal that raced the export
/// was the weak point of the fire-and-forget approach.
const STRIP_PRINT_MEDIA_SCRIPT: &str = r#"(function () {
  var links = document.querySelectorAll('link[rel="stylesheet"][media="print"]');
  for (var i = 0; i < links.length; i++) {
    links[i].parentNode.removeChild(links[i]);
  }
  return links.length;
})();"#;

/// Capture the (ready) page per the job's render type.
///
/// `viewport` is the job's effective browser size; `target_size` is the
/// size resolved by target-mode readiness, `None` in every other mode.
pub async fn capture(
    job: &RenderJob,
    host: &dyn PageHost,
    viewport: (u32, u32),
    target_size: Option<(u32, u32)>,
) -> Result<RenderArtifact> {
    match &job.render_type {
        RenderType::Pdf(options) => capture_pdf(host, options).await,
        RenderType::Image(options) => capture_image(host, options, viewport, target_size).await,
    }
}

async fn capture_pdf(host: &dyn PageHost, options: &PdfCaptureOptions) -> Result<RenderArtifact> {
    if options.remove_print_media {
        host.execute_script(STRIP_PRINT_MEDIA_SCRIPT).await?;
    }
    let export = PdfExportOptions {
        page_size: PageSize::parse(&options.page_size),
        landscape: options.landscape,
        margins_type: options.margins,
        print_background: options.print_background,
    };
    debug!("capture: exporting PDF with {:?}", export.page_size);
    let bytes = host
        .print_to_pdf(&export)
        .await
        .map_err(|e| Error::CaptureFailed(e.to_string()))?;
    Ok(RenderArtifact {
        format: ArtifactFormat::Pdf,
        bytes,
    })
}

/// Three mutually exclusive image modes, precedence target > clipping rect
/// > plain, each with its own resize and settle discipline.
async fn capture_image(
    host: &dyn PageHost,
    options: &ImageCaptureOptions,
    viewport: (u32, u32),
    target_size: Option<(u32, u32)>,
) -> Result<RenderArtifact> {
    let rect = if let Some(target) = target_size {
        let current = host.get_size().await?;
        if current == target {
            sleep(MATCH_SETTLE).await;
        } else {
            host.set_size(target.0, target.1).await?;
            sleep(RESIZE_SETTLE).await;
        }
        None
    } else if let Some(rect) = options.clipping_rect {
        // Grow the viewport by the rect origin so the clipped region is
        // captured at natural scale instead of stretched
        host.set_size(viewport.0 + rect.x, viewport.1 + rect.y).await?;
        sleep(VIEWPORT_SETTLE).await;
        Some(rect)
    } else {
        host.set_size(viewport.0, viewport.1).await?;
        sleep(VIEWPORT_SETTLE).await;
        None
    };

    let image = host
        .capture_page(rect)
        .await
        .map_err(|e| Error::CaptureFailed(e.to_string()))?;

    let (format, bytes) = match options.format {
        ImageFormat::Png => (
            ArtifactFormat::Png,
            image
                .to_png()
                .map_err(|e| Error::CaptureFailed(e.to_string()))?,
        ),
        ImageFormat::Jpeg => (
            ArtifactFormat::Jpeg,
            image
                .to_jpeg(options.quality.unwrap_or(DEFAULT_JPEG_QUALITY))
                .map_err(|e| Error::CaptureFailed(e.to_string()))?,
        ),
    };
    Ok(RenderArtifact { format, bytes })
}
