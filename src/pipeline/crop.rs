//! Bounding-box crop of the typeset page.
//!
//! The rendered page is a full sheet with a few lines of text at the top.
//! Cropping it to the text plus a fixed margin gives the caption its final
//! proportions before it is rasterised.

use crate::error::PhotociteError;
use crate::pipeline::scratch::Scratch;
use crate::pipeline::Stage;
use crate::tools::Toolchain;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const CROPPED_FILE: &str = "cropped.pdf";

/// Crop `page` to its content with `margin` points on each side.
///
/// # Errors
/// [`PhotociteError::Crop`] when the page is blank or missing (an empty
/// citation) or the cropper fails.
pub async fn crop_page(
    tools: &Toolchain,
    page: &Path,
    margin: u32,
    scratch: &Scratch,
) -> Result<PathBuf, PhotociteError> {
    if !page.is_file() {
        return Err(PhotociteError::Crop {
            detail: format!(
                "the typeset citation has no page at '{}' (is the citation blank?)",
                page.display()
            ),
        });
    }

    let out = scratch.file(CROPPED_FILE);
    let report = tools
        .cropper
        .crop(page, margin, &out)
        .await
        .map_err(|f| PhotociteError::from_tool(Stage::Crop, f))?;

    if report.empty {
        return Err(PhotociteError::Crop {
            detail: "the typeset citation has no visible content (is the citation blank?)"
                .into(),
        });
    }
    if !out.is_file() {
        return Err(PhotociteError::Crop {
            detail: "cropper produced no output page".into(),
        });
    }

    debug!("Cropped page with {margin}pt margin: {}", out.display());
    Ok(out)
}
