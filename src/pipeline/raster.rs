//! Rasterisation: cropped PDF page → PNG caption at a target DPI.
//!
//! ## Why match the photo's DPI?
//!
//! The caption is typeset at 12pt. Rendering it at the photo's own density
//! makes those 12 points the same physical size as the photo's content when
//! printed, whatever the photo's pixel count. The scale stage then only ever
//! has to shrink.
//!
//! The intermediate raster is lossless PNG on white; the output's own
//! encoding (JPEG quality and so on) is applied once, when the final file is
//! written.

use crate::error::PhotociteError;
use crate::pipeline::inspect::ImageInfo;
use crate::pipeline::scratch::Scratch;
use crate::pipeline::Stage;
use crate::tools::Toolchain;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const RASTER_FILE: &str = "caption.png";

/// A rasterised caption and its measured size.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptionRaster {
    pub path: PathBuf,
    pub width: u32,
    pub height: u32,
    pub dpi: u32,
}

/// Rasterise `page` at `dpi` into the scratch directory and measure it.
pub async fn rasterize_page(
    tools: &Toolchain,
    page: &Path,
    dpi: u32,
    scratch: &Scratch,
) -> Result<CaptionRaster, PhotociteError> {
    let out = scratch.file(RASTER_FILE);
    tools
        .images
        .rasterize(page, dpi, &out)
        .await
        .map_err(|f| PhotociteError::from_tool(Stage::Rasterize, f))?;

    let info = measure(tools, &out, Stage::Rasterize).await?;
    debug!(
        "Rasterised caption at {} DPI → {}x{} px",
        dpi, info.width, info.height
    );

    Ok(CaptionRaster {
        path: out,
        width: info.width,
        height: info.height,
        dpi,
    })
}

/// Identify a pipeline-produced image, mapping failures to `stage`.
pub(crate) async fn measure(
    tools: &Toolchain,
    image: &Path,
    stage: Stage,
) -> Result<ImageInfo, PhotociteError> {
    let info = tools
        .metadata
        .identify(image)
        .await
        .map_err(|f| PhotociteError::from_tool(stage, f))?;
    if info.width == 0 || info.height == 0 {
        return Err(PhotociteError::from_tool(
            stage,
            crate::error::ToolFailure::Unparseable {
                program: "identify".into(),
                detail: format!(
                    "'{}' measured {}x{} px",
                    image.display(),
                    info.width,
                    info.height
                ),
            },
        ));
    }
    Ok(info)
}
