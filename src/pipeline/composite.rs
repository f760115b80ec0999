//! Final assembly: append the caption under the photo, or emit it alone.
//!
//! The caption is centred under the photo on a white background. Output
//! width is the wider of the two inputs (always the photo, since the caption
//! was scaled to fit) and output height is the sum of both plus the optional
//! gap.
//!
//! The image tool writes to a hidden sibling of the output path first and
//! the file is renamed into place only after it is complete and measured, so
//! an interrupted or failed run never leaves a truncated image under the
//! name the user asked for.

use crate::error::PhotociteError;
use crate::pipeline::encode::OutputEncoding;
use crate::pipeline::inspect::SourceImage;
use crate::pipeline::raster::measure;
use crate::pipeline::scale::ScaledCaption;
use crate::pipeline::scratch::Scratch;
use crate::pipeline::Stage;
use crate::tools::Toolchain;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// The finished output file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinalImage {
    pub path: PathBuf,
    pub width: u32,
    pub height: u32,
}

/// Expected size of `source` with `caption` appended `gap` px below it.
///
/// Saturates at `u32::MAX` rather than wrapping.
pub fn composite_size(source: (u32, u32), caption: (u32, u32), gap: u32) -> (u32, u32) {
    let height = source.1.saturating_add(gap).saturating_add(caption.1);
    (source.0.max(caption.0), height)
}

/// Hidden sibling path the output is written to before the final rename.
///
/// Keeps the extension so the image tool still infers the format from it.
pub fn partial_path(output: &Path) -> PathBuf {
    let stem = output
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "output".into());
    let name = match output.extension() {
        Some(ext) => format!(".{stem}.partial.{}", ext.to_string_lossy()),
        None => format!(".{stem}.partial"),
    };
    output.with_file_name(name)
}

/// Append `caption` beneath `source`, writing `output`.
pub async fn composite(
    tools: &Toolchain,
    source: &SourceImage,
    caption: &ScaledCaption,
    gap: u32,
    encoding: &OutputEncoding,
    output: &Path,
    scratch: &mut Scratch,
) -> Result<FinalImage, PhotociteError> {
    let partial = begin_output(output, scratch, Stage::Composite)?;

    tools
        .images
        .append(&source.path, &caption.path, gap, encoding, &partial)
        .await
        .map_err(|f| PhotociteError::from_tool(Stage::Composite, f))?;

    let expected = composite_size(
        (source.width, source.height),
        (caption.metrics.width, caption.metrics.height),
        gap,
    );
    finish_output(tools, &partial, output, Some(expected), Stage::Composite, scratch).await
}

/// Write `caption` alone to `output` (citation-only mode).
pub async fn emit(
    tools: &Toolchain,
    caption: &ScaledCaption,
    encoding: &OutputEncoding,
    output: &Path,
    scratch: &mut Scratch,
) -> Result<FinalImage, PhotociteError> {
    let partial = begin_output(output, scratch, Stage::Emit)?;

    tools
        .images
        .encode(&caption.path, encoding, &partial)
        .await
        .map_err(|f| PhotociteError::from_tool(Stage::Emit, f))?;

    let expected = (caption.metrics.width, caption.metrics.height);
    finish_output(tools, &partial, output, Some(expected), Stage::Emit, scratch).await
}

fn begin_output(
    output: &Path,
    scratch: &mut Scratch,
    stage: Stage,
) -> Result<PathBuf, PhotociteError> {
    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| PhotociteError::OutputWriteFailed {
            stage,
            path: output.to_path_buf(),
            source: e,
        })?;
    }
    let partial = partial_path(output);
    scratch.track(&partial);
    debug!("{stage}: writing {}", partial.display());
    Ok(partial)
}

async fn finish_output(
    tools: &Toolchain,
    partial: &Path,
    output: &Path,
    expected: Option<(u32, u32)>,
    stage: Stage,
    scratch: &mut Scratch,
) -> Result<FinalImage, PhotociteError> {
    let info = measure(tools, partial, stage).await?;
    if let Some((w, h)) = expected {
        if (info.width, info.height) != (w, h) {
            warn!(
                "{stage}: output measured {}x{}, expected {}x{}",
                info.width, info.height, w, h
            );
        }
    }

    tokio::fs::rename(partial, output)
        .await
        .map_err(|e| PhotociteError::OutputWriteFailed {
            stage,
            path: output.to_path_buf(),
            source: e,
        })?;
    scratch.untrack(partial);

    Ok(FinalImage {
        path: output.to_path_buf(),
        width: info.width,
        height: info.height,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn size_is_sum_of_heights_and_max_width() {
        assert_eq!(composite_size((3000, 2000), (1500, 188), 0), (3000, 2188));
        assert_eq!(composite_size((3000, 2000), (1500, 188), 12), (3000, 2200));
        assert_eq!(composite_size((400, 300), (500, 50), 0), (500, 350));
    }

    #[test]
    fn huge_gap_saturates_instead_of_wrapping() {
        assert_eq!(
            composite_size((3000, 2000), (1500, 188), u32::MAX),
            (3000, u32::MAX)
        );
        assert_eq!(
            composite_size((10, u32::MAX - 5), (10, 10), 0),
            (10, u32::MAX)
        );
    }

    #[test]
    fn partial_path_keeps_extension_and_directory() {
        assert_eq!(
            partial_path(Path::new("out/crane_cite.jpg")),
            PathBuf::from("out/.crane_cite.partial.jpg")
        );
        assert_eq!(
            partial_path(Path::new("crane with citation.png")),
            PathBuf::from(".crane with citation.partial.png")
        );
        assert_eq!(
            partial_path(Path::new("caption")),
            PathBuf::from(".caption.partial")
        );
    }
}
