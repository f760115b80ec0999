//! Caption scaling: shrink to the width limit, never enlarge.
//!
//! The width limit is a fraction of the photo's width (half for landscape
//! photos, 80 % for portrait ones by default). A caption that is already
//! narrower is passed through untouched, which also makes the stage
//! idempotent: scaling an already scaled caption changes nothing.
//!
//! All size arithmetic is integer: the scaled width is the limit itself, and
//! the height is rounded half-up from `height × limit / width`.

use crate::error::PhotociteError;
use crate::output::CaptionMetrics;
use crate::pipeline::raster::{measure, CaptionRaster};
use crate::pipeline::scratch::Scratch;
use crate::pipeline::Stage;
use crate::tools::Toolchain;
use std::path::PathBuf;
use tracing::debug;

pub const SCALED_FILE: &str = "caption-scaled.png";

/// Width limit for a caption under a photo `source_width` px wide.
///
/// Always in `1..=source_width` (for a non-zero source width).
pub fn caption_width_limit(source_width: u32, ratio: f64) -> u32 {
    let ratio = if ratio.is_finite() {
        ratio.clamp(0.0, 1.0)
    } else {
        1.0
    };
    let limit = (f64::from(source_width) * ratio).floor() as u32;
    limit.clamp(1, source_width.max(1))
}

/// `min(1, limit / width)`.
pub fn scale_factor(width: u32, limit: u32) -> f64 {
    if width <= limit || width == 0 {
        1.0
    } else {
        f64::from(limit) / f64::from(width)
    }
}

/// Size of a `width`×`height` caption after scaling to `limit`.
pub fn scaled_size(width: u32, height: u32, limit: Option<u32>) -> (u32, u32) {
    match limit {
        Some(limit) if width > limit && width > 0 => {
            let limit = limit.max(1);
            let (w, h, l) = (u64::from(width), u64::from(height), u64::from(limit));
            let scaled_h = ((h * l + w / 2) / w).max(1);
            (limit, scaled_h as u32)
        }
        _ => (width, height),
    }
}

/// A caption ready to be appended or emitted.
#[derive(Debug, Clone, PartialEq)]
pub struct ScaledCaption {
    pub path: PathBuf,
    pub metrics: CaptionMetrics,
}

/// Scale `raster` down to `limit` (if any).
pub async fn scale_caption(
    tools: &Toolchain,
    raster: &CaptionRaster,
    limit: Option<u32>,
    scratch: &Scratch,
) -> Result<ScaledCaption, PhotociteError> {
    let (width, height) = scaled_size(raster.width, raster.height, limit);
    let scale = limit.map_or(1.0, |l| scale_factor(raster.width, l));

    let metrics = CaptionMetrics {
        raster_width: raster.width,
        raster_height: raster.height,
        width,
        height,
        scale,
        width_limit: limit,
        dpi: raster.dpi,
    };

    if (width, height) == (raster.width, raster.height) {
        debug!(
            "Caption {}x{} fits within {:?}; not resized",
            width, height, limit
        );
        return Ok(ScaledCaption {
            path: raster.path.clone(),
            metrics,
        });
    }

    let out = scratch.file(SCALED_FILE);
    tools
        .images
        .resize(&raster.path, width, height, raster.dpi, &out)
        .await
        .map_err(|f| PhotociteError::from_tool(Stage::Scale, f))?;

    let info = measure(tools, &out, Stage::Scale).await?;
    if info.width > width {
        return Err(PhotociteError::Scale {
            detail: format!(
                "resized caption is {} px wide, expected at most {width}",
                info.width
            ),
        });
    }

    debug!(
        "Scaled caption {}x{} → {}x{} (×{:.4})",
        raster.width, raster.height, info.width, info.height, scale
    );

    Ok(ScaledCaption {
        path: out,
        metrics: CaptionMetrics {
            width: info.width,
            height: info.height,
            ..metrics
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limit_by_ratio() {
        assert_eq!(caption_width_limit(3000, 0.5), 1500);
        assert_eq!(caption_width_limit(2000, 0.8), 1600);
        assert_eq!(caption_width_limit(999, 0.5), 499);
        assert_eq!(caption_width_limit(1, 0.5), 1);
        assert_eq!(caption_width_limit(800, 1.0), 800);
        assert_eq!(caption_width_limit(800, f64::NAN), 800);
    }

    #[test]
    fn never_upscales() {
        assert_eq!(scaled_size(1200, 300, Some(1500)), (1200, 300));
        assert_eq!(scaled_size(1500, 300, Some(1500)), (1500, 300));
        assert_eq!(scale_factor(1200, 1500), 1.0);
    }

    #[test]
    fn downscales_to_exact_limit() {
        // 300 × 1500 / 2400 = 187.5 → 188
        assert_eq!(scaled_size(2400, 300, Some(1500)), (1500, 188));
        assert_eq!(scale_factor(2400, 1500), 0.625);
        assert_eq!(scaled_size(2550, 75, Some(1600)), (1600, 47));
    }

    #[test]
    fn height_never_zero() {
        assert_eq!(scaled_size(10_000, 1, Some(10)), (10, 1));
    }

    #[test]
    fn no_limit_is_identity() {
        assert_eq!(scaled_size(612, 90, None), (612, 90));
    }

    #[test]
    fn width_bound_and_idempotent_over_many_sizes() {
        for width in [1u32, 2, 7, 99, 100, 101, 640, 2550, 3001, 12_345] {
            for height in [1u32, 3, 50, 299, 1000] {
                for limit in [1u32, 2, 50, 100, 640, 1500, 4000] {
                    let (w, h) = scaled_size(width, height, Some(limit));
                    assert!(w <= limit, "{width}x{height} @ {limit}");
                    assert!(h >= 1);
                    if width <= limit {
                        assert_eq!((w, h), (width, height));
                    } else {
                        assert_eq!(w, limit);
                    }
                    assert_eq!(scaled_size(w, h, Some(limit)), (w, h));
                }
            }
        }
    }
}
