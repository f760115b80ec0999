//! Output encoding: how the final image file is written.
//!
//! The format follows the output file's extension. JPEG output reuses the
//! source photo's compression quality so the captioned copy does not look
//! visibly worse (or balloon in size) next to the original. PNG output uses
//! a moderate zlib level: above 4 the files barely shrink while encoding
//! slows down a lot.

use image::ImageFormat;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Write options for the final image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputEncoding {
    /// JPEG at the given quality (1–100).
    Jpeg { quality: u8 },
    /// PNG at the given zlib compression level (0–9).
    Png { compression_level: u8 },
    /// Any other format: the image tool's defaults.
    Default,
}

impl OutputEncoding {
    /// Choose the encoding for `output` from its extension.
    pub fn for_path(output: &Path, quality: u8, png_compression_level: u8) -> Self {
        match ImageFormat::from_path(output) {
            Ok(ImageFormat::Jpeg) => OutputEncoding::Jpeg {
                quality: quality.clamp(1, 100),
            },
            Ok(ImageFormat::Png) => OutputEncoding::Png {
                compression_level: png_compression_level.min(9),
            },
            _ => OutputEncoding::Default,
        }
    }

    /// ImageMagick options applying this encoding.
    pub fn magick_args(&self) -> Vec<String> {
        match self {
            OutputEncoding::Jpeg { quality } => vec!["-quality".into(), quality.to_string()],
            OutputEncoding::Png { compression_level } => vec![
                "-define".into(),
                format!("png:compression-level={compression_level}"),
            ],
            OutputEncoding::Default => Vec::new(),
        }
    }
}
