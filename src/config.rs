//! Configuration types for citation composition.
//!
//! Every policy number of the pipeline (fallback densities, crop margin, gap,
//! caption width ratios, encoder settings, timeouts) lives in
//! [`ComposeConfig`], built via its [`ComposeConfigBuilder`]. None of them is
//! hard-coded in a stage, so a caller can pin or tune any of them and tests
//! can assert the defaults.

use crate::error::PhotociteError;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Highest rasterisation density accepted anywhere, in pixels per inch.
pub const MAX_DPI: u32 = 2400;

/// Configuration for a composition run.
///
/// Built via [`ComposeConfig::builder()`] or using
/// [`ComposeConfig::default()`].
///
/// # Example
/// ```rust
/// use photocite::ComposeConfig;
///
/// let config = ComposeConfig::builder()
///     .caption_gap(8)
///     .tool_timeout_secs(60)
///     .build()
///     .unwrap();
/// assert_eq!(config.crop_margin, 20);
/// ```
#[derive(Clone)]
pub struct ComposeConfig {
    /// DPI assumed for a source image that records no density. Default: 300.
    pub fallback_dpi: u32,

    /// DPI used to rasterise the caption in citation-only mode. Default: 72.
    ///
    /// There is no photo to match, so the caption is sized for screens.
    pub citation_only_dpi: u32,

    /// JPEG quality used when the source quality is unknown. Default: 92.
    pub default_quality: u8,

    /// Margin kept around the cropped caption, in PostScript points. Default: 20.
    pub crop_margin: u32,

    /// White gap between the photo and the caption, in pixels. Default: 0.
    pub caption_gap: u32,

    /// Caption width limit as a fraction of a landscape photo's width. Default: 0.5.
    ///
    /// A wide photo leaves a lot of horizontal room; a caption spanning all of
    /// it would be read as a banner, not a credit line.
    pub landscape_width_ratio: f64,

    /// Caption width limit as a fraction of a portrait (or square) photo's width. Default: 0.8.
    pub portrait_width_ratio: f64,

    /// Width limit for the caption in citation-only mode. Default: none.
    pub max_caption_width: Option<u32>,

    /// zlib level for PNG output (0–9). Default: 4.
    pub png_compression_level: u8,

    /// Upper bound on each external program call, in seconds. Default: 120.
    pub tool_timeout_secs: u64,

    /// External program names or paths.
    pub tools: ToolPaths,

    /// Leave the scratch directory on disk after the run. Default: false.
    pub keep_scratch: bool,

    /// Directory in which scratch directories are created. Default: system temp.
    pub scratch_root: Option<PathBuf>,

    /// Per-stage progress events. Default: none.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ComposeConfig {
    fn default() -> Self {
        Self {
            fallback_dpi: 300,
            citation_only_dpi: 72,
            default_quality: 92,
            crop_margin: 20,
            caption_gap: 0,
            landscape_width_ratio: 0.5,
            portrait_width_ratio: 0.8,
            max_caption_width: None,
            png_compression_level: 4,
            tool_timeout_secs: 120,
            tools: ToolPaths::default(),
            keep_scratch: false,
            scratch_root: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ComposeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComposeConfig")
            .field("fallback_dpi", &self.fallback_dpi)
            .field("citation_only_dpi", &self.citation_only_dpi)
            .field("default_quality", &self.default_quality)
            .field("crop_margin", &self.crop_margin)
            .field("caption_gap", &self.caption_gap)
            .field("landscape_width_ratio", &self.landscape_width_ratio)
            .field("portrait_width_ratio", &self.portrait_width_ratio)
            .field("max_caption_width", &self.max_caption_width)
            .field("png_compression_level", &self.png_compression_level)
            .field("tool_timeout_secs", &self.tool_timeout_secs)
            .field("tools", &self.tools)
            .field("keep_scratch", &self.keep_scratch)
            .field("scratch_root", &self.scratch_root)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn ComposeProgressCallback>"),
            )
            .finish()
    }
}

impl ComposeConfig {
    /// Create a new builder for `ComposeConfig`.
    pub fn builder() -> ComposeConfigBuilder {
        ComposeConfigBuilder {
            config: Self::default(),
        }
    }

    /// Caption width ratio for a photo of the given orientation.
    pub fn width_ratio(&self, landscape: bool) -> f64 {
        if landscape {
            self.landscape_width_ratio
        } else {
            self.portrait_width_ratio
        }
    }
}

/// Names (looked up on `PATH`) or paths of the external programs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolPaths {
    pub magick: PathBuf,
    pub pandoc: PathBuf,
    pub xelatex: PathBuf,
    pub pdfcrop: PathBuf,
}

impl Default for ToolPaths {
    fn default() -> Self {
        Self {
            magick: PathBuf::from("magick"),
            pandoc: PathBuf::from("pandoc"),
            xelatex: PathBuf::from("xelatex"),
            pdfcrop: PathBuf::from("pdfcrop"),
        }
    }
}

/// Builder for [`ComposeConfig`].
#[derive(Debug)]
pub struct ComposeConfigBuilder {
    config: ComposeConfig,
}

impl ComposeConfigBuilder {
    pub fn fallback_dpi(mut self, dpi: u32) -> Self {
        self.config.fallback_dpi = dpi.clamp(1, MAX_DPI);
        self
    }

    pub fn citation_only_dpi(mut self, dpi: u32) -> Self {
        self.config.citation_only_dpi = dpi.clamp(1, MAX_DPI);
        self
    }

    pub fn default_quality(mut self, quality: u8) -> Self {
        self.config.default_quality = quality.clamp(1, 100);
        self
    }

    pub fn crop_margin(mut self, points: u32) -> Self {
        self.config.crop_margin = points;
        self
    }

    pub fn caption_gap(mut self, px: u32) -> Self {
        self.config.caption_gap = px;
        self
    }

    pub fn landscape_width_ratio(mut self, ratio: f64) -> Self {
        self.config.landscape_width_ratio = ratio;
        self
    }

    pub fn portrait_width_ratio(mut self, ratio: f64) -> Self {
        self.config.portrait_width_ratio = ratio;
        self
    }

    pub fn max_caption_width(mut self, px: u32) -> Self {
        self.config.max_caption_width = Some(px.max(1));
        self
    }

    pub fn png_compression_level(mut self, level: u8) -> Self {
        self.config.png_compression_level = level.min(9);
        self
    }

    pub fn tool_timeout_secs(mut self, secs: u64) -> Self {
        self.config.tool_timeout_secs = secs;
        self
    }

    pub fn tools(mut self, tools: ToolPaths) -> Self {
        self.config.tools = tools;
        self
    }

    pub fn keep_scratch(mut self, keep: bool) -> Self {
        self.config.keep_scratch = keep;
        self
    }

    pub fn scratch_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.config.scratch_root = Some(root.into());
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ComposeConfig, PhotociteError> {
        let c = &self.config;
        for (name, ratio) in [
            ("landscape width ratio", c.landscape_width_ratio),
            ("portrait width ratio", c.portrait_width_ratio),
        ] {
            if !(ratio > 0.0 && ratio <= 1.0) {
                return Err(PhotociteError::InvalidConfig(format!(
                    "{name} must be in (0, 1], got {ratio}"
                )));
            }
        }
        if c.tool_timeout_secs == 0 {
            return Err(PhotociteError::InvalidConfig(
                "Tool timeout must be ≥ 1 second".into(),
            ));
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_pinned() {
        let c = ComposeConfig::default();
        assert_eq!(c.fallback_dpi, 300);
        assert_eq!(c.citation_only_dpi, 72);
        assert_eq!(c.default_quality, 92);
        assert_eq!(c.crop_margin, 20);
        assert_eq!(c.caption_gap, 0);
        assert_eq!(c.landscape_width_ratio, 0.5);
        assert_eq!(c.portrait_width_ratio, 0.8);
        assert_eq!(c.max_caption_width, None);
        assert_eq!(c.png_compression_level, 4);
        assert_eq!(c.tool_timeout_secs, 120);
        assert_eq!(c.tools.magick, PathBuf::from("magick"));
        assert!(!c.keep_scratch);
    }

    #[test]
    fn builder_clamps() {
        let c = ComposeConfig::builder()
            .fallback_dpi(0)
            .default_quality(200)
            .png_compression_level(12)
            .max_caption_width(0)
            .build()
            .unwrap();
        assert_eq!(c.fallback_dpi, 1);
        assert_eq!(c.default_quality, 100);
        assert_eq!(c.png_compression_level, 9);
        assert_eq!(c.max_caption_width, Some(1));
    }

    #[test]
    fn build_rejects_bad_ratio() {
        let err = ComposeConfig::builder()
            .landscape_width_ratio(1.5)
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("landscape"));

        assert!(ComposeConfig::builder()
            .portrait_width_ratio(0.0)
            .build()
            .is_err());
        assert!(ComposeConfig::builder()
            .portrait_width_ratio(f64::NAN)
            .build()
            .is_err());
    }

    #[test]
    fn build_rejects_zero_timeout() {
        assert!(ComposeConfig::builder()
            .tool_timeout_secs(0)
            .build()
            .is_err());
    }

    #[test]
    fn width_ratio_by_orientation() {
        let c = ComposeConfig::default();
        assert_eq!(c.width_ratio(true), 0.5);
        assert_eq!(c.width_ratio(false), 0.8);
    }

    #[test]
    fn debug_hides_callback() {
        let s = format!("{:?}", ComposeConfig::default());
        assert!(s.contains("crop_margin: 20"));
    }
}
