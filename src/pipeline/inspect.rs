//! Image inspection: size, density and JPEG quality of the source photo.
//!
//! The caption is rasterised at the photo's own DPI so that its text has the
//! same physical size whatever the photo's pixel count, and a JPEG output is
//! written back at the photo's own quality. Both numbers come from here.
//!
//! A probe reports what the file *carries* ([`ImageInfo`], DPI and quality
//! optional); [`resolve_source`] applies the configured fallbacks to turn it
//! into a [`SourceImage`] whose DPI is always within `1..=MAX_DPI`.

use crate::config::{ComposeConfig, MAX_DPI};
use crate::error::{PhotociteError, ToolFailure};
use crate::pipeline::Stage;
use crate::tools::Toolchain;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// `magick identify -format` string understood by [`parse_identify`].
pub const IDENTIFY_FORMAT: &str = "%w|%h|%x|%y|%U|%m|%Q\n";

/// Raw probe result.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageInfo {
    pub width: u32,
    pub height: u32,
    /// Horizontal density in pixels per inch, when the file records one.
    pub dpi_x: Option<f64>,
    /// Vertical density in pixels per inch, when the file records one.
    pub dpi_y: Option<f64>,
    /// Format name as the probe reports it, e.g. `JPEG`, `PNG`.
    pub format: String,
    /// JPEG compression quality (1–100). `None` for every other format.
    pub quality: Option<u8>,
}

/// The source photo with every measurement resolved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceImage {
    pub path: PathBuf,
    pub width: u32,
    pub height: u32,
    pub dpi_x: f64,
    pub dpi_y: f64,
    pub format: String,
    pub quality: Option<u8>,
}

impl SourceImage {
    /// Density used to rasterise the caption (horizontal DPI, rounded).
    pub fn density(&self) -> u32 {
        self.dpi_x.round().clamp(1.0, f64::from(MAX_DPI)) as u32
    }

    pub fn is_landscape(&self) -> bool {
        self.width > self.height
    }
}

/// Probe `path` and resolve its measurements.
///
/// # Errors
/// [`PhotociteError::ImageRead`] when the file is missing, unreadable or not
/// something the metadata reader understands; `ToolNotFound`/`Timeout` pass
/// through unchanged.
pub async fn inspect_image(
    tools: &Toolchain,
    path: &Path,
    config: &ComposeConfig,
) -> Result<SourceImage, PhotociteError> {
    check_readable(path)?;

    let info = tools
        .metadata
        .identify(path)
        .await
        .map_err(|failure| image_read_error(path, failure))?;

    let source = resolve_source(path, info, config.fallback_dpi)?;
    debug!(
        "Source {}: {}x{} px, {:.0}x{:.0} DPI, format {}, quality {:?}",
        path.display(),
        source.width,
        source.height,
        source.dpi_x,
        source.dpi_y,
        source.format,
        source.quality
    );
    Ok(source)
}

fn check_readable(path: &Path) -> Result<(), PhotociteError> {
    match std::fs::File::open(path) {
        Ok(_) if path.is_dir() => Err(PhotociteError::ImageRead {
            path: path.to_path_buf(),
            detail: "is a directory".into(),
        }),
        Ok(_) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(PhotociteError::ImageRead {
            path: path.to_path_buf(),
            detail: "file not found".into(),
        }),
        Err(e) => Err(PhotociteError::ImageRead {
            path: path.to_path_buf(),
            detail: e.to_string(),
        }),
    }
}

fn image_read_error(path: &Path, failure: ToolFailure) -> PhotociteError {
    match failure {
        ToolFailure::NotFound { .. } | ToolFailure::TimedOut { .. } => {
            PhotociteError::from_tool(Stage::Inspect, failure)
        }
        other => PhotociteError::ImageRead {
            path: path.to_path_buf(),
            detail: other.to_string(),
        },
    }
}

/// Apply DPI fallbacks and validate dimensions.
pub fn resolve_source(
    path: &Path,
    info: ImageInfo,
    fallback_dpi: u32,
) -> Result<SourceImage, PhotociteError> {
    if info.width == 0 || info.height == 0 {
        return Err(PhotociteError::ImageRead {
            path: path.to_path_buf(),
            detail: format!("reported size {}x{}", info.width, info.height),
        });
    }

    let fallback = f64::from(fallback_dpi.clamp(1, MAX_DPI));
    let plausible = |dpi: Option<f64>| {
        dpi.filter(|d| {
            let ok = (1.0..=f64::from(MAX_DPI)).contains(d);
            if !ok {
                warn!(
                    "Ignoring implausible density {d} DPI in {}",
                    path.display()
                );
            }
            ok
        })
    };
    let (dpi_x, dpi_y) = match (plausible(info.dpi_x), plausible(info.dpi_y)) {
        (Some(x), Some(y)) => (x, y),
        (Some(x), None) => (x, x),
        (None, Some(y)) => (y, y),
        (None, None) => {
            warn!(
                "No density recorded in {}; using {} DPI",
                path.display(),
                fallback_dpi
            );
            (fallback, fallback)
        }
    };

    Ok(SourceImage {
        path: path.to_path_buf(),
        width: info.width,
        height: info.height,
        dpi_x,
        dpi_y,
        format: info.format,
        quality: info.quality,
    })
}

static RE_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*([0-9]+(?:\.[0-9]+)?)").unwrap());

/// Parse one line of `magick identify -format IDENTIFY_FORMAT` output.
///
/// Fields: width, height, x resolution, y resolution, units, format, quality.
/// Resolutions may carry a unit suffix (`300 PixelsPerInch`); a
/// `PixelsPerCentimeter` density is converted to inches, and `Undefined`
/// units mean the file records no density at all.
pub fn parse_identify(output: &str) -> Result<ImageInfo, String> {
    let line = output
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .ok_or_else(|| "empty identify output".to_string())?;

    let fields: Vec<&str> = line.split('|').map(str::trim).collect();
    if fields.len() != 7 {
        return Err(format!("expected 7 fields, got {}: {line:?}", fields.len()));
    }

    let width: u32 = fields[0]
        .parse()
        .map_err(|_| format!("bad width {:?}", fields[0]))?;
    let height: u32 = fields[1]
        .parse()
        .map_err(|_| format!("bad height {:?}", fields[1]))?;

    let units = fields[4];
    let per_inch = |raw: &str| -> Option<f64> {
        let value: f64 = RE_NUMBER.captures(raw)?.get(1)?.as_str().parse().ok()?;
        if value <= 0.0 {
            return None;
        }
        let unit_hint = format!("{units} {raw}");
        if unit_hint.contains("PixelsPerCentimeter") {
            Some(value * 2.54)
        } else if units.eq_ignore_ascii_case("Undefined") {
            None
        } else {
            Some(value)
        }
    };
    let dpi_x = per_inch(fields[2]);
    let dpi_y = per_inch(fields[3]);

    let format = fields[5].to_ascii_uppercase();
    let quality = if is_jpeg(&format) {
        fields[6]
            .parse::<u32>()
            .ok()
            .filter(|q| (1..=100).contains(q))
            .map(|q| q as u8)
    } else {
        None
    };

    Ok(ImageInfo {
        width,
        height,
        dpi_x,
        dpi_y,
        format,
        quality,
    })
}

fn is_jpeg(format: &str) -> bool {
    matches!(format, "JPEG" | "JPG" | "PJPEG")
}
