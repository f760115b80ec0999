//! External programs behind the pipeline, one capability trait each.
//!
//! The pipeline never builds a command line itself. It talks to these traits,
//! and [`Toolchain::system`] wires them to the real programs:
//!
//! | Trait | Program | Used by |
//! |-------|---------|---------|
//! | [`MetadataReader`] | `magick identify` | inspect, scale |
//! | [`Converter`]      | `pandoc`          | render |
//! | [`Typesetter`]     | `xelatex`         | render |
//! | [`Cropper`]        | `pdfcrop`         | crop |
//! | [`ImageProcessor`] | `magick`          | raster, scale, composite |
//!
//! Trait methods return [`BoxFuture`]s so the traits stay object-safe and a
//! test can hand the orchestrator a `Toolchain` of in-memory fakes.

pub mod command;
pub mod magick;
pub mod pandoc;
pub mod pdfcrop;
pub mod xelatex;

use crate::config::ComposeConfig;
use crate::error::{PhotociteError, ToolFailure};
use crate::pipeline::encode::OutputEncoding;
use crate::pipeline::inspect::ImageInfo;
use futures::future::BoxFuture;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

pub use command::{locate_program, ToolCommand, ToolOutput};
pub use magick::Magick;
pub use pandoc::Pandoc;
pub use pdfcrop::PdfCrop;
pub use xelatex::XeLatex;

pub type ToolResult<T> = Result<T, ToolFailure>;

/// One of the programs photocite drives, independent of its install path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExternalTool {
    Magick,
    Pandoc,
    XeLatex,
    PdfCrop,
}

impl ExternalTool {
    /// Command-line flag that overrides the program's path.
    pub fn flag(self) -> &'static str {
        match self {
            ExternalTool::Magick => "--magick",
            ExternalTool::Pandoc => "--pandoc",
            ExternalTool::XeLatex => "--xelatex",
            ExternalTool::PdfCrop => "--pdfcrop",
        }
    }

    /// Distribution that ships the program.
    pub fn package(self) -> &'static str {
        match self {
            ExternalTool::Magick => "ImageMagick 7 (https://imagemagick.org)",
            ExternalTool::Pandoc => "Pandoc (https://pandoc.org)",
            ExternalTool::XeLatex | ExternalTool::PdfCrop => "a TeX distribution such as TeX Live",
        }
    }
}

/// Reads pixel dimensions, density and compression quality of a raster image.
pub trait MetadataReader: Send + Sync {
    /// Check the backing program exists. Called before any scratch file is made.
    fn ensure_available(&self) -> ToolResult<()> {
        Ok(())
    }

    fn identify<'a>(&'a self, image: &'a Path) -> BoxFuture<'a, ToolResult<ImageInfo>>;
}

/// Converts Markdown into a standalone LaTeX document using a template.
pub trait Converter: Send + Sync {
    fn ensure_available(&self) -> ToolResult<()> {
        Ok(())
    }

    fn to_typeset_source<'a>(
        &'a self,
        markup: &'a Path,
        template: &'a Path,
        out: &'a Path,
    ) -> BoxFuture<'a, ToolResult<()>>;
}

/// Compiles a LaTeX document into a PDF page.
pub trait Typesetter: Send + Sync {
    fn ensure_available(&self) -> ToolResult<()> {
        Ok(())
    }

    /// Compile `source`, writing into `out_dir`; returns the PDF path.
    fn compile<'a>(&'a self, source: &'a Path, out_dir: &'a Path)
        -> BoxFuture<'a, ToolResult<PathBuf>>;
}

/// Outcome of a bounding-box crop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CropReport {
    /// The page had no visible content; the output (if any) is meaningless.
    pub empty: bool,
}

/// Trims a PDF page to its content bounding box plus a margin.
pub trait Cropper: Send + Sync {
    fn ensure_available(&self) -> ToolResult<()> {
        Ok(())
    }

    /// `margin` is in PostScript points on every side.
    fn crop<'a>(
        &'a self,
        page: &'a Path,
        margin: u32,
        out: &'a Path,
    ) -> BoxFuture<'a, ToolResult<CropReport>>;
}

/// Raster operations: rasterise, resize, append and re-encode.
pub trait ImageProcessor: Send + Sync {
    fn ensure_available(&self) -> ToolResult<()> {
        Ok(())
    }

    /// Rasterise the first page of `page` at `dpi` onto a white background.
    fn rasterize<'a>(&'a self, page: &'a Path, dpi: u32, out: &'a Path)
        -> BoxFuture<'a, ToolResult<()>>;

    /// Resize `input` to exactly `width`×`height`, tagging it with `dpi`.
    fn resize<'a>(
        &'a self,
        input: &'a Path,
        width: u32,
        height: u32,
        dpi: u32,
        out: &'a Path,
    ) -> BoxFuture<'a, ToolResult<()>>;

    /// Stack `bottom` under `top` (centred, white fill, `gap` px between).
    fn append<'a>(
        &'a self,
        top: &'a Path,
        bottom: &'a Path,
        gap: u32,
        encoding: &'a OutputEncoding,
        out: &'a Path,
    ) -> BoxFuture<'a, ToolResult<()>>;

    /// Re-encode `input` into `out` with the given encoding options.
    fn encode<'a>(
        &'a self,
        input: &'a Path,
        encoding: &'a OutputEncoding,
        out: &'a Path,
    ) -> BoxFuture<'a, ToolResult<()>>;
}

/// The set of tool backends one composition run uses.
#[derive(Clone)]
pub struct Toolchain {
    pub metadata: Arc<dyn MetadataReader>,
    pub converter: Arc<dyn Converter>,
    pub typesetter: Arc<dyn Typesetter>,
    pub cropper: Arc<dyn Cropper>,
    pub images: Arc<dyn ImageProcessor>,
}

impl Toolchain {
    /// Wire every capability to the real programs named in `config.tools`.
    pub fn system(config: &ComposeConfig) -> Self {
        let timeout = Duration::from_secs(config.tool_timeout_secs);
        let magick = Arc::new(Magick::new(&config.tools.magick, timeout));
        Self {
            metadata: magick.clone(),
            converter: Arc::new(Pandoc::new(&config.tools.pandoc, timeout)),
            typesetter: Arc::new(XeLatex::new(&config.tools.xelatex, timeout)),
            cropper: Arc::new(PdfCrop::new(&config.tools.pdfcrop, timeout)),
            images: magick,
        }
    }

    /// Fail with `ToolNotFound` if any backing program is missing.
    pub fn preflight(&self) -> Result<(), PhotociteError> {
        let checks = [
            self.metadata.ensure_available(),
            self.converter.ensure_available(),
            self.typesetter.ensure_available(),
            self.cropper.ensure_available(),
            self.images.ensure_available(),
        ];
        for check in checks {
            if let Err(failure) = check {
                return Err(PhotociteError::from_tool(
                    crate::pipeline::Stage::Preflight,
                    failure,
                ));
            }
        }
        debug!("All external tools located");
        Ok(())
    }
}

impl std::fmt::Debug for Toolchain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Toolchain").finish_non_exhaustive()
    }
}
