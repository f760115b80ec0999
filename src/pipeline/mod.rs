//! Pipeline stages for composing a photo with its citation.
//!
//! Each submodule implements exactly one transformation step.
//! Keeping stages separate makes each independently testable and lets us
//! swap the external program behind a stage (see [`crate::tools`]) without
//! touching the others.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ inspect ──▶ render ──▶ crop ──▶ raster ──▶ scale ──▶ composite
//! (args)    (identify)  (pandoc,   (pdfcrop) (magick)  (magick)  (magick -append
//!                        xelatex)                                 or emit)
//! ```
//!
//! 1. [`input`]: resolve the citation source, the mode and the output path
//! 2. [`inspect`]: probe the source image for size, DPI and JPEG quality
//! 3. [`render`]: Markdown → LaTeX → PDF page
//! 4. [`crop`]: trim the page to its content plus a margin
//! 5. [`raster`]: PDF → PNG at the photo's DPI
//! 6. [`scale`]: shrink the caption to the width limit, never enlarge
//! 7. [`composite`]: append under the photo, or emit the caption alone
//!
//! [`scratch`] owns every intermediate file of a run; [`encode`] picks the
//! write options of the final file.

pub mod composite;
pub mod crop;
pub mod encode;
pub mod input;
pub mod inspect;
pub mod raster;
pub mod render;
pub mod scale;
pub mod scratch;

use serde::{Deserialize, Serialize};
use std::fmt;

/// A state of the composition pipeline.
///
/// Reported to [`crate::progress::ComposeProgressCallback`] and attached to
/// every [`crate::error::PhotociteError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Stage {
    ResolveInput,
    Preflight,
    Inspect,
    Render,
    Crop,
    Rasterize,
    Scale,
    Composite,
    Emit,
    Cleanup,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::ResolveInput => "resolve-input",
            Stage::Preflight => "preflight",
            Stage::Inspect => "inspect",
            Stage::Render => "render",
            Stage::Crop => "crop",
            Stage::Rasterize => "rasterize",
            Stage::Scale => "scale",
            Stage::Composite => "composite",
            Stage::Emit => "emit",
            Stage::Cleanup => "cleanup",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
