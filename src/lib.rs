//! # photocite
//!
//! Append a typeset citation caption below an image, so the photo and its
//! provenance travel as one file.
//!
//! ## Why this crate?
//!
//! Text overlays drawn by an image library cannot mix upright and italic
//! runs, do not kern, and look nothing like the citation in the paper the
//! photo came from. Instead this crate hands a short Markdown citation to a
//! real typesetting chain (Pandoc and XeLaTeX), crops the page to its text,
//! rasterises it at the photo's own DPI so the type has a consistent printed
//! size, and appends it under the photo with ImageMagick.
//!
//! ## Pipeline Overview
//!
//! ```text
//! image + citation
//!  │
//!  ├─ 1. Input      pick the citation source, the mode and the output path
//!  ├─ 2. Preflight  every external program is on PATH
//!  ├─ 3. Inspect    size, DPI and JPEG quality of the photo
//!  ├─ 4. Render     Markdown → LaTeX → PDF   (pandoc, xelatex)
//!  ├─ 5. Crop       page → text bounding box (pdfcrop)
//!  ├─ 6. Rasterize  PDF → PNG at the photo's DPI (magick)
//!  ├─ 7. Scale      shrink to the width limit, never enlarge
//!  └─ 8. Composite  photo over caption, written atomically
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use photocite::{compose, resolve_request, ComposeConfig, RequestArgs};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let request = resolve_request(RequestArgs {
//!         image: Some("crane.jpg".into()),
//!         citation_text: Some("Photo: *Whooping crane*, USFWS, 2021.".into()),
//!         ..Default::default()
//!     })?;
//!     let output = compose(&request, &ComposeConfig::default()).await?;
//!     eprintln!("{}", output.confirmation());
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `photocite` binary (clap + indicatif + anyhow + tracing-subscriber) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! photocite = { version = "0.1", default-features = false }
//! ```
//!
//! ## External programs
//!
//! | Program | Package |
//! |---------|---------|
//! | `magick`  | ImageMagick 7 |
//! | `pandoc`  | Pandoc |
//! | `xelatex` | TeX Live / MiKTeX |
//! | `pdfcrop` | TeX Live / MiKTeX |
//!
//! Each can be pointed elsewhere through [`ToolPaths`], and every backend sits
//! behind a trait in [`tools`], so tests can swap in fakes.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod compose;
pub mod config;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod template;
pub mod tools;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use compose::{compose, compose_sync, compose_with, inspect, inspect_with};
pub use config::{ComposeConfig, ComposeConfigBuilder, ToolPaths};
pub use error::{PhotociteError, ToolFailure};
pub use output::{CaptionMetrics, ComposeOutput, ComposeStats, StageTiming};
pub use pipeline::input::{
    resolve_request, Citation, CitationSource, ComposeRequest, Mode, ModeKind, RequestArgs,
};
pub use pipeline::inspect::{ImageInfo, SourceImage};
pub use pipeline::Stage;
pub use progress::{ComposeProgressCallback, NoopProgressCallback, ProgressCallback};
pub use tools::Toolchain;
