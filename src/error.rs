//! Error types for the photocite library.
//!
//! Two layers of failure exist:
//!
//! * [`ToolFailure`]: what went wrong with a single external program
//!   (missing binary, non-zero exit, timeout, unreadable output). Tool
//!   backends return it without knowing which pipeline stage called them.
//!
//! * [`PhotociteError`]: **fatal** for the run. Every pipeline stage maps the
//!   `ToolFailure` it receives into the error kind of that stage, so the user
//!   always learns *where* the pipeline stopped, together with whatever
//!   diagnostics the tool printed.
//!
//! Nothing is retried: the first error ends the run after scratch cleanup.

use crate::pipeline::Stage;
use crate::tools::ExternalTool;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// All fatal errors returned by the photocite library.
#[derive(Debug, Error)]
pub enum PhotociteError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Missing or conflicting citation source, missing image argument, or an
    /// output path that would overwrite the source image.
    #[error("Usage error: {0}")]
    Usage(String),

    /// The source image is missing, unreadable, or not a raster format.
    #[error("Could not read image '{path}': {detail}\nCheck the path exists and is a raster image.")]
    ImageRead { path: PathBuf, detail: String },

    // ── Stage errors ──────────────────────────────────────────────────────
    /// Markdown → LaTeX conversion or the LaTeX compile failed.
    #[error("Render stage failed: {detail}")]
    Render { detail: String },

    /// The typeset page had no visible content, or pdfcrop failed.
    #[error("Crop stage failed: {detail}")]
    Crop { detail: String },

    /// The cropped page could not be rasterised.
    #[error("Rasterize stage failed: {detail}")]
    Raster { detail: String },

    /// The caption raster could not be resized.
    #[error("Scale stage failed: {detail}")]
    Scale { detail: String },

    /// Appending the caption under the photo failed.
    #[error("Composite stage failed: {detail}")]
    Composite { detail: String },

    /// Writing the caption-only image failed.
    #[error("Emit stage failed: {detail}")]
    Emit { detail: String },

    // ── Environment errors ────────────────────────────────────────────────
    /// A required external program is not installed or not on `PATH`.
    #[error("Required tool '{program}' was not found.\n{hint}")]
    ToolNotFound { program: String, hint: String },

    /// An external program did not finish within the configured bound.
    #[error("{stage} stage timed out: '{program}' did not finish within {secs}s\nIncrease --timeout.")]
    Timeout {
        stage: Stage,
        program: String,
        secs: u64,
    },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not move the finished image into place.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        stage: Stage,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error (scratch directory creation, runtime setup).
    #[error("Internal error: {0}")]
    Internal(String),
}

impl PhotociteError {
    /// The pipeline stage this error belongs to.
    pub fn stage(&self) -> Stage {
        match self {
            PhotociteError::Usage(_) | PhotociteError::InvalidConfig(_) => Stage::ResolveInput,
            PhotociteError::ToolNotFound { .. } => Stage::Preflight,
            PhotociteError::ImageRead { .. } => Stage::Inspect,
            PhotociteError::Render { .. } => Stage::Render,
            PhotociteError::Crop { .. } => Stage::Crop,
            PhotociteError::Raster { .. } => Stage::Rasterize,
            PhotociteError::Scale { .. } => Stage::Scale,
            PhotociteError::Composite { .. } => Stage::Composite,
            PhotociteError::Emit { .. } => Stage::Emit,
            PhotociteError::Timeout { stage, .. }
            | PhotociteError::OutputWriteFailed { stage, .. } => *stage,
            PhotociteError::Internal(_) => Stage::Cleanup,
        }
    }

    /// Process exit code for the CLI.
    ///
    /// | Code | Meaning |
    /// |------|---------|
    /// | 2 | usage error |
    /// | 3 | required tool missing |
    /// | 4 | tool timed out |
    /// | 1 | any other stage failure |
    pub fn exit_code(&self) -> u8 {
        match self {
            PhotociteError::Usage(_) => 2,
            PhotociteError::ToolNotFound { .. } => 3,
            PhotociteError::Timeout { .. } => 4,
            _ => 1,
        }
    }

    /// Map a tool failure into the error kind of the stage that ran the tool.
    ///
    /// `Inspect` failures need the image path and are mapped by the inspect
    /// stage itself; passing `Stage::Inspect` here yields an `ImageRead` with
    /// an empty path.
    pub fn from_tool(stage: Stage, failure: ToolFailure) -> Self {
        let detail = match failure {
            ToolFailure::NotFound { program, tool } => {
                return PhotociteError::ToolNotFound {
                    hint: install_hint(&program, tool),
                    program,
                }
            }
            ToolFailure::TimedOut { program, secs } => {
                return PhotociteError::Timeout {
                    stage,
                    program,
                    secs,
                }
            }
            other => other.to_string(),
        };

        match stage {
            Stage::Inspect => PhotociteError::ImageRead {
                path: PathBuf::new(),
                detail,
            },
            Stage::Render => PhotociteError::Render { detail },
            Stage::Crop => PhotociteError::Crop { detail },
            Stage::Rasterize => PhotociteError::Raster { detail },
            Stage::Scale => PhotociteError::Scale { detail },
            Stage::Composite => PhotociteError::Composite { detail },
            Stage::Emit => PhotociteError::Emit { detail },
            Stage::ResolveInput | Stage::Preflight | Stage::Cleanup => {
                PhotociteError::Internal(detail)
            }
        }
    }
}

/// Installation hint shown alongside [`PhotociteError::ToolNotFound`].
///
/// The package and override flag follow the capability, not the file name,
/// so a renamed binary such as `/opt/im7/bin/magick7` still points at
/// `--magick`.
pub fn install_hint(program: &str, tool: Option<ExternalTool>) -> String {
    let name = Path::new(program)
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| program.to_string());
    match tool {
        Some(tool) => format!(
            "Install {} and make sure '{name}' is on PATH, or point photocite at it with {}.",
            tool.package(),
            tool.flag()
        ),
        None => format!("Make sure '{name}' is installed and on PATH."),
    }
}

/// A failure of one external program invocation.
///
/// Stage-agnostic: see [`PhotociteError::from_tool`].
#[derive(Debug, Error)]
pub enum ToolFailure {
    /// The program could not be located or spawned because it does not exist.
    #[error("'{program}' was not found")]
    NotFound {
        program: String,
        /// The capability the program backs, when known.
        tool: Option<ExternalTool>,
    },

    /// The program ran and exited unsuccessfully.
    #[error("'{program}' exited with {}: {diagnostics}", exit_label(.code))]
    Exited {
        program: String,
        code: Option<i32>,
        diagnostics: String,
    },

    /// The program exceeded the configured timeout and was killed.
    #[error("'{program}' timed out after {secs}s")]
    TimedOut { program: String, secs: u64 },

    /// Spawning or talking to the program failed for another I/O reason.
    #[error("'{program}' could not be run: {source}")]
    Io {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The program succeeded but its output did not make sense.
    #[error("unexpected output from '{program}': {detail}")]
    Unparseable { program: String, detail: String },
}

fn exit_label(code: &Option<i32>) -> String {
    match code {
        Some(c) => format!("status {c}"),
        None => "a signal".to_string(),
    }
}
