//! pdfcrop backend: trim a PDF page to its content bounding box.
//!
//! A blank page makes Ghostscript return an empty bounding box. pdfcrop only
//! warns about that (and sometimes still exits 0), so the warning is looked
//! for in the output and reported as [`CropReport::empty`].

use super::command::{require_program, ToolCommand};
use super::{CropReport, Cropper, ExternalTool, ToolResult};
use crate::error::ToolFailure;
use futures::future::BoxFuture;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;

const EMPTY_BBOX_MARKER: &str = "Empty Bounding Box";

/// The `pdfcrop` program.
#[derive(Debug, Clone)]
pub struct PdfCrop {
    program: PathBuf,
    timeout: Duration,
}

impl PdfCrop {
    pub fn new(program: &Path, timeout: Duration) -> Self {
        Self {
            program: program.to_path_buf(),
            timeout,
        }
    }
}

pub(crate) fn crop_args(page: &Path, margin: u32, out: &Path) -> Vec<OsString> {
    vec![
        "--margins".into(),
        margin.to_string().into(),
        page.into(),
        out.into(),
    ]
}

pub(crate) fn reports_empty_bbox(output: &str) -> bool {
    output.contains(EMPTY_BBOX_MARKER)
}

impl Cropper for PdfCrop {
    fn ensure_available(&self) -> ToolResult<()> {
        require_program(ExternalTool::PdfCrop, &self.program).map(|_| ())
    }

    fn crop<'a>(
        &'a self,
        page: &'a Path,
        margin: u32,
        out: &'a Path,
    ) -> BoxFuture<'a, ToolResult<CropReport>> {
        Box::pin(async move {
            let result = ToolCommand::new(&self.program, self.timeout)
                .for_tool(ExternalTool::PdfCrop)
                .args(crop_args(page, margin, out))
                .run()
                .await;
            match result {
                Ok(output) => Ok(CropReport {
                    empty: reports_empty_bbox(&output.combined()),
                }),
                Err(ToolFailure::Exited { diagnostics, .. })
                    if reports_empty_bbox(&diagnostics) =>
                {
                    Ok(CropReport { empty: true })
                }
                Err(other) => Err(other),
            }
        })
    }
}
