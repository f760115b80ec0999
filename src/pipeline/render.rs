//! Citation rendering: Markdown → LaTeX → PDF page.
//!
//! Plain text overlays cannot mix regular and italic runs the way a citation
//! needs (titles in italics, everything else upright), so the caption goes
//! through a real typesetting chain: Pandoc converts the Markdown into a
//! standalone LaTeX document using the template, and XeLaTeX compiles it.
//!
//! Every file involved (markup, template, `.tex`, `.log`, `.pdf`) is written
//! into the run's scratch directory.

use crate::error::PhotociteError;
use crate::pipeline::scratch::Scratch;
use crate::pipeline::Stage;
use crate::template::load_template;
use crate::tools::Toolchain;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const MARKUP_FILE: &str = "citation.md";
pub const TEMPLATE_FILE: &str = "template.latex";
pub const SOURCE_FILE: &str = "citation.tex";

/// Typeset `markup` into a PDF page inside `scratch`; returns the PDF path.
pub async fn render_citation(
    tools: &Toolchain,
    markup: &str,
    template: Option<&Path>,
    scratch: &Scratch,
) -> Result<PathBuf, PhotociteError> {
    let template_text = load_template(template)?;

    let markup_path = scratch.file(MARKUP_FILE);
    let template_path = scratch.file(TEMPLATE_FILE);
    let source_path = scratch.file(SOURCE_FILE);

    write_artifact(&markup_path, markup)?;
    write_artifact(&template_path, &template_text)?;

    tools
        .converter
        .to_typeset_source(&markup_path, &template_path, &source_path)
        .await
        .map_err(|f| PhotociteError::from_tool(Stage::Render, f))?;

    if !source_path.is_file() {
        return Err(PhotociteError::Render {
            detail: "converter produced no LaTeX source".into(),
        });
    }

    let pdf = tools
        .typesetter
        .compile(&source_path, scratch.dir())
        .await
        .map_err(|f| PhotociteError::from_tool(Stage::Render, f))?;

    // XeLaTeX succeeds without writing a PDF when the document has no
    // content; the crop stage reports that as a blank citation.
    if pdf.is_file() {
        debug!("Rendered citation page: {}", pdf.display());
    } else {
        debug!("Typesetter wrote no page at {}", pdf.display());
    }
    Ok(pdf)
}

fn write_artifact(path: &Path, contents: &str) -> Result<(), PhotociteError> {
    std::fs::write(path, contents).map_err(|e| {
        PhotociteError::Internal(format!("cannot write '{}': {e}", path.display()))
    })
}
