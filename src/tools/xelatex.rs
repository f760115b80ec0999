//! XeLaTeX backend: LaTeX source → one-page PDF.
//!
//! XeLaTeX is used over pdfLaTeX for `fontspec` system fonts. It runs in
//! `nonstopmode` with `-halt-on-error` so a broken document fails instead of
//! waiting for input. Its console output is mostly noise; on failure the
//! `! ...` error lines are pulled out of the `.log` file instead.

use super::command::{require_program, tail, ToolCommand};
use super::{ExternalTool, ToolResult, Typesetter};
use crate::error::ToolFailure;
use futures::future::BoxFuture;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// Maximum number of log error lines reported.
const MAX_ERROR_LINES: usize = 8;

/// How far below an error line its `l.N` context is looked for.
const CONTEXT_SCAN: usize = 6;

/// The `xelatex` program.
#[derive(Debug, Clone)]
pub struct XeLatex {
    program: PathBuf,
    timeout: Duration,
}

impl XeLatex {
    pub fn new(program: &Path, timeout: Duration) -> Self {
        Self {
            program: program.to_path_buf(),
            timeout,
        }
    }
}

pub(crate) fn compile_args(source: &Path, out_dir: &Path) -> Vec<OsString> {
    let mut out_arg = OsString::from("-output-directory=");
    out_arg.push(out_dir);
    vec![
        "-interaction=nonstopmode".into(),
        "-halt-on-error".into(),
        out_arg,
        source.into(),
    ]
}

/// Path of the file xelatex writes for `source` with the given extension.
fn artifact(source: &Path, out_dir: &Path, ext: &str) -> PathBuf {
    let stem = source
        .file_stem()
        .map(|s| s.to_os_string())
        .unwrap_or_else(|| OsString::from("texput"));
    out_dir.join(stem).with_extension(ext)
}

/// Error lines (`! ...` plus the `l.N` context line after each) from a log.
pub fn latex_errors(log: &str) -> Vec<String> {
    let mut errors = Vec::new();
    let mut lines = log.lines().peekable();
    while let Some(line) = lines.next() {
        if let Some(msg) = line.strip_prefix("! ") {
            let mut entry = msg.trim().to_string();
            for _ in 0..CONTEXT_SCAN {
                let Some(next) = lines.peek() else { break };
                if next.starts_with("! ") {
                    break;
                }
                if next.starts_with("l.") {
                    entry.push_str(" (");
                    entry.push_str(next.trim());
                    entry.push(')');
                    lines.next();
                    break;
                }
                lines.next();
            }
            errors.push(entry);
            if errors.len() == MAX_ERROR_LINES {
                break;
            }
        }
    }
    errors
}

impl Typesetter for XeLatex {
    fn ensure_available(&self) -> ToolResult<()> {
        require_program(ExternalTool::XeLatex, &self.program).map(|_| ())
    }

    fn compile<'a>(
        &'a self,
        source: &'a Path,
        out_dir: &'a Path,
    ) -> BoxFuture<'a, ToolResult<PathBuf>> {
        Box::pin(async move {
            let result = ToolCommand::new(&self.program, self.timeout)
                .for_tool(ExternalTool::XeLatex)
                .args(compile_args(source, out_dir))
                .current_dir(out_dir)
                .run()
                .await;

            match result {
                Ok(_) => Ok(artifact(source, out_dir, "pdf")),
                Err(ToolFailure::Exited {
                    program,
                    code,
                    diagnostics,
                }) => {
                    let log_path = artifact(source, out_dir, "log");
                    let errors = std::fs::read_to_string(&log_path)
                        .map(|log| latex_errors(&log))
                        .unwrap_or_default();
                    debug!("xelatex log errors: {:?}", errors);
                    let diagnostics = if errors.is_empty() {
                        tail(&diagnostics, 600)
                    } else {
                        errors.join("; ")
                    };
                    Err(ToolFailure::Exited {
                        program,
                        code,
                        diagnostics,
                    })
                }
                Err(other) => Err(other),
            }
        })
    }
}
