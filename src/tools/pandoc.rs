//! Pandoc backend: Markdown → standalone LaTeX.

use super::command::{require_program, ToolCommand};
use super::{Converter, ExternalTool, ToolResult};
use futures::future::BoxFuture;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// The `pandoc` program.
#[derive(Debug, Clone)]
pub struct Pandoc {
    program: PathBuf,
    timeout: Duration,
}

impl Pandoc {
    pub fn new(program: &Path, timeout: Duration) -> Self {
        Self {
            program: program.to_path_buf(),
            timeout,
        }
    }
}

pub(crate) fn convert_args(markup: &Path, template: &Path, out: &Path) -> Vec<OsString> {
    let mut template_arg = OsString::from("--template=");
    template_arg.push(template);
    vec![
        "-f".into(),
        "markdown".into(),
        "-t".into(),
        "latex".into(),
        "--standalone".into(),
        template_arg,
        "-o".into(),
        out.into(),
        markup.into(),
    ]
}

impl Converter for Pandoc {
    fn ensure_available(&self) -> ToolResult<()> {
        require_program(ExternalTool::Pandoc, &self.program).map(|_| ())
    }

    fn to_typeset_source<'a>(
        &'a self,
        markup: &'a Path,
        template: &'a Path,
        out: &'a Path,
    ) -> BoxFuture<'a, ToolResult<()>> {
        Box::pin(async move {
            ToolCommand::new(&self.program, self.timeout)
                .for_tool(ExternalTool::Pandoc)
                .args(convert_args(markup, template, out))
                .run()
                .await
                .map(|_| ())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_standalone_latex_command() {
        let args: Vec<String> = convert_args(
            Path::new("/s/citation.md"),
            Path::new("/s/template.latex"),
            Path::new("/s/citation.tex"),
        )
        .into_iter()
        .map(|a| a.to_string_lossy().to_string())
        .collect();
        assert_eq!(
            args,
            vec![
                "-f",
                "markdown",
                "-t",
                "latex",
                "--standalone",
                "--template=/s/template.latex",
                "-o",
                "/s/citation.tex",
                "/s/citation.md"
            ]
        );
    }
}
