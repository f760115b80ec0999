//! Typed subprocess invocation with a bounded wait.
//!
//! Every external program photocite drives goes through [`ToolCommand`]:
//! arguments are collected as `OsString`s (no shell, no quoting), stdin is
//! closed so nothing can sit waiting for an interactive answer, and the wait
//! is wrapped in `tokio::time::timeout`. The child is spawned with
//! `kill_on_drop`, so when the timeout fires and the wait future is dropped
//! the process is killed rather than left running.

use super::ExternalTool;
use crate::error::ToolFailure;
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

/// How many trailing characters of tool output are kept as diagnostics.
const DIAGNOSTIC_TAIL: usize = 2000;

/// Captured result of a successful tool run.
#[derive(Debug, Clone, Default)]
pub struct ToolOutput {
    pub stdout: String,
    pub stderr: String,
}

impl ToolOutput {
    /// stdout and stderr joined, for tools that report warnings on either.
    pub fn combined(&self) -> String {
        format!("{}\n{}", self.stdout, self.stderr)
    }
}

/// Builder for one invocation of an external program.
#[derive(Debug, Clone)]
pub struct ToolCommand {
    program: PathBuf,
    tool: Option<ExternalTool>,
    args: Vec<OsString>,
    current_dir: Option<PathBuf>,
    timeout: Duration,
}

impl ToolCommand {
    pub fn new(program: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            tool: None,
            args: Vec::new(),
            current_dir: None,
            timeout,
        }
    }

    /// Which capability this program backs, for install hints.
    pub fn for_tool(mut self, tool: ExternalTool) -> Self {
        self.tool = Some(tool);
        self
    }

    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args
            .extend(args.into_iter().map(|a| a.as_ref().to_os_string()));
        self
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.current_dir = Some(dir.into());
        self
    }

    /// Program name used in error messages.
    pub fn program_name(&self) -> String {
        self.program.display().to_string()
    }

    /// Shell-like rendering of the command line, for logs.
    pub fn display(&self) -> String {
        std::iter::once(self.program.as_os_str())
            .chain(self.args.iter().map(|a| a.as_os_str()))
            .map(|a| {
                let s = a.to_string_lossy();
                if s.contains(' ') || s.is_empty() {
                    format!("'{s}'")
                } else {
                    s.to_string()
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Run to completion, capturing output.
    ///
    /// A non-zero exit becomes [`ToolFailure::Exited`] with the tail of
    /// stderr (or stdout, when stderr is empty) as diagnostics.
    pub async fn run(self) -> Result<ToolOutput, ToolFailure> {
        let program = self.program_name();
        debug!("exec: {}", self.display());

        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(ref dir) = self.current_dir {
            cmd.current_dir(dir);
        }

        let child = cmd.spawn().map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ToolFailure::NotFound {
                    program: program.clone(),
                    tool: self.tool,
                }
            } else {
                ToolFailure::Io {
                    program: program.clone(),
                    source: e,
                }
            }
        })?;

        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(result) => result.map_err(|e| ToolFailure::Io {
                program: program.clone(),
                source: e,
            })?,
            Err(_) => {
                return Err(ToolFailure::TimedOut {
                    program,
                    secs: self.timeout.as_secs(),
                })
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();

        if !output.status.success() {
            let source = if stderr.trim().is_empty() {
                &stdout
            } else {
                &stderr
            };
            return Err(ToolFailure::Exited {
                program,
                code: output.status.code(),
                diagnostics: tail(source.trim(), DIAGNOSTIC_TAIL),
            });
        }

        Ok(ToolOutput { stdout, stderr })
    }
}

/// Keep at most the last `max` characters of `s`.
pub fn tail(s: &str, max: usize) -> String {
    let count = s.chars().count();
    if count <= max {
        s.to_string()
    } else {
        let skipped: String = s.chars().skip(count - max).collect();
        format!("\u{2026}{skipped}")
    }
}

/// Find `program` the way a shell would.
///
/// A value containing a path separator is checked as-is; a bare name is
/// searched for in every `PATH` entry.
pub fn locate_program(program: &Path) -> Option<PathBuf> {
    if program.components().count() > 1 {
        return is_executable(program).then(|| program.to_path_buf());
    }

    let path_var = std::env::var_os("PATH")?;
    std::env::split_paths(&path_var)
        .flat_map(|dir| candidates(&dir, program))
        .find(|candidate| is_executable(candidate))
}

#[cfg(windows)]
fn candidates(dir: &Path, program: &Path) -> Vec<PathBuf> {
    let base = dir.join(program);
    let mut out = vec![base.clone()];
    if base.extension().is_none() {
        out.extend(["exe", "bat", "cmd"].iter().map(|ext| base.with_extension(ext)));
    }
    out
}

#[cfg(not(windows))]
fn candidates(dir: &Path, program: &Path) -> Vec<PathBuf> {
    vec![dir.join(program)]
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    std::fs::metadata(path)
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

/// [`locate_program`] as a `Result`, for backend preflight checks.
pub fn require_program(tool: ExternalTool, program: &Path) -> Result<PathBuf, ToolFailure> {
    locate_program(program).ok_or_else(|| ToolFailure::NotFound {
        program: program.display().to_string(),
        tool: Some(tool),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_quotes_spaced_args() {
        let cmd = ToolCommand::new("magick", Duration::from_secs(1))
            .arg("crane with citation.jpg")
            .args(["-quality", "92"]);
        assert_eq!(
            cmd.display(),
            "magick 'crane with citation.jpg' -quality 92"
        );
    }

    #[test]
    fn tail_keeps_end_of_long_output() {
        assert_eq!(tail("abc", 10), "abc");
        assert_eq!(tail("abcdef", 3), "\u{2026}def");
    }

    #[test]
    fn missing_program_is_not_located() {
        assert!(locate_program(Path::new("photocite-no-such-tool-xyz")).is_none());
        assert!(locate_program(Path::new("/nonexistent/dir/magick")).is_none());
        let err = require_program(ExternalTool::Pandoc, Path::new("photocite-no-such-tool-xyz"))
            .unwrap_err();
        assert!(matches!(
            err,
            ToolFailure::NotFound {
                tool: Some(ExternalTool::Pandoc),
                ..
            }
        ));
    }

    #[cfg(unix)]
    #[test]
    fn shell_is_located_on_path() {
        assert!(locate_program(Path::new("sh")).is_some());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn run_captures_stdout() {
        let out = ToolCommand::new("sh", Duration::from_secs(10))
            .args(["-c", "printf 'hello'"])
            .run()
            .await
            .expect("sh should run");
        assert_eq!(out.stdout, "hello");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn run_reports_exit_status_and_stderr() {
        let err = ToolCommand::new("sh", Duration::from_secs(10))
            .args(["-c", "echo broken >&2; exit 3"])
            .run()
            .await
            .unwrap_err();
        match err {
            ToolFailure::Exited {
                code, diagnostics, ..
            } => {
                assert_eq!(code, Some(3));
                assert_eq!(diagnostics, "broken");
            }
            other => panic!("unexpected failure: {other:?}"),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn run_times_out() {
        let err = ToolCommand::new("sh", Duration::from_millis(200))
            .args(["-c", "sleep 5"])
            .run()
            .await
            .unwrap_err();
        assert!(matches!(err, ToolFailure::TimedOut { .. }), "got {err:?}");
    }

    #[tokio::test]
    async fn run_missing_program() {
        let err = ToolCommand::new("photocite-no-such-tool-xyz", Duration::from_secs(1))
            .for_tool(ExternalTool::XeLatex)
            .run()
            .await
            .unwrap_err();
        assert!(
            matches!(
                err,
                ToolFailure::NotFound {
                    tool: Some(ExternalTool::XeLatex),
                    ..
                }
            ),
            "got {err:?}"
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn run_respects_current_dir() {
        let dir = tempfile::tempdir().unwrap();
        let out = ToolCommand::new("sh", Duration::from_secs(10))
            .args(["-c", "pwd"])
            .current_dir(dir.path())
            .run()
            .await
            .unwrap();
        let expected = dir.path().canonicalize().unwrap();
        let actual = PathBuf::from(out.stdout.trim()).canonicalize().unwrap();
        assert_eq!(actual, expected);
    }
}
