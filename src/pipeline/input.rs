//! Input resolution: turn command-line style arguments into a
//! [`ComposeRequest`].
//!
//! Everything that depends on *how* the user supplied their input is decided
//! here, exactly once: the run [`Mode`], which citation text wins, and the
//! output path. Later stages receive the resolved request and never look at
//! raw arguments again.
//!
//! ## Citation source priority
//!
//! Exactly one source is honoured per run:
//!
//! 1. non-blank piped standard input
//! 2. the `--cite` file (or, in citation-only mode, a positional argument
//!    naming an existing file)
//! 3. literal text from the command line
//!
//! Lower-priority sources supplied alongside a higher one are ignored.

use crate::error::PhotociteError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::debug;

/// File name used for a citation-only image when there is nothing to derive one from.
pub const DEFAULT_CITATION_IMAGE: &str = "citation.png";

/// What the run produces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    /// Append the caption beneath `image`.
    Standard { image: PathBuf },
    /// Produce the caption image alone.
    CitationOnly,
}

impl Mode {
    pub fn kind(&self) -> ModeKind {
        match self {
            Mode::Standard { .. } => ModeKind::Standard,
            Mode::CitationOnly => ModeKind::CitationOnly,
        }
    }
}

/// [`Mode`] without its payload, for reports and callbacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ModeKind {
    Standard,
    CitationOnly,
}

/// Where the citation text came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CitationSource {
    Stdin,
    File(PathBuf),
    Argument,
}

impl fmt::Display for CitationSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CitationSource::Stdin => f.write_str("stdin (piped input)"),
            CitationSource::File(p) => write!(f, "file: {}", p.display()),
            CitationSource::Argument => f.write_str("command line argument"),
        }
    }
}

/// Resolved citation markup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Citation {
    pub text: String,
    pub source: CitationSource,
}

/// Every candidate citation source of a run.
#[derive(Debug, Clone, Default)]
pub struct CitationInputs {
    /// Content read from a piped (non-terminal) stdin.
    pub piped: Option<String>,
    /// A citation file.
    pub cite_file: Option<PathBuf>,
    /// Literal Markdown from the command line.
    pub literal: Option<String>,
}

/// Pick the single citation source that wins, reading it if it is a file.
///
/// # Errors
/// [`PhotociteError::Usage`] when no source has text or the citation file
/// cannot be read. A blank source counts as absent, so a whitespace-only
/// citation file gives way to literal text.
pub fn resolve_citation(inputs: CitationInputs) -> Result<Citation, PhotociteError> {
    if let Some(text) = inputs.piped.filter(|t| !t.trim().is_empty()) {
        if inputs.cite_file.is_some() || inputs.literal.is_some() {
            debug!("Piped input present; ignoring --cite and literal citation text");
        }
        return Ok(Citation {
            text,
            source: CitationSource::Stdin,
        });
    }

    let mut blank_file = None;
    if let Some(path) = inputs.cite_file {
        if !path.is_file() {
            return Err(PhotociteError::Usage(format!(
                "Citation file '{}' does not exist.",
                path.display()
            )));
        }
        let text = std::fs::read_to_string(&path).map_err(|e| {
            PhotociteError::Usage(format!(
                "Could not read citation file '{}': {e}",
                path.display()
            ))
        })?;
        if !text.trim().is_empty() {
            return Ok(Citation {
                text,
                source: CitationSource::File(path),
            });
        }
        debug!("Citation file '{}' is blank; trying literal text", path.display());
        blank_file = Some(path);
    }

    if let Some(text) = inputs.literal.filter(|t| !t.trim().is_empty()) {
        return Ok(Citation {
            text,
            source: CitationSource::Argument,
        });
    }

    if let Some(path) = blank_file {
        return Err(PhotociteError::Usage(format!(
            "Citation file '{}' is empty.",
            path.display()
        )));
    }

    Err(PhotociteError::Usage(
        "No citation text provided. Provide it as an argument, from a file with --cite, \
         or pipe it to stdin."
            .into(),
    ))
}

/// Raw arguments, as the CLI collects them.
#[derive(Debug, Clone, Default)]
pub struct RequestArgs {
    pub citation_only: bool,
    /// First positional: image (standard) or citation file/text (citation-only).
    pub image: Option<String>,
    /// Second positional: literal citation (standard mode only).
    pub citation_text: Option<String>,
    pub cite: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub template: Option<PathBuf>,
    pub piped: Option<String>,
}

/// A fully resolved composition request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposeRequest {
    pub mode: Mode,
    pub citation: Citation,
    pub output: PathBuf,
    /// User template; `None` selects the built-in one.
    pub template: Option<PathBuf>,
}

/// Resolve mode, citation and output path from raw arguments.
pub fn resolve_request(args: RequestArgs) -> Result<ComposeRequest, PhotociteError> {
    if args.citation_only {
        resolve_citation_only(args)
    } else {
        resolve_standard(args)
    }
}

fn resolve_standard(args: RequestArgs) -> Result<ComposeRequest, PhotociteError> {
    let image = args.image.map(PathBuf::from).ok_or_else(|| {
        PhotociteError::Usage(
            "In standard mode, you must provide an image file as the first argument.".into(),
        )
    })?;

    let citation = resolve_citation(CitationInputs {
        piped: args.piped,
        cite_file: args.cite,
        literal: args.citation_text,
    })?;

    let output = args
        .output
        .unwrap_or_else(|| default_standard_output(&image));
    if same_file(&output, &image) {
        return Err(PhotociteError::Usage(format!(
            "Output '{}' would overwrite the source image.",
            output.display()
        )));
    }

    Ok(ComposeRequest {
        mode: Mode::Standard { image },
        citation,
        output,
        template: args.template,
    })
}

fn resolve_citation_only(args: RequestArgs) -> Result<ComposeRequest, PhotociteError> {
    if args.citation_text.is_some() {
        return Err(PhotociteError::Usage(
            "Citation-only mode takes a single positional argument (citation file or text)."
                .into(),
        ));
    }

    let (positional_file, positional_text) = match args.image {
        Some(arg) if Path::new(&arg).is_file() => (Some(PathBuf::from(arg)), None),
        Some(arg) => (None, Some(arg)),
        None => (None, None),
    };

    let citation = resolve_citation(CitationInputs {
        piped: args.piped,
        cite_file: args.cite.or(positional_file),
        literal: positional_text,
    })?;

    let output = args
        .output
        .unwrap_or_else(|| default_citation_only_output(&citation.source));

    Ok(ComposeRequest {
        mode: Mode::CitationOnly,
        citation,
        output,
        template: args.template,
    })
}

/// `<dir>/<stem> with citation<.ext>` next to the source image.
pub fn default_standard_output(image: &Path) -> PathBuf {
    let stem = image
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    let ext = image
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();
    image.with_file_name(format!("{stem} with citation{ext}"))
}

/// `<dir>/<stem> citation.png` next to the citation file, else `citation.png`.
pub fn default_citation_only_output(source: &CitationSource) -> PathBuf {
    match source {
        CitationSource::File(path) => {
            let stem = path
                .file_stem()
                .map(|s| s.to_string_lossy().to_string())
                .unwrap_or_default();
            path.with_file_name(format!("{stem} citation.png"))
        }
        CitationSource::Stdin | CitationSource::Argument => PathBuf::from(DEFAULT_CITATION_IMAGE),
    }
}

fn same_file(a: &Path, b: &Path) -> bool {
    if a == b {
        return true;
    }
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(x), Ok(y)) => x == y,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_file(dir: &Path, name: &str, text: &str) -> PathBuf {
        let p = dir.join(name);
        std::fs::write(&p, text).unwrap();
        p
    }

    #[test]
    fn piped_input_wins_over_everything() {
        let dir = tempfile::tempdir().unwrap();
        let cite = write_file(dir.path(), "c.md", "from file");
        for _ in 0..3 {
            let c = resolve_citation(CitationInputs {
                piped: Some("from *stdin*".into()),
                cite_file: Some(cite.clone()),
                literal: Some("from arg".into()),
            })
            .unwrap();
            assert_eq!(c.text, "from *stdin*");
            assert_eq!(c.source, CitationSource::Stdin);
        }
    }

    #[test]
    fn blank_pipe_falls_through_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let cite = write_file(dir.path(), "c.md", "from file");
        let c = resolve_citation(CitationInputs {
            piped: Some("  \n".into()),
            cite_file: Some(cite.clone()),
            literal: Some("from arg".into()),
        })
        .unwrap();
        assert_eq!(c.text, "from file");
        assert_eq!(c.source, CitationSource::File(cite));
    }

    #[test]
    fn blank_file_falls_through_to_literal() {
        let dir = tempfile::tempdir().unwrap();
        let cite = write_file(dir.path(), "c.md", "  \n\n");
        let c = resolve_citation(CitationInputs {
            piped: None,
            cite_file: Some(cite),
            literal: Some("Photo: *real text*".into()),
        })
        .unwrap();
        assert_eq!(c.text, "Photo: *real text*");
        assert_eq!(c.source, CitationSource::Argument);
    }

    #[test]
    fn blank_file_alone_is_a_usage_error() {
        let dir = tempfile::tempdir().unwrap();
        let cite = write_file(dir.path(), "c.md", " \t\n");
        let err = resolve_citation(CitationInputs {
            piped: Some("\n".into()),
            cite_file: Some(cite),
            literal: None,
        })
        .unwrap_err();
        assert!(matches!(err, PhotociteError::Usage(_)), "{err:?}");
        assert!(err.to_string().contains("is empty"), "{err}");
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn file_wins_over_literal() {
        let dir = tempfile::tempdir().unwrap();
        let cite = write_file(dir.path(), "c.md", "from file");
        let c = resolve_citation(CitationInputs {
            piped: None,
            cite_file: Some(cite),
            literal: Some("from arg".into()),
        })
        .unwrap();
        assert_eq!(c.text, "from file");
    }

    #[test]
    fn literal_used_last() {
        let c = resolve_citation(CitationInputs {
            literal: Some("Photograph by *Ansel Adams*".into()),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(c.source, CitationSource::Argument);
        assert_eq!(c.source.to_string(), "command line argument");
    }

    #[test]
    fn no_source_is_usage_error() {
        let err = resolve_citation(CitationInputs::default()).unwrap_err();
        assert!(matches!(err, PhotociteError::Usage(_)));
        let err = resolve_citation(CitationInputs {
            literal: Some(String::new()),
            ..Default::default()
        })
        .unwrap_err();
        assert!(matches!(err, PhotociteError::Usage(_)));
    }

    #[test]
    fn missing_cite_file_is_usage_error() {
        let err = resolve_citation(CitationInputs {
            cite_file: Some(PathBuf::from("/no/such/citation.md")),
            literal: Some("ignored".into()),
            ..Default::default()
        })
        .unwrap_err();
        assert!(err.to_string().contains("does not exist"), "got: {err}");
    }

    #[test]
    fn standard_mode_requires_image() {
        let err = resolve_request(RequestArgs {
            citation_text: Some("text".into()),
            ..Default::default()
        })
        .unwrap_err();
        assert!(matches!(err, PhotociteError::Usage(_)));
    }

    #[test]
    fn standard_mode_default_output() {
        let req = resolve_request(RequestArgs {
            image: Some("photos/crane.jpg".into()),
            citation_text: Some("text".into()),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(
            req.mode,
            Mode::Standard {
                image: PathBuf::from("photos/crane.jpg")
            }
        );
        assert_eq!(req.output, PathBuf::from("photos/crane with citation.jpg"));
    }

    #[test]
    fn explicit_output_is_kept() {
        let req = resolve_request(RequestArgs {
            image: Some("crane.jpg".into()),
            citation_text: Some("text".into()),
            output: Some("crane_cite.jpg".into()),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(req.output, PathBuf::from("crane_cite.jpg"));
    }

    #[test]
    fn output_onto_source_is_refused() {
        let err = resolve_request(RequestArgs {
            image: Some("crane.jpg".into()),
            citation_text: Some("text".into()),
            output: Some("crane.jpg".into()),
            ..Default::default()
        })
        .unwrap_err();
        assert!(err.to_string().contains("overwrite"));
    }

    #[test]
    fn citation_only_positional_file() {
        let dir = tempfile::tempdir().unwrap();
        let cite = write_file(dir.path(), "b.md", "*Title*, 1901");
        let req = resolve_request(RequestArgs {
            citation_only: true,
            image: Some(cite.to_string_lossy().to_string()),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(req.mode, Mode::CitationOnly);
        assert_eq!(req.citation.text, "*Title*, 1901");
        assert_eq!(req.output, dir.path().join("b citation.png"));
    }

    #[test]
    fn citation_only_positional_text() {
        let req = resolve_request(RequestArgs {
            citation_only: true,
            image: Some("short text".into()),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(req.citation.text, "short text");
        assert_eq!(req.citation.source, CitationSource::Argument);
        assert_eq!(req.output, PathBuf::from(DEFAULT_CITATION_IMAGE));
    }

    #[test]
    fn citation_only_rejects_second_positional() {
        let err = resolve_request(RequestArgs {
            citation_only: true,
            image: Some("a".into()),
            citation_text: Some("b".into()),
            ..Default::default()
        })
        .unwrap_err();
        assert!(matches!(err, PhotociteError::Usage(_)));
    }

    #[test]
    fn citation_only_with_pipe_needs_no_positional() {
        let req = resolve_request(RequestArgs {
            citation_only: true,
            piped: Some("piped".into()),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(req.citation.source, CitationSource::Stdin);
        assert_eq!(req.mode.kind(), ModeKind::CitationOnly);
    }

    #[test]
    fn source_display_strings() {
        assert_eq!(CitationSource::Stdin.to_string(), "stdin (piped input)");
        assert_eq!(
            CitationSource::File(PathBuf::from("crane_citation.md")).to_string(),
            "file: crane_citation.md"
        );
    }
}
