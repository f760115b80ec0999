//! Built-in Pandoc LaTeX template for the caption page.
//!
//! The page is a single 8.5in-wide column with thin margins; pdfcrop later
//! trims it to the text, so the page height is irrelevant. Hyphenation is
//! disabled and the text is set ragged right: a credit line reads badly when
//! a name is split across lines.
//!
//! Callers can override the template with [`crate::ComposeRequest::template`];
//! this constant is used only when no override is provided.

use crate::error::PhotociteError;
use std::path::Path;

/// Default caption template. Pandoc substitutes the converted body at `$body$`.
pub const DEFAULT_TEMPLATE: &str = r#"\documentclass[12pt]{article}
\usepackage{fontspec}
\setmainfont{Times New Roman}
\usepackage{ragged2e}
\usepackage[paperwidth=8.5in, margin=0.2in]{geometry}
\usepackage{parskip}
\usepackage{microtype}
\usepackage[hidelinks]{hyperref}
\providecommand{\tightlist}{\setlength{\itemsep}{0pt}\setlength{\parskip}{0pt}}
\pagestyle{empty}

\begin{document}
\RaggedRight
\hyphenpenalty=10000
\exhyphenpenalty=10000
\emergencystretch=3em
$body$
\end{document}
"#;

/// Load the template text: the user's file, or [`DEFAULT_TEMPLATE`].
///
/// # Errors
/// [`PhotociteError::Render`] when a user template was given but cannot be read.
pub fn load_template(user: Option<&Path>) -> Result<String, PhotociteError> {
    match user {
        None => Ok(DEFAULT_TEMPLATE.to_string()),
        Some(path) => std::fs::read_to_string(path).map_err(|e| PhotociteError::Render {
            detail: format!("cannot read template '{}': {e}", path.display()),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_template_has_body_slot() {
        assert_eq!(DEFAULT_TEMPLATE.matches("$body$").count(), 1);
        assert!(DEFAULT_TEMPLATE.contains("\\pagestyle{empty}"));
        assert!(DEFAULT_TEMPLATE.contains("\\hyphenpenalty=10000"));
    }

    #[test]
    fn default_used_without_override() {
        assert_eq!(load_template(None).unwrap(), DEFAULT_TEMPLATE);
    }

    #[test]
    fn user_template_is_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mine.latex");
        std::fs::write(&path, "\\documentclass{article}$body$").unwrap();
        assert!(load_template(Some(&path)).unwrap().contains("$body$"));
    }

    #[test]
    fn missing_user_template_is_render_error() {
        let err = load_template(Some(Path::new("/no/such/template.latex"))).unwrap_err();
        assert!(matches!(err, PhotociteError::Render { .. }));
    }
}
