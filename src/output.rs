//! Result types returned by a composition run.
//!
//! Everything here is `Serialize` so the CLI's `--json` mode can print the
//! outcome of a run (or an `--inspect-only` probe) as-is.

use crate::pipeline::input::ModeKind;
use crate::pipeline::inspect::SourceImage;
use crate::pipeline::Stage;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Size of the caption before and after scaling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptionMetrics {
    /// Width of the rasterised caption, px.
    pub raster_width: u32,
    /// Height of the rasterised caption, px.
    pub raster_height: u32,
    /// Final width of the caption, px. Never more than `width_limit`.
    pub width: u32,
    /// Final height of the caption, px.
    pub height: u32,
    /// Applied scale factor, `min(1, width_limit / raster_width)`.
    pub scale: f64,
    /// Width limit the caption was fitted to, if any.
    pub width_limit: Option<u32>,
    /// Density the caption was rasterised at.
    pub dpi: u32,
}

/// Outcome of a successful run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComposeOutput {
    /// Where the final image was written.
    pub output_path: PathBuf,
    pub mode: ModeKind,
    /// Human-readable origin of the citation text ("stdin", "file 'x.md'", …).
    pub citation_source: String,
    /// Final image width, px.
    pub width: u32,
    /// Final image height, px.
    pub height: u32,
    pub caption: CaptionMetrics,
    /// The probed photo; `None` in citation-only mode.
    pub source: Option<SourceImage>,
    pub stats: ComposeStats,
}

impl ComposeOutput {
    /// One-line confirmation shown to the user after a successful run.
    pub fn confirmation(&self) -> String {
        match self.mode {
            ModeKind::Standard => format!(
                "Created '{}' using citation text from {}",
                self.output_path.display(),
                self.citation_source
            ),
            ModeKind::CitationOnly => format!(
                "Citation only mode: Generated citation file at '{}' using text from {}",
                self.output_path.display(),
                self.citation_source
            ),
        }
    }
}

/// Wall-clock timing of a run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ComposeStats {
    pub total_duration_ms: u64,
    /// Every stage that ran, in order.
    pub stages: Vec<StageTiming>,
}

impl ComposeStats {
    /// Time spent in `stage`, if it ran.
    pub fn stage_ms(&self, stage: Stage) -> Option<u64> {
        self.stages
            .iter()
            .find(|t| t.stage == stage)
            .map(|t| t.elapsed_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageTiming {
    pub stage: Stage,
    pub elapsed_ms: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_lookup() {
        let stats = ComposeStats {
            total_duration_ms: 30,
            stages: vec![
                StageTiming {
                    stage: Stage::Render,
                    elapsed_ms: 20,
                },
                StageTiming {
                    stage: Stage::Crop,
                    elapsed_ms: 5,
                },
            ],
        };
        assert_eq!(stats.stage_ms(Stage::Crop), Some(5));
        assert_eq!(stats.stage_ms(Stage::Composite), None);
    }

    fn sample(mode: ModeKind) -> ComposeOutput {
        ComposeOutput {
            output_path: PathBuf::from("crane with citation.jpg"),
            mode,
            citation_source: "file: crane.md".into(),
            width: 3000,
            height: 2188,
            caption: CaptionMetrics {
                raster_width: 2400,
                raster_height: 300,
                width: 1500,
                height: 188,
                scale: 0.625,
                width_limit: Some(1500),
                dpi: 300,
            },
            source: None,
            stats: ComposeStats::default(),
        }
    }

    #[test]
    fn confirmation_per_mode() {
        assert_eq!(
            sample(ModeKind::Standard).confirmation(),
            "Created 'crane with citation.jpg' using citation text from file: crane.md"
        );
        assert_eq!(
            sample(ModeKind::CitationOnly).confirmation(),
            "Citation only mode: Generated citation file at 'crane with citation.jpg' \
             using text from file: crane.md"
        );
    }

    #[test]
    fn stats_serialise_with_kebab_stage_names() {
        let stats = ComposeStats {
            total_duration_ms: 1,
            stages: vec![StageTiming {
                stage: Stage::ResolveInput,
                elapsed_ms: 1,
            }],
        };
        let json = serde_json::to_string(&stats).unwrap();
        assert!(json.contains("\"resolve-input\""), "{json}");
    }
}
