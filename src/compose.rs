//! Composition entry points and the stage sequence behind them.
//!
//! A run moves through
//!
//! ```text
//! Preflight → Inspect → Render → Crop → Rasterize → Scale → Composite | Emit → Cleanup
//! ```
//!
//! strictly in order (Inspect only in standard mode, Emit only in
//! citation-only mode). The first failing stage ends the run: nothing after it
//! executes, the scratch context is cleaned up, and that stage's error is
//! returned. Request resolution ([`crate::pipeline::input::resolve_request`])
//! happens before any of this, so a usage error never touches the toolchain.

use crate::config::ComposeConfig;
use crate::error::PhotociteError;
use crate::output::{CaptionMetrics, ComposeOutput, ComposeStats, StageTiming};
use crate::pipeline::composite::{self, FinalImage};
use crate::pipeline::encode::OutputEncoding;
use crate::pipeline::input::{ComposeRequest, Mode};
use crate::pipeline::inspect::{self, SourceImage};
use crate::pipeline::scale::{self, caption_width_limit};
use crate::pipeline::scratch::Scratch;
use crate::pipeline::{crop, raster, render, Stage};
use crate::progress::ProgressCallback;
use crate::tools::Toolchain;
use std::future::Future;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info};

/// Compose `request` with the real external programs.
///
/// # Errors
/// The error of the first stage that failed. See [`PhotociteError::stage`].
pub async fn compose(
    request: &ComposeRequest,
    config: &ComposeConfig,
) -> Result<ComposeOutput, PhotociteError> {
    let tools = Toolchain::system(config);
    compose_with(&tools, request, config).await
}

/// Synchronous wrapper around [`compose`].
///
/// Creates a temporary tokio runtime internally.
pub fn compose_sync(
    request: &ComposeRequest,
    config: &ComposeConfig,
) -> Result<ComposeOutput, PhotociteError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| PhotociteError::Internal(format!("Failed to create tokio runtime: {e}")))?
        .block_on(compose(request, config))
}

/// Compose `request` with an arbitrary toolchain.
pub async fn compose_with(
    tools: &Toolchain,
    request: &ComposeRequest,
    config: &ComposeConfig,
) -> Result<ComposeOutput, PhotociteError> {
    let started = Instant::now();
    let mut tracker = StageTracker::new(config.progress_callback.as_ref());

    info!(
        "Composing {} (citation from {})",
        request.output.display(),
        request.citation.source
    );
    if let Some(cb) = &config.progress_callback {
        cb.on_compose_start(request.mode.kind());
    }

    tracker
        .run(Stage::Preflight, async { tools.preflight() })
        .await?;

    let source = match &request.mode {
        Mode::Standard { image } => Some(
            tracker
                .run(Stage::Inspect, inspect::inspect_image(tools, image, config))
                .await?,
        ),
        Mode::CitationOnly => None,
    };

    let mut scratch = Scratch::new(config.scratch_root.as_deref(), config.keep_scratch)
        .map_err(|e| PhotociteError::Internal(format!("cannot create scratch directory: {e}")))?;

    let result = run_stages(
        tools,
        request,
        config,
        source.as_ref(),
        &mut scratch,
        &mut tracker,
    )
    .await;

    let cleanup_started = Instant::now();
    if let Some(cb) = &config.progress_callback {
        cb.on_stage_start(Stage::Cleanup);
    }
    scratch.cleanup();
    tracker.record(Stage::Cleanup, cleanup_started);

    let (final_image, caption) = result?;

    let stats = ComposeStats {
        total_duration_ms: started.elapsed().as_millis() as u64,
        stages: tracker.timings,
    };
    info!(
        "Wrote {} ({}x{}) in {}ms",
        final_image.path.display(),
        final_image.width,
        final_image.height,
        stats.total_duration_ms
    );
    if let Some(cb) = &config.progress_callback {
        cb.on_compose_complete(&final_image.path);
    }

    Ok(ComposeOutput {
        output_path: final_image.path,
        mode: request.mode.kind(),
        citation_source: request.citation.source.to_string(),
        width: final_image.width,
        height: final_image.height,
        caption,
        source,
        stats,
    })
}

/// Probe an image with the real `magick`, without composing anything.
pub async fn inspect(
    path: impl AsRef<Path>,
    config: &ComposeConfig,
) -> Result<SourceImage, PhotociteError> {
    let tools = Toolchain::system(config);
    inspect_with(&tools, path, config).await
}

/// Probe an image with an arbitrary toolchain.
pub async fn inspect_with(
    tools: &Toolchain,
    path: impl AsRef<Path>,
    config: &ComposeConfig,
) -> Result<SourceImage, PhotociteError> {
    tools
        .metadata
        .ensure_available()
        .map_err(|f| PhotociteError::from_tool(Stage::Preflight, f))?;
    inspect::inspect_image(tools, path.as_ref(), config).await
}

// ── Internal helpers ─────────────────────────────────────────────────────

async fn run_stages(
    tools: &Toolchain,
    request: &ComposeRequest,
    config: &ComposeConfig,
    source: Option<&SourceImage>,
    scratch: &mut Scratch,
    tracker: &mut StageTracker<'_>,
) -> Result<(FinalImage, CaptionMetrics), PhotociteError> {
    let (dpi, limit, quality) = match source {
        Some(src) => {
            let ratio = config.width_ratio(src.is_landscape());
            (
                src.density(),
                Some(caption_width_limit(src.width, ratio)),
                src.quality.unwrap_or(config.default_quality),
            )
        }
        None => (
            config.citation_only_dpi,
            config.max_caption_width,
            config.default_quality,
        ),
    };
    debug!(
        "Caption parameters: {} DPI, width limit {:?}, quality {}",
        dpi, limit, quality
    );

    let page = tracker
        .run(
            Stage::Render,
            render::render_citation(
                tools,
                &request.citation.text,
                request.template.as_deref(),
                scratch,
            ),
        )
        .await?;

    let cropped = tracker
        .run(
            Stage::Crop,
            crop::crop_page(tools, &page, config.crop_margin, scratch),
        )
        .await?;

    let raster = tracker
        .run(
            Stage::Rasterize,
            raster::rasterize_page(tools, &cropped, dpi, scratch),
        )
        .await?;

    let caption = tracker
        .run(
            Stage::Scale,
            scale::scale_caption(tools, &raster, limit, scratch),
        )
        .await?;

    let encoding = OutputEncoding::for_path(&request.output, quality, config.png_compression_level);
    let final_image = match source {
        Some(src) => {
            tracker
                .run(
                    Stage::Composite,
                    composite::composite(
                        tools,
                        src,
                        &caption,
                        config.caption_gap,
                        &encoding,
                        &request.output,
                        scratch,
                    ),
                )
                .await?
        }
        None => {
            tracker
                .run(
                    Stage::Emit,
                    composite::emit(tools, &caption, &encoding, &request.output, scratch),
                )
                .await?
        }
    };

    Ok((final_image, caption.metrics))
}

/// Times stages and forwards their events to the progress callback.
struct StageTracker<'a> {
    callback: Option<&'a ProgressCallback>,
    timings: Vec<StageTiming>,
}

impl<'a> StageTracker<'a> {
    fn new(callback: Option<&'a ProgressCallback>) -> Self {
        Self {
            callback,
            timings: Vec::new(),
        }
    }

    async fn run<T, F>(&mut self, stage: Stage, fut: F) -> Result<T, PhotociteError>
    where
        F: Future<Output = Result<T, PhotociteError>>,
    {
        let started = Instant::now();
        if let Some(cb) = self.callback {
            cb.on_stage_start(stage);
        }
        debug!("Stage {stage} started");

        match fut.await {
            Ok(value) => {
                self.record(stage, started);
                Ok(value)
            }
            Err(e) => {
                debug!("Stage {stage} failed: {e}");
                if let Some(cb) = self.callback {
                    cb.on_stage_error(stage, &e.to_string());
                }
                Err(e)
            }
        }
    }

    fn record(&mut self, stage: Stage, started: Instant) {
        let elapsed_ms = started.elapsed().as_millis() as u64;
        if let Some(cb) = self.callback {
            cb.on_stage_complete(stage, elapsed_ms);
        }
        self.timings.push(StageTiming { stage, elapsed_ms });
    }
}
