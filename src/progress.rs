//! Progress-callback trait for per-stage composition events.
//!
//! Inject an [`Arc<dyn ComposeProgressCallback>`] via
//! [`crate::config::ComposeConfigBuilder::progress_callback`] to receive
//! events as the pipeline moves through its stages. The CLI uses it to drive
//! a spinner; a GUI or a batch script could forward the same events anywhere
//! without the library knowing how the host reports progress.
//!
//! # Example
//!
//! ```rust
//! use photocite::{ComposeConfig, ComposeProgressCallback, Stage};
//! use std::sync::{Arc, Mutex};
//!
//! struct StageLog {
//!     seen: Mutex<Vec<Stage>>,
//! }
//!
//! impl ComposeProgressCallback for StageLog {
//!     fn on_stage_complete(&self, stage: Stage, elapsed_ms: u64) {
//!         self.seen.lock().unwrap().push(stage);
//!         eprintln!("{stage} done in {elapsed_ms}ms");
//!     }
//! }
//!
//! let log = Arc::new(StageLog { seen: Mutex::new(Vec::new()) });
//!
//! let config = ComposeConfig::builder()
//!     .progress_callback(log as Arc<dyn ComposeProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use crate::pipeline::input::ModeKind;
use crate::pipeline::Stage;
use std::path::Path;
use std::sync::Arc;

/// Called by the pipeline as it enters and leaves each stage.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. Stages run one after another, so calls never
/// overlap within a run, but the trait is `Send + Sync` so one callback can
/// be shared by runs on different threads.
pub trait ComposeProgressCallback: Send + Sync {
    /// Called once, after the request is resolved and before preflight.
    fn on_compose_start(&self, mode: ModeKind) {
        let _ = mode;
    }

    /// Called when a stage begins.
    fn on_stage_start(&self, stage: Stage) {
        let _ = stage;
    }

    /// Called when a stage finishes successfully.
    ///
    /// # Arguments
    /// * `stage`: the stage that finished
    /// * `elapsed_ms`: wall-clock time spent in it
    fn on_stage_complete(&self, stage: Stage, elapsed_ms: u64) {
        let _ = (stage, elapsed_ms);
    }

    /// Called when a stage fails. No further stage (except cleanup) follows.
    fn on_stage_error(&self, stage: Stage, error: &str) {
        let _ = (stage, error);
    }

    /// Called once after the output file is in place.
    fn on_compose_complete(&self, output: &Path) {
        let _ = output;
    }
}

/// A no-op implementation for callers that don't need progress events.
///
/// This is the default when no callback is configured.
pub struct NoopProgressCallback;

impl ComposeProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ComposeConfig`].
pub type ProgressCallback = Arc<dyn ComposeProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct TrackingCallback {
        starts: Arc<AtomicUsize>,
        completes: Arc<AtomicUsize>,
        errors: Arc<AtomicUsize>,
        finished: Arc<AtomicUsize>,
    }

    impl ComposeProgressCallback for TrackingCallback {
        fn on_stage_start(&self, _stage: Stage) {
            self.starts.fetch_add(1, Ordering::SeqCst);
        }

        fn on_stage_complete(&self, _stage: Stage, _elapsed_ms: u64) {
            self.completes.fetch_add(1, Ordering::SeqCst);
        }

        fn on_stage_error(&self, _stage: Stage, _error: &str) {
            self.errors.fetch_add(1, Ordering::SeqCst);
        }

        fn on_compose_complete(&self, _output: &Path) {
            self.finished.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_compose_start(ModeKind::Standard);
        cb.on_stage_start(Stage::Render);
        cb.on_stage_complete(Stage::Render, 42);
        cb.on_stage_error(Stage::Crop, "some error");
        cb.on_compose_complete(Path::new("out.jpg"));
    }

    #[test]
    fn tracking_callback_receives_events() {
        let tracker = TrackingCallback {
            starts: Arc::new(AtomicUsize::new(0)),
            completes: Arc::new(AtomicUsize::new(0)),
            errors: Arc::new(AtomicUsize::new(0)),
            finished: Arc::new(AtomicUsize::new(0)),
        };

        tracker.on_stage_start(Stage::Render);
        tracker.on_stage_complete(Stage::Render, 900);
        tracker.on_stage_start(Stage::Crop);
        tracker.on_stage_error(Stage::Crop, "Empty Bounding Box");

        assert_eq!(tracker.starts.load(Ordering::SeqCst), 2);
        assert_eq!(tracker.completes.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.errors.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.finished.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn arc_dyn_callback_works() {
        let cb: Arc<dyn ComposeProgressCallback> = Arc::new(NoopProgressCallback);
        cb.on_compose_start(ModeKind::CitationOnly);
        cb.on_stage_start(Stage::Emit);
        cb.on_stage_complete(Stage::Emit, 12);
    }
}
