//! Per-run scratch context.
//!
//! All intermediate artifacts of one run (Markdown, template, LaTeX source
//! and log, the PDF before and after cropping, both caption rasters) live in
//! a uniquely named `photocite-*` directory, so concurrent runs on the same
//! machine never collide. The partially written output file, which has to sit
//! next to the final output for an atomic rename, is tracked here too.
//!
//! [`Scratch::cleanup`] is idempotent and never fails: problems are logged and
//! swallowed so they cannot mask the error that ended the run. `Drop` calls it
//! as a backstop.

use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{debug, info, warn};

pub struct Scratch {
    dir: Option<TempDir>,
    path: PathBuf,
    tracked: Vec<PathBuf>,
    keep: bool,
}

impl Scratch {
    /// Create the run's directory, under `root` or the system temp dir.
    pub fn new(root: Option<&Path>, keep: bool) -> std::io::Result<Self> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("photocite-");
        let dir = match root {
            Some(root) => builder.tempdir_in(root)?,
            None => builder.tempdir()?,
        };
        let path = dir.path().to_path_buf();
        debug!("Scratch directory: {}", path.display());
        Ok(Self {
            dir: Some(dir),
            path,
            tracked: Vec::new(),
            keep,
        })
    }

    /// The scratch directory itself.
    pub fn dir(&self) -> &Path {
        &self.path
    }

    /// Path of a named artifact inside the scratch directory.
    pub fn file(&self, name: &str) -> PathBuf {
        self.path.join(name)
    }

    /// Register a file outside the directory that must go away on cleanup.
    pub fn track(&mut self, path: impl Into<PathBuf>) {
        self.tracked.push(path.into());
    }

    /// Stop tracking `path` (it became a real output).
    pub fn untrack(&mut self, path: &Path) {
        self.tracked.retain(|p| p != path);
    }

    /// Remove every artifact. Safe to call any number of times.
    pub fn cleanup(&mut self) {
        for path in self.tracked.drain(..) {
            match std::fs::remove_file(&path) {
                Ok(()) => debug!("Removed {}", path.display()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => warn!("Could not remove temporary file {}: {}", path.display(), e),
            }
        }

        let Some(dir) = self.dir.take() else {
            return;
        };
        if self.keep {
            let kept = dir.keep();
            info!("Keeping scratch directory {}", kept.display());
            return;
        }
        if let Err(e) = dir.close() {
            warn!(
                "Could not remove scratch directory {}: {}",
                self.path.display(),
                e
            );
        }
    }
}

impl Drop for Scratch {
    fn drop(&mut self) {
        self.cleanup();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cleanup_removes_directory_and_tracked_files() {
        let root = tempfile::tempdir().unwrap();
        let mut scratch = Scratch::new(Some(root.path()), false).unwrap();
        let inner = scratch.file("citation.md");
        std::fs::write(&inner, "text").unwrap();
        let outside = root.path().join(".out.partial.png");
        std::fs::write(&outside, "partial").unwrap();
        scratch.track(&outside);

        let dir = scratch.dir().to_path_buf();
        assert!(dir.starts_with(root.path()));
        assert!(dir
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("photocite-"));

        scratch.cleanup();
        assert!(!dir.exists());
        assert!(!outside.exists());

        // Second call is a no-op.
        scratch.cleanup();
        assert_eq!(std::fs::read_dir(root.path()).unwrap().count(), 0);
    }

    #[test]
    fn untracked_file_survives() {
        let root = tempfile::tempdir().unwrap();
        let mut scratch = Scratch::new(Some(root.path()), false).unwrap();
        let out = root.path().join("final.png");
        std::fs::write(&out, "done").unwrap();
        scratch.track(&out);
        scratch.untrack(&out);
        scratch.cleanup();
        assert!(out.exists());
    }

    #[test]
    fn keep_leaves_directory_in_place() {
        let root = tempfile::tempdir().unwrap();
        let mut scratch = Scratch::new(Some(root.path()), true).unwrap();
        let dir = scratch.dir().to_path_buf();
        scratch.cleanup();
        assert!(dir.exists());
    }

    #[test]
    fn unique_per_run() {
        let root = tempfile::tempdir().unwrap();
        let a = Scratch::new(Some(root.path()), false).unwrap();
        let b = Scratch::new(Some(root.path()), false).unwrap();
        assert_ne!(a.dir(), b.dir());
    }

    #[test]
    fn drop_cleans_up() {
        let root = tempfile::tempdir().unwrap();
        let dir = {
            let scratch = Scratch::new(Some(root.path()), false).unwrap();
            scratch.dir().to_path_buf()
        };
        assert!(!dir.exists());
    }
}
