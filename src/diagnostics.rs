//! Diagnostic snapshot sink.
//!
//! Failures tear the session down immediately afterwards, so the snapshot
//! taken here is the only forensic evidence of what the page looked like.
//! The sink is append-only and never read back; capture problems are logged
//! and swallowed (the page may already be gone).

use crate::driver::WidgetSession;
use crate::flow::FlowStep;
use chrono::Local;
use std::path::{Path, PathBuf};

/// Writes timestamped PNG snapshots into a directory, one per failure
#[derive(Debug, Clone)]
pub struct SnapshotSink {
    dir: PathBuf,
}

impl SnapshotSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Capture the current page state, tagged with the failing step.
    ///
    /// File name format: `{step}_{YYYYMMDD_HHMMSS}.png`.
    pub async fn capture<S: WidgetSession + ?Sized>(&self, session: &mut S, step: FlowStep) {
        if let Err(e) = std::fs::create_dir_all(&self.dir) {
            log::warn!("could not create snapshot dir {}: {e}", self.dir.display());
            return;
        }

        let filename = format!("{}_{}.png", step.name(), Local::now().format("%Y%m%d_%H%M%S"));
        let path = self.dir.join(filename);

        match session.screenshot(&path).await {
            Ok(()) => log::info!("diagnostic snapshot saved: {}", path.display()),
            Err(e) => log::warn!("unable to capture diagnostic snapshot: {e}"),
        }
    }
}

impl Default for SnapshotSink {
    fn default() -> Self {
        Self::new("screenshots")
    }
}
