//! Progress-callback trait for import and export.
//!
//! Inject an [`Arc<dyn SessionProgressCallback>`] via
//! [`crate::config::ImportConfigBuilder::progress_callback`] or
//! [`crate::config::ExportConfigBuilder::progress_callback`] to receive a
//! percentage plus a short status line as pages are processed, and every
//! non-fatal [`PageError`] as it happens.
//!
//! Percentages follow a fixed schedule so a progress bar moves smoothly
//! across a whole batch:
//!
//! ```text
//! import: 10 (decode) ─▶ 10 + done/total·85 ─▶ 95 ─▶ 100 ─▶ (delay) ─▶ 0
//! export: i/total·90 per page ─▶ 95 (finalize) ─▶ 100 ─▶ (delay) ─▶ 0
//! ```
//!
//! # Example
//!
//! ```rust
//! use notecypher::{ImportConfig, SessionProgressCallback};
//! use std::sync::Arc;
//!
//! struct Printer;
//!
//! impl SessionProgressCallback for Printer {
//!     fn on_progress(&self, percent: f32, status: &str) {
//!         eprintln!("{percent:>5.1}% {status}");
//!     }
//! }
//!
//! let config = ImportConfig::builder()
//!     .progress_callback(Arc::new(Printer) as Arc<dyn SessionProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use crate::error::PageError;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Called by the import and export pipelines as they advance.
///
/// Implementations must be `Send + Sync`: rendering and compositing run on a
/// blocking worker thread and the final reset to 0 fires from a timer task.
/// All methods have default no-op implementations.
pub trait SessionProgressCallback: Send + Sync {
    /// Overall completion in percent (0–100) with a human-readable status.
    fn on_progress(&self, percent: f32, status: &str) {
        let _ = (percent, status);
    }

    /// A file or page was skipped.
    fn on_page_error(&self, error: &PageError) {
        let _ = error;
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl SessionProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in the configs.
pub type ProgressCallback = Arc<dyn SessionProgressCallback>;

/// Thin wrapper that tolerates an absent callback and remembers the last
/// percentage so a status change can be reported without moving the bar.
#[derive(Clone, Default)]
pub(crate) struct Reporter {
    callback: Option<ProgressCallback>,
    last: Arc<AtomicU32>,
}

impl Reporter {
    pub(crate) fn new(callback: Option<ProgressCallback>) -> Self {
        Self {
            callback,
            last: Arc::default(),
        }
    }

    pub(crate) fn report(&self, percent: f32, status: impl AsRef<str>) {
        let percent = percent.clamp(0.0, 100.0);
        self.last.store(percent.to_bits(), Ordering::Relaxed);
        if let Some(ref cb) = self.callback {
            cb.on_progress(percent, status.as_ref());
        }
    }

    /// Replace the status line, keeping the current percentage.
    pub(crate) fn status(&self, status: impl AsRef<str>) {
        self.report(self.percent(), status);
    }

    pub(crate) fn percent(&self) -> f32 {
        f32::from_bits(self.last.load(Ordering::Relaxed))
    }

    pub(crate) fn page_error(&self, error: &PageError) {
        if let Some(ref cb) = self.callback {
            cb.on_page_error(error);
        }
    }

    /// Reset progress to 0 after `delay` without blocking the caller.
    ///
    /// Must be called from within a Tokio runtime.
    pub(crate) fn settle_after(&self, delay: Duration) {
        let Some(cb) = self.callback.clone() else {
            return;
        };
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            debug!("progress reset after {:?}", delay);
            cb.on_progress(0.0, "");
        });
    }
}

/// Import percentage after `done` of `total` pages have been attempted.
pub(crate) fn import_percent(done: usize, total: usize) -> f32 {
    if total == 0 {
        return 95.0;
    }
    10.0 + (done as f32 / total as f32) * 85.0
}

/// Export percentage after `done` of `total` pages have been placed.
pub(crate) fn export_percent(done: usize, total: usize) -> f32 {
    if total == 0 {
        return 90.0;
    }
    (done as f32 / total as f32) * 90.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recording {
        events: Mutex<Vec<f32>>,
        errors: Mutex<Vec<PageError>>,
    }

    impl SessionProgressCallback for Recording {
        fn on_progress(&self, percent: f32, _status: &str) {
            self.events.lock().unwrap().push(percent);
        }

        fn on_page_error(&self, error: &PageError) {
            self.errors.lock().unwrap().push(error.clone());
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_progress(50.0, "halfway");
        cb.on_page_error(&PageError::CacheMiss {
            file: "a.pdf".into(),
            page: 1,
        });
    }

    #[test]
    fn schedule_endpoints() {
        assert_eq!(import_percent(0, 4), 10.0);
        assert_eq!(import_percent(2, 4), 52.5);
        assert_eq!(import_percent(4, 4), 95.0);
        assert_eq!(import_percent(0, 0), 95.0);
        assert_eq!(export_percent(0, 3), 0.0);
        assert_eq!(export_percent(3, 3), 90.0);
    }

    #[test]
    fn reporter_clamps_and_forwards() {
        let rec = Arc::new(Recording::default());
        let reporter = Reporter::new(Some(rec.clone() as ProgressCallback));
        reporter.report(140.0, "over");
        reporter.report(-3.0, "under");
        reporter.page_error(&PageError::DecodeFailed {
            file: "x.pdf".into(),
            detail: "bad xref".into(),
        });
        assert_eq!(*rec.events.lock().unwrap(), vec![100.0, 0.0]);
        assert_eq!(rec.errors.lock().unwrap().len(), 1);
    }

    #[test]
    fn status_keeps_last_percent() {
        let rec = Arc::new(Recording::default());
        let reporter = Reporter::new(Some(rec.clone() as ProgressCallback));
        let worker = reporter.clone();
        worker.report(42.5, "Processing page 3 of 7...");
        reporter.status("Error occurred");
        assert_eq!(*rec.events.lock().unwrap(), vec![42.5, 42.5]);
        assert_eq!(reporter.percent(), 42.5);
    }

    #[test]
    fn absent_callback_is_silent() {
        let reporter = Reporter::default();
        reporter.report(10.0, "nothing listens");
    }

    #[tokio::test]
    async fn settle_resets_to_zero() {
        let rec = Arc::new(Recording::default());
        let reporter = Reporter::new(Some(rec.clone() as ProgressCallback));
        reporter.report(100.0, "Ready!");
        reporter.settle_after(Duration::from_millis(5));
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(*rec.events.lock().unwrap(), vec![100.0, 0.0]);
    }
}
