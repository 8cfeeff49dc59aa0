//! Progress-callback trait for per-report run events.
//!
//! Inject an [`Arc<dyn RunProgressCallback>`] via
//! [`crate::config::RunConfigBuilder::progress_callback`] to receive events
//! as the pipeline works through each report. The binary uses it to drive an
//! `indicatif` progress bar; library users can forward events anywhere.
//!
//! # Example
//!
//! ```rust
//! use aqreports::{RunConfig, RunProgressCallback};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     cleaned: AtomicUsize,
//! }
//!
//! impl RunProgressCallback for CountingCallback {
//!     fn on_report_complete(&self, name: &str, rows: usize) {
//!         self.cleaned.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("{name}: {rows} rows");
//!     }
//! }
//!
//! let cb = Arc::new(CountingCallback { cleaned: AtomicUsize::new(0) });
//! let config = RunConfig::builder()
//!     .progress_callback(cb as Arc<dyn RunProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the pipeline as it processes each report.
///
/// All methods have default no-op implementations so callers only override
/// what they care about.
pub trait RunProgressCallback: Send + Sync {
    /// Called once the report list is known (after harvesting or listing).
    fn on_run_start(&self, total_reports: usize) {
        let _ = total_reports;
    }

    /// Called before a report is downloaded or opened.
    ///
    /// * `index`: 1-indexed position in the run
    fn on_report_start(&self, name: &str, index: usize, total_reports: usize) {
        let _ = (name, index, total_reports);
    }

    /// Called when a report produced a cleaned table of `rows` rows.
    fn on_report_complete(&self, name: &str, rows: usize) {
        let _ = (name, rows);
    }

    /// Called when a report failed at any stage.
    fn on_report_error(&self, name: &str, error: &str) {
        let _ = (name, error);
    }

    /// Called once after the final dataset has been written.
    fn on_run_complete(&self, total_reports: usize, success_count: usize) {
        let _ = (total_reports, success_count);
    }
}

/// Shared progress callback handle.
pub type ProgressCallback = Arc<dyn RunProgressCallback>;

/// A callback that ignores every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopProgressCallback;

impl RunProgressCallback for NoopProgressCallback {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct TrackingCallback {
        starts: AtomicUsize,
        completes: AtomicUsize,
        errors: AtomicUsize,
        completed_total: AtomicUsize,
    }

    impl RunProgressCallback for TrackingCallback {
        fn on_report_start(&self, _name: &str, _index: usize, _total: usize) {
            self.starts.fetch_add(1, Ordering::SeqCst);
        }

        fn on_report_complete(&self, _name: &str, _rows: usize) {
            self.completes.fetch_add(1, Ordering::SeqCst);
        }

        fn on_report_error(&self, _name: &str, _error: &str) {
            self.errors.fetch_add(1, Ordering::SeqCst);
        }

        fn on_run_complete(&self, _total: usize, success_count: usize) {
            self.completed_total.store(success_count, Ordering::SeqCst);
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_run_start(3);
        cb.on_report_start("Jan2020.pdf", 1, 3);
        cb.on_report_complete("Jan2020.pdf", 31);
        cb.on_report_error("Feb2020.pdf", "no month");
        cb.on_run_complete(3, 2);
    }

    #[test]
    fn tracking_callback_receives_events() {
        let tracker = TrackingCallback {
            starts: AtomicUsize::new(0),
            completes: AtomicUsize::new(0),
            errors: AtomicUsize::new(0),
            completed_total: AtomicUsize::new(0),
        };

        tracker.on_report_start("a.pdf", 1, 2);
        tracker.on_report_complete("a.pdf", 30);
        tracker.on_report_start("b.pdf", 2, 2);
        tracker.on_report_error("b.pdf", "OCR failed");
        tracker.on_run_complete(2, 1);

        assert_eq!(tracker.starts.load(Ordering::SeqCst), 2);
        assert_eq!(tracker.completes.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.errors.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.completed_total.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn arc_dyn_callback_works() {
        let cb: ProgressCallback = Arc::new(NoopProgressCallback);
        cb.on_run_start(10);
        cb.on_report_complete("x.pdf", 1);
    }
}
