//! Progress-callback trait for narration events.
//!
//! Inject an [`Arc<dyn NarrationProgressCallback>`] via
//! [`crate::config::NarrationConfigBuilder::progress_callback`] to receive
//! events as the pipeline extracts pages and drives the synthesizer.
//!
//! # Example
//!
//! ```rust
//! use lessonkit::{NarrationProgressCallback, NarrationConfig};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     pages: Arc<AtomicUsize>,
//! }
//!
//! impl NarrationProgressCallback for CountingCallback {
//!     fn on_page_extracted(&self, page_num: usize, total_pages: usize, chars: usize) {
//!         self.pages.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("Page {}/{}: {} chars", page_num, total_pages, chars);
//!     }
//! }
//!
//! let counter = Arc::new(CountingCallback {
//!     pages: Arc::new(AtomicUsize::new(0)),
//! });
//!
//! let config = NarrationConfig::builder()
//!     .progress_callback(counter as Arc<dyn NarrationProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use crate::config::Voice;
use std::sync::Arc;

/// Called by the narration pipeline at each stage boundary.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. Page events are emitted in page order after the
/// blocking extraction pass returns.
pub trait NarrationProgressCallback: Send + Sync {
    /// Called once before pages are read.
    ///
    /// # Arguments
    /// * `total_pages` — number of pages that will be read
    fn on_extraction_start(&self, total_pages: usize) {
        let _ = total_pages;
    }

    /// Called for every page that yielded text.
    ///
    /// # Arguments
    /// * `page_num`    — 1-indexed page number
    /// * `total_pages` — pages being read
    /// * `chars`       — raw characters extracted from the page
    fn on_page_extracted(&self, page_num: usize, total_pages: usize, chars: usize) {
        let _ = (page_num, total_pages, chars);
    }

    /// Called for every page that yielded no text.
    fn on_page_empty(&self, page_num: usize, total_pages: usize) {
        let _ = (page_num, total_pages);
    }

    /// Called once the cleaned text exists. `chars` is 0 for an unreadable document.
    fn on_text_ready(&self, chars: usize) {
        let _ = chars;
    }

    /// Called before the first synthesis attempt.
    fn on_synthesis_start(&self, voice: Voice, chars: usize) {
        let _ = (voice, chars);
    }

    /// Called when a synthesis attempt failed and another will follow.
    ///
    /// # Arguments
    /// * `attempt` — the attempt that failed (1-indexed)
    /// * `max`     — total attempts allowed
    /// * `error`   — human-readable error description
    fn on_synthesis_retry(&self, attempt: u32, max: u32, error: &str) {
        let _ = (attempt, max, error);
    }

    /// Called once with the outcome label (`narrated`, `no_readable_text`,
    /// `synthesis_failed`).
    fn on_narration_complete(&self, outcome: &str) {
        let _ = outcome;
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl NarrationProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::NarrationConfig`].
pub type ProgressCallback = Arc<dyn NarrationProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct TrackingCallback {
        extracted: AtomicUsize,
        empty: AtomicUsize,
        retries: AtomicUsize,
        outcome: Mutex<Option<String>>,
    }

    impl NarrationProgressCallback for TrackingCallback {
        fn on_page_extracted(&self, _page_num: usize, _total_pages: usize, _chars: usize) {
            self.extracted.fetch_add(1, Ordering::SeqCst);
        }

        fn on_page_empty(&self, _page_num: usize, _total_pages: usize) {
            self.empty.fetch_add(1, Ordering::SeqCst);
        }

        fn on_synthesis_retry(&self, _attempt: u32, _max: u32, _error: &str) {
            self.retries.fetch_add(1, Ordering::SeqCst);
        }

        fn on_narration_complete(&self, outcome: &str) {
            *self.outcome.lock().unwrap() = Some(outcome.to_string());
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_extraction_start(5);
        cb.on_page_extracted(1, 5, 42);
        cb.on_page_empty(2, 5);
        cb.on_text_ready(40);
        cb.on_synthesis_start(Voice::Aria, 40);
        cb.on_synthesis_retry(1, 3, "boom");
        cb.on_narration_complete("narrated");
    }

    #[test]
    fn tracking_callback_receives_events() {
        let tracker = TrackingCallback::default();
        tracker.on_page_extracted(1, 3, 100);
        tracker.on_page_empty(2, 3);
        tracker.on_page_extracted(3, 3, 10);
        tracker.on_synthesis_retry(1, 2, "timeout");
        tracker.on_narration_complete("synthesis_failed");

        assert_eq!(tracker.extracted.load(Ordering::SeqCst), 2);
        assert_eq!(tracker.empty.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.retries.load(Ordering::SeqCst), 1);
        assert_eq!(
            tracker.outcome.lock().unwrap().as_deref(),
            Some("synthesis_failed")
        );
    }

    #[test]
    fn arc_dyn_callback_works() {
        let cb: ProgressCallback = Arc::new(NoopProgressCallback);
        cb.on_extraction_start(10);
        cb.on_text_ready(0);
    }
}
