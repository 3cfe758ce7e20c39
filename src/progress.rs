//! Progress-callback trait for batch extraction events.
//!
//! Inject an [`Arc<dyn BatchProgressCallback>`] via
//! [`crate::config::ExtractionConfigBuilder::progress_callback`] to receive
//! events as the orchestrator works through the documents. Callbacks carry
//! no logic; they exist so a front end (terminal progress bar, UI) can show
//! which document is being processed and why a batch stopped.
//!
//! # Example
//!
//! ```rust
//! use csb_extract::{BatchProgressCallback, ExtractionConfig};
//! use std::sync::Arc;
//!
//! struct Printer;
//!
//! impl BatchProgressCallback for Printer {
//!     fn on_document_start(&self, current: usize, total: usize, name: &str) {
//!         eprintln!("[{current}/{total}] {name}");
//!     }
//! }
//!
//! let config = ExtractionConfig::builder()
//!     .progress_callback(Arc::new(Printer))
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the batch orchestrator as it processes documents.
///
/// All methods have no-op defaults. With `concurrency > 1`, document events
/// may arrive from several documents interleaved.
pub trait BatchProgressCallback: Send + Sync {
    /// Called once before the first document is touched.
    fn on_batch_start(&self, total_documents: usize) {
        let _ = total_documents;
    }

    /// Called when work on a document begins.
    ///
    /// # Arguments
    /// * `current` — 1-indexed document position
    /// * `total`   — number of documents in the batch
    /// * `name`    — the document's file name
    fn on_document_start(&self, current: usize, total: usize, name: &str) {
        let _ = (current, total, name);
    }

    /// Called after each page's fields were extracted.
    fn on_page_extracted(&self, current: usize, page_num: usize, total_pages: usize) {
        let _ = (current, page_num, total_pages);
    }

    /// Called when a document has been merged and finalised.
    fn on_document_complete(&self, current: usize, total: usize, name: &str, line_items: usize) {
        let _ = (current, total, name, line_items);
    }

    /// Called once when the batch halts on a failing document.
    ///
    /// `message` is the generic end-user text, not the diagnostic detail.
    fn on_batch_failed(&self, current: usize, name: &str, message: &str) {
        let _ = (current, name, message);
    }

    /// Called once after every document finished successfully.
    fn on_batch_complete(&self, total_documents: usize) {
        let _ = total_documents;
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl BatchProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ExtractionConfig`].
pub type ProgressCallback = Arc<dyn BatchProgressCallback>;
