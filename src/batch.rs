//! Batch orchestration: documents in, one finalised record per document out.
//!
//! For each document, in input order:
//!
//! ```text
//! rasterize ──▶ extract page 1 ──▶ … ──▶ extract page N ──▶ merge ──▶ finalise
//! ```
//!
//! Pages of one document are always extracted one after another. Documents
//! are processed one at a time by default; `ExtractionConfig::concurrency`
//! allows a bounded number in flight. Either way results come back in input
//! order, and the first failing document (in input order) halts the batch:
//! nothing after it is started, and in-flight work is dropped.

use crate::config::ExtractionConfig;
use crate::error::{BatchError, DocumentFailure};
use crate::pipeline::extract::FieldExtractor;
use crate::pipeline::input::SourceDocument;
use crate::pipeline::merge::merge_pages;
use crate::pipeline::render::PageRasterizer;
use crate::record::{PartialRecord, ShippingBillRecord};
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, error, info};

/// Result of a batch that completed without failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchOutput {
    /// One record per input document, in input order.
    pub records: Vec<ShippingBillRecord>,
    pub stats: BatchStats,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchStats {
    pub documents: usize,
    pub pages: usize,
    pub line_items: usize,
    pub duration_ms: u64,
}

/// A finalised document plus how many pages it had.
struct ProcessedDocument {
    record: ShippingBillRecord,
    pages: usize,
}

/// Run the extraction pipeline over `documents`.
///
/// # Errors
/// Returns [`BatchError`] for the first document whose rasterisation or
/// extraction fails. Its `completed` field holds the records finalised before
/// it; callers decide whether to keep them.
pub async fn process_batch(
    documents: &[SourceDocument],
    rasterizer: &dyn PageRasterizer,
    extractor: &dyn FieldExtractor,
    config: &ExtractionConfig,
) -> Result<BatchOutput, BatchError> {
    let start = Instant::now();
    let total = documents.len();
    info!(
        "Starting batch: {} documents, concurrency {}",
        total, config.concurrency
    );

    if let Some(ref cb) = config.progress_callback {
        cb.on_batch_start(total);
    }

    // `buffered` yields in input order and only pulls the next document once
    // a slot is free, so with concurrency 1 a later document is never started
    // before an earlier one has finished.
    let mut results = stream::iter(documents.iter().enumerate())
        .map(|(index, doc)| async move {
            let outcome = process_document(index, total, doc, rasterizer, extractor, config).await;
            (index, doc, outcome)
        })
        .buffered(config.concurrency.max(1));

    let mut records = Vec::with_capacity(total);
    let mut stats = BatchStats::default();

    while let Some((index, doc, outcome)) = results.next().await {
        match outcome {
            Ok(processed) => {
                stats.pages += processed.pages;
                stats.line_items += processed.record.line_items.len();
                records.push(processed.record);
            }
            Err(failure) => {
                // Dropping the stream cancels documents still in flight.
                drop(results);
                error!("Failed to process {}: {}", doc.name, failure);

                let err = BatchError {
                    index,
                    total,
                    document: doc.name.clone(),
                    failure,
                    completed: records,
                };
                if let Some(ref cb) = config.progress_callback {
                    cb.on_batch_failed(index + 1, &doc.name, &err.user_message());
                }
                return Err(err);
            }
        }
    }

    stats.documents = records.len();
    stats.duration_ms = start.elapsed().as_millis() as u64;
    info!(
        "Batch complete: {} documents, {} pages, {} line items, {}ms",
        stats.documents, stats.pages, stats.line_items, stats.duration_ms
    );

    if let Some(ref cb) = config.progress_callback {
        cb.on_batch_complete(total);
    }

    Ok(BatchOutput { records, stats })
}

/// Rasterise, extract every page, merge, and finalise one document.
async fn process_document(
    index: usize,
    total: usize,
    doc: &SourceDocument,
    rasterizer: &dyn PageRasterizer,
    extractor: &dyn FieldExtractor,
    config: &ExtractionConfig,
) -> Result<ProcessedDocument, DocumentFailure> {
    let current = index + 1;
    info!("[{}/{}] {}", current, total, doc.name);
    if let Some(ref cb) = config.progress_callback {
        cb.on_document_start(current, total, &doc.name);
    }

    let images = rasterizer.rasterize(doc).await?;
    let page_count = images.len();
    debug!("{}: rendered {} pages", doc.name, page_count);

    let mut partials: Vec<PartialRecord> = Vec::with_capacity(page_count);
    for image in &images {
        let partial = extractor
            .extract(image)
            .await
            .map_err(|source| DocumentFailure::Extract {
                page: image.page_num,
                source,
            })?;
        if let Some(ref cb) = config.progress_callback {
            cb.on_page_extracted(current, image.page_num, page_count);
        }
        partials.push(partial);
    }
    drop(images);

    let record = ShippingBillRecord::from_merged(doc.name.clone(), merge_pages(partials));
    debug!(
        "{}: finalised with {} line items",
        doc.name,
        record.line_items.len()
    );

    if let Some(ref cb) = config.progress_callback {
        cb.on_document_complete(current, total, &doc.name, record.line_items.len());
    }

    Ok(ProcessedDocument {
        record,
        pages: page_count,
    })
}
