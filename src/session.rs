//! The two user actions: "process selected documents" and "export".
//!
//! A [`Session`] owns the pipeline collaborators and the result of the last
//! completed batch, and walks the state machine
//! `Idle → Processing → (Done | Error)`. Export always works against the last
//! *completed* batch; records accumulated by a failed batch are not kept.

use crate::batch::{process_batch, BatchStats};
use crate::config::{ExportConfig, ExtractionConfig};
use crate::error::{BatchError, ExportError};
use crate::export::{export_records, ExportOutcome, SpreadsheetWriter};
use crate::pipeline::extract::FieldExtractor;
use crate::pipeline::input::SourceDocument;
use crate::pipeline::render::PageRasterizer;
use crate::record::ShippingBillRecord;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ProcessingStatus {
    #[default]
    Idle,
    Processing,
    Done,
    Error,
}

/// One line of the post-processing preview table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordSummary {
    pub file_name: String,
    pub csb_number: String,
    pub hawb_number: String,
    pub invoice_number: String,
    pub consignor: String,
    pub consignee: String,
    /// FOB value in INR with two decimals.
    pub fob_value_inr: String,
    pub items: usize,
}

pub struct Session {
    rasterizer: Arc<dyn PageRasterizer>,
    extractor: Arc<dyn FieldExtractor>,
    writer: Arc<dyn SpreadsheetWriter>,
    extraction: ExtractionConfig,
    export: ExportConfig,
    status: ProcessingStatus,
    records: Vec<ShippingBillRecord>,
    stats: Option<BatchStats>,
    error: Option<String>,
}

impl Session {
    pub fn new(
        rasterizer: Arc<dyn PageRasterizer>,
        extractor: Arc<dyn FieldExtractor>,
        writer: Arc<dyn SpreadsheetWriter>,
        extraction: ExtractionConfig,
        export: ExportConfig,
    ) -> Self {
        Self {
            rasterizer,
            extractor,
            writer,
            extraction,
            export,
            status: ProcessingStatus::Idle,
            records: Vec::new(),
            stats: None,
            error: None,
        }
    }

    pub fn status(&self) -> ProcessingStatus {
        self.status
    }

    /// Records of the last completed batch (empty after a failure).
    pub fn records(&self) -> &[ShippingBillRecord] {
        &self.records
    }

    pub fn stats(&self) -> Option<&BatchStats> {
        self.stats.as_ref()
    }

    /// End-user message of the last failure.
    pub fn error_message(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Run the batch over `documents`, replacing any previous results.
    ///
    /// An empty selection is ignored and leaves the session untouched.
    pub async fn process(&mut self, documents: &[SourceDocument]) -> Result<usize, BatchError> {
        if documents.is_empty() {
            return Ok(0);
        }

        self.status = ProcessingStatus::Processing;
        self.records.clear();
        self.stats = None;
        self.error = None;

        match process_batch(
            documents,
            self.rasterizer.as_ref(),
            self.extractor.as_ref(),
            &self.extraction,
        )
        .await
        {
            Ok(output) => {
                self.records = output.records;
                self.stats = Some(output.stats);
                self.status = ProcessingStatus::Done;
                Ok(self.records.len())
            }
            Err(err) => {
                self.error = Some(err.user_message());
                self.status = ProcessingStatus::Error;
                Err(err)
            }
        }
    }

    /// Export the last completed batch.
    ///
    /// Returns [`ExportOutcome::NoOp`] when there is nothing to export.
    pub fn export(&self, path: &Path) -> Result<ExportOutcome, ExportError> {
        if self.status == ProcessingStatus::Processing {
            return Ok(ExportOutcome::NoOp);
        }
        export_records(&self.records, path, self.writer.as_ref(), &self.export)
    }

    /// Preview rows for the last completed batch.
    pub fn summary(&self) -> Vec<RecordSummary> {
        self.records
            .iter()
            .map(|r| summarize(r, &self.export.unknown_marker))
            .collect()
    }
}

fn summarize(r: &ShippingBillRecord, marker: &str) -> RecordSummary {
    let na = |f: Option<&String>| f.cloned().unwrap_or_else(|| marker.to_string());
    RecordSummary {
        file_name: r.file_name.clone(),
        csb_number: na(r.csb_number.as_option()),
        hawb_number: na(r.hawb_number.as_option()),
        invoice_number: na(r.invoice_number.as_option()),
        consignor: na(r.consignor_name.as_option()),
        consignee: na(r.consignee_name.as_option()),
        fob_value_inr: r
            .fob_value_inr
            .as_option()
            .map(|v: &Decimal| format!("₹{:.2}", v))
            .unwrap_or_else(|| marker.to_string()),
        items: r.line_items.len(),
    }
}
