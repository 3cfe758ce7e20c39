//! # csb-extract
//!
//! Extract structured shipment data from scanned Courier Shipping Bill (CSB)
//! PDFs with a Vision Language Model, and export it to an Excel workbook.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDFs (in order)
//!  │
//!  ├─ 1. Render   each page → JPEG (pdfium, 1.5× scale, q90)
//!  ├─ 2. Extract  one VLM call per page → partial record
//!  ├─ 3. Merge    scalars: last page wins · line items: concatenated
//!  ├─ 4. Finalise absent fields → explicit Unknown
//!  └─ 5. Export   one row per (record × line item) → .xlsx
//! ```
//!
//! Documents and pages are processed one at a time by default, and the first
//! failing document halts the batch.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use csb_extract::{
//!     process_batch, resolve_inputs, export_records, ExportConfig, ExtractionConfig,
//!     PdfiumRasterizer, VisionExtractor, XlsxWriter,
//! };
//! use std::path::Path;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Provider auto-detected from GEMINI_API_KEY / OPENAI_API_KEY / …
//!     let config = ExtractionConfig::default();
//!     let documents = resolve_inputs(&["bills/"])?;
//!     let rasterizer = PdfiumRasterizer::from_config(&config);
//!     let extractor = VisionExtractor::from_config(&config)?;
//!
//!     let output = process_batch(&documents, &rasterizer, &extractor, &config).await?;
//!     export_records(
//!         &output.records,
//!         Path::new("extracted_shipping_data.xlsx"),
//!         &XlsxWriter,
//!         &ExportConfig::default(),
//!     )?;
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `csb2xlsx` binary (clap + anyhow + tracing-subscriber + indicatif) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod batch;
pub mod config;
pub mod error;
pub mod export;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod record;
pub mod session;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use batch::{process_batch, BatchOutput, BatchStats};
pub use config::{ExportConfig, ExtractionConfig, ExtractionConfigBuilder, DEFAULT_EXPORT_FILE};
pub use error::{BatchError, ConfigError, DocumentFailure, ExportError, ExtractError, RasterizeError};
pub use export::{export_records, flatten, Cell, ExportOutcome, SpreadsheetWriter, Table, XlsxWriter, COLUMNS};
pub use pipeline::encode::PageImage;
pub use pipeline::extract::{parse_response, FieldExtractor, VisionExtractor};
pub use pipeline::input::{resolve_inputs, SourceDocument};
pub use pipeline::merge::merge_pages;
pub use pipeline::render::{PageRasterizer, PdfiumRasterizer};
pub use progress::{BatchProgressCallback, NoopProgressCallback, ProgressCallback};
pub use record::{Field, LineItem, PartialRecord, ShippingBillRecord};
pub use session::{ProcessingStatus, RecordSummary, Session};
