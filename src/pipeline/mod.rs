//! Pipeline stages for shipping-bill extraction.
//!
//! Each submodule implements exactly one step, so each is independently
//! testable and the two external collaborators (rasteriser, extractor) sit
//! behind traits that tests can replace.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ render ──▶ encode ──▶ extract ──▶ merge
//! (paths)   (pdfium)   (JPEG)     (VLM/page)  (per document)
//! ```
//!
//! 1. [`input`]   — expand user paths into ordered [`input::SourceDocument`]s
//! 2. [`render`]  — rasterise every page; runs in `spawn_blocking` because
//!    pdfium is not async-safe
//! 3. [`encode`]  — JPEG-encode each page and base64-wrap it for the API
//! 4. [`extract`] — one VLM call per page, reply validated against the schema
//! 5. [`merge`]   — fold page results into one record (scalars: last wins,
//!    line items: concatenated)

pub mod encode;
pub mod extract;
pub mod input;
pub mod merge;
pub mod render;
