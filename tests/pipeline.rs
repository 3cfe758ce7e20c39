//! Integration tests for the batch pipeline, driven through fake
//! rasterizer / extractor / writer collaborators so no pdfium library or
//! LLM credentials are needed.

use async_trait::async_trait;
use calamine::{open_workbook, Data, Reader, Xlsx};
use csb_extract::{
    export_records, flatten, process_batch, BatchProgressCallback, DocumentFailure, ExportConfig,
    ExportError, ExportOutcome, ExtractError, ExtractionConfig, Field, FieldExtractor, LineItem,
    PageImage, PageRasterizer, PartialRecord, ProcessingStatus, RasterizeError, Session,
    SourceDocument, SpreadsheetWriter, Table, XlsxWriter, COLUMNS,
};
use pretty_assertions::assert_eq;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

// ── Fakes ────────────────────────────────────────────────────────────────────

/// Renders each document to a scripted number of pages and records which
/// documents it was asked for. Page bytes carry `"<name>#<page>"` so the
/// extractor can tell pages apart.
#[derive(Default)]
struct ScriptedRasterizer {
    pages: HashMap<String, usize>,
    failing: Vec<String>,
    delays_ms: HashMap<String, u64>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedRasterizer {
    fn with_pages(mut self, name: &str, n: usize) -> Self {
        self.pages.insert(name.to_string(), n);
        self
    }

    fn failing_on(mut self, name: &str) -> Self {
        self.failing.push(name.to_string());
        self
    }

    fn delayed(mut self, name: &str, ms: u64) -> Self {
        self.delays_ms.insert(name.to_string(), ms);
        self
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl PageRasterizer for ScriptedRasterizer {
    async fn rasterize(&self, document: &SourceDocument) -> Result<Vec<PageImage>, RasterizeError> {
        self.calls.lock().unwrap().push(document.name.clone());

        if let Some(ms) = self.delays_ms.get(&document.name) {
            tokio::time::sleep(Duration::from_millis(*ms)).await;
        }
        if self.failing.contains(&document.name) {
            return Err(RasterizeError::CorruptPdf {
                path: document.path.clone(),
                detail: "xref table missing".to_string(),
            });
        }

        let n = self.pages.get(&document.name).copied().unwrap_or(1);
        Ok((1..=n)
            .map(|page_num| PageImage {
                page_num,
                width: 10,
                height: 10,
                jpeg: format!("{}#{}", document.name, page_num).into_bytes(),
            })
            .collect())
    }
}

/// Returns a scripted [`PartialRecord`] per `"<name>#<page>"` key; unscripted
/// pages yield an empty record.
#[derive(Default)]
struct ScriptedExtractor {
    pages: HashMap<String, Result<PartialRecord, String>>,
}

impl ScriptedExtractor {
    fn page(mut self, key: &str, record: PartialRecord) -> Self {
        self.pages.insert(key.to_string(), Ok(record));
        self
    }

    fn malformed(mut self, key: &str, raw: &str) -> Self {
        self.pages.insert(key.to_string(), Err(raw.to_string()));
        self
    }
}

#[async_trait]
impl FieldExtractor for ScriptedExtractor {
    async fn extract(&self, page: &PageImage) -> Result<PartialRecord, ExtractError> {
        let key = String::from_utf8_lossy(&page.jpeg).into_owned();
        match self.pages.get(&key) {
            Some(Ok(record)) => Ok(record.clone()),
            Some(Err(raw)) => Err(ExtractError::MalformedResponse {
                reason: "not JSON".to_string(),
                raw: raw.clone(),
            }),
            None => Ok(PartialRecord::default()),
        }
    }
}

/// Captures every table it is asked to write.
#[derive(Default)]
struct RecordingWriter {
    tables: Mutex<Vec<(Table, PathBuf)>>,
}

impl SpreadsheetWriter for RecordingWriter {
    fn write(&self, table: &Table, path: &Path) -> Result<(), ExportError> {
        self.tables
            .lock()
            .unwrap()
            .push((table.clone(), path.to_path_buf()));
        Ok(())
    }
}

#[derive(Default)]
struct EventLog(Mutex<Vec<String>>);

impl BatchProgressCallback for EventLog {
    fn on_batch_start(&self, total_documents: usize) {
        self.0.lock().unwrap().push(format!("start {total_documents}"));
    }
    fn on_document_start(&self, current: usize, _total: usize, name: &str) {
        self.0.lock().unwrap().push(format!("doc {current} {name}"));
    }
    fn on_page_extracted(&self, current: usize, page_num: usize, total_pages: usize) {
        self.0
            .lock()
            .unwrap()
            .push(format!("page {current} {page_num}/{total_pages}"));
    }
    fn on_document_complete(&self, current: usize, _total: usize, _name: &str, items: usize) {
        self.0.lock().unwrap().push(format!("done {current} {items}"));
    }
    fn on_batch_failed(&self, current: usize, name: &str, _message: &str) {
        self.0.lock().unwrap().push(format!("failed {current} {name}"));
    }
    fn on_batch_complete(&self, total_documents: usize) {
        self.0.lock().unwrap().push(format!("complete {total_documents}"));
    }
}

// ── Helpers ──────────────────────────────────────────────────────────────────

fn docs(names: &[&str]) -> Vec<SourceDocument> {
    names
        .iter()
        .map(|n| SourceDocument::from_path(format!("/bills/{n}")))
        .collect()
}

fn item(description: &str, quantity: i64) -> LineItem {
    LineItem {
        description: Field::Known(description.to_string()),
        quantity: Field::Known(quantity),
        ..Default::default()
    }
}

fn config_with_concurrency(n: usize) -> ExtractionConfig {
    ExtractionConfig::builder().concurrency(n).build().unwrap()
}

fn session(
    rasterizer: ScriptedRasterizer,
    extractor: ScriptedExtractor,
    writer: Arc<RecordingWriter>,
) -> Session {
    Session::new(
        Arc::new(rasterizer),
        Arc::new(extractor),
        writer,
        ExtractionConfig::default(),
        ExportConfig::default(),
    )
}

// ── Merge semantics through the batch ────────────────────────────────────────

#[tokio::test]
async fn later_pages_override_scalars_and_items_concatenate() {
    let rasterizer = ScriptedRasterizer::default().with_pages("bill.pdf", 3);
    let extractor = ScriptedExtractor::default()
        .page(
            "bill.pdf#1",
            PartialRecord {
                csb_number: Some("A".into()),
                consignor_name: Some("Acme Exports".into()),
                line_items: Some(vec![item("Widget", 1)]),
                ..Default::default()
            },
        )
        .page(
            "bill.pdf#2",
            PartialRecord {
                csb_number: Some("B".into()),
                line_items: Some(vec![item("Gadget", 2), item("Gizmo", 3)]),
                ..Default::default()
            },
        );

    let out = process_batch(
        &docs(&["bill.pdf"]),
        &rasterizer,
        &extractor,
        &ExtractionConfig::default(),
    )
    .await
    .unwrap();

    let record = &out.records[0];
    assert_eq!(record.csb_number, Field::Known("B".to_string()));
    assert_eq!(record.consignor_name, Field::Known("Acme Exports".to_string()));
    let descriptions: Vec<_> = record
        .line_items
        .iter()
        .map(|i| i.description.as_option().cloned())
        .collect();
    assert_eq!(
        descriptions,
        vec![
            Some("Widget".to_string()),
            Some("Gadget".to_string()),
            Some("Gizmo".to_string())
        ]
    );
    assert_eq!(out.stats.pages, 3);
    assert_eq!(out.stats.line_items, 3);
}

#[tokio::test]
async fn fields_no_page_reports_are_unknown() {
    let rasterizer = ScriptedRasterizer::default();
    let extractor = ScriptedExtractor::default().page(
        "only.pdf#1",
        PartialRecord {
            invoice_number: Some("INV-9".into()),
            ..Default::default()
        },
    );

    let out = process_batch(
        &docs(&["only.pdf"]),
        &rasterizer,
        &extractor,
        &ExtractionConfig::default(),
    )
    .await
    .unwrap();

    let record = &out.records[0];
    assert_eq!(record.file_name, "only.pdf");
    assert_eq!(record.invoice_number, Field::Known("INV-9".to_string()));
    assert!(record.csb_number.is_unknown());
    assert!(record.fob_value_inr.is_unknown());
    assert!(record.line_items.is_empty());
}

// ── Failure handling ─────────────────────────────────────────────────────────

#[tokio::test]
async fn failing_extraction_halts_the_batch() {
    let rasterizer = ScriptedRasterizer::default();
    let extractor = ScriptedExtractor::default()
        .page(
            "d1.pdf#1",
            PartialRecord {
                csb_number: Some("CSB-D1".into()),
                ..Default::default()
            },
        )
        .malformed("d2.pdf#1", "<html>502 Bad Gateway</html>");

    let err = process_batch(
        &docs(&["d1.pdf", "d2.pdf", "d3.pdf"]),
        &rasterizer,
        &extractor,
        &ExtractionConfig::default(),
    )
    .await
    .unwrap_err();

    assert_eq!(err.index, 1);
    assert_eq!(err.total, 3);
    assert_eq!(err.document, "d2.pdf");
    assert!(matches!(
        err.failure,
        DocumentFailure::Extract { page: 1, .. }
    ));
    assert_eq!(rasterizer.calls(), vec!["d1.pdf", "d2.pdf"]);
    assert_eq!(err.completed.len(), 1);
    assert_eq!(err.completed[0].csb_number, Field::Known("CSB-D1".to_string()));
    assert!(err.user_message().contains("d2.pdf"));
    assert!(err.user_message().ends_with("Stopping process."));
}

#[tokio::test]
async fn malformed_page_reports_its_page_number() {
    let rasterizer = ScriptedRasterizer::default().with_pages("scan.pdf", 3);
    let extractor = ScriptedExtractor::default().malformed("scan.pdf#2", "Sorry, I can't.");

    let err = process_batch(
        &docs(&["scan.pdf"]),
        &rasterizer,
        &extractor,
        &ExtractionConfig::default(),
    )
    .await
    .unwrap_err();

    match err.failure {
        DocumentFailure::Extract { page, ref source } => {
            assert_eq!(page, 2);
            assert!(matches!(source, ExtractError::MalformedResponse { .. }));
        }
        ref other => panic!("unexpected failure {other:?}"),
    }
    assert!(err.completed.is_empty());
}

#[tokio::test]
async fn concurrent_batch_keeps_input_order() {
    // The first document finishes last.
    let rasterizer = ScriptedRasterizer::default()
        .delayed("a.pdf", 60)
        .delayed("b.pdf", 30)
        .delayed("c.pdf", 5);
    let extractor = ScriptedExtractor::default();

    let out = process_batch(
        &docs(&["a.pdf", "b.pdf", "c.pdf"]),
        &rasterizer,
        &extractor,
        &config_with_concurrency(3),
    )
    .await
    .unwrap();

    let names: Vec<_> = out.records.iter().map(|r| r.file_name.as_str()).collect();
    assert_eq!(names, vec!["a.pdf", "b.pdf", "c.pdf"]);
}

#[tokio::test]
async fn concurrent_failure_reports_earliest_failing_document() {
    let rasterizer = ScriptedRasterizer::default()
        .delayed("a.pdf", 40)
        .failing_on("b.pdf")
        .failing_on("c.pdf");
    let extractor = ScriptedExtractor::default();

    let err = process_batch(
        &docs(&["a.pdf", "b.pdf", "c.pdf", "d.pdf"]),
        &rasterizer,
        &extractor,
        &config_with_concurrency(2),
    )
    .await
    .unwrap_err();

    assert_eq!(err.document, "b.pdf");
    assert!(matches!(
        err.failure,
        DocumentFailure::Rasterize(RasterizeError::CorruptPdf { .. })
    ));
    assert_eq!(err.completed.len(), 1);
    assert!(!rasterizer.calls().contains(&"d.pdf".to_string()));
}

// ── Progress reporting ───────────────────────────────────────────────────────

#[tokio::test]
async fn progress_events_follow_the_pipeline() {
    let log = Arc::new(EventLog::default());
    let config = ExtractionConfig::builder()
        .progress_callback(log.clone())
        .build()
        .unwrap();
    let rasterizer = ScriptedRasterizer::default().with_pages("x.pdf", 2);
    let extractor = ScriptedExtractor::default().page(
        "x.pdf#2",
        PartialRecord {
            line_items: Some(vec![item("Bolt", 10)]),
            ..Default::default()
        },
    );

    process_batch(&docs(&["x.pdf"]), &rasterizer, &extractor, &config)
        .await
        .unwrap();

    let events = log.0.lock().unwrap().clone();
    assert_eq!(
        events,
        vec![
            "start 1",
            "doc 1 x.pdf",
            "page 1 1/2",
            "page 1 2/2",
            "done 1 1",
            "complete 1",
        ]
    );
}

// ── Flatten and export ───────────────────────────────────────────────────────

#[tokio::test]
async fn two_page_bill_yields_one_row() {
    let rasterizer = ScriptedRasterizer::default().with_pages("csb.pdf", 2);
    let extractor = ScriptedExtractor::default()
        .page(
            "csb.pdf#1",
            PartialRecord {
                csb_number: Some("CSB123".into()),
                ..Default::default()
            },
        )
        .page(
            "csb.pdf#2",
            PartialRecord {
                line_items: Some(vec![item("Widget", 5)]),
                ..Default::default()
            },
        );

    let out = process_batch(
        &docs(&["csb.pdf"]),
        &rasterizer,
        &extractor,
        &ExtractionConfig::default(),
    )
    .await
    .unwrap();

    let record = &out.records[0];
    assert_eq!(record.csb_number, Field::Known("CSB123".to_string()));
    assert!(record.hawb_number.is_unknown());
    assert!(record.number_of_packages.is_unknown());
    assert_eq!(record.line_items.len(), 1);
    assert_eq!(record.line_items[0].quantity, Field::Known(5));
    assert!(record.line_items[0].sku.is_unknown());
    assert!(record.line_items[0].unit_price.is_unknown());

    let rows = flatten(&out.records);
    assert_eq!(rows.len(), 1);
    let text: Vec<String> = rows[0]
        .iter()
        .map(|c| c.display("N/A").into_owned())
        .collect();
    assert_eq!(text[0], "csb.pdf");
    assert_eq!(text[1], "CSB123");
    assert!(text[2..18].iter().all(|t| t == "N/A"));
    assert_eq!(text[18], "Widget");
    assert_eq!(text[19], "N/A");
    assert_eq!(text[21], "5");
}

#[tokio::test]
async fn row_count_is_sum_of_max_items_or_one() {
    let rasterizer = ScriptedRasterizer::default();
    let extractor = ScriptedExtractor::default()
        .page(
            "three.pdf#1",
            PartialRecord {
                line_items: Some(vec![item("a", 1), item("b", 1), item("c", 1)]),
                ..Default::default()
            },
        )
        .page("none.pdf#1", PartialRecord::default());

    let out = process_batch(
        &docs(&["three.pdf", "none.pdf"]),
        &rasterizer,
        &extractor,
        &ExtractionConfig::default(),
    )
    .await
    .unwrap();

    assert_eq!(flatten(&out.records).len(), 4);
}

#[test]
fn exporting_nothing_never_touches_the_writer() {
    let writer = RecordingWriter::default();
    let outcome = export_records(
        &[],
        Path::new("unused.xlsx"),
        &writer,
        &ExportConfig::default(),
    )
    .unwrap();

    assert_eq!(outcome, ExportOutcome::NoOp);
    assert!(writer.tables.lock().unwrap().is_empty());
}

// ── Session state machine ────────────────────────────────────────────────────

#[tokio::test]
async fn session_success_then_export() {
    let writer = Arc::new(RecordingWriter::default());
    let extractor = ScriptedExtractor::default().page(
        "ok.pdf#1",
        PartialRecord {
            hawb_number: Some("HAWB-1".into()),
            fob_value_inr: Some(Decimal::new(250_000, 2)),
            line_items: Some(vec![item("Tea", 5), item("Spice", 7)]),
            ..Default::default()
        },
    );
    let mut session = session(ScriptedRasterizer::default(), extractor, writer.clone());
    assert_eq!(session.status(), ProcessingStatus::Idle);

    let n = session.process(&docs(&["ok.pdf"])).await.unwrap();
    assert_eq!(n, 1);
    assert_eq!(session.status(), ProcessingStatus::Done);
    assert_eq!(session.error_message(), None);

    let summary = session.summary();
    assert_eq!(summary[0].hawb_number, "HAWB-1");
    assert_eq!(summary[0].fob_value_inr, "₹2500.00");
    assert_eq!(summary[0].items, 2);

    let outcome = session.export(Path::new("out.xlsx")).unwrap();
    assert_eq!(
        outcome,
        ExportOutcome::Written {
            path: PathBuf::from("out.xlsx"),
            rows: 2
        }
    );
    let tables = writer.tables.lock().unwrap();
    assert_eq!(tables.len(), 1);
    assert_eq!(tables[0].0.sheet_name, "Extracted Data");
    assert_eq!(tables[0].0.headers.len(), COLUMNS.len());
}

#[tokio::test]
async fn session_failure_discards_results() {
    let writer = Arc::new(RecordingWriter::default());
    let rasterizer = ScriptedRasterizer::default().failing_on("bad.pdf");
    let mut session = session(rasterizer, ScriptedExtractor::default(), writer.clone());

    session.process(&docs(&["good.pdf"])).await.unwrap();
    assert_eq!(session.records().len(), 1);

    let err = session
        .process(&docs(&["good.pdf", "bad.pdf"]))
        .await
        .unwrap_err();
    assert_eq!(err.completed.len(), 1);
    assert_eq!(session.status(), ProcessingStatus::Error);
    assert!(session.records().is_empty());
    assert_eq!(session.error_message(), Some(err.user_message().as_str()));

    let outcome = session.export(Path::new("out.xlsx")).unwrap();
    assert_eq!(outcome, ExportOutcome::NoOp);
    assert!(writer.tables.lock().unwrap().is_empty());
}

#[tokio::test]
async fn session_ignores_empty_selection() {
    let writer = Arc::new(RecordingWriter::default());
    let mut session = session(
        ScriptedRasterizer::default(),
        ScriptedExtractor::default(),
        writer,
    );

    assert_eq!(session.process(&[]).await.unwrap(), 0);
    assert_eq!(session.status(), ProcessingStatus::Idle);
}

// ── Real workbook ────────────────────────────────────────────────────────────

#[tokio::test]
async fn xlsx_readback_matches_flattened_rows() {
    let extractor = ScriptedExtractor::default().page(
        "wb.pdf#1",
        PartialRecord {
            csb_number: Some("CSB777".into()),
            declared_weight_kg: Some(Decimal::new(125, 1)),
            line_items: Some(vec![item("Saree", 4)]),
            ..Default::default()
        },
    );
    let out = process_batch(
        &docs(&["wb.pdf"]),
        &ScriptedRasterizer::default(),
        &extractor,
        &ExtractionConfig::default(),
    )
    .await
    .unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("bills.xlsx");
    let outcome = export_records(&out.records, &path, &XlsxWriter, &ExportConfig::default()).unwrap();
    assert!(matches!(outcome, ExportOutcome::Written { rows: 1, .. }));
    assert!(!path.with_extension("xlsx.tmp").exists());

    let mut workbook: Xlsx<_> = open_workbook(&path).unwrap();
    let range = workbook.worksheet_range("Extracted Data").unwrap();
    assert_eq!(range.height(), 2);
    assert_eq!(range.width(), COLUMNS.len());

    for (col, header) in COLUMNS.iter().enumerate() {
        assert_eq!(
            range.get((0, col)),
            Some(&Data::String(header.to_string()))
        );
    }
    assert_eq!(range.get((1, 0)), Some(&Data::String("wb.pdf".into())));
    assert_eq!(range.get((1, 1)), Some(&Data::String("CSB777".into())));
    assert_eq!(range.get((1, 2)), Some(&Data::String("N/A".into())));
    assert_eq!(range.get((1, 7)), Some(&Data::Float(12.5)));
    assert_eq!(range.get((1, 18)), Some(&Data::String("Saree".into())));
    assert_eq!(range.get((1, 21)), Some(&Data::Float(4.0)));
}
