//! Tabular export: flatten records into rows and write an Excel workbook.
//!
//! Each record expands to one row per line item, every row repeating the
//! record's 18 document columns. A record without line items still gets one
//! row, with all 8 item columns unknown. Column order is fixed by
//! [`COLUMNS`].
//!
//! Writing is delegated to a [`SpreadsheetWriter`]; [`XlsxWriter`] is the
//! production backend. An empty row set never reaches the writer and is
//! reported as [`ExportOutcome::NoOp`].

use crate::config::ExportConfig;
use crate::error::ExportError;
use crate::record::{Field, LineItem, ShippingBillRecord};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_xlsxwriter::{Format, Workbook};
use std::borrow::Cow;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Number of document-level columns.
pub const DOCUMENT_COLUMNS: usize = 18;
/// Number of line-item columns.
pub const ITEM_COLUMNS: usize = 8;

/// Header row, in output order.
pub const COLUMNS: [&str; DOCUMENT_COLUMNS + ITEM_COLUMNS] = [
    "File Name",
    "CSB Number",
    "Filling Date",
    "Courier Reg. Number",
    "Courier Name",
    "HAWB Number",
    "Num. Packages",
    "Weight (Kg)",
    "Destination",
    "Consignor Name",
    "Consignor Address",
    "Consignee Name",
    "Consignee Address",
    "Invoice Number",
    "Invoice Date",
    "FOB Value (INR)",
    "FOB Value (Foreign)",
    "FOB Currency",
    "Item Description",
    "Item SKU",
    "Item CTSH",
    "Item Quantity",
    "Item Unit Price",
    "Item Currency",
    "Item Total Value",
    "Item UoM",
];

/// One spreadsheet cell.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Text(String),
    Integer(i64),
    Decimal(Decimal),
    Unknown,
}

impl Cell {
    /// Textual form, with unknown rendered as `marker`.
    pub fn display<'a>(&'a self, marker: &'a str) -> Cow<'a, str> {
        match self {
            Cell::Text(s) => Cow::Borrowed(s.as_str()),
            Cell::Integer(i) => Cow::Owned(i.to_string()),
            Cell::Decimal(d) => Cow::Owned(d.normalize().to_string()),
            Cell::Unknown => Cow::Borrowed(marker),
        }
    }
}

impl From<&Field<String>> for Cell {
    fn from(f: &Field<String>) -> Self {
        f.as_option().map_or(Cell::Unknown, |s| Cell::Text(s.clone()))
    }
}

impl From<&Field<i64>> for Cell {
    fn from(f: &Field<i64>) -> Self {
        f.as_option().map_or(Cell::Unknown, |v| Cell::Integer(*v))
    }
}

impl From<&Field<Decimal>> for Cell {
    fn from(f: &Field<Decimal>) -> Self {
        f.as_option().map_or(Cell::Unknown, |v| Cell::Decimal(*v))
    }
}

/// One flattened (record × line item) row; always [`COLUMNS`]`.len()` cells.
pub type Row = Vec<Cell>;

fn document_cells(r: &ShippingBillRecord) -> [Cell; DOCUMENT_COLUMNS] {
    [
        Cell::Text(r.file_name.clone()),
        (&r.csb_number).into(),
        (&r.filing_date).into(),
        (&r.courier_registration_number).into(),
        (&r.courier_name).into(),
        (&r.hawb_number).into(),
        (&r.number_of_packages).into(),
        (&r.declared_weight_kg).into(),
        (&r.airport_of_destination).into(),
        (&r.consignor_name).into(),
        (&r.consignor_address).into(),
        (&r.consignee_name).into(),
        (&r.consignee_address).into(),
        (&r.invoice_number).into(),
        (&r.invoice_date).into(),
        (&r.fob_value_inr).into(),
        (&r.fob_value_foreign).into(),
        (&r.fob_currency).into(),
    ]
}

fn item_cells(item: &LineItem) -> [Cell; ITEM_COLUMNS] {
    [
        (&item.description).into(),
        (&item.sku).into(),
        (&item.ctsh).into(),
        (&item.quantity).into(),
        (&item.unit_price).into(),
        (&item.unit_price_currency).into(),
        (&item.total_value).into(),
        (&item.unit_of_measure).into(),
    ]
}

/// Expand records into rows: one per line item, or one with unknown item
/// columns when a record has none.
pub fn flatten(records: &[ShippingBillRecord]) -> Vec<Row> {
    let mut rows = Vec::new();
    for record in records {
        let common = document_cells(record);
        if record.line_items.is_empty() {
            let mut row = common.to_vec();
            row.extend(std::iter::repeat_n(Cell::Unknown, ITEM_COLUMNS));
            rows.push(row);
        } else {
            for item in &record.line_items {
                let mut row = common.to_vec();
                row.extend(item_cells(item));
                rows.push(row);
            }
        }
    }
    rows
}

/// Per-column width: the longest cell text or header, plus `padding`.
pub fn column_widths(rows: &[Row], marker: &str, padding: usize) -> Vec<usize> {
    COLUMNS
        .iter()
        .enumerate()
        .map(|(col, header)| {
            let widest = rows
                .iter()
                .filter_map(|row| row.get(col))
                .map(|cell| cell.display(marker).chars().count())
                .max()
                .unwrap_or(0);
            widest.max(header.chars().count()) + padding
        })
        .collect()
}

/// Everything a writer needs to produce one worksheet.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub sheet_name: String,
    pub headers: Vec<String>,
    pub rows: Vec<Row>,
    pub column_widths: Vec<usize>,
    pub unknown_marker: String,
}

impl Table {
    pub fn new(rows: Vec<Row>, config: &ExportConfig) -> Self {
        let column_widths = column_widths(&rows, &config.unknown_marker, config.column_padding);
        Self {
            sheet_name: config.sheet_name.clone(),
            headers: COLUMNS.iter().map(|h| h.to_string()).collect(),
            rows,
            column_widths,
            unknown_marker: config.unknown_marker.clone(),
        }
    }
}

/// Serialises a [`Table`] to a file.
pub trait SpreadsheetWriter: Send + Sync {
    fn write(&self, table: &Table, path: &Path) -> Result<(), ExportError>;
}

/// What an export did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportOutcome {
    Written { path: PathBuf, rows: usize },
    /// Nothing to export; no file was written.
    NoOp,
}

/// Flatten `records` and hand the rows to `writer`.
pub fn export_records(
    records: &[ShippingBillRecord],
    path: &Path,
    writer: &dyn SpreadsheetWriter,
    config: &ExportConfig,
) -> Result<ExportOutcome, ExportError> {
    let rows = flatten(records);
    if rows.is_empty() {
        warn!("No data to export.");
        return Ok(ExportOutcome::NoOp);
    }

    let row_count = rows.len();
    let table = Table::new(rows, config);
    writer.write(&table, path)?;

    info!(
        "Exported {} rows from {} records to {}",
        row_count,
        records.len(),
        path.display()
    );
    Ok(ExportOutcome::Written {
        path: path.to_path_buf(),
        rows: row_count,
    })
}

/// Writes `.xlsx` workbooks with `rust_xlsxwriter`.
///
/// Unknown cells hold the table's marker text (left empty when the marker is
/// empty); numbers are written as numeric cells. The file is written to a
/// temporary sibling and renamed into place.
#[derive(Debug, Clone, Copy, Default)]
pub struct XlsxWriter;

impl XlsxWriter {
    fn render(&self, table: &Table) -> Result<Vec<u8>, rust_xlsxwriter::XlsxError> {
        let mut workbook = Workbook::new();
        let header_format = Format::new().set_bold();
        let sheet = workbook.add_worksheet();
        sheet.set_name(&table.sheet_name)?;

        for (col, header) in table.headers.iter().enumerate() {
            sheet.write_string_with_format(0, col as u16, header, &header_format)?;
        }
        for (col, width) in table.column_widths.iter().enumerate() {
            sheet.set_column_width(col as u16, *width as f64)?;
        }

        for (i, row) in table.rows.iter().enumerate() {
            let r = (i + 1) as u32;
            for (col, cell) in row.iter().enumerate() {
                let c = col as u16;
                match cell {
                    Cell::Text(s) => {
                        sheet.write_string(r, c, s)?;
                    }
                    Cell::Integer(v) => {
                        sheet.write_number(r, c, *v as f64)?;
                    }
                    Cell::Decimal(d) => match d.to_f64() {
                        Some(v) => {
                            sheet.write_number(r, c, v)?;
                        }
                        None => {
                            sheet.write_string(r, c, d.to_string())?;
                        }
                    },
                    Cell::Unknown if table.unknown_marker.is_empty() => {}
                    Cell::Unknown => {
                        sheet.write_string(r, c, &table.unknown_marker)?;
                    }
                }
            }
        }

        workbook.save_to_buffer()
    }
}

impl SpreadsheetWriter for XlsxWriter {
    fn write(&self, table: &Table, path: &Path) -> Result<(), ExportError> {
        let bytes = self
            .render(table)
            .map_err(|e| ExportError::Writer(e.to_string()))?;
        debug!("Workbook rendered: {} bytes", bytes.len());

        let write_err = |source| ExportError::OutputWriteFailed {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(write_err)?;
        }

        let tmp_path = path.with_extension("xlsx.tmp");
        std::fs::write(&tmp_path, &bytes).map_err(write_err)?;
        std::fs::rename(&tmp_path, path).map_err(write_err)?;
        Ok(())
    }
}
