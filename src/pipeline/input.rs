//! Input resolution: turn user-supplied paths into [`SourceDocument`]s.
//!
//! Directories are expanded to the PDFs they contain, sorted by file name so
//! that batch order is reproducible. Content validation (the `%PDF` magic
//! bytes) happens per document when it is rasterised, so a bad file halts the
//! batch at its own position rather than before the batch starts.

use crate::error::RasterizeError;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::debug;

/// One document selected for processing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceDocument {
    /// File name shown to the user and written to the `File Name` column.
    pub name: String,
    pub path: PathBuf,
}

impl SourceDocument {
    /// Build a document whose display name is the path's file name.
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Self { name, path }
    }
}

/// Expand files and directories into an ordered document list.
///
/// Explicit files are kept in the order given; each directory contributes
/// its `*.pdf` entries (case-insensitive extension) sorted by name.
pub fn resolve_inputs<P: AsRef<Path>>(inputs: &[P]) -> Result<Vec<SourceDocument>, RasterizeError> {
    let mut documents = Vec::new();

    for input in inputs {
        let path = input.as_ref();
        if !path.exists() {
            return Err(RasterizeError::FileNotFound {
                path: path.to_path_buf(),
            });
        }

        if path.is_dir() {
            let entries = std::fs::read_dir(path).map_err(|e| io_error(path, e))?;
            let mut pdfs: Vec<PathBuf> = entries
                .filter_map(|entry| entry.ok().map(|e| e.path()))
                .filter(|p| p.is_file() && has_pdf_extension(p))
                .collect();
            pdfs.sort();
            debug!("{}: {} PDFs", path.display(), pdfs.len());
            documents.extend(pdfs.into_iter().map(SourceDocument::from_path));
        } else {
            documents.push(SourceDocument::from_path(path));
        }
    }

    Ok(documents)
}

/// Verify the document is readable and starts with the PDF magic bytes.
pub fn validate_pdf(path: &Path) -> Result<(), RasterizeError> {
    let mut file = std::fs::File::open(path).map_err(|e| io_error(path, e))?;

    let mut magic = [0u8; 4];
    if file.read_exact(&mut magic).is_err() || &magic != b"%PDF" {
        return Err(RasterizeError::NotAPdf {
            path: path.to_path_buf(),
            magic,
        });
    }
    Ok(())
}

fn has_pdf_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("pdf"))
}

fn io_error(path: &Path, e: std::io::Error) -> RasterizeError {
    match e.kind() {
        std::io::ErrorKind::PermissionDenied => RasterizeError::PermissionDenied {
            path: path.to_path_buf(),
        },
        _ => RasterizeError::FileNotFound {
            path: path.to_path_buf(),
        },
    }
}
