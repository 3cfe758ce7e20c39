//! Page rasterisation: render every page of a PDF to a JPEG via pdfium.
//!
//! [`PageRasterizer`] is the seam the batch orchestrator depends on;
//! [`PdfiumRasterizer`] is the production implementation. Tests substitute
//! their own rasterizer so the pipeline can be exercised without pdfium.
//!
//! ## Why spawn_blocking?
//!
//! pdfium uses thread-local state and is CPU-bound, so the whole render of a
//! document runs on tokio's blocking pool. The async caller only awaits the
//! finished page list, which keeps the runtime responsive.

use crate::config::ExtractionConfig;
use crate::error::RasterizeError;
use crate::pipeline::encode::{self, PageImage};
use crate::pipeline::input::{validate_pdf, SourceDocument};
use async_trait::async_trait;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Converts one source document into its ordered page images.
#[async_trait]
pub trait PageRasterizer: Send + Sync {
    async fn rasterize(&self, document: &SourceDocument) -> Result<Vec<PageImage>, RasterizeError>;
}

/// Renders pages with pdfium at a fixed scale and JPEG quality.
#[derive(Debug, Clone)]
pub struct PdfiumRasterizer {
    scale: f32,
    quality: f32,
    password: Option<String>,
    library_path: Option<PathBuf>,
}

impl PdfiumRasterizer {
    pub fn new(scale: f32, quality: f32) -> Self {
        Self {
            scale,
            quality,
            password: None,
            library_path: std::env::var_os("PDFIUM_LIB_PATH").map(PathBuf::from),
        }
    }

    pub fn from_config(config: &ExtractionConfig) -> Self {
        Self {
            password: config.password.clone(),
            ..Self::new(config.render_scale, config.jpeg_quality)
        }
    }

    /// Bind to this pdfium library instead of the system one.
    pub fn with_library_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.library_path = Some(path.into());
        self
    }
}

#[async_trait]
impl PageRasterizer for PdfiumRasterizer {
    async fn rasterize(&self, document: &SourceDocument) -> Result<Vec<PageImage>, RasterizeError> {
        let path = document.path.clone();
        let this = self.clone();

        tokio::task::spawn_blocking(move || this.render_blocking(&path))
            .await
            .map_err(|e| RasterizeError::Internal(format!("Render task panicked: {}", e)))?
    }
}

impl PdfiumRasterizer {
    fn render_blocking(&self, pdf_path: &Path) -> Result<Vec<PageImage>, RasterizeError> {
        validate_pdf(pdf_path)?;

        let pdfium = self.bind()?;
        let password = self.password.as_deref();

        let document = pdfium.load_pdf_from_file(pdf_path, password).map_err(|e| {
            let err_str = format!("{:?}", e);
            if err_str.contains("Password") || err_str.contains("password") {
                if password.is_some() {
                    RasterizeError::WrongPassword {
                        path: pdf_path.to_path_buf(),
                    }
                } else {
                    RasterizeError::PasswordRequired {
                        path: pdf_path.to_path_buf(),
                    }
                }
            } else {
                RasterizeError::CorruptPdf {
                    path: pdf_path.to_path_buf(),
                    detail: err_str,
                }
            }
        })?;

        let pages = document.pages();
        info!("{}: {} pages", pdf_path.display(), pages.len());

        let render_config = PdfRenderConfig::new().scale_page_by_factor(self.scale);
        let mut results = Vec::with_capacity(pages.len() as usize);

        for (idx, page) in pages.iter().enumerate() {
            let page_num = idx + 1;
            let bitmap = page.render_with_config(&render_config).map_err(|e| {
                RasterizeError::PageFailed {
                    page: page_num,
                    detail: format!("{:?}", e),
                }
            })?;

            let image = bitmap.as_image();
            debug!(
                "Rendered page {} → {}x{} px",
                page_num,
                image.width(),
                image.height()
            );

            let encoded = encode::encode_page(page_num, &image, self.quality)
                .map_err(|source| RasterizeError::Encode {
                    page: page_num,
                    source,
                })?;
            results.push(encoded);
        }

        Ok(results)
    }

    fn bind(&self) -> Result<Pdfium, RasterizeError> {
        let bindings = match &self.library_path {
            Some(path) => Pdfium::bind_to_library(path),
            None => Pdfium::bind_to_system_library(),
        }
        .map_err(|e| RasterizeError::PdfiumBindingFailed(format!("{:?}", e)))?;

        Ok(Pdfium::new(bindings))
    }
}
