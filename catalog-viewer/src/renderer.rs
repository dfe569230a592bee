use std::path::PathBuf;

use image::RgbaImage;
use pdfium_render::prelude::*;
use tracing::debug;

use crate::error::RenderError;
use crate::surface::PageSize;

/// An opened vector document. Page indices are 1-based.
pub trait VectorDocument {
    fn page_count(&self) -> usize;

    /// Page size in points
    fn page_size(&self, page: usize) -> Result<PageSize, RenderError>;

    /// Render a page at `scale` pixels per point
    fn render_page(&self, page: usize, scale: f32) -> Result<RgbaImage, RenderError>;
}

/// Opens original documents for client-side rendering
pub trait VectorBackend: Send + Sync + 'static {
    /// Open `bytes` and run `f` against the document while it is open
    fn with_document<R>(
        &self,
        bytes: &[u8],
        f: impl FnOnce(&dyn VectorDocument) -> R,
    ) -> Result<R, RenderError>;
}

const LOCAL_LIBRARY_DIR: &str = "./";

/// PDF backend using pdfium-render
#[derive(Debug, Clone, Default)]
pub struct PdfiumBackend {
    library_dir: Option<PathBuf>,
}

impl PdfiumBackend {
    pub fn new(library_dir: Option<PathBuf>) -> Self {
        Self { library_dir }
    }

    /// Directories searched for the PDFium library before the system one
    fn search_dirs(&self) -> Vec<String> {
        let mut dirs: Vec<String> = self
            .library_dir
            .iter()
            .map(|dir| dir.to_string_lossy().into_owned())
            .collect();
        if !dirs.iter().any(|dir| dir == LOCAL_LIBRARY_DIR) {
            dirs.push(LOCAL_LIBRARY_DIR.to_string());
        }
        dirs
    }

    fn bind(&self) -> Result<Pdfium, RenderError> {
        for dir in self.search_dirs() {
            let path = Pdfium::pdfium_platform_library_name_at_path(dir.as_str());
            match Pdfium::bind_to_library(path) {
                Ok(bindings) => return Ok(Pdfium::new(bindings)),
                Err(e) => debug!("no PDFium library in {}: {}", dir, e),
            }
        }
        let bindings = Pdfium::bind_to_system_library().map_err(|e| {
            RenderError::Bind(format!(
                "failed to bind to the PDFium library ({e}); install PDFium or download it from https://github.com/bblanchon/pdfium-binaries"
            ))
        })?;
        Ok(Pdfium::new(bindings))
    }
}

impl VectorBackend for PdfiumBackend {
    fn with_document<R>(
        &self,
        bytes: &[u8],
        f: impl FnOnce(&dyn VectorDocument) -> R,
    ) -> Result<R, RenderError> {
        let pdfium = self.bind()?;
        let document = pdfium
            .load_pdf_from_byte_slice(bytes, None)
            .map_err(|e| RenderError::Open(e.to_string()))?;
        let document = PdfiumDocument { inner: document };
        Ok(f(&document))
    }
}

struct PdfiumDocument<'a> {
    inner: PdfDocument<'a>,
}

impl std::fmt::Debug for PdfiumDocument<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PdfiumDocument")
            .field("page_count", &self.page_count())
            .finish()
    }
}

impl PdfiumDocument<'_> {
    fn page(&self, page: usize) -> Result<PdfPage<'_>, RenderError> {
        let out_of_bounds = || RenderError::Page {
            page,
            reason: "page index out of bounds".to_string(),
        };
        let index = page
            .checked_sub(1)
            .and_then(|i| u16::try_from(i).ok())
            .ok_or_else(out_of_bounds)?;
        self.inner.pages().get(index).map_err(|e| RenderError::Page {
            page,
            reason: e.to_string(),
        })
    }
}

impl VectorDocument for PdfiumDocument<'_> {
    fn page_count(&self) -> usize {
        self.inner.pages().len() as usize
    }

    fn page_size(&self, page: usize) -> Result<PageSize, RenderError> {
        let pdf_page = self.page(page)?;
        Ok(PageSize::new(pdf_page.width().value, pdf_page.height().value))
    }

    fn render_page(&self, page: usize, scale: f32) -> Result<RgbaImage, RenderError> {
        let pdf_page = self.page(page)?;

        let render_width = (pdf_page.width().value * scale).round().max(1.0) as i32;
        let render_height = (pdf_page.height().value * scale).round().max(1.0) as i32;

        let render_config = PdfRenderConfig::new()
            .set_target_width(render_width)
            .set_maximum_height(render_height);

        let bitmap = pdf_page
            .render_with_config(&render_config)
            .map_err(|e| RenderError::Page {
                page,
                reason: e.to_string(),
            })?;

        RgbaImage::from_raw(
            bitmap.width() as u32,
            bitmap.height() as u32,
            bitmap.as_rgba_bytes(),
        )
        .ok_or_else(|| RenderError::Page {
            page,
            reason: "bitmap size does not match its pixel buffer".to_string(),
        })
    }
}
