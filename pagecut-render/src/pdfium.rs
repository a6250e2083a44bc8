use std::convert::TryFrom;
use std::mem;
use std::sync::Arc;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use parking_lot::Mutex;
use pagecut_core::{DocumentRenderer, PageSize, RenderError, RenderImage, RenderedDocument};
use pdfium_render::prelude::*;
use tracing::{debug, instrument, warn};

use crate::{effective_scale, zero_based};

/// [`DocumentRenderer`] backed by a dynamically bound pdfium library.
pub struct PdfiumRenderer {
    pdfium: Arc<Pdfium>,
}

impl PdfiumRenderer {
    pub fn new() -> Result<Self> {
        let pdfium = match bind_pdfium_from_build_hint() {
            Some(pdfium) => pdfium,
            None => bind_pdfium_default()?,
        };
        Ok(Self {
            pdfium: Arc::new(pdfium),
        })
    }
}

#[async_trait]
impl DocumentRenderer for PdfiumRenderer {
    #[instrument(skip(self, bytes), fields(bytes = bytes.len()))]
    async fn open(&self, bytes: Arc<[u8]>) -> Result<Arc<dyn RenderedDocument>, RenderError> {
        let document = self
            .pdfium
            .load_pdf_from_byte_vec(bytes.to_vec(), None)
            .map_err(|err| RenderError::Parse(err.to_string()))?;
        // SAFETY: the document borrows the bindings owned by `self.pdfium`. A clone of that Arc
        // is stored next to the document in `PdfiumDocument`, and `document` is declared before
        // `_pdfium` there, so the document is always dropped while the bindings are still alive.
        let document = unsafe { mem::transmute::<PdfDocument<'_>, PdfDocument<'static>>(document) };
        let page_count = usize::try_from(document.pages().len()).unwrap_or_default();
        debug!(page_count, "opened document");

        Ok(Arc::new(PdfiumDocument {
            document: Mutex::new(document),
            page_count,
            _pdfium: Arc::clone(&self.pdfium),
        }))
    }
}

struct PdfiumDocument {
    document: Mutex<PdfDocument<'static>>,
    page_count: usize,
    _pdfium: Arc<Pdfium>,
}

impl PdfiumDocument {
    fn with_page<R, F>(&self, page: usize, f: F) -> Result<R, RenderError>
    where
        F: FnOnce(&PdfPage<'_>) -> Result<R, RenderError>,
    {
        let index = zero_based(page, self.page_count)?;
        let index: PdfPageIndex = index
            .try_into()
            .map_err(|_| RenderError::PageOutOfRange {
                index: page,
                page_count: self.page_count,
            })?;
        let document = self.document.lock();
        let pdf_page = document
            .pages()
            .get(index)
            .map_err(|_| RenderError::PageOutOfRange {
                index: page,
                page_count: self.page_count,
            })?;
        f(&pdf_page)
    }
}

impl RenderedDocument for PdfiumDocument {
    fn page_count(&self) -> usize {
        self.page_count
    }

    fn page_size(&self, page: usize) -> Result<PageSize, RenderError> {
        self.with_page(page, |pdf_page| {
            Ok(PageSize {
                width: pdf_page.width().value,
                height: pdf_page.height().value,
            })
        })
    }

    #[instrument(skip(self))]
    fn render_page(&self, page: usize, scale: f32) -> Result<RenderImage, RenderError> {
        self.with_page(page, |pdf_page| {
            let config = PdfRenderConfig::new().scale_page_by_factor(effective_scale(scale));
            let bitmap =
                pdf_page
                    .render_with_config(&config)
                    .map_err(|err| RenderError::Rasterize {
                        index: page,
                        message: err.to_string(),
                    })?;
            let image = bitmap.as_image().to_rgba8();

            Ok(RenderImage {
                width: u32::try_from(bitmap.width()).unwrap_or_default(),
                height: u32::try_from(bitmap.height()).unwrap_or_default(),
                pixels: image.into_raw(),
            })
        })
    }
}

fn bind_pdfium_from_build_hint() -> Option<Pdfium> {
    match option_env!("PAGECUT_PDFIUM_LIBRARY_PATH") {
        Some(path) if !path.is_empty() => match Pdfium::bind_to_library(path) {
            Ok(bindings) => Some(Pdfium::new(bindings)),
            Err(err) => {
                warn!(path, %err, "failed to load pdfium from build-provided path");
                None
            }
        },
        _ => None,
    }
}

fn bind_pdfium_default() -> Result<Pdfium> {
    let mut errors = Vec::new();

    let local = Pdfium::pdfium_platform_library_name_at_path("./");
    match Pdfium::bind_to_library(&local) {
        Ok(bindings) => return Ok(Pdfium::new(bindings)),
        Err(err) => errors.push(format!("{}: {}", local.display(), err)),
    }

    match Pdfium::bind_to_system_library() {
        Ok(bindings) => Ok(Pdfium::new(bindings)),
        Err(err) => {
            errors.push(format!("system: {err}"));
            Err(anyhow!(
                "failed to bind to a pdfium library; ensure it is installed ({})",
                errors.join(", ")
            ))
        }
    }
}
