use std::sync::Arc;

use async_trait::async_trait;

use crate::error::{MutationError, RenderError};

/// RGBA8 raster of one page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderImage {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl RenderImage {
    pub fn blank(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![255; width as usize * height as usize * 4],
        }
    }
}

/// Intrinsic page size in PDF points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageSize {
    pub width: f32,
    pub height: f32,
}

impl PageSize {
    /// Pixel dimensions of a raster of this page at `scale`.
    pub fn scaled(&self, scale: f32) -> (u32, u32) {
        let width = (self.width * scale).round().max(1.0);
        let height = (self.height * scale).round().max(1.0);
        (width as u32, height as u32)
    }
}

/// A parsed document opened by a renderer. Pages are numbered from 1.
pub trait RenderedDocument: Send + Sync {
    fn page_count(&self) -> usize;
    fn page_size(&self, page: usize) -> Result<PageSize, RenderError>;
    fn render_page(&self, page: usize, scale: f32) -> Result<RenderImage, RenderError>;
}

#[async_trait]
pub trait DocumentRenderer: Send + Sync {
    async fn open(&self, bytes: Arc<[u8]>) -> Result<Arc<dyn RenderedDocument>, RenderError>;
}

/// Structural editor for raw PDF bytes. Page indices are zero-based.
#[async_trait]
pub trait PageMutator: Send + Sync {
    async fn remove_page(
        &self,
        bytes: Arc<[u8]>,
        zero_based_index: usize,
    ) -> Result<Vec<u8>, MutationError>;
}
