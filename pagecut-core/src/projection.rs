use std::ops::Range;

use rayon::prelude::*;
use tracing::{instrument, warn};

use crate::backend::{RenderImage, RenderedDocument};
use crate::SessionEvent;

/// Raster slot of one page; a failed page keeps a placeholder so the rest
/// of the document still shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageRaster {
    Ready(RenderImage),
    Failed(String),
}

impl PageRaster {
    pub fn image(&self) -> Option<&RenderImage> {
        match self {
            PageRaster::Ready(image) => Some(image),
            PageRaster::Failed(_) => None,
        }
    }
}

/// Rasters of one snapshot at a single scale, one slot per page. Only the
/// pages asked for are rendered; the rest stay empty until they come into
/// view. Index 0 holds page 1.
#[derive(Debug, Default)]
pub struct Projection {
    pages: Vec<Option<PageRaster>>,
    scale: Option<f32>,
}

impl Projection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(&self, page: usize) -> Option<&PageRaster> {
        page.checked_sub(1)
            .and_then(|idx| self.pages.get(idx))
            .and_then(Option::as_ref)
    }

    /// Page slots, rendered or not.
    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    pub fn rendered(&self) -> usize {
        self.pages.iter().filter(|slot| slot.is_some()).count()
    }

    /// Drops page `from` (1-based) and everything after it.
    pub fn invalidate_from(&mut self, from: usize) {
        self.pages.truncate(from.saturating_sub(1));
    }

    pub fn clear(&mut self) {
        self.pages.clear();
        self.scale = None;
    }

    /// Renders the pages of `wanted` (1-based) missing from the cache at
    /// `scale`. Pages past the end of the document are skipped. A scale
    /// change discards the whole cache. Returns how many pages were rendered.
    pub fn refresh(
        &mut self,
        document: &dyn RenderedDocument,
        scale: f32,
        wanted: Range<usize>,
    ) -> usize {
        if self
            .scale
            .is_some_and(|current| (current - scale).abs() > f32::EPSILON)
        {
            self.pages.clear();
        }
        self.scale = Some(scale);

        let page_count = document.page_count();
        self.pages.resize_with(page_count, || None);
        let missing: Vec<usize> = wanted
            .filter(|&page| (1..=page_count).contains(&page) && self.pages[page - 1].is_none())
            .collect();
        if missing.is_empty() {
            return 0;
        }

        let rendered: Vec<(usize, PageRaster)> = missing
            .into_par_iter()
            .map(|page| {
                let raster = match document.render_page(page, scale) {
                    Ok(image) => PageRaster::Ready(image),
                    Err(err) => {
                        warn!(%err, page, scale, "page failed to rasterize");
                        PageRaster::Failed(err.to_string())
                    }
                };
                (page, raster)
            })
            .collect();
        let count = rendered.len();
        for (page, raster) in rendered {
            self.pages[page - 1] = Some(raster);
        }
        count
    }
}

/// The active page and its direct neighbours, clipped to the document.
pub fn prefetch_window(active: usize, page_count: usize) -> Range<usize> {
    if page_count == 0 {
        return 1..1;
    }
    let active = active.clamp(1, page_count);
    active.saturating_sub(1).max(1)..(active + 2).min(page_count + 1)
}

/// The full-page and thumbnail projections derived from one snapshot.
#[derive(Debug)]
pub struct Projections {
    pub full: Projection,
    pub thumbnails: Projection,
    base_scale: f32,
    thumbnail_scale: f32,
}

impl Projections {
    pub fn new(base_scale: f32, thumbnail_scale: f32) -> Self {
        Self {
            full: Projection::new(),
            thumbnails: Projection::new(),
            base_scale,
            thumbnail_scale,
        }
    }

    pub fn full_scale(&self, zoom: f32) -> f32 {
        self.base_scale * zoom
    }

    pub fn thumbnail_scale(&self) -> f32 {
        self.thumbnail_scale
    }

    pub fn apply_event(&mut self, event: &SessionEvent) {
        match event {
            SessionEvent::DocumentLoaded(_) => {
                self.full.clear();
                self.thumbnails.clear();
            }
            SessionEvent::PagesChanged { from } => {
                self.full.invalidate_from(*from);
                self.thumbnails.invalidate_from(*from);
            }
            SessionEvent::ZoomChanged(_) => self.full.clear(),
            SessionEvent::ActivePageChanged(_) | SessionEvent::Notice(_) => {}
        }
    }

    /// Renders what is missing from `full_pages` at the zoomed scale and
    /// from `thumbnail_pages` at the thumbnail scale. The two share no state,
    /// so they are derived side by side.
    #[instrument(skip(self, document))]
    pub fn refresh(
        &mut self,
        document: &dyn RenderedDocument,
        zoom: f32,
        full_pages: Range<usize>,
        thumbnail_pages: Range<usize>,
    ) -> usize {
        let full_scale = self.full_scale(zoom);
        let thumbnail_scale = self.thumbnail_scale;
        let (full, thumbnails) = (&mut self.full, &mut self.thumbnails);
        let (a, b) = rayon::join(
            || full.refresh(document, full_scale, full_pages),
            || thumbnails.refresh(document, thumbnail_scale, thumbnail_pages),
        );
        a + b
    }
}
