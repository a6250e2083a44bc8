use pagecut_core::RenderError;

#[cfg(feature = "pdf")]
mod pdfium;

#[cfg(feature = "pdf")]
pub use pdfium::PdfiumRenderer;

/// Smallest scale handed to the rasterizer; anything below produces
/// zero-sized bitmaps for ordinary page sizes.
pub const MIN_RENDER_SCALE: f32 = 0.05;

/// Converts a 1-based page number into the zero-based index the backend
/// expects.
pub(crate) fn zero_based(page: usize, page_count: usize) -> Result<usize, RenderError> {
    if page == 0 || page > page_count {
        return Err(RenderError::PageOutOfRange {
            index: page,
            page_count,
        });
    }
    Ok(page - 1)
}

pub(crate) fn effective_scale(scale: f32) -> f32 {
    if scale.is_finite() {
        scale.max(MIN_RENDER_SCALE)
    } else {
        1.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_numbers_map_to_zero_based_indices() {
        assert_eq!(zero_based(1, 3).unwrap(), 0);
        assert_eq!(zero_based(3, 3).unwrap(), 2);
        assert!(matches!(
            zero_based(0, 3),
            Err(RenderError::PageOutOfRange { index: 0, .. })
        ));
        assert!(zero_based(4, 3).is_err());
    }

    #[test]
    fn degenerate_scales_are_clamped() {
        assert_eq!(effective_scale(0.0), MIN_RENDER_SCALE);
        assert_eq!(effective_scale(f32::NAN), 1.0);
        assert_eq!(effective_scale(1.5), 1.5);
    }
}
