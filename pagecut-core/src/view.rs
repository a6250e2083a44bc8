use crate::config::ZoomConfig;

/// Presentation state of a session. `active_page` is 1-based and is 0 only
/// while no document is loaded.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewState {
    pub active_page: usize,
    pub zoom: f32,
    pub thumbnails_visible: bool,
    limits: ZoomConfig,
}

impl ViewState {
    pub fn new(limits: ZoomConfig) -> Self {
        Self {
            active_page: 0,
            zoom: limits.initial,
            thumbnails_visible: false,
            limits,
        }
    }

    pub fn zoom_limits(&self) -> ZoomConfig {
        self.limits
    }

    pub fn zoom_in(&mut self) -> bool {
        self.set_zoom(self.zoom + self.limits.step)
    }

    pub fn zoom_out(&mut self) -> bool {
        self.set_zoom(self.zoom - self.limits.step)
    }

    pub fn reset_zoom(&mut self) -> bool {
        self.set_zoom(self.limits.initial)
    }

    /// Returns whether the zoom actually changed.
    pub fn set_zoom(&mut self, zoom: f32) -> bool {
        // Snap to hundredths so repeated steps do not drift past the bounds.
        let snapped = (zoom * 100.0).round() / 100.0;
        let next = snapped.clamp(self.limits.min, self.limits.max);
        if (next - self.zoom).abs() > f32::EPSILON {
            self.zoom = next;
            true
        } else {
            false
        }
    }

    /// Moves focus to `page`, clamped into `[1, page_count]`.
    pub fn focus(&mut self, page: usize, page_count: usize) -> bool {
        let next = clamp_page(page, page_count);
        if next != self.active_page {
            self.active_page = next;
            true
        } else {
            false
        }
    }

    pub fn zoom_percent(&self) -> u32 {
        (self.zoom * 100.0).round() as u32
    }
}

pub fn clamp_page(page: usize, page_count: usize) -> usize {
    if page_count == 0 {
        0
    } else {
        page.clamp(1, page_count)
    }
}

pub fn page_label(page: usize, page_count: usize) -> String {
    format!("Page {page} of {page_count}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zoom_in_steps_and_clamps_at_max() {
        let mut view = ViewState::new(ZoomConfig::default());
        assert!(view.zoom_in());
        assert_eq!(view.zoom, 1.1);
        for _ in 0..20 {
            view.zoom_in();
        }
        assert_eq!(view.zoom, 2.0);
        assert!(!view.zoom_in());
    }

    #[test]
    fn zoom_out_clamps_at_min() {
        let mut view = ViewState::new(ZoomConfig::default());
        for _ in 0..20 {
            view.zoom_out();
        }
        assert_eq!(view.zoom, 0.5);
        assert_eq!(view.zoom_percent(), 50);
        assert!(view.reset_zoom());
        assert_eq!(view.zoom, 1.0);
    }

    #[test]
    fn focus_clamps_into_range() {
        let mut view = ViewState::new(ZoomConfig::default());
        assert!(view.focus(7, 3));
        assert_eq!(view.active_page, 3);
        assert!(view.focus(0, 3));
        assert_eq!(view.active_page, 1);
        assert!(!view.focus(1, 3));
        assert_eq!(clamp_page(5, 0), 0);
    }

    #[test]
    fn labels_are_one_based() {
        assert_eq!(page_label(1, 2), "Page 1 of 2");
    }
}
