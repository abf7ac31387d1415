//! Keeps the visual center fixed when the zoom level changes.

use crate::surface::ScrollSurface;
use tracing::debug;

/// Zoom changes at or below this are treated as floating-point noise.
pub const ZOOM_EPSILON: f32 = 0.001;

/// Offset that keeps the center of a `visible`-sized window in place after the
/// content is scaled by `ratio`.
pub fn centered_offset(offset: f32, visible: f32, ratio: f32) -> f32 {
    (offset + visible / 2.0) * ratio - visible / 2.0
}

#[derive(Debug, Clone, Copy)]
pub struct ZoomCenterKeeper {
    previous: f32,
}

impl ZoomCenterKeeper {
    pub fn new(initial_zoom: f32) -> Self {
        Self {
            previous: sanitize_zoom(initial_zoom),
        }
    }

    pub fn previous(&self) -> f32 {
        self.previous
    }

    /// Rescale both scroll offsets of `surface` around the viewport center.
    /// Returns `false` for sub-epsilon or invalid changes, which leave the
    /// offsets and the remembered zoom untouched.
    pub fn apply<S: ScrollSurface + ?Sized>(&mut self, zoom: f32, surface: &mut S) -> bool {
        let Some((left, top)) = self.plan(zoom, &*surface) else {
            return false;
        };
        surface.set_scroll_left(left);
        surface.set_scroll_top(top);
        true
    }

    /// Centered `(left, top)` offsets for `zoom`, computed from the offsets
    /// `surface` has now. Remembers `zoom` on success; the caller writes the
    /// offsets once the content has its new size.
    pub fn plan<S: ScrollSurface + ?Sized>(&mut self, zoom: f32, surface: &S) -> Option<(f32, f32)> {
        let ratio = self.ratio_for(zoom)?;
        let left = centered_offset(surface.scroll_left(), surface.client_width(), ratio);
        let top = centered_offset(surface.scroll_top(), surface.client_height(), ratio);
        debug!(from = self.previous, to = zoom, ratio, left, top, "Recentered after zoom");
        self.previous = zoom;
        Some((left, top))
    }

    /// Track a zoom change when there is no surface to adjust.
    pub fn observe(&mut self, zoom: f32) -> bool {
        if self.ratio_for(zoom).is_none() {
            return false;
        }
        self.previous = zoom;
        true
    }

    fn ratio_for(&self, zoom: f32) -> Option<f32> {
        if !zoom.is_finite() || zoom <= 0.0 || (zoom - self.previous).abs() <= ZOOM_EPSILON {
            return None;
        }
        Some(zoom / self.previous)
    }
}

impl Default for ZoomCenterKeeper {
    fn default() -> Self {
        Self::new(1.0)
    }
}

fn sanitize_zoom(zoom: f32) -> f32 {
    if zoom.is_finite() && zoom > 0.0 { zoom } else { 1.0 }
}
