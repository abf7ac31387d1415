//! The scroll container the viewport engine drives.
//!
//! In a browser this is the DOM node hosting the page list. The engine only
//! needs a handful of its properties, so the container is abstracted behind
//! [`ScrollSurface`]. [`MemorySurface`] is a headless implementation used by
//! the driver binary and the tests.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Value of the container's `scroll-behavior` property.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum ScrollBehavior {
    #[default]
    Auto,
    Smooth,
    Instant,
}

impl std::fmt::Display for ScrollBehavior {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            ScrollBehavior::Auto => "auto",
            ScrollBehavior::Smooth => "smooth",
            ScrollBehavior::Instant => "instant",
        };
        write!(f, "{}", label)
    }
}

/// A scrollable container shared by the virtualizer, the smooth-scroll
/// controller and the zoom-center keeper.
///
/// Writers are expected to read the current value before writing; nothing
/// here serializes access.
pub trait ScrollSurface {
    fn scroll_behavior(&self) -> ScrollBehavior;
    fn set_scroll_behavior(&mut self, behavior: ScrollBehavior);
    fn scroll_left(&self) -> f32;
    fn scroll_top(&self) -> f32;
    fn set_scroll_left(&mut self, value: f32);
    fn set_scroll_top(&mut self, value: f32);
    fn client_width(&self) -> f32;
    fn client_height(&self) -> f32;
    /// Size the scrollable content area.
    fn resize_content(&mut self, width: f32, height: f32);
}

/// In-memory scroll container.
///
/// Offsets are clamped to the content area once one has been set, matching
/// how a browser clamps `scrollTop`. A surface built with
/// [`MemorySurface::recording`] also keeps every behavior write so callers can
/// inspect the exact sequence of CSS mutations.
#[derive(Debug, Clone, Default)]
pub struct MemorySurface {
    behavior: ScrollBehavior,
    left: f32,
    top: f32,
    client_width: f32,
    client_height: f32,
    content: Option<(f32, f32)>,
    behavior_log: Option<Vec<ScrollBehavior>>,
}

impl MemorySurface {
    pub fn new(client_width: f32, client_height: f32) -> Self {
        Self {
            client_width: sanitize_extent(client_width),
            client_height: sanitize_extent(client_height),
            ..Self::default()
        }
    }

    pub fn set_client_size(&mut self, width: f32, height: f32) {
        self.client_width = sanitize_extent(width);
        self.client_height = sanitize_extent(height);
        self.left = self.clamp_left(self.left);
        self.top = self.clamp_top(self.top);
    }

    /// Start recording behavior writes.
    pub fn recording(mut self) -> Self {
        self.behavior_log = Some(Vec::new());
        self
    }

    /// Behavior writes so far; always empty unless recording.
    pub fn behavior_writes(&self) -> &[ScrollBehavior] {
        self.behavior_log.as_deref().unwrap_or_default()
    }

    pub fn content_size(&self) -> Option<(f32, f32)> {
        self.content
    }

    fn clamp_left(&self, value: f32) -> f32 {
        let value = if value.is_finite() { value.max(0.0) } else { 0.0 };
        match self.content {
            Some((width, _)) => value.min((width - self.client_width).max(0.0)),
            None => value,
        }
    }

    fn clamp_top(&self, value: f32) -> f32 {
        let value = if value.is_finite() { value.max(0.0) } else { 0.0 };
        match self.content {
            Some((_, height)) => value.min((height - self.client_height).max(0.0)),
            None => value,
        }
    }
}

impl ScrollSurface for MemorySurface {
    fn scroll_behavior(&self) -> ScrollBehavior {
        self.behavior
    }

    fn set_scroll_behavior(&mut self, behavior: ScrollBehavior) {
        self.behavior = behavior;
        if let Some(log) = self.behavior_log.as_mut() {
            log.push(behavior);
        }
    }

    fn scroll_left(&self) -> f32 {
        self.left
    }

    fn scroll_top(&self) -> f32 {
        self.top
    }

    fn set_scroll_left(&mut self, value: f32) {
        self.left = self.clamp_left(value);
    }

    fn set_scroll_top(&mut self, value: f32) {
        self.top = self.clamp_top(value);
    }

    fn client_width(&self) -> f32 {
        self.client_width
    }

    fn client_height(&self) -> f32 {
        self.client_height
    }

    fn resize_content(&mut self, width: f32, height: f32) {
        self.content = Some((sanitize_extent(width), sanitize_extent(height)));
        self.left = self.clamp_left(self.left);
        self.top = self.clamp_top(self.top);
    }
}

fn sanitize_extent(value: f32) -> f32 {
    if value.is_finite() { value.max(0.0) } else { 0.0 }
}
