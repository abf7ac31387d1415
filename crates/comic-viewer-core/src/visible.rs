//! Current-page derivation from the mounted items.
//!
//! The current page is the item occupying the most of the viewport; ties go
//! to the lower page so a settled viewport always yields the same answer.

use crate::virtualizer::VirtualItem;
use serde::Serialize;
use ts_rs::TS;

/// Visible extents closer than this are treated as equal.
pub const VISIBILITY_TIE_TOLERANCE_PX: f32 = 0.5;

/// Container-relative visibility of one mounted page.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, TS)]
#[ts(export)]
pub struct VisiblePage {
    pub page: u32,
    pub visible_px: f32,
    pub visible_fraction: f32,
}

pub fn visible_pages(items: &[VirtualItem], scroll_offset: f32, viewport_size: f32) -> Vec<VisiblePage> {
    if viewport_size <= 0.0 {
        return Vec::new();
    }
    let view_end = scroll_offset + viewport_size;
    items
        .iter()
        .filter_map(|item| {
            let visible_px = item.end().min(view_end) - item.start.max(scroll_offset);
            if visible_px <= 0.0 {
                return None;
            }
            let visible_fraction = if item.size > 0.0 {
                (visible_px / item.size).clamp(0.0, 1.0)
            } else {
                0.0
            };
            Some(VisiblePage {
                page: item.page(),
                visible_px,
                visible_fraction,
            })
        })
        .collect()
}

pub fn current_page(items: &[VirtualItem], scroll_offset: f32, viewport_size: f32) -> Option<u32> {
    let mut visible = visible_pages(items, scroll_offset, viewport_size);
    visible.sort_by_key(|entry| entry.page);
    let mut best: Option<VisiblePage> = None;
    for entry in visible {
        match best {
            Some(current) if entry.visible_px <= current.visible_px + VISIBILITY_TIE_TOLERANCE_PX => {}
            _ => best = Some(entry),
        }
    }
    best.map(|entry| entry.page)
}

/// A page-change notification.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, TS)]
#[ts(export)]
pub struct PageChange {
    pub page: u32,
    pub total_pages: u32,
    pub progress: f64,
}

/// Edge-triggered reporter: emits only when the derived page differs from the
/// last reported one.
#[derive(Debug, Clone, Default)]
pub struct VisiblePageTracker {
    last_reported: Option<u32>,
}

impl VisiblePageTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_reported(&self) -> Option<u32> {
        self.last_reported
    }

    pub fn observe(&mut self, current: Option<u32>, total_pages: u32) -> Option<PageChange> {
        let page = current?;
        if total_pages == 0 || self.last_reported == Some(page) {
            return None;
        }
        self.last_reported = Some(page);
        Some(PageChange {
            page,
            total_pages,
            progress: page as f64 / total_pages as f64,
        })
    }

    /// Forget the last report so the next observation always fires.
    pub fn reset(&mut self) {
        self.last_reported = None;
    }
}
