//! Page column virtualization on top of the `virtualizer` crate.
//!
//! The crate owns item offsets, the overscanned range and scroll-anchoring on
//! resize. This wrapper keeps the unscaled page measurements so the zoom
//! `scale` can be reapplied, and converts between the view's float pixels and
//! the crate's integer units.

use serde::Serialize;
use ts_rs::TS;
use virtualizer::VirtualizerOptions;

pub use virtualizer::Align;

/// A mounted item: `index` is 0-based, so the page number is `index + 1`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, TS)]
#[ts(export)]
pub struct VirtualItem {
    pub index: usize,
    pub start: f32,
    pub size: f32,
}

impl VirtualItem {
    pub fn end(&self) -> f32 {
        self.start + self.size
    }

    pub fn page(&self) -> u32 {
        self.index as u32 + 1
    }
}

pub struct Virtualizer {
    inner: virtualizer::Virtualizer,
    count: usize,
    estimated_size: f32,
    overscan: usize,
    scale: f32,
    measured: Vec<Option<f32>>,
    viewport_size: f32,
    items: Vec<VirtualItem>,
}

impl Virtualizer {
    pub fn new(count: usize, estimated_size: f32, overscan: usize) -> Self {
        let estimated_size = sanitize_size(estimated_size).max(1.0);
        Self {
            inner: build_inner(count, estimated_size, overscan, 1.0),
            count,
            estimated_size,
            overscan,
            scale: 1.0,
            measured: vec![None; count],
            viewport_size: 0.0,
            items: Vec::new(),
        }
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn set_count(&mut self, count: usize) {
        if count == self.count {
            return;
        }
        self.count = count;
        self.measured.resize(count, None);
        self.rebuild();
    }

    pub fn set_estimated_size(&mut self, estimated_size: f32) {
        let estimated_size = sanitize_size(estimated_size).max(1.0);
        if (estimated_size - self.estimated_size).abs() > f32::EPSILON {
            self.estimated_size = estimated_size;
            self.rebuild();
        }
    }

    pub fn overscan(&self) -> usize {
        self.overscan
    }

    pub fn set_overscan(&mut self, overscan: usize) {
        if overscan != self.overscan {
            self.overscan = overscan;
            self.rebuild();
        }
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    /// Multiply every item by `scale`. Returns false for invalid or unchanged
    /// values.
    pub fn set_scale(&mut self, scale: f32) -> bool {
        if !scale.is_finite() || scale <= 0.0 || (scale - self.scale).abs() <= f32::EPSILON {
            return false;
        }
        self.scale = scale;
        self.rebuild();
        true
    }

    pub fn viewport_size(&self) -> f32 {
        self.viewport_size
    }

    pub fn set_viewport_size(&mut self, size: f32) {
        self.viewport_size = sanitize_size(size);
        let offset = self.inner.scroll_offset();
        self.inner
            .set_viewport_and_scroll_clamped(to_px(self.viewport_size).into(), offset);
        self.refresh_items();
    }

    pub fn scroll_offset(&self) -> f32 {
        self.inner.scroll_offset() as f32
    }

    pub fn set_scroll_offset(&mut self, offset: f32) {
        self.inner.set_scroll_offset_clamped(to_offset(offset));
        self.refresh_items();
    }

    pub fn max_scroll_offset(&self) -> f32 {
        (self.total_size() - self.viewport_size).max(0.0)
    }

    pub fn total_size(&self) -> f32 {
        self.inner.total_size() as f32
    }

    pub fn is_measured(&self, index: usize) -> bool {
        matches!(self.measured.get(index), Some(Some(_)))
    }

    /// Record the unscaled size of `index`.
    ///
    /// Returns `None` when nothing changed. Otherwise returns how far the
    /// scroll offset moved to keep the visible content in place.
    pub fn measure(&mut self, index: usize, size: f32) -> Option<f32> {
        let size = sanitize_size(size);
        let previous = *self.measured.get(index)?;
        if matches!(previous, Some(existing) if (existing - size).abs() <= f32::EPSILON) {
            return None;
        }
        self.measured[index] = Some(size);
        let before = self.scroll_offset();
        self.inner
            .resize_item(index, to_px(size * self.scale).into());
        self.refresh_items();
        Some(self.scroll_offset() - before)
    }

    pub fn reset_measurements(&mut self) {
        self.measured.iter_mut().for_each(|slot| *slot = None);
        self.rebuild();
    }

    /// Current size of `index` with the scale applied.
    pub fn item_size(&self, index: usize) -> f32 {
        match self.measured.get(index) {
            Some(measured) => {
                to_px(measured.unwrap_or(self.estimated_size) * self.scale) as f32
            }
            None => 0.0,
        }
    }

    /// Items to mount for the current scroll position, overscan included.
    pub fn virtual_items(&self) -> Vec<VirtualItem> {
        self.items.clone()
    }

    /// Scroll offset that brings `index` into view with the given alignment.
    pub fn scroll_to_index_offset(&self, index: usize, align: Align) -> f32 {
        if self.count == 0 {
            return 0.0;
        }
        let index = index.min(self.count - 1);
        self.inner.scroll_to_index_offset(index, align) as f32
    }

    /// Move to `offset` and return the closest item boundary, clamped to the
    /// scrollable range.
    pub fn nearest_item_start(&mut self, offset: f32) -> f32 {
        self.set_scroll_offset(offset);
        let Some(item) = self
            .items
            .iter()
            .find(|item| offset < item.end())
            .or(self.items.last())
            .copied()
        else {
            return 0.0;
        };
        let snapped = if offset - item.start <= item.end() - offset {
            item.start
        } else {
            item.end()
        };
        self.clamp_offset(snapped)
    }

    /// Recreate the crate state after a count, estimate, overscan or scale
    /// change, replaying the recorded measurements.
    fn rebuild(&mut self) {
        let offset = self.inner.scroll_offset();
        let mut inner = build_inner(self.count, self.estimated_size, self.overscan, self.scale);
        for (index, size) in self.measured.iter().enumerate() {
            if let Some(size) = size {
                inner.measure_unadjusted(index, to_px(size * self.scale).into());
            }
        }
        inner.set_viewport_and_scroll_clamped(to_px(self.viewport_size).into(), offset);
        self.inner = inner;
        self.refresh_items();
    }

    fn refresh_items(&mut self) {
        self.items.clear();
        if self.count == 0 || self.viewport_size <= 0.0 {
            return;
        }
        let items = &mut self.items;
        self.inner.for_each_virtual_item(|item| {
            items.push(VirtualItem {
                index: item.index,
                start: item.start as f32,
                size: item.size as f32,
            })
        });
    }

    fn clamp_offset(&self, offset: f32) -> f32 {
        if !offset.is_finite() {
            return 0.0;
        }
        offset.clamp(0.0, self.max_scroll_offset())
    }
}

fn build_inner(count: usize, estimate: f32, overscan: usize, scale: f32) -> virtualizer::Virtualizer {
    let estimate_px = to_px(estimate * scale).max(1);
    let mut options = VirtualizerOptions::new(count, move |_| estimate_px.into());
    options.overscan = overscan;
    virtualizer::Virtualizer::new(options)
}

fn sanitize_size(size: f32) -> f32 {
    if size.is_finite() { size.max(0.0) } else { 0.0 }
}

fn to_px(size: f32) -> u32 {
    sanitize_size(size).round() as u32
}

fn to_offset(offset: f32) -> u64 {
    sanitize_size(offset).round() as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn column(count: usize) -> Virtualizer {
        let mut v = Virtualizer::new(count, 1000.0, 1);
        v.set_viewport_size(800.0);
        v
    }

    fn pages(v: &Virtualizer) -> Vec<u32> {
        v.virtual_items().iter().map(VirtualItem::page).collect()
    }

    #[test]
    fn total_size_follows_estimates_and_measurements() {
        let mut v = column(10);
        assert_eq!(v.total_size(), 10_000.0);

        v.measure(0, 1500.0);
        assert_eq!(v.total_size(), 10_500.0);
        assert_eq!(v.scroll_to_index_offset(1, Align::Start), 1500.0);
        assert!(v.is_measured(0));
        assert!(!v.is_measured(1));
    }

    #[test]
    fn virtual_items_stop_at_the_ends() {
        let mut v = column(3);
        v.set_scroll_offset(0.0);
        assert_eq!(pages(&v), vec![1, 2]);

        v.set_scroll_offset(v.max_scroll_offset());
        assert_eq!(pages(&v), vec![2, 3]);
    }

    #[test]
    fn empty_list_mounts_nothing() {
        let v = column(0);
        assert!(v.virtual_items().is_empty());
        assert_eq!(v.scroll_to_index_offset(4, Align::Start), 0.0);
    }

    #[test]
    fn scroll_to_index_clamps_to_the_last_item() {
        let v = column(10);
        assert_eq!(v.scroll_to_index_offset(3, Align::Start), 3000.0);
        assert_eq!(v.scroll_to_index_offset(50, Align::Start), 9200.0);
    }

    #[test]
    fn measuring_above_viewport_shifts_scroll_offset() {
        let mut v = column(10);
        v.set_scroll_offset(3000.0);

        assert_eq!(v.measure(0, 1200.0), Some(200.0));
        assert_eq!(v.scroll_offset(), 3200.0);

        assert_eq!(v.measure(5, 1200.0), Some(0.0));
        assert_eq!(v.scroll_offset(), 3200.0);

        assert_eq!(v.measure(5, 1200.0), None);
        assert_eq!(v.measure(42, 1200.0), None);
    }

    #[test]
    fn scale_multiplies_every_item_and_keeps_measurements() {
        let mut v = column(4);
        v.measure(1, 500.0);
        assert!(v.set_scale(2.0));
        assert_eq!(v.total_size(), 7000.0);
        assert_eq!(v.item_size(1), 1000.0);
        assert_eq!(v.scroll_to_index_offset(2, Align::Start), 3000.0);
        assert!(!v.set_scale(0.0));
        assert!(!v.set_scale(f32::NAN));
    }

    #[test]
    fn shrinking_count_drops_measurements() {
        let mut v = column(5);
        v.measure(4, 200.0);
        v.set_count(3);
        v.set_count(5);
        assert!(!v.is_measured(4));
        assert_eq!(v.total_size(), 5000.0);
    }

    #[test]
    fn nearest_item_start_snaps_to_closest_boundary() {
        let mut v = column(10);
        assert_eq!(v.nearest_item_start(1400.0), 1000.0);
        assert_eq!(v.nearest_item_start(1600.0), 2000.0);
        assert_eq!(v.nearest_item_start(9900.0), 9200.0);
    }
}
