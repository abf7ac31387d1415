//! Two-page spread detection.
//!
//! A spread is a pair of adjacent pages that should be displayed side by side
//! as one image. Detection is driven by the natural image dimensions recorded
//! as pages load, and the classification itself is pluggable through
//! [`SpreadHeuristic`].

use crate::book_key::BookKey;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;
use ts_rs::TS;

/// Maximum relative difference between the two pages of a spread, per axis.
pub const SPREAD_SIZE_TOLERANCE: f64 = 0.1;

/// Natural pixel size of a page image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PageDimensions {
    pub width: u32,
    pub height: u32,
}

impl PageDimensions {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn aspect_ratio(&self) -> f64 {
        self.width as f64 / self.height as f64
    }

    pub fn is_landscape(&self) -> bool {
        !self.is_empty() && self.aspect_ratio() > 1.0
    }
}

/// Decides whether two adjacent pages form a spread.
pub trait SpreadHeuristic {
    fn is_spread(&self, left: PageDimensions, right: PageDimensions) -> bool;
}

impl<F> SpreadHeuristic for F
where
    F: Fn(PageDimensions, PageDimensions) -> bool,
{
    fn is_spread(&self, left: PageDimensions, right: PageDimensions) -> bool {
        self(left, right)
    }
}

/// Default heuristic: both pages landscape and within 10% of each other on
/// both axes.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimilarLandscapeSpread;

impl SpreadHeuristic for SimilarLandscapeSpread {
    fn is_spread(&self, left: PageDimensions, right: PageDimensions) -> bool {
        default_is_spread(left, right)
    }
}

pub fn default_is_spread(left: PageDimensions, right: PageDimensions) -> bool {
    // Zero-sized images never pair; the ratio would be infinite or NaN.
    if left.is_empty() || right.is_empty() {
        return false;
    }
    if !left.is_landscape() || !right.is_landscape() {
        return false;
    }
    within_tolerance(left.width, right.width) && within_tolerance(left.height, right.height)
}

fn within_tolerance(a: u32, b: u32) -> bool {
    let larger = a.max(b) as f64;
    let diff = (a as f64 - b as f64).abs();
    diff < larger * SPREAD_SIZE_TOLERANCE
}

/// Per-session page dimension map plus the derived spread mode for the
/// current page pair.
pub struct SpreadDetector<H = SimilarLandscapeSpread> {
    heuristic: H,
    enabled: bool,
    book_key: BookKey,
    dimensions: HashMap<u32, PageDimensions>,
    revision: u64,
}

impl SpreadDetector<SimilarLandscapeSpread> {
    pub fn new(book_key: BookKey, enabled: bool) -> Self {
        Self::with_heuristic(book_key, enabled, SimilarLandscapeSpread)
    }
}

impl<H: SpreadHeuristic> SpreadDetector<H> {
    /// Starts with an empty map. Construction is the first mount, so it never
    /// counts as a reset.
    pub fn with_heuristic(book_key: BookKey, enabled: bool, heuristic: H) -> Self {
        Self {
            heuristic,
            enabled,
            book_key,
            dimensions: HashMap::new(),
            revision: 0,
        }
    }

    pub fn book_key(&self) -> &BookKey {
        &self.book_key
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Bumped every time the inputs of [`Self::effective_spread_mode`]
    /// change; an unchanged revision means no recomputation is needed.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn set_enabled(&mut self, enabled: bool) -> bool {
        if self.enabled == enabled {
            return false;
        }
        self.enabled = enabled;
        self.revision += 1;
        true
    }

    pub fn dimensions(&self, page: u32) -> Option<PageDimensions> {
        self.dimensions.get(&page).copied()
    }

    pub fn recorded_pages(&self) -> usize {
        self.dimensions.len()
    }

    /// Record the natural size of `page`. Returns `false` when the exact same
    /// size was already known.
    pub fn record_dimensions(&mut self, page: u32, dims: PageDimensions) -> bool {
        if self.dimensions.get(&page) == Some(&dims) {
            return false;
        }
        self.dimensions.insert(page, dims);
        self.revision += 1;
        true
    }

    /// Clear cached dimensions when the book identity changes. Returns whether
    /// a reset happened.
    pub fn sync_book_key(&mut self, book_key: &BookKey) -> bool {
        if &self.book_key == book_key {
            return false;
        }
        debug!(
            from = %self.book_key,
            to = %book_key,
            cleared = self.dimensions.len(),
            "Book key changed; clearing page dimensions"
        );
        self.book_key = book_key.clone();
        self.dimensions.clear();
        self.revision += 1;
        true
    }

    pub fn effective_spread_mode(&self, current_page: u32, total_pages: u32) -> bool {
        if !self.enabled || current_page == 0 || current_page >= total_pages {
            return false;
        }
        let (Some(left), Some(right)) = (
            self.dimensions(current_page),
            self.dimensions(current_page + 1),
        ) else {
            return false;
        };
        self.heuristic.is_spread(left, right)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(id: &str) -> BookKey {
        BookKey::new(id, "cbz")
    }

    #[test]
    fn similar_landscape_pages_form_a_spread() {
        let left = PageDimensions::new(2000, 1400);
        let right = PageDimensions::new(1950, 1380);
        assert!(default_is_spread(left, right));
    }

    #[test]
    fn portrait_pages_never_form_a_spread() {
        let portrait = PageDimensions::new(1000, 1500);
        assert!(!default_is_spread(portrait, portrait));
        assert!(!default_is_spread(PageDimensions::new(2000, 1400), portrait));
    }

    #[test]
    fn size_difference_must_stay_under_ten_percent() {
        let left = PageDimensions::new(2000, 1000);
        assert!(!default_is_spread(left, PageDimensions::new(1800, 1000)));
        assert!(default_is_spread(left, PageDimensions::new(1801, 1000)));
        assert!(!default_is_spread(left, PageDimensions::new(2000, 1200)));
    }

    #[test]
    fn zero_sized_pages_are_rejected() {
        assert!(!default_is_spread(
            PageDimensions::new(2000, 0),
            PageDimensions::new(2000, 1000)
        ));
        assert!(!default_is_spread(
            PageDimensions::new(0, 0),
            PageDimensions::new(0, 0)
        ));
    }

    #[test]
    fn needs_both_pages_of_the_pair() {
        let mut detector = SpreadDetector::new(key("1"), true);
        detector.record_dimensions(3, PageDimensions::new(2000, 1400));
        assert!(!detector.effective_spread_mode(3, 10));

        detector.record_dimensions(4, PageDimensions::new(2000, 1400));
        assert!(detector.effective_spread_mode(3, 10));
        assert!(!detector.effective_spread_mode(2, 10));
    }

    #[test]
    fn last_page_has_no_partner() {
        let mut detector = SpreadDetector::new(key("1"), true);
        detector.record_dimensions(10, PageDimensions::new(2000, 1400));
        detector.record_dimensions(11, PageDimensions::new(2000, 1400));
        assert!(!detector.effective_spread_mode(10, 10));
    }

    #[test]
    fn disabled_detection_reports_single_pages() {
        let mut detector = SpreadDetector::new(key("1"), false);
        detector.record_dimensions(1, PageDimensions::new(2000, 1400));
        detector.record_dimensions(2, PageDimensions::new(2000, 1400));
        assert!(!detector.effective_spread_mode(1, 4));

        assert!(detector.set_enabled(true));
        assert!(detector.effective_spread_mode(1, 4));
    }

    #[test]
    fn identical_dimensions_do_not_trigger_recompute() {
        let mut detector = SpreadDetector::new(key("1"), true);
        assert!(detector.record_dimensions(1, PageDimensions::new(900, 1300)));
        let revision = detector.revision();

        assert!(!detector.record_dimensions(1, PageDimensions::new(900, 1300)));
        assert_eq!(detector.revision(), revision);

        assert!(detector.record_dimensions(1, PageDimensions::new(901, 1300)));
        assert_eq!(detector.revision(), revision + 1);
    }

    #[test]
    fn book_key_change_clears_dimensions_but_first_mount_does_not() {
        let mut detector = SpreadDetector::new(key("1"), true);
        assert_eq!(detector.revision(), 0);
        assert!(!detector.sync_book_key(&key("1")));
        assert_eq!(detector.revision(), 0);

        detector.record_dimensions(1, PageDimensions::new(2000, 1400));
        detector.record_dimensions(2, PageDimensions::new(2000, 1400));
        assert!(detector.effective_spread_mode(1, 5));

        assert!(detector.sync_book_key(&key("2")));
        assert_eq!(detector.recorded_pages(), 0);
        assert!(!detector.effective_spread_mode(1, 5));
    }

    #[test]
    fn injected_heuristic_replaces_default() {
        let always = |_: PageDimensions, _: PageDimensions| true;
        let mut detector = SpreadDetector::with_heuristic(key("1"), true, always);
        detector.record_dimensions(1, PageDimensions::new(800, 1200));
        detector.record_dimensions(2, PageDimensions::new(800, 1200));
        assert!(detector.effective_spread_mode(1, 2));
    }
}
