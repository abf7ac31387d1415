//! The virtualized comic view.
//!
//! [`ComicView`] owns every piece of per-book state: the virtualizer, the
//! visible-page tracker, spread detection, the preload planner, page load
//! states and the smooth-scroll and zoom helpers. The host drives it with
//! scroll/resize/load events and calls [`ComicView::tick`] from its frame or
//! timer loop; deferred work (the initial jump, queued navigation and the
//! smooth-scroll restore) only happens inside `tick`.

use crate::book_key::BookKey;
use crate::cancellation::PreloadToken;
use crate::config::AppConfig;
use crate::navigation::{
    JumpHandle, JumpRegistration, NavigationCommand, PageChangeCallback, clamp_page,
    page_for_progress,
};
use crate::page_image::{PageLoadState, PageLoadStates, page_image_url};
use crate::preload::{PreloadContext, PreloadPlanner};
use crate::smooth_scroll::{SMOOTH_SCROLL_RESTORE_DELAY_MS, SmoothScrollController};
use crate::spread::{PageDimensions, SimilarLandscapeSpread, SpreadDetector, SpreadHeuristic};
use crate::surface::{ScrollBehavior, ScrollSurface};
use crate::virtualizer::{Align, Virtualizer};
use crate::visible::{VisiblePageTracker, current_page};
use crate::zoom::ZoomCenterKeeper;
use serde::{Deserialize, Serialize};
use std::sync::mpsc::{self, Receiver, Sender};
use std::time::{Duration, Instant};
use tracing::{debug, info, trace, warn};
use ts_rs::TS;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ViewportConfig {
    pub estimated_page_height: f32,
    pub overscan: u32,
    pub enable_snap: bool,
}

impl Default for ViewportConfig {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

impl From<&AppConfig> for ViewportConfig {
    fn from(config: &AppConfig) -> Self {
        ViewportConfig {
            estimated_page_height: config.estimated_page_height,
            overscan: config.overscan,
            enable_snap: config.enable_snap,
        }
    }
}

/// Everything the host passes in when mounting or re-rendering the view.
#[derive(Debug, Clone, PartialEq)]
pub struct ComicViewProps {
    pub book_id: String,
    pub format: String,
    pub total_pages: u32,
    pub zoom_level: f32,
    pub config: ViewportConfig,
    /// 1-based; out-of-range values are ignored.
    pub initial_page: Option<i64>,
    pub spread_mode: bool,
    pub restore_delay: Duration,
    pub image_base_url: String,
}

impl ComicViewProps {
    pub fn new(book_id: impl Into<String>, format: impl Into<String>, total_pages: u32) -> Self {
        Self {
            book_id: book_id.into(),
            format: format.into(),
            total_pages,
            zoom_level: 1.0,
            config: ViewportConfig::default(),
            initial_page: None,
            spread_mode: false,
            restore_delay: Duration::from_millis(SMOOTH_SCROLL_RESTORE_DELAY_MS),
            image_base_url: String::new(),
        }
    }

    /// Props for a book using the viewport, reader and server settings of
    /// `config`.
    pub fn from_config(
        book_id: impl Into<String>,
        format: impl Into<String>,
        total_pages: u32,
        config: &AppConfig,
    ) -> Self {
        Self::new(book_id, format, total_pages)
            .with_config(ViewportConfig::from(config))
            .with_spread_mode(config.spread_mode)
            .with_restore_delay(config.restore_delay())
            .with_image_base_url(config.base_url.clone())
    }

    pub fn with_zoom(mut self, zoom_level: f32) -> Self {
        self.zoom_level = zoom_level;
        self
    }

    pub fn with_config(mut self, config: ViewportConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_initial_page(mut self, page: i64) -> Self {
        self.initial_page = Some(page);
        self
    }

    pub fn with_spread_mode(mut self, spread_mode: bool) -> Self {
        self.spread_mode = spread_mode;
        self
    }

    pub fn with_restore_delay(mut self, restore_delay: Duration) -> Self {
        self.restore_delay = restore_delay;
        self
    }

    pub fn with_image_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.image_base_url = base_url.into();
        self
    }

    pub fn book_key(&self) -> BookKey {
        BookKey::new(self.book_id.clone(), self.format.clone())
    }
}

/// A scroll the view performed against its surface.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, TS)]
#[ts(export)]
pub struct ScrollRequest {
    pub index: usize,
    pub page: u32,
    pub offset: f32,
    pub behavior: ScrollBehavior,
}

/// A mounted page slot.
#[derive(Debug, Clone, PartialEq, Serialize, TS)]
#[ts(export)]
pub struct RenderedPage {
    pub page: u32,
    pub start: f32,
    pub size: f32,
    pub url: String,
    pub load_state: PageLoadState,
}

/// What the host should draw: a container of `total_size` with the mounted
/// pages absolutely positioned inside it.
#[derive(Debug, Clone, PartialEq, Serialize, TS)]
#[ts(export)]
pub struct RenderedViewport {
    pub total_size: f32,
    pub snap: bool,
    pub pages: Vec<RenderedPage>,
}

pub struct ComicView<S: ScrollSurface, H: SpreadHeuristic = SimilarLandscapeSpread> {
    props: ComicViewProps,
    book_key: BookKey,
    surface: Option<S>,
    virtualizer: Virtualizer,
    tracker: VisiblePageTracker,
    spread: SpreadDetector<H>,
    preload: PreloadPlanner,
    loads: PageLoadStates,
    smooth: SmoothScrollController,
    zoom: ZoomCenterKeeper,
    on_page_change: Option<PageChangeCallback>,
    jump_registration: Option<JumpRegistration>,
    commands_tx: Sender<NavigationCommand>,
    commands_rx: Receiver<NavigationCommand>,
    initial_jump_pending: bool,
    preload_token: PreloadToken,
}

impl<S: ScrollSurface> ComicView<S> {
    pub fn new(props: ComicViewProps) -> Self {
        Self::with_heuristic(props, SimilarLandscapeSpread)
    }

    pub fn mount(props: ComicViewProps, surface: S) -> Self {
        let mut view = Self::new(props);
        view.attach_surface(surface);
        view
    }
}

impl<S: ScrollSurface, H: SpreadHeuristic> ComicView<S, H> {
    pub fn with_heuristic(props: ComicViewProps, heuristic: H) -> Self {
        let book_key = props.book_key();
        let zoom = sanitize_zoom(props.zoom_level);
        let mut virtualizer = Virtualizer::new(
            props.total_pages as usize,
            props.config.estimated_page_height,
            props.config.overscan as usize,
        );
        virtualizer.set_scale(zoom);
        let initial_jump_pending = props
            .initial_page
            .is_some_and(|page| page >= 1 && page <= props.total_pages as i64);
        let (commands_tx, commands_rx) = mpsc::channel();
        let preload_token = PreloadToken::new(book_key.clone());

        Self {
            book_key: book_key.clone(),
            surface: None,
            virtualizer,
            tracker: VisiblePageTracker::new(),
            spread: SpreadDetector::with_heuristic(book_key, props.spread_mode, heuristic),
            preload: PreloadPlanner::new(),
            loads: PageLoadStates::new(),
            smooth: SmoothScrollController::new(props.restore_delay),
            zoom: ZoomCenterKeeper::new(zoom),
            on_page_change: None,
            jump_registration: None,
            commands_tx,
            commands_rx,
            initial_jump_pending,
            preload_token,
            props,
        }
    }

    /// Attach the scroll container. Returns the previously attached one.
    pub fn attach_surface(&mut self, surface: S) -> Option<S> {
        let previous = self.surface.replace(surface);
        info!(
            book = %self.book_key,
            total_pages = self.props.total_pages,
            initial_page = ?self.props.initial_page,
            "Mounted comic view"
        );
        self.resize_surface_content();
        self.sync_scroll();
        previous
    }

    pub fn set_page_change_callback(&mut self, callback: Option<PageChangeCallback>) {
        self.on_page_change = callback;
    }

    /// Replace the legacy jump registration. The outgoing callback is told the
    /// handle is gone; the incoming one receives a fresh handle.
    pub fn set_jump_registration(&mut self, registration: Option<JumpRegistration>) {
        if let Some(mut previous) = self.jump_registration.take() {
            previous(None);
        }
        if let Some(mut registration) = registration {
            registration(Some(JumpHandle::new(self.commands_tx.clone())));
            self.jump_registration = Some(registration);
        }
    }

    pub fn props(&self) -> &ComicViewProps {
        &self.props
    }

    pub fn book_key(&self) -> &BookKey {
        &self.book_key
    }

    pub fn surface(&self) -> Option<&S> {
        self.surface.as_ref()
    }

    /// Direct access for the host to mirror user scrolling. Call
    /// [`Self::handle_scroll`] afterwards.
    pub fn surface_mut(&mut self) -> Option<&mut S> {
        self.surface.as_mut()
    }

    pub fn virtualizer(&self) -> &Virtualizer {
        &self.virtualizer
    }

    pub fn spread_detector(&self) -> &SpreadDetector<H> {
        &self.spread
    }

    pub fn smooth_scroll(&self) -> &SmoothScrollController {
        &self.smooth
    }

    pub fn load_states(&self) -> &PageLoadStates {
        &self.loads
    }

    pub fn zoom_level(&self) -> f32 {
        self.virtualizer.scale()
    }

    /// Last page reported through the page-change callback.
    pub fn current_page(&self) -> Option<u32> {
        self.tracker.last_reported()
    }

    pub fn progress(&self) -> f64 {
        match (self.current_page(), self.props.total_pages) {
            (Some(page), total) if total > 0 => page as f64 / total as f64,
            _ => 0.0,
        }
    }

    pub fn is_initial_jump_pending(&self) -> bool {
        self.initial_jump_pending
    }

    /// Whether the current page and its successor render as one spread.
    pub fn effective_spread_mode(&self) -> bool {
        let current = self.current_page().unwrap_or(1);
        self.spread
            .effective_spread_mode(current, self.props.total_pages)
    }

    /// Pages to fetch eagerly around the current page.
    pub fn preload_pages(&mut self) -> Vec<u32> {
        let ctx = PreloadContext {
            current_page: self.current_page().unwrap_or(1),
            total_pages: self.props.total_pages,
            overscan: self.props.config.overscan,
            spread_mode: self.props.spread_mode,
        };
        self.preload.pages(&ctx).to_vec()
    }

    /// Token for the preload batch of the open book; cancelled when the book
    /// changes or the view unmounts.
    pub fn preload_token(&self) -> PreloadToken {
        self.preload_token.clone()
    }

    pub fn jump_to_page(&mut self, page: i64) -> Option<ScrollRequest> {
        let page = self.clamp_for_navigation(page)?;
        self.scroll_surface_to(page, ScrollBehavior::Instant, None)
    }

    pub fn jump_to_progress(&mut self, progress: f64) -> Option<ScrollRequest> {
        if self.surface.is_none() {
            return None;
        }
        let page = page_for_progress(progress, self.props.total_pages)?;
        self.scroll_surface_to(page, ScrollBehavior::Instant, None)
    }

    /// Scroll to `page` with the requested behavior. `Smooth` switches the
    /// surface to smooth scrolling until the restore deadline; anything else
    /// scrolls without touching the surface behavior.
    pub fn scroll_to_page(
        &mut self,
        page: i64,
        behavior: ScrollBehavior,
        now: Instant,
    ) -> Option<ScrollRequest> {
        let page = self.clamp_for_navigation(page)?;
        self.scroll_surface_to(page, behavior, Some(now))
    }

    pub fn navigate(&mut self, command: NavigationCommand, now: Instant) -> Option<ScrollRequest> {
        match command {
            NavigationCommand::JumpToPage { page } => self.jump_to_page(page),
            NavigationCommand::JumpToProgress { progress } => self.jump_to_progress(progress),
            NavigationCommand::ScrollToPage { page, behavior } => {
                self.scroll_to_page(page, behavior, now)
            }
        }
    }

    /// Run deferred work: the one-shot initial jump, queued navigation
    /// commands and the smooth-scroll restore.
    pub fn tick(&mut self, now: Instant) {
        if self.surface.is_none() {
            return;
        }

        if self.initial_jump_pending {
            self.initial_jump_pending = false;
            if let Some(page) = self.props.initial_page {
                debug!(page, "Applying initial page jump");
                self.jump_to_page(page);
            }
        }

        while let Ok(command) = self.commands_rx.try_recv() {
            self.navigate(command, now);
        }

        if let Some(surface) = self.surface.as_mut() {
            self.smooth.poll(surface, now);
        }
        self.sync_scroll();
    }

    /// The surface scrolled; recompute the visible range and current page.
    pub fn handle_scroll(&mut self) {
        self.sync_scroll();
    }

    /// Snap to the nearest page boundary after a scroll gesture ends. Does
    /// nothing unless snapping is enabled.
    pub fn settle_scroll(&mut self) -> Option<f32> {
        if !self.props.config.enable_snap {
            return None;
        }
        let surface = self.surface.as_mut()?;
        let top = surface.scroll_top();
        self.virtualizer.set_scroll_offset(top);
        let target = self.virtualizer.nearest_item_start(top);
        if (target - top).abs() > f32::EPSILON {
            trace!(from = top, to = target, "Snapped to page boundary");
            surface.set_scroll_top(target);
        }
        self.sync_scroll();
        Some(target)
    }

    /// The surface's client size changed. Loaded pages are remeasured since
    /// their rendered height follows the client width.
    pub fn handle_resize(&mut self) {
        let Some(surface) = self.surface.as_ref() else {
            return;
        };
        self.virtualizer.set_viewport_size(surface.client_height());
        self.virtualizer.set_scroll_offset(surface.scroll_top());
        let mut delta = 0.0;
        for page in 1..=self.props.total_pages {
            if let Some(dims) = self.spread.dimensions(page) {
                delta += self.measure_page(page, dims);
            }
        }
        self.resize_surface_content();
        self.shift_surface(delta);
        self.sync_scroll();
    }

    /// Change the zoom level, keeping the visual center in place. Returns
    /// whether the scroll offsets were adjusted.
    pub fn set_zoom(&mut self, zoom: f32) -> bool {
        if !zoom.is_finite() || zoom <= 0.0 {
            warn!(zoom, "Ignoring invalid zoom level");
            return false;
        }
        self.props.zoom_level = zoom;
        // Plan from the pre-zoom offsets; shrinking the content first would
        // clamp them.
        let target = match self.surface.as_ref() {
            Some(surface) => self.zoom.plan(zoom, surface),
            None => {
                self.zoom.observe(zoom);
                None
            }
        };
        self.virtualizer.set_scale(zoom);
        self.resize_surface_content();
        if let (Some((left, top)), Some(surface)) = (target, self.surface.as_mut()) {
            surface.set_scroll_left(left);
            surface.set_scroll_top(top);
        }
        self.sync_scroll();
        target.is_some()
    }

    /// Apply new props. A different book key drops every piece of per-book
    /// state; the initial jump is not repeated.
    pub fn update_props(&mut self, props: ComicViewProps) {
        let book_key = props.book_key();
        if book_key != self.book_key {
            info!(from = %self.book_key, to = %book_key, "Switching book");
            self.spread.sync_book_key(&book_key);
            self.loads.clear();
            self.preload.reset();
            self.virtualizer.reset_measurements();
            self.tracker.reset();
            self.preload_token.cancel();
            self.preload_token = PreloadToken::new(book_key.clone());
            self.book_key = book_key;
        }

        self.virtualizer.set_count(props.total_pages as usize);
        self.virtualizer
            .set_estimated_size(props.config.estimated_page_height);
        self.virtualizer.set_overscan(props.config.overscan as usize);
        self.spread.set_enabled(props.spread_mode);
        self.smooth.set_restore_delay(props.restore_delay);

        let zoom = props.zoom_level;
        let zoom_changed = (zoom - self.props.zoom_level).abs() > f32::EPSILON;
        self.props = ComicViewProps {
            zoom_level: self.props.zoom_level,
            ..props
        };
        self.resize_surface_content();
        if zoom_changed {
            self.set_zoom(zoom);
        } else {
            self.sync_scroll();
        }
    }

    /// A page image finished loading with its natural size.
    pub fn on_page_loaded(&mut self, page: u32, dims: PageDimensions) -> bool {
        if page == 0 || page > self.props.total_pages {
            debug!(page, "Ignoring load for a page outside the book");
            return false;
        }
        self.spread.record_dimensions(page, dims);
        let changed = self.loads.mark_loaded(page, dims);
        if let Some(surface) = self.surface.as_ref() {
            self.virtualizer.set_scroll_offset(surface.scroll_top());
        }
        let delta = self.measure_page(page, dims);
        self.resize_surface_content();
        self.shift_surface(delta);
        self.sync_scroll();
        changed
    }

    /// A page image failed; only that page shows an error.
    pub fn on_page_failed(&mut self, page: u32, reason: impl Into<String>) -> bool {
        if page == 0 || page > self.props.total_pages {
            return false;
        }
        self.loads.mark_failed(page, reason)
    }

    pub fn render(&self) -> RenderedViewport {
        let pages = self
            .virtualizer
            .virtual_items()
            .into_iter()
            .map(|item| {
                let page = item.page();
                RenderedPage {
                    page,
                    start: item.start,
                    size: item.size,
                    url: page_image_url(&self.props.image_base_url, &self.book_key, page)
                        .unwrap_or_else(|err| {
                            debug!(page, "No image URL: {err:#}");
                            String::new()
                        }),
                    load_state: self.loads.get(page),
                }
            })
            .collect();
        RenderedViewport {
            total_size: self.virtualizer.total_size(),
            snap: self.props.config.enable_snap,
            pages,
        }
    }

    /// Tear the view down and hand the surface back.
    pub fn unmount(mut self) -> Option<S> {
        self.teardown();
        self.surface.take()
    }

    fn clamp_for_navigation(&self, page: i64) -> Option<u32> {
        if self.surface.is_none() {
            debug!(page, "Navigation ignored without a scroll surface");
            return None;
        }
        clamp_page(page, self.props.total_pages)
    }

    fn scroll_surface_to(
        &mut self,
        page: u32,
        behavior: ScrollBehavior,
        now: Option<Instant>,
    ) -> Option<ScrollRequest> {
        let surface = self.surface.as_mut()?;
        if self.initial_jump_pending {
            debug!(page, "Explicit navigation replaces the initial jump");
            self.initial_jump_pending = false;
        }
        let index = (page - 1) as usize;
        if let (ScrollBehavior::Smooth, Some(now)) = (behavior, now) {
            self.smooth.begin_smooth(surface, now);
        }
        let offset = self.virtualizer.scroll_to_index_offset(index, Align::Start);
        surface.set_scroll_top(offset);
        debug!(page, index, offset, %behavior, "Scrolled to page");
        self.sync_scroll();
        Some(ScrollRequest {
            index,
            page,
            offset,
            behavior,
        })
    }

    /// Rendered height of a page at the current client width, before zoom.
    fn measure_page(&mut self, page: u32, dims: PageDimensions) -> f32 {
        let Some(surface) = self.surface.as_ref() else {
            return 0.0;
        };
        let width = surface.client_width();
        if dims.is_empty() || width <= 0.0 {
            return 0.0;
        }
        let height = dims.height as f32 * width / dims.width as f32;
        self.virtualizer
            .measure((page - 1) as usize, height)
            .unwrap_or(0.0)
    }

    fn shift_surface(&mut self, delta: f32) {
        if delta == 0.0 {
            return;
        }
        if let Some(surface) = self.surface.as_mut() {
            let top = surface.scroll_top();
            surface.set_scroll_top(top + delta);
        }
    }

    fn resize_surface_content(&mut self) {
        let total = self.virtualizer.total_size();
        let scale = self.virtualizer.scale();
        if let Some(surface) = self.surface.as_mut() {
            let width = surface.client_width() * scale;
            surface.resize_content(width, total);
        }
    }

    fn sync_scroll(&mut self) {
        let Some(surface) = self.surface.as_ref() else {
            return;
        };
        self.virtualizer.set_viewport_size(surface.client_height());
        self.virtualizer.set_scroll_offset(surface.scroll_top());
        let items = self.virtualizer.virtual_items();
        let current = current_page(
            &items,
            self.virtualizer.scroll_offset(),
            self.virtualizer.viewport_size(),
        );
        if let Some(change) = self.tracker.observe(current, self.props.total_pages) {
            debug!(
                page = change.page,
                total_pages = change.total_pages,
                progress = change.progress,
                "Current page changed"
            );
            if let Some(callback) = self.on_page_change.as_mut() {
                callback(change.page, change.total_pages, change.progress);
            }
        }
    }

    fn teardown(&mut self) {
        if let Some(surface) = self.surface.as_mut() {
            if self.smooth.cancel(surface) {
                debug!("Restored scroll behavior on unmount");
            }
        }
        self.initial_jump_pending = false;
        self.preload_token.cancel();
        if let Some(mut registration) = self.jump_registration.take() {
            registration(None);
        }
    }
}

impl<S: ScrollSurface, H: SpreadHeuristic> Drop for ComicView<S, H> {
    fn drop(&mut self) {
        self.teardown();
    }
}

fn sanitize_zoom(zoom: f32) -> f32 {
    if zoom.is_finite() && zoom > 0.0 { zoom } else { 1.0 }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::smooth_scroll::SmoothScrollState;
    use crate::surface::MemorySurface;
    use std::cell::RefCell;
    use std::rc::Rc;

    const CLIENT_WIDTH: f32 = 900.0;
    const CLIENT_HEIGHT: f32 = 1000.0;

    fn props(total_pages: u32) -> ComicViewProps {
        ComicViewProps::new("42", "cbz", total_pages)
    }

    fn mounted(props: ComicViewProps) -> ComicView<MemorySurface> {
        ComicView::mount(
            props,
            MemorySurface::new(CLIENT_WIDTH, CLIENT_HEIGHT).recording(),
        )
    }

    fn record_changes(view: &mut ComicView<MemorySurface>) -> Rc<RefCell<Vec<(u32, u32, f64)>>> {
        let changes = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&changes);
        view.set_page_change_callback(Some(Box::new(move |page: u32, total: u32, progress: f64| {
            sink.borrow_mut().push((page, total, progress));
        })));
        changes
    }

    fn top(view: &ComicView<MemorySurface>) -> f32 {
        view.surface().map(|surface| surface.scroll_top()).unwrap_or(-1.0)
    }

    #[test]
    fn out_of_range_pages_are_clamped() {
        let mut view = mounted(props(10));
        let now = Instant::now();

        let first = view
            .scroll_to_page(0, ScrollBehavior::Auto, now)
            .expect("surface attached");
        assert_eq!(first.index, 0);
        assert_eq!(first.page, 1);

        let last = view
            .scroll_to_page(999, ScrollBehavior::Auto, now)
            .expect("surface attached");
        assert_eq!(last.index, 9);
        assert_eq!(last.page, 10);
    }

    #[test]
    fn navigation_without_surface_is_a_no_op() {
        let mut view: ComicView<MemorySurface> = ComicView::new(props(10));
        assert_eq!(view.jump_to_page(3), None);
        assert_eq!(view.jump_to_progress(0.5), None);
        assert_eq!(
            view.scroll_to_page(3, ScrollBehavior::Smooth, Instant::now()),
            None
        );
    }

    #[test]
    fn jumps_scroll_to_page_start() {
        let mut view = mounted(props(10));
        let request = view.jump_to_page(5).expect("surface attached");
        assert_eq!(request.offset, 4.0 * 1200.0);
        assert_eq!(top(&view), 4800.0);
        assert_eq!(view.current_page(), Some(5));

        view.jump_to_progress(0.11);
        assert_eq!(view.current_page(), Some(2));
    }

    #[test]
    fn smooth_scroll_restores_after_delay() {
        let mut view = mounted(props(10));
        let start = Instant::now();

        view.scroll_to_page(4, ScrollBehavior::Smooth, start);
        let surface = view.surface().expect("surface");
        assert_eq!(surface.scroll_behavior(), ScrollBehavior::Smooth);

        view.tick(start + Duration::from_millis(499));
        assert!(view.smooth_scroll().is_pending());

        view.tick(start + Duration::from_millis(500));
        let surface = view.surface().expect("surface");
        assert_eq!(surface.scroll_behavior(), ScrollBehavior::Auto);
        assert_eq!(view.smooth_scroll().state(), SmoothScrollState::Idle);
    }

    #[test]
    fn repeated_smooth_scrolls_restore_once_from_the_last_call() {
        let mut view = mounted(props(10));
        let start = Instant::now();

        view.scroll_to_page(2, ScrollBehavior::Smooth, start);
        view.scroll_to_page(6, ScrollBehavior::Smooth, start + Duration::from_millis(300));

        view.tick(start + Duration::from_millis(600));
        assert!(view.smooth_scroll().is_pending());

        view.tick(start + Duration::from_millis(800));
        assert!(!view.smooth_scroll().is_pending());
        let surface = view.surface().expect("surface");
        assert_eq!(
            surface.behavior_writes(),
            &[ScrollBehavior::Smooth, ScrollBehavior::Auto]
        );
    }

    #[test]
    fn auto_scroll_leaves_pending_restore_alone() {
        let mut view = mounted(props(10));
        let start = Instant::now();

        view.scroll_to_page(3, ScrollBehavior::Smooth, start);
        let deadline = view.smooth_scroll().deadline();
        view.scroll_to_page(7, ScrollBehavior::Auto, start + Duration::from_millis(100));

        assert_eq!(view.smooth_scroll().deadline(), deadline);
        assert_eq!(view.current_page(), Some(7));
        let surface = view.surface().expect("surface");
        assert_eq!(surface.behavior_writes(), &[ScrollBehavior::Smooth]);
    }

    #[test]
    fn unmount_restores_behavior_synchronously() {
        let mut view = mounted(props(10));
        view.scroll_to_page(5, ScrollBehavior::Smooth, Instant::now());

        let surface = view.unmount().expect("surface returned");
        assert_eq!(surface.scroll_behavior(), ScrollBehavior::Auto);
        assert_eq!(
            surface.behavior_writes(),
            &[ScrollBehavior::Smooth, ScrollBehavior::Auto]
        );
    }

    #[test]
    fn initial_page_jump_runs_once_on_tick() {
        let mut view = mounted(props(10).with_initial_page(5));
        assert!(view.is_initial_jump_pending());
        assert_eq!(top(&view), 0.0);

        let now = Instant::now();
        view.tick(now);
        assert_eq!(top(&view), 4800.0);
        assert!(!view.is_initial_jump_pending());

        view.jump_to_page(1);
        view.tick(now);
        view.update_props(props(10).with_initial_page(5));
        view.tick(now);
        assert_eq!(top(&view), 0.0);
    }

    #[test]
    fn explicit_navigation_cancels_the_pending_initial_jump() {
        let mut view = mounted(props(10).with_initial_page(5));
        view.jump_to_page(3);
        assert!(!view.is_initial_jump_pending());

        view.tick(Instant::now());
        assert_eq!(view.current_page(), Some(3));
        assert_eq!(top(&view), 2.0 * 1200.0);

        let mut view = mounted(props(10).with_initial_page(5));
        view.jump_to_progress(0.75);
        view.tick(Instant::now());
        assert_eq!(view.current_page(), Some(8));
    }

    #[test]
    fn out_of_range_initial_page_is_ignored() {
        let view = mounted(props(10).with_initial_page(11));
        assert!(!view.is_initial_jump_pending());
        let view = mounted(props(10).with_initial_page(0));
        assert!(!view.is_initial_jump_pending());
    }

    #[test]
    fn initial_jump_waits_for_a_surface() {
        let mut view: ComicView<MemorySurface> = ComicView::new(props(10).with_initial_page(3));
        let now = Instant::now();
        view.tick(now);
        assert!(view.is_initial_jump_pending());

        view.attach_surface(MemorySurface::new(CLIENT_WIDTH, CLIENT_HEIGHT));
        view.tick(now);
        assert_eq!(view.current_page(), Some(3));
    }

    #[test]
    fn page_changes_are_edge_triggered() {
        let mut view: ComicView<MemorySurface> = ComicView::new(props(10));
        let changes = record_changes(&mut view);
        view.attach_surface(MemorySurface::new(CLIENT_WIDTH, CLIENT_HEIGHT));
        assert_eq!(changes.borrow().as_slice(), &[(1, 10, 0.1)]);

        if let Some(surface) = view.surface_mut() {
            surface.set_scroll_top(100.0);
        }
        view.handle_scroll();
        view.tick(Instant::now());
        assert_eq!(changes.borrow().len(), 1);

        view.jump_to_page(5);
        assert_eq!(changes.borrow().last(), Some(&(5, 10, 0.5)));
        assert_eq!(changes.borrow().len(), 2);
    }

    #[test]
    fn legacy_registration_feeds_the_command_queue() {
        let mut view = mounted(props(10));
        let changes = record_changes(&mut view);

        let first: Rc<RefCell<Vec<Option<JumpHandle>>>> = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&first);
        view.set_jump_registration(Some(Box::new(move |handle: Option<JumpHandle>| {
            sink.borrow_mut().push(handle)
        })));

        let handle = first.borrow()[0].clone().expect("handle on registration");
        assert!(handle.jump(0.5));
        assert_eq!(view.current_page(), Some(1));
        view.tick(Instant::now());
        assert_eq!(view.current_page(), Some(5));
        assert_eq!(changes.borrow().last(), Some(&(5, 10, 0.5)));

        let second: Rc<RefCell<Vec<Option<JumpHandle>>>> = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&second);
        view.set_jump_registration(Some(Box::new(move |handle: Option<JumpHandle>| {
            sink.borrow_mut().push(handle)
        })));
        assert_eq!(first.borrow().len(), 2);
        assert!(first.borrow()[1].is_none());

        drop(view);
        assert_eq!(second.borrow().len(), 2);
        assert!(second.borrow()[1].is_none());
        assert!(!handle.jump(0.2));
    }

    #[test]
    fn spread_state_resets_on_book_change_only() {
        let mut view = mounted(props(10).with_spread_mode(true));
        let wide = PageDimensions::new(2000, 1400);
        view.on_page_loaded(1, wide);
        view.on_page_loaded(2, wide);
        assert!(view.effective_spread_mode());
        assert_eq!(view.spread_detector().recorded_pages(), 2);

        view.update_props(props(10).with_spread_mode(true).with_zoom(1.0));
        assert_eq!(view.spread_detector().recorded_pages(), 2);

        let token = view.preload_token();
        view.update_props(
            ComicViewProps::new("43", "cbz", 10).with_spread_mode(true),
        );
        assert_eq!(view.spread_detector().recorded_pages(), 0);
        assert!(!view.effective_spread_mode());
        assert_eq!(view.load_states().get(1), PageLoadState::Pending);
        assert!(token.is_cancelled());
        assert!(!view.preload_token().is_cancelled());
        assert_eq!(view.preload_token().book(), &BookKey::new("43", "cbz"));
    }

    #[test]
    fn book_switch_reports_the_page_again() {
        let mut view = mounted(props(10));
        let changes = record_changes(&mut view);
        view.update_props(ComicViewProps::new("43", "cbz", 20));
        assert_eq!(changes.borrow().as_slice(), &[(1, 20, 0.05)]);
    }

    #[test]
    fn zoom_keeps_the_visual_center() {
        let mut view = mounted(props(10));
        if let Some(surface) = view.surface_mut() {
            surface.set_scroll_top(1000.0);
            surface.set_scroll_left(0.0);
        }
        view.handle_scroll();

        assert!(view.set_zoom(2.0));
        let surface = view.surface().expect("surface");
        let half_h = CLIENT_HEIGHT / 2.0;
        let half_w = CLIENT_WIDTH / 2.0;
        assert_eq!(surface.scroll_top(), (1000.0 + half_h) * 2.0 - half_h);
        assert_eq!(surface.scroll_left(), half_w * 2.0 - half_w);
        assert_eq!(view.virtualizer().total_size(), 10.0 * 1200.0 * 2.0);
    }

    #[test]
    fn zooming_out_recenters_from_the_unclamped_offset() {
        let mut view = mounted(props(10));
        assert!(view.set_zoom(2.0));
        if let Some(surface) = view.surface_mut() {
            surface.set_scroll_top(18000.0);
        }
        view.handle_scroll();

        assert!(view.set_zoom(1.0));
        let half_h = CLIENT_HEIGHT / 2.0;
        assert_eq!(top(&view), (18000.0 + half_h) * 0.5 - half_h);
        assert_eq!(top(&view), 8750.0);
        assert_eq!(view.virtualizer().total_size(), 10.0 * 1200.0);
    }

    #[test]
    fn sub_epsilon_zoom_leaves_offsets_alone() {
        let mut view = mounted(props(10));
        if let Some(surface) = view.surface_mut() {
            surface.set_scroll_top(1000.0);
        }
        view.handle_scroll();

        assert!(!view.set_zoom(1.0005));
        assert_eq!(top(&view), 1000.0);
    }

    #[test]
    fn loading_a_page_above_the_viewport_keeps_content_in_place() {
        let mut view = mounted(props(10));
        view.jump_to_page(5);
        assert_eq!(top(&view), 4800.0);

        assert!(view.on_page_loaded(1, PageDimensions::new(900, 600)));
        assert_eq!(top(&view), 4200.0);
        assert_eq!(
            view.virtualizer().scroll_to_index_offset(4, Align::Start),
            4200.0
        );
        assert_eq!(view.current_page(), Some(5));
    }

    #[test]
    fn failed_page_does_not_affect_neighbours() {
        let mut view = mounted(props(10));
        view.on_page_loaded(2, PageDimensions::new(900, 1350));
        assert!(view.on_page_failed(1, "HTTP 404"));

        let rendered = view.render();
        assert_eq!(
            rendered.pages[0].load_state,
            PageLoadState::Failed {
                reason: "HTTP 404".to_string()
            }
        );
        assert_eq!(
            rendered.pages[1].load_state,
            PageLoadState::Loaded {
                width: 900,
                height: 1350
            }
        );
        assert_eq!(rendered.pages[1].size, 1350.0);
        assert!(!view.on_page_failed(11, "out of range"));
    }

    #[test]
    fn render_mounts_only_the_overscanned_window() {
        let mut view = mounted(props(100).with_image_base_url("http://host"));
        view.jump_to_page(50);
        let rendered = view.render();
        let pages: Vec<u32> = rendered.pages.iter().map(|page| page.page).collect();
        assert_eq!(pages, vec![48, 49, 50, 51, 52]);
        assert_eq!(rendered.total_size, 100.0 * 1200.0);
        assert_eq!(
            rendered.pages[2].url,
            "http://host/api/comic/42/pages/50?file_format=cbz"
        );
    }

    #[test]
    fn preload_follows_the_current_page() {
        let mut view = mounted(props(10));
        view.jump_to_page(5);
        assert_eq!(view.preload_pages(), vec![3, 4, 5, 6, 7]);

        let mut view = mounted(props(10).with_spread_mode(true));
        assert_eq!(view.preload_pages(), vec![1, 2, 3, 4]);
    }

    #[test]
    fn snapping_settles_on_the_nearest_page() {
        let config = ViewportConfig {
            enable_snap: true,
            ..ViewportConfig::default()
        };
        let mut view = mounted(props(10).with_config(config));
        if let Some(surface) = view.surface_mut() {
            surface.set_scroll_top(1700.0);
        }
        view.handle_scroll();
        assert_eq!(view.settle_scroll(), Some(1200.0));
        assert_eq!(top(&view), 1200.0);

        let mut plain = mounted(props(10));
        assert_eq!(plain.settle_scroll(), None);
    }

    #[test]
    fn resize_remeasures_loaded_pages() {
        let mut view = mounted(props(10));
        view.on_page_loaded(1, PageDimensions::new(900, 1800));
        assert_eq!(view.virtualizer().item_size(0), 1800.0);

        if let Some(surface) = view.surface_mut() {
            surface.set_client_size(450.0, 1000.0);
        }
        view.handle_resize();
        assert_eq!(view.virtualizer().item_size(0), 900.0);
    }
}
