use crate::config::AppConfig;
use crate::navigation::NavigationCommand;
use crate::page_image::PageLoadState;
use crate::spread::PageDimensions;
use crate::surface::{MemorySurface, ScrollBehavior, ScrollSurface};
use crate::view::{ComicView, ComicViewProps, RenderedPage};
use crate::visible::PageChange;
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::rc::Rc;
use std::time::Instant;
use ts_rs::TS;

#[derive(Debug, Clone, Serialize, TS)]
#[ts(export)]
pub struct ViewportSnapshot {
    pub book_id: String,
    pub format: String,
    pub current_page: Option<u32>,
    pub total_pages: u32,
    pub progress: f64,
    pub zoom_level: f32,
    pub scroll_top: f32,
    pub scroll_left: f32,
    pub client_width: f32,
    pub client_height: f32,
    pub scroll_behavior: ScrollBehavior,
    pub smooth_restore_pending: bool,
    pub spread_mode: bool,
    pub total_size: f32,
    pub snap: bool,
    pub pages: Vec<RenderedPage>,
    pub preload_pages: Vec<u32>,
    pub failed_pages: Vec<u32>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, TS)]
#[serde(tag = "command", rename_all = "snake_case")]
#[ts(export)]
pub enum ViewerCommand {
    GetSnapshot,
    /// `{"command":"navigate","type":"jump_to_page","page":3}`
    Navigate(NavigationCommand),
    /// The user scrolled the container.
    Scroll {
        top: f32,
        #[serde(default)]
        #[ts(optional)]
        left: Option<f32>,
    },
    ScrollEnd,
    Resize {
        width: f32,
        height: f32,
    },
    SetZoom {
        zoom: f32,
    },
    PageLoaded {
        page: u32,
        width: u32,
        height: u32,
    },
    PageFailed {
        page: u32,
        reason: String,
    },
    Tick,
    SwitchBook {
        book_id: String,
        format: String,
        total_pages: u32,
    },
}

impl ViewerCommand {
    pub fn action(&self) -> &'static str {
        match self {
            Self::GetSnapshot => "viewer_get_snapshot",
            Self::Navigate(NavigationCommand::JumpToPage { .. }) => "viewer_jump_to_page",
            Self::Navigate(NavigationCommand::JumpToProgress { .. }) => "viewer_jump_to_progress",
            Self::Navigate(NavigationCommand::ScrollToPage { .. }) => "viewer_scroll_to_page",
            Self::Scroll { .. } => "viewer_scroll",
            Self::ScrollEnd => "viewer_scroll_end",
            Self::Resize { .. } => "viewer_resize",
            Self::SetZoom { .. } => "viewer_set_zoom",
            Self::PageLoaded { .. } => "viewer_page_loaded",
            Self::PageFailed { .. } => "viewer_page_failed",
            Self::Tick => "viewer_tick",
            Self::SwitchBook { .. } => "viewer_switch_book",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ViewerEvent {
    pub action: &'static str,
    pub snapshot: ViewportSnapshot,
    /// Page changes reported since the previous event, oldest first.
    pub page_changes: Vec<PageChange>,
}

/// A comic view over an in-memory surface, driven by serializable commands.
pub struct ViewerSession {
    view: ComicView<MemorySurface>,
    page_changes: Rc<RefCell<Vec<PageChange>>>,
}

impl ViewerSession {
    pub fn open(props: ComicViewProps, surface: MemorySurface) -> Self {
        let page_changes = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&page_changes);
        let mut view = ComicView::new(props);
        view.set_page_change_callback(Some(Box::new(
            move |page: u32, total_pages: u32, progress: f64| {
                sink.borrow_mut().push(PageChange {
                    page,
                    total_pages,
                    progress,
                });
            },
        )));
        view.attach_surface(surface);
        Self { view, page_changes }
    }

    /// Open a book with every setting taken from `config`.
    pub fn from_config(
        book_id: impl Into<String>,
        format: impl Into<String>,
        total_pages: u32,
        initial_page: Option<i64>,
        config: &AppConfig,
    ) -> Self {
        let mut props = ComicViewProps::from_config(book_id, format, total_pages, config);
        props.initial_page = initial_page;
        let surface = MemorySurface::new(config.client_width, config.client_height);
        Self::open(props, surface)
    }

    pub fn view(&self) -> &ComicView<MemorySurface> {
        &self.view
    }

    pub fn view_mut(&mut self) -> &mut ComicView<MemorySurface> {
        &mut self.view
    }

    pub fn snapshot(&mut self) -> ViewportSnapshot {
        let preload_pages = self.view.preload_pages();
        let rendered = self.view.render();
        let props = self.view.props();
        let (scroll_top, scroll_left, client_width, client_height, scroll_behavior) =
            match self.view.surface() {
                Some(surface) => (
                    surface.scroll_top(),
                    surface.scroll_left(),
                    surface.client_width(),
                    surface.client_height(),
                    surface.scroll_behavior(),
                ),
                None => (0.0, 0.0, 0.0, 0.0, ScrollBehavior::default()),
            };
        ViewportSnapshot {
            book_id: props.book_id.clone(),
            format: props.format.clone(),
            current_page: self.view.current_page(),
            total_pages: props.total_pages,
            progress: self.view.progress(),
            zoom_level: self.view.zoom_level(),
            scroll_top,
            scroll_left,
            client_width,
            client_height,
            scroll_behavior,
            smooth_restore_pending: self.view.smooth_scroll().is_pending(),
            spread_mode: self.view.effective_spread_mode(),
            total_size: rendered.total_size,
            snap: rendered.snap,
            pages: rendered.pages,
            preload_pages,
            failed_pages: self.view.load_states().failed_pages(),
        }
    }

    /// Apply `command`, then run the view's deferred work for `now`.
    pub fn apply_command(&mut self, command: ViewerCommand, now: Instant) -> ViewerEvent {
        let action = command.action();
        match command {
            ViewerCommand::GetSnapshot => {}
            ViewerCommand::Navigate(navigation) => {
                self.view.navigate(navigation, now);
            }
            ViewerCommand::Scroll { top, left } => {
                if let Some(surface) = self.view.surface_mut() {
                    surface.set_scroll_top(top);
                    if let Some(left) = left {
                        surface.set_scroll_left(left);
                    }
                }
                self.view.handle_scroll();
            }
            ViewerCommand::ScrollEnd => {
                self.view.settle_scroll();
            }
            ViewerCommand::Resize { width, height } => {
                if let Some(surface) = self.view.surface_mut() {
                    surface.set_client_size(width, height);
                }
                self.view.handle_resize();
            }
            ViewerCommand::SetZoom { zoom } => {
                self.view.set_zoom(zoom);
            }
            ViewerCommand::PageLoaded {
                page,
                width,
                height,
            } => {
                self.view
                    .on_page_loaded(page, PageDimensions::new(width, height));
            }
            ViewerCommand::PageFailed { page, reason } => {
                self.view.on_page_failed(page, reason);
            }
            ViewerCommand::Tick => {}
            ViewerCommand::SwitchBook {
                book_id,
                format,
                total_pages,
            } => {
                let props = ComicViewProps {
                    book_id,
                    format,
                    total_pages,
                    ..self.view.props().clone()
                };
                self.view.update_props(props);
            }
        }
        // Deadlines and the initial jump are checked after every command, not
        // only on an explicit tick.
        self.view.tick(now);
        let page_changes = std::mem::take(&mut *self.page_changes.borrow_mut());
        ViewerEvent {
            action,
            snapshot: self.snapshot(),
            page_changes,
        }
    }

    /// Load state of a single page; pages outside the book read as pending.
    pub fn page_state(&self, page: u32) -> PageLoadState {
        self.view.load_states().get(page)
    }
}
