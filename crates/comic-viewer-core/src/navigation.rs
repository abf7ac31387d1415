//! Navigation commands and page clamping.
//!
//! Every way of moving the viewport is expressed as a [`NavigationCommand`].
//! Older call sites that expect to be handed a "jump to progress" function
//! receive a [`JumpHandle`], which feeds the same command queue.

use crate::surface::ScrollBehavior;
use serde::{Deserialize, Serialize};
use std::sync::mpsc::Sender;
use tracing::debug;
use ts_rs::TS;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[serde(tag = "type", rename_all = "snake_case")]
#[ts(export)]
pub enum NavigationCommand {
    JumpToPage {
        #[ts(type = "number")]
        page: i64,
    },
    JumpToProgress {
        progress: f64,
    },
    ScrollToPage {
        #[ts(type = "number")]
        page: i64,
        #[serde(default)]
        behavior: ScrollBehavior,
    },
}

/// Clamp a requested page into `1..=total_pages`; `None` for an empty book.
pub fn clamp_page(page: i64, total_pages: u32) -> Option<u32> {
    if total_pages == 0 {
        return None;
    }
    Some(page.clamp(1, total_pages as i64) as u32)
}

/// `ceil(progress * total_pages)`, clamped. Non-finite progress maps to the
/// first page.
pub fn page_for_progress(progress: f64, total_pages: u32) -> Option<u32> {
    if total_pages == 0 {
        return None;
    }
    if !progress.is_finite() {
        return Some(1);
    }
    let page = (progress * total_pages as f64).ceil();
    let page = page.clamp(1.0, total_pages as f64) as i64;
    clamp_page(page, total_pages)
}

/// Progress-based jump function handed to legacy registration callbacks.
#[derive(Debug, Clone)]
pub struct JumpHandle {
    sender: Sender<NavigationCommand>,
}

impl JumpHandle {
    pub(crate) fn new(sender: Sender<NavigationCommand>) -> Self {
        Self { sender }
    }

    /// Queue a jump; it is applied on the view's next tick. Returns `false`
    /// once the view is gone.
    pub fn jump(&self, progress: f64) -> bool {
        let delivered = self
            .sender
            .send(NavigationCommand::JumpToProgress { progress })
            .is_ok();
        if !delivered {
            debug!(progress, "Dropped jump for an unmounted view");
        }
        delivered
    }
}

/// Legacy jump registration: receives a handle on mount and `None` on
/// unmount or when replaced.
pub type JumpRegistration = Box<dyn FnMut(Option<JumpHandle>)>;

/// `(current_page, total_pages, progress)`.
pub type PageChangeCallback = Box<dyn FnMut(u32, u32, f64)>;
