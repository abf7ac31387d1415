//! Temporary smooth `scroll-behavior` with a debounced restore.
//!
//! A smooth scroll forces the container's behavior to `smooth` and arms a
//! restore deadline. Further smooth scrolls inside the window push the
//! deadline out instead of stacking restores, and the behavior captured by the
//! first call is what eventually gets written back.

use crate::surface::{ScrollBehavior, ScrollSurface};
use std::time::{Duration, Instant};
use tracing::debug;

pub const SMOOTH_SCROLL_RESTORE_DELAY_MS: u64 = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SmoothScrollState {
    Idle,
    SmoothPending {
        original: ScrollBehavior,
        deadline: Instant,
    },
}

#[derive(Debug, Clone)]
pub struct SmoothScrollController {
    state: SmoothScrollState,
    restore_delay: Duration,
}

impl Default for SmoothScrollController {
    fn default() -> Self {
        Self::new(Duration::from_millis(SMOOTH_SCROLL_RESTORE_DELAY_MS))
    }
}

impl SmoothScrollController {
    pub fn new(restore_delay: Duration) -> Self {
        Self {
            state: SmoothScrollState::Idle,
            restore_delay,
        }
    }

    pub fn state(&self) -> SmoothScrollState {
        self.state
    }

    pub fn restore_delay(&self) -> Duration {
        self.restore_delay
    }

    pub fn set_restore_delay(&mut self, restore_delay: Duration) {
        self.restore_delay = restore_delay;
    }

    pub fn is_pending(&self) -> bool {
        matches!(self.state, SmoothScrollState::SmoothPending { .. })
    }

    pub fn deadline(&self) -> Option<Instant> {
        match self.state {
            SmoothScrollState::Idle => None,
            SmoothScrollState::SmoothPending { deadline, .. } => Some(deadline),
        }
    }

    /// Switch the surface to smooth scrolling ahead of a scroll command and
    /// (re)arm the restore deadline.
    pub fn begin_smooth<S: ScrollSurface + ?Sized>(&mut self, surface: &mut S, now: Instant) {
        let original = match self.state {
            SmoothScrollState::Idle => {
                let original = surface.scroll_behavior();
                surface.set_scroll_behavior(ScrollBehavior::Smooth);
                debug!(%original, "Smooth scroll window opened");
                original
            }
            SmoothScrollState::SmoothPending { original, .. } => {
                if surface.scroll_behavior() != ScrollBehavior::Smooth {
                    surface.set_scroll_behavior(ScrollBehavior::Smooth);
                }
                original
            }
        };
        self.state = SmoothScrollState::SmoothPending {
            original,
            deadline: now + self.restore_delay,
        };
    }

    /// Restore the original behavior once the deadline has passed. Returns
    /// whether a restore happened.
    pub fn poll<S: ScrollSurface + ?Sized>(&mut self, surface: &mut S, now: Instant) -> bool {
        match self.state {
            SmoothScrollState::SmoothPending { original, deadline } if now >= deadline => {
                surface.set_scroll_behavior(original);
                self.state = SmoothScrollState::Idle;
                debug!(%original, "Smooth scroll window closed");
                true
            }
            _ => false,
        }
    }

    /// Restore immediately and drop any pending deadline.
    pub fn cancel<S: ScrollSurface + ?Sized>(&mut self, surface: &mut S) -> bool {
        match self.state {
            SmoothScrollState::SmoothPending { original, .. } => {
                surface.set_scroll_behavior(original);
                self.state = SmoothScrollState::Idle;
                true
            }
            SmoothScrollState::Idle => false,
        }
    }
}
