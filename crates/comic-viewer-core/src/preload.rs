//! Which pages to fetch ahead of time.
//!
//! The policy is a pure function of a small value object. [`PreloadPlanner`]
//! memoizes it on the value of that object so callers can rebuild the context
//! every frame without re-running the policy.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::trace;
use ts_rs::TS;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PreloadContext {
    pub current_page: u32,
    pub total_pages: u32,
    pub overscan: u32,
    pub spread_mode: bool,
}

/// Computes the set of page numbers to fetch eagerly.
pub trait PreloadPolicy {
    fn preload_pages(&self, ctx: &PreloadContext) -> Vec<u32>;
}

impl<F> PreloadPolicy for F
where
    F: Fn(&PreloadContext) -> Vec<u32>,
{
    fn preload_pages(&self, ctx: &PreloadContext) -> Vec<u32> {
        self(ctx)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultPreloadPolicy;

impl PreloadPolicy for DefaultPreloadPolicy {
    fn preload_pages(&self, ctx: &PreloadContext) -> Vec<u32> {
        default_preload_pages(ctx)
    }
}

/// Current page, its spread partner when spread mode is on, and `overscan`
/// pages on each side. Sorted ascending, no duplicates, never outside
/// `1..=total_pages`.
///
/// In spread mode the partner page is included before any spread has been
/// confirmed for the pair, and the forward window starts after it.
pub fn default_preload_pages(ctx: &PreloadContext) -> Vec<u32> {
    if ctx.total_pages == 0 {
        return Vec::new();
    }
    let total = ctx.total_pages;
    let current = ctx.current_page.clamp(1, total);

    let mut pages = BTreeSet::new();
    pages.insert(current);
    if ctx.spread_mode && current < total {
        pages.insert(current + 1);
    }

    let forward_base = if ctx.spread_mode {
        current.saturating_add(1)
    } else {
        current
    };
    for i in 1..=ctx.overscan {
        if let Some(before) = current.checked_sub(i).filter(|page| *page >= 1) {
            pages.insert(before);
        }
        let after = forward_base.saturating_add(i);
        if after <= total {
            pages.insert(after);
        }
    }

    pages.into_iter().collect()
}

/// Value-memoized wrapper around a [`PreloadPolicy`].
pub struct PreloadPlanner<P = DefaultPreloadPolicy> {
    policy: P,
    memo: Option<(PreloadContext, Vec<u32>)>,
}

impl PreloadPlanner<DefaultPreloadPolicy> {
    pub fn new() -> Self {
        Self::with_policy(DefaultPreloadPolicy)
    }
}

impl Default for PreloadPlanner<DefaultPreloadPolicy> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: PreloadPolicy> PreloadPlanner<P> {
    pub fn with_policy(policy: P) -> Self {
        Self { policy, memo: None }
    }

    /// Pages for `ctx`, re-running the policy only when one of its fields
    /// differs from the previous call.
    pub fn pages(&mut self, ctx: &PreloadContext) -> &[u32] {
        let stale = !matches!(&self.memo, Some((cached, _)) if cached == ctx);
        if stale {
            let pages = self.policy.preload_pages(ctx);
            trace!(
                current = ctx.current_page,
                total = ctx.total_pages,
                overscan = ctx.overscan,
                spread = ctx.spread_mode,
                count = pages.len(),
                "Recomputed preload window"
            );
            self.memo = Some((*ctx, pages));
        }
        match &self.memo {
            Some((_, pages)) => pages,
            None => &[],
        }
    }

    pub fn reset(&mut self) {
        self.memo = None;
    }
}
