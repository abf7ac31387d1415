//! Cancellation of page preloads that belong to one book.

use crate::book_key::BookKey;
use anyhow::{Result, bail};
use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

/// Handed to a preload batch together with the book it loads. The view
/// cancels it when the book changes or the view goes away; the batch checks it
/// before every page.
#[derive(Clone, Debug)]
pub struct PreloadToken {
    book: BookKey,
    cancelled: Arc<AtomicBool>,
}

impl PreloadToken {
    pub fn new(book: BookKey) -> Self {
        Self {
            book,
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn book(&self) -> &BookKey {
        &self.book
    }

    /// Returns `true` only for the call that actually cancelled.
    pub fn cancel(&self) -> bool {
        !self.cancelled.swap(true, Ordering::AcqRel)
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    pub fn ensure_active(&self, page: u32) -> Result<()> {
        if self.is_cancelled() {
            bail!("preload of {} cancelled before page {page}", self.book);
        }
        Ok(())
    }
}
