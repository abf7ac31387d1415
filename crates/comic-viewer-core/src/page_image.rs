//! Page images: URLs, per-page load state and the HTTP loader.
//!
//! Load failures stay local to their page. A failed page renders an error
//! placeholder while the rest of the list keeps working.

use crate::book_key::BookKey;
use crate::cancellation::PreloadToken;
use crate::spread::PageDimensions;
use anyhow::{Context, Result, anyhow};
use reqwest::Url;
use serde::Serialize;
use std::collections::HashMap;
use std::io::Cursor;
use std::time::Duration;
use tracing::{debug, warn};
use ts_rs::TS;

const RELATIVE_ORIGIN: &str = "http://origin.invalid/";

/// `GET {base}/api/comic/{book_id}/pages/{page}?file_format={format}`, with the
/// book id and format percent-encoded.
///
/// An empty base yields a path relative to the serving origin.
pub fn page_image_url(base_url: &str, key: &BookKey, page: u32) -> Result<String> {
    let base = base_url.trim();
    let relative = base.is_empty();
    let mut url = Url::parse(if relative { RELATIVE_ORIGIN } else { base })
        .with_context(|| format!("invalid image base URL {base:?}"))?;
    url.set_query(None);
    url.set_fragment(None);
    url.path_segments_mut()
        .map_err(|_| anyhow!("image base URL {base:?} cannot hold a path"))?
        .pop_if_empty()
        .extend(["api", "comic", key.book_id.as_str(), "pages", page.to_string().as_str()]);
    url.query_pairs_mut()
        .append_pair("file_format", &key.format);
    if relative {
        return Ok(format!("{}?{}", url.path(), url.query().unwrap_or_default()));
    }
    Ok(url.into())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
#[serde(tag = "state", rename_all = "snake_case")]
#[ts(export)]
pub enum PageLoadState {
    Pending,
    Loaded { width: u32, height: u32 },
    Failed { reason: String },
}

/// Load state per page for the open book.
#[derive(Debug, Clone, Default)]
pub struct PageLoadStates {
    states: HashMap<u32, PageLoadState>,
}

impl PageLoadStates {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, page: u32) -> PageLoadState {
        self.states
            .get(&page)
            .cloned()
            .unwrap_or(PageLoadState::Pending)
    }

    pub fn is_settled(&self, page: u32) -> bool {
        !matches!(self.get(page), PageLoadState::Pending)
    }

    pub fn mark_loaded(&mut self, page: u32, dims: PageDimensions) -> bool {
        let next = PageLoadState::Loaded {
            width: dims.width,
            height: dims.height,
        };
        self.replace(page, next)
    }

    pub fn mark_failed(&mut self, page: u32, reason: impl Into<String>) -> bool {
        let reason = reason.into();
        warn!(page, %reason, "Page image failed to load");
        self.replace(page, PageLoadState::Failed { reason })
    }

    pub fn failed_pages(&self) -> Vec<u32> {
        let mut pages: Vec<u32> = self
            .states
            .iter()
            .filter(|(_, state)| matches!(state, PageLoadState::Failed { .. }))
            .map(|(page, _)| *page)
            .collect();
        pages.sort_unstable();
        pages
    }

    pub fn clear(&mut self) {
        self.states.clear();
    }

    fn replace(&mut self, page: u32, next: PageLoadState) -> bool {
        if self.states.get(&page) == Some(&next) {
            return false;
        }
        self.states.insert(page, next);
        true
    }
}

/// Read the natural size from an encoded image without decoding pixels.
pub fn decode_dimensions(bytes: &[u8]) -> Result<PageDimensions> {
    let reader = image::ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .context("failed to sniff image format")?;
    let (width, height) = reader
        .into_dimensions()
        .context("failed to read image header")?;
    Ok(PageDimensions::new(width, height))
}

/// Blocking page loader against the comic REST endpoint.
pub struct HttpPageFetcher {
    client: reqwest::blocking::Client,
    base_url: String,
}

impl HttpPageFetcher {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn fetch_dimensions(&self, key: &BookKey, page: u32) -> Result<PageDimensions> {
        let url = page_image_url(&self.base_url, key, page)?;
        debug!(%url, "Fetching page image");
        let response = self
            .client
            .get(&url)
            .send()
            .with_context(|| format!("request failed for {url}"))?
            .error_for_status()
            .with_context(|| format!("server rejected {url}"))?;
        let bytes = response
            .bytes()
            .with_context(|| format!("failed to read body of {url}"))?;
        if bytes.is_empty() {
            return Err(anyhow!("empty image body for page {page}"));
        }
        decode_dimensions(&bytes).with_context(|| format!("page {page} is not a readable image"))
    }

    /// Fetch `pages` of the token's book in order, handing each result to
    /// `on_page` before the next request starts. Stops between pages once the
    /// token is cancelled. Returns how many pages were requested.
    pub fn preload(
        &self,
        token: &PreloadToken,
        pages: &[u32],
        mut on_page: impl FnMut(u32, Result<PageDimensions>),
    ) -> usize {
        let mut requested = 0;
        for &page in pages {
            if let Err(err) = token.ensure_active(page) {
                debug!("{err}");
                break;
            }
            requested += 1;
            on_page(page, self.fetch_dimensions(token.book(), page));
        }
        requested
    }
}
