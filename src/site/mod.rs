//! Site adapters for hosted slide-deck viewers.
//!
//! Each supported viewer gets one adapter that knows where that site keeps
//! its slide counter, which element holds the slide, and how to advance. The
//! auto-capture engine only ever talks to the uniform [`SiteAdapter`]
//! surface.
//!
//! # Architecture
//!
//! - [`SiteAdapter`]: capability set the engine drives
//! - [`SiteRouter`]: ordered URL patterns, first match builds the adapter
//! - [`SiteEntry`]: one pattern + constructor pair
//!
//! # Example
//!
//! ```rust
//! use slideprint::site::SiteRouter;
//!
//! # fn example() -> anyhow::Result<()> {
//! let router = SiteRouter::new()?;
//! assert_eq!(router.resolve("https://docsend.com/view/abc234").map(|e| e.name()), Some("docsend"));
//! assert!(router.resolve("https://docsend.com/help").is_none());
//! # Ok(())
//! # }
//! ```

pub mod brieflink;
pub mod decksend;
pub mod docsend;
pub mod pitch;
pub mod visible;

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use regex::Regex;

use crate::counter::{parse_counter, SlideCount};
use crate::geometry::{normalize_hidpi, Rect};
use crate::page::Page;

/// Uniform capability set of a viewer site.
///
/// Counts use 0 for "unreadable"; the engine treats that as a reason to
/// stop, not as an error.
#[async_trait]
pub trait SiteAdapter: Send + Sync {
    /// Short lowercase site name (e.g., `"docsend"`).
    fn name(&self) -> &'static str;

    /// Wait until the counter DOM is rendered. Bounded; on timeout this
    /// simply returns and later reads come back as 0.
    async fn ready(&self);

    /// Total number of slides, 0 if unreadable.
    fn total(&self) -> u32;

    /// 1-based index of the visible slide, 0 if unreadable.
    fn current(&self) -> u32;

    /// Device-pixel rectangle of the slide content, if present.
    fn dimensions(&self) -> Option<Rect>;

    /// Navigate to the following slide.
    async fn next(&self);

    /// Minimum wait after [`next`](Self::next) before the index is polled.
    /// `None` uses the engine default.
    fn settle_delay(&self) -> Option<Duration> {
        None
    }

    /// Both counts, when both are readable.
    fn counts(&self) -> Option<SlideCount> {
        let current = self.current();
        let total = self.total();
        (current > 0 && total > 0).then_some(SlideCount { current, total })
    }
}

/// Constructor of an adapter bound to one page.
pub type BuildAdapter = fn(Arc<dyn Page>) -> Box<dyn SiteAdapter>;

/// One routing rule: a URL pattern and the adapter it selects.
pub struct SiteEntry {
    name: &'static str,
    pattern: Regex,
    build: BuildAdapter,
}

impl SiteEntry {
    /// Compile `pattern` into a rule for `name`.
    pub fn new(name: &'static str, pattern: &str, build: BuildAdapter) -> Result<Self> {
        let pattern =
            Regex::new(pattern).with_context(|| format!("invalid URL pattern for {name}"))?;
        Ok(Self {
            name,
            pattern,
            build,
        })
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    #[must_use]
    pub fn pattern(&self) -> &str {
        self.pattern.as_str()
    }

    /// Check if this rule handles the given page URL.
    #[must_use]
    pub fn matches(&self, url: &str) -> bool {
        self.pattern.is_match(url)
    }

    /// Build a fresh adapter for `page`.
    #[must_use]
    pub fn build(&self, page: Arc<dyn Page>) -> Box<dyn SiteAdapter> {
        (self.build)(page)
    }
}

impl fmt::Debug for SiteEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SiteEntry")
            .field("name", &self.name)
            .field("pattern", &self.pattern.as_str())
            .finish_non_exhaustive()
    }
}

/// Routes page URLs to site adapters.
///
/// Entries are checked in declaration order. First match wins.
#[derive(Debug)]
pub struct SiteRouter {
    entries: Vec<SiteEntry>,
}

impl SiteRouter {
    /// Create a router with all built-in sites.
    pub fn new() -> Result<Self> {
        Ok(Self::with_entries(vec![
            SiteEntry::new(pitch::NAME, pitch::URL_PATTERN, pitch::build)?,
            SiteEntry::new(docsend::NAME, docsend::URL_PATTERN, docsend::build)?,
            SiteEntry::new(brieflink::NAME, brieflink::URL_PATTERN, brieflink::build)?,
            SiteEntry::new(visible::NAME, visible::URL_PATTERN, visible::build)?,
            SiteEntry::new(decksend::NAME, decksend::URL_PATTERN, decksend::build)?,
        ]))
    }

    /// Create a router over a custom ordered list.
    #[must_use]
    pub fn with_entries(entries: Vec<SiteEntry>) -> Self {
        Self { entries }
    }

    #[must_use]
    pub fn entries(&self) -> &[SiteEntry] {
        &self.entries
    }

    /// First entry whose pattern matches `url`.
    #[must_use]
    pub fn resolve(&self, url: &str) -> Option<&SiteEntry> {
        let entry = self.entries.iter().find(|e| e.matches(url));
        match entry {
            Some(e) => tracing::debug!("Matched site adapter: {}", e.name),
            None => tracing::debug!("No site adapter for {}", url),
        }
        entry
    }

    /// Build the adapter for `page`, or `None` if the site is unsupported.
    #[must_use]
    pub fn adapter_for(&self, page: Arc<dyn Page>) -> Option<Box<dyn SiteAdapter>> {
        let url = page.url();
        self.resolve(&url).map(|entry| entry.build(page))
    }
}

/// Poll until every selector in `selectors` is present or `timeout` passes.
///
/// Returns whether the page became ready.
pub async fn wait_for(page: &dyn Page, selectors: &[&str], timeout: Duration, poll: Duration) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if selectors.iter().all(|s| page.exists(s)) {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            tracing::debug!("Gave up waiting for {:?} after {:?}", selectors, timeout);
            return false;
        }
        tokio::time::sleep(poll).await;
    }
}

/// Parse an "N / M" counter element.
#[must_use]
pub fn read_counter(page: &dyn Page, selector: &str) -> Option<SlideCount> {
    parse_counter(page.text_of(selector).as_deref())
}

/// Device-pixel rectangle of the first element matching `selector`.
#[must_use]
pub fn measure(page: &dyn Page, selector: &str) -> Option<Rect> {
    let rect = page.client_rect(selector)?;
    Some(normalize_hidpi(rect, page.device_pixel_ratio()))
}
