//! DeckSend viewer (`decksend.net/<hex id>`).
//!
//! Unlike the other viewers, DeckSend renders the current page and the page
//! count in two separate elements, and its slide container varies between
//! layouts, so several candidates are tried in order.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use super::{measure, wait_for, SiteAdapter};
use crate::counter::parse_number;
use crate::geometry::Rect;
use crate::page::{KeyStroke, Page};

pub const NAME: &str = "decksend";

/// Exactly one hex id path segment. Case-insensitive.
pub const URL_PATTERN: &str = r"(?i)^https://decksend\.net/[a-f0-9]+$";

const CURRENT: &str = ".deck-viewer-current-page";
const TOTAL: &str = ".deck-viewer-page-count";

const SLIDE_CANDIDATES: &[&str] = &[
    "#deck-content",
    "#deck-slideshow-container",
    ".deck-slideshow-page:not(.hidden) img",
    ".deck-slideshow-page:not(.hidden) canvas",
    ".deck-viewer img",
    ".deck-viewer canvas",
    ".deck-viewer",
];

const NEXT_CANDIDATES: &[&str] = &[
    r#"button[title="Next"]"#,
    r#"button[aria-label="Next"]"#,
    ".deck-next",
    ".next",
    ".arrow-right",
];

/// DeckSend viewer adapter.
pub struct DeckSendAdapter {
    page: Arc<dyn Page>,
}

impl DeckSendAdapter {
    pub fn new(page: Arc<dyn Page>) -> Self {
        Self { page }
    }
}

/// Router constructor.
pub fn build(page: Arc<dyn Page>) -> Box<dyn SiteAdapter> {
    Box::new(DeckSendAdapter::new(page))
}

#[async_trait]
impl SiteAdapter for DeckSendAdapter {
    fn name(&self) -> &'static str {
        NAME
    }

    async fn ready(&self) {
        wait_for(
            self.page.as_ref(),
            &[CURRENT, TOTAL],
            Duration::from_secs(4),
            Duration::from_millis(120),
        )
        .await;
    }

    fn total(&self) -> u32 {
        parse_number(self.page.text_of(TOTAL).as_deref())
    }

    fn current(&self) -> u32 {
        parse_number(self.page.text_of(CURRENT).as_deref())
    }

    fn dimensions(&self) -> Option<Rect> {
        SLIDE_CANDIDATES
            .iter()
            .find(|s| self.page.exists(s))
            .and_then(|s| measure(self.page.as_ref(), s))
    }

    async fn next(&self) {
        if NEXT_CANDIDATES.iter().any(|s| self.page.click(s)) {
            return;
        }
        self.page.send_key(KeyStroke::ARROW_RIGHT);
    }

    fn settle_delay(&self) -> Option<Duration> {
        Some(Duration::from_millis(650))
    }
}
