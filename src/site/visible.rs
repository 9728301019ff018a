//! Visible.vc investor decks (`decks.visible.vc/...`).

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use super::{measure, wait_for, SiteAdapter};
use crate::counter::{parse_counter, SlideCount};
use crate::geometry::Rect;
use crate::page::{KeyStroke, Page};

pub const NAME: &str = "visible.vc";

/// Deck slugs. Case-insensitive.
pub const URL_PATTERN: &str = r"(?i)^https://decks\.visible\.vc/[a-z0-9_-]+";

/// The counter has no class of its own; it sits right before this button.
const NEXT_BUTTON: &str = r#"button[title="Next page"]"#;
const SLIDE: &str = "body > div > div > div.flex.flex-shrink-0.py-10 > div";

/// Visible.vc deck viewer adapter.
pub struct VisibleAdapter {
    page: Arc<dyn Page>,
}

impl VisibleAdapter {
    pub fn new(page: Arc<dyn Page>) -> Self {
        Self { page }
    }

    fn read_counts(&self) -> Option<SlideCount> {
        parse_counter(self.page.previous_sibling_text(NEXT_BUTTON).as_deref())
    }
}

/// Router constructor.
pub fn build(page: Arc<dyn Page>) -> Box<dyn SiteAdapter> {
    Box::new(VisibleAdapter::new(page))
}

#[async_trait]
impl SiteAdapter for VisibleAdapter {
    fn name(&self) -> &'static str {
        NAME
    }

    async fn ready(&self) {
        wait_for(
            self.page.as_ref(),
            &[NEXT_BUTTON],
            Duration::from_secs(3),
            Duration::from_millis(100),
        )
        .await;
    }

    fn total(&self) -> u32 {
        self.read_counts().map_or(0, |c| c.total)
    }

    fn current(&self) -> u32 {
        self.read_counts().map_or(0, |c| c.current)
    }

    fn dimensions(&self) -> Option<Rect> {
        measure(self.page.as_ref(), SLIDE)
    }

    async fn next(&self) {
        if !self.page.click(NEXT_BUTTON) {
            self.page.send_key(KeyStroke::ARROW_RIGHT);
        }
    }

    fn settle_delay(&self) -> Option<Duration> {
        Some(Duration::from_millis(600))
    }
}
