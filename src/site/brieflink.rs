//! Brieflink shared decks (`brieflink.com/v/...`).

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use super::{measure, read_counter, wait_for, SiteAdapter};
use crate::geometry::Rect;
use crate::page::{KeyEventKind, KeyStroke, KeyTarget, Page};

pub const NAME: &str = "brieflink";

pub const URL_PATTERN: &str = r"^https://brieflink\.com/v/[a-f0-9-]+";

const COUNTER: &str = ".DeckSlider_ButtonContainer";
const SLIDE: &str = ".DeckGalleryPageContainer";

/// The slider only reacts to key-up events on `window`.
const ADVANCE: KeyStroke = KeyStroke::ARROW_RIGHT
    .with_kind(KeyEventKind::Up)
    .on(KeyTarget::Window);

/// Brieflink deck slider adapter.
pub struct BrieflinkAdapter {
    page: Arc<dyn Page>,
}

impl BrieflinkAdapter {
    pub fn new(page: Arc<dyn Page>) -> Self {
        Self { page }
    }
}

/// Router constructor.
pub fn build(page: Arc<dyn Page>) -> Box<dyn SiteAdapter> {
    Box::new(BrieflinkAdapter::new(page))
}

#[async_trait]
impl SiteAdapter for BrieflinkAdapter {
    fn name(&self) -> &'static str {
        NAME
    }

    async fn ready(&self) {
        wait_for(
            self.page.as_ref(),
            &[COUNTER],
            Duration::from_secs(3),
            Duration::from_millis(100),
        )
        .await;
    }

    fn total(&self) -> u32 {
        read_counter(self.page.as_ref(), COUNTER).map_or(0, |c| c.total)
    }

    fn current(&self) -> u32 {
        read_counter(self.page.as_ref(), COUNTER).map_or(0, |c| c.current)
    }

    fn dimensions(&self) -> Option<Rect> {
        measure(self.page.as_ref(), SLIDE)
    }

    async fn next(&self) {
        self.page.send_key(ADVANCE);
    }

    fn settle_delay(&self) -> Option<Duration> {
        Some(Duration::from_millis(600))
    }
}
