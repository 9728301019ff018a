//! Pitch public presentations (`pitch.com/public/...`).

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use super::{measure, read_counter, wait_for, SiteAdapter};
use crate::geometry::Rect;
use crate::page::{KeyStroke, Page};

pub const NAME: &str = "pitch";

/// Public deck links: `https://pitch.com/public/<uuid>[/<uuid>]`.
pub const URL_PATTERN: &str = r"^https://pitch\.com/public/[a-f0-9-]+";

const COUNTER: &str = ".player-v2-chrome-controls-slide-count";
const SLIDE: &str = ".slide-wrapper";

/// Pitch player adapter.
pub struct PitchAdapter {
    page: Arc<dyn Page>,
}

impl PitchAdapter {
    pub fn new(page: Arc<dyn Page>) -> Self {
        Self { page }
    }
}

/// Router constructor.
pub fn build(page: Arc<dyn Page>) -> Box<dyn SiteAdapter> {
    Box::new(PitchAdapter::new(page))
}

#[async_trait]
impl SiteAdapter for PitchAdapter {
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
        self.page.send_key(KeyStroke::ARROW_RIGHT);
    }

    fn settle_delay(&self) -> Option<Duration> {
        Some(Duration::from_millis(600))
    }
}
