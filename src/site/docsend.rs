//! DocSend document viewer (`[team.]docsend.com/view/...`).

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use super::{measure, read_counter, wait_for, SiteAdapter};
use crate::geometry::Rect;
use crate::page::{KeyStroke, Page};

pub const NAME: &str = "docsend";

/// View links, optionally on a custom team subdomain. Case-insensitive.
pub const URL_PATTERN: &str = r"(?i)^https://([a-z0-9]+\.)?docsend\.com/view/[a-z0-9]+";

const COUNTER: &str = ".toolbar-page-indicator";
const SLIDE: &str = ".item.active .viewer_content-container";

/// DocSend viewer adapter.
pub struct DocSendAdapter {
    page: Arc<dyn Page>,
}

impl DocSendAdapter {
    pub fn new(page: Arc<dyn Page>) -> Self {
        Self { page }
    }
}

/// Router constructor.
pub fn build(page: Arc<dyn Page>) -> Box<dyn SiteAdapter> {
    Box::new(DocSendAdapter::new(page))
}

#[async_trait]
impl SiteAdapter for DocSendAdapter {
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
