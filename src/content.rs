//! Page-embedded content context.
//!
//! One [`ContentScript`] lives in each viewer tab. It resolves the site
//! adapter for its page once, answers the privileged side's requests and
//! runs the auto-capture engine in the page.

use std::sync::{Arc, Mutex, PoisonError};

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::capture::{AutoCapture, CaptureReport};
use crate::config::CaptureTiming;
use crate::counter::SlideCount;
use crate::geometry::Rect;
use crate::messaging::{events, Client, Dispatcher};
use crate::page::Page;
use crate::site::{SiteAdapter, SiteRouter};

/// Content context of one tab.
pub struct ContentScript {
    page: Arc<dyn Page>,
    adapter: Option<Arc<dyn SiteAdapter>>,
    engine: AutoCapture,
    /// The spawned auto-capture run, if one was started.
    running: Mutex<Option<JoinHandle<()>>>,
}

impl ContentScript {
    /// Bind to `page`, picking its adapter from `router`. `background`
    /// addresses the privileged context.
    pub fn new(page: Arc<dyn Page>, router: &SiteRouter, background: Client, timing: CaptureTiming) -> Self {
        let adapter = router.adapter_for(Arc::clone(&page)).map(Arc::from);
        Self {
            page,
            adapter,
            engine: AutoCapture::new(background, timing),
            running: Mutex::new(None),
        }
    }

    /// Name of the matched adapter; `None` on unsupported pages.
    #[must_use]
    pub fn adapter_name(&self) -> Option<&'static str> {
        self.adapter.as_ref().map(|a| a.name())
    }

    /// Current counts of the page, if readable.
    #[must_use]
    pub fn counts(&self) -> Option<SlideCount> {
        self.adapter.as_ref()?.counts()
    }

    /// Run auto-capture to completion, tagging captures with `session`.
    ///
    /// `None` on unsupported pages.
    pub async fn run_capture(&self, session: Option<u64>) -> Option<CaptureReport> {
        let adapter = self.adapter.as_ref()?;
        let report = self.engine.run(adapter.as_ref(), session).await;
        match &report.abort_reason {
            None => info!("{}: auto-capture complete ({} slides)", adapter.name(), report.captured),
            Some(reason) => warn!("{}: auto-capture stopped: {}", adapter.name(), reason),
        }
        Some(report)
    }

    /// Start auto-capture for `session` in the background.
    ///
    /// Returns `false` on unsupported pages. A run still in progress is
    /// aborted first; it belongs to a session that no longer exists.
    pub fn start_capture(self: &Arc<Self>, session: Option<u64>) -> bool {
        if self.adapter.is_none() {
            debug!("No adapter for {}, not capturing", self.page.url());
            return false;
        }

        let mut running = self.running.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(previous) = running.take() {
            if !previous.is_finished() {
                info!("Restarting auto-capture");
            }
            previous.abort();
        }
        let this = Arc::clone(self);
        *running = Some(tokio::spawn(async move {
            this.run_capture(session).await;
        }));
        true
    }

    /// Let the user drag out an area of the page.
    pub async fn select_area(&self) -> Option<Rect> {
        self.page.select_area().await
    }

    /// Handler table of the content context.
    pub fn dispatcher(self: &Arc<Self>) -> Dispatcher {
        let mut dispatcher = Dispatcher::new();

        dispatcher.on::<events::ContentReady, _, _>(|()| async { Ok(true) });

        let this = Arc::clone(self);
        dispatcher.on::<events::StartCapture, _, _>(move |request| {
            let started = this.start_capture(request.session);
            async move { Ok(started) }
        });

        let this = Arc::clone(self);
        dispatcher.on::<events::SelectArea, _, _>(move |()| {
            let this = Arc::clone(&this);
            async move { Ok(this.select_area().await) }
        });

        let this = Arc::clone(self);
        dispatcher.on::<events::GetCounts, _, _>(move |()| {
            let counts = this.counts();
            async move { Ok(counts) }
        });

        dispatcher
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;

    use super::*;
    use crate::browser::testing::FakeBrowser;
    use crate::browser::{Browser, Notification};
    use crate::config::Config;
    use crate::messaging::channel;
    use crate::page::KeyStroke;
    use crate::relay::CaptureRelay;
    use crate::storage::MemoryStore;

    const DECK_URL: &str = "https://pitch.com/public/0f3a-77";

    /// A Pitch-like deck that moves on ArrowRight. The slide's left edge
    /// moves with its index, so captures show which slide they hold.
    struct DeckPage {
        url: &'static str,
        current: AtomicU32,
        total: u32,
    }

    impl DeckPage {
        fn new(url: &'static str, current: u32, total: u32) -> Self {
            Self {
                url,
                current: AtomicU32::new(current),
                total,
            }
        }
    }

    #[async_trait]
    impl Page for DeckPage {
        fn url(&self) -> String {
            self.url.to_string()
        }

        fn text_of(&self, selector: &str) -> Option<String> {
            (selector == ".player-v2-chrome-controls-slide-count")
                .then(|| format!("{} / {}", self.current.load(Ordering::SeqCst), self.total))
        }

        fn previous_sibling_text(&self, _selector: &str) -> Option<String> {
            None
        }

        fn client_rect(&self, selector: &str) -> Option<Rect> {
            let x = 10.0 * f64::from(self.current.load(Ordering::SeqCst));
            (selector == ".slide-wrapper").then_some(Rect::new(x, 20.0, 800.0, 450.0))
        }

        fn device_pixel_ratio(&self) -> f64 {
            2.0
        }

        fn click(&self, _selector: &str) -> bool {
            false
        }

        fn send_key(&self, stroke: KeyStroke) {
            if stroke.key == "ArrowRight" {
                let _ = self
                    .current
                    .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |c| (c < self.total).then_some(c + 1));
            }
        }

        async fn select_area(&self) -> Option<Rect> {
            Some(Rect::new(5.0, 5.0, 50.0, 60.0))
        }
    }

    struct Harness {
        page: Arc<DeckPage>,
        browser: Arc<FakeBrowser>,
        relay: Arc<CaptureRelay>,
        content: Arc<ContentScript>,
        popup: Client,
    }

    /// Privileged relay and one tab's content context, wired both ways.
    fn harness(page: DeckPage) -> Harness {
        let page = Arc::new(page);
        let browser = Arc::new(FakeBrowser::new().with_active_tab(1, page.url));
        let relay = Arc::new(CaptureRelay::new(
            Arc::clone(&browser) as Arc<dyn Browser>,
            Arc::new(MemoryStore::new()),
            &Config::default(),
        ));
        let (background, background_inbox) = channel("background");
        background_inbox.serve(Arc::new(relay.dispatcher()));

        let router = SiteRouter::new().unwrap();
        let content = Arc::new(ContentScript::new(
            Arc::clone(&page) as Arc<dyn Page>,
            &router,
            Client::new(Arc::new(background.clone())),
            CaptureTiming::default(),
        ));
        let (tab, tab_inbox) = channel("tab 1");
        tab_inbox.serve(Arc::new(content.dispatcher()));
        browser.set_tab_endpoint(Arc::new(tab));

        Harness {
            page,
            browser,
            relay,
            content,
            popup: Client::new(Arc::new(background)),
        }
    }

    async fn until_output_opened(browser: &FakeBrowser) {
        for _ in 0..600 {
            if browser.outputs_opened() > 0 {
                return;
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        panic!("output view never opened");
    }

    #[tokio::test(start_paused = true)]
    async fn auto_capture_end_to_end() {
        let h = harness(DeckPage::new(DECK_URL, 1, 4));
        assert_eq!(h.content.adapter_name(), Some("pitch"));

        assert!(h.popup.send::<events::AutoCapture>(()).await.unwrap());
        until_output_opened(&h.browser).await;

        let slides = h.popup.send::<events::OutputReady>(()).await.unwrap();
        assert_eq!(slides.len(), 4);
        assert!(slides.iter().all(|s| s.coordinates_already_device_scaled));
        assert_eq!(slides[0].crop_rectangle, Some(Rect::new(20.0, 40.0, 1600.0, 900.0)));
        // handing the slides to the output consumes the session
        assert!(h.relay.session().slides().is_empty());

        let notifications = h.browser.notifications();
        let progress: Vec<_> = notifications
            .iter()
            .filter_map(|n| match n {
                Notification::Progress { current, .. } => *current,
                _ => None,
            })
            .collect();
        assert_eq!(progress, [1, 2, 3, 4]);
        assert_eq!(notifications.last(), Some(&Notification::OutputOpened));
    }

    #[tokio::test(start_paused = true)]
    async fn auto_capture_from_middle_of_deck() {
        let h = harness(DeckPage::new(DECK_URL, 3, 5));

        assert!(h.popup.send::<events::AutoCapture>(()).await.unwrap());
        until_output_opened(&h.browser).await;

        assert_eq!(h.relay.session().slides().len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn unsupported_page_declines_capture() {
        let h = harness(DeckPage::new("https://example.com/slides", 1, 4));
        assert_eq!(h.content.adapter_name(), None);
        assert_eq!(h.content.counts(), None);

        assert!(!h.popup.send::<events::AutoCapture>(()).await.unwrap());
        assert!(h.content.run_capture(None).await.is_none());
        assert!(h.browser.captures().is_empty());
    }

    #[tokio::test]
    async fn answers_counts_and_selection() {
        let h = harness(DeckPage::new(DECK_URL, 2, 7));
        let tab = Client::new(h.browser.tab_endpoint(1));

        assert!(tab.send::<events::ContentReady>(()).await.unwrap());
        assert_eq!(
            tab.send::<events::GetCounts>(()).await.unwrap(),
            Some(SlideCount { current: 2, total: 7 })
        );
        assert_eq!(
            tab.send::<events::SelectArea>(()).await.unwrap(),
            Some(Rect::new(5.0, 5.0, 50.0, 60.0))
        );
    }

    #[tokio::test]
    async fn keyboard_command_saves_selection() {
        let h = harness(DeckPage::new(DECK_URL, 1, 3));

        let rect = h.relay.remember_selection().await.unwrap();

        assert_eq!(rect, Some(Rect::new(5.0, 5.0, 50.0, 60.0)));
        assert_eq!(h.relay.saved_selection("https://pitch.com").await.unwrap(), rect);
    }

    fn xs(slides: &[crate::session::Slide]) -> Vec<f64> {
        slides.iter().map(|s| s.crop_rectangle.unwrap().x).collect()
    }

    #[tokio::test(start_paused = true)]
    async fn restart_mid_run_replaces_the_running_capture() {
        let h = harness(DeckPage::new(DECK_URL, 1, 6));

        assert!(h.popup.send::<events::AutoCapture>(()).await.unwrap());
        tokio::time::sleep(Duration::from_millis(1_500)).await;
        let before_restart = h.relay.session().slides().len();
        assert!(before_restart > 0 && before_restart < 6, "{before_restart}");

        // Back to the first slide, then start over.
        h.page.current.store(1, Ordering::SeqCst);
        assert!(h.popup.send::<events::AutoCapture>(()).await.unwrap());
        assert!(h.relay.session().slides().len() <= 1);
        until_output_opened(&h.browser).await;
        tokio::time::sleep(Duration::from_secs(10)).await;

        assert_eq!(xs(&h.relay.session().slides()), [20.0, 40.0, 60.0, 80.0, 100.0, 120.0]);
        assert_eq!(h.browser.outputs_opened(), 1);
        assert_eq!(h.browser.captures().len(), before_restart + 6);
    }

    #[tokio::test(start_paused = true)]
    async fn start_after_finished_run_captures_again() {
        let h = harness(DeckPage::new(DECK_URL, 2, 3));

        assert!(h.content.start_capture(None));
        until_output_opened(&h.browser).await;
        h.page.current.store(2, Ordering::SeqCst);
        assert!(h.content.start_capture(None));
        for _ in 0..100 {
            if h.browser.outputs_opened() == 2 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }

        assert_eq!(h.browser.outputs_opened(), 2);
        assert_eq!(xs(&h.relay.session().slides()), [40.0, 60.0, 40.0, 60.0]);
    }
}
