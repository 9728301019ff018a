//! Capture relay: the privileged side of a capture session.
//!
//! Owns the single [`SharedSession`], takes screenshots on request from the
//! content context, and answers the side panel and output page. Everything
//! reaches it as a message; see [`CaptureRelay::dispatcher`].

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use crate::browser::{Browser, ImageFormat, Notification};
use crate::config::Config;
use crate::geometry::Rect;
use crate::messaging::events::{
    self, CapturePageRequest, MoveRequest, ProgressRequest, RemoveRequest, StartCaptureRequest,
};
use crate::messaging::{ensure_content_ready, Client, Dispatcher, ReadyProbe};
use crate::session::{SharedSession, Slide};
use crate::storage::{self, KeyValueStore};

/// Bound on an interactive area selection.
const SELECT_AREA_TIMEOUT: Duration = Duration::from_secs(120);

/// Privileged capture relay.
pub struct CaptureRelay {
    browser: Arc<dyn Browser>,
    store: Arc<dyn KeyValueStore>,
    session: SharedSession,
    probe: ReadyProbe,
    message_timeout: Duration,
    jpeg_quality: u8,
}

impl CaptureRelay {
    pub fn new(browser: Arc<dyn Browser>, store: Arc<dyn KeyValueStore>, config: &Config) -> Self {
        Self {
            browser,
            store,
            session: SharedSession::new(),
            probe: ReadyProbe::from(&config.messaging),
            message_timeout: config.messaging.timeout(),
            jpeg_quality: config.relay.jpeg_quality,
        }
    }

    /// Handle to the live session.
    #[must_use]
    pub fn session(&self) -> SharedSession {
        self.session.clone()
    }

    /// Screenshot the visible tab and append it as a slide.
    ///
    /// Always acknowledges: a failing screenshot is reported to the UI as a
    /// permission problem and leaves the session as it was, so the engine
    /// awaiting this call never hangs on it. Captures tagged with a session
    /// that has since been replaced are dropped, `done` included.
    pub async fn capture_page(&self, request: CapturePageRequest) -> bool {
        if !self.session.lock().is_current(request.session) {
            debug!("Dropping capture of replaced session {:?}", request.session);
            return true;
        }

        let format = ImageFormat::Jpeg {
            quality: self.jpeg_quality,
        };
        match self.browser.capture_visible_tab(format).await {
            Ok(image) => {
                let mut session = self.session.lock();
                if !session.is_current(request.session) {
                    debug!("Session replaced during screenshot, dropping it");
                    return true;
                }
                session.append(Slide {
                    image,
                    crop_rectangle: request.dimensions,
                    coordinates_already_device_scaled: request.coordinates_already_device_scaled,
                });
                debug!("Captured slide {}", session.len());
            }
            Err(e) => {
                warn!("Screenshot failed: {}", e);
                self.browser
                    .notify(Notification::CaptureNeedsPermission {
                        message: e.to_string(),
                    })
                    .await;
            }
        }

        if request.done {
            info!("Capture finished with {} slide(s)", self.session.lock().len());
            match self.browser.open_output().await {
                Ok(()) => self.browser.notify(Notification::OutputOpened).await,
                Err(e) => warn!("Could not open output view: {}", e),
            }
        }
        true
    }

    /// Start auto-capture on the active tab with a fresh session.
    ///
    /// Returns `false` when there is no active tab, its content context never
    /// became ready, or it declined (no adapter for the page).
    pub async fn auto_capture(&self) -> bool {
        let Some(tab) = self.browser.active_tab().await else {
            debug!("auto:capture without an active tab");
            return false;
        };
        let generation = {
            let mut session = self.session.lock();
            session.start();
            session.generation()
        };

        if !ensure_content_ready(self.browser.as_ref(), tab.id, self.probe).await {
            return false;
        }

        let client = Client::new(self.browser.tab_endpoint(tab.id)).with_timeout(self.message_timeout);
        let request = StartCaptureRequest {
            session: Some(generation),
        };
        match client.send::<events::StartCapture>(request).await {
            Ok(started) => {
                info!("Auto-capture on {} started: {}", tab.url, started);
                started
            }
            Err(e) => {
                warn!("Could not start capture in tab {}: {}", tab.id, e);
                false
            }
        }
    }

    async fn open_output(&self) -> Result<bool> {
        self.browser
            .open_output()
            .await
            .context("failed to open output view")?;
        Ok(true)
    }

    /// Ask the active tab for an area selection and persist it for the
    /// tab's origin.
    ///
    /// Returns the stored rectangle, or `None` if the user selected nothing.
    pub async fn remember_selection(&self) -> Result<Option<Rect>> {
        let tab = self
            .browser
            .active_tab()
            .await
            .context("no active tab")?;
        let origin = storage::origin_of(&tab.url)?;

        if let Err(e) = self.browser.inject_content_script(tab.id).await {
            debug!("Injecting content script into tab {} failed: {}", tab.id, e);
        }

        let client = Client::new(self.browser.tab_endpoint(tab.id));
        let selection = client
            .send_with_timeout::<events::SelectArea>((), SELECT_AREA_TIMEOUT)
            .await
            .with_context(|| format!("area selection in tab {} failed", tab.id))?;

        if let Some(rect) = selection {
            storage::save_selection(self.store.as_ref(), &origin, rect).await?;
            info!("Saved selection for {}", origin);
        }
        Ok(selection)
    }

    /// Selection previously saved for `origin`.
    pub async fn saved_selection(&self, origin: &str) -> Result<Option<Rect>> {
        storage::load_selection(self.store.as_ref(), origin).await
    }

    /// Handler table of the privileged context.
    pub fn dispatcher(self: &Arc<Self>) -> Dispatcher {
        let mut dispatcher = Dispatcher::new();

        let relay = Arc::clone(self);
        dispatcher.on::<events::CapturePage, _, _>(move |request| {
            let relay = Arc::clone(&relay);
            async move { Ok(relay.capture_page(request).await) }
        });

        let relay = Arc::clone(self);
        dispatcher.on::<events::AutoCapture, _, _>(move |()| {
            let relay = Arc::clone(&relay);
            async move { Ok(relay.auto_capture().await) }
        });

        let relay = Arc::clone(self);
        dispatcher.on::<events::AutoProgress, _, _>(move |ProgressRequest { current, total }| {
            let relay = Arc::clone(&relay);
            async move {
                relay
                    .browser
                    .notify(Notification::Progress { current, total })
                    .await;
                Ok(true)
            }
        });

        let relay = Arc::clone(self);
        dispatcher.on::<events::OpenOutput, _, _>(move |()| {
            let relay = Arc::clone(&relay);
            async move { relay.open_output().await }
        });

        let session = self.session();
        dispatcher.on::<events::OutputReady, _, _>(move |()| {
            let slides = session.lock().take();
            info!("Handing {} slide(s) to the output view", slides.len());
            async move { Ok(slides) }
        });

        let session = self.session();
        dispatcher.on::<events::SlidesRemove, _, _>(move |RemoveRequest { index }| {
            let mut guard = session.lock();
            guard.remove(index);
            let slides = guard.slides().to_vec();
            async move { Ok(slides) }
        });

        let session = self.session();
        dispatcher.on::<events::SlidesMove, _, _>(move |MoveRequest { from, to }| {
            let mut guard = session.lock();
            guard.move_slide(from, to);
            let slides = guard.slides().to_vec();
            async move { Ok(slides) }
        });

        let session = self.session();
        dispatcher.on::<events::SidepanelOpened, _, _>(move |()| {
            session.lock().start();
            async { Ok(true) }
        });

        let session = self.session();
        dispatcher.on::<events::Reset, _, _>(move |()| {
            session.lock().reset();
            async { Ok(true) }
        });

        dispatcher
    }
}
