//! Auto-capture engine.
//!
//! Drives a viewer through its own navigation, one slide at a time:
//!
//! ```text
//! Idle → Ready → Capturing(i) → Advancing(i) → Capturing(i+1) → … → Done
//!                      │                │
//!                      └──── Aborted ───┘
//! ```
//!
//! The screenshot API only sees the visible viewport, so the page is never
//! advanced before the relay has acknowledged the current slide's capture.
//! There is no "transition finished" event on third-party viewers; progress
//! is detected by re-reading the adapter's counter until it changes.

use std::fmt;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::config::CaptureTiming;
use crate::messaging::events::{self, CapturePageRequest, ProgressRequest};
use crate::messaging::Client;
use crate::site::SiteAdapter;

/// Position of the engine in a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureState {
    Idle,
    /// Adapter reported ready (or its readiness probe timed out).
    Ready,
    /// Capturing the slide with this 1-based index.
    Capturing(u32),
    /// Waiting for the viewer to move past this index.
    Advancing(u32),
    Done,
    Aborted,
}

impl fmt::Display for CaptureState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Ready => write!(f, "ready"),
            Self::Capturing(i) => write!(f, "capturing {i}"),
            Self::Advancing(i) => write!(f, "advancing from {i}"),
            Self::Done => write!(f, "done"),
            Self::Aborted => write!(f, "aborted"),
        }
    }
}

/// Why a run stopped early.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AbortReason {
    /// Counts were 0 or inconsistent: the page is not a deck we understand
    /// (or has not loaded). Nothing was captured.
    UnreadableCounts { current: u32, total: u32 },
    /// The viewer did not leave slide `at` in time.
    AdvanceTimedOut { at: u32 },
    /// A capture request was rejected or never answered.
    RelayFailed(String),
}

impl fmt::Display for AbortReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnreadableCounts { current, total } => {
                write!(f, "unreadable slide counts ({current}/{total})")
            }
            Self::AdvanceTimedOut { at } => write!(f, "viewer did not advance past slide {at}"),
            Self::RelayFailed(message) => write!(f, "capture relay failed: {message}"),
        }
    }
}

/// Outcome of [`AutoCapture::run`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureReport {
    /// Terminal state, [`CaptureState::Done`] or [`CaptureState::Aborted`].
    pub state: CaptureState,
    pub abort_reason: Option<AbortReason>,
    /// Capture requests acknowledged by the relay.
    pub captured: u32,
    /// Total reported by the viewer (0 if unreadable).
    pub total: u32,
}

impl CaptureReport {
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.state == CaptureState::Done
    }

    fn aborted(reason: AbortReason, captured: u32, total: u32) -> Self {
        Self {
            state: CaptureState::Aborted,
            abort_reason: Some(reason),
            captured,
            total,
        }
    }
}

/// The auto-capture engine of one content context.
pub struct AutoCapture {
    relay: Client,
    timing: CaptureTiming,
}

impl AutoCapture {
    /// Engine sending its capture requests through `relay`.
    #[must_use]
    pub fn new(relay: Client, timing: CaptureTiming) -> Self {
        Self { relay, timing }
    }

    /// Capture every slide from the current one to the end of the deck.
    ///
    /// Capture requests are tagged with `session`, so the relay can drop
    /// them once that session has been replaced.
    ///
    /// Never fails: unreadable pages abort silently with nothing captured,
    /// and a stalled viewer or relay stops the run while keeping whatever
    /// was already captured.
    pub async fn run(&self, adapter: &dyn SiteAdapter, session: Option<u64>) -> CaptureReport {
        let mut state = CaptureState::Idle;
        let site = adapter.name();

        adapter.ready().await;
        transition(site, &mut state, CaptureState::Ready);

        let total = adapter.total();
        let mut current = adapter.current();
        if total == 0 || current == 0 || current > total {
            debug!("{}: counts {}/{} unreadable, not capturing", site, current, total);
            transition(site, &mut state, CaptureState::Aborted);
            return CaptureReport::aborted(
                AbortReason::UnreadableCounts { current, total },
                0,
                total,
            );
        }

        let remaining = total - current + 1;
        info!("{}: capturing {} slide(s) starting at {}/{}", site, remaining, current, total);

        let mut captured = 0;
        for i in 0..remaining {
            transition(site, &mut state, CaptureState::Capturing(current));
            self.report_progress(current, total).await;

            let is_last = i == remaining - 1;
            let request = CapturePageRequest {
                done: is_last,
                dimensions: adapter.dimensions(),
                coordinates_already_device_scaled: true,
                session,
            };
            if let Err(e) = self.relay.send::<events::CapturePage>(request).await {
                warn!("{}: capture of slide {} failed: {}", site, current, e);
                transition(site, &mut state, CaptureState::Aborted);
                return CaptureReport::aborted(AbortReason::RelayFailed(e.to_string()), captured, total);
            }
            captured += 1;

            if is_last {
                break;
            }

            transition(site, &mut state, CaptureState::Advancing(current));
            let previous = current;
            adapter.next().await;

            let settle = adapter.settle_delay().unwrap_or_else(|| self.timing.settle());
            if !settle.is_zero() {
                tokio::time::sleep(settle).await;
            }

            let Some(next) = wait_for_advance(
                adapter,
                previous,
                self.timing.advance_timeout(),
                self.timing.poll_interval(),
            )
            .await
            else {
                warn!(
                    "{}: no advance past slide {} within {:?}, keeping {} capture(s)",
                    site,
                    previous,
                    self.timing.advance_timeout(),
                    captured
                );
                transition(site, &mut state, CaptureState::Aborted);
                return CaptureReport::aborted(AbortReason::AdvanceTimedOut { at: previous }, captured, total);
            };
            current = next;
        }

        transition(site, &mut state, CaptureState::Done);
        info!("{}: captured {} slide(s)", site, captured);
        CaptureReport {
            state,
            abort_reason: None,
            captured,
            total,
        }
    }

    async fn report_progress(&self, current: u32, total: u32) {
        let progress = ProgressRequest {
            current: Some(current),
            total: Some(total),
        };
        if let Err(e) = self.relay.send::<events::AutoProgress>(progress).await {
            debug!("Progress report dropped: {}", e);
        }
    }
}

fn transition(site: &str, state: &mut CaptureState, next: CaptureState) {
    debug!("{}: {} → {}", site, state, next);
    *state = next;
}

/// Poll the adapter's current index until it differs from `previous`.
///
/// Returns the new index, or `None` if `timeout` passes first. Unreadable
/// reads (0) do not count as a change.
pub async fn wait_for_advance(
    adapter: &dyn SiteAdapter,
    previous: u32,
    timeout: Duration,
    poll: Duration,
) -> Option<u32> {
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        let current = adapter.current();
        if current != 0 && current != previous {
            return Some(current);
        }
        tokio::time::sleep(poll).await;
    }
    None
}
