//! Event catalog: the wire contract between contexts.
//!
//! | Event | Request | Response |
//! |---|---|---|
//! | `content:ready` | — | `bool` |
//! | `content:start-capture` | [`StartCaptureRequest`] | `bool` |
//! | `content:capture-page` | [`CapturePageRequest`] | `bool` |
//! | `content:select-area` | — | [`Rect`] or `null` |
//! | `content:get-counts` | — | [`SlideCount`] or `null` |
//! | `output:ready` | — | `[Slide]` |
//! | `open:output` | — | `bool` |
//! | `slides:remove` | [`RemoveRequest`] | `[Slide]` |
//! | `slides:move` | [`MoveRequest`] | `[Slide]` |
//! | `auto:capture` | — | `bool` |
//! | `auto:progress` | [`ProgressRequest`] | `bool` |
//! | `sidepanel:opened` | — | `bool` |
//! | `reset` | — | `bool` |

use serde::{Deserialize, Serialize};

use super::Message;
use crate::counter::SlideCount;
use crate::geometry::Rect;
use crate::session::Slide;

macro_rules! event {
    ($(#[$doc:meta])* $name:ident, $tag:literal, $req:ty => $res:ty) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy)]
        pub struct $name;

        impl Message for $name {
            const EVENT: &'static str = $tag;
            type Request = $req;
            type Response = $res;
        }
    };
}

event!(
    /// Liveness ping to a tab's content context.
    ContentReady, "content:ready", () => bool
);
event!(
    /// Ask a tab to run auto-capture with its site adapter, replacing any
    /// run already in progress.
    StartCapture, "content:start-capture", StartCaptureRequest => bool
);
event!(
    /// Screenshot the visible tab and append it to the session.
    CapturePage, "content:capture-page", CapturePageRequest => bool
);
event!(
    /// Let the user select an area of the page.
    SelectArea, "content:select-area", () => Option<Rect>
);
event!(
    /// Current slide counts of a tab, if its adapter can read them.
    GetCounts, "content:get-counts", () => Option<SlideCount>
);
event!(
    /// Hand the session's slides to the output page, emptying the session.
    OutputReady, "output:ready", () => Vec<Slide>
);
event!(
    /// Open the output view.
    OpenOutput, "open:output", () => bool
);
event!(
    /// Remove one slide by index.
    SlidesRemove, "slides:remove", RemoveRequest => Vec<Slide>
);
event!(
    /// Move one slide to another index.
    SlidesMove, "slides:move", MoveRequest => Vec<Slide>
);
event!(
    /// Start auto-capture on the active tab.
    AutoCapture, "auto:capture", () => bool
);
event!(
    /// Progress report from a running auto-capture.
    AutoProgress, "auto:progress", ProgressRequest => bool
);
event!(
    /// The side panel opened; starts a fresh session.
    SidepanelOpened, "sidepanel:opened", () => bool
);
event!(
    /// Discard the session.
    Reset, "reset", () => bool
);

/// Payload of `content:capture-page`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CapturePageRequest {
    /// Last slide of the run; the relay opens the output view afterwards.
    pub done: bool,
    /// Crop rectangle of the slide content.
    pub dimensions: Option<Rect>,
    /// `dimensions` is in device pixels rather than CSS pixels.
    pub coordinates_already_device_scaled: bool,
    /// Session the capture belongs to. Captures of an earlier session are
    /// acknowledged but not kept; `None` always belongs to the live one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session: Option<u64>,
}

/// Payload of `content:start-capture`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StartCaptureRequest {
    /// Session the run's captures are tagged with.
    pub session: Option<u64>,
}

/// Payload of `slides:remove`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoveRequest {
    pub index: i64,
}

/// Payload of `slides:move`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveRequest {
    pub from: i64,
    pub to: i64,
}

/// Payload of `auto:progress`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProgressRequest {
    pub current: Option<u32>,
    pub total: Option<u32>,
}
