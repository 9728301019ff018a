//! Privileged browser APIs used by the capture relay.
//!
//! Only the privileged context can screenshot a tab, open extension pages or
//! inject scripts. [`Browser`] is that surface; the relay never touches page
//! DOM and the content side never touches these APIs.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::messaging::Endpoint;

/// Browser tab identifier.
pub type TabId = u32;

/// A browser tab.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tab {
    pub id: TabId,
    pub url: String,
}

/// Screenshot encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    /// Lossy JPEG with quality 0-100.
    Jpeg { quality: u8 },
    Png,
}

/// Events pushed to the extension UI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Notification {
    /// Auto-capture reached slide `current` of `total`.
    Progress {
        current: Option<u32>,
        total: Option<u32>,
    },
    /// Screenshots are failing, most likely for lack of a permission grant.
    CaptureNeedsPermission { message: String },
    /// The output view was opened.
    OutputOpened,
}

/// Errors from privileged browser APIs.
#[derive(Error, Debug)]
pub enum BrowserError {
    #[error("permission denied: {0}")]
    PermissionDenied(String),
}

/// Privileged browser surface.
#[async_trait]
pub trait Browser: Send + Sync {
    /// Active tab of the current window.
    async fn active_tab(&self) -> Option<Tab>;

    /// Message endpoint of a tab's content context. Delivery fails if
    /// nothing is listening in that tab.
    fn tab_endpoint(&self, tab: TabId) -> Arc<dyn Endpoint>;

    /// (Re-)inject the content script into a tab.
    async fn inject_content_script(&self, tab: TabId) -> Result<(), BrowserError>;

    /// Screenshot the visible area of the active tab as a data URL.
    async fn capture_visible_tab(&self, format: ImageFormat) -> Result<String, BrowserError>;

    /// Open the output/export view.
    async fn open_output(&self) -> Result<(), BrowserError>;

    /// Push a notification to the UI. Best-effort.
    async fn notify(&self, notification: Notification);
}
