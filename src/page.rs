//! DOM access for the viewer page.
//!
//! [`Page`] is everything a site adapter is allowed to do to a third-party
//! viewer: read text, measure elements, send key strokes, click controls and
//! ask the user to draw a selection. Live pages implement it on top of the
//! browser; [`SnapshotPage`] implements the read-only part over saved HTML.

use async_trait::async_trait;
use scraper::{ElementRef, Html, Selector};

use crate::geometry::Rect;

/// Keyboard event flavour a viewer listens for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyEventKind {
    Down,
    Up,
}

/// Where a synthetic key event is dispatched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyTarget {
    Window,
    Document,
}

/// A synthetic key stroke.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyStroke {
    /// `KeyboardEvent.key` value, e.g. `"ArrowRight"`.
    pub key: &'static str,
    pub kind: KeyEventKind,
    pub target: KeyTarget,
}

impl KeyStroke {
    /// `ArrowRight` keydown on the document, understood by most viewers.
    pub const ARROW_RIGHT: Self = Self {
        key: "ArrowRight",
        kind: KeyEventKind::Down,
        target: KeyTarget::Document,
    };

    /// Same key and target with a different event kind.
    #[must_use]
    pub const fn with_kind(self, kind: KeyEventKind) -> Self {
        Self { kind, ..self }
    }

    /// Same key and event kind dispatched elsewhere.
    #[must_use]
    pub const fn on(self, target: KeyTarget) -> Self {
        Self { target, ..self }
    }
}

/// Access to the DOM of the page a content context lives in.
#[async_trait]
pub trait Page: Send + Sync {
    /// Full URL of the page (scheme, host and path).
    fn url(&self) -> String;

    /// Text content of the first element matching `selector`.
    fn text_of(&self, selector: &str) -> Option<String>;

    /// Returns `true` if any element matches `selector`.
    fn exists(&self, selector: &str) -> bool {
        self.text_of(selector).is_some()
    }

    /// Text content of the element sibling immediately before the first
    /// match of `selector`.
    fn previous_sibling_text(&self, selector: &str) -> Option<String>;

    /// First client rectangle of the first element matching `selector`, in
    /// CSS pixels.
    fn client_rect(&self, selector: &str) -> Option<Rect>;

    /// `window.devicePixelRatio`.
    fn device_pixel_ratio(&self) -> f64;

    /// Click the first element matching `selector`. Returns `false` when
    /// nothing matched.
    fn click(&self, selector: &str) -> bool;

    /// Dispatch a synthetic key event.
    fn send_key(&self, stroke: KeyStroke);

    /// Let the user drag out an area of the page. `None` when cancelled.
    async fn select_area(&self) -> Option<Rect>;
}

/// Read-only [`Page`] over a saved HTML document.
///
/// The document is re-parsed on every read; there is no layout, so
/// geometry reads return `None` and navigation does nothing.
#[derive(Debug, Clone)]
pub struct SnapshotPage {
    url: String,
    html: String,
    device_pixel_ratio: f64,
}

impl SnapshotPage {
    pub fn new(url: impl Into<String>, html: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            html: html.into(),
            device_pixel_ratio: 1.0,
        }
    }

    /// Report a different device pixel ratio.
    #[must_use]
    pub fn with_device_pixel_ratio(mut self, ratio: f64) -> Self {
        self.device_pixel_ratio = ratio;
        self
    }

    fn with_first<T>(&self, selector: &str, f: impl FnOnce(ElementRef<'_>) -> Option<T>) -> Option<T> {
        let selector = match Selector::parse(selector) {
            Ok(s) => s,
            Err(e) => {
                tracing::debug!("Invalid selector {:?}: {:?}", selector, e);
                return None;
            }
        };
        let document = Html::parse_document(&self.html);
        let element = document.select(&selector).next()?;
        f(element)
    }
}

fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect()
}

#[async_trait]
impl Page for SnapshotPage {
    fn url(&self) -> String {
        self.url.clone()
    }

    fn text_of(&self, selector: &str) -> Option<String> {
        self.with_first(selector, |el| Some(element_text(el)))
    }

    fn previous_sibling_text(&self, selector: &str) -> Option<String> {
        self.with_first(selector, |el| {
            el.prev_siblings()
                .find_map(ElementRef::wrap)
                .map(element_text)
        })
    }

    fn client_rect(&self, _selector: &str) -> Option<Rect> {
        None
    }

    fn device_pixel_ratio(&self) -> f64 {
        self.device_pixel_ratio
    }

    fn click(&self, selector: &str) -> bool {
        self.exists(selector)
    }

    fn send_key(&self, stroke: KeyStroke) {
        tracing::debug!("Snapshot page ignores key {:?}", stroke);
    }

    async fn select_area(&self) -> Option<Rect> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HTML: &str = r#"
        <html><body>
          <div class="toolbar"><span class="toolbar-page-indicator"> 3 / 12 </span></div>
          <div class="pager">
            <span class="count">4 / 9</span>
            <!-- comment between -->
            <button title="Next page">Next</button>
          </div>
        </body></html>
    "#;

    fn page() -> SnapshotPage {
        SnapshotPage::new("https://docsend.com/view/abc", HTML)
    }

    #[test]
    fn reads_text_of_first_match() {
        assert_eq!(
            page().text_of(".toolbar-page-indicator").as_deref(),
            Some(" 3 / 12 ")
        );
        assert!(page().exists(".toolbar"));
        assert!(!page().exists(".missing"));
    }

    #[test]
    fn reads_previous_element_sibling() {
        assert_eq!(
            page()
                .previous_sibling_text(r#"button[title="Next page"]"#)
                .as_deref(),
            Some("4 / 9")
        );
        assert_eq!(page().previous_sibling_text(".count"), None);
    }

    #[test]
    fn invalid_selector_reads_nothing() {
        assert_eq!(page().text_of("[[["), None);
    }

    #[test]
    fn snapshot_has_no_geometry() {
        assert_eq!(page().client_rect(".toolbar"), None);
        assert!((page().with_device_pixel_ratio(2.0).device_pixel_ratio() - 2.0).abs() < f64::EPSILON);
    }

    #[test]
    fn key_stroke_builders() {
        let up = KeyStroke::ARROW_RIGHT
            .with_kind(KeyEventKind::Up)
            .on(KeyTarget::Window);
        assert_eq!(up.key, "ArrowRight");
        assert_eq!(up.kind, KeyEventKind::Up);
        assert_eq!(up.target, KeyTarget::Window);
    }

    #[tokio::test]
    async fn snapshot_selection_is_cancelled() {
        assert_eq!(page().select_area().await, None);
    }
}
