//! `SlidePrint` - auto-capture engine for hosted slide decks
//!
//! Walks a deck on a supported viewer (Pitch, `DocSend`, Brieflink,
//! visible.vc, `DeckSend`) slide by slide, screenshots each slide, and
//! assembles the screenshots into one printable document.
//!
//! # Architecture
//!
//! Two contexts talk only through [`messaging`]:
//!
//! - the **content context** ([`content::ContentScript`]) lives in the
//!   viewer tab, picks a [`site::SiteAdapter`] for the page and runs the
//!   [`capture::AutoCapture`] engine;
//! - the **privileged context** ([`relay::CaptureRelay`]) screenshots the
//!   visible tab on request and owns the [`session::Session`].
//!
//! [`output`] crops the captured screenshots and renders the print document.
//!
//! # Example
//!
//! ```rust
//! use slideprint::counter::parse_counter;
//! use slideprint::site::SiteRouter;
//!
//! # fn main() -> anyhow::Result<()> {
//! let router = SiteRouter::new()?;
//! let entry = router.resolve("https://docsend.com/view/abc123").unwrap();
//! assert_eq!(entry.name(), "docsend");
//!
//! let count = parse_counter(Some(" 3 / 20 ")).unwrap();
//! assert_eq!((count.current, count.total), (3, 20));
//! # Ok(())
//! # }
//! ```

pub mod browser;
pub mod capture;
pub mod config;
pub mod content;
pub mod counter;
pub mod geometry;
pub mod messaging;
pub mod output;
pub mod page;
pub mod relay;
pub mod session;
pub mod site;
pub mod storage;

pub use browser::{Browser, BrowserError, Notification, Tab, TabId};
pub use capture::{AbortReason, AutoCapture, CaptureReport, CaptureState};
pub use config::Config;
pub use content::ContentScript;
pub use counter::{parse_counter, SlideCount};
pub use geometry::{normalize_hidpi, Rect};
pub use messaging::{Client, Dispatcher, Endpoint, Envelope, MessagingError, RawRequest};
pub use output::{crop_slide, render_document, OutputError};
pub use page::{Page, SnapshotPage};
pub use relay::CaptureRelay;
pub use session::{SharedSession, Session, Slide};
pub use site::{SiteAdapter, SiteRouter};
pub use storage::{JsonFileStore, KeyValueStore, MemoryStore};

/// Version of slideprint
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
