//! Slide counter parsing.
//!
//! Viewer sites show progress as free text ("3 / 20", "Slide 3/20 ·
//! Presenter view", ...). The DOM is the only source of truth for where a
//! deck is, so counts are parsed fresh on every read and never cached.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

static COUNTER_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([0-9]+)\s*/\s*([0-9]+)").expect("counter pattern is valid"));

/// Position within a deck, as shown by the viewer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlideCount {
    /// 1-based index of the visible slide.
    pub current: u32,
    /// Number of slides in the deck.
    pub total: u32,
}

/// Parse the first `N / M` pair found in `text`.
///
/// Surrounding text and whitespace are ignored. Returns `None` for missing
/// or empty input, when no pair is present, or when either number does not
/// fit in a `u32`.
///
/// ```
/// use slideprint::counter::{parse_counter, SlideCount};
///
/// assert_eq!(parse_counter(Some("  3 / 20 ")), Some(SlideCount { current: 3, total: 20 }));
/// assert_eq!(parse_counter(Some("Page")), None);
/// ```
#[must_use]
pub fn parse_counter(text: Option<&str>) -> Option<SlideCount> {
    let text = text?.trim();
    if text.is_empty() {
        return None;
    }

    let caps = COUNTER_PATTERN.captures(text)?;
    let current = caps.get(1)?.as_str().parse::<u32>().ok()?;
    let total = caps.get(2)?.as_str().parse::<u32>().ok()?;

    Some(SlideCount { current, total })
}

/// Parse a lone integer such as the text of a "page count" element.
///
/// Returns 0 when the text is missing or not a base-10 integer, matching the
/// "unreadable" convention adapters use for counts.
#[must_use]
pub fn parse_number(text: Option<&str>) -> u32 {
    text.map(str::trim)
        .and_then(|t| t.parse::<u32>().ok())
        .unwrap_or(0)
}
