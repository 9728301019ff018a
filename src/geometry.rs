//! Capture rectangles and HiDPI normalization.
//!
//! Screenshots are always taken at device-pixel resolution, while layout
//! rectangles read from the DOM are in CSS pixels. Geometry read by site
//! adapters is converted at read time so it lines up with the raw
//! screenshot buffer.

use serde::{Deserialize, Serialize};

/// Axis-aligned rectangle in either CSS or device pixels.
///
/// The space is not encoded in the type; whoever stores a `Rect` keeps the
/// "already device scaled" flag next to it (see [`crate::session::Slide`]).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    #[must_use]
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Multiply every field by `factor`.
    #[must_use]
    pub fn scaled(&self, factor: f64) -> Self {
        Self {
            x: self.x * factor,
            y: self.y * factor,
            width: self.width * factor,
            height: self.height * factor,
        }
    }

    #[must_use]
    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    #[must_use]
    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    /// Returns `true` if the rectangle covers no area.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }

    /// Convert a CSS-pixel rectangle into device pixels.
    ///
    /// See [`normalize_hidpi`].
    #[must_use]
    pub fn to_device_pixels(&self, device_pixel_ratio: f64) -> Self {
        normalize_hidpi(*self, device_pixel_ratio)
    }
}

/// Scale `rect` from CSS pixels to device pixels.
///
/// Only ratios above 1 scale; any other ratio (including NaN) returns an
/// unchanged copy.
#[must_use]
pub fn normalize_hidpi(rect: Rect, device_pixel_ratio: f64) -> Rect {
    if device_pixel_ratio > 1.0 {
        rect.scaled(device_pixel_ratio)
    } else {
        rect
    }
}
