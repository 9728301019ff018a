//! The capture session: slides accumulated between a start and a reset.
//!
//! Exactly one session lives in the privileged context. It is owned by a
//! single [`Session`] value shared with the message handlers through
//! [`SharedSession`]; starting a new session drops whatever the previous one
//! held.

use std::sync::{Arc, Mutex, MutexGuard};

use serde::{Deserialize, Serialize};

use crate::geometry::Rect;

/// One captured slide.
///
/// Serialized with the field names the output page reads (`img`,
/// `dimensions`, `preScaled`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Slide {
    /// Screenshot as a data URL.
    #[serde(rename = "img")]
    pub image: String,
    /// Area of the screenshot holding the slide.
    #[serde(rename = "dimensions", default)]
    pub crop_rectangle: Option<Rect>,
    /// `crop_rectangle` is in device pixels rather than CSS pixels.
    #[serde(rename = "preScaled", default)]
    pub coordinates_already_device_scaled: bool,
}

/// Ordered slides of the live session.
#[derive(Debug, Default)]
pub struct Session {
    slides: Vec<Slide>,
    generation: u64,
}

impl Session {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Begin a fresh session, discarding any unconsumed slides.
    pub fn start(&mut self) {
        if !self.slides.is_empty() {
            tracing::info!("Discarding {} unconsumed slide(s)", self.slides.len());
        }
        self.slides.clear();
        self.generation += 1;
    }

    /// Same as [`start`](Self::start); named for the `reset` event.
    pub fn reset(&mut self) {
        self.start();
    }

    /// Number of sessions started so far.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Whether a capture tagged with `session` belongs to this session.
    /// Untagged captures always do.
    #[must_use]
    pub fn is_current(&self, session: Option<u64>) -> bool {
        session.is_none() || session == Some(self.generation)
    }

    /// Append a slide in capture order.
    pub fn append(&mut self, slide: Slide) {
        self.slides.push(slide);
    }

    #[must_use]
    pub fn slides(&self) -> &[Slide] {
        &self.slides
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.slides.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slides.is_empty()
    }

    /// Remove the slide at `index`. Out-of-range indices change nothing.
    pub fn remove(&mut self, index: i64) -> Option<Slide> {
        let index = usize::try_from(index).ok().filter(|&i| i < self.slides.len())?;
        Some(self.slides.remove(index))
    }

    /// Move the slide at `from` to `to`.
    ///
    /// `to` is clamped into the valid index range; an out-of-range `from`
    /// changes nothing. Returns `true` if a slide was moved.
    pub fn move_slide(&mut self, from: i64, to: i64) -> bool {
        let len = self.slides.len();
        let Some(from) = usize::try_from(from).ok().filter(|&i| i < len) else {
            return false;
        };
        let last = len - 1;
        let to = usize::try_from(to.max(0)).unwrap_or(last).min(last);

        let slide = self.slides.remove(from);
        self.slides.insert(to, slide);
        true
    }

    /// Hand the slides to the output view, leaving the session empty.
    pub fn take(&mut self) -> Vec<Slide> {
        std::mem::take(&mut self.slides)
    }
}

/// Handle to the single session, shared with message handlers.
///
/// Every mutation holds the lock only for the synchronous operation itself.
#[derive(Debug, Clone, Default)]
pub struct SharedSession(Arc<Mutex<Session>>);

impl SharedSession {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Lock the session. A poisoned lock is recovered, since every
    /// mutation leaves the slide list consistent.
    pub fn lock(&self) -> MutexGuard<'_, Session> {
        self.0.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Snapshot of the current slides.
    #[must_use]
    pub fn slides(&self) -> Vec<Slide> {
        self.lock().slides().to_vec()
    }
}
