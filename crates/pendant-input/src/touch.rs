//! Touch hit-testing and release suppression.

use embedded_graphics::prelude::Point;
use embedded_graphics::primitives::Rectangle;

use crate::layout::{Layout, SOFT_BUTTONS};

/// How long touch updates are ignored after a soft-button release.
///
/// The touch driver tends to report a burst of jittery updates while the
/// finger lifts; without this window a single tap can fire twice.
pub const SUPPRESS_MS: u32 = 100;

fn in_rect(rect: &Rectangle, p: Point) -> bool {
    p.x >= rect.top_left.x
        && p.x < rect.top_left.x + rect.size.width as i32
        && p.y >= rect.top_left.y
        && p.y < rect.top_left.y + rect.size.height as i32
}

/// Deadline has passed, tolerating `u32` millisecond wraparound. Uses the
/// signed elapsed difference, never an absolute comparison.
fn deadline_passed(now_ms: u32, deadline_ms: u32) -> bool {
    now_ms.wrapping_sub(deadline_ms) as i32 >= 0
}

/// Maps touch coordinates onto the soft-button strip.
pub struct TouchClassifier {
    suppress_until: Option<u32>,
}

impl TouchClassifier {
    pub const fn new() -> Self {
        Self {
            suppress_until: None,
        }
    }

    /// Whether touch updates are currently suppressed. Clears the window
    /// once its deadline has elapsed.
    pub fn suppressed(&mut self, now_ms: u32) -> bool {
        match self.suppress_until {
            Some(deadline) if deadline_passed(now_ms, deadline) => {
                self.suppress_until = None;
                false
            }
            Some(_) => true,
            None => false,
        }
    }

    /// Hit-test a touch update against the strip.
    ///
    /// Returns the soft-button index the point falls on, or `None` when
    /// the point is outside the strip (or a suppression window is active).
    /// A release inside a button arms the suppression window.
    pub fn classify(
        &mut self,
        layout: &Layout,
        pressed: bool,
        point: Point,
        now_ms: u32,
    ) -> Option<usize> {
        if self.suppressed(now_ms) {
            return None;
        }
        if !in_rect(&layout.strip_rect(), point) {
            return None;
        }
        for n in 0..SOFT_BUTTONS {
            if in_rect(&layout.button_rect(n), point) {
                if !pressed {
                    self.suppress_until = Some(now_ms.wrapping_add(SUPPRESS_MS));
                }
                return Some(n);
            }
        }
        None
    }
}

impl Default for TouchClassifier {
    fn default() -> Self {
        Self::new()
    }
}
