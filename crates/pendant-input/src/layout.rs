//! Button-strip geometry.
//!
//! The screen is split into a 240x240 sprite area and a strip of three
//! 80x80 soft buttons along one edge. Eight precomputed layouts cover the
//! four display rotations with the strip on either side; the selected
//! layout index is persisted and restored across restarts.

use embedded_graphics::prelude::{Point, Size};
use embedded_graphics::primitives::Rectangle;

use crate::prefs::PrefStore;

pub const BUTTON_WIDTH: u32 = 80;
pub const BUTTON_HEIGHT: u32 = 80;
pub const SPRITE_WH: u32 = 240;
/// Number of soft buttons in the strip.
pub const SOFT_BUTTONS: usize = 3;

/// Preference key for the persisted layout index.
pub const LAYOUT_PREF_KEY: &str = "layout";

/// One strip arrangement. Immutable; instances live in [`LAYOUTS`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Layout {
    rotation: u8,
    sprite_origin: Point,
    strip_origin: Point,
}

impl Layout {
    const fn new(rotation: u8, sprite_origin: Point, strip_origin: Point) -> Self {
        Self {
            rotation,
            sprite_origin,
            strip_origin,
        }
    }

    /// Display rotation (0..=3) this layout is drawn in.
    pub const fn rotation(&self) -> u8 {
        self.rotation
    }

    /// Odd rotations stack the strip vertically.
    pub const fn is_vertical(&self) -> bool {
        self.rotation & 1 == 1
    }

    pub const fn sprite_origin(&self) -> Point {
        self.sprite_origin
    }

    pub const fn strip_origin(&self) -> Point {
        self.strip_origin
    }

    pub const fn strip_size(&self) -> Size {
        if self.is_vertical() {
            Size::new(BUTTON_WIDTH, SPRITE_WH)
        } else {
            Size::new(SPRITE_WH, BUTTON_HEIGHT)
        }
    }

    pub const fn strip_rect(&self) -> Rectangle {
        Rectangle::new(self.strip_origin, self.strip_size())
    }

    /// Offset of soft button `n` within the strip.
    pub const fn button_offset(&self, n: usize) -> Point {
        if self.is_vertical() {
            Point::new(0, (n as u32 * BUTTON_HEIGHT) as i32)
        } else {
            Point::new((n as u32 * BUTTON_WIDTH) as i32, 0)
        }
    }

    /// Screen rectangle of soft button `n`.
    pub const fn button_rect(&self, n: usize) -> Rectangle {
        let offset = self.button_offset(n);
        Rectangle::new(
            Point::new(self.strip_origin.x + offset.x, self.strip_origin.y + offset.y),
            Size::new(BUTTON_WIDTH, BUTTON_HEIGHT),
        )
    }
}

/// All strip arrangements: rotation, sprite origin, strip origin.
pub const LAYOUTS: [Layout; 8] = [
    Layout::new(0, Point::new(0, 0), Point::new(0, 240)), // buttons above
    Layout::new(0, Point::new(0, 80), Point::new(0, 0)),  // buttons below
    Layout::new(1, Point::new(0, 0), Point::new(240, 0)), // buttons right
    Layout::new(1, Point::new(80, 0), Point::new(0, 0)),  // buttons left
    Layout::new(2, Point::new(0, 0), Point::new(0, 240)), // buttons below
    Layout::new(2, Point::new(0, 80), Point::new(0, 0)),  // buttons above
    Layout::new(3, Point::new(80, 0), Point::new(0, 0)),  // buttons left
    Layout::new(3, Point::new(0, 0), Point::new(240, 0)), // buttons right
];

/// Currently selected layout, with wraparound cycling and persistence.
pub struct LayoutSelect {
    index: usize,
}

impl LayoutSelect {
    /// Restore the persisted index; out-of-range or missing values fall
    /// back to layout 0.
    pub fn restore(prefs: &dyn PrefStore) -> Self {
        let index = prefs
            .get_i32(LAYOUT_PREF_KEY)
            .and_then(|v| usize::try_from(v).ok())
            .filter(|v| *v < LAYOUTS.len())
            .unwrap_or(0);
        Self { index }
    }

    pub const fn index(&self) -> usize {
        self.index
    }

    pub fn current(&self) -> &'static Layout {
        &LAYOUTS[self.index]
    }

    /// Step `delta` layouts forward or backward, wrapping, and persist the
    /// new index.
    pub fn next(&mut self, delta: i32, prefs: &mut dyn PrefStore) {
        let len = LAYOUTS.len() as i32;
        self.index = (self.index as i32 + delta).rem_euclid(len) as usize;
        prefs.set_i32(LAYOUT_PREF_KEY, self.index as i32);
        log::debug!("layout {}", self.index);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[derive(Default)]
    struct MapPrefs(HashMap<String, i32>);

    impl PrefStore for MapPrefs {
        fn get_i32(&self, key: &str) -> Option<i32> {
            self.0.get(key).copied()
        }

        fn set_i32(&mut self, key: &str, value: i32) {
            self.0.insert(key.into(), value);
        }
    }

    #[test]
    fn horizontal_strip_offsets() {
        let layout = &LAYOUTS[0];
        assert!(!layout.is_vertical());
        assert_eq!(layout.strip_size(), Size::new(240, 80));
        assert_eq!(layout.button_offset(0), Point::new(0, 0));
        assert_eq!(layout.button_offset(2), Point::new(160, 0));
        assert_eq!(
            layout.button_rect(1),
            Rectangle::new(Point::new(80, 240), Size::new(80, 80))
        );
    }

    #[test]
    fn vertical_strip_offsets() {
        let layout = &LAYOUTS[2];
        assert!(layout.is_vertical());
        assert_eq!(layout.strip_size(), Size::new(80, 240));
        assert_eq!(layout.button_offset(1), Point::new(0, 80));
        assert_eq!(
            layout.button_rect(2),
            Rectangle::new(Point::new(240, 160), Size::new(80, 80))
        );
    }

    #[test]
    fn cycling_wraps_and_persists() {
        let mut prefs = MapPrefs::default();
        let mut select = LayoutSelect::restore(&prefs);
        assert_eq!(select.index(), 0);

        select.next(-1, &mut prefs);
        assert_eq!(select.index(), 7);
        select.next(3, &mut prefs);
        assert_eq!(select.index(), 2);
        assert_eq!(prefs.get_i32(LAYOUT_PREF_KEY), Some(2));

        let restored = LayoutSelect::restore(&prefs);
        assert_eq!(restored.index(), 2);
    }

    #[test]
    fn bogus_persisted_index_falls_back_to_zero() {
        let mut prefs = MapPrefs::default();
        prefs.set_i32(LAYOUT_PREF_KEY, 99);
        assert_eq!(LayoutSelect::restore(&prefs).index(), 0);
        prefs.set_i32(LAYOUT_PREF_KEY, -3);
        assert_eq!(LayoutSelect::restore(&prefs).index(), 0);
    }
}
