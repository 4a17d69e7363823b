//! Scene event surface.
//!
//! A scene is the currently active UI screen. The dispatcher calls into
//! whichever scene it is handed; scenes override only the handlers they
//! care about and inherit no-ops for the rest. Handlers never perform
//! navigation themselves — they return a [`SceneResult`] and the
//! navigation layer acts on it between dispatch cycles.

use embedded_graphics::prelude::Point;

/// A deferred callback, run on the next dispatch cycle.
///
/// Lets a handler change UI state without re-entering the dispatch that
/// invoked it.
pub type Action = fn(&mut dyn Scene);

/// Outcome of one scene handler.
#[derive(Debug, Clone, Copy)]
pub enum SceneResult {
    /// Nothing further to do.
    Handled,
    /// The scene wants to be popped (universal "go back").
    Back,
    /// Run the action on the next dispatch cycle.
    Defer(Action),
}

/// Compares variants only; two `Defer`s are equal regardless of which
/// action they carry, since function pointers do not compare reliably.
impl PartialEq for SceneResult {
    fn eq(&self, other: &Self) -> bool {
        core::mem::discriminant(self) == core::mem::discriminant(other)
    }
}

impl Eq for SceneResult {}

/// Navigation request surfaced by a dispatch cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Nav {
    Back,
}

#[allow(unused_variables)]
pub trait Scene {
    fn name(&self) -> &'static str;

    fn on_red_press(&mut self) -> SceneResult {
        SceneResult::Handled
    }
    fn on_red_hold(&mut self) -> SceneResult {
        SceneResult::Handled
    }
    fn on_red_release(&mut self) -> SceneResult {
        SceneResult::Handled
    }

    fn on_dial_press(&mut self) -> SceneResult {
        SceneResult::Handled
    }
    fn on_dial_hold(&mut self) -> SceneResult {
        SceneResult::Handled
    }
    fn on_dial_release(&mut self) -> SceneResult {
        SceneResult::Handled
    }

    fn on_green_press(&mut self) -> SceneResult {
        SceneResult::Handled
    }
    fn on_green_hold(&mut self) -> SceneResult {
        SceneResult::Handled
    }
    fn on_green_release(&mut self) -> SceneResult {
        SceneResult::Handled
    }

    fn on_x_press(&mut self) -> SceneResult {
        SceneResult::Handled
    }
    fn on_x_hold(&mut self) -> SceneResult {
        SceneResult::Handled
    }
    fn on_x_release(&mut self) -> SceneResult {
        SceneResult::Handled
    }

    fn on_y_press(&mut self) -> SceneResult {
        SceneResult::Handled
    }
    fn on_y_hold(&mut self) -> SceneResult {
        SceneResult::Handled
    }
    fn on_y_release(&mut self) -> SceneResult {
        SceneResult::Handled
    }

    fn on_z_press(&mut self) -> SceneResult {
        SceneResult::Handled
    }
    fn on_z_hold(&mut self) -> SceneResult {
        SceneResult::Handled
    }
    fn on_z_release(&mut self) -> SceneResult {
        SceneResult::Handled
    }

    fn on_opt_press(&mut self) -> SceneResult {
        SceneResult::Handled
    }
    fn on_opt_hold(&mut self) -> SceneResult {
        SceneResult::Handled
    }
    fn on_opt_release(&mut self) -> SceneResult {
        SceneResult::Handled
    }

    fn on_touch_press(&mut self, at: Point) -> SceneResult {
        SceneResult::Handled
    }
    fn on_touch_release(&mut self, at: Point) -> SceneResult {
        SceneResult::Handled
    }
    fn on_touch_click(&mut self) -> SceneResult {
        SceneResult::Handled
    }
    fn on_touch_hold(&mut self) -> SceneResult {
        SceneResult::Handled
    }

    /// Left flick is the universal "go back" gesture.
    fn on_left_flick(&mut self) -> SceneResult {
        SceneResult::Back
    }
    fn on_right_flick(&mut self) -> SceneResult {
        self.on_any_flick()
    }
    fn on_up_flick(&mut self) -> SceneResult {
        self.on_any_flick()
    }
    fn on_down_flick(&mut self) -> SceneResult {
        self.on_any_flick()
    }
    /// Fallback for scenes that treat every non-back flick alike.
    fn on_any_flick(&mut self) -> SceneResult {
        SceneResult::Handled
    }

    fn on_encoder(&mut self, delta: i32) -> SceneResult {
        SceneResult::Handled
    }

    /// Hardware lockout line changed; `locked` scenes show the disabled
    /// button strip.
    fn on_lock_changed(&mut self, locked: bool) -> SceneResult {
        SceneResult::Handled
    }
}
