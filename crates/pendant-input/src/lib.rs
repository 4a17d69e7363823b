//! Input core for a touchscreen CNC pendant.
//!
//! Turns noisy physical signals (buttons, touch, encoder) into a clean,
//! debounced event stream dispatched to the active UI scene. Hardware is
//! reached only through `embedded-hal` traits, so the whole crate runs on
//! the target and on the host test harness alike.

#![cfg_attr(not(test), no_std)]
#![forbid(unsafe_code)]
#![cfg_attr(
    not(test),
    deny(
        clippy::expect_used,
        clippy::panic,
        clippy::todo,
        clippy::unimplemented,
        clippy::unreachable,
        clippy::unwrap_used
    )
)]

pub mod backend;
pub mod debounce;
pub mod dispatcher;
pub mod input;
pub mod layout;
pub mod prefs;
pub mod scene;
pub mod touch;

pub use backend::{ExpanderBackend, GpioBackend, InputBackend, OnScreenBackend, PCF8574_ADDR};
pub use debounce::{Debounce, Hold, KeyMask, Polarity, SharedDebounce, REPEAT_NEXT, REPEAT_START};
pub use dispatcher::{DispatcherConfig, EventDispatcher, MAX_DEFERRED};
pub use input::{ButtonIndex, FlickDirection, TouchEvent, BUTTON_MASK, LOCKOUT_MASK};
pub use layout::{Layout, LayoutSelect, LAYOUTS, LAYOUT_PREF_KEY, SOFT_BUTTONS};
pub use prefs::PrefStore;
pub use scene::{Action, Nav, Scene, SceneResult};
pub use touch::{TouchClassifier, SUPPRESS_MS};
