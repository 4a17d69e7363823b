//! Button and touch-event vocabulary.

use embedded_graphics::prelude::Point;

/// Logical buttons, one per bit of the 8-bit key mask.
///
/// The bit assignment is fixed and shared by every backend: a discrete
/// GPIO pin, an expander line and an on-screen soft button for the same
/// logical button all land on the same bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ButtonIndex {
    Red = 0,
    /// Encoder/center button.
    Dial = 1,
    Green = 2,
    X = 3,
    Y = 4,
    Z = 5,
    Opt = 6,
    /// Hardware lockout line; never routed as a button event.
    Lockout = 7,
}

impl ButtonIndex {
    /// All routable buttons, in bit order. The lockout line is excluded.
    pub const BUTTONS: [ButtonIndex; 7] = [
        ButtonIndex::Red,
        ButtonIndex::Dial,
        ButtonIndex::Green,
        ButtonIndex::X,
        ButtonIndex::Y,
        ButtonIndex::Z,
        ButtonIndex::Opt,
    ];

    /// The three on-screen soft buttons, in strip order.
    pub const SOFT: [ButtonIndex; 3] = [ButtonIndex::Red, ButtonIndex::Dial, ButtonIndex::Green];

    pub const fn bit(self) -> u8 {
        1 << self as u8
    }

    pub const fn name(self) -> &'static str {
        match self {
            ButtonIndex::Red => "red",
            ButtonIndex::Dial => "dial",
            ButtonIndex::Green => "green",
            ButtonIndex::X => "x",
            ButtonIndex::Y => "y",
            ButtonIndex::Z => "z",
            ButtonIndex::Opt => "opt",
            ButtonIndex::Lockout => "lockout",
        }
    }
}

/// Mask of every routable button.
pub const BUTTON_MASK: u8 = 0x7F;
/// Mask of the lockout line.
pub const LOCKOUT_MASK: u8 = 0x80;

/// Directional swipe, as classified by the touch driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlickDirection {
    Left,
    Right,
    Up,
    Down,
}

/// One update from the touch driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TouchEvent {
    /// Finger down at a screen coordinate.
    Down(Point),
    /// Finger up; the coordinate is the last reported position.
    Up(Point),
    /// Driver-classified simple tap.
    Click,
    /// Driver-classified press-and-hold.
    Hold,
    /// Driver-classified swipe.
    Flick(FlickDirection),
}
