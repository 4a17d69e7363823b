//! Bit-parallel key debouncing.
//!
//! Classic two-generation-counter debounce (after Peter Dannegger): every
//! bit of the mask type is one key, and all keys are filtered in parallel
//! with two single-bit counter planes. A raw sample has to disagree with
//! the debounced state for four consecutive ticks before the transition is
//! accepted, so single-tick glitches never produce an edge.
//!
//! Edges are single-shot registers: each accessor clears the bits it
//! returns, so a transition is reported exactly once no matter how many
//! consumers poll. `tick` is the only producer and is expected to run at a
//! roughly constant interval (1-10 ms); all timing below is in ticks of
//! that interval, not wall-clock time.

use core::cell::RefCell;
use core::ops::{BitAnd, BitAndAssign, BitOr, BitOrAssign, BitXor, BitXorAssign, Not};

use critical_section::Mutex;

/// Unsigned integer usable as a parallel key mask.
///
/// One bit per key; the meaning of each bit position is fixed for the
/// lifetime of the debouncer instance that owns it.
pub trait KeyMask:
    Copy
    + Eq
    + BitAnd<Output = Self>
    + BitOr<Output = Self>
    + BitXor<Output = Self>
    + Not<Output = Self>
    + BitAndAssign
    + BitOrAssign
    + BitXorAssign
{
    const ZERO: Self;
    const ALL: Self;
}

macro_rules! impl_key_mask {
    ($($t:ty),*) => {
        $(impl KeyMask for $t {
            const ZERO: Self = 0;
            const ALL: Self = <$t>::MAX;
        })*
    };
}

impl_key_mask!(u8, u16, u32);

/// Electrical polarity of the raw samples fed to [`Debounce::tick`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Polarity {
    /// A high bit in the raw sample means "pressed".
    ActiveHigh,
    /// A low bit in the raw sample means "pressed" (pull-up wiring).
    ActiveLow,
}

/// Result of the combined long-press-then-repeat accessor, see
/// [`Debounce::hold`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hold<T: KeyMask> {
    /// Bits whose press edge has just qualified as a long press.
    pub start: T,
    /// Bits firing a follow-up repeat pulse after their long press.
    pub repeat: T,
}

/// Number of ticks a repeat-eligible key must stay held before the first
/// repeat pulse.
pub const REPEAT_START: u16 = 500;
/// Ticks between repeat pulses once repeating.
pub const REPEAT_NEXT: u16 = 200;

/// Parallel debouncer for up to `bits_of::<T>()` keys.
pub struct Debounce<T: KeyMask> {
    /// Debounced state, active-high regardless of wiring polarity.
    state: T,
    /// Pending press edges (0 -> 1), cleared as they are consumed.
    press: T,
    /// Pending release edges (1 -> 0), cleared as they are consumed.
    release: T,
    /// Pending repeat pulses for held repeat-eligible keys.
    rpt_pending: T,
    /// Counter bit planes; a key's 2-bit counter advances only while the
    /// raw sample keeps disagreeing with the debounced state.
    ct0: T,
    ct1: T,
    /// Ticks left until the next repeat pulse fires.
    rpt: u16,
    repeat_mask: T,
    polarity: Polarity,
    repeat_start: u16,
    repeat_next: u16,
}

impl<T: KeyMask> Debounce<T> {
    /// `initial` is the starting debounced state (active-high), normally
    /// zero. `repeat_mask` marks the keys that auto-repeat while held.
    pub const fn new(initial: T, repeat_mask: T, polarity: Polarity) -> Self {
        Self {
            state: initial,
            press: T::ZERO,
            release: T::ZERO,
            rpt_pending: T::ZERO,
            ct0: T::ALL,
            ct1: T::ALL,
            rpt: REPEAT_START,
            repeat_mask,
            polarity,
            repeat_start: REPEAT_START,
            repeat_next: REPEAT_NEXT,
        }
    }

    /// Override the repeat timing. Both values are in ticks and must be at
    /// least 1.
    pub const fn with_timing(mut self, repeat_start: u16, repeat_next: u16) -> Self {
        self.repeat_start = repeat_start;
        self.repeat_next = repeat_next;
        self.rpt = repeat_start;
        self
    }

    /// Feed one raw sample. Must be called at a bounded, roughly constant
    /// interval; the repeat timing counts these calls.
    pub fn tick(&mut self, raw: T) {
        let diff = match self.polarity {
            Polarity::ActiveHigh => self.state ^ raw,
            Polarity::ActiveLow => self.state ^ !raw,
        };
        self.ct0 = !(self.ct0 & diff);
        self.ct1 = self.ct0 ^ (self.ct1 & diff);
        let accepted = diff & self.ct0 & self.ct1;
        self.state ^= accepted;
        self.press |= self.state & accepted;
        self.release |= !self.state & accepted;

        if self.state & self.repeat_mask == T::ZERO {
            self.rpt = self.repeat_start;
        }
        self.rpt = self.rpt.saturating_sub(1);
        if self.rpt == 0 {
            self.rpt = self.repeat_next;
            self.rpt_pending |= self.state & self.repeat_mask;
        }
    }

    /// Current debounced level of the requested keys. Non-destructive.
    pub fn state(&self, mask: T) -> T {
        self.state & mask
    }

    /// Press edges since the last overlapping query. Clears what it returns.
    pub fn press(&mut self, mask: T) -> T {
        let hit = self.press & mask;
        self.press ^= hit;
        hit
    }

    /// Release edges since the last overlapping query. Clears what it
    /// returns.
    pub fn release(&mut self, mask: T) -> T {
        let hit = self.release & mask;
        self.release ^= hit;
        hit
    }

    /// Repeat pulses currently pending. Clears what it returns.
    pub fn repeat(&mut self, mask: T) -> T {
        let hit = self.rpt_pending & mask;
        self.rpt_pending ^= hit;
        hit
    }

    /// Press edges of keys that have already been released again: a short
    /// tap. A key still held does not qualify (its press edge stays pending
    /// until either consumed here after release or claimed by a long-press
    /// query).
    pub fn short_press(&mut self, mask: T) -> T {
        self.press(!self.state & mask)
    }

    /// Press edges that have lasted long enough to coincide with a repeat
    /// pulse: a long press. Consumes both the press edge and the pulse.
    pub fn long_press(&mut self, mask: T) -> T {
        let rpt = self.repeat(mask);
        self.press(rpt)
    }

    /// Fires only when every key in `mask` is pressed simultaneously.
    pub fn chord(&mut self, mask: T) -> T {
        if self.press & mask == mask && mask != T::ZERO {
            self.press(mask)
        } else {
            T::ZERO
        }
    }

    /// Long press with follow-up repeat, as one combined query.
    ///
    /// `start` reports the first long-press edge of a key; `repeat` reports
    /// the continued pulses after that edge. Evaluating both in a single
    /// call keeps their shared bookkeeping consistent; polling one without
    /// the other is not possible.
    pub fn hold(&mut self, mask: T) -> Hold<T> {
        let started = self.repeat(self.press & mask);
        let start = self.press(started);
        let repeat = self.repeat(!self.press & mask);
        Hold { start, repeat }
    }
}

/// [`Debounce`] behind a critical section, for setups where `tick` runs
/// from a periodic timer interrupt while the main loop consumes edges.
/// Every method is a single short critical section around the
/// read-modify-clear of the underlying registers.
pub struct SharedDebounce<T: KeyMask> {
    inner: Mutex<RefCell<Debounce<T>>>,
}

impl<T: KeyMask> SharedDebounce<T> {
    pub const fn new(debounce: Debounce<T>) -> Self {
        Self {
            inner: Mutex::new(RefCell::new(debounce)),
        }
    }

    pub fn tick(&self, raw: T) {
        critical_section::with(|cs| self.inner.borrow_ref_mut(cs).tick(raw));
    }

    pub fn state(&self, mask: T) -> T {
        critical_section::with(|cs| self.inner.borrow_ref(cs).state(mask))
    }

    pub fn press(&self, mask: T) -> T {
        critical_section::with(|cs| self.inner.borrow_ref_mut(cs).press(mask))
    }

    pub fn release(&self, mask: T) -> T {
        critical_section::with(|cs| self.inner.borrow_ref_mut(cs).release(mask))
    }

    pub fn repeat(&self, mask: T) -> T {
        critical_section::with(|cs| self.inner.borrow_ref_mut(cs).repeat(mask))
    }

    pub fn short_press(&self, mask: T) -> T {
        critical_section::with(|cs| self.inner.borrow_ref_mut(cs).short_press(mask))
    }

    pub fn long_press(&self, mask: T) -> T {
        critical_section::with(|cs| self.inner.borrow_ref_mut(cs).long_press(mask))
    }

    pub fn chord(&self, mask: T) -> T {
        critical_section::with(|cs| self.inner.borrow_ref_mut(cs).chord(mask))
    }

    pub fn hold(&self, mask: T) -> Hold<T> {
        critical_section::with(|cs| self.inner.borrow_ref_mut(cs).hold(mask))
    }
}
