//! Raw key-mask sources.
//!
//! Exactly one backend is active per device; the dispatcher is agnostic to
//! which. A backend that cannot be read degrades to the idle mask instead
//! of failing: an input device that is missing must behave like one with
//! nothing pressed.

use embedded_hal::digital::InputPin;
use embedded_hal::i2c::{I2c, SevenBitAddress};

use crate::debounce::Polarity;

/// Default I2C address of the PCF8574 button expander (A0..A2 high).
pub const PCF8574_ADDR: SevenBitAddress = 0x27;

/// Supplies the raw 8-bit sample fed to the debouncer each tick.
pub trait InputBackend {
    /// Read the current raw key lines. Never blocks beyond one bus
    /// transaction; read failures return the idle mask.
    fn sample(&mut self) -> u8;

    /// Whether the backing hardware answered at startup.
    fn is_connected(&self) -> bool {
        true
    }
}

/// Discrete GPIO pins, one per button bit.
///
/// Slots without a configured pin always read as idle. The pins are read
/// as electrical levels; polarity normalization happens in the debouncer.
pub struct GpioBackend<P> {
    pins: [Option<P>; 8],
    idle: u8,
}

impl<P: InputPin> GpioBackend<P> {
    pub fn new(pins: [Option<P>; 8], polarity: Polarity) -> Self {
        let idle = match polarity {
            Polarity::ActiveHigh => 0x00,
            Polarity::ActiveLow => 0xFF,
        };
        Self { pins, idle }
    }
}

impl<P: InputPin> InputBackend for GpioBackend<P> {
    fn sample(&mut self) -> u8 {
        let mut raw = self.idle;
        for (bit, slot) in self.pins.iter_mut().enumerate() {
            if let Some(pin) = slot {
                // A pin that cannot be read keeps its idle level.
                if let Ok(level) = pin.is_high() {
                    if level {
                        raw |= 1 << bit;
                    } else {
                        raw &= !(1 << bit);
                    }
                }
            }
        }
        raw
    }
}

/// PCF8574 I2C port expander carrying all eight lines.
///
/// The expander is probed once at construction. If the probe fails the
/// backend is permanently flagged as not connected and sampling returns
/// the idle mask; there are no retries. The PCF8574 inputs are pulled up,
/// so its raw byte is active-low with idle `0xFF`.
pub struct ExpanderBackend<I2C> {
    bus: I2C,
    addr: SevenBitAddress,
    connected: bool,
}

const EXPANDER_IDLE: u8 = 0xFF;

impl<I2C: I2c> ExpanderBackend<I2C> {
    pub fn new(mut bus: I2C, addr: SevenBitAddress) -> Self {
        let mut probe = [0u8; 1];
        let connected = match bus.read(addr, &mut probe) {
            Ok(()) => true,
            Err(e) => {
                log::warn!("i2c expander not found at 0x{addr:02X}: {e:?}");
                false
            }
        };
        Self {
            bus,
            addr,
            connected,
        }
    }
}

impl<I2C: I2c> InputBackend for ExpanderBackend<I2C> {
    fn sample(&mut self) -> u8 {
        if !self.connected {
            return EXPANDER_IDLE;
        }
        let mut buf = [EXPANDER_IDLE; 1];
        match self.bus.read(self.addr, &mut buf) {
            Ok(()) => buf[0],
            Err(_) => EXPANDER_IDLE,
        }
    }

    fn is_connected(&self) -> bool {
        self.connected
    }
}

/// Backend for devices whose only buttons are on-screen.
///
/// Always supplies the idle mask; soft-button presses reach the dispatcher
/// through the touch classifier instead of the debounced key mask.
pub struct OnScreenBackend {
    idle: u8,
}

impl OnScreenBackend {
    pub fn new(polarity: Polarity) -> Self {
        let idle = match polarity {
            Polarity::ActiveHigh => 0x00,
            Polarity::ActiveLow => 0xFF,
        };
        Self { idle }
    }
}

impl InputBackend for OnScreenBackend {
    fn sample(&mut self) -> u8 {
        self.idle
    }
}
