//! Host-side scenario harness for scripted input flows.
//!
//! Couples an [`EventDispatcher`] with a scripted raw-line backend, a
//! recording scene and a fake millisecond clock, so tests can drive whole
//! press/touch/flick flows and assert on the scene calls that come out.

use std::cell::Cell;
use std::collections::HashMap;
use std::rc::Rc;

use embedded_graphics::prelude::Point;
use pendant_input::{
    ButtonIndex, DispatcherConfig, EventDispatcher, FlickDirection, InputBackend, LayoutSelect,
    Nav, PrefStore, Scene, SceneResult, TouchEvent,
};

/// In-memory preference store.
#[derive(Default)]
pub struct MemPrefs(HashMap<String, i32>);

impl PrefStore for MemPrefs {
    fn get_i32(&self, key: &str) -> Option<i32> {
        self.0.get(key).copied()
    }

    fn set_i32(&mut self, key: &str, value: i32) {
        self.0.insert(key.into(), value);
    }
}

/// Backend reading from a shared cell of raw active-low lines.
pub struct ScriptedBackend {
    raw: Rc<Cell<u8>>,
    connected: bool,
}

impl InputBackend for ScriptedBackend {
    fn sample(&mut self) -> u8 {
        self.raw.get()
    }

    fn is_connected(&self) -> bool {
        self.connected
    }
}

/// Everything the recording scene saw, in call order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SceneCall {
    Press(ButtonIndex),
    Hold(ButtonIndex),
    Release(ButtonIndex),
    TouchPress(Point),
    TouchRelease(Point),
    TouchClick,
    TouchHold,
    Flick(FlickDirection),
    AnyFlick,
    Encoder(i32),
    LockChanged(bool),
}

/// Scene that records every handler invocation.
#[derive(Default)]
pub struct RecordingScene {
    calls: Vec<SceneCall>,
}

impl RecordingScene {
    pub fn calls(&self) -> &[SceneCall] {
        &self.calls
    }

    /// Take and clear the recorded calls.
    pub fn drain(&mut self) -> Vec<SceneCall> {
        std::mem::take(&mut self.calls)
    }
}

macro_rules! record_button {
    ($($press:ident, $hold:ident, $release:ident => $button:ident;)*) => {
        $(
            fn $press(&mut self) -> SceneResult {
                self.calls.push(SceneCall::Press(ButtonIndex::$button));
                SceneResult::Handled
            }
            fn $hold(&mut self) -> SceneResult {
                self.calls.push(SceneCall::Hold(ButtonIndex::$button));
                SceneResult::Handled
            }
            fn $release(&mut self) -> SceneResult {
                self.calls.push(SceneCall::Release(ButtonIndex::$button));
                SceneResult::Handled
            }
        )*
    };
}

impl Scene for RecordingScene {
    fn name(&self) -> &'static str {
        "recording"
    }

    record_button! {
        on_red_press, on_red_hold, on_red_release => Red;
        on_dial_press, on_dial_hold, on_dial_release => Dial;
        on_green_press, on_green_hold, on_green_release => Green;
        on_x_press, on_x_hold, on_x_release => X;
        on_y_press, on_y_hold, on_y_release => Y;
        on_z_press, on_z_hold, on_z_release => Z;
        on_opt_press, on_opt_hold, on_opt_release => Opt;
    }

    fn on_touch_press(&mut self, at: Point) -> SceneResult {
        self.calls.push(SceneCall::TouchPress(at));
        SceneResult::Handled
    }

    fn on_touch_release(&mut self, at: Point) -> SceneResult {
        self.calls.push(SceneCall::TouchRelease(at));
        SceneResult::Handled
    }

    fn on_touch_click(&mut self) -> SceneResult {
        self.calls.push(SceneCall::TouchClick);
        SceneResult::Handled
    }

    fn on_touch_hold(&mut self) -> SceneResult {
        self.calls.push(SceneCall::TouchHold);
        SceneResult::Handled
    }

    fn on_left_flick(&mut self) -> SceneResult {
        self.calls.push(SceneCall::Flick(FlickDirection::Left));
        SceneResult::Back
    }

    fn on_any_flick(&mut self) -> SceneResult {
        self.calls.push(SceneCall::AnyFlick);
        SceneResult::Handled
    }

    fn on_encoder(&mut self, delta: i32) -> SceneResult {
        self.calls.push(SceneCall::Encoder(delta));
        SceneResult::Handled
    }

    fn on_lock_changed(&mut self, locked: bool) -> SceneResult {
        self.calls.push(SceneCall::LockChanged(locked));
        SceneResult::Handled
    }
}

/// Ticks the dispatcher needs before a clean edge is accepted.
pub const SETTLE_TICKS: usize = 6;

pub struct ScenarioHarness {
    pub dispatcher: EventDispatcher<ScriptedBackend>,
    raw: Rc<Cell<u8>>,
    pub scene: RecordingScene,
    pub prefs: MemPrefs,
    now_ms: u32,
}

impl ScenarioHarness {
    pub fn new(config: DispatcherConfig) -> Self {
        Self::with_prefs(config, MemPrefs::default())
    }

    /// Build with pre-seeded preferences (persisted layout index etc).
    pub fn with_prefs(config: DispatcherConfig, prefs: MemPrefs) -> Self {
        let raw = Rc::new(Cell::new(0xFF));
        let backend = ScriptedBackend {
            raw: Rc::clone(&raw),
            connected: true,
        };
        let layout = LayoutSelect::restore(&prefs);
        Self {
            dispatcher: EventDispatcher::new(backend, layout, config),
            raw,
            scene: RecordingScene::default(),
            prefs,
            now_ms: 0,
        }
    }

    /// Pull a raw line low (active-low wiring).
    pub fn press(&mut self, button: ButtonIndex) {
        self.raw.set(self.raw.get() & !button.bit());
    }

    /// Let a raw line float back high.
    pub fn release(&mut self, button: ButtonIndex) {
        self.raw.set(self.raw.get() | button.bit());
    }

    /// Force a specific raw byte for glitch scripts.
    pub fn set_raw(&mut self, raw: u8) {
        self.raw.set(raw);
    }

    /// Run `n` dispatch cycles at one cycle per millisecond, returning the
    /// last navigation request seen.
    pub fn run(&mut self, n: usize) -> Option<Nav> {
        let mut nav = None;
        for _ in 0..n {
            if let Some(found) = self.dispatcher.service(&mut self.scene) {
                nav = Some(found);
            }
            self.now_ms = self.now_ms.wrapping_add(1);
        }
        nav
    }

    /// Run enough cycles for a pending raw change to debounce.
    pub fn settle(&mut self) -> Option<Nav> {
        self.run(SETTLE_TICKS)
    }

    /// Advance the fake clock without dispatching.
    pub fn advance_ms(&mut self, ms: u32) {
        self.now_ms = self.now_ms.wrapping_add(ms);
    }

    pub fn now_ms(&self) -> u32 {
        self.now_ms
    }

    pub fn touch(&mut self, event: TouchEvent) -> Option<Nav> {
        self.dispatcher
            .touch_event(event, self.now_ms, &mut self.scene)
    }

    pub fn encoder(&mut self, delta: i32) -> Option<Nav> {
        self.dispatcher.encoder(delta, &mut self.scene)
    }

    pub fn calls(&self) -> &[SceneCall] {
        self.scene.calls()
    }
}
