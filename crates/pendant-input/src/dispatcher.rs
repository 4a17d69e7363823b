//! Per-loop event dispatch.
//!
//! One [`EventDispatcher`] is serviced once per main-loop iteration: it
//! samples the active backend, ticks the debouncer, evaluates the lockout
//! line, converts edges into scene handler calls and finally drains the
//! deferred-action queue. Touch and encoder updates arrive through their
//! own entry points between services.

use heapless::Deque;

use crate::backend::InputBackend;
use crate::debounce::{Debounce, Polarity, SharedDebounce};
use crate::input::{ButtonIndex, FlickDirection, TouchEvent, BUTTON_MASK, LOCKOUT_MASK};
use crate::layout::LayoutSelect;
use crate::scene::{Action, Nav, Scene, SceneResult};
use crate::touch::TouchClassifier;

/// Deferred actions that can be pending at once. Scheduling beyond this
/// drops the action with a warning.
pub const MAX_DEFERRED: usize = 8;

/// Startup configuration, read once.
#[derive(Debug, Clone, Copy)]
pub struct DispatcherConfig {
    /// Wiring polarity of the active backend.
    pub polarity: Polarity,
    /// Keys that auto-repeat while held (drives the hold handlers).
    pub repeat_mask: u8,
    /// Ticks until the first repeat pulse of a held key.
    pub repeat_start: u16,
    /// Ticks between subsequent repeat pulses.
    pub repeat_next: u16,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            polarity: Polarity::ActiveLow,
            repeat_mask: ButtonIndex::Dial.bit() | ButtonIndex::Y.bit() | ButtonIndex::Z.bit(),
            repeat_start: crate::debounce::REPEAT_START,
            repeat_next: crate::debounce::REPEAT_NEXT,
        }
    }
}

pub struct EventDispatcher<B> {
    backend: B,
    keys: SharedDebounce<u8>,
    touch: TouchClassifier,
    layout: LayoutSelect,
    actions: Deque<Action, MAX_DEFERRED>,
    locked: bool,
    /// Press bits swallowed while locked whose release is still owed.
    suppressed: u8,
}

impl<B: InputBackend> EventDispatcher<B> {
    pub fn new(backend: B, layout: LayoutSelect, config: DispatcherConfig) -> Self {
        let debounce = Debounce::new(0, config.repeat_mask, config.polarity)
            .with_timing(config.repeat_start, config.repeat_next);
        Self {
            backend,
            keys: SharedDebounce::new(debounce),
            touch: TouchClassifier::new(),
            layout,
            actions: Deque::new(),
            locked: false,
            suppressed: 0,
        }
    }

    /// The debounced key registers, for integrations that drive `tick`
    /// from a timer interrupt or poll chords directly.
    pub fn keys(&self) -> &SharedDebounce<u8> {
        &self.keys
    }

    /// Whether the backing input hardware answered at startup. Upstream
    /// surfaces this as a "not detected" message.
    pub fn backend_connected(&self) -> bool {
        self.backend.is_connected()
    }

    /// Debounced state of the hardware lockout line.
    pub fn locked(&self) -> bool {
        self.locked
    }

    pub fn layout(&self) -> &LayoutSelect {
        &self.layout
    }

    pub fn layout_mut(&mut self) -> &mut LayoutSelect {
        &mut self.layout
    }

    /// Queue an action for the next dispatch cycle. Returns false when the
    /// queue is full.
    pub fn schedule(&mut self, action: Action) -> bool {
        if self.actions.push_back(action).is_err() {
            log::warn!("deferred action queue full, dropping");
            return false;
        }
        true
    }

    /// One dispatch cycle: sample, tick, route, drain deferred actions.
    ///
    /// Actions scheduled by this cycle's handlers run at the end of the
    /// next cycle, never inside the one that scheduled them.
    pub fn service(&mut self, scene: &mut dyn Scene) -> Option<Nav> {
        let pending = self.actions.len();
        let raw = self.backend.sample();
        self.keys.tick(raw);

        let mut nav = None;

        let locked = self.keys.state(LOCKOUT_MASK) != 0;
        if locked != self.locked {
            self.locked = locked;
            log::info!("lockout {}", if locked { "asserted" } else { "cleared" });
            self.apply(scene.on_lock_changed(locked), &mut nav);
        }

        // Edges are consumed every cycle even while locked, so stale
        // presses cannot fire when the lockout clears.
        let press = self.keys.press(0xFF);
        let mut release = self.keys.release(0xFF);
        let repeat = self.keys.repeat(0xFF);

        if self.locked {
            self.suppressed |= press & BUTTON_MASK;
        }
        // A press swallowed while locked must not surface as an unpaired
        // release, even when that release lands on the unlock tick.
        let stale = release & self.suppressed;
        self.suppressed &= !stale;
        release &= !stale;

        if !self.locked {
            for button in ButtonIndex::BUTTONS {
                let bit = button.bit() & BUTTON_MASK;
                if press & bit != 0 {
                    log::info!("{} pressed", button.name());
                    let r = route_press(scene, button);
                    self.apply(r, &mut nav);
                }
                if repeat & bit != 0 {
                    let r = route_hold(scene, button);
                    self.apply(r, &mut nav);
                }
                if release & bit != 0 {
                    log::info!("{} released", button.name());
                    let r = route_release(scene, button);
                    self.apply(r, &mut nav);
                }
            }
        }

        self.drain(scene, pending);
        nav
    }

    /// Route one touch-driver update.
    pub fn touch_event(
        &mut self,
        event: TouchEvent,
        now_ms: u32,
        scene: &mut dyn Scene,
    ) -> Option<Nav> {
        if self.touch.suppressed(now_ms) {
            return None;
        }

        let mut nav = None;
        match event {
            TouchEvent::Down(point) => {
                match self
                    .touch
                    .classify(self.layout.current(), true, point, now_ms)
                {
                    Some(n) if !self.locked => {
                        let button = ButtonIndex::SOFT[n];
                        log::info!("soft {} pressed", button.name());
                        let r = route_press(scene, button);
                        self.apply(r, &mut nav);
                    }
                    Some(_) => {}
                    None => {
                        let r = scene.on_touch_press(point);
                        self.apply(r, &mut nav);
                    }
                }
            }
            TouchEvent::Up(point) => {
                match self
                    .touch
                    .classify(self.layout.current(), false, point, now_ms)
                {
                    Some(n) if !self.locked => {
                        let button = ButtonIndex::SOFT[n];
                        log::info!("soft {} released", button.name());
                        let r = route_release(scene, button);
                        self.apply(r, &mut nav);
                    }
                    Some(_) => {}
                    None => {
                        let r = scene.on_touch_release(point);
                        self.apply(r, &mut nav);
                    }
                }
            }
            TouchEvent::Click => {
                let r = scene.on_touch_click();
                self.apply(r, &mut nav);
            }
            TouchEvent::Hold => {
                let r = scene.on_touch_hold();
                self.apply(r, &mut nav);
            }
            TouchEvent::Flick(direction) => {
                let r = match direction {
                    FlickDirection::Left => scene.on_left_flick(),
                    FlickDirection::Right => scene.on_right_flick(),
                    FlickDirection::Up => scene.on_up_flick(),
                    FlickDirection::Down => scene.on_down_flick(),
                };
                self.apply(r, &mut nav);
            }
        }
        nav
    }

    /// Route an encoder delta.
    pub fn encoder(&mut self, delta: i32, scene: &mut dyn Scene) -> Option<Nav> {
        if delta == 0 {
            return None;
        }
        let mut nav = None;
        let r = scene.on_encoder(delta);
        self.apply(r, &mut nav);
        nav
    }

    fn apply(&mut self, result: SceneResult, nav: &mut Option<Nav>) {
        match result {
            SceneResult::Handled => {}
            SceneResult::Back => {
                if nav.is_none() {
                    *nav = Some(Nav::Back);
                }
            }
            SceneResult::Defer(action) => {
                self.schedule(action);
            }
        }
    }

    /// Run the actions that were already queued when this cycle started,
    /// strictly FIFO. Anything queued since waits for the next cycle.
    fn drain(&mut self, scene: &mut dyn Scene, pending: usize) {
        for _ in 0..pending {
            if let Some(action) = self.actions.pop_front() {
                action(scene);
            }
        }
    }
}

fn route_press(scene: &mut dyn Scene, button: ButtonIndex) -> SceneResult {
    match button {
        ButtonIndex::Red => scene.on_red_press(),
        ButtonIndex::Dial => scene.on_dial_press(),
        ButtonIndex::Green => scene.on_green_press(),
        ButtonIndex::X => scene.on_x_press(),
        ButtonIndex::Y => scene.on_y_press(),
        ButtonIndex::Z => scene.on_z_press(),
        ButtonIndex::Opt => scene.on_opt_press(),
        ButtonIndex::Lockout => SceneResult::Handled,
    }
}

fn route_hold(scene: &mut dyn Scene, button: ButtonIndex) -> SceneResult {
    match button {
        ButtonIndex::Red => scene.on_red_hold(),
        ButtonIndex::Dial => scene.on_dial_hold(),
        ButtonIndex::Green => scene.on_green_hold(),
        ButtonIndex::X => scene.on_x_hold(),
        ButtonIndex::Y => scene.on_y_hold(),
        ButtonIndex::Z => scene.on_z_hold(),
        ButtonIndex::Opt => scene.on_opt_hold(),
        ButtonIndex::Lockout => SceneResult::Handled,
    }
}

fn route_release(scene: &mut dyn Scene, button: ButtonIndex) -> SceneResult {
    match button {
        ButtonIndex::Red => scene.on_red_release(),
        ButtonIndex::Dial => scene.on_dial_release(),
        ButtonIndex::Green => scene.on_green_release(),
        ButtonIndex::X => scene.on_x_release(),
        ButtonIndex::Y => scene.on_y_release(),
        ButtonIndex::Z => scene.on_z_release(),
        ButtonIndex::Opt => scene.on_opt_release(),
        ButtonIndex::Lockout => SceneResult::Handled,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::LAYOUTS;
    use crate::prefs::PrefStore;
    use embedded_graphics::prelude::Point;

    struct NoPrefs;

    impl PrefStore for NoPrefs {
        fn get_i32(&self, _key: &str) -> Option<i32> {
            None
        }

        fn set_i32(&mut self, _key: &str, _value: i32) {}
    }

    /// Backend scripted from a shared cell so tests can move lines while
    /// the dispatcher owns it.
    struct Scripted {
        raw: std::rc::Rc<core::cell::Cell<u8>>,
    }

    impl InputBackend for Scripted {
        fn sample(&mut self) -> u8 {
            self.raw.get()
        }
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Call {
        Press(ButtonIndex),
        Hold(ButtonIndex),
        Release(ButtonIndex),
        TouchPress(Point),
        TouchRelease(Point),
        Lock(bool),
        Encoder(i32),
    }

    #[derive(Default)]
    struct Recorder {
        calls: std::vec::Vec<Call>,
    }

    impl Scene for Recorder {
        fn name(&self) -> &'static str {
            "recorder"
        }

        fn on_red_press(&mut self) -> SceneResult {
            self.calls.push(Call::Press(ButtonIndex::Red));
            SceneResult::Handled
        }

        fn on_red_release(&mut self) -> SceneResult {
            self.calls.push(Call::Release(ButtonIndex::Red));
            SceneResult::Handled
        }

        fn on_dial_press(&mut self) -> SceneResult {
            self.calls.push(Call::Press(ButtonIndex::Dial));
            SceneResult::Handled
        }

        fn on_dial_hold(&mut self) -> SceneResult {
            self.calls.push(Call::Hold(ButtonIndex::Dial));
            SceneResult::Handled
        }

        fn on_touch_press(&mut self, at: Point) -> SceneResult {
            self.calls.push(Call::TouchPress(at));
            SceneResult::Handled
        }

        fn on_touch_release(&mut self, at: Point) -> SceneResult {
            self.calls.push(Call::TouchRelease(at));
            SceneResult::Handled
        }

        fn on_lock_changed(&mut self, locked: bool) -> SceneResult {
            self.calls.push(Call::Lock(locked));
            SceneResult::Handled
        }

        fn on_encoder(&mut self, delta: i32) -> SceneResult {
            self.calls.push(Call::Encoder(delta));
            SceneResult::Handled
        }
    }

    fn dispatcher(config: DispatcherConfig) -> (EventDispatcher<Scripted>, std::rc::Rc<core::cell::Cell<u8>>) {
        let raw = std::rc::Rc::new(core::cell::Cell::new(0xFF));
        let backend = Scripted {
            raw: std::rc::Rc::clone(&raw),
        };
        let layout = LayoutSelect::restore(&NoPrefs);
        (EventDispatcher::new(backend, layout, config), raw)
    }

    fn service_n(
        d: &mut EventDispatcher<Scripted>,
        scene: &mut Recorder,
        n: usize,
    ) -> Option<Nav> {
        let mut nav = None;
        for _ in 0..n {
            if let Some(found) = d.service(scene) {
                nav = Some(found);
            }
        }
        nav
    }

    #[test]
    fn press_and_release_reach_the_scene() {
        let (mut d, raw) = dispatcher(DispatcherConfig::default());
        let mut scene = Recorder::default();

        service_n(&mut d, &mut scene, 6);
        assert!(scene.calls.is_empty());

        raw.set(0xFF & !ButtonIndex::Red.bit());
        service_n(&mut d, &mut scene, 6);
        raw.set(0xFF);
        service_n(&mut d, &mut scene, 6);

        assert_eq!(
            scene.calls,
            [Call::Press(ButtonIndex::Red), Call::Release(ButtonIndex::Red)]
        );
    }

    #[test]
    fn held_repeat_eligible_button_fires_hold() {
        let config = DispatcherConfig {
            repeat_start: 20,
            repeat_next: 10,
            ..DispatcherConfig::default()
        };
        let (mut d, raw) = dispatcher(config);
        let mut scene = Recorder::default();

        raw.set(0xFF & !ButtonIndex::Dial.bit());
        service_n(&mut d, &mut scene, 60);

        assert_eq!(scene.calls[0], Call::Press(ButtonIndex::Dial));
        let holds = scene
            .calls
            .iter()
            .filter(|c| **c == Call::Hold(ButtonIndex::Dial))
            .count();
        assert!(holds >= 3);
    }

    #[test]
    fn lockout_suppresses_button_events() {
        let (mut d, raw) = dispatcher(DispatcherConfig::default());
        let mut scene = Recorder::default();

        raw.set(0xFF & !ButtonIndex::Lockout.bit());
        service_n(&mut d, &mut scene, 6);
        assert!(d.locked());
        assert_eq!(scene.calls, [Call::Lock(true)]);

        // Button edges while locked are consumed, not routed.
        raw.set(0xFF & !(ButtonIndex::Lockout.bit() | ButtonIndex::Red.bit()));
        service_n(&mut d, &mut scene, 6);
        assert_eq!(scene.calls, [Call::Lock(true)]);

        // Clearing the lockout does not replay the stale press.
        raw.set(0xFF);
        service_n(&mut d, &mut scene, 6);
        assert!(!d.locked());
        assert_eq!(scene.calls, [Call::Lock(true), Call::Lock(false)]);
    }

    #[test]
    fn press_swallowed_while_locked_never_surfaces_its_release() {
        let (mut d, raw) = dispatcher(DispatcherConfig::default());
        let mut scene = Recorder::default();

        raw.set(0xFF & !(ButtonIndex::Lockout.bit() | ButtonIndex::Red.bit()));
        service_n(&mut d, &mut scene, 6);
        assert_eq!(scene.calls, [Call::Lock(true)]);

        // Lockout clears while the button stays held.
        raw.set(0xFF & !ButtonIndex::Red.bit());
        service_n(&mut d, &mut scene, 6);
        assert_eq!(scene.calls, [Call::Lock(true), Call::Lock(false)]);

        // The release pairs with the swallowed press and is dropped too.
        raw.set(0xFF);
        service_n(&mut d, &mut scene, 6);
        assert_eq!(scene.calls, [Call::Lock(true), Call::Lock(false)]);

        // A fresh press afterwards routes normally.
        raw.set(0xFF & !ButtonIndex::Red.bit());
        service_n(&mut d, &mut scene, 6);
        assert_eq!(scene.calls.last(), Some(&Call::Press(ButtonIndex::Red)));
    }

    #[test]
    fn soft_button_touch_maps_to_button_handlers() {
        let (mut d, _raw) = dispatcher(DispatcherConfig::default());
        let mut scene = Recorder::default();
        assert_eq!(d.layout().current(), &LAYOUTS[0]);

        // Button 0 of layout 0 sits at (0..80, 240..320).
        d.touch_event(TouchEvent::Down(Point::new(20, 260)), 0, &mut scene);
        d.touch_event(TouchEvent::Up(Point::new(20, 260)), 10, &mut scene);
        assert_eq!(
            scene.calls,
            [Call::Press(ButtonIndex::Red), Call::Release(ButtonIndex::Red)]
        );

        // Inside the suppression window every update is ignored.
        d.touch_event(TouchEvent::Down(Point::new(20, 260)), 50, &mut scene);
        assert_eq!(scene.calls.len(), 2);

        // Outside the strip it is a plain touch.
        d.touch_event(TouchEvent::Down(Point::new(120, 120)), 200, &mut scene);
        assert_eq!(scene.calls[2], Call::TouchPress(Point::new(120, 120)));
    }

    #[test]
    fn left_flick_requests_back() {
        let (mut d, _raw) = dispatcher(DispatcherConfig::default());
        let mut scene = Recorder::default();
        let nav = d.touch_event(TouchEvent::Flick(FlickDirection::Left), 0, &mut scene);
        assert_eq!(nav, Some(Nav::Back));
        let nav = d.touch_event(TouchEvent::Flick(FlickDirection::Right), 0, &mut scene);
        assert_eq!(nav, None);
    }

    #[test]
    fn deferred_actions_run_next_cycle_in_fifo_order() {
        let (mut d, _raw) = dispatcher(DispatcherConfig::default());
        let mut scene = Recorder::default();

        fn first(scene: &mut dyn Scene) {
            scene.on_encoder(1);
        }
        fn second(scene: &mut dyn Scene) {
            scene.on_encoder(2);
        }

        assert!(d.schedule(first));
        assert!(d.schedule(second));
        assert!(scene.calls.is_empty());

        d.service(&mut scene);
        assert_eq!(scene.calls, [Call::Encoder(1), Call::Encoder(2)]);

        // Nothing left for the following cycle.
        d.service(&mut scene);
        assert_eq!(scene.calls.len(), 2);
    }

    #[test]
    fn handler_deferred_action_waits_for_the_next_cycle() {
        let (mut d, raw) = dispatcher(DispatcherConfig::default());

        struct Deferring {
            presses: u32,
            marks: u32,
        }

        impl Scene for Deferring {
            fn name(&self) -> &'static str {
                "deferring"
            }

            fn on_red_press(&mut self) -> SceneResult {
                self.presses += 1;
                SceneResult::Defer(mark)
            }

            fn on_encoder(&mut self, _delta: i32) -> SceneResult {
                self.marks += 1;
                SceneResult::Handled
            }
        }

        fn mark(scene: &mut dyn Scene) {
            scene.on_encoder(0);
        }

        let mut scene = Deferring {
            presses: 0,
            marks: 0,
        };
        raw.set(0xFF & !ButtonIndex::Red.bit());
        // Service until the press edge lands; the deferred action must not
        // run inside that same cycle.
        for _ in 0..16 {
            d.service(&mut scene);
            if scene.presses == 1 {
                break;
            }
        }
        assert_eq!(scene.presses, 1);
        assert_eq!(scene.marks, 0);

        d.service(&mut scene);
        assert_eq!(scene.marks, 1);
    }

    #[test]
    fn encoder_deltas_pass_through() {
        let (mut d, _raw) = dispatcher(DispatcherConfig::default());
        let mut scene = Recorder::default();
        d.encoder(0, &mut scene);
        d.encoder(-3, &mut scene);
        assert_eq!(scene.calls, [Call::Encoder(-3)]);
    }

    #[test]
    fn queue_overflow_is_reported() {
        let (mut d, _raw) = dispatcher(DispatcherConfig::default());

        fn noop(_scene: &mut dyn Scene) {}

        for _ in 0..MAX_DEFERRED {
            assert!(d.schedule(noop));
        }
        assert!(!d.schedule(noop));
    }
}
