//! Debounced push-button driver.
//!
//! ## Hardware
//!
//! Active-low momentary switch with a pull-up: a falling edge starts a
//! press hypothesis, a rising edge a release hypothesis.
//!
//! ## Debounce scheme
//!
//! Edge interrupts only start the process. The edge handler disarms the
//! pin's interrupts and starts a periodic sampler; the sampler counts
//! consecutive samples consistent with the hypothesis and commits the
//! transition at the configured threshold. An inconsistent sample inside
//! the window settles the line back to the opposite steady state, re-arms
//! both edges and stops sampling — fast bounce recovery instead of
//! restarting the count.
//!
//! | Transition        | Effect                                           |
//! |-------------------|--------------------------------------------------|
//! | Press committed   | `ButtonDown` dispatched, long-press alarm armed  |
//! | Release committed | `ButtonUp` dispatched, long-press alarm cancelled|
//! | Alarm fires       | `ButtonLongPress` dispatched (state unchanged)   |
//! | Bounce settles    | no event, both edges re-armed                    |
//!
//! With a double-tap window configured, a press committed within the
//! window of the previous committed release also emits `ButtonDoubleTap`.

use crate::config::ButtonConfig;
use crate::dispatcher::Dispatcher;
use crate::error::{Error, Result};
use crate::events::{Action, Event, EventSpec, EventTypeId};
use crate::ports::{EdgeMask, Level, PinId, Platform, TimerHandle};
use core::cell::RefCell;
use log::{debug, info, trace};
use std::rc::Rc;

/// Committed steady state of the button.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonState {
    NotPressed,
    Pressed,
}

/// Result of feeding one periodic sample to the debounce state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleOutcome {
    /// Still inside the debounce window; keep sampling.
    Sampling,
    /// Enough consistent samples — the transition is committed.
    Committed(ButtonState),
    /// Inconsistent sample inside the window; the line is treated as
    /// settled at the observed steady state. No transition occurred.
    Settled(ButtonState),
}

/// Pure debounce state machine. Drives no hardware; the [`PushButton`]
/// driver feeds it edges and samples and acts on the outcomes.
#[derive(Debug)]
pub struct DebounceFsm {
    state: ButtonState,
    pending: Option<ButtonState>,
    count: u32,
    threshold: u32,
}

impl DebounceFsm {
    pub fn new(threshold: u32) -> Self {
        Self {
            state: ButtonState::NotPressed,
            pending: None,
            count: 0,
            threshold,
        }
    }

    pub fn state(&self) -> ButtonState {
        self.state
    }

    /// Whether a debounce window is open.
    pub fn is_sampling(&self) -> bool {
        self.pending.is_some()
    }

    /// Record an edge interrupt: a falling edge hypothesises a press, a
    /// rising edge a release. Opens the debounce window.
    pub fn on_edge(&mut self, edges: EdgeMask) {
        self.pending = Some(if edges.contains(EdgeMask::FALLING) {
            ButtonState::Pressed
        } else {
            ButtonState::NotPressed
        });
        self.count = 0;
    }

    /// Feed one periodic pin sample (active-low: `Low` = pressed).
    pub fn on_sample(&mut self, level: Level) -> SampleOutcome {
        let observed = if level.is_low() {
            ButtonState::Pressed
        } else {
            ButtonState::NotPressed
        };
        let Some(pending) = self.pending else {
            // No window open; nothing to settle.
            return SampleOutcome::Settled(self.state);
        };
        if observed == pending {
            self.count += 1;
            if self.count < self.threshold {
                return SampleOutcome::Sampling;
            }
            let previous = self.state;
            self.state = pending;
            self.pending = None;
            self.count = 0;
            if pending == previous {
                // Spurious edge without a real state change.
                SampleOutcome::Settled(pending)
            } else {
                SampleOutcome::Committed(pending)
            }
        } else {
            self.state = observed;
            self.pending = None;
            self.count = 0;
            SampleOutcome::Settled(observed)
        }
    }
}

/// Type ids of the events a button produces, resolved at construction.
#[derive(Debug, Clone, Copy)]
pub struct ButtonEventIds {
    pub down: EventTypeId,
    pub up: EventTypeId,
    pub long_press: EventTypeId,
    pub double_tap: EventTypeId,
}

struct ButtonCore {
    pin: PinId,
    config: ButtonConfig,
    dispatcher: Rc<Dispatcher>,
    fsm: DebounceFsm,
    ids: ButtonEventIds,
    sampler: Option<TimerHandle>,
    long_press: Option<TimerHandle>,
    last_release_ms: Option<u64>,
}

/// A debounced push-button bound to one pin.
///
/// Construction registers the pin's interrupt-router entry and arms the
/// falling edge; everything after that is driven by platform callbacks.
pub struct PushButton {
    core: Rc<RefCell<ButtonCore>>,
    pin: PinId,
    ids: ButtonEventIds,
}

impl PushButton {
    pub fn new(
        platform: &mut dyn Platform,
        dispatcher: Rc<Dispatcher>,
        pin: PinId,
        config: ButtonConfig,
    ) -> Result<Self> {
        if !platform.is_valid_pin(pin) {
            return Err(Error::InvalidPin(pin));
        }
        config.validate()?;

        let ids = ButtonEventIds {
            down: dispatcher.type_id(EventSpec::button(Action::ButtonDown, pin)),
            up: dispatcher.type_id(EventSpec::button(Action::ButtonUp, pin)),
            long_press: dispatcher.type_id(EventSpec::button(Action::ButtonLongPress, pin)),
            double_tap: dispatcher.type_id(EventSpec::button(Action::ButtonDoubleTap, pin)),
        };

        info!(
            "button: pin {pin} configured (debounce {} ticks @ {} ms, long-press {} ms)",
            config.debounce_ticks, config.sample_period_ms, config.long_press_ms
        );

        let core = Rc::new(RefCell::new(ButtonCore {
            pin,
            fsm: DebounceFsm::new(config.debounce_ticks),
            config,
            dispatcher,
            ids,
            sampler: None,
            long_press: None,
            last_release_ms: None,
        }));

        let handler_core = Rc::clone(&core);
        platform.register_edge_handler(
            pin,
            Box::new(move |plat, _pin, edges| ButtonCore::on_edge(&handler_core, plat, edges)),
        );
        platform.set_edge_interrupt(pin, EdgeMask::FALLING, true);

        Ok(Self { core, pin, ids })
    }

    pub fn pin(&self) -> PinId {
        self.pin
    }

    /// Subscription keys for this button's events.
    pub fn event_ids(&self) -> ButtonEventIds {
        self.ids
    }

    /// Last committed steady state.
    pub fn state(&self) -> ButtonState {
        self.core.borrow().fsm.state()
    }
}

impl ButtonCore {
    /// Edge interrupt: open a debounce window and hand control to the
    /// periodic sampler. Edge interrupts stay disarmed until the window
    /// closes.
    fn on_edge(core: &Rc<RefCell<ButtonCore>>, platform: &mut dyn Platform, edges: EdgeMask) {
        let mut c = core.borrow_mut();
        if c.fsm.is_sampling() {
            // Edge IRQs are disarmed while a window is open.
            return;
        }
        platform.set_edge_interrupt(c.pin, EdgeMask::BOTH, false);
        c.fsm.on_edge(edges);
        trace!("button: pin {} edge, sampling", c.pin);

        let sampler_core = Rc::clone(core);
        let handle = platform.schedule_repeating(
            c.config.sample_period_ms,
            Box::new(move |plat| ButtonCore::on_sample(&sampler_core, plat)),
        );
        c.sampler = Some(handle);
    }

    /// Periodic sample tick. Returns `false` once the window closes so
    /// the platform stops the repeating timer.
    fn on_sample(core: &Rc<RefCell<ButtonCore>>, platform: &mut dyn Platform) -> bool {
        let mut c = core.borrow_mut();
        let level = platform.read_pin(c.pin);
        match c.fsm.on_sample(level) {
            SampleOutcome::Sampling => true,
            SampleOutcome::Committed(ButtonState::Pressed) => {
                c.sampler = None;
                platform.set_edge_interrupt(c.pin, EdgeMask::RISING, true);
                debug!("button: pin {} press committed", c.pin);

                let alarm_core = Rc::clone(core);
                let handle = platform.schedule_once(
                    c.config.long_press_ms,
                    Box::new(move |_plat| ButtonCore::on_long_press(&alarm_core)),
                );
                c.long_press = Some(handle);

                c.dispatcher.dispatch(Event::new(Action::ButtonDown, c.ids.down));

                if let (Some(window), Some(last)) =
                    (c.config.double_tap_window_ms, c.last_release_ms)
                {
                    if platform.now_ms().saturating_sub(last) <= u64::from(window) {
                        c.dispatcher
                            .dispatch(Event::new(Action::ButtonDoubleTap, c.ids.double_tap));
                    }
                }
                false
            }
            SampleOutcome::Committed(ButtonState::NotPressed) => {
                c.sampler = None;
                platform.set_edge_interrupt(c.pin, EdgeMask::FALLING, true);
                debug!("button: pin {} release committed", c.pin);

                if let Some(handle) = c.long_press.take() {
                    platform.cancel(handle);
                }
                c.last_release_ms = Some(platform.now_ms());
                c.dispatcher.dispatch(Event::new(Action::ButtonUp, c.ids.up));
                false
            }
            SampleOutcome::Settled(_) => {
                c.sampler = None;
                platform.set_edge_interrupt(c.pin, EdgeMask::BOTH, true);
                trace!("button: pin {} bounce absorbed", c.pin);
                false
            }
        }
    }

    /// Long-press alarm fired: the press was held for the full window.
    /// Does not change the committed button state.
    fn on_long_press(core: &Rc<RefCell<ButtonCore>>) {
        let mut c = core.borrow_mut();
        c.long_press = None;
        debug!("button: pin {} long press", c.pin);
        c.dispatcher
            .dispatch(Event::new(Action::ButtonLongPress, c.ids.long_press));
    }
}
