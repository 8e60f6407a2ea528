//! Rotary-encoder quadrature decoder with speed-scaled ticks.
//!
//! ## Decoding
//!
//! Full-step Gray-code state table: each edge on either line produces a
//! 2-bit sample (line A = bit 0, line B = bit 1) that indexes the
//! transition table. A direction is only reported when the machine
//! returns to `START` with the direction bits set — exactly one event per
//! complete mechanical detent. Partial or bounced transitions walk the
//! table without ever reaching the emitting entry, so quadrature
//! debouncing is implicit.
//!
//! ## Speed scaling
//!
//! Completed detents are timestamped into an 8-slot ring of inter-click
//! intervals. The rolling clicks-per-second rate maps through a monotonic
//! staircase to a step multiplier (1–100) carried as the tick payload, so
//! a fast spin covers a large range while a slow turn stays fine-grained.
//! A pause of `idle_reset_ms` or a direction reversal resets the ring to
//! cold so stale history cannot inflate the multiplier.

use crate::config::{ButtonConfig, EncoderConfig};
use crate::dispatcher::Dispatcher;
use crate::drivers::button::PushButton;
use crate::error::{Error, Result};
use crate::events::{Action, Event, EventSpec, EventTypeId};
use crate::ports::{EdgeMask, PinId, Platform};
use core::cell::RefCell;
use heapless::HistoryBuffer;
use log::{info, trace};
use std::rc::Rc;

/// Rotation direction of a completed detent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Clockwise,
    CounterClockwise,
}

// Full-step decode states (low nibble) and transient direction flags.
const R_START: u8 = 0x0;
const R_CW_FINAL: u8 = 0x1;
const R_CW_BEGIN: u8 = 0x2;
const R_CW_NEXT: u8 = 0x3;
const R_CCW_BEGIN: u8 = 0x4;
const R_CCW_FINAL: u8 = 0x5;
const R_CCW_NEXT: u8 = 0x6;

const DIR_CW: u8 = 0x10;
const DIR_CCW: u8 = 0x20;
const DIR_MASK: u8 = 0x30;

/// `TTABLE[state & 0xF][sample]` — emits a direction flag only on the
/// transition back to `R_START` that completes a detent.
const TTABLE: [[u8; 4]; 7] = [
    // R_START
    [R_START, R_CW_BEGIN, R_CCW_BEGIN, R_START],
    // R_CW_FINAL
    [R_CW_NEXT, R_START, R_CW_FINAL, R_START | DIR_CW],
    // R_CW_BEGIN
    [R_CW_NEXT, R_CW_BEGIN, R_START, R_START],
    // R_CW_NEXT
    [R_CW_NEXT, R_CW_BEGIN, R_CW_FINAL, R_START],
    // R_CCW_BEGIN
    [R_CCW_NEXT, R_START, R_CCW_BEGIN, R_START],
    // R_CCW_FINAL
    [R_CCW_NEXT, R_CCW_FINAL, R_START, R_START | DIR_CCW],
    // R_CCW_NEXT
    [R_CCW_NEXT, R_CCW_FINAL, R_CCW_BEGIN, R_START],
];

/// Pure quadrature state machine.
#[derive(Debug)]
pub struct QuadratureFsm {
    state: u8,
}

impl QuadratureFsm {
    pub fn new() -> Self {
        Self { state: R_START }
    }

    /// Advance by one 2-bit pin sample; returns the direction when a full
    /// detent completes.
    pub fn advance(&mut self, sample: u8) -> Option<Direction> {
        self.state = TTABLE[(self.state & 0x0F) as usize][(sample & 0x3) as usize];
        match self.state & DIR_MASK {
            DIR_CW => Some(Direction::Clockwise),
            DIR_CCW => Some(Direction::CounterClockwise),
            _ => None,
        }
    }
}

impl Default for QuadratureFsm {
    fn default() -> Self {
        Self::new()
    }
}

/// Number of inter-click intervals in the rolling history.
pub const CLICK_HISTORY: usize = 8;

/// Rolling clicks-per-second estimator over the last [`CLICK_HISTORY`]
/// inter-click intervals.
pub struct ClickRate {
    intervals: HistoryBuffer<u32, CLICK_HISTORY>,
    last: Option<(Direction, u64)>,
    idle_reset_ms: u64,
    cold_interval_ms: u32,
}

impl ClickRate {
    pub fn new(config: &EncoderConfig) -> Self {
        Self {
            intervals: HistoryBuffer::new_with(config.cold_interval_ms),
            last: None,
            idle_reset_ms: config.idle_reset_ms,
            cold_interval_ms: config.cold_interval_ms,
        }
    }

    /// Record one click and return the current clicks-per-second rate.
    ///
    /// A pause of `idle_reset_ms` or more, or a direction reversal,
    /// resets the history to cold first so the rate restarts from slow.
    pub fn record(&mut self, direction: Direction, now_ms: u64) -> u32 {
        let interval = match self.last {
            Some((prev_dir, prev_ms)) => {
                let elapsed = now_ms.saturating_sub(prev_ms);
                if prev_dir != direction || elapsed >= self.idle_reset_ms {
                    self.intervals.clear_with(self.cold_interval_ms);
                }
                elapsed.clamp(1, u64::from(self.cold_interval_ms)) as u32
            }
            None => {
                self.intervals.clear_with(self.cold_interval_ms);
                self.cold_interval_ms
            }
        };
        self.intervals.write(interval);
        self.last = Some((direction, now_ms));

        let sum: u64 = self.intervals.as_slice().iter().map(|&v| u64::from(v)).sum();
        // clicks/sec = 1000 / (sum / CLICK_HISTORY), in integer form.
        ((1000 * CLICK_HISTORY as u64) / sum.max(1)) as u32
    }
}

/// Map a click rate to the tick step multiplier. Monotonic staircase.
pub fn step_multiplier(clicks_per_sec: u32) -> u16 {
    match clicks_per_sec {
        0..25 => 1,
        25..50 => 2,
        50..75 => 5,
        75..100 => 10,
        100..125 => 25,
        125..150 => 50,
        _ => 100,
    }
}

/// Type ids of the events an encoder produces, resolved at construction.
#[derive(Debug, Clone, Copy)]
pub struct EncoderEventIds {
    pub clockwise: EventTypeId,
    pub counter_clockwise: EventTypeId,
}

struct EncoderCore {
    pin_a: PinId,
    pin_b: PinId,
    dispatcher: Rc<Dispatcher>,
    fsm: QuadratureFsm,
    clicks: ClickRate,
    ids: EncoderEventIds,
}

/// A rotary encoder bound to two quadrature lines, optionally with an
/// integrated push-button on a third pin.
pub struct RotaryEncoder {
    core: Rc<RefCell<EncoderCore>>,
    ids: EncoderEventIds,
    button: Option<PushButton>,
}

impl RotaryEncoder {
    pub fn new(
        platform: &mut dyn Platform,
        dispatcher: Rc<Dispatcher>,
        pin_a: PinId,
        pin_b: PinId,
        config: EncoderConfig,
    ) -> Result<Self> {
        if pin_a == pin_b {
            return Err(Error::DuplicatePin(pin_a));
        }
        for pin in [pin_a, pin_b] {
            if !platform.is_valid_pin(pin) {
                return Err(Error::InvalidPin(pin));
            }
        }
        config.validate()?;

        let ids = EncoderEventIds {
            clockwise: dispatcher.type_id(EventSpec::encoder(
                Action::EncoderClockwise,
                pin_a,
                pin_b,
            )),
            counter_clockwise: dispatcher.type_id(EventSpec::encoder(
                Action::EncoderCounterClockwise,
                pin_a,
                pin_b,
            )),
        };

        info!("encoder: pins {pin_a}/{pin_b} configured");

        let core = Rc::new(RefCell::new(EncoderCore {
            pin_a,
            pin_b,
            dispatcher,
            fsm: QuadratureFsm::new(),
            clicks: ClickRate::new(&config),
            ids,
        }));

        for pin in [pin_a, pin_b] {
            let handler_core = Rc::clone(&core);
            platform.register_edge_handler(
                pin,
                Box::new(move |plat, _pin, _edges| EncoderCore::on_edge(&handler_core, plat)),
            );
            platform.set_edge_interrupt(pin, EdgeMask::BOTH, true);
        }

        Ok(Self {
            core,
            ids,
            button: None,
        })
    }

    /// An encoder with an integrated push-button on `button_pin`.
    pub fn with_button(
        platform: &mut dyn Platform,
        dispatcher: Rc<Dispatcher>,
        pin_a: PinId,
        pin_b: PinId,
        button_pin: PinId,
        config: EncoderConfig,
        button_config: ButtonConfig,
    ) -> Result<Self> {
        if button_pin == pin_a || button_pin == pin_b {
            return Err(Error::DuplicatePin(button_pin));
        }
        let mut encoder = Self::new(platform, dispatcher.clone(), pin_a, pin_b, config)?;
        encoder.button = Some(PushButton::new(
            platform,
            dispatcher,
            button_pin,
            button_config,
        )?);
        Ok(encoder)
    }

    pub fn pins(&self) -> (PinId, PinId) {
        let c = self.core.borrow();
        (c.pin_a, c.pin_b)
    }

    /// Subscription keys for this encoder's tick events.
    pub fn event_ids(&self) -> EncoderEventIds {
        self.ids
    }

    /// The integrated push-button, if configured.
    pub fn button(&self) -> Option<&PushButton> {
        self.button.as_ref()
    }
}

impl EncoderCore {
    /// Edge on either line: sample both lines, advance the decode table,
    /// dispatch a speed-scaled tick when a detent completes.
    fn on_edge(core: &Rc<RefCell<EncoderCore>>, platform: &mut dyn Platform) {
        let mut c = core.borrow_mut();
        let a = u8::from(platform.read_pin(c.pin_a).is_high());
        let b = u8::from(platform.read_pin(c.pin_b).is_high());
        let sample = a | (b << 1);

        if let Some(direction) = c.fsm.advance(sample) {
            let rate = c.clicks.record(direction, platform.now_ms());
            let steps = step_multiplier(rate);
            let (action, type_id) = match direction {
                Direction::Clockwise => (Action::EncoderClockwise, c.ids.clockwise),
                Direction::CounterClockwise => {
                    (Action::EncoderCounterClockwise, c.ids.counter_clockwise)
                }
            };
            trace!(
                "encoder: pins {}/{} {action} ({rate} cps, {steps} steps)",
                c.pin_a, c.pin_b
            );
            c.dispatcher.dispatch(Event::encoder_tick(action, type_id, steps));
        }
    }
}
