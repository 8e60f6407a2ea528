//! RotaryEncoder driver against the simulated platform: detent decoding,
//! speed scaling, history resets, construction validation.

use crate::common::EventLog;
use crate::sim_gpio::SimGpio;
use gpio_events::config::{ButtonConfig, EncoderConfig};
use gpio_events::dispatcher::Dispatcher;
use gpio_events::drivers::encoder::RotaryEncoder;
use gpio_events::error::Error;
use gpio_events::events::Action;
use gpio_events::ports::{Level, ResponderHandle};
use std::rc::Rc;

const PIN_A: u8 = 2;
const PIN_B: u8 = 3;
const BUTTON_PIN: u8 = 16;

fn setup() -> (SimGpio, Rc<Dispatcher>, RotaryEncoder, ResponderHandle<EventLog>) {
    let mut sim = SimGpio::new();
    let dispatcher = Rc::new(Dispatcher::new());
    let encoder =
        RotaryEncoder::new(&mut sim, dispatcher.clone(), PIN_A, PIN_B, EncoderConfig::default())
            .unwrap();
    let log = ResponderHandle::new(EventLog::new());
    let ids = encoder.event_ids();
    dispatcher.subscribe(ids.clockwise, &log);
    dispatcher.subscribe(ids.counter_clockwise, &log);
    (sim, dispatcher, encoder, log)
}

/// One full clockwise detent from rest (both lines high), then an idle
/// gap of `gap_ms`.
fn spin_cw(sim: &mut SimGpio, gap_ms: u64) {
    sim.set_pin(PIN_B, Level::Low);
    sim.set_pin(PIN_A, Level::Low);
    sim.set_pin(PIN_B, Level::High);
    sim.set_pin(PIN_A, Level::High);
    sim.advance(gap_ms);
}

fn spin_ccw(sim: &mut SimGpio, gap_ms: u64) {
    sim.set_pin(PIN_A, Level::Low);
    sim.set_pin(PIN_B, Level::Low);
    sim.set_pin(PIN_A, Level::High);
    sim.set_pin(PIN_B, Level::High);
    sim.advance(gap_ms);
}

#[test]
fn cw_detent_delivers_one_tick() {
    let (mut sim, dispatcher, _encoder, log) = setup();
    spin_cw(&mut sim, 1);
    dispatcher.process();
    // First click after cold start carries the minimum step count.
    assert_eq!(log.borrow().seen, vec![(Action::EncoderClockwise, Some(1))]);
}

#[test]
fn ccw_detent_delivers_one_tick() {
    let (mut sim, dispatcher, _encoder, log) = setup();
    spin_ccw(&mut sim, 1);
    dispatcher.process();
    assert_eq!(
        log.borrow().seen,
        vec![(Action::EncoderCounterClockwise, Some(1))]
    );
}

#[test]
fn incomplete_detent_delivers_nothing() {
    let (mut sim, dispatcher, _encoder, log) = setup();
    // Half a detent, then back to rest.
    sim.set_pin(PIN_B, Level::Low);
    sim.set_pin(PIN_B, Level::High);
    dispatcher.process();
    assert!(log.borrow().seen.is_empty());
}

#[test]
fn fast_spin_scales_step_count_monotonically() {
    let (mut sim, dispatcher, _encoder, log) = setup();
    for _ in 0..12 {
        spin_cw(&mut sim, 10);
    }
    dispatcher.process();

    let steps: Vec<u16> = log.borrow().steps().iter().map(|s| s.unwrap()).collect();
    assert_eq!(steps.len(), 12);
    assert_eq!(steps[0], 1);
    assert!(steps.windows(2).all(|w| w[0] <= w[1]));
    // Eight sustained 10 ms intervals reach 100 clicks/sec → 25 steps.
    assert_eq!(*steps.last().unwrap(), 25);
}

#[test]
fn idle_pause_resets_step_scaling() {
    let (mut sim, dispatcher, _encoder, log) = setup();
    for _ in 0..12 {
        spin_cw(&mut sim, 10);
    }
    sim.advance(2000); // past idle_reset_ms
    spin_cw(&mut sim, 1);
    dispatcher.process();

    assert_eq!(log.borrow().steps().last().copied().flatten(), Some(1));
}

#[test]
fn direction_reversal_resets_step_scaling() {
    let (mut sim, dispatcher, _encoder, log) = setup();
    for _ in 0..12 {
        spin_cw(&mut sim, 10);
    }
    spin_ccw(&mut sim, 10);
    dispatcher.process();

    let last = log.borrow().seen.last().copied().unwrap();
    assert_eq!(last, (Action::EncoderCounterClockwise, Some(1)));
}

#[test]
fn duplicate_line_pins_are_rejected() {
    let mut sim = SimGpio::new();
    let dispatcher = Rc::new(Dispatcher::new());
    let result =
        RotaryEncoder::new(&mut sim, dispatcher, PIN_A, PIN_A, EncoderConfig::default());
    assert_eq!(result.err(), Some(Error::DuplicatePin(PIN_A)));
}

#[test]
fn invalid_line_pin_is_rejected() {
    let mut sim = SimGpio::new();
    let dispatcher = Rc::new(Dispatcher::new());
    let result = RotaryEncoder::new(&mut sim, dispatcher, PIN_A, 200, EncoderConfig::default());
    assert_eq!(result.err(), Some(Error::InvalidPin(200)));
}

#[test]
fn integrated_button_shares_the_dispatcher() {
    let mut sim = SimGpio::new();
    let dispatcher = Rc::new(Dispatcher::new());
    let encoder = RotaryEncoder::with_button(
        &mut sim,
        dispatcher.clone(),
        PIN_A,
        PIN_B,
        BUTTON_PIN,
        EncoderConfig::default(),
        ButtonConfig::default(),
    )
    .unwrap();

    let log = ResponderHandle::new(EventLog::new());
    dispatcher.subscribe(encoder.event_ids().clockwise, &log);
    let button_ids = encoder.button().unwrap().event_ids();
    dispatcher.subscribe(button_ids.down, &log);

    spin_cw(&mut sim, 1);
    sim.set_pin(BUTTON_PIN, Level::Low);
    sim.advance(5);
    dispatcher.process();

    assert_eq!(
        log.borrow().actions(),
        vec![Action::EncoderClockwise, Action::ButtonDown]
    );
}

#[test]
fn button_pin_colliding_with_a_line_is_rejected() {
    let mut sim = SimGpio::new();
    let dispatcher = Rc::new(Dispatcher::new());
    let result = RotaryEncoder::with_button(
        &mut sim,
        dispatcher,
        PIN_A,
        PIN_B,
        PIN_B,
        EncoderConfig::default(),
        ButtonConfig::default(),
    );
    assert_eq!(result.err(), Some(Error::DuplicatePin(PIN_B)));
}
