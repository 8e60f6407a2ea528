//! Typed GPIO events and the specialisation registry.
//!
//! Every event carries two discriminators:
//!
//! - [`Action`] — *what happened* (button down, encoder tick, ...).
//! - [`EventTypeId`] — *which configured device it happened on*. Two
//!   buttons on different pins produce `ButtonDown` events with distinct
//!   type ids; the type id is the subscription key, not the action.
//!
//! Type ids are assigned lazily by the [`EventTypeRegistry`], keyed on the
//! `(action, pins)` pair, starting at 1 and increasing monotonically. An
//! id is never reused, so repeated lookups for the same specialisation are
//! stable for the life of the process.

use crate::ports::PinId;
use core::cell::{Cell, RefCell};
use core::fmt;
use std::collections::HashMap;

/// The closed set of GPIO actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Action {
    None = 0,
    Base,
    ButtonDown,
    ButtonUp,
    ButtonLongPress,
    ButtonDoubleTap,
    EncoderClockwise,
    EncoderCounterClockwise,
}

impl Action {
    /// Whether this action originates from a push-button.
    pub const fn is_button(self) -> bool {
        matches!(
            self,
            Self::ButtonDown | Self::ButtonUp | Self::ButtonLongPress | Self::ButtonDoubleTap
        )
    }

    /// Whether this action originates from a rotary encoder.
    pub const fn is_encoder(self) -> bool {
        matches!(self, Self::EncoderClockwise | Self::EncoderCounterClockwise)
    }

    const fn label(self) -> &'static str {
        match self {
            Self::None => "None",
            Self::Base => "Base",
            Self::ButtonDown => "ButtonDown",
            Self::ButtonUp => "ButtonUp",
            Self::ButtonLongPress => "ButtonLongPress",
            Self::ButtonDoubleTap => "ButtonDoubleTap",
            Self::EncoderClockwise => "EncoderClockwise",
            Self::EncoderCounterClockwise => "EncoderCounterClockwise",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// The pin(s) a specialisation is bound to.
///
/// Encoder pairs are stored low-pin-first so that `(a, b)` and `(b, a)`
/// name the same specialisation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PinBinding {
    Single(PinId),
    Pair(PinId, PinId),
}

impl PinBinding {
    pub const fn single(pin: PinId) -> Self {
        Self::Single(pin)
    }

    pub const fn pair(a: PinId, b: PinId) -> Self {
        if a <= b { Self::Pair(a, b) } else { Self::Pair(b, a) }
    }
}

/// Runtime discriminator of an event specialisation: `(action, pins)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EventSpec {
    pub action: Action,
    pub pins: PinBinding,
}

impl EventSpec {
    pub const fn button(action: Action, pin: PinId) -> Self {
        Self {
            action,
            pins: PinBinding::single(pin),
        }
    }

    pub const fn encoder(action: Action, pin_a: PinId, pin_b: PinId) -> Self {
        Self {
            action,
            pins: PinBinding::pair(pin_a, pin_b),
        }
    }
}

/// Stable identifier of an event specialisation; the dispatch key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EventTypeId(u32);

impl fmt::Display for EventTypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lazily populated `EventSpec → EventTypeId` map.
///
/// Single-context use only (normal execution); producers resolve their ids
/// once at construction time, never from interrupt context.
pub struct EventTypeRegistry {
    ids: RefCell<HashMap<EventSpec, EventTypeId>>,
    next: Cell<u32>,
}

impl EventTypeRegistry {
    pub fn new() -> Self {
        Self {
            ids: RefCell::new(HashMap::new()),
            next: Cell::new(1),
        }
    }

    /// Look up the id for `spec`, assigning one on first reference.
    pub fn type_id(&self, spec: EventSpec) -> EventTypeId {
        *self.ids.borrow_mut().entry(spec).or_insert_with(|| {
            let id = self.next.get();
            self.next.set(id + 1);
            EventTypeId(id)
        })
    }
}

impl Default for EventTypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// A queued GPIO event.
///
/// `handled` latches: once a responder marks the event handled it can never
/// be un-marked, and propagation to earlier subscribers stops.
#[derive(Debug, Clone)]
pub struct Event {
    action: Action,
    type_id: EventTypeId,
    handled: bool,
    steps: Option<u16>,
}

impl Event {
    pub fn new(action: Action, type_id: EventTypeId) -> Self {
        Self {
            action,
            type_id,
            handled: false,
            steps: None,
        }
    }

    /// An encoder tick carrying a speed-scaled step count (>= 1).
    pub fn encoder_tick(action: Action, type_id: EventTypeId, steps: u16) -> Self {
        Self {
            action,
            type_id,
            handled: false,
            steps: Some(steps.max(1)),
        }
    }

    pub fn action(&self) -> Action {
        self.action
    }

    pub fn type_id(&self) -> EventTypeId {
        self.type_id
    }

    /// Step count payload, present on encoder ticks only.
    pub fn steps(&self) -> Option<u16> {
        self.steps
    }

    pub fn is_handled(&self) -> bool {
        self.handled
    }

    /// Mark the event handled so it does not propagate to the next responder.
    pub fn set_handled(&mut self) {
        self.handled = true;
    }

    pub fn is_button_event(&self) -> bool {
        self.action.is_button()
    }

    pub fn is_encoder_event(&self) -> bool {
        self.action.is_encoder()
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} id:{}", self.action, self.type_id)?;
        if let Some(steps) = self.steps {
            write!(f, " steps:{steps}")?;
        }
        Ok(())
    }
}
