//! GPIO input-event layer.
//!
//! Turns raw, interrupt-driven pin transitions into typed, debounced
//! application events — button down/up/long-press, rotary-encoder ticks —
//! and delivers them to subscribers in a deferred, ordered fashion.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                     Platform adapter                         │
//! │        (pin reads · edge IRQs · periodic/one-shot timers)    │
//! │        ┌────────────┐           ┌─────────────────┐          │
//! │  edge ─▶ PushButton │     edge ─▶ RotaryEncoder   │          │
//! │  tick ─▶ (debounce) │     edge ─▶ (quadrature +   │          │
//! │        │            │           │  click rate)    │          │
//! │        └─────┬──────┘           └────────┬────────┘          │
//! │              │  dispatch()               │  dispatch()       │
//! │              ▼                           ▼                   │
//! │        ┌──────────────────────────────────────────┐          │
//! │        │     Dispatcher (queue · subscribers)     │          │
//! │        └────────────────────┬─────────────────────┘          │
//! │                             │  process()  (main loop)        │
//! │                             ▼                                │
//! │                     Responder callbacks                      │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Producers run in interrupt context; [`Dispatcher::process`] replays the
//! queue from normal context. The host application constructs one
//! [`Dispatcher`], binds devices to pins via a [`ports::Platform`]
//! implementation, and drains events from its main loop.

#![deny(unused_must_use)]

pub mod config;
pub mod dispatcher;
pub mod drivers;
pub mod error;
pub mod events;
pub mod ports;

pub use config::{ButtonConfig, EncoderConfig};
pub use dispatcher::Dispatcher;
pub use error::{Error, Result};
pub use events::{Action, Event, EventSpec, EventTypeId};
pub use ports::{Platform, Responder, ResponderHandle, ResponderId};
