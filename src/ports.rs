//! Port traits — the boundary between the event core and the platform.
//!
//! ```text
//!   Platform adapter ──▶ Platform trait ──▶ drivers (debounce, quadrature)
//!   application code ──▶ Responder trait ◀── Dispatcher::process()
//! ```
//!
//! The event core never touches hardware registers. Drivers consume a
//! [`Platform`] implementation for pin reads, edge interrupts and timers;
//! the platform adapter owns the process-wide interrupt router (pin →
//! registered handler) and invokes handlers on every armed edge.
//!
//! Timer and edge callbacks receive `&mut dyn Platform` re-entrantly, so a
//! driver can read pins and re-arm interrupts from the callback without
//! holding a second reference to the platform object.

use crate::events::Event;
use core::cell::{Ref, RefCell, RefMut};
use core::sync::atomic::{AtomicU32, Ordering};
use std::rc::Rc;

/// Platform pin identifier.
pub type PinId = u8;

/// Instantaneous digital level of a pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Low,
    High,
}

impl Level {
    pub const fn is_low(self) -> bool {
        matches!(self, Self::Low)
    }

    pub const fn is_high(self) -> bool {
        matches!(self, Self::High)
    }
}

/// Edge selection mask for pin interrupts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EdgeMask(u8);

impl EdgeMask {
    pub const NONE: Self = Self(0b00);
    pub const FALLING: Self = Self(0b01);
    pub const RISING: Self = Self(0b10);
    pub const BOTH: Self = Self(0b11);

    /// True if every edge in `other` is selected by `self`.
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    pub const fn without(self, other: Self) -> Self {
        Self(self.0 & !other.0)
    }
}

impl core::ops::BitOr for EdgeMask {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        self.union(rhs)
    }
}

/// Opaque handle to a scheduled timer or alarm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerHandle(pub u32);

/// Handler invoked by the interrupt router when an armed edge fires on a
/// registered pin. Runs in interrupt context.
pub type EdgeHandler = Box<dyn FnMut(&mut dyn Platform, PinId, EdgeMask)>;

/// Periodic timer callback. Return `true` to keep repeating, `false` to
/// stop. Runs in interrupt context.
pub type RepeatingCallback = Box<dyn FnMut(&mut dyn Platform) -> bool>;

/// One-shot alarm callback. Runs in interrupt context.
pub type OneShotCallback = Box<dyn FnOnce(&mut dyn Platform)>;

/// The GPIO/timer collaborator surface consumed by the drivers.
///
/// Implementations wrap a real SDK (Pico SDK GPIO + repeating timers,
/// ESP-IDF `esp_timer`, ...) or a host-side simulation for tests.
pub trait Platform {
    /// Instantaneous digital read.
    fn read_pin(&self, pin: PinId) -> Level;

    /// Whether `pin` exists on this platform. Checked at device
    /// construction time, never at runtime.
    fn is_valid_pin(&self, pin: PinId) -> bool;

    /// Register the interrupt-router entry for `pin`. At most one handler
    /// per pin; a second registration replaces the first.
    fn register_edge_handler(&mut self, pin: PinId, handler: EdgeHandler);

    /// Arm (`enabled = true`) or disarm the given edges on `pin`. Edges
    /// not named in `edges` keep their current arming.
    fn set_edge_interrupt(&mut self, pin: PinId, edges: EdgeMask, enabled: bool);

    /// Schedule `callback` every `period_ms` until it returns `false` or
    /// the handle is cancelled.
    fn schedule_repeating(&mut self, period_ms: u32, callback: RepeatingCallback) -> TimerHandle;

    /// Schedule `callback` once after `delay_ms`.
    fn schedule_once(&mut self, delay_ms: u32, callback: OneShotCallback) -> TimerHandle;

    /// Cancel a scheduled timer or alarm. No-op for handles that already
    /// fired or were cancelled.
    fn cancel(&mut self, handle: TimerHandle);

    /// Milliseconds since boot (monotonic).
    fn now_ms(&self) -> u64;
}

// ───────────────────────────────────────────────────────────────
// Responder capability
// ───────────────────────────────────────────────────────────────

/// The subscriber-side contract: one callback, invoked synchronously while
/// the dispatcher drains its queue.
///
/// A responder may mark the event handled (stopping propagation to
/// earlier-subscribed responders) and may dispatch further events, which
/// are delivered later in the same drain. It must not block — it runs
/// inline with queue draining.
pub trait Responder {
    fn respond_to_event(&mut self, event: &mut Event);
}

/// Process-lifetime-stable identity of a responder.
///
/// Identities are drawn from a monotonic counter and never reused, so an
/// unsubscribe call can never match a different, later responder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ResponderId(u32);

static NEXT_RESPONDER_ID: AtomicU32 = AtomicU32::new(1);

fn alloc_responder_id() -> ResponderId {
    let id = NEXT_RESPONDER_ID.fetch_add(1, Ordering::Relaxed);
    // A wrapped counter would hand out identities that collide with live
    // subscribers; there is no safe way to continue.
    assert!(id != u32::MAX, "responder identity space exhausted");
    ResponderId(id)
}

/// Shared handle to a responder: a unique [`ResponderId`] plus shared
/// ownership of the responder itself.
///
/// The dispatcher keeps a clone of the inner allocation while subscribed,
/// so a responder can never dangle underneath the subscriber list.
pub struct ResponderHandle<R: Responder> {
    id: ResponderId,
    inner: Rc<RefCell<R>>,
}

impl<R: Responder + 'static> ResponderHandle<R> {
    pub fn new(responder: R) -> Self {
        Self {
            id: alloc_responder_id(),
            inner: Rc::new(RefCell::new(responder)),
        }
    }

    pub fn id(&self) -> ResponderId {
        self.id
    }

    /// Borrow the responder, e.g. to inspect state it accumulated while
    /// responding to events.
    pub fn borrow(&self) -> Ref<'_, R> {
        self.inner.borrow()
    }

    pub fn borrow_mut(&self) -> RefMut<'_, R> {
        self.inner.borrow_mut()
    }

    pub(crate) fn shared(&self) -> Rc<RefCell<dyn Responder>> {
        self.inner.clone()
    }
}

impl<R: Responder> Clone for ResponderHandle<R> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            inner: self.inner.clone(),
        }
    }
}
