//! Deferred event dispatch.
//!
//! Events are produced in interrupt context (edge handlers, timer
//! callbacks) and replayed to subscribers from normal context:
//!
//! ```text
//! ┌─────────────┐     ┌──────────────┐     ┌───────────────────┐
//! │ edge ISR    │────▶│              │     │ process()         │
//! │ sampler cb  │────▶│  Event Queue │────▶│ snapshot subs,    │
//! │ alarm cb    │────▶│  (critical   │     │ deliver newest-   │
//! │ software    │────▶│   section)   │     │ subscriber-first  │
//! └─────────────┘     └──────────────┘     └───────────────────┘
//! ```
//!
//! The queue is the only cross-context structure; append and pop run
//! inside a `critical_section` (interrupt masking on real hardware).
//! Everything else — subscriber registry, type registry, drop-next flag —
//! is touched from normal context only.
//!
//! Delivery walks the subscriber list newest-first: later subscribers are
//! assumed more specific and get first refusal; an earlier, more general
//! subscriber only sees the event if no later one marked it handled.

use crate::events::{Event, EventSpec, EventTypeId, EventTypeRegistry};
use crate::ports::{Responder, ResponderHandle, ResponderId};
use core::cell::{Cell, RefCell};
use core::sync::atomic::{AtomicBool, Ordering};
use critical_section::Mutex;
use log::{info, trace};
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;

struct Subscriber {
    id: ResponderId,
    responder: Rc<RefCell<dyn Responder>>,
}

impl Clone for Subscriber {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            responder: self.responder.clone(),
        }
    }
}

/// The central event bus: queue, subscriber registry, suspend/drop
/// controls and the drain algorithm.
///
/// One instance is created by the host application's setup code and shared
/// (via `Rc`) with every producer. There is no implicit global.
pub struct Dispatcher {
    queue: Mutex<RefCell<VecDeque<Event>>>,
    suspended: AtomicBool,
    drop_next: Cell<bool>,
    draining: Cell<bool>,
    subscribers: RefCell<HashMap<EventTypeId, Vec<Subscriber>>>,
    registry: EventTypeRegistry,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self {
            queue: Mutex::new(RefCell::new(VecDeque::new())),
            suspended: AtomicBool::new(false),
            drop_next: Cell::new(false),
            draining: Cell::new(false),
            subscribers: RefCell::new(HashMap::new()),
            registry: EventTypeRegistry::new(),
        }
    }

    /// Resolve the stable [`EventTypeId`] for an event specialisation,
    /// assigning one on first reference. Usable as the subscription key.
    pub fn type_id(&self, spec: EventSpec) -> EventTypeId {
        self.registry.type_id(spec)
    }

    /// Add `responder` to the subscriber list for `type_id`.
    ///
    /// Idempotent: subscribing the same responder to the same type id
    /// twice is a no-op.
    pub fn subscribe<R: Responder + 'static>(
        &self,
        type_id: EventTypeId,
        responder: &ResponderHandle<R>,
    ) {
        let mut map = self.subscribers.borrow_mut();
        let list = map.entry(type_id).or_default();
        if list.iter().any(|s| s.id == responder.id()) {
            trace!("dispatcher: responder {:?} already subscribed to {type_id}", responder.id());
            return;
        }
        info!("dispatcher: responder {:?} subscribed to {type_id}", responder.id());
        list.push(Subscriber {
            id: responder.id(),
            responder: responder.shared(),
        });
    }

    /// Remove every entry matching `responder` from the list for
    /// `type_id`. No-op if absent.
    pub fn unsubscribe(&self, type_id: EventTypeId, responder: ResponderId) {
        if let Some(list) = self.subscribers.borrow_mut().get_mut(&type_id) {
            list.retain(|s| s.id != responder);
        }
        info!("dispatcher: responder {responder:?} unsubscribed from {type_id}");
    }

    /// Append `event` to the queue, unless the dispatcher is suspended in
    /// which case the event is silently discarded.
    ///
    /// This is the sole producer entry point and the sole cross-context
    /// operation: a bounded-time append under a critical section, safe to
    /// call from interrupt context.
    pub fn dispatch(&self, event: Event) {
        if self.suspended.load(Ordering::Acquire) {
            trace!("dispatcher: suspended, {event} discarded");
            return;
        }
        critical_section::with(|cs| {
            self.queue.borrow_ref_mut(cs).push_back(event);
        });
    }

    /// Drain the queue in FIFO order, delivering each event to its
    /// subscribers until one marks it handled.
    ///
    /// Runs until the queue is empty, including events appended by
    /// responder callbacks during this same drain. Not reentrant: a call
    /// from within a responder callback returns immediately.
    ///
    /// The subscriber list is snapshotted per event, so a callback that
    /// subscribes or unsubscribes only affects later `process()` calls,
    /// never the drain in flight.
    pub fn process(&self) {
        if self.draining.replace(true) {
            return;
        }
        // Cleared on unwind as well as normal return, so a panicking
        // responder cannot wedge every later drain.
        struct DrainGuard<'a>(&'a Cell<bool>);
        impl Drop for DrainGuard<'_> {
            fn drop(&mut self) {
                self.0.set(false);
            }
        }
        let _guard = DrainGuard(&self.draining);

        while let Some(mut event) = self.pop() {
            // Popped before delivery: a panicking callback cannot leave a
            // half-consumed event in the queue.
            if self.drop_next.get() {
                self.drop_next.set(false);
                trace!("dispatcher: dropped {event}");
                continue;
            }
            let snapshot: Vec<Subscriber> = self
                .subscribers
                .borrow()
                .get(&event.type_id())
                .cloned()
                .unwrap_or_default();
            for sub in snapshot.iter().rev() {
                sub.responder.borrow_mut().respond_to_event(&mut event);
                if event.is_handled() {
                    break;
                }
            }
        }
    }

    /// Arm a one-shot flag: the next drained event is discarded without
    /// any subscriber seeing it.
    pub fn drop_next(&self) {
        self.drop_next.set(true);
    }

    /// Discard all newly dispatched events until [`resume`](Self::resume).
    /// Events already queued are unaffected.
    pub fn suspend(&self) {
        self.suspended.store(true, Ordering::Release);
    }

    /// Accept dispatched events again.
    pub fn resume(&self) {
        self.suspended.store(false, Ordering::Release);
    }

    pub fn is_suspended(&self) -> bool {
        self.suspended.load(Ordering::Acquire)
    }

    /// Number of queued, not-yet-drained events.
    pub fn pending(&self) -> usize {
        critical_section::with(|cs| self.queue.borrow_ref(cs).len())
    }

    fn pop(&self) -> Option<Event> {
        critical_section::with(|cs| self.queue.borrow_ref_mut(cs).pop_front())
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}
