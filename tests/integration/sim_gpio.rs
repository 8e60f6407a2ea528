//! Simulated GPIO/timer platform for integration tests.
//!
//! Implements the full [`Platform`] surface in memory: pin levels are
//! driven by the test (`set_pin`), armed edges invoke the registered
//! handler synchronously (standing in for the ISR), and `advance` steps a
//! simulated millisecond clock, firing due periodic and one-shot timers
//! in order.

use gpio_events::ports::{
    EdgeHandler, EdgeMask, Level, OneShotCallback, PinId, Platform, RepeatingCallback, TimerHandle,
};
use std::collections::{HashMap, HashSet};

/// The simulated board exposes 30 GPIOs, numbered 0–29.
pub const PIN_COUNT: usize = 30;

enum TimerKind {
    Repeating {
        period_ms: u32,
        callback: RepeatingCallback,
    },
    OneShot {
        callback: OneShotCallback,
    },
}

struct Timer {
    due_ms: u64,
    kind: TimerKind,
}

pub struct SimGpio {
    now_ms: u64,
    levels: [Level; PIN_COUNT],
    handlers: HashMap<PinId, Option<EdgeHandler>>,
    armed: HashMap<PinId, EdgeMask>,
    timers: HashMap<u32, Timer>,
    /// Handles cancelled while their callback was in flight.
    cancelled: HashSet<u32>,
    next_handle: u32,
}

#[allow(dead_code)]
impl SimGpio {
    pub fn new() -> Self {
        Self {
            now_ms: 0,
            // Pull-ups everywhere: buttons and encoder lines rest high.
            levels: [Level::High; PIN_COUNT],
            handlers: HashMap::new(),
            armed: HashMap::new(),
            timers: HashMap::new(),
            cancelled: HashSet::new(),
            next_handle: 1,
        }
    }

    pub fn now(&self) -> u64 {
        self.now_ms
    }

    pub fn armed_edges(&self, pin: PinId) -> EdgeMask {
        self.armed.get(&pin).copied().unwrap_or(EdgeMask::NONE)
    }

    /// Number of live (scheduled, not yet fired or cancelled) timers.
    pub fn timer_count(&self) -> usize {
        self.timers.len()
    }

    /// Drive a pin to `level`; if the resulting edge is armed, the
    /// registered handler runs synchronously, as an ISR would.
    pub fn set_pin(&mut self, pin: PinId, level: Level) {
        let idx = pin as usize;
        if self.levels[idx] == level {
            return;
        }
        self.levels[idx] = level;
        let edge = if level == Level::Low {
            EdgeMask::FALLING
        } else {
            EdgeMask::RISING
        };
        if !self.armed_edges(pin).contains(edge) {
            return;
        }
        // The handler is moved out for the call so it can re-enter the
        // platform (read pins, re-arm interrupts, start timers).
        let handler = match self.handlers.get_mut(&pin) {
            Some(slot) => slot.take(),
            None => None,
        };
        if let Some(mut handler) = handler {
            handler(self, pin, edge);
            if let Some(slot) = self.handlers.get_mut(&pin) {
                if slot.is_none() {
                    *slot = Some(handler);
                }
            }
        }
    }

    /// Advance simulated time by `ms`, firing every timer that comes due,
    /// in due-time order.
    pub fn advance(&mut self, ms: u64) {
        let target = self.now_ms + ms;
        loop {
            let next = self
                .timers
                .iter()
                .map(|(&h, t)| (h, t.due_ms))
                .filter(|&(_, due)| due <= target)
                .min_by_key(|&(h, due)| (due, h));
            let Some((handle, due)) = next else { break };
            if due > self.now_ms {
                self.now_ms = due;
            }
            self.fire(handle);
        }
        self.now_ms = target;
    }

    fn fire(&mut self, handle: u32) {
        let Some(timer) = self.timers.remove(&handle) else {
            return;
        };
        match timer.kind {
            TimerKind::Repeating {
                period_ms,
                mut callback,
            } => {
                let keep = callback(self);
                let was_cancelled = self.cancelled.remove(&handle);
                if keep && !was_cancelled {
                    self.timers.insert(
                        handle,
                        Timer {
                            due_ms: timer.due_ms + u64::from(period_ms),
                            kind: TimerKind::Repeating { period_ms, callback },
                        },
                    );
                }
            }
            TimerKind::OneShot { callback } => {
                callback(self);
                self.cancelled.remove(&handle);
            }
        }
    }

    fn alloc_handle(&mut self) -> u32 {
        let handle = self.next_handle;
        self.next_handle += 1;
        handle
    }
}

impl Platform for SimGpio {
    fn read_pin(&self, pin: PinId) -> Level {
        self.levels[pin as usize]
    }

    fn is_valid_pin(&self, pin: PinId) -> bool {
        (pin as usize) < PIN_COUNT
    }

    fn register_edge_handler(&mut self, pin: PinId, handler: EdgeHandler) {
        self.handlers.insert(pin, Some(handler));
    }

    fn set_edge_interrupt(&mut self, pin: PinId, edges: EdgeMask, enabled: bool) {
        let current = self.armed_edges(pin);
        let updated = if enabled {
            current.union(edges)
        } else {
            current.without(edges)
        };
        self.armed.insert(pin, updated);
    }

    fn schedule_repeating(&mut self, period_ms: u32, callback: RepeatingCallback) -> TimerHandle {
        let handle = self.alloc_handle();
        self.timers.insert(
            handle,
            Timer {
                due_ms: self.now_ms + u64::from(period_ms),
                kind: TimerKind::Repeating { period_ms, callback },
            },
        );
        TimerHandle(handle)
    }

    fn schedule_once(&mut self, delay_ms: u32, callback: OneShotCallback) -> TimerHandle {
        let handle = self.alloc_handle();
        self.timers.insert(
            handle,
            Timer {
                due_ms: self.now_ms + u64::from(delay_ms),
                kind: TimerKind::OneShot { callback },
            },
        );
        TimerHandle(handle)
    }

    fn cancel(&mut self, handle: TimerHandle) {
        if self.timers.remove(&handle.0).is_none() {
            // May be the timer whose callback is currently running.
            self.cancelled.insert(handle.0);
        }
    }

    fn now_ms(&self) -> u64 {
        self.now_ms
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn coincident_timers_fire_in_schedule_order() {
        let mut sim = SimGpio::new();
        let order = Rc::new(RefCell::new(Vec::new()));
        let first = order.clone();
        sim.schedule_once(5, Box::new(move |_| first.borrow_mut().push("first")));
        let second = order.clone();
        sim.schedule_once(5, Box::new(move |_| second.borrow_mut().push("second")));

        sim.advance(5);
        assert_eq!(*order.borrow(), vec!["first", "second"]);
    }

    #[test]
    fn earlier_due_time_beats_earlier_handle() {
        let mut sim = SimGpio::new();
        let order = Rc::new(RefCell::new(Vec::new()));
        let late = order.clone();
        sim.schedule_once(8, Box::new(move |_| late.borrow_mut().push("late")));
        let early = order.clone();
        sim.schedule_once(3, Box::new(move |_| early.borrow_mut().push("early")));

        sim.advance(10);
        assert_eq!(*order.borrow(), vec!["early", "late"]);
    }
}
