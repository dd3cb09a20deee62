/*++

Licensed under the Apache-2.0 license.

File Name:

    clock.rs

Abstract:

    File contains Clock and Timer types, used by peripherals to defer work
    by a number of clock ticks.

--*/
use std::{
    cell::{Cell, RefCell},
    collections::BTreeSet,
    rc::Rc,
};

use crate::Bus;

/// Peripherals that model latency keep a clone of `Timer` and ask for a
/// future [`Bus::poll`] call.
///
/// # Example
///
/// ```
/// use crypto_seq_emu_bus::{ActionHandle, Bus, BusError, Clock, Timer};
/// use crypto_seq_emu_types::{AhbAddr, AhbData, AhbSize};
///
/// struct SlowDevice {
///     timer: Timer,
///     op: Option<ActionHandle>,
///     done: bool,
/// }
/// impl Bus for SlowDevice {
///     fn read(&mut self, _size: AhbSize, _addr: AhbAddr) -> Result<AhbData, BusError> {
///         Ok(self.done as u32)
///     }
///     fn write(&mut self, _size: AhbSize, _addr: AhbAddr, _val: AhbData) -> Result<(), BusError> {
///         self.op = Some(self.timer.schedule_poll_in(10));
///         Ok(())
///     }
///     fn poll(&mut self) {
///         if self.timer.fired(&mut self.op) {
///             self.done = true;
///         }
///     }
/// }
///
/// let clock = Clock::new();
/// let mut dev = SlowDevice { timer: clock.timer(), op: None, done: false };
/// dev.write(AhbSize::Word, 0, 1).unwrap();
/// clock.increment_and_poll(9, &mut dev);
/// assert!(!dev.done);
/// clock.increment_and_poll(1, &mut dev);
/// assert!(dev.done);
/// ```
#[derive(Clone)]
pub struct Timer {
    clock: Rc<ClockImpl>,
}

impl Timer {
    /// Constructs a new timer bound to `clock`.
    pub fn new(clock: &Clock) -> Self {
        Self {
            clock: Rc::clone(&clock.clock),
        }
    }

    /// Ticks elapsed since the clock was created.
    #[inline]
    pub fn now(&self) -> u64 {
        self.clock.now.get()
    }

    /// Returns true, and clears `action`, once the action's due time has
    /// passed. Returns false for `None`.
    pub fn fired(&self, action: &mut Option<ActionHandle>) -> bool {
        let has_fired = match action {
            Some(handle) => {
                debug_assert_eq!(
                    handle.owner,
                    Rc::as_ptr(&self.clock),
                    "Supplied action was not created by this timer."
                );
                handle.due <= self.now()
            }
            None => false,
        };
        if has_fired {
            *action = None;
        }
        has_fired
    }

    /// Schedules a call to [`Bus::poll()`] `ticks` from now.
    pub fn schedule_poll_in(&self, ticks: u64) -> ActionHandle {
        self.clock.schedule(self.now().saturating_add(ticks))
    }

    /// Cancels a previously scheduled poll.
    ///
    /// # Panics
    ///
    /// Panics if `handle` was not created by this timer.
    pub fn cancel(&self, handle: ActionHandle) {
        assert_eq!(
            handle.owner,
            Rc::as_ptr(&self.clock),
            "Supplied action was not created by this timer."
        );
        self.clock.pending.borrow_mut().remove(&(handle.due, handle.id));
    }
}

pub struct Clock {
    clock: Rc<ClockImpl>,
}

impl Default for Clock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock {
    /// Constructs a new Clock with the tick counter set to 0.
    pub fn new() -> Clock {
        Self {
            clock: Rc::new(ClockImpl {
                now: Cell::new(0),
                next_id: Cell::new(0),
                pending: RefCell::new(BTreeSet::new()),
            }),
        }
    }

    /// Constructs a `Timer` associated with this clock.
    pub fn timer(&self) -> Timer {
        Timer::new(self)
    }

    #[inline]
    pub fn now(&self) -> u64 {
        self.clock.now.get()
    }

    /// Advances the clock by `delta` ticks and returns how many scheduled
    /// actions came due.
    pub fn increment(&self, delta: u64) -> usize {
        let now = self.now().saturating_add(delta);
        self.clock.now.set(now);
        let mut pending = self.clock.pending.borrow_mut();
        let still_pending = pending.split_off(&(now.saturating_add(1), 0));
        let due = pending.len();
        *pending = still_pending;
        due
    }

    /// Advances the clock by `delta` ticks and polls `bus` once if any
    /// scheduled action came due.
    pub fn increment_and_poll(&self, delta: u64, bus: &mut impl Bus) -> bool {
        let fired = self.increment(delta) > 0;
        if fired {
            bus.poll();
        }
        fired
    }

    /// Number of actions waiting to fire.
    pub fn pending_actions(&self) -> usize {
        self.clock.pending.borrow().len()
    }
}

/// A poll scheduled with a `Timer`. Passed back to [`Timer::fired`] or
/// [`Timer::cancel`].
pub struct ActionHandle {
    due: u64,
    id: u64,
    /// Identifies the clock that issued the handle.
    owner: *const ClockImpl,
}

struct ClockImpl {
    now: Cell<u64>,
    next_id: Cell<u64>,
    /// (due time, id) of every outstanding action.
    pending: RefCell<BTreeSet<(u64, u64)>>,
}

impl ClockImpl {
    fn schedule(self: &Rc<Self>, due: u64) -> ActionHandle {
        let id = self.next_id.get();
        self.next_id.set(id.wrapping_add(1));
        self.pending.borrow_mut().insert((due, id));
        ActionHandle {
            due,
            id,
            owner: Rc::as_ptr(self),
        }
    }
}
