#![forbid(unsafe_code)]

//! Cooperative single-threaded timer queue with a virtual clock.
//!
//! The form tree never spawns threads or sleeps. Anything time-based (the
//! debounce grace tick and window) is queued here and runs when the host
//! drives the clock forward, typically once per event-loop iteration:
//!
//! ```ignore
//! use rform_runtime::scheduler::Scheduler;
//!
//! let scheduler = Scheduler::current();
//! // ... user input calls node.set_value(..) ...
//! scheduler.advance_to(web_time::Instant::now());
//! if let Some(wait) = scheduler.time_until_next() {
//!     // sleep at most `wait` before driving again
//! }
//! ```
//!
//! Tests drive the same clock deterministically with [`Scheduler::advance`].
//!
//! # Invariants
//!
//! 1. Entries fire in `(due, seq)` order; equal due times fire FIFO.
//! 2. The clock never moves backwards. A callback observes `now()` equal to
//!    its own due time, so timers it schedules are relative to that instant.
//! 3. A [`TimerHandle`] owns its callback; the queue holds only a `Weak`
//!    reference. Dropping the handle cancels the entry.
//! 4. Zero-delay entries scheduled while the clock is being driven run in
//!    the same drive call.
//!
//! # Failure Modes
//!
//! | Condition | Behavior |
//! |-----------|----------|
//! | Handle dropped before due | Entry skipped, never runs |
//! | Scheduler dropped first | Handles become inert |
//! | `advance_to` a past instant | Fires whatever is due, clock unchanged |

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::{Rc, Weak};

use web_time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct TimerKey {
    due: Instant,
    seq: u64,
}

struct SchedulerInner {
    now: Instant,
    next_seq: u64,
    queue: BTreeMap<TimerKey, Weak<dyn Fn()>>,
    fired: u64,
}

/// Shared handle to a timer queue. Cloning shares the queue and clock.
#[derive(Clone)]
pub struct Scheduler {
    inner: Rc<RefCell<SchedulerInner>>,
}

thread_local! {
    static CURRENT: Scheduler = Scheduler::new();
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("Scheduler")
            .field("queued", &inner.queue.len())
            .field("fired", &inner.fired)
            .finish()
    }
}

impl Scheduler {
    /// A fresh queue whose clock starts at the real current instant.
    pub fn new() -> Self {
        Self::starting_at(Instant::now())
    }

    /// A fresh queue whose clock starts at `now`.
    pub fn starting_at(now: Instant) -> Self {
        Self {
            inner: Rc::new(RefCell::new(SchedulerInner {
                now,
                next_seq: 0,
                queue: BTreeMap::new(),
                fired: 0,
            })),
        }
    }

    /// The thread's default scheduler. Units capture it at construction
    /// unless given one explicitly.
    pub fn current() -> Self {
        CURRENT.with(Clone::clone)
    }

    /// Whether two handles share one queue.
    pub fn ptr_eq(&self, other: &Scheduler) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// The virtual clock.
    #[must_use]
    pub fn now(&self) -> Instant {
        self.inner.borrow().now
    }

    /// Queue `callback` to run `delay` after the current virtual instant.
    pub fn schedule(&self, delay: Duration, callback: impl Fn() + 'static) -> TimerHandle {
        let callback: Rc<dyn Fn()> = Rc::new(callback);
        let mut inner = self.inner.borrow_mut();
        let key = TimerKey {
            due: inner.now + delay,
            seq: inner.next_seq,
        };
        inner.next_seq += 1;
        inner.queue.insert(key, Rc::downgrade(&callback));
        tracing::trace!(delay_ms = delay.as_millis() as u64, seq = key.seq, "timer scheduled");
        TimerHandle {
            scheduler: Rc::downgrade(&self.inner),
            key,
            _callback: callback,
        }
    }

    /// Run everything due at the current instant (the grace tick).
    pub fn flush(&self) -> usize {
        let now = self.now();
        self.advance_to(now)
    }

    /// Move the clock forward by `delta`, firing due entries in order.
    pub fn advance(&self, delta: Duration) -> usize {
        let target = self.now() + delta;
        self.advance_to(target)
    }

    /// Move the clock to `target`, firing due entries in order.
    /// Returns the number of callbacks run.
    pub fn advance_to(&self, target: Instant) -> usize {
        let mut fired = 0;
        loop {
            let next = {
                let mut inner = self.inner.borrow_mut();
                let Some(key) = inner.queue.keys().next().copied() else {
                    break;
                };
                if key.due > target {
                    break;
                }
                let entry = inner.queue.remove(&key);
                if key.due > inner.now {
                    inner.now = key.due;
                }
                entry.and_then(|w| w.upgrade())
            };
            if let Some(callback) = next {
                callback();
                fired += 1;
            }
        }
        let mut inner = self.inner.borrow_mut();
        if target > inner.now {
            inner.now = target;
        }
        inner.fired += fired as u64;
        fired
    }

    /// Time until the earliest live entry is due, if any.
    #[must_use]
    pub fn time_until_next(&self) -> Option<Duration> {
        let inner = self.inner.borrow();
        inner
            .queue
            .iter()
            .find(|(_, w)| w.strong_count() > 0)
            .map(|(key, _)| key.due.saturating_duration_since(inner.now))
    }

    /// Number of live queued entries.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.inner
            .borrow()
            .queue
            .values()
            .filter(|w| w.strong_count() > 0)
            .count()
    }

    /// Total callbacks run since creation.
    #[must_use]
    pub fn fired(&self) -> u64 {
        self.inner.borrow().fired
    }
}

/// Owner of a queued timer. Dropping it cancels the entry.
#[must_use = "dropping a TimerHandle cancels the timer"]
pub struct TimerHandle {
    scheduler: Weak<RefCell<SchedulerInner>>,
    key: TimerKey,
    _callback: Rc<dyn Fn()>,
}

impl TimerHandle {
    /// Instant at which the timer fires.
    pub fn due(&self) -> Instant {
        self.key.due
    }
}

impl fmt::Debug for TimerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimerHandle")
            .field("seq", &self.key.seq)
            .finish()
    }
}

impl Drop for TimerHandle {
    fn drop(&mut self) {
        // Best effort: if the queue is borrowed the weak entry is skipped
        // when it comes due.
        if let Some(queue) = self.scheduler.upgrade()
            && let Ok(mut inner) = queue.try_borrow_mut()
        {
            inner.queue.remove(&self.key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn fires_in_due_order() {
        let s = Scheduler::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        let (l1, l2, l3) = (Rc::clone(&log), Rc::clone(&log), Rc::clone(&log));
        let _c = s.schedule(ms(30), move || l3.borrow_mut().push(3));
        let _a = s.schedule(ms(10), move || l1.borrow_mut().push(1));
        let _b = s.schedule(ms(10), move || l2.borrow_mut().push(2));
        assert_eq!(s.advance(ms(100)), 3);
        assert_eq!(*log.borrow(), vec![1, 2, 3]);
    }

    #[test]
    fn not_due_yet_stays_queued() {
        let s = Scheduler::new();
        let hit = Rc::new(Cell::new(false));
        let h = Rc::clone(&hit);
        let _t = s.schedule(ms(200), move || h.set(true));
        s.advance(ms(199));
        assert!(!hit.get());
        assert_eq!(s.time_until_next(), Some(ms(1)));
        s.advance(ms(1));
        assert!(hit.get());
        assert_eq!(s.pending(), 0);
    }

    #[test]
    fn dropped_handle_cancels() {
        let s = Scheduler::new();
        let hit = Rc::new(Cell::new(false));
        let h = Rc::clone(&hit);
        let t = s.schedule(Duration::ZERO, move || h.set(true));
        drop(t);
        assert_eq!(s.flush(), 0);
        assert!(!hit.get());
    }

    #[test]
    fn callback_sees_its_due_time_and_can_reschedule() {
        let s = Scheduler::new();
        let start = s.now();
        let slot: Rc<RefCell<Option<TimerHandle>>> = Rc::new(RefCell::new(None));
        let seen = Rc::new(RefCell::new(Vec::new()));

        let (s2, slot2, seen2) = (s.clone(), Rc::clone(&slot), Rc::clone(&seen));
        let first = s.schedule(ms(50), move || {
            seen2.borrow_mut().push(s2.now());
            let seen3 = Rc::clone(&seen2);
            let s3 = s2.clone();
            *slot2.borrow_mut() = Some(s2.schedule(ms(50), move || {
                seen3.borrow_mut().push(s3.now());
            }));
        });
        s.advance(ms(500));
        drop(first);
        assert_eq!(*seen.borrow(), vec![start + ms(50), start + ms(100)]);
        assert_eq!(s.now(), start + ms(500));
    }

    #[test]
    fn zero_delay_scheduled_during_drive_runs_same_call() {
        let s = Scheduler::new();
        let slot: Rc<RefCell<Option<TimerHandle>>> = Rc::new(RefCell::new(None));
        let hit = Rc::new(Cell::new(false));
        let (s2, slot2, h) = (s.clone(), Rc::clone(&slot), Rc::clone(&hit));
        let _t = s.schedule(Duration::ZERO, move || {
            let h2 = Rc::clone(&h);
            *slot2.borrow_mut() = Some(s2.schedule(Duration::ZERO, move || h2.set(true)));
        });
        assert_eq!(s.flush(), 2);
        assert!(hit.get());
    }

    #[test]
    fn current_is_shared_per_thread() {
        assert!(Scheduler::current().ptr_eq(&Scheduler::current()));
        assert!(!Scheduler::new().ptr_eq(&Scheduler::current()));
    }
}
