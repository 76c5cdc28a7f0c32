#![forbid(unsafe_code)]

//! Trailing-edge debounce with a leading grace tick.
//!
//! A write updates the *live* view synchronously and the *settled* view on
//! a delay:
//!
//! ```text
//!            write              grace tick           window end
//!   Idle ──────────▶ Grace ─────────────▶ Window ───────────────▶ Idle
//!                    (latest wins)        commit,     (no pending)
//!                                         open window
//!                                            │  ▲
//!                                            └──┘ pending at window end:
//!                                                 commit, reopen window
//! ```
//!
//! 1. From `Idle`, a write queues a zero-delay grace tick. Further writes in
//!    the same tick overwrite the pending value, so a burst of synchronous
//!    writes commits once, with the last value.
//! 2. The grace tick commits the pending value and opens a window
//!    (200ms by default).
//! 3. Writes during the window are coalesced. When the window ends, a
//!    pending value is committed and a fresh window opens; otherwise the
//!    machine returns to `Idle`.
//! 4. [`DebouncedState::set_now`] bypasses the machine: both views update
//!    synchronously and any grace/window in flight is cancelled.
//!
//! [`Debouncer`] is the pure state machine; [`DebouncedState`] binds it to
//! a pair of [`Observable`]s and a [`Scheduler`]. The pending timer belongs
//! to the `DebouncedState`, so dropping it cancels the timer.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use web_time::Duration;

use crate::reactive::{Observable, Subscription, Trigger};
use crate::scheduler::{Scheduler, TimerHandle};

/// Default debounce window.
pub const DEFAULT_WINDOW: Duration = Duration::from_millis(200);

/// Debounce tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DebounceConfig {
    /// Coalescing window opened after each commit. Zero commits on the
    /// grace tick and never opens a window.
    pub window: Duration,
}

impl Default for DebounceConfig {
    fn default() -> Self {
        Self {
            window: DEFAULT_WINDOW,
        }
    }
}

impl DebounceConfig {
    #[must_use]
    pub fn with_window(mut self, window: Duration) -> Self {
        self.window = window;
        self
    }

    /// Convenience for millisecond windows.
    #[must_use]
    pub fn with_window_ms(self, ms: u64) -> Self {
        self.with_window(Duration::from_millis(ms))
    }
}

/// Phase of the debounce machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebouncePhase {
    Idle,
    Grace,
    Window,
}

/// What the caller must do after feeding the machine.
#[derive(Debug, Clone, PartialEq)]
pub struct DebounceStep<T> {
    /// Value to publish to the settled view.
    pub commit: Option<T>,
    /// Timer to arm, relative to now.
    pub schedule: Option<Duration>,
}

impl<T> DebounceStep<T> {
    fn nothing() -> Self {
        Self {
            commit: None,
            schedule: None,
        }
    }
}

/// Pure debounce state machine; knows nothing about clocks.
#[derive(Debug, Clone)]
pub struct Debouncer<T> {
    config: DebounceConfig,
    phase: DebouncePhase,
    pending: Option<T>,
}

impl<T> Debouncer<T> {
    pub fn new(config: DebounceConfig) -> Self {
        Self {
            config,
            phase: DebouncePhase::Idle,
            pending: None,
        }
    }

    pub fn phase(&self) -> DebouncePhase {
        self.phase
    }

    pub fn config(&self) -> DebounceConfig {
        self.config
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Feed a write.
    pub fn push(&mut self, value: T) -> DebounceStep<T> {
        self.pending = Some(value);
        match self.phase {
            DebouncePhase::Idle => {
                self.phase = DebouncePhase::Grace;
                DebounceStep {
                    commit: None,
                    schedule: Some(Duration::ZERO),
                }
            }
            DebouncePhase::Grace | DebouncePhase::Window => DebounceStep::nothing(),
        }
    }

    /// The armed timer fired.
    pub fn fire(&mut self) -> DebounceStep<T> {
        match self.phase {
            DebouncePhase::Idle => DebounceStep::nothing(),
            DebouncePhase::Grace => {
                let commit = self.pending.take();
                self.open_window(commit)
            }
            DebouncePhase::Window => match self.pending.take() {
                Some(value) => self.open_window(Some(value)),
                None => {
                    self.phase = DebouncePhase::Idle;
                    DebounceStep::nothing()
                }
            },
        }
    }

    /// Drop any pending value and return to `Idle`.
    pub fn cancel(&mut self) {
        self.phase = DebouncePhase::Idle;
        self.pending = None;
    }

    fn open_window(&mut self, commit: Option<T>) -> DebounceStep<T> {
        if self.config.window.is_zero() {
            self.phase = DebouncePhase::Idle;
            DebounceStep {
                commit,
                schedule: None,
            }
        } else {
            self.phase = DebouncePhase::Window;
            DebounceStep {
                commit,
                schedule: Some(self.config.window),
            }
        }
    }
}

// ---------------------------------------------------------------------------
// DebouncedState – machine + observables + timer
// ---------------------------------------------------------------------------

struct DebouncedInner<T> {
    live: Observable<T>,
    settled: Observable<T>,
    machine: RefCell<Debouncer<T>>,
    timer: RefCell<Option<TimerHandle>>,
    scheduler: Scheduler,
}

/// A value with a live view and a debounced (settled) view.
pub struct DebouncedState<T> {
    inner: Rc<DebouncedInner<T>>,
}

impl<T: fmt::Debug + Clone + PartialEq + 'static> fmt::Debug for DebouncedState<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DebouncedState")
            .field("live", &self.live())
            .field("settled", &self.settled())
            .field("phase", &self.phase())
            .finish()
    }
}

impl<T: Clone + PartialEq + 'static> DebouncedState<T> {
    pub fn new(initial: T, config: DebounceConfig, scheduler: Scheduler) -> Self {
        Self {
            inner: Rc::new(DebouncedInner {
                live: Observable::new(initial.clone()),
                settled: Observable::new(initial),
                machine: RefCell::new(Debouncer::new(config)),
                timer: RefCell::new(None),
                scheduler,
            }),
        }
    }

    /// Immediate value.
    pub fn live(&self) -> T {
        self.inner.live.get()
    }

    /// Debounced value.
    pub fn settled(&self) -> T {
        self.inner.settled.get()
    }

    pub fn live_observable(&self) -> &Observable<T> {
        &self.inner.live
    }

    pub fn settled_observable(&self) -> &Observable<T> {
        &self.inner.settled
    }

    pub fn phase(&self) -> DebouncePhase {
        self.inner.machine.borrow().phase()
    }

    pub fn config(&self) -> DebounceConfig {
        self.inner.machine.borrow().config()
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.inner.scheduler
    }

    /// Whether a grace tick or window is in flight.
    pub fn is_settling(&self) -> bool {
        self.phase() != DebouncePhase::Idle
    }

    /// Debounced write: live now, settled later.
    pub fn set(&self, value: T) {
        self.inner.live.set(value.clone());
        let step = self.inner.machine.borrow_mut().push(value);
        DebouncedInner::apply(&self.inner, step);
    }

    /// Synchronous write to both views, cancelling anything in flight.
    pub fn set_now(&self, value: T) {
        self.inner.machine.borrow_mut().cancel();
        self.inner.timer.borrow_mut().take();
        self.inner.live.set(value.clone());
        self.inner.settled.set(value);
    }

    /// Subscribe to either view changing.
    pub fn subscribe(&self, callback: impl Fn() + 'static) -> (Subscription, Subscription) {
        let callback: Rc<dyn Fn()> = Rc::new(callback);
        let on_live = Rc::clone(&callback);
        (
            self.inner.live.subscribe(move |_| on_live()),
            self.inner.settled.subscribe(move |_| callback()),
        )
    }

    /// Fire `target` synchronously whenever either view changes.
    pub fn link(&self, target: &Trigger) -> (Subscription, Subscription) {
        (
            self.inner.live.link(target),
            self.inner.settled.link(target),
        )
    }
}

impl<T: Clone + PartialEq + 'static> DebouncedInner<T> {
    fn apply(this: &Rc<Self>, step: DebounceStep<T>) {
        if let Some(value) = step.commit {
            tracing::trace!("debounce commit");
            this.settled.set(value);
        }
        if let Some(delay) = step.schedule {
            let weak: Weak<Self> = Rc::downgrade(this);
            let handle = this.scheduler.schedule(delay, move || {
                if let Some(inner) = weak.upgrade() {
                    let step = inner.machine.borrow_mut().fire();
                    Self::apply(&inner, step);
                }
            });
            *this.timer.borrow_mut() = Some(handle);
        }
    }
}
