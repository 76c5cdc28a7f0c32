#![forbid(unsafe_code)]

//! rform runtime
//!
//! The primitives the form tree is assembled from: a small single-threaded
//! reactive layer and a cooperative timer queue.
//!
//! # Key Components
//!
//! - [`Observable`] / [`Trigger`] / [`Computed`] - change-tracked state and
//!   memoized derivations
//! - [`Scheduler`] - virtual-clock timer queue driven by the host event loop
//! - [`DebouncedState`] - live/settled value pair with grace-then-window
//!   debounce
//!
//! # Concurrency
//!
//! Nothing here is `Send`. A form tree and its scheduler belong to one
//! logical execution context; hosts with a concurrent runtime must funnel
//! every read and write of a tree onto that context.

pub mod debounce;
pub mod reactive;
pub mod scheduler;

pub use debounce::{
    DEFAULT_WINDOW, DebounceConfig, DebouncePhase, DebounceStep, DebouncedState, Debouncer,
};
pub use reactive::{
    BatchScope, Computed, Emitter, Observable, Subscription, SubscriptionScope, Trigger,
};
pub use scheduler::{Scheduler, TimerHandle};

/// Re-exported so callers can name durations and instants without a direct
/// dependency.
pub use web_time::{Duration, Instant};
