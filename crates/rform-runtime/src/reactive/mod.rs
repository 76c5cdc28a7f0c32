#![forbid(unsafe_code)]

//! Reactive primitives the form tree is built on.
//!
//! - [`Observable`]: shared, version-tracked value with change callbacks.
//! - [`Trigger`]: value-less revision counter used as a unit's change signal.
//! - [`Subscription`]: RAII guard; dropping it unsubscribes.
//! - [`Computed`]: memoized derivation keyed on a dependency version function.
//! - [`BatchScope`]: defers callbacks until the outermost scope exits.
//!   Trigger links and forwarding stay synchronous.
//! - [`SubscriptionScope`]: trigger callbacks owned by one holder.
//! - [`Emitter`]: stateless fire-and-forget event channel.
//!
//! # Architecture
//!
//! Everything here is single-threaded (`Rc<RefCell<..>>`). Sources keep only
//! `Weak` references to callbacks, so ownership always flows from the
//! subscriber to the source and never back; dead entries are swept lazily
//! during notification.

pub mod batch;
pub mod computed;
pub mod emitter;
pub mod observable;
pub mod scope;

pub use batch::BatchScope;
pub use computed::Computed;
pub use emitter::Emitter;
pub use observable::{Observable, Subscription, Trigger};
pub use scope::SubscriptionScope;
