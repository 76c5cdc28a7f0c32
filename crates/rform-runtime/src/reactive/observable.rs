#![forbid(unsafe_code)]

//! Shared, version-tracked values with change notification.
//!
//! # Invariants
//!
//! 1. The version increments exactly once per write that changes the value.
//! 2. Writing a value equal to the current one is a no-op.
//! 3. Subscribers run in registration order, after the internal borrow is
//!    released, so a callback may read (or write) the observable again.
//! 4. Dropping a [`Subscription`] detaches its callback before the next
//!    notification cycle.
//! 5. Linked triggers fire synchronously inside [`set`](Observable::set),
//!    even while a batch is open; only callbacks are deferred. Readers that
//!    memoize on trigger versions never observe a stale version.

use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use super::batch;

/// RAII guard for a registered callback.
///
/// The source only keeps a `Weak` reference to the callback; the strong
/// reference lives here. Dropping the guard therefore unsubscribes.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    _guard: Box<dyn Any>,
}

impl Subscription {
    pub(crate) fn hold<G: Any>(guard: G) -> Self {
        Self {
            _guard: Box::new(guard),
        }
    }

    /// A subscription that is not attached to anything.
    pub fn detached() -> Self {
        Self::hold(())
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription").finish_non_exhaustive()
    }
}

type Callback<T> = Rc<dyn Fn(&T)>;

struct ObservableInner<T> {
    value: T,
    version: u64,
    subscribers: Vec<Weak<dyn Fn(&T)>>,
    links: Vec<Weak<Trigger>>,
    notify_queued: bool,
}

/// A shared value wrapper. Cloning shares the underlying cell.
pub struct Observable<T> {
    inner: Rc<RefCell<ObservableInner<T>>>,
}

impl<T> Clone for Observable<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Observable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("Observable")
            .field("value", &inner.value)
            .field("version", &inner.version)
            .finish()
    }
}

impl<T: Default + Clone + PartialEq + 'static> Default for Observable<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: Clone + PartialEq + 'static> Observable<T> {
    pub fn new(value: T) -> Self {
        Self {
            inner: Rc::new(RefCell::new(ObservableInner {
                value,
                version: 0,
                subscribers: Vec::new(),
                links: Vec::new(),
                notify_queued: false,
            })),
        }
    }

    /// Clone out the current value.
    #[must_use]
    pub fn get(&self) -> T {
        self.inner.borrow().value.clone()
    }

    /// Borrow the current value without cloning.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.inner.borrow().value)
    }

    /// Number of effective writes so far.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.inner.borrow().version
    }

    /// Replace the value. Returns `true` if the value changed.
    pub fn set(&self, value: T) -> bool {
        {
            let mut inner = self.inner.borrow_mut();
            if inner.value == value {
                return false;
            }
            inner.value = value;
            inner.version += 1;
        }
        self.fire_links();
        self.notify();
        true
    }

    /// Mutate in place. Notifies only if the result differs from before.
    pub fn update(&self, f: impl FnOnce(&mut T)) -> bool {
        let mut next = self.get();
        f(&mut next);
        self.set(next)
    }

    /// Register a callback invoked with the new value after every change.
    pub fn subscribe(&self, callback: impl Fn(&T) + 'static) -> Subscription {
        let callback: Callback<T> = Rc::new(callback);
        self.inner
            .borrow_mut()
            .subscribers
            .push(Rc::downgrade(&callback));
        Subscription::hold(callback)
    }

    /// Fire `target` synchronously on every change, batch or not.
    ///
    /// Unlike [`subscribe`](Self::subscribe), the link bypasses batch
    /// deferral, so `target.version()` moves before `set` returns.
    pub fn link(&self, target: &Trigger) -> Subscription {
        let target = Rc::new(target.clone());
        self.inner.borrow_mut().links.push(Rc::downgrade(&target));
        Subscription::hold(target)
    }

    /// Live subscriber count (dead entries are not counted).
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.inner
            .borrow()
            .subscribers
            .iter()
            .filter(|w| w.strong_count() > 0)
            .count()
    }

    fn fire_links(&self) {
        let links: Vec<Rc<Trigger>> = {
            let mut inner = self.inner.borrow_mut();
            if inner.links.is_empty() {
                return;
            }
            inner.links.retain(|w| w.strong_count() > 0);
            inner.links.iter().filter_map(Weak::upgrade).collect()
        };
        for link in links {
            link.fire();
        }
    }

    fn notify(&self) {
        if batch::is_batching() {
            {
                let mut inner = self.inner.borrow_mut();
                if inner.notify_queued {
                    return;
                }
                inner.notify_queued = true;
            }
            let this = self.clone();
            batch::defer(move || this.notify_now());
            return;
        }
        self.notify_now();
    }

    fn notify_now(&self) {
        let (value, callbacks) = {
            let mut inner = self.inner.borrow_mut();
            inner.notify_queued = false;
            inner.subscribers.retain(|w| w.strong_count() > 0);
            let callbacks: Vec<Callback<T>> =
                inner.subscribers.iter().filter_map(Weak::upgrade).collect();
            (inner.value.clone(), callbacks)
        };
        for callback in callbacks {
            callback(&value);
        }
    }
}

// ---------------------------------------------------------------------------
// Trigger – a value-less change counter
// ---------------------------------------------------------------------------

/// A revision counter that notifies on every [`fire`](Trigger::fire).
///
/// Form units use one of these as their change signal: every mutation in a
/// unit's subtree fires the unit's trigger, and derived values memoize on
/// [`version`](Trigger::version). Forwarding between triggers is
/// synchronous; subscriber callbacks follow the batch rules.
#[derive(Clone, Default)]
pub struct Trigger {
    revision: Observable<u64>,
}

impl fmt::Debug for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Trigger")
            .field("version", &self.version())
            .finish()
    }
}

impl Trigger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bump the revision and notify subscribers.
    pub fn fire(&self) {
        self.revision.update(|r| *r = r.wrapping_add(1));
    }

    #[must_use]
    pub fn version(&self) -> u64 {
        self.revision.version()
    }

    pub fn subscribe(&self, callback: impl Fn() + 'static) -> Subscription {
        self.revision.subscribe(move |_| callback())
    }

    /// Forward this trigger into `target`: every fire here fires `target`
    /// before `fire` returns.
    pub fn forward_to(&self, target: &Trigger) -> Subscription {
        self.revision.link(target)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
