#![forbid(unsafe_code)]

//! Fire-and-forget event channels.
//!
//! Unlike [`Observable`](super::Observable), an [`Emitter`] holds no state:
//! every `emit` reaches every live listener, equal events included. There is
//! no acknowledgement and no replay for late subscribers.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use super::observable::Subscription;

pub struct Emitter<E> {
    listeners: Rc<RefCell<Vec<Weak<dyn Fn(&E)>>>>,
}

impl<E> Clone for Emitter<E> {
    fn clone(&self) -> Self {
        Self {
            listeners: Rc::clone(&self.listeners),
        }
    }
}

impl<E> Default for Emitter<E> {
    fn default() -> Self {
        Self {
            listeners: Rc::new(RefCell::new(Vec::new())),
        }
    }
}

impl<E> std::fmt::Debug for Emitter<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Emitter")
            .field("listeners", &self.listeners.borrow().len())
            .finish()
    }
}

impl<E: 'static> Emitter<E> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, listener: impl Fn(&E) + 'static) -> Subscription {
        let listener: Rc<dyn Fn(&E)> = Rc::new(listener);
        self.listeners.borrow_mut().push(Rc::downgrade(&listener));
        Subscription::hold(listener)
    }

    /// Deliver `event` to every live listener. Returns how many received it.
    pub fn emit(&self, event: &E) -> usize {
        let live: Vec<Rc<dyn Fn(&E)>> = {
            let mut listeners = self.listeners.borrow_mut();
            listeners.retain(|w| w.strong_count() > 0);
            listeners.iter().filter_map(Weak::upgrade).collect()
        };
        for listener in &live {
            listener(event);
        }
        live.len()
    }

    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.listeners
            .borrow()
            .iter()
            .filter(|w| w.strong_count() > 0)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_events_all_delivered() {
        let emitter = Emitter::new();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let s = Rc::clone(&seen);
        let _sub = emitter.subscribe(move |e: &u8| s.borrow_mut().push(*e));
        emitter.emit(&1);
        emitter.emit(&1);
        assert_eq!(*seen.borrow(), vec![1, 1]);
    }

    #[test]
    fn emit_without_listeners_is_noop() {
        let emitter: Emitter<&'static str> = Emitter::new();
        assert_eq!(emitter.emit(&"focus"), 0);
        let sub = emitter.subscribe(|_| {});
        assert_eq!(emitter.listener_count(), 1);
        drop(sub);
        assert_eq!(emitter.emit(&"focus"), 0);
    }
}
