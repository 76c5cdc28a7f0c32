#![forbid(unsafe_code)]

//! Subscription bags tied to an owner's lifetime.

use super::observable::{Subscription, Trigger};

/// Owns trigger callbacks and detaches them all when dropped.
#[derive(Default)]
pub struct SubscriptionScope {
    subscriptions: Vec<Subscription>,
}

impl SubscriptionScope {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `callback` whenever `trigger` fires, for the scope's lifetime.
    pub fn on_fire(&mut self, trigger: &Trigger, callback: impl Fn() + 'static) -> &mut Self {
        self.subscriptions.push(trigger.subscribe(callback));
        self
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.subscriptions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.subscriptions.is_empty()
    }
}

impl std::fmt::Debug for SubscriptionScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriptionScope")
            .field("len", &self.subscriptions.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    #[test]
    fn callbacks_run_while_scope_lives() {
        let trigger = Trigger::new();
        let hits = Rc::new(Cell::new(0));
        {
            let mut scope = SubscriptionScope::new();
            let h = Rc::clone(&hits);
            scope.on_fire(&trigger, move || h.set(h.get() + 1));
            assert_eq!(scope.len(), 1);
            trigger.fire();
            trigger.fire();
        }
        trigger.fire();
        assert_eq!(hits.get(), 2);
    }

    #[test]
    fn empty_scope_holds_nothing() {
        let scope = SubscriptionScope::new();
        assert!(scope.is_empty());
        assert_eq!(scope.len(), 0);
    }
}
