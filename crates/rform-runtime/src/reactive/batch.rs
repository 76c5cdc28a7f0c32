#![forbid(unsafe_code)]

//! Deferred notification scopes.
//!
//! Inside a [`BatchScope`] every [`Observable`](super::Observable) write is
//! applied immediately but its notification is queued. When the outermost
//! scope drops, queued notifications run in the order they were queued.
//! An observable written several times inside one scope notifies once, with
//! its final value.

use std::cell::RefCell;

struct BatchState {
    depth: usize,
    deferred: Vec<Box<dyn FnOnce()>>,
}

thread_local! {
    static BATCH: RefCell<BatchState> = const {
        RefCell::new(BatchState {
            depth: 0,
            deferred: Vec::new(),
        })
    };
}

pub(crate) fn is_batching() -> bool {
    BATCH.with(|b| b.borrow().depth > 0)
}

pub(crate) fn defer(f: impl FnOnce() + 'static) {
    BATCH.with(|b| b.borrow_mut().deferred.push(Box::new(f)));
}

/// RAII guard deferring notifications until the outermost scope exits.
#[must_use = "the batch ends when the scope is dropped"]
pub struct BatchScope {
    _private: (),
}

impl BatchScope {
    pub fn new() -> Self {
        BATCH.with(|b| b.borrow_mut().depth += 1);
        Self { _private: () }
    }

    /// Current nesting depth (0 outside any scope).
    pub fn depth() -> usize {
        BATCH.with(|b| b.borrow().depth)
    }
}

impl Default for BatchScope {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for BatchScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchScope")
            .field("depth", &Self::depth())
            .finish()
    }
}

impl Drop for BatchScope {
    fn drop(&mut self) {
        let outermost = BATCH.with(|b| {
            let mut state = b.borrow_mut();
            state.depth -= 1;
            state.depth == 0
        });
        if !outermost {
            return;
        }
        // Callbacks may queue more work; drain until quiet.
        loop {
            let queued = BATCH.with(|b| std::mem::take(&mut b.borrow_mut().deferred));
            if queued.is_empty() {
                break;
            }
            for f in queued {
                f();
            }
        }
    }
}
