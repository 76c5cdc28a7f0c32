#![forbid(unsafe_code)]

//! The capability surface shared by every form unit.
//!
//! Nodes, layers, lists and roots all answer the same questions (what is
//! the value, is it valid, has it changed) and accept the same imperative
//! commands. Containers dispatch to children through [`FormUnit`] so the
//! aggregation logic never needs to know which concrete kind it holds.
//!
//! # Invariants
//!
//! 1. `value()` never reports an absent value for a non-nullable unit; the
//!    configured default stands in.
//! 2. `is_valid()` is exactly `errors().is_empty()`.
//! 3. `version()` moves whenever anything observable about the unit may
//!    have changed, so derived caches keyed on it are never stale.

use std::rc::Weak;

use rform_core::{UnitId, Value};
use rform_runtime::{Computed, Subscription, Trigger};

use crate::error::{FormError, FormResult, ValidationEntry};

/// Behavior shared by every unit of a form tree.
pub trait FormUnit {
    /// Stable identity for diagnostics.
    fn id(&self) -> UnitId;

    fn nullable(&self) -> bool;

    /// The unit's own disabled flag.
    fn is_disabled(&self) -> bool;

    fn set_disabled(&self, disabled: bool);

    fn disable(&self) {
        self.set_disabled(true);
    }

    fn enable(&self) {
        self.set_disabled(false);
    }

    /// Committed value, with defaults substituted where not nullable.
    fn value(&self) -> Value;

    /// Committed value without default substitution.
    fn raw_value(&self) -> Value;

    /// Value after debounce settles. Containers aggregate committed child
    /// values, so this equals `value()`.
    fn debounced_value(&self) -> Value {
        self.value()
    }

    /// The fallback reported while the unit is disabled.
    fn disabled_value(&self) -> Value;

    fn changed(&self) -> bool;

    fn touched(&self) -> bool;

    fn errors(&self) -> Vec<ValidationEntry>;

    fn warnings(&self) -> Vec<ValidationEntry>;

    fn is_valid(&self) -> bool {
        self.errors().is_empty()
    }

    /// The value, but only when valid.
    fn get_valid_value(&self) -> FormResult<Value> {
        let errors = self.errors();
        if errors.is_empty() {
            Ok(self.value())
        } else {
            tracing::debug!(unit = %self.id(), errors = errors.len(), "valid value requested from invalid unit");
            Err(FormError::Invalid { errors })
        }
    }

    fn get_valid_value_or(&self, fallback: Value) -> Value {
        self.get_valid_value().unwrap_or(fallback)
    }

    fn set_value(&self, value: Value);

    fn patch_value(&self, value: Value) {
        self.set_value(value);
    }

    /// Re-baseline to `value`, or to the unit's own initial state.
    fn reset(&self, value: Option<Value>);

    fn clear(&self);

    fn rollback(&self);

    /// Monotone change counter.
    fn version(&self) -> u64;

    /// Call `callback` whenever `version()` moves.
    fn watch(&self, callback: Box<dyn Fn()>) -> Subscription;
}

// ---------------------------------------------------------------------------
// Per-unit derived caches
// ---------------------------------------------------------------------------

/// Memoized derivations of one unit, invalidated by its trigger.
pub(crate) struct UnitMemo {
    pub value: Computed<Value>,
    pub raw: Computed<Value>,
    pub errors: Computed<Vec<ValidationEntry>>,
    pub warnings: Computed<Vec<ValidationEntry>>,
}

/// Compute functions for a unit's inner state.
pub(crate) struct MemoFns<U> {
    pub value: fn(&U) -> Value,
    pub raw: fn(&U) -> Value,
    pub errors: fn(&U) -> Vec<ValidationEntry>,
    pub warnings: fn(&U) -> Vec<ValidationEntry>,
}

impl UnitMemo {
    /// Build the caches over a unit still under construction.
    pub fn new<U: 'static>(weak: &Weak<U>, trigger: &Trigger, fns: MemoFns<U>) -> Self {
        Self {
            value: derive(weak, trigger, fns.value),
            raw: derive(weak, trigger, fns.raw),
            errors: derive(weak, trigger, fns.errors),
            warnings: derive(weak, trigger, fns.warnings),
        }
    }
}

fn derive<U: 'static, T: Clone + Default + 'static>(
    weak: &Weak<U>,
    trigger: &Trigger,
    f: fn(&U) -> T,
) -> Computed<T> {
    let changes = trigger.clone();
    let weak = weak.clone();
    Computed::new(
        move || changes.version(),
        move || weak.upgrade().map(|unit| f(&unit)).unwrap_or_default(),
    )
}
