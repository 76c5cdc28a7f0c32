#![forbid(unsafe_code)]

//! The top of a form tree.
//!
//! A [`FormRoot`] wraps a layer and adds a committed baseline:
//!
//! - `reset(value)` resets the layer, then captures the resulting raw value
//!   as the baseline. An explicit `value` is remembered for `rollback`; a
//!   bare reset forgets it.
//! - `changed()` compares the current raw value against the baseline.
//! - `can_create()` is validity; `can_submit()` is validity and a change.
//!
//! Root-level generators see the aggregated (debounced) value. Their
//! messages join the structural errors, so a root-level error blocks
//! submission even when every field is valid.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use rform_core::{UnitId, Value};
use rform_runtime::{Computed, Observable, Subscription, Trigger};

use crate::control::Control;
use crate::error::ValidationEntry;
use crate::layer::FormLayer;
use crate::list::FormList;
use crate::node::FormNode;
use crate::unit::FormUnit;
use crate::validation::{Validator, process};

/// Root-level validation hooks.
#[derive(Debug, Clone, Default)]
pub struct RootConfig {
    pub generate_error: Option<Validator>,
    pub generate_warning: Option<Validator>,
}

struct RootInner {
    layer: FormLayer,
    old_value: Observable<Value>,
    reset_value: RefCell<Option<Value>>,
    config: RootConfig,
    trigger: Trigger,
    errors: Computed<Vec<ValidationEntry>>,
    warnings: Computed<Vec<ValidationEntry>>,
    _links: [Subscription; 2],
}

/// The top of a form tree. Cloning shares the root.
#[derive(Clone)]
pub struct FormRoot {
    inner: Rc<RootInner>,
}

impl fmt::Debug for FormRoot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FormRoot")
            .field("layer", &self.inner.layer)
            .field("has_reset_value", &self.inner.reset_value.borrow().is_some())
            .finish()
    }
}

fn generated(
    layer: &FormLayer,
    hook: Option<&Validator>,
    structural: Vec<ValidationEntry>,
) -> Vec<ValidationEntry> {
    let mut out = structural;
    if let Some(hook) = hook {
        let value = layer.value();
        out.extend(
            process(std::slice::from_ref(hook), &value)
                .map(|m| ValidationEntry::new(m, layer.id())),
        );
    }
    out
}

impl FormRoot {
    pub fn new(layer: FormLayer, config: RootConfig) -> Self {
        let trigger = Trigger::new();
        let old_value = Observable::new(layer.raw_value());
        let links = [
            layer.trigger().forward_to(&trigger),
            old_value.link(&trigger),
        ];
        let hooked = |hook: Option<Validator>, structural: fn(&FormLayer) -> Vec<ValidationEntry>| {
            let changes = trigger.clone();
            let layer = layer.clone();
            Computed::new(
                move || changes.version(),
                move || generated(&layer, hook.as_ref(), structural(&layer)),
            )
        };
        let errors = hooked(config.generate_error.clone(), <FormLayer as FormUnit>::errors);
        let warnings = hooked(config.generate_warning.clone(), <FormLayer as FormUnit>::warnings);
        Self {
            inner: Rc::new(RootInner {
                layer,
                old_value,
                reset_value: RefCell::new(None),
                config,
                trigger,
                errors,
                warnings,
                _links: links,
            }),
        }
    }

    pub fn layer(&self) -> &FormLayer {
        &self.inner.layer
    }

    pub fn config(&self) -> &RootConfig {
        &self.inner.config
    }

    pub fn control(&self, key: &str) -> Option<Control> {
        self.inner.layer.control(key)
    }

    pub fn node(&self, key: &str) -> Option<FormNode> {
        self.inner.layer.node(key)
    }

    pub fn sub_layer(&self, key: &str) -> Option<FormLayer> {
        self.inner.layer.layer(key)
    }

    pub fn list(&self, key: &str) -> Option<FormList> {
        self.inner.layer.list(key)
    }

    pub fn set_control(&self, key: impl Into<String>, control: impl Into<Control>) -> Option<Control> {
        self.inner.layer.set_control(key, control)
    }

    /// Raw value captured by the last reset (or construction).
    pub fn old_value(&self) -> Value {
        self.inner.old_value.get()
    }

    /// The last explicitly supplied reset payload.
    pub fn reset_value(&self) -> Option<Value> {
        self.inner.reset_value.borrow().clone()
    }

    pub fn can_create(&self) -> bool {
        self.is_valid()
    }

    pub fn can_submit(&self) -> bool {
        self.is_valid() && self.changed()
    }

    pub fn trigger(&self) -> &Trigger {
        &self.inner.trigger
    }

    pub fn changed_signal(&self) -> Computed<bool> {
        self.signal(|root| root.changed())
    }

    pub fn can_create_signal(&self) -> Computed<bool> {
        self.signal(|root| root.can_create())
    }

    pub fn can_submit_signal(&self) -> Computed<bool> {
        self.signal(|root| root.can_submit())
    }

    fn signal<T: Clone + 'static>(&self, f: fn(&FormRoot) -> T) -> Computed<T> {
        let changes = self.inner.trigger.clone();
        let root = self.clone();
        Computed::new(move || changes.version(), move || f(&root))
    }
}

impl FormUnit for FormRoot {
    fn id(&self) -> UnitId {
        self.inner.layer.id()
    }

    fn nullable(&self) -> bool {
        false
    }

    fn is_disabled(&self) -> bool {
        self.inner.layer.is_disabled()
    }

    fn set_disabled(&self, disabled: bool) {
        self.inner.layer.set_disabled(disabled);
    }

    fn value(&self) -> Value {
        self.inner.layer.value()
    }

    fn raw_value(&self) -> Value {
        self.inner.layer.raw_value()
    }

    fn disabled_value(&self) -> Value {
        self.inner.layer.disabled_value()
    }

    /// Raw value differs from the baseline captured at the last reset.
    fn changed(&self) -> bool {
        let current = self.inner.layer.raw_value();
        self.inner.old_value.with(|old| *old != current)
    }

    fn touched(&self) -> bool {
        self.inner.layer.touched()
    }

    fn errors(&self) -> Vec<ValidationEntry> {
        self.inner.errors.get()
    }

    fn warnings(&self) -> Vec<ValidationEntry> {
        self.inner.warnings.get()
    }

    fn set_value(&self, value: Value) {
        self.inner.layer.set_value(value);
    }

    fn patch_value(&self, value: Value) {
        self.inner.layer.patch_value(value);
    }

    fn reset(&self, value: Option<Value>) {
        let inner = &self.inner;
        inner.layer.reset(value.clone());
        inner.old_value.set(inner.layer.raw_value());
        *inner.reset_value.borrow_mut() = value;
        tracing::debug!(unit = %inner.layer.id(), "root baseline captured");
    }

    fn clear(&self) {
        self.inner.layer.clear();
    }

    /// Replay the last explicit reset payload, or the initial values.
    fn rollback(&self) {
        let payload = self.inner.reset_value.borrow().clone();
        self.reset(payload);
    }

    fn version(&self) -> u64 {
        self.inner.trigger.version()
    }

    fn watch(&self, callback: Box<dyn Fn()>) -> Subscription {
        self.inner.trigger.subscribe(callback)
    }
}
