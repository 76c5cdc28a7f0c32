#![forbid(unsafe_code)]

//! Keyed groups of controls.
//!
//! A [`FormLayer`] aggregates its children into an object value and adds
//! its own validators, which see the aggregated (debounced) value. Child
//! errors surface in the layer's list with the child key prefixed to their
//! path.
//!
//! # Invariants
//!
//! 1. Key order is insertion order and survives `set_control`.
//! 2. While disabled, the layer's value is its disabled fallback: the
//!    disabled default, else null when nullable, else the children's own
//!    disabled fallbacks. Disabled layers report no errors or warnings.
//! 3. Every child's trigger forwards into the layer's trigger, so any
//!    change below bumps the layer's version.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;
use rform_core::{PathSegment, UnitId, Value, ValueMap};
use rform_runtime::{Computed, Observable, Subscription, Trigger};

use crate::control::Control;
use crate::error::ValidationEntry;
use crate::list::FormList;
use crate::node::FormNode;
use crate::unit::{FormUnit, MemoFns, UnitMemo};
use crate::validation::{Validator, process};

/// Own-level configuration of a layer.
#[derive(Debug, Clone, Default)]
pub struct LayerConfig {
    pub nullable: bool,
    /// Disabled at construction.
    pub disabled: bool,
    pub disabled_default: Option<Value>,
    pub validators: Vec<Validator>,
    pub warnings: Vec<Validator>,
}

pub(crate) struct LayerInner {
    id: UnitId,
    config: Rc<LayerConfig>,
    controls: RefCell<IndexMap<String, Control>>,
    links: RefCell<Vec<Subscription>>,
    disabled: Observable<bool>,
    trigger: Trigger,
    memo: UnitMemo,
    _wiring: Subscription,
}

impl LayerInner {
    fn snapshot(&self) -> Vec<(String, Control)> {
        self.controls
            .borrow()
            .iter()
            .map(|(k, c)| (k.clone(), c.clone()))
            .collect()
    }

    fn aggregate(&self, f: impl Fn(&Control) -> Value) -> Value {
        let map: ValueMap = self
            .controls
            .borrow()
            .iter()
            .map(|(k, c)| (k.clone(), f(c)))
            .collect();
        Value::Object(map)
    }

    fn fallback(&self) -> Value {
        match &self.config.disabled_default {
            Some(value) if !value.is_null() => value.clone(),
            _ if self.config.nullable => Value::Null,
            _ => self.aggregate(FormUnit::disabled_value),
        }
    }

    fn compute_value(&self) -> Value {
        if self.disabled.get() {
            self.fallback()
        } else {
            self.aggregate(FormUnit::value)
        }
    }

    fn compute_raw(&self) -> Value {
        if self.disabled.get() {
            self.fallback()
        } else {
            self.aggregate(FormUnit::raw_value)
        }
    }

    fn collect(
        &self,
        own: &[Validator],
        child: impl Fn(&Control) -> Vec<ValidationEntry>,
    ) -> Vec<ValidationEntry> {
        if self.disabled.get() {
            return Vec::new();
        }
        let value = self.memo.value.get();
        let mut out: Vec<ValidationEntry> = process(own, &value)
            .map(|m| ValidationEntry::new(m, self.id))
            .collect();
        for (key, control) in self.controls.borrow().iter() {
            out.extend(
                child(control)
                    .into_iter()
                    .map(|e| e.prefixed(PathSegment::Key(key.clone()))),
            );
        }
        out
    }

    fn compute_errors(&self) -> Vec<ValidationEntry> {
        self.collect(&self.config.validators, FormUnit::errors)
    }

    fn compute_warnings(&self) -> Vec<ValidationEntry> {
        self.collect(&self.config.warnings, FormUnit::warnings)
    }

    fn relink(&self) {
        let links = self
            .controls
            .borrow()
            .values()
            .map(|c| c.trigger().forward_to(&self.trigger))
            .collect();
        *self.links.borrow_mut() = links;
    }

    fn write(&self, value: Value, full: bool) {
        let mut map = match value {
            Value::Object(map) => map,
            other => {
                tracing::debug!(unit = %self.id, found = %other.kind(), "layer write skipped: not an object");
                return;
            }
        };
        for (key, control) in self.snapshot() {
            let next = match map.swap_remove(&key) {
                Some(next) => next,
                None if full => Value::Null,
                None => continue,
            };
            match &control {
                Control::Node(node) => node.set_value(next),
                Control::Layer(layer) if full => layer.set_value(next),
                Control::Layer(layer) => layer.patch_value(next),
                Control::List(list) if !matches!(next, Value::List(_)) => {
                    tracing::debug!(unit = %list.id(), key = %key, "list write skipped: not a list");
                }
                Control::List(list) if full => list.set_value(next),
                Control::List(list) => list.patch_value(next),
            }
        }
    }
}

/// A keyed group of controls. Cloning shares the layer; use
/// [`duplicate`](FormLayer::duplicate) for an independent copy.
#[derive(Clone)]
pub struct FormLayer {
    inner: Rc<LayerInner>,
}

impl fmt::Debug for FormLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FormLayer")
            .field("id", &self.inner.id)
            .field("keys", &self.keys())
            .field("disabled", &self.inner.disabled.get())
            .finish()
    }
}

impl FormLayer {
    pub fn new(config: LayerConfig, controls: IndexMap<String, Control>) -> Self {
        Self::from_parts(Rc::new(config), controls)
    }

    fn from_parts(config: Rc<LayerConfig>, controls: IndexMap<String, Control>) -> Self {
        let trigger = Trigger::new();
        let disabled = Observable::new(config.disabled);
        let wiring = disabled.link(&trigger);
        let inner = Rc::new_cyclic(|weak| LayerInner {
            id: UnitId::next(),
            memo: UnitMemo::new(
                weak,
                &trigger,
                MemoFns {
                    value: LayerInner::compute_value,
                    raw: LayerInner::compute_raw,
                    errors: LayerInner::compute_errors,
                    warnings: LayerInner::compute_warnings,
                },
            ),
            config,
            controls: RefCell::new(controls),
            links: RefCell::new(Vec::new()),
            disabled,
            trigger,
            _wiring: wiring,
        });
        inner.relink();
        Self { inner }
    }

    /// An independent layer: every child duplicated, own configuration
    /// shared, no retained values.
    #[must_use]
    pub fn duplicate(&self) -> Self {
        let controls = self
            .inner
            .controls
            .borrow()
            .iter()
            .map(|(k, c)| (k.clone(), c.duplicate()))
            .collect();
        Self::from_parts(Rc::clone(&self.inner.config), controls)
    }

    pub fn config(&self) -> &LayerConfig {
        &self.inner.config
    }

    pub fn control(&self, key: &str) -> Option<Control> {
        self.inner.controls.borrow().get(key).cloned()
    }

    pub fn node(&self, key: &str) -> Option<FormNode> {
        self.control(key).and_then(|c| c.as_node().cloned())
    }

    pub fn layer(&self, key: &str) -> Option<FormLayer> {
        self.control(key).and_then(|c| c.as_layer().cloned())
    }

    pub fn list(&self, key: &str) -> Option<FormList> {
        self.control(key).and_then(|c| c.as_list().cloned())
    }

    pub fn keys(&self) -> Vec<String> {
        self.inner.controls.borrow().keys().cloned().collect()
    }

    /// Children in key order.
    pub fn controls(&self) -> Vec<(String, Control)> {
        self.inner.snapshot()
    }

    pub fn len(&self) -> usize {
        self.inner.controls.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Replace (or append) the child at `key`, returning the previous one.
    pub fn set_control(&self, key: impl Into<String>, control: impl Into<Control>) -> Option<Control> {
        let key = key.into();
        let previous = self
            .inner
            .controls
            .borrow_mut()
            .insert(key.clone(), control.into());
        self.inner.relink();
        tracing::debug!(unit = %self.inner.id, key = %key, replaced = previous.is_some(), "layer control set");
        self.inner.trigger.fire();
        previous
    }

    pub fn trigger(&self) -> &Trigger {
        &self.inner.trigger
    }

    pub fn value_signal(&self) -> Computed<Value> {
        self.inner.memo.value.clone()
    }

    pub fn errors_signal(&self) -> Computed<Vec<ValidationEntry>> {
        self.inner.memo.errors.clone()
    }

    pub fn ptr_eq(&self, other: &FormLayer) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl FormUnit for FormLayer {
    fn id(&self) -> UnitId {
        self.inner.id
    }

    fn nullable(&self) -> bool {
        self.inner.config.nullable
    }

    fn is_disabled(&self) -> bool {
        self.inner.disabled.get()
    }

    fn set_disabled(&self, disabled: bool) {
        if self.inner.disabled.set(disabled) {
            tracing::debug!(unit = %self.inner.id, disabled, "layer disabled flag changed");
        }
    }

    fn value(&self) -> Value {
        self.inner.memo.value.get()
    }

    fn raw_value(&self) -> Value {
        self.inner.memo.raw.get()
    }

    fn disabled_value(&self) -> Value {
        self.inner.fallback()
    }

    fn changed(&self) -> bool {
        self.inner.controls.borrow().values().any(FormUnit::changed)
    }

    fn touched(&self) -> bool {
        self.inner.controls.borrow().values().any(FormUnit::touched)
    }

    fn errors(&self) -> Vec<ValidationEntry> {
        self.inner.memo.errors.get()
    }

    fn warnings(&self) -> Vec<ValidationEntry> {
        self.inner.memo.warnings.get()
    }

    /// Write every child; keys missing from `value` write null.
    fn set_value(&self, value: Value) {
        self.inner.write(value, true);
    }

    /// Write only the children whose keys appear in `value`.
    fn patch_value(&self, value: Value) {
        self.inner.write(value, false);
    }

    fn reset(&self, value: Option<Value>) {
        let map = match value {
            Some(Value::Object(map)) => Some(map),
            _ => None,
        };
        for (key, control) in self.inner.snapshot() {
            control.reset(map.as_ref().and_then(|m| m.get(&key)).cloned());
        }
    }

    fn clear(&self) {
        for (_, control) in self.inner.snapshot() {
            control.clear();
        }
    }

    fn rollback(&self) {
        for (_, control) in self.inner.snapshot() {
            control.rollback();
        }
    }

    fn version(&self) -> u64 {
        self.inner.trigger.version()
    }

    fn watch(&self, callback: Box<dyn Fn()>) -> Subscription {
        self.inner.trigger.subscribe(callback)
    }
}
