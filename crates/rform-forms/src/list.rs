#![forbid(unsafe_code)]

//! Dynamic, index-addressed collections of layers.
//!
//! A [`FormList`] stamps out copies of a template layer. Every structural
//! operation bottoms out in [`FormList::scale_to_size`] or a single-element
//! insert/remove; value writes then go to each element positionally.
//!
//! ```text
//!   scale_to_size(n)
//!     n == len   -> no-op
//!     n == 0     -> clear
//!     n <  len   -> truncate tail, keep 0..n
//!     n >  len   -> append (n - len) fresh template duplicates
//! ```
//!
//! Removing an element drops it unless the caller keeps the returned
//! handle; its nodes' pending debounce timers go with it.
//!
//! # Failure Modes
//!
//! | Call | Out of range / no match |
//! |------|-------------------------|
//! | `remove_at`, `remove`, `remove_element` | `None` |
//! | `update_element` | `None`, nothing appended |
//! | `move_element` | `false`, list unchanged |
//! | `set_value` / `patch_value` with a non-list | skipped, logged at debug |

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use rform_core::{PathSegment, UnitId, Value};
use rform_runtime::{Computed, Observable, Subscription, Trigger};

use crate::error::ValidationEntry;
use crate::layer::FormLayer;
use crate::unit::{FormUnit, MemoFns, UnitMemo};
use crate::validation::{Validator, process};

/// Configuration of a list.
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ListConfig {
    /// Elements created at construction and restored by `clear`.
    pub start_length: usize,
    /// A disabled nullable list reports null.
    pub nullable: bool,
    /// Disabled at construction.
    pub disabled: bool,
    pub disabled_default: Option<Value>,
    #[cfg_attr(feature = "serde", serde(skip))]
    pub validators: Vec<Validator>,
    #[cfg_attr(feature = "serde", serde(skip))]
    pub warnings: Vec<Validator>,
}

impl ListConfig {
    #[must_use]
    pub fn with_start_length(mut self, start_length: usize) -> Self {
        self.start_length = start_length;
        self
    }

    #[must_use]
    pub fn with_nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }

    #[must_use]
    pub fn with_disabled(mut self, disabled: bool) -> Self {
        self.disabled = disabled;
        self
    }

    #[must_use]
    pub fn with_disabled_default(mut self, value: impl Into<Value>) -> Self {
        self.disabled_default = Some(value.into());
        self
    }

    #[must_use]
    pub fn with_validator(mut self, validator: Validator) -> Self {
        self.validators.push(validator);
        self
    }

    #[must_use]
    pub fn with_warning(mut self, validator: Validator) -> Self {
        self.warnings.push(validator);
        self
    }
}

/// What `toggle_element` did.
#[derive(Debug, Clone)]
pub enum ToggleOutcome {
    Added(FormLayer),
    Removed(FormLayer),
}

pub(crate) struct ListInner {
    id: UnitId,
    config: Rc<ListConfig>,
    template: FormLayer,
    elements: RefCell<Vec<FormLayer>>,
    links: RefCell<Vec<Subscription>>,
    baseline_len: Cell<usize>,
    disabled: Observable<bool>,
    trigger: Trigger,
    memo: UnitMemo,
    _wiring: Subscription,
}

impl ListInner {
    fn snapshot(&self) -> Vec<FormLayer> {
        self.elements.borrow().clone()
    }

    fn aggregate(&self, f: impl Fn(&FormLayer) -> Value) -> Value {
        Value::List(self.elements.borrow().iter().map(f).collect())
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
        element: impl Fn(&FormLayer) -> Vec<ValidationEntry>,
    ) -> Vec<ValidationEntry> {
        if self.disabled.get() {
            return Vec::new();
        }
        let value = self.memo.value.get();
        let mut out: Vec<ValidationEntry> = process(own, &value)
            .map(|m| ValidationEntry::new(m, self.id))
            .collect();
        for (index, layer) in self.elements.borrow().iter().enumerate() {
            out.extend(
                element(layer)
                    .into_iter()
                    .map(|e| e.prefixed(PathSegment::Index(index))),
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

    /// Apply a structural change, then relink element triggers and fire.
    fn restructure<R>(&self, change: impl FnOnce(&mut Vec<FormLayer>) -> R) -> R {
        let out = change(&mut self.elements.borrow_mut());
        let links = self
            .elements
            .borrow()
            .iter()
            .map(|layer| layer.trigger().forward_to(&self.trigger))
            .collect();
        *self.links.borrow_mut() = links;
        self.trigger.fire();
        out
    }

    fn position(&self, filter: impl Fn(&Value) -> bool) -> Option<usize> {
        self.elements
            .borrow()
            .iter()
            .position(|layer| filter(&layer.value()))
    }

    fn write(&self, value: Value, full: bool) {
        let items = match value {
            Value::List(items) => items,
            other => {
                tracing::debug!(unit = %self.id, found = %other.kind(), "list write skipped: not a list");
                return;
            }
        };
        self.scale_to_size(items.len());
        for (layer, item) in self.snapshot().iter().zip(items) {
            if full {
                layer.set_value(item);
            } else {
                layer.patch_value(item);
            }
        }
    }

    fn scale_to_size(&self, size: usize) {
        let current = self.elements.borrow().len();
        if size == current {
            return;
        }
        let fresh: Vec<FormLayer> = (current..size)
            .map(|_| self.template.duplicate())
            .collect();
        self.restructure(|elements| {
            if size == 0 {
                elements.clear();
            } else if size < current {
                elements.truncate(size);
            } else {
                elements.extend(fresh);
            }
        });
        tracing::debug!(unit = %self.id, from = current, len = size, "list scaled");
    }
}

/// A list of layers stamped from a template. Cloning shares the list; use
/// [`duplicate`](FormList::duplicate) for an independent copy.
#[derive(Clone)]
pub struct FormList {
    inner: Rc<ListInner>,
}

impl fmt::Debug for FormList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FormList")
            .field("id", &self.inner.id)
            .field("len", &self.length())
            .field("disabled", &self.inner.disabled.get())
            .finish()
    }
}

impl FormList {
    pub fn new(template: FormLayer, config: ListConfig) -> Self {
        Self::from_parts(Rc::new(config), template)
    }

    fn from_parts(config: Rc<ListConfig>, template: FormLayer) -> Self {
        let trigger = Trigger::new();
        let disabled = Observable::new(config.disabled);
        let wiring = disabled.link(&trigger);
        let start_length = config.start_length;
        let inner = Rc::new_cyclic(|weak| ListInner {
            id: UnitId::next(),
            memo: UnitMemo::new(
                weak,
                &trigger,
                MemoFns {
                    value: ListInner::compute_value,
                    raw: ListInner::compute_raw,
                    errors: ListInner::compute_errors,
                    warnings: ListInner::compute_warnings,
                },
            ),
            config,
            template,
            elements: RefCell::new(Vec::new()),
            links: RefCell::new(Vec::new()),
            baseline_len: Cell::new(start_length),
            disabled,
            trigger,
            _wiring: wiring,
        });
        inner.scale_to_size(start_length);
        Self { inner }
    }

    /// An independent list: template duplicated, configuration shared,
    /// seeded with `start_length` fresh elements.
    #[must_use]
    pub fn duplicate(&self) -> Self {
        Self::from_parts(Rc::clone(&self.inner.config), self.inner.template.duplicate())
    }

    pub fn config(&self) -> &ListConfig {
        &self.inner.config
    }

    pub fn template(&self) -> &FormLayer {
        &self.inner.template
    }

    pub fn start_length(&self) -> usize {
        self.inner.config.start_length
    }

    pub fn length(&self) -> usize {
        self.inner.elements.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.length() == 0
    }

    /// Elements in order.
    pub fn controls(&self) -> Vec<FormLayer> {
        self.inner.snapshot()
    }

    pub fn control_at(&self, index: usize) -> Option<FormLayer> {
        self.inner.elements.borrow().get(index).cloned()
    }

    /// Resize to `size` elements, truncating from the tail or appending
    /// fresh template duplicates.
    pub fn scale_to_size(&self, size: usize) {
        self.inner.scale_to_size(size);
    }

    /// Append one fresh element reset to `value`.
    pub fn add_element(&self, value: Option<Value>) -> FormLayer {
        let layer = self.inner.template.duplicate();
        layer.reset(value);
        self.inner.restructure(|elements| elements.push(layer.clone()));
        tracing::trace!(unit = %self.inner.id, len = self.length(), "list element added");
        layer
    }

    pub fn append_elements(&self, values: impl IntoIterator<Item = Value>) -> Vec<FormLayer> {
        let fresh: Vec<FormLayer> = values
            .into_iter()
            .map(|value| {
                let layer = self.inner.template.duplicate();
                layer.reset(Some(value));
                layer
            })
            .collect();
        if !fresh.is_empty() {
            self.inner
                .restructure(|elements| elements.extend(fresh.iter().cloned()));
        }
        fresh
    }

    /// Patch the first element whose value matches `filter`, or append a
    /// new element when none does.
    pub fn set_element(&self, filter: impl Fn(&Value) -> bool, value: Value) -> FormLayer {
        match self.update_element(filter, value.clone()) {
            Some(layer) => layer,
            None => self.add_element(Some(value)),
        }
    }

    /// Patch the first element whose value matches `filter`.
    pub fn update_element(&self, filter: impl Fn(&Value) -> bool, value: Value) -> Option<FormLayer> {
        let index = self.inner.position(filter)?;
        let layer = self.control_at(index)?;
        layer.patch_value(value);
        Some(layer)
    }

    /// Remove the first match, or append `value` when nothing matches.
    pub fn toggle_element(&self, filter: impl Fn(&Value) -> bool, value: Value) -> ToggleOutcome {
        match self.remove_element(filter) {
            Some(removed) => ToggleOutcome::Removed(removed),
            None => ToggleOutcome::Added(self.add_element(Some(value))),
        }
    }

    pub fn remove_element(&self, filter: impl Fn(&Value) -> bool) -> Option<FormLayer> {
        let index = self.inner.position(filter)?;
        self.remove_at(index)
    }

    /// Remove `layer` by identity.
    pub fn remove(&self, layer: &FormLayer) -> Option<FormLayer> {
        let index = self
            .inner
            .elements
            .borrow()
            .iter()
            .position(|el| el.ptr_eq(layer))?;
        self.remove_at(index)
    }

    pub fn remove_at(&self, index: usize) -> Option<FormLayer> {
        if index >= self.length() {
            return None;
        }
        let removed = self.inner.restructure(|elements| elements.remove(index));
        tracing::trace!(unit = %self.inner.id, index, "list element removed");
        Some(removed)
    }

    /// Move the element at `old_index` so it lands at `new_index` of the
    /// list without it. `new_index` must be inside that shorter list.
    pub fn move_element(&self, old_index: usize, new_index: usize) -> bool {
        let len = self.length();
        if old_index >= len || new_index >= len - 1 {
            tracing::debug!(unit = %self.inner.id, old_index, new_index, len, "list move rejected");
            return false;
        }
        self.inner.restructure(|elements| {
            let moved = elements.remove(old_index);
            elements.insert(new_index, moved);
        });
        true
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

    pub fn ptr_eq(&self, other: &FormList) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl FormUnit for FormList {
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
            tracing::debug!(unit = %self.inner.id, disabled, "list disabled flag changed");
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

    /// Any element changed, or the length differs from the last reset.
    fn changed(&self) -> bool {
        let elements = self.inner.elements.borrow();
        elements.len() != self.inner.baseline_len.get() || elements.iter().any(FormUnit::changed)
    }

    fn touched(&self) -> bool {
        self.inner.elements.borrow().iter().any(FormUnit::touched)
    }

    fn errors(&self) -> Vec<ValidationEntry> {
        self.inner.memo.errors.get()
    }

    fn warnings(&self) -> Vec<ValidationEntry> {
        self.inner.memo.warnings.get()
    }

    /// Scale to the supplied length, then write each element in full.
    fn set_value(&self, value: Value) {
        self.inner.write(value, true);
    }

    /// Scale to the supplied length, then patch each element.
    fn patch_value(&self, value: Value) {
        self.inner.write(value, false);
    }

    /// Without a list payload, clear entirely; otherwise scale and reset
    /// each element positionally.
    fn reset(&self, value: Option<Value>) {
        let items = match value {
            Some(Value::List(items)) => items,
            _ => Vec::new(),
        };
        self.inner.scale_to_size(items.len());
        for (layer, item) in self.inner.snapshot().iter().zip(items) {
            layer.reset(Some(item));
        }
        self.inner.baseline_len.set(self.length());
        self.inner.trigger.fire();
    }

    /// Back to `start_length` elements, each cleared.
    fn clear(&self) {
        self.inner.scale_to_size(self.inner.config.start_length);
        for layer in self.inner.snapshot() {
            layer.clear();
        }
    }

    /// Back to the length of the last reset; surviving elements roll back,
    /// missing ones are appended fresh.
    fn rollback(&self) {
        self.inner.scale_to_size(self.inner.baseline_len.get());
        for layer in self.inner.snapshot() {
            layer.rollback();
        }
    }

    fn version(&self) -> u64 {
        self.inner.trigger.version()
    }

    fn watch(&self, callback: Box<dyn Fn()>) -> Subscription {
        self.inner.trigger.subscribe(callback)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::Control;
    use crate::layer::LayerConfig;
    use crate::node::{FormNode, NodeConfig, NodeKind};
    use indexmap::IndexMap;
    use rform_runtime::Scheduler;

    fn template(s: &Scheduler) -> FormLayer {
        let mut config = NodeConfig::new(NodeKind::Text, "");
        config.scheduler = Some(s.clone());
        let mut controls = IndexMap::new();
        controls.insert("value".to_string(), Control::from(FormNode::new(config)));
        FormLayer::new(LayerConfig::default(), controls)
    }

    fn item(text: &str) -> Value {
        Value::object([("value", text)])
    }

    fn texts(list: &FormList) -> Vec<String> {
        list.controls()
            .iter()
            .map(|l| l.value().get("value").map(Value::to_string).unwrap_or_default())
            .collect()
    }

    #[test]
    fn starts_at_start_length() {
        let s = Scheduler::new();
        let list = FormList::new(template(&s), ListConfig::default().with_start_length(2));
        assert_eq!(list.length(), 2);
        assert!(!list.changed());
        let copy = list.duplicate();
        assert_eq!(copy.length(), 2);
    }

    #[test]
    fn reset_without_payload_clears() {
        let s = Scheduler::new();
        let list = FormList::new(template(&s), ListConfig::default().with_start_length(3));
        list.reset(None);
        assert!(list.is_empty());
        assert!(!list.changed());
        list.reset(Some(Value::list([item("a"), item("b")])));
        assert_eq!(texts(&list), vec!["a", "b"]);
    }

    #[test]
    fn element_crud() {
        let s = Scheduler::new();
        let list = FormList::new(template(&s), ListConfig::default());
        list.append_elements([item("a"), item("b")]);
        let is = |t: &'static str| move |v: &Value| v.get("value") == Some(&Value::from(t));

        assert!(list.update_element(is("zzz"), item("q")).is_none());
        assert_eq!(list.length(), 2);

        list.set_element(is("c"), item("c"));
        assert_eq!(texts(&list), vec!["a", "b", "c"]);

        assert!(matches!(list.toggle_element(is("a"), item("a")), ToggleOutcome::Removed(_)));
        assert!(matches!(list.toggle_element(is("a"), item("a")), ToggleOutcome::Added(_)));
        assert_eq!(texts(&list), vec!["b", "c", "a"]);

        let c = list.control_at(1);
        assert!(c.as_ref().and_then(|c| list.remove(c)).is_some());
        assert!(list.remove_element(is("c")).is_none());
        assert_eq!(texts(&list), vec!["b", "a"]);
    }

    #[test]
    fn move_checks_against_shrunk_length() {
        let s = Scheduler::new();
        let list = FormList::new(template(&s), ListConfig::default());
        list.append_elements([item("a"), item("b"), item("c")]);
        assert!(!list.move_element(0, 2));
        assert_eq!(texts(&list), vec!["a", "b", "c"]);
        assert!(list.move_element(0, 1));
        assert_eq!(texts(&list), vec!["b", "a", "c"]);
        assert!(list.move_element(2, 0));
        assert_eq!(texts(&list), vec!["c", "b", "a"]);
        assert!(!list.move_element(3, 0));
    }

    #[test]
    fn errors_are_index_prefixed() {
        let s = Scheduler::new();
        let mut config = NodeConfig::new(NodeKind::Text, "");
        config.scheduler = Some(s.clone());
        config.validators.push(Validator::new(|v: &Value| {
            (v.as_str() == Some("bad")).then_some("no")
        }));
        let mut controls = IndexMap::new();
        controls.insert("value".to_string(), Control::from(FormNode::new(config)));
        let list = FormList::new(
            FormLayer::new(LayerConfig::default(), controls),
            ListConfig::default(),
        );
        list.append_elements([item("ok"), item("bad")]);
        let errors = list.errors();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].path.to_strings(), vec!["[1]", "value"]);
    }

    #[test]
    fn set_value_writes_through_debounce() {
        let s = Scheduler::new();
        let list = FormList::new(template(&s), ListConfig::default());
        list.set_value(Value::list([item("x"), item("y")]));
        assert_eq!(list.length(), 2);
        assert_eq!(texts(&list), vec!["", ""]);
        s.flush();
        assert_eq!(texts(&list), vec!["x", "y"]);
        assert!(list.changed());
        assert!(list.touched());
    }

    #[test]
    fn disabled_nullable_list_is_null() {
        let s = Scheduler::new();
        let list = FormList::new(
            template(&s),
            ListConfig::default().with_nullable(true).with_start_length(1),
        );
        list.disable();
        assert_eq!(list.value(), Value::Null);
        list.enable();
        assert_eq!(list.value(), Value::list([item("")]));
    }

    #[test]
    fn dropping_elements_cancels_pending_debounce() {
        let s = Scheduler::new();
        let list = FormList::new(template(&s), ListConfig::default().with_start_length(4));
        let Some(last) = list.control_at(3).and_then(|l| l.node("value")) else {
            panic!("element 3 has a value node");
        };
        last.set_value("typing".into());
        drop(last);
        assert!(s.pending() >= 1);
        list.scale_to_size(2);
        assert_eq!(s.pending(), 0);

        let Some(second) = list.control_at(1).and_then(|l| l.node("value")) else {
            panic!("element 1 has a value node");
        };
        second.set_value("typing".into());
        drop(second);
        assert!(s.pending() >= 1);
        assert!(list.remove_at(1).is_some());
        assert_eq!(s.pending(), 0);
        assert_eq!(texts(&list), vec![""]);
    }

    #[test]
    fn set_value_nulls_keys_missing_from_an_element() {
        let s = Scheduler::new();
        let mut name = NodeConfig::new(NodeKind::Text, "");
        name.scheduler = Some(s.clone());
        let mut note = NodeConfig::new(NodeKind::Text, "");
        note.nullable = true;
        note.scheduler = Some(s.clone());
        let mut controls = IndexMap::new();
        controls.insert("name".to_string(), Control::from(FormNode::new(name)));
        controls.insert("note".to_string(), Control::from(FormNode::new(note)));
        let list = FormList::new(
            FormLayer::new(LayerConfig::default(), controls),
            ListConfig::default(),
        );
        list.reset(Some(Value::list([Value::object([("name", "a"), ("note", "n")])])));

        list.set_value(Value::list([Value::object([("name", "b")])]));
        s.flush();
        assert_eq!(
            list.value(),
            Value::list([Value::object([
                ("name", Value::from("b")),
                ("note", Value::Null)
            ])])
        );

        list.reset(Some(Value::list([Value::object([("name", "a"), ("note", "n")])])));
        list.patch_value(Value::list([Value::object([("name", "c")])]));
        s.advance(rform_runtime::Duration::from_secs(1));
        assert_eq!(
            list.value(),
            Value::list([Value::object([("name", "c"), ("note", "n")])])
        );
    }

    #[test]
    fn disabled_list_with_default_ignores_nullability() {
        let s = Scheduler::new();
        let list = FormList::new(
            template(&s),
            ListConfig::default()
                .with_nullable(true)
                .with_disabled_default(Value::List(Vec::new()))
                .with_start_length(2),
        );
        list.disable();
        assert_eq!(list.value(), Value::List(Vec::new()));
        assert!(list.errors().is_empty());
    }

    #[test]
    fn rollback_restores_length_and_values() {
        let s = Scheduler::new();
        let list = FormList::new(template(&s), ListConfig::default());
        list.reset(Some(Value::list([item("a")])));
        list.add_element(Some(item("b")));
        list.patch_value(Value::list([item("z")]));
        s.flush();
        list.rollback();
        assert_eq!(texts(&list), vec!["a"]);
        assert!(!list.changed());
    }
}
