#![forbid(unsafe_code)]

//! Leaf form units.
//!
//! A [`FormNode`] holds one value of a scalar-like [`NodeKind`] together
//! with its validation, touched/changed tracking and disabled state.
//!
//! # State model
//!
//! ```text
//!   set_value ──▶ live ──(grace tick, 200ms window)──▶ settled
//!                  │                                     │
//!             live_value()                 raw_value() / value() / errors()
//! ```
//!
//! Writes through [`FormUnit::set_value`] land in the live view at once and
//! reach the settled view through the node's debouncer. Everything the
//! containers aggregate reads the settled view. `reset`, `clear` and
//! `rollback` write both views synchronously.
//!
//! # Invariants
//!
//! 1. `Value::Null` and "absent" are the same state.
//! 2. A required node whose settled state is absent has exactly one error,
//!    [`REQUIRED_MESSAGE`]; no validator runs.
//! 3. An absent, non-required, non-nullable node has no errors.
//! 4. Warnings run when the state is present or the node is nullable.
//! 5. A disabled node reports its disabled fallback as its value and has
//!    neither errors nor warnings.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use rform_core::{UnitId, Value};
use rform_runtime::{
    DebounceConfig, DebouncedState, Emitter, Observable, Scheduler, Subscription, Trigger,
};

use crate::error::{FormError, FormResult, ValidationEntry};
use crate::select::{ItemSource, SelectConfig};
use crate::unit::{FormUnit, MemoFns, UnitMemo};
use crate::validation::{Validator, process};

/// Error reported for a required node with no value.
pub const REQUIRED_MESSAGE: &str = "field is required";

/// What a node holds and how a presentation layer should edit it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Text,
    Number,
    Bool,
    Date,
    File,
    Color,
    Email,
    Url,
    Password,
    Search,
    Phone,
    Select { multiple: bool },
    /// Any value; no editor implied.
    Generic,
}

/// Presentation hints carried alongside a node. None of these affect
/// values or validation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeMeta {
    pub label: Option<String>,
    pub placeholder: Option<String>,
    pub tooltip: Option<String>,
    pub auto_complete: Option<String>,
    pub readonly: bool,
    /// Render the field even while disabled.
    pub show_disabled_field: bool,
}

/// Imperative requests a node forwards to whoever renders it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeAction {
    Focus,
    SelectText,
    ScrollTo,
}

/// Construction-time configuration of a node. Shared by every duplicate.
#[derive(Debug, Clone)]
pub struct NodeConfig {
    pub kind: NodeKind,
    /// Substituted for an absent state when the node is not nullable.
    pub default_value: Value,
    /// State at construction and after `clear`. `None` leaves the state
    /// absent; `value()` still substitutes the default.
    pub initial: Option<Value>,
    pub nullable: bool,
    pub required: bool,
    /// Reported while disabled.
    pub disabled_default: Option<Value>,
    /// Disabled at construction.
    pub disabled: bool,
    pub validators: Vec<Validator>,
    pub warnings: Vec<Validator>,
    pub debounce: DebounceConfig,
    /// Timer queue for the debouncer; the thread's current one when unset.
    pub scheduler: Option<Scheduler>,
    pub meta: NodeMeta,
    pub select: Option<SelectConfig>,
}

impl NodeConfig {
    pub fn new(kind: NodeKind, default_value: impl Into<Value>) -> Self {
        Self {
            kind,
            default_value: default_value.into(),
            initial: None,
            nullable: false,
            required: false,
            disabled_default: None,
            disabled: false,
            validators: Vec::new(),
            warnings: Vec::new(),
            debounce: DebounceConfig::default(),
            scheduler: None,
            meta: NodeMeta::default(),
            select: None,
        }
    }

    fn initial_state(&self) -> Option<Value> {
        present(self.initial.clone())
    }

    fn fallback(&self) -> Option<Value> {
        (!self.nullable).then(|| self.default_value.clone())
    }

    fn disabled_state(&self) -> Option<Value> {
        present(self.disabled_default.clone()).or_else(|| self.fallback())
    }
}

fn present(value: Option<Value>) -> Option<Value> {
    value.filter(|v| !v.is_null())
}

// ---------------------------------------------------------------------------
// FormNode
// ---------------------------------------------------------------------------

pub(crate) struct NodeInner {
    id: UnitId,
    pub(crate) config: Rc<NodeConfig>,
    state: DebouncedState<Option<Value>>,
    disabled: Observable<bool>,
    reset_state: RefCell<Option<Value>>,
    touched: Cell<bool>,
    trigger: Trigger,
    actions: Emitter<NodeAction>,
    resets: Emitter<Value>,
    memo: UnitMemo,
    _wiring: Vec<Subscription>,
}

impl NodeInner {
    fn effective_state(&self) -> Option<Value> {
        if self.disabled.get() {
            self.config.disabled_state()
        } else {
            self.state.settled()
        }
    }

    fn with_default(&self, state: Option<Value>) -> Value {
        Value::from_state(state.or_else(|| self.config.fallback()))
    }

    fn compute_value(&self) -> Value {
        self.with_default(self.effective_state())
    }

    fn compute_raw(&self) -> Value {
        Value::from_state(self.effective_state())
    }

    fn compute_errors(&self) -> Vec<ValidationEntry> {
        if self.disabled.get() {
            return Vec::new();
        }
        let messages: Vec<String> = match self.state.settled() {
            None if self.config.required => vec![REQUIRED_MESSAGE.to_string()],
            None if !self.config.nullable => Vec::new(),
            state => {
                let value = Value::from_state(state);
                process(&self.config.validators, &value).collect()
            }
        };
        self.entries(messages)
    }

    fn compute_warnings(&self) -> Vec<ValidationEntry> {
        if self.disabled.get() {
            return Vec::new();
        }
        let state = self.state.settled();
        if state.is_none() && !self.config.nullable {
            return Vec::new();
        }
        let value = Value::from_state(state);
        let messages: Vec<String> = process(&self.config.warnings, &value).collect();
        self.entries(messages)
    }

    fn entries(&self, messages: Vec<String>) -> Vec<ValidationEntry> {
        messages
            .into_iter()
            .map(|m| ValidationEntry::new(m, self.id))
            .collect()
    }

    fn set_touched(&self, touched: bool) {
        if self.touched.replace(touched) != touched {
            self.trigger.fire();
        }
    }
}

/// A leaf unit. Cloning shares the node; use
/// [`duplicate`](FormNode::duplicate) for an independent copy.
#[derive(Clone)]
pub struct FormNode {
    pub(crate) inner: Rc<NodeInner>,
}

impl fmt::Debug for FormNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FormNode")
            .field("id", &self.inner.id)
            .field("kind", &self.inner.config.kind)
            .field("state", &self.inner.state)
            .field("disabled", &self.inner.disabled.get())
            .finish()
    }
}

impl FormNode {
    pub fn new(config: NodeConfig) -> Self {
        Self::from_config(Rc::new(config))
    }

    fn from_config(config: Rc<NodeConfig>) -> Self {
        let initial = config.initial_state();
        let scheduler = config.scheduler.clone().unwrap_or_else(Scheduler::current);
        let state = DebouncedState::new(initial.clone(), config.debounce, scheduler);
        let disabled = Observable::new(config.disabled);
        let trigger = Trigger::new();

        let mut wiring = Vec::with_capacity(4);
        let (live, settled) = state.link(&trigger);
        wiring.push(live);
        wiring.push(settled);
        wiring.push(disabled.link(&trigger));
        if let Some(ItemSource::Stream(items)) = config.select.as_ref().map(|s| &s.items) {
            wiring.push(items.link(&trigger));
        }

        let inner = Rc::new_cyclic(|weak| NodeInner {
            id: UnitId::next(),
            memo: UnitMemo::new(
                weak,
                &trigger,
                MemoFns {
                    value: NodeInner::compute_value,
                    raw: NodeInner::compute_raw,
                    errors: NodeInner::compute_errors,
                    warnings: NodeInner::compute_warnings,
                },
            ),
            config,
            state,
            disabled,
            reset_state: RefCell::new(initial),
            touched: Cell::new(false),
            trigger,
            actions: Emitter::new(),
            resets: Emitter::new(),
            _wiring: wiring,
        });
        tracing::trace!(unit = %inner.id, kind = ?inner.config.kind, "node created");
        Self { inner }
    }

    /// An independent node with the same configuration and no retained
    /// state.
    #[must_use]
    pub fn duplicate(&self) -> Self {
        Self::from_config(Rc::clone(&self.inner.config))
    }

    pub fn kind(&self) -> NodeKind {
        self.inner.config.kind
    }

    pub fn config(&self) -> &NodeConfig {
        &self.inner.config
    }

    pub fn meta(&self) -> &NodeMeta {
        &self.inner.config.meta
    }

    pub fn required(&self) -> bool {
        self.inner.config.required
    }

    pub fn default_value(&self) -> &Value {
        &self.inner.config.default_value
    }

    /// The live state, ahead of debounce.
    pub fn state(&self) -> Option<Value> {
        self.inner.state.live()
    }

    /// The settled state, ignoring the disabled flag.
    pub fn debounced_state(&self) -> Option<Value> {
        self.inner.state.settled()
    }

    /// The live state with the default substituted.
    pub fn live_value(&self) -> Value {
        self.inner.with_default(self.inner.state.live())
    }

    /// State the node falls back to while disabled: the disabled default,
    /// else absent when nullable, else the default.
    pub fn get_disabled_value(&self) -> Option<Value> {
        self.inner.config.disabled_state()
    }

    /// Baseline captured by the last reset.
    pub fn reset_state(&self) -> Option<Value> {
        self.inner.reset_state.borrow().clone()
    }

    /// Whether a debounce grace tick or window is in flight.
    pub fn is_settling(&self) -> bool {
        self.inner.state.is_settling()
    }

    pub fn scheduler(&self) -> &Scheduler {
        self.inner.state.scheduler()
    }

    /// Mark as interacted with, without writing a value.
    pub fn mark_touched(&self) {
        self.inner.set_touched(true);
    }

    /// Flip a bool node. Other kinds log a warning and stay unchanged.
    pub fn toggle(&self) {
        if let Err(err) = self.try_toggle() {
            tracing::warn!(unit = %self.inner.id, %err, "toggle ignored");
        }
    }

    /// Flip a bool node, or report the kind mismatch.
    pub fn try_toggle(&self) -> FormResult<()> {
        let kind = self.kind();
        if kind != NodeKind::Bool {
            return Err(FormError::WrongKind {
                expected: NodeKind::Bool,
                found: kind,
            });
        }
        let current = self.live_value().as_bool().unwrap_or(false);
        self.set_value(Value::Bool(!current));
        Ok(())
    }

    // -- actions ------------------------------------------------------------

    pub fn focus(&self) {
        self.inner.actions.emit(&NodeAction::Focus);
    }

    pub fn select_text(&self) {
        self.inner.actions.emit(&NodeAction::SelectText);
    }

    pub fn scroll_to(&self) {
        self.inner.actions.emit(&NodeAction::ScrollTo);
    }

    /// Listen for focus/select/scroll requests. Every request is delivered,
    /// including repeats.
    pub fn on_action(&self, listener: impl Fn(&NodeAction) + 'static) -> Subscription {
        self.inner.actions.subscribe(listener)
    }

    /// Listen for resets; receives the new baseline value.
    pub fn on_reset(&self, listener: impl Fn(&Value) + 'static) -> Subscription {
        self.inner.resets.subscribe(listener)
    }

    // -- signals ------------------------------------------------------------

    pub fn trigger(&self) -> &Trigger {
        &self.inner.trigger
    }

    pub fn live_observable(&self) -> &Observable<Option<Value>> {
        self.inner.state.live_observable()
    }

    pub fn disabled_observable(&self) -> &Observable<bool> {
        &self.inner.disabled
    }

    pub fn value_signal(&self) -> rform_runtime::Computed<Value> {
        self.inner.memo.value.clone()
    }

    pub fn errors_signal(&self) -> rform_runtime::Computed<Vec<ValidationEntry>> {
        self.inner.memo.errors.clone()
    }

    pub fn ptr_eq(&self, other: &FormNode) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl FormUnit for FormNode {
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
            tracing::debug!(unit = %self.inner.id, disabled, "node disabled flag changed");
        }
    }

    fn value(&self) -> Value {
        self.inner.memo.value.get()
    }

    fn raw_value(&self) -> Value {
        self.inner.memo.raw.get()
    }

    fn disabled_value(&self) -> Value {
        Value::from_state(self.get_disabled_value())
    }

    fn changed(&self) -> bool {
        self.inner.state.settled() != *self.inner.reset_state.borrow()
    }

    fn touched(&self) -> bool {
        self.inner.touched.get()
    }

    fn errors(&self) -> Vec<ValidationEntry> {
        self.inner.memo.errors.get()
    }

    fn warnings(&self) -> Vec<ValidationEntry> {
        self.inner.memo.warnings.get()
    }

    fn set_value(&self, value: Value) {
        tracing::trace!(unit = %self.inner.id, "node set_value");
        self.inner.set_touched(true);
        self.inner.state.set(present(Some(value)));
    }

    fn reset(&self, value: Option<Value>) {
        let inner = &self.inner;
        let baseline = present(value).or_else(|| inner.config.initial_state());
        *inner.reset_state.borrow_mut() = baseline.clone();
        inner.touched.set(false);
        inner.state.set_now(baseline.clone());
        inner.trigger.fire();
        inner.resets.emit(&inner.with_default(baseline));
    }

    fn clear(&self) {
        let inner = &self.inner;
        inner.touched.set(false);
        inner.state.set_now(inner.config.initial_state());
        inner.trigger.fire();
    }

    fn rollback(&self) {
        let inner = &self.inner;
        let baseline = inner.reset_state.borrow().clone();
        inner.touched.set(false);
        inner.state.set_now(baseline);
        inner.trigger.fire();
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
    use rform_runtime::{BatchScope, Duration};

    fn text(scheduler: &Scheduler) -> NodeConfig {
        let mut config = NodeConfig::new(NodeKind::Text, "");
        config.scheduler = Some(scheduler.clone());
        config
    }

    #[test]
    fn set_value_is_live_then_settles() {
        let s = Scheduler::new();
        let node = FormNode::new(text(&s));
        node.set_value("Bob".into());
        assert_eq!(node.live_value(), Value::from("Bob"));
        assert_eq!(node.value(), Value::from(""));
        assert!(node.touched());
        s.flush();
        assert_eq!(node.value(), Value::from("Bob"));
        assert!(node.changed());
    }

    #[test]
    fn required_absent_has_single_error() {
        let s = Scheduler::new();
        let mut config = text(&s);
        config.required = true;
        config.nullable = true;
        config.validators.push(Validator::new(|_: &Value| "never runs"));
        let node = FormNode::new(config);
        let errors = node.errors();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].message, REQUIRED_MESSAGE);
        assert!(!node.is_valid());
    }

    #[test]
    fn fresh_required_node_reports_missing_value() {
        let s = Scheduler::new();
        let mut config = text(&s);
        config.required = true;
        let node = FormNode::new(config);
        assert_eq!(node.raw_value(), Value::Null);
        assert_eq!(node.value(), Value::from(""));
        let messages: Vec<String> = node.errors().into_iter().map(|e| e.message).collect();
        assert_eq!(messages, vec![REQUIRED_MESSAGE.to_string()]);

        node.set_value("x".into());
        s.flush();
        assert!(node.is_valid());

        node.clear();
        assert_eq!(node.raw_value(), Value::Null);
        assert_eq!(node.errors().len(), 1);
        assert!(!node.is_valid());
    }

    #[test]
    fn initial_value_is_the_starting_state() {
        let s = Scheduler::new();
        let mut config = text(&s);
        config.required = true;
        config.initial = Some("start".into());
        let node = FormNode::new(config);
        assert_eq!(node.raw_value(), Value::from("start"));
        assert!(node.is_valid());
        node.set_value("other".into());
        s.flush();
        node.clear();
        assert_eq!(node.raw_value(), Value::from("start"));
    }

    #[test]
    fn disable_inside_batch_reads_fallback() {
        let s = Scheduler::new();
        let mut config = text(&s);
        config.default_value = "d".into();
        config.disabled_default = Some("x".into());
        let node = FormNode::new(config);
        node.reset(Some("typed".into()));
        let signal = node.value_signal();
        assert_eq!(signal.get(), Value::from("typed"));

        let hits = Rc::new(Cell::new(0));
        let h = Rc::clone(&hits);
        let _sub = node.watch(Box::new(move || h.set(h.get() + 1)));
        {
            let _batch = BatchScope::new();
            node.disable();
            assert_eq!(node.raw_value(), Value::from("x"));
            assert_eq!(signal.get(), Value::from("x"));
            assert!(node.errors().is_empty());
            assert_eq!(hits.get(), 0);
        }
        assert!(hits.get() > 0);
    }

    #[test]
    fn absent_non_nullable_is_not_validated() {
        let s = Scheduler::new();
        let mut config = text(&s);
        config.validators.push(Validator::new(|_: &Value| "bad"));
        config.warnings.push(Validator::new(|_: &Value| "hmm"));
        let node = FormNode::new(config);
        node.set_value(Value::Null);
        s.flush();
        assert_eq!(node.debounced_state(), None);
        assert!(node.errors().is_empty());
        assert!(node.warnings().is_empty());
        assert_eq!(node.value(), Value::from(""));
    }

    #[test]
    fn nullable_absent_runs_warnings() {
        let s = Scheduler::new();
        let mut config = text(&s);
        config.nullable = true;
        config.warnings.push(Validator::new(|v: &Value| v.is_null().then_some("empty")));
        let node = FormNode::new(config);
        assert_eq!(node.warnings().len(), 1);
        assert_eq!(node.value(), Value::Null);
    }

    #[test]
    fn disabled_value_precedence() {
        let s = Scheduler::new();
        let mut config = text(&s);
        config.default_value = "dflt".into();
        let node = FormNode::new(config.clone());
        assert_eq!(node.get_disabled_value(), Some("dflt".into()));

        config.nullable = true;
        assert_eq!(FormNode::new(config.clone()).get_disabled_value(), None);

        config.disabled_default = Some("off".into());
        let node = FormNode::new(config);
        node.disable();
        assert_eq!(node.value(), Value::from("off"));
        assert!(node.errors().is_empty());
        node.enable();
        assert_eq!(node.value(), Value::Null);
    }

    #[test]
    fn reset_rebaselines_and_rollback_restores() {
        let s = Scheduler::new();
        let node = FormNode::new(text(&s));
        node.reset(Some("A".into()));
        assert!(!node.changed());
        assert!(!node.touched());
        node.set_value("B".into());
        s.flush();
        assert!(node.changed());
        node.rollback();
        assert_eq!(node.value(), Value::from("A"));
        assert!(!node.changed());
        node.clear();
        assert_eq!(node.value(), Value::from(""));
        assert!(node.changed());
    }

    #[test]
    fn reset_cancels_pending_debounce() {
        let s = Scheduler::new();
        let node = FormNode::new(text(&s));
        node.set_value("typing".into());
        node.reset(Some("fresh".into()));
        s.advance(Duration::from_millis(500));
        assert_eq!(node.value(), Value::from("fresh"));
    }

    #[test]
    fn toggle_only_flips_bools() {
        let s = Scheduler::new();
        let mut config = NodeConfig::new(NodeKind::Bool, false);
        config.scheduler = Some(s.clone());
        let flag = FormNode::new(config);
        flag.toggle();
        s.flush();
        assert_eq!(flag.value(), Value::Bool(true));

        let name = FormNode::new(text(&s));
        assert_eq!(
            name.try_toggle(),
            Err(FormError::WrongKind {
                expected: NodeKind::Bool,
                found: NodeKind::Text
            })
        );
        name.toggle();
        assert!(!name.touched());
    }

    #[test]
    fn actions_deliver_repeats() {
        let s = Scheduler::new();
        let node = FormNode::new(text(&s));
        let seen = Rc::new(RefCell::new(Vec::new()));
        let log = Rc::clone(&seen);
        let _sub = node.on_action(move |a| log.borrow_mut().push(*a));
        node.focus();
        node.focus();
        node.scroll_to();
        assert_eq!(
            *seen.borrow(),
            vec![NodeAction::Focus, NodeAction::Focus, NodeAction::ScrollTo]
        );
    }

    #[test]
    fn duplicate_shares_config_not_state() {
        let s = Scheduler::new();
        let node = FormNode::new(text(&s));
        node.reset(Some("kept".into()));
        let copy = node.duplicate();
        assert_eq!(copy.value(), Value::from(""));
        assert_ne!(copy.id(), node.id());
        assert!(!copy.ptr_eq(&node));
    }

    #[test]
    fn value_memo_recomputes_on_change_only() {
        let s = Scheduler::new();
        let node = FormNode::new(text(&s));
        let signal = node.value_signal();
        let _ = signal.get();
        let _ = signal.get();
        assert_eq!(signal.evaluations(), 1);
        node.set_value("x".into());
        s.flush();
        assert_eq!(signal.get(), Value::from("x"));
        assert_eq!(signal.evaluations(), 2);
    }
}
