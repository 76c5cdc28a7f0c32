#![forbid(unsafe_code)]

//! The closed set of units a container can hold.

use rform_core::{UnitId, Value};
use rform_runtime::{Computed, Subscription, Trigger};

use crate::error::ValidationEntry;
use crate::layer::FormLayer;
use crate::list::FormList;
use crate::node::FormNode;
use crate::unit::FormUnit;

/// A child of a layer: a leaf, a nested layer, or a list of layers.
///
/// Cloning shares the underlying unit.
#[derive(Debug, Clone)]
pub enum Control {
    Node(FormNode),
    Layer(FormLayer),
    List(FormList),
}

macro_rules! dispatch {
    ($self:ident, $unit:ident => $body:expr) => {
        match $self {
            Control::Node($unit) => $body,
            Control::Layer($unit) => $body,
            Control::List($unit) => $body,
        }
    };
}

impl Control {
    pub fn as_node(&self) -> Option<&FormNode> {
        match self {
            Self::Node(node) => Some(node),
            _ => None,
        }
    }

    pub fn as_layer(&self) -> Option<&FormLayer> {
        match self {
            Self::Layer(layer) => Some(layer),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&FormList> {
        match self {
            Self::List(list) => Some(list),
            _ => None,
        }
    }

    /// An independent copy with the same shape and configuration.
    #[must_use]
    pub fn duplicate(&self) -> Self {
        match self {
            Self::Node(node) => Self::Node(node.duplicate()),
            Self::Layer(layer) => Self::Layer(layer.duplicate()),
            Self::List(list) => Self::List(list.duplicate()),
        }
    }

    pub(crate) fn trigger(&self) -> &Trigger {
        dispatch!(self, unit => unit.trigger())
    }

    // -- signals ------------------------------------------------------------

    pub fn value_signal(&self) -> Computed<Value> {
        dispatch!(self, unit => unit.value_signal())
    }

    pub fn errors_signal(&self) -> Computed<Vec<ValidationEntry>> {
        dispatch!(self, unit => unit.errors_signal())
    }

    pub fn raw_signal(&self) -> Computed<Value> {
        self.signal(FormUnit::raw_value)
    }

    pub fn debounced_signal(&self) -> Computed<Value> {
        self.signal(FormUnit::debounced_value)
    }

    pub fn warnings_signal(&self) -> Computed<Vec<ValidationEntry>> {
        self.signal(FormUnit::warnings)
    }

    pub fn valid_signal(&self) -> Computed<bool> {
        self.signal(FormUnit::is_valid)
    }

    pub fn changed_signal(&self) -> Computed<bool> {
        self.signal(FormUnit::changed)
    }

    pub fn touched_signal(&self) -> Computed<bool> {
        self.signal(FormUnit::touched)
    }

    pub fn disabled_signal(&self) -> Computed<bool> {
        self.signal(FormUnit::is_disabled)
    }

    /// A memoized read of `f`, recomputed when the subtree changes.
    pub fn signal<T: Clone + 'static>(&self, f: fn(&Control) -> T) -> Computed<T> {
        let changes = self.clone();
        let unit = self.clone();
        Computed::new(move || changes.version(), move || f(&unit))
    }

    pub fn ptr_eq(&self, other: &Control) -> bool {
        match (self, other) {
            (Self::Node(a), Self::Node(b)) => a.ptr_eq(b),
            (Self::Layer(a), Self::Layer(b)) => a.ptr_eq(b),
            (Self::List(a), Self::List(b)) => a.ptr_eq(b),
            _ => false,
        }
    }
}

impl FormUnit for Control {
    fn id(&self) -> UnitId {
        dispatch!(self, unit => unit.id())
    }

    fn nullable(&self) -> bool {
        dispatch!(self, unit => unit.nullable())
    }

    fn is_disabled(&self) -> bool {
        dispatch!(self, unit => unit.is_disabled())
    }

    fn set_disabled(&self, disabled: bool) {
        dispatch!(self, unit => unit.set_disabled(disabled))
    }

    fn value(&self) -> Value {
        dispatch!(self, unit => unit.value())
    }

    fn raw_value(&self) -> Value {
        dispatch!(self, unit => unit.raw_value())
    }

    fn disabled_value(&self) -> Value {
        dispatch!(self, unit => unit.disabled_value())
    }

    fn changed(&self) -> bool {
        dispatch!(self, unit => unit.changed())
    }

    fn touched(&self) -> bool {
        dispatch!(self, unit => unit.touched())
    }

    fn errors(&self) -> Vec<ValidationEntry> {
        dispatch!(self, unit => unit.errors())
    }

    fn warnings(&self) -> Vec<ValidationEntry> {
        dispatch!(self, unit => unit.warnings())
    }

    fn set_value(&self, value: Value) {
        dispatch!(self, unit => unit.set_value(value))
    }

    fn patch_value(&self, value: Value) {
        dispatch!(self, unit => unit.patch_value(value))
    }

    fn reset(&self, value: Option<Value>) {
        dispatch!(self, unit => unit.reset(value))
    }

    fn clear(&self) {
        dispatch!(self, unit => unit.clear())
    }

    fn rollback(&self) {
        dispatch!(self, unit => unit.rollback())
    }

    fn version(&self) -> u64 {
        dispatch!(self, unit => unit.version())
    }

    fn watch(&self, callback: Box<dyn Fn()>) -> Subscription {
        dispatch!(self, unit => unit.watch(callback))
    }
}

impl From<FormNode> for Control {
    fn from(node: FormNode) -> Self {
        Self::Node(node)
    }
}

impl From<FormLayer> for Control {
    fn from(layer: FormLayer) -> Self {
        Self::Layer(layer)
    }
}

impl From<FormList> for Control {
    fn from(list: FormList) -> Self {
        Self::List(list)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layer::LayerConfig;
    use crate::node::{NodeConfig, NodeKind};
    use indexmap::IndexMap;
    use rform_runtime::Scheduler;
    use std::cell::Cell;
    use std::rc::Rc;

    fn setup() -> (Scheduler, FormNode, Control) {
        let s = Scheduler::new();
        let mut config = NodeConfig::new(NodeKind::Number, 0);
        config.scheduler = Some(s.clone());
        let node = FormNode::new(config);
        let mut controls = IndexMap::new();
        controls.insert("n".to_string(), Control::from(node.clone()));
        let layer = Control::from(FormLayer::new(LayerConfig::default(), controls));
        (s, node, layer)
    }

    #[test]
    fn signals_recompute_after_debounce() {
        let (s, node, layer) = setup();
        let changed = layer.changed_signal();
        let touched = layer.touched_signal();
        assert!(!changed.get());
        node.set_value(Value::from(3));
        assert!(touched.get());
        assert!(!changed.get());
        s.flush();
        assert!(changed.get());
        assert_eq!(layer.debounced_signal().get(), Value::object([("n", 3)]));
    }

    #[test]
    fn watch_fires_for_descendants() {
        let (_s, node, layer) = setup();
        let hits = Rc::new(Cell::new(0));
        let h = Rc::clone(&hits);
        let _sub = layer.watch(Box::new(move || h.set(h.get() + 1)));
        node.disable();
        assert!(hits.get() > 0);
        assert!(layer.as_layer().is_some());
        assert!(layer.as_node().is_none());
    }

    #[test]
    fn duplicate_is_not_shared() {
        let (_s, _node, layer) = setup();
        let copy = layer.duplicate();
        assert!(!copy.ptr_eq(&layer));
        assert!(layer.ptr_eq(&layer.clone()));
    }
}
