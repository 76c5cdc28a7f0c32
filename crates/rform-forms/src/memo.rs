#![forbid(unsafe_code)]

//! Mirrored read-only signal trees.
//!
//! A [`MemoTree`] mirrors a container's debounced value into per-path
//! [`Computed`] signals. Each path is derived once and cached in a side
//! table owned by the tree, so repeated lookups share one derivation and
//! dropping the tree releases them all.

use std::cell::RefCell;
use std::fmt;

use indexmap::IndexMap;
use rform_core::{FieldPath, PathSegment, Value};
use rform_runtime::Computed;

use crate::layer::FormLayer;
use crate::list::FormList;

/// Per-path memoized views of one container's value.
pub struct MemoTree {
    source: Computed<Value>,
    table: RefCell<IndexMap<FieldPath, Computed<Value>>>,
}

impl fmt::Debug for MemoTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoTree")
            .field("entries", &self.table.borrow().len())
            .finish()
    }
}

fn lookup(value: &Value, path: &FieldPath) -> Value {
    let mut cursor = value;
    for segment in path.segments() {
        let next = match segment {
            PathSegment::Key(key) => cursor.get(key),
            PathSegment::Index(index) => cursor.at(*index),
        };
        match next {
            Some(next) => cursor = next,
            None => return Value::Null,
        }
    }
    cursor.clone()
}

impl MemoTree {
    pub fn new(source: Computed<Value>) -> Self {
        Self {
            source,
            table: RefCell::new(IndexMap::new()),
        }
    }

    pub fn of_layer(layer: &FormLayer) -> Self {
        Self::new(layer.value_signal())
    }

    pub fn of_list(list: &FormList) -> Self {
        Self::new(list.value_signal())
    }

    /// The mirrored container value.
    pub fn value(&self) -> Value {
        self.source.get()
    }

    /// Signal for the value at `path`; null where the path does not exist.
    pub fn at(&self, path: &FieldPath) -> Computed<Value> {
        if let Some(hit) = self.table.borrow().get(path) {
            return hit.clone();
        }
        let owned = path.clone();
        let signal = self.source.map(move |value| lookup(&value, &owned));
        self.table
            .borrow_mut()
            .insert(path.clone(), signal.clone());
        signal
    }

    pub fn field(&self, key: &str) -> Computed<Value> {
        self.at(&FieldPath::from_segments([PathSegment::Key(key.to_string())]))
    }

    pub fn index(&self, index: usize) -> Computed<Value> {
        self.at(&FieldPath::from_segments([PathSegment::Index(index)]))
    }

    /// Number of cached paths.
    pub fn len(&self) -> usize {
        self.table.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every cached path.
    pub fn clear(&self) {
        self.table.borrow_mut().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::Control;
    use crate::layer::LayerConfig;
    use crate::list::ListConfig;
    use crate::node::{FormNode, NodeConfig, NodeKind};
    use crate::unit::FormUnit;
    use rform_runtime::Scheduler;

    fn layer(s: &Scheduler) -> (FormNode, FormLayer) {
        let mut config = NodeConfig::new(NodeKind::Text, "");
        config.scheduler = Some(s.clone());
        let node = FormNode::new(config);
        let mut controls = IndexMap::new();
        controls.insert("name".to_string(), Control::from(node.clone()));
        (node, FormLayer::new(LayerConfig::default(), controls))
    }

    #[test]
    fn field_signals_are_cached_and_track_debounce() {
        let s = Scheduler::new();
        let (node, layer) = layer(&s);
        let memo = MemoTree::of_layer(&layer);
        let name = memo.field("name");
        let again = memo.field("name");
        assert_eq!(memo.len(), 1);
        assert_eq!(name.get(), Value::from(""));
        node.set_value("Ada".into());
        assert_eq!(again.get(), Value::from(""));
        s.flush();
        assert_eq!(name.get(), Value::from("Ada"));
        assert_eq!(memo.field("missing").get(), Value::Null);
    }

    #[test]
    fn list_indices_and_nested_paths() {
        let s = Scheduler::new();
        let (_, template) = layer(&s);
        let list = FormList::new(template, ListConfig::default());
        let memo = MemoTree::of_list(&list);
        list.append_elements([Value::object([("name", "x")])]);
        assert_eq!(memo.index(0).get(), Value::object([("name", "x")]));
        let path = FieldPath::from_segments([PathSegment::Index(0), "name".into()]);
        assert_eq!(memo.at(&path).get(), Value::from("x"));
        assert_eq!(list.value(), memo.value());
        memo.clear();
        assert!(memo.is_empty());
    }
}
