#![forbid(unsafe_code)]

//! Select nodes: a node of kind [`NodeKind::Select`] plus an item source.
//!
//! Items come from a fixed list or from an [`Observable`] the host updates
//! as options load. Each item maps to an option through `bind_value` and
//! `bind_label`; without them the item itself is the value and its display
//! form the label. Validation is the plain node pipeline.

use std::fmt;
use std::rc::Rc;

use rform_core::Value;
use rform_runtime::Observable;

use crate::node::{FormNode, NodeKind};

/// Where a select's items come from.
#[derive(Clone)]
pub enum ItemSource {
    Static(Vec<Value>),
    Stream(Observable<Vec<Value>>),
}

impl ItemSource {
    pub fn current(&self) -> Vec<Value> {
        match self {
            Self::Static(items) => items.clone(),
            Self::Stream(items) => items.get(),
        }
    }
}

impl fmt::Debug for ItemSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Static(items) => f.debug_tuple("Static").field(&items.len()).finish(),
            Self::Stream(items) => f.debug_tuple("Stream").field(&items.version()).finish(),
        }
    }
}

impl From<Vec<Value>> for ItemSource {
    fn from(items: Vec<Value>) -> Self {
        Self::Static(items)
    }
}

impl From<Observable<Vec<Value>>> for ItemSource {
    fn from(items: Observable<Vec<Value>>) -> Self {
        Self::Stream(items)
    }
}

/// Select-specific configuration.
#[derive(Clone)]
pub struct SelectConfig {
    pub items: ItemSource,
    pub bind_value: Option<Rc<dyn Fn(&Value) -> Value>>,
    pub bind_label: Option<Rc<dyn Fn(&Value) -> String>>,
    /// Whether the selection can be cleared. Defaults to true for multi
    /// selects and nullable single selects.
    pub clearable: Option<bool>,
    /// Hide the field while there are no items.
    pub hide_when_empty: bool,
}

impl SelectConfig {
    pub fn new(items: impl Into<ItemSource>) -> Self {
        Self {
            items: items.into(),
            bind_value: None,
            bind_label: None,
            clearable: None,
            hide_when_empty: false,
        }
    }
}

impl fmt::Debug for SelectConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SelectConfig")
            .field("items", &self.items)
            .field("bind_value", &self.bind_value.is_some())
            .field("bind_label", &self.bind_label.is_some())
            .field("clearable", &self.clearable)
            .field("hide_when_empty", &self.hide_when_empty)
            .finish()
    }
}

/// One selectable entry.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectOption {
    pub value: Value,
    pub label: String,
    pub item: Value,
}

impl FormNode {
    fn select_config(&self) -> Option<&SelectConfig> {
        self.inner.config.select.as_ref()
    }

    pub fn is_select(&self) -> bool {
        matches!(self.kind(), NodeKind::Select { .. })
    }

    pub fn is_multiple(&self) -> bool {
        matches!(self.kind(), NodeKind::Select { multiple: true })
    }

    /// Current items; empty for non-select nodes.
    pub fn items(&self) -> Vec<Value> {
        self.select_config()
            .map(|s| s.items.current())
            .unwrap_or_default()
    }

    /// Items mapped through the value and label bindings.
    pub fn options(&self) -> Vec<SelectOption> {
        let Some(config) = self.select_config() else {
            return Vec::new();
        };
        config
            .items
            .current()
            .into_iter()
            .map(|item| SelectOption {
                value: config
                    .bind_value
                    .as_ref()
                    .map_or_else(|| item.clone(), |bind| bind(&item)),
                label: config
                    .bind_label
                    .as_ref()
                    .map_or_else(|| item.to_string(), |bind| bind(&item)),
                item,
            })
            .collect()
    }

    /// The option whose value equals the live state, for single selects.
    pub fn selected_option(&self) -> Option<SelectOption> {
        let current = self.state()?;
        self.options().into_iter().find(|o| o.value == current)
    }

    pub fn clearable(&self) -> bool {
        self.select_config()
            .and_then(|s| s.clearable)
            .unwrap_or(self.inner.config.nullable || self.is_multiple())
    }

    /// Whether a presentation layer should hide the field.
    pub fn should_hide(&self) -> bool {
        self.select_config()
            .is_some_and(|s| s.hide_when_empty && s.items.current().is_empty())
    }
}
