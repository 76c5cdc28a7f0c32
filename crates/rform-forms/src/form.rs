#![forbid(unsafe_code)]

//! Builder factory for form trees.
//!
//! ```ignore
//! use rform_forms::{Form, FormUnit};
//!
//! let root = Form::root()
//!     .control("name", Form::text("").required().label("Name"))
//!     .control("age", Form::number(0))
//!     .control(
//!         "pets",
//!         Form::list(Form::layer().control("kind", Form::text(""))).start_length(1),
//!     )
//!     .build();
//! root.reset(None);
//! ```

use indexmap::IndexMap;
use rform_core::{Date, Value};
use rform_runtime::{DebounceConfig, Observable, Scheduler};
use web_time::Duration;

use crate::control::Control;
use crate::layer::{FormLayer, LayerConfig};
use crate::list::{FormList, ListConfig};
use crate::node::{FormNode, NodeConfig, NodeKind};
use crate::root::{FormRoot, RootConfig};
use crate::select::{ItemSource, SelectConfig};
use crate::validation::{Messages, Validator};

/// Entry point for building form units.
#[derive(Debug, Clone, Copy)]
pub struct Form;

impl Form {
    pub fn node(kind: NodeKind, default: impl Into<Value>) -> NodeBuilder {
        NodeBuilder {
            config: NodeConfig::new(kind, default),
        }
    }

    pub fn text(default: impl Into<Value>) -> NodeBuilder {
        Self::node(NodeKind::Text, default)
    }

    pub fn number(default: impl Into<Value>) -> NodeBuilder {
        Self::node(NodeKind::Number, default)
    }

    pub fn bool(default: bool) -> NodeBuilder {
        Self::node(NodeKind::Bool, default)
    }

    pub fn date(default: Date) -> NodeBuilder {
        Self::node(NodeKind::Date, default)
    }

    /// File nodes start empty and are nullable.
    pub fn file() -> NodeBuilder {
        Self::node(NodeKind::File, Value::Null).nullable()
    }

    pub fn email(default: impl Into<Value>) -> NodeBuilder {
        Self::node(NodeKind::Email, default)
    }

    pub fn url(default: impl Into<Value>) -> NodeBuilder {
        Self::node(NodeKind::Url, default)
    }

    pub fn password(default: impl Into<Value>) -> NodeBuilder {
        Self::node(NodeKind::Password, default)
    }

    pub fn color(default: impl Into<Value>) -> NodeBuilder {
        Self::node(NodeKind::Color, default)
    }

    pub fn search(default: impl Into<Value>) -> NodeBuilder {
        Self::node(NodeKind::Search, default)
    }

    pub fn phone(default: impl Into<Value>) -> NodeBuilder {
        Self::node(NodeKind::Phone, default)
    }

    pub fn generic(default: impl Into<Value>) -> NodeBuilder {
        Self::node(NodeKind::Generic, default)
    }

    /// Single select; starts nullable with nothing selected.
    pub fn select(items: impl Into<ItemSource>) -> NodeBuilder {
        let mut builder = Self::node(NodeKind::Select { multiple: false }, Value::Null).nullable();
        builder.config.select = Some(SelectConfig::new(items));
        builder
    }

    /// Multi select; the value is a list, empty by default.
    pub fn multi_select(items: impl Into<ItemSource>) -> NodeBuilder {
        let mut builder = Self::node(NodeKind::Select { multiple: true }, Value::List(Vec::new()));
        builder.config.select = Some(SelectConfig::new(items));
        builder
    }

    /// Items fed by the host as they load.
    pub fn streamed_items() -> Observable<Vec<Value>> {
        Observable::new(Vec::new())
    }

    pub fn layer() -> LayerBuilder {
        LayerBuilder::default()
    }

    pub fn list(template: impl Into<FormLayer>) -> ListBuilder {
        ListBuilder {
            template: template.into(),
            config: ListConfig::default(),
        }
    }

    pub fn root() -> RootBuilder {
        RootBuilder::default()
    }
}

// ---------------------------------------------------------------------------
// Nodes
// ---------------------------------------------------------------------------

/// Builder for [`FormNode`], select nodes included.
#[derive(Debug, Clone)]
#[must_use]
pub struct NodeBuilder {
    config: NodeConfig,
}

impl NodeBuilder {
    pub fn nullable(mut self) -> Self {
        self.config.nullable = true;
        self
    }

    pub fn required(mut self) -> Self {
        self.config.required = true;
        self
    }

    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.config.default_value = value.into();
        self
    }

    /// State at construction and after `clear`.
    pub fn initial(mut self, value: impl Into<Value>) -> Self {
        self.config.initial = Some(value.into());
        self
    }

    pub fn disabled_default(mut self, value: impl Into<Value>) -> Self {
        self.config.disabled_default = Some(value.into());
        self
    }

    pub fn disabled(mut self) -> Self {
        self.config.disabled = true;
        self
    }

    pub fn validator<R: Into<Messages>>(mut self, check: impl Fn(&Value) -> R + 'static) -> Self {
        self.config.validators.push(Validator::new(check));
        self
    }

    /// Add a prebuilt validator, e.g. [`min_length`](crate::validation::min_length).
    pub fn check(mut self, validator: Validator) -> Self {
        self.config.validators.push(validator);
        self
    }

    pub fn warning<R: Into<Messages>>(mut self, check: impl Fn(&Value) -> R + 'static) -> Self {
        self.config.warnings.push(Validator::new(check));
        self
    }

    pub fn debounce(mut self, config: DebounceConfig) -> Self {
        self.config.debounce = config;
        self
    }

    pub fn debounce_window(self, window: Duration) -> Self {
        let config = self.config.debounce.with_window(window);
        self.debounce(config)
    }

    pub fn scheduler(mut self, scheduler: &Scheduler) -> Self {
        self.config.scheduler = Some(scheduler.clone());
        self
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.config.meta.label = Some(label.into());
        self
    }

    pub fn placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.config.meta.placeholder = Some(placeholder.into());
        self
    }

    pub fn tooltip(mut self, tooltip: impl Into<String>) -> Self {
        self.config.meta.tooltip = Some(tooltip.into());
        self
    }

    pub fn auto_complete(mut self, hint: impl Into<String>) -> Self {
        self.config.meta.auto_complete = Some(hint.into());
        self
    }

    pub fn readonly(mut self) -> Self {
        self.config.meta.readonly = true;
        self
    }

    pub fn show_disabled_field(mut self) -> Self {
        self.config.meta.show_disabled_field = true;
        self
    }

    // -- select options -----------------------------------------------------

    fn select_mut(&mut self, option: &'static str) -> Option<&mut SelectConfig> {
        if self.config.select.is_none() {
            tracing::warn!(option, kind = ?self.config.kind, "select option on a non-select node ignored");
        }
        self.config.select.as_mut()
    }

    pub fn bind_value(mut self, bind: impl Fn(&Value) -> Value + 'static) -> Self {
        if let Some(select) = self.select_mut("bind_value") {
            select.bind_value = Some(std::rc::Rc::new(bind));
        }
        self
    }

    pub fn bind_label(mut self, bind: impl Fn(&Value) -> String + 'static) -> Self {
        if let Some(select) = self.select_mut("bind_label") {
            select.bind_label = Some(std::rc::Rc::new(bind));
        }
        self
    }

    pub fn clearable(mut self, clearable: bool) -> Self {
        if let Some(select) = self.select_mut("clearable") {
            select.clearable = Some(clearable);
        }
        self
    }

    pub fn hide_when_empty(mut self) -> Self {
        if let Some(select) = self.select_mut("hide_when_empty") {
            select.hide_when_empty = true;
        }
        self
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    pub fn build(self) -> FormNode {
        FormNode::new(self.config)
    }
}

impl From<NodeBuilder> for Control {
    fn from(builder: NodeBuilder) -> Self {
        Control::Node(builder.build())
    }
}

// ---------------------------------------------------------------------------
// Layers
// ---------------------------------------------------------------------------

/// Builder for [`FormLayer`].
#[derive(Debug, Default)]
#[must_use]
pub struct LayerBuilder {
    config: LayerConfig,
    controls: IndexMap<String, Control>,
}

impl LayerBuilder {
    pub fn control(mut self, key: impl Into<String>, control: impl Into<Control>) -> Self {
        self.controls.insert(key.into(), control.into());
        self
    }

    pub fn nullable(mut self) -> Self {
        self.config.nullable = true;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.config.disabled = true;
        self
    }

    pub fn disabled_default(mut self, value: impl Into<Value>) -> Self {
        self.config.disabled_default = Some(value.into());
        self
    }

    pub fn validator<R: Into<Messages>>(mut self, check: impl Fn(&Value) -> R + 'static) -> Self {
        self.config.validators.push(Validator::new(check));
        self
    }

    pub fn warning<R: Into<Messages>>(mut self, check: impl Fn(&Value) -> R + 'static) -> Self {
        self.config.warnings.push(Validator::new(check));
        self
    }

    pub fn build(self) -> FormLayer {
        FormLayer::new(self.config, self.controls)
    }
}

impl From<LayerBuilder> for FormLayer {
    fn from(builder: LayerBuilder) -> Self {
        builder.build()
    }
}

impl From<LayerBuilder> for Control {
    fn from(builder: LayerBuilder) -> Self {
        Control::Layer(builder.build())
    }
}

// ---------------------------------------------------------------------------
// Lists
// ---------------------------------------------------------------------------

/// Builder for [`FormList`].
#[derive(Debug)]
#[must_use]
pub struct ListBuilder {
    template: FormLayer,
    config: ListConfig,
}

impl ListBuilder {
    pub fn start_length(mut self, start_length: usize) -> Self {
        self.config.start_length = start_length;
        self
    }

    pub fn nullable(mut self) -> Self {
        self.config.nullable = true;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.config.disabled = true;
        self
    }

    pub fn disabled_default(mut self, value: impl Into<Value>) -> Self {
        self.config.disabled_default = Some(value.into());
        self
    }

    pub fn validator<R: Into<Messages>>(mut self, check: impl Fn(&Value) -> R + 'static) -> Self {
        self.config.validators.push(Validator::new(check));
        self
    }

    pub fn warning<R: Into<Messages>>(mut self, check: impl Fn(&Value) -> R + 'static) -> Self {
        self.config.warnings.push(Validator::new(check));
        self
    }

    /// Replace the configuration wholesale, e.g. one loaded from settings.
    pub fn config(mut self, config: ListConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> FormList {
        FormList::new(self.template, self.config)
    }
}

impl From<ListBuilder> for Control {
    fn from(builder: ListBuilder) -> Self {
        Control::List(builder.build())
    }
}

// ---------------------------------------------------------------------------
// Roots
// ---------------------------------------------------------------------------

/// Builder for [`FormRoot`].
#[derive(Debug, Default)]
#[must_use]
pub struct RootBuilder {
    layer: LayerBuilder,
    config: RootConfig,
}

impl RootBuilder {
    pub fn control(mut self, key: impl Into<String>, control: impl Into<Control>) -> Self {
        self.layer = self.layer.control(key, control);
        self
    }

    /// Root-level error generator over the aggregated value.
    pub fn generate_error<R: Into<Messages>>(mut self, check: impl Fn(&Value) -> R + 'static) -> Self {
        self.config.generate_error = Some(Validator::new(check));
        self
    }

    /// Root-level warning generator over the aggregated value.
    pub fn generate_warning<R: Into<Messages>>(mut self, check: impl Fn(&Value) -> R + 'static) -> Self {
        self.config.generate_warning = Some(Validator::new(check));
        self
    }

    pub fn build(self) -> FormRoot {
        FormRoot::new(self.layer.build(), self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::REQUIRED_MESSAGE;
    use crate::unit::FormUnit;

    #[test]
    fn builds_nested_tree() {
        let s = Scheduler::new();
        let root = Form::root()
            .control("name", Form::text("").required().label("Name").scheduler(&s))
            .control(
                "tags",
                Form::list(Form::layer().control("tag", Form::text("").scheduler(&s)))
                    .start_length(2),
            )
            .build();
        assert_eq!(root.layer().keys(), vec!["name", "tags"]);
        assert_eq!(root.list("tags").map(|l| l.length()), Some(2));
        assert_eq!(
            root.node("name").and_then(|n| n.meta().label.clone()),
            Some("Name".to_string())
        );
        let errors = root.errors();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].to_string(), format!("name: {REQUIRED_MESSAGE}"));
    }

    #[test]
    fn select_defaults() {
        let single = Form::select(vec![Value::from("a")]).build();
        assert!(single.nullable());
        assert_eq!(single.value(), Value::Null);
        let multi = Form::multi_select(vec![Value::from("a")]).build();
        assert!(!multi.nullable());
        assert_eq!(multi.value(), Value::List(Vec::new()));
        assert!(multi.clearable());
    }

    #[test]
    fn select_options_on_plain_node_are_ignored() {
        let builder = Form::text("").clearable(true).hide_when_empty();
        assert!(builder.config().select.is_none());
    }

    #[test]
    fn debounce_window_override() {
        let s = Scheduler::new();
        let node = Form::number(0)
            .debounce_window(Duration::ZERO)
            .scheduler(&s)
            .build();
        node.set_value(Value::from(1));
        node.set_value(Value::from(2));
        s.flush();
        assert_eq!(node.value(), Value::from(2));
        assert!(!node.is_settling());
    }
}
