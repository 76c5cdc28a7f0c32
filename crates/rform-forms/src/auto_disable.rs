#![forbid(unsafe_code)]

//! Declarative disable rules.
//!
//! An [`AutoDisable`] maps child keys to predicates over the parent's
//! mirrored (debounced) value. Applying the rules sets each child's
//! disabled flag to its predicate's answer. [`AutoDisable::watch`] re-applies
//! them whenever the parent changes, for as long as the returned guard
//! lives.
//!
//! Rules can target one layer, or every element of a list, in which case
//! each element is judged against its own value.
//!
//! # Invariants
//!
//! 1. Re-entrant notifications raised while rules are being applied are
//!    folded into another pass rather than recursing.
//! 2. Rules that never settle (a child's own fallback flipping its own
//!    rule) stop after [`MAX_PASSES`] passes with a warning.

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

use rform_core::Value;
use rform_runtime::SubscriptionScope;

use crate::layer::FormLayer;
use crate::list::FormList;
use crate::memo::MemoTree;
use crate::unit::FormUnit;

/// Upper bound on consecutive passes triggered by one change.
pub const MAX_PASSES: usize = 8;

type Predicate = Rc<dyn Fn(&Value) -> bool>;

enum Target {
    Layer { layer: FormLayer, memo: MemoTree },
    Elements(FormList),
}

struct RuleSet {
    target: Target,
    rules: Vec<(String, Predicate)>,
    applying: Cell<bool>,
    dirty: Cell<bool>,
}

impl RuleSet {
    fn apply_to(&self, layer: &FormLayer, mirrored: &Value) -> usize {
        let mut flipped = 0;
        for (key, predicate) in &self.rules {
            let Some(control) = layer.control(key) else {
                tracing::debug!(key = %key, "auto-disable rule targets a missing key");
                continue;
            };
            let want = predicate(mirrored);
            if control.is_disabled() != want {
                control.set_disabled(want);
                flipped += 1;
            }
        }
        flipped
    }

    fn pass(&self) -> usize {
        match &self.target {
            Target::Layer { layer, memo } => self.apply_to(layer, &memo.value()),
            Target::Elements(list) => list
                .controls()
                .iter()
                .map(|element| self.apply_to(element, &element.value()))
                .sum(),
        }
    }

    fn run(&self) -> usize {
        if self.applying.replace(true) {
            self.dirty.set(true);
            return 0;
        }
        let mut flipped = 0;
        let mut passes = 0;
        loop {
            self.dirty.set(false);
            flipped += self.pass();
            passes += 1;
            if !self.dirty.get() {
                break;
            }
            if passes >= MAX_PASSES {
                tracing::warn!(passes, "auto-disable rules did not settle");
                break;
            }
        }
        self.applying.set(false);
        flipped
    }
}

/// A set of disable rules over one container.
pub struct AutoDisable {
    rules: RuleSet,
}

impl fmt::Debug for AutoDisable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let keys: Vec<&str> = self.rules.rules.iter().map(|(k, _)| k.as_str()).collect();
        f.debug_struct("AutoDisable").field("keys", &keys).finish()
    }
}

impl AutoDisable {
    /// Rules over the children of `layer`, judged against its value.
    pub fn for_layer(layer: &FormLayer) -> Self {
        Self::with_target(Target::Layer {
            layer: layer.clone(),
            memo: MemoTree::of_layer(layer),
        })
    }

    /// Rules over the children of every element of `list`, each judged
    /// against its own element's value.
    pub fn for_elements(list: &FormList) -> Self {
        Self::with_target(Target::Elements(list.clone()))
    }

    fn with_target(target: Target) -> Self {
        Self {
            rules: RuleSet {
                target,
                rules: Vec::new(),
                applying: Cell::new(false),
                dirty: Cell::new(false),
            },
        }
    }

    /// Disable child `key` whenever `predicate` holds.
    #[must_use]
    pub fn rule(mut self, key: impl Into<String>, predicate: impl Fn(&Value) -> bool + 'static) -> Self {
        self.rules.rules.push((key.into(), Rc::new(predicate)));
        self
    }

    /// Apply every rule once. Returns how many flags flipped.
    pub fn apply(&self) -> usize {
        self.rules.run()
    }

    /// Apply now and again on every change until the guard drops.
    pub fn watch(self) -> AutoDisableGuard {
        let rules = Rc::new(self.rules);
        let mut scope = SubscriptionScope::new();
        let trigger = match &rules.target {
            Target::Layer { layer, .. } => layer.trigger().clone(),
            Target::Elements(list) => list.trigger().clone(),
        };
        let handle = Rc::clone(&rules);
        scope.on_fire(&trigger, move || {
            handle.run();
        });
        rules.run();
        AutoDisableGuard {
            _scope: scope,
            rules,
        }
    }
}

/// Keeps watched rules active.
#[must_use = "dropping the guard stops the rules"]
pub struct AutoDisableGuard {
    _scope: SubscriptionScope,
    rules: Rc<RuleSet>,
}

impl AutoDisableGuard {
    /// Re-apply immediately.
    pub fn apply(&self) -> usize {
        self.rules.run()
    }
}

impl fmt::Debug for AutoDisableGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AutoDisableGuard")
            .field("rules", &self.rules.rules.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::Control;
    use crate::layer::LayerConfig;
    use crate::list::ListConfig;
    use crate::node::{FormNode, NodeConfig, NodeKind};
    use indexmap::IndexMap;
    use rform_runtime::Scheduler;

    fn newsletter(s: &Scheduler) -> (FormNode, FormNode, FormLayer) {
        let mut flag = NodeConfig::new(NodeKind::Bool, false);
        flag.scheduler = Some(s.clone());
        let mut email = NodeConfig::new(NodeKind::Email, "");
        email.scheduler = Some(s.clone());
        let (flag, email) = (FormNode::new(flag), FormNode::new(email));
        let mut controls = IndexMap::new();
        controls.insert("subscribe".to_string(), Control::from(flag.clone()));
        controls.insert("email".to_string(), Control::from(email.clone()));
        (flag, email, FormLayer::new(LayerConfig::default(), controls))
    }

    fn unsubscribed(v: &Value) -> bool {
        v.get("subscribe").and_then(Value::as_bool) != Some(true)
    }

    #[test]
    fn apply_sets_flags_once() {
        let s = Scheduler::new();
        let (_, email, layer) = newsletter(&s);
        let rules = AutoDisable::for_layer(&layer).rule("email", unsubscribed);
        assert_eq!(rules.apply(), 1);
        assert!(email.is_disabled());
        assert_eq!(rules.apply(), 0);
    }

    #[test]
    fn watch_tracks_debounced_parent() {
        let s = Scheduler::new();
        let (flag, email, layer) = newsletter(&s);
        let guard = AutoDisable::for_layer(&layer).rule("email", unsubscribed).watch();
        assert!(email.is_disabled());
        flag.toggle();
        assert!(email.is_disabled());
        s.flush();
        assert!(!email.is_disabled());
        drop(guard);
        flag.toggle();
        s.advance(rform_runtime::Duration::from_millis(500));
        assert!(!email.is_disabled());
    }

    #[test]
    fn element_rules_judge_each_element() {
        let s = Scheduler::new();
        let (_, _, template) = newsletter(&s);
        let list = FormList::new(template, ListConfig::default());
        let _guard = AutoDisable::for_elements(&list).rule("email", unsubscribed).watch();
        let on = list.add_element(Some(Value::object([("subscribe", true)])));
        let off = list.add_element(Some(Value::object([("subscribe", false)])));
        let disabled = |layer: &FormLayer| layer.control("email").is_some_and(|c| c.is_disabled());
        assert!(!disabled(&on));
        assert!(disabled(&off));
    }

    #[test]
    fn self_referential_rule_stops() {
        let s = Scheduler::new();
        let (_, _, layer) = newsletter(&s);
        let mut echo = NodeConfig::new(NodeKind::Text, "live");
        echo.scheduler = Some(s.clone());
        echo.disabled_default = Some("off".into());
        let echo = FormNode::new(echo);
        layer.set_control("echo", echo.clone());
        let guard = AutoDisable::for_layer(&layer)
            .rule("echo", |v: &Value| v.get("echo") == Some(&Value::from("live")))
            .watch();
        assert!(!echo.is_disabled());
        assert_eq!(guard.apply(), MAX_PASSES);
    }
}
