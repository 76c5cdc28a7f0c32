#![forbid(unsafe_code)]

//! rform forms
//!
//! A reactive tree of form units. Leaves ([`FormNode`]) hold one value each;
//! layers ([`FormLayer`]) aggregate keyed children into an object; lists
//! ([`FormList`]) hold a dynamic sequence of layers stamped from a template;
//! a root ([`FormRoot`]) adds a committed baseline and submit gating.
//!
//! # Key Components
//!
//! - [`FormUnit`] - the operations every unit answers: value views,
//!   validation, dirty/touched state, disable and reset semantics
//! - [`Form`] - builder factory for every unit kind
//! - [`Validator`] / [`Messages`] - user checks over a unit's value
//! - [`MemoTree`] / [`AutoDisable`] - derived read-only views and
//!   declarative disable rules
//!
//! # Timing
//!
//! Writes land in a node's live state at once and reach its value (and
//! every aggregate above it) after the debounce settles. Drive the
//! [`Scheduler`](rform_runtime::Scheduler) the nodes were built with to
//! advance time.

pub mod auto_disable;
pub mod control;
pub mod error;
pub mod form;
pub mod layer;
pub mod list;
pub mod memo;
pub mod node;
pub mod root;
pub mod select;
pub mod unit;
pub mod validation;

pub use auto_disable::{AutoDisable, AutoDisableGuard, MAX_PASSES};
pub use control::Control;
pub use error::{FormError, FormResult, ValidationEntry};
pub use form::{Form, LayerBuilder, ListBuilder, NodeBuilder, RootBuilder};
pub use layer::{FormLayer, LayerConfig};
pub use list::{FormList, ListConfig, ToggleOutcome};
pub use memo::MemoTree;
pub use node::{FormNode, NodeAction, NodeConfig, NodeKind, NodeMeta, REQUIRED_MESSAGE};
pub use root::{FormRoot, RootConfig};
pub use select::{ItemSource, SelectConfig, SelectOption};
pub use unit::FormUnit;
pub use validation::{Messages, Validator, max_length, min_length, not_blank, process, range};
