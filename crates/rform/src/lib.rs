#![forbid(unsafe_code)]

//! rform public facade crate.
//!
//! Re-exports the value model, the runtime primitives, and the form tree
//! from the internal crates, plus a prelude for day-to-day use.

// --- Core re-exports -------------------------------------------------------

pub use rform_core::{Date, FieldPath, FileRef, PathSegment, UnitId, Value, ValueKind, ValueMap};

// --- Runtime re-exports ----------------------------------------------------

pub use rform_runtime::{
    BatchScope, Computed, DebounceConfig, Duration, Emitter, Observable, Scheduler, Subscription,
    Trigger,
};

// --- Form re-exports -------------------------------------------------------

pub use rform_forms::{
    AutoDisable, AutoDisableGuard, Control, Form, FormError, FormLayer, FormList, FormNode,
    FormResult, FormRoot, FormUnit, ItemSource, LayerConfig, ListConfig, MemoTree, Messages,
    NodeAction, NodeConfig, NodeKind, NodeMeta, RootConfig, SelectConfig, SelectOption,
    ToggleOutcome, ValidationEntry, Validator,
};

/// Stock validators.
pub mod validators {
    pub use rform_forms::validation::{max_length, min_length, not_blank, range};
}

// --- Prelude --------------------------------------------------------------

pub mod prelude {
    pub use crate::{
        Control, Form, FormError, FormLayer, FormList, FormNode, FormResult, FormRoot, FormUnit,
        Scheduler, Validator, Value,
    };
}
