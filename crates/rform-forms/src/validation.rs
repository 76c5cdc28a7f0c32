#![forbid(unsafe_code)]

//! Validator pipeline.
//!
//! A validator maps a value to zero, one, or many messages. The pipeline
//! lazily concatenates every validator's output in order, skipping empty
//! results. Error and warning validators share this pipeline; only the
//! consumer decides whether a message blocks submission.

use std::fmt;
use std::rc::Rc;

use rform_core::Value;

/// Output of a single validator.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Messages {
    #[default]
    None,
    One(String),
    Many(Vec<String>),
}

impl Messages {
    pub fn is_empty(&self) -> bool {
        match self {
            Self::None => true,
            Self::One(_) => false,
            Self::Many(all) => all.is_empty(),
        }
    }
}

impl IntoIterator for Messages {
    type Item = String;
    type IntoIter = std::vec::IntoIter<String>;

    fn into_iter(self) -> Self::IntoIter {
        match self {
            Self::None => Vec::new().into_iter(),
            Self::One(msg) => vec![msg].into_iter(),
            Self::Many(all) => all.into_iter(),
        }
    }
}

impl From<()> for Messages {
    fn from(_: ()) -> Self {
        Self::None
    }
}

impl From<&str> for Messages {
    fn from(msg: &str) -> Self {
        Self::One(msg.to_string())
    }
}

impl From<String> for Messages {
    fn from(msg: String) -> Self {
        Self::One(msg)
    }
}

impl<T: Into<Messages>> From<Option<T>> for Messages {
    fn from(opt: Option<T>) -> Self {
        opt.map_or(Self::None, Into::into)
    }
}

impl From<Vec<String>> for Messages {
    fn from(all: Vec<String>) -> Self {
        Self::Many(all)
    }
}

impl From<Vec<&str>> for Messages {
    fn from(all: Vec<&str>) -> Self {
        Self::Many(all.into_iter().map(str::to_string).collect())
    }
}

/// A shareable validator over form values.
#[derive(Clone)]
pub struct Validator {
    check: Rc<dyn Fn(&Value) -> Messages>,
}

impl Validator {
    /// Wrap a closure returning anything convertible into [`Messages`]
    /// (`Option<&str>`, `String`, `Vec<String>`, `()`...).
    pub fn new<R: Into<Messages>>(check: impl Fn(&Value) -> R + 'static) -> Self {
        Self {
            check: Rc::new(move |v| check(v).into()),
        }
    }

    pub fn check(&self, value: &Value) -> Messages {
        (self.check)(value)
    }
}

impl fmt::Debug for Validator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Validator").finish_non_exhaustive()
    }
}

/// Run `validators` against `value`, yielding messages lazily and in order.
pub fn process<'a>(
    validators: &'a [Validator],
    value: &'a Value,
) -> impl Iterator<Item = String> + 'a {
    validators.iter().flat_map(move |v| v.check(value))
}

// ---------------------------------------------------------------------------
// Stock validators
// ---------------------------------------------------------------------------

/// Text must have at least `min` characters. Non-text passes.
pub fn min_length(min: usize) -> Validator {
    Validator::new(move |v: &Value| {
        v.as_str()
            .filter(|s| s.chars().count() < min)
            .map(|_| format!("must be at least {min} characters"))
    })
}

/// Text must have at most `max` characters. Non-text passes.
pub fn max_length(max: usize) -> Validator {
    Validator::new(move |v: &Value| {
        v.as_str()
            .filter(|s| s.chars().count() > max)
            .map(|_| format!("must be at most {max} characters"))
    })
}

/// Numbers must lie within `[min, max]`. Non-numbers pass.
pub fn range(min: f64, max: f64) -> Validator {
    Validator::new(move |v: &Value| {
        v.as_f64()
            .filter(|x| *x < min || *x > max)
            .map(|_| format!("must be between {min} and {max}"))
    })
}

/// Value must not be blank (null, whitespace text, empty list).
pub fn not_blank() -> Validator {
    Validator::new(|v: &Value| v.is_blank().then_some("must not be empty"))
}
