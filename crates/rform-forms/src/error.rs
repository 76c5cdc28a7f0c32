#![forbid(unsafe_code)]

//! Validation entries and misuse errors.
//!
//! Validation problems are data: [`ValidationEntry`] values threaded through
//! each unit's `errors()`/`warnings()` and never raised. [`FormError`] is
//! reserved for misuse of the imperative API, which indicates an integration
//! bug rather than a user-input problem.
//!
//! # Failure Modes
//!
//! | Failure | Cause | Behavior |
//! |---------|-------|----------|
//! | `FormError::Invalid` | `get_valid_value` on an invalid unit | Returned, entries attached |
//! | `FormError::WrongKind` | `try_toggle` on a non-bool node | Returned; `toggle` logs instead |
//! | Structural mismatch | Non-object patch on a layer, non-list on a list | Skipped, logged at debug |

use std::fmt;

use rform_core::{FieldPath, PathSegment, UnitId};

use crate::node::NodeKind;

/// A message attached to the unit it came from and its path below the unit
/// being inspected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationEntry {
    pub message: String,
    /// Root-to-leaf path relative to the unit whose list this entry is in.
    pub path: FieldPath,
    /// Unit whose validator produced the message.
    pub unit: UnitId,
}

impl ValidationEntry {
    pub fn new(message: impl Into<String>, unit: UnitId) -> Self {
        Self {
            message: message.into(),
            path: FieldPath::root(),
            unit,
        }
    }

    /// Prefix the path with a parent segment.
    #[must_use]
    pub fn prefixed(mut self, segment: PathSegment) -> Self {
        self.path.prepend(segment);
        self
    }
}

impl fmt::Display for ValidationEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            f.write_str(&self.message)
        } else {
            write!(f, "{}: {}", self.path, self.message)
        }
    }
}

/// Errors raised by misuse of the form API.
#[derive(Debug, Clone, PartialEq)]
pub enum FormError {
    /// A valid value was requested from a unit that is not valid.
    Invalid { errors: Vec<ValidationEntry> },
    /// An operation required a node of a different kind.
    WrongKind { expected: NodeKind, found: NodeKind },
}

impl fmt::Display for FormError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Invalid { errors } => {
                write!(f, "form is invalid ({} error", errors.len())?;
                if errors.len() != 1 {
                    f.write_str("s")?;
                }
                f.write_str(")")?;
                if let Some(first) = errors.first() {
                    write!(f, ": {first}")?;
                }
                Ok(())
            }
            Self::WrongKind { expected, found } => {
                write!(f, "expected a {expected:?} node, found {found:?}")
            }
        }
    }
}

impl std::error::Error for FormError {}

/// Result type for form operations that can be misused.
pub type FormResult<T> = Result<T, FormError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_display_includes_path() {
        let unit = UnitId::next();
        let entry = ValidationEntry::new("too short", unit)
            .prefixed("name".into())
            .prefixed(PathSegment::Index(1))
            .prefixed("people".into());
        assert_eq!(entry.to_string(), "people[1].name: too short");
        assert_eq!(entry.unit, unit);
    }

    #[test]
    fn invalid_display_counts() {
        let unit = UnitId::next();
        let err = FormError::Invalid {
            errors: vec![
                ValidationEntry::new("a", unit),
                ValidationEntry::new("b", unit),
            ],
        };
        assert_eq!(err.to_string(), "form is invalid (2 errors): a");
    }

    #[test]
    fn wrong_kind_display() {
        let err = FormError::WrongKind {
            expected: NodeKind::Bool,
            found: NodeKind::Text,
        };
        assert_eq!(err.to_string(), "expected a Bool node, found Text");
    }
}
