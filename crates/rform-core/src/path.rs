#![forbid(unsafe_code)]

//! Field paths and unit identity.
//!
//! Errors bubble from a leaf to the root; each composite prepends its own
//! segment while aggregating, so the finished path reads root-to-leaf.
//! Children never hold a reference to their parent.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// One step in a [`FieldPath`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PathSegment {
    /// Object key of a layer child.
    Key(String),
    /// Position of a list element.
    Index(usize),
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Key(key) => f.write_str(key),
            Self::Index(i) => write!(f, "[{i}]"),
        }
    }
}

impl From<&str> for PathSegment {
    fn from(key: &str) -> Self {
        Self::Key(key.to_string())
    }
}

impl From<usize> for PathSegment {
    fn from(index: usize) -> Self {
        Self::Index(index)
    }
}

/// Ordered root-to-leaf path of a unit inside a form tree.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FieldPath {
    segments: Vec<PathSegment>,
}

impl FieldPath {
    /// The empty path (the unit itself).
    #[must_use]
    pub fn root() -> Self {
        Self::default()
    }

    /// Build a path from segments in root-to-leaf order.
    pub fn from_segments(segments: impl IntoIterator<Item = PathSegment>) -> Self {
        Self {
            segments: segments.into_iter().collect(),
        }
    }

    /// Prepend a segment (used by a parent while aggregating its children).
    pub fn prepend(&mut self, segment: PathSegment) {
        self.segments.insert(0, segment);
    }

    /// Consuming variant of [`prepend`](Self::prepend).
    #[must_use]
    pub fn prefixed(mut self, segment: PathSegment) -> Self {
        self.prepend(segment);
        self
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Segments rendered as strings: keys verbatim, indices as `[i]`.
    pub fn to_strings(&self) -> Vec<String> {
        self.segments.iter().map(ToString::to_string).collect()
    }
}

impl fmt::Display for FieldPath {
    /// Dotted form: `list[2].field`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            match segment {
                PathSegment::Key(key) if i > 0 => write!(f, ".{key}")?,
                other => write!(f, "{other}")?,
            }
        }
        Ok(())
    }
}

/// Identity of a form unit, used to reference the unit an error came from
/// without holding it alive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UnitId(u64);

static NEXT_UNIT_ID: AtomicU64 = AtomicU64::new(1);

impl UnitId {
    /// Allocate a fresh, process-unique id.
    pub fn next() -> Self {
        Self(NEXT_UNIT_ID.fetch_add(1, Ordering::Relaxed))
    }

    #[inline]
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unit#{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prepend_builds_root_to_leaf() {
        let mut path = FieldPath::root();
        path.prepend("field".into());
        path.prepend(2usize.into());
        path.prepend("list".into());
        assert_eq!(path.to_strings(), vec!["list", "[2]", "field"]);
        assert_eq!(path.to_string(), "list[2].field");
    }

    #[test]
    fn leading_index_has_no_dot() {
        let path = FieldPath::from_segments([PathSegment::Index(0), "name".into()]);
        assert_eq!(path.to_string(), "[0].name");
        assert_eq!(path.len(), 2);
    }

    #[test]
    fn unit_ids_are_unique_and_increasing() {
        let a = UnitId::next();
        let b = UnitId::next();
        assert!(b > a);
        assert_ne!(a, b);
    }
}
