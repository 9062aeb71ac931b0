//! Schema types

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Storage kind of a column
///
/// `Null` means "no non-null observation yet" and never becomes a
/// persisted column kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScalarKind {
    Null,
    Boolean,
    Integer,
    Float,
    Date,
    DateTime,
    String,
}

impl ScalarKind {
    /// All persistable kinds, most permissive first
    pub const PRECEDENCE: [ScalarKind; 6] = [
        ScalarKind::String,
        ScalarKind::DateTime,
        ScalarKind::Date,
        ScalarKind::Float,
        ScalarKind::Integer,
        ScalarKind::Boolean,
    ];

    /// Position in the precedence order; higher is more permissive
    pub fn rank(self) -> u8 {
        match self {
            ScalarKind::Null => 0,
            ScalarKind::Boolean => 1,
            ScalarKind::Integer => 2,
            ScalarKind::Float => 3,
            ScalarKind::Date => 4,
            ScalarKind::DateTime => 5,
            ScalarKind::String => 6,
        }
    }

    /// Returns true if this kind is numeric (booleans count as 0/1)
    pub fn is_numeric(self) -> bool {
        matches!(
            self,
            ScalarKind::Boolean | ScalarKind::Integer | ScalarKind::Float
        )
    }

    /// Returns true if this kind is temporal
    pub fn is_temporal(self) -> bool {
        matches!(self, ScalarKind::Date | ScalarKind::DateTime)
    }

    /// Check if this kind can be persisted as a column
    pub fn is_persistable(self) -> bool {
        self != ScalarKind::Null
    }

    /// Promote two observed kinds to their least common, more permissive kind
    ///
    /// Null is the identity. Numeric kinds widen within themselves, as do
    /// temporal kinds; any other mix has no safe shared representation and
    /// becomes String.
    #[must_use]
    pub fn promote(self, other: ScalarKind) -> ScalarKind {
        match (self, other) {
            (a, b) if a == b => a,
            (ScalarKind::Null, other) | (other, ScalarKind::Null) => other,
            (a, b) if a.is_numeric() && b.is_numeric() => a.max(b),
            (a, b) if a.is_temporal() && b.is_temporal() => ScalarKind::DateTime,
            _ => ScalarKind::String,
        }
    }
}

impl PartialOrd for ScalarKind {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ScalarKind {
    fn cmp(&self, other: &Self) -> Ordering {
        self.rank().cmp(&other.rank())
    }
}

impl std::fmt::Display for ScalarKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScalarKind::Null => write!(f, "null"),
            ScalarKind::Boolean => write!(f, "boolean"),
            ScalarKind::Integer => write!(f, "integer"),
            ScalarKind::Float => write!(f, "float"),
            ScalarKind::Date => write!(f, "date"),
            ScalarKind::DateTime => write!(f, "datetime"),
            ScalarKind::String => write!(f, "string"),
        }
    }
}
