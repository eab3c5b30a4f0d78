//! Error types for value-tree operations.

use thiserror::Error;

/// Errors raised while turning a field name into a [`FieldPath`](crate::FieldPath).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathError {
    /// The field name was the empty string.
    #[error("field name must not be empty")]
    Empty,

    /// Two separators in a row, or a leading/trailing separator.
    #[error("field name '{name}' has an empty segment at position {position}")]
    EmptySegment { name: String, position: usize },

    /// A backslash at the very end of the name.
    #[error("field name '{name}' ends with a dangling escape")]
    DanglingEscape { name: String },

    /// A backslash followed by something other than `.` or `\`.
    #[error("field name '{name}' contains unsupported escape '\\{found}'")]
    InvalidEscape { name: String, found: char },
}

/// Errors raised while converting a value tree to another representation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValueError {
    /// The tree references one of its own ancestors.
    #[error("value tree contains a cycle and cannot be serialized")]
    Cycle,

    /// The tree is nested deeper than a serializer may follow.
    #[error("value tree exceeds the nesting limit of {limit}")]
    TooDeep { limit: usize },
}

/// Result type alias for path parsing.
pub type Result<T> = std::result::Result<T, PathError>;
