//! Value tree and field paths for form state.
//!
//! This crate holds the data side of a form: the nested [`Value`] tree, the
//! [`FieldPath`] addressing scheme used by field names, and the tree utilities
//! the engine is built on.
//!
//! # Features
//!
//! - Shared mapping/array nodes, so one subtree can be reachable from two parents
//! - Iterative [`deep_clone`] that preserves sharing and survives cycles
//! - Copy-on-write nested reads and writes ([`get_nested_value`], [`set_nested_value`])
//! - Structural equality and a leaf-level diff ([`deep_equal`], [`changed_leaves`])
//! - Lossless-enough conversion to and from `serde_json`
//!
//! # Example
//!
//! ```
//! use formstate_value::{FieldPath, Value, get_nested_value, set_nested_value};
//!
//! let tree = Value::empty_map();
//! let path = FieldPath::parse("contact.email").unwrap();
//! let updated = set_nested_value(&tree, &path, Value::from("ana@example.com"));
//!
//! assert_eq!(get_nested_value(&updated, &path), Some(Value::from("ana@example.com")));
//! assert_eq!(get_nested_value(&tree, &path), None);
//! ```

mod access;
mod clone;
mod compare;
mod error;
mod json;
mod path;
mod value;

// Re-export error types
pub use error::{PathError, Result, ValueError};

// Re-export core types
pub use path::FieldPath;
pub use value::{Map, Node, Pattern, Value};

// Re-export tree utilities
pub use access::{delete_nested_field, get_nested_value, set_nested_value};
pub use clone::deep_clone;
pub use compare::{changed_leaves, deep_equal};
pub use json::SERIALIZE_DEPTH_LIMIT;
