//! Canopy tree model
//!
//! The in-memory hierarchical entity representation every other canopy crate
//! reads. Nodes carry coded-path fields and tagged child collections; the
//! engine mutates field values in place between execution levels.

pub mod node;
pub mod value;

pub use node::{ChildGroup, Field, Tree, TreeNode};
pub use value::{FieldType, Value, SENTINEL_DATE, SENTINEL_DATETIME, SENTINEL_TIME};
