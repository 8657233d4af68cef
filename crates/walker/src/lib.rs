//! Recursive address-space walks.
//!
//! This crate expands the subtree under a node into a flat list of the
//! variables it contains:
//! - Depth-bounded, depth-first traversal over hierarchical references
//! - Dotted browse-name paths
//! - Fail-fast or collect-and-continue error handling
//! - Optional sibling fan-out on worker threads

pub mod descriptor;
pub mod path;
pub mod policy;
pub mod walker;

pub use descriptor::{BranchError, VariableDescriptor, WalkReport};
pub use policy::{ErrorPolicy, Fanout, WalkConfig, Writability};
pub use walker::TreeWalker;
