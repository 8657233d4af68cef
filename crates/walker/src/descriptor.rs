//! Walk results.

use std::fmt;

use corelib::{Error, NodeId};
use serde::Serialize;

/// A variable found during a walk.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct VariableDescriptor {
    pub node_id: NodeId,
    /// Browse names from the walk root down to this node, joined with `.`.
    pub path: String,
    pub description: String,
    pub writable: bool,
    /// Always `None`: resolving the data type needs a type dictionary this
    /// crate does not model.
    pub data_type: Option<NodeId>,
}

impl VariableDescriptor {
    /// Marker printed in place of an unresolved data type.
    pub const UNKNOWN_DATA_TYPE: &'static str = "???";
}

impl fmt::Display for VariableDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{{{} {} {:?} {} ",
            self.node_id, self.path, self.description, self.writable
        )?;
        match &self.data_type {
            Some(id) => write!(f, "{}}}", id),
            None => write!(f, "{}}}", Self::UNKNOWN_DATA_TYPE),
        }
    }
}

/// A branch that failed while walking under [`ErrorPolicy::Collect`].
///
/// [`ErrorPolicy::Collect`]: crate::policy::ErrorPolicy::Collect
#[derive(Clone, Debug, PartialEq)]
pub struct BranchError {
    pub node_id: NodeId,
    /// Path of the parent; the failed node's own name may be unknown.
    pub parent_path: String,
    pub error: Error,
}

impl fmt::Display for BranchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.parent_path.is_empty() {
            write!(f, "{}: {}", self.node_id, self.error)
        } else {
            write!(f, "{} under {}: {}", self.node_id, self.parent_path, self.error)
        }
    }
}

/// Everything a walk produced: variables in depth-first order plus the
/// branches skipped because they failed.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct WalkReport {
    pub variables: Vec<VariableDescriptor>,
    pub errors: Vec<BranchError>,
}

impl WalkReport {
    pub(crate) fn variable(descriptor: VariableDescriptor) -> Self {
        Self {
            variables: vec![descriptor],
            errors: Vec::new(),
        }
    }

    pub(crate) fn failed(error: BranchError) -> Self {
        Self {
            variables: Vec::new(),
            errors: vec![error],
        }
    }

    pub(crate) fn absorb(&mut self, mut other: WalkReport) {
        self.variables.append(&mut other.variables);
        self.errors.append(&mut other.errors);
    }

    pub fn is_complete(&self) -> bool {
        self.errors.is_empty()
    }
}
