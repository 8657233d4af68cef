//! Browse request and result types.
//!
//! Browsing enumerates the references leaving (or entering) a node. Servers
//! may cut a result short and hand back a [`ContinuationPoint`]; the next
//! page is fetched by echoing that point back through `browse_next`.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::attribute::{NodeClass, NodeClassMask};
use crate::node_id::NodeId;
use crate::status::StatusCode;
use crate::variant::{LocalizedText, QualifiedName};

/// Well-known reference type ids (namespace 0).
pub mod reference_type {
    use crate::node_id::NodeId;

    pub const REFERENCES: u32 = 31;
    pub const NON_HIERARCHICAL_REFERENCES: u32 = 32;
    pub const HIERARCHICAL_REFERENCES: u32 = 33;
    pub const HAS_CHILD: u32 = 34;
    pub const ORGANIZES: u32 = 35;
    pub const HAS_TYPE_DEFINITION: u32 = 40;
    pub const AGGREGATES: u32 = 44;
    pub const HAS_PROPERTY: u32 = 46;
    pub const HAS_COMPONENT: u32 = 47;

    /// All references, hierarchical and not.
    pub fn references() -> NodeId {
        NodeId::numeric(0, REFERENCES)
    }

    pub fn hierarchical_references() -> NodeId {
        NodeId::numeric(0, HIERARCHICAL_REFERENCES)
    }

    pub fn organizes() -> NodeId {
        NodeId::numeric(0, ORGANIZES)
    }

    pub fn has_component() -> NodeId {
        NodeId::numeric(0, HAS_COMPONENT)
    }

    pub fn has_property() -> NodeId {
        NodeId::numeric(0, HAS_PROPERTY)
    }

    pub fn has_type_definition() -> NodeId {
        NodeId::numeric(0, HAS_TYPE_DEFINITION)
    }
}

/// Which way along a reference to look.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Default, Serialize, Deserialize)]
pub enum BrowseDirection {
    #[default]
    Forward,
    Inverse,
    Both,
}

/// Everything the server needs to browse one node.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct BrowseDescription {
    pub node_id: NodeId,
    pub direction: BrowseDirection,
    pub reference_type_id: NodeId,
    pub include_subtypes: bool,
    pub node_class_mask: NodeClassMask,
    /// Which fields of each reference to fill; this crate always asks for all.
    pub result_mask: u32,
}

impl BrowseDescription {
    pub const RESULT_MASK_ALL: u32 = 0x3f;
}

/// A request for one or more browse descriptions.
#[derive(Clone, PartialEq, Eq, Debug, Default)]
pub struct BrowseRequest {
    /// Zero lets the server pick its own page size.
    pub max_references_per_node: u32,
    pub nodes_to_browse: Vec<BrowseDescription>,
}

/// One reference returned by a browse.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct ReferenceDescription {
    pub reference_type_id: NodeId,
    #[serde(default = "forward")]
    pub is_forward: bool,
    /// Target of the reference.
    pub node_id: NodeId,
    pub browse_name: QualifiedName,
    #[serde(default)]
    pub display_name: LocalizedText,
    pub node_class: NodeClass,
    #[serde(default)]
    pub type_definition: Option<NodeId>,
}

fn forward() -> bool {
    true
}

/// Opaque cursor for the rest of a truncated browse. Empty means done.
///
/// The bytes are owned by the server; they are only ever echoed back.
#[derive(Clone, PartialEq, Eq, Hash, Debug, Default, Serialize, Deserialize)]
pub struct ContinuationPoint(Bytes);

impl ContinuationPoint {
    pub fn new(bytes: impl Into<Bytes>) -> Self {
        ContinuationPoint(bytes.into())
    }

    /// The "no more pages" point.
    pub fn empty() -> Self {
        ContinuationPoint(Bytes::new())
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

/// The answer for one browse description or one continuation point.
#[derive(Clone, PartialEq, Eq, Debug, Default)]
pub struct BrowseResult {
    pub status: StatusCode,
    pub continuation_point: ContinuationPoint,
    pub references: Vec<ReferenceDescription>,
}

impl BrowseResult {
    pub fn complete(references: Vec<ReferenceDescription>) -> Self {
        Self {
            status: StatusCode::GOOD,
            continuation_point: ContinuationPoint::empty(),
            references,
        }
    }

    pub fn partial(references: Vec<ReferenceDescription>, point: ContinuationPoint) -> Self {
        Self {
            status: StatusCode::GOOD,
            continuation_point: point,
            references,
        }
    }

    pub fn bad(status: StatusCode) -> Self {
        Self {
            status,
            ..Self::default()
        }
    }
}
