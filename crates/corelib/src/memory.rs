//! In-memory address space implementing [`Transport`].
//!
//! Serves reads and paginated browses from a node table, the way a server
//! would. Used by the test suites and by the CLI, which loads the table
//! from a JSON fixture:
//!
//! ```json
//! {
//!   "nodes": [
//!     { "node_id": "ns=1;s=Plant", "node_class": "Object",
//!       "browse_name": { "name": "Plant" },
//!       "references": [ { "reference_type_id": "i=47", "target": "ns=1;s=Plant.Temp" } ] },
//!     { "node_id": "ns=1;s=Plant.Temp", "node_class": "Variable",
//!       "browse_name": { "name": "Temp" },
//!       "description": { "text": "Temp sensor" },
//!       "access_level": 3,
//!       "value": { "type": "Double", "value": 21.5 } }
//!   ]
//! }
//! ```

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use bytes::Bytes;
use dashmap::DashMap;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::attribute::{AccessLevel, AttributeId, NodeClass};
use crate::browse::{
    reference_type, BrowseDescription, BrowseDirection, BrowseRequest, BrowseResult,
    ContinuationPoint, ReferenceDescription,
};
use crate::error::{Error, Result};
use crate::node_id::{Identifier, NodeId};
use crate::status::StatusCode;
use crate::transport::{ReadValueId, Transport};
use crate::variant::{DataValue, LocalizedText, QualifiedName, Variant};

/// A reference stored on its source node.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryReference {
    pub reference_type_id: NodeId,
    pub target: NodeId,
}

/// One node of the in-memory address space.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MemoryNode {
    pub node_id: NodeId,
    pub node_class: NodeClass,
    pub browse_name: QualifiedName,
    #[serde(default)]
    pub display_name: Option<LocalizedText>,
    #[serde(default)]
    pub description: LocalizedText,
    /// Only served for variables.
    #[serde(default)]
    pub access_level: Option<AccessLevel>,
    #[serde(default)]
    pub value: Variant,
    #[serde(default)]
    pub type_definition: Option<NodeId>,
    #[serde(default)]
    pub references: Vec<MemoryReference>,
}

impl MemoryNode {
    pub fn new(node_id: NodeId, node_class: NodeClass, name: impl Into<String>) -> Self {
        let namespace = node_id.namespace();
        Self {
            node_id,
            node_class,
            browse_name: QualifiedName::new(namespace, name),
            display_name: None,
            description: LocalizedText::default(),
            access_level: None,
            value: Variant::Empty,
            type_definition: None,
            references: Vec::new(),
        }
    }

    pub fn object(node_id: NodeId, name: impl Into<String>) -> Self {
        Self::new(node_id, NodeClass::Object, name)
    }

    /// A readable variable with the given description.
    pub fn variable(node_id: NodeId, name: impl Into<String>, description: &str) -> Self {
        let mut node = Self::new(node_id, NodeClass::Variable, name);
        node.description = LocalizedText::new(description);
        node.access_level = Some(AccessLevel::CURRENT_READ);
        node
    }

    #[must_use]
    pub fn with_access_level(mut self, level: AccessLevel) -> Self {
        self.access_level = Some(level);
        self
    }

    #[must_use]
    pub fn with_value(mut self, value: impl Into<Variant>) -> Self {
        self.value = value.into();
        self
    }

    #[must_use]
    pub fn with_reference(mut self, reference_type_id: NodeId, target: NodeId) -> Self {
        self.references.push(MemoryReference {
            reference_type_id,
            target,
        });
        self
    }

    /// Add a HasComponent reference to `target`.
    #[must_use]
    pub fn with_component(self, target: NodeId) -> Self {
        self.with_reference(reference_type::has_component(), target)
    }

    fn display_name(&self) -> LocalizedText {
        self.display_name
            .clone()
            .unwrap_or_else(|| LocalizedText::new(self.browse_name.name.clone()))
    }

    fn attribute(&self, attribute: AttributeId) -> DataValue {
        let is_variable = self.node_class == NodeClass::Variable;
        match attribute {
            AttributeId::NodeId => DataValue::good(Variant::NodeId(self.node_id.clone())),
            AttributeId::NodeClass => DataValue::good(self.node_class),
            AttributeId::BrowseName => DataValue::good(self.browse_name.clone()),
            AttributeId::DisplayName => DataValue::good(self.display_name()),
            AttributeId::Description => DataValue::good(self.description.clone()),
            AttributeId::Value if is_variable => DataValue::good(self.value.clone()),
            AttributeId::AccessLevel | AttributeId::UserAccessLevel if is_variable => {
                match self.access_level {
                    Some(level) => DataValue::good(level),
                    None => DataValue::bad(StatusCode::BAD_ATTRIBUTE_ID_INVALID),
                }
            }
            _ => DataValue::bad(StatusCode::BAD_ATTRIBUTE_ID_INVALID),
        }
    }
}

/// Serialized form of a whole address space.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct AddressSpace {
    pub nodes: Vec<MemoryNode>,
}

/// Counters for the calls a [`MemoryTransport`] has served.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CallStats {
    pub reads: usize,
    pub read_items: usize,
    pub browses: usize,
    pub browse_nexts: usize,
}

/// References still owed to a client for one continuation point.
struct PendingBrowse {
    remaining: Vec<ReferenceDescription>,
    page_size: usize,
}

/// Transport over an in-memory node table with real pagination.
pub struct MemoryTransport {
    nodes: HashMap<NodeId, MemoryNode>,
    /// Server-side page size; zero means unlimited.
    page_size: usize,
    read_failures: HashMap<NodeId, StatusCode>,
    pending: DashMap<Bytes, PendingBrowse>,
    next_point: AtomicU64,
    stats: Mutex<CallStats>,
}

impl Default for MemoryTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self {
            nodes: HashMap::new(),
            page_size: 0,
            read_failures: HashMap::new(),
            pending: DashMap::new(),
            next_point: AtomicU64::new(1),
            stats: Mutex::new(CallStats::default()),
        }
    }

    /// Build from a deserialized address space. Later duplicates win.
    pub fn from_address_space(space: AddressSpace) -> Self {
        let mut transport = Self::new();
        for node in space.nodes {
            transport.insert(node);
        }
        transport
    }

    /// Parse the JSON fixture format shown in the module docs.
    pub fn from_json(json: &str) -> Result<Self> {
        let space: AddressSpace = serde_json::from_str(json)
            .map_err(|e| Error::Transport(format!("invalid address space: {}", e)))?;
        Ok(Self::from_address_space(space))
    }

    /// Cap every browse result at `page_size` references.
    #[must_use]
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    #[must_use]
    pub fn with_node(mut self, node: MemoryNode) -> Self {
        self.insert(node);
        self
    }

    /// Make every read item for `node_id` come back with `status`.
    #[must_use]
    pub fn with_read_failure(mut self, node_id: NodeId, status: StatusCode) -> Self {
        self.read_failures.insert(node_id, status);
        self
    }

    pub fn insert(&mut self, node: MemoryNode) {
        self.nodes.insert(node.node_id.clone(), node);
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn stats(&self) -> CallStats {
        *self.stats.lock()
    }

    /// Continuation points handed out and not yet drained or released.
    pub fn outstanding_continuation_points(&self) -> usize {
        self.pending.len()
    }

    fn read_item(&self, item: &ReadValueId) -> DataValue {
        if let Some(status) = self.read_failures.get(&item.node_id) {
            return DataValue::bad(*status);
        }
        match self.nodes.get(&item.node_id) {
            Some(node) => node.attribute(item.attribute_id),
            None => DataValue::bad(StatusCode::BAD_NODE_ID_UNKNOWN),
        }
    }

    fn class_of(&self, id: &NodeId) -> NodeClass {
        self.nodes
            .get(id)
            .map(|n| n.node_class)
            .unwrap_or(NodeClass::Unspecified)
    }

    fn describe(
        &self,
        reference: &MemoryReference,
        target: &NodeId,
        is_forward: bool,
    ) -> ReferenceDescription {
        let node = self.nodes.get(target);
        ReferenceDescription {
            reference_type_id: reference.reference_type_id.clone(),
            is_forward,
            node_id: target.clone(),
            browse_name: node.map(|n| n.browse_name.clone()).unwrap_or_default(),
            display_name: node.map(|n| n.display_name()).unwrap_or_default(),
            node_class: self.class_of(target),
            type_definition: node.and_then(|n| n.type_definition.clone()),
        }
    }

    fn matching_references(&self, description: &BrowseDescription) -> Vec<ReferenceDescription> {
        let wanted = |reference: &MemoryReference, target: &NodeId| {
            type_matches(
                &reference.reference_type_id,
                &description.reference_type_id,
                description.include_subtypes,
            ) && description.node_class_mask.contains(self.class_of(target))
        };

        let mut out = Vec::new();
        if matches!(
            description.direction,
            BrowseDirection::Forward | BrowseDirection::Both
        ) {
            if let Some(node) = self.nodes.get(&description.node_id) {
                for reference in &node.references {
                    if wanted(reference, &reference.target) {
                        out.push(self.describe(reference, &reference.target, true));
                    }
                }
            }
        }
        if matches!(
            description.direction,
            BrowseDirection::Inverse | BrowseDirection::Both
        ) {
            // Inverse references are the forward ones of other nodes, in a
            // stable order.
            let mut sources: Vec<&MemoryNode> = self.nodes.values().collect();
            sources.sort_by(|a, b| a.node_id.cmp(&b.node_id));
            for source in sources {
                for reference in &source.references {
                    if reference.target == description.node_id
                        && wanted(reference, &source.node_id)
                    {
                        out.push(self.describe(reference, &source.node_id, false));
                    }
                }
            }
        }
        out
    }

    /// Cut `references` into the first page plus a continuation point for
    /// the rest.
    fn paginate(
        &self,
        mut references: Vec<ReferenceDescription>,
        page_size: usize,
    ) -> BrowseResult {
        if page_size == 0 || references.len() <= page_size {
            return BrowseResult::complete(references);
        }
        let remaining = references.split_off(page_size);
        let id = self.next_point.fetch_add(1, Ordering::Relaxed);
        let key = Bytes::from(id.to_be_bytes().to_vec());
        self.pending.insert(
            key.clone(),
            PendingBrowse {
                remaining,
                page_size,
            },
        );
        BrowseResult::partial(references, ContinuationPoint::new(key))
    }

    fn effective_page_size(&self, requested: u32) -> usize {
        match (self.page_size, requested as usize) {
            (0, r) => r,
            (p, 0) => p,
            (p, r) => p.min(r),
        }
    }
}

impl Transport for MemoryTransport {
    fn read(&self, nodes_to_read: &[ReadValueId]) -> Result<Vec<DataValue>> {
        {
            let mut stats = self.stats.lock();
            stats.reads += 1;
            stats.read_items += nodes_to_read.len();
        }
        if nodes_to_read.is_empty() {
            return Err(Error::Transport(format!(
                "read rejected: {}",
                StatusCode::BAD_NOTHING_TO_DO
            )));
        }
        Ok(nodes_to_read.iter().map(|item| self.read_item(item)).collect())
    }

    fn browse(&self, request: &BrowseRequest) -> Result<Vec<BrowseResult>> {
        self.stats.lock().browses += 1;
        if request.nodes_to_browse.is_empty() {
            return Err(Error::Transport(format!(
                "browse rejected: {}",
                StatusCode::BAD_NOTHING_TO_DO
            )));
        }
        let page_size = self.effective_page_size(request.max_references_per_node);
        Ok(request
            .nodes_to_browse
            .iter()
            .map(|description| {
                if !self.nodes.contains_key(&description.node_id) {
                    return BrowseResult::bad(StatusCode::BAD_NODE_ID_UNKNOWN);
                }
                self.paginate(self.matching_references(description), page_size)
            })
            .collect())
    }

    fn browse_next(
        &self,
        continuation_points: &[ContinuationPoint],
        release: bool,
    ) -> Result<Vec<BrowseResult>> {
        self.stats.lock().browse_nexts += 1;
        Ok(continuation_points
            .iter()
            .map(|point| {
                let key = Bytes::copy_from_slice(point.as_bytes());
                match self.pending.remove(&key) {
                    None => BrowseResult::bad(StatusCode::BAD_CONTINUATION_POINT_INVALID),
                    Some(_) if release => BrowseResult::complete(Vec::new()),
                    Some((_, pending)) => self.paginate(pending.remaining, pending.page_size),
                }
            })
            .collect())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

/// Supertype of the well-known reference types.
fn parent_type(id: u32) -> Option<u32> {
    use crate::browse::reference_type::*;
    match id {
        HIERARCHICAL_REFERENCES | NON_HIERARCHICAL_REFERENCES => Some(REFERENCES),
        HAS_CHILD | ORGANIZES => Some(HIERARCHICAL_REFERENCES),
        AGGREGATES => Some(HAS_CHILD),
        HAS_COMPONENT | HAS_PROPERTY => Some(AGGREGATES),
        HAS_TYPE_DEFINITION => Some(NON_HIERARCHICAL_REFERENCES),
        _ => None,
    }
}

fn type_matches(actual: &NodeId, wanted: &NodeId, include_subtypes: bool) -> bool {
    if actual == wanted {
        return true;
    }
    if !include_subtypes || wanted.namespace() != 0 || actual.namespace() != 0 {
        return false;
    }
    let (&Identifier::Numeric(mut current), &Identifier::Numeric(target)) =
        (actual.identifier(), wanted.identifier())
    else {
        return false;
    };
    while let Some(parent) = parent_type(current) {
        if parent == target {
            return true;
        }
        current = parent;
    }
    false
}
