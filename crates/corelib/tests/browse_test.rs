//! Tests for reference browsing through `Node`.
//!
//! # Test Strategy
//!
//! 1. **Completeness**: every page is returned, in order, for any page size
//! 2. **Termination**: a server that never stops paging is cut off
//! 3. **Handles**: children share the client and keep their ids

use std::sync::Arc;

use corelib::{
    reference_type, BrowseConfig, BrowseDirection, BrowseRequest, BrowseResult, Client,
    ContinuationPoint, DataValue, Error, MemoryNode, MemoryTransport, NodeClass, NodeClassMask,
    NodeId, ReadValueId, Result, Transport,
};
use proptest::prelude::*;

fn folder_with(count: u32) -> MemoryTransport {
    let folder_id = NodeId::numeric(3, 1000);
    let mut folder = MemoryNode::object(folder_id, "Folder");
    let mut transport = MemoryTransport::new();
    for i in 0..count {
        let id = NodeId::numeric(3, i);
        folder = folder.with_reference(reference_type::organizes(), id.clone());
        transport.insert(MemoryNode::variable(id, format!("v{}", i), ""));
    }
    transport.insert(folder);
    transport
}

// ============================================================================
// Completeness Tests
// ============================================================================

proptest! {
    #[test]
    fn prop_references_union_of_all_pages(
        count in 0u32..60,
        server_page in 0usize..8,
        client_page in 0u32..8,
    ) {
        let transport = Arc::new(folder_with(count).with_page_size(server_page));
        let client = Client::from_arc(transport.clone())
            .with_config(BrowseConfig::default().with_max_references_per_node(client_page));

        let refs = client
            .node(NodeId::numeric(3, 1000))
            .references(None, BrowseDirection::Forward, None, true)
            .unwrap();

        let ids: Vec<NodeId> = refs.into_iter().map(|r| r.node_id).collect();
        let expected: Vec<NodeId> = (0..count).map(|i| NodeId::numeric(3, i)).collect();
        prop_assert_eq!(ids, expected);
        prop_assert_eq!(transport.outstanding_continuation_points(), 0);
    }
}

#[test]
fn test_page_count_matches_page_size() {
    let transport = Arc::new(folder_with(10).with_page_size(3));
    let client = Client::from_arc(transport.clone());

    let children = client.node(NodeId::numeric(3, 1000)).children(None, None).unwrap();
    assert_eq!(children.len(), 10);

    let stats = transport.stats();
    assert_eq!(stats.browses, 1);
    assert_eq!(stats.browse_nexts, 3);
}

#[test]
fn test_class_mask_passed_through() {
    let transport = folder_with(3).with_node(
        MemoryNode::object(NodeId::numeric(3, 1000), "Folder")
            .with_reference(reference_type::organizes(), NodeId::numeric(3, 0))
            .with_reference(reference_type::organizes(), NodeId::numeric(3, 7)),
    );
    let transport = transport.with_node(MemoryNode::object(NodeId::numeric(3, 7), "Sub"));
    let client = Client::new(transport);

    let objects = client
        .node(NodeId::numeric(3, 1000))
        .children(None, Some(NodeClassMask::of(&[NodeClass::Object])))
        .unwrap();
    assert_eq!(objects.len(), 1);
    assert_eq!(objects[0].id(), &NodeId::numeric(3, 7));
}

#[test]
fn test_references_of_unknown_node() {
    let client = Client::new(folder_with(1));
    let err = client
        .node(NodeId::numeric(3, 4242))
        .references(None, BrowseDirection::Forward, None, true)
        .unwrap_err();
    assert!(matches!(err, Error::Status { attribute: None, .. }));
}

// ============================================================================
// Termination Tests
// ============================================================================

/// Always answers with an empty page and yet another continuation point.
struct EndlessPages;

impl Transport for EndlessPages {
    fn read(&self, nodes_to_read: &[ReadValueId]) -> Result<Vec<DataValue>> {
        Ok(vec![DataValue::default(); nodes_to_read.len()])
    }

    fn browse(&self, request: &BrowseRequest) -> Result<Vec<BrowseResult>> {
        Ok(request
            .nodes_to_browse
            .iter()
            .map(|_| BrowseResult::partial(Vec::new(), ContinuationPoint::new(&b"more"[..])))
            .collect())
    }

    fn browse_next(
        &self,
        continuation_points: &[ContinuationPoint],
        _release: bool,
    ) -> Result<Vec<BrowseResult>> {
        Ok(continuation_points
            .iter()
            .map(|p| BrowseResult::partial(Vec::new(), p.clone()))
            .collect())
    }
}

#[test]
fn test_endless_continuation_points_terminate() {
    let client = Client::new(EndlessPages);
    let err = client
        .node(NodeId::numeric(0, 85))
        .children(None, None)
        .unwrap_err();
    assert_eq!(
        err,
        Error::PaginationExhausted {
            node: NodeId::numeric(0, 85),
            pages: BrowseConfig::default().max_pages,
        }
    );
}

/// Returns a result list that does not line up with the request.
struct ShortResponse;

impl Transport for ShortResponse {
    fn read(&self, _nodes_to_read: &[ReadValueId]) -> Result<Vec<DataValue>> {
        Ok(Vec::new())
    }

    fn browse(&self, _request: &BrowseRequest) -> Result<Vec<BrowseResult>> {
        Ok(Vec::new())
    }

    fn browse_next(
        &self,
        _continuation_points: &[ContinuationPoint],
        _release: bool,
    ) -> Result<Vec<BrowseResult>> {
        Ok(Vec::new())
    }
}

#[test]
fn test_misaligned_responses_are_transport_errors() {
    let node = Client::new(ShortResponse).node(NodeId::numeric(0, 85));
    assert!(matches!(node.node_class(), Err(Error::Transport(_))));
    assert!(matches!(node.children(None, None), Err(Error::Transport(_))));
}

// ============================================================================
// Handle Tests
// ============================================================================

#[test]
fn test_node_from_str_and_children_share_client() {
    let client = Client::new(folder_with(2));
    let folder = client.node_from_str("ns=3;i=1000").unwrap();
    assert_eq!(folder.to_string(), "ns=3;i=1000");

    let children = folder.children(None, None).unwrap();
    let names: Vec<String> = children
        .iter()
        .map(|c| c.browse_name().unwrap().name)
        .collect();
    assert_eq!(names, vec!["v0", "v1"]);

    assert!(matches!(
        client.node_from_str("ns=3;x=1"),
        Err(Error::InvalidNodeId(_))
    ));
}

#[test]
fn test_inverse_references_find_parent() {
    let client = Client::new(folder_with(2));
    let parents = client
        .node(NodeId::numeric(3, 1))
        .referenced_nodes(None, BrowseDirection::Inverse, None, true)
        .unwrap();
    assert_eq!(parents.len(), 1);
    assert_eq!(parents[0].id(), &NodeId::numeric(3, 1000));
    assert_eq!(parents[0].node_class(), Ok(NodeClass::Object));
}
