//! Node handles for the remote address space.
//!
//! A [`Node`] pairs a [`NodeId`] with the [`Client`] it was created from and
//! turns attribute reads and reference browsing into single calls. Handles
//! are not cached: make one whenever you need it.
//!
//! # Pagination
//!
//! [`Node::references`] hides the continuation point protocol. After the
//! first browse it keeps calling `browse_next` with the point it was just
//! given until the server hands back an empty one, appending every page in
//! the order received. The loop ends on an empty point only, never on an
//! empty page, and is capped by [`BrowseConfig::max_pages`]
//! (see [`crate::client::BrowseConfig`]).

use std::fmt;

use tracing::trace;

use crate::attribute::{AccessLevel, AttributeId, NodeClass, NodeClassMask};
use crate::browse::{
    reference_type, BrowseDescription, BrowseDirection, BrowseRequest, BrowseResult,
    ReferenceDescription,
};
use crate::client::Client;
use crate::error::{Error, Result};
use crate::node_id::NodeId;
use crate::transport::ReadValueId;
use crate::variant::{DataValue, LocalizedText, QualifiedName, Variant};

/// Handle on one node of the address space.
///
/// The id is fixed at construction. Cloning is cheap: the client inside is
/// a shared pointer plus a few settings.
#[derive(Clone, Debug)]
pub struct Node {
    id: NodeId,
    client: Client,
}

impl Node {
    pub fn new(id: NodeId, client: Client) -> Self {
        Self { id, client }
    }

    #[inline]
    pub fn id(&self) -> &NodeId {
        &self.id
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Read one attribute.
    ///
    /// # Errors
    ///
    /// - [`Error::Status`] when the server answers with a non-good item status
    /// - [`Error::Transport`] when the read itself fails
    pub fn attribute(&self, attribute: AttributeId) -> Result<Variant> {
        let mut results = self.attributes(&[attribute])?;
        let DataValue { status, value } = results.remove(0);
        if !status.is_good() {
            return Err(Error::Status {
                node: self.id.clone(),
                attribute: Some(attribute),
                status,
            });
        }
        Ok(value)
    }

    /// Read several attributes in one request.
    ///
    /// Results line up one-to-one with `attributes`. Item statuses are left
    /// for the caller to inspect; only a failed call is an error.
    pub fn attributes(&self, attributes: &[AttributeId]) -> Result<Vec<DataValue>> {
        let nodes_to_read: Vec<ReadValueId> = attributes
            .iter()
            .map(|&attribute| ReadValueId::new(self.id.clone(), attribute))
            .collect();
        self.client.read(&nodes_to_read)
    }

    pub fn node_class(&self) -> Result<NodeClass> {
        self.attribute(AttributeId::NodeClass)?.as_node_class()
    }

    pub fn browse_name(&self) -> Result<QualifiedName> {
        self.attribute(AttributeId::BrowseName)?
            .as_qualified_name()
            .cloned()
    }

    pub fn display_name(&self) -> Result<LocalizedText> {
        self.attribute(AttributeId::DisplayName)?
            .as_localized_text()
            .cloned()
    }

    pub fn description(&self) -> Result<LocalizedText> {
        self.attribute(AttributeId::Description)?
            .as_localized_text()
            .cloned()
    }

    pub fn access_level(&self) -> Result<AccessLevel> {
        self.attribute(AttributeId::AccessLevel)?.as_access_level()
    }

    pub fn user_access_level(&self) -> Result<AccessLevel> {
        self.attribute(AttributeId::UserAccessLevel)?
            .as_access_level()
    }

    /// Current value; narrowing is left to the caller.
    pub fn value(&self) -> Result<Variant> {
        self.attribute(AttributeId::Value)
    }

    /// All references of this node matching the filters, every page drained.
    ///
    /// # Arguments
    /// * `reference_type` - `None` means all references (`i=31`)
    /// * `direction` - forward, inverse or both
    /// * `class_mask` - `None` means every node class
    /// * `include_subtypes` - also follow subtypes of `reference_type`
    ///
    /// # Errors
    ///
    /// - [`Error::PaginationExhausted`] if the continuation point is still set
    ///   after `max_pages` pages
    /// - [`Error::Status`] if the server rejects the browse or a page
    /// - [`Error::Transport`] if a call fails
    pub fn references(
        &self,
        reference_type: Option<NodeId>,
        direction: BrowseDirection,
        class_mask: Option<NodeClassMask>,
        include_subtypes: bool,
    ) -> Result<Vec<ReferenceDescription>> {
        let description = BrowseDescription {
            node_id: self.id.clone(),
            direction,
            reference_type_id: reference_type.unwrap_or_else(reference_type::references),
            include_subtypes,
            node_class_mask: class_mask.unwrap_or(NodeClassMask::ALL),
            result_mask: BrowseDescription::RESULT_MASK_ALL,
        };
        let config = self.client.config();
        let request = BrowseRequest {
            max_references_per_node: config.max_references_per_node,
            nodes_to_browse: vec![description],
        };

        let mut page = self.client.browse(&request)?.remove(0);
        let mut pages = 1;
        let mut references = Vec::new();
        loop {
            self.check_page(&page)?;
            trace!(
                node = %self.id,
                page = pages,
                references = page.references.len(),
                more = !page.continuation_point.is_empty(),
                "browse page"
            );
            references.append(&mut page.references);

            if page.continuation_point.is_empty() {
                break;
            }
            if pages >= config.max_pages {
                return Err(Error::PaginationExhausted {
                    node: self.id.clone(),
                    pages,
                });
            }
            page = self.client.browse_next(&page.continuation_point)?;
            pages += 1;
        }

        Ok(references)
    }

    /// Nodes reachable over references matching the filters.
    pub fn referenced_nodes(
        &self,
        reference_type: Option<NodeId>,
        direction: BrowseDirection,
        class_mask: Option<NodeClassMask>,
        include_subtypes: bool,
    ) -> Result<Vec<Node>> {
        let references =
            self.references(reference_type, direction, class_mask, include_subtypes)?;
        Ok(references
            .into_iter()
            .map(|r| self.client.node(r.node_id))
            .collect())
    }

    /// Forward hierarchical children, in the order the server returns them.
    ///
    /// `reference_type` defaults to HierarchicalReferences (`i=33`), subtypes
    /// included.
    pub fn children(
        &self,
        reference_type: Option<NodeId>,
        class_mask: Option<NodeClassMask>,
    ) -> Result<Vec<Node>> {
        let reference_type =
            reference_type.unwrap_or_else(reference_type::hierarchical_references);
        self.referenced_nodes(
            Some(reference_type),
            BrowseDirection::Forward,
            class_mask,
            true,
        )
    }

    fn check_page(&self, page: &BrowseResult) -> Result<()> {
        if !page.status.is_good() {
            return Err(Error::Status {
                node: self.id.clone(),
                attribute: None,
                status: page.status,
            });
        }
        Ok(())
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.id, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browse::ContinuationPoint;
    use crate::client::BrowseConfig;
    use crate::status::StatusCode;
    use crate::transport::Transport;
    use parking_lot::Mutex;

    /// Serves scripted browse pages and records every call.
    #[derive(Default)]
    struct Scripted {
        first: Mutex<Option<BrowseResult>>,
        next: Mutex<Vec<BrowseResult>>,
        forever: bool,
        reads: Mutex<Vec<Vec<ReadValueId>>>,
        next_calls: Mutex<Vec<ContinuationPoint>>,
        requests: Mutex<Vec<BrowseRequest>>,
    }

    impl Transport for Scripted {
        fn read(&self, nodes_to_read: &[ReadValueId]) -> Result<Vec<DataValue>> {
            self.reads.lock().push(nodes_to_read.to_vec());
            Ok(nodes_to_read
                .iter()
                .map(|r| match r.attribute_id {
                    AttributeId::NodeClass => DataValue::good(NodeClass::Variable),
                    AttributeId::BrowseName => DataValue::good(QualifiedName::new(1, "Temp")),
                    _ => DataValue::bad(StatusCode::BAD_ATTRIBUTE_ID_INVALID),
                })
                .collect())
        }

        fn browse(&self, request: &BrowseRequest) -> Result<Vec<BrowseResult>> {
            self.requests.lock().push(request.clone());
            Ok(vec![self.first.lock().take().unwrap_or_default()])
        }

        fn browse_next(
            &self,
            points: &[ContinuationPoint],
            _release: bool,
        ) -> Result<Vec<BrowseResult>> {
            self.next_calls.lock().push(points[0].clone());
            if self.forever {
                return Ok(vec![BrowseResult::partial(
                    Vec::new(),
                    ContinuationPoint::new(&b"again"[..]),
                )]);
            }
            Ok(vec![self.next.lock().remove(0)])
        }
    }

    fn reference(id: u32) -> ReferenceDescription {
        ReferenceDescription {
            reference_type_id: reference_type::has_component(),
            is_forward: true,
            node_id: NodeId::numeric(1, id),
            browse_name: QualifiedName::new(1, format!("n{}", id)),
            display_name: LocalizedText::default(),
            node_class: NodeClass::Variable,
            type_definition: None,
        }
    }

    fn point(tag: &'static [u8]) -> ContinuationPoint {
        ContinuationPoint::new(tag)
    }

    #[test]
    fn test_attribute_good_and_bad_status() {
        let client = Client::new(Scripted::default());
        let node = client.node(NodeId::numeric(1, 7));

        assert_eq!(node.node_class(), Ok(NodeClass::Variable));
        assert_eq!(node.browse_name().unwrap().name, "Temp");

        let err = node.description().unwrap_err();
        assert_eq!(
            err,
            Error::Status {
                node: NodeId::numeric(1, 7),
                attribute: Some(AttributeId::Description),
                status: StatusCode::BAD_ATTRIBUTE_ID_INVALID,
            }
        );
    }

    #[test]
    fn test_attributes_keeps_positions_and_bad_items() {
        let client = Client::new(Scripted::default());
        let node = client.node(NodeId::numeric(1, 7));

        let values = node
            .attributes(&[
                AttributeId::BrowseName,
                AttributeId::Value,
                AttributeId::NodeClass,
            ])
            .unwrap();
        assert_eq!(values.len(), 3);
        assert!(values[0].status.is_good());
        assert_eq!(values[1].status, StatusCode::BAD_ATTRIBUTE_ID_INVALID);
        assert_eq!(values[2].value.as_node_class(), Ok(NodeClass::Variable));
    }

    #[test]
    fn test_empty_attribute_list_reaches_transport() {
        let transport = std::sync::Arc::new(Scripted::default());
        let client = Client::from_arc(transport.clone());

        let values = client.node(NodeId::numeric(1, 7)).attributes(&[]);
        assert_eq!(values, Ok(Vec::new()));
        assert_eq!(*transport.reads.lock(), vec![Vec::<ReadValueId>::new()]);
    }

    #[test]
    fn test_empty_attribute_list_refused_by_memory_transport() {
        use crate::memory::{MemoryNode, MemoryTransport};

        let id = NodeId::numeric(1, 7);
        let transport = MemoryTransport::new().with_node(MemoryNode::object(id.clone(), "Pump"));
        let client = Client::new(transport);

        let err = client.node(id).attributes(&[]).unwrap_err();
        assert!(matches!(err, Error::Transport(_)), "got {:?}", err);
    }

    #[test]
    fn test_references_drains_pages_in_order() {
        let transport = Scripted {
            first: Mutex::new(Some(BrowseResult::partial(
                vec![reference(1), reference(2)],
                point(b"p1"),
            ))),
            next: Mutex::new(vec![
                // An empty page with a point set must not end the loop.
                BrowseResult::partial(Vec::new(), point(b"p2")),
                BrowseResult::complete(vec![reference(3)]),
            ]),
            ..Scripted::default()
        };
        let transport = std::sync::Arc::new(transport);
        let client = Client::from_arc(transport.clone());

        let refs = client
            .node(NodeId::numeric(1, 1))
            .references(None, BrowseDirection::Forward, None, true)
            .unwrap();
        let ids: Vec<_> = refs.iter().map(|r| r.node_id.clone()).collect();
        assert_eq!(
            ids,
            vec![
                NodeId::numeric(1, 1),
                NodeId::numeric(1, 2),
                NodeId::numeric(1, 3)
            ]
        );
        // Each point is echoed back exactly once, in order.
        assert_eq!(*transport.next_calls.lock(), vec![point(b"p1"), point(b"p2")]);
    }

    #[test]
    fn test_references_defaults() {
        let transport = std::sync::Arc::new(Scripted::default());
        let client = Client::from_arc(transport.clone());
        client
            .node(NodeId::numeric(0, 85))
            .references(None, BrowseDirection::Inverse, None, false)
            .unwrap();

        let requests = transport.requests.lock();
        let description = &requests[0].nodes_to_browse[0];
        assert_eq!(description.reference_type_id, NodeId::numeric(0, 31));
        assert_eq!(description.node_class_mask, NodeClassMask::ALL);
        assert_eq!(description.direction, BrowseDirection::Inverse);
    }

    #[test]
    fn test_children_uses_hierarchical_forward() {
        let transport = std::sync::Arc::new(Scripted {
            first: Mutex::new(Some(BrowseResult::complete(vec![
                reference(5),
                reference(4),
            ]))),
            ..Scripted::default()
        });
        let client = Client::from_arc(transport.clone());

        let children = client.node(NodeId::numeric(1, 1)).children(None, None).unwrap();
        let ids: Vec<_> = children.iter().map(|n| n.id().clone()).collect();
        assert_eq!(ids, vec![NodeId::numeric(1, 5), NodeId::numeric(1, 4)]);

        let description = &transport.requests.lock()[0].nodes_to_browse[0];
        assert_eq!(description.reference_type_id, NodeId::numeric(0, 33));
        assert_eq!(description.direction, BrowseDirection::Forward);
        assert!(description.include_subtypes);
    }

    #[test]
    fn test_references_gives_up_after_max_pages() {
        let transport = Scripted {
            first: Mutex::new(Some(BrowseResult::partial(vec![reference(1)], point(b"p")))),
            forever: true,
            ..Scripted::default()
        };
        let client = Client::new(transport).with_config(BrowseConfig::default().with_max_pages(5));

        let err = client
            .node(NodeId::numeric(1, 1))
            .references(None, BrowseDirection::Forward, None, true)
            .unwrap_err();
        assert_eq!(
            err,
            Error::PaginationExhausted {
                node: NodeId::numeric(1, 1),
                pages: 5
            }
        );
    }

    #[test]
    fn test_references_bad_browse_status() {
        let transport = Scripted {
            first: Mutex::new(Some(BrowseResult::bad(StatusCode::BAD_NODE_ID_UNKNOWN))),
            ..Scripted::default()
        };
        let client = Client::new(transport);
        let err = client
            .node(NodeId::numeric(1, 99))
            .children(None, None)
            .unwrap_err();
        assert_eq!(err.status(), Some(StatusCode::BAD_NODE_ID_UNKNOWN));
    }

    #[test]
    fn test_cancelled_client_makes_no_calls() {
        let transport = std::sync::Arc::new(Scripted::default());
        let client = Client::from_arc(transport.clone());
        client.cancel_token().cancel();

        let node = client.node(NodeId::numeric(1, 1));
        assert_eq!(node.node_class(), Err(Error::Cancelled));
        assert!(transport.reads.lock().is_empty());
    }
}
