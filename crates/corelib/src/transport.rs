//! The request/response contract the browsing layer is built on.
//!
//! Connection handling, encoding and session security live behind this
//! trait. The core only needs three round trips: read, browse, browse next.

use crate::attribute::AttributeId;
use crate::browse::{BrowseRequest, BrowseResult, ContinuationPoint};
use crate::error::Result;
use crate::node_id::NodeId;
use crate::variant::DataValue;

/// One (node, attribute) pair to read.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct ReadValueId {
    pub node_id: NodeId,
    pub attribute_id: AttributeId,
}

impl ReadValueId {
    pub fn new(node_id: NodeId, attribute_id: AttributeId) -> Self {
        Self {
            node_id,
            attribute_id,
        }
    }
}

/// Transport collaborator for attribute reads and reference browsing.
///
/// Every method is one synchronous round trip. Results are positionally
/// aligned with the request items. An `Err` means the call itself failed;
/// per-item problems are reported through the item's status.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync` and tolerate concurrent
/// outstanding requests, since sibling subtrees may be browsed from
/// several threads at once.
pub trait Transport: Send + Sync {
    /// Read a batch of attributes in one request.
    fn read(&self, nodes_to_read: &[ReadValueId]) -> Result<Vec<DataValue>>;

    /// Browse a batch of nodes in one request.
    fn browse(&self, request: &BrowseRequest) -> Result<Vec<BrowseResult>>;

    /// Fetch the next page for each continuation point, or release them
    /// server-side when `release` is set.
    fn browse_next(
        &self,
        continuation_points: &[ContinuationPoint],
        release: bool,
    ) -> Result<Vec<BrowseResult>>;

    /// Transport name (for logging/debugging).
    fn name(&self) -> &'static str {
        "transport"
    }
}
