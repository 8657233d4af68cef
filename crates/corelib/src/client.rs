//! Client: a shared transport plus browse settings.
//!
//! A `Client` is cheap to clone; every [`Node`] holds one. All calls into
//! the transport go through here so cancellation and response shape checks
//! happen in one place.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::trace;

use crate::browse::{BrowseRequest, BrowseResult, ContinuationPoint};
use crate::error::{Error, Result};
use crate::node::Node;
use crate::node_id::NodeId;
use crate::transport::{ReadValueId, Transport};
use crate::variant::DataValue;

/// Limits applied to reference enumeration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BrowseConfig {
    /// Most pages (the first browse included) one node may take before the
    /// enumeration is abandoned with `PaginationExhausted`.
    pub max_pages: usize,
    /// Page size hint sent to the server; zero lets the server decide.
    pub max_references_per_node: u32,
}

impl Default for BrowseConfig {
    fn default() -> Self {
        Self {
            max_pages: 1000,
            max_references_per_node: 0,
        }
    }
}

impl BrowseConfig {
    #[must_use]
    pub fn with_max_pages(mut self, max_pages: usize) -> Self {
        self.max_pages = max_pages;
        self
    }

    #[must_use]
    pub fn with_max_references_per_node(mut self, max: u32) -> Self {
        self.max_references_per_node = max;
        self
    }
}

/// Shared cancellation flag.
///
/// Once cancelled, every further transport call made through a client
/// holding this token fails with [`Error::Cancelled`].
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Entry point for building [`Node`] handles over a transport.
#[derive(Clone)]
pub struct Client {
    transport: Arc<dyn Transport>,
    config: BrowseConfig,
    cancel: CancelToken,
}

impl Client {
    /// Create a client over `transport` with default settings.
    pub fn new(transport: impl Transport + 'static) -> Self {
        Self::from_arc(Arc::new(transport))
    }

    /// Create a client over a transport that is already shared.
    pub fn from_arc(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            config: BrowseConfig::default(),
            cancel: CancelToken::new(),
        }
    }

    #[must_use]
    pub fn with_config(mut self, config: BrowseConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn config(&self) -> &BrowseConfig {
        &self.config
    }

    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    /// Handle for the node with `id`. No request is made.
    pub fn node(&self, id: NodeId) -> Node {
        Node::new(id, self.clone())
    }

    /// Handle for the node named by a text NodeId such as `ns=2;s=Demo`.
    pub fn node_from_str(&self, id: &str) -> Result<Node> {
        Ok(self.node(id.parse()?))
    }

    fn check_cancelled(&self) -> Result<()> {
        if self.cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        Ok(())
    }

    pub(crate) fn read(&self, nodes_to_read: &[ReadValueId]) -> Result<Vec<DataValue>> {
        self.check_cancelled()?;
        let results = self.transport.read(nodes_to_read)?;
        trace!(
            transport = self.transport.name(),
            items = nodes_to_read.len(),
            "read"
        );
        // An empty read is handed to the transport as is and whatever it
        // answers is passed back unchanged.
        if !nodes_to_read.is_empty() {
            expect_len("read", nodes_to_read.len(), results.len())?;
        }
        Ok(results)
    }

    pub(crate) fn browse(&self, request: &BrowseRequest) -> Result<Vec<BrowseResult>> {
        self.check_cancelled()?;
        let results = self.transport.browse(request)?;
        expect_len("browse", request.nodes_to_browse.len(), results.len())?;
        Ok(results)
    }

    pub(crate) fn browse_next(&self, point: &ContinuationPoint) -> Result<BrowseResult> {
        self.check_cancelled()?;
        let mut results = self
            .transport
            .browse_next(std::slice::from_ref(point), false)?;
        expect_len("browse next", 1, results.len())?;
        Ok(results.remove(0))
    }
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("transport", &self.transport.name())
            .field("config", &self.config)
            .field("cancelled", &self.cancel.is_cancelled())
            .finish()
    }
}

// Results are correlated positionally, so a short or long response cannot be
// trusted at all.
fn expect_len(call: &str, expected: usize, got: usize) -> Result<()> {
    if expected != got {
        return Err(Error::Transport(format!(
            "{} returned {} results for {} items",
            call, got, expected
        )));
    }
    Ok(())
}
