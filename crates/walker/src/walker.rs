//! Recursive subtree expansion.
//!
//! # Algorithm
//!
//! For each node, depth first:
//!
//! 1. Stop (empty result, no error) once `depth > max_depth`. The address
//!    space is a graph, not a tree, so this bound is what guarantees the
//!    recursion ends.
//! 2. Read NodeClass, BrowseName and Description (plus AccessLevel when
//!    writability is checked) in one batched read.
//! 3. Extend the parent path with the browse name.
//! 4. Objects recurse into their hierarchical children at `depth + 1`,
//!    variables yield one [`VariableDescriptor`], every other class yields
//!    nothing.
//!
//! With cycle detection on, a node that already appears among its own
//! ancestors yields nothing. Only the chain from the root down is
//! consulted, so a node reached again along a different route is still
//! expanded and the result does not depend on sibling order or timing.
//!
//! Branches share nothing but the thread budget, so siblings can be
//! expanded concurrently.

use std::sync::atomic::{AtomicUsize, Ordering};

use corelib::{AttributeId, DataValue, Error, Node, NodeClass, NodeId, Result, Variant};
use crossbeam::thread::ScopedJoinHandle;
use tracing::{debug, warn};

use crate::descriptor::{BranchError, VariableDescriptor, WalkReport};
use crate::path;
use crate::policy::{ErrorPolicy, Fanout, WalkConfig, Writability};

/// Attributes read for every visited node, in this order.
const SUMMARY: [AttributeId; 3] = [
    AttributeId::NodeClass,
    AttributeId::BrowseName,
    AttributeId::Description,
];

/// Walks the subtree under a node and flattens its variables.
///
/// # Example
///
/// ```rust
/// use corelib::{Client, MemoryNode, MemoryTransport, NodeId};
/// use walker::TreeWalker;
///
/// let transport = MemoryTransport::new()
///     .with_node(MemoryNode::object(NodeId::numeric(1, 1), "Device")
///         .with_component(NodeId::numeric(1, 2)))
///     .with_node(MemoryNode::variable(NodeId::numeric(1, 2), "Temp", "Temp sensor"));
/// let client = Client::new(transport);
///
/// let variables = TreeWalker::new()
///     .walk_root(&client.node(NodeId::numeric(1, 1)))
///     .unwrap();
/// assert_eq!(variables[0].path, "Device.Temp");
/// ```
#[derive(Clone, Debug, Default)]
pub struct TreeWalker {
    config: WalkConfig,
}

/// Per-walk state shared by every branch of one root walk.
struct WalkContext {
    /// Worker threads still available for fan-out.
    spare_threads: AtomicUsize,
}

/// The objects between the walk root and the node being visited.
#[derive(Clone, Copy)]
struct Ancestry<'a> {
    id: &'a NodeId,
    parent: Option<&'a Ancestry<'a>>,
}

impl Ancestry<'_> {
    fn contains(&self, id: &NodeId) -> bool {
        let mut link = Some(self);
        while let Some(ancestor) = link {
            if ancestor.id == id {
                return true;
            }
            link = ancestor.parent;
        }
        false
    }
}

impl WalkContext {
    fn new(config: &WalkConfig) -> Self {
        let spare_threads = match config.fanout {
            Fanout::Sequential => 0,
            Fanout::Parallel { max_threads } => max_threads,
        };
        Self {
            spare_threads: AtomicUsize::new(spare_threads),
        }
    }

    fn try_take_thread(&self) -> bool {
        self.spare_threads
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1))
            .is_ok()
    }

    fn return_thread(&self) {
        self.spare_threads.fetch_add(1, Ordering::AcqRel);
    }
}

/// Node class, name and description of a visited node.
struct Summary {
    class: NodeClass,
    name: String,
    description: String,
    writable: bool,
}

enum Branch<'scope> {
    Spawned(ScopedJoinHandle<'scope, Result<WalkReport>>),
    Inline(Result<WalkReport>),
}

impl TreeWalker {
    /// Walker with default settings: depth 10, fail fast, access level
    /// checked, sequential.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: WalkConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.config.max_depth = max_depth;
        self
    }

    #[must_use]
    pub fn with_error_policy(mut self, policy: ErrorPolicy) -> Self {
        self.config.error_policy = policy;
        self
    }

    #[must_use]
    pub fn with_writability(mut self, writability: Writability) -> Self {
        self.config.writability = writability;
        self
    }

    #[must_use]
    pub fn with_fanout(mut self, fanout: Fanout) -> Self {
        self.config.fanout = fanout;
        self
    }

    #[must_use]
    pub fn with_cycle_detection(mut self, enabled: bool) -> Self {
        self.config.detect_cycles = enabled;
        self
    }

    pub fn config(&self) -> &WalkConfig {
        &self.config
    }

    /// Walk from `node` as the root: empty path, depth 0.
    pub fn walk_root(&self, node: &Node) -> Result<Vec<VariableDescriptor>> {
        self.walk(node, "", 0)
    }

    /// Variables under `node`, whose parent path is `path`, starting at
    /// `depth`.
    ///
    /// Under [`ErrorPolicy::Collect`] failed branches are logged and left
    /// out; use [`TreeWalker::walk_report`] to get them back.
    ///
    /// # Errors
    ///
    /// The first error of any branch under [`ErrorPolicy::FailFast`].
    /// Under either policy, a failure to visit `node` itself and
    /// [`Error::Cancelled`].
    pub fn walk(
        &self,
        node: &Node,
        path: &str,
        depth: usize,
    ) -> Result<Vec<VariableDescriptor>> {
        let report = self.walk_report_from(node, path, depth)?;
        for failure in &report.errors {
            warn!(%failure, "branch skipped");
        }
        Ok(report.variables)
    }

    /// Like [`TreeWalker::walk_root`] but also returns the branches skipped
    /// under [`ErrorPolicy::Collect`].
    pub fn walk_report(&self, node: &Node) -> Result<WalkReport> {
        self.walk_report_from(node, "", 0)
    }

    /// The error policy only applies below the root: a root that cannot be
    /// visited fails the walk under either policy.
    fn walk_report_from(&self, node: &Node, path: &str, depth: usize) -> Result<WalkReport> {
        let ctx = WalkContext::new(&self.config);
        self.visit(node, path, depth, None, &ctx)
    }

    /// Apply the error policy to one child branch.
    fn expand(
        &self,
        node: &Node,
        parent_path: &str,
        depth: usize,
        ancestry: Option<&Ancestry<'_>>,
        ctx: &WalkContext,
    ) -> Result<WalkReport> {
        let collect = self.config.error_policy == ErrorPolicy::Collect;
        match self.visit(node, parent_path, depth, ancestry, ctx) {
            Err(error) if collect && !matches!(error, Error::Cancelled) => {
                debug!(node = %node, path = parent_path, %error, "branch failed");
                Ok(WalkReport::failed(BranchError {
                    node_id: node.id().clone(),
                    parent_path: parent_path.to_string(),
                    error,
                }))
            }
            outcome => outcome,
        }
    }

    fn visit(
        &self,
        node: &Node,
        parent_path: &str,
        depth: usize,
        ancestry: Option<&Ancestry<'_>>,
        ctx: &WalkContext,
    ) -> Result<WalkReport> {
        debug!(node = %node, path = parent_path, level = depth, "visit");
        if depth > self.config.max_depth {
            return Ok(WalkReport::default());
        }
        if self.config.detect_cycles && ancestry.is_some_and(|a| a.contains(node.id())) {
            debug!(node = %node, "cycle");
            return Ok(WalkReport::default());
        }

        let summary = self.summarize(node)?;
        let path = path::join(parent_path, &summary.name);

        match summary.class {
            NodeClass::Object => {
                let children = node.children(None, None)?;
                let here = Ancestry {
                    id: node.id(),
                    parent: ancestry,
                };
                self.expand_children(&children, &path, depth + 1, Some(&here), ctx)
            }
            NodeClass::Variable => Ok(WalkReport::variable(VariableDescriptor {
                node_id: node.id().clone(),
                path,
                description: summary.description,
                writable: summary.writable,
                data_type: None,
            })),
            _ => Ok(WalkReport::default()),
        }
    }

    fn expand_children(
        &self,
        children: &[Node],
        path: &str,
        depth: usize,
        ancestry: Option<&Ancestry<'_>>,
        ctx: &WalkContext,
    ) -> Result<WalkReport> {
        let outcomes = match self.config.fanout {
            Fanout::Parallel { .. } if children.len() > 1 => {
                self.expand_parallel(children, path, depth, ancestry, ctx)
            }
            _ => {
                let mut outcomes = Vec::with_capacity(children.len());
                for child in children {
                    let outcome = self.expand(child, path, depth, ancestry, ctx);
                    let failed = outcome.is_err();
                    outcomes.push(outcome);
                    if failed {
                        break;
                    }
                }
                outcomes
            }
        };

        let mut report = WalkReport::default();
        for outcome in outcomes {
            report.absorb(outcome?);
        }
        Ok(report)
    }

    /// Siblings get a worker thread while spare ones remain; the rest run on
    /// the current thread. Outcomes come back in child order.
    fn expand_parallel(
        &self,
        children: &[Node],
        path: &str,
        depth: usize,
        ancestry: Option<&Ancestry<'_>>,
        ctx: &WalkContext,
    ) -> Vec<Result<WalkReport>> {
        crossbeam::thread::scope(|scope| {
            let mut branches = Vec::with_capacity(children.len());
            for child in children {
                if ctx.try_take_thread() {
                    branches.push(Branch::Spawned(scope.spawn(move |_| {
                        let outcome = self.expand(child, path, depth, ancestry, ctx);
                        ctx.return_thread();
                        outcome
                    })));
                } else {
                    branches.push(Branch::Inline(
                        self.expand(child, path, depth, ancestry, ctx),
                    ));
                }
            }
            branches
                .into_iter()
                .map(|branch| match branch {
                    Branch::Spawned(handle) => handle
                        .join()
                        .unwrap_or_else(|panic| std::panic::resume_unwind(panic)),
                    Branch::Inline(outcome) => outcome,
                })
                .collect()
        })
        .unwrap_or_else(|panic| std::panic::resume_unwind(panic))
    }

    /// One batched read for everything the walk needs from a node.
    fn summarize(&self, node: &Node) -> Result<Summary> {
        let check_access = self.config.writability == Writability::AccessLevel;
        let mut attributes = SUMMARY.to_vec();
        if check_access {
            attributes.push(AttributeId::AccessLevel);
        }
        let values = node.attributes(&attributes)?;
        let item = |index: usize| checked(node, &attributes, &values, index);

        let class = item(0)?.as_node_class()?;
        let name = item(1)?.as_qualified_name()?.name.clone();
        let description = item(2)?.as_localized_text()?.text.clone();

        // Only variables carry an access level; objects answer the extra
        // item with a bad status that is ignored.
        let writable = if check_access && class == NodeClass::Variable {
            item(3)?.as_access_level()?.is_writable()
        } else {
            false
        };

        Ok(Summary {
            class,
            name,
            description,
            writable,
        })
    }
}

/// Value of read item `index`, or the item's bad status as an error.
fn checked<'a>(
    node: &Node,
    attributes: &[AttributeId],
    values: &'a [DataValue],
    index: usize,
) -> Result<&'a Variant> {
    let value = &values[index];
    if !value.status.is_good() {
        return Err(Error::Status {
            node: node.id().clone(),
            attribute: Some(attributes[index]),
            status: value.status,
        });
    }
    Ok(&value.value)
}
