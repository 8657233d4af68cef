//! Walk settings.
//!
//! A walk is shaped by four independent choices:
//!
//! - **ErrorPolicy**: abort on the first failing branch, or skip and record it
//! - **Writability**: read the access level of each variable, or report
//!   every variable as read-only
//! - **Fanout**: expand siblings one after another, or on worker threads
//! - **detect_cycles**: additionally skip nodes that are their own ancestor

/// What to do when a branch fails.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum ErrorPolicy {
    /// Return the first error; no partial result.
    #[default]
    FailFast,
    /// Drop the failing branch, record the error, keep walking its siblings.
    ///
    /// Only children are dropped: a root that cannot be visited, and any
    /// cancellation, still abort the whole walk.
    Collect,
}

/// How the `writable` flag of a variable is decided.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum Writability {
    /// Read `AccessLevel` and test the current-write bit.
    ///
    /// The access level joins the summary read of every node, and a
    /// variable that refuses it fails like any other unreadable attribute
    /// (its branch is lost, or the walk aborts under
    /// [`ErrorPolicy::FailFast`]). Servers that hide `AccessLevel` need
    /// [`Writability::Disabled`] to be walked.
    #[default]
    AccessLevel,
    /// Skip the read; every variable is reported as not writable.
    Disabled,
}

/// How sibling subtrees are expanded.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum Fanout {
    #[default]
    Sequential,
    /// Expand siblings on scoped worker threads, at most `max_threads`
    /// extra threads across the whole walk. Results keep child order.
    ///
    /// Requires a transport that accepts concurrent requests. Under
    /// `FailFast`, siblings already started run to completion before the
    /// first error (in child order) is returned.
    Parallel { max_threads: usize },
}

/// Settings for a [`TreeWalker`](crate::TreeWalker).
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct WalkConfig {
    /// Nodes deeper than this are silently skipped. The root is depth 0.
    pub max_depth: usize,
    pub error_policy: ErrorPolicy,
    pub writability: Writability,
    pub fanout: Fanout,
    /// Skip a node that already appears on the path from the root to it.
    /// The depth bound alone guarantees termination; this only cuts
    /// cycles short. A node reachable along several routes is still
    /// expanded once per route.
    pub detect_cycles: bool,
}

impl WalkConfig {
    pub const DEFAULT_MAX_DEPTH: usize = 10;
}

impl Default for WalkConfig {
    fn default() -> Self {
        Self {
            max_depth: Self::DEFAULT_MAX_DEPTH,
            error_policy: ErrorPolicy::default(),
            writability: Writability::default(),
            fanout: Fanout::default(),
            detect_cycles: false,
        }
    }
}
