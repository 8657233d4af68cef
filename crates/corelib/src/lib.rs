//! Core library for browsing a remote address space.
//!
//! This crate provides the building blocks for reading attributes and
//! enumerating references of nodes on an OPC UA style server:
//! - Node identifiers, attribute ids, node classes and status codes
//! - Decoded attribute values with checked narrowing
//! - The `Transport` contract (read, browse, browse next)
//! - `Client` and `Node` handles with continuation point draining
//! - An in-memory address space for tests and fixtures

pub mod attribute;
pub mod browse;
pub mod client;
pub mod error;
pub mod memory;
pub mod node;
pub mod node_id;
pub mod status;
pub mod transport;
pub mod variant;

pub use attribute::{AccessLevel, AttributeId, NodeClass, NodeClassMask};
pub use browse::{
    reference_type, BrowseDescription, BrowseDirection, BrowseRequest, BrowseResult,
    ContinuationPoint, ReferenceDescription,
};
pub use client::{BrowseConfig, CancelToken, Client};
pub use error::{Error, Result};
pub use memory::{MemoryNode, MemoryTransport};
pub use node::Node;
pub use node_id::{Identifier, NodeId};
pub use status::StatusCode;
pub use transport::{ReadValueId, Transport};
pub use variant::{DataValue, LocalizedText, QualifiedName, Variant};
