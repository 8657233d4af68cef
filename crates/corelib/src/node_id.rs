//! Node identifiers for the remote address space.
//!
//! A `NodeId` is a namespace index plus one of four identifier kinds. It is
//! an immutable value: cheap to compare, hash and clone, and safe to share
//! between threads.
//!
//! # Text Form
//!
//! ```text
//! i=85                 numeric, namespace 0
//! ns=2;i=1001          numeric
//! ns=1;s=Demo.Temp     string
//! ns=3;g=<uuid>        GUID
//! ns=4;b=<base64>      opaque
//! ```

use std::fmt;
use std::str::FromStr;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use uuid::Uuid;

use crate::error::{Error, Result};

/// The identifier part of a [`NodeId`].
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum Identifier {
    Numeric(u32),
    String(String),
    Guid(Uuid),
    Opaque(Vec<u8>),
}

/// Identifier of a node in the remote address space.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct NodeId {
    namespace: u16,
    identifier: Identifier,
}

impl NodeId {
    /// Construct a node id from its parts.
    pub fn new(namespace: u16, identifier: Identifier) -> Self {
        Self {
            namespace,
            identifier,
        }
    }

    pub fn numeric(namespace: u16, id: u32) -> Self {
        Self::new(namespace, Identifier::Numeric(id))
    }

    pub fn string(namespace: u16, id: impl Into<String>) -> Self {
        Self::new(namespace, Identifier::String(id.into()))
    }

    pub fn guid(namespace: u16, id: Uuid) -> Self {
        Self::new(namespace, Identifier::Guid(id))
    }

    pub fn opaque(namespace: u16, id: impl Into<Vec<u8>>) -> Self {
        Self::new(namespace, Identifier::Opaque(id.into()))
    }

    /// The null node id (`i=0`).
    pub fn null() -> Self {
        Self::numeric(0, 0)
    }

    #[inline]
    pub fn namespace(&self) -> u16 {
        self.namespace
    }

    #[inline]
    pub fn identifier(&self) -> &Identifier {
        &self.identifier
    }

    pub fn is_null(&self) -> bool {
        self.namespace == 0 && self.identifier == Identifier::Numeric(0)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.namespace != 0 {
            write!(f, "ns={};", self.namespace)?;
        }
        match &self.identifier {
            Identifier::Numeric(id) => write!(f, "i={}", id),
            Identifier::String(id) => write!(f, "s={}", id),
            Identifier::Guid(id) => write!(f, "g={}", id),
            Identifier::Opaque(id) => write!(f, "b={}", STANDARD.encode(id)),
        }
    }
}

impl FromStr for NodeId {
    type Err = Error;

    /// Parse the `ns=<n>;<t>=<v>` grammar. The namespace part is optional.
    fn from_str(s: &str) -> Result<Self> {
        let invalid = |why: &str| Error::InvalidNodeId(format!("{:?}: {}", s, why));

        let (namespace, rest) = match s.strip_prefix("ns=") {
            Some(tail) => {
                let (ns, rest) = tail
                    .split_once(';')
                    .ok_or_else(|| invalid("missing ';' after namespace"))?;
                let ns = ns
                    .parse::<u16>()
                    .map_err(|_| invalid("namespace is not a 16-bit number"))?;
                (ns, rest)
            }
            None => (0, s),
        };

        // Only split on the first '=' so string ids may contain '='.
        let (kind, value) = rest
            .split_once('=')
            .ok_or_else(|| invalid("missing identifier type"))?;

        let identifier = match kind {
            "i" => Identifier::Numeric(
                value
                    .parse()
                    .map_err(|_| invalid("numeric identifier is not a 32-bit number"))?,
            ),
            "s" => {
                if value.is_empty() {
                    return Err(invalid("empty string identifier"));
                }
                Identifier::String(value.to_string())
            }
            "g" => Identifier::Guid(Uuid::parse_str(value).map_err(|_| invalid("malformed guid"))?),
            "b" => Identifier::Opaque(
                STANDARD
                    .decode(value)
                    .map_err(|_| invalid("malformed base64"))?,
            ),
            other => return Err(invalid(&format!("unknown identifier type {:?}", other))),
        };

        Ok(Self::new(namespace, identifier))
    }
}

// NodeIds travel as their text form in fixtures and JSON output.
impl Serialize for NodeId {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for NodeId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
