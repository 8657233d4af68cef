//! Attribute ids, node classes and access levels.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Which property of a node a read targets.
///
/// Discriminants are the wire values.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
#[repr(u32)]
pub enum AttributeId {
    NodeId = 1,
    NodeClass = 2,
    BrowseName = 3,
    DisplayName = 4,
    Description = 5,
    WriteMask = 6,
    UserWriteMask = 7,
    IsAbstract = 8,
    Symmetric = 9,
    InverseName = 10,
    ContainsNoLoops = 11,
    EventNotifier = 12,
    Value = 13,
    DataType = 14,
    ValueRank = 15,
    ArrayDimensions = 16,
    AccessLevel = 17,
    UserAccessLevel = 18,
    MinimumSamplingInterval = 19,
    Historizing = 20,
    Executable = 21,
    UserExecutable = 22,
}

impl AttributeId {
    #[inline]
    pub fn value(self) -> u32 {
        self as u32
    }
}

impl fmt::Display for AttributeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Kind of a node. Determines how the tree walk treats it.
///
/// Discriminants are the wire values, which double as mask bits.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
#[repr(u32)]
pub enum NodeClass {
    Unspecified = 0,
    Object = 1,
    Variable = 2,
    Method = 4,
    ObjectType = 8,
    VariableType = 16,
    ReferenceType = 32,
    DataType = 64,
    View = 128,
}

impl NodeClass {
    #[inline]
    pub fn value(self) -> u32 {
        self as u32
    }

    /// Map a wire value back to a class. Unknown values yield `None`.
    pub fn from_value(value: u32) -> Option<Self> {
        Some(match value {
            0 => NodeClass::Unspecified,
            1 => NodeClass::Object,
            2 => NodeClass::Variable,
            4 => NodeClass::Method,
            8 => NodeClass::ObjectType,
            16 => NodeClass::VariableType,
            32 => NodeClass::ReferenceType,
            64 => NodeClass::DataType,
            128 => NodeClass::View,
            _ => return None,
        })
    }
}

impl fmt::Display for NodeClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Set of node classes a browse should return.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub struct NodeClassMask(pub u32);

impl NodeClassMask {
    /// Every class. Used when the caller passes no mask.
    pub const ALL: NodeClassMask = NodeClassMask(0xff);

    pub fn of(classes: &[NodeClass]) -> Self {
        NodeClassMask(classes.iter().fold(0, |acc, c| acc | c.value()))
    }

    /// True if `class` passes the mask.
    ///
    /// An empty mask passes nothing. Browsing without a filter is spelled
    /// `None` at the [`Node`](crate::Node) API, which sends [`Self::ALL`].
    pub fn contains(&self, class: NodeClass) -> bool {
        self.0 & class.value() != 0
    }
}

impl Default for NodeClassMask {
    fn default() -> Self {
        NodeClassMask::ALL
    }
}

/// The `AccessLevel` attribute byte.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Default, Serialize, Deserialize)]
pub struct AccessLevel(pub u8);

impl AccessLevel {
    pub const NONE: AccessLevel = AccessLevel(0);
    pub const CURRENT_READ: AccessLevel = AccessLevel(0x01);
    pub const CURRENT_WRITE: AccessLevel = AccessLevel(0x02);
    pub const HISTORY_READ: AccessLevel = AccessLevel(0x04);
    pub const HISTORY_WRITE: AccessLevel = AccessLevel(0x08);

    #[inline]
    pub fn contains(self, other: AccessLevel) -> bool {
        self.0 & other.0 == other.0
    }

    /// True if the current value may be written.
    #[inline]
    pub fn is_writable(self) -> bool {
        self.contains(AccessLevel::CURRENT_WRITE)
    }
}

impl std::ops::BitOr for AccessLevel {
    type Output = AccessLevel;

    fn bitor(self, rhs: AccessLevel) -> AccessLevel {
        AccessLevel(self.0 | rhs.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_class_round_trip_values() {
        for class in [NodeClass::Object, NodeClass::Variable, NodeClass::View] {
            assert_eq!(NodeClass::from_value(class.value()), Some(class));
        }
        assert_eq!(NodeClass::from_value(3), None);
    }

    #[test]
    fn test_mask_contains() {
        let mask = NodeClassMask::of(&[NodeClass::Object, NodeClass::Variable]);
        assert!(mask.contains(NodeClass::Object));
        assert!(mask.contains(NodeClass::Variable));
        assert!(!mask.contains(NodeClass::Method));

        assert!(NodeClassMask::ALL.contains(NodeClass::View));
        assert!(!NodeClassMask(0).contains(NodeClass::Method));
        assert!(!NodeClassMask(0).contains(NodeClass::Variable));
    }

    #[test]
    fn test_access_level_write_bit() {
        assert!(!AccessLevel::CURRENT_READ.is_writable());
        assert!((AccessLevel::CURRENT_READ | AccessLevel::CURRENT_WRITE).is_writable());
        assert!(AccessLevel(0xff).is_writable());
    }
}
