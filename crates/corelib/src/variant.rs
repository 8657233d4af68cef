//! Attribute values.
//!
//! Values come back from a read as a tagged union. The accessors on
//! [`Variant`] narrow it to the shape an attribute is expected to have and
//! fail with [`Error::TypeMismatch`] instead of guessing.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::attribute::{AccessLevel, NodeClass};
use crate::error::{Error, Result};
use crate::node_id::NodeId;
use crate::status::StatusCode;

/// Name qualified by the namespace that defines it (the `BrowseName` shape).
#[derive(Clone, PartialEq, Eq, Hash, Debug, Default, Serialize, Deserialize)]
pub struct QualifiedName {
    #[serde(default)]
    pub namespace_index: u16,
    pub name: String,
}

impl QualifiedName {
    pub fn new(namespace_index: u16, name: impl Into<String>) -> Self {
        Self {
            namespace_index,
            name: name.into(),
        }
    }
}

impl fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.namespace_index != 0 {
            write!(f, "{}:", self.namespace_index)?;
        }
        f.write_str(&self.name)
    }
}

/// Human-readable text with an optional locale
/// (the `DisplayName`/`Description` shape).
#[derive(Clone, PartialEq, Eq, Hash, Debug, Default, Serialize, Deserialize)]
pub struct LocalizedText {
    #[serde(default)]
    pub locale: String,
    #[serde(default)]
    pub text: String,
}

impl LocalizedText {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            locale: String::new(),
            text: text.into(),
        }
    }

    pub fn with_locale(locale: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            locale: locale.into(),
            text: text.into(),
        }
    }
}

impl fmt::Display for LocalizedText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// A decoded attribute value.
#[derive(Clone, PartialEq, Debug, Default, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum Variant {
    #[default]
    Empty,
    Boolean(bool),
    Byte(u8),
    Int32(i32),
    UInt32(u32),
    Int64(i64),
    Double(f64),
    String(String),
    NodeId(NodeId),
    QualifiedName(QualifiedName),
    LocalizedText(LocalizedText),
    ByteString(Vec<u8>),
}

impl Variant {
    /// Name of the variant's shape, used in mismatch errors.
    pub fn type_name(&self) -> &'static str {
        match self {
            Variant::Empty => "Empty",
            Variant::Boolean(_) => "Boolean",
            Variant::Byte(_) => "Byte",
            Variant::Int32(_) => "Int32",
            Variant::UInt32(_) => "UInt32",
            Variant::Int64(_) => "Int64",
            Variant::Double(_) => "Double",
            Variant::String(_) => "String",
            Variant::NodeId(_) => "NodeId",
            Variant::QualifiedName(_) => "QualifiedName",
            Variant::LocalizedText(_) => "LocalizedText",
            Variant::ByteString(_) => "ByteString",
        }
    }

    fn mismatch(&self, expected: &'static str) -> Error {
        Error::TypeMismatch {
            expected,
            found: self.type_name(),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Variant::Empty)
    }

    /// Integer payloads widened to `i64`.
    pub fn as_i64(&self) -> Result<i64> {
        match *self {
            Variant::Byte(v) => Ok(v as i64),
            Variant::Int32(v) => Ok(v as i64),
            Variant::UInt32(v) => Ok(v as i64),
            Variant::Int64(v) => Ok(v),
            _ => Err(self.mismatch("integer")),
        }
    }

    pub fn as_byte(&self) -> Result<u8> {
        match *self {
            Variant::Byte(v) => Ok(v),
            _ => Err(self.mismatch("Byte")),
        }
    }

    pub fn as_bool(&self) -> Result<bool> {
        match *self {
            Variant::Boolean(v) => Ok(v),
            _ => Err(self.mismatch("Boolean")),
        }
    }

    pub fn as_str(&self) -> Result<&str> {
        match self {
            Variant::String(v) => Ok(v),
            _ => Err(self.mismatch("String")),
        }
    }

    /// The `NodeClass` attribute arrives as a 32-bit integer.
    ///
    /// Values outside the known classes map to [`NodeClass::Unspecified`].
    pub fn as_node_class(&self) -> Result<NodeClass> {
        let raw = match *self {
            Variant::Int32(v) => v as u32,
            Variant::UInt32(v) => v,
            _ => return Err(self.mismatch("NodeClass")),
        };
        Ok(NodeClass::from_value(raw).unwrap_or(NodeClass::Unspecified))
    }

    pub fn as_access_level(&self) -> Result<AccessLevel> {
        self.as_byte()
            .map(AccessLevel)
            .map_err(|_| self.mismatch("AccessLevel"))
    }

    pub fn as_node_id(&self) -> Result<&NodeId> {
        match self {
            Variant::NodeId(v) => Ok(v),
            _ => Err(self.mismatch("NodeId")),
        }
    }

    pub fn as_qualified_name(&self) -> Result<&QualifiedName> {
        match self {
            Variant::QualifiedName(v) => Ok(v),
            _ => Err(self.mismatch("QualifiedName")),
        }
    }

    pub fn as_localized_text(&self) -> Result<&LocalizedText> {
        match self {
            Variant::LocalizedText(v) => Ok(v),
            _ => Err(self.mismatch("LocalizedText")),
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Variant::Empty => f.write_str("(empty)"),
            Variant::Boolean(v) => write!(f, "{}", v),
            Variant::Byte(v) => write!(f, "{}", v),
            Variant::Int32(v) => write!(f, "{}", v),
            Variant::UInt32(v) => write!(f, "{}", v),
            Variant::Int64(v) => write!(f, "{}", v),
            Variant::Double(v) => write!(f, "{}", v),
            Variant::String(v) => write!(f, "{:?}", v),
            Variant::NodeId(v) => write!(f, "{}", v),
            Variant::QualifiedName(v) => write!(f, "{}", v),
            Variant::LocalizedText(v) => write!(f, "{:?}", v.text),
            Variant::ByteString(v) => write!(f, "<{} bytes>", v.len()),
        }
    }
}

impl From<NodeClass> for Variant {
    fn from(class: NodeClass) -> Self {
        Variant::Int32(class.value() as i32)
    }
}

impl From<AccessLevel> for Variant {
    fn from(level: AccessLevel) -> Self {
        Variant::Byte(level.0)
    }
}

impl From<QualifiedName> for Variant {
    fn from(name: QualifiedName) -> Self {
        Variant::QualifiedName(name)
    }
}

impl From<LocalizedText> for Variant {
    fn from(text: LocalizedText) -> Self {
        Variant::LocalizedText(text)
    }
}

/// One read result: the item status and, when good, its value.
#[derive(Clone, PartialEq, Debug, Default, Serialize, Deserialize)]
pub struct DataValue {
    #[serde(default)]
    pub status: StatusCode,
    #[serde(default)]
    pub value: Variant,
}

impl DataValue {
    pub fn good(value: impl Into<Variant>) -> Self {
        Self {
            status: StatusCode::GOOD,
            value: value.into(),
        }
    }

    pub fn bad(status: StatusCode) -> Self {
        Self {
            status,
            value: Variant::Empty,
        }
    }
}
