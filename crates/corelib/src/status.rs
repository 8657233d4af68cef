//! Status codes reported per item by the server.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A 32-bit status code. The top two bits carry the severity; zero means good.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Default, Serialize, Deserialize)]
pub struct StatusCode(pub u32);

impl StatusCode {
    pub const GOOD: StatusCode = StatusCode(0x0000_0000);
    pub const BAD_UNEXPECTED_ERROR: StatusCode = StatusCode(0x8001_0000);
    pub const BAD_INTERNAL_ERROR: StatusCode = StatusCode(0x8002_0000);
    pub const BAD_NOTHING_TO_DO: StatusCode = StatusCode(0x800F_0000);
    pub const BAD_TOO_MANY_OPERATIONS: StatusCode = StatusCode(0x8010_0000);
    pub const BAD_NODE_ID_INVALID: StatusCode = StatusCode(0x8033_0000);
    pub const BAD_NODE_ID_UNKNOWN: StatusCode = StatusCode(0x8034_0000);
    pub const BAD_ATTRIBUTE_ID_INVALID: StatusCode = StatusCode(0x8035_0000);
    pub const BAD_CONTINUATION_POINT_INVALID: StatusCode = StatusCode(0x804A_0000);
    pub const BAD_NO_CONTINUATION_POINTS: StatusCode = StatusCode(0x804B_0000);
    pub const BAD_REFERENCE_TYPE_ID_INVALID: StatusCode = StatusCode(0x804C_0000);
    pub const BAD_BROWSE_DIRECTION_INVALID: StatusCode = StatusCode(0x804D_0000);
    pub const BAD_USER_ACCESS_DENIED: StatusCode = StatusCode(0x801F_0000);

    const SEVERITY_MASK: u32 = 0xC000_0000;
    const SEVERITY_BAD: u32 = 0x8000_0000;
    const SEVERITY_UNCERTAIN: u32 = 0x4000_0000;

    #[inline]
    pub fn is_good(self) -> bool {
        self.0 & Self::SEVERITY_MASK == 0
    }

    #[inline]
    pub fn is_bad(self) -> bool {
        self.0 & Self::SEVERITY_BAD != 0
    }

    #[inline]
    pub fn is_uncertain(self) -> bool {
        self.0 & Self::SEVERITY_MASK == Self::SEVERITY_UNCERTAIN
    }

    /// Symbolic name for the codes this crate knows about.
    pub fn name(self) -> Option<&'static str> {
        Some(match self {
            Self::GOOD => "Good",
            Self::BAD_UNEXPECTED_ERROR => "BadUnexpectedError",
            Self::BAD_INTERNAL_ERROR => "BadInternalError",
            Self::BAD_NOTHING_TO_DO => "BadNothingToDo",
            Self::BAD_TOO_MANY_OPERATIONS => "BadTooManyOperations",
            Self::BAD_NODE_ID_INVALID => "BadNodeIdInvalid",
            Self::BAD_NODE_ID_UNKNOWN => "BadNodeIdUnknown",
            Self::BAD_ATTRIBUTE_ID_INVALID => "BadAttributeIdInvalid",
            Self::BAD_CONTINUATION_POINT_INVALID => "BadContinuationPointInvalid",
            Self::BAD_NO_CONTINUATION_POINTS => "BadNoContinuationPoints",
            Self::BAD_REFERENCE_TYPE_ID_INVALID => "BadReferenceTypeIdInvalid",
            Self::BAD_BROWSE_DIRECTION_INVALID => "BadBrowseDirectionInvalid",
            Self::BAD_USER_ACCESS_DENIED => "BadUserAccessDenied",
            _ => return None,
        })
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "{} (0x{:08X})", name, self.0),
            None => write!(f, "0x{:08X}", self.0),
        }
    }
}
