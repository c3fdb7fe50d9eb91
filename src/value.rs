//! Read results: status codes, variants and data values.
//!
//! These are the decoded shapes a transport hands back for each requested
//! node. They carry no wire-format knowledge.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Per-item outcome of a read, distinct from transport success.
///
/// The top two bits classify severity: `00` good, `01` uncertain, `10` bad.
/// The low 16 bits carry info flags and are ignored when comparing against the
/// named codes below.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StatusCode(pub u32);

impl StatusCode {
    pub const GOOD: StatusCode = StatusCode(0x0000_0000);
    pub const UNCERTAIN_LAST_USABLE_VALUE: StatusCode = StatusCode(0x4090_0000);
    pub const BAD_UNEXPECTED_ERROR: StatusCode = StatusCode(0x8001_0000);
    pub const BAD_INTERNAL_ERROR: StatusCode = StatusCode(0x8002_0000);
    pub const BAD_COMMUNICATION_ERROR: StatusCode = StatusCode(0x8005_0000);
    pub const BAD_TIMEOUT: StatusCode = StatusCode(0x800A_0000);
    pub const BAD_SERVER_NOT_CONNECTED: StatusCode = StatusCode(0x800D_0000);
    pub const BAD_USER_ACCESS_DENIED: StatusCode = StatusCode(0x801F_0000);
    pub const BAD_SESSION_CLOSED: StatusCode = StatusCode(0x8026_0000);
    pub const BAD_NO_COMMUNICATION: StatusCode = StatusCode(0x8031_0000);
    pub const BAD_WAITING_FOR_INITIAL_DATA: StatusCode = StatusCode(0x8032_0000);
    pub const BAD_NODE_ID_INVALID: StatusCode = StatusCode(0x8033_0000);
    pub const BAD_NODE_ID_UNKNOWN: StatusCode = StatusCode(0x8034_0000);
    pub const BAD_ATTRIBUTE_ID_INVALID: StatusCode = StatusCode(0x8035_0000);
    pub const BAD_NOT_READABLE: StatusCode = StatusCode(0x803A_0000);
    pub const BAD_SECURE_CHANNEL_CLOSED: StatusCode = StatusCode(0x8086_0000);
    pub const BAD_CONNECTION_CLOSED: StatusCode = StatusCode(0x80AE_0000);

    const SEVERITY_MASK: u32 = 0xC000_0000;
    const CODE_MASK: u32 = 0xFFFF_0000;

    /// Exactly the canonical OK code.
    pub fn is_ok(self) -> bool {
        self == Self::GOOD
    }

    /// Severity bits are `00`.
    pub fn is_good(self) -> bool {
        self.0 & Self::SEVERITY_MASK == 0
    }

    /// Severity bits are `01`.
    pub fn is_uncertain(self) -> bool {
        self.0 & Self::SEVERITY_MASK == 0x4000_0000
    }

    /// Severity bits are `10`.
    pub fn is_bad(self) -> bool {
        self.0 & Self::SEVERITY_MASK == 0x8000_0000
    }

    /// Symbolic name for well-known codes.
    pub fn name(self) -> Option<&'static str> {
        let name = match StatusCode(self.0 & Self::CODE_MASK) {
            Self::GOOD => "Good",
            Self::UNCERTAIN_LAST_USABLE_VALUE => "UncertainLastUsableValue",
            Self::BAD_UNEXPECTED_ERROR => "BadUnexpectedError",
            Self::BAD_INTERNAL_ERROR => "BadInternalError",
            Self::BAD_COMMUNICATION_ERROR => "BadCommunicationError",
            Self::BAD_TIMEOUT => "BadTimeout",
            Self::BAD_SERVER_NOT_CONNECTED => "BadServerNotConnected",
            Self::BAD_USER_ACCESS_DENIED => "BadUserAccessDenied",
            Self::BAD_SESSION_CLOSED => "BadSessionClosed",
            Self::BAD_NO_COMMUNICATION => "BadNoCommunication",
            Self::BAD_WAITING_FOR_INITIAL_DATA => "BadWaitingForInitialData",
            Self::BAD_NODE_ID_INVALID => "BadNodeIdInvalid",
            Self::BAD_NODE_ID_UNKNOWN => "BadNodeIdUnknown",
            Self::BAD_ATTRIBUTE_ID_INVALID => "BadAttributeIdInvalid",
            Self::BAD_NOT_READABLE => "BadNotReadable",
            Self::BAD_SECURE_CHANNEL_CLOSED => "BadSecureChannelClosed",
            Self::BAD_CONNECTION_CLOSED => "BadConnectionClosed",
            _ => return None,
        };
        Some(name)
    }
}

impl Default for StatusCode {
    fn default() -> Self {
        Self::GOOD
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "{name} (0x{:08X})", self.0),
            None => write!(f, "0x{:08X}", self.0),
        }
    }
}

/// A decoded value. `Debug` output is the structural form written to the log.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub enum Variant {
    #[default]
    Empty,
    Boolean(bool),
    SByte(i8),
    Byte(u8),
    Int16(i16),
    UInt16(u16),
    Int32(i32),
    UInt32(u32),
    Int64(i64),
    UInt64(u64),
    Float(f32),
    Double(f64),
    String(String),
    DateTime(DateTime<Utc>),
    Guid(Uuid),
    ByteString(Vec<u8>),
    Array(Vec<Variant>),
    /// A type this client does not decode, kept as the transport's rendering.
    Unsupported(String),
}

impl Variant {
    /// True when the server sent no value.
    pub fn is_empty(&self) -> bool {
        matches!(self, Variant::Empty)
    }
}

macro_rules! variant_from {
    ($($ty:ty => $arm:ident),* $(,)?) => {
        $(impl From<$ty> for Variant {
            fn from(v: $ty) -> Self {
                Variant::$arm(v)
            }
        })*
    };
}

variant_from! {
    bool => Boolean,
    i8 => SByte,
    u8 => Byte,
    i16 => Int16,
    u16 => UInt16,
    i32 => Int32,
    u32 => UInt32,
    i64 => Int64,
    u64 => UInt64,
    f32 => Float,
    f64 => Double,
    String => String,
    DateTime<Utc> => DateTime,
    Uuid => Guid,
}

impl From<&str> for Variant {
    fn from(v: &str) -> Self {
        Variant::String(v.to_string())
    }
}

/// One result entry per requested node.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DataValue {
    /// Per-item status
    pub status: StatusCode,
    /// Decoded value; [`Variant::Empty`] when absent
    pub value: Variant,
    /// Timestamp applied by the data source
    pub source_timestamp: Option<DateTime<Utc>>,
    /// Timestamp applied by the server
    pub server_timestamp: Option<DateTime<Utc>>,
}

impl DataValue {
    /// Good value stamped now on both clocks.
    pub fn good(value: impl Into<Variant>) -> Self {
        let now = Utc::now();
        Self {
            status: StatusCode::GOOD,
            value: value.into(),
            source_timestamp: Some(now),
            server_timestamp: Some(now),
        }
    }

    /// Result carrying only a status.
    pub fn with_status(status: StatusCode) -> Self {
        Self {
            status,
            server_timestamp: Some(Utc::now()),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_severity() {
        assert!(StatusCode::GOOD.is_ok());
        assert!(StatusCode::GOOD.is_good());
        assert!(StatusCode::UNCERTAIN_LAST_USABLE_VALUE.is_uncertain());
        assert!(StatusCode::BAD_NODE_ID_UNKNOWN.is_bad());
        assert!(!StatusCode::BAD_NODE_ID_UNKNOWN.is_ok());
        // Good with info bits set is good but not the canonical OK code
        assert!(StatusCode(0x0000_0400).is_good());
        assert!(!StatusCode(0x0000_0400).is_ok());
    }

    #[test]
    fn test_status_display() {
        assert_eq!(
            StatusCode::BAD_NODE_ID_UNKNOWN.to_string(),
            "BadNodeIdUnknown (0x80340000)"
        );
        assert_eq!(StatusCode(0x80FF_0000).to_string(), "0x80FF0000");
        assert_eq!(StatusCode(0x8034_0400).name(), Some("BadNodeIdUnknown"));
    }

    #[test]
    fn test_variant_debug_is_structural() {
        assert_eq!(format!("{:?}", Variant::from(42i32)), "Int32(42)");
        assert_eq!(format!("{:?}", Variant::from("on")), "String(\"on\")");
        assert_eq!(format!("{:?}", Variant::Empty), "Empty");
    }

    #[test]
    fn test_data_value_constructors() {
        let ok = DataValue::good(1.5f64);
        assert!(ok.status.is_ok());
        assert_eq!(ok.value, Variant::Double(1.5));
        assert!(ok.source_timestamp.is_some());

        let bad = DataValue::with_status(StatusCode::BAD_NOT_READABLE);
        assert!(bad.value.is_empty());
        assert!(bad.source_timestamp.is_none());
    }
}
