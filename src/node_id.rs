//! Node identifiers
//!
//! A [`NodeId`] names one addressable data point on the remote server. It is a
//! namespace index plus one of four identifier kinds, written in the textual
//! form servers and engineering tools use:
//!
//! | Text | Identifier |
//! |---|---|
//! | `ns=1;i=2345` | numeric (`u32`) |
//! | `ns=2;s=Line1.Temperature` | string |
//! | `ns=3;g=72962b91-fa75-4ae6-8d28-b404dc7daf63` | GUID |
//! | `ns=4;b=AQIDBA==` | opaque (base64 bytes) |
//!
//! The `ns=` part may be omitted, in which case namespace 0 is implied. An
//! identifier without a recognised `i=`/`s=`/`g=`/`b=` prefix is taken as a
//! string identifier. The empty string parses to the null node (`i=0`).
//!
//! # Example
//! ```
//! use ua_poller::node_id::{Identifier, NodeId};
//!
//! let id: NodeId = "ns=1;i=2345".parse()?;
//! assert_eq!(id.namespace, 1);
//! assert_eq!(id.identifier, Identifier::Numeric(2345));
//! assert_eq!(id.to_string(), "ns=1;i=2345");
//! # Ok::<(), ua_poller::node_id::InvalidIdentifierError>(())
//! ```

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

/// Reasons a textual node identifier is rejected.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InvalidIdentifierError {
    #[error("invalid node id: {0}")]
    Malformed(String),

    #[error("namespace urls require a server namespace array: {0}")]
    NamespaceUri(String),

    #[error("invalid namespace index: {0}")]
    InvalidNamespace(String),

    #[error("namespace index out of range (0..65535): {0}")]
    NamespaceOutOfRange(String),

    #[error("invalid numeric id: {0}")]
    InvalidNumeric(String),

    #[error("numeric id out of range (0..2^32-1): {0}")]
    NumericOutOfRange(String),

    #[error("invalid guid: {0}")]
    InvalidGuid(String),

    #[error("invalid opaque id (expected base64): {0}")]
    InvalidOpaque(String),
}

/// The identifier part of a [`NodeId`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Identifier {
    Numeric(u32),
    String(String),
    Guid(Uuid),
    Opaque(Vec<u8>),
}

/// A parsed reference to one addressable data point.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeId {
    /// Namespace index on the server
    pub namespace: u16,
    /// Identifier within the namespace
    pub identifier: Identifier,
}

impl NodeId {
    /// Numeric node id.
    pub fn numeric(namespace: u16, id: u32) -> Self {
        Self {
            namespace,
            identifier: Identifier::Numeric(id),
        }
    }

    /// String node id.
    pub fn string(namespace: u16, id: impl Into<String>) -> Self {
        Self {
            namespace,
            identifier: Identifier::String(id.into()),
        }
    }

    /// The null node id (`ns=0;i=0`).
    pub fn null() -> Self {
        Self::numeric(0, 0)
    }

    /// True for `ns=0;i=0`.
    pub fn is_null(&self) -> bool {
        self.namespace == 0 && self.identifier == Identifier::Numeric(0)
    }
}

/// Parse a textual node reference.
///
/// Total and deterministic: every input either yields a complete [`NodeId`] or
/// an [`InvalidIdentifierError`], never a partially built value.
pub fn parse_node_identifier(text: &str) -> Result<NodeId, InvalidIdentifierError> {
    if text.is_empty() {
        return Ok(NodeId::null());
    }

    if text.starts_with("nsu=") {
        return Err(InvalidIdentifierError::NamespaceUri(text.to_string()));
    }

    // Only an explicit namespace is split off; `s=Tank;Level` is one string id.
    let (ns_part, id_part) = if text.starts_with("ns=") {
        text.split_once(';')
            .ok_or_else(|| InvalidIdentifierError::Malformed(text.to_string()))?
    } else {
        ("ns=0", text)
    };

    let namespace = parse_namespace(ns_part, text)?;
    let identifier = parse_identifier(id_part, text)?;

    Ok(NodeId {
        namespace,
        identifier,
    })
}

fn parse_namespace(part: &str, text: &str) -> Result<u16, InvalidIdentifierError> {
    let Some(digits) = part.strip_prefix("ns=") else {
        return Err(InvalidIdentifierError::Malformed(text.to_string()));
    };

    let value: i64 = digits
        .parse()
        .map_err(|_| InvalidIdentifierError::InvalidNamespace(text.to_string()))?;
    u16::try_from(value).map_err(|_| InvalidIdentifierError::NamespaceOutOfRange(text.to_string()))
}

fn parse_identifier(part: &str, text: &str) -> Result<Identifier, InvalidIdentifierError> {
    if let Some(digits) = part.strip_prefix("i=") {
        if digits.starts_with('+') {
            return Err(InvalidIdentifierError::InvalidNumeric(text.to_string()));
        }
        let value: u64 = digits
            .parse()
            .map_err(|_| InvalidIdentifierError::InvalidNumeric(text.to_string()))?;
        return u32::try_from(value)
            .map(Identifier::Numeric)
            .map_err(|_| InvalidIdentifierError::NumericOutOfRange(text.to_string()));
    }
    if let Some(s) = part.strip_prefix("s=") {
        return Ok(Identifier::String(s.to_string()));
    }
    if let Some(g) = part.strip_prefix("g=") {
        return Uuid::parse_str(g)
            .map(Identifier::Guid)
            .map_err(|_| InvalidIdentifierError::InvalidGuid(text.to_string()));
    }
    if let Some(b) = part.strip_prefix("b=") {
        return BASE64
            .decode(b)
            .map(Identifier::Opaque)
            .map_err(|_| InvalidIdentifierError::InvalidOpaque(text.to_string()));
    }
    // "ns=1;ns=2" and friends
    if part.starts_with("ns=") {
        return Err(InvalidIdentifierError::Malformed(text.to_string()));
    }
    Ok(Identifier::String(part.to_string()))
}

impl FromStr for NodeId {
    type Err = InvalidIdentifierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_node_identifier(s)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.namespace != 0 {
            write!(f, "ns={};", self.namespace)?;
        }
        match &self.identifier {
            Identifier::Numeric(id) => write!(f, "i={id}"),
            Identifier::String(id) => write!(f, "s={id}"),
            Identifier::Guid(id) => write!(f, "g={id}"),
            Identifier::Opaque(bytes) => write!(f, "b={}", BASE64.encode(bytes)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_numeric_with_namespace() {
        let id = parse_node_identifier("ns=1;i=2345").unwrap();
        assert_eq!(id, NodeId::numeric(1, 2345));
    }

    #[test]
    fn test_parse_without_namespace_defaults_to_zero() {
        assert_eq!(parse_node_identifier("i=85").unwrap(), NodeId::numeric(0, 85));
        assert_eq!(
            parse_node_identifier("s=Server").unwrap(),
            NodeId::string(0, "Server")
        );
    }

    #[test]
    fn test_parse_string_guid_and_opaque() {
        assert_eq!(
            parse_node_identifier("ns=2;s=Line1.Temperature").unwrap(),
            NodeId::string(2, "Line1.Temperature")
        );

        let guid = parse_node_identifier("ns=3;g=72962b91-fa75-4ae6-8d28-b404dc7daf63").unwrap();
        assert_eq!(guid.namespace, 3);
        assert!(matches!(guid.identifier, Identifier::Guid(_)));

        let opaque = parse_node_identifier("ns=4;b=AQIDBA==").unwrap();
        assert_eq!(opaque.identifier, Identifier::Opaque(vec![1, 2, 3, 4]));
    }

    #[test]
    fn test_unprefixed_identifier_is_string() {
        assert_eq!(
            parse_node_identifier("ns=5;Boiler/Pressure").unwrap(),
            NodeId::string(5, "Boiler/Pressure")
        );
    }

    #[test]
    fn test_semicolon_without_namespace_stays_in_identifier() {
        assert_eq!(
            parse_node_identifier("s=Tank;Level").unwrap(),
            NodeId::string(0, "Tank;Level")
        );
        assert_eq!(
            parse_node_identifier("foo=1;i=1").unwrap(),
            NodeId::string(0, "foo=1;i=1")
        );
        assert_eq!(
            parse_node_identifier("ns=2;s=Tank;Level").unwrap(),
            NodeId::string(2, "Tank;Level")
        );
    }

    #[test]
    fn test_empty_is_null_node() {
        let id = parse_node_identifier("").unwrap();
        assert!(id.is_null());
    }

    #[test]
    fn test_invalid_inputs_are_rejected() {
        let cases = [
            ("ns=x;i=1", "namespace"),
            ("ns=70000;i=1", "namespace range"),
            ("ns=-1;i=1", "negative namespace"),
            ("ns=1;i=abc", "numeric"),
            ("ns=1;i=4294967296", "numeric range"),
            ("ns=1;g=not-a-guid", "guid"),
            ("ns=1;b=%%%", "base64"),
            ("nsu=http://example.org;i=1", "namespace uri"),
            ("ns=1;ns=2", "double namespace"),
            ("ns=1", "namespace without identifier"),
            ("ns=1;i=+5", "signed numeric"),
            ("i=+5", "signed numeric without namespace"),
        ];
        for (input, label) in cases {
            assert!(
                parse_node_identifier(input).is_err(),
                "{label}: '{input}' should not parse"
            );
        }
    }

    #[test]
    fn test_error_variants() {
        assert!(matches!(
            parse_node_identifier("ns=70000;i=1"),
            Err(InvalidIdentifierError::NamespaceOutOfRange(_))
        ));
        assert!(matches!(
            parse_node_identifier("nsu=urn:x;s=a"),
            Err(InvalidIdentifierError::NamespaceUri(_))
        ));
        let err = parse_node_identifier("ns=1;i=abc").unwrap_err();
        assert_eq!(err.to_string(), "invalid numeric id: ns=1;i=abc");
    }

    #[test]
    fn test_parse_is_deterministic() {
        let a = parse_node_identifier("ns=2;s=Tank.Level").unwrap();
        let b = parse_node_identifier("ns=2;s=Tank.Level").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_display_matches_input_form() {
        for text in ["ns=1;i=2345", "i=85", "ns=2;s=Tank.Level", "ns=4;b=AQIDBA=="] {
            assert_eq!(parse_node_identifier(text).unwrap().to_string(), text);
        }
    }
}
