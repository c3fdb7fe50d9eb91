//! OPC UA transport over the `opcua` crate.
//!
//! The `opcua` client API is blocking, so connect, read and disconnect each
//! run on `tokio::task::spawn_blocking`. Secure channel negotiation, encoding
//! and session management stay inside the `opcua` crate; this module only
//! converts between its types and the crate's own.
//!
//! Only anonymous identity is supported. `Sign` and `SignAndEncrypt` use the
//! Basic256Sha256 policy with a generated sample keypair and trust any server
//! certificate.

use crate::error::{ReadError, TransportError};
use crate::node_id::{Identifier, NodeId};
use crate::request::{ReadRequest, ReadValueId, TimestampsToReturn};
use crate::session::{Connector, Endpoint, SecurityMode, Session, TransportConfig};
use crate::value::{DataValue, StatusCode, Variant};
use async_trait::async_trait;
use opcua::client::prelude::{
    AttributeService, ClientBuilder, IdentityToken, MessageSecurityMode, SecurityPolicy,
    Session as UaSession, UserTokenPolicy,
};
use opcua::sync::RwLock;
use opcua::types as ua;
use std::str::FromStr;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

/// [`Connector`] for `opc.tcp://` endpoints.
pub struct OpcUaConnector {
    config: TransportConfig,
}

impl OpcUaConnector {
    /// Connector announcing `config.application_name`.
    pub fn new(config: TransportConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl Connector for OpcUaConnector {
    async fn connect(
        &self,
        endpoint: &Endpoint,
        mode: SecurityMode,
    ) -> Result<Box<dyn Session>, TransportError> {
        let url = endpoint.to_string();
        let config = self.config.clone();
        let debug = config.debug;

        let session = tokio::task::spawn_blocking(move || connect_blocking(&url, mode, &config))
            .await
            .map_err(|e| TransportError::Other(format!("connect task failed: {e}")))??;

        Ok(Box::new(OpcUaSession { session, debug }))
    }
}

fn connect_blocking(
    url: &str,
    mode: SecurityMode,
    config: &TransportConfig,
) -> Result<Arc<RwLock<UaSession>>, TransportError> {
    let mut client = ClientBuilder::new()
        .application_name(config.application_name.clone())
        .application_uri(format!("urn:{}", config.application_name))
        .product_uri(format!("urn:{}", config.application_name))
        .create_sample_keypair(mode != SecurityMode::None)
        .trust_server_certs(true)
        .session_retry_limit(0)
        .client()
        .ok_or_else(|| TransportError::Other("invalid OPC UA client configuration".into()))?;

    let (policy, ua_mode) = match mode {
        SecurityMode::None => (SecurityPolicy::None, MessageSecurityMode::None),
        SecurityMode::Sign => (SecurityPolicy::Basic256Sha256, MessageSecurityMode::Sign),
        SecurityMode::SignAndEncrypt => (
            SecurityPolicy::Basic256Sha256,
            MessageSecurityMode::SignAndEncrypt,
        ),
    };

    if config.debug {
        debug!(url, policy = policy.to_str(), ?ua_mode, "opening OPC UA session");
    }

    let endpoint: ua::EndpointDescription =
        (url, policy.to_str(), ua_mode, UserTokenPolicy::anonymous()).into();
    client
        .connect_to_endpoint(endpoint, IdentityToken::Anonymous)
        .map_err(|status| TransportError::Service(StatusCode(status.bits())))
}

/// A live `opcua` session.
pub struct OpcUaSession {
    session: Arc<RwLock<UaSession>>,
    debug: bool,
}

#[async_trait]
impl Session for OpcUaSession {
    async fn read(&self, request: &ReadRequest) -> Result<Vec<DataValue>, ReadError> {
        let nodes = request
            .nodes_to_read
            .iter()
            .map(to_ua_read_value_id)
            .collect::<Result<Vec<_>, _>>()?;
        let timestamps = to_ua_timestamps(request.timestamps_to_return);
        let max_age = request.max_age;

        if self.debug {
            debug!(nodes = ?nodes, max_age, "OPC UA read request");
        }

        let session = Arc::clone(&self.session);
        let values = tokio::task::spawn_blocking(move || {
            session.read().read(&nodes, timestamps, max_age)
        })
        .await
        .map_err(|e| TransportError::Other(format!("read task failed: {e}")))?
        .map_err(|status| TransportError::Service(StatusCode(status.bits())))?;

        if self.debug {
            debug!(values = ?values, "OPC UA read response");
        }

        Ok(values.into_iter().map(from_ua_data_value).collect())
    }

    async fn close(&self) -> Result<(), TransportError> {
        let session = Arc::clone(&self.session);
        tokio::task::spawn_blocking(move || session.read().disconnect())
            .await
            .map_err(|e| TransportError::Other(format!("disconnect task failed: {e}")))
    }
}

fn to_ua_node_id(id: &NodeId) -> Result<ua::NodeId, TransportError> {
    let identifier = match &id.identifier {
        Identifier::Numeric(n) => ua::Identifier::Numeric(*n),
        Identifier::String(s) => ua::Identifier::String(ua::UAString::from(s.as_str())),
        Identifier::Guid(g) => ua::Identifier::Guid(
            ua::Guid::from_str(&g.to_string())
                .map_err(|_| TransportError::Other(format!("unencodable guid {g}")))?,
        ),
        Identifier::Opaque(bytes) => ua::Identifier::ByteString(ua::ByteString::from(bytes.clone())),
    };
    Ok(ua::NodeId {
        namespace: id.namespace,
        identifier,
    })
}

fn to_ua_read_value_id(item: &ReadValueId) -> Result<ua::ReadValueId, TransportError> {
    Ok(ua::ReadValueId {
        node_id: to_ua_node_id(&item.node_id)?,
        attribute_id: item.attribute_id,
        index_range: ua::UAString::null(),
        data_encoding: ua::QualifiedName::null(),
    })
}

fn to_ua_timestamps(t: TimestampsToReturn) -> ua::TimestampsToReturn {
    match t {
        TimestampsToReturn::Source => ua::TimestampsToReturn::Source,
        TimestampsToReturn::Server => ua::TimestampsToReturn::Server,
        TimestampsToReturn::Both => ua::TimestampsToReturn::Both,
        TimestampsToReturn::Neither => ua::TimestampsToReturn::Neither,
    }
}

fn from_ua_data_value(dv: ua::DataValue) -> DataValue {
    DataValue {
        status: dv.status.map(|s| StatusCode(s.bits())).unwrap_or_default(),
        value: dv.value.map(from_ua_variant).unwrap_or_default(),
        source_timestamp: dv.source_timestamp.map(|t| t.as_chrono()),
        server_timestamp: dv.server_timestamp.map(|t| t.as_chrono()),
    }
}

fn from_ua_variant(v: ua::Variant) -> Variant {
    match v {
        ua::Variant::Empty => Variant::Empty,
        ua::Variant::Boolean(b) => Variant::Boolean(b),
        ua::Variant::SByte(n) => Variant::SByte(n),
        ua::Variant::Byte(n) => Variant::Byte(n),
        ua::Variant::Int16(n) => Variant::Int16(n),
        ua::Variant::UInt16(n) => Variant::UInt16(n),
        ua::Variant::Int32(n) => Variant::Int32(n),
        ua::Variant::UInt32(n) => Variant::UInt32(n),
        ua::Variant::Int64(n) => Variant::Int64(n),
        ua::Variant::UInt64(n) => Variant::UInt64(n),
        ua::Variant::Float(n) => Variant::Float(n),
        ua::Variant::Double(n) => Variant::Double(n),
        ua::Variant::String(s) => s.value().clone().map(Variant::String).unwrap_or_default(),
        ua::Variant::DateTime(dt) => Variant::DateTime(dt.as_chrono()),
        ua::Variant::Guid(g) => Uuid::parse_str(&g.to_string())
            .map(Variant::Guid)
            .unwrap_or_else(|_| Variant::Unsupported(g.to_string())),
        ua::Variant::ByteString(b) => Variant::ByteString(b.value.unwrap_or_default()),
        ua::Variant::Array(array) => {
            Variant::Array(array.values.into_iter().map(from_ua_variant).collect())
        }
        other => Variant::Unsupported(format!("{other:?}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_id_conversion() {
        let ua_id = to_ua_node_id(&NodeId::numeric(1, 2345)).unwrap();
        assert_eq!(ua_id.namespace, 1);
        assert_eq!(ua_id.identifier, ua::Identifier::Numeric(2345));
    }

    #[test]
    fn test_variant_conversion() {
        assert_eq!(from_ua_variant(ua::Variant::Int32(42)), Variant::Int32(42));
        assert_eq!(
            from_ua_variant(ua::Variant::String(ua::UAString::from("run"))),
            Variant::String("run".into())
        );
    }

    #[test]
    fn test_missing_status_is_good() {
        let dv = ua::DataValue {
            value: Some(ua::Variant::Double(1.5)),
            ..Default::default()
        };
        let converted = from_ua_data_value(dv);
        assert!(converted.status.is_ok());
        assert_eq!(converted.value, Variant::Double(1.5));
    }
}
