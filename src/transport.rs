//! Connector selection by endpoint scheme.

use crate::error::{PollerError, PollerResult};
use crate::session::{Connector, Endpoint, TransportConfig};
use crate::simulated::SimulatedConnector;
use std::sync::Arc;

/// Pick the transport for `endpoint`.
///
/// - `sim://` → in-process [`SimulatedConnector`] (incrementing counter)
/// - `opc.tcp://` → OPC UA client (requires feature `opcua_client`)
pub fn connector_for(
    endpoint: &Endpoint,
    config: TransportConfig,
) -> PollerResult<Arc<dyn Connector>> {
    match endpoint.scheme() {
        "sim" => Ok(Arc::new(SimulatedConnector::from_config(config))),
        "opc.tcp" => opcua_connector(config),
        other => Err(PollerError::Configuration(format!(
            "no transport for scheme '{other}'"
        ))),
    }
}

#[cfg(feature = "opcua_client")]
fn opcua_connector(config: TransportConfig) -> PollerResult<Arc<dyn Connector>> {
    Ok(Arc::new(crate::opcua_transport::OpcUaConnector::new(config)))
}

#[cfg(not(feature = "opcua_client"))]
fn opcua_connector(_config: TransportConfig) -> PollerResult<Arc<dyn Connector>> {
    Err(PollerError::FeatureNotEnabled("opcua_client".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sim_scheme_selects_simulator() {
        let endpoint = Endpoint::parse("sim://bench").unwrap();
        assert!(connector_for(&endpoint, TransportConfig::default()).is_ok());
    }

    #[cfg(not(feature = "opcua_client"))]
    #[test]
    fn test_opc_tcp_without_feature() {
        let endpoint = Endpoint::parse("opc.tcp://localhost:14840").unwrap();
        let err = connector_for(&endpoint, TransportConfig::default()).err().unwrap();
        assert!(matches!(err, PollerError::FeatureNotEnabled(ref f) if f == "opcua_client"));
    }
}
