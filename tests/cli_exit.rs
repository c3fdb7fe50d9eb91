//! Exit status of the `ua_poller` binary for startup failures.
//!
//! Every case here fails (or finishes) before the first tick, so none of them
//! waits on the poll interval.

use std::process::{Command, Output};
use tempfile::TempDir;

/// Run the binary with `args` against an empty config directory.
fn ua_poller(args: &[&str]) -> Output {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("absent.toml");
    Command::new(env!("CARGO_BIN_EXE_ua_poller"))
        .arg("--config")
        .arg(&config)
        .args(args)
        .env_remove("RUST_LOG")
        .env_remove("UA_POLLER_ENDPOINT")
        .env_remove("UA_POLLER_NODES")
        .env_remove("UA_POLLER_DEBUG")
        .output()
        .expect("run ua_poller")
}

fn combined(output: &Output) -> String {
    format!(
        "{}{}",
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    )
}

#[test]
fn invalid_node_id_exits_with_failure() {
    let output = ua_poller(&["--endpoint", "sim://bench", "--node", "ns=1;i=oops"]);
    assert_eq!(output.status.code(), Some(1), "{}", combined(&output));
    assert!(combined(&output).contains("invalid numeric id"));
}

#[test]
fn unsupported_endpoint_scheme_exits_with_failure() {
    let output = ua_poller(&["--endpoint", "http://x"]);
    assert_eq!(output.status.code(), Some(1), "{}", combined(&output));
    assert!(combined(&output).contains("unsupported scheme 'http'"));
}

#[test]
fn malformed_endpoint_host_exits_with_failure() {
    let output = ua_poller(&["--endpoint", "opc.tcp://local host:99999"]);
    assert_eq!(output.status.code(), Some(1), "{}", combined(&output));
}

#[cfg(not(feature = "opcua_client"))]
#[test]
fn opc_tcp_without_transport_feature_exits_with_failure() {
    let output = ua_poller(&["--endpoint", "opc.tcp://localhost:14840"]);
    assert_eq!(output.status.code(), Some(1), "{}", combined(&output));
    assert!(combined(&output).contains("Feature 'opcua_client' is not enabled"));
}

#[test]
fn print_config_exits_cleanly_with_overrides_applied() {
    let output = ua_poller(&[
        "--endpoint",
        "sim://bench",
        "--node",
        "ns=2;s=Line1.Speed",
        "--print-config",
    ]);
    assert!(output.status.success(), "{}", combined(&output));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("endpoint = \"sim://bench\""), "{stdout}");
    assert!(stdout.contains("ns=2;s=Line1.Speed"), "{stdout}");
}
