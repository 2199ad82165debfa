//! Connection and network probes.

use fluxori_connectors::Connector;

use super::{CliError, print_json};

/// Test the connection; fails the command when disconnected.
pub async fn status(connector: &dyn Connector) -> Result<(), CliError> {
    let status = connector.test_connection().await;
    print_json(&status)?;
    if status.connected {
        Ok(())
    } else {
        Err(CliError::Disconnected(status.message))
    }
}

/// Probe if needed and print the network estimate.
pub async fn network(connector: &dyn Connector) -> Result<(), CliError> {
    let network = connector.check_network_status().await;
    if network.possible_load_shedding {
        tracing::warn!("Failure pattern suggests load shedding");
    }
    print_json(&network)
}
