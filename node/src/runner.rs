use crate::gateway_node::GatewayNode;
use std::error::Error;

/// Spawns the update worker on its own task and drives the server loop.
/// A long-running firmware download never blocks request handling.
pub async fn run_node(node: GatewayNode) -> Result<(), Box<dyn Error>> {
    let GatewayNode {
        server,
        update_worker,
        storage: _storage,
    } = node;

    let worker_jh = tokio::spawn(async move { update_worker.run().await });

    let result = server.run().await;
    if let Err(e) = &result {
        tracing::error!(error = %e, "server loop failed");
    }

    worker_jh.abort();
    result.map_err(Into::into)
}
