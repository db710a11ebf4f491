use bg_gateway::GatewayServer;
use bg_storage::StorageRegistry;
use bg_update::UpdateWorker;
use std::{net::SocketAddr, sync::Arc};

/// The assembled node: the serving loop, the update worker waiting to be
/// spawned, and the shared storage registry.
pub struct GatewayNode {
    pub server: GatewayServer,
    pub update_worker: UpdateWorker,
    pub storage: Arc<StorageRegistry>,
}

impl GatewayNode {
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.server.local_addr()
    }
}
