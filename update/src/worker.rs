use crate::{error::UpdateError, transport::UpdateTransport, trigger::UpdateJob};
use bg_storage::StorageRegistry;
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::mpsc;

/// What the fetched manifest declares: where the payload lives and which
/// storage location it is destined for. Signature checking is out of scope
/// here; the manifest is trusted as delivered.
#[derive(Debug, Deserialize)]
struct UpdateManifest {
    location: String,
    payload_uri: String,
}

/// Background fetch-and-apply worker. Runs as its own task so a slow
/// download never blocks the request-handling loop; every failure is logged
/// and swallowed, the worker itself never dies on a bad update.
pub struct UpdateWorker {
    storage: Arc<StorageRegistry>,
    transport: Arc<dyn UpdateTransport>,
    rx: mpsc::Receiver<UpdateJob>,
}

impl UpdateWorker {
    pub fn new(
        storage: Arc<StorageRegistry>,
        transport: Arc<dyn UpdateTransport>,
        rx: mpsc::Receiver<UpdateJob>,
    ) -> Self {
        Self {
            storage,
            transport,
            rx,
        }
    }

    pub async fn run(mut self) {
        while let Some(job) = self.rx.recv().await {
            if let Err(e) = self.apply(&job).await {
                tracing::warn!(uri = %job.manifest_uri, error = %e, "update failed");
            }
        }
        tracing::debug!("update trigger gone, worker stopping");
    }

    async fn apply(&self, job: &UpdateJob) -> Result<(), UpdateError> {
        let manifest_bytes = self.transport.fetch(&job.manifest_uri).await?;
        let manifest: UpdateManifest = serde_json::from_slice(&manifest_bytes)?;

        let backend = self
            .storage
            .find(&manifest.location)
            .ok_or_else(|| UpdateError::UnknownLocation(manifest.location.clone()))?;

        let image = self.transport.fetch(&manifest.payload_uri).await?;
        backend.write_location(&manifest.location, image)?;
        backend.set_active(&manifest.location)?;
        tracing::info!(
            location = %manifest.location,
            uri = %job.manifest_uri,
            "update applied"
        );
        Ok(())
    }
}
