use crate::{
    error::GatewayError,
    handlers::{Handler, Reply, Request},
};
use async_trait::async_trait;
use bg_common::constants::{SLOT_CAPACITY, SLOT_RAM_0, SLOT_RAM_1};
use bg_storage::StorageRegistry;
use coap_lite::ResponseType;
use std::sync::Arc;

/// The `/suit` subtree: direct image provisioning into a storage slot.
/// `POST /suit/slot/{0,1}` installs the payload as that slot's image.
pub struct SuitStorageHandler {
    storage: Arc<StorageRegistry>,
}

impl SuitStorageHandler {
    pub fn new(storage: Arc<StorageRegistry>) -> Self {
        Self { storage }
    }
}

#[async_trait]
impl Handler for SuitStorageHandler {
    async fn handle(&self, req: Request<'_>) -> Result<Reply, GatewayError> {
        let location = match req.subtree_path {
            Some("slot/0") => SLOT_RAM_0,
            Some("slot/1") => SLOT_RAM_1,
            other => {
                return Err(GatewayError::RouteNotFound(format!(
                    "/suit/{}",
                    other.unwrap_or_default()
                )))
            }
        };

        let image = &req.packet.payload;
        if image.is_empty() {
            return Err(GatewayError::Input("empty image"));
        }
        if image.len() > SLOT_CAPACITY {
            return Err(GatewayError::PayloadTooLarge {
                len: image.len(),
                max: SLOT_CAPACITY,
            });
        }

        let backend = self
            .storage
            .find(location)
            .ok_or_else(|| GatewayError::UnknownSlot(location.to_string()))?;
        backend.write_location(location, image.clone())?;
        tracing::info!(location, len = image.len(), "image provisioned");
        Ok(Reply::empty(ResponseType::Changed))
    }
}
