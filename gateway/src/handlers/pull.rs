use crate::{
    error::GatewayError,
    handlers::{Handler, Reply, Request},
};
use async_trait::async_trait;
use bg_update::{manifest_uri, UpdateTrigger};
use coap_lite::ResponseType;

/// Accepts a peer address, synthesizes the manifest URI and hands it to the
/// update worker. Fire-and-forget: the acknowledgement goes out before the
/// fetch starts and does not depend on its outcome.
pub struct UpdateTriggerHandler {
    trigger: UpdateTrigger,
}

impl UpdateTriggerHandler {
    pub fn new(trigger: UpdateTrigger) -> Self {
        Self { trigger }
    }
}

#[async_trait]
impl Handler for UpdateTriggerHandler {
    async fn handle(&self, req: Request<'_>) -> Result<Reply, GatewayError> {
        let address = core::str::from_utf8(&req.packet.payload)
            .map_err(|_| GatewayError::Input("address is not valid UTF-8"))?;
        let uri = manifest_uri(address)?;
        self.trigger.submit(uri);
        Ok(Reply::empty(ResponseType::Changed))
    }
}
