use crate::{
    error::GatewayError,
    handlers::{Handler, Reply, Request},
};
use async_trait::async_trait;
use coap_lite::ResponseType;

/// Static responder reporting the board this gateway runs on.
pub struct BoardHandler {
    board: String,
}

impl BoardHandler {
    pub fn new(board: String) -> Self {
        Self { board }
    }
}

#[async_trait]
impl Handler for BoardHandler {
    async fn handle(&self, _req: Request<'_>) -> Result<Reply, GatewayError> {
        Ok(Reply::text(ResponseType::Content, &self.board))
    }
}
