use crate::handlers::Reply;
use bg_storage::StorageError;
use bg_update::UpdateError;
use bg_vm_interface::PrepareError;
use coap_lite::ResponseType;
use thiserror::Error;

/// Everything that can go wrong while handling one request. Every variant
/// maps to a protocol response; nothing here ever aborts the process.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("no route for path {0}")]
    RouteNotFound(String),
    #[error("method not allowed")]
    MethodNotAllowed,
    #[error("malformed request: {0}")]
    Input(&'static str),
    #[error("payload of {len} octets exceeds the limit of {max}")]
    PayloadTooLarge { len: usize, max: usize },
    #[error("route has no storage slot bound")]
    MissingSlot,
    #[error("no storage backend owns location {0}")]
    UnknownSlot(String),
    #[error("StorageError: {0}")]
    Storage(#[from] StorageError),
    #[error("PrepareError: {0}")]
    Prepare(#[from] PrepareError),
    #[error("UpdateError: {0}")]
    Update(#[from] UpdateError),
    #[error("EncodeError: {0}")]
    Encode(#[from] serde_json::Error),
}

impl GatewayError {
    /// The CoAP status the failing request is answered with. Client-side
    /// input problems get 4.xx, everything that should have worked 5.xx.
    pub fn response_type(&self) -> ResponseType {
        match self {
            GatewayError::RouteNotFound(_) => ResponseType::NotFound,
            GatewayError::MethodNotAllowed => ResponseType::MethodNotAllowed,
            GatewayError::Input(_) => ResponseType::BadRequest,
            // The update errors reachable from a handler are all input
            // validation; fetch failures happen on the worker task.
            GatewayError::Update(_) => ResponseType::BadRequest,
            GatewayError::PayloadTooLarge { .. } => ResponseType::RequestEntityTooLarge,
            GatewayError::MissingSlot
            | GatewayError::UnknownSlot(_)
            | GatewayError::Storage(_)
            | GatewayError::Prepare(_)
            | GatewayError::Encode(_) => ResponseType::InternalServerError,
        }
    }

    /// The empty-body error response the failing request is answered with.
    pub fn to_reply(&self) -> Reply {
        Reply::empty(self.response_type())
    }
}
