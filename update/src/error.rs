use crate::trigger::MAX_ADDRESS_LEN;
use bg_storage::StorageError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum UpdateError {
    #[error("address of {0} octets exceeds the limit of {MAX_ADDRESS_LEN}")]
    AddressTooLong(usize),
    #[error("malformed address: {0}")]
    InvalidAddress(&'static str),
    #[error("malformed fetch URI: {0}")]
    InvalidUri(String),
    #[error("fetch timed out: {0}")]
    Timeout(String),
    #[error("peer answered {code} for {uri}")]
    ErrorResponse { uri: String, code: String },
    #[error("undecodable response from {0}")]
    Decode(String),
    #[error("malformed manifest: {0}")]
    Manifest(#[from] serde_json::Error),
    #[error("IoError: {0}")]
    Io(#[from] std::io::Error),
    #[error("StorageError: {0}")]
    Storage(#[from] StorageError),
    #[error("manifest names unknown storage location: {0}")]
    UnknownLocation(String),
}
