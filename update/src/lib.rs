pub mod error;
pub mod transport;
pub mod trigger;
pub mod worker;

pub use error::UpdateError;
pub use transport::{CoapFetchTransport, UpdateTransport};
pub use trigger::{manifest_uri, UpdateJob, UpdateTrigger, MAX_ADDRESS_LEN};
pub use worker::UpdateWorker;
