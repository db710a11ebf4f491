use crate::error::UpdateError;
use tokio::sync::mpsc;

/// File name of the update manifest on the remote host.
pub const MANIFEST_FILE: &str = "suit_manifest.signed";

/// Capacity of the synthesized fetch URI.
pub const MANIFEST_URI_CAPACITY: usize = 70;

const MANIFEST_URI_OVERHEAD: usize = "coap://[".len() + "]/".len() + MANIFEST_FILE.len();

/// Longest address accepted by the update trigger. One octet more is an
/// input error, never a truncation.
pub const MAX_ADDRESS_LEN: usize = MANIFEST_URI_CAPACITY - MANIFEST_URI_OVERHEAD;

/// Builds the manifest fetch URI for a peer address by checked template
/// substitution into a bounded buffer.
pub fn manifest_uri(address: &str) -> Result<String, UpdateError> {
    if address.is_empty() {
        return Err(UpdateError::InvalidAddress("empty"));
    }
    if address.len() > MAX_ADDRESS_LEN {
        return Err(UpdateError::AddressTooLong(address.len()));
    }
    if address
        .chars()
        .any(|c| c == '[' || c == ']' || c == '/' || c.is_whitespace() || c.is_control())
    {
        return Err(UpdateError::InvalidAddress("forbidden character"));
    }
    let mut uri = String::with_capacity(MANIFEST_URI_CAPACITY);
    uri.push_str("coap://[");
    uri.push_str(address);
    uri.push_str("]/");
    uri.push_str(MANIFEST_FILE);
    debug_assert!(uri.len() <= MANIFEST_URI_CAPACITY);
    Ok(uri)
}

/// One queued fetch-and-apply request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateJob {
    pub manifest_uri: String,
}

/// Gateway-side handle to the update worker. Submission is fire-and-forget:
/// the caller acknowledges the network peer before the fetch even starts.
#[derive(Clone)]
pub struct UpdateTrigger {
    tx: mpsc::Sender<UpdateJob>,
}

impl UpdateTrigger {
    /// Creates the trigger and the receiving end the worker drains.
    pub fn channel(queue_depth: usize) -> (Self, mpsc::Receiver<UpdateJob>) {
        let (tx, rx) = mpsc::channel(queue_depth);
        (Self { tx }, rx)
    }

    pub fn submit(&self, manifest_uri: String) {
        tracing::info!(uri = %manifest_uri, "update triggered");
        match self.tx.try_send(UpdateJob { manifest_uri }) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(job)) => {
                tracing::warn!(uri = %job.manifest_uri, "update queue full, job dropped");
            }
            Err(mpsc::error::TrySendError::Closed(job)) => {
                tracing::warn!(uri = %job.manifest_uri, "update worker gone, job dropped");
            }
        }
    }
}
