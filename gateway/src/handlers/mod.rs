pub mod board;
pub mod exec;
pub mod pull;
pub mod suit;
pub mod well_known;

use crate::error::GatewayError;
use async_trait::async_trait;
use coap_lite::{ContentFormat, Packet, ResponseType};
use std::net::SocketAddr;

/// One parsed inbound request, borrowed for the duration of its handling.
/// `raw` is the datagram as received; handlers that expose request memory to
/// sandboxed code slice their regions out of these borrows.
pub struct Request<'req> {
    pub packet: &'req Packet,
    pub raw: &'req [u8],
    pub source: SocketAddr,
    /// The storage location bound to the matched route, if any. Comes from
    /// the route table, never from the payload.
    pub slot: Option<&'static str>,
    /// Path remainder below a subtree route.
    pub subtree_path: Option<&'req str>,
}

/// What a handler answers with; the server turns it into a CoAP response
/// matching the request's message id and token.
#[derive(Debug)]
pub struct Reply {
    pub status: ResponseType,
    pub payload: Vec<u8>,
    pub content_format: Option<ContentFormat>,
}

impl Reply {
    pub fn empty(status: ResponseType) -> Self {
        Self {
            status,
            payload: Vec::new(),
            content_format: None,
        }
    }

    pub fn text(status: ResponseType, text: &str) -> Self {
        Self {
            status,
            payload: text.as_bytes().to_vec(),
            content_format: Some(ContentFormat::TextPlain),
        }
    }

    pub fn json(status: ResponseType, payload: Vec<u8>) -> Self {
        Self {
            status,
            payload,
            content_format: Some(ContentFormat::ApplicationJSON),
        }
    }

    pub fn link_format(status: ResponseType, links: &str) -> Self {
        Self {
            status,
            payload: links.as_bytes().to_vec(),
            content_format: Some(ContentFormat::ApplicationLinkFormat),
        }
    }
}

#[async_trait]
pub trait Handler: Send + Sync {
    async fn handle(&self, req: Request<'_>) -> Result<Reply, GatewayError>;
}
