use crate::error::UpdateError;
use async_trait::async_trait;
use bg_common::constants::{DEFAULT_COAP_PORT, MAX_DATAGRAM_SIZE};
use coap_lite::{CoapOption, MessageClass, MessageType, Packet, RequestType, ResponseType};
use std::{
    net::SocketAddr,
    sync::atomic::{AtomicU16, Ordering},
    time::Duration,
};
use tokio::{net::UdpSocket, time::timeout};

const FETCH_TIMEOUT: Duration = Duration::from_secs(5);

/// The remote side of the update pipeline. A trait seam so tests can swap
/// the network for canned payloads.
#[async_trait]
pub trait UpdateTransport: Send + Sync {
    async fn fetch(&self, uri: &str) -> Result<Vec<u8>, UpdateError>;
}

/// Fetches a resource with a single confirmable CoAP GET. Good for the
/// constrained images this device deals in; blockwise transfers are not
/// spoken.
pub struct CoapFetchTransport {
    message_id: AtomicU16,
}

impl CoapFetchTransport {
    pub fn new() -> Self {
        Self {
            message_id: AtomicU16::new(1),
        }
    }

    fn next_message_id(&self) -> u16 {
        self.message_id.fetch_add(1, Ordering::Relaxed)
    }
}

impl Default for CoapFetchTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UpdateTransport for CoapFetchTransport {
    async fn fetch(&self, uri: &str) -> Result<Vec<u8>, UpdateError> {
        let (authority, segments) = parse_coap_uri(uri)?;

        let message_id = self.next_message_id();
        let token = message_id.to_le_bytes().to_vec();
        let mut packet = Packet::new();
        packet.header.set_type(MessageType::Confirmable);
        packet.header.code = MessageClass::Request(RequestType::Get);
        packet.header.message_id = message_id;
        packet.set_token(token.clone());
        for segment in &segments {
            packet.add_option(CoapOption::UriPath, segment.clone().into_bytes());
        }
        let datagram = packet
            .to_bytes()
            .map_err(|_| UpdateError::InvalidUri(uri.to_string()))?;

        let peer: SocketAddr = tokio::net::lookup_host(authority.as_str())
            .await?
            .next()
            .ok_or_else(|| UpdateError::InvalidUri(uri.to_string()))?;
        let bind_addr = if peer.is_ipv4() { "0.0.0.0:0" } else { "[::]:0" };
        let socket = UdpSocket::bind(bind_addr).await?;
        socket.send_to(&datagram, peer).await?;

        let mut buf = [0u8; MAX_DATAGRAM_SIZE];
        let (len, _) = timeout(FETCH_TIMEOUT, socket.recv_from(&mut buf))
            .await
            .map_err(|_| UpdateError::Timeout(uri.to_string()))??;

        let response =
            Packet::from_bytes(&buf[..len]).map_err(|_| UpdateError::Decode(uri.to_string()))?;
        if response.get_token().to_vec() != token {
            return Err(UpdateError::Decode(uri.to_string()));
        }
        match response.header.code {
            MessageClass::Response(ResponseType::Content) => Ok(response.payload),
            code => Err(UpdateError::ErrorResponse {
                uri: uri.to_string(),
                code: format!("{code:?}"),
            }),
        }
    }
}

/// Splits `coap://host[:port]/path...` into a resolvable authority and the
/// path segments. IPv6 hosts are bracketed.
fn parse_coap_uri(uri: &str) -> Result<(String, Vec<String>), UpdateError> {
    let invalid = || UpdateError::InvalidUri(uri.to_string());

    let rest = uri.strip_prefix("coap://").ok_or_else(invalid)?;
    let (authority_part, path) = match rest.find('/') {
        Some(idx) => (&rest[..idx], &rest[idx + 1..]),
        None => (rest, ""),
    };
    if authority_part.is_empty() {
        return Err(invalid());
    }

    let authority = if let Some(host) = authority_part.strip_prefix('[') {
        // [v6]:port or [v6]
        let (host, tail) = host.split_once(']').ok_or_else(invalid)?;
        let port = match tail.strip_prefix(':') {
            Some(p) => p.parse::<u16>().map_err(|_| invalid())?,
            None if tail.is_empty() => DEFAULT_COAP_PORT,
            None => return Err(invalid()),
        };
        format!("[{host}]:{port}")
    } else if let Some((host, port)) = authority_part.rsplit_once(':') {
        let port = port.parse::<u16>().map_err(|_| invalid())?;
        format!("{host}:{port}")
    } else {
        format!("{authority_part}:{DEFAULT_COAP_PORT}")
    };

    let segments = path
        .split('/')
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();
    Ok((authority, segments))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_bracketed_v6_authority() {
        let (authority, segments) =
            parse_coap_uri("coap://[2001:db8::1]/suit_manifest.signed").unwrap();
        assert_eq!(authority, "[2001:db8::1]:5683");
        assert_eq!(segments, vec!["suit_manifest.signed".to_string()]);
    }

    #[test]
    fn parses_explicit_port_and_nested_path() {
        let (authority, segments) = parse_coap_uri("coap://10.0.0.1:9999/fw/image.bin").unwrap();
        assert_eq!(authority, "10.0.0.1:9999");
        assert_eq!(segments, vec!["fw".to_string(), "image.bin".to_string()]);
    }

    #[test]
    fn rejects_foreign_schemes() {
        assert!(parse_coap_uri("http://example/manifest").is_err());
    }
}
