use crate::{
    error::GatewayError,
    handlers::{Reply, Request},
    router::{RouteMatch, Router},
};
use bg_common::constants::MAX_DATAGRAM_SIZE;
use coap_lite::{CoapOption, MessageClass, MessageType, Packet};
use std::{io, net::SocketAddr, sync::Arc};
use tokio::net::UdpSocket;

/// The UDP server loop. One task owns it, so requests are handled in
/// arrival order; long-running work (the update fetch) lives on its own
/// task and never blocks this loop.
pub struct GatewayServer {
    socket: UdpSocket,
    router: Arc<Router>,
}

impl GatewayServer {
    pub async fn bind(addr: SocketAddr, router: Arc<Router>) -> io::Result<Self> {
        let socket = UdpSocket::bind(addr).await?;
        tracing::info!(listen = %socket.local_addr()?, "gateway listening");
        Ok(Self { socket, router })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    pub async fn run(self) -> io::Result<()> {
        let mut buf = [0u8; MAX_DATAGRAM_SIZE];
        loop {
            let (len, source) = self.socket.recv_from(&mut buf).await?;
            let raw = &buf[..len];

            let packet = match Packet::from_bytes(raw) {
                Ok(packet) => packet,
                Err(e) => {
                    tracing::debug!(%source, error = %e, "dropping undecodable datagram");
                    continue;
                }
            };

            if let Some(response) = self.dispatch(&packet, raw, source).await {
                match response.to_bytes() {
                    Ok(datagram) => {
                        if let Err(e) = self.socket.send_to(&datagram, source).await {
                            tracing::warn!(%source, error = %e, "failed to send response");
                        }
                    }
                    Err(e) => tracing::error!(%source, error = %e, "failed to encode response"),
                }
            }
        }
    }

    /// Routes one parsed request and produces its response. Terminal either
    /// way: every request that reaches a route is answered exactly once.
    async fn dispatch(&self, packet: &Packet, raw: &[u8], source: SocketAddr) -> Option<Packet> {
        let MessageClass::Request(method) = packet.header.code else {
            // Not a request (ack, reset, empty): nothing to answer.
            return None;
        };

        let path = match request_path(packet) {
            Ok(path) => path,
            Err(e) => return Some(build_response(packet, e.to_reply())),
        };
        tracing::debug!(%source, ?method, %path, "request received");

        let reply = match self.router.lookup(method, &path) {
            RouteMatch::Found {
                route,
                subtree_path,
            } => {
                let request = Request {
                    packet,
                    raw,
                    source,
                    slot: route.slot,
                    subtree_path,
                };
                match route.handler.handle(request).await {
                    Ok(reply) => reply,
                    Err(e) => {
                        tracing::warn!(%path, error = %e, "request failed");
                        e.to_reply()
                    }
                }
            }
            RouteMatch::MethodNotAllowed => GatewayError::MethodNotAllowed.to_reply(),
            RouteMatch::NotFound => GatewayError::RouteNotFound(path.clone()).to_reply(),
        };

        Some(build_response(packet, reply))
    }
}

/// Joins the Uri-Path options into an absolute path.
fn request_path(packet: &Packet) -> Result<String, GatewayError> {
    let mut path = String::new();
    if let Some(segments) = packet.get_option(CoapOption::UriPath) {
        for segment in segments {
            let segment = core::str::from_utf8(segment)
                .map_err(|_| GatewayError::Input("path is not valid UTF-8"))?;
            path.push('/');
            path.push_str(segment);
        }
    }
    if path.is_empty() {
        path.push('/');
    }
    Ok(path)
}

/// Builds the response packet mirroring the request's message id and token.
/// Confirmable requests are answered with a piggybacked acknowledgement.
fn build_response(request: &Packet, reply: Reply) -> Packet {
    let mut response = Packet::new();
    response.header.set_type(match request.header.get_type() {
        MessageType::Confirmable => MessageType::Acknowledgement,
        _ => MessageType::NonConfirmable,
    });
    response.header.message_id = request.header.message_id;
    response.set_token(request.get_token().to_vec());
    response.header.code = MessageClass::Response(reply.status);
    if let Some(format) = reply.content_format {
        response.set_content_format(format);
    }
    response.payload = reply.payload;
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use coap_lite::{RequestType, ResponseType};

    #[test]
    fn joins_uri_path_segments() {
        let mut packet = Packet::new();
        packet.add_option(CoapOption::UriPath, b"bpf".to_vec());
        packet.add_option(CoapOption::UriPath, b"exec".to_vec());
        packet.add_option(CoapOption::UriPath, b"0".to_vec());
        assert_eq!(request_path(&packet).unwrap(), "/bpf/exec/0");
    }

    #[test]
    fn empty_path_is_the_root() {
        let packet = Packet::new();
        assert_eq!(request_path(&packet).unwrap(), "/");
    }

    #[test]
    fn response_mirrors_message_id_and_token() {
        let mut request = Packet::new();
        request.header.set_type(MessageType::Confirmable);
        request.header.code = MessageClass::Request(RequestType::Post);
        request.header.message_id = 99;
        request.set_token(vec![1, 2, 3]);

        let response = build_response(&request, Reply::empty(ResponseType::Changed));
        assert_eq!(response.header.get_type(), MessageType::Acknowledgement);
        assert_eq!(response.header.message_id, 99);
        assert_eq!(response.get_token(), &[1, 2, 3]);
        assert_eq!(
            response.header.code,
            MessageClass::Response(ResponseType::Changed)
        );
    }
}
