use coap_lite::Packet;

/// Flat in-memory view of the parsed message, handed to sandboxed programs
/// as region slot 1 of the calling convention.
///
/// Layout, little-endian:
/// `code u8 | message_id u16 | token_len u8 | token [8] | payload_len u16 | payload`
pub struct MessageView {
    buf: Vec<u8>,
}

impl MessageView {
    pub const HEADER_LEN: usize = 1 + 2 + 1 + 8 + 2;

    pub fn encode(packet: &Packet) -> Self {
        let payload = &packet.payload;
        let token = packet.get_token();
        let token_len = token.len().min(8);

        let mut buf = Vec::with_capacity(Self::HEADER_LEN + payload.len());
        buf.push(u8::from(packet.header.code));
        buf.extend_from_slice(&packet.header.message_id.to_le_bytes());
        buf.push(token_len as u8);
        let mut token_area = [0u8; 8];
        token_area[..token_len].copy_from_slice(&token[..token_len]);
        buf.extend_from_slice(&token_area);
        buf.extend_from_slice(&(payload.len().min(u16::MAX as usize) as u16).to_le_bytes());
        buf.extend_from_slice(payload);
        Self { buf }
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn bytes_mut(&mut self) -> &mut [u8] {
        &mut self.buf
    }

    /// Offset of the payload bytes within the view.
    pub const fn payload_offset() -> usize {
        Self::HEADER_LEN
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use coap_lite::{MessageClass, RequestType};

    #[test]
    fn encodes_header_fields_and_payload() {
        let mut packet = Packet::new();
        packet.header.code = MessageClass::Request(RequestType::Post);
        packet.header.message_id = 0x1234;
        packet.set_token(vec![0xaa, 0xbb]);
        packet.payload = vec![1, 2, 3];

        let view = MessageView::encode(&packet);
        assert_eq!(view.len(), MessageView::HEADER_LEN + 3);

        let mut view = view;
        let bytes = view.bytes_mut();
        assert_eq!(bytes[1..3], 0x1234u16.to_le_bytes());
        assert_eq!(bytes[3], 2); // token length
        assert_eq!(bytes[4], 0xaa);
        assert_eq!(bytes[12..14], 3u16.to_le_bytes());
        assert_eq!(&bytes[MessageView::payload_offset()..], &[1, 2, 3]);
    }
}
