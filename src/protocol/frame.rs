use crate::protocol::constants::{ACK_SIZE, REQUEST_HEADER_SIZE};
use crate::protocol::error::ProtocolError;
use std::fmt;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{error, trace};

/// Fixed-size request header (16 bytes, little-endian)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestHeader {
    pub opcode: i64,
    pub offset: i64,
}

impl RequestHeader {
    pub const SIZE: usize = REQUEST_HEADER_SIZE;

    #[allow(dead_code)] // Receiver side; the sender only encodes
    pub fn decode(buf: &[u8]) -> Result<Self, ProtocolError> {
        if buf.len() < Self::SIZE {
            error!("Request header too short: {} bytes", buf.len());
            return Err(ProtocolError::Truncated {
                needed: Self::SIZE,
                available: buf.len(),
            });
        }

        let mut opcode = [0u8; 8];
        let mut offset = [0u8; 8];
        opcode.copy_from_slice(&buf[0..8]);
        offset.copy_from_slice(&buf[8..16]);

        Ok(Self {
            opcode: i64::from_le_bytes(opcode),
            offset: i64::from_le_bytes(offset),
        })
    }

    pub fn encode(&self) -> [u8; Self::SIZE] {
        let mut buf = [0u8; Self::SIZE];
        buf[0..8].copy_from_slice(&self.opcode.to_le_bytes());
        buf[8..16].copy_from_slice(&self.offset.to_le_bytes());
        buf
    }
}

/// Builds `opcode ‖ offset ‖ payload`. The payload carries no length prefix;
/// the receiver infers it from its own chunk-size convention.
pub fn encode_frame(opcode: i64, offset: i64, payload: &[u8]) -> Vec<u8> {
    let header = RequestHeader { opcode, offset };
    let mut frame = Vec::with_capacity(RequestHeader::SIZE + payload.len());
    frame.extend_from_slice(&header.encode());
    frame.extend_from_slice(payload);
    frame
}

/// Opaque acknowledgment returned by the receiver for each chunk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ack(pub [u8; ACK_SIZE]);

impl Ack {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.as_bytes())
    }
}

impl fmt::Display for Ack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", String::from_utf8_lossy(self.as_bytes()))
    }
}

/// Writes one complete frame in a single write call, then flushes
pub async fn write_frame<W: AsyncWrite + Unpin>(
    writer: &mut W,
    opcode: i64,
    offset: i64,
    payload: &[u8],
) -> std::io::Result<usize> {
    let frame = encode_frame(opcode, offset, payload);
    trace!("Writing frame: offset={}, {} bytes", offset, frame.len());
    writer.write_all(&frame).await?;
    writer.flush().await?;
    Ok(frame.len())
}

/// Premature EOF surfaces as `UnexpectedEof`
pub async fn read_ack<R: AsyncRead + Unpin>(reader: &mut R) -> std::io::Result<Ack> {
    let mut ack = [0u8; ACK_SIZE];
    reader.read_exact(&mut ack).await?;
    Ok(Ack(ack))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::constants::OP_UPLOAD_CHUNK;

    #[test]
    fn header_layout_is_little_endian() {
        let frame = encode_frame(OP_UPLOAD_CHUNK, 0x0102, b"xyz");
        assert_eq!(frame.len(), 19);
        assert_eq!(&frame[0..8], &[0x11, 0x27, 0, 0, 0, 0, 0, 0]);
        assert_eq!(&frame[8..16], &[0x02, 0x01, 0, 0, 0, 0, 0, 0]);
        assert_eq!(&frame[16..], b"xyz");
    }

    #[test]
    fn header_decodes_back_to_opcode_and_offset() {
        for offset in [0i64, 1, 1 << 32, i64::MAX] {
            let frame = encode_frame(OP_UPLOAD_CHUNK, offset, b"payload");
            let header = RequestHeader::decode(&frame).unwrap();
            assert_eq!(header.opcode, OP_UPLOAD_CHUNK);
            assert_eq!(header.offset, offset);
        }
    }

    #[test]
    fn empty_payload_is_just_the_header() {
        let frame = encode_frame(OP_UPLOAD_CHUNK, 7, &[]);
        assert_eq!(frame.len(), RequestHeader::SIZE);
    }

    #[test]
    fn short_header_is_rejected() {
        let err = RequestHeader::decode(&[0u8; 10]).unwrap_err();
        assert_eq!(err, ProtocolError::Truncated { needed: 16, available: 10 });
    }

    #[test]
    fn ack_renders_raw_and_hex() {
        let ack = Ack(*b"OK\x00\x01");
        assert_eq!(ack.to_hex(), "4f4b0001");
        assert!(ack.to_string().starts_with("OK"));
    }

    #[tokio::test]
    async fn frame_and_ack_over_a_duplex_stream() {
        let (mut client, mut server) = tokio::io::duplex(64);

        let written = write_frame(&mut client, OP_UPLOAD_CHUNK, 42, b"abc").await.unwrap();
        assert_eq!(written, 19);

        let mut raw = vec![0u8; written];
        server.read_exact(&mut raw).await.unwrap();
        let header = RequestHeader::decode(&raw).unwrap();
        assert_eq!(header.offset, 42);
        assert_eq!(&raw[16..], b"abc");

        server.write_all(b"done").await.unwrap();
        let ack = read_ack(&mut client).await.unwrap();
        assert_eq!(ack.as_bytes(), b"done");
    }
}
