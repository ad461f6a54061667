//! GLVC Frame Structure
//!
//! Binary frame format with a 22-byte header.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::io;

/// Magic bytes identifying the protocol: "GLVC"
pub const MAGIC: [u8; 4] = *b"GLVC";

/// Protocol version
pub const VERSION: u8 = 1;

/// Fixed header size in bytes
pub const HEADER_SIZE: usize = 22;

/// Operation codes for requests and responses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum OpCode {
    // Requests
    Ping = 0x01,
    Contains = 0x02,
    Get = 0x03,
    Cluster = 0x04,
    Similarity = 0x05,
    Tokenize = 0x06,
    Info = 0x07,

    // Responses
    Ok = 0x10,
    Error = 0x11,
    Pong = 0x12,
    NotFound = 0x13,
    Integer = 0x14,
    Float = 0x15,
    Vector = 0x16,
    Neighbors = 0x17,
    Array = 0x18,
}

impl OpCode {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0x01 => Some(OpCode::Ping),
            0x02 => Some(OpCode::Contains),
            0x03 => Some(OpCode::Get),
            0x04 => Some(OpCode::Cluster),
            0x05 => Some(OpCode::Similarity),
            0x06 => Some(OpCode::Tokenize),
            0x07 => Some(OpCode::Info),
            0x10 => Some(OpCode::Ok),
            0x11 => Some(OpCode::Error),
            0x12 => Some(OpCode::Pong),
            0x13 => Some(OpCode::NotFound),
            0x14 => Some(OpCode::Integer),
            0x15 => Some(OpCode::Float),
            0x16 => Some(OpCode::Vector),
            0x17 => Some(OpCode::Neighbors),
            0x18 => Some(OpCode::Array),
            _ => None,
        }
    }
}

/// Frame header (22 bytes)
///
/// ```text
/// ┌──────────┬──────────┬──────────┬──────────┬─────────────────┐
/// │  Magic   │ Version  │  OpCode  │  Flags   │  Payload Len    │
/// │ (4 bytes)│ (1 byte) │ (1 byte) │ (2 bytes)│   (4 bytes)     │
/// ├──────────┴──────────┴──────────┴──────────┴─────────────────┤
/// │  Request ID (8 bytes)  │  Reserved (2 bytes)                │
/// └─────────────────────────────────────────────────────────────┘
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameHeader {
    pub version: u8,
    pub opcode: OpCode,
    pub flags: u16,
    pub payload_len: u32,
    pub request_id: u64,
}

impl FrameHeader {
    pub fn new(opcode: OpCode, request_id: u64) -> Self {
        Self {
            version: VERSION,
            opcode,
            flags: 0,
            payload_len: 0,
            request_id,
        }
    }

    pub fn with_payload_len(mut self, len: u32) -> Self {
        self.payload_len = len;
        self
    }

    pub fn encode(&self, buf: &mut BytesMut) {
        buf.put_slice(&MAGIC);
        buf.put_u8(self.version);
        buf.put_u8(self.opcode as u8);
        buf.put_u16(self.flags);
        buf.put_u32(self.payload_len);
        buf.put_u64(self.request_id);
        buf.put_u16(0); // Reserved
    }

    pub fn decode(buf: &mut impl Buf) -> io::Result<Self> {
        let mut magic = [0u8; 4];
        buf.copy_to_slice(&mut magic);
        if magic != MAGIC {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "Invalid magic bytes",
            ));
        }

        let version = buf.get_u8();
        if version != VERSION {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("Unsupported protocol version: {}", version),
            ));
        }
        let opcode_byte = buf.get_u8();
        let opcode = OpCode::from_u8(opcode_byte).ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidData, format!("Invalid opcode: {}", opcode_byte))
        })?;
        let flags = buf.get_u16();
        let payload_len = buf.get_u32();
        let request_id = buf.get_u64();
        let _reserved = buf.get_u16();

        Ok(Self {
            version,
            opcode,
            flags,
            payload_len,
            request_id,
        })
    }
}

/// Complete frame with header and payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub header: FrameHeader,
    pub payload: Bytes,
}

impl Frame {
    pub fn new(opcode: OpCode, request_id: u64, payload: Bytes) -> Self {
        let header = FrameHeader::new(opcode, request_id).with_payload_len(payload.len() as u32);
        Self { header, payload }
    }

    pub fn ping(request_id: u64) -> Self {
        Self::new(OpCode::Ping, request_id, Bytes::new())
    }

    pub fn pong(request_id: u64) -> Self {
        Self::new(OpCode::Pong, request_id, Bytes::new())
    }

    pub fn error(request_id: u64, msg: &str) -> Self {
        Self::new(OpCode::Error, request_id, Bytes::copy_from_slice(msg.as_bytes()))
    }

    pub fn request_id(&self) -> u64 {
        self.header.request_id
    }

    pub fn encode(&self, buf: &mut BytesMut) {
        self.header.encode(buf);
        buf.put_slice(&self.payload);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_encode_decode() {
        let header = FrameHeader::new(OpCode::Cluster, 12345).with_payload_len(100);
        let mut buf = BytesMut::new();
        header.encode(&mut buf);

        assert_eq!(buf.len(), HEADER_SIZE);
        assert_eq!(&buf[..4], b"GLVC");

        let decoded = FrameHeader::decode(&mut buf.freeze()).unwrap();
        assert_eq!(decoded.opcode, OpCode::Cluster);
        assert_eq!(decoded.request_id, 12345);
        assert_eq!(decoded.payload_len, 100);
    }

    #[test]
    fn test_bad_magic_rejected() {
        let mut buf = BytesMut::new();
        FrameHeader::new(OpCode::Ping, 1).encode(&mut buf);
        buf[0] = b'X';
        let err = FrameHeader::decode(&mut buf.freeze()).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn test_opcode_lookup() {
        assert_eq!(OpCode::from_u8(0x17), Some(OpCode::Neighbors));
        assert_eq!(OpCode::from_u8(0x08), None);
    }
}
