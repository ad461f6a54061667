//! GLVC Codec for Tokio
//!
//! Implements Encoder and Decoder traits for framed I/O.

use bytes::BytesMut;
use std::io;
use tokio_util::codec::{Decoder, Encoder};

use super::frame::{Frame, FrameHeader, HEADER_SIZE};

/// Largest payload accepted from a peer (16 MiB)
pub const MAX_PAYLOAD: usize = 16 * 1024 * 1024;

/// Tokio codec for GLVC frames
#[derive(Debug, Default)]
pub struct GlvcCodec {
    state: DecodeState,
}

#[derive(Debug, Default)]
enum DecodeState {
    #[default]
    Header,
    Payload(FrameHeader),
}

impl GlvcCodec {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Decoder for GlvcCodec {
    type Item = Frame;
    type Error = io::Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        loop {
            match &self.state {
                DecodeState::Header => {
                    if src.len() < HEADER_SIZE {
                        return Ok(None);
                    }

                    let header = FrameHeader::decode(&mut src.split_to(HEADER_SIZE).freeze())?;
                    let payload_len = header.payload_len as usize;
                    if payload_len > MAX_PAYLOAD {
                        return Err(io::Error::new(
                            io::ErrorKind::InvalidData,
                            format!("Payload too large: {} bytes", payload_len),
                        ));
                    }
                    src.reserve(payload_len);
                    self.state = DecodeState::Payload(header);
                }

                DecodeState::Payload(header) => {
                    let payload_len = header.payload_len as usize;

                    if src.len() < payload_len {
                        return Ok(None);
                    }

                    let payload = src.split_to(payload_len).freeze();
                    let frame = Frame {
                        header: header.clone(),
                        payload,
                    };

                    self.state = DecodeState::Header;
                    return Ok(Some(frame));
                }
            }
        }
    }
}

impl Encoder<Frame> for GlvcCodec {
    type Error = io::Error;

    fn encode(&mut self, item: Frame, dst: &mut BytesMut) -> Result<(), Self::Error> {
        dst.reserve(HEADER_SIZE + item.payload.len());
        item.encode(dst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{FrameHeader, OpCode};
    use bytes::Bytes;

    #[test]
    fn test_codec_partial_decode() {
        let mut codec = GlvcCodec::new();
        let frame = Frame::new(OpCode::Tokenize, 1, Bytes::from_static(b"the cat sat"));

        let mut buf = BytesMut::new();
        codec.encode(frame.clone(), &mut buf).unwrap();
        let tail = buf.split_off(HEADER_SIZE + 3);

        assert!(codec.decode(&mut buf).unwrap().is_none());
        buf.unsplit(tail);
        assert_eq!(codec.decode(&mut buf).unwrap(), Some(frame));
        assert!(buf.is_empty());
    }

    #[test]
    fn test_codec_two_frames_in_one_read() {
        let mut codec = GlvcCodec::new();
        let mut buf = BytesMut::new();
        codec.encode(Frame::ping(1), &mut buf).unwrap();
        codec.encode(Frame::ping(2), &mut buf).unwrap();

        assert_eq!(codec.decode(&mut buf).unwrap().unwrap().request_id(), 1);
        assert_eq!(codec.decode(&mut buf).unwrap().unwrap().request_id(), 2);
        assert!(codec.decode(&mut buf).unwrap().is_none());
    }

    #[test]
    fn test_oversized_payload_rejected() {
        let mut codec = GlvcCodec::new();
        let mut buf = BytesMut::new();
        FrameHeader::new(OpCode::Get, 7)
            .with_payload_len(MAX_PAYLOAD as u32 + 1)
            .encode(&mut buf);
        assert!(codec.decode(&mut buf).is_err());
    }
}
