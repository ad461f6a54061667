//! GLVC Command Parsing
//!
//! Parses command arguments from request frames.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::io;

use super::frame::{Frame, OpCode};

/// Parsed command from a request frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Health check
    Ping,

    /// Vocabulary membership
    Contains { term: String },

    /// Vector for a term
    Get { term: String },

    /// Nearest terms; `None` uses the server's default k
    Cluster { term: String, k: Option<u32> },

    /// Cosine similarity between two terms
    Similarity { a: String, b: String },

    /// In-vocabulary, non-stopword terms of free text
    Tokenize { text: String },

    /// Server and backend statistics
    Info,
}

impl Command {
    /// Parse command from a request frame
    pub fn from_frame(frame: &Frame) -> io::Result<Self> {
        let mut payload = frame.payload.clone();
        match frame.header.opcode {
            OpCode::Ping => Ok(Command::Ping),
            OpCode::Info => Ok(Command::Info),

            OpCode::Contains => Ok(Command::Contains {
                term: read_string(&mut payload)?,
            }),

            OpCode::Get => Ok(Command::Get {
                term: read_string(&mut payload)?,
            }),

            OpCode::Cluster => {
                let term = read_string(&mut payload)?;
                let k = if payload.remaining() >= 4 {
                    Some(payload.get_u32())
                } else {
                    None
                };
                Ok(Command::Cluster { term, k })
            }

            OpCode::Similarity => {
                let a = read_string(&mut payload)?;
                let b = read_string(&mut payload)?;
                Ok(Command::Similarity { a, b })
            }

            OpCode::Tokenize => Ok(Command::Tokenize {
                text: read_string(&mut payload)?,
            }),

            _ => Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("Unexpected opcode for command: {:?}", frame.header.opcode),
            )),
        }
    }

    /// Encode command to frame payload bytes
    pub fn encode(&self) -> (OpCode, Bytes) {
        let mut buf = BytesMut::new();
        let opcode = match self {
            Command::Ping => OpCode::Ping,
            Command::Info => OpCode::Info,
            Command::Contains { term } => {
                write_string(&mut buf, term);
                OpCode::Contains
            }
            Command::Get { term } => {
                write_string(&mut buf, term);
                OpCode::Get
            }
            Command::Cluster { term, k } => {
                write_string(&mut buf, term);
                if let Some(k) = k {
                    buf.put_u32(*k);
                }
                OpCode::Cluster
            }
            Command::Similarity { a, b } => {
                write_string(&mut buf, a);
                write_string(&mut buf, b);
                OpCode::Similarity
            }
            Command::Tokenize { text } => {
                write_string(&mut buf, text);
                OpCode::Tokenize
            }
        };
        (opcode, buf.freeze())
    }

    /// Build a request frame for this command
    pub fn to_frame(&self, request_id: u64) -> Frame {
        let (opcode, payload) = self.encode();
        Frame::new(opcode, request_id, payload)
    }

    /// Command name for metrics and logs
    pub fn name(&self) -> &'static str {
        match self {
            Command::Ping => "PING",
            Command::Contains { .. } => "CONTAINS",
            Command::Get { .. } => "GET",
            Command::Cluster { .. } => "CLUSTER",
            Command::Similarity { .. } => "SIMILARITY",
            Command::Tokenize { .. } => "TOKENIZE",
            Command::Info => "INFO",
        }
    }
}

pub(crate) fn read_string(buf: &mut Bytes) -> io::Result<String> {
    if buf.remaining() < 4 {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            "Not enough data for length prefix",
        ));
    }
    let len = buf.get_u32() as usize;
    if buf.remaining() < len {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            "Not enough data for payload",
        ));
    }
    let bytes = buf.copy_to_bytes(len);
    String::from_utf8(bytes.to_vec())
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

pub(crate) fn write_string(buf: &mut BytesMut, s: &str) {
    buf.put_u32(s.len() as u32);
    buf.put_slice(s.as_bytes());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ping_command() {
        let cmd = Command::from_frame(&Frame::ping(1)).unwrap();
        assert_eq!(cmd, Command::Ping);
    }

    #[test]
    fn test_cluster_command_with_k() {
        let cmd = Command::Cluster {
            term: "cat".into(),
            k: Some(25),
        };
        let parsed = Command::from_frame(&cmd.to_frame(9)).unwrap();
        assert_eq!(parsed, cmd);
    }

    #[test]
    fn test_cluster_command_default_k() {
        let cmd = Command::Cluster {
            term: "cat".into(),
            k: None,
        };
        let frame = cmd.to_frame(1);
        assert_eq!(frame.payload.len(), 4 + 3);
        assert_eq!(Command::from_frame(&frame).unwrap(), cmd);
    }

    #[test]
    fn test_similarity_command() {
        let cmd = Command::Similarity {
            a: "köln".into(),
            b: "bonn".into(),
        };
        assert_eq!(Command::from_frame(&cmd.to_frame(3)).unwrap(), cmd);
        assert_eq!(cmd.name(), "SIMILARITY");
    }

    #[test]
    fn test_truncated_payload() {
        let frame = Frame::new(OpCode::Get, 1, Bytes::from_static(&[0, 0, 0, 9, b'c']));
        let err = Command::from_frame(&frame).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }

    #[test]
    fn test_invalid_utf8() {
        let frame = Frame::new(OpCode::Contains, 1, Bytes::from_static(&[0, 0, 0, 1, 0xff]));
        let err = Command::from_frame(&frame).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn test_response_opcode_is_not_a_command() {
        let frame = Frame::pong(1);
        assert!(Command::from_frame(&frame).is_err());
    }
}
