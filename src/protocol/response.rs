//! GLVC Response types
//!
//! Response variants for command execution results.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::io;

use super::command::{read_string, write_string};
use super::frame::{Frame, OpCode};
use crate::vector::Neighbor;

/// Response to a command
#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    /// Simple OK response
    Ok,

    /// Pong response (for PING)
    Pong,

    /// Error response
    Error(String),

    /// Term absent from the vocabulary
    NotFound(String),

    /// Integer value (membership, counts)
    Integer(i64),

    /// Similarity score
    Float(f32),

    /// Embedding vector
    Vector(Vec<f32>),

    /// Ranked cluster
    Neighbors(Vec<Neighbor>),

    /// List of strings
    Array(Vec<String>),
}

impl Response {
    /// Convert response to a frame
    pub fn to_frame(&self, request_id: u64) -> Frame {
        let mut buf = BytesMut::new();
        let opcode = match self {
            Response::Ok => OpCode::Ok,
            Response::Pong => OpCode::Pong,
            Response::Error(msg) => return Frame::error(request_id, msg),
            Response::NotFound(term) => {
                buf.put_slice(term.as_bytes());
                OpCode::NotFound
            }
            Response::Integer(n) => {
                buf.put_i64(*n);
                OpCode::Integer
            }
            Response::Float(x) => {
                buf.put_f32(*x);
                OpCode::Float
            }
            Response::Vector(values) => {
                buf.reserve(4 + values.len() * 4);
                buf.put_u32(values.len() as u32);
                for v in values {
                    buf.put_f32(*v);
                }
                OpCode::Vector
            }
            Response::Neighbors(neighbors) => {
                buf.put_u32(neighbors.len() as u32);
                for n in neighbors {
                    write_string(&mut buf, &n.term);
                    buf.put_f32(n.score);
                }
                OpCode::Neighbors
            }
            Response::Array(items) => {
                buf.put_u32(items.len() as u32);
                for item in items {
                    write_string(&mut buf, item);
                }
                OpCode::Array
            }
        };
        Frame::new(opcode, request_id, buf.freeze())
    }

    /// Parse response from a frame
    pub fn from_frame(frame: &Frame) -> io::Result<Self> {
        let mut buf = frame.payload.clone();
        match frame.header.opcode {
            OpCode::Ok => Ok(Response::Ok),
            OpCode::Pong => Ok(Response::Pong),
            OpCode::Error => Ok(Response::Error(String::from_utf8_lossy(&buf).to_string())),
            OpCode::NotFound => Ok(Response::NotFound(String::from_utf8_lossy(&buf).to_string())),
            OpCode::Integer => {
                need(&buf, 8, "Invalid integer payload")?;
                Ok(Response::Integer(buf.get_i64()))
            }
            OpCode::Float => {
                need(&buf, 4, "Invalid float payload")?;
                Ok(Response::Float(buf.get_f32()))
            }
            OpCode::Vector => {
                let count = read_count(&mut buf)?;
                need(&buf, count * 4, "Insufficient vector data")?;
                Ok(Response::Vector((0..count).map(|_| buf.get_f32()).collect()))
            }
            OpCode::Neighbors => {
                let count = read_count(&mut buf)?;
                let mut neighbors = Vec::with_capacity(count.min(4096));
                for _ in 0..count {
                    let term = read_string(&mut buf)?;
                    need(&buf, 4, "Insufficient score data")?;
                    neighbors.push(Neighbor {
                        term,
                        score: buf.get_f32(),
                    });
                }
                Ok(Response::Neighbors(neighbors))
            }
            OpCode::Array => {
                let count = read_count(&mut buf)?;
                let mut items = Vec::with_capacity(count.min(4096));
                for _ in 0..count {
                    items.push(read_string(&mut buf)?);
                }
                Ok(Response::Array(items))
            }
            _ => Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("Unexpected opcode for response: {:?}", frame.header.opcode),
            )),
        }
    }
}

fn need(buf: &Bytes, len: usize, msg: &'static str) -> io::Result<()> {
    if buf.remaining() < len {
        return Err(io::Error::new(io::ErrorKind::UnexpectedEof, msg));
    }
    Ok(())
}

fn read_count(buf: &mut Bytes) -> io::Result<usize> {
    need(buf, 4, "Invalid array payload")?;
    Ok(buf.get_u32() as usize)
}

impl std::fmt::Display for Response {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Response::Ok => write!(f, "OK"),
            Response::Pong => write!(f, "PONG"),
            Response::Error(msg) => write!(f, "(error) {}", msg),
            Response::NotFound(term) => write!(f, "(not found) {:?}", term),
            Response::Integer(n) => write!(f, "(integer) {}", n),
            Response::Float(x) => write!(f, "(float) {:.6}", x),
            Response::Vector(values) => {
                write!(f, "[")?;
                for (i, v) in values.iter().enumerate() {
                    if i > 0 { write!(f, ", ")?; }
                    write!(f, "{}", v)?;
                }
                write!(f, "]")
            }
            Response::Neighbors(neighbors) => {
                for (i, n) in neighbors.iter().enumerate() {
                    if i > 0 { writeln!(f)?; }
                    write!(f, "{}) {} {:.6}", i + 1, n.term, n.score)?;
                }
                Ok(())
            }
            Response::Array(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 { write!(f, ", ")?; }
                    write!(f, "\"{}\"", item)?;
                }
                write!(f, "]")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reparse(response: &Response) -> Response {
        Response::from_frame(&response.to_frame(1)).unwrap()
    }

    #[test]
    fn test_neighbors_response() {
        let response = Response::Neighbors(vec![
            Neighbor { term: "cat".into(), score: 1.0 },
            Neighbor { term: "dog".into(), score: 0.993_884 },
        ]);
        assert_eq!(reparse(&response), response);
    }

    #[test]
    fn test_vector_and_float_keep_bits() {
        let response = Response::Vector(vec![0.1, -2.5e-7, f32::MAX]);
        assert_eq!(reparse(&response), response);
        assert_eq!(reparse(&Response::Float(-0.25)), Response::Float(-0.25));
    }

    #[test]
    fn test_not_found_carries_term() {
        let frame = Response::NotFound("xyzzy".into()).to_frame(4);
        assert_eq!(frame.header.opcode, OpCode::NotFound);
        assert_eq!(Response::from_frame(&frame).unwrap(), Response::NotFound("xyzzy".into()));
    }

    #[test]
    fn test_truncated_vector() {
        let frame = Frame::new(OpCode::Vector, 1, Bytes::from_static(&[0, 0, 0, 2, 0, 0, 0, 0]));
        assert!(Response::from_frame(&frame).is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(Response::Integer(1).to_string(), "(integer) 1");
        assert_eq!(Response::Array(vec!["cat".into()]).to_string(), "[\"cat\"]");
    }
}
