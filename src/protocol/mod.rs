//! GLVC Protocol
//!
//! Binary request/response protocol for serving embedding lookups and
//! clusters. Every frame starts with a fixed 22-byte header.

mod codec;
mod command;
mod frame;
mod response;

pub use codec::{GlvcCodec, MAX_PAYLOAD};
pub use command::Command;
pub use frame::{Frame, FrameHeader, OpCode, HEADER_SIZE, MAGIC, VERSION};
pub use response::Response;
