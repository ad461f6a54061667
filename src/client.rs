//! Async Client
//!
//! Request/response client for the GLVC protocol, used by the CLI and the
//! server tests.

use futures::{SinkExt, StreamExt};
use thiserror::Error;
use tokio::net::TcpStream;
use tokio_util::codec::Framed;

use crate::protocol::{Command, GlvcCodec, Response};
use crate::vector::Neighbor;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Protocol error: {0}")]
    Protocol(String),
    #[error("Server error: {0}")]
    Server(String),
    #[error("Connection closed")]
    ConnectionClosed,
}

pub type ClientResult<T> = std::result::Result<T, ClientError>;

pub struct Client {
    framed: Framed<TcpStream, GlvcCodec>,
    next_request_id: u64,
}

impl Client {
    pub async fn connect(addr: &str) -> ClientResult<Self> {
        let stream = TcpStream::connect(addr).await?;
        stream.set_nodelay(true)?;
        Ok(Self {
            framed: Framed::new(stream, GlvcCodec::new()),
            next_request_id: 1,
        })
    }

    /// Send one command and wait for its response
    ///
    /// Server-side errors come back as `Response::Error`, not `Err`.
    pub async fn request(&mut self, command: &Command) -> ClientResult<Response> {
        let request_id = self.next_request_id;
        self.next_request_id += 1;

        self.framed.send(command.to_frame(request_id)).await?;
        let frame = self.framed.next().await.ok_or(ClientError::ConnectionClosed)??;
        if frame.request_id() != request_id {
            return Err(ClientError::Protocol(format!(
                "response id {} does not match request id {}",
                frame.request_id(),
                request_id
            )));
        }
        Ok(Response::from_frame(&frame)?)
    }

    pub async fn ping(&mut self) -> ClientResult<()> {
        match self.request(&Command::Ping).await? {
            Response::Pong => Ok(()),
            other => Err(unexpected(other)),
        }
    }

    pub async fn contains(&mut self, term: &str) -> ClientResult<bool> {
        let command = Command::Contains { term: term.to_string() };
        match self.request(&command).await? {
            Response::Integer(n) => Ok(n != 0),
            other => Err(unexpected(other)),
        }
    }

    /// Vector for `term`, `None` when out of vocabulary
    pub async fn get(&mut self, term: &str) -> ClientResult<Option<Vec<f32>>> {
        let command = Command::Get { term: term.to_string() };
        match self.request(&command).await? {
            Response::Vector(v) => Ok(Some(v)),
            Response::NotFound(_) => Ok(None),
            other => Err(unexpected(other)),
        }
    }

    /// Nearest terms, `None` when `term` is out of vocabulary
    pub async fn cluster(&mut self, term: &str, k: Option<u32>) -> ClientResult<Option<Vec<Neighbor>>> {
        let command = Command::Cluster { term: term.to_string(), k };
        match self.request(&command).await? {
            Response::Neighbors(n) => Ok(Some(n)),
            Response::NotFound(_) => Ok(None),
            other => Err(unexpected(other)),
        }
    }

    pub async fn similarity(&mut self, a: &str, b: &str) -> ClientResult<Option<f32>> {
        let command = Command::Similarity { a: a.to_string(), b: b.to_string() };
        match self.request(&command).await? {
            Response::Float(x) => Ok(Some(x)),
            Response::NotFound(_) => Ok(None),
            other => Err(unexpected(other)),
        }
    }

    pub async fn tokenize(&mut self, text: &str) -> ClientResult<Vec<String>> {
        let command = Command::Tokenize { text: text.to_string() };
        match self.request(&command).await? {
            Response::Array(tokens) => Ok(tokens),
            other => Err(unexpected(other)),
        }
    }

    pub async fn info(&mut self) -> ClientResult<Vec<String>> {
        match self.request(&Command::Info).await? {
            Response::Array(lines) => Ok(lines),
            other => Err(unexpected(other)),
        }
    }
}

fn unexpected(response: Response) -> ClientError {
    match response {
        Response::Error(e) => ClientError::Server(e),
        other => ClientError::Protocol(format!("unexpected response: {}", other)),
    }
}
