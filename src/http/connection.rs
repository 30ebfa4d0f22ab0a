use std::net::SocketAddr;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::http::group::ParserGroup;
use crate::http::parser::State;

const READ_CHUNK: usize = 4096;

/// Fixed acknowledgement written after each complete request.
pub const ACKNOWLEDGEMENT: &[u8] = b"HTTP/1.1 204 No Content\r\nContent-Length: 0\r\n\r\n";

pub struct Connection<S> {
    stream: S,
    group: ParserGroup,
    peer: Option<SocketAddr>,
    // Bytes read past the end of the previous request.
    pending: Vec<u8>,
    state: ConnectionState,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Reading,
    Acknowledging { keep_alive: bool },
    Closed,
}

enum ReadOutcome {
    Complete { keep_alive: bool },
    Failed,
    PeerClosed,
}

impl<S> Connection<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(stream: S, group: ParserGroup) -> Self {
        Self {
            stream,
            group,
            peer: None,
            pending: Vec::new(),
            state: ConnectionState::Reading,
        }
    }

    /// Records the peer address; parsers carry it as their tag.
    pub fn with_peer(mut self, peer: SocketAddr) -> Self {
        self.peer = Some(peer);
        self
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub async fn run(&mut self) -> anyhow::Result<()> {
        loop {
            match self.state {
                ConnectionState::Reading => {
                    self.state = match self.read_request().await? {
                        ReadOutcome::Complete { keep_alive } => {
                            ConnectionState::Acknowledging { keep_alive }
                        }
                        ReadOutcome::Failed | ReadOutcome::PeerClosed => ConnectionState::Closed,
                    };
                }

                ConnectionState::Acknowledging { keep_alive } => {
                    self.stream.write_all(ACKNOWLEDGEMENT).await?;
                    self.stream.flush().await?;

                    self.state = if keep_alive {
                        ConnectionState::Reading
                    } else {
                        ConnectionState::Closed
                    };
                }

                ConnectionState::Closed => break,
            }
        }

        Ok(())
    }

    /// Feeds socket data into a fresh parser until the request completes.
    async fn read_request(&mut self) -> anyhow::Result<ReadOutcome> {
        let mut parser = self.group.acquire();
        if let Some(peer) = self.peer {
            parser.set_tag(peer);
        }

        // Pipelined bytes from the previous request go first.
        if !self.pending.is_empty() {
            let pending = std::mem::take(&mut self.pending);
            parser.feed(&pending);
        }

        let mut temp = [0u8; READ_CHUNK];
        while !parser.is_complete() {
            let n = self.stream.read(&mut temp).await?;
            if n == 0 {
                return Ok(ReadOutcome::PeerClosed);
            }
            parser.feed(&temp[..n]);
        }

        if parser.state() != State::Complete {
            return Ok(ReadOutcome::Failed);
        }

        let closing = parser
            .header("Connection")
            .is_some_and(|v| v.trim_end().eq_ignore_ascii_case("close"));
        let keep_alive = !closing && parser.protocol() == "HTTP/1.1";

        self.pending.extend_from_slice(parser.leftover());
        Ok(ReadOutcome::Complete { keep_alive })
    }
}
