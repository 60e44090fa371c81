//! Transport plumbing and the per-engine socket sessions.
//!
//! Every session owns exactly one transport handle and one [ByteBuffer]
//! and is strictly half-duplex: `send` then `get_reply`, never two
//! requests in flight. All receive paths are bounded by the session
//! timeout and surface [SrcQueryError::Timeout] when it expires.
pub mod goldsrc;
pub mod master;
pub mod rcon;
pub mod source;

use std::net::SocketAddr;
use std::time::Duration;

use tokio::net::UdpSocket;
use tokio::time::timeout;

use crate::buffer::ByteBuffer;
use crate::error::{Result, SrcQueryError};
use crate::packet::{Packet, Request};

pub use crate::socket::goldsrc::GoldSrcSocket;
pub use crate::socket::master::MasterServerSocket;
pub use crate::socket::rcon::RconSocket;
pub use crate::socket::source::SourceSocket;

/// Default per-receive timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(1000);

/// The common contract of the UDP query sockets: serialize and send one
/// request, then block for the decoded reply.
#[allow(async_fn_in_trait)]
pub trait QuerySocket {
    async fn send(&mut self, request: &Request) -> Result<()>;
    async fn get_reply(&mut self) -> Result<Packet>;
}

/// A connected UDP socket plus the session's receive buffer.
#[derive(Debug)]
pub(crate) struct UdpTransport {
    socket: UdpSocket,
    timeout: Duration,
    buffer: ByteBuffer,
}

impl UdpTransport {
    /// Binds an ephemeral local port and connects it to `addr`.
    pub(crate) async fn connect(addr: SocketAddr) -> Result<Self> {
        let socket = UdpSocket::bind("0.0.0.0:0")
            .await
            .map_err(SrcQueryError::FailedPortBind)?;
        socket
            .connect(addr)
            .await
            .map_err(SrcQueryError::UnreachableHost)?;

        Ok(UdpTransport {
            socket,
            timeout: DEFAULT_TIMEOUT,
            buffer: ByteBuffer::allocate(0),
        })
    }

    pub(crate) fn set_timeout(&mut self, timeout: Duration) {
        self.timeout = timeout;
    }

    pub(crate) async fn send(&mut self, data: &[u8]) -> Result<()> {
        timeout(self.timeout, self.socket.send(data))
            .await?
            .map_err(SrcQueryError::SendError)?;
        Ok(())
    }

    /// Waits for the next datagram and wraps it into the session buffer.
    ///
    /// `buffer_length > 0` allocates a fresh buffer of that size;
    /// `buffer_length == 0` clears and reuses the current one (continuation
    /// reads during split-packet collection). Returns the number of bytes
    /// read, with the buffer rewound and its limit set to them.
    pub(crate) async fn receive_packet(&mut self, buffer_length: usize) -> Result<usize> {
        if buffer_length == 0 {
            self.buffer.clear();
        } else {
            self.buffer = ByteBuffer::allocate(buffer_length);
        }

        let mut chunk = vec![0u8; self.buffer.remaining()];
        let bytes_read = timeout(self.timeout, self.socket.recv(&mut chunk))
            .await?
            .map_err(SrcQueryError::ReceiveError)?;
        self.buffer.put(&chunk[..bytes_read]);

        self.buffer.rewind();
        self.buffer.set_limit(bytes_read);

        Ok(bytes_read)
    }

    pub(crate) fn buffer(&mut self) -> &mut ByteBuffer {
        &mut self.buffer
    }
}
