//! The stateful TCP session for Source RCON.
use std::io::ErrorKind;
use std::net::SocketAddr;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;

use crate::error::{Result, SrcQueryError};
use crate::packet::rcon::{RconRequest, RconResponse};
use crate::socket::DEFAULT_TIMEOUT;

/// A TCP socket for RCON communication with Source servers.
///
/// The connection is opened lazily on the first [send](Self::send) and
/// re-opened after the server closes it. A clean close at a frame
/// boundary is the server's normal way of ending the RCON channel and
/// surfaces as `Ok(None)` from [get_reply](Self::get_reply), never as an
/// error; a reset in the middle of a frame is
/// [SrcQueryError::ConnectionReset].
#[derive(Debug)]
pub struct RconSocket {
    addr: SocketAddr,
    timeout: Duration,
    stream: Option<TcpStream>,
}

impl RconSocket {
    pub fn new(addr: SocketAddr) -> Self {
        RconSocket {
            addr,
            timeout: DEFAULT_TIMEOUT,
            stream: None,
        }
    }

    pub fn set_timeout(&mut self, timeout: Duration) {
        self.timeout = timeout;
    }

    /// Sends one RCON frame, connecting first if needed.
    pub async fn send(&mut self, request: &RconRequest) -> Result<()> {
        let stream = match self.stream.as_mut() {
            Some(stream) => stream,
            None => {
                let stream = timeout(self.timeout, TcpStream::connect(self.addr))
                    .await?
                    .map_err(SrcQueryError::UnreachableHost)?;
                self.stream.insert(stream)
            }
        };

        log::debug!("Sending packet of type \"{}\"...", request.kind());

        timeout(self.timeout, stream.write_all(&request.encode()))
            .await?
            .map_err(SrcQueryError::SendError)?;

        Ok(())
    }

    /// Reads one complete reply frame: the 4-byte length prefix, then
    /// exactly that many bytes, looping over short TCP reads.
    ///
    /// Returns `Ok(None)` when the server closed the connection before
    /// sending another frame.
    pub async fn get_reply(&mut self) -> Result<Option<RconResponse>> {
        let stream = match self.stream.as_mut() {
            Some(stream) => stream,
            None => return Ok(None),
        };

        let mut prefix = [0u8; 4];
        let mut have = 0;
        while have < 4 {
            let read = timeout(self.timeout, stream.read(&mut prefix[have..])).await?;
            let n = match read {
                Ok(n) => n,
                Err(e) if e.kind() == ErrorKind::ConnectionReset && have == 0 => 0,
                Err(e) if e.kind() == ErrorKind::ConnectionReset => {
                    self.stream = None;
                    return Err(SrcQueryError::ConnectionReset);
                }
                Err(e) => return Err(SrcQueryError::ReceiveError(e)),
            };
            if n == 0 {
                self.stream = None;
                if have == 0 {
                    return Ok(None);
                }
                return Err(SrcQueryError::ConnectionReset);
            }
            have += n;
        }

        let packet_size = i32::from_le_bytes(prefix);
        if packet_size < 0 {
            return Err(SrcQueryError::PacketFormat(format!(
                "negative RCON frame length {packet_size}"
            )));
        }

        let mut frame = vec![0u8; packet_size as usize];
        let mut filled = 0;
        while filled < frame.len() {
            let n = timeout(self.timeout, stream.read(&mut frame[filled..]))
                .await?
                .map_err(|e| match e.kind() {
                    ErrorKind::ConnectionReset => SrcQueryError::ConnectionReset,
                    _ => SrcQueryError::ReceiveError(e),
                })?;
            if n == 0 {
                self.stream = None;
                return Err(SrcQueryError::ConnectionReset);
            }
            filled += n;
        }

        let packet = RconResponse::decode(&frame)?;

        log::debug!("Received packet of type \"{}\"", packet.kind());

        Ok(Some(packet))
    }

    /// Drops the TCP connection. The next [send](Self::send) reconnects.
    pub fn close(&mut self) {
        self.stream = None;
    }
}
