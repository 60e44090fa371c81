//! The UDP session for master servers.
use std::net::SocketAddr;
use std::time::Duration;

use crate::error::{Result, SrcQueryError};
use crate::packet::{factory, Packet, Request, SINGLE_PACKET_MARKER};
use crate::socket::UdpTransport;

/// A socket to communicate with the master servers enumerating public
/// game servers. Master replies are never split.
#[derive(Debug)]
pub struct MasterServerSocket {
    transport: UdpTransport,
}

impl MasterServerSocket {
    pub async fn connect(addr: SocketAddr) -> Result<Self> {
        Ok(MasterServerSocket {
            transport: UdpTransport::connect(addr).await?,
        })
    }

    pub fn set_timeout(&mut self, timeout: Duration) {
        self.transport.set_timeout(timeout);
    }

    pub async fn send(&mut self, request: &Request) -> Result<()> {
        log::debug!("Sending packet of type \"{}\"...", request.kind());
        self.transport.send(&request.encode()).await
    }

    /// Reads a single reply datagram, which must lead with the plain
    /// single-packet marker.
    pub async fn get_reply(&mut self) -> Result<Packet> {
        self.transport.receive_packet(1500).await?;

        if self.transport.buffer().get_long()? != SINGLE_PACKET_MARKER {
            return Err(SrcQueryError::PacketFormat(
                "master server reply has the wrong packet header".to_string(),
            ));
        }

        let data = self.transport.buffer().get();
        let packet = factory::packet_from_data(&data)?;

        log::debug!("Received reply of type \"{}\"", packet.kind());

        Ok(packet)
    }
}
