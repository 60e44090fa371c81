//! The UDP query session for Source servers.
use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::time::Duration;

use crate::error::{Result, SrcQueryError};
use crate::packet::{factory, Packet, Request, SPLIT_PACKET_MARKER};
use crate::socket::{QuerySocket, UdpTransport};

/// A socket to communicate with game servers based on the Source engine
/// (e.g. Team Fortress 2, Counter-Strike: Source).
///
/// Unlike GoldSrc, Source may bzip2-compress big split replies; the
/// compression flag travels in bit 31 of the split request id and the
/// expected CRC32 of the decompressed whole in the first fragment's split
/// header.
#[derive(Debug)]
pub struct SourceSocket {
    transport: UdpTransport,
}

impl SourceSocket {
    pub async fn connect(addr: SocketAddr) -> Result<Self> {
        Ok(SourceSocket {
            transport: UdpTransport::connect(addr).await?,
        })
    }

    pub fn set_timeout(&mut self, timeout: Duration) {
        self.transport.set_timeout(timeout);
    }
}

impl QuerySocket for SourceSocket {
    async fn send(&mut self, request: &Request) -> Result<()> {
        log::debug!("Sending packet of type \"{}\"...", request.kind());
        self.transport.send(&request.encode()).await
    }

    async fn get_reply(&mut self) -> Result<Packet> {
        let mut bytes_read = self.transport.receive_packet(1400).await?;
        let mut compression: Option<u32> = None;

        let packet = if self.transport.buffer().get_long()? == SPLIT_PACKET_MARKER {
            let mut fragments: BTreeMap<usize, Vec<u8>> = BTreeMap::new();

            loop {
                let buffer = self.transport.buffer();
                let request_id = buffer.get_long()?;
                let is_compressed = (request_id as u32) & 0x8000_0000 != 0;
                let packet_count = buffer.get_byte()? as usize;
                let packet_number = buffer.get_byte()? as usize + 1;

                if is_compressed {
                    let _split_size = buffer.get_unsigned_long()?;
                    compression = Some(buffer.get_unsigned_long()?);
                } else {
                    let _split_size = buffer.get_short()?;
                }

                fragments.insert(packet_number - 1, buffer.get());

                log::debug!(
                    "Received packet {packet_number} of {packet_count} for request #{request_id}"
                );

                if fragments.len() < packet_count {
                    bytes_read = match self.transport.receive_packet(0).await {
                        Ok(n) => n,
                        Err(SrcQueryError::Timeout(_)) => 0,
                        Err(e) => return Err(e),
                    };
                } else {
                    bytes_read = 0;
                }

                if bytes_read == 0 || self.transport.buffer().get_long()? != SPLIT_PACKET_MARKER {
                    break;
                }
            }

            factory::reassemble_packet(fragments, compression)?
        } else {
            let data = self.transport.buffer().get();
            factory::packet_from_data(&data)?
        };

        if compression.is_some() {
            log::debug!("Received compressed reply of type \"{}\"", packet.kind());
        } else {
            log::debug!("Received reply of type \"{}\"", packet.kind());
        }

        Ok(packet)
    }
}
