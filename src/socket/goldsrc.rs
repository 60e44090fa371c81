//! The UDP session for GoldSrc servers: queries plus the connectionless
//! GoldSrc RCON protocol.
use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::time::Duration;

use crate::error::{Result, SrcQueryError};
use crate::packet::{factory, Packet, Request, SPLIT_PACKET_MARKER};
use crate::socket::{QuerySocket, UdpTransport};

/// Literal reply text of a server that has banned this address.
const BAN_MESSAGE: &str = "You have been banned from this server.";
/// Literal reply text for a wrong RCON password.
const BAD_PASSWORD_MESSAGE: &str = "Bad rcon_password.";

/// Offset of the challenge number inside the trimmed "challenge rcon …"
/// reply text.
const CHALLENGE_NUMBER_OFFSET: usize = 14;

/// A socket to communicate with game servers based on the GoldSrc engine
/// (e.g. Half-Life, Counter-Strike 1.6).
///
/// GoldSrc RCON is connectionless and rides on the same UDP socket as the
/// queries, so the RCON state machine lives here too.
#[derive(Debug)]
pub struct GoldSrcSocket {
    transport: UdpTransport,
    /// HLTV relays need a fresh challenge per command and sometimes do not
    /// reply to non-privileged commands at all.
    is_hltv: bool,
    rcon_challenge: Option<i64>,
}

impl GoldSrcSocket {
    pub async fn connect(addr: SocketAddr, is_hltv: bool) -> Result<Self> {
        Ok(GoldSrcSocket {
            transport: UdpTransport::connect(addr).await?,
            is_hltv,
            rcon_challenge: None,
        })
    }

    pub fn set_timeout(&mut self, timeout: Duration) {
        self.transport.set_timeout(timeout);
    }

    /// Reads one logical reply, reassembling split packets.
    ///
    /// A datagram leading with the split marker (-2) starts fragment
    /// collection: each fragment carries a request id and a packed byte
    /// whose low nibble is the total count and whose high nibble is the
    /// 0-based index. GoldSrc never compresses split replies.
    async fn read_reply(&mut self) -> Result<Packet> {
        let mut bytes_read = self.transport.receive_packet(1400).await?;

        let packet = if self.transport.buffer().get_long()? == SPLIT_PACKET_MARKER {
            let mut fragments: BTreeMap<usize, Vec<u8>> = BTreeMap::new();

            loop {
                let buffer = self.transport.buffer();
                let request_id = buffer.get_long()?;
                let packed = buffer.get_byte()?;
                let packet_count = (packed & 0x0f) as usize;
                let packet_number = (packed >> 4) as usize + 1;
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

            factory::reassemble_packet(fragments, None)?
        } else {
            let data = self.transport.buffer().get();
            factory::packet_from_data(&data)?
        };

        log::debug!("Received packet of type \"{}\"", packet.kind());

        Ok(packet)
    }

    /// Requests a challenge number from the server for further RCON
    /// requests.
    pub async fn rcon_get_challenge(&mut self) -> Result<()> {
        self.rcon_send("challenge rcon".to_string()).await?;
        let response = self.read_reply().await?.into_rcon_text()?;
        let response = response.trim();

        if response == BAN_MESSAGE {
            return Err(SrcQueryError::RconBan);
        }

        let number = response
            .get(CHALLENGE_NUMBER_OFFSET..)
            .map(str::trim)
            .and_then(|n| n.parse::<i64>().ok())
            .ok_or_else(|| {
                SrcQueryError::PacketFormat(format!(
                    "unexpected challenge reply \"{response}\""
                ))
            })?;
        self.rcon_challenge = Some(number);

        Ok(())
    }

    /// Executes `command` on the server via RCON, challenging first when
    /// needed.
    pub async fn rcon_exec(&mut self, password: &str, command: &str) -> Result<String> {
        if self.rcon_challenge.is_none() || self.is_hltv {
            self.rcon_get_challenge().await?;
        }
        // the challenge was just set above when it was missing
        let challenge = self.rcon_challenge.ok_or(SrcQueryError::RconNoAuth)?;

        self.rcon_send(format!("rcon {challenge} {password} {command}"))
            .await?;

        let mut response = if self.is_hltv {
            // HLTV does not reply to non-privileged commands; treat the
            // timeout as an empty reply but keep a trace of it.
            match self.read_reply().await {
                Ok(reply) => reply.into_rcon_text()?,
                Err(SrcQueryError::Timeout(_)) => {
                    log::debug!("HLTV did not reply, treating as empty response");
                    String::new()
                }
                Err(e) => return Err(e),
            }
        } else {
            self.read_reply().await?.into_rcon_text()?
        };

        match response.trim() {
            BAD_PASSWORD_MESSAGE => return Err(SrcQueryError::RconNoAuth),
            BAN_MESSAGE => return Err(SrcQueryError::RconBan),
            _ => {}
        }

        // resend without the command to flush any remaining output
        self.rcon_send(format!("rcon {challenge} {password}")).await?;
        loop {
            let part = self.read_reply().await?.into_rcon_text()?;
            response.push_str(&part);
            if part.is_empty() {
                break;
            }
        }

        Ok(response)
    }

    async fn rcon_send(&mut self, body: String) -> Result<()> {
        self.send(&Request::GoldSrcRcon { body }).await
    }
}

impl QuerySocket for GoldSrcSocket {
    async fn send(&mut self, request: &Request) -> Result<()> {
        log::debug!("Sending packet of type \"{}\"...", request.kind());
        self.transport.send(&request.encode()).await
    }

    async fn get_reply(&mut self) -> Result<Packet> {
        self.read_reply().await
    }
}
