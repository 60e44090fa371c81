//! Turns raw reply bytes into [Packet] values, including reassembly of
//! split and bzip2-compressed payloads.
use std::collections::BTreeMap;
use std::io::Read;
use std::net::{Ipv4Addr, SocketAddrV4};

use bzip2::read::BzDecoder;

use crate::buffer::ByteBuffer;
use crate::error::{Result, SrcQueryError};
use crate::packet::{header, info, player, rules, Packet};

/// Decodes a complete logical packet from its raw bytes, dispatching on
/// the header byte.
pub fn packet_from_data(raw: &[u8]) -> Result<Packet> {
    let head = *raw.first().ok_or(SrcQueryError::BufferUnderflow)?;
    let mut data = ByteBuffer::wrap(raw[1..].to_vec());

    match head {
        header::S2A_INFO2 => Ok(Packet::Info(info::decode_info2(&mut data)?)),
        header::S2A_INFO_DETAILED => Ok(Packet::Info(info::decode_detailed(&mut data)?)),
        header::S2A_PLAYER => Ok(Packet::Players(player::decode(&mut data)?)),
        header::S2A_RULES => Ok(Packet::Rules(rules::decode(&mut data)?)),
        header::S2C_CHALLENGE => Ok(Packet::Challenge(data.get_long()?)),
        header::M2A_SERVER_BATCH => Ok(Packet::ServerBatch(decode_server_batch(&mut data)?)),
        // The challenge reply is plain text; its leading 'c' doubles as
        // the header byte, so it stays part of the response string.
        header::RCON_GOLDSRC_CHALLENGE => Ok(Packet::RconGoldSrc(rcon_text(raw)?)),
        header::RCON_GOLDSRC_NO_CHALLENGE | header::RCON_GOLDSRC_RESPONSE => {
            Ok(Packet::RconGoldSrc(rcon_text(&raw[1..])?))
        }
        other => Err(SrcQueryError::UnknownPacketHeader(other)),
    }
}

/// Reassembles the fragments of a split reply, keyed by fragment index,
/// into a single logical packet.
///
/// `compression` carries the expected CRC32 of the decompressed payload
/// when the reply was compressed as a unit. After (optional) decompression
/// and verification the 4-byte split-header remnant is stripped and the
/// remainder decoded as usual.
pub fn reassemble_packet(
    fragments: BTreeMap<usize, Vec<u8>>,
    compression: Option<u32>,
) -> Result<Packet> {
    let mut data: Vec<u8> = fragments.into_values().flatten().collect();

    if let Some(expected) = compression {
        let mut decompressed = Vec::new();
        BzDecoder::new(data.as_slice())
            .read_to_end(&mut decompressed)
            .map_err(|e| {
                SrcQueryError::PacketFormat(format!("bzip2 decompression failed: {e}"))
            })?;

        if crc32fast::hash(&decompressed) != expected {
            return Err(SrcQueryError::PacketFormat(
                "CRC32 checksum mismatch of decompressed packet data".to_string(),
            ));
        }

        data = decompressed;
    }

    if data.len() < 4 {
        return Err(SrcQueryError::BufferUnderflow);
    }

    packet_from_data(&data[4..])
}

/// GoldSrc RCON replies are padded with two trailing NUL bytes; strip them
/// to recover the command output.
fn rcon_text(raw: &[u8]) -> Result<String> {
    let text = &raw[..raw.len().saturating_sub(2)];
    Ok(std::str::from_utf8(text)?.to_string())
}

fn decode_server_batch(data: &mut ByteBuffer) -> Result<Vec<SocketAddrV4>> {
    if data.get_byte()? != 0x0a {
        return Err(SrcQueryError::PacketFormat(
            "master server reply is missing the leading 0x0A byte".to_string(),
        ));
    }

    let mut servers = Vec::new();
    while data.remaining() > 0 {
        if data.remaining() < 6 {
            return Err(SrcQueryError::PacketFormat(
                "truncated server address in master server reply".to_string(),
            ));
        }
        let ip = Ipv4Addr::new(
            data.get_byte()?,
            data.get_byte()?,
            data.get_byte()?,
            data.get_byte()?,
        );
        // port travels big-endian, unlike everything else
        let port = u16::from_be_bytes([data.get_byte()?, data.get_byte()?]);
        servers.push(SocketAddrV4::new(ip, port));
    }

    Ok(servers)
}
