//! The packet model: tagged variants for every message kind of the query
//! protocols, plus their wire encodings.
//!
//! Requests are serialized by [`Request::encode`]; replies are decoded from
//! raw bytes by [`factory::packet_from_data`]. The Source RCON TCP frames
//! live in their own [`rcon`] module since they use a different framing.
pub mod factory;
pub mod info;
pub mod player;
pub mod rcon;
pub mod rules;

use std::collections::HashMap;
use std::net::SocketAddrV4;

use crate::error::{Result, SrcQueryError};
use crate::packet::info::ServerInfo;
use crate::packet::player::Player;

/// Wire discriminator bytes, one per packet kind.
pub mod header {
    pub const A2M_GET_SERVERS_BATCH2: u8 = 0x31;
    pub const A2S_INFO: u8 = 0x54;
    pub const A2S_PLAYER: u8 = 0x55;
    pub const A2S_RULES: u8 = 0x56;
    pub const A2S_SERVERQUERY_GETCHALLENGE: u8 = 0x57;
    pub const S2C_CHALLENGE: u8 = 0x41;
    pub const S2A_INFO2: u8 = 0x49;
    pub const S2A_INFO_DETAILED: u8 = 0x6d;
    pub const S2A_PLAYER: u8 = 0x44;
    pub const S2A_RULES: u8 = 0x45;
    pub const M2A_SERVER_BATCH: u8 = 0x66;
    pub const RCON_GOLDSRC_CHALLENGE: u8 = 0x63;
    pub const RCON_GOLDSRC_NO_CHALLENGE: u8 = 0x39;
    pub const RCON_GOLDSRC_RESPONSE: u8 = 0x6c;
}

/// Every outgoing connectionless datagram starts with this marker.
pub const SINGLE_PACKET_MARKER: i32 = -1;
/// Datagrams starting with this marker carry a fragment of a split reply.
pub const SPLIT_PACKET_MARKER: i32 = -2;

/// Minimum total size of padded query packets, fixed by Valve as a
/// counter-measure to reflection DoS attacks (November 2020).
pub const MIN_QUERY_PACKET_SIZE: usize = 1200;

/// An outgoing query datagram.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    /// A2S_INFO, with the challenge echoed back when the server demanded
    /// one. Padded to [MIN_QUERY_PACKET_SIZE].
    Info { challenge: Option<i32> },
    /// A2S_PLAYER
    Players { challenge: i32 },
    /// A2S_RULES
    Rules { challenge: i32 },
    /// A2S_SERVERQUERY_GETCHALLENGE
    GetChallenge,
    /// A2M_GET_SERVERS_BATCH2, requesting the page of servers following
    /// `start` ("0.0.0.0:0" for the first page).
    GetServers {
        region: u8,
        start: String,
        filter: String,
    },
    /// A GoldSrc RCON command line. Carries no header byte, just the raw
    /// text after the connectionless marker.
    GoldSrcRcon { body: String },
}

impl Request {
    /// Serializes this request for the wire:
    /// `0xFFFFFFFF | header byte | payload`.
    pub fn encode(&self) -> Vec<u8> {
        let mut payload: Vec<u8> = Vec::new();
        payload.extend_from_slice(&SINGLE_PACKET_MARKER.to_le_bytes());

        match self {
            Request::Info { challenge } => {
                payload.push(header::A2S_INFO);
                payload.extend_from_slice(b"Source Engine Query\0");
                if let Some(challenge) = challenge {
                    payload.extend_from_slice(&challenge.to_le_bytes());
                }
                payload.resize(payload.len().max(MIN_QUERY_PACKET_SIZE), 0);
            }
            Request::Players { challenge } => {
                payload.push(header::A2S_PLAYER);
                payload.extend_from_slice(&challenge.to_le_bytes());
            }
            Request::Rules { challenge } => {
                payload.push(header::A2S_RULES);
                payload.extend_from_slice(&challenge.to_le_bytes());
            }
            Request::GetChallenge => {
                payload.push(header::A2S_SERVERQUERY_GETCHALLENGE);
            }
            Request::GetServers {
                region,
                start,
                filter,
            } => {
                payload.push(header::A2M_GET_SERVERS_BATCH2);
                payload.push(*region);
                payload.extend_from_slice(start.as_bytes());
                payload.push(0);
                payload.extend_from_slice(filter.as_bytes());
                payload.push(0);
            }
            Request::GoldSrcRcon { body } => {
                payload.extend_from_slice(body.as_bytes());
            }
        }

        payload
    }

    /// The packet kind, for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Request::Info { .. } => "A2S_INFO",
            Request::Players { .. } => "A2S_PLAYER",
            Request::Rules { .. } => "A2S_RULES",
            Request::GetChallenge => "A2S_SERVERQUERY_GETCHALLENGE",
            Request::GetServers { .. } => "A2M_GET_SERVERS_BATCH2",
            Request::GoldSrcRcon { .. } => "RCON_GOLDSRC_REQUEST",
        }
    }
}

/// A decoded reply from a game or master server.
#[derive(Debug, Clone, PartialEq)]
pub enum Packet {
    /// S2A_INFO2 or the deprecated S2A_INFO_DETAILED format.
    Info(ServerInfo),
    /// S2A_PLAYER; keyed by player name, last entry wins on collision.
    Players(HashMap<String, Player>),
    /// S2A_RULES
    Rules(HashMap<String, String>),
    /// S2C_CHALLENGE
    Challenge(i32),
    /// M2A_SERVER_BATCH; includes the `0.0.0.0:0` end-of-list sentinel.
    ServerBatch(Vec<SocketAddrV4>),
    /// A GoldSrc RCON reply, trailing NUL padding already stripped.
    RconGoldSrc(String),
}

impl Packet {
    /// The packet kind, for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Packet::Info(_) => "S2A_INFO",
            Packet::Players(_) => "S2A_PLAYER",
            Packet::Rules(_) => "S2A_RULES",
            Packet::Challenge(_) => "S2C_CHALLENGE",
            Packet::ServerBatch(_) => "M2A_SERVER_BATCH",
            Packet::RconGoldSrc(_) => "RCON_GOLDSRC_RESPONSE",
        }
    }

    /// Extracts the text of a GoldSrc RCON reply, failing on any other
    /// packet kind.
    pub fn into_rcon_text(self) -> Result<String> {
        match self {
            Packet::RconGoldSrc(text) => Ok(text),
            other => Err(SrcQueryError::PacketFormat(format!(
                "expected a GoldSrc RCON reply, got {}",
                other.kind()
            ))),
        }
    }
}
