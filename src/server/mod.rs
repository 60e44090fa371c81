//! Server objects binding a resolved host:port to the matching socket
//! sessions, plus the query operations shared by both engines.
pub mod goldsrc;
pub mod master;
pub mod source;

use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

use tokio::net::lookup_host;

use crate::error::{Result, SrcQueryError};
use crate::packet::info::ServerInfo;
use crate::packet::player::Player;
use crate::packet::{Packet, Request};
use crate::socket::QuerySocket;

/// The resolved addresses of a queried host.
///
/// All addresses of the host are resolved up front; when a target stops
/// answering, callers rotate to the next address and re-initialize their
/// socket.
#[derive(Debug, Clone)]
pub(crate) struct HostEndpoint {
    addresses: Vec<SocketAddr>,
    index: usize,
}

impl HostEndpoint {
    /// Resolves `address` (`"host:port"`) to its full address list.
    pub(crate) async fn resolve(address: &str) -> Result<Self> {
        let addresses: Vec<SocketAddr> = lookup_host(address)
            .await
            .map_err(|_| SrcQueryError::AddressResolution(address.to_string()))?
            .collect();

        if addresses.is_empty() {
            return Err(SrcQueryError::AddressResolution(address.to_string()));
        }

        Ok(HostEndpoint {
            addresses,
            index: 0,
        })
    }

    pub(crate) fn current(&self) -> SocketAddr {
        self.addresses[self.index]
    }

    /// Advances to the next resolved address, reporting whether the
    /// rotation wrapped around to the first one.
    pub(crate) fn rotate(&mut self) -> bool {
        self.index = (self.index + 1) % self.addresses.len();
        self.index == 0
    }
}

fn unexpected(expected: &str, got: &Packet) -> SrcQueryError {
    SrcQueryError::PacketFormat(format!("expected {expected}, got {}", got.kind()))
}

/// Fetches a fresh query challenge number.
pub(crate) async fn update_challenge<S: QuerySocket>(socket: &mut S) -> Result<i32> {
    socket.send(&Request::GetChallenge).await?;
    match socket.get_reply().await? {
        Packet::Challenge(challenge) => Ok(challenge),
        other => Err(unexpected("S2C_CHALLENGE", &other)),
    }
}

/// Queries the server information, answering a challenge demand once.
pub(crate) async fn server_info<S: QuerySocket>(socket: &mut S) -> Result<ServerInfo> {
    socket.send(&Request::Info { challenge: None }).await?;
    match socket.get_reply().await? {
        Packet::Info(info) => Ok(info),
        Packet::Challenge(challenge) => {
            socket
                .send(&Request::Info {
                    challenge: Some(challenge),
                })
                .await?;
            match socket.get_reply().await? {
                Packet::Info(info) => Ok(info),
                other => Err(unexpected("S2A_INFO", &other)),
            }
        }
        other => Err(unexpected("S2A_INFO", &other)),
    }
}

/// Round-trip time of an info query.
pub(crate) async fn update_ping<S: QuerySocket>(socket: &mut S) -> Result<Duration> {
    let start = Instant::now();
    server_info(socket).await?;
    Ok(start.elapsed())
}

/// Queries the player list, refreshing a stale challenge number once.
pub(crate) async fn players<S: QuerySocket>(
    socket: &mut S,
    challenge: &mut Option<i32>,
) -> Result<HashMap<String, Player>> {
    let current = match *challenge {
        Some(current) => current,
        None => {
            let fresh = update_challenge(socket).await?;
            *challenge = Some(fresh);
            fresh
        }
    };

    socket.send(&Request::Players { challenge: current }).await?;
    match socket.get_reply().await? {
        Packet::Players(players) => Ok(players),
        Packet::Challenge(fresh) => {
            *challenge = Some(fresh);
            socket.send(&Request::Players { challenge: fresh }).await?;
            match socket.get_reply().await? {
                Packet::Players(players) => Ok(players),
                other => Err(unexpected("S2A_PLAYER", &other)),
            }
        }
        other => Err(unexpected("S2A_PLAYER", &other)),
    }
}

/// Queries the server rules, refreshing a stale challenge number once.
pub(crate) async fn rules<S: QuerySocket>(
    socket: &mut S,
    challenge: &mut Option<i32>,
) -> Result<HashMap<String, String>> {
    let current = match *challenge {
        Some(current) => current,
        None => {
            let fresh = update_challenge(socket).await?;
            *challenge = Some(fresh);
            fresh
        }
    };

    socket.send(&Request::Rules { challenge: current }).await?;
    match socket.get_reply().await? {
        Packet::Rules(rules) => Ok(rules),
        Packet::Challenge(fresh) => {
            *challenge = Some(fresh);
            socket.send(&Request::Rules { challenge: fresh }).await?;
            match socket.get_reply().await? {
                Packet::Rules(rules) => Ok(rules),
                other => Err(unexpected("S2A_RULES", &other)),
            }
        }
        other => Err(unexpected("S2A_RULES", &other)),
    }
}
